use super::*;
use crate::{AlignRequirement, LayoutOptions, TypeLayout, TypeLayoutCache};
use asg::{FieldRef, FunctionType, Member, Type};
use data_units::ByteUnits;
use diagnostics::Diagnostics;

fn float_type(asg: &mut Asg) -> TypeRef {
    asg.builtin(Builtin::Float(CFloat::Float))
}

#[test]
fn test_builtins_and_pointers() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let double = double_type(&mut asg);
    let pointer = asg.pointer_to(double);
    let reference = asg.reference_to(int);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    assert_eq!(cache.get(int), TypeLayout::basic(ByteUnits::of(4)));
    assert_eq!(cache.get(double), TypeLayout::basic(ByteUnits::of(8)));
    assert_eq!(cache.get(pointer), TypeLayout::basic(ByteUnits::of(8)));
    assert_eq!(cache.get(reference), TypeLayout::basic(ByteUnits::of(8)));
}

#[test]
fn test_arrays() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let array = asg.array_of(int, 10);
    let nested = asg.array_of(array, 3);
    let incomplete = asg.add_type(Type::IncompleteArray(int));

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    assert_eq!(cache.get(array).width, ByteUnits::of(40));
    assert_eq!(cache.get(nested).width, ByteUnits::of(120));
    assert_eq!(cache.get(nested).alignment, ByteUnits::of(4));
    assert_eq!(
        cache.get(incomplete),
        TypeLayout::aligned(ByteUnits::ZERO, ByteUnits::of(4))
    );
}

#[test]
fn test_vectors_round_up_to_power_of_two() {
    let mut asg = Asg::new();
    let float = float_type(&mut asg);
    let float3 = asg.add_type(Type::Vector {
        element: float,
        count: 3,
    });
    let float4 = asg.add_type(Type::Vector {
        element: float,
        count: 4,
    });

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    assert_eq!(cache.get(float3), TypeLayout::basic(ByteUnits::of(16)));
    assert_eq!(cache.get(float4), TypeLayout::basic(ByteUnits::of(16)));
}

#[test]
fn test_complex() {
    let mut asg = Asg::new();
    let double = double_type(&mut asg);
    let complex = asg.add_type(Type::Complex(double));

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    assert_eq!(
        cache.get(complex),
        TypeLayout::aligned(ByteUnits::of(16), ByteUnits::of(8))
    );
}

#[test]
fn test_typedef_alignment_attribute() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let plain = asg.add_typedef("plain_int", int, None);
    let aligned = asg.add_typedef("aligned_int", int, Some(ByteUnits::of(16)));
    let plain = asg.typedefs[plain].ty;
    let aligned = asg.typedefs[aligned].ty;

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    assert_eq!(cache.get(plain), cache.get(int));

    let layout = cache.get(aligned);
    assert_eq!(layout.width, ByteUnits::of(4));
    assert_eq!(layout.alignment, ByteUnits::of(16));
    assert_eq!(
        layout.align_requirement,
        AlignRequirement::RequiredByTypedefAttribute
    );
    assert!(layout.is_alignment_required());
}

#[test]
fn test_record_alignment_attribute() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let record = asg.add_record(
        RecordKind::Struct,
        Some("S"),
        RecordDefinition::c([Field::new("x", int)]).with_attributes(asg::RecordAttributes {
            max_alignment: Some(ByteUnits::of(8)),
            ..Default::default()
        }),
    );
    let ty = asg.record_type(record);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    let layout = cache.get(ty);

    assert_eq!(layout.width, ByteUnits::of(8));
    assert_eq!(layout.alignment, ByteUnits::of(8));
    assert_eq!(
        layout.align_requirement,
        AlignRequirement::RequiredByRecordAttribute
    );
}

#[test]
fn test_enum_uses_underlying_type() {
    let mut asg = Asg::new();
    let unsigned = unsigned_type(&mut asg);
    let enumeration = asg.add_enum(Some("E"), Some(unsigned));
    let ty = asg.enums[enumeration].ty;

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    assert_eq!(cache.get(ty), TypeLayout::basic(ByteUnits::of(4)));
}

#[test]
#[should_panic]
fn test_incomplete_enum_has_no_layout() {
    let mut asg = Asg::new();
    let enumeration = asg.add_enum(Some("E"), None);
    let ty = asg.enums[enumeration].ty;

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    cache.get(ty);
}

#[test]
#[should_panic]
fn test_dependent_type_has_no_layout() {
    let mut asg = Asg::new();
    let param = asg.add_type(Type::TemplateParam("T".into()));

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    cache.get(param);
}

#[test]
#[should_panic]
fn test_forward_declared_record_has_no_layout() {
    let mut asg = Asg::new();
    let record = asg.declare_record(RecordKind::Struct, Some("S"));

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    cache.get_record_layout(record);
}

#[test]
fn test_function_type() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let function = asg.add_type(Type::Function(FunctionType {
        return_type: int,
        params: vec![int],
        is_variadic: false,
    }));

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    assert_eq!(
        cache.get(function),
        TypeLayout::aligned(ByteUnits::ZERO, ByteUnits::of(4))
    );
}

fn member_pointers(asg: &mut Asg, class: RecordRef) -> (TypeRef, TypeRef) {
    let int = int_type(asg);
    let function = asg.add_type(Type::Function(FunctionType {
        return_type: int,
        params: vec![],
        is_variadic: false,
    }));
    let class = asg.record_type(class);

    let data = asg.add_type(Type::MemberPointer {
        pointee: int,
        class,
    });
    let function = asg.add_type(Type::MemberPointer {
        pointee: function,
        class,
    });

    (data, function)
}

#[test]
fn test_itanium_member_pointers() {
    let mut asg = Asg::new();
    let class = cxx_struct(&mut asg, "C", [], []);
    let (data, function) = member_pointers(&mut asg, class);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        linux_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );

    assert_eq!(cache.get(data), TypeLayout::basic(ByteUnits::of(8)));
    assert_eq!(
        cache.get(function),
        TypeLayout::aligned(ByteUnits::of(16), ByteUnits::of(8))
    );
}

#[test]
fn test_microsoft_member_pointers_follow_inheritance_model() {
    let mut asg = Asg::new();
    let a = cxx_struct(&mut asg, "A", [], []);
    let b = cxx_struct(&mut asg, "B", [], []);
    let multiple = cxx_struct(&mut asg, "Multiple", [Base::new(a), Base::new(b)], []);
    let virtual_inheritance = cxx_struct(&mut asg, "Virtual", [Base::virtual_base(a)], []);
    let unspecified = asg.declare_record(RecordKind::Struct, Some("Unspecified"));

    let single = member_pointers(&mut asg, a);
    let multiple = member_pointers(&mut asg, multiple);
    let virtual_inheritance = member_pointers(&mut asg, virtual_inheritance);
    let unspecified = member_pointers(&mut asg, unspecified);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );

    let widths = |(data, function): (TypeRef, TypeRef)| {
        (cache.get(data).width.bytes(), cache.get(function).width.bytes())
    };

    assert_eq!(widths(single), (4, 8));
    assert_eq!(widths(multiple), (4, 16));
    assert_eq!(widths(virtual_inheritance), (8, 16));
    assert_eq!(widths(unspecified), (12, 24));
    assert_eq!(cache.get(single.0).alignment, ByteUnits::of(4));
    assert_eq!(cache.get(single.1).alignment, ByteUnits::of(8));
}

#[test]
fn test_indirect_field_offset() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let float = float_type(&mut asg);
    let union = asg.add_record(
        RecordKind::Union,
        None,
        RecordDefinition::c([Field::new("b", int), Field::new("c", float)]),
    );
    let union_ty = asg.record_type(union);
    let outer = c_struct(
        &mut asg,
        "Outer",
        [Field::new("a", int), Field::anonymous(union_ty)],
    );

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    let members = asg.lookup_member(outer, "c");

    let [Member::IndirectField(chain)] = &members[..] else {
        panic!("expected 'c' to be found through the anonymous union");
    };

    assert_eq!(cache.indirect_field_offset(chain), BitUnits::of(32));
    assert_eq!(
        cache.indirect_field_offset(&[FieldRef {
            record: outer,
            index: 0
        }]),
        BitUnits::ZERO
    );
}

#[test]
fn test_layouts_are_computed_once() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let s = c_struct(&mut asg, "S", [Field::new("x", int)]);
    let ty = asg.record_type(s);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    let first = cache.get_record_layout(s);
    let second = cache.get_record_layout(s);

    assert!(std::ptr::eq(first, second));
    assert_eq!(cache.get(ty), cache.get(ty));
    assert_eq!(cache.field_offset(s, 0), BitUnits::ZERO);
}
