use super::*;
use crate::{LayoutOptions, TypeLayoutCache};
use asg::{MethodKind, RecordAttributes};
use data_units::ByteUnits;
use diagnostics::Diagnostics;

fn aligned_cxx_struct(
    asg: &mut Asg,
    name: &str,
    alignment: u64,
    bases: impl IntoIterator<Item = Base>,
    fields: impl IntoIterator<Item = Field>,
) -> RecordRef {
    asg.add_record(
        RecordKind::Struct,
        Some(name),
        RecordDefinition::cxx(bases, fields).with_attributes(RecordAttributes {
            max_alignment: Some(ByteUnits::of(alignment)),
            ..Default::default()
        }),
    )
}

#[test]
fn test_vfptr_is_injected_before_fields() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("x", int)]);
    virtual_method(&mut asg, v, "f");

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );
    let layout = cache.get_record_layout(v);

    assert!(cache.uses_microsoft_layout());
    assert!(layout.has_own_vfptr());
    assert!(!layout.has_vbptr());
    assert_eq!(layout.field_offsets, bits([64]));
    assert_eq!(layout.size, ByteUnits::of(16));
    assert_eq!(layout.alignment, ByteUnits::of(8));
}

#[test]
fn test_vbptr_is_injected_before_fields() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], [Field::new("d", int)]);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );
    let layout = cache.get_record_layout(d);

    assert!(layout.has_own_vbptr());
    assert!(!layout.has_own_vfptr());
    assert_eq!(layout.vbptr_offset(), Some(ByteUnits::ZERO));
    assert_eq!(layout.field_offsets, bits([64]));
    assert_eq!(layout.non_virtual_size(), ByteUnits::of(16));
    assert_eq!(layout.vbase_offset(v), ByteUnits::of(16));
    assert!(!layout.vbase_info(v).has_vtordisp);
    assert_eq!(layout.size, ByteUnits::of(24));
    assert_eq!(layout.alignment, ByteUnits::of(8));
}

#[test]
fn test_32_bit_vbptr() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], [Field::new("d", int)]);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );
    let layout = cache.get_record_layout(d);

    assert_eq!(layout.field_offsets, bits([32]));
    assert_eq!(layout.vbase_offset(v), ByteUnits::of(8));
    assert_eq!(layout.size, ByteUnits::of(12));
    assert_eq!(layout.alignment, ByteUnits::of(4));
}

#[test]
fn test_vbptr_is_shared_with_first_base_that_has_one() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], [Field::new("d", int)]);
    let e = cxx_struct(&mut asg, "E", [Base::new(d)], [Field::new("e", int)]);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );
    let layout = cache.get_record_layout(e);

    assert!(layout.has_vbptr());
    assert!(!layout.has_own_vbptr());
    assert_eq!(layout.base_sharing_vbptr(), Some(d));
    assert_eq!(layout.vbptr_offset(), Some(ByteUnits::ZERO));
    assert_eq!(layout.base_offset(d), ByteUnits::ZERO);
    assert_eq!(layout.field_offsets, bits([128]));
    assert_eq!(layout.vbase_offset(v), ByteUnits::of(24));
    assert_eq!(layout.size, ByteUnits::of(32));
}

#[test]
fn test_vtordisp_for_overridden_virtual_base_method() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let v_f = virtual_method(&mut asg, v, "f");
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], []);
    asg.add_method(Method::new(d, "D", MethodKind::Constructor));
    asg.add_method(Method::virtual_method(d, "f").overriding([v_f]));

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );

    assert_eq!(cache.get_record_layout(v).size, ByteUnits::of(16));

    let layout = cache.get_record_layout(d);
    assert!(!layout.has_own_vfptr());
    assert_eq!(layout.vbptr_offset(), Some(ByteUnits::ZERO));
    assert_eq!(layout.non_virtual_size(), ByteUnits::of(8));
    assert!(layout.vbase_info(v).has_vtordisp);
    assert_eq!(layout.vbase_offset(v), ByteUnits::of(16));
    assert_eq!(layout.size, ByteUnits::of(32));
}

#[test]
fn test_no_vtordisp_without_user_declared_constructor() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let v_f = virtual_method(&mut asg, v, "f");
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], []);
    asg.add_method(Method::virtual_method(d, "f").overriding([v_f]));

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );
    let layout = cache.get_record_layout(d);

    assert!(!layout.vbase_info(v).has_vtordisp);
    assert_eq!(layout.vbase_offset(v), ByteUnits::of(8));
    assert_eq!(layout.size, ByteUnits::of(24));
}

#[test]
fn test_vtordisp_is_inherited_from_non_virtual_base() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let v_f = virtual_method(&mut asg, v, "f");
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], []);
    asg.add_method(Method::new(d, "D", MethodKind::Constructor));
    asg.add_method(Method::virtual_method(d, "f").overriding([v_f]));

    // No constructor of its own, so the vtordisp can only come from D
    let e = cxx_struct(&mut asg, "E", [Base::new(d)], []);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );
    let layout = cache.get_record_layout(e);

    assert_eq!(layout.base_sharing_vbptr(), Some(d));
    assert_eq!(layout.vbptr_offset(), Some(ByteUnits::ZERO));
    assert_eq!(layout.non_virtual_size(), ByteUnits::of(8));
    assert!(layout.vbase_info(v).has_vtordisp);
    assert_eq!(layout.vbase_offset(v), ByteUnits::of(16));
    assert_eq!(layout.size, ByteUnits::of(32));
}

#[test]
fn test_vtordisp_for_virtual_base_with_overridden_non_virtual_base() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let v_f = virtual_method(&mut asg, v, "f");
    let w = cxx_struct(&mut asg, "W", [Base::new(v)], [Field::new("w", int)]);
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(w)], []);
    asg.add_method(Method::new(d, "D", MethodKind::Constructor));
    asg.add_method(Method::virtual_method(d, "f").overriding([v_f]));

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );

    let w_layout = cache.get_record_layout(w);
    assert_eq!(w_layout.primary_base(), Some(v));
    assert_eq!(w_layout.non_virtual_size(), ByteUnits::of(24));

    // V is not a virtual base of D, but W reaches it through a non-virtual base
    let layout = cache.get_record_layout(d);
    assert_eq!(layout.vbase_offsets().count(), 1);
    assert!(layout.vbase_info(w).has_vtordisp);
    assert_eq!(layout.vbase_offset(w), ByteUnits::of(16));
    assert_eq!(layout.size, ByteUnits::of(40));
}

#[test]
fn test_adjacent_zero_sized_bases_are_separated() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let e1 = cxx_struct(&mut asg, "E1", [], []);
    let e2 = cxx_struct(&mut asg, "E2", [], []);
    let s = cxx_struct(&mut asg, "S", [Base::new(e1), Base::new(e2)], [Field::new("x", int)]);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );

    let empty = cache.get_record_layout(e1);
    assert_eq!(empty.size, ByteUnits::ONE);
    assert_eq!(empty.data_size, ByteUnits::ZERO);
    assert!(empty.has_zero_sized_subobject());
    assert!(empty.leads_with_zero_sized_base());

    let layout = cache.get_record_layout(s);
    assert_eq!(layout.base_offset(e1), ByteUnits::ZERO);
    assert_eq!(layout.base_offset(e2), ByteUnits::ONE);
    assert_eq!(layout.field_offsets, bits([32]));
    assert_eq!(layout.size, ByteUnits::of(8));
}

#[test]
fn test_over_aligned_record_leads_with_vbptr() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let e = cxx_struct(&mut asg, "E", [], []);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let d = aligned_cxx_struct(
        &mut asg,
        "D",
        16,
        [Base::new(e), Base::virtual_base(v)],
        [Field::new("d", int)],
    );

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );
    let layout = cache.get_record_layout(d);

    // The zero-sized base moves behind the vbptr
    assert_eq!(layout.vbptr_offset(), Some(ByteUnits::ZERO));
    assert_eq!(layout.base_offset(e), ByteUnits::of(8));
    assert_eq!(layout.field_offsets, bits([64]));
    assert_eq!(layout.vbase_offset(v), ByteUnits::of(16));
    assert_eq!(layout.size, ByteUnits::of(32));
    assert_eq!(layout.alignment, ByteUnits::of(16));
    assert_eq!(layout.required_alignment, ByteUnits::of(16));
}

#[test]
fn test_over_aligned_record_leads_with_vfptr() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let s = aligned_cxx_struct(&mut asg, "S", 16, [], [Field::new("x", int)]);
    virtual_method(&mut asg, s, "f");

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );
    let layout = cache.get_record_layout(s);

    assert!(layout.has_own_vfptr());
    assert_eq!(layout.field_offsets, bits([64]));
    assert_eq!(layout.size, ByteUnits::of(16));
    assert_eq!(layout.alignment, ByteUnits::of(16));
}

#[test]
fn test_bitfields_of_different_sizes_never_share_storage() {
    let mut asg = Asg::new();
    let char_ty = char_type(&mut asg);
    let int = int_type(&mut asg);
    let mixed = c_struct(
        &mut asg,
        "Mixed",
        [Field::bitfield("a", char_ty, 4), Field::bitfield("b", int, 4)],
    );
    let same = c_struct(
        &mut asg,
        "Same",
        [Field::bitfield("a", int, 3), Field::bitfield("b", int, 5)],
    );

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(windows_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    let mixed = cache.get_record_layout(mixed);
    assert_eq!(mixed.field_offsets, bits([0, 32]));
    assert_eq!(mixed.size, ByteUnits::of(8));
    assert_eq!(mixed.alignment, ByteUnits::of(4));

    let same = cache.get_record_layout(same);
    assert_eq!(same.field_offsets, bits([0, 3]));
    assert_eq!(same.size, ByteUnits::of(4));
}

#[test]
fn test_zero_width_bitfield_after_plain_field_is_ignored() {
    let mut asg = Asg::new();
    let char_ty = char_type(&mut asg);
    let int = int_type(&mut asg);
    let s = c_struct(
        &mut asg,
        "S",
        [
            Field::new("a", char_ty),
            Field::unnamed_bitfield(int, 0),
            Field::new("b", char_ty),
        ],
    );

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(windows_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    let layout = cache.get_record_layout(s);

    assert_eq!(layout.field_offsets, bits([0, 8, 8]));
    assert_eq!(layout.size, ByteUnits::of(2));
    assert_eq!(layout.alignment, ByteUnits::ONE);
}

#[test]
fn test_pack_larger_than_pointer_is_ignored() {
    let mut asg = Asg::new();
    let char_ty = char_type(&mut asg);
    let double = double_type(&mut asg);
    let fields = [Field::new("a", char_ty), Field::new("b", double)];

    let pack = |pack: u64| RecordAttributes {
        max_field_alignment: Some(ByteUnits::of(pack)),
        ..Default::default()
    };

    let pack_2 = asg.add_record(
        RecordKind::Struct,
        Some("Pack2"),
        RecordDefinition::c(fields.clone()).with_attributes(pack(2)),
    );
    let pack_32 = asg.add_record(
        RecordKind::Struct,
        Some("Pack32"),
        RecordDefinition::c(fields).with_attributes(pack(32)),
    );

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(windows_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    let pack_2 = cache.get_record_layout(pack_2);
    assert_eq!(pack_2.field_offsets, bits([0, 16]));
    assert_eq!(pack_2.size, ByteUnits::of(10));
    assert_eq!(pack_2.alignment, ByteUnits::of(2));

    let pack_32 = cache.get_record_layout(pack_32);
    assert_eq!(pack_32.field_offsets, bits([0, 64]));
    assert_eq!(pack_32.size, ByteUnits::of(16));
}

#[test]
fn test_forced_itanium_abi_on_windows() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], [Field::new("d", int)]);

    let target = windows_x86_64().with_cxx_abi(target::CxxAbi::Itanium);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(target, &asg, LayoutOptions::cplusplus(), &diagnostics);
    let layout = cache.get_record_layout(d);

    assert!(!cache.uses_microsoft_layout());
    assert_eq!(layout.vbase_offset(v), ByteUnits::of(12));
    assert_eq!(layout.size, ByteUnits::of(16));
}
