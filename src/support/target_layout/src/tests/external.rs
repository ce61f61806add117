use super::*;
use crate::{ExternalLayout, ExternalLayoutSource, LayoutOptions, TypeLayoutCache};
use data_units::ByteUnits;
use diagnostics::Diagnostics;
use std::collections::HashMap;

#[derive(Default)]
struct FixedLayouts {
    layouts: HashMap<RecordRef, ExternalLayout>,
}

impl ExternalLayoutSource for FixedLayouts {
    fn layout_record(&self, _asg: &Asg, record: RecordRef) -> Option<ExternalLayout> {
        self.layouts.get(&record).cloned()
    }
}

fn char_then_int(asg: &mut Asg, name: &str) -> RecordRef {
    let char_ty = char_type(asg);
    let int = int_type(asg);
    c_struct(asg, name, [Field::new("a", char_ty), Field::new("b", int)])
}

#[test]
fn test_packed_external_layout_infers_byte_alignment() {
    let mut asg = Asg::new();
    let s = char_then_int(&mut asg, "S");

    let mut source = FixedLayouts::default();
    source.layouts.insert(
        s,
        ExternalLayout::new(ByteUnits::of(5), None).with_field_offsets(bits([0, 8])),
    );

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics)
        .with_external_source(&source);
    let layout = cache.get_record_layout(s);

    assert_eq!(layout.field_offsets, bits([0, 8]));
    assert_eq!(layout.size, ByteUnits::of(5));
    assert_eq!(layout.alignment, ByteUnits::ONE);
}

#[test]
fn test_natural_external_layout_infers_natural_alignment() {
    let mut asg = Asg::new();
    let s = char_then_int(&mut asg, "S");

    let mut source = FixedLayouts::default();
    source.layouts.insert(
        s,
        ExternalLayout::new(ByteUnits::of(8), None).with_field_offsets(bits([0, 32])),
    );

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics)
        .with_external_source(&source);
    let layout = cache.get_record_layout(s);

    assert_eq!(layout.size, ByteUnits::of(8));
    assert_eq!(layout.alignment, ByteUnits::of(4));
}

#[test]
fn test_external_alignment_is_taken_as_is() {
    let mut asg = Asg::new();
    let s = char_then_int(&mut asg, "S");

    let mut source = FixedLayouts::default();
    source.layouts.insert(
        s,
        ExternalLayout::new(ByteUnits::of(6), Some(ByteUnits::of(2)))
            .with_field_offsets(bits([0, 16])),
    );

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics)
        .with_external_source(&source);
    let layout = cache.get_record_layout(s);

    assert_eq!(layout.field_offsets, bits([0, 16]));
    assert_eq!(layout.size, ByteUnits::of(6));
    assert_eq!(layout.alignment, ByteUnits::of(2));
}

#[test]
fn test_missing_external_offsets_are_computed() {
    let mut asg = Asg::new();
    let s = char_then_int(&mut asg, "S");
    let other = char_then_int(&mut asg, "Other");

    let mut source = FixedLayouts::default();
    source
        .layouts
        .insert(s, ExternalLayout::new(ByteUnits::of(8), None));

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics)
        .with_external_source(&source);

    assert_eq!(cache.get_record_layout(s).field_offsets, bits([0, 32]));
    assert_eq!(cache.get_record_layout(other).size, ByteUnits::of(8));
}

#[test]
fn test_external_base_offsets() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let a = cxx_struct(&mut asg, "A", [], [Field::new("a", int)]);
    let b = cxx_struct(&mut asg, "B", [], [Field::new("b", int)]);
    let ab = cxx_struct(&mut asg, "AB", [Base::new(a), Base::new(b)], []);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], [Field::new("d", int)]);

    let mut source = FixedLayouts::default();
    source.layouts.insert(
        ab,
        ExternalLayout::new(ByteUnits::of(12), Some(ByteUnits::of(4)))
            .with_base_offset(a, ByteUnits::ZERO)
            .with_base_offset(b, ByteUnits::of(8)),
    );
    source.layouts.insert(
        d,
        ExternalLayout::new(ByteUnits::of(24), Some(ByteUnits::of(8)))
            .with_field_offsets(bits([64]))
            .with_vbase_offset(v, ByteUnits::of(16)),
    );

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        linux_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    )
    .with_external_source(&source);

    let ab = cache.get_record_layout(ab);
    assert_eq!(ab.base_offset(a), ByteUnits::ZERO);
    assert_eq!(ab.base_offset(b), ByteUnits::of(8));
    assert_eq!(ab.size, ByteUnits::of(12));

    let d = cache.get_record_layout(d);
    assert_eq!(d.field_offsets, bits([64]));
    assert_eq!(d.vbase_offset(v), ByteUnits::of(16));
    assert_eq!(d.size, ByteUnits::of(24));
    assert_eq!(d.alignment, ByteUnits::of(8));
}

#[test]
fn test_external_source_disables_microsoft_layout() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], [Field::new("d", int)]);

    let source = FixedLayouts::default();

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    )
    .with_external_source(&source);
    let layout = cache.get_record_layout(d);

    // Laid out by the Itanium engine, so there is no vbptr
    assert!(!cache.uses_microsoft_layout());
    assert!(!layout.has_vbptr());
    assert_eq!(layout.vbase_offset(v), ByteUnits::of(12));
    assert_eq!(layout.size, ByteUnits::of(16));
}
