use super::*;
use crate::{LayoutOptions, LayoutWarning, LayoutWarningKind, Padding, TypeLayoutCache};
use asg::RecordAttributes;
use data_units::ByteUnits;
use diagnostics::{DiagnosticFlags, Diagnostics};

fn packed_struct(asg: &mut Asg, name: &str, fields: impl IntoIterator<Item = Field>) -> RecordRef {
    asg.add_record(
        RecordKind::Struct,
        Some(name),
        RecordDefinition::c(fields).with_attributes(RecordAttributes {
            is_packed: true,
            ..Default::default()
        }),
    )
}

#[test]
fn test_padded_field() {
    let mut asg = Asg::new();
    let char_ty = char_type(&mut asg);
    let int = int_type(&mut asg);
    let s = c_struct(&mut asg, "S", [Field::new("a", char_ty), Field::new("b", int)]);

    let diagnostics = Diagnostics::new(DiagnosticFlags::all_warnings());
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    cache.get_record_layout(s);

    assert_eq!(
        diagnostics.collected::<LayoutWarning>(),
        [LayoutWarning {
            record: "struct S".into(),
            kind: LayoutWarningKind::PaddedField {
                field: Some("b".into()),
                index: 1,
                padding: Padding {
                    amount: 3,
                    in_bits: false,
                },
            },
        }]
    );
}

#[test]
fn test_padded_size() {
    let mut asg = Asg::new();
    let char_ty = char_type(&mut asg);
    let int = int_type(&mut asg);
    let s = c_struct(&mut asg, "S", [Field::new("a", int), Field::new("b", char_ty)]);

    let diagnostics = Diagnostics::new(DiagnosticFlags::all_warnings());
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    cache.get_record_layout(s);

    let warnings = diagnostics.collected::<LayoutWarning>();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].to_string(),
        "padding size of 'struct S' with 3 bytes to alignment boundary"
    );
}

#[test]
fn test_no_warnings_unless_enabled() {
    let mut asg = Asg::new();
    let char_ty = char_type(&mut asg);
    let int = int_type(&mut asg);
    let s = c_struct(&mut asg, "S", [Field::new("a", char_ty), Field::new("b", int)]);
    let packed = packed_struct(&mut asg, "Packed", [Field::new("a", int), Field::new("b", int)]);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    cache.get_record_layout(s);
    cache.get_record_layout(packed);

    assert!(diagnostics.is_empty());
}

#[test]
fn test_pragma_pack_is_not_padding() {
    let mut asg = Asg::new();
    let char_ty = char_type(&mut asg);
    let int = int_type(&mut asg);
    let s = asg.add_record(
        RecordKind::Struct,
        Some("S"),
        RecordDefinition::c([Field::new("a", char_ty), Field::new("b", int)]).with_attributes(
            RecordAttributes {
                max_field_alignment: Some(ByteUnits::ONE),
                ..Default::default()
            },
        ),
    );

    let diagnostics = Diagnostics::new(DiagnosticFlags::all_warnings());
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    let layout = cache.get_record_layout(s);

    assert_eq!(layout.field_offsets, bits([0, 8]));
    assert_eq!(layout.size, ByteUnits::of(5));
    assert_eq!(layout.alignment, ByteUnits::ONE);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_unnecessary_packed() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let s = packed_struct(&mut asg, "S", [Field::new("a", int), Field::new("b", int)]);

    let diagnostics = Diagnostics::new(DiagnosticFlags::all_warnings());
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    cache.get_record_layout(s);

    let kinds = diagnostics
        .collected::<LayoutWarning>()
        .into_iter()
        .map(|warning| warning.kind)
        .collect::<Vec<_>>();

    assert_eq!(
        kinds,
        [
            LayoutWarningKind::UnnecessaryPackedField {
                field: Some("a".into()),
                index: 0,
            },
            LayoutWarningKind::UnnecessaryPackedField {
                field: Some("b".into()),
                index: 1,
            },
            LayoutWarningKind::UnnecessaryPackedRecord,
        ]
    );
}

#[test]
fn test_necessary_packed() {
    let mut asg = Asg::new();
    let char_ty = char_type(&mut asg);
    let int = int_type(&mut asg);
    let s = packed_struct(&mut asg, "S", [Field::new("a", char_ty), Field::new("b", int)]);

    let diagnostics = Diagnostics::new(DiagnosticFlags::all_warnings());
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);
    let layout = cache.get_record_layout(s);

    assert_eq!(layout.size, ByteUnits::of(5));
    assert!(diagnostics.is_empty());
}
