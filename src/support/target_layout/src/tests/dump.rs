use super::*;
use crate::{LayoutOptions, TypeLayoutCache};
use asg::MethodKind;
use diagnostics::Diagnostics;
use indoc::indoc;

#[test]
fn test_simple_dump() {
    let mut asg = Asg::new();
    let char_ty = char_type(&mut asg);
    let int = int_type(&mut asg);
    let s = c_struct(&mut asg, "S", [Field::new("a", char_ty), Field::new("b", int)]);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(linux_x86_64(), &asg, LayoutOptions::c(), &diagnostics);

    assert_eq!(
        cache.dump_record_layout(s, false),
        indoc! {"
            Type: struct S

            Layout: <ASTRecordLayout
              Size:64
              DataSize:64
              Alignment:32
              FieldOffsets: [0, 32]>
        "}
    );
}

#[test]
fn test_simple_dump_without_data_size_for_microsoft() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let s = cxx_struct(&mut asg, "S", [], [Field::new("x", int)]);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        windows_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );

    assert_eq!(
        cache.dump_record_layout(s, true),
        indoc! {"
            Type: struct S

            Layout: <ASTRecordLayout
              Size:32
              Alignment:32
              FieldOffsets: [0]>
        "}
    );
}

#[test]
fn test_dump_with_virtual_base() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let v = cxx_struct(&mut asg, "V", [], [Field::new("v", int)]);
    let d = cxx_struct(&mut asg, "D", [Base::virtual_base(v)], [Field::new("d", int)]);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        linux_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );

    assert_eq!(
        cache.dump_record_layout(d, false),
        concat!(
            "   0 | struct D\n",
            "   0 |   (D vtable pointer)\n",
            "   8 |   int d\n",
            "  12 |   struct V (virtual base)\n",
            "  12 |     int v\n",
            "     | [sizeof=16, dsize=16, align=8\n",
            "     |  nvsize=12, nvalign=8]\n",
            "\n",
        )
    );
}

#[test]
fn test_dump_with_primary_and_empty_bases() {
    let mut asg = Asg::new();
    let int = int_type(&mut asg);
    let base = cxx_struct(&mut asg, "Base", [], []);
    virtual_method(&mut asg, base, "f");
    let derived = cxx_struct(&mut asg, "Derived", [Base::new(base)], [Field::new("x", int)]);
    let empty = cxx_struct(&mut asg, "Empty", [], []);
    let s = cxx_struct(&mut asg, "S", [Base::new(empty)], [Field::new("x", int)]);

    let diagnostics = Diagnostics::default();
    let cache = TypeLayoutCache::new(
        linux_x86_64(),
        &asg,
        LayoutOptions::cplusplus(),
        &diagnostics,
    );

    assert_eq!(
        cache.dump_record_layout(derived, false),
        concat!(
            "   0 | struct Derived\n",
            "   0 |   struct Base (primary base)\n",
            "   0 |     (Base vtable pointer)\n",
            "   8 |   int x\n",
            "     | [sizeof=16, dsize=12, align=8\n",
            "     |  nvsize=12, nvalign=8]\n",
            "\n",
        )
    );

    assert_eq!(
        cache.dump_record_layout(s, false),
        concat!(
            "   0 | struct S\n",
            "   0 |   struct Empty (base) (empty)\n",
            "   0 |   int x\n",
            "     | [sizeof=4, dsize=4, align=4\n",
            "     |  nvsize=4, nvalign=4]\n",
            "\n",
        )
    );
}

#[test]
fn test_microsoft_dump_with_vtordisp() {
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

    assert_eq!(
        cache.dump_record_layout(d, false),
        concat!(
            "   0 | struct D\n",
            "   0 |   (D vbtable pointer)\n",
            "  12 |   (vtordisp for vbase V)\n",
            "  16 |   struct V (virtual base)\n",
            "  16 |     (V vftable pointer)\n",
            "  24 |     int v\n",
            "     | [sizeof=32, align=8\n",
            "     |  nvsize=8, nvalign=8]\n",
            "\n",
        )
    );
}
