mod dump;
mod external;
mod microsoft;
mod type_layouts;
mod warnings;

use asg::{Asg, Base, Field, Method, MethodRef, RecordDefinition, RecordKind, RecordRef, TypeRef};
use data_units::BitUnits;
use primitives::{Builtin, CFloat, CInteger};
use target::{Target, TargetArch, TargetOs};

fn linux_x86_64() -> Target {
    Target::of(TargetOs::Linux, TargetArch::X86_64)
}

fn windows_x86_64() -> Target {
    Target::of(TargetOs::Windows, TargetArch::X86_64)
}

fn windows_x86() -> Target {
    Target::of(TargetOs::Windows, TargetArch::X86)
}

fn bits(offsets: impl IntoIterator<Item = u64>) -> Vec<BitUnits> {
    offsets.into_iter().map(BitUnits::of).collect()
}

fn char_type(asg: &mut Asg) -> TypeRef {
    asg.builtin(Builtin::signed(CInteger::Char))
}

fn int_type(asg: &mut Asg) -> TypeRef {
    asg.builtin(Builtin::signed(CInteger::Int))
}

fn unsigned_type(asg: &mut Asg) -> TypeRef {
    asg.builtin(Builtin::unsigned(CInteger::Int))
}

fn double_type(asg: &mut Asg) -> TypeRef {
    asg.builtin(Builtin::Float(CFloat::Double))
}

fn c_struct(asg: &mut Asg, name: &str, fields: impl IntoIterator<Item = Field>) -> RecordRef {
    asg.add_record(RecordKind::Struct, Some(name), RecordDefinition::c(fields))
}

fn cxx_struct(
    asg: &mut Asg,
    name: &str,
    bases: impl IntoIterator<Item = Base>,
    fields: impl IntoIterator<Item = Field>,
) -> RecordRef {
    asg.add_record(
        RecordKind::Struct,
        Some(name),
        RecordDefinition::cxx(bases, fields),
    )
}

fn virtual_method(asg: &mut Asg, record: RecordRef, name: &str) -> MethodRef {
    asg.add_method(Method::virtual_method(record, name))
}
