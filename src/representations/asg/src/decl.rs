use crate::{EnumRef, MethodRef, RecordRef, TypedefRef, VariableRef};
use derive_more::{From, IsVariant};

/// Any named entity that a type query can start from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant, From)]
pub enum Decl {
    #[from]
    Record(RecordRef),
    #[from]
    Enum(EnumRef),
    #[from]
    Typedef(TypedefRef),
    #[from]
    Variable(VariableRef),
    #[from]
    Method(MethodRef),
    Field {
        record: RecordRef,
        index: usize,
    },
}
