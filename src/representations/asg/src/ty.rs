use crate::{EnumRef, RecordRef, TypeRef, TypedefRef};
use derive_more::IsVariant;
use primitives::Builtin;

#[derive(Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum Type {
    Builtin(Builtin),
    Pointer(TypeRef),
    BlockPointer(TypeRef),
    LValueReference(TypeRef),
    RValueReference(TypeRef),
    MemberPointer {
        pointee: TypeRef,
        class: TypeRef,
    },
    ConstantArray {
        element: TypeRef,
        count: u64,
    },
    IncompleteArray(TypeRef),
    VariableArray(TypeRef),
    DependentSizedArray(TypeRef),
    Vector {
        element: TypeRef,
        count: u64,
    },
    Complex(TypeRef),
    Record(RecordRef),
    Enum(EnumRef),
    Typedef(TypedefRef),
    /// A type written with an explicit tag or qualifier, such as `struct S`
    Elaborated(TypeRef),
    Function(FunctionType),
    /// Template type parameter, whose layout is unknown until instantiation
    TemplateParam(String),
    /// A type that failed to resolve
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionType {
    pub return_type: TypeRef,
    pub params: Vec<TypeRef>,
    pub is_variadic: bool,
}

impl Type {
    /// Element type of any kind of array.
    pub fn array_element(&self) -> Option<TypeRef> {
        match self {
            Self::ConstantArray { element, .. } => Some(*element),
            Self::IncompleteArray(element)
            | Self::VariableArray(element)
            | Self::DependentSizedArray(element) => Some(*element),
            _ => None,
        }
    }
}
