use crate::TypeRef;

#[derive(Clone, Debug)]
pub struct Enum {
    pub name: Option<String>,
    pub ty: TypeRef,

    /// Integer type backing the enumeration, absent while only forward-declared
    pub underlying: Option<TypeRef>,
}
