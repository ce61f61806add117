use crate::TypeRef;

#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub ty: TypeRef,
}
