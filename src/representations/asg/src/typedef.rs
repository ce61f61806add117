use crate::TypeRef;
use data_units::ByteUnits;

#[derive(Clone, Debug)]
pub struct Typedef {
    pub name: String,
    pub ty: TypeRef,
    pub becomes: TypeRef,

    /// `__attribute__((aligned(N)))` on the typedef, which overrides the natural alignment
    pub max_alignment: Option<ByteUnits>,
}
