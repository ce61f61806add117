use derive_more::IsVariant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum IntegerSign {
    Signed,
    Unsigned,
}

