use derive_more::IsVariant;
use std::fmt::Display;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, IsVariant, PartialOrd, Ord)]
pub enum CFloat {
    Half,
    Float,
    Double,
    LongDouble,
}

impl Display for CFloat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Half => "__fp16",
            Self::Float => "float",
            Self::Double => "double",
            Self::LongDouble => "long double",
        })
    }
}
