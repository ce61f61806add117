use derive_more::IsVariant;
use std::fmt::Display;

/// The standard C integer ranks, smallest first.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, IsVariant, PartialOrd, Ord)]
pub enum CInteger {
    Char,
    Short,
    Int,
    Long,
    LongLong,
}

impl CInteger {
    pub const ALL: [Self; 5] = [
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::LongLong,
    ];

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Char => Some(Self::Short),
            Self::Short => Some(Self::Int),
            Self::Int => Some(Self::Long),
            Self::Long => Some(Self::LongLong),
            Self::LongLong => None,
        }
    }
}

impl Display for CInteger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::LongLong => "long long",
        })
    }
}
