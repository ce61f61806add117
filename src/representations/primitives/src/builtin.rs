use crate::{CFloat, CInteger, IntegerSign};
use derive_more::{From, IsVariant};
use std::fmt::Display;

/// Builtin scalar types whose layout is a fixed fact of the target.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, IsVariant, From)]
pub enum Builtin {
    Void,
    Bool,
    /// Plain `char`, whose signedness is up to the target
    PlainChar,
    WChar,
    Char16,
    Char32,
    #[from]
    Integer(CInteger, IntegerSign),
    Int128(IntegerSign),
    #[from]
    Float(CFloat),
    NullPtr,
}

impl Builtin {
    pub const fn unsigned(integer: CInteger) -> Self {
        Self::Integer(integer, IntegerSign::Unsigned)
    }

    pub const fn signed(integer: CInteger) -> Self {
        Self::Integer(integer, IntegerSign::Signed)
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool => f.write_str("bool"),
            Self::PlainChar => f.write_str("char"),
            Self::WChar => f.write_str("wchar_t"),
            Self::Char16 => f.write_str("char16_t"),
            Self::Char32 => f.write_str("char32_t"),
            Self::Integer(integer, sign) => match sign {
                IntegerSign::Signed if integer.is_char() => write!(f, "signed {integer}"),
                IntegerSign::Signed => write!(f, "{integer}"),
                IntegerSign::Unsigned => write!(f, "unsigned {integer}"),
            },
            Self::Int128(IntegerSign::Signed) => f.write_str("__int128"),
            Self::Int128(IntegerSign::Unsigned) => f.write_str("unsigned __int128"),
            Self::Float(float) => write!(f, "{float}"),
            Self::NullPtr => f.write_str("std::nullptr_t"),
        }
    }
}

#[test]
fn test_builtin_display() {
    assert_eq!(Builtin::unsigned(CInteger::Int).to_string(), "unsigned int");
    assert_eq!(Builtin::signed(CInteger::Char).to_string(), "signed char");
    assert_eq!(Builtin::signed(CInteger::LongLong).to_string(), "long long");
    assert_eq!(Builtin::from(CFloat::Double).to_string(), "double");
}
