use derive_more::IsVariant;
use std::fmt::Display;

/// Why a size, alignment, or offset could not be computed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum TypeLayoutError {
    Invalid,
    Incomplete,
    Dependent,
    NotConstantSize,
    InvalidFieldName,
}

impl TypeLayoutError {
    /// Sentinel value that libclang returns in place of a layout for this error.
    pub fn code(&self) -> i64 {
        match self {
            Self::Invalid => -1,
            Self::Incomplete => -2,
            Self::Dependent => -3,
            Self::NotConstantSize => -4,
            Self::InvalidFieldName => -5,
        }
    }
}

impl Display for TypeLayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Invalid => "Type is invalid",
            Self::Incomplete => "Type is incomplete",
            Self::Dependent => "Type is dependent",
            Self::NotConstantSize => "Type does not have a constant size",
            Self::InvalidFieldName => "Field name does not refer to exactly one field",
        })
    }
}

impl std::error::Error for TypeLayoutError {}

#[test]
fn test_error_codes() {
    assert_eq!(TypeLayoutError::Invalid.code(), -1);
    assert_eq!(TypeLayoutError::Incomplete.code(), -2);
    assert_eq!(TypeLayoutError::Dependent.code(), -3);
    assert_eq!(TypeLayoutError::NotConstantSize.code(), -4);
    assert_eq!(TypeLayoutError::InvalidFieldName.code(), -5);
}
