use data_units::{BITS_PER_BYTE, BitUnits};
use diagnostics::{Diagnostic, Show, show_warning};
use std::{any::Any, fmt::Display};

/// Observation made while laying out a record. Never affects the layout itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutWarning {
    /// Friendly name of the record, such as `struct S`
    pub record: String,
    pub kind: LayoutWarningKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutWarningKind {
    PaddedField {
        field: Option<String>,
        index: usize,
        padding: Padding,
    },
    PaddedSize {
        padding: Padding,
    },
    UnnecessaryPackedField {
        field: Option<String>,
        index: usize,
    },
    UnnecessaryPackedRecord,
}

/// Amount of padding, reported in bytes when it is a whole number of bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Padding {
    pub amount: u64,
    pub in_bits: bool,
}

impl Padding {
    pub fn from_bits(bits: BitUnits) -> Self {
        if bits.is_byte_aligned() {
            Self {
                amount: bits.bits() / BITS_PER_BYTE,
                in_bits: false,
            }
        } else {
            Self {
                amount: bits.bits(),
                in_bits: true,
            }
        }
    }

    pub fn is_plural(&self) -> bool {
        self.amount > 1
    }
}

impl Display for Padding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = if self.in_bits { "bit" } else { "byte" };
        let plural = if self.is_plural() { "s" } else { "" };
        write!(f, "{} {}{}", self.amount, unit, plural)
    }
}

impl Display for LayoutWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            LayoutWarningKind::PaddedField {
                field: Some(field),
                padding,
                ..
            } => write!(f, "padding '{}' with {} to align '{}'", self.record, padding, field),
            LayoutWarningKind::PaddedField {
                field: None,
                padding,
                ..
            } => write!(
                f,
                "padding '{}' with {} to align anonymous bit-field",
                self.record, padding
            ),
            LayoutWarningKind::PaddedSize { padding } => write!(
                f,
                "padding size of '{}' with {} to alignment boundary",
                self.record, padding
            ),
            LayoutWarningKind::UnnecessaryPackedField {
                field: Some(field), ..
            } => write!(f, "packed attribute is unnecessary for '{}'", field),
            LayoutWarningKind::UnnecessaryPackedField { field: None, index } => write!(
                f,
                "packed attribute is unnecessary for field {} of '{}'",
                index, self.record
            ),
            LayoutWarningKind::UnnecessaryPackedRecord => {
                write!(f, "packed attribute is unnecessary for '{}'", self.record)
            }
        }
    }
}

impl Show for LayoutWarning {
    fn show(&self, w: &mut dyn std::fmt::Write) -> std::fmt::Result {
        show_warning(w, None, self)
    }
}

impl Diagnostic for LayoutWarning {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn test_padding_units() {
    assert_eq!(Padding::from_bits(BitUnits::of(24)).to_string(), "3 bytes");
    assert_eq!(Padding::from_bits(BitUnits::of(8)).to_string(), "1 byte");
    assert_eq!(Padding::from_bits(BitUnits::of(5)).to_string(), "5 bits");
}

#[test]
fn test_warning_message() {
    let warning = LayoutWarning {
        record: "struct S".into(),
        kind: LayoutWarningKind::PaddedField {
            field: Some("b".into()),
            index: 1,
            padding: Padding::from_bits(BitUnits::of(24)),
        },
    };

    assert_eq!(warning.to_string(), "padding 'struct S' with 3 bytes to align 'b'");
}
