use derive_more::IsVariant;

/// Which C++ ABI decides record layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum CxxAbi {
    Itanium,
    Microsoft,
}

/// When a derived class may place its own data inside a base's tail padding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum TailPaddingUseRules {
    /// Tail padding of every base is reused.
    AlwaysUseTailPadding,

    /// Tail padding is reused unless the base is POD in the C++03 sense.
    UseTailPaddingUnlessPod03,

    /// Tail padding is reused unless the base is trivial and standard layout.
    UseTailPaddingUnlessPod11,
}

/// How a target packs bit-fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitFieldRules {
    /// The declared type of a bit-field contributes its alignment to the record.
    pub use_bit_field_type_alignment: bool,

    /// Zero-width bit-fields affect the alignment of the record and of the next field.
    pub use_zero_length_bitfield_alignment: bool,

    /// Boundary, in bits, that a zero-width bit-field aligns the next field to
    /// when bit-field type alignment is not used. Zero means "use the type alignment".
    pub zero_length_bitfield_boundary: u64,
}

impl Default for BitFieldRules {
    fn default() -> Self {
        Self {
            use_bit_field_type_alignment: true,
            use_zero_length_bitfield_alignment: false,
            zero_length_bitfield_boundary: 0,
        }
    }
}
