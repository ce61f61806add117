use data_units::ByteUnits;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypeLayout {
    pub width: ByteUnits,
    pub alignment: ByteUnits,
    pub unadjusted_alignment: ByteUnits,
    pub align_requirement: AlignRequirement,
}

impl TypeLayout {
    pub fn basic(size: ByteUnits) -> Self {
        Self {
            width: size,
            alignment: size,
            unadjusted_alignment: size,
            align_requirement: AlignRequirement::None,
        }
    }

    pub fn aligned(width: ByteUnits, alignment: ByteUnits) -> Self {
        Self {
            width,
            alignment,
            unadjusted_alignment: alignment,
            align_requirement: AlignRequirement::None,
        }
    }

    pub fn is_alignment_required(&self) -> bool {
        self.align_requirement != AlignRequirement::None
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AlignRequirement {
    #[default]
    None,
    RequiredByTypedefAttribute,
    RequiredByRecordAttribute,
}
