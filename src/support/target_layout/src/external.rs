use asg::{Asg, RecordRef};
use data_units::{BitUnits, ByteUnits};
use indexmap::IndexMap;

/// Supplies record layouts decided elsewhere, such as by a precompiled module.
pub trait ExternalLayoutSource {
    fn layout_record(&self, asg: &Asg, record: RecordRef) -> Option<ExternalLayout>;
}

/// An externally-supplied layout. Offsets that are missing fall back to the
/// ones the layout engine computes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalLayout {
    pub size: ByteUnits,

    /// `None` means the alignment is inferred from where things were placed
    pub alignment: Option<ByteUnits>,

    /// Keyed by field index
    pub field_offsets: IndexMap<usize, BitUnits>,

    pub base_offsets: IndexMap<RecordRef, ByteUnits>,
    pub vbase_offsets: IndexMap<RecordRef, ByteUnits>,
}

impl ExternalLayout {
    pub fn new(size: ByteUnits, alignment: Option<ByteUnits>) -> Self {
        Self {
            size,
            alignment,
            ..Default::default()
        }
    }

    pub fn with_field_offsets(self, offsets: impl IntoIterator<Item = BitUnits>) -> Self {
        Self {
            field_offsets: offsets.into_iter().enumerate().collect(),
            ..self
        }
    }

    pub fn with_base_offset(mut self, base: RecordRef, offset: ByteUnits) -> Self {
        self.base_offsets.insert(base, offset);
        self
    }

    pub fn with_vbase_offset(mut self, vbase: RecordRef, offset: ByteUnits) -> Self {
        self.vbase_offsets.insert(vbase, offset);
        self
    }
}
