use asg::RecordRef;
use data_units::{BitUnits, ByteUnits};
use indexmap::IndexMap;

/// Finished layout of a record. Never changes after it is computed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLayout {
    pub size: ByteUnits,

    /// Size without tail padding
    pub data_size: ByteUnits,

    pub alignment: ByteUnits,

    /// Alignment imposed by `__declspec(align)` and friends, only meaningful for
    /// Microsoft layouts. Itanium layouts repeat `alignment` here.
    pub required_alignment: ByteUnits,

    /// One offset per field, in declaration order
    pub field_offsets: Vec<BitUnits>,

    pub cxx: Option<CxxRecordLayout>,
}

/// The parts of a record layout that only C++ classes have.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CxxRecordLayout {
    pub non_virtual_size: ByteUnits,
    pub non_virtual_alignment: ByteUnits,
    pub size_of_largest_empty_subobject: ByteUnits,

    pub primary_base: Option<RecordRef>,
    pub primary_base_is_virtual: bool,

    /// Has a vtable pointer that no base provides
    pub has_own_vfptr: bool,

    /// Has a vfptr that a derived class can share, either its own or its primary base's
    pub has_extendable_vfptr: bool,

    pub vbptr_offset: Option<ByteUnits>,
    pub base_sharing_vbptr: Option<RecordRef>,

    pub has_zero_sized_subobject: bool,
    pub leads_with_zero_sized_base: bool,

    pub base_offsets: IndexMap<RecordRef, ByteUnits>,
    pub vbase_offsets: IndexMap<RecordRef, VBaseInfo>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VBaseInfo {
    pub offset: ByteUnits,
    pub has_vtordisp: bool,
}

impl VBaseInfo {
    pub fn new(offset: ByteUnits, has_vtordisp: bool) -> Self {
        Self {
            offset,
            has_vtordisp,
        }
    }
}

impl RecordLayout {
    pub fn size_in_bits(&self) -> BitUnits {
        self.size.to_bits()
    }

    pub fn data_size_in_bits(&self) -> BitUnits {
        self.data_size.to_bits()
    }

    pub fn alignment_in_bits(&self) -> BitUnits {
        self.alignment.to_bits()
    }

    pub fn field_count(&self) -> usize {
        self.field_offsets.len()
    }

    pub fn field_offset(&self, index: usize) -> BitUnits {
        self.field_offsets[index]
    }

    pub fn is_cxx(&self) -> bool {
        self.cxx.is_some()
    }

    fn cxx(&self) -> &CxxRecordLayout {
        self.cxx
            .as_ref()
            .expect("C++ layout information requested for a C record")
    }

    pub fn non_virtual_size(&self) -> ByteUnits {
        self.cxx().non_virtual_size
    }

    pub fn non_virtual_alignment(&self) -> ByteUnits {
        self.cxx().non_virtual_alignment
    }

    pub fn size_of_largest_empty_subobject(&self) -> ByteUnits {
        self.cxx
            .as_ref()
            .map_or(ByteUnits::ZERO, |cxx| cxx.size_of_largest_empty_subobject)
    }

    pub fn primary_base(&self) -> Option<RecordRef> {
        self.cxx.as_ref().and_then(|cxx| cxx.primary_base)
    }

    pub fn is_primary_base_virtual(&self) -> bool {
        self.cxx.as_ref().is_some_and(|cxx| cxx.primary_base_is_virtual)
    }

    pub fn has_own_vfptr(&self) -> bool {
        self.cxx.as_ref().is_some_and(|cxx| cxx.has_own_vfptr)
    }

    pub fn has_extendable_vfptr(&self) -> bool {
        self.cxx.as_ref().is_some_and(|cxx| cxx.has_extendable_vfptr)
    }

    pub fn has_vbptr(&self) -> bool {
        self.vbptr_offset().is_some()
    }

    pub fn has_own_vbptr(&self) -> bool {
        self.has_vbptr() && self.base_sharing_vbptr().is_none()
    }

    pub fn vbptr_offset(&self) -> Option<ByteUnits> {
        self.cxx.as_ref().and_then(|cxx| cxx.vbptr_offset)
    }

    pub fn base_sharing_vbptr(&self) -> Option<RecordRef> {
        self.cxx.as_ref().and_then(|cxx| cxx.base_sharing_vbptr)
    }

    pub fn has_zero_sized_subobject(&self) -> bool {
        self.cxx.as_ref().is_some_and(|cxx| cxx.has_zero_sized_subobject)
    }

    pub fn leads_with_zero_sized_base(&self) -> bool {
        self.cxx
            .as_ref()
            .is_some_and(|cxx| cxx.leads_with_zero_sized_base)
    }

    pub fn base_offset(&self, base: RecordRef) -> ByteUnits {
        *self
            .cxx()
            .base_offsets
            .get(&base)
            .expect("record is not a non-virtual base of this class")
    }

    pub fn vbase_offset(&self, vbase: RecordRef) -> ByteUnits {
        self.vbase_info(vbase).offset
    }

    pub fn vbase_info(&self, vbase: RecordRef) -> VBaseInfo {
        *self
            .cxx()
            .vbase_offsets
            .get(&vbase)
            .expect("record is not a virtual base of this class")
    }

    pub fn base_offsets(&self) -> impl Iterator<Item = (RecordRef, ByteUnits)> + '_ {
        self.cxx
            .iter()
            .flat_map(|cxx| cxx.base_offsets.iter().map(|(base, offset)| (*base, *offset)))
    }

    pub fn vbase_offsets(&self) -> impl Iterator<Item = (RecordRef, VBaseInfo)> + '_ {
        self.cxx
            .iter()
            .flat_map(|cxx| cxx.vbase_offsets.iter().map(|(base, info)| (*base, *info)))
    }
}
