use crate::{
    BaseSubobjectRef, BaseSubobjects, CxxRecordLayout, EmptySubobjectMap, ExternalLayout,
    LayoutWarning, LayoutWarningKind, Padding, RecordLayout, TargetLayout, TypeLayoutCache,
    VBaseInfo,
};
use asg::{Field, RecordRef, Type};
use data_units::{BitUnits, ByteUnits};
use diagnostics::Diagnostics;
use indexmap::IndexMap;
use primitives::{Builtin, CInteger};
use std::collections::HashSet;
use target::TailPaddingUseRules;

/// Lays out records the way the Itanium C++ ABI (and plain C on those targets) does.
#[derive(Debug)]
pub struct ItaniumRecordLayoutBuilder<'c, 'a> {
    cache: &'c TypeLayoutCache<'a>,
    record: RecordRef,
    empty_subobjects: Option<EmptySubobjectMap<'c, 'a>>,
    subobjects: BaseSubobjects,

    size: BitUnits,

    /// Size without tail padding
    data_size: BitUnits,

    alignment: ByteUnits,

    /// Alignment the record would have without `packed`, for -Wpacked
    unpacked_alignment: ByteUnits,

    field_offsets: Vec<BitUnits>,
    packed: bool,
    is_union: bool,
    is_ms_struct: bool,
    is_mac68k_align: bool,

    // Amount of left-over bits if the previous field was a bitfield (otherwise 0)
    unfilled_bits_in_last_unit: BitUnits,

    // When is_ms_struct, this is size of the storage unit of the previous field if it was a bitfield (otherwise 0)
    last_bitfield_storage_unit_size: BitUnits,

    // Zero means no maximum
    max_field_alignment: ByteUnits,

    non_virtual_size: ByteUnits,
    non_virtual_alignment: ByteUnits,

    primary_base: Option<RecordRef>,
    primary_base_is_virtual: bool,
    has_own_vfptr: bool,

    bases: IndexMap<RecordRef, ByteUnits>,
    vbases: IndexMap<RecordRef, VBaseInfo>,

    /// Virtual bases that some base already uses as its primary base
    indirect_primary_bases: HashSet<RecordRef>,
    visited_virtual_bases: HashSet<RecordRef>,
    first_nearly_empty_vbase: Option<RecordRef>,

    external: Option<ExternalLayout>,
    infer_alignment: bool,

    friendly_record_name: String,
    diagnostics: &'a Diagnostics,
}

impl<'c, 'a> ItaniumRecordLayoutBuilder<'c, 'a> {
    pub fn generate(
        cache: &'c TypeLayoutCache<'a>,
        record: RecordRef,
        external: Option<ExternalLayout>,
    ) -> RecordLayout {
        let asg = cache.asg;

        if !asg.is_cxx_record(record) {
            let mut builder = Self::new(cache, record, None, external);
            builder.layout_c();

            let size = builder.size.to_bytes_ceil();

            return RecordLayout {
                size,
                data_size: size,
                alignment: builder.alignment,
                required_alignment: builder.alignment,
                field_offsets: builder.field_offsets,
                cxx: None,
            };
        }

        let empty_subobjects = EmptySubobjectMap::new(cache, record);
        let mut builder = Self::new(cache, record, Some(empty_subobjects), external);
        builder.layout_cxx();

        let skip_tail_padding = match cache.target.tail_padding_use_rules() {
            TailPaddingUseRules::AlwaysUseTailPadding => false,
            TailPaddingUseRules::UseTailPaddingUnlessPod03 => asg.is_pod(record),
            TailPaddingUseRules::UseTailPaddingUnlessPod11 => {
                asg.is_trivial_and_standard_layout(record)
            }
        };

        let size = builder.size.to_bytes_ceil();

        let data_size = if skip_tail_padding {
            size
        } else {
            builder.data_size.to_bytes_ceil()
        };

        let non_virtual_size = if skip_tail_padding {
            data_size
        } else {
            builder.non_virtual_size
        };

        let size_of_largest_empty_subobject = builder
            .empty_subobjects
            .as_ref()
            .map_or(ByteUnits::ZERO, |map| map.size_of_largest_empty_subobject);

        RecordLayout {
            size,
            data_size,
            alignment: builder.alignment,
            required_alignment: builder.alignment,
            field_offsets: builder.field_offsets,
            cxx: Some(CxxRecordLayout {
                non_virtual_size,
                non_virtual_alignment: builder.non_virtual_alignment,
                size_of_largest_empty_subobject,
                primary_base: builder.primary_base,
                primary_base_is_virtual: builder.primary_base_is_virtual,
                has_own_vfptr: builder.has_own_vfptr,
                has_extendable_vfptr: asg.is_dynamic_class(record),
                vbptr_offset: None,
                base_sharing_vbptr: None,
                has_zero_sized_subobject: false,
                leads_with_zero_sized_base: false,
                base_offsets: builder.bases,
                vbase_offsets: builder.vbases,
            }),
        }
    }

    fn new(
        cache: &'c TypeLayoutCache<'a>,
        record: RecordRef,
        empty_subobjects: Option<EmptySubobjectMap<'c, 'a>>,
        external: Option<ExternalLayout>,
    ) -> Self {
        Self {
            cache,
            record,
            empty_subobjects,
            subobjects: BaseSubobjects::new(),
            size: BitUnits::ZERO,
            data_size: BitUnits::ZERO,
            alignment: ByteUnits::ONE,
            unpacked_alignment: ByteUnits::ONE,
            field_offsets: Vec::new(),
            packed: false,
            is_union: false,
            is_ms_struct: false,
            is_mac68k_align: false,
            unfilled_bits_in_last_unit: BitUnits::ZERO,
            last_bitfield_storage_unit_size: BitUnits::ZERO,
            max_field_alignment: ByteUnits::ZERO,
            non_virtual_size: ByteUnits::ZERO,
            non_virtual_alignment: ByteUnits::ZERO,
            primary_base: None,
            primary_base_is_virtual: false,
            has_own_vfptr: false,
            bases: IndexMap::new(),
            vbases: IndexMap::new(),
            indirect_primary_bases: HashSet::new(),
            visited_virtual_bases: HashSet::new(),
            first_nearly_empty_vbase: None,
            external,
            infer_alignment: false,
            friendly_record_name: cache.asg.records[record].friendly_name(),
            diagnostics: cache.diagnostics,
        }
    }

    fn layout_c(&mut self) {
        self.init_layout();
        self.layout_fields();
        self.finish_layout();
    }

    fn layout_cxx(&mut self) {
        self.init_layout();

        // Lay out the vtable pointer and the non-virtual bases
        self.layout_non_virtual_bases();
        self.layout_fields();

        self.non_virtual_size = self.size.to_bytes_ceil();
        self.non_virtual_alignment = self.alignment;

        self.layout_virtual_bases(self.record, self.record);
        self.finish_layout();
    }

    fn init_layout(&mut self) {
        let record = &self.cache.asg.records[self.record];
        let attributes = record.attributes();

        self.is_union = record.is_union();
        self.is_ms_struct = attributes.is_ms_struct || self.cache.options.ms_bitfields;
        self.packed = attributes.is_packed;

        // Honor the default struct packing maximum alignment flag
        if let Some(pack) = self.cache.options.pack_struct {
            self.max_field_alignment = pack;
        }

        // mac68k alignment supersedes both the maximum field alignment and the
        // aligned attribute
        if attributes.is_mac68k_align {
            self.is_mac68k_align = true;
            self.max_field_alignment = ByteUnits::of(2);
            self.alignment = ByteUnits::of(2);
        } else {
            if let Some(pack) = attributes.max_field_alignment {
                self.max_field_alignment = pack;
            }

            if let Some(aligned) = attributes.max_alignment {
                self.update_alignment(aligned, aligned);
            }
        }

        if let Some(external) = &self.external {
            match external.alignment {
                Some(alignment) => self.alignment = alignment,
                None => self.infer_alignment = true,
            }
        }
    }

    fn update_alignment(&mut self, new_alignment: ByteUnits, unpacked_new_alignment: ByteUnits) {
        // Neither mac68k alignment nor an external layout with a known alignment can change
        if self.is_mac68k_align || (self.external.is_some() && !self.infer_alignment) {
            return;
        }

        if new_alignment > self.alignment {
            assert!(new_alignment.is_power_of_2(), "alignment not a power of 2");
            self.alignment = new_alignment;
        }

        if unpacked_new_alignment > self.unpacked_alignment {
            assert!(
                unpacked_new_alignment.is_power_of_2(),
                "alignment not a power of 2"
            );
            self.unpacked_alignment = unpacked_new_alignment;
        }
    }

    fn update_external_field_offset(&mut self, index: usize, computed: BitUnits) -> BitUnits {
        let Some(external_offset) = self
            .external
            .as_ref()
            .and_then(|external| external.field_offsets.get(&index).copied())
        else {
            return computed;
        };

        // An externally placed field before where we would put it means the record was packed
        if self.infer_alignment && external_offset < computed {
            self.alignment = ByteUnits::ONE;
            self.infer_alignment = false;
        }

        external_offset
    }

    fn data_size_in_bytes(&self) -> ByteUnits {
        self.data_size.to_bytes_ceil()
    }

    fn set_size(&mut self, size: ByteUnits) {
        self.size = size.to_bits();
    }

    fn set_data_size(&mut self, data_size: ByteUnits) {
        self.data_size = data_size.to_bits();
    }

    fn determine_primary_base(&mut self) {
        let asg = self.cache.asg;

        if !asg.is_dynamic_class(self.record) {
            return;
        }

        self.compute_indirect_primary_bases();

        // The first non-virtual dynamic base wins
        for base in asg.records[self.record].bases() {
            if !base.is_virtual && asg.is_dynamic_class(base.record) {
                self.primary_base = Some(base.record);
                self.primary_base_is_virtual = false;
                return;
            }
        }

        if !asg.virtual_bases(self.record).is_empty() {
            self.select_primary_vbase(self.record);

            if self.primary_base.is_some() {
                return;
            }
        }

        // Otherwise it is the first indirect primary base that is nearly empty
        if let Some(vbase) = self.first_nearly_empty_vbase {
            self.primary_base = Some(vbase);
            self.primary_base_is_virtual = true;
        }
    }

    fn compute_indirect_primary_bases(&mut self) {
        let asg = self.cache.asg;

        if asg.virtual_bases(self.record).is_empty() {
            return;
        }

        for base in asg.records[self.record].bases() {
            if !asg.virtual_bases(base.record).is_empty() {
                self.add_indirect_primary_bases(base.record);
            }
        }
    }

    fn add_indirect_primary_bases(&mut self, record: RecordRef) {
        let asg = self.cache.asg;
        let layout = self.cache.get_record_layout(record);

        if let Some(primary) = layout.primary_base().filter(|_| layout.is_primary_base_virtual()) {
            self.indirect_primary_bases.insert(primary);
        }

        for base in asg.records[record].bases() {
            if !asg.virtual_bases(base.record).is_empty() {
                self.add_indirect_primary_bases(base.record);
            }
        }
    }

    fn select_primary_vbase(&mut self, record: RecordRef) {
        let asg = self.cache.asg;

        for base in asg.records[record].bases() {
            if base.is_virtual && self.cache.is_nearly_empty(base.record) {
                if !self.indirect_primary_bases.contains(&base.record) {
                    self.primary_base = Some(base.record);
                    self.primary_base_is_virtual = true;
                    return;
                }

                self.first_nearly_empty_vbase.get_or_insert(base.record);
            }

            self.select_primary_vbase(base.record);

            if self.primary_base.is_some() {
                return;
            }
        }
    }

    fn layout_non_virtual_bases(&mut self) {
        let asg = self.cache.asg;

        self.determine_primary_base();
        self.subobjects = BaseSubobjects::compute(self.cache, self.record);

        if let Some(primary) = self.primary_base {
            if self.primary_base_is_virtual {
                // The primary virtual base may already be the primary base of one of our bases
                let info = self.subobjects.steal_virtual_base(primary);
                self.indirect_primary_bases.insert(primary);

                let newly_visited = self.visited_virtual_bases.insert(primary);
                assert!(newly_visited, "virtual base already visited");

                self.layout_virtual_base(info);
            } else {
                let info = self.subobjects.non_virtual_base(primary);
                self.layout_non_virtual_base(info);
            }
        } else if asg.is_dynamic_class(self.record) {
            assert!(self.data_size.is_zero(), "vtable pointer must be at offset zero");

            let pointer = self.cache.target.pointer_layout();
            self.ensure_vtable_pointer_alignment(pointer.alignment);
            self.has_own_vfptr = true;

            self.set_size(self.size.to_bytes_ceil() + pointer.width);
            self.data_size = self.size;
        }

        for base in asg.records[self.record].bases() {
            if base.is_virtual {
                continue;
            }

            // A non-virtual base can share its type with a primary virtual base
            if Some(base.record) == self.primary_base && !self.primary_base_is_virtual {
                continue;
            }

            let info = self.subobjects.non_virtual_base(base.record);
            self.layout_non_virtual_base(info);
        }
    }

    fn ensure_vtable_pointer_alignment(&mut self, unpacked_base_align: ByteUnits) {
        let mut base_align = if self.packed {
            ByteUnits::ONE
        } else {
            unpacked_base_align
        };
        let mut unpacked_base_align = unpacked_base_align;

        if !self.max_field_alignment.is_zero() {
            base_align = base_align.min(self.max_field_alignment);
            unpacked_base_align = unpacked_base_align.min(self.max_field_alignment);
        }

        self.set_size(self.size.to_bytes_ceil().align_to(base_align));
        self.data_size = self.size;
        self.update_alignment(base_align, unpacked_base_align);
    }

    fn layout_non_virtual_base(&mut self, info: BaseSubobjectRef) {
        let offset = self.layout_base(info);
        let class = self.subobjects[info].class;

        let previous = self.bases.insert(class, offset);
        assert!(previous.is_none(), "added same base offset more than once");

        self.add_primary_virtual_base_offsets(info, offset);
    }

    fn add_primary_virtual_base_offsets(&mut self, info: BaseSubobjectRef, offset: ByteUnits) {
        let class = self.subobjects[info].class;

        if self.cache.asg.virtual_bases(class).is_empty() {
            return;
        }

        if let Some(primary) = self.subobjects.claimed_primary_virtual_base(info) {
            let primary_class = self.subobjects[primary].class;
            let previous = self
                .vbases
                .insert(primary_class, VBaseInfo::new(offset, false));
            assert!(previous.is_none(), "primary vbase offset already exists");

            self.add_primary_virtual_base_offsets(primary, offset);
        }

        let layout = self.cache.get_record_layout(class);

        for base in self.subobjects[info].bases.clone() {
            if self.subobjects[base].is_virtual {
                continue;
            }

            let base_offset = offset + layout.base_offset(self.subobjects[base].class);
            self.add_primary_virtual_base_offsets(base, base_offset);
        }
    }

    fn layout_virtual_bases(&mut self, record: RecordRef, most_derived: RecordRef) {
        let asg = self.cache.asg;

        let (primary_base, primary_base_is_virtual) = if record == most_derived {
            (self.primary_base, self.primary_base_is_virtual)
        } else {
            let layout = self.cache.get_record_layout(record);
            (layout.primary_base(), layout.is_primary_base_virtual())
        };

        for base in asg.records[record].bases() {
            let is_virtual_primary = Some(base.record) == primary_base && primary_base_is_virtual;

            if base.is_virtual
                && !is_virtual_primary
                && !self.indirect_primary_bases.contains(&base.record)
            {
                // Only visit virtual bases once
                if !self.visited_virtual_bases.insert(base.record) {
                    continue;
                }

                let info = self.subobjects.virtual_base(base.record);
                self.layout_virtual_base(info);
            }

            if !asg.virtual_bases(base.record).is_empty() {
                self.layout_virtual_bases(base.record, most_derived);
            }
        }
    }

    fn layout_virtual_base(&mut self, info: BaseSubobjectRef) {
        assert!(!self.is_union, "unions cannot have virtual bases");

        let offset = self.layout_base(info);
        let class = self.subobjects[info].class;

        let previous = self.vbases.insert(class, VBaseInfo::new(offset, false));
        assert!(previous.is_none(), "added same vbase offset more than once");

        self.add_primary_virtual_base_offsets(info, offset);
    }

    fn can_place_base(&mut self, info: BaseSubobjectRef, offset: ByteUnits) -> bool {
        match &mut self.empty_subobjects {
            Some(map) => map.can_place_base_at_offset(&self.subobjects, info, offset),
            None => true,
        }
    }

    fn layout_base(&mut self, info: BaseSubobjectRef) -> ByteUnits {
        assert!(!self.is_union, "unions cannot have base classes");

        let class = self.subobjects[info].class;
        let is_virtual = self.subobjects[info].is_virtual;
        let layout = self.cache.get_record_layout(class);

        let external_offset = self.external.as_ref().and_then(|external| {
            if is_virtual {
                external.vbase_offsets.get(&class).copied()
            } else {
                external.base_offsets.get(&class).copied()
            }
        });

        let mut unpacked_base_align = layout.non_virtual_alignment();
        let mut base_align = if self.packed {
            ByteUnits::ONE
        } else {
            unpacked_base_align
        };

        // Empty bases first try offset zero
        if self.cache.asg.is_empty_class(class)
            && external_offset.map_or(true, |offset| offset.is_zero())
            && self.can_place_base(info, ByteUnits::ZERO)
        {
            self.set_size(self.size.to_bytes_ceil().max(layout.size));
            self.update_alignment(base_align, unpacked_base_align);
            return ByteUnits::ZERO;
        }

        if !self.max_field_alignment.is_zero() {
            base_align = base_align.min(self.max_field_alignment);
            unpacked_base_align = unpacked_base_align.min(self.max_field_alignment);
        }

        let offset = match external_offset {
            None => {
                let mut offset = self.data_size_in_bytes().align_to(base_align);

                while !self.can_place_base(info, offset) {
                    offset += base_align;
                }

                offset
            }
            Some(offset) => {
                let allowed = self.can_place_base(info, offset);
                assert!(allowed, "base subobject externally placed at overlapping offset");

                if self.infer_alignment && offset < self.data_size_in_bytes().align_to(base_align) {
                    self.alignment = ByteUnits::ONE;
                    self.infer_alignment = false;
                }

                offset
            }
        };

        if !self.cache.asg.is_empty_class(class) {
            self.set_data_size(offset + layout.non_virtual_size());
            self.size = self.size.max(self.data_size);
        } else {
            self.set_size(self.size.to_bytes_ceil().max(offset + layout.size));
        }

        self.update_alignment(base_align, unpacked_base_align);
        offset
    }

    fn layout_fields(&mut self) {
        let asg = self.cache.asg;

        for (index, field) in asg.records[self.record].fields().iter().enumerate() {
            self.layout_field(index, field);
        }
    }

    fn layout_field(&mut self, index: usize, field: &Field) {
        if let Some(width) = field.bit_width {
            self.layout_bitfield(index, field, BitUnits::of(width));
            return;
        }

        let cache = self.cache;
        let asg = cache.asg;
        let target = &cache.target;

        let unpadded_field_offset = self.data_size - self.unfilled_bits_in_last_unit;

        self.unfilled_bits_in_last_unit = BitUnits::ZERO;
        self.last_bitfield_storage_unit_size = BitUnits::ZERO;

        let field_packed = self.packed || field.attributes.is_packed;

        let mut field_offset = if self.is_union {
            ByteUnits::ZERO
        } else {
            self.data_size_in_bytes()
        };

        let ty = asg.canonical_type(field.ty);

        let (field_size, mut field_align) = match &asg.types[ty] {
            // Flexible array members take up no space but still need their element alignment
            Type::IncompleteArray(element) => (ByteUnits::ZERO, cache.get(*element).alignment),
            Type::LValueReference(_) | Type::RValueReference(_) => {
                let pointer = target.pointer_layout();
                (pointer.width, pointer.alignment)
            }
            _ => {
                let info = cache.get(field.ty);
                let mut field_align = info.alignment;

                if self.is_ms_struct {
                    if let Type::Builtin(builtin) = asg.types[asg.base_element_type(field.ty)] {
                        field_align = field_align.max(target.builtin_layout(builtin).width);
                    }
                }

                (info.width, field_align)
            }
        };

        let mut unpacked_field_align = field_align;
        let mut unpacked_field_offset = field_offset;

        if field_packed {
            field_align = ByteUnits::ONE;
        }

        if let Some(max_alignment) = field.attributes.max_alignment {
            field_align = field_align.max(max_alignment);
            unpacked_field_align = unpacked_field_align.max(max_alignment);
        }

        // The maximum field alignment overrides the aligned attribute
        if !self.max_field_alignment.is_zero() {
            field_align = field_align.min(self.max_field_alignment);
            unpacked_field_align = unpacked_field_align.min(self.max_field_alignment);
        }

        field_offset = field_offset.align_to(field_align);
        unpacked_field_offset = unpacked_field_offset.align_to(unpacked_field_align);

        let uses_external_layout = self.external.is_some();

        if uses_external_layout {
            field_offset = self
                .update_external_field_offset(index, field_offset.to_bits())
                .to_bytes_floor();

            if !self.is_union {
                if let Some(map) = &mut self.empty_subobjects {
                    let allowed = map.can_place_field_at_offset(field, field_offset);
                    assert!(allowed, "externally-placed field cannot be placed here");
                }
            }
        } else if !self.is_union {
            if let Some(map) = &mut self.empty_subobjects {
                while !map.can_place_field_at_offset(field, field_offset) {
                    field_offset += field_align;
                }
            }
        }

        self.field_offsets.push(field_offset.to_bits());

        if !uses_external_layout {
            self.check_field_padding(
                field_offset.to_bits(),
                unpadded_field_offset,
                unpacked_field_offset.to_bits(),
                unpacked_field_align.to_bits(),
                field_packed,
                index,
                field,
            );
        }

        if self.is_union {
            self.data_size = self.data_size.max(field_size.to_bits());
        } else {
            self.set_data_size(field_offset + field_size);
        }

        self.size = self.size.max(self.data_size);
        self.update_alignment(field_align, unpacked_field_align);
    }

    fn layout_bitfield(&mut self, index: usize, field: &Field, field_size: BitUnits) {
        let rules = self.cache.target.bitfield_rules();
        let field_packed = self.packed || field.attributes.is_packed;

        let type_info = self.cache.get(field.ty);
        let type_size = type_info.width.to_bits();
        let mut field_align = type_info.alignment.to_bits();

        if self.is_ms_struct {
            // The field alignment for integer types in ms_struct structs is always the size
            field_align = type_size;

            // Zero-length bit-fields after non-bit-fields are ignored
            if field_size.is_zero() && self.last_bitfield_storage_unit_size.is_zero() {
                field_align = BitUnits::of(1);
            }

            // Adjacent bit-fields of different sizes are never packed together
            if self.last_bitfield_storage_unit_size != type_size {
                self.unfilled_bits_in_last_unit = BitUnits::ZERO;
                self.last_bitfield_storage_unit_size = BitUnits::ZERO;
            }
        }

        let unpadded_field_offset = self.data_size - self.unfilled_bits_in_last_unit;
        let mut field_offset = if self.is_union {
            BitUnits::ZERO
        } else {
            unpadded_field_offset
        };

        let mut zero_length_bitfield = false;

        if !rules.use_bit_field_type_alignment
            && rules.use_zero_length_bitfield_alignment
            && field_size.is_zero()
        {
            // A zero-length bit-field aligns the next member to at least the target's boundary
            zero_length_bitfield = true;
            field_align = field_align.max(BitUnits::of(rules.zero_length_bitfield_boundary));
        }

        if field_size > type_size {
            self.layout_wide_bitfield(index, field, field_size, field_packed);
            return;
        }

        let ignores_type_alignment = !rules.use_bit_field_type_alignment && !zero_length_bitfield;

        let mut unpacked_field_align = if ignores_type_alignment {
            BitUnits::of(1)
        } else {
            field_align
        };
        let mut unpacked_field_offset = field_offset;

        if field_packed || ignores_type_alignment {
            field_align = BitUnits::of(1);
        }

        if let Some(max_alignment) = field.attributes.max_alignment {
            field_align = field_align.max(max_alignment.to_bits());
            unpacked_field_align = unpacked_field_align.max(max_alignment.to_bits());
        }

        // The maximum field alignment overrides the aligned attribute
        if !self.max_field_alignment.is_zero() && !field_size.is_zero() {
            let max_field_alignment = self.max_field_alignment.to_bits();
            field_align = field_align.min(max_field_alignment);
            unpacked_field_align = unpacked_field_align.min(max_field_alignment);
        }

        // ms_struct bit-fields always start at a round alignment
        if self.is_ms_struct && self.last_bitfield_storage_unit_size.is_zero() {
            field_offset = field_offset.align_to(field_align);
            unpacked_field_offset = unpacked_field_offset.align_to(unpacked_field_align);
        }

        let allows_padding = self.max_field_alignment.is_zero();
        let straddles = |offset: BitUnits, align: BitUnits| {
            allows_padding && BitUnits::of(offset.bits() & (align.bits() - 1)) + field_size > type_size
        };

        if field_size.is_zero() || straddles(field_offset, field_align) {
            field_offset = field_offset.align_to(field_align);
        }

        if field_size.is_zero() || straddles(unpacked_field_offset, unpacked_field_align) {
            unpacked_field_offset = unpacked_field_offset.align_to(unpacked_field_align);
        }

        // Unnamed bit-fields don't affect the record's alignment, except on
        // targets where zero-length bit-fields do
        if field.is_unnamed() && !rules.use_zero_length_bitfield_alignment && !self.is_ms_struct {
            field_align = BitUnits::of(1);
            unpacked_field_align = BitUnits::of(1);
        }

        let uses_external_layout = self.external.is_some();

        if uses_external_layout {
            field_offset = self.update_external_field_offset(index, field_offset);
        }

        self.field_offsets.push(field_offset);

        if !uses_external_layout {
            self.check_field_padding(
                field_offset,
                unpadded_field_offset,
                unpacked_field_offset,
                unpacked_field_align,
                field_packed,
                index,
                field,
            );
        }

        if self.is_union {
            self.data_size = self.data_size.max(field_size);
        } else if self.is_ms_struct && !field_size.is_zero() {
            // Under ms_struct a bit-field always takes up a whole storage unit of its type
            if self.unfilled_bits_in_last_unit.is_zero() {
                self.data_size = field_offset + type_size;
                self.unfilled_bits_in_last_unit = type_size - field_size;
            } else if self.unfilled_bits_in_last_unit < field_size {
                self.data_size += type_size;
                self.unfilled_bits_in_last_unit = type_size - field_size;
            } else {
                self.unfilled_bits_in_last_unit -= field_size;
            }

            self.last_bitfield_storage_unit_size = type_size;
        } else {
            let new_size = field_offset + field_size;
            self.data_size = new_size.to_bytes_ceil().to_bits();
            self.unfilled_bits_in_last_unit = self.data_size - new_size;
            self.last_bitfield_storage_unit_size = BitUnits::ZERO;
        }

        self.size = self.size.max(self.data_size);
        self.update_alignment(
            field_align.to_bytes_floor().max(ByteUnits::ONE),
            unpacked_field_align.to_bytes_floor().max(ByteUnits::ONE),
        );
    }

    /// Bit-fields wider than their declared type get the largest integer type
    /// that fits in their width, and the remaining bits act as padding.
    fn layout_wide_bitfield(
        &mut self,
        index: usize,
        field: &Field,
        field_size: BitUnits,
        field_packed: bool,
    ) {
        let target = &self.cache.target;

        let type_align = CInteger::ALL
            .into_iter()
            .map(|c_integer| target.builtin_layout(Builtin::unsigned(c_integer)))
            .take_while(|layout| layout.width.to_bits() <= field_size)
            .last()
            .unwrap_or_else(|| target.char_layout())
            .alignment
            .to_bits();

        self.unfilled_bits_in_last_unit = BitUnits::ZERO;
        self.last_bitfield_storage_unit_size = BitUnits::ZERO;

        let unpadded_field_offset = self.data_size;

        let field_offset = if self.is_union {
            self.data_size = self.data_size.max(field_size);
            BitUnits::ZERO
        } else {
            let field_offset = self.data_size.align_to(type_align);
            let new_size = field_offset + field_size;
            self.data_size = new_size.to_bytes_ceil().to_bits();
            self.unfilled_bits_in_last_unit = self.data_size - new_size;
            field_offset
        };

        self.field_offsets.push(field_offset);

        self.check_field_padding(
            field_offset,
            unpadded_field_offset,
            field_offset,
            type_align,
            field_packed,
            index,
            field,
        );

        self.size = self.size.max(self.data_size);

        let type_align = type_align.to_bytes_floor();
        self.update_alignment(type_align, type_align);
    }

    fn finish_layout(&mut self) {
        let asg = self.cache.asg;

        // In C++, records cannot be of size 0, except for non-empty classes
        // whose only members are zero-length arrays
        if self.cache.options.cplusplus && self.size.is_zero() {
            if !asg.is_cxx_record(self.record) || asg.is_empty_class(self.record) {
                self.set_size(ByteUnits::ONE);
            }
        }

        let unpadded_size = self.size - self.unfilled_bits_in_last_unit;
        let unpacked_size = self.size.align_to(self.unpacked_alignment.to_bits());
        let rounded_size = self.size.align_to(self.alignment.to_bits());

        if let Some(external_size) = self.external.as_ref().map(|external| external.size) {
            // An external size smaller than ours means the record was packed
            if self.infer_alignment && external_size.to_bits() < rounded_size {
                self.alignment = ByteUnits::ONE;
                self.infer_alignment = false;
            }

            self.set_size(external_size);
            return;
        }

        self.size = rounded_size;

        if self.size > unpadded_size && self.diagnostics.flags().warn_padded {
            self.diagnostics.push(LayoutWarning {
                record: self.friendly_record_name.clone(),
                kind: LayoutWarningKind::PaddedSize {
                    padding: Padding::from_bits(self.size - unpadded_size),
                },
            });
        }

        // No alignment issues are possible when the unpacked alignment is 1 byte
        if self.packed
            && self.unpacked_alignment > ByteUnits::ONE
            && self.size == unpacked_size
            && self.diagnostics.flags().warn_packed
        {
            self.diagnostics.push(LayoutWarning {
                record: self.friendly_record_name.clone(),
                kind: LayoutWarningKind::UnnecessaryPackedRecord,
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_field_padding(
        &self,
        offset: BitUnits,
        unpadded_offset: BitUnits,
        unpacked_offset: BitUnits,
        unpacked_align: BitUnits,
        is_packed: bool,
        index: usize,
        field: &Field,
    ) {
        if !self.is_union && offset > unpadded_offset && self.diagnostics.flags().warn_padded {
            self.diagnostics.push(LayoutWarning {
                record: self.friendly_record_name.clone(),
                kind: LayoutWarningKind::PaddedField {
                    field: field.name.clone(),
                    index,
                    padding: Padding::from_bits(offset - unpadded_offset),
                },
            });
        }

        // Warn if we packed a field unnecessarily
        if is_packed
            && unpacked_align > ByteUnits::ONE.to_bits()
            && offset == unpacked_offset
            && self.diagnostics.flags().warn_packed
        {
            self.diagnostics.push(LayoutWarning {
                record: self.friendly_record_name.clone(),
                kind: LayoutWarningKind::UnnecessaryPackedField {
                    field: field.name.clone(),
                    index,
                },
            });
        }
    }
}
