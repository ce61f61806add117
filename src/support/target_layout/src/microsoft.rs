use crate::{CxxRecordLayout, RecordLayout, TypeLayoutCache, VBaseInfo};
use asg::{Field, RecordRef};
use data_units::{BitUnits, ByteUnits};
use indexmap::{IndexMap, IndexSet};

/// Size and alignment of a base or field after `#pragma pack` and
/// `__declspec(align)` are taken into account.
#[derive(Copy, Clone, Debug, Default)]
struct ElementInfo {
    size: ByteUnits,
    alignment: ByteUnits,
}

/// Lays out records the way MSVC does.
#[derive(Debug)]
pub struct MicrosoftRecordLayoutBuilder<'c, 'a> {
    cache: &'c TypeLayoutCache<'a>,
    record: RecordRef,

    size: ByteUnits,
    data_size: ByteUnits,
    alignment: ByteUnits,

    // Zero means no maximum
    max_field_alignment: ByteUnits,

    /// Alignment imposed by `__declspec(align)` on the record, or on one of its fields or bases
    required_alignment: ByteUnits,

    /// Allocation size of the active bit-field, only meaningful while
    /// `last_field_is_non_zero_width_bitfield` is set
    current_bitfield_size: ByteUnits,

    vbptr_offset: ByteUnits,
    pointer_info: ElementInfo,

    primary_base: Option<RecordRef>,
    shared_vbptr_base: Option<RecordRef>,

    field_offsets: Vec<BitUnits>,
    bases: IndexMap<RecordRef, ByteUnits>,
    vbases: IndexMap<RecordRef, VBaseInfo>,

    remaining_bits_in_field: BitUnits,

    is_union: bool,
    last_field_is_non_zero_width_bitfield: bool,
    has_own_vfptr: bool,
    has_vbptr: bool,
    is_64_bit_mode: bool,

    /// Contains a zero-sized member or base, or a base that does
    has_zero_sized_subobject: bool,

    /// Is zero-sized itself, or its first base is or leads with one
    leads_with_zero_sized_base: bool,
}

impl<'c, 'a> MicrosoftRecordLayoutBuilder<'c, 'a> {
    pub fn generate(cache: &'c TypeLayoutCache<'a>, record: RecordRef) -> RecordLayout {
        let mut builder = Self::new(cache, record);

        if !cache.asg.is_cxx_record(record) {
            builder.layout_c();

            return RecordLayout {
                size: builder.size,
                data_size: builder.size,
                alignment: builder.alignment,
                required_alignment: builder.required_alignment,
                field_offsets: builder.field_offsets,
                cxx: None,
            };
        }

        builder.layout_cxx();

        RecordLayout {
            size: builder.size,
            data_size: builder.data_size,
            alignment: builder.alignment,
            required_alignment: builder.required_alignment,
            field_offsets: builder.field_offsets,
            cxx: Some(CxxRecordLayout {
                non_virtual_size: builder.data_size,
                non_virtual_alignment: builder.alignment,
                size_of_largest_empty_subobject: ByteUnits::ZERO,
                primary_base: builder.primary_base,
                primary_base_is_virtual: false,
                has_own_vfptr: builder.has_own_vfptr,
                has_extendable_vfptr: builder.has_own_vfptr || builder.primary_base.is_some(),
                vbptr_offset: builder.has_vbptr.then_some(builder.vbptr_offset),
                base_sharing_vbptr: builder.shared_vbptr_base,
                has_zero_sized_subobject: builder.has_zero_sized_subobject,
                leads_with_zero_sized_base: builder.leads_with_zero_sized_base,
                base_offsets: builder.bases,
                vbase_offsets: builder.vbases,
            }),
        }
    }

    fn new(cache: &'c TypeLayoutCache<'a>, record: RecordRef) -> Self {
        Self {
            cache,
            record,
            size: ByteUnits::ZERO,
            data_size: ByteUnits::ZERO,
            alignment: ByteUnits::ONE,
            max_field_alignment: ByteUnits::ZERO,
            required_alignment: ByteUnits::ZERO,
            current_bitfield_size: ByteUnits::ZERO,
            vbptr_offset: ByteUnits::ZERO,
            pointer_info: ElementInfo::default(),
            primary_base: None,
            shared_vbptr_base: None,
            field_offsets: Vec::new(),
            bases: IndexMap::new(),
            vbases: IndexMap::new(),
            remaining_bits_in_field: BitUnits::ZERO,
            is_union: false,
            last_field_is_non_zero_width_bitfield: false,
            has_own_vfptr: false,
            has_vbptr: false,
            is_64_bit_mode: false,
            has_zero_sized_subobject: false,
            leads_with_zero_sized_base: false,
        }
    }

    fn layout_c(&mut self) {
        self.initialize_layout();
        self.layout_fields();
        self.size = self.size.align_to(self.alignment);
        self.data_size = self.size;
        self.finalize_layout();
    }

    fn layout_cxx(&mut self) {
        self.initialize_layout();
        self.initialize_cxx_layout();
        self.layout_non_virtual_bases();
        self.layout_fields();
        self.inject_vptrs();
        self.size = self.size.align_to(self.alignment);
        self.data_size = self.size;
        self.layout_virtual_bases();
        self.finalize_layout();
    }

    fn initialize_layout(&mut self) {
        let record = &self.cache.asg.records[self.record];
        let attributes = record.attributes();
        let pointer_width = self.cache.target.pointer_width();

        self.is_union = record.is_union();
        self.is_64_bit_mode = pointer_width == ByteUnits::of(8);
        self.size = ByteUnits::ZERO;
        self.alignment = ByteUnits::ONE;

        // 64-bit mode always aligns after laying out virtual bases, 32-bit mode
        // only does when something requires it
        self.required_alignment = if self.is_64_bit_mode {
            ByteUnits::ONE
        } else {
            ByteUnits::ZERO
        };

        if let Some(aligned) = attributes.max_alignment {
            self.required_alignment = self.required_alignment.max(aligned);
        }

        self.max_field_alignment = self.cache.options.pack_struct.unwrap_or(ByteUnits::ZERO);

        // Packing larger than a pointer is ignored
        if let Some(pack) = attributes.max_field_alignment {
            if pack <= pointer_width {
                self.max_field_alignment = pack;
            }
        }

        if attributes.is_packed {
            self.max_field_alignment = ByteUnits::ONE;
        }
    }

    fn initialize_cxx_layout(&mut self) {
        self.has_zero_sized_subobject = false;
        self.leads_with_zero_sized_base = false;
        self.has_own_vfptr = false;
        self.has_vbptr = false;
        self.primary_base = None;
        self.shared_vbptr_base = None;

        let pointer_width = self.cache.target.pointer_width();

        self.pointer_info = ElementInfo {
            size: pointer_width,
            alignment: self.clamp_to_pack(pointer_width),
        };
    }

    fn clamp_to_pack(&self, alignment: ByteUnits) -> ByteUnits {
        if self.max_field_alignment.is_zero() {
            alignment
        } else {
            alignment.min(self.max_field_alignment)
        }
    }

    fn base_element_info(&mut self, layout: &RecordLayout) -> ElementInfo {
        let alignment = self.clamp_to_pack(layout.alignment);

        if layout.has_zero_sized_subobject() {
            self.has_zero_sized_subobject = true;
        }

        // Required alignment still applies to the element after pack lowered it,
        // but not to the record itself at this point
        self.alignment = self.alignment.max(alignment);

        ElementInfo {
            size: layout.data_size,
            alignment: alignment.max(layout.required_alignment),
        }
    }

    fn field_element_info(&mut self, field: &Field) -> ElementInfo {
        let asg = self.cache.asg;
        let field_required_alignment = field.attributes.max_alignment.unwrap_or(ByteUnits::ZERO);

        let mut info = match asg.as_record(asg.base_element_type(field.ty)) {
            Some(record) => {
                let layout = self.cache.get_record_layout(record);
                let mut info = self.base_element_info(layout);

                // Fields occupy their whole type, not just the non-virtual part
                info.size = self.cache.get(field.ty).width;
                self.required_alignment = self.required_alignment.max(layout.required_alignment);
                info
            }
            None => {
                let type_layout = self.cache.get(field.ty);
                let mut alignment = type_layout.alignment;

                if field.is_bitfield() && !field_required_alignment.is_zero() {
                    alignment = alignment.max(field_required_alignment);
                }

                ElementInfo {
                    size: type_layout.width,
                    alignment: self.clamp_to_pack(alignment),
                }
            }
        };

        if field.attributes.is_packed {
            info.alignment = ByteUnits::ONE;
        }

        // __declspec(align) on a bit-field changes its alignment rather than the required alignment
        if !field.is_bitfield() {
            info.alignment = info.alignment.max(field_required_alignment);
            self.required_alignment = self.required_alignment.max(field_required_alignment);
        }

        // Bit-field alignment is ignored in unions
        if !(field.is_bitfield() && self.is_union) {
            self.alignment = self.clamp_to_pack(self.alignment.max(info.alignment));
        }

        info
    }

    /// Bases that lead with a vfptr are laid out first, so the primary base
    /// always ends up at the front.
    fn layout_non_virtual_bases(&mut self) {
        let asg = self.cache.asg;
        let mut previous_base_layout = None;

        for base in asg.records[self.record].bases() {
            let layout = self.cache.get_record_layout(base.record);

            self.required_alignment = self.required_alignment.max(layout.required_alignment);

            if base.is_virtual {
                self.has_vbptr = true;
                continue;
            }

            if self.shared_vbptr_base.is_none() && layout.has_vbptr() {
                self.shared_vbptr_base = Some(base.record);
                self.has_vbptr = true;
            }

            if !layout.has_extendable_vfptr() {
                continue;
            }

            if self.primary_base.is_none() {
                self.primary_base = Some(base.record);
                self.leads_with_zero_sized_base = layout.leads_with_zero_sized_base();
            }

            self.layout_non_virtual_base(base.record, layout, &mut previous_base_layout);
        }

        // A new vfptr is needed for virtual methods that override nothing
        if self.primary_base.is_none() && asg.is_dynamic_class(self.record) {
            let methods = asg.records[self.record]
                .cxx()
                .map_or(&[][..], |cxx| &cxx.methods[..]);

            self.has_own_vfptr = methods.iter().any(|method| {
                let method = &asg.methods[*method];
                method.is_virtual && method.overridden.is_empty()
            });
        }

        // Without a primary base, the first base laid out may lead with a zero-sized object
        let mut check_leading_layout = self.primary_base.is_none();

        for base in asg.records[self.record].bases() {
            if base.is_virtual {
                continue;
            }

            let layout = self.cache.get_record_layout(base.record);

            if layout.has_extendable_vfptr() {
                continue;
            }

            if check_leading_layout {
                check_leading_layout = false;
                self.leads_with_zero_sized_base = layout.leads_with_zero_sized_base();
            }

            self.layout_non_virtual_base(base.record, layout, &mut previous_base_layout);
        }

        if self.has_vbptr {
            if let Some(shared) = self.shared_vbptr_base {
                let shared_vbptr_offset = self
                    .cache
                    .get_record_layout(shared)
                    .vbptr_offset()
                    .unwrap_or(ByteUnits::ZERO);

                self.vbptr_offset = self.bases[&shared] + shared_vbptr_offset;
            }
        }
    }

    fn layout_non_virtual_base(
        &mut self,
        base: RecordRef,
        layout: &'c RecordLayout,
        previous_base_layout: &mut Option<&'c RecordLayout>,
    ) {
        // Zero-sized bases next to each other get a byte of padding between them
        if previous_base_layout.is_some_and(|previous| previous.has_zero_sized_subobject())
            && layout.leads_with_zero_sized_base()
        {
            self.size += ByteUnits::ONE;
        }

        let info = self.base_element_info(layout);
        let offset = self.size.align_to(info.alignment);

        self.bases.insert(base, offset);
        self.size = offset + layout.data_size;
        *previous_base_layout = Some(layout);
        self.vbptr_offset = self.size;
    }

    fn layout_fields(&mut self) {
        let asg = self.cache.asg;
        self.last_field_is_non_zero_width_bitfield = false;

        for field in asg.records[self.record].fields() {
            self.layout_field(field);
        }
    }

    fn layout_field(&mut self, field: &Field) {
        if let Some(width) = field.bit_width {
            self.layout_bitfield(field, BitUnits::of(width));
            return;
        }

        self.last_field_is_non_zero_width_bitfield = false;
        let info = self.field_element_info(field);

        if self.is_union {
            self.place_field_at_offset(ByteUnits::ZERO);
            self.size = self.size.max(info.size);
        } else {
            let offset = self.size.align_to(info.alignment);
            self.place_field_at_offset(offset);
            self.size = offset + info.size;
        }
    }

    fn layout_bitfield(&mut self, field: &Field, width: BitUnits) {
        if width.is_zero() {
            self.layout_zero_width_bitfield(field);
            return;
        }

        let info = self.field_element_info(field);

        // Over-wide bit-fields are clamped to their type
        let width = width.min(info.size.to_bits());

        // MSVC never packs bit-fields whose types have different sizes into the same allocation
        if !self.is_union
            && self.last_field_is_non_zero_width_bitfield
            && self.current_bitfield_size == info.size
            && width <= self.remaining_bits_in_field
        {
            self.field_offsets
                .push(self.size.to_bits() - self.remaining_bits_in_field);
            self.remaining_bits_in_field -= width;
            return;
        }

        self.last_field_is_non_zero_width_bitfield = true;
        self.current_bitfield_size = info.size;

        if self.is_union {
            self.place_field_at_offset(ByteUnits::ZERO);
            self.size = self.size.max(info.size);
        } else {
            let offset = self.size.align_to(info.alignment);
            self.place_field_at_offset(offset);
            self.size = offset + info.size;
            self.remaining_bits_in_field = info.size.to_bits() - width;
        }
    }

    /// Zero-width bit-fields are ignored unless they follow a non-zero-width bit-field.
    fn layout_zero_width_bitfield(&mut self, field: &Field) {
        if !self.last_field_is_non_zero_width_bitfield {
            let offset = if self.is_union {
                ByteUnits::ZERO
            } else {
                self.size
            };

            self.place_field_at_offset(offset);
            return;
        }

        self.last_field_is_non_zero_width_bitfield = false;
        let info = self.field_element_info(field);

        if self.is_union {
            self.place_field_at_offset(ByteUnits::ZERO);
            self.size = self.size.max(info.size);
        } else {
            let offset = self.size.align_to(info.alignment);
            self.place_field_at_offset(offset);
            self.size = offset;
        }
    }

    fn place_field_at_offset(&mut self, offset: ByteUnits) {
        self.field_offsets.push(offset.to_bits());
    }

    fn inject_vbptr(&mut self) {
        if !self.has_vbptr || self.shared_vbptr_base.is_some() {
            return;
        }

        let injection_site = self.vbptr_offset;
        self.vbptr_offset = self.vbptr_offset.align_to(self.pointer_info.alignment);

        // Everything after the vbptr moves back by a multiple of the alignment
        let field_start = self.vbptr_offset + self.pointer_info.size;
        let offset = (field_start - injection_site).align_to(self.alignment);

        self.size += offset;

        for field_offset in self.field_offsets.iter_mut() {
            *field_offset += offset.to_bits();
        }

        for base_offset in self.bases.values_mut() {
            if *base_offset >= injection_site {
                *base_offset += offset;
            }
        }

        // A vbptr suppresses zero-sized objects outside of virtual bases
        self.has_zero_sized_subobject = false;
    }

    fn inject_vfptr(&mut self) {
        if !self.has_own_vfptr {
            return;
        }

        let offset = self.pointer_info.size.align_to(self.alignment);
        self.size += offset;

        for field_offset in self.field_offsets.iter_mut() {
            *field_offset += offset.to_bits();
        }

        if self.has_vbptr {
            self.vbptr_offset += offset;
        }

        for base_offset in self.bases.values_mut() {
            *base_offset += offset;
        }
    }

    fn inject_vptrs(&mut self) {
        if !(self.has_own_vfptr || (self.has_vbptr && self.shared_vbptr_base.is_none())) {
            return;
        }

        if !self.is_64_bit_mode || self.required_alignment <= ByteUnits::of(8) {
            // The vbptr goes in first, since it depends on the alignment from
            // before the vfptr is added
            self.inject_vbptr();
            self.inject_vfptr();
            self.alignment = self.alignment.max(self.pointer_info.alignment);
            return;
        }

        // In 64-bit mode, records with a required alignment above 8 are laid out
        // again from scratch with the vptrs leading
        let mut relayout = Self::new(self.cache, self.record);
        relayout.initialize_layout();
        relayout.initialize_cxx_layout();
        relayout.alignment = self.alignment.max(self.pointer_info.alignment);
        relayout.layout_with_leading_vptrs(self.has_own_vfptr);
        *self = relayout;
    }

    /// Places the vfptr first, then the non-virtual bases, then the vbptr as if
    /// it were a base, and finally the fields.
    fn layout_with_leading_vptrs(&mut self, has_own_vfptr: bool) {
        let asg = self.cache.asg;

        if has_own_vfptr {
            self.size = self.pointer_info.size;
        }

        self.layout_non_virtual_bases();

        if self.has_vbptr && self.shared_vbptr_base.is_none() {
            let mut penultimate_base = None;
            let mut last_base: Option<RecordRef> = None;

            for base in asg.records[self.record].bases() {
                if base.is_virtual {
                    continue;
                }

                if last_base.map_or(true, |last| self.bases[&base.record] > self.bases[&last]) {
                    penultimate_base = last_base;
                    last_base = Some(base.record);
                }
            }

            let last_layout = last_base.map(|base| self.cache.get_record_layout(base));
            let penultimate_layout = penultimate_base.map(|base| self.cache.get_record_layout(base));

            let last_is_zero_sized = last_layout.is_some_and(|layout| layout.data_size.is_zero());
            let penultimate_is_zero_sized =
                penultimate_layout.is_some_and(|layout| layout.data_size.is_zero());

            // When the last two non-virtual bases are zero-sized, the vbptr goes
            // before the padding between them
            self.vbptr_offset = self.size;

            if let (Some(last), true) = (last_base, last_is_zero_sized) {
                self.vbptr_offset = self.bases[&last];

                if let (Some(penultimate), true) = (penultimate_base, penultimate_is_zero_sized) {
                    self.vbptr_offset = self.bases[&penultimate];
                }
            }

            self.vbptr_offset = self.vbptr_offset.align_to(self.pointer_info.alignment);
            self.size = self.vbptr_offset + self.pointer_info.size;

            if let (Some(last), Some(last_layout), true) = (last_base, last_layout, last_is_zero_sized) {
                if penultimate_is_zero_sized {
                    self.size += ByteUnits::ONE;
                }

                if !last_layout.required_alignment.is_zero() {
                    self.size = self.size.align_to(last_layout.required_alignment);
                }

                self.bases.insert(last, self.size);
            }
        }

        self.layout_fields();

        // A vbptr suppresses zero-sized objects outside of virtual bases
        self.has_zero_sized_subobject = false;
    }

    fn layout_virtual_bases(&mut self) {
        if !self.has_vbptr {
            return;
        }

        let asg = self.cache.asg;

        // Vtordisps are always 4 bytes, even in 64-bit mode
        let vtordisp_size = ByteUnits::of(4);
        let vtordisp_alignment = self
            .clamp_to_pack(vtordisp_size)
            .max(self.required_alignment);

        let has_vtordisp_set = self.compute_vtordisp_set();
        let mut previous_base_layout: Option<&RecordLayout> = None;

        for vbase in asg.virtual_bases(self.record) {
            let layout = self.cache.get_record_layout(vbase);
            let has_vtordisp = has_vtordisp_set.contains(&vbase);

            // A trailing non-zero-width bit-field adds its allocation size again
            if self.last_field_is_non_zero_width_bitfield {
                self.size += self.current_bitfield_size;
            }

            if previous_base_layout.is_some_and(|previous| previous.has_zero_sized_subobject())
                && layout.leads_with_zero_sized_base()
            {
                self.size = self.size.align_to(vtordisp_alignment) + vtordisp_size;
            }

            if has_vtordisp {
                self.size = self.size.align_to(vtordisp_alignment) + vtordisp_size;
            }

            let info = self.base_element_info(layout);
            let offset = self.size.align_to(info.alignment);

            self.vbases.insert(vbase, VBaseInfo::new(offset, has_vtordisp));
            self.size = offset + layout.data_size;
            previous_base_layout = Some(layout);
        }
    }

    fn finalize_layout(&mut self) {
        // Required alignment is zero in 32-bit mode unless something asked for it
        if !self.required_alignment.is_zero() {
            self.alignment = self.alignment.max(self.required_alignment);
            self.size = self.size.align_to(self.alignment);
        }

        // Zero-sized records are as big as their alignment
        if self.size.is_zero() {
            self.has_zero_sized_subobject = true;
            self.leads_with_zero_sized_base = true;
            self.size = self.alignment;
        }
    }

    /// Virtual bases that need a vtordisp field placed in front of them.
    fn compute_vtordisp_set(&self) -> IndexSet<RecordRef> {
        let asg = self.cache.asg;
        let mut has_vtordisp_set = IndexSet::new();

        // Whatever our bases need a vtordisp for, we need one for too
        for base in asg.records[self.record].bases() {
            let layout = self.cache.get_record_layout(base.record);

            has_vtordisp_set.extend(
                layout
                    .vbase_offsets()
                    .filter(|(_, info)| info.has_vtordisp)
                    .map(|(vbase, _)| vbase),
            );
        }

        // Without a user-declared constructor or destructor, only inherited vtordisps apply
        if !asg.has_user_declared_constructor(self.record)
            && !asg.has_user_declared_destructor(self.record)
        {
            return has_vtordisp_set;
        }

        let mut work = asg.records[self.record]
            .cxx()
            .map(|cxx| {
                cxx.methods
                    .iter()
                    .copied()
                    .filter(|method| {
                        let method = &asg.methods[*method];
                        method.is_virtual && !method.kind.is_destructor()
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let mut seen = IndexSet::new();
        let mut bases_with_overridden_methods = IndexSet::new();

        while let Some(method) = work.pop() {
            if !seen.insert(method) {
                continue;
            }

            let method = &asg.methods[method];

            // A virtual method that overrides nothing lives in its parent's vtable
            if method.overridden.is_empty() {
                bases_with_overridden_methods.insert(method.parent);
            } else {
                work.extend(method.overridden.iter().copied());
            }
        }

        for vbase in asg.virtual_bases(self.record) {
            if !has_vtordisp_set.contains(&vbase)
                && self.requires_vtordisp(&bases_with_overridden_methods, vbase)
            {
                has_vtordisp_set.insert(vbase);
            }
        }

        has_vtordisp_set
    }

    /// Whether `record`, or one of its non-virtual bases, declares a method
    /// that the class being laid out overrides.
    fn requires_vtordisp(
        &self,
        bases_with_overridden_methods: &IndexSet<RecordRef>,
        record: RecordRef,
    ) -> bool {
        if bases_with_overridden_methods.contains(&record) {
            return true;
        }

        self.cache.asg.records[record].bases().iter().any(|base| {
            !base.is_virtual && self.requires_vtordisp(bases_with_overridden_methods, base.record)
        })
    }
}
