use crate::{BaseSubobjectRef, BaseSubobjects, TypeLayoutCache};
use asg::{Field, RecordRef, Type, TypeRef};
use data_units::ByteUnits;
use std::collections::HashMap;

/// Keeps track of the offsets of empty subobjects inside a C++ (but not C) class
/// being laid out, so that two subobjects of the same type never share an address.
#[derive(Debug)]
pub struct EmptySubobjectMap<'c, 'a> {
    cache: &'c TypeLayoutCache<'a>,
    class: RecordRef,
    empty_class_offsets: HashMap<ByteUnits, Vec<RecordRef>>,

    /// Highest offset known to contain an empty base subobject
    max_empty_class_offset: ByteUnits,

    /// Nothing at or past this offset can collide with an empty subobject
    pub size_of_largest_empty_subobject: ByteUnits,
}

impl<'c, 'a> EmptySubobjectMap<'c, 'a> {
    pub fn new(cache: &'c TypeLayoutCache<'a>, class: RecordRef) -> Self {
        let mut map = Self {
            cache,
            class,
            empty_class_offsets: HashMap::new(),
            max_empty_class_offset: ByteUnits::ZERO,
            size_of_largest_empty_subobject: ByteUnits::ZERO,
        };

        map.compute_empty_subobject_sizes();
        map
    }

    fn compute_empty_subobject_sizes(&mut self) {
        let asg = self.cache.asg;
        let record = &asg.records[self.class];

        let bases = record.bases().iter().map(|base| base.record);

        let field_records = record
            .fields()
            .iter()
            .filter_map(|field| asg.as_record(asg.base_element_type(field.ty)));

        for class in bases.chain(field_records) {
            let layout = self.cache.get_record_layout(class);

            let empty_size = if asg.is_empty_class(class) {
                layout.size
            } else {
                layout.size_of_largest_empty_subobject()
            };

            self.size_of_largest_empty_subobject =
                self.size_of_largest_empty_subobject.max(empty_size);
        }
    }

    fn any_empty_subobjects_beyond_offset(&self, offset: ByteUnits) -> bool {
        offset <= self.max_empty_class_offset
    }

    fn can_place_subobject_at_offset(&self, class: RecordRef, offset: ByteUnits) -> bool {
        if !self.cache.asg.is_empty_class(class) {
            return true;
        }

        self.empty_class_offsets
            .get(&offset)
            .map_or(true, |classes| !classes.contains(&class))
    }

    fn add_subobject_at_offset(&mut self, class: RecordRef, offset: ByteUnits) {
        if !self.cache.asg.is_empty_class(class) {
            return;
        }

        let classes = self.empty_class_offsets.entry(offset).or_default();

        if classes.contains(&class) {
            return;
        }

        classes.push(class);
        self.max_empty_class_offset = self.max_empty_class_offset.max(offset);
    }

    /// Checks whether a base can go at `offset`, and records it there if so.
    pub fn can_place_base_at_offset(
        &mut self,
        subobjects: &BaseSubobjects,
        info: BaseSubobjectRef,
        offset: ByteUnits,
    ) -> bool {
        // No empty subobjects means nothing can collide
        if self.size_of_largest_empty_subobject.is_zero() {
            return true;
        }

        if !self.can_place_base_subobject_at_offset(subobjects, info, offset) {
            return false;
        }

        let placing_empty_base = self.cache.asg.is_empty_class(subobjects[info].class);
        self.update_empty_base_subobjects(subobjects, info, offset, placing_empty_base);
        true
    }

    /// Checks whether a non-bit-field can go at `offset`, and records it there if so.
    pub fn can_place_field_at_offset(&mut self, field: &Field, offset: ByteUnits) -> bool {
        if !self.can_place_field_subobject_at_offset(field.ty, offset) {
            return false;
        }

        self.update_empty_field_subobjects(field.ty, offset);
        true
    }

    fn can_place_base_subobject_at_offset(
        &self,
        subobjects: &BaseSubobjects,
        info: BaseSubobjectRef,
        offset: ByteUnits,
    ) -> bool {
        if !self.any_empty_subobjects_beyond_offset(offset) {
            return true;
        }

        let class = subobjects[info].class;

        if !self.can_place_subobject_at_offset(class, offset) {
            return false;
        }

        let layout = self.cache.get_record_layout(class);

        for base in subobjects[info].bases.iter().copied() {
            if subobjects[base].is_virtual {
                continue;
            }

            let base_offset = offset + layout.base_offset(subobjects[base].class);

            if !self.can_place_base_subobject_at_offset(subobjects, base, base_offset) {
                return false;
            }
        }

        if let Some(primary) = subobjects.claimed_primary_virtual_base(info) {
            if !self.can_place_base_subobject_at_offset(subobjects, primary, offset) {
                return false;
            }
        }

        for (index, field) in self.cache.asg.records[class].fields().iter().enumerate() {
            if field.is_bitfield() {
                continue;
            }

            let field_offset = offset + layout.field_offset(index).to_bytes_floor();

            if !self.can_place_field_subobject_at_offset(field.ty, field_offset) {
                return false;
            }
        }

        true
    }

    fn update_empty_base_subobjects(
        &mut self,
        subobjects: &BaseSubobjects,
        info: BaseSubobjectRef,
        offset: ByteUnits,
        placing_empty_base: bool,
    ) {
        // Non-empty bases past the largest empty subobject can't overlap with anything tracked
        if !placing_empty_base && offset >= self.size_of_largest_empty_subobject {
            return;
        }

        let class = subobjects[info].class;
        self.add_subobject_at_offset(class, offset);

        let layout = self.cache.get_record_layout(class);

        for base in subobjects[info].bases.iter().copied() {
            if subobjects[base].is_virtual {
                continue;
            }

            let base_offset = offset + layout.base_offset(subobjects[base].class);
            self.update_empty_base_subobjects(subobjects, base, base_offset, placing_empty_base);
        }

        if let Some(primary) = subobjects.claimed_primary_virtual_base(info) {
            self.update_empty_base_subobjects(subobjects, primary, offset, placing_empty_base);
        }

        for (index, field) in self.cache.asg.records[class].fields().iter().enumerate() {
            if field.is_bitfield() {
                continue;
            }

            let field_offset = offset + layout.field_offset(index).to_bytes_floor();
            self.update_empty_field_subobjects(field.ty, field_offset);
        }
    }

    /// Checks a record reached through a field. `class` is the outermost such
    /// record, whose virtual bases are the only ones visited.
    fn can_place_record_subobject_at_offset(
        &self,
        record: RecordRef,
        class: RecordRef,
        offset: ByteUnits,
    ) -> bool {
        if !self.any_empty_subobjects_beyond_offset(offset) {
            return true;
        }

        if !self.can_place_subobject_at_offset(record, offset) {
            return false;
        }

        let asg = self.cache.asg;
        let layout = self.cache.get_record_layout(record);

        for base in asg.records[record].bases() {
            if base.is_virtual {
                continue;
            }

            let base_offset = offset + layout.base_offset(base.record);

            if !self.can_place_record_subobject_at_offset(base.record, class, base_offset) {
                return false;
            }
        }

        if record == class {
            for vbase in asg.virtual_bases(record) {
                let vbase_offset = offset + layout.vbase_offset(vbase);

                if !self.can_place_record_subobject_at_offset(vbase, class, vbase_offset) {
                    return false;
                }
            }
        }

        for (index, field) in asg.records[record].fields().iter().enumerate() {
            if field.is_bitfield() {
                continue;
            }

            let field_offset = offset + layout.field_offset(index).to_bytes_floor();

            if !self.can_place_field_subobject_at_offset(field.ty, field_offset) {
                return false;
            }
        }

        true
    }

    fn can_place_field_subobject_at_offset(&self, ty: TypeRef, offset: ByteUnits) -> bool {
        if !self.any_empty_subobjects_beyond_offset(offset) {
            return true;
        }

        let asg = self.cache.asg;

        if let Some(record) = asg.as_record(ty) {
            return self.can_place_record_subobject_at_offset(record, record, offset);
        }

        let Some((record, count)) = self.constant_array_of_records(ty) else {
            return true;
        };

        let element_size = self.cache.get_record_layout(record).size;
        let mut element_offset = offset;

        // Every element is its own subobject
        for _ in 0..count {
            if !self.any_empty_subobjects_beyond_offset(element_offset) {
                return true;
            }

            if !self.can_place_record_subobject_at_offset(record, record, element_offset) {
                return false;
            }

            element_offset += element_size;
        }

        true
    }

    fn update_empty_record_subobjects(
        &mut self,
        record: RecordRef,
        class: RecordRef,
        offset: ByteUnits,
    ) {
        if offset >= self.size_of_largest_empty_subobject {
            return;
        }

        self.add_subobject_at_offset(record, offset);

        let asg = self.cache.asg;
        let layout = self.cache.get_record_layout(record);

        for base in asg.records[record].bases() {
            if base.is_virtual {
                continue;
            }

            let base_offset = offset + layout.base_offset(base.record);
            self.update_empty_record_subobjects(base.record, class, base_offset);
        }

        if record == class {
            for vbase in asg.virtual_bases(record) {
                let vbase_offset = offset + layout.vbase_offset(vbase);
                self.update_empty_record_subobjects(vbase, class, vbase_offset);
            }
        }

        for (index, field) in asg.records[record].fields().iter().enumerate() {
            if field.is_bitfield() {
                continue;
            }

            let field_offset = offset + layout.field_offset(index).to_bytes_floor();
            self.update_empty_field_subobjects(field.ty, field_offset);
        }
    }

    fn update_empty_field_subobjects(&mut self, ty: TypeRef, offset: ByteUnits) {
        if let Some(record) = self.cache.asg.as_record(ty) {
            self.update_empty_record_subobjects(record, record, offset);
            return;
        }

        let Some((record, count)) = self.constant_array_of_records(ty) else {
            return;
        };

        let element_size = self.cache.get_record_layout(record).size;
        let mut element_offset = offset;

        for _ in 0..count {
            // Elements past the largest empty subobject can't collide with anything
            if element_offset >= self.size_of_largest_empty_subobject {
                return;
            }

            self.update_empty_record_subobjects(record, record, element_offset);
            element_offset += element_size;
        }
    }

    /// Element record and total element count of a (possibly nested) constant array.
    fn constant_array_of_records(&self, ty: TypeRef) -> Option<(RecordRef, u64)> {
        let asg = self.cache.asg;
        let mut ty = asg.canonical_type(ty);
        let mut count = 1;

        let Type::ConstantArray { .. } = asg.types[ty] else {
            return None;
        };

        while let Type::ConstantArray { element, count: length } = asg.types[ty] {
            count *= length;
            ty = asg.canonical_type(element);
        }

        asg.as_record(ty).map(|record| (record, count))
    }
}
