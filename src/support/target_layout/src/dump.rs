use crate::TypeLayoutCache;
use asg::RecordRef;
use data_units::ByteUnits;
use itertools::Itertools;
use std::fmt::{Display, Formatter};

impl<'a> TypeLayoutCache<'a> {
    /// Renders the layout of a record in the same format as `-fdump-record-layouts`.
    ///
    /// C++ records are shown as a tree of their subobjects unless `simple` is set.
    pub fn dump_record_layout(&self, record: RecordRef, simple: bool) -> String {
        RecordLayoutDump {
            cache: self,
            record,
            simple,
        }
        .to_string()
    }
}

struct RecordLayoutDump<'c, 'a> {
    cache: &'c TypeLayoutCache<'a>,
    record: RecordRef,
    simple: bool,
}

impl Display for RecordLayoutDump<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.simple && self.cache.asg.is_cxx_record(self.record) {
            let mut dumper = CxxRecordDumper {
                cache: self.cache,
                ms_layout: self.cache.uses_microsoft_layout(),
                f,
            };

            return dumper.dump(self.record, ByteUnits::ZERO, 0, None, true);
        }

        let asg = self.cache.asg;
        let layout = self.cache.get_record_layout(self.record);
        let ty = asg.display_type(asg.records[self.record].ty);

        writeln!(f, "Type: {}", ty)?;
        writeln!(f)?;
        writeln!(f, "Layout: <ASTRecordLayout")?;
        writeln!(f, "  Size:{}", layout.size_in_bits())?;

        if !self.cache.uses_microsoft_layout() {
            writeln!(f, "  DataSize:{}", layout.data_size_in_bits())?;
        }

        writeln!(f, "  Alignment:{}", layout.alignment_in_bits())?;
        writeln!(
            f,
            "  FieldOffsets: [{}]>",
            layout.field_offsets.iter().join(", ")
        )
    }
}

struct CxxRecordDumper<'c, 'a, 'f, 'w> {
    cache: &'c TypeLayoutCache<'a>,
    ms_layout: bool,
    f: &'f mut Formatter<'w>,
}

impl CxxRecordDumper<'_, '_, '_, '_> {
    fn print_offset(&mut self, offset: ByteUnits, indent: usize) -> std::fmt::Result {
        write!(self.f, "{:>4} | {:indent$}", offset.bytes(), "", indent = indent * 2)
    }

    fn print_indent_without_offset(&mut self, indent: usize) -> std::fmt::Result {
        write!(self.f, "     | {:indent$}", "", indent = indent * 2)
    }

    fn short_name(&self, record: RecordRef) -> String {
        self.cache.asg.records[record]
            .name
            .clone()
            .unwrap_or_else(|| "(anonymous)".into())
    }

    fn dump(
        &mut self,
        record: RecordRef,
        offset: ByteUnits,
        indent: usize,
        description: Option<&str>,
        include_virtual_bases: bool,
    ) -> std::fmt::Result {
        let asg = self.cache.asg;
        let layout = self.cache.get_record_layout(record);
        let declaration = &asg.records[record];

        self.print_offset(offset, indent)?;
        write!(self.f, "{}", asg.display_type(declaration.ty))?;

        if let Some(description) = description {
            write!(self.f, " {}", description)?;
        }

        if asg.is_empty_class(record) {
            write!(self.f, " (empty)")?;
        }

        writeln!(self.f)?;

        let indent = indent + 1;
        let primary_base = layout.primary_base();

        if asg.is_dynamic_class(record) && primary_base.is_none() && !self.ms_layout {
            self.print_offset(offset, indent)?;
            let name = self.short_name(record);
            writeln!(self.f, "({} vtable pointer)", name)?;
        } else if layout.has_own_vfptr() {
            self.print_offset(offset, indent)?;
            let name = self.short_name(record);
            writeln!(self.f, "({} vftable pointer)", name)?;
        }

        for base in declaration.bases() {
            if base.is_virtual {
                continue;
            }

            let description = if Some(base.record) == primary_base {
                "(primary base)"
            } else {
                "(base)"
            };

            let base_offset = offset + layout.base_offset(base.record);
            self.dump(base.record, base_offset, indent, Some(description), false)?;
        }

        if layout.has_own_vbptr() {
            let vbptr_offset = offset + layout.vbptr_offset().unwrap_or(ByteUnits::ZERO);
            self.print_offset(vbptr_offset, indent)?;
            let name = self.short_name(record);
            writeln!(self.f, "({} vbtable pointer)", name)?;
        }

        for (index, field) in declaration.fields().iter().enumerate() {
            let field_offset = offset + layout.field_offset(index).to_bytes_floor();
            let name = field.name.as_deref().unwrap_or("");

            match asg.as_record(field.ty) {
                Some(field_record) if asg.is_cxx_record(field_record) => {
                    self.dump(field_record, field_offset, indent, Some(name), true)?;
                }
                _ => {
                    self.print_offset(field_offset, indent)?;
                    writeln!(self.f, "{} {}", asg.display_type(field.ty), name)?;
                }
            }
        }

        if !include_virtual_bases {
            return Ok(());
        }

        for vbase in asg.virtual_bases(record) {
            let info = layout.vbase_info(vbase);
            let vbase_offset = offset + info.offset;

            if info.has_vtordisp {
                self.print_offset(vbase_offset - ByteUnits::of(4), indent)?;
                let name = self.short_name(vbase);
                writeln!(self.f, "(vtordisp for vbase {})", name)?;
            }

            let description = if Some(vbase) == primary_base {
                "(primary virtual base)"
            } else {
                "(virtual base)"
            };

            self.dump(vbase, vbase_offset, indent, Some(description), false)?;
        }

        self.print_indent_without_offset(indent - 1)?;
        write!(self.f, "[sizeof={}", layout.size)?;

        if !self.ms_layout {
            write!(self.f, ", dsize={}", layout.data_size)?;
        }

        writeln!(self.f, ", align={}", layout.alignment)?;

        self.print_indent_without_offset(indent - 1)?;
        writeln!(
            self.f,
            " nvsize={}, nvalign={}]",
            layout.non_virtual_size(),
            layout.non_virtual_alignment()
        )?;
        writeln!(self.f)
    }
}
