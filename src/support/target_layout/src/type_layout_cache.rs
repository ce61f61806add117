use crate::{
    AlignRequirement, ExternalLayoutSource, ItaniumRecordLayoutBuilder, LayoutOptions,
    MicrosoftRecordLayoutBuilder, RecordLayout, TargetLayout, TypeLayout,
};
use asg::{Asg, FieldRef, MsInheritanceModel, RecordRef, Type, TypeRef};
use data_units::{BitUnits, ByteUnits};
use derivative::Derivative;
use diagnostics::Diagnostics;
use once_map::unsync::OnceMap;
use std::cell::Cell;
use target::{CxxAbi, Target};

/// Memoized layouts of types and records for a single target.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct TypeLayoutCache<'a> {
    types: OnceMap<TypeRef, TypeLayout>,
    records: OnceMap<RecordRef, Box<RecordLayout>>,
    pub target: Target,
    pub asg: &'a Asg,
    pub options: LayoutOptions,
    pub diagnostics: &'a Diagnostics,

    #[derivative(Debug = "ignore")]
    external: Option<&'a dyn ExternalLayoutSource>,
}

impl<'a> TypeLayoutCache<'a> {
    pub fn new(
        target: Target,
        asg: &'a Asg,
        options: LayoutOptions,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Self {
            types: OnceMap::new(),
            records: OnceMap::new(),
            target,
            asg,
            options,
            diagnostics,
            external: None,
        }
    }

    /// Takes record layouts from `external` whenever it has one.
    pub fn with_external_source(self, external: &'a dyn ExternalLayoutSource) -> Self {
        Self {
            external: Some(external),
            ..self
        }
    }

    pub fn get(&self, ty: TypeRef) -> TypeLayout {
        self.types
            .map_insert_ref(&ty, |ty| *ty, |ty| self.get_impl(*ty), |_ty, layout| *layout)
    }

    fn get_impl(&self, ty: TypeRef) -> TypeLayout {
        match &self.asg.types[ty] {
            Type::Builtin(builtin) => self.target.builtin_layout(*builtin),
            Type::Pointer(_)
            | Type::BlockPointer(_)
            | Type::LValueReference(_)
            | Type::RValueReference(_) => self.target.pointer_layout(),
            Type::MemberPointer { pointee, class } => self.member_pointer_layout(*pointee, *class),
            Type::ConstantArray { element, count } => {
                let element = self.get(*element);

                TypeLayout {
                    width: element.width * *count,
                    ..element
                }
            }
            Type::IncompleteArray(element) | Type::VariableArray(element) => {
                let element = self.get(*element);

                TypeLayout {
                    width: ByteUnits::ZERO,
                    ..element
                }
            }
            Type::Vector { element, count } => {
                let width = self.get(*element).width * *count;
                let alignment = width.next_power_of_two();

                TypeLayout {
                    width: width.align_to(alignment),
                    alignment,
                    unadjusted_alignment: alignment,
                    align_requirement: AlignRequirement::None,
                }
            }
            Type::Complex(element) => {
                let element = self.get(*element);

                TypeLayout {
                    width: element.width * 2,
                    ..element
                }
            }
            Type::Record(record) => {
                let layout = self.get_record_layout(*record);

                let align_requirement = if self.asg.records[*record]
                    .attributes()
                    .max_alignment
                    .is_some()
                {
                    AlignRequirement::RequiredByRecordAttribute
                } else {
                    AlignRequirement::None
                };

                TypeLayout {
                    width: layout.size,
                    alignment: layout.alignment,
                    unadjusted_alignment: layout.alignment,
                    align_requirement,
                }
            }
            Type::Enum(enumeration) => {
                let enumeration = &self.asg.enums[*enumeration];

                let Some(underlying) = enumeration.underlying else {
                    panic!(
                        "cannot compute layout of incomplete enum {}",
                        enumeration.name.as_deref().unwrap_or("(anonymous)")
                    );
                };

                self.get(underlying)
            }
            Type::Typedef(typedef) => {
                let typedef = &self.asg.typedefs[*typedef];
                let layout = self.get(typedef.becomes);

                match typedef.max_alignment {
                    Some(alignment) => TypeLayout {
                        alignment,
                        align_requirement: AlignRequirement::RequiredByTypedefAttribute,
                        ..layout
                    },
                    None => layout,
                }
            }
            Type::Elaborated(inner) => self.get(*inner),
            // GCC allows `sizeof` and `alignof` on functions
            Type::Function(_) => TypeLayout::aligned(ByteUnits::ZERO, ByteUnits::of(4)),
            Type::DependentSizedArray(_) | Type::TemplateParam(_) => {
                panic!(
                    "cannot compute layout of dependent type '{}'",
                    self.asg.display_type(ty)
                )
            }
            Type::Error => panic!("cannot compute layout of invalid type"),
        }
    }

    fn member_pointer_layout(&self, pointee: TypeRef, class: TypeRef) -> TypeLayout {
        let pointer = self.target.pointer_layout();
        let is_function = self.asg.types[self.asg.canonical_type(pointee)].is_function();

        match self.target.cxx_abi() {
            CxxAbi::Itanium if is_function => {
                TypeLayout::aligned(pointer.width * 2, pointer.alignment)
            }
            CxxAbi::Itanium => pointer,
            CxxAbi::Microsoft => {
                let model = self
                    .asg
                    .as_record(class)
                    .map_or(MsInheritanceModel::Unspecified, |record| {
                        self.asg.ms_inheritance_model(record)
                    });

                let int = self.target.int_layout();
                let pointers = u64::from(is_function);

                // Data member pointers are a field offset, function ones a code pointer,
                // followed by whatever adjustments the inheritance model needs
                let ints = u64::from(!is_function)
                    + u64::from(is_function && model >= MsInheritanceModel::Multiple)
                    + u64::from(model == MsInheritanceModel::Unspecified)
                    + u64::from(model >= MsInheritanceModel::Virtual);

                let width = pointer.width * pointers + int.width * ints;

                let alignment = if pointers != 0 {
                    pointer.alignment
                } else {
                    int.alignment
                };

                let width = if self.target.is_64_bit() {
                    width.align_to(alignment)
                } else {
                    width
                };

                TypeLayout::aligned(width, alignment)
            }
        }
    }

    /// Computes the layout of a record, or returns the one already computed.
    ///
    /// The record must be defined, valid, and not dependent. Newly computed
    /// layouts are logged when `dump_record_layouts` is enabled.
    pub fn get_record_layout(&self, record: RecordRef) -> &RecordLayout {
        let computed = Cell::new(false);

        let layout = self.records.insert(record, |record| {
            computed.set(true);
            Box::new(self.compute_record_layout(*record))
        });

        if computed.get() && self.options.dump_record_layouts {
            log::info!(
                "\n*** Dumping AST Record Layout\n{}",
                self.dump_record_layout(record, false)
            );
        }

        layout
    }

    fn compute_record_layout(&self, record: RecordRef) -> RecordLayout {
        let declaration = &self.asg.records[record];
        let name = declaration.friendly_name();

        assert!(
            declaration.definition.is_some(),
            "cannot lay out forward-declared {}",
            name
        );
        assert!(!declaration.is_invalid, "cannot lay out invalid {}", name);
        assert!(
            !declaration.is_dependent,
            "cannot lay out dependent {}",
            name
        );

        log::trace!("computing record layout of {}", name);

        let layout = if self.uses_microsoft_layout() {
            log::debug!("using Microsoft record layout for {}", name);
            MicrosoftRecordLayoutBuilder::generate(self, record)
        } else {
            let external = self
                .external
                .and_then(|external| external.layout_record(self.asg, record));

            if external.is_some() {
                log::debug!("using external record layout for {}", name);
            }

            ItaniumRecordLayoutBuilder::generate(self, record, external)
        };

        log::trace!(
            "computed record layout of {} (size {}, alignment {})",
            name,
            layout.size,
            layout.alignment
        );

        layout
    }

    /// Externally-supplied layouts always go through the Itanium engine.
    pub fn uses_microsoft_layout(&self) -> bool {
        self.target.cxx_abi() == CxxAbi::Microsoft && self.external.is_none()
    }

    /// Whether a class holds nothing but a vtable pointer.
    pub fn is_nearly_empty(&self, record: RecordRef) -> bool {
        self.asg.is_dynamic_class(record)
            && self.get_record_layout(record).non_virtual_size() == self.target.pointer_width()
    }

    pub fn field_offset(&self, record: RecordRef, index: usize) -> BitUnits {
        self.get_record_layout(record).field_offset(index)
    }

    /// Offset of a field reached through anonymous structs and unions, relative
    /// to the outermost record of the chain.
    pub fn indirect_field_offset(&self, chain: &[FieldRef]) -> BitUnits {
        chain
            .iter()
            .map(|field| self.field_offset(field.record, field.index))
            .sum()
    }
}
