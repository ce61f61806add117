/*
    =======================  components/type_query/src/lib.rs  =======================
    Size, alignment, and offset queries over declarations, in the manner of libclang
    ------------------------------------------------------------------------------------
*/

mod error;

use asg::{Asg, Decl, Member, RecordRef, Type, TypeRef};
use data_units::{BitUnits, ByteUnits};
pub use error::TypeLayoutError;
use target_layout::TypeLayoutCache;

/// Read-only queries about types, backed by a layout cache.
#[derive(Copy, Clone, Debug)]
pub struct TypeQuery<'c, 'a> {
    cache: &'c TypeLayoutCache<'a>,
}

impl<'c, 'a> TypeQuery<'c, 'a> {
    pub fn new(cache: &'c TypeLayoutCache<'a>) -> Self {
        Self { cache }
    }

    fn asg(&self) -> &'a Asg {
        self.cache.asg
    }

    /// Type of a declaration. Typedefs give the type they alias.
    pub fn type_of_decl(&self, decl: Decl) -> Option<TypeRef> {
        let asg = self.asg();

        match decl {
            Decl::Record(record) => Some(asg.records[record].ty),
            Decl::Enum(enumeration) => Some(asg.enums[enumeration].ty),
            Decl::Typedef(typedef) => Some(asg.typedefs[typedef].becomes),
            Decl::Variable(variable) => Some(asg.variables[variable].ty),
            Decl::Field { record, index } => asg.records[record]
                .fields()
                .get(index)
                .map(|field| field.ty),
            Decl::Method(_) => None,
        }
    }

    pub fn canonical_type(&self, ty: TypeRef) -> TypeRef {
        self.asg().canonical_type(ty)
    }

    /// Size of a type in bytes, as `sizeof` would compute it.
    pub fn size_of(&self, ty: TypeRef) -> Result<ByteUnits, TypeLayoutError> {
        let asg = self.asg();
        let ty = self.non_reference_type(ty);

        if asg.is_invalid_type(ty) {
            return Err(TypeLayoutError::Invalid);
        }

        if asg.is_incomplete_type(ty) {
            return Err(TypeLayoutError::Incomplete);
        }

        if asg.is_dependent_type(ty) {
            return Err(TypeLayoutError::Dependent);
        }

        if !self.is_constant_size(ty) {
            return Err(TypeLayoutError::NotConstantSize);
        }

        // GCC extension, `sizeof` of a function is 1
        if asg.types[asg.canonical_type(ty)].is_function() {
            return Ok(ByteUnits::ONE);
        }

        Ok(self.cache.get(ty).width)
    }

    /// Alignment of a type in bytes, as `alignof` would compute it.
    pub fn align_of(&self, ty: TypeRef) -> Result<ByteUnits, TypeLayoutError> {
        let asg = self.asg();
        let ty = self.non_reference_type(ty);

        if asg.is_invalid_type(ty) {
            return Err(TypeLayoutError::Invalid);
        }

        if asg.is_incomplete_type(ty) {
            return Err(TypeLayoutError::Incomplete);
        }

        if asg.is_dependent_type(ty) {
            return Err(TypeLayoutError::Dependent);
        }

        Ok(self.cache.get(ty).alignment)
    }

    /// Offset in bits of the field `field_name` inside a record type, looking
    /// through anonymous structs and unions.
    pub fn offset_of(
        &self,
        record_ty: TypeRef,
        field_name: &str,
    ) -> Result<BitUnits, TypeLayoutError> {
        let record = self.validate_field_parent(record_ty)?;

        match &self.asg().lookup_member(record, field_name)[..] {
            [Member::Field(field)] => Ok(self.cache.field_offset(field.record, field.index)),
            [Member::IndirectField(chain)] => Ok(self.cache.indirect_field_offset(chain)),
            found => {
                log::debug!(
                    "'{}' names {} members of {}, expected a single field",
                    field_name,
                    found.len(),
                    self.asg().records[record].friendly_name()
                );
                Err(TypeLayoutError::InvalidFieldName)
            }
        }
    }

    /// Offset in bits of a field declaration inside its parent record.
    pub fn offset_of_field(&self, field: Decl) -> Result<BitUnits, TypeLayoutError> {
        let Decl::Field { record, index } = field else {
            return Err(TypeLayoutError::Invalid);
        };

        let record = self.validate_field_parent(self.asg().records[record].ty)?;
        Ok(self.cache.field_offset(record, index))
    }

    pub fn pointee_type(&self, ty: TypeRef) -> Option<TypeRef> {
        match &self.asg().types[ty] {
            Type::Pointer(pointee)
            | Type::BlockPointer(pointee)
            | Type::LValueReference(pointee)
            | Type::RValueReference(pointee)
            | Type::MemberPointer { pointee, .. } => Some(*pointee),
            Type::Elaborated(inner) => self.pointee_type(*inner),
            _ => None,
        }
    }

    /// Element type of an array, vector, or complex type.
    pub fn element_type(&self, ty: TypeRef) -> Option<TypeRef> {
        match &self.asg().types[ty] {
            Type::ConstantArray { element, .. }
            | Type::IncompleteArray(element)
            | Type::VariableArray(element)
            | Type::DependentSizedArray(element)
            | Type::Vector { element, .. }
            | Type::Complex(element) => Some(*element),
            _ => None,
        }
    }

    pub fn num_elements(&self, ty: TypeRef) -> Option<u64> {
        match &self.asg().types[ty] {
            Type::ConstantArray { count, .. } | Type::Vector { count, .. } => Some(*count),
            _ => None,
        }
    }

    pub fn array_element_type(&self, ty: TypeRef) -> Option<TypeRef> {
        self.asg().types[ty].array_element()
    }

    pub fn array_size(&self, ty: TypeRef) -> Option<u64> {
        match &self.asg().types[ty] {
            Type::ConstantArray { count, .. } => Some(*count),
            _ => None,
        }
    }

    /// Class that a member pointer points into.
    pub fn class_type(&self, ty: TypeRef) -> Option<TypeRef> {
        match &self.asg().types[ty] {
            Type::MemberPointer { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// Declaration that introduces a type, looking through elaborated sugar.
    pub fn type_declaration(&self, ty: TypeRef) -> Option<Decl> {
        match &self.asg().types[ty] {
            Type::Record(record) => Some(Decl::Record(*record)),
            Type::Enum(enumeration) => Some(Decl::Enum(*enumeration)),
            Type::Typedef(typedef) => Some(Decl::Typedef(*typedef)),
            Type::Elaborated(inner) => self.type_declaration(*inner),
            _ => None,
        }
    }

    pub fn field_bit_width(&self, field: Decl) -> Option<u64> {
        let Decl::Field { record, index } = field else {
            return None;
        };

        self.asg().records[record].fields().get(index)?.bit_width
    }

    pub fn is_bit_field(&self, field: Decl) -> bool {
        self.field_bit_width(field).is_some()
    }

    fn non_reference_type(&self, ty: TypeRef) -> TypeRef {
        let asg = self.asg();

        match &asg.types[asg.canonical_type(ty)] {
            Type::LValueReference(referee) | Type::RValueReference(referee) => *referee,
            _ => ty,
        }
    }

    fn is_constant_size(&self, ty: TypeRef) -> bool {
        let asg = self.asg();

        match &asg.types[asg.canonical_type(ty)] {
            Type::VariableArray(_) => false,
            Type::ConstantArray { element, .. } => self.is_constant_size(*element),
            _ => true,
        }
    }

    fn validate_field_parent(&self, record_ty: TypeRef) -> Result<RecordRef, TypeLayoutError> {
        let asg = self.asg();

        if asg.is_invalid_type(record_ty) {
            return Err(TypeLayoutError::Invalid);
        }

        // A typedef names a typedef declaration rather than the record it aliases
        let Some(Decl::Record(record)) = self.type_declaration(record_ty) else {
            return Err(TypeLayoutError::Invalid);
        };

        let declaration = &asg.records[record];

        if declaration.definition.is_none() {
            return Err(TypeLayoutError::Incomplete);
        }

        if declaration.is_dependent {
            return Err(TypeLayoutError::Dependent);
        }

        self.validate_record_fields(record)?;
        Ok(record)
    }

    fn validate_record_fields(&self, record: RecordRef) -> Result<(), TypeLayoutError> {
        let asg = self.asg();

        for field in asg.records[record].fields() {
            if asg.is_invalid_type(field.ty) {
                return Err(TypeLayoutError::Invalid);
            }

            if asg.is_incomplete_type(field.ty) {
                return Err(TypeLayoutError::Incomplete);
            }

            if asg.is_dependent_type(field.ty) {
                return Err(TypeLayoutError::Dependent);
            }

            if let Some(child) = asg.as_record(field.ty) {
                self.validate_record_fields(child)?;
            }
        }

        Ok(())
    }
}
