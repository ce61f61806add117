/*
    ========================  representations/asg/src/lib.rs  ========================
    Declaration tree consumed by record layout and type queries
    -----------------------------------------------------------------------------------
*/

mod class;
mod decl;
mod display;
mod enumeration;
mod lookup;
mod method;
mod record;
mod ty;
mod typedef;
mod variable;

use arena::{Arena, Idx, new_id_with_niche};
pub use class::MsInheritanceModel;
use data_units::ByteUnits;
pub use decl::Decl;
pub use enumeration::Enum;
pub use lookup::{FieldRef, Member};
pub use method::{Method, MethodKind};
use primitives::Builtin;
pub use record::*;
use std::collections::HashMap;
pub use ty::{FunctionType, Type};
pub use typedef::Typedef;
pub use variable::Variable;

new_id_with_niche!(TypeId, u32);
new_id_with_niche!(RecordId, u32);
new_id_with_niche!(MethodId, u32);
new_id_with_niche!(EnumId, u32);
new_id_with_niche!(TypedefId, u32);
new_id_with_niche!(VariableId, u32);

pub type TypeRef = Idx<TypeId, Type>;
pub type RecordRef = Idx<RecordId, Record>;
pub type MethodRef = Idx<MethodId, Method>;
pub type EnumRef = Idx<EnumId, Enum>;
pub type TypedefRef = Idx<TypedefId, Typedef>;
pub type VariableRef = Idx<VariableId, Variable>;

#[derive(Clone, Debug, Default)]
pub struct Asg {
    pub types: Arena<TypeId, Type>,
    pub records: Arena<RecordId, Record>,
    pub methods: Arena<MethodId, Method>,
    pub enums: Arena<EnumId, Enum>,
    pub typedefs: Arena<TypedefId, Typedef>,
    pub variables: Arena<VariableId, Variable>,
    builtins: HashMap<Builtin, TypeRef>,
}

impl Asg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, ty: Type) -> TypeRef {
        if let Type::Builtin(builtin) = ty {
            return self.builtin(builtin);
        }

        self.types.alloc(ty)
    }

    pub fn builtin(&mut self, builtin: impl Into<Builtin>) -> TypeRef {
        let builtin = builtin.into();

        *self
            .builtins
            .entry(builtin)
            .or_insert_with(|| self.types.alloc(Type::Builtin(builtin)))
    }

    pub fn pointer_to(&mut self, pointee: TypeRef) -> TypeRef {
        self.types.alloc(Type::Pointer(pointee))
    }

    pub fn reference_to(&mut self, referee: TypeRef) -> TypeRef {
        self.types.alloc(Type::LValueReference(referee))
    }

    pub fn array_of(&mut self, element: TypeRef, count: u64) -> TypeRef {
        self.types.alloc(Type::ConstantArray { element, count })
    }

    /// Declares a record without a definition. The record stays forward-declared
    /// until [`Asg::define_record`] is called.
    pub fn declare_record(&mut self, kind: RecordKind, name: Option<&str>) -> RecordRef {
        let ty = self.types.alloc(Type::Error);

        let record = self.records.alloc(Record {
            name: name.map(str::to_string),
            kind,
            ty,
            definition: None,
            is_invalid: false,
            is_dependent: false,
        });

        self.types[ty] = Type::Record(record);
        record
    }

    pub fn define_record(&mut self, record: RecordRef, definition: RecordDefinition) {
        let record = &mut self.records[record];
        assert!(
            record.definition.is_none(),
            "{} is already defined",
            record.friendly_name()
        );
        record.definition = Some(definition);
    }

    pub fn add_record(
        &mut self,
        kind: RecordKind,
        name: Option<&str>,
        definition: RecordDefinition,
    ) -> RecordRef {
        let record = self.declare_record(kind, name);
        self.define_record(record, definition);
        record
    }

    /// Adds a method and attaches it to the C++ definition of its parent.
    pub fn add_method(&mut self, method: Method) -> MethodRef {
        let parent = method.parent;
        let method = self.methods.alloc(method);

        let Some(cxx) = self.records[parent]
            .definition
            .as_mut()
            .and_then(|definition| definition.cxx.as_mut())
        else {
            panic!("methods can only be added to defined C++ records");
        };

        cxx.methods.push(method);
        method
    }

    pub fn add_enum(&mut self, name: Option<&str>, underlying: Option<TypeRef>) -> EnumRef {
        let ty = self.types.alloc(Type::Error);
        let enumeration = self.enums.alloc(Enum {
            name: name.map(str::to_string),
            ty,
            underlying,
        });

        self.types[ty] = Type::Enum(enumeration);
        enumeration
    }

    pub fn add_typedef(
        &mut self,
        name: &str,
        becomes: TypeRef,
        max_alignment: Option<ByteUnits>,
    ) -> TypedefRef {
        let ty = self.types.alloc(Type::Error);
        let typedef = self.typedefs.alloc(Typedef {
            name: name.into(),
            ty,
            becomes,
            max_alignment,
        });

        self.types[ty] = Type::Typedef(typedef);
        typedef
    }

    pub fn add_variable(&mut self, name: &str, ty: TypeRef) -> VariableRef {
        self.variables.alloc(Variable {
            name: name.into(),
            ty,
        })
    }

    pub fn record_type(&self, record: RecordRef) -> TypeRef {
        self.records[record].ty
    }

    /// Strips typedefs and elaborated-type sugar.
    pub fn canonical_type(&self, mut ty: TypeRef) -> TypeRef {
        loop {
            match &self.types[ty] {
                Type::Typedef(typedef) => ty = self.typedefs[*typedef].becomes,
                Type::Elaborated(inner) => ty = *inner,
                _ => return ty,
            }
        }
    }

    /// The record named by a type, looking through sugar.
    pub fn as_record(&self, ty: TypeRef) -> Option<RecordRef> {
        match &self.types[self.canonical_type(ty)] {
            Type::Record(record) => Some(*record),
            _ => None,
        }
    }

    /// Innermost element type of a (possibly nested) array, or the type itself.
    pub fn base_element_type(&self, ty: TypeRef) -> TypeRef {
        let mut ty = self.canonical_type(ty);

        while let Some(element) = self.types[ty].array_element() {
            ty = self.canonical_type(element);
        }

        ty
    }

    /// Whether a type cannot be laid out because its definition is missing.
    pub fn is_incomplete_type(&self, ty: TypeRef) -> bool {
        match &self.types[self.canonical_type(ty)] {
            Type::Builtin(Builtin::Void) => true,
            Type::IncompleteArray(_) => true,
            Type::ConstantArray { element, .. } => self.is_incomplete_type(*element),
            Type::Record(record) => self.records[*record].definition.is_none(),
            Type::Enum(enumeration) => self.enums[*enumeration].underlying.is_none(),
            _ => false,
        }
    }

    pub fn is_dependent_type(&self, ty: TypeRef) -> bool {
        match &self.types[self.canonical_type(ty)] {
            Type::TemplateParam(_) | Type::DependentSizedArray(_) => true,
            Type::Pointer(inner)
            | Type::BlockPointer(inner)
            | Type::LValueReference(inner)
            | Type::RValueReference(inner)
            | Type::IncompleteArray(inner)
            | Type::VariableArray(inner)
            | Type::Complex(inner)
            | Type::ConstantArray { element: inner, .. }
            | Type::Vector { element: inner, .. } => self.is_dependent_type(*inner),
            Type::MemberPointer { pointee, class } => {
                self.is_dependent_type(*pointee) || self.is_dependent_type(*class)
            }
            Type::Record(record) => self.records[*record].is_dependent,
            Type::Builtin(_)
            | Type::Enum(_)
            | Type::Typedef(_)
            | Type::Elaborated(_)
            | Type::Function(_)
            | Type::Error => false,
        }
    }

    pub fn is_invalid_type(&self, ty: TypeRef) -> bool {
        match &self.types[self.canonical_type(ty)] {
            Type::Error => true,
            Type::Record(record) => self.records[*record].is_invalid,
            _ => false,
        }
    }
}

#[test]
fn test_builtins_are_interned() {
    use primitives::{CInteger, IntegerSign};

    let mut asg = Asg::new();
    let a = asg.builtin(Builtin::signed(CInteger::Int));
    let b = asg.add_type(Type::Builtin(Builtin::Integer(
        CInteger::Int,
        IntegerSign::Signed,
    )));
    assert_eq!(a, b);
}

#[test]
fn test_declared_record_type_points_back() {
    let mut asg = Asg::new();
    let record = asg.declare_record(RecordKind::Struct, Some("S"));
    let ty = asg.record_type(record);

    assert_eq!(asg.types[ty], Type::Record(record));
    assert!(asg.is_incomplete_type(ty));

    asg.define_record(record, RecordDefinition::c([]));
    assert!(!asg.is_incomplete_type(ty));
}

#[test]
fn test_canonical_type_strips_sugar() {
    let mut asg = Asg::new();
    let int = asg.builtin(Builtin::signed(primitives::CInteger::Int));
    let typedef = asg.add_typedef("my_int", int, None);
    let typedef_ty = asg.typedefs[typedef].ty;
    let elaborated = asg.add_type(Type::Elaborated(typedef_ty));

    assert_eq!(asg.canonical_type(elaborated), int);
}
