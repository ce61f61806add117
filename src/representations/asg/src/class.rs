use crate::{Access, Asg, MethodKind, RecordRef, Type, TypeRef};
use derive_more::IsVariant;
use itertools::Itertools;
use primitives::Builtin;

/// How the Microsoft ABI represents pointers to members of a class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, IsVariant)]
pub enum MsInheritanceModel {
    Single,
    Multiple,
    Virtual,
    Unspecified,
}

impl Asg {
    pub fn is_cxx_record(&self, record: RecordRef) -> bool {
        self.records[record].cxx().is_some()
    }

    /// C++ `[class]p4`: no non-static data members other than zero-width bit-fields,
    /// no virtual functions, no virtual bases, and only empty bases.
    pub fn is_empty_class(&self, record: RecordRef) -> bool {
        let record = &self.records[record];

        let Some(cxx) = record.cxx() else {
            return false;
        };

        record
            .fields()
            .iter()
            .all(|field| field.bit_width == Some(0))
            && cxx.methods.iter().all(|method| !self.methods[*method].is_virtual)
            && cxx
                .bases
                .iter()
                .all(|base| !base.is_virtual && self.is_empty_class(base.record))
    }

    /// Declares or inherits a virtual function.
    pub fn is_polymorphic(&self, record: RecordRef) -> bool {
        let Some(cxx) = self.records[record].cxx() else {
            return false;
        };

        cxx.methods.iter().any(|method| self.methods[*method].is_virtual)
            || cxx.bases.iter().any(|base| self.is_polymorphic(base.record))
    }

    /// Needs a vtable, either for virtual functions or for virtual bases.
    pub fn is_dynamic_class(&self, record: RecordRef) -> bool {
        self.is_polymorphic(record) || !self.virtual_bases(record).is_empty()
    }

    /// Every virtual base, direct or indirect, each listed once.
    ///
    /// The virtual bases inherited through a direct base come before that base
    /// itself, and direct bases are walked in declaration order.
    pub fn virtual_bases(&self, record: RecordRef) -> Vec<RecordRef> {
        let mut virtual_bases = Vec::new();

        for base in self.records[record].bases() {
            for inherited in self.virtual_bases(base.record) {
                if !virtual_bases.contains(&inherited) {
                    virtual_bases.push(inherited);
                }
            }

            if base.is_virtual && !virtual_bases.contains(&base.record) {
                virtual_bases.push(base.record);
            }
        }

        virtual_bases
    }

    pub fn has_user_declared_constructor(&self, record: RecordRef) -> bool {
        self.has_user_declared(record, MethodKind::Constructor)
    }

    pub fn has_user_declared_destructor(&self, record: RecordRef) -> bool {
        self.has_user_declared(record, MethodKind::Destructor)
    }

    fn has_user_declared(&self, record: RecordRef, kind: MethodKind) -> bool {
        self.records[record].cxx().is_some_and(|cxx| {
            cxx.methods.iter().any(|method| {
                let method = &self.methods[*method];
                method.kind == kind && !method.is_implicit
            })
        })
    }

    /// Plain old data in the C++03 sense: an aggregate whose members are all POD,
    /// with no user-declared constructor or destructor.
    pub fn is_pod(&self, record: RecordRef) -> bool {
        let record_ref = record;
        let record = &self.records[record];

        if record.cxx().is_none() {
            return true;
        }

        record.bases().is_empty()
            && !self.is_polymorphic(record_ref)
            && !self.has_user_declared_constructor(record_ref)
            && !self.has_user_declared_destructor(record_ref)
            && record.fields().iter().all(|field| {
                field.access == Access::Public && self.is_pod_type(field.ty)
            })
    }

    pub fn is_pod_type(&self, ty: TypeRef) -> bool {
        match &self.types[self.base_element_type(ty)] {
            Type::Record(record) => self.is_pod(*record),
            Type::LValueReference(_) | Type::RValueReference(_) => false,
            Type::Builtin(Builtin::Void) | Type::Function(_) => false,
            Type::TemplateParam(_) | Type::Error => false,
            _ => true,
        }
    }

    /// C++11 POD: trivial and standard-layout.
    pub fn is_trivial_and_standard_layout(&self, record: RecordRef) -> bool {
        self.is_trivial(record) && self.is_standard_layout(record)
    }

    pub fn is_trivial(&self, record: RecordRef) -> bool {
        let Some(cxx) = self.records[record].cxx() else {
            return true;
        };

        !self.is_dynamic_class(record)
            && !self.has_user_declared_constructor(record)
            && !self.has_user_declared_destructor(record)
            && cxx.bases.iter().all(|base| self.is_trivial(base.record))
            && self.records[record].fields().iter().all(|field| {
                self.as_record(self.base_element_type(field.ty))
                    .map_or(true, |field_record| self.is_trivial(field_record))
            })
    }

    pub fn is_standard_layout(&self, record: RecordRef) -> bool {
        let Some(cxx) = self.records[record].cxx() else {
            return true;
        };

        let fields = self.records[record].fields();

        if self.is_dynamic_class(record) {
            return false;
        }

        if !fields.iter().map(|field| field.access).all_equal() {
            return false;
        }

        if fields.iter().any(|field| match &self.types[self.base_element_type(field.ty)] {
            Type::Record(field_record) => !self.is_standard_layout(*field_record),
            Type::LValueReference(_) | Type::RValueReference(_) => true,
            _ => false,
        }) {
            return false;
        }

        if !cxx.bases.iter().all(|base| self.is_standard_layout(base.record)) {
            return false;
        }

        // Non-static data members may only live in one class of the hierarchy
        let bases_with_fields = cxx
            .bases
            .iter()
            .filter(|base| self.has_fields_in_hierarchy(base.record))
            .count();

        if bases_with_fields > 1 || (bases_with_fields == 1 && !fields.is_empty()) {
            return false;
        }

        // The first member may not share its type with a base
        let first_field_record = fields
            .first()
            .and_then(|field| self.as_record(self.base_element_type(field.ty)));

        first_field_record.map_or(true, |first| {
            !cxx.bases.iter().any(|base| base.record == first)
        })
    }

    fn has_fields_in_hierarchy(&self, record: RecordRef) -> bool {
        !self.records[record].fields().is_empty()
            || self.records[record]
                .bases()
                .iter()
                .any(|base| self.has_fields_in_hierarchy(base.record))
    }

    pub fn ms_inheritance_model(&self, record: RecordRef) -> MsInheritanceModel {
        if self.records[record].definition.is_none() {
            MsInheritanceModel::Unspecified
        } else if !self.virtual_bases(record).is_empty() {
            MsInheritanceModel::Virtual
        } else if self.uses_multiple_inheritance(record) {
            MsInheritanceModel::Multiple
        } else {
            MsInheritanceModel::Single
        }
    }

    fn uses_multiple_inheritance(&self, record: RecordRef) -> bool {
        let bases = self.records[record].bases();
        bases.len() > 1 || bases.iter().any(|base| self.uses_multiple_inheritance(base.record))
    }
}

#[test]
fn test_virtual_base_order() {
    use crate::{Base, RecordDefinition, RecordKind};

    let mut asg = Asg::new();
    let a = asg.add_record(RecordKind::Struct, Some("A"), RecordDefinition::cxx([], []));
    let b = asg.add_record(
        RecordKind::Struct,
        Some("B"),
        RecordDefinition::cxx([Base::virtual_base(a)], []),
    );
    let c = asg.add_record(
        RecordKind::Struct,
        Some("C"),
        RecordDefinition::cxx([Base::new(b), Base::virtual_base(b)], []),
    );

    assert_eq!(asg.virtual_bases(c), [a, b]);
    assert_eq!(asg.ms_inheritance_model(c), MsInheritanceModel::Virtual);
}

#[test]
fn test_empty_and_pod() {
    use crate::{Field, Method, RecordDefinition, RecordKind};
    use primitives::CInteger;

    let mut asg = Asg::new();
    let int = asg.builtin(Builtin::signed(CInteger::Int));

    let empty = asg.add_record(
        RecordKind::Struct,
        Some("Empty"),
        RecordDefinition::cxx([], [Field::unnamed_bitfield(int, 0)]),
    );
    assert!(asg.is_empty_class(empty));
    assert!(asg.is_pod(empty));

    let with_ctor =
        asg.add_record(RecordKind::Struct, Some("Ctor"), RecordDefinition::cxx([], [Field::new("x", int)]));
    asg.add_method(Method::new(with_ctor, "Ctor", MethodKind::Constructor));
    assert!(!asg.is_empty_class(with_ctor));
    assert!(!asg.is_pod(with_ctor));
    assert!(asg.is_standard_layout(with_ctor));

    let dynamic = asg.add_record(RecordKind::Struct, Some("Dyn"), RecordDefinition::cxx([], []));
    asg.add_method(Method::virtual_method(dynamic, "f"));
    assert!(asg.is_dynamic_class(dynamic));
    assert!(!asg.is_empty_class(dynamic));
}

#[test]
fn test_mixed_access_is_not_pod() {
    use crate::{Field, RecordDefinition, RecordKind};
    use primitives::CInteger;

    let mut asg = Asg::new();
    let int = asg.builtin(Builtin::signed(CInteger::Int));

    let all_private = asg.add_record(
        RecordKind::Class,
        Some("Private"),
        RecordDefinition::cxx(
            [],
            [
                Field::new("a", int).with_access(Access::Private),
                Field::new("b", int).with_access(Access::Private),
            ],
        ),
    );
    assert!(!asg.is_pod(all_private));
    assert!(asg.is_standard_layout(all_private));

    let mixed = asg.add_record(
        RecordKind::Struct,
        Some("Mixed"),
        RecordDefinition::cxx(
            [],
            [
                Field::new("a", int),
                Field::new("b", int).with_access(Access::Private),
            ],
        ),
    );
    assert!(!asg.is_pod(mixed));
    assert!(!asg.is_standard_layout(mixed));
    assert!(!asg.is_trivial_and_standard_layout(mixed));
}
