use crate::{Asg, MethodRef, RecordRef};

/// Position of a field inside a record definition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub record: RecordRef,
    pub index: usize,
}

/// What a member name inside a record refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Member {
    Field(FieldRef),

    /// A field reached through one or more anonymous struct or union members.
    /// The chain starts at the anonymous member of the searched record and ends
    /// at the named field.
    IndirectField(Vec<FieldRef>),

    Method(MethodRef),
}

impl Asg {
    /// Every member declared in `record` under `name`, including fields that
    /// anonymous members make visible.
    pub fn lookup_member(&self, record: RecordRef, name: &str) -> Vec<Member> {
        let mut found = Vec::new();

        for (index, field) in self.records[record].fields().iter().enumerate() {
            let here = FieldRef { record, index };

            if field.name.as_deref() == Some(name) {
                found.push(Member::Field(here));
                continue;
            }

            let Some(anonymous) = self.anonymous_member_record(record, index) else {
                continue;
            };

            for member in self.lookup_member(anonymous, name) {
                let chain = match member {
                    Member::Field(inner) => vec![here, inner],
                    Member::IndirectField(inner) => std::iter::once(here).chain(inner).collect(),
                    Member::Method(_) => continue,
                };

                found.push(Member::IndirectField(chain));
            }
        }

        if let Some(cxx) = self.records[record].cxx() {
            found.extend(
                cxx.methods
                    .iter()
                    .filter(|method| self.methods[**method].name == name)
                    .map(|method| Member::Method(*method)),
            );
        }

        found
    }

    /// The record of an anonymous struct or union member, such as `union { int a; float b; };`
    pub fn anonymous_member_record(&self, record: RecordRef, index: usize) -> Option<RecordRef> {
        let field = &self.records[record].fields()[index];

        if field.name.is_some() || field.is_bitfield() {
            return None;
        }

        self.as_record(field.ty)
            .filter(|inner| self.records[*inner].is_anonymous())
    }
}

#[test]
fn test_lookup_through_anonymous_union() {
    use crate::{Field, RecordDefinition, RecordKind};
    use primitives::{Builtin, CInteger};

    let mut asg = Asg::new();
    let int = asg.builtin(Builtin::signed(CInteger::Int));
    let union = asg.add_record(
        RecordKind::Union,
        None,
        RecordDefinition::c([Field::new("a", int), Field::new("b", int)]),
    );
    let union_ty = asg.record_type(union);
    let outer = asg.add_record(
        RecordKind::Struct,
        Some("Outer"),
        RecordDefinition::c([Field::new("x", int), Field::anonymous(union_ty)]),
    );

    assert_eq!(
        asg.lookup_member(outer, "x"),
        [Member::Field(FieldRef { record: outer, index: 0 })]
    );
    assert_eq!(
        asg.lookup_member(outer, "b"),
        [Member::IndirectField(vec![
            FieldRef { record: outer, index: 1 },
            FieldRef { record: union, index: 1 },
        ])]
    );
    assert!(asg.lookup_member(outer, "missing").is_empty());
}
