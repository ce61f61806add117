use crate::{Asg, Type, TypeRef};
use itertools::Itertools;

impl Asg {
    /// Spells a type the way a C++ compiler prints it in diagnostics and layout dumps.
    pub fn display_type(&self, ty: TypeRef) -> String {
        match &self.types[ty] {
            Type::Builtin(builtin) => builtin.to_string(),
            Type::Pointer(inner) => format!("{} *", self.display_type(*inner)),
            Type::BlockPointer(inner) => format!("{} (^)", self.display_type(*inner)),
            Type::LValueReference(inner) => format!("{} &", self.display_type(*inner)),
            Type::RValueReference(inner) => format!("{} &&", self.display_type(*inner)),
            Type::MemberPointer { pointee, class } => format!(
                "{} {}::*",
                self.display_type(*pointee),
                self.display_type(*class)
            ),
            Type::ConstantArray { element, count } => {
                format!("{} [{}]", self.display_type(*element), count)
            }
            Type::IncompleteArray(element) => format!("{} []", self.display_type(*element)),
            Type::VariableArray(element) => format!("{} [*]", self.display_type(*element)),
            Type::DependentSizedArray(element) => {
                format!("{} [N]", self.display_type(*element))
            }
            Type::Vector { element, count } => format!(
                "{} __attribute__((ext_vector_type({})))",
                self.display_type(*element),
                count
            ),
            Type::Complex(element) => format!("_Complex {}", self.display_type(*element)),
            Type::Record(record) => {
                let record = &self.records[*record];
                match &record.name {
                    Some(name) => format!("{} {}", record.kind, name),
                    None => format!("{} (anonymous)", record.kind),
                }
            }
            Type::Enum(enumeration) => match &self.enums[*enumeration].name {
                Some(name) => format!("enum {}", name),
                None => "enum (anonymous)".into(),
            },
            Type::Typedef(typedef) => self.typedefs[*typedef].name.clone(),
            Type::Elaborated(inner) => self.display_type(*inner),
            Type::Function(function) => format!(
                "{} ({}{})",
                self.display_type(function.return_type),
                function
                    .params
                    .iter()
                    .map(|param| self.display_type(*param))
                    .join(", "),
                if function.is_variadic { ", ..." } else { "" }
            ),
            Type::TemplateParam(name) => name.clone(),
            Type::Error => "<error type>".into(),
        }
    }
}

#[test]
fn test_display_type() {
    use crate::RecordKind;
    use primitives::{Builtin, CInteger};

    let mut asg = Asg::new();
    let int = asg.builtin(Builtin::signed(CInteger::Int));
    let array = asg.array_of(int, 4);
    let pointer = asg.pointer_to(array);
    let record = asg.declare_record(RecordKind::Class, Some("C"));
    let class = asg.record_type(record);
    let member = asg.add_type(Type::MemberPointer { pointee: int, class });

    assert_eq!(asg.display_type(pointer), "int [4] *");
    assert_eq!(asg.display_type(class), "class C");
    assert_eq!(asg.display_type(member), "int class C::*");
}
