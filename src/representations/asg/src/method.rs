use crate::{MethodRef, RecordRef};
use derive_more::IsVariant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum MethodKind {
    Normal,
    Constructor,
    Destructor,
}

#[derive(Clone, Debug)]
pub struct Method {
    pub name: String,
    pub parent: RecordRef,
    pub kind: MethodKind,

    /// Declared `virtual`, or overrides a virtual method
    pub is_virtual: bool,

    /// Implicitly declared by the compiler rather than written by the user
    pub is_implicit: bool,

    /// Methods of base classes that this method directly overrides
    pub overridden: Vec<MethodRef>,
}

impl Method {
    pub fn new(parent: RecordRef, name: impl ToString, kind: MethodKind) -> Self {
        Self {
            name: name.to_string(),
            parent,
            kind,
            is_virtual: false,
            is_implicit: false,
            overridden: Vec::new(),
        }
    }

    pub fn virtual_method(parent: RecordRef, name: impl ToString) -> Self {
        Self {
            is_virtual: true,
            ..Self::new(parent, name, MethodKind::Normal)
        }
    }

    pub fn overriding(self, overridden: impl IntoIterator<Item = MethodRef>) -> Self {
        Self {
            is_virtual: true,
            overridden: overridden.into_iter().collect(),
            ..self
        }
    }
}
