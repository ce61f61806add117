mod show;
mod warning;

use core::fmt::Debug;
pub use show::Show;
use std::{any::Any, cell::RefCell};
pub use warning::show_warning;

pub trait Diagnostic: Show + Debug + Any {
    fn as_any(&self) -> &dyn Any;
}

#[derive(Clone, Debug, Default)]
pub struct DiagnosticFlags {
    pub print_without_collecting: bool,

    /// Report padding inserted before fields and at the end of records
    pub warn_padded: bool,

    /// Report packed attributes that have no effect
    pub warn_packed: bool,
}

impl DiagnosticFlags {
    pub fn all_warnings() -> Self {
        Self {
            warn_padded: true,
            warn_packed: true,
            ..Default::default()
        }
    }
}

/// Single-threaded sink for diagnostics produced while computing layouts.
#[derive(Default)]
pub struct Diagnostics {
    diagnostics: RefCell<Vec<Box<dyn Diagnostic>>>,
    flags: DiagnosticFlags,
}

impl Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("flags", &self.flags)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl Diagnostics {
    pub fn new(flags: DiagnosticFlags) -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
            flags,
        }
    }

    pub fn flags(&self) -> &DiagnosticFlags {
        &self.flags
    }

    pub fn push(&self, diagnostic: impl Diagnostic + 'static) {
        if self.flags.print_without_collecting {
            diagnostic.eprintln();
        } else {
            self.diagnostics.borrow_mut().push(Box::new(diagnostic));
        }
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies out every collected diagnostic of type `T`, in the order they were pushed.
    pub fn collected<T: Diagnostic + Clone>(&self) -> Vec<T> {
        self.diagnostics
            .borrow()
            .iter()
            .filter_map(|diagnostic| diagnostic.as_any().downcast_ref::<T>().cloned())
            .collect()
    }
}

#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
struct TestWarning(&'static str);

#[cfg(test)]
impl Show for TestWarning {
    fn show(&self, w: &mut dyn std::fmt::Write) -> std::fmt::Result {
        show_warning(w, None, self.0)
    }
}

#[cfg(test)]
impl Diagnostic for TestWarning {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn test_collects_when_not_printing() {
    let diagnostics = Diagnostics::new(DiagnosticFlags::default());
    diagnostics.push(TestWarning("first"));
    diagnostics.push(TestWarning("second"));

    assert_eq!(diagnostics.len(), 2);
    assert_eq!(
        diagnostics.collected::<TestWarning>(),
        [TestWarning("first"), TestWarning("second")]
    );
}

#[test]
fn test_show_warning_format() {
    colored::control::set_override(false);

    let mut message = String::new();
    show_warning(&mut message, Some("struct S"), "padding").unwrap();
    assert_eq!(message, "struct S: warning: padding");
}
