/*
    ====================  support/target_layout/src/lib.rs  ====================
    Itanium and Microsoft C++ record layout, plus layouts of every other type
    ---------------------------------------------------------------------------
*/

mod base_subobject;
mod dump;
mod empty_subobjects;
mod external;
mod itanium;
mod microsoft;
mod options;
mod record_layout;
mod target_layout;
mod type_layout;
mod type_layout_cache;
mod warning;

#[cfg(test)]
mod tests;

pub use base_subobject::{BaseSubobjectInfo, BaseSubobjectRef, BaseSubobjects};
pub use empty_subobjects::EmptySubobjectMap;
pub use external::{ExternalLayout, ExternalLayoutSource};
pub use itanium::ItaniumRecordLayoutBuilder;
pub use microsoft::MicrosoftRecordLayoutBuilder;
pub use options::LayoutOptions;
pub use record_layout::{CxxRecordLayout, RecordLayout, VBaseInfo};
pub use target_layout::TargetLayout;
pub use type_layout::{AlignRequirement, TypeLayout};
pub use type_layout_cache::TypeLayoutCache;
pub use warning::{LayoutWarning, LayoutWarningKind, Padding};
