use crate::{MethodRef, RecordRef, TypeRef};
use data_units::ByteUnits;
use derive_more::IsVariant;
use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum RecordKind {
    Struct,
    Class,
    Union,
    Interface,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Struct => "struct",
            Self::Class => "class",
            Self::Union => "union",
            Self::Interface => "__interface",
        })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, IsVariant)]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Clone, Debug)]
pub struct Record {
    pub name: Option<String>,
    pub kind: RecordKind,
    /// The type that names this record, such as `struct S`
    pub ty: TypeRef,
    pub definition: Option<RecordDefinition>,
    pub is_invalid: bool,
    pub is_dependent: bool,
}

impl Record {
    pub fn is_union(&self) -> bool {
        self.kind.is_union()
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    pub fn fields(&self) -> &[Field] {
        self.definition
            .as_ref()
            .map_or(&[], |definition| &definition.fields[..])
    }

    pub fn cxx(&self) -> Option<&CxxDefinition> {
        self.definition.as_ref()?.cxx.as_ref()
    }

    pub fn bases(&self) -> &[Base] {
        self.cxx().map_or(&[], |cxx| &cxx.bases[..])
    }

    pub fn attributes(&self) -> RecordAttributes {
        self.definition
            .as_ref()
            .map(|definition| definition.attributes)
            .unwrap_or_default()
    }

    /// Name suitable for diagnostics, such as `struct S` or `(anonymous union)`.
    pub fn friendly_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {}", self.kind, name),
            None => format!("(anonymous {})", self.kind),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordDefinition {
    pub fields: Vec<Field>,
    pub attributes: RecordAttributes,

    /// Present for records declared in C++, absent for C records
    pub cxx: Option<CxxDefinition>,
}

impl RecordDefinition {
    pub fn c(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            attributes: RecordAttributes::default(),
            cxx: None,
        }
    }

    pub fn cxx(bases: impl IntoIterator<Item = Base>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            attributes: RecordAttributes::default(),
            cxx: Some(CxxDefinition {
                bases: bases.into_iter().collect(),
                methods: Vec::new(),
            }),
        }
    }

    pub fn with_attributes(self, attributes: RecordAttributes) -> Self {
        Self { attributes, ..self }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CxxDefinition {
    pub bases: Vec<Base>,
    pub methods: Vec<MethodRef>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordAttributes {
    /// `__attribute__((packed))`
    pub is_packed: bool,

    /// `#pragma pack(N)`
    pub max_field_alignment: Option<ByteUnits>,

    /// `__attribute__((aligned(N)))` or `alignas(N)`
    pub max_alignment: Option<ByteUnits>,

    /// `__attribute__((ms_struct))`
    pub is_ms_struct: bool,

    /// `#pragma options align=mac68k`
    pub is_mac68k_align: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Base {
    pub record: RecordRef,
    pub is_virtual: bool,
    pub access: Access,
}

impl Base {
    pub fn new(record: RecordRef) -> Self {
        Self {
            record,
            is_virtual: false,
            access: Access::Public,
        }
    }

    pub fn virtual_base(record: RecordRef) -> Self {
        Self {
            record,
            is_virtual: true,
            access: Access::Public,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: Option<String>,
    pub ty: TypeRef,
    pub bit_width: Option<u64>,
    pub access: Access,
    pub attributes: FieldAttributes,
}

impl Field {
    pub fn new(name: impl ToString, ty: TypeRef) -> Self {
        Self {
            name: Some(name.to_string()),
            ty,
            bit_width: None,
            access: Access::Public,
            attributes: FieldAttributes::default(),
        }
    }

    /// Unnamed member, as used for anonymous structs and unions.
    pub fn anonymous(ty: TypeRef) -> Self {
        Self {
            name: None,
            ty,
            bit_width: None,
            access: Access::Public,
            attributes: FieldAttributes::default(),
        }
    }

    pub fn bitfield(name: impl ToString, ty: TypeRef, width: u64) -> Self {
        Self {
            bit_width: Some(width),
            ..Self::new(name, ty)
        }
    }

    pub fn unnamed_bitfield(ty: TypeRef, width: u64) -> Self {
        Self {
            bit_width: Some(width),
            ..Self::anonymous(ty)
        }
    }

    pub fn packed(self) -> Self {
        Self {
            attributes: FieldAttributes {
                is_packed: true,
                ..self.attributes
            },
            ..self
        }
    }

    pub fn aligned(self, alignment: ByteUnits) -> Self {
        Self {
            attributes: FieldAttributes {
                max_alignment: Some(alignment),
                ..self.attributes
            },
            ..self
        }
    }

    pub fn with_access(self, access: Access) -> Self {
        Self { access, ..self }
    }

    pub fn is_bitfield(&self) -> bool {
        self.bit_width.is_some()
    }

    pub fn is_unnamed(&self) -> bool {
        self.name.is_none()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldAttributes {
    /// `__attribute__((packed))` on the field itself
    pub is_packed: bool,

    /// `__attribute__((aligned(N)))` on the field itself
    pub max_alignment: Option<ByteUnits>,
}
