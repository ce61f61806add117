use crate::TypeLayout;
use data_units::ByteUnits;
use primitives::{Builtin, CFloat, CInteger};
use target::{Target, TargetArch, TargetOsExt};

/// Sizes and alignments of the builtin types on a target.
pub trait TargetLayout {
    fn pointer_layout(&self) -> TypeLayout;
    fn bool_layout(&self) -> TypeLayout;
    fn char_layout(&self) -> TypeLayout;
    fn short_layout(&self) -> TypeLayout;
    fn int_layout(&self) -> TypeLayout;
    fn long_layout(&self) -> TypeLayout;
    fn longlong_layout(&self) -> TypeLayout;
    fn int128_layout(&self) -> TypeLayout;
    fn half_layout(&self) -> TypeLayout;
    fn float_layout(&self) -> TypeLayout;
    fn double_layout(&self) -> TypeLayout;
    fn long_double_layout(&self) -> TypeLayout;
    fn wchar_layout(&self) -> TypeLayout;
    fn builtin_layout(&self, builtin: Builtin) -> TypeLayout;
    fn c_integer_bytes(&self, c_integer: CInteger) -> ByteUnits;
}

impl TargetLayout for Target {
    fn pointer_layout(&self) -> TypeLayout {
        TypeLayout::basic(self.pointer_width())
    }

    fn bool_layout(&self) -> TypeLayout {
        TypeLayout::basic(ByteUnits::of(1))
    }

    fn char_layout(&self) -> TypeLayout {
        TypeLayout::basic(ByteUnits::of(1))
    }

    fn short_layout(&self) -> TypeLayout {
        TypeLayout::basic(ByteUnits::of(2))
    }

    fn int_layout(&self) -> TypeLayout {
        TypeLayout::basic(ByteUnits::of(4))
    }

    fn long_layout(&self) -> TypeLayout {
        if self.os().is_windows() || !self.is_64_bit() {
            TypeLayout::basic(ByteUnits::of(4))
        } else {
            TypeLayout::basic(ByteUnits::of(8))
        }
    }

    fn longlong_layout(&self) -> TypeLayout {
        if is_i386_unix(self) {
            TypeLayout::aligned(ByteUnits::of(8), ByteUnits::of(4))
        } else {
            TypeLayout::basic(ByteUnits::of(8))
        }
    }

    fn int128_layout(&self) -> TypeLayout {
        TypeLayout::basic(ByteUnits::of(16))
    }

    fn half_layout(&self) -> TypeLayout {
        TypeLayout::basic(ByteUnits::of(2))
    }

    fn float_layout(&self) -> TypeLayout {
        TypeLayout::basic(ByteUnits::of(4))
    }

    fn double_layout(&self) -> TypeLayout {
        if is_i386_unix(self) {
            TypeLayout::aligned(ByteUnits::of(8), ByteUnits::of(4))
        } else {
            TypeLayout::basic(ByteUnits::of(8))
        }
    }

    fn long_double_layout(&self) -> TypeLayout {
        if self.os().is_windows() {
            return TypeLayout::basic(ByteUnits::of(8));
        }

        match self.arch() {
            Some(TargetArch::X86) if self.os().is_mac() => TypeLayout::basic(ByteUnits::of(16)),
            Some(TargetArch::X86) => TypeLayout::aligned(ByteUnits::of(12), ByteUnits::of(4)),
            Some(TargetArch::X86_64) | None => TypeLayout::basic(ByteUnits::of(16)),
            Some(TargetArch::Aarch64) if self.os().is_mac() => TypeLayout::basic(ByteUnits::of(8)),
            Some(TargetArch::Aarch64) => TypeLayout::basic(ByteUnits::of(16)),
            Some(TargetArch::Arm) => TypeLayout::basic(ByteUnits::of(8)),
        }
    }

    fn wchar_layout(&self) -> TypeLayout {
        if self.os().is_windows() {
            TypeLayout::basic(ByteUnits::of(2))
        } else {
            TypeLayout::basic(ByteUnits::of(4))
        }
    }

    fn builtin_layout(&self, builtin: Builtin) -> TypeLayout {
        match builtin {
            Builtin::Void => TypeLayout::aligned(ByteUnits::ZERO, ByteUnits::ONE),
            Builtin::Bool => self.bool_layout(),
            Builtin::PlainChar => self.char_layout(),
            Builtin::WChar => self.wchar_layout(),
            Builtin::Char16 => TypeLayout::basic(ByteUnits::of(2)),
            Builtin::Char32 => TypeLayout::basic(ByteUnits::of(4)),
            Builtin::Integer(c_integer, _) => match c_integer {
                CInteger::Char => self.char_layout(),
                CInteger::Short => self.short_layout(),
                CInteger::Int => self.int_layout(),
                CInteger::Long => self.long_layout(),
                CInteger::LongLong => self.longlong_layout(),
            },
            Builtin::Int128(_) => self.int128_layout(),
            Builtin::Float(c_float) => match c_float {
                CFloat::Half => self.half_layout(),
                CFloat::Float => self.float_layout(),
                CFloat::Double => self.double_layout(),
                CFloat::LongDouble => self.long_double_layout(),
            },
            Builtin::NullPtr => self.pointer_layout(),
        }
    }

    fn c_integer_bytes(&self, c_integer: CInteger) -> ByteUnits {
        match c_integer {
            CInteger::Char => self.char_layout().width,
            CInteger::Short => self.short_layout().width,
            CInteger::Int => self.int_layout().width,
            CInteger::Long => self.long_layout().width,
            CInteger::LongLong => self.longlong_layout().width,
        }
    }
}

// The System V i386 ABI only aligns 8-byte scalars to 4 bytes
fn is_i386_unix(target: &Target) -> bool {
    target.arch() == Some(TargetArch::X86) && !target.os().is_windows()
}

#[test]
fn test_long_follows_data_model() {
    use target::TargetOs;

    let linux = Target::of(TargetOs::Linux, TargetArch::X86_64);
    let windows = Target::of(TargetOs::Windows, TargetArch::X86_64);
    let i386 = Target::of(TargetOs::Linux, TargetArch::X86);

    assert_eq!(linux.c_integer_bytes(CInteger::Long), ByteUnits::of(8));
    assert_eq!(windows.c_integer_bytes(CInteger::Long), ByteUnits::of(4));
    assert_eq!(i386.c_integer_bytes(CInteger::Long), ByteUnits::of(4));
    assert_eq!(i386.double_layout().alignment, ByteUnits::of(4));
    assert_eq!(
        Target::of(TargetOs::Windows, TargetArch::X86).double_layout().alignment,
        ByteUnits::of(8)
    );
}
