mod arch;
mod cxx_abi;
mod os;

pub use arch::TargetArch;
pub use cxx_abi::{BitFieldRules, CxxAbi, TailPaddingUseRules};
use data_units::ByteUnits;
pub use os::{TargetOs, TargetOsExt};
use std::fmt::Display;

/// Read-only description of the machine that records are laid out for.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Target {
    arch: Option<TargetArch>,
    os: Option<TargetOs>,
    cxx_abi: Option<CxxAbi>,
    bitfield_rules: Option<BitFieldRules>,
}

impl Target {
    pub const HOST: Self = Self::new(TargetOs::HOST, TargetArch::HOST);

    pub const fn new(os: Option<TargetOs>, arch: Option<TargetArch>) -> Self {
        Self {
            arch,
            os,
            cxx_abi: None,
            bitfield_rules: None,
        }
    }

    pub const fn of(os: TargetOs, arch: TargetArch) -> Self {
        Self::new(Some(os), Some(arch))
    }

    /// Forces a C++ ABI instead of the one implied by the operating system.
    pub const fn with_cxx_abi(self, cxx_abi: CxxAbi) -> Self {
        Self {
            cxx_abi: Some(cxx_abi),
            ..self
        }
    }

    pub const fn with_bitfield_rules(self, bitfield_rules: BitFieldRules) -> Self {
        Self {
            bitfield_rules: Some(bitfield_rules),
            ..self
        }
    }

    pub fn os(&self) -> Option<TargetOs> {
        self.os
    }

    pub fn arch(&self) -> Option<TargetArch> {
        self.arch
    }

    pub fn is_64_bit(&self) -> bool {
        self.arch.map_or(true, |arch| arch.is_64_bit())
    }

    pub fn is_x86_64(&self) -> bool {
        self.arch.is_some_and(|arch| arch.is_x_86_64())
    }

    pub fn pointer_width(&self) -> ByteUnits {
        if self.is_64_bit() {
            ByteUnits::of(8)
        } else {
            ByteUnits::of(4)
        }
    }

    pub fn cxx_abi(&self) -> CxxAbi {
        self.cxx_abi.unwrap_or(if self.os.is_windows() {
            CxxAbi::Microsoft
        } else {
            CxxAbi::Itanium
        })
    }

    pub fn tail_padding_use_rules(&self) -> TailPaddingUseRules {
        match self.cxx_abi() {
            CxxAbi::Microsoft => TailPaddingUseRules::AlwaysUseTailPadding,
            CxxAbi::Itanium if self.os.is_mac() && self.arch == Some(TargetArch::Aarch64) => {
                TailPaddingUseRules::UseTailPaddingUnlessPod11
            }
            CxxAbi::Itanium => TailPaddingUseRules::UseTailPaddingUnlessPod03,
        }
    }

    pub fn bitfield_rules(&self) -> BitFieldRules {
        if let Some(rules) = self.bitfield_rules {
            return rules;
        }

        match self.arch {
            Some(TargetArch::Arm | TargetArch::Aarch64) => BitFieldRules {
                use_zero_length_bitfield_alignment: true,
                ..Default::default()
            },
            Some(TargetArch::X86 | TargetArch::X86_64) | None => BitFieldRules::default(),
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.arch.map_or("unknown".into(), |arch| arch.to_string()),
            self.os.map_or("unknown".into(), |os| os.to_string())
        )
    }
}

#[test]
fn test_cxx_abi_follows_os() {
    let windows = Target::of(TargetOs::Windows, TargetArch::X86_64);
    let linux = Target::of(TargetOs::Linux, TargetArch::X86_64);

    assert_eq!(windows.cxx_abi(), CxxAbi::Microsoft);
    assert_eq!(linux.cxx_abi(), CxxAbi::Itanium);
    assert_eq!(
        linux.with_cxx_abi(CxxAbi::Microsoft).cxx_abi(),
        CxxAbi::Microsoft
    );
}

#[test]
fn test_pointer_width() {
    assert_eq!(
        Target::of(TargetOs::Linux, TargetArch::X86).pointer_width(),
        ByteUnits::of(4)
    );
    assert_eq!(
        Target::of(TargetOs::Mac, TargetArch::Aarch64).pointer_width(),
        ByteUnits::of(8)
    );
}

#[test]
fn test_tail_padding_rules() {
    assert_eq!(
        Target::of(TargetOs::Mac, TargetArch::Aarch64).tail_padding_use_rules(),
        TailPaddingUseRules::UseTailPaddingUnlessPod11
    );
    assert_eq!(
        Target::of(TargetOs::Linux, TargetArch::Aarch64).tail_padding_use_rules(),
        TailPaddingUseRules::UseTailPaddingUnlessPod03
    );
}

#[test]
fn test_host_target() {
    let host = Target::HOST;

    assert_eq!(host.os().is_windows(), cfg!(target_os = "windows"));
    assert_eq!(host.is_64_bit(), cfg!(target_pointer_width = "64"));
    assert_eq!(host.cxx_abi().is_microsoft(), cfg!(target_os = "windows"));
}
