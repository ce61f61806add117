use derive_more::IsVariant;
use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum TargetArch {
    X86,
    X86_64,
    Arm,
    Aarch64,
}

impl TargetArch {
    pub const HOST: Option<Self> = if cfg!(target_arch = "x86") {
        Some(TargetArch::X86)
    } else if cfg!(target_arch = "x86_64") {
        Some(TargetArch::X86_64)
    } else if cfg!(target_arch = "arm") {
        Some(TargetArch::Arm)
    } else if cfg!(target_arch = "aarch64") {
        Some(TargetArch::Aarch64)
    } else {
        None
    };

    pub fn is_64_bit(&self) -> bool {
        matches!(self, Self::X86_64 | Self::Aarch64)
    }
}

impl Display for TargetArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TargetArch::X86 => "x86",
            TargetArch::X86_64 => "x86_64",
            TargetArch::Arm => "arm",
            TargetArch::Aarch64 => "aarch64",
        })
    }
}
