use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Sub, SubAssign},
};

/// Number of bits in a byte for every target we lay out records for.
pub const BITS_PER_BYTE: u64 = 8;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ByteUnits {
    units: u64,
}

impl ByteUnits {
    pub const ZERO: Self = Self { units: 0 };
    pub const ONE: Self = Self { units: 1 };

    pub const fn of(value: u64) -> Self {
        Self { units: value }
    }

    pub const fn bytes(&self) -> u64 {
        self.units
    }

    pub const fn to_bits(self) -> BitUnits {
        BitUnits::of(self.units * BITS_PER_BYTE)
    }

    pub fn next_power_of_two(self) -> Self {
        Self::of(self.units.next_power_of_two())
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BitUnits {
    units: u64,
}

impl BitUnits {
    pub const ZERO: Self = Self { units: 0 };

    pub const fn of(value: u64) -> Self {
        Self { units: value }
    }

    pub const fn bits(&self) -> u64 {
        self.units
    }

    pub const fn is_byte_aligned(&self) -> bool {
        self.units % BITS_PER_BYTE == 0
    }

    /// Whole bytes covered by this many bits, discarding any partial byte.
    pub const fn to_bytes_floor(self) -> ByteUnits {
        ByteUnits::of(self.units / BITS_PER_BYTE)
    }

    /// Bytes needed to hold this many bits.
    pub const fn to_bytes_ceil(self) -> ByteUnits {
        ByteUnits::of(self.units.div_ceil(BITS_PER_BYTE))
    }
}

impl Display for ByteUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.units)
    }
}

impl Display for BitUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.units)
    }
}

macro_rules! impl_math_for {
    ($units:ty) => {
        impl $units {
            pub const fn is_zero(&self) -> bool {
                self.units == 0
            }

            pub fn align_to(&self, align: $units) -> $units {
                assert_ne!(align.units, 0, "cannot align to zero");
                Self::of(self.units.next_multiple_of(align.units))
            }

            pub fn is_aligned_to(&self, align: $units) -> bool {
                align.units != 0 && self.units % align.units == 0
            }

            pub const fn is_power_of_2(&self) -> bool {
                self.units.is_power_of_two()
            }
        }

        impl Add<$units> for $units {
            type Output = $units;

            fn add(self, rhs: $units) -> Self::Output {
                Self::of(self.units + rhs.units)
            }
        }

        impl AddAssign<$units> for $units {
            fn add_assign(&mut self, rhs: $units) {
                self.units += rhs.units
            }
        }

        impl Sub<$units> for $units {
            type Output = $units;

            fn sub(self, rhs: $units) -> Self::Output {
                Self::of(self.units - rhs.units)
            }
        }

        impl SubAssign<$units> for $units {
            fn sub_assign(&mut self, rhs: $units) {
                self.units -= rhs.units
            }
        }

        impl Mul<u64> for $units {
            type Output = $units;

            fn mul(self, rhs: u64) -> Self::Output {
                Self::of(self.units * rhs)
            }
        }

        impl Sum for $units {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::ZERO, |total, units| total + units)
            }
        }
    };
}

impl_math_for!(ByteUnits);
impl_math_for!(BitUnits);

#[test]
fn test_align_to() {
    assert_eq!(ByteUnits::of(5).align_to(ByteUnits::of(4)), ByteUnits::of(8));
    assert_eq!(ByteUnits::of(8).align_to(ByteUnits::of(4)), ByteUnits::of(8));
    assert_eq!(BitUnits::of(3).align_to(BitUnits::of(8)), BitUnits::of(8));
}

#[test]
fn test_bit_byte_conversions() {
    assert_eq!(BitUnits::of(17).to_bytes_floor(), ByteUnits::of(2));
    assert_eq!(BitUnits::of(17).to_bytes_ceil(), ByteUnits::of(3));
    assert_eq!(ByteUnits::of(3).to_bits(), BitUnits::of(24));
    assert!(BitUnits::of(32).is_byte_aligned());
    assert!(!BitUnits::of(33).is_byte_aligned());
}

#[test]
fn test_sum_of_offsets() {
    let total: BitUnits = [BitUnits::of(32), BitUnits::of(8)].into_iter().sum();
    assert_eq!(total, BitUnits::of(40));
}
