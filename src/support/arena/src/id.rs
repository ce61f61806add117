use core::fmt::Debug;

/// Raw index type stored inside an [`Idx`](crate::Idx).
///
/// Distinct id types keep indices from one arena from being used with another,
/// even when both arenas hold values of the same type.
pub trait Id: Copy + Ord + Debug {
    fn from_usize(idx: usize) -> Self;

    fn into_usize(self) -> usize;
}

impl Id for u32 {
    #[inline]
    fn from_usize(idx: usize) -> Self {
        assert!(idx <= u32::MAX as usize, "arena id overflowed");
        idx as u32
    }

    #[inline]
    fn into_usize(self) -> usize {
        self as usize
    }
}
