use crate::{Id, Idx};
use alloc::vec::Vec;
use core::{
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// Append-only storage addressed by [`Idx<K, V>`].
///
/// Values are never removed, so an index stays valid for the lifetime of the arena.
pub struct Arena<K: Id, V> {
    data: Vec<V>,
    phantom: PhantomData<K>,
}

impl<K: Id, V> Arena<K, V> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            phantom: PhantomData,
        }
    }

    /// Moves `value` into the arena and returns its index.
    ///
    /// # Panics
    ///
    /// Panics if the arena already holds as many values as `K` can address.
    #[inline]
    pub fn alloc(&mut self, value: V) -> Idx<K, V> {
        let idx = Idx::from_raw(K::from_usize(self.data.len()));
        self.data.push(value);
        idx
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Idx<K, V>, &V)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(|(i, value)| (Idx::from_raw(K::from_usize(i)), value))
    }
}

impl<K: Id, V> Default for Arena<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Id, V> Index<Idx<K, V>> for Arena<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, idx: Idx<K, V>) -> &Self::Output {
        &self.data[idx.into_usize()]
    }
}

impl<K: Id, V> IndexMut<Idx<K, V>> for Arena<K, V> {
    #[inline]
    fn index_mut(&mut self, idx: Idx<K, V>) -> &mut Self::Output {
        &mut self.data[idx.into_usize()]
    }
}

impl<K: Id, V: Clone> Clone for Arena<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            phantom: PhantomData,
        }
    }
}

impl<K: Id, V: fmt::Debug> fmt::Debug for Arena<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[test]
fn test_alloc_and_index() {
    let mut arena = Arena::<u32, &str>::new();
    let a = arena.alloc("a");
    let b = arena.alloc("b");

    assert_ne!(a, b);
    assert_eq!(arena[a], "a");
    assert_eq!(arena[b], "b");
}

#[test]
fn test_index_mut() {
    let mut arena = Arena::<u32, u64>::new();
    let idx = arena.alloc(1);
    arena[idx] += 41;
    assert_eq!(arena[idx], 42);
    assert_eq!(arena.iter().map(|(idx, _)| idx).collect::<Vec<_>>(), [idx]);
}
