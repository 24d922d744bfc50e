//! Compilation-unit storage for AST and ASR nodes.
//!
//! Nodes never own their children. They hold [`Idx`] handles into a
//! [`Pool`], so a child can be shared between several parents (the ASR
//! reuses sub-expressions when it builds casts, folded values and chained
//! comparisons) and the whole unit is released by dropping the [`Arena`].

use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use crate::{ast::ast::AstArena, semantics::asr::AsrArena};

/// Typed handle into a [`Pool<T>`].
pub struct Idx<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Idx<T> {
    pub const fn from_raw(raw: u32) -> Self {
        Idx {
            raw,
            _marker: PhantomData,
        }
    }

    pub const fn raw(self) -> u32 {
        self.raw
    }

    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

// Manual impls: derives would demand `T: Clone` etc.
impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Idx<T> {}

impl<T> PartialOrd for Idx<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Idx<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Idx<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Idx({})", self.raw)
    }
}

/// Append-only vector of nodes addressed by [`Idx`].
#[derive(Debug, Clone)]
pub struct Pool<T> {
    items: Vec<T>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Pool { items: Vec::new() }
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Pool {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn alloc(&mut self, item: T) -> Idx<T> {
        let raw = u32::try_from(self.items.len())
            .unwrap_or_else(|_| panic!("arena exhausted: more than {} nodes", u32::MAX));
        self.items.push(item);
        Idx::from_raw(raw)
    }

    pub fn get(&self, id: Idx<T>) -> Option<&T> {
        self.items.get(id.index())
    }

    pub fn get_mut(&mut self, id: Idx<T>) -> Option<&mut T> {
        self.items.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Idx<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (Idx::from_raw(i as u32), item))
    }
}

impl<T> Index<Idx<T>> for Pool<T> {
    type Output = T;

    fn index(&self, id: Idx<T>) -> &T {
        &self.items[id.index()]
    }
}

impl<T> IndexMut<Idx<T>> for Pool<T> {
    fn index_mut(&mut self, id: Idx<T>) -> &mut T {
        &mut self.items[id.index()]
    }
}

/// Everything allocated while compiling one unit.
///
/// The halves are separate fields so semantic analysis can read the AST
/// while it appends to the ASR.
#[derive(Debug, Default)]
pub struct Arena {
    pub ast: AstArena,
    pub asr: AsrArena,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes the pools from the source length (roughly one expression
    /// every eight bytes).
    pub fn for_source(source: &str) -> Self {
        let estimate = source.len() / 8 + 16;
        Arena {
            ast: AstArena::with_capacity(estimate),
            asr: AsrArena::with_capacity(estimate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Idx, Pool};

    #[test]
    fn test_alloc_returns_sequential_handles() {
        let mut pool = Pool::new();
        let a = pool.alloc("a");
        let b = pool.alloc("b");

        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(pool[b], "b");
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_get_out_of_range_is_none() {
        let pool: Pool<u8> = Pool::new();
        assert!(pool.get(Idx::from_raw(3)).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_index_mut_updates_in_place() {
        let mut pool = Pool::with_capacity(1);
        let id = pool.alloc(1);
        pool[id] += 41;
        assert_eq!(pool[id], 42);
        assert_eq!(pool.iter().count(), 1);
    }
}
