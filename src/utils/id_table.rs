//! Name Interning Tables
//!
//! Maps names (parameters, signals, feedback events, sync groups, samplers)
//! to dense integer ids. Each graph builder owns its own tables, so ids are
//! only meaningful for the graph that produced them.

use std::marker::PhantomData;

use rustc_hash::FxHashMap;

/// A dense integer id that can live in an [`IdTable`].
pub trait TableId: Copy + Eq {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

/// Declares a `u32` newtype id implementing [`TableId`].
macro_rules! define_table_id {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
            pub struct $name(pub u32);

            impl $crate::utils::id_table::TableId for $name {
                #[inline]
                fn from_index(index: usize) -> Self {
                    Self(index as u32)
                }

                #[inline]
                fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

pub(crate) use define_table_id;

/// Interns names into ids of type `K`.
///
/// Interning the same name twice returns the same id; ids are handed out in
/// insertion order starting from zero.
#[derive(Debug, Clone)]
pub struct IdTable<K: TableId> {
    lookup: FxHashMap<Box<str>, K>,
    names: Vec<Box<str>>,
    _marker: PhantomData<K>,
}

impl<K: TableId> Default for IdTable<K> {
    fn default() -> Self {
        Self {
            lookup: FxHashMap::default(),
            names: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<K: TableId> IdTable<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a name, returning its id.
    ///
    /// If the name is already present, the existing id is returned.
    pub fn intern(&mut self, name: &str) -> K {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = K::from_index(self.names.len());
        self.names.push(name.into());
        self.lookup.insert(name.into(), id);
        id
    }

    /// Looks up an existing name without interning it.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<K> {
        self.lookup.get(name).copied()
    }

    /// Resolves an id back to its name.
    #[inline]
    #[must_use]
    pub fn resolve(&self, id: K) -> Option<&str> {
        self.names.get(id.index()).map(AsRef::as_ref)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: K) -> bool {
        id.index() < self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (K::from_index(i), name.as_ref()))
    }
}
