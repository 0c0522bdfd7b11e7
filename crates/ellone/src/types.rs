//! Utility types.

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

/// An insertion-ordered map with the Fx hasher.
pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
/// An insertion-ordered set with the Fx hasher.
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;
