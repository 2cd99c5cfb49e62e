use std::hash::BuildHasherDefault;

/// Insertion-ordered map used throughout heapsql for row fields and
/// catalog listings, where iteration order must match declaration order.
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<ahash::AHasher>>;
pub type IndexSet<V> = indexmap::IndexSet<V, BuildHasherDefault<ahash::AHasher>>;

/// Small builder-pattern helper: `Foo::default().config(|f| f.x = 1)`.
pub trait Config: Sized {
    fn config(mut self, f: impl FnOnce(&mut Self)) -> Self {
        f(&mut self);
        self
    }
}

impl<T> Config for T {}
