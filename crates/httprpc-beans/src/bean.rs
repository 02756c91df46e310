//! Property-table driven dictionary view over domain objects.
//!
//! A type opts in by implementing [`Bean`], usually through
//! `#[derive(Bean)]`. The property table is built once per type and shared
//! by every [`BeanAdapter`] over that type.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::trace;

use crate::dictionary::{Dictionary, Entries};
use crate::value::Value;

/// Zero-argument property getter.
pub type Getter<T> = for<'b> fn(&'b T) -> Value<'b>;

/// Types that expose named read-only properties.
///
/// # Example
///
/// ```
/// use httprpc_beans::{Accessors, Adapt, Bean, BeanAdapter, Dictionary, Value};
///
/// struct Point { x: i32, y: i32 }
///
/// impl Bean for Point {
///     fn describe(accessors: &mut Accessors<Self>) {
///         accessors
///             .add("x", |p| p.x.adapt())
///             .add("y", |p| p.y.adapt());
///     }
/// }
///
/// let point = Point { x: 1, y: 2 };
/// let adapter = BeanAdapter::new(&point);
/// assert_eq!(adapter.get("y").and_then(|v| v.as_number()).map(|n| n.to_i64()), Some(2));
/// assert!(adapter.get("z").is_none());
/// ```
pub trait Bean: Sized + 'static {
    /// Registers the getters of this type.
    fn describe(accessors: &mut Accessors<Self>);
}

/// Ordered table of property getters for one bean type.
pub struct Accessors<T> {
    getters: IndexMap<&'static str, Getter<T>>,
}

impl<T> Accessors<T> {
    pub fn new() -> Self {
        Accessors {
            getters: IndexMap::new(),
        }
    }

    /// Registers a getter. A later registration under the same name wins.
    pub fn add(&mut self, name: &'static str, getter: Getter<T>) -> &mut Self {
        self.getters.insert(name, getter);
        self
    }

    pub fn get(&self, name: &str) -> Option<Getter<T>> {
        self.getters.get(name).copied()
    }

    /// Property names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.getters.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.getters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.getters.is_empty()
    }
}

impl<T> Default for Accessors<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Accessors<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.getters.keys()).finish()
    }
}

type AccessorCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static ACCESSOR_CACHE: Lazy<AccessorCache> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns the cached property table for `T`, building it on first use.
///
/// Two threads racing on the first use may both build the table; the last
/// insert wins and both results are equivalent.
pub fn accessors<T: Bean>() -> Arc<Accessors<T>> {
    let id = TypeId::of::<T>();

    let cached = ACCESSOR_CACHE
        .read()
        .ok()
        .and_then(|cache| cache.get(&id).cloned());
    if let Some(table) = cached.and_then(|any| any.downcast::<Accessors<T>>().ok()) {
        return table;
    }

    let mut table = Accessors::new();
    T::describe(&mut table);
    let table = Arc::new(table);
    trace!(
        bean = std::any::type_name::<T>(),
        properties = table.len(),
        "built bean accessor table"
    );

    if let Ok(mut cache) = ACCESSOR_CACHE.write() {
        cache.insert(id, table.clone());
    }
    table
}

/// Read-only [`Dictionary`] over a [`Bean`].
pub struct BeanAdapter<'a, T> {
    bean: &'a T,
    accessors: Arc<Accessors<T>>,
}

impl<'a, T: Bean> BeanAdapter<'a, T> {
    pub fn new(bean: &'a T) -> Self {
        BeanAdapter {
            bean,
            accessors: accessors::<T>(),
        }
    }

    /// The shared property table backing this adapter.
    pub fn accessors(&self) -> &Arc<Accessors<T>> {
        &self.accessors
    }

    pub fn bean(&self) -> &'a T {
        self.bean
    }
}

impl<T: Bean> Dictionary for BeanAdapter<'_, T> {
    fn get(&self, key: &str) -> Option<Value<'_>> {
        self.accessors.get(key).map(|getter| getter(self.bean))
    }

    fn entries(&self) -> Entries<'_> {
        let bean = self.bean;
        Box::new(
            self.accessors
                .getters
                .iter()
                .map(move |(name, getter)| (Cow::Borrowed(*name), getter(bean))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapt::Adapt;

    struct Account {
        owner: String,
        active: bool,
    }

    impl Bean for Account {
        fn describe(accessors: &mut Accessors<Self>) {
            accessors
                .add("owner", |a| a.owner.adapt())
                .add("active", |a| a.active.adapt());
        }
    }

    #[test]
    fn getters_resolve_by_name() {
        let account = Account {
            owner: "ada".into(),
            active: true,
        };
        let adapter = BeanAdapter::new(&account);
        assert_eq!(adapter.get("owner").unwrap().as_str(), Some("ada"));
        assert_eq!(adapter.get("active").unwrap().as_bool(), Some(true));
        assert!(adapter.get("balance").is_none());
    }

    #[test]
    fn entries_follow_registration_order() {
        let account = Account {
            owner: "ada".into(),
            active: false,
        };
        let adapter = BeanAdapter::new(&account);
        let names: Vec<_> = adapter.entries().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(names, vec!["owner", "active"]);
    }

    #[test]
    fn accessor_table_is_shared_between_adapters() {
        let first = Account {
            owner: "a".into(),
            active: true,
        };
        let second = Account {
            owner: "b".into(),
            active: false,
        };
        let a = BeanAdapter::new(&first);
        let b = BeanAdapter::new(&second);
        assert!(Arc::ptr_eq(a.accessors(), b.accessors()));
    }
}
