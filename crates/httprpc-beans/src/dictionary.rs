//! The dictionary and sequence views consumed by the renderer.

use std::borrow::Cow;
use std::iter;

use crate::error::Result;
use crate::value::Value;

/// Lazily adapted elements of a [`Sequence`].
pub type Elements<'a> = Box<dyn Iterator<Item = Result<Value<'a>>> + 'a>;

/// Key/value entries of a [`Dictionary`].
pub type Entries<'a> = Box<dyn Iterator<Item = (Cow<'a, str>, Value<'a>)> + 'a>;

/// Read-only string-keyed view over some source object.
///
/// Implementations adapt values on access; nothing is materialized up front.
pub trait Dictionary {
    /// Looks up a single key. Missing keys return `None`, never an error.
    fn get(&self, key: &str) -> Option<Value<'_>>;

    /// Enumerates every key/value pair the dictionary exposes.
    fn entries(&self) -> Entries<'_>;
}

/// Ordered, possibly single-pass, sequence of values.
pub trait Sequence {
    /// Iterates the elements, adapting each on demand.
    ///
    /// One-pass sources yield nothing once consumed.
    fn elements(&self) -> Elements<'_>;

    /// Reports whether any element remains.
    ///
    /// One-pass sources may advance their cursor to answer, but must not
    /// lose the row they advanced to.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.elements().next().is_none())
    }

    /// Releases whatever resources the sequence owns.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl<D: Dictionary + ?Sized> Dictionary for &D {
    fn get(&self, key: &str) -> Option<Value<'_>> {
        (**self).get(key)
    }

    fn entries(&self) -> Entries<'_> {
        (**self).entries()
    }
}

impl<S: Sequence + ?Sized> Sequence for &S {
    fn elements(&self) -> Elements<'_> {
        (**self).elements()
    }

    fn is_empty(&self) -> Result<bool> {
        (**self).is_empty()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

/// Exposes a non-dictionary value under the self key `"."`.
pub struct SelfDictionary<'a> {
    value: Value<'a>,
}

impl<'a> SelfDictionary<'a> {
    /// Key under which the wrapped value is visible.
    pub const KEY: &'static str = ".";

    pub fn new(value: Value<'a>) -> Self {
        SelfDictionary { value }
    }
}

impl Dictionary for SelfDictionary<'_> {
    fn get(&self, key: &str) -> Option<Value<'_>> {
        (key == Self::KEY).then(|| self.value.reborrow())
    }

    fn entries(&self) -> Entries<'_> {
        Box::new(iter::once((
            Cow::Borrowed(Self::KEY),
            self.value.reborrow(),
        )))
    }
}

/// Resolves a split dotted path and passes the result to `f`.
///
/// The resolved value borrows from intermediate values that only live for the
/// duration of the walk, so it is handed to a callback rather than returned.
/// A missing key or a non-dictionary intermediate resolves to `None`. An
/// empty path resolves to the dictionary itself.
///
/// ```
/// use std::collections::HashMap;
/// use httprpc_beans::{lookup, Adapt, Value};
///
/// let mut inner = HashMap::new();
/// inner.insert("c".to_string(), 123);
/// let mut outer = HashMap::new();
/// outer.insert("b".to_string(), inner);
///
/// let value = outer.adapt();
/// let dict = value.as_dictionary().unwrap();
/// let found = lookup(dict, &["b", "c"], |v| v.and_then(|v| v.to_scalar()));
/// assert_eq!(found.map(|s| s.to_string()), Some("123".to_string()));
/// ```
pub fn lookup<R, F>(dictionary: &dyn Dictionary, path: &[&str], f: F) -> R
where
    F: for<'v> FnOnce(Option<Value<'v>>) -> R,
{
    match path {
        [] => f(Some(Value::Dictionary(Box::new(dictionary)))),
        [key] => f(dictionary.get(key)),
        [key, rest @ ..] => match dictionary.get(key) {
            Some(Value::Dictionary(inner)) => lookup(inner.as_ref(), rest, f),
            _ => f(None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    struct Pair;

    impl Dictionary for Pair {
        fn get(&self, key: &str) -> Option<Value<'_>> {
            match key {
                "left" => Some(Value::from(1i64)),
                "right" => Some(Value::dictionary(SelfDictionary::new(Value::from("r")))),
                _ => None,
            }
        }

        fn entries(&self) -> Entries<'_> {
            Box::new(iter::empty())
        }
    }

    #[test]
    fn lookup_walks_nested_dictionaries() {
        let found = lookup(&Pair, &["right", "."], |v| v.and_then(|v| v.to_scalar()));
        assert_eq!(found.map(|s| s.to_string()), Some("r".to_string()));
    }

    #[test]
    fn lookup_through_scalar_is_absent() {
        let found = lookup(&Pair, &["left", "x"], |v| v.is_none());
        assert!(found);
    }

    #[test]
    fn lookup_missing_key_is_absent() {
        assert!(lookup(&Pair, &["nope"], |v| v.is_none()));
    }

    #[test]
    fn lookup_single_key() {
        let found = lookup(&Pair, &["left"], |v| v.and_then(|v| v.as_number()));
        assert_eq!(found, Some(Number::I64(1)));
    }

    #[test]
    fn self_dictionary_only_answers_dot() {
        let dict = SelfDictionary::new(Value::from("x"));
        assert_eq!(dict.get(".").and_then(|v| v.as_str().map(str::to_owned)), Some("x".into()));
        assert!(dict.get("x").is_none());
        assert_eq!(dict.entries().count(), 1);
    }
}
