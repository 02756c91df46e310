//! Conversion of handler results into renderer values.
//!
//! [`Adapt`] is implemented for the scalar types, for standard collections
//! (wrapped in lazy [`ListAdapter`]/[`MapAdapter`] views), for JSON documents
//! and for chrono date-times. `#[derive(Bean)]` implements it for user types.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use indexmap::IndexMap;

use crate::dictionary::{Dictionary, Elements, Entries, Sequence};
use crate::error::Result;
use crate::value::{Number, Scalar, Timestamp, Value};

/// Types that can be viewed as a renderer [`Value`].
pub trait Adapt {
    /// Produces a value borrowing from `self`.
    fn adapt(&self) -> Value<'_>;
}

impl Adapt for str {
    fn adapt(&self) -> Value<'_> {
        Value::String(Cow::Borrowed(self))
    }
}

impl Adapt for String {
    fn adapt(&self) -> Value<'_> {
        Value::String(Cow::Borrowed(self))
    }
}

impl Adapt for Cow<'_, str> {
    fn adapt(&self) -> Value<'_> {
        Value::String(Cow::Borrowed(self))
    }
}

impl Adapt for bool {
    fn adapt(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

impl Adapt for char {
    fn adapt(&self) -> Value<'_> {
        Value::String(Cow::Owned(self.to_string()))
    }
}

macro_rules! adapt_number {
    ($($t:ty),*) => {
        $(
            impl Adapt for $t {
                fn adapt(&self) -> Value<'_> {
                    Value::Number(Number::from(*self))
                }
            }
        )*
    };
}

adapt_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Adapt for Number {
    fn adapt(&self) -> Value<'_> {
        Value::Number(*self)
    }
}

impl Adapt for Timestamp {
    fn adapt(&self) -> Value<'_> {
        Value::Timestamp(*self)
    }
}

impl Adapt for Scalar {
    fn adapt(&self) -> Value<'_> {
        self.as_value()
    }
}

impl Adapt for Value<'_> {
    fn adapt(&self) -> Value<'_> {
        self.reborrow()
    }
}

impl<T: Adapt + ?Sized> Adapt for &T {
    fn adapt(&self) -> Value<'_> {
        (**self).adapt()
    }
}

impl<T: Adapt + ?Sized> Adapt for Box<T> {
    fn adapt(&self) -> Value<'_> {
        (**self).adapt()
    }
}

impl<T: Adapt + ?Sized> Adapt for Rc<T> {
    fn adapt(&self) -> Value<'_> {
        (**self).adapt()
    }
}

impl<T: Adapt + ?Sized> Adapt for Arc<T> {
    fn adapt(&self) -> Value<'_> {
        (**self).adapt()
    }
}

impl<T: Adapt> Adapt for Option<T> {
    fn adapt(&self) -> Value<'_> {
        match self {
            Some(value) => value.adapt(),
            None => Value::Null,
        }
    }
}

impl<T: Adapt> Adapt for [T] {
    fn adapt(&self) -> Value<'_> {
        Value::sequence(ListAdapter::new(self))
    }
}

impl<T: Adapt> Adapt for Vec<T> {
    fn adapt(&self) -> Value<'_> {
        Value::sequence(ListAdapter::new(self.as_slice()))
    }
}

impl<V: Adapt, S: BuildHasher> Adapt for HashMap<String, V, S> {
    fn adapt(&self) -> Value<'_> {
        Value::dictionary(MapAdapter::new(self))
    }
}

impl<V: Adapt> Adapt for BTreeMap<String, V> {
    fn adapt(&self) -> Value<'_> {
        Value::dictionary(MapAdapter::new(self))
    }
}

impl<V: Adapt, S: BuildHasher> Adapt for IndexMap<String, V, S> {
    fn adapt(&self) -> Value<'_> {
        Value::dictionary(MapAdapter::new(self))
    }
}

impl Adapt for serde_json::Value {
    fn adapt(&self) -> Value<'_> {
        use serde_json::Value as Json;
        match self {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(json_number(n)),
            Json::String(s) => Value::String(Cow::Borrowed(s)),
            Json::Array(items) => Value::sequence(ListAdapter::new(items.as_slice())),
            Json::Object(map) => Value::dictionary(MapAdapter::new(map)),
        }
    }
}

impl Adapt for serde_json::Map<String, serde_json::Value> {
    fn adapt(&self) -> Value<'_> {
        Value::dictionary(MapAdapter::new(self))
    }
}

pub(crate) fn json_number(n: &serde_json::Number) -> Number {
    if let Some(i) = n.as_i64() {
        Number::I64(i)
    } else if let Some(u) = n.as_u64() {
        Number::U64(u)
    } else {
        Number::F64(n.as_f64().unwrap_or(f64::NAN))
    }
}

impl<Tz: TimeZone> Adapt for DateTime<Tz> {
    fn adapt(&self) -> Value<'_> {
        Value::Timestamp(Timestamp(self.timestamp_millis()))
    }
}

impl Adapt for NaiveDateTime {
    fn adapt(&self) -> Value<'_> {
        Value::Timestamp(Timestamp(self.and_utc().timestamp_millis()))
    }
}

impl Adapt for NaiveDate {
    fn adapt(&self) -> Value<'_> {
        match self.and_hms_opt(0, 0, 0) {
            Some(midnight) => Value::Timestamp(Timestamp(midnight.and_utc().timestamp_millis())),
            None => Value::Null,
        }
    }
}

/// Lazy sequence view over a slice; elements are adapted as they are visited.
pub struct ListAdapter<'a, T> {
    items: &'a [T],
}

impl<'a, T: Adapt> ListAdapter<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        ListAdapter { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Adapts the element at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Value<'a>> {
        self.items.get(index).map(Adapt::adapt)
    }
}

impl<T: Adapt> Sequence for ListAdapter<'_, T> {
    fn elements(&self) -> Elements<'_> {
        Box::new(self.items.iter().map(|item| Ok(item.adapt())))
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.items.is_empty())
    }
}

/// Lazy dictionary view over a string-keyed map.
pub struct MapAdapter<'a, M: ?Sized> {
    map: &'a M,
}

impl<'a, M: ?Sized> MapAdapter<'a, M> {
    pub fn new(map: &'a M) -> Self {
        MapAdapter { map }
    }
}

macro_rules! map_dictionary {
    ($map:ty $(, $bound:ident : $trait:path)?) => {
        impl<V: Adapt $(, $bound: $trait)?> Dictionary for MapAdapter<'_, $map> {
            fn get(&self, key: &str) -> Option<Value<'_>> {
                self.map.get(key).map(Adapt::adapt)
            }

            fn entries(&self) -> Entries<'_> {
                Box::new(
                    self.map
                        .iter()
                        .map(|(key, value)| (Cow::Borrowed(key.as_str()), value.adapt())),
                )
            }
        }
    };
}

map_dictionary!(HashMap<String, V, S>, S: BuildHasher);
map_dictionary!(IndexMap<String, V, S>, S: BuildHasher);
map_dictionary!(BTreeMap<String, V>);

impl Dictionary for MapAdapter<'_, serde_json::Map<String, serde_json::Value>> {
    fn get(&self, key: &str) -> Option<Value<'_>> {
        self.map.get(key).map(Adapt::adapt)
    }

    fn entries(&self) -> Entries<'_> {
        Box::new(
            self.map
                .iter()
                .map(|(key, value)| (Cow::Borrowed(key.as_str()), value.adapt())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vec_adapts_to_lazy_sequence() {
        let items = vec![1, 2, 3];
        let value = items.adapt();
        let seq = value.as_sequence().unwrap();
        let numbers: Vec<i64> = seq
            .elements()
            .map(|v| v.unwrap().as_number().unwrap().to_i64())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(!seq.is_empty().unwrap());
    }

    #[test]
    fn map_adapter_returns_none_for_missing_keys() {
        let mut map = HashMap::new();
        map.insert("name".to_string(), "Ada".to_string());
        let value = map.adapt();
        let dict = value.as_dictionary().unwrap();
        assert_eq!(dict.get("name").unwrap().as_str(), Some("Ada"));
        assert!(dict.get("age").is_none());
    }

    #[test]
    fn index_map_preserves_entry_order() {
        let mut map = IndexMap::new();
        map.insert("z".to_string(), 1);
        map.insert("a".to_string(), 2);
        let value = map.adapt();
        let keys: Vec<String> = value
            .as_dictionary()
            .unwrap()
            .entries()
            .map(|(k, _)| k.into_owned())
            .collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn json_documents_adapt_structurally() {
        let doc = json!({"a": {"b": [1, 2.5, "x", null, true]}});
        let value = doc.adapt();
        let a = value.as_dictionary().unwrap().get("a").unwrap();
        let b = a.as_dictionary().unwrap().get("b").unwrap();
        let kinds: Vec<&str> = b
            .as_sequence()
            .unwrap()
            .elements()
            .map(|v| v.unwrap().kind())
            .collect();
        assert_eq!(kinds, vec!["number", "number", "string", "null", "boolean"]);
    }

    #[test]
    fn option_none_is_null() {
        let missing: Option<String> = None;
        assert!(missing.adapt().is_null());
        assert_eq!(Some(5u8).adapt().as_number(), Some(Number::U64(5)));
    }

    #[test]
    fn dates_adapt_to_timestamps() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(date.adapt().as_timestamp(), Some(Timestamp(86_400_000)));
    }
}
