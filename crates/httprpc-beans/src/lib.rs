//! Beans - lazy dictionary views for template rendering.
//!
//! The renderer consumes one uniform shape: a [`Value`] that is either a
//! scalar, a [`Dictionary`] or a [`Sequence`]. This crate turns handler
//! results into that shape without materializing them:
//!
//! - Maps, vectors, JSON documents and chrono date-times via [`Adapt`]
//! - Domain objects via [`Bean`] and `#[derive(Bean)]`
//! - Database cursors via [`RowAdapter`], other row iterators via
//!   [`IteratorAdapter`]
//! - XML documents via [`ElementAdapter`]
//!
//! # Quick Start
//!
//! ```rust
//! use httprpc_beans::{lookup, Adapt, Bean};
//!
//! #[derive(Bean)]
//! struct Address {
//!     city: String,
//! }
//!
//! #[derive(Bean)]
//! struct Customer {
//!     first_name: String,
//!     home_address: Address,
//! }
//!
//! let customer = Customer {
//!     first_name: "Ada".into(),
//!     home_address: Address { city: "London".into() },
//! };
//!
//! let value = customer.adapt();
//! let dict = value.as_dictionary().unwrap();
//! let city = lookup(dict, &["homeAddress", "city"], |v| {
//!     v.and_then(|v| v.as_str().map(str::to_owned))
//! });
//! assert_eq!(city.as_deref(), Some("London"));
//! ```
//!
//! # Rows
//!
//! Row adapters are single-pass: advancing the cursor has side effects, so a
//! second iteration after exhaustion yields nothing. Column labels with `.`
//! build nested rows.

extern crate self as httprpc_beans;

mod adapt;
mod bean;
mod dictionary;
mod error;
mod rows;
mod value;
mod xml;

pub use adapt::{Adapt, ListAdapter, MapAdapter};
pub use bean::{accessors, Accessors, Bean, BeanAdapter, Getter};
pub use dictionary::{lookup, Dictionary, Elements, Entries, SelfDictionary, Sequence};
pub use error::{AdapterError, Result};
pub use rows::{Cell, Cursor, IteratorAdapter, Resource, Row, RowAdapter};
pub use value::{Number, Scalar, Timestamp, Value};
pub use xml::{Element, ElementAdapter, Node};

/// Derives [`Bean`] and [`Adapt`] for a struct with named fields.
pub use httprpc_macros::Bean;
