//! # HTTP-RPC Template - Streaming Template Serializer
//!
//! `httprpc-template` renders handler results through mustache-style
//! templates without building an intermediate document. The template is
//! decoded and interpreted in a single forward pass; sections are replayed by
//! rewinding a buffered character reader.
//!
//! ## Core Concepts
//!
//! - [`TemplateSerializer`]: Renders an [`Adapt`](httprpc_beans::Adapt) value
//!   through a named template
//! - [`TemplateLoader`]: Where templates, includes and bundles come from
//!   ([`DirLoader`], [`MemoryLoader`])
//! - [`ModifierRegistry`]: Named value transforms such as `format` and the
//!   `^html`/`^xml`/`^json`/`^csv`/`^url` escapers
//! - [`RenderOptions`]: Locale, time zone, resource bundle and `$` context for
//!   one render
//! - [`PagedReader`]: The mark/reset character reader sections replay through
//!
//! ## Quick Start
//!
//! ```rust
//! use httprpc_beans::Bean;
//! use httprpc_template::{Locale, MemoryLoader, RenderOptions, TemplateSerializer};
//!
//! #[derive(Bean)]
//! struct Invoice {
//!     customer: String,
//!     total: f64,
//! }
//!
//! let loader = MemoryLoader::new()
//!     .with("invoice.html", "<p>{{customer}}: {{total:format=currency}}</p>");
//! let serializer = TemplateSerializer::new(loader, "invoice.html", "text/html")
//!     .escape_by_extension();
//!
//! let invoice = Invoice { customer: "Smith & Sons".into(), total: 1234.5 };
//! let options = RenderOptions::new().with_locale(Locale::parse("en-US"));
//! let html = serializer.render_to_string(&invoice, &options).unwrap();
//! assert_eq!(html, "<p>Smith &amp; Sons: $1,234.50</p>");
//! ```
//!
//! ## Markers
//!
//! | Marker | Effect |
//! |--------|--------|
//! | `{{name}}`, `{{a.b.c}}` | value at a (dotted) key |
//! | `{{.}}` | the current value itself |
//! | `{{name:format=%.2f:^html}}` | value passed through modifiers, left to right |
//! | `{{#list[, ]}} .. {{/list}}` | body once per element, optional separator |
//! | `{{?flag}} .. {{/flag}}` | body when the value is truthy |
//! | `{{^flag}} .. {{/flag}}` | body when it is not |
//! | `{{>footer.html}}` | include, relative to the template |
//! | `{{@key}}` | localized string from the template's `.properties` bundle |
//! | `{{$key}}` | context variable from [`RenderOptions`] |
//! | `{{!comment}}` | nothing |
//!
//! Missing values render as nothing. Structural problems (a section closed
//! under the wrong name, a marker that never ends) abort the render with a
//! [`TemplateError`].

pub mod bundle;
mod error;
pub mod loader;
pub mod locale;
pub mod marker;
pub mod modifiers;
mod reader;
mod serializer;
mod sink;

pub use bundle::{BundleChain, Properties, ResourceBundle};
pub use error::{Result, TemplateError};
pub use loader::{DirLoader, MemoryLoader, TemplateLoader};
pub use locale::Locale;
pub use modifiers::{
    Modifier, ModifierConfig, ModifierContext, ModifierMapping, ModifierRegistry, RegistryError,
};
pub use reader::PagedReader;
pub use serializer::{RenderOptions, TemplateSerializer};
pub use sink::{IoSink, NullSink, Sink};
