//! Named value modifiers applied during variable substitution.
//!
//! A variable marker such as `{{amount:format=currency:^html}}` names a chain
//! of modifiers. Each one receives the scalar produced by the previous step
//! plus its optional `=argument`, and returns a new scalar.
//!
//! # Built-ins
//!
//! | Name     | Effect |
//! |----------|--------|
//! | `format` | Locale-aware number/date formatting, or a printf-style pattern |
//! | `^html`  | Escapes `< > & "` as entity references |
//! | `^xml`   | Same table as `^html` |
//! | `^json`  | Escapes quotes, backslashes and control characters |
//! | `^csv`   | Backslash-escapes `"` and `\` |
//! | `^url`   | `application/x-www-form-urlencoded` encoding |
//!
//! # Process-wide registry
//!
//! [`ModifierRegistry::global`] returns the registry serializers use when none
//! is given explicitly. It is initialised lazily with the built-ins, or may be
//! replaced exactly once, before first use, with [`ModifierRegistry::install`].
//!
//! ```rust
//! use httprpc_beans::Scalar;
//! use httprpc_template::ModifierRegistry;
//!
//! let mut registry = ModifierRegistry::builtins();
//! registry.register_fn("upper", |value: Scalar, _, _| {
//!     Scalar::String(value.to_string().to_uppercase())
//! });
//! assert!(registry.resolve("upper").is_some());
//! assert!(registry.resolve("^html").is_some());
//! ```

mod escape;
mod format;
mod printf;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::FixedOffset;
use httprpc_beans::Scalar;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use thiserror::Error;

use crate::locale::Locale;

pub use escape::{escape_csv, escape_json, escape_markup, escape_url};
pub use format::format_value;
pub use printf::sprintf;

/// Render-time settings visible to modifiers.
#[derive(Debug, Clone, Copy)]
pub struct ModifierContext<'a> {
    pub locale: &'a Locale,
    pub time_zone: FixedOffset,
}

impl<'a> ModifierContext<'a> {
    pub fn new(locale: &'a Locale, time_zone: FixedOffset) -> Self {
        ModifierContext { locale, time_zone }
    }
}

/// A named, stateless scalar transform.
pub trait Modifier: Send + Sync {
    fn apply(&self, value: Scalar, argument: Option<&str>, context: &ModifierContext<'_>)
        -> Scalar;
}

struct FnModifier<F>(F);

impl<F> Modifier for FnModifier<F>
where
    F: Fn(Scalar, Option<&str>, &ModifierContext<'_>) -> Scalar + Send + Sync,
{
    fn apply(
        &self,
        value: Scalar,
        argument: Option<&str>,
        context: &ModifierContext<'_>,
    ) -> Scalar {
        (self.0)(value, argument, context)
    }
}

/// An existing modifier with a default argument bound to it.
struct BoundModifier {
    inner: Arc<dyn Modifier>,
    argument: Option<String>,
}

impl Modifier for BoundModifier {
    fn apply(
        &self,
        value: Scalar,
        argument: Option<&str>,
        context: &ModifierContext<'_>,
    ) -> Scalar {
        self.inner
            .apply(value, argument.or(self.argument.as_deref()), context)
    }
}

/// Errors from registry installation and configuration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a process-wide modifier registry is already installed")]
    AlreadyInstalled,

    #[error("modifier mapping refers to unknown modifier: {0}")]
    UnknownBase(String),

    #[error("invalid modifier configuration: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for RegistryError {
    fn from(err: serde_yaml::Error) -> Self {
        RegistryError::Config(err.to_string())
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Config(err.to_string())
    }
}

/// Externally declared modifier mappings.
///
/// ```yaml
/// modifiers:
///   money:
///     modifier: format
///     argument: currency
///   escape: ^html
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ModifierConfig {
    #[serde(default)]
    pub modifiers: IndexMap<String, ModifierMapping>,
}

/// One entry of a [`ModifierConfig`].
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModifierMapping {
    /// Another name for an existing modifier.
    Alias(String),
    /// An existing modifier with a default argument.
    Bound {
        modifier: String,
        #[serde(default)]
        argument: Option<String>,
    },
}

impl ModifierConfig {
    pub fn from_yaml(source: &str) -> Result<Self, RegistryError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }
}

static GLOBAL: OnceCell<Arc<ModifierRegistry>> = OnceCell::new();

/// Name to modifier map.
#[derive(Clone, Default)]
pub struct ModifierRegistry {
    modifiers: HashMap<String, Arc<dyn Modifier>>,
}

impl ModifierRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in modifiers.
    pub fn builtins() -> Self {
        let mut registry = Self::new();
        registry.register_fn("format", format::format_value);
        escape::register(&mut registry);
        registry
    }

    /// Built-ins plus the mappings declared in `config`.
    pub fn with_config(config: &ModifierConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::builtins();
        registry.apply_config(config)?;
        Ok(registry)
    }

    /// Registers `modifier` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, modifier: impl Modifier + 'static) {
        self.modifiers.insert(name.into(), Arc::new(modifier));
    }

    /// Registers a function or closure as a modifier.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Scalar, Option<&str>, &ModifierContext<'_>) -> Scalar + Send + Sync + 'static,
    {
        self.register(name, FnModifier(f));
    }

    /// Looks up a modifier by name.
    pub fn resolve(&self, name: &str) -> Option<&dyn Modifier> {
        self.modifiers.get(name).map(|m| m.as_ref())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modifiers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Adds the aliases declared in `config`. Entries may refer to modifiers
    /// declared earlier in the same document.
    pub fn apply_config(&mut self, config: &ModifierConfig) -> Result<(), RegistryError> {
        for (name, mapping) in &config.modifiers {
            let (base, argument) = match mapping {
                ModifierMapping::Alias(base) => (base, None),
                ModifierMapping::Bound { modifier, argument } => (modifier, argument.clone()),
            };
            let inner = self
                .modifiers
                .get(base)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownBase(base.clone()))?;
            tracing::debug!(name = %name, base = %base, "registering modifier alias");
            self.register(name.clone(), BoundModifier { inner, argument });
        }
        Ok(())
    }

    /// The process-wide registry, initialised with the built-ins on first use.
    pub fn global() -> Arc<ModifierRegistry> {
        GLOBAL
            .get_or_init(|| Arc::new(ModifierRegistry::builtins()))
            .clone()
    }

    /// Installs `registry` as the process-wide registry. Fails if one is
    /// already in place, including the lazily created default.
    pub fn install(registry: ModifierRegistry) -> Result<(), RegistryError> {
        let names = registry.len();
        GLOBAL
            .set(Arc::new(registry))
            .map_err(|_| RegistryError::AlreadyInstalled)?;
        tracing::debug!(modifiers = names, "installed process-wide modifier registry");
        Ok(())
    }
}

impl fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierRegistry")
            .field("modifiers", &self.names())
            .finish()
    }
}
