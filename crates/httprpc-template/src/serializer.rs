//! The template serializer.
//!
//! [`TemplateSerializer`] streams a template against an adapted value in a
//! single forward pass. Nothing is parsed ahead of time: text is copied to the
//! sink as it is read, and markers are interpreted the moment they are seen.
//!
//! # Sections
//!
//! A repeating section body is replayed once per element by marking the
//! reader before each iteration and resetting it afterwards. An empty or
//! absent section, and a conditional whose value is falsy, is still scanned so
//! the reader ends up past its end marker, but into a discarding sink.
//!
//! # Includes
//!
//! Each non-empty repeating section opens a fresh include scope. The first
//! reference to an include within a scope opens it; later references rewind
//! the cached reader instead, so a footer inside a thousand-row table is
//! opened once. Includes in a discarded body are never opened.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use httprpc_template::{MemoryLoader, RenderOptions, TemplateSerializer};
//!
//! let loader = MemoryLoader::new().with("list.html", "{{#rows[, ]}}{{name}}{{/rows}}");
//! let serializer = TemplateSerializer::new(loader, "list.html", "text/html");
//!
//! let rows: Vec<HashMap<String, String>> = ["a", "b"]
//!     .iter()
//!     .map(|n| HashMap::from([("name".to_string(), n.to_string())]))
//!     .collect();
//! let root = HashMap::from([("rows".to_string(), rows)]);
//!
//! let out = serializer.render_to_string(&root, &RenderOptions::default()).unwrap();
//! assert_eq!(out, "a, b");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::iter::Peekable;
use std::mem;
use std::sync::{Arc, Mutex};

use chrono::{FixedOffset, Offset, Utc};
use httprpc_beans::{
    lookup, Adapt, Dictionary, Elements, Scalar, SelfDictionary, Sequence, Value,
};
use indexmap::IndexMap;

use crate::bundle::{BundleChain, ResourceBundle};
use crate::error::{Result, TemplateError};
use crate::loader::{resolve_relative, TemplateLoader};
use crate::locale::Locale;
use crate::marker::{read_marker, Marker, MarkerKind};
use crate::modifiers::{ModifierContext, ModifierRegistry};
use crate::reader::PagedReader;
use crate::sink::{IoSink, NullSink, Sink};

type Source = PagedReader<Box<dyn Read>>;

/// Per-render settings.
#[derive(Clone)]
pub struct RenderOptions {
    locale: Locale,
    time_zone: FixedOffset,
    bundle: Option<Arc<dyn ResourceBundle>>,
    context: IndexMap<String, Scalar>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_time_zone(mut self, time_zone: FixedOffset) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Uses `bundle` for `{{@key}}` markers instead of resolving one from
    /// the template's `.properties` files.
    pub fn with_bundle(mut self, bundle: impl ResourceBundle + 'static) -> Self {
        self.bundle = Some(Arc::new(bundle));
        self
    }

    /// Adds a `{{$key}}` context variable.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn time_zone(&self) -> FixedOffset {
        self.time_zone
    }

    pub fn context(&self) -> &IndexMap<String, Scalar> {
        &self.context
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            locale: Locale::default(),
            time_zone: utc(),
            bundle: None,
            context: IndexMap::new(),
        }
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("locale", &self.locale)
            .field("time_zone", &self.time_zone)
            .field("bundle", &self.bundle.is_some())
            .field("context", &self.context)
            .finish()
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

type BundleCache = Mutex<HashMap<Locale, Option<Arc<dyn ResourceBundle>>>>;

/// Renders values through a named template.
pub struct TemplateSerializer {
    loader: Arc<dyn TemplateLoader>,
    template: String,
    content_type: String,
    modifiers: Option<Arc<ModifierRegistry>>,
    default_modifier: Option<String>,
    bundles: BundleCache,
}

impl TemplateSerializer {
    /// Creates a serializer for `template`, opened through `loader`.
    /// `content_type` is reported back unchanged by
    /// [`content_type`](Self::content_type).
    pub fn new(
        loader: impl TemplateLoader + 'static,
        template: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        TemplateSerializer {
            loader: Arc::new(loader),
            template: template.into(),
            content_type: content_type.into(),
            modifiers: None,
            default_modifier: None,
            bundles: Mutex::new(HashMap::new()),
        }
    }

    /// Uses `modifiers` instead of the process-wide registry.
    pub fn with_modifiers(mut self, modifiers: Arc<ModifierRegistry>) -> Self {
        self.modifiers = Some(modifiers);
        self
    }

    /// Applies the named modifier to every variable after its own chain.
    pub fn with_default_modifier(mut self, name: impl Into<String>) -> Self {
        self.default_modifier = Some(name.into());
        self
    }

    /// Picks the default escape modifier from the template's extension:
    /// `html`/`htm` → `^html`, `xml` → `^xml`, `json` → `^json`,
    /// `csv` → `^csv`. Other extensions leave the default unset.
    pub fn escape_by_extension(self) -> Self {
        let extension = self
            .template
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let modifier = match extension.as_str() {
            "html" | "htm" | "xhtml" => "^html",
            "xml" => "^xml",
            "json" => "^json",
            "csv" => "^csv",
            _ => return self,
        };
        self.with_default_modifier(modifier)
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn template_name(&self) -> &str {
        &self.template
    }

    pub fn default_modifier(&self) -> Option<&str> {
        self.default_modifier.as_deref()
    }

    /// Renders `value` into `sink`.
    ///
    /// A value that adapts to null writes nothing and does not open the
    /// template. A value that is not a dictionary is visible as `{{.}}`.
    pub fn write_value<T: Adapt + ?Sized>(
        &self,
        value: &T,
        sink: &mut dyn Sink,
        options: &RenderOptions,
    ) -> Result<()> {
        let root = value.adapt();
        if root.is_null() {
            return Ok(());
        }

        let mut reader = self.open(&self.template, TemplateError::TemplateNotFound)?;
        tracing::debug!(
            template = %self.template,
            content_type = %self.content_type,
            locale = %options.locale,
            "rendering template"
        );

        let modifiers = self
            .modifiers
            .clone()
            .unwrap_or_else(ModifierRegistry::global);
        let mut render = Render {
            serializer: self,
            options,
            modifiers,
            context: ModifierContext::new(&options.locale, options.time_zone),
            bundle: None,
            includes: Vec::new(),
            sections: Vec::new(),
            active_includes: vec![self.template.clone()],
        };

        let result = match root.as_dictionary() {
            Some(dictionary) => render.write_root(&mut reader, dictionary, sink),
            None => {
                let wrapped = SelfDictionary::new(root.reborrow());
                render.write_root(&mut reader, &wrapped, sink)
            }
        };
        reader.close();
        result?;

        if sink.has_error() {
            return Err(TemplateError::Output(
                "sink reported a write failure".to_string(),
            ));
        }
        Ok(())
    }

    /// Renders `value` as UTF-8 into `writer`, flushing at the end.
    pub fn write_to<T: Adapt + ?Sized, W: io::Write>(
        &self,
        value: &T,
        writer: W,
        options: &RenderOptions,
    ) -> Result<()> {
        let mut sink = IoSink::new(writer);
        let result = self.write_value(value, &mut sink, options);
        if let Some(err) = sink.take_error() {
            return Err(TemplateError::Io(err));
        }
        result?;
        sink.flush()?;
        Ok(())
    }

    /// Renders `value` into a new string.
    pub fn render_to_string<T: Adapt + ?Sized>(
        &self,
        value: &T,
        options: &RenderOptions,
    ) -> Result<String> {
        let mut out = String::new();
        self.write_value(value, &mut out, options)?;
        Ok(out)
    }

    fn open(&self, name: &str, not_found: fn(String) -> TemplateError) -> Result<Source> {
        match self.loader.open(name) {
            Ok(source) => Ok(PagedReader::new(source)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(not_found(name.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    fn bundle_for(&self, locale: &Locale) -> Result<Option<Arc<dyn ResourceBundle>>> {
        if let Ok(cache) = self.bundles.lock() {
            if let Some(bundle) = cache.get(locale) {
                return Ok(bundle.clone());
            }
        }

        let base = bundle_base(&self.template);
        let bundle = BundleChain::load(self.loader.as_ref(), base, locale)?
            .map(|chain| Arc::new(chain) as Arc<dyn ResourceBundle>);
        if bundle.is_none() {
            tracing::debug!(base = %base, locale = %locale, "no resource bundle found");
        }

        if let Ok(mut cache) = self.bundles.lock() {
            cache.insert(locale.clone(), bundle.clone());
        }
        Ok(bundle)
    }
}

impl fmt::Debug for TemplateSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSerializer")
            .field("template", &self.template)
            .field("content_type", &self.content_type)
            .field("modifiers", &self.modifiers)
            .field("default_modifier", &self.default_modifier)
            .finish_non_exhaustive()
    }
}

/// Template name without its extension.
fn bundle_base(template: &str) -> &str {
    match template.rfind('.') {
        Some(dot) if !template[dot..].contains('/') => &template[..dot],
        _ => template,
    }
}

fn split_path(name: &str) -> Vec<&str> {
    if name == SelfDictionary::KEY {
        vec![name]
    } else {
        name.split('.').collect()
    }
}

/// Why a call to `write_template` returned.
enum Exit {
    Eof,
    SectionEnd,
}

enum IncludeScope {
    Cached(HashMap<String, Source>),
    Discard,
}

/// State of one render call.
struct Render<'s> {
    serializer: &'s TemplateSerializer,
    options: &'s RenderOptions,
    modifiers: Arc<ModifierRegistry>,
    context: ModifierContext<'s>,
    bundle: Option<Option<Arc<dyn ResourceBundle>>>,
    includes: Vec<IncludeScope>,
    sections: Vec<String>,
    /// Resolved names of the template and includes being rendered.
    active_includes: Vec<String>,
}

impl Render<'_> {
    fn write_root(
        &mut self,
        reader: &mut Source,
        dictionary: &dyn Dictionary,
        sink: &mut dyn Sink,
    ) -> Result<()> {
        self.includes.push(IncludeScope::Cached(HashMap::new()));
        let result = self.write_template(reader, dictionary, sink);
        self.includes.pop();
        result.map(|_| ())
    }

    fn write_template(
        &mut self,
        reader: &mut Source,
        dictionary: &dyn Dictionary,
        sink: &mut dyn Sink,
    ) -> Result<Exit> {
        loop {
            if sink.has_error() {
                return Err(TemplateError::Output(
                    "sink reported a write failure".to_string(),
                ));
            }

            let Some(c) = reader.read()? else {
                return Ok(Exit::Eof);
            };
            if c != '{' {
                sink.write_char(c);
                continue;
            }

            match reader.read()? {
                Some('{') => {}
                Some(other) => {
                    sink.write_char('{');
                    sink.write_char(other);
                    continue;
                }
                None => {
                    sink.write_char('{');
                    return Ok(Exit::Eof);
                }
            }

            let marker = read_marker(reader)?;
            match marker.kind {
                MarkerKind::Comment => {}
                MarkerKind::Variable => self.write_variable(&marker, dictionary, sink)?,
                MarkerKind::RepeatingSection => {
                    self.write_repeating(&marker, reader, dictionary, sink)?
                }
                MarkerKind::ConditionalSection => {
                    self.write_conditional(&marker, reader, dictionary, sink, false)?
                }
                MarkerKind::InvertedSection => {
                    self.write_conditional(&marker, reader, dictionary, sink, true)?
                }
                MarkerKind::Include => self.write_include(&marker.name, dictionary, sink)?,
                MarkerKind::SectionEnd => {
                    return match self.sections.last() {
                        None => Err(TemplateError::UnmatchedSectionEnd(marker.name)),
                        Some(open) if *open != marker.name => {
                            Err(TemplateError::InvalidClosingSection {
                                expected: open.clone(),
                                found: marker.name,
                            })
                        }
                        Some(_) => Ok(Exit::SectionEnd),
                    };
                }
            }
        }
    }

    /// Renders up to and including the end marker of section `name`.
    fn write_body(
        &mut self,
        name: &str,
        reader: &mut Source,
        dictionary: &dyn Dictionary,
        sink: &mut dyn Sink,
    ) -> Result<()> {
        match self.write_template(reader, dictionary, sink)? {
            Exit::SectionEnd => Ok(()),
            Exit::Eof => Err(TemplateError::UnterminatedSection(name.to_string())),
        }
    }

    /// Renders a body against `value`, wrapping non-dictionaries as `{{.}}`.
    fn write_body_for(
        &mut self,
        name: &str,
        reader: &mut Source,
        value: &Value<'_>,
        sink: &mut dyn Sink,
    ) -> Result<()> {
        match value.as_dictionary() {
            Some(dictionary) => self.write_body(name, reader, dictionary, sink),
            None => {
                let wrapped = SelfDictionary::new(value.reborrow());
                self.write_body(name, reader, &wrapped, sink)
            }
        }
    }

    /// Scans a body without producing output or opening includes.
    fn discard_body(&mut self, name: &str, reader: &mut Source) -> Result<()> {
        self.includes.push(IncludeScope::Discard);
        let empty = SelfDictionary::new(Value::Null);
        let result = self.write_body(name, reader, &empty, &mut NullSink);
        self.includes.pop();
        result
    }

    fn write_repeating(
        &mut self,
        marker: &Marker,
        reader: &mut Source,
        dictionary: &dyn Dictionary,
        sink: &mut dyn Sink,
    ) -> Result<()> {
        let name = marker.name.as_str();
        let separator = marker.separator.as_deref();
        let path = split_path(name);

        self.sections.push(name.to_string());
        let result = lookup(dictionary, &path, |value| match value {
            None | Some(Value::Null) => self.discard_body(name, reader),
            Some(Value::Sequence(sequence)) => {
                self.write_sequence(name, separator, sequence.as_ref(), reader, sink)
            }
            Some(_) => Err(TemplateError::InvalidSection(name.to_string())),
        });
        self.sections.pop();
        result
    }

    fn write_sequence(
        &mut self,
        name: &str,
        separator: Option<&str>,
        sequence: &dyn Sequence,
        reader: &mut Source,
        sink: &mut dyn Sink,
    ) -> Result<()> {
        let mut elements = sequence.elements().peekable();

        let result = if elements.peek().is_none() {
            self.discard_body(name, reader)
        } else {
            self.includes.push(IncludeScope::Cached(HashMap::new()));
            let iterated = self.write_elements(name, separator, &mut elements, reader, sink);
            self.includes.pop();
            iterated.map(|count| {
                tracing::debug!(section = %name, iterations = count, "rendered section");
            })
        };

        drop(elements);
        let closed = sequence.close();
        result?;
        closed?;
        Ok(())
    }

    fn write_elements(
        &mut self,
        name: &str,
        separator: Option<&str>,
        elements: &mut Peekable<Elements<'_>>,
        reader: &mut Source,
        sink: &mut dyn Sink,
    ) -> Result<usize> {
        let mut count = 0;
        while let Some(element) = elements.next() {
            let element = element?;
            let more = elements.peek().is_some();

            if more {
                reader.mark();
            }
            if count > 0 {
                if let Some(separator) = separator {
                    sink.write_str(separator);
                }
            }

            self.write_body_for(name, reader, &element, sink)?;

            if more {
                reader.reset();
            }
            count += 1;
        }
        Ok(count)
    }

    fn write_conditional(
        &mut self,
        marker: &Marker,
        reader: &mut Source,
        dictionary: &dyn Dictionary,
        sink: &mut dyn Sink,
        inverted: bool,
    ) -> Result<()> {
        let name = marker.name.as_str();
        let path = split_path(name);

        self.sections.push(name.to_string());
        let result = lookup(dictionary, &path, |value| -> Result<()> {
            let truthy = match &value {
                None | Some(Value::Null) => false,
                Some(Value::Bool(b)) => *b,
                Some(Value::Sequence(sequence)) => !sequence.is_empty()?,
                Some(_) => true,
            };

            match (truthy, inverted, value) {
                (true, false, Some(value)) => self.write_body_for(name, reader, &value, sink),
                (false, true, _) => self.write_body(name, reader, dictionary, sink),
                _ => self.discard_body(name, reader),
            }
        });
        self.sections.pop();
        result
    }

    fn write_include(
        &mut self,
        name: &str,
        dictionary: &dyn Dictionary,
        sink: &mut dyn Sink,
    ) -> Result<()> {
        let cached = match self.includes.last_mut() {
            Some(IncludeScope::Discard) => return Ok(()),
            Some(IncludeScope::Cached(cache)) => cache.remove(name),
            None => None,
        };

        let resolved = resolve_relative(&self.serializer.template, name);
        if self.active_includes.contains(&resolved) {
            return Err(TemplateError::RecursiveInclude(name.to_string()));
        }

        let mut reader = match cached {
            Some(mut reader) => {
                tracing::trace!(include = %name, "include cache hit");
                reader.reset();
                reader
            }
            None => {
                tracing::trace!(include = %name, resolved = %resolved, "include cache miss");
                self.serializer
                    .open(&resolved, TemplateError::IncludeNotFound)?
            }
        };

        self.active_includes.push(resolved);
        let sections = mem::take(&mut self.sections);
        let result = self.write_template(&mut reader, dictionary, sink);
        self.sections = sections;
        self.active_includes.pop();

        if let Some(IncludeScope::Cached(cache)) = self.includes.last_mut() {
            cache.insert(name.to_string(), reader);
        }
        result.map(|_| ())
    }

    fn write_variable(
        &mut self,
        marker: &Marker,
        dictionary: &dyn Dictionary,
        sink: &mut dyn Sink,
    ) -> Result<()> {
        let name = marker.name.as_str();

        let resolved = if let Some(key) = name.strip_prefix('@') {
            let text = self
                .bundle()?
                .and_then(|bundle| bundle.get(key).map(str::to_string))
                .unwrap_or_else(|| key.to_string());
            Some(Scalar::String(text))
        } else if let Some(key) = name.strip_prefix('$') {
            Some(
                self.options
                    .context
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| Scalar::from(key)),
            )
        } else {
            let path = split_path(name);
            lookup(dictionary, &path, |value| match value {
                None | Some(Value::Null) => Ok(None),
                Some(value) => value
                    .to_scalar()
                    .map(Some)
                    .ok_or_else(|| TemplateError::InvalidVariable(name.to_string())),
            })?
        };

        let Some(mut value) = resolved else {
            return Ok(());
        };

        for call in &marker.modifiers {
            match self.modifiers.resolve(&call.name) {
                Some(modifier) => {
                    value = modifier.apply(value, call.argument.as_deref(), &self.context)
                }
                None => tracing::trace!(modifier = %call.name, "skipping unknown modifier"),
            }
        }

        if let Some(default) = &self.serializer.default_modifier {
            if let Some(modifier) = self.modifiers.resolve(default) {
                value = modifier.apply(value, None, &self.context);
            }
        }

        match &value {
            Scalar::String(s) => sink.write_str(s),
            other => sink.write_str(&other.to_string()),
        }
        Ok(())
    }

    fn bundle(&mut self) -> Result<Option<Arc<dyn ResourceBundle>>> {
        if let Some(bundle) = &self.bundle {
            return Ok(bundle.clone());
        }
        let bundle = match &self.options.bundle {
            Some(bundle) => Some(bundle.clone()),
            None => self.serializer.bundle_for(&self.options.locale)?,
        };
        self.bundle = Some(bundle.clone());
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;

    fn render(template: &str, value: &dyn Adapt) -> Result<String> {
        let loader = MemoryLoader::new().with("t.txt", template);
        TemplateSerializer::new(loader, "t.txt", "text/plain")
            .with_modifiers(Arc::new(ModifierRegistry::builtins()))
            .render_to_string(value, &RenderOptions::default())
    }

    #[test]
    fn plain_text_is_copied() {
        assert_eq!(render("hello { world }", &"x").unwrap(), "hello { world }");
        assert_eq!(render("trailing {", &"x").unwrap(), "trailing {");
    }

    #[test]
    fn non_dictionary_root_is_self() {
        assert_eq!(render("[{{.}}]", &42).unwrap(), "[42]");
        assert_eq!(render("{{#.}}<{{.}}>{{/.}}", &vec![1, 2]).unwrap(), "<1><2>");
    }

    #[test]
    fn null_root_writes_nothing_and_skips_template() {
        let loader = Arc::new(MemoryLoader::new().with("t.txt", "never"));
        let serializer = TemplateSerializer::new(loader.clone(), "t.txt", "text/plain");
        let out = serializer
            .render_to_string(&Option::<i32>::None, &RenderOptions::default())
            .unwrap();
        assert_eq!(out, "");
        assert_eq!(loader.open_count("t.txt"), 0);
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(render("a{{! note: ignored }}b", &"x").unwrap(), "ab");
    }

    #[test]
    fn bundle_base_strips_extension() {
        assert_eq!(bundle_base("pages/index.html"), "pages/index");
        assert_eq!(bundle_base("v1.0/index"), "v1.0/index");
        assert_eq!(bundle_base("plain"), "plain");
    }

    #[test]
    fn escape_by_extension_picks_modifier() {
        let loader = MemoryLoader::new();
        let s = TemplateSerializer::new(loader, "a.HTML", "text/html").escape_by_extension();
        assert_eq!(s.default_modifier(), Some("^html"));
        let s = TemplateSerializer::new(MemoryLoader::new(), "a.txt", "text/plain")
            .escape_by_extension();
        assert_eq!(s.default_modifier(), None);
        assert_eq!(s.content_type(), "text/plain");
        assert_eq!(s.template_name(), "a.txt");
    }
}
