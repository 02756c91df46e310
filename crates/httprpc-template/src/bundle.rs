//! Localized string tables for `{{@key}}` markers.
//!
//! Bundles are `.properties` files found next to the template:
//! `<base>_<lang>_<REGION>.properties`, `<base>_<lang>.properties` and
//! `<base>.properties`. All that exist are chained, most specific first, so a
//! regional file only needs to override what differs.

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::Arc;

use crate::loader::TemplateLoader;
use crate::locale::Locale;

/// Key to localized string lookup.
pub trait ResourceBundle: Send + Sync {
    fn get(&self, key: &str) -> Option<&str>;
}

impl ResourceBundle for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}

/// A parsed `.properties` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    /// Parses `.properties` syntax: `#`/`!` comments, `=`, `:` or whitespace
    /// separators, trailing-backslash continuations and `\uXXXX` escapes.
    pub fn parse(source: &str) -> Self {
        let mut entries = HashMap::new();
        let mut lines = source.lines();

        while let Some(line) = lines.next() {
            let mut logical = line.trim_start().to_string();
            if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
                continue;
            }
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }

            let (key, value) = split_entry(&logical);
            entries.insert(unescape(key), unescape(value));
        }

        Properties { entries }
    }

    pub fn from_reader(mut reader: impl Read) -> io::Result<Self> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        Ok(Self::parse(&source))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceBundle for Properties {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix(['=', ':'])
                    .map(str::trim_start)
                    .unwrap_or(rest);
                return (&line[..i], rest);
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let Ok(unit) = u32::from_str_radix(&hex, 16) else {
                    out.push_str("\\u");
                    out.push_str(&hex);
                    continue;
                };
                if (0xD800..0xDC00).contains(&unit) {
                    let rest = chars.as_str();
                    let low = rest
                        .strip_prefix("\\u")
                        .and_then(|r| r.get(..4))
                        .and_then(|h| u32::from_str_radix(h, 16).ok())
                        .filter(|low| (0xDC00..0xE000).contains(low));
                    if let Some(low) = low {
                        let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                        if let Some(decoded) = char::from_u32(combined) {
                            out.push(decoded);
                            chars = rest[6..].chars();
                            continue;
                        }
                    }
                }
                match char::from_u32(unit) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Layers of bundles searched in order.
pub struct BundleChain {
    layers: Vec<Arc<dyn ResourceBundle>>,
}

impl BundleChain {
    pub fn new(layers: Vec<Arc<dyn ResourceBundle>>) -> Self {
        BundleChain { layers }
    }

    pub fn layers(&self) -> usize {
        self.layers.len()
    }

    /// Loads every bundle for `base` and `locale` that the loader can find.
    /// Returns `None` when there are none.
    pub fn load(
        loader: &dyn TemplateLoader,
        base: &str,
        locale: &Locale,
    ) -> io::Result<Option<Self>> {
        let mut layers: Vec<Arc<dyn ResourceBundle>> = Vec::new();

        for suffix in locale.bundle_suffixes() {
            let name = format!("{}{}.properties", base, suffix);
            match loader.open(&name) {
                Ok(reader) => {
                    tracing::debug!(bundle = %name, locale = %locale, "loaded resource bundle");
                    layers.push(Arc::new(Properties::from_reader(reader)?));
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            }
        }

        Ok((!layers.is_empty()).then(|| BundleChain::new(layers)))
    }
}

impl ResourceBundle for BundleChain {
    fn get(&self, key: &str) -> Option<&str> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;

    #[test]
    fn parses_separators_and_comments() {
        let props = Properties::parse(
            "# comment\n! also comment\n\na=1\nb : 2\nc 3\n  d=  spaced\nempty\n",
        );
        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get("b"), Some("2"));
        assert_eq!(props.get("c"), Some("3"));
        assert_eq!(props.get("d"), Some("spaced"));
        assert_eq!(props.get("empty"), Some(""));
        assert_eq!(props.len(), 5);
    }

    #[test]
    fn continuation_lines_are_joined() {
        let props = Properties::parse("greeting = Hello, \\\n    world\nnext=x\n");
        assert_eq!(props.get("greeting"), Some("Hello, world"));
        assert_eq!(props.get("next"), Some("x"));
    }

    #[test]
    fn escapes_are_decoded() {
        let props = Properties::parse("key\\ with\\ space=caf\\u00e9\\tend\npath=C:\\\\dir\n");
        assert_eq!(props.get("key with space"), Some("café\tend"));
        assert_eq!(props.get("path"), Some("C:\\dir"));
    }

    #[test]
    fn surrogate_pairs_decode_to_one_char() {
        let props = Properties::parse("smile=\\uD83D\\uDE00!\nlone=\\uD83Dx\n");
        assert_eq!(props.get("smile"), Some("\u{1F600}!"));
        assert_eq!(props.get("lone"), Some("\\uD83Dx"));
    }

    #[test]
    fn chain_prefers_most_specific_layer() {
        let loader = MemoryLoader::new()
            .with("page.properties", "title=Title\nfooter=Footer\n")
            .with("page_en.properties", "title=Heading\n")
            .with("page_en_GB.properties", "colour=Colour\n");

        let chain = BundleChain::load(&loader, "page", &Locale::parse("en-GB"))
            .unwrap()
            .unwrap();
        assert_eq!(chain.layers(), 3);
        assert_eq!(chain.get("colour"), Some("Colour"));
        assert_eq!(chain.get("title"), Some("Heading"));
        assert_eq!(chain.get("footer"), Some("Footer"));
        assert_eq!(chain.get("missing"), None);
    }

    #[test]
    fn no_bundles_is_not_an_error() {
        let loader = MemoryLoader::new();
        let chain = BundleChain::load(&loader, "page", &Locale::default()).unwrap();
        assert!(chain.is_none());
    }
}
