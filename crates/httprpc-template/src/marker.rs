//! Marker syntax.
//!
//! A marker is everything between `{{` and `}}`:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `{{name}}`, `{{a.b:mod=arg:mod2}}` | variable, with modifier chain |
//! | `{{#name}}`, `{{#name[sep]}}` | repeating section, optional separator |
//! | `{{?name}}` | conditional section |
//! | `{{^name}}` | inverted section |
//! | `{{/name}}` | section end |
//! | `{{>name}}` | include |
//! | `{{!text}}` | comment |

use std::io::Read;

use crate::error::{Result, TemplateError};
use crate::reader::PagedReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Variable,
    RepeatingSection,
    ConditionalSection,
    InvertedSection,
    SectionEnd,
    Include,
    Comment,
}

impl MarkerKind {
    fn from_prefix(c: char) -> Self {
        match c {
            '#' => MarkerKind::RepeatingSection,
            '?' => MarkerKind::ConditionalSection,
            '^' => MarkerKind::InvertedSection,
            '/' => MarkerKind::SectionEnd,
            '>' => MarkerKind::Include,
            '!' => MarkerKind::Comment,
            _ => MarkerKind::Variable,
        }
    }
}

/// One `name[=argument]` entry of a variable's modifier chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierCall {
    pub name: String,
    pub argument: Option<String>,
}

/// A parsed marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub name: String,
    pub separator: Option<String>,
    pub modifiers: Vec<ModifierCall>,
}

/// Reads a marker whose opening `{{` has already been consumed, up to and
/// including the closing `}}`.
pub fn read_marker<R: Read>(reader: &mut PagedReader<R>) -> Result<Marker> {
    let first = reader.read()?.ok_or(TemplateError::UnexpectedEof)?;
    let kind = MarkerKind::from_prefix(first);

    let mut text = String::new();
    let mut pending = (kind == MarkerKind::Variable).then_some(first);
    loop {
        let c = match pending.take() {
            Some(c) => c,
            None => reader.read()?.ok_or(TemplateError::UnexpectedEof)?,
        };
        if c == '}' {
            break;
        }
        text.push(c);
    }

    if text.is_empty() {
        return Err(TemplateError::InvalidMarker);
    }

    if reader.read()? != Some('}') {
        return Err(TemplateError::ImproperlyTerminated);
    }

    parse(kind, text)
}

fn parse(kind: MarkerKind, text: String) -> Result<Marker> {
    if kind == MarkerKind::Comment {
        return Ok(Marker {
            kind,
            name: text,
            separator: None,
            modifiers: Vec::new(),
        });
    }

    let mut parts = text.split(':');
    let mut name = parts.next().unwrap_or_default().to_string();
    if name.is_empty() {
        return Err(TemplateError::InvalidMarker);
    }

    let mut modifiers = Vec::new();
    for part in parts {
        let call = match part.split_once('=') {
            Some((name, argument)) => ModifierCall {
                name: name.to_string(),
                argument: Some(argument.to_string()),
            },
            None => ModifierCall {
                name: part.to_string(),
                argument: None,
            },
        };
        if call.name.is_empty() {
            return Err(TemplateError::InvalidMarker);
        }
        modifiers.push(call);
    }

    let mut separator = None;
    if kind == MarkerKind::RepeatingSection && name.ends_with(']') {
        if let Some(open) = name.rfind('[') {
            separator = Some(name[open + 1..name.len() - 1].to_string());
            name.truncate(open);
            if name.is_empty() {
                return Err(TemplateError::InvalidMarker);
            }
        }
    }

    Ok(Marker {
        kind,
        name,
        separator,
        modifiers,
    })
}
