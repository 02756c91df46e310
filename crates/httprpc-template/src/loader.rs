//! Template sources.
//!
//! A [`TemplateLoader`] opens named resources: the top-level template, its
//! includes and its resource bundles. Names use `/` separators regardless
//! of platform.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Opens template resources by name.
pub trait TemplateLoader: Send + Sync {
    /// Opens `name` for reading. A missing resource must fail with
    /// [`io::ErrorKind::NotFound`].
    fn open(&self, name: &str) -> io::Result<Box<dyn Read>>;
}

impl<L: TemplateLoader + ?Sized> TemplateLoader for Arc<L> {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read>> {
        (**self).open(name)
    }
}

/// Resolves `name` relative to the directory containing `base`.
///
/// ```rust
/// use httprpc_template::loader::resolve_relative;
///
/// assert_eq!(resolve_relative("pages/index.html", "footer.html"), "pages/footer.html");
/// assert_eq!(resolve_relative("index.html", "footer.html"), "footer.html");
/// ```
pub fn resolve_relative(base: &str, name: &str) -> String {
    match base.rfind('/') {
        Some(pos) => format!("{}/{}", &base[..pos], name),
        None => name.to_string(),
    }
}

/// Loads templates from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirLoader { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("template name escapes loader root: {}", name),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl TemplateLoader for DirLoader {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read>> {
        let path = self.path_for(name)?;
        tracing::trace!(path = %path.display(), "opening template file");
        Ok(Box::new(File::open(path)?))
    }
}

/// In-memory templates, keyed by name.
///
/// Counts how many times each name was opened, which makes include caching
/// observable in tests.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    entries: RwLock<HashMap<String, Arc<[u8]>>>,
    opens: RwLock<HashMap<String, AtomicUsize>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a template.
    pub fn insert(&self, name: impl Into<String>, content: impl AsRef<str>) {
        let content: Arc<[u8]> = Arc::from(content.as_ref().as_bytes());
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(name.into(), content);
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(self, name: impl Into<String>, content: impl AsRef<str>) -> Self {
        self.insert(name, content);
        self
    }

    /// Number of successful opens of `name` so far.
    pub fn open_count(&self, name: &str) -> usize {
        self.opens
            .read()
            .ok()
            .and_then(|opens| opens.get(name).map(|n| n.load(Ordering::Relaxed)))
            .unwrap_or(0)
    }

    fn record_open(&self, name: &str) {
        if let Ok(opens) = self.opens.read() {
            if let Some(count) = opens.get(name) {
                count.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        if let Ok(mut opens) = self.opens.write() {
            opens
                .entry(name.to_string())
                .or_insert_with(|| AtomicUsize::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl TemplateLoader for MemoryLoader {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read>> {
        let content = self
            .entries
            .read()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "template store poisoned"))?
            .get(name)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no template named {}", name))
            })?;
        self.record_open(name);
        Ok(Box::new(Cursor::new(content)))
    }
}
