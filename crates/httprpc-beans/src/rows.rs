//! Lazy, single-pass row sequences over cursors and iterators.
//!
//! Column labels containing `.` are expanded into nested rows, so the labels
//! `a`, `b.c` and `b.d` produce the row `{a, b: {c, d}}`.

use std::borrow::Cow;
use std::cell::RefCell;
use std::iter::{self, Peekable};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::adapt::{json_number, Adapt, ListAdapter};
use crate::dictionary::{Dictionary, Elements, Entries, Sequence};
use crate::error::{AdapterError, Result};
use crate::value::{Scalar, Value};

/// Forward-only result cursor, in the shape of a database result set.
pub trait Cursor {
    /// Column labels, in column order.
    fn labels(&self) -> Result<Vec<String>>;

    /// Moves to the next row. Returns `false` once the cursor is exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Value of the column at `index` in the current row; `None` for SQL null.
    fn value(&self, index: usize) -> Result<Option<Scalar>>;

    fn close(&mut self) -> Result<()>;
}

/// A resource owned by a row sequence and closed after its cursor, such as
/// a prepared statement or a connection.
pub trait Resource {
    /// Name used when reporting close failures.
    fn name(&self) -> &str {
        "resource"
    }

    fn close(&mut self) -> Result<()>;
}

/// A single cell of a [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Scalar(Scalar),
    Nested(Row),
    List(Vec<Cell>),
}

impl Adapt for Cell {
    fn adapt(&self) -> Value<'_> {
        match self {
            Cell::Null => Value::Null,
            Cell::Scalar(scalar) => scalar.as_value(),
            Cell::Nested(row) => Value::dictionary(row),
            Cell::List(cells) => Value::sequence(ListAdapter::new(cells.as_slice())),
        }
    }
}

impl From<serde_json::Value> for Cell {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Cell::Null,
            Json::Bool(b) => Cell::Scalar(Scalar::Bool(b)),
            Json::Number(n) => Cell::Scalar(Scalar::Number(json_number(&n))),
            Json::String(s) => Cell::Scalar(Scalar::String(s)),
            Json::Array(items) => Cell::List(items.into_iter().map(Cell::from).collect()),
            Json::Object(map) => Cell::Nested(Row::from(map)),
        }
    }
}

/// Owned, ordered row dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: IndexMap<String, Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, cell: Cell) {
        self.cells.insert(key.into(), cell);
    }

    /// Inserts a cell under a dotted label, creating nested rows as needed.
    ///
    /// A scalar already stored where a nested row is required is replaced.
    pub fn insert_path(&mut self, label: &str, cell: Cell) {
        let parts: Vec<&str> = label.split('.').collect();
        self.insert_parts(&parts, cell);
    }

    fn insert_parts(&mut self, parts: &[&str], cell: Cell) {
        match parts {
            [] => {}
            [last] => {
                self.cells.insert((*last).to_string(), cell);
            }
            [head, rest @ ..] => {
                let entry = self
                    .cells
                    .entry((*head).to_string())
                    .or_insert_with(|| Cell::Nested(Row::new()));
                if let Cell::Nested(nested) = entry {
                    nested.insert_parts(rest, cell);
                } else {
                    let mut nested = Row::new();
                    nested.insert_parts(rest, cell);
                    *entry = Cell::Nested(nested);
                }
            }
        }
    }

    pub fn cell(&self, key: &str) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Row {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Row {
            cells: map.into_iter().map(|(k, v)| (k, Cell::from(v))).collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Cell)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Cell)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (key, cell) in iter {
            let key: String = key.into();
            row.insert_path(&key, cell);
        }
        row
    }
}

impl Dictionary for Row {
    fn get(&self, key: &str) -> Option<Value<'_>> {
        self.cells.get(key).map(Adapt::adapt)
    }

    fn entries(&self) -> Entries<'_> {
        Box::new(
            self.cells
                .iter()
                .map(|(key, cell)| (Cow::Borrowed(key.as_str()), cell.adapt())),
        )
    }
}

impl Adapt for Row {
    fn adapt(&self) -> Value<'_> {
        Value::dictionary(self)
    }
}

struct CursorState<C> {
    cursor: C,
    labels: Option<Vec<String>>,
    pending: Option<Row>,
    exhausted: bool,
    closed: bool,
    resources: Vec<Box<dyn Resource>>,
}

impl<C: Cursor> CursorState<C> {
    fn fetch(&mut self) -> Result<Option<Row>> {
        if let Some(row) = self.pending.take() {
            return Ok(Some(row));
        }
        if self.exhausted {
            return Ok(None);
        }
        if !self.cursor.advance()? {
            self.exhausted = true;
            trace!("cursor exhausted");
            return Ok(None);
        }

        if self.labels.is_none() {
            self.labels = Some(self.cursor.labels()?);
        }
        let labels = self.labels.as_deref().unwrap_or_default();

        let mut row = Row::new();
        for (index, label) in labels.iter().enumerate() {
            let cell = match self.cursor.value(index)? {
                Some(scalar) => Cell::Scalar(scalar),
                None => Cell::Null,
            };
            row.insert_path(label, cell);
        }
        Ok(Some(row))
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.pending.is_none() {
            self.pending = self.fetch()?;
        }
        Ok(self.pending.is_some())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.exhausted = true;
        self.pending = None;

        let mut first: Option<AdapterError> = None;
        if let Err(err) = self.cursor.close() {
            debug!(stage = "cursor", error = %err, "close failed");
            first.get_or_insert(AdapterError::Close {
                stage: "cursor".to_string(),
                message: err.to_string(),
            });
        }
        for resource in self.resources.iter_mut() {
            if let Err(err) = resource.close() {
                debug!(stage = resource.name(), error = %err, "close failed");
                first.get_or_insert(AdapterError::Close {
                    stage: resource.name().to_string(),
                    message: err.to_string(),
                });
            }
        }

        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Lazy sequence of rows read from a [`Cursor`].
///
/// The adapter is single-pass: once the cursor is exhausted, iterating again
/// yields nothing. It also owns any [`Resource`]s registered with
/// [`RowAdapter::owning`] and closes them, in registration order, after the
/// cursor.
pub struct RowAdapter<C: Cursor> {
    state: RefCell<CursorState<C>>,
}

impl<C: Cursor> RowAdapter<C> {
    pub fn new(cursor: C) -> Self {
        RowAdapter {
            state: RefCell::new(CursorState {
                cursor,
                labels: None,
                pending: None,
                exhausted: false,
                closed: false,
                resources: Vec::new(),
            }),
        }
    }

    /// Takes ownership of a resource to be closed along with the cursor.
    pub fn owning(self, resource: impl Resource + 'static) -> Self {
        self.state.borrow_mut().resources.push(Box::new(resource));
        self
    }

    /// Reports whether another row is available, advancing the cursor at
    /// most once.
    pub fn has_next(&self) -> Result<bool> {
        self.state_mut()?.has_next()
    }

    /// Returns the next row, or [`AdapterError::Exhausted`].
    pub fn next_row(&self) -> Result<Row> {
        self.state_mut()?.fetch()?.ok_or(AdapterError::Exhausted)
    }

    /// Row sequences are never materialized, so their size is unknown.
    pub fn len(&self) -> Result<usize> {
        Err(AdapterError::Unsupported("size of a single-pass row sequence"))
    }

    /// Random access is unsupported for the same reason as [`RowAdapter::len`].
    pub fn get(&self, _index: usize) -> Result<Row> {
        Err(AdapterError::Unsupported("random access to a single-pass row sequence"))
    }

    /// Closes the cursor and then every owned resource.
    ///
    /// Every stage is attempted even if an earlier one fails; the first
    /// failure is returned. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        self.state_mut()?.close()
    }

    fn state_mut(&self) -> Result<std::cell::RefMut<'_, CursorState<C>>> {
        self.state
            .try_borrow_mut()
            .map_err(|_| AdapterError::Unsupported("concurrent iteration of a row sequence"))
    }
}

impl<C: Cursor> Iterator for RowAdapter<C> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.state.get_mut().fetch().transpose()
    }
}

impl<C: Cursor> Sequence for RowAdapter<C> {
    fn elements(&self) -> Elements<'_> {
        Box::new(iter::from_fn(move || {
            let fetched = self.state_mut().and_then(|mut state| state.fetch());
            fetched.transpose().map(|row| row.map(Value::dictionary))
        }))
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(!self.has_next()?)
    }

    fn close(&self) -> Result<()> {
        RowAdapter::close(self)
    }
}

impl<C: Cursor> Adapt for RowAdapter<C> {
    fn adapt(&self) -> Value<'_> {
        Value::sequence(self)
    }
}

impl<C: Cursor> Drop for RowAdapter<C> {
    fn drop(&mut self) {
        if let Err(err) = self.state.get_mut().close() {
            debug!(error = %err, "failed to close row adapter on drop");
        }
    }
}

impl<I> Adapt for IteratorAdapter<I>
where
    I: Iterator,
    I::Item: Into<Row>,
{
    fn adapt(&self) -> Value<'_> {
        Value::sequence(self)
    }
}

/// Lazy sequence over any iterator of rows, such as a document cursor.
pub struct IteratorAdapter<I: Iterator> {
    iter: RefCell<Peekable<I>>,
}

impl<I> IteratorAdapter<I>
where
    I: Iterator,
    I::Item: Into<Row>,
{
    pub fn new(iter: I) -> Self {
        IteratorAdapter {
            iter: RefCell::new(iter.peekable()),
        }
    }

    pub fn next_row(&self) -> Result<Row> {
        self.iter
            .try_borrow_mut()
            .map_err(|_| AdapterError::Unsupported("concurrent iteration of a row sequence"))?
            .next()
            .map(Into::into)
            .ok_or(AdapterError::Exhausted)
    }

    pub fn len(&self) -> Result<usize> {
        Err(AdapterError::Unsupported("size of a single-pass row sequence"))
    }
}

impl<I> Sequence for IteratorAdapter<I>
where
    I: Iterator,
    I::Item: Into<Row>,
{
    fn elements(&self) -> Elements<'_> {
        Box::new(iter::from_fn(move || match self.iter.try_borrow_mut() {
            Ok(mut iter) => iter.next().map(|item| Ok(Value::dictionary(item.into()))),
            Err(_) => Some(Err(AdapterError::Unsupported(
                "concurrent iteration of a row sequence",
            ))),
        }))
    }

    fn is_empty(&self) -> Result<bool> {
        let mut iter = self
            .iter
            .try_borrow_mut()
            .map_err(|_| AdapterError::Unsupported("concurrent iteration of a row sequence"))?;
        Ok(iter.peek().is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct VecCursor {
        labels: Vec<String>,
        rows: Vec<Vec<Option<Scalar>>>,
        position: Option<usize>,
        fail_close: bool,
        log: Log,
    }

    impl VecCursor {
        fn new(labels: &[&str], rows: Vec<Vec<Option<Scalar>>>, log: Log) -> Self {
            VecCursor {
                labels: labels.iter().map(|s| s.to_string()).collect(),
                rows,
                position: None,
                fail_close: false,
                log,
            }
        }
    }

    impl Cursor for VecCursor {
        fn labels(&self) -> Result<Vec<String>> {
            Ok(self.labels.clone())
        }

        fn advance(&mut self) -> Result<bool> {
            let next = self.position.map_or(0, |p| p + 1);
            self.position = Some(next);
            self.log.borrow_mut().push("advance".into());
            Ok(next < self.rows.len())
        }

        fn value(&self, index: usize) -> Result<Option<Scalar>> {
            let row = self.position.ok_or_else(|| AdapterError::source("no current row"))?;
            Ok(self.rows[row][index].clone())
        }

        fn close(&mut self) -> Result<()> {
            self.log.borrow_mut().push("close cursor".into());
            if self.fail_close {
                Err(AdapterError::source("cursor gone"))
            } else {
                Ok(())
            }
        }
    }

    struct Stage {
        name: &'static str,
        fail: bool,
        log: Log,
    }

    impl Resource for Stage {
        fn name(&self) -> &str {
            self.name
        }

        fn close(&mut self) -> Result<()> {
            self.log.borrow_mut().push(format!("close {}", self.name));
            if self.fail {
                Err(AdapterError::source("broken"))
            } else {
                Ok(())
            }
        }
    }

    fn sample(log: Log) -> RowAdapter<VecCursor> {
        RowAdapter::new(VecCursor::new(
            &["a", "b.c", "b.d"],
            vec![
                vec![Some(1.into()), Some("x".into()), None],
                vec![Some(2.into()), Some("y".into()), Some(true.into())],
            ],
            log,
        ))
    }

    #[test]
    fn dotted_labels_nest() {
        let adapter = sample(Log::default());
        let row = adapter.next_row().unwrap();
        assert_eq!(row.cell("a"), Some(&Cell::Scalar(Scalar::from(1))));
        let Some(Cell::Nested(b)) = row.cell("b") else {
            panic!("expected nested row");
        };
        assert_eq!(b.cell("c"), Some(&Cell::Scalar(Scalar::from("x"))));
        assert_eq!(b.cell("d"), Some(&Cell::Null));
    }

    #[test]
    fn exhausted_adapter_does_not_restart() {
        let mut adapter = sample(Log::default());
        assert_eq!(adapter.by_ref().count(), 2);
        assert_eq!(adapter.by_ref().count(), 0);
        assert!(matches!(adapter.next_row(), Err(AdapterError::Exhausted)));
    }

    #[test]
    fn has_next_does_not_lose_rows() {
        let adapter = sample(Log::default());
        assert!(adapter.has_next().unwrap());
        assert!(adapter.has_next().unwrap());
        assert!(!Sequence::is_empty(&adapter).unwrap());
        assert_eq!(adapter.elements().count(), 2);
        assert!(Sequence::is_empty(&adapter).unwrap());
    }

    #[test]
    fn size_is_unsupported() {
        let adapter = sample(Log::default());
        assert!(matches!(adapter.len(), Err(AdapterError::Unsupported(_))));
        assert!(matches!(adapter.get(0), Err(AdapterError::Unsupported(_))));
    }

    #[test]
    fn close_cascades_and_reports_first_error() {
        let log = Log::default();
        let mut cursor = VecCursor::new(&["a"], vec![], log.clone());
        cursor.fail_close = true;
        let adapter = RowAdapter::new(cursor)
            .owning(Stage {
                name: "statement",
                fail: true,
                log: log.clone(),
            })
            .owning(Stage {
                name: "connection",
                fail: false,
                log: log.clone(),
            });

        let err = adapter.close().unwrap_err();
        assert!(matches!(err, AdapterError::Close { ref stage, .. } if stage == "cursor"));
        assert_eq!(
            *log.borrow(),
            vec!["close cursor", "close statement", "close connection"]
        );

        adapter.close().unwrap();
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn drop_closes_once() {
        let log = Log::default();
        {
            let adapter = sample(log.clone());
            adapter.close().unwrap();
        }
        let closes = log.borrow().iter().filter(|e| e.starts_with("close")).count();
        assert_eq!(closes, 1);
    }

    #[test]
    fn json_documents_become_nested_rows() {
        let docs = vec![
            serde_json::json!({"name": "a", "tags": ["x", "y"], "meta": {"n": 1}}),
        ];
        let adapter = IteratorAdapter::new(docs.into_iter().filter_map(|doc| match doc {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        }));
        assert!(!Sequence::is_empty(&adapter).unwrap());
        let row = adapter.next_row().unwrap();
        assert!(matches!(row.cell("meta"), Some(Cell::Nested(_))));
        assert!(matches!(row.cell("tags"), Some(Cell::List(items)) if items.len() == 2));
        assert!(matches!(adapter.next_row(), Err(AdapterError::Exhausted)));
    }

    #[test]
    fn busy_iterator_reports_unsupported() {
        let adapter = IteratorAdapter::new(vec![Row::new()].into_iter());
        let _busy = adapter.iter.borrow_mut();
        let first = adapter.elements().next();
        assert!(matches!(first, Some(Err(AdapterError::Unsupported(_)))));
    }

    #[test]
    fn scalar_then_nested_label_replaces_scalar() {
        let mut row = Row::new();
        row.insert_path("a", Cell::Scalar(Scalar::from(1)));
        row.insert_path("a.b", Cell::Scalar(Scalar::from(2)));
        assert!(matches!(row.cell("a"), Some(Cell::Nested(_))));
    }
}
