//! Row adapter behavior over a simple in-memory cursor.

use proptest::prelude::*;
use httprpc_beans::{
    lookup, AdapterError, Cursor, Dictionary, Result, RowAdapter, Scalar, Sequence,
};

struct MemoryCursor {
    labels: Vec<String>,
    rows: Vec<Vec<Option<Scalar>>>,
    next: usize,
}

impl MemoryCursor {
    fn new(labels: &[&str], rows: Vec<Vec<Option<Scalar>>>) -> Self {
        MemoryCursor {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            rows,
            next: 0,
        }
    }
}

impl Cursor for MemoryCursor {
    fn labels(&self) -> Result<Vec<String>> {
        Ok(self.labels.clone())
    }

    fn advance(&mut self) -> Result<bool> {
        self.next += 1;
        Ok(self.next <= self.rows.len())
    }

    fn value(&self, index: usize) -> Result<Option<Scalar>> {
        self.rows
            .get(self.next - 1)
            .and_then(|row| row.get(index))
            .cloned()
            .ok_or_else(|| AdapterError::source("column out of range"))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn nested_columns_build_one_dictionary_per_row() {
    let adapter = RowAdapter::new(MemoryCursor::new(
        &["a", "b.c", "b.d"],
        vec![
            vec![Some("1".into()), Some(2.into()), Some(3.into())],
            vec![Some("4".into()), Some(5.into()), None],
        ],
    ));

    let mut seen = Vec::new();
    for element in adapter.elements() {
        let element = element.unwrap();
        let row = element.as_dictionary().unwrap();
        let a = lookup(row, &["a"], |v| v.and_then(|v| v.to_scalar()));
        let c = lookup(row, &["b", "c"], |v| v.and_then(|v| v.to_scalar()));
        let d_is_null = lookup(row, &["b", "d"], |v| v.map(|v| v.is_null()));
        seen.push((a, c, d_is_null));
    }

    assert_eq!(
        seen,
        vec![
            (Some(Scalar::from("1")), Some(Scalar::from(2)), Some(false)),
            (Some(Scalar::from("4")), Some(Scalar::from(5)), Some(true)),
        ]
    );

    assert_eq!(adapter.elements().count(), 0);
    assert!(matches!(adapter.next_row(), Err(AdapterError::Exhausted)));
}

#[test]
fn row_entries_keep_column_order() {
    let adapter = RowAdapter::new(MemoryCursor::new(
        &["z", "a", "m.x"],
        vec![vec![Some(1.into()), Some(2.into()), Some(3.into())]],
    ));
    let row = adapter.next_row().unwrap();
    let keys: Vec<String> = row.entries().map(|(k, _)| k.into_owned()).collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

proptest! {
    /// A row adapter yields each row exactly once, then nothing.
    #[test]
    fn rows_are_yielded_exactly_once(values in prop::collection::vec(any::<i64>(), 0..40)) {
        let rows = values.iter().map(|v| vec![Some(Scalar::from(*v))]).collect();
        let mut adapter = RowAdapter::new(MemoryCursor::new(&["n"], rows));

        let collected: Vec<i64> = adapter
            .by_ref()
            .map(|row| match row.unwrap().cell("n") {
                Some(httprpc_beans::Cell::Scalar(Scalar::Number(n))) => n.to_i64(),
                other => panic!("unexpected cell {other:?}"),
            })
            .collect();

        prop_assert_eq!(collected, values);
        prop_assert_eq!(adapter.by_ref().count(), 0);
        prop_assert!(Sequence::is_empty(&adapter).unwrap());
    }
}
