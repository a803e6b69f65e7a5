//! Row iteration over an external line source.
//!
//! Tokenizing is not this crate's job: a [`LineSource`] hands over one
//! pre-split row per call, and [`RowSource`] layers the iteration
//! protocol on top: lazy start, optional header skip, single-row
//! lookahead, and fault folding. A read fault ends the iteration the
//! same way a normal end of stream does; nothing is re-raised to the
//! consumer.

use std::io;

/// Boundary to the external tokenizer.
///
/// Yields one row of string fields per call until the stream ends. The
/// stream is finite and not restartable.
pub trait LineSource {
    /// Read the next row.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(row))` - Next row of raw field values
    /// * `Ok(None)` - End of stream
    /// * `Err(error)` - Read fault; the stream is unusable from here on
    fn next_line(&mut self) -> io::Result<Option<Vec<String>>>;
}

/// In-memory line source over pre-tokenized rows.
pub struct VecLineSource {
    rows: std::vec::IntoIter<Vec<String>>,
}

impl VecLineSource {
    /// Create a source yielding the given rows in order.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    /// Create a source from string slices, for tests and examples.
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|field| field.to_string()).collect())
                .collect(),
        )
    }
}

impl LineSource for VecLineSource {
    fn next_line(&mut self) -> io::Result<Option<Vec<String>>> {
        Ok(self.rows.next())
    }
}

/// Lazy row iterator with a single-row lookahead.
///
/// Construction performs no reads; the header row, when declared, is
/// consumed on the first probe or pull. Once the underlying source
/// reports end of stream or faults, the iteration is complete for good:
/// [`RowSource::has_next`] stays false and [`RowSource::next_row`]
/// stays `None`.
pub struct RowSource {
    source: Option<Box<dyn LineSource>>,
    lookahead: Option<Vec<String>>,
    skip_header: bool,
    started: bool,
    complete: bool,
}

impl RowSource {
    /// Wrap a line source.
    ///
    /// # Arguments
    ///
    /// * `source` - The tokenizer boundary rows are pulled from
    /// * `skip_header` - Whether to discard the first row
    pub fn new(source: Box<dyn LineSource>, skip_header: bool) -> Self {
        Self {
            source: Some(source),
            lookahead: None,
            skip_header,
            started: false,
            complete: false,
        }
    }

    /// Whether another row is available, reading ahead if needed.
    pub fn has_next(&mut self) -> bool {
        self.fill_lookahead();
        self.lookahead.is_some()
    }

    /// Consume and return the next row.
    pub fn next_row(&mut self) -> Option<Vec<String>> {
        self.fill_lookahead();
        self.lookahead.take()
    }

    /// Release the underlying line source.
    ///
    /// Safe to call more than once; reads after the first close report
    /// exhaustion. Dropping the row source releases the line source as
    /// well.
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            tracing::debug!("row source closed");
        }
        self.lookahead = None;
        self.complete = true;
    }

    fn fill_lookahead(&mut self) {
        if self.lookahead.is_some() || self.complete {
            return;
        }
        if !self.started {
            self.started = true;
            if self.skip_header {
                self.read_one();
            }
        }
        self.lookahead = self.read_one();
    }

    fn read_one(&mut self) -> Option<Vec<String>> {
        if self.complete {
            return None;
        }
        let source = self.source.as_mut()?;
        match source.next_line() {
            Ok(Some(row)) => Some(row),
            Ok(None) => {
                self.complete = true;
                None
            }
            Err(error) => {
                tracing::warn!(%error, "read fault; treating as end of stream");
                self.complete = true;
                None
            }
        }
    }
}

impl Iterator for RowSource {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Line source that errors after yielding a fixed number of rows.
    struct FaultySource {
        remaining: usize,
    }

    impl LineSource for FaultySource {
        fn next_line(&mut self) -> io::Result<Option<Vec<String>>> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
            }
            self.remaining -= 1;
            Ok(Some(vec!["field".to_string()]))
        }
    }

    /// Line source that counts how many reads have happened.
    struct CountingSource {
        inner: VecLineSource,
        reads: Rc<Cell<usize>>,
    }

    impl LineSource for CountingSource {
        fn next_line(&mut self) -> io::Result<Option<Vec<String>>> {
            self.reads.set(self.reads.get() + 1);
            self.inner.next_line()
        }
    }

    #[test]
    fn test_rows_in_order() {
        let source = VecLineSource::from_rows(&[&["a", "b"], &["c", "d"]]);
        let mut rows = RowSource::new(Box::new(source), false);

        assert_eq!(rows.next_row(), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(rows.next_row(), Some(vec!["c".to_string(), "d".to_string()]));
        assert_eq!(rows.next_row(), None);
    }

    #[test]
    fn test_header_skipped_once() {
        let source = VecLineSource::from_rows(&[&["id", "name"], &["1", "x"]]);
        let mut rows = RowSource::new(Box::new(source), true);

        assert_eq!(rows.next_row(), Some(vec!["1".to_string(), "x".to_string()]));
        assert_eq!(rows.next_row(), None);
    }

    #[test]
    fn test_header_only_source_is_empty() {
        let source = VecLineSource::from_rows(&[&["id", "name"]]);
        let mut rows = RowSource::new(Box::new(source), true);

        assert!(!rows.has_next());
        assert_eq!(rows.next_row(), None);
    }

    #[test]
    fn test_no_read_until_first_use() {
        let reads = Rc::new(Cell::new(0));
        let source = CountingSource {
            inner: VecLineSource::from_rows(&[&["h"], &["1"]]),
            reads: Rc::clone(&reads),
        };

        let mut rows = RowSource::new(Box::new(source), true);
        assert_eq!(reads.get(), 0);

        assert!(rows.has_next());
        // Header plus the buffered row.
        assert_eq!(reads.get(), 2);
    }

    #[test]
    fn test_has_next_does_not_consume() {
        let source = VecLineSource::from_rows(&[&["only"]]);
        let mut rows = RowSource::new(Box::new(source), false);

        assert!(rows.has_next());
        assert!(rows.has_next());
        assert_eq!(rows.next_row(), Some(vec!["only".to_string()]));
        assert!(!rows.has_next());
    }

    #[test]
    fn test_fault_folds_into_end_of_stream() {
        let mut rows = RowSource::new(Box::new(FaultySource { remaining: 2 }), false);

        assert!(rows.next_row().is_some());
        assert!(rows.next_row().is_some());
        assert_eq!(rows.next_row(), None);
        // The completion latch holds; the source is not probed again.
        assert!(!rows.has_next());
    }

    #[test]
    fn test_close_is_idempotent() {
        let source = VecLineSource::from_rows(&[&["a"], &["b"]]);
        let mut rows = RowSource::new(Box::new(source), false);

        assert!(rows.has_next());
        rows.close();
        rows.close();

        assert!(!rows.has_next());
        assert_eq!(rows.next_row(), None);
    }

    #[test]
    fn test_iterator_collects_all_rows() {
        let source = VecLineSource::from_rows(&[&["h1"], &["1"], &["2"]]);
        let rows: Vec<Vec<String>> = RowSource::new(Box::new(source), true).collect();

        assert_eq!(rows, vec![vec!["1".to_string()], vec!["2".to_string()]]);
    }
}
