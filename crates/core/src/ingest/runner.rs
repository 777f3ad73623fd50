//! The checkpointed batch-pagination loop.

use tracing::{debug, error, info, info_span, warn};

use super::{
    CursorStore, IngestAborted, IngestError, IngestOptions, Record, ResultSink, RowSource,
    RunSummary, Transform,
};
use crate::metrics::{INGEST_BATCHES, INGEST_CURSOR, INGEST_ROWS, INGEST_RUNS};

/// Drives a row source into a sink, checkpointing a cursor after every batch.
///
/// The cursor is only persisted at batch boundaries, so interrupting a run
/// re-processes at most one batch on restart. Records whose key already
/// exists in the sink are skipped before the transform runs, which keeps the
/// re-processed batch from producing duplicates.
pub struct Ingestor<S, K, C> {
    job: String,
    source: S,
    sink: K,
    cursor: C,
    options: IngestOptions,
}

impl<S, K, C> Ingestor<S, K, C>
where
    S: RowSource,
    C: CursorStore,
{
    /// Create an ingestor with default options.
    pub fn new(job: impl Into<String>, source: S, sink: K, cursor: C) -> Self {
        Self {
            job: job.into(),
            source,
            sink,
            cursor,
            options: IngestOptions::default(),
        }
    }

    /// Replace the run options.
    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.options.batch_size = batch_size;
        self
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn cursor_store(&self) -> &C {
        &self.cursor
    }

    /// Consume the ingestor, returning its sink.
    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Run until the source is exhausted, `max_rows` is reached, or a fatal
    /// error occurs.
    pub fn run<O, T>(&self, transform: &T) -> Result<RunSummary, IngestAborted>
    where
        K: ResultSink<O>,
        T: Transform<S::Row, O>,
    {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("ingest", job = %self.job, run_id = %run_id);
        let _guard = span.enter();

        let mut summary = RunSummary::new(&self.job, 0);
        let result = self.run_inner(transform, &mut summary);

        match result {
            Ok(()) => {
                info!(
                    start_cursor = summary.start_cursor,
                    end_cursor = summary.end_cursor,
                    batches = summary.batches,
                    processed = summary.processed(),
                    skipped = summary.skipped(),
                    failed = summary.failed,
                    "Ingestion finished"
                );
                INGEST_RUNS.with_label_values(&[self.job.as_str(), "completed"]).inc();
                Ok(summary)
            }
            Err(error) => {
                error!(
                    start_cursor = summary.start_cursor,
                    end_cursor = summary.end_cursor,
                    batches = summary.batches,
                    processed = summary.processed(),
                    skipped = summary.skipped(),
                    failed = summary.failed,
                    "Ingestion aborted: {}",
                    error
                );
                INGEST_RUNS.with_label_values(&[self.job.as_str(), "aborted"]).inc();
                Err(IngestAborted { summary, error })
            }
        }
    }

    fn run_inner<O, T>(&self, transform: &T, summary: &mut RunSummary) -> Result<(), IngestError>
    where
        K: ResultSink<O>,
        T: Transform<S::Row, O>,
    {
        let batch_size = self.options.batch_size;
        if batch_size == 0 {
            return Err(IngestError::InvalidBatchSize(batch_size));
        }

        let start = self.cursor.load()?;
        summary.start_cursor = start;
        summary.end_cursor = start;
        INGEST_CURSOR
            .with_label_values(&[self.job.as_str()])
            .set(start as i64);
        info!(cursor = start, batch_size, "Starting ingestion");

        let mut cursor = start;
        loop {
            if let Some(max_rows) = self.options.max_rows {
                if cursor - start >= max_rows {
                    info!(cursor, max_rows, "Row limit reached");
                    return Ok(());
                }
            }

            let next = cursor
                .checked_add(batch_size)
                .ok_or(IngestError::CursorOverflow { cursor, batch_size })?;

            let batch = self.source.fetch(cursor, batch_size)?;
            if batch.is_empty() {
                debug!(cursor, "Source exhausted");
                return Ok(());
            }
            summary.fetched += batch.len() as u64;
            debug!(cursor, rows = batch.len(), "Fetched batch");

            for row in &batch {
                self.process_row(row, transform, summary)?;
            }

            self.cursor.save(next)?;
            summary.end_cursor = next;
            summary.batches += 1;
            INGEST_BATCHES.with_label_values(&[self.job.as_str()]).inc();
            INGEST_CURSOR.with_label_values(&[self.job.as_str()]).set(next as i64);

            let every = self.options.progress_every;
            if every > 0 && next / every > cursor / every {
                info!(
                    cursor = next,
                    written = summary.written,
                    skipped = summary.skipped(),
                    failed = summary.failed,
                    "Parsed {} rows",
                    next
                );
            }
            cursor = next;
        }
    }

    fn process_row<O, T>(
        &self,
        row: &S::Row,
        transform: &T,
        summary: &mut RunSummary,
    ) -> Result<(), IngestError>
    where
        K: ResultSink<O>,
        T: Transform<S::Row, O>,
    {
        let key = row.key();
        if self.sink.exists(key)? {
            summary.skipped_existing += 1;
            INGEST_ROWS.with_label_values(&[self.job.as_str(), "existing"]).inc();
            return Ok(());
        }

        match transform.apply(row) {
            Ok(Some(result)) => {
                self.sink.write(result)?;
                summary.written += 1;
                INGEST_ROWS.with_label_values(&[self.job.as_str(), "written"]).inc();
            }
            Ok(None) => {
                summary.skipped_filtered += 1;
                INGEST_ROWS.with_label_values(&[self.job.as_str(), "filtered"]).inc();
            }
            Err(e) => {
                warn!(key, "Skipping record: {}", e);
                summary.failed += 1;
                INGEST_ROWS.with_label_values(&[self.job.as_str(), "failed"]).inc();
            }
        }
        Ok(())
    }
}

/// Run a single ingestion pass with default options and the given batch size.
pub fn run<S, K, C, O, T>(
    source: S,
    sink: K,
    cursor_store: C,
    batch_size: u64,
    transform: &T,
) -> Result<RunSummary, IngestAborted>
where
    S: RowSource,
    K: ResultSink<O>,
    C: CursorStore,
    T: Transform<S::Row, O>,
{
    Ingestor::new("ingest", source, sink, cursor_store)
        .with_batch_size(batch_size)
        .run(transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{CursorError, SourceError, TransformError};
    use crate::testing::{MemoryCursorStore, MockSink, MockSource, TestRow};

    fn keep(row: &TestRow) -> Result<Option<String>, TransformError> {
        Ok(Some(row.payload.clone()))
    }

    fn run_with(
        source: &MockSource,
        sink: &MockSink,
        cursor: &MemoryCursorStore,
        options: IngestOptions,
    ) -> Result<RunSummary, IngestAborted> {
        Ingestor::new("test", source, sink, cursor)
            .with_options(options)
            .run(&keep)
    }

    #[test]
    fn test_empty_source_terminates_immediately() {
        let source = MockSource::with_rows(0);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::new();

        let summary = run_with(&source, &sink, &cursor, IngestOptions::new(50)).unwrap();

        assert_eq!(summary.batches, 0);
        assert_eq!(summary.written, 0);
        assert_eq!(cursor.value(), 0);
        assert!(cursor.saved().is_empty());
        assert_eq!(source.fetches(), vec![(0, 50)]);
    }

    #[test]
    fn test_partial_last_batch_overshoots_cursor() {
        let source = MockSource::with_rows(130);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::new();

        let summary = run_with(&source, &sink, &cursor, IngestOptions::new(50)).unwrap();

        assert_eq!(source.fetches(), vec![(0, 50), (50, 50), (100, 50), (150, 50)]);
        assert_eq!(cursor.saved(), vec![50, 100, 150]);
        assert_eq!(summary.end_cursor, 150);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.fetched, 130);
        assert_eq!(sink.len(), 130);
    }

    #[test]
    fn test_cursor_equals_batches_times_size_plus_start() {
        let source = MockSource::with_rows(1000);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::starting_at(300);

        let summary = run_with(&source, &sink, &cursor, IngestOptions::new(70)).unwrap();

        assert_eq!(summary.start_cursor, 300);
        assert_eq!(summary.end_cursor, 300 + summary.batches * 70);
        assert_eq!(cursor.value(), summary.end_cursor);
        assert_eq!(summary.written, 700);
    }

    #[test]
    fn test_existing_keys_never_reach_transform() {
        let source = MockSource::with_rows(10);
        let sink = MockSink::new();
        sink.preload(["row-2", "row-5"]);
        let cursor = MemoryCursorStore::new();

        let seen = std::sync::Mutex::new(Vec::new());
        let transform = |row: &TestRow| -> Result<Option<String>, TransformError> {
            seen.lock().unwrap().push(row.key.clone());
            Ok(Some(row.payload.clone()))
        };

        let summary = Ingestor::new("test", &source, &sink, &cursor)
            .with_batch_size(4)
            .run(&transform)
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 8);
        assert!(!seen.contains(&"row-2".to_string()));
        assert!(!seen.contains(&"row-5".to_string()));
        assert_eq!(summary.skipped_existing, 2);
        assert_eq!(summary.written, 8);
    }

    #[test]
    fn test_transform_error_skips_single_record() {
        let source = MockSource::with_rows(10);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::new();

        let transform = |row: &TestRow| -> Result<Option<String>, TransformError> {
            if row.key == "row-6" {
                return Err(TransformError::new("bad record"));
            }
            Ok(Some(row.payload.clone()))
        };

        let summary = Ingestor::new("test", &source, &sink, &cursor)
            .with_batch_size(10)
            .run(&transform)
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.written, 9);
        assert!(!sink.contains("row-6"));
        assert!(sink.contains("row-5"));
        assert!(sink.contains("row-7"));
        assert_eq!(cursor.saved(), vec![10]);
    }

    #[test]
    fn test_filtered_records_are_skipped() {
        let source = MockSource::with_rows(6);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::new();

        let transform = |row: &TestRow| -> Result<Option<String>, TransformError> {
            Ok((row.index % 2 == 0).then(|| row.payload.clone()))
        };

        let summary = Ingestor::new("test", &source, &sink, &cursor)
            .with_batch_size(3)
            .run(&transform)
            .unwrap();

        assert_eq!(summary.written, 3);
        assert_eq!(summary.skipped_filtered, 3);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_source_failure_keeps_last_checkpoint() {
        let source = MockSource::with_rows(500);
        source.fail_on_fetch(3);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::new();

        let err = run_with(&source, &sink, &cursor, IngestOptions::new(50)).unwrap_err();

        assert!(matches!(err.error, IngestError::Source(SourceError::Unavailable(_))));
        assert!(err.is_retryable());
        assert_eq!(cursor.value(), 100);
        assert_eq!(err.summary.end_cursor, 100);
        assert_eq!(err.summary.batches, 2);
        assert_eq!(sink.len(), 100);
    }

    #[test]
    fn test_sink_failure_aborts_before_checkpoint() {
        let source = MockSource::with_rows(100);
        let sink = MockSink::new();
        sink.fail_on_write("row-57");
        let cursor = MemoryCursorStore::new();

        let err = run_with(&source, &sink, &cursor, IngestOptions::new(50)).unwrap_err();

        assert!(matches!(err.error, IngestError::Sink(_)));
        assert_eq!(cursor.saved(), vec![50]);
        assert_eq!(err.summary.written, 57);
    }

    #[test]
    fn test_restart_after_crash_produces_no_duplicates() {
        let source = MockSource::with_rows(120);
        let sink = MockSink::new();
        sink.fail_on_write("row-75");
        let cursor = MemoryCursorStore::new();

        let first = run_with(&source, &sink, &cursor, IngestOptions::new(50));
        assert!(first.is_err());
        assert_eq!(cursor.value(), 50);

        sink.clear_failure();
        let second = run_with(&source, &sink, &cursor, IngestOptions::new(50)).unwrap();

        assert_eq!(second.start_cursor, 50);
        assert_eq!(second.skipped_existing, 25);
        assert_eq!(sink.len(), 120);
        assert_eq!(sink.write_count(), 120);
    }

    #[test]
    fn test_rerun_after_completion_writes_nothing() {
        let source = MockSource::with_rows(40);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::new();

        run_with(&source, &sink, &cursor, IngestOptions::new(15)).unwrap();
        cursor.reset();
        let again = run_with(&source, &sink, &cursor, IngestOptions::new(15)).unwrap();

        assert_eq!(again.written, 0);
        assert_eq!(again.skipped_existing, 40);
        assert_eq!(sink.write_count(), 40);
    }

    #[test]
    fn test_max_rows_stops_at_batch_boundary() {
        let source = MockSource::with_rows(1000);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::starting_at(100);

        let summary = run_with(
            &source,
            &sink,
            &cursor,
            IngestOptions::new(30).with_max_rows(100),
        )
        .unwrap();

        // 4 batches of 30 are needed to cover 100 rows
        assert_eq!(summary.batches, 4);
        assert_eq!(summary.end_cursor, 220);
        assert_eq!(source.fetches().len(), 4);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let source = MockSource::with_rows(10);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::new();

        let err = run_with(&source, &sink, &cursor, IngestOptions::new(0)).unwrap_err();

        assert!(matches!(err.error, IngestError::InvalidBatchSize(0)));
        assert!(source.fetches().is_empty());
    }

    #[test]
    fn test_free_function_runs_loop() {
        let source = MockSource::with_rows(25);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::new();

        let summary = run(&source, &sink, &cursor, 10, &keep).unwrap();

        assert_eq!(summary.end_cursor, 30);
        assert_eq!(sink.len(), 25);
    }

    /// Cursor store that loads fine but can never persist.
    struct ReadOnlyCursor;

    impl CursorStore for ReadOnlyCursor {
        fn load(&self) -> Result<u64, CursorError> {
            Ok(0)
        }

        fn save(&self, _cursor: u64) -> Result<(), CursorError> {
            Err(CursorError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only filesystem",
            )))
        }
    }

    #[test]
    fn test_cursor_save_failure_aborts_after_writes() {
        let source = MockSource::with_rows(20);
        let sink = MockSink::new();

        let err = Ingestor::new("test", &source, &sink, ReadOnlyCursor)
            .with_batch_size(10)
            .run(&keep)
            .unwrap_err();

        assert!(matches!(err.error, IngestError::Cursor(CursorError::Io(_))));
        assert!(!err.is_retryable());
        // The batch reached the sink but was never checkpointed
        assert_eq!(sink.len(), 10);
        assert_eq!(err.summary.written, 10);
        assert_eq!(err.summary.batches, 0);
        assert_eq!(err.summary.end_cursor, 0);
        assert_eq!(source.fetches(), vec![(0, 10)]);
    }

    #[test]
    fn test_cursor_overflow_stops_before_fetch() {
        let source = MockSource::with_rows(10);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::starting_at(u64::MAX - 5);

        let err = run_with(&source, &sink, &cursor, IngestOptions::new(10)).unwrap_err();

        assert!(matches!(
            err.error,
            IngestError::CursorOverflow { cursor: c, batch_size: 10 } if c == u64::MAX - 5
        ));
        assert!(source.fetches().is_empty());
        assert!(cursor.saved().is_empty());
        assert_eq!(err.summary.end_cursor, u64::MAX - 5);
    }

    #[test]
    fn test_huge_batch_size_does_not_panic() {
        let source = MockSource::with_rows(5);
        let sink = MockSink::new();
        let cursor = MemoryCursorStore::new();

        let err = run_with(&source, &sink, &cursor, IngestOptions::new(u64::MAX)).unwrap_err();

        assert!(matches!(err.error, IngestError::CursorOverflow { .. }));
        assert_eq!(sink.len(), 5);
        assert_eq!(cursor.saved(), vec![u64::MAX]);
    }
}
