use std::io;
use std::path::Path;

use crate::call_site::{Arg, CallSite};
use crate::pipeline::{Event, Pipeline};
use crate::stream_writer::StreamWriter;

/// The logging engine handle.
///
/// A `Logger` owns two append-only streams (see [`crate::stream_writer`]) and
/// a background worker fed by a lock-free queue. Calling [`Logger::log`] —
/// usually through the [`log_record!`](crate::log_record) macro — copies the
/// argument values and enqueues them; all deduplication, encoding, and file
/// I/O happen off the calling thread.
///
/// # Thread Safety
///
/// The hot path takes `&self`, so a `Logger` can be shared across producer
/// threads (e.g. behind an `Arc`). Records from one thread keep their
/// submission order in the log stream; records from different threads
/// interleave in queue order, with no global order promised.
///
/// # Shutdown
///
/// Dropping the `Logger` drains the queue to completion, flushes and closes
/// both streams, and joins the worker. Every record submitted before the drop
/// is guaranteed to be on disk afterwards.
///
/// # Examples
///
/// ```
/// use binlog::{constant, log_record, Logger};
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = Logger::open(dir.path().join("app.blog")).unwrap();
///
/// let temperature = 25.5f64;
/// log_record!(logger, "sensor {} reads {}", constant(3u8), temperature);
/// log_record!(logger, "startup complete");
///
/// logger.flush();
/// ```
#[derive(Debug)]
pub struct Logger {
    pipeline: Pipeline,
}

impl Logger {
    /// Opens the log stream at `path` and the index stream at
    /// `path` + `".index"`, then starts the offload worker.
    ///
    /// Fails if either stream file cannot be created or the worker thread
    /// cannot be spawned; a logger without its streams is not usable.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Logger> {
        let streams = StreamWriter::open(path)?;
        let pipeline = Pipeline::start(streams)?;
        Ok(Logger { pipeline })
    }

    /// Submits one invocation of `site` with its argument values.
    ///
    /// This is the only hot-path entry point. It pushes a self-contained work
    /// item (the static site descriptor plus copies of the values in `args`)
    /// onto the queue and returns; it never blocks on I/O and never touches
    /// the call-site registry. Prefer [`log_record!`](crate::log_record),
    /// which materializes `site` and converts the arguments for you.
    pub fn log(&self, site: &'static CallSite, args: Vec<Arg>) {
        self.pipeline.submit(Event { site, args });
    }

    /// Blocks until every record submitted before this call is encoded and
    /// both streams are flushed to disk.
    ///
    /// A synchronization point for collaborators that need the files readable
    /// without tearing the logger down.
    pub fn flush(&self) {
        self.pipeline.flush();
    }
}

/// Logs a record through a [`Logger`].
///
/// Expands to a static [`CallSite`](crate::CallSite) keyed on
/// `file!`/`line!`/`column!`, converts each argument, and submits the record.
/// The format string must be a literal of at most 255 bytes (checked at
/// compile time). Arguments are varying by default; wrap values that cannot
/// change across invocations in [`constant`](crate::constant) so they are
/// stored once in the index entry instead of in every record.
///
/// Argument types must belong to the supported primitive set (`char`, the
/// fixed-width integers, `f32`, `f64`); anything else is a compile error.
///
/// # Examples
///
/// ```
/// use binlog::{constant, log_record, Logger};
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = Logger::open(dir.path().join("app.blog")).unwrap();
///
/// for attempt in 0..3u32 {
///     log_record!(logger, "retry {} of {}", attempt, constant(3u32));
/// }
/// ```
#[macro_export]
macro_rules! log_record {
    ($logger:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        const _: () = assert!(
            $fmt.len() <= 255,
            "log_record! format string must fit in 255 bytes"
        );
        static SITE: $crate::CallSite =
            $crate::CallSite::new(file!(), line!(), column!(), $fmt);
        $logger.log(&SITE, vec![$($crate::Arg::from($arg)),*]);
    }};
}
