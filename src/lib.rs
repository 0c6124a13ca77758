//! # binlog
//!
//! A deferred binary logging engine that moves formatting and serialization
//! cost off the caller's critical path:
//!
//! * **Cheap call sites**: the hot path copies argument values into a
//!   lock-free queue and returns; no I/O, no locks, no formatting
//! * **Two-stream format**: an index stream holds one entry per distinct call
//!   site (format string, type signature, constant values); the log stream
//!   holds one compact record per invocation (1-byte site id + varying values)
//! * **Constant elision**: values that cannot change across invocations are
//!   stored once in the index entry and never repeated per record
//!
//! ## Main Components
//!
//! * `Logger`: the engine handle — open, log, flush, drain-on-drop
//! * `log_record!`: the call-site macro wiring up registration and submission
//! * `LogReader`: decodes an index + log stream pair back into records
//! * `codec`: the closed type-tag set and fixed-width value encoding
//!
//! ## Quick Start
//!
//! ```
//! use binlog::{constant, log_record, Logger, LogReader};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("app.blog");
//!
//! {
//!     let logger = Logger::open(&path).unwrap();
//!     for reading in [21.5f64, 22.0, 22.4] {
//!         log_record!(logger, "sensor {} reads {}", constant(7u8), reading);
//!     }
//!     // Dropping the logger drains the queue and closes both streams.
//! }
//!
//! let reader = LogReader::from_files(&path).unwrap();
//! let lines: Vec<String> = reader.map(|entry| entry.render()).collect();
//! assert_eq!(lines[0], "sensor 7 reads 21.5");
//! assert_eq!(lines.len(), 3);
//! ```
//!
//! ## Concurrency
//!
//! A `Logger` may be shared across threads (`&self` hot path, `Arc` for
//! ownership). Records from one producer keep their submission order;
//! records from different producers interleave in queue order. A single
//! background worker performs all encoding and stream writes.

pub mod call_site;
pub mod codec;
pub mod log_reader;
pub mod logger;
pub mod pipeline;
pub mod record_encoder;
pub mod site_registry;
pub mod stream_writer;

pub use call_site::{constant, Arg, CallSite};
pub use codec::{Primitive, Tag, Value};
pub use log_reader::{ArgSpec, LogEntry, LogReader, SiteEntry};
pub use logger::Logger;
pub use site_registry::{CallSiteRegistry, MAX_CALL_SITES};
pub use stream_writer::{StreamWriter, INDEX_SUFFIX};
