use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::queue::SegQueue;
use parking_lot::{Condvar, Mutex};

use crate::call_site::{Arg, CallSite};
use crate::record_encoder::encode_record;
use crate::site_registry::CallSiteRegistry;
use crate::stream_writer::StreamWriter;

/// The offload pipeline: a lock-free multi-producer queue feeding a single
/// background worker that performs all registration, encoding, and I/O.
///
/// Producers only push a self-contained [`Event`] and bump an atomic pending
/// counter; they never take a lock, touch the registry, or block on I/O. The
/// worker drains the queue in batches, waking when the pending count crosses
/// [`BATCH_SIZE`], when a flush is requested, or on shutdown. A short condvar
/// poll keeps sub-batch traffic from sitting in memory indefinitely.
///
/// Ordering: events from one producer thread are encoded in submission order
/// (the queue is FIFO); events from different producers interleave in
/// whatever order their pushes serialize. Only the worker writes the streams,
/// so stream order equals worker pop order.

/// Pending-count threshold at which producers wake the worker, and the
/// maximum number of events popped per drain round.
pub const BATCH_SIZE: usize = 32;

/// Upper bound on how long sub-batch traffic waits before the worker drains
/// it anyway.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// One pending unit of encode work.
///
/// Carries everything the worker needs with no reference back to the
/// producer's stack: the static call-site descriptor (used only on first
/// sight for registration) and copies of the argument values.
#[derive(Debug)]
pub(crate) struct Event {
    pub site: &'static CallSite,
    pub args: Vec<Arg>,
}

#[derive(Debug, Default)]
struct FlushClock {
    requested: u64,
    completed: u64,
}

#[derive(Debug)]
struct Shared {
    queue: SegQueue<Event>,
    pending: AtomicUsize,
    running: AtomicBool,
    control: Mutex<FlushClock>,
    /// Producers and shutdown wake the worker.
    wake: Condvar,
    /// The worker signals flush completion.
    drained: Condvar,
}

/// Handle pairing the shared queue state with the worker thread.
#[derive(Debug)]
pub(crate) struct Pipeline {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawns the worker thread that will own `streams` for its lifetime.
    pub fn start(streams: StreamWriter) -> io::Result<Pipeline> {
        let shared = Arc::new(Shared {
            queue: SegQueue::new(),
            pending: AtomicUsize::new(0),
            running: AtomicBool::new(true),
            control: Mutex::new(FlushClock::default()),
            wake: Condvar::new(),
            drained: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("binlog-writer".into())
            .spawn(move || run_worker(worker_shared, Backend::new(streams)))?;

        Ok(Pipeline {
            shared,
            worker: Some(worker),
        })
    }

    /// Producer-side enqueue. Lock-free; never performs registry lookups or
    /// stream writes.
    pub fn submit(&self, event: Event) {
        self.shared.queue.push(event);
        let pending = self.shared.pending.fetch_add(1, Ordering::Release) + 1;
        if pending >= BATCH_SIZE {
            // Missing this notify is harmless: the worker polls.
            self.shared.wake.notify_one();
        }
    }

    /// Blocks until everything submitted before this call is encoded and both
    /// streams are flushed to disk.
    pub fn flush(&self) {
        let mut clock = self.shared.control.lock();
        clock.requested += 1;
        let target = clock.requested;
        self.shared.wake.notify_one();
        while clock.completed < target {
            self.shared.drained.wait(&mut clock);
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        {
            // Taking the control lock closes the race with a worker that has
            // checked the flag but not yet started waiting.
            let _clock = self.shared.control.lock();
            self.shared.running.store(false, Ordering::Release);
            self.shared.wake.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("binlog worker thread panicked during shutdown");
            }
        }
    }
}

/// Worker-owned state: registry, streams, and one-shot error reporting flags.
struct Backend {
    registry: CallSiteRegistry,
    streams: StreamWriter,
    capacity_reported: bool,
    write_error_reported: bool,
}

impl Backend {
    fn new(streams: StreamWriter) -> Self {
        Self {
            registry: CallSiteRegistry::new(),
            streams,
            capacity_reported: false,
            write_error_reported: false,
        }
    }

    fn process(&mut self, event: Event) {
        let id = match self
            .registry
            .register_or_get(event.site, &event.args, self.streams.index_stream())
        {
            Ok(Some(id)) => id,
            Ok(None) => {
                if !self.capacity_reported {
                    self.capacity_reported = true;
                    log::error!(
                        "binlog: call-site capacity ({}) exceeded at {}:{}; further new sites are dropped",
                        crate::site_registry::MAX_CALL_SITES,
                        event.site.file,
                        event.site.line,
                    );
                }
                return;
            }
            Err(err) => {
                self.report_write_error("index", &err);
                return;
            }
        };

        if let Err(err) = encode_record(self.streams.log_stream(), id, &event.args) {
            self.report_write_error("log", &err);
        }
    }

    fn report_write_error(&mut self, stream: &str, err: &io::Error) {
        if !self.write_error_reported {
            self.write_error_reported = true;
            log::error!("binlog: {} stream write failed: {}", stream, err);
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.streams.flush() {
            self.report_write_error("flush", &err);
        }
    }

    fn close(mut self) {
        self.flush();
        if let Err(err) = self.streams.close() {
            log::error!("binlog: closing streams failed: {}", err);
        }
    }
}

fn run_worker(shared: Arc<Shared>, mut backend: Backend) {
    let mut batch = Vec::with_capacity(BATCH_SIZE);

    loop {
        // Bulk dequeue: pop up to a batch per round, repeat until the queue
        // is observed empty, so synchronization cost amortizes across items.
        loop {
            batch.clear();
            while batch.len() < BATCH_SIZE {
                match shared.queue.pop() {
                    Some(event) => batch.push(event),
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }
            for event in batch.drain(..) {
                backend.process(event);
                shared.pending.fetch_sub(1, Ordering::Release);
            }
        }

        let mut clock = shared.control.lock();

        // A flush request counts everything submitted before it; the queue
        // being empty here means all of that has been processed.
        if clock.completed < clock.requested && shared.queue.is_empty() {
            backend.flush();
            clock.completed = clock.requested;
            shared.drained.notify_all();
        }

        let running = shared.running.load(Ordering::Acquire);
        if !running && shared.queue.is_empty() {
            break;
        }

        let below_threshold = shared.pending.load(Ordering::Acquire) < BATCH_SIZE;
        let no_flush_pending = clock.completed == clock.requested;
        if running && below_threshold && no_flush_pending {
            let _ = shared.wake.wait_for(&mut clock, IDLE_POLL);
        }
    }

    backend.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn leak_site(line: u32, format: &'static str) -> &'static CallSite {
        Box::leak(Box::new(CallSite::new("pipeline_tests.rs", line, 1, format)))
    }

    #[test]
    fn test_drain_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.blog");
        let site = leak_site(1, "n={}");

        {
            let pipeline = Pipeline::start(StreamWriter::open(&path).unwrap()).unwrap();
            for i in 0..100u32 {
                pipeline.submit(Event {
                    site,
                    args: vec![Arg::from(i)],
                });
            }
        }

        // 100 records, each 1 id byte + 4 value bytes.
        assert_eq!(fs::read(&path).unwrap().len(), 100 * 5);
    }

    #[test]
    fn test_flush_makes_records_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.blog");
        let site = leak_site(2, "n={}");

        let pipeline = Pipeline::start(StreamWriter::open(&path).unwrap()).unwrap();
        for i in 0..3u8 {
            pipeline.submit(Event {
                site,
                args: vec![Arg::from(i)],
            });
        }
        pipeline.flush();

        // Visible on disk while the pipeline is still running.
        assert_eq!(fs::read(&path).unwrap(), [0, 0, 0, 1, 0, 2]);
        drop(pipeline);
    }

    #[test]
    fn test_flush_with_empty_queue_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.blog");

        let pipeline = Pipeline::start(StreamWriter::open(&path).unwrap()).unwrap();
        pipeline.flush();
        pipeline.flush();
    }
}
