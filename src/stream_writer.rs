use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Owner of the two append-only output streams.
///
/// `open(path)` creates the log stream at `path` and the index stream at
/// `path` + [`INDEX_SUFFIX`], both truncated and buffered. All writes are
/// strictly sequential and performed by the single offload worker; the two
/// streams are flushed and closed together once the pipeline has drained.

/// Suffix appended to the log path to name the index stream file.
pub const INDEX_SUFFIX: &str = ".index";

#[derive(Debug)]
pub struct StreamWriter {
    log: BufWriter<File>,
    index: BufWriter<File>,
}

impl StreamWriter {
    /// Creates both stream files, failing if either cannot be created.
    ///
    /// A failure here is fatal for the logger being constructed: without its
    /// streams there is nothing useful a logger could do.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let log = BufWriter::new(File::create(path)?);

        let mut index_path = path.as_os_str().to_os_string();
        index_path.push(INDEX_SUFFIX);
        let index = BufWriter::new(File::create(index_path)?);

        Ok(Self { log, index })
    }

    /// The per-invocation record stream.
    pub fn log_stream(&mut self) -> &mut impl Write {
        &mut self.log
    }

    /// The per-call-site entry stream.
    pub fn index_stream(&mut self) -> &mut impl Write {
        &mut self.index
    }

    /// Flushes both streams to disk.
    pub fn flush(&mut self) -> io::Result<()> {
        self.index.flush()?;
        self.log.flush()
    }

    /// Flushes and closes both streams together.
    ///
    /// Called exactly once, after the offload pipeline has fully drained, so
    /// every enqueued record is on disk before the files are closed.
    pub fn close(mut self) -> io::Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_open_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.blog");

        let writer = StreamWriter::open(&path).unwrap();
        writer.close().unwrap();

        assert!(path.exists());
        assert!(dir.path().join("out.blog.index").exists());
    }

    #[test]
    fn test_open_fails_on_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.blog");
        assert!(StreamWriter::open(&path).is_err());
    }

    #[test]
    fn test_appends_are_sequential_and_flushed_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.blog");

        let mut writer = StreamWriter::open(&path).unwrap();
        writer.log_stream().write_all(&[1, 2, 3]).unwrap();
        writer.log_stream().write_all(&[4]).unwrap();
        writer.index_stream().write_all(b"idx").unwrap();
        writer.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), [1, 2, 3, 4]);
        assert_eq!(fs::read(dir.path().join("out.blog.index")).unwrap(), b"idx");
    }
}
