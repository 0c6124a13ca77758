use std::fs;
use std::io;
use std::path::Path;

use crate::codec::{Tag, Value};
use crate::site_registry::{CLASS_CONSTANT, CLASS_VARYING};
use crate::stream_writer::INDEX_SUFFIX;

/// Reader for replaying an index + log stream pair.
///
/// The log stream carries no per-record length or type information, so the
/// reader first parses the complete index stream into call-site entries, then
/// walks the log stream record by record, sizing each record from its site's
/// argument signature. Constant values come from the index entry, varying
/// values from the record itself, merged back into declaration order.

/// One argument position of a decoded index entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub tag: Tag,
    /// `Some` for constant arguments; the value recorded once at
    /// registration. `None` for varying arguments.
    pub constant: Option<Value>,
}

/// One decoded index entry: a distinct call site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteEntry {
    pub format: String,
    pub args: Vec<ArgSpec>,
}

impl SiteEntry {
    /// Bytes a log record for this site occupies after its id byte.
    fn varying_width(&self) -> usize {
        self.args
            .iter()
            .filter(|arg| arg.constant.is_none())
            .map(|arg| arg.tag.width())
            .sum()
    }
}

/// A single decoded log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub call_site_id: u8,
    pub format_string: String,
    /// All argument values in declaration order, constants included.
    pub values: Vec<Value>,
}

impl LogEntry {
    /// Renders the record by substituting `{}` placeholders in order.
    ///
    /// `{{` and `}}` escape literal braces. Placeholders beyond the argument
    /// count are left as-is.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.format_string.len() + 16);
        let bytes = self.format_string.as_bytes();
        let mut values = self.values.iter();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'{' if i + 1 < bytes.len() && bytes[i + 1] == b'{' => {
                    out.push('{');
                    i += 2;
                }
                b'}' if i + 1 < bytes.len() && bytes[i + 1] == b'}' => {
                    out.push('}');
                    i += 2;
                }
                b'{' if i + 1 < bytes.len() && bytes[i + 1] == b'}' => {
                    match values.next() {
                        Some(value) => out.push_str(&value.to_string()),
                        None => out.push_str("{}"),
                    }
                    i += 2;
                }
                _ => {
                    // Format strings are UTF-8; copy the whole code point.
                    let ch = self.format_string[i..].chars().next().unwrap();
                    out.push(ch);
                    i += ch.len_utf8();
                }
            }
        }
        out
    }
}

/// Cursor over the raw index stream bytes.
struct IndexCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> IndexCursor<'a> {
    fn take(&mut self, n: usize) -> io::Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "truncated index stream",
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn done(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// Decoder over a fully loaded index + log stream pair.
///
/// # Examples
///
/// ```
/// use binlog::{log_record, Logger, LogReader};
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("app.blog");
/// {
///     let logger = Logger::open(&path).unwrap();
///     log_record!(logger, "value is {}", 42u32);
/// }
///
/// let mut reader = LogReader::from_files(&path).unwrap();
/// let entry = reader.read_entry().unwrap();
/// assert_eq!(entry.render(), "value is 42");
/// assert!(reader.read_entry().is_none());
/// ```
#[derive(Debug)]
pub struct LogReader {
    sites: Vec<SiteEntry>,
    log: Vec<u8>,
    pos: usize,
}

impl LogReader {
    /// Parses an index stream and takes ownership of the log stream bytes.
    ///
    /// Fails if the index stream is malformed; the log stream is validated
    /// lazily, record by record.
    pub fn from_bytes(index: &[u8], log: &[u8]) -> io::Result<LogReader> {
        let mut cursor = IndexCursor {
            bytes: index,
            pos: 0,
        };
        let mut sites = Vec::new();

        while !cursor.done() {
            let format_len = cursor.take_u8()? as usize;
            let format = std::str::from_utf8(cursor.take(format_len)?)
                .map_err(|_| invalid("index entry format string is not UTF-8"))?
                .to_string();

            let arg_count = cursor.take_u8()? as usize;
            let mut args = Vec::with_capacity(arg_count);
            for _ in 0..arg_count {
                let tag = Tag::from_u8(cursor.take_u8()?)
                    .ok_or_else(|| invalid("unknown type tag in index entry"))?;
                let constant = match cursor.take_u8()? {
                    CLASS_VARYING => None,
                    CLASS_CONSTANT => {
                        let bytes = cursor.take(tag.width())?;
                        Some(
                            Value::decode(tag, bytes)
                                .ok_or_else(|| invalid("bad constant value in index entry"))?,
                        )
                    }
                    _ => return Err(invalid("unknown classification byte in index entry")),
                };
                args.push(ArgSpec { tag, constant });
            }
            sites.push(SiteEntry { format, args });
        }

        Ok(LogReader {
            sites,
            log: log.to_vec(),
            pos: 0,
        })
    }

    /// Loads `path` and `path.index` from disk.
    pub fn from_files<P: AsRef<Path>>(path: P) -> io::Result<LogReader> {
        let path = path.as_ref();
        let mut index_path = path.as_os_str().to_os_string();
        index_path.push(INDEX_SUFFIX);

        let index = fs::read(index_path)?;
        let log = fs::read(path)?;
        Self::from_bytes(&index, &log)
    }

    /// The decoded index entries, in call-site id order.
    pub fn sites(&self) -> &[SiteEntry] {
        &self.sites
    }

    /// Decodes the next log record.
    ///
    /// Returns `None` at the end of the stream, or at a partially written
    /// trailing record (e.g. after a crash), which is dropped rather than
    /// misread.
    pub fn read_entry(&mut self) -> Option<LogEntry> {
        if self.pos >= self.log.len() {
            return None;
        }

        let id = self.log[self.pos];
        let site = self.sites.get(id as usize)?;
        let body_start = self.pos + 1;
        if body_start + site.varying_width() > self.log.len() {
            return None;
        }

        let mut offset = body_start;
        let mut values = Vec::with_capacity(site.args.len());
        for arg in &site.args {
            match &arg.constant {
                Some(value) => values.push(*value),
                None => {
                    let width = arg.tag.width();
                    let value = Value::decode(arg.tag, &self.log[offset..offset + width])?;
                    values.push(value);
                    offset += width;
                }
            }
        }

        self.pos = offset;
        Some(LogEntry {
            call_site_id: id,
            format_string: site.format.clone(),
            values,
        })
    }
}

impl Iterator for LogReader {
    type Item = LogEntry;

    fn next(&mut self) -> Option<LogEntry> {
        self.read_entry()
    }
}
