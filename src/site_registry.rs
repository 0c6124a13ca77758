use std::collections::HashMap;
use std::io::{self, Write};

use crate::call_site::{Arg, CallSite, CallSiteKey};

/// Call-site deduplication registry.
///
/// On the first execution of a call site the registry assigns it a
/// monotonically increasing one-byte id and writes the site's index entry
/// (format string, argument signature, constant values) exactly once. Every
/// later execution reuses the stored id without touching the index stream.
///
/// # Thread Safety
///
/// The registry is owned exclusively by the offload worker thread, so lookups
/// and id assignment are single-threaded by construction and need no locking.

/// Classification byte written per argument in an index entry: the constant's
/// value bytes follow immediately.
pub const CLASS_CONSTANT: u8 = 1;
/// Classification byte for arguments whose value is recorded per invocation.
pub const CLASS_VARYING: u8 = 0;

/// Hard cap on distinct call sites per logger instance, imposed by the
/// one-byte id in every log record. The limit is guarded, never wrapped.
pub const MAX_CALL_SITES: usize = 256;

/// Maps call-site keys to their assigned ids and owns the index entry layout.
#[derive(Debug, Default)]
pub struct CallSiteRegistry {
    ids: HashMap<CallSiteKey, u8>,
}

impl CallSiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of call sites registered so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the id for `site`, registering it on first sight.
    ///
    /// First sight writes one index entry to `index`:
    ///
    /// ```text
    /// format_len:u8 format_bytes[format_len] arg_count:u8
    /// (type_tag:u8 classification:u8 const_value?) * arg_count
    /// ```
    ///
    /// Ids are issued in strict first-registration order starting at 0.
    /// Returns `Ok(None)` once [`MAX_CALL_SITES`] distinct sites exist; the
    /// caller decides how to report the capacity hit.
    pub fn register_or_get<W: Write>(
        &mut self,
        site: &CallSite,
        args: &[Arg],
        index: &mut W,
    ) -> io::Result<Option<u8>> {
        if let Some(&id) = self.ids.get(&site.key()) {
            return Ok(Some(id));
        }
        if self.ids.len() >= MAX_CALL_SITES {
            return Ok(None);
        }

        let id = self.ids.len() as u8;
        let format = site.format.as_bytes();
        debug_assert!(format.len() <= u8::MAX as usize);
        debug_assert!(args.len() <= u8::MAX as usize);

        index.write_all(&[format.len() as u8])?;
        index.write_all(format)?;
        index.write_all(&[args.len() as u8])?;
        for arg in args {
            match arg {
                Arg::Constant(value) => {
                    index.write_all(&[value.tag() as u8, CLASS_CONSTANT])?;
                    value.write_to(index)?;
                }
                Arg::Varying(value) => {
                    index.write_all(&[value.tag() as u8, CLASS_VARYING])?;
                }
            }
        }

        self.ids.insert(site.key(), id);
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_site::constant;
    use crate::codec::Tag;

    fn site(line: u32, format: &'static str) -> CallSite {
        CallSite::new("registry_tests.rs", line, 1, format)
    }

    #[test]
    fn test_single_entry_per_site() {
        let mut registry = CallSiteRegistry::new();
        let mut index = Vec::new();
        let s = site(1, "hello");

        let id = registry.register_or_get(&s, &[], &mut index).unwrap();
        assert_eq!(id, Some(0));
        let written = index.len();
        assert!(written > 0);

        // Re-registering writes nothing and returns the same id.
        for _ in 0..10 {
            let id = registry.register_or_get(&s, &[], &mut index).unwrap();
            assert_eq!(id, Some(0));
        }
        assert_eq!(index.len(), written);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_issued_in_registration_order() {
        let mut registry = CallSiteRegistry::new();
        let mut index = Vec::new();
        for line in 0..5 {
            let s = site(line, "msg");
            let id = registry.register_or_get(&s, &[], &mut index).unwrap();
            assert_eq!(id, Some(line as u8));
        }
    }

    #[test]
    fn test_index_entry_layout() {
        let mut registry = CallSiteRegistry::new();
        let mut index = Vec::new();
        let s = site(7, "x={} y={}");
        let args = [constant(42u8), Arg::from(0u8)];

        registry.register_or_get(&s, &args, &mut index).unwrap();

        let mut expected = vec![9u8];
        expected.extend_from_slice(b"x={} y={}");
        expected.push(2); // arg count
        expected.extend_from_slice(&[Tag::U8 as u8, CLASS_CONSTANT, 42]);
        expected.extend_from_slice(&[Tag::U8 as u8, CLASS_VARYING]);
        assert_eq!(index, expected);
    }

    #[test]
    fn test_constant_value_width_in_entry() {
        let mut registry = CallSiteRegistry::new();
        let mut index = Vec::new();
        let s = site(3, "{}");
        let args = [constant(0x1122_3344_5566_7788u64)];

        registry.register_or_get(&s, &args, &mut index).unwrap();

        // len + format + count + tag + class + 8 value bytes
        assert_eq!(index.len(), 1 + 2 + 1 + 1 + 1 + 8);
        assert_eq!(&index[6..], &0x1122_3344_5566_7788u64.to_le_bytes());
    }

    #[test]
    fn test_capacity_is_guarded() {
        let mut registry = CallSiteRegistry::new();
        let mut index = Vec::new();

        for line in 0..MAX_CALL_SITES as u32 {
            let s = site(line, "m");
            let id = registry.register_or_get(&s, &[], &mut index).unwrap();
            assert_eq!(id, Some(line as u8));
        }
        assert_eq!(registry.len(), MAX_CALL_SITES);

        // The 257th distinct site is refused, not wrapped to id 0.
        let overflow = site(MAX_CALL_SITES as u32, "m");
        let written = index.len();
        let id = registry.register_or_get(&overflow, &[], &mut index).unwrap();
        assert_eq!(id, None);
        assert_eq!(index.len(), written);

        // Existing sites still resolve.
        let id = registry.register_or_get(&site(0, "m"), &[], &mut index).unwrap();
        assert_eq!(id, Some(0));
    }
}
