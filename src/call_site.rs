use crate::codec::{Primitive, Value};

/// Call-site descriptors and argument classification.
///
/// Each `log_record!` expansion materializes one static [`CallSite`] and
/// classifies every argument as either constant (recorded once, in the index
/// stream) or varying (recorded per invocation, in the log stream). The
/// classification is fixed by the expression written at the call site, so a
/// given argument position can never change category between invocations.

/// Static descriptor of one logging call site.
///
/// Identified by its source location, which is stable for the lifetime of the
/// process. The descriptor is created once per call site (as a `static` inside
/// the macro expansion) and referenced by every submitted record.
#[derive(Debug)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
    /// Format string literal; at most 255 bytes (enforced at compile time by
    /// `log_record!`).
    pub format: &'static str,
}

/// Process-unique key identifying a call site, derived from its source
/// location.
pub type CallSiteKey = (&'static str, u32, u32);

impl CallSite {
    pub const fn new(file: &'static str, line: u32, column: u32, format: &'static str) -> Self {
        Self {
            file,
            line,
            column,
            format,
        }
    }

    pub fn key(&self) -> CallSiteKey {
        (self.file, self.line, self.column)
    }
}

/// An argument captured at a call site, with its storage classification.
///
/// `Constant` values are written to the index stream exactly once, when the
/// call site is first registered; they never appear in log records. `Varying`
/// values are copied into every record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Constant(Value),
    Varying(Value),
}

impl Arg {
    pub fn value(&self) -> &Value {
        match self {
            Arg::Constant(v) | Arg::Varying(v) => v,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Arg::Constant(_))
    }
}

/// Marks an argument as constant for its call site.
///
/// Use this for literals and other values that cannot change across
/// invocations of the same call site. The value is stored once in the index
/// entry instead of in every log record.
///
/// # Examples
///
/// ```
/// use binlog::{constant, Arg, Value};
///
/// assert_eq!(constant(42u8), Arg::Constant(Value::U8(42)));
/// // Plain values convert to the varying classification.
/// assert_eq!(Arg::from(42u8), Arg::Varying(Value::U8(42)));
/// ```
pub fn constant<T: Primitive>(value: T) -> Arg {
    Arg::Constant(value.into_value())
}

// Unannotated arguments default to varying.
impl<T: Primitive> From<T> for Arg {
    fn from(value: T) -> Arg {
        Arg::Varying(value.into_value())
    }
}
