use std::io::{self, Write};

/// Type tag codec for the binary log format.
///
/// Every argument value carried by the engine belongs to a closed set of
/// primitive types, each identified by a stable one-byte tag and encoded in a
/// fixed little-endian width. The tag is written once per argument position in
/// the index stream; log records carry raw value bytes only.

/// One-byte type tag identifying a primitive value's binary representation.
///
/// The discriminants are part of the on-disk format and must never be
/// reordered: character first, then unsigned integers by width, signed
/// integers by width, then the two float widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// Unicode scalar value, encoded as 4 bytes
    Char = 0,
    U8 = 1,
    U16 = 2,
    U32 = 3,
    U64 = 4,
    I8 = 5,
    I16 = 6,
    I32 = 7,
    I64 = 8,
    F32 = 9,
    F64 = 10,
}

impl Tag {
    /// Decodes a tag byte read from the index stream.
    ///
    /// Returns `None` for bytes outside the closed tag set, which can only
    /// mean a corrupt or foreign index stream.
    pub fn from_u8(byte: u8) -> Option<Tag> {
        match byte {
            0 => Some(Tag::Char),
            1 => Some(Tag::U8),
            2 => Some(Tag::U16),
            3 => Some(Tag::U32),
            4 => Some(Tag::U64),
            5 => Some(Tag::I8),
            6 => Some(Tag::I16),
            7 => Some(Tag::I32),
            8 => Some(Tag::I64),
            9 => Some(Tag::F32),
            10 => Some(Tag::F64),
            _ => None,
        }
    }

    /// Number of value bytes a value of this type occupies on disk.
    pub fn width(self) -> usize {
        match self {
            Tag::U8 | Tag::I8 => 1,
            Tag::U16 | Tag::I16 => 2,
            Tag::Char | Tag::U32 | Tag::I32 | Tag::F32 => 4,
            Tag::U64 | Tag::I64 | Tag::F64 => 8,
        }
    }
}

/// A primitive value as carried through the offload pipeline and decoded back
/// from a log or index stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Char(char),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// The type tag matching this value.
    pub fn tag(&self) -> Tag {
        match self {
            Value::Char(_) => Tag::Char,
            Value::U8(_) => Tag::U8,
            Value::U16(_) => Tag::U16,
            Value::U32(_) => Tag::U32,
            Value::U64(_) => Tag::U64,
            Value::I8(_) => Tag::I8,
            Value::I16(_) => Tag::I16,
            Value::I32(_) => Tag::I32,
            Value::I64(_) => Tag::I64,
            Value::F32(_) => Tag::F32,
            Value::F64(_) => Tag::F64,
        }
    }

    /// Appends the fixed-width little-endian value bytes (no tag byte).
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Value::Char(c) => out.write_all(&(*c as u32).to_le_bytes()),
            Value::U8(v) => out.write_all(&v.to_le_bytes()),
            Value::U16(v) => out.write_all(&v.to_le_bytes()),
            Value::U32(v) => out.write_all(&v.to_le_bytes()),
            Value::U64(v) => out.write_all(&v.to_le_bytes()),
            Value::I8(v) => out.write_all(&v.to_le_bytes()),
            Value::I16(v) => out.write_all(&v.to_le_bytes()),
            Value::I32(v) => out.write_all(&v.to_le_bytes()),
            Value::I64(v) => out.write_all(&v.to_le_bytes()),
            Value::F32(v) => out.write_all(&v.to_le_bytes()),
            Value::F64(v) => out.write_all(&v.to_le_bytes()),
        }
    }

    /// Decodes a value from exactly `tag.width()` bytes.
    ///
    /// Returns `None` if `bytes` has the wrong length or encodes an invalid
    /// Unicode scalar for `Tag::Char`.
    pub fn decode(tag: Tag, bytes: &[u8]) -> Option<Value> {
        if bytes.len() != tag.width() {
            return None;
        }
        let value = match tag {
            Tag::Char => {
                let scalar = u32::from_le_bytes(bytes.try_into().ok()?);
                Value::Char(char::from_u32(scalar)?)
            }
            Tag::U8 => Value::U8(bytes[0]),
            Tag::U16 => Value::U16(u16::from_le_bytes(bytes.try_into().ok()?)),
            Tag::U32 => Value::U32(u32::from_le_bytes(bytes.try_into().ok()?)),
            Tag::U64 => Value::U64(u64::from_le_bytes(bytes.try_into().ok()?)),
            Tag::I8 => Value::I8(bytes[0] as i8),
            Tag::I16 => Value::I16(i16::from_le_bytes(bytes.try_into().ok()?)),
            Tag::I32 => Value::I32(i32::from_le_bytes(bytes.try_into().ok()?)),
            Tag::I64 => Value::I64(i64::from_le_bytes(bytes.try_into().ok()?)),
            Tag::F32 => Value::F32(f32::from_le_bytes(bytes.try_into().ok()?)),
            Tag::F64 => Value::F64(f64::from_le_bytes(bytes.try_into().ok()?)),
        };
        Some(value)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Char(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Compile-time mapping from a supported primitive type to its tag.
///
/// The trait is sealed: passing a type outside the supported set to the
/// logging entry points is a compile error, never a runtime condition.
///
/// # Examples
///
/// ```
/// use binlog::{Primitive, Tag};
///
/// assert_eq!(u64::TAG, Tag::U64);
/// assert_eq!(<f32 as Primitive>::TAG, Tag::F32);
/// ```
pub trait Primitive: Copy + sealed::Sealed {
    /// The tag resolved for this type at compile time.
    const TAG: Tag;

    /// Converts the value into the pipeline's carried representation.
    fn into_value(self) -> Value;
}

macro_rules! impl_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Primitive for $ty {
                const TAG: Tag = Tag::$variant;

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

impl_primitive! {
    char => Char,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_bytes_are_stable() {
        // On-disk contract: these discriminants must never change.
        assert_eq!(Tag::Char as u8, 0);
        assert_eq!(Tag::U8 as u8, 1);
        assert_eq!(Tag::U16 as u8, 2);
        assert_eq!(Tag::U32 as u8, 3);
        assert_eq!(Tag::U64 as u8, 4);
        assert_eq!(Tag::I8 as u8, 5);
        assert_eq!(Tag::I16 as u8, 6);
        assert_eq!(Tag::I32 as u8, 7);
        assert_eq!(Tag::I64 as u8, 8);
        assert_eq!(Tag::F32 as u8, 9);
        assert_eq!(Tag::F64 as u8, 10);
    }

    #[test]
    fn test_tag_round_trip() {
        for byte in 0..=10u8 {
            let tag = Tag::from_u8(byte).expect("tag in range");
            assert_eq!(tag as u8, byte);
        }
        assert_eq!(Tag::from_u8(11), None);
        assert_eq!(Tag::from_u8(255), None);
    }

    #[test]
    fn test_fixed_widths() {
        assert_eq!(Tag::U8.width(), 1);
        assert_eq!(Tag::I16.width(), 2);
        assert_eq!(Tag::Char.width(), 4);
        assert_eq!(Tag::F32.width(), 4);
        assert_eq!(Tag::U64.width(), 8);
        assert_eq!(Tag::F64.width(), 8);
    }

    #[test]
    fn test_value_encoding_is_little_endian() {
        let mut buf = Vec::new();
        Value::U32(0x0403_0201).write_to(&mut buf).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);

        buf.clear();
        Value::I16(-2).write_to(&mut buf).unwrap();
        assert_eq!(buf, [0xfe, 0xff]);
    }

    #[test]
    fn test_char_encodes_as_scalar() {
        let mut buf = Vec::new();
        Value::Char('λ').write_to(&mut buf).unwrap();
        assert_eq!(buf, ('λ' as u32).to_le_bytes());
        assert_eq!(Value::decode(Tag::Char, &buf), Some(Value::Char('λ')));
    }

    #[test]
    fn test_decode_rejects_wrong_width() {
        assert_eq!(Value::decode(Tag::U32, &[1, 2, 3]), None);
        assert_eq!(Value::decode(Tag::U8, &[1, 2]), None);
    }

    #[test]
    fn test_decode_rejects_invalid_scalar() {
        // Surrogate range is not a valid char.
        let bytes = 0xD800u32.to_le_bytes();
        assert_eq!(Value::decode(Tag::Char, &bytes), None);
    }

    #[test]
    fn test_primitive_dispatch() {
        assert_eq!(42u8.into_value(), Value::U8(42));
        assert_eq!((-7i64).into_value(), Value::I64(-7));
        assert_eq!(2.5f64.into_value(), Value::F64(2.5));
        assert_eq!('x'.into_value(), Value::Char('x'));
    }
}
