use std::io::{self, Write};

use crate::call_site::Arg;

/// Record encoder for the log stream.
///
/// A record is the call-site id followed by the raw value bytes of each
/// varying argument, in declaration order:
///
/// ```text
/// record := call_site_id:u8 (value:<type-width>) * varying_arg_count
/// ```
///
/// No tag bytes and no length prefix are written; the index entry for the id
/// already fixes the argument types and widths, so the log stream carries no
/// redundant type information. Constant arguments contribute nothing, which
/// makes a record for an all-constant call site a single id byte.
pub fn encode_record<W: Write>(log: &mut W, id: u8, args: &[Arg]) -> io::Result<()> {
    log.write_all(&[id])?;
    for arg in args {
        if let Arg::Varying(value) = arg {
            value.write_to(log)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_site::constant;

    #[test]
    fn test_record_is_id_plus_varying_values() {
        let mut log = Vec::new();
        let args = [constant(9u8), Arg::from(0x0201u16), Arg::from(7i8)];
        encode_record(&mut log, 3, &args).unwrap();
        assert_eq!(log, [3, 0x01, 0x02, 7]);
    }

    #[test]
    fn test_all_constant_record_is_one_byte() {
        let mut log = Vec::new();
        let args = [constant(1u8), constant(2u8)];
        encode_record(&mut log, 0, &args).unwrap();
        assert_eq!(log, [0]);
    }

    #[test]
    fn test_zero_arg_record() {
        let mut log = Vec::new();
        encode_record(&mut log, 255, &[]).unwrap();
        assert_eq!(log, [255]);
    }
}
