//! Hex dump rendering for decoded payloads

use std::fmt::{self, Write};

/// Left margin of every dump line
pub const DUMP_PREFIX: &str = "  ";

/// Bytes per dump line
pub const DUMP_WIDTH: usize = 40;

/// Write `buf` as rows of `width` uppercase hex bytes, each row starting with `prefix`
///
/// Every byte is followed by a space. A newline ends each full row and the
/// final partial row; an empty buffer writes nothing.
pub fn write_hex_dump<W: Write>(out: &mut W, prefix: &str, width: usize, buf: &[u8]) -> fmt::Result {
    let width = width.max(1);

    for row in buf.chunks(width) {
        out.write_str(prefix)?;
        for byte in row {
            write!(out, "{:02X} ", byte)?;
        }
        out.write_char('\n')?;
    }
    Ok(())
}

/// `write_hex_dump` with the default margin and width, into a new string
pub fn hex_dump(buf: &[u8]) -> String {
    let mut out = String::with_capacity(buf.len() * 3 + DUMP_PREFIX.len() + 1);
    // Writing into a String cannot fail
    let _ = write_hex_dump(&mut out, DUMP_PREFIX, DUMP_WIDTH, buf);
    out
}
