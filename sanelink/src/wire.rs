//! Wire primitives : the 32-bit big-endian word, the
//! length-prefixed NUL-terminated ISO-8859-1 string, the non-null-sentinel
//! pointer, and the length-prefixed array.
//!
//! Every function here reads or writes exactly the bytes it documents and
//! nothing more; higher layers (`codec`, `session`, `device`) compose these
//! to decode whole records.

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, BE};

/// Reads one 4-byte big-endian word.
pub fn read_word(r: &mut impl Read) -> io::Result<u32> {
    r.read_u32::<BE>()
}

/// Writes one 4-byte big-endian word, MSB first.
pub fn write_word(w: &mut impl Write, value: u32) -> io::Result<()> {
    w.write_u32::<BE>(value)
}

/// Reads a word and interprets it as a SANE boolean (0 = false, anything
/// else = true).
pub fn read_bool(r: &mut impl Read) -> io::Result<bool> {
    Ok(read_word(r)? != 0)
}

/// Writes a SANE boolean as a word (`0` or `1`).
pub fn write_bool(w: &mut impl Write, value: bool) -> io::Result<()> {
    write_word(w, value as u32)
}

/// Reads a length-prefixed, NUL-terminated, ISO-8859-1 string.
///
/// A length word of 0 means the empty string, and writes nothing but the
/// length word itself (no NUL byte is sent for the empty case). Any other
/// length includes the trailing NUL, which is read and discarded.
pub fn read_string(r: &mut impl Read) -> io::Result<String> {
    let len = read_word(r)? as usize;
    if len == 0 {
        return Ok(String::new());
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    // Drop the trailing NUL.
    buf.pop();
    Ok(latin1::decode(&buf))
}

/// Writes a string using the length-prefixed NUL-terminated encoding.
/// The empty string writes only the length word `0`.
pub fn write_string(w: &mut impl Write, value: &str) -> io::Result<()> {
    if value.is_empty() {
        return write_word(w, 0);
    }
    let bytes = latin1::encode(value);
    write_word(w, bytes.len() as u32 + 1)?;
    w.write_all(&bytes)?;
    w.write_u8(0)
}

/// Reads a pointer word. `true` means "a record follows"; `false` means
/// null. Two SANE quirks apply at call sites, not here: device-list
/// pointers are always treated as present, and range constraints are
/// preceded by a pointer word that must be discarded.
pub fn read_pointer(r: &mut impl Read) -> io::Result<bool> {
    Ok(read_word(r)? != 0)
}

/// Writes a pointer word: `1` if present, `0` if null.
pub fn write_pointer(w: &mut impl Write, present: bool) -> io::Result<()> {
    write_word(w, present as u32)
}

/// Reads a length-prefixed array of words, returning them in wire order.
pub fn read_word_array(r: &mut impl Read) -> io::Result<Vec<u32>> {
    let len = read_word(r)? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_word(r)?);
    }
    Ok(out)
}

/// Writes a length-prefixed array of words.
pub fn write_word_array(w: &mut impl Write, values: &[u32]) -> io::Result<()> {
    write_word(w, values.len() as u32)?;
    for &v in values {
        write_word(w, v)?;
    }
    Ok(())
}

/// ISO-8859-1 (Latin-1) conversion. Every byte value maps to the Unicode
/// scalar of the same codepoint, so the conversion is total and lossless
/// in both directions (Latin-1 is a subset of Unicode by definition).
pub mod latin1 {
    /// Decodes a Latin-1 byte string into a Rust `String`.
    pub fn decode(bytes: &[u8]) -> String {
        bytes.iter().map(|&b| b as char).collect()
    }

    /// Encodes a `str` as Latin-1 bytes.
    ///
    /// Characters outside the Latin-1 range (`0x00..=0xFF`) are replaced
    /// with `?`; SANE strings (device/option names, resource names,
    /// credentials) are not expected to contain them in practice.
    pub fn encode(s: &str) -> Vec<u8> {
        s.chars()
            .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
            .collect()
    }
}
