//! Byte-offset delta compression.
//!
//! Each element after the first is stored as a signed delta from its
//! predecessor using the narrowest of three little-endian widths. The minimum
//! value of a width is reserved as the sentinel that escalates to the next:
//!
//! ```text
//! -127..=127            -> i8
//! else                  -> 0x80, i16
//! beyond i16            -> 0x80, 0x00 0x80, i32
//! ```
//!
//! The first element is a single absolute `i8`, matching the layout written
//! by Pilatus detectors and read by fabio.

use std::io::{self, Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FormatError, FormatResult};

/// Decodes `count` elements from a byte-offset stream.
pub fn decode_byte_offset(payload: &[u8], count: usize) -> FormatResult<Vec<i32>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if payload.is_empty() {
        return Err(FormatError::EmptyStream);
    }

    let mut cursor = Cursor::new(payload);
    // Every element takes at least one byte, so the payload bounds what a
    // header can make us reserve.
    let mut pixels = Vec::with_capacity(count.min(payload.len()));

    let first = cursor
        .read_i8()
        .map_err(|_| FormatError::TruncatedStream {
            index: 0,
            expected: count,
        })?;
    let mut current = i32::from(first);
    pixels.push(current);

    for index in 1..count {
        let delta = read_delta(&mut cursor).map_err(|_| FormatError::TruncatedStream {
            index,
            expected: count,
        })?;
        current = current.wrapping_add(delta);
        pixels.push(current);
    }

    Ok(pixels)
}

/// Reads one delta, following the 8 -> 16 -> 32 bit escalation.
fn read_delta(cursor: &mut Cursor<&[u8]>) -> io::Result<i32> {
    let d8 = cursor.read_i8()?;
    if d8 != i8::MIN {
        return Ok(i32::from(d8));
    }

    let d16 = cursor.read_i16::<LittleEndian>()?;
    if d16 != i16::MIN {
        return Ok(i32::from(d16));
    }

    cursor.read_i32::<LittleEndian>()
}

/// Encodes elements into a byte-offset stream.
///
/// Fails with [`FormatError::Unencodable`] if the first element does not fit
/// in a signed byte.
pub fn encode_byte_offset(pixels: &[i32]) -> FormatResult<Vec<u8>> {
    let mut out = Vec::with_capacity(pixels.len());
    write_byte_offset(&mut out, pixels)?;
    Ok(out)
}

/// Writes a byte-offset stream to `writer`.
pub fn write_byte_offset<W: Write>(writer: &mut W, pixels: &[i32]) -> FormatResult<()> {
    let Some((&first, rest)) = pixels.split_first() else {
        return Ok(());
    };

    let first_byte = i8::try_from(first).map_err(|_| FormatError::Unencodable { value: first })?;
    writer.write_i8(first_byte)?;

    let mut previous = first;
    for &value in rest {
        write_delta(writer, value.wrapping_sub(previous))?;
        previous = value;
    }

    Ok(())
}

fn write_delta<W: Write>(writer: &mut W, delta: i32) -> io::Result<()> {
    if delta > i32::from(i8::MIN) && delta <= i32::from(i8::MAX) {
        return writer.write_i8(delta as i8);
    }
    writer.write_i8(i8::MIN)?;

    if delta > i32::from(i16::MIN) && delta <= i32::from(i16::MAX) {
        return writer.write_i16::<LittleEndian>(delta as i16);
    }
    writer.write_i16::<LittleEndian>(i16::MIN)?;

    writer.write_i32::<LittleEndian>(delta)
}
