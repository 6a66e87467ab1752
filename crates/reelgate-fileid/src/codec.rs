//! Transport encoding for stored-file references.
//!
//! A reference travels as URL-safe base64 without padding. The decoded bytes
//! are zero run-length encoded: every `0x00` byte is followed by a count of
//! how many zero bytes it stands for. Inside, fields are little-endian.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use bytes::{Buf, BufMut, BytesMut};

use crate::{Error, Result};

/// TL strings longer than this use the 4-byte length header.
const TL_SHORT_MAX: usize = 253;
const TL_LONG_MARKER: u8 = 254;

/// Decode the base64 transport layer and expand zero runs.
pub fn unpack(reference: &str) -> Result<Vec<u8>> {
    // Some clients keep the padding; the alphabet check is still strict.
    let trimmed = reference.trim_end_matches('=');
    let packed = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| Error::InvalidEncoding(e.to_string()))?;
    rle_decode(&packed)
}

/// Compress zero runs and apply the base64 transport layer.
pub fn pack(payload: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(rle_encode(payload))
}

pub fn rle_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut iter = data.iter();
    while let Some(&byte) = iter.next() {
        if byte == 0 {
            let count = *iter.next().ok_or(Error::InvalidRle)?;
            out.extend(std::iter::repeat(0u8).take(count as usize));
        } else {
            out.push(byte);
        }
    }
    Ok(out)
}

pub fn rle_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut zeros: u8 = 0;
    for &byte in data {
        if byte == 0 {
            if zeros == u8::MAX {
                out.extend_from_slice(&[0, zeros]);
                zeros = 0;
            }
            zeros += 1;
            continue;
        }
        if zeros > 0 {
            out.extend_from_slice(&[0, zeros]);
            zeros = 0;
        }
        out.push(byte);
    }
    if zeros > 0 {
        out.extend_from_slice(&[0, zeros]);
    }
    out
}

/// Bounds-checked little-endian field reader.
///
/// Every read names the field it is reading so a truncated payload reports
/// exactly where it ran out.
pub struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, field: &'static str, need: usize) -> Result<()> {
        if self.buf.remaining() < need {
            return Err(Error::truncated(field, need, self.buf.remaining()));
        }
        Ok(())
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i64(&mut self, field: &'static str) -> Result<i64> {
        self.ensure(field, 8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn read_bytes(&mut self, field: &'static str, len: usize) -> Result<Vec<u8>> {
        self.ensure(field, len)?;
        let out = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(out)
    }

    /// Read a TL-serialized byte string (length header, data, 4-byte padding).
    pub fn read_tl_bytes(&mut self, field: &'static str) -> Result<Vec<u8>> {
        self.ensure(field, 1)?;
        let first = self.buf.get_u8();
        let (len, header) = if first == TL_LONG_MARKER {
            let raw = self.read_bytes(field, 3)?;
            let len = u32::from_le_bytes([raw[0], raw[1], raw[2], 0]) as usize;
            (len, 4)
        } else if first as usize > TL_SHORT_MAX {
            return Err(Error::InvalidEncoding(format!(
                "{field}: invalid TL length byte {first}"
            )));
        } else {
            (first as usize, 1)
        };
        let data = self.read_bytes(field, len)?;
        let padding = (4 - (header + len) % 4) % 4;
        self.read_bytes(field, padding)?;
        Ok(data)
    }

    pub fn read_tl_string(&mut self, field: &'static str) -> Result<String> {
        let raw = self.read_tl_bytes(field)?;
        String::from_utf8(raw).map_err(|e| Error::InvalidEncoding(format!("{field}: {e}")))
    }
}

/// Little-endian field writer, the inverse of [`FieldReader`].
#[derive(Default)]
pub struct FieldWriter {
    buf: BytesMut,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_tl_bytes(&mut self, data: &[u8]) {
        let header = if data.len() <= TL_SHORT_MAX {
            self.buf.put_u8(data.len() as u8);
            1
        } else {
            self.buf.put_u8(TL_LONG_MARKER);
            let len = (data.len() as u32).to_le_bytes();
            self.buf.put_slice(&len[..3]);
            4
        };
        self.buf.put_slice(data);
        let padding = (4 - (header + data.len()) % 4) % 4;
        self.buf.put_bytes(0, padding);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}
