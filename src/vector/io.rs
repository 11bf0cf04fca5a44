//! On-disk format for the flat vector index.
//!
//! ```text
//! magic      4 bytes  "PSVI"
//! version    u32 LE
//! dimension  u32 LE
//! count      u64 LE
//! values     count * dimension f32 LE, row-major
//! checksum   u32 LE   CRC32 of every preceding byte
//! ```

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{ProfileSearchError, Result};

const MAGIC: &[u8; 4] = b"PSVI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;
const CHECKSUM_LEN: usize = 4;

/// Serialize a row-major vector buffer of the given dimension.
pub fn encode_index(dimension: usize, data: &[f32]) -> Result<Vec<u8>> {
    if dimension == 0 || data.len() % dimension != 0 {
        return Err(ProfileSearchError::index(format!(
            "buffer of {} values is not a whole number of {dimension}-dimensional rows",
            data.len()
        )));
    }
    let dimension_u32 = u32::try_from(dimension)
        .map_err(|_| ProfileSearchError::index(format!("dimension {dimension} too large")))?;
    let count = (data.len() / dimension) as u64;

    let mut buf = Vec::with_capacity(HEADER_LEN + data.len() * 4 + CHECKSUM_LEN);
    buf.extend_from_slice(MAGIC);
    buf.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    buf.write_u32::<LittleEndian>(dimension_u32)?;
    buf.write_u64::<LittleEndian>(count)?;
    for value in data {
        buf.write_f32::<LittleEndian>(*value)?;
    }

    let checksum = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(checksum)?;
    Ok(buf)
}

/// Parse bytes produced by [`encode_index`] into `(dimension, values)`.
pub fn decode_index(bytes: &[u8]) -> Result<(usize, Vec<f32>)> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(ProfileSearchError::index("index file is truncated"));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    let stored_checksum = Cursor::new(trailer).read_u32::<LittleEndian>()?;
    if crc32fast::hash(body) != stored_checksum {
        return Err(ProfileSearchError::index("index file checksum mismatch"));
    }

    let mut input = Cursor::new(body);
    let mut magic = [0u8; 4];
    input.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ProfileSearchError::index("not a vector index file"));
    }

    let version = input.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(ProfileSearchError::index(format!(
            "unsupported index format version {version}"
        )));
    }

    let dimension = input.read_u32::<LittleEndian>()? as usize;
    let count = input.read_u64::<LittleEndian>()?;
    if dimension == 0 {
        return Err(ProfileSearchError::index("index file has zero dimension"));
    }

    let expected_values = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(dimension))
        .ok_or_else(|| ProfileSearchError::index("index file row count overflows"))?;
    if body.len() - HEADER_LEN != expected_values * 4 {
        return Err(ProfileSearchError::index(format!(
            "index file declares {count} rows of dimension {dimension} but holds {} bytes of data",
            body.len() - HEADER_LEN
        )));
    }

    let mut values = vec![0.0f32; expected_values];
    input.read_f32_into::<LittleEndian>(&mut values)?;
    Ok((dimension, values))
}
