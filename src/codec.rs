use thiserror::Error;

use crate::bins::BIN_COUNT;
use crate::stats::Stats;

/// Widest value the wire format carries.
const MAX_VALUE_BYTES: usize = std::mem::size_of::<u64>();

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to parse stream at position {position} unexpected end of stream")]
    UnexpectedEnd { position: usize },
    #[error(
        "Failed to parse stream at position {position} expected length less than {} but got {length}",
        MAX_VALUE_BYTES
    )]
    LengthTooLarge { position: usize, length: usize },
    #[error(
        "Failed to parse stream at position {position} needed {needed} bytes on stream, but have {have}"
    )]
    NotEnoughBytes {
        position: usize,
        needed: usize,
        have: usize,
    },
    #[error(
        "Failed to parse stream at {position} the location {location} was out of bounds [{lower}, {upper})"
    )]
    LocationOutOfBounds {
        position: usize,
        location: usize,
        lower: usize,
        upper: usize,
    },
}

/// Serialize stats into the sparse wire format.
///
/// Each bin with a non-zero count becomes one entry: the bin index as a
/// single byte, then the count and the total as variable-length integers.
/// Zero-count bins are skipped entirely, so an idle histogram is zero bytes.
pub fn encode(stats: &Stats) -> Vec<u8> {
    let counts = stats.counts();
    let totals = stats.totals();
    let mut out = Vec::new();
    for bin in 0..BIN_COUNT {
        if counts[bin] == 0 {
            continue;
        }
        out.push(bin as u8);
        encode_value(&mut out, counts[bin]);
        encode_value(&mut out, totals[bin]);
    }
    out
}

/// Parse a byte stream produced by [`encode`] back into full-width stats.
///
/// Bin indices absent from the stream come back as zero, so the result
/// always covers the whole bin table. Corrupt input fails loudly; a bad
/// snapshot means a protocol bug upstream, not something to paper over.
pub fn decode(bytes: &[u8]) -> Result<Stats, CodecError> {
    let mut counts: Vec<u64> = Vec::with_capacity(BIN_COUNT);
    let mut totals: Vec<u64> = Vec::with_capacity(BIN_COUNT);
    let mut pos = 0;
    while pos < bytes.len() {
        let location = usize::from(bytes[pos]);
        // Entries must arrive in strictly increasing bin order; anything at
        // or below the bins already materialized is corrupt.
        if location < counts.len() || location >= BIN_COUNT {
            return Err(CodecError::LocationOutOfBounds {
                position: pos,
                location,
                lower: counts.len(),
                upper: BIN_COUNT,
            });
        }
        counts.resize(location, 0);
        totals.resize(location, 0);
        let (count, next) = decode_value(bytes, pos + 1)?;
        let (total, next) = decode_value(bytes, next)?;
        counts.push(count);
        totals.push(total);
        pos = next;
    }
    counts.resize(BIN_COUNT, 0);
    totals.resize(BIN_COUNT, 0);
    Ok(Stats::from_filled(counts, totals))
}

/// One length byte (how many little-endian bytes follow, minimum one), then
/// the magnitude bytes.
fn encode_value(out: &mut Vec<u8>, value: u64) {
    let length_spot = out.len();
    out.push(0);
    let mut rest = value;
    loop {
        out.push((rest & 0xff) as u8);
        rest >>= 8;
        if rest == 0 {
            break;
        }
    }
    out[length_spot] = (out.len() - length_spot - 1) as u8;
}

fn decode_value(bytes: &[u8], position: usize) -> Result<(u64, usize), CodecError> {
    if position >= bytes.len() {
        return Err(CodecError::UnexpectedEnd { position });
    }
    let length = usize::from(bytes[position]);
    if length > MAX_VALUE_BYTES {
        return Err(CodecError::LengthTooLarge { position, length });
    }
    let mut pos = position + 1;
    if pos + length > bytes.len() {
        return Err(CodecError::NotEnoughBytes {
            position,
            needed: length,
            have: bytes.len(),
        });
    }
    let mut value = 0u64;
    let mut shift = 0;
    for _ in 0..length {
        value |= u64::from(bytes[pos]) << shift;
        shift += 8;
        pos += 1;
    }
    Ok((value, pos))
}
