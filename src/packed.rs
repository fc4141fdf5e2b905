use crate::error::{MercuryError, Result};

/// Widest numeral that always fits in a `u64` (18 digits).
pub const MAX_PACKED_BYTES: usize = 9;

/// Decode a packed-decimal byte run, one digit per nibble, most significant
/// first: `[0x12, 0x34]` is 1234. An empty run decodes as zero.
pub fn decode_packed(bytes: &[u8]) -> Result<u64> {
    if bytes.len() > MAX_PACKED_BYTES {
        return Err(MercuryError::NumeralTooWide { len: bytes.len() });
    }

    bytes.iter().try_fold(0u64, |acc, &byte| {
        let (hi, lo) = (byte >> 4, byte & 0x0F);
        if hi > 9 || lo > 9 {
            return Err(MercuryError::MalformedNumeral { byte });
        }
        Ok(acc * 100 + u64::from(hi) * 10 + u64::from(lo))
    })
}

/// Encode `value` as exactly `width` packed-decimal bytes, zero-padded on the left.
///
/// Returns `None` if the value needs more than `2 * width` digits.
#[must_use]
pub fn encode_packed(mut value: u64, width: usize) -> Option<Vec<u8>> {
    let mut out = vec![0u8; width];
    for byte in out.iter_mut().rev() {
        let pair = (value % 100) as u8;
        *byte = ((pair / 10) << 4) | (pair % 10);
        value /= 100;
    }
    (value == 0).then_some(out)
}
