//! LEB128 variable-length integer encoding and zigzag remapping.

use crate::error::DecodeError;

/// Integers that encode as base-128 varints.
pub trait Varint: Copy {
    /// Maximum number of bytes an encoded value of this width can occupy.
    const MAX_VARINT_BYTES: usize;

    /// Encode `self` into the front of `buf`, returning the number of bytes
    /// written. `buf` must hold at least [`Varint::encoded_varint_len`] bytes.
    fn encode_varint(self, buf: &mut [u8]) -> usize;

    /// Decode a varint from the front of `data`, returning the value and the
    /// number of bytes consumed.
    fn decode_varint(data: &[u8]) -> Result<(Self, usize), DecodeError>;

    /// The number of bytes required to encode this value.
    fn encoded_varint_len(self) -> usize;
}

impl Varint for u64 {
    const MAX_VARINT_BYTES: usize = 10;

    #[inline]
    fn encode_varint(mut self, buf: &mut [u8]) -> usize {
        let mut i = 0;
        loop {
            let byte = (self & 0x7f) as u8;
            self >>= 7;
            if self == 0 {
                buf[i] = byte;
                return i + 1;
            }
            buf[i] = byte | 0x80;
            i += 1;
        }
    }

    #[inline]
    fn decode_varint(data: &[u8]) -> Result<(Self, usize), DecodeError> {
        let mut value = 0u64;
        for (i, &byte) in data.iter().take(Self::MAX_VARINT_BYTES).enumerate() {
            if byte < 0x80 {
                // The 10th byte carries bits 63.. and may only contribute a
                // single bit; anything larger overflows u64.
                if i == 9 && byte > 0x01 {
                    return Err(DecodeError::InvalidVarint);
                }
                value |= u64::from(byte) << (7 * i);
                return Ok((value, i + 1));
            }
            value |= u64::from(byte & 0x7f) << (7 * i);
        }
        if data.len() < Self::MAX_VARINT_BYTES {
            Err(DecodeError::Truncated { needed: 1 })
        } else {
            // Read 10 groups and the 10th still had its continuation bit set.
            Err(DecodeError::InvalidVarint)
        }
    }

    /// O(1) length via leading_zeros: a varint stores 7 bits per byte, so the
    /// byte count is `ceil(significant_bits / 7)` with a minimum of 1. The
    /// table lookup avoids the division.
    #[inline]
    fn encoded_varint_len(self) -> usize {
        // Index = leading_zeros (0..=64); index 64 (value 0) maps to 1 byte.
        #[rustfmt::skip]
        const LZ_TO_LEN: [u8; 65] = [
            10,
            9, 9, 9, 9, 9, 9, 9,
            8, 8, 8, 8, 8, 8, 8,
            7, 7, 7, 7, 7, 7, 7,
            6, 6, 6, 6, 6, 6, 6,
            5, 5, 5, 5, 5, 5, 5,
            4, 4, 4, 4, 4, 4, 4,
            3, 3, 3, 3, 3, 3, 3,
            2, 2, 2, 2, 2, 2, 2,
            1, 1, 1, 1, 1, 1, 1, 1,
        ];
        usize::from(LZ_TO_LEN[self.leading_zeros() as usize])
    }
}

impl Varint for u32 {
    const MAX_VARINT_BYTES: usize = 5;

    #[inline]
    fn encode_varint(mut self, buf: &mut [u8]) -> usize {
        let mut i = 0;
        loop {
            let byte = (self & 0x7f) as u8;
            self >>= 7;
            if self == 0 {
                buf[i] = byte;
                return i + 1;
            }
            buf[i] = byte | 0x80;
            i += 1;
        }
    }

    #[inline]
    fn decode_varint(data: &[u8]) -> Result<(Self, usize), DecodeError> {
        let mut value = 0u32;
        for (i, &byte) in data.iter().take(Self::MAX_VARINT_BYTES).enumerate() {
            if byte < 0x80 {
                // Bits 28..31 live in the 5th byte; only 4 bits fit.
                if i == 4 && byte > 0x0f {
                    return Err(DecodeError::InvalidVarint);
                }
                value |= u32::from(byte) << (7 * i);
                return Ok((value, i + 1));
            }
            value |= u32::from(byte & 0x7f) << (7 * i);
        }
        if data.len() < Self::MAX_VARINT_BYTES {
            Err(DecodeError::Truncated { needed: 1 })
        } else {
            Err(DecodeError::InvalidVarint)
        }
    }

    #[inline]
    fn encoded_varint_len(self) -> usize {
        #[rustfmt::skip]
        const LZ_TO_LEN: [u8; 33] = [
            5, 5, 5, 5,
            4, 4, 4, 4, 4, 4, 4,
            3, 3, 3, 3, 3, 3, 3,
            2, 2, 2, 2, 2, 2, 2,
            1, 1, 1, 1, 1, 1, 1, 1,
        ];
        usize::from(LZ_TO_LEN[self.leading_zeros() as usize])
    }
}

/// Maps signed 32-bit integers onto unsigned ones so that small-magnitude
/// negatives still encode as short varints.
#[inline]
pub const fn zigzag_encode_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub const fn zigzag_decode_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

#[inline]
pub const fn zigzag_encode_64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub const fn zigzag_decode_64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn smoketest_varint_u64() {
        #[track_caller]
        fn test_case(val: u64, len: usize) {
            let mut buf = [0u8; 16];
            let encode_len = val.encode_varint(&mut buf);
            let (rnd, rnd_len) = u64::decode_varint(&buf).unwrap();

            assert_eq!(rnd, val, "invalid value");
            assert_eq!(len, rnd_len, "invalid length");
            assert_eq!(len, encode_len, "invalid encode length");
            assert_eq!(len, val.encoded_varint_len(), "invalid computed length");
        }

        test_case(0, 1);
        test_case(1, 1);
        test_case(127, 1);
        test_case(128, 2);
        test_case(300, 2);
        test_case(u64::from(u32::MAX), 5);
        // First value that needs the 9th byte.
        test_case(72_057_594_037_927_937, 9);
        test_case(u64::MAX, 10);
    }

    #[test]
    fn smoketest_varint_u32() {
        #[track_caller]
        fn test_case(val: u32, len: usize) {
            let mut buf = [0u8; 8];
            let encode_len = val.encode_varint(&mut buf);
            let (rnd, rnd_len) = u32::decode_varint(&buf).unwrap();

            assert_eq!(rnd, val);
            assert_eq!(len, rnd_len);
            assert_eq!(len, encode_len);
            assert_eq!(len, val.encoded_varint_len());
        }

        test_case(0, 1);
        test_case(42, 1);
        test_case(128, 2);
        test_case(u32::MAX, 5);
    }

    #[test]
    fn test_overlong_varint_rejected() {
        // 10 continuation bytes with no terminator.
        let data = [0x80u8; 10];
        assert_eq!(u64::decode_varint(&data), Err(crate::error::DecodeError::InvalidVarint));

        // 10th byte terminates but carries more than one bit.
        let mut data = [0x80u8; 10];
        data[9] = 0x02;
        assert_eq!(u64::decode_varint(&data), Err(crate::error::DecodeError::InvalidVarint));

        // 10th byte of exactly 0x01 is the largest valid encoding.
        data[9] = 0x01;
        let (val, len) = u64::decode_varint(&data).unwrap();
        assert_eq!(len, 10);
        assert_eq!(val, 0x8080_8080_8080_8080u64 | (1 << 63));
    }

    #[test]
    fn test_truncated_varint() {
        let data = [0x80u8, 0x80];
        assert!(matches!(
            u64::decode_varint(&data),
            Err(crate::error::DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_zigzag_reference_values() {
        assert_eq!(zigzag_encode_32(0), 0);
        assert_eq!(zigzag_encode_32(-1), 1);
        assert_eq!(zigzag_encode_32(1), 2);
        assert_eq!(zigzag_encode_32(-2), 3);
        assert_eq!(zigzag_encode_32(i32::MAX), 4_294_967_294);
        assert_eq!(zigzag_encode_32(i32::MIN), 4_294_967_295);
        assert_eq!(zigzag_encode_64(i64::MIN), u64::MAX);
    }

    proptest! {
        #[test]
        fn proptest_varint_u64_roundtrip(val: u64) {
            let mut buf = [0u8; 16];
            let len = val.encode_varint(&mut buf);
            let (rnd, rnd_len) = u64::decode_varint(&buf).unwrap();
            prop_assert_eq!(rnd, val);
            prop_assert_eq!(rnd_len, len);
            prop_assert_eq!(val.encoded_varint_len(), len);
        }

        #[test]
        fn proptest_varint_u32_roundtrip(val: u32) {
            let mut buf = [0u8; 8];
            let len = val.encode_varint(&mut buf);
            let (rnd, rnd_len) = u32::decode_varint(&buf).unwrap();
            prop_assert_eq!(rnd, val);
            prop_assert_eq!(rnd_len, len);
            prop_assert_eq!(val.encoded_varint_len(), len);
        }

        #[test]
        fn proptest_zigzag_roundtrip(val: i64) {
            prop_assert_eq!(zigzag_decode_64(zigzag_encode_64(val)), val);
            let val32 = val as i32;
            prop_assert_eq!(zigzag_decode_32(zigzag_encode_32(val32)), val32);
        }
    }
}
