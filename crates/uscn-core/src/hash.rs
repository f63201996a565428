//! Deterministic 32-bit mixer used for pattern fingerprints and audit checksums.
//!
//! This is intentionally not a cryptographic hash: spec §4.5 only requires
//! stability (equal inputs → equal outputs, across platforms) and avalanche
//! (a one-byte change flips bits with overwhelming probability). FNV-1a
//! satisfies both and needs no dependency; upgrading to a cryptographic
//! digest later is a local change confined to this module and `HASH_SIZE`.

/// Width of the on-buffer pattern hash field (spec §3, §6): 4 meaningful
/// bytes, zero-padded to 32.
pub const HASH_SIZE: usize = 32;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Compute the 32-bit FNV-1a fingerprint of `bytes`.
#[must_use]
pub fn fingerprint32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Encode a 32-bit fingerprint into the 32-byte on-buffer `pattern_hash`
/// layout: first 4 bytes little-endian, remaining 28 bytes zero (spec §6).
#[must_use]
pub fn encode_pattern_hash(fingerprint: u32) -> [u8; HASH_SIZE] {
    let mut out = [0u8; HASH_SIZE];
    out[..4].copy_from_slice(&fingerprint.to_le_bytes());
    out
}

/// Render a fingerprint as the 8 lowercase hex digits used by the audit log
/// `CHECKSUM=<8-hex>` field (spec §6).
#[must_use]
pub fn fingerprint_hex(fingerprint: u32) -> String {
    format!("{fingerprint:08x}")
}

/// Hex-encode the meaningful bytes of a `pattern_hash`, for the audit log's
/// `HASH_REF` field (spec §4.6) or `"NULL_HASH"` if none was produced.
#[must_use]
pub fn pattern_hash_hex(pattern_hash: Option<[u8; HASH_SIZE]>) -> String {
    match pattern_hash {
        Some(bytes) => {
            let fingerprint = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            fingerprint_hex(fingerprint)
        }
        None => "NULL_HASH".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_equal_outputs() {
        assert_eq!(fingerprint32(b"hello"), fingerprint32(b"hello"));
    }

    #[test]
    fn one_byte_change_flips_the_hash() {
        assert_ne!(fingerprint32(b"hello"), fingerprint32(b"hellp"));
    }

    #[test]
    fn empty_input_is_the_offset_basis() {
        assert_eq!(fingerprint32(b""), FNV_OFFSET_BASIS);
    }

    #[test]
    fn pattern_hash_layout_is_little_endian_zero_padded() {
        let fp = 0x1234_5678u32;
        let encoded = encode_pattern_hash(fp);
        assert_eq!(&encoded[..4], &[0x78, 0x56, 0x34, 0x12]);
        assert!(encoded[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn null_hash_sentinel() {
        assert_eq!(pattern_hash_hex(None), "NULL_HASH");
    }

    #[test]
    fn pattern_hash_hex_roundtrips_fingerprint() {
        let fp = 0xdead_beefu32;
        let encoded = encode_pattern_hash(fp);
        assert_eq!(pattern_hash_hex(Some(encoded)), fingerprint_hex(fp));
    }
}
