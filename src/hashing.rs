//! Hashing primitives used by the hash index.
//!
//! Ported from `hmap_uint16_hash`/`hmap_uint32_hash`/`hmap_uint64_hash` in
//! `hmap.c`: a 32-bit MurmurHash3-style finalizer applied to each integer
//! width, plus a full byte-range MurmurHash3 x86_32 for the match key.

/// 32-bit hash over an arbitrary byte range (MurmurHash3 x86_32).
///
/// Used for keys whose byte layout, not a scalar value, is the hashable
/// identity (the match key). Integer keys use [`IndexKey::index_hash`]
/// instead, which applies just the finalizer to the raw value.
pub fn murmur3_32(bytes: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut hash = seed;
    let chunks = bytes.chunks_exact(4);
    let remainder = chunks.remainder();

    for chunk in chunks {
        let mut k = u32::from_le_bytes(chunk.try_into().unwrap());
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);

        hash ^= k;
        hash = hash.rotate_left(13);
        hash = hash.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    if !remainder.is_empty() {
        let mut k = 0u32;
        for (i, &b) in remainder.iter().enumerate() {
            k |= (b as u32) << (8 * i);
        }
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        hash ^= k;
    }

    hash ^= bytes.len() as u32;
    finalize32(hash)
}

/// The MurmurHash3 x86_32 finalizer (avalanche), applied directly to scalar
/// integer keys by [`IndexKey`] impls, exactly as `hmap_uint16_hash` /
/// `hmap_uint32_hash` do in the source this design is distilled from.
#[inline(always)]
pub fn finalize32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// The MurmurHash3 x86_64 finalizer, applied to 64-bit scalar keys, exactly
/// as `hmap_uint64_hash` does.
#[inline(always)]
pub fn finalize64_to_32(mut h: u64) -> u32 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn murmur3_is_deterministic() {
        let a = murmur3_32(b"hello world", 0);
        let b = murmur3_32(b"hello world", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn murmur3_differs_on_seed() {
        let a = murmur3_32(b"hello world", 0);
        let b = murmur3_32(b"hello world", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn finalize32_is_not_identity() {
        assert_ne!(finalize32(1), 1);
    }
}
