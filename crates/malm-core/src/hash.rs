//! Default 64-bit single-lane mixing hash.
//!
//! One accumulator, 8-byte big-endian lanes, a per-byte tail, and a
//! three-round avalanche finish. Not cryptographic; meant for hash
//! tables where a single fast lane is enough.

const P1: u64 = 0x9e37_79b1_85eb_ca87;
const P2: u64 = 0xc2b2_ae3d_27d4_eb4f;
const P3: u64 = 0x1656_67b1_9e37_79f9;
const P4: u64 = 0x85eb_ca77_c2b2_ae63;
const P5: u64 = 0x27d4_eb2f_1656_67c5;

/// Hash a byte slice into a 64-bit value.
pub fn hash64(data: &[u8]) -> u64 {
    let mut acc = P5.wrapping_add(data.len() as u64).wrapping_add(1);

    let mut lanes = data.chunks_exact(8);
    for lane in &mut lanes {
        let lane = u64::from_be_bytes(lane.try_into().expect("chunks_exact yields 8-byte lanes"));
        acc ^= lane;
        acc = acc.rotate_left(27).wrapping_mul(P1);
        acc = acc.wrapping_add(P4);
    }
    for &byte in lanes.remainder() {
        acc ^= u64::from(byte).wrapping_mul(P5);
        acc = acc.rotate_left(11).wrapping_mul(P1);
    }

    acc ^= acc >> 33;
    acc = acc.wrapping_mul(P2);
    acc ^= acc >> 29;
    acc = acc.wrapping_mul(P3);
    acc ^= acc >> 32;
    acc
}
