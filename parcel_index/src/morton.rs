// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 3D Morton (Z-order) codes with up to 21 bits per axis.
//!
//! Dropping the low `3 * k` bits of a code gives the code of the enclosing cell `k`
//! levels up, which is how refined ids map back to their coarse parent.

// Spread the low 21 bits of `v` so there are two zero bits between each.
#[inline]
fn spread(v: u32) -> u64 {
    let mut x = u64::from(v) & 0x1f_ffff;
    x = (x | x << 32) & 0x001f_0000_0000_ffff;
    x = (x | x << 16) & 0x001f_0000_ff00_00ff;
    x = (x | x << 8) & 0x100f_00f0_0f00_f00f;
    x = (x | x << 4) & 0x10c3_0c30_c30c_30c3;
    x = (x | x << 2) & 0x1249_2492_4924_9249;
    x
}

#[inline]
fn compact(v: u64) -> u32 {
    let mut x = v & 0x1249_2492_4924_9249;
    x = (x | x >> 2) & 0x10c3_0c30_c30c_30c3;
    x = (x | x >> 4) & 0x100f_00f0_0f00_f00f;
    x = (x | x >> 8) & 0x001f_0000_ff00_00ff;
    x = (x | x >> 16) & 0x001f_0000_0000_ffff;
    x = (x | x >> 32) & 0x1f_ffff;
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Masked to 21 bits above."
    )]
    let out = x as u32;
    out
}

/// Interleave three cell coordinates into a Morton code.
#[inline]
pub fn encode(x: u32, y: u32, z: u32) -> u64 {
    spread(x) | spread(y) << 1 | spread(z) << 2
}

/// Split a Morton code back into `[x, y, z]`.
#[inline]
pub fn decode(code: u64) -> [u32; 3] {
    [compact(code), compact(code >> 1), compact(code >> 2)]
}
