//! Little-endian field packing and the half-precision float conversion used by
//! the efficient measurement frames.
//!
//! The half-float routines reproduce the firmware's branchless bit arithmetic
//! exactly. They truncate rather than round, so a generic `f16` conversion
//! would disagree with the device on the last mantissa bit.

/// Encode a `u32` as 4 little-endian bytes.
#[inline]
pub const fn u32_to_le(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Decode 4 little-endian bytes into a `u32`.
#[inline]
pub const fn le_to_u32(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Encode a `u16` as 2 little-endian bytes.
#[inline]
pub const fn u16_to_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// Decode 2 little-endian bytes into a `u16`.
#[inline]
pub const fn le_to_u16(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// Encode an `f32` by reinterpreting its bits as a little-endian `u32`.
///
/// NaN payloads and signed zeros are preserved.
#[inline]
pub const fn f32_to_le(value: f32) -> [u8; 4] {
    u32_to_le(value.to_bits())
}

/// Decode 4 little-endian bytes into an `f32` by bit reinterpretation.
#[inline]
pub const fn le_to_f32(bytes: [u8; 4]) -> f32 {
    f32::from_bits(le_to_u32(bytes))
}

const SHIFT: u32 = 13;
const SHIFT_SIGN: u32 = 16;

/// f32 infinity.
const INF_N: i32 = 0x7F80_0000;
/// Largest finite f16 as an f32.
const MAX_N: i32 = 0x477F_E000;
/// Smallest normal f16 as an f32.
const MIN_N: i32 = 0x3880_0000;
/// f32 sign bit.
const SIGN_N: u32 = 0x8000_0000;

const INF_C: i32 = INF_N >> SHIFT;
/// Smallest f16 NaN as an f32.
const NAN_N: i32 = (INF_C + 1) << SHIFT;
const MAX_C: i32 = MAX_N >> SHIFT;
const MIN_C: i32 = MIN_N >> SHIFT;
/// f16 sign bit.
const SIGN_C: i32 = 0x8000;

/// `(1 << 23) / MIN_N`, i.e. 2^37.
const MUL_N: u32 = 0x5200_0000;
/// `MIN_N / (1 << (23 - SHIFT))`, i.e. 2^-24.
const MUL_C: u32 = 0x3380_0000;

/// Largest f32 subnormal, down-shifted.
const SUB_C: i32 = 0x003FF;
/// Smallest f32 normal, down-shifted.
const NOR_C: i32 = 0x00400;

const MAX_D: i32 = INF_C - MAX_C - 1;
const MIN_D: i32 = MIN_C - SUB_C - 1;

/// All ones when `cond` holds, all zeros otherwise.
#[inline]
const fn mask(cond: bool) -> i32 {
    -(cond as i32)
}

/// Pack an `f32` into the device's half-precision bit pattern.
///
/// Values below the smallest normal half are renormalized into half
/// subnormals (truncating), finite values above the largest half saturate to
/// infinity, and NaNs collapse onto the smallest half NaN unless they already
/// carry a payload that survives the 13-bit shift (a quiet NaN becomes
/// `0x7E00`).
pub fn f32_to_f16(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = bits & SIGN_N;
    let mut v = (bits ^ sign) as i32;
    let sign = sign >> SHIFT_SIGN;

    // Float-to-int truncation; out-of-range products are masked away below.
    let subnormal = (f32::from_bits(MUL_N) * f32::from_bits(v as u32)) as i32;
    v ^= (subnormal ^ v) & mask(MIN_N > v);
    v ^= (INF_N ^ v) & mask(INF_N > v && v > MAX_N);
    v ^= (NAN_N ^ v) & mask(NAN_N > v && v > INF_N);

    v = ((v as u32) >> SHIFT) as i32;
    v ^= (v.wrapping_sub(MAX_D) ^ v) & mask(v > MAX_C);
    v ^= (v.wrapping_sub(MIN_D) ^ v) & mask(v > SUB_C);

    ((v as u32) | sign) as u16
}

/// Expand the device's half-precision bit pattern into an `f32`.
///
/// This is the exact inverse of [`f32_to_f16`] over all 65 536 half patterns:
/// `f32_to_f16(f16_to_f32(h)) == h` for every `h`, NaN payloads included.
pub fn f16_to_f32(value: u16) -> f32 {
    let mut v = i32::from(value);
    let sign = v & SIGN_C;
    v ^= sign;
    let sign = (sign as u32) << SHIFT_SIGN;

    v ^= (v.wrapping_add(MIN_D) ^ v) & mask(v > SUB_C);
    v ^= (v.wrapping_add(MAX_D) ^ v) & mask(v > MAX_C);

    let subnormal = f32::from_bits(MUL_C) * (v as f32);
    let below_normal = mask(NOR_C > v);
    v <<= SHIFT;
    v ^= ((subnormal.to_bits() as i32) ^ v) & below_normal;

    f32::from_bits((v as u32) | sign)
}
