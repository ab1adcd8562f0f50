//! Typed field handles.
//!
//! A [`Field<T>`] names a byte offset inside an 18-byte frame and carries the
//! wire type of the value stored there. Reading and writing go through
//! [`crate::Request::set`], [`crate::Request::get`] and
//! [`crate::Response::get`], which bounds-check the handle against the frame.

use crate::catalog::FieldSpec;
use crate::codec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Wire representation of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    F32,
    /// Device half-precision float, see [`codec::f32_to_f16`].
    F16,
    /// Fixed-length byte string, NUL-padded.
    Bytes(usize),
}

impl FieldKind {
    /// Width in bytes.
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 | FieldKind::F16 => 2,
            FieldKind::U32 | FieldKind::F32 => 4,
            FieldKind::Bytes(len) => len,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::U8 => f.write_str("u8"),
            FieldKind::U16 => f.write_str("u16"),
            FieldKind::U32 => f.write_str("u32"),
            FieldKind::F32 => f.write_str("f32"),
            FieldKind::F16 => f.write_str("f16"),
            FieldKind::Bytes(len) => write!(f, "bytes[{len}]"),
        }
    }
}

/// A value that can be stored in a frame field.
///
/// `decode` receives exactly `KIND.width()` bytes and `encode` writes into a
/// slice of that length.
pub trait FieldValue: Sized {
    const KIND: FieldKind;

    fn decode(bytes: &[u8]) -> Option<Self>;

    fn encode(&self, out: &mut [u8]);
}

impl FieldValue for u8 {
    const KIND: FieldKind = FieldKind::U8;

    fn decode(bytes: &[u8]) -> Option<Self> {
        bytes.first().copied()
    }

    fn encode(&self, out: &mut [u8]) {
        if let Some(slot) = out.first_mut() {
            *slot = *self;
        }
    }
}

impl FieldValue for u16 {
    const KIND: FieldKind = FieldKind::U16;

    fn decode(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 2] = bytes.try_into().ok()?;
        Some(codec::le_to_u16(raw))
    }

    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(&codec::u16_to_le(*self));
    }
}

impl FieldValue for u32 {
    const KIND: FieldKind = FieldKind::U32;

    fn decode(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 4] = bytes.try_into().ok()?;
        Some(codec::le_to_u32(raw))
    }

    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(&codec::u32_to_le(*self));
    }
}

impl FieldValue for f32 {
    const KIND: FieldKind = FieldKind::F32;

    fn decode(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 4] = bytes.try_into().ok()?;
        Some(codec::le_to_f32(raw))
    }

    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(&codec::f32_to_le(*self));
    }
}

/// Raw half-precision bits as stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Half(pub u16);

impl Half {
    pub fn from_f32(value: f32) -> Self {
        Self(codec::f32_to_f16(value))
    }

    pub fn to_f32(self) -> f32 {
        codec::f16_to_f32(self.0)
    }

    pub const fn to_bits(self) -> u16 {
        self.0
    }
}

impl FieldValue for Half {
    const KIND: FieldKind = FieldKind::F16;

    fn decode(bytes: &[u8]) -> Option<Self> {
        u16::decode(bytes).map(Half)
    }

    fn encode(&self, out: &mut [u8]) {
        self.0.encode(out);
    }
}

impl<const N: usize> FieldValue for [u8; N] {
    const KIND: FieldKind = FieldKind::Bytes(N);

    fn decode(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok()
    }

    fn encode(&self, out: &mut [u8]) {
        out.copy_from_slice(self);
    }
}

/// Offset of a typed value inside a frame.
pub struct Field<T> {
    offset: usize,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T>
where
    T: FieldValue,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("offset", &self.offset)
            .field("kind", &T::KIND)
            .finish()
    }
}

impl<T: FieldValue> Field<T> {
    pub const fn at(offset: usize) -> Self {
        Self {
            offset,
            _kind: PhantomData,
        }
    }

    pub const fn offset(self) -> usize {
        self.offset
    }

    pub const fn width(self) -> usize {
        T::KIND.width()
    }

    pub const fn kind(self) -> FieldKind {
        T::KIND
    }

    /// Describe the field for the catalog.
    pub const fn spec(self, name: &'static str) -> FieldSpec {
        FieldSpec {
            name,
            offset: self.offset,
            kind: T::KIND,
        }
    }

    /// Byte range covered by the field, if it fits in `len` bytes.
    pub(crate) fn range(self, len: usize) -> Option<std::ops::Range<usize>> {
        let end = self.offset.checked_add(T::KIND.width())?;
        (end <= len).then_some(self.offset..end)
    }
}
