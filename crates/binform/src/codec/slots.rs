// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounds-checked slot buffer.
//!
//! Slots hold fixed-width field entries in host byte order. Reads past the
//! end fail with [`CodecError::SlotOutOfBounds`]; writes grow the buffer.

use super::{CodecError, Result};
use byteorder::{ByteOrder, NativeEndian};

/// Generate read/write accessors for a multi-byte primitive.
///
/// Each read checks bounds and decodes with `NativeEndian`; each write grows
/// the buffer as needed and returns the position just past the value.
macro_rules! impl_slot_rw {
    ($read:ident, $write:ident, $type:ty, $size:expr, $bo_read:ident, $bo_write:ident) => {
        pub fn $read(&self, pos: usize) -> Result<$type> {
            Ok(NativeEndian::$bo_read(self.window(pos, $size)?))
        }

        pub fn $write(&mut self, pos: usize, value: $type) -> usize {
            let end = self.reserve(pos, $size);
            NativeEndian::$bo_write(&mut self.bytes[pos..end], value);
            end
        }
    };
}

/// Growable buffer of index slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotBuffer {
    bytes: Vec<u8>,
}

impl SlotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-filled buffer of `len` bytes.
    pub fn with_len(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn window(&self, pos: usize, needed: usize) -> Result<&[u8]> {
        pos.checked_add(needed)
            .filter(|end| *end <= self.bytes.len())
            .map(|end| &self.bytes[pos..end])
            .ok_or(CodecError::SlotOutOfBounds {
                position: pos,
                needed,
                len: self.bytes.len(),
            })
    }

    fn reserve(&mut self, pos: usize, needed: usize) -> usize {
        let end = pos + needed;
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        end
    }

    pub fn read_u8(&self, pos: usize) -> Result<u8> {
        Ok(self.window(pos, 1)?[0])
    }

    pub fn write_u8(&mut self, pos: usize, value: u8) -> usize {
        let end = self.reserve(pos, 1);
        self.bytes[pos] = value;
        end
    }

    pub fn read_i8(&self, pos: usize) -> Result<i8> {
        Ok(self.read_u8(pos)? as i8)
    }

    pub fn write_i8(&mut self, pos: usize, value: i8) -> usize {
        self.write_u8(pos, value as u8)
    }

    impl_slot_rw!(read_i16, write_i16, i16, 2, read_i16, write_i16);
    impl_slot_rw!(read_u16, write_u16, u16, 2, read_u16, write_u16);
    impl_slot_rw!(read_i32, write_i32, i32, 4, read_i32, write_i32);
    impl_slot_rw!(read_u32, write_u32, u32, 4, read_u32, write_u32);
    impl_slot_rw!(read_i64, write_i64, i64, 8, read_i64, write_i64);
    impl_slot_rw!(read_u64, write_u64, u64, 8, read_u64, write_u64);
    impl_slot_rw!(read_f32, write_f32, f32, 4, read_f32, write_f32);

    pub fn read_bytes(&self, pos: usize, len: usize) -> Result<&[u8]> {
        self.window(pos, len)
    }

    pub fn write_bytes(&mut self, pos: usize, data: &[u8]) -> usize {
        let end = self.reserve(pos, data.len());
        self.bytes[pos..end].copy_from_slice(data);
        end
    }
}
