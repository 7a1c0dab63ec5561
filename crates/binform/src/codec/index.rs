// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Index pass over the data stream.
//!
//! Indexing records a fixed-width slot per field so that later reads can jump
//! straight to any field without re-parsing what precedes it:
//!
//! ```text
//! scalar         | value (1/2/4/8)                |
//! stringz        | offset i32                     |
//! string, bytes  | offset i32 | size i32          |
//! custom         | position i64 | size u32        |
//! ```

use super::field::{fill, scan_to_nul};
use super::slots::SlotBuffer;
use super::streams::stream_len;
use super::value::{read_scalar, FieldValue};
use super::{CodecError, Result};
use crate::type_id::TypeId;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

/// Index the field of type `type_id` at the data stream's cursor.
///
/// `size` is only called for `string`, `bytes` and `custom`. On success the
/// cursor sits just past the field and the returned value is the slot
/// position just past the new entry.
pub fn type_index<R, F>(
    type_id: TypeId,
    size: F,
    slots: &mut SlotBuffer,
    pos: usize,
    data: &mut R,
) -> Result<usize>
where
    R: Read + Seek + ?Sized,
    F: FnOnce() -> Result<u64>,
{
    if let Some(width) = type_id.scalar_size() {
        let at = data.stream_position()?;
        let mut buf = [0u8; 8];
        fill(data, &mut buf[..width], at)?;
        log::trace!("[codec] indexed {} at {}", type_id, at);
        return Ok(slots.write_bytes(pos, &buf[..width]));
    }

    match type_id {
        TypeId::Custom => {
            let position = data.stream_position()?;
            let size = size()?;
            let end = checked_end(data, position, size)?;
            let stored_size = u32::try_from(size).map_err(|_| data_offset(end))?;
            let stored_position = i64::try_from(position).map_err(|_| data_offset(position))?;

            data.seek(SeekFrom::Start(end))?;
            let next = slots.write_i64(pos, stored_position);
            log::trace!("[codec] indexed object {}..{}", position, end);
            Ok(slots.write_u32(next, stored_size))
        }
        TypeId::StringZ => {
            let offset = current_offset(data)?;
            scan_to_nul(data, offset as u64)?;
            Ok(slots.write_i32(pos, offset))
        }
        TypeId::String | TypeId::Bytes => {
            let offset = current_offset(data)?;
            let start = offset as u64;
            let size = size()?;
            let end = checked_end(data, start, size)?;
            let stored_size = i32::try_from(size).map_err(|_| data_offset(end))?;

            if type_id == TypeId::String && size == 4 {
                let mut found = [0u8; 4];
                fill(data, &mut found, start)?;
                if !is_plausible_tag(&found) {
                    log::warn!(
                        "[codec] implausible 4-byte tag {:02x?} at offset {}",
                        found,
                        start
                    );
                    data.seek(SeekFrom::Start(start))?;
                    return Err(CodecError::FormatCorruption {
                        offset: start,
                        found,
                    });
                }
            }

            data.seek(SeekFrom::Start(end))?;
            let next = slots.write_i32(pos, offset);
            Ok(slots.write_i32(next, stored_size))
        }
        _ => Err(CodecError::IncompatibleType {
            requested: type_id,
            codec: "index",
        }),
    }
}

/// A four-character tag is either all zero or ends in `A-Z`, `0-9` or `_`.
fn is_plausible_tag(tag: &[u8; 4]) -> bool {
    tag == &[0u8; 4] || matches!(tag[3], b'A'..=b'Z' | b'0'..=b'9' | b'_')
}

fn data_offset(position: u64) -> CodecError {
    CodecError::DataOffset {
        offset: i64::try_from(position).unwrap_or(i64::MAX),
    }
}

/// Cursor position as a stored offset; it must fit a non-negative i32.
fn current_offset<R: Seek + ?Sized>(data: &mut R) -> Result<i32> {
    let position = data.stream_position()?;
    i32::try_from(position).map_err(|_| data_offset(position))
}

/// `start + size`, rejected when it runs past the end of the stream.
fn checked_end<R: Seek + ?Sized>(data: &mut R, start: u64, size: u64) -> Result<u64> {
    let end = start.checked_add(size).ok_or_else(|| data_offset(u64::MAX))?;
    let len = stream_len(data)?;
    if end > len {
        log::debug!(
            "[codec] field {}+{} overruns stream of {} bytes",
            start,
            size,
            len
        );
        return Err(data_offset(end));
    }
    Ok(end)
}

/// Decoded index slot.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEntry {
    /// Scalar copied into the slot.
    Scalar(FieldValue),
    /// `stringz` offset.
    Text { offset: i32 },
    /// `string` / `bytes` offset and size.
    Sized { offset: i32, size: i32 },
    /// `custom` position and size.
    Object { position: i64, size: u32 },
}

impl IndexEntry {
    /// Byte range in the data stream, when the entry records a size.
    ///
    /// Offsets into the write stream (negative) have no data range.
    pub fn data_range(&self) -> Option<Range<u64>> {
        match *self {
            Self::Sized { offset, size } if offset >= 0 && size >= 0 => {
                let start = offset as u64;
                Some(start..start + size as u64)
            }
            Self::Object { position, size } if position >= 0 => {
                let start = position as u64;
                Some(start..start + u64::from(size))
            }
            _ => None,
        }
    }
}

/// Width of the slot `type_index` produces for `type_id`.
pub fn slot_width(type_id: TypeId) -> usize {
    type_id.slot_width()
}

/// Decode the slot at `pos`, returning it with the position past it.
pub fn read_index_entry(
    type_id: TypeId,
    slots: &SlotBuffer,
    pos: usize,
) -> Result<(IndexEntry, usize)> {
    let next = pos + slot_width(type_id);
    if let Some(value) = read_scalar(type_id, slots, pos)? {
        return Ok((IndexEntry::Scalar(value), next));
    }
    let entry = match type_id {
        TypeId::StringZ => IndexEntry::Text {
            offset: slots.read_i32(pos)?,
        },
        TypeId::String | TypeId::Bytes => IndexEntry::Sized {
            offset: slots.read_i32(pos)?,
            size: slots.read_i32(pos + 4)?,
        },
        _ => IndexEntry::Object {
            position: slots.read_i64(pos)?,
            size: slots.read_u32(pos + 8)?,
        },
    };
    Ok((entry, next))
}
