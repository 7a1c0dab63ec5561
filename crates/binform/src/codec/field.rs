// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed field reads and writes.

use super::slots::SlotBuffer;
use super::streams::StreamPair;
use super::{CodecError, Result};
use crate::type_id::TypeId;
use byteorder::ReadBytesExt;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Rust types that can be stored in a field slot.
///
/// Scalars live directly in the slot. Text and byte payloads live in one of
/// the two streams and the slot only carries the signed offset (and the
/// length for `string` and `bytes`).
pub trait FieldCodec: Sized {
    /// Name reported when a tag is rejected.
    const CODEC: &'static str;

    /// Whether this Rust type encodes `type_id`.
    fn accepts(type_id: TypeId) -> bool;

    fn decode<D: Read + Seek, W: Read + Seek>(
        type_id: TypeId,
        slots: &SlotBuffer,
        pos: usize,
        streams: &mut StreamPair<D, W>,
    ) -> Result<Self>;

    /// Store `self`, returning the slot position just past the entry.
    fn encode<W: Write + Seek>(
        &self,
        type_id: TypeId,
        slots: &mut SlotBuffer,
        pos: usize,
        write: &mut W,
    ) -> Result<usize>;
}

fn check<T: FieldCodec>(type_id: TypeId) -> Result<()> {
    if T::accepts(type_id) {
        Ok(())
    } else {
        Err(CodecError::IncompatibleType {
            requested: type_id,
            codec: T::CODEC,
        })
    }
}

/// Read the field at `pos` as `T`.
pub fn type_read<T, D, W>(
    type_id: TypeId,
    slots: &SlotBuffer,
    pos: usize,
    streams: &mut StreamPair<D, W>,
) -> Result<T>
where
    T: FieldCodec,
    D: Read + Seek,
    W: Read + Seek,
{
    check::<T>(type_id)?;
    T::decode(type_id, slots, pos, streams)
}

/// Write `value` into the slot at `pos`; indirect payloads go to `write`.
pub fn type_write<T, W>(
    type_id: TypeId,
    slots: &mut SlotBuffer,
    pos: usize,
    write: &mut W,
    value: &T,
) -> Result<usize>
where
    T: FieldCodec,
    W: Write + Seek,
{
    check::<T>(type_id)?;
    value.encode(type_id, slots, pos, write)
}

macro_rules! impl_scalar_codec {
    ($type:ty, $tag:expr, $read:ident, $write:ident) => {
        impl FieldCodec for $type {
            const CODEC: &'static str = stringify!($type);

            fn accepts(type_id: TypeId) -> bool {
                type_id == $tag
            }

            fn decode<D: Read + Seek, W: Read + Seek>(
                _type_id: TypeId,
                slots: &SlotBuffer,
                pos: usize,
                _streams: &mut StreamPair<D, W>,
            ) -> Result<Self> {
                slots.$read(pos)
            }

            fn encode<W: Write + Seek>(
                &self,
                _type_id: TypeId,
                slots: &mut SlotBuffer,
                pos: usize,
                _write: &mut W,
            ) -> Result<usize> {
                Ok(slots.$write(pos, *self))
            }
        }
    };
}

impl_scalar_codec!(i8, TypeId::Int8, read_i8, write_i8);
impl_scalar_codec!(i16, TypeId::Int16, read_i16, write_i16);
impl_scalar_codec!(i32, TypeId::Int32, read_i32, write_i32);
impl_scalar_codec!(i64, TypeId::Int64, read_i64, write_i64);
impl_scalar_codec!(u8, TypeId::UInt8, read_u8, write_u8);
impl_scalar_codec!(u16, TypeId::UInt16, read_u16, write_u16);
impl_scalar_codec!(u32, TypeId::UInt32, read_u32, write_u32);
impl_scalar_codec!(u64, TypeId::UInt64, read_u64, write_u64);
impl_scalar_codec!(f32, TypeId::Float32, read_f32, write_f32);

impl FieldCodec for String {
    const CODEC: &'static str = "String";

    fn accepts(type_id: TypeId) -> bool {
        matches!(type_id, TypeId::StringZ | TypeId::String)
    }

    fn decode<D: Read + Seek, W: Read + Seek>(
        type_id: TypeId,
        slots: &SlotBuffer,
        pos: usize,
        streams: &mut StreamPair<D, W>,
    ) -> Result<Self> {
        let offset = slots.read_i32(pos)?;
        let payload = read_indirect(type_id, slots, pos, streams)?;
        String::from_utf8(payload).map_err(|_| CodecError::InvalidText {
            offset: i64::from(offset),
        })
    }

    fn encode<W: Write + Seek>(
        &self,
        type_id: TypeId,
        slots: &mut SlotBuffer,
        pos: usize,
        write: &mut W,
    ) -> Result<usize> {
        write_indirect(type_id, slots, pos, write, self.as_bytes())
    }
}

impl FieldCodec for Vec<u8> {
    const CODEC: &'static str = "Vec<u8>";

    fn accepts(type_id: TypeId) -> bool {
        type_id == TypeId::Bytes
    }

    fn decode<D: Read + Seek, W: Read + Seek>(
        type_id: TypeId,
        slots: &SlotBuffer,
        pos: usize,
        streams: &mut StreamPair<D, W>,
    ) -> Result<Self> {
        read_indirect(type_id, slots, pos, streams)
    }

    fn encode<W: Write + Seek>(
        &self,
        type_id: TypeId,
        slots: &mut SlotBuffer,
        pos: usize,
        write: &mut W,
    ) -> Result<usize> {
        write_indirect(type_id, slots, pos, write, self)
    }
}

/// Fetch an indirect payload through the slot at `pos`.
///
/// The selected stream's cursor is put back where it was, except when the
/// pre-read position sits exactly one payload length before the target.
fn read_indirect<D: Read + Seek, W: Read + Seek>(
    type_id: TypeId,
    slots: &SlotBuffer,
    pos: usize,
    streams: &mut StreamPair<D, W>,
) -> Result<Vec<u8>> {
    let offset = slots.read_i32(pos)?;
    let stored_len = if type_id.has_length_field() {
        Some(slots.read_i32(pos + 4)?)
    } else {
        None
    };

    let (stream, target) = streams.select(offset);
    let before = stream.stream_position()?;
    let seek_delta = before as i64 - target as i64;
    if seek_delta != 0 {
        stream.seek(SeekFrom::Start(target))?;
    }

    let payload = match stored_len {
        Some(len) => {
            let len = usize::try_from(len).map_err(|_| CodecError::DataOffset {
                offset: i64::from(len),
            })?;
            let mut payload = vec![0u8; len];
            fill(stream, &mut payload, target)?;
            payload
        }
        None => scan_to_nul(stream, target)?,
    };

    if seek_delta != -(payload.len() as i64) {
        stream.seek(SeekFrom::Start(before))?;
    }

    log::trace!(
        "[codec] read {} bytes of {} at {}{}",
        payload.len(),
        type_id,
        if offset < 0 { "-" } else { "" },
        target
    );
    Ok(payload)
}

/// Append a payload to the write stream and point the slot at it.
///
/// Position 0 has no negative form, so an empty write stream first receives
/// one pad byte.
fn write_indirect<W: Write + Seek>(
    type_id: TypeId,
    slots: &mut SlotBuffer,
    pos: usize,
    write: &mut W,
    payload: &[u8],
) -> Result<usize> {
    let mut end = write.seek(SeekFrom::End(0))?;
    if end == 0 {
        write.write_all(&[0])?;
        end = 1;
    }

    let offset = i32::try_from(end).map_err(|_| CodecError::DataOffset {
        offset: end as i64,
    })?;
    let len = i32::try_from(payload.len()).map_err(|_| CodecError::DataOffset {
        offset: end as i64 + payload.len() as i64,
    })?;

    let mut next = slots.write_i32(pos, -offset);
    if type_id.has_length_field() {
        next = slots.write_i32(next, len);
    }

    write.write_all(payload)?;
    write.write_all(&[0])?;

    log::trace!(
        "[codec] appended {} bytes of {} at -{}",
        payload.len(),
        type_id,
        end
    );
    Ok(next)
}

/// `read_exact` with end-of-stream reported against `offset`.
pub(crate) fn fill<R: Read + ?Sized>(stream: &mut R, buf: &mut [u8], offset: u64) -> Result<()> {
    stream.read_exact(buf).map_err(|e| eof_at(e, offset))
}

/// Read bytes up to (and consuming) the next NUL.
pub(crate) fn scan_to_nul<R: Read + ?Sized>(stream: &mut R, offset: u64) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    loop {
        match stream.read_u8().map_err(|e| eof_at(e, offset))? {
            0 => return Ok(content),
            byte => content.push(byte),
        }
    }
}

fn eof_at(err: io::Error, offset: u64) -> CodecError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        CodecError::UnexpectedEof { offset }
    } else {
        CodecError::Io(err)
    }
}
