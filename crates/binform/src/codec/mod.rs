// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary type codec and indexer.
//!
//! # Wire Format
//!
//! Fields are addressed through fixed-width slots (host byte order):
//!
//! ```text
//! +-----------------------------------------------------------+
//! | scalar          value, size_of::<T>() bytes               |
//! | stringz         offset i32                                |
//! | string / bytes  offset i32 | length i32                   |
//! | custom (index)  position i64 | size u32                   |
//! +-----------------------------------------------------------+
//! ```
//!
//! An offset `>= 0` points into the original data stream, a negative offset
//! points into the write stream at its absolute value. Every payload appended
//! to the write stream is followed by one NUL byte.

mod field;
mod index;
mod slots;
mod streams;
mod value;

pub use field::{type_read, type_write, FieldCodec};
pub use index::{read_index_entry, slot_width, type_index, IndexEntry};
pub use slots::SlotBuffer;
pub use streams::{ReadSeek, StreamPair};
pub(crate) use streams::stream_len;
pub use value::{copy_value, read_value, write_value, FieldValue};

use crate::expr::ExprError;
use crate::type_id::TypeId;
use std::io;
use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{codec} cannot encode {requested}")]
    IncompatibleType {
        requested: TypeId,
        codec: &'static str,
    },

    #[error("invalid data offset {offset}")]
    DataOffset { offset: i64 },

    #[error("format corruption at offset {offset}: unexpected tag {found:02x?}")]
    FormatCorruption { offset: u64, found: [u8; 4] },

    #[error("slot read of {needed} bytes at {position} exceeds buffer of {len}")]
    SlotOutOfBounds {
        position: usize,
        needed: usize,
        len: usize,
    },

    #[error("unexpected end of stream reading payload at {offset}")]
    UnexpectedEof { offset: u64 },

    #[error("payload at offset {offset} is not valid UTF-8")]
    InvalidText { offset: i64 },

    #[error("value {value} out of range for {target}")]
    ValueOutOfRange { value: i128, target: TypeId },

    #[error("size evaluation failed: {0}")]
    Size(#[from] ExprError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
