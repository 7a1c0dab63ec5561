// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The data/write stream pair.

use std::io::{self, Read, Seek, SeekFrom};

/// Object-safe `Read + Seek`.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Original backing bytes plus the append-only edit buffer.
///
/// A stored offset `>= 0` addresses `data`; a negative offset addresses
/// `write` at its absolute value.
#[derive(Debug)]
pub struct StreamPair<D, W> {
    pub data: D,
    pub write: W,
}

impl<D, W> StreamPair<D, W>
where
    D: Read + Seek,
    W: Read + Seek,
{
    pub fn new(data: D, write: W) -> Self {
        Self { data, write }
    }

    /// Resolve a stored offset to its stream and absolute position.
    pub fn select(&mut self, offset: i32) -> (&mut dyn ReadSeek, u64) {
        let position = u64::from(offset.unsigned_abs());
        let stream: &mut dyn ReadSeek = if offset < 0 {
            &mut self.write
        } else {
            &mut self.data
        };
        (stream, position)
    }

    pub fn into_inner(self) -> (D, W) {
        (self.data, self.write)
    }
}

/// Total length of a seekable stream, leaving its cursor where it was.
pub(crate) fn stream_len<S: Seek + ?Sized>(stream: &mut S) -> io::Result<u64> {
    let current = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    if current != end {
        stream.seek(SeekFrom::Start(current))?;
    }
    Ok(end)
}
