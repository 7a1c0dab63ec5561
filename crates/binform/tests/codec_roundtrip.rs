// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec behaviour over file-backed streams.

use binform::codec::{
    type_index, type_read, type_write, write_value, CodecError, FieldValue, SlotBuffer, StreamPair,
};
use binform::TypeId;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

fn file_pair(data: &[u8]) -> StreamPair<File, File> {
    let mut file = tempfile::tempfile().expect("tempfile");
    file.write_all(data).expect("write data");
    file.seek(SeekFrom::Start(0)).expect("rewind");
    StreamPair::new(file, tempfile::tempfile().expect("tempfile"))
}

#[test]
fn test_random_scalars_survive_slots() {
    let mut rng = fastrand::Rng::with_seed(0x5EED);
    let mut streams = file_pair(b"");

    for _ in 0..200 {
        let mut slots = SlotBuffer::new();
        let (a, b, c, d) = (rng.i8(..), rng.i16(..), rng.i32(..), rng.i64(..));
        let (e, f, g, h) = (rng.u8(..), rng.u16(..), rng.u32(..), rng.u64(..));
        let x = rng.f32();

        let mut pos = type_write(TypeId::Int8, &mut slots, 0, &mut streams.write, &a).unwrap();
        pos = type_write(TypeId::Int16, &mut slots, pos, &mut streams.write, &b).unwrap();
        pos = type_write(TypeId::Int32, &mut slots, pos, &mut streams.write, &c).unwrap();
        pos = type_write(TypeId::Int64, &mut slots, pos, &mut streams.write, &d).unwrap();
        pos = type_write(TypeId::UInt8, &mut slots, pos, &mut streams.write, &e).unwrap();
        pos = type_write(TypeId::UInt16, &mut slots, pos, &mut streams.write, &f).unwrap();
        pos = type_write(TypeId::UInt32, &mut slots, pos, &mut streams.write, &g).unwrap();
        pos = type_write(TypeId::UInt64, &mut slots, pos, &mut streams.write, &h).unwrap();
        pos = type_write(TypeId::Float32, &mut slots, pos, &mut streams.write, &x).unwrap();
        assert_eq!(pos, 1 + 2 + 4 + 8 + 1 + 2 + 4 + 8 + 4);

        assert_eq!(type_read::<i8, _, _>(TypeId::Int8, &slots, 0, &mut streams).unwrap(), a);
        assert_eq!(type_read::<i16, _, _>(TypeId::Int16, &slots, 1, &mut streams).unwrap(), b);
        assert_eq!(type_read::<i32, _, _>(TypeId::Int32, &slots, 3, &mut streams).unwrap(), c);
        assert_eq!(type_read::<i64, _, _>(TypeId::Int64, &slots, 7, &mut streams).unwrap(), d);
        assert_eq!(type_read::<u8, _, _>(TypeId::UInt8, &slots, 15, &mut streams).unwrap(), e);
        assert_eq!(type_read::<u16, _, _>(TypeId::UInt16, &slots, 16, &mut streams).unwrap(), f);
        assert_eq!(type_read::<u32, _, _>(TypeId::UInt32, &slots, 18, &mut streams).unwrap(), g);
        assert_eq!(type_read::<u64, _, _>(TypeId::UInt64, &slots, 22, &mut streams).unwrap(), h);
        assert_eq!(
            type_read::<f32, _, _>(TypeId::Float32, &slots, 30, &mut streams)
                .unwrap()
                .to_bits(),
            x.to_bits()
        );
    }
}

#[test]
fn test_wrong_codec_is_rejected() {
    let mut streams = file_pair(b"");
    let mut slots = SlotBuffer::with_len(8);

    assert!(matches!(
        type_write(TypeId::UInt32, &mut slots, 0, &mut streams.write, &5i64),
        Err(CodecError::IncompatibleType { .. })
    ));
    assert!(matches!(
        type_read::<String, _, _>(TypeId::Int32, &slots, 0, &mut streams),
        Err(CodecError::IncompatibleType { .. })
    ));
}

#[test]
fn test_indexed_text_then_edit_on_files() {
    let mut streams = file_pair(b"alpha\0beta\0");
    let mut slots = SlotBuffer::new();

    let mut pos = 0;
    for _ in 0..2 {
        pos = type_index(TypeId::StringZ, || Ok(0), &mut slots, pos, &mut streams.data).unwrap();
    }
    assert_eq!(slots.read_i32(0).unwrap(), 0);
    assert_eq!(slots.read_i32(4).unwrap(), 6);

    // Rewrite the second entry; the first still reads from the data file.
    write_value(
        TypeId::StringZ,
        &mut slots,
        4,
        &mut streams.write,
        &FieldValue::from("gamma-ray"),
    )
    .unwrap();
    assert!(slots.read_i32(4).unwrap() < 0);

    assert_eq!(
        type_read::<String, _, _>(TypeId::StringZ, &slots, 0, &mut streams).unwrap(),
        "alpha"
    );
    assert_eq!(
        type_read::<String, _, _>(TypeId::StringZ, &slots, 4, &mut streams).unwrap(),
        "gamma-ray"
    );
}

#[test]
fn test_random_payloads_in_write_file() {
    let mut rng = fastrand::Rng::with_seed(42);
    let mut streams = file_pair(b"");
    let mut slots = SlotBuffer::new();

    let payloads: Vec<Vec<u8>> = (0..32)
        .map(|_| {
            let len = rng.usize(0..64);
            std::iter::repeat_with(|| rng.u8(..)).take(len).collect()
        })
        .collect();

    let mut pos = 0;
    for payload in &payloads {
        pos = type_write(TypeId::Bytes, &mut slots, pos, &mut streams.write, payload).unwrap();
    }

    for (i, payload) in payloads.iter().enumerate() {
        let read: Vec<u8> = type_read(TypeId::Bytes, &slots, i * 8, &mut streams).unwrap();
        assert_eq!(&read, payload);
        assert_eq!(slots.read_i32(i * 8 + 4).unwrap() as usize, payload.len());
    }
}
