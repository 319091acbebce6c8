use bytes::{Bytes, BytesMut};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::io::Cursor;

use faisca_protocol::{Command, Frame};

fn bench_parse_simple_string(c: &mut Criterion) {
    let frame = Frame::Simple("OK".into());
    let mut buf = BytesMut::new();
    frame.encode(&mut buf);
    let data = buf.freeze();

    c.bench_function("parse_simple_string", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(data.as_ref()));
            Frame::parse(&mut cursor).unwrap()
        })
    });
}

fn bench_encode_simple_string(c: &mut Criterion) {
    let frame = Frame::Simple("OK".into());

    c.bench_function("encode_simple_string", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(64);
            black_box(&frame).encode(&mut buf);
            buf
        })
    });
}

fn bench_parse_bulk_1kb(c: &mut Criterion) {
    let frame = Frame::Bulk(Bytes::from(vec![b'x'; 1024]));
    let mut buf = BytesMut::new();
    frame.encode(&mut buf);
    let encoded = buf.freeze();

    c.bench_function("parse_bulk_1kb", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(encoded.as_ref()));
            Frame::parse(&mut cursor).unwrap()
        })
    });
}

fn bench_encode_bulk_1kb(c: &mut Criterion) {
    let frame = Frame::Bulk(Bytes::from(vec![b'x'; 1024]));

    c.bench_function("encode_bulk_1kb", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(2048);
            black_box(&frame).encode(&mut buf);
            buf
        })
    });
}

fn bench_command_from_frame(c: &mut Criterion) {
    c.bench_function("command_set_with_options", |b| {
        b.iter(|| {
            let frame = Frame::array_from_strs(&["SET", "key", "value", "PX", "500", "NX"]);
            Command::from_frame(black_box(frame)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_parse_simple_string,
    bench_encode_simple_string,
    bench_parse_bulk_1kb,
    bench_encode_bulk_1kb,
    bench_command_from_frame,
);
criterion_main!(benches);
