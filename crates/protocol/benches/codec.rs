//! Benchmarks for the varint codec and whole-message encode/decode
//!
//! These verify that:
//! 1. Varint read/write stays allocation-free
//! 2. Message encode is single-pass despite retroactive length prefixes
//! 3. Decode cost scales with input size, not schema size

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use dynapb_protocol::{Buffer, Message, Registry, Slice, Value};

// Descriptor bytes for `test.Point { int32 x = 1; int32 y = 2; }`, built the
// same way the loader tests build theirs.
fn point_descriptor() -> Vec<u8> {
    fn varint(mut v: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                return;
            }
            out.push(byte | 0x80);
        }
    }
    fn bytes_field(field: u32, payload: &[u8], out: &mut Vec<u8>) {
        varint(u64::from(field << 3 | 2), out);
        varint(payload.len() as u64, out);
        out.extend_from_slice(payload);
    }
    fn varint_field(field: u32, value: u64, out: &mut Vec<u8>) {
        varint(u64::from(field << 3), out);
        varint(value, out);
    }

    let mut x = Vec::new();
    bytes_field(1, b"x", &mut x);
    varint_field(3, 1, &mut x);
    varint_field(4, 1, &mut x);
    varint_field(5, 5, &mut x);

    let mut y = Vec::new();
    bytes_field(1, b"y", &mut y);
    varint_field(3, 2, &mut y);
    varint_field(4, 1, &mut y);
    varint_field(5, 5, &mut y);

    let mut point = Vec::new();
    bytes_field(1, b"Point", &mut point);
    bytes_field(2, &x, &mut point);
    bytes_field(2, &y, &mut point);

    let mut file = Vec::new();
    bytes_field(2, b"test", &mut file);
    bytes_field(4, &point, &mut file);
    bytes_field(12, b"proto3", &mut file);

    let mut set = Vec::new();
    bytes_field(1, &file, &mut set);
    set
}

fn bench_varint(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint");

    let values: Vec<u64> = (0..1000).map(|i| 1u64 << (i % 60)).collect();
    group.throughput(Throughput::Elements(values.len() as u64));

    group.bench_function("write", |b| {
        let mut buf = Buffer::new();
        b.iter(|| {
            buf.reset();
            for &v in &values {
                buf.add_varint64(black_box(v));
            }
            black_box(buf.len())
        })
    });

    let mut encoded = Buffer::new();
    for &v in &values {
        encoded.add_varint64(v);
    }
    group.bench_function("read", |b| {
        b.iter(|| {
            let mut s = Slice::new(encoded.result());
            let mut sum = 0u64;
            while !s.is_empty() {
                sum = sum.wrapping_add(s.read_varint64().unwrap());
            }
            black_box(sum)
        })
    });

    group.finish();
}

fn bench_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("message");

    let mut registry = Registry::new();
    registry.load(&point_descriptor()).unwrap();
    let point = Message::new()
        .with("x", Value::I32(150))
        .with("y", Value::I32(-3));

    group.throughput(Throughput::Elements(1));
    group.bench_function("encode_point", |b| {
        let mut buf = Buffer::new();
        b.iter(|| {
            buf.reset();
            registry
                .encode_into("test.Point", black_box(&point), &mut buf)
                .unwrap();
            black_box(buf.len())
        })
    });

    let bytes = registry.encode("test.Point", &point).unwrap();
    group.bench_function("decode_point", |b| {
        b.iter(|| black_box(registry.decode("test.Point", black_box(&bytes)).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_varint, bench_message);
criterion_main!(benches);
