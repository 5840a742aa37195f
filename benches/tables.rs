//! Benchmarks for the tables stream.
//!
//! - Header decoding and table carving
//! - Sequential and parallel row decoding
//! - Re-encoding a decoded stream
//! - Object graph materialization

extern crate cilmeta;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use cilmeta::prelude::*;
use std::hint::black_box;

const TYPES: u32 = 2_000;
const FIELDS_PER_TYPE: u32 = 8;

/// A stream with `TYPES` types owning `FIELDS_PER_TYPE` fields each.
fn large_stream() -> Vec<u8> {
    let mut builder = TablesStreamBuilder::new();
    builder.push(ModuleRaw {
        name: 1,
        mvid: 1,
        ..Default::default()
    });

    for index in 0..TYPES {
        builder.push(TypeDefRaw {
            flags: 0x0010_0001,
            type_name: 1,
            field_list: index * FIELDS_PER_TYPE + 1,
            method_list: 1,
            ..Default::default()
        });
    }
    for _ in 0..TYPES * FIELDS_PER_TYPE {
        builder.push(FieldRaw {
            flags: 0x0006,
            name: 1,
            signature: 1,
            ..Default::default()
        });
    }

    builder.build().expect("valid stream")
}

/// Benchmark decoding the header and carving all tables.
fn bench_decode_stream(c: &mut Criterion) {
    let data = large_stream();

    let mut group = c.benchmark_group("tables_decode");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("header_and_ranges", |b| {
        b.iter(|| {
            let tables = TablesStream::from(black_box(&data)).unwrap();
            black_box(tables.table_count())
        });
    });
    group.finish();
}

/// Benchmark reading every Field row, sequentially and on the rayon pool.
fn bench_read_rows(c: &mut Criterion) {
    let data = large_stream();
    let tables = TablesStream::from(&data).unwrap();
    let fields = tables.table::<FieldRaw>().unwrap();

    let mut group = c.benchmark_group("tables_rows");
    group.throughput(Throughput::Elements(u64::from(fields.row_count())));
    group.bench_function("sequential", |b| {
        b.iter(|| {
            let sum: u64 = fields.iter().map(|row| u64::from(row.name)).sum();
            black_box(sum)
        });
    });
    group.bench_function("parallel", |b| {
        use rayon::prelude::*;

        b.iter(|| {
            let sum: u64 = fields.par_iter().map(|row| u64::from(row.name)).sum();
            black_box(sum)
        });
    });
    group.finish();
}

/// Benchmark encoding a decoded stream back to bytes.
fn bench_encode_stream(c: &mut Criterion) {
    let data = large_stream();
    let tables = TablesStream::from(&data).unwrap();

    c.bench_function("tables_encode", |b| {
        b.iter(|| black_box(tables.to_bytes().unwrap()));
    });
}

/// Benchmark resolving every type and its fields through the object graph.
fn bench_materialize_graph(c: &mut Criterion) {
    let data = large_stream();

    c.bench_function("graph_materialize", |b| {
        b.iter(|| {
            let image = MetadataImage::from_streams(MetadataStreams {
                tables: data.clone(),
                strings: Some(b"\0T\0".to_vec()),
                guids: Some(vec![0; 16]),
                blobs: Some(vec![0, 1, 0x08]),
            })
            .unwrap();

            let module = image.module().unwrap().unwrap();
            let mut fields = 0;
            for ty in module.top_level_types.items().unwrap() {
                fields += ty.fields.len().unwrap();
            }
            black_box(fields)
        });
    });
}

criterion_group!(
    benches,
    bench_decode_stream,
    bench_read_rows,
    bench_encode_stream,
    bench_materialize_graph,
);
criterion_main!(benches);
