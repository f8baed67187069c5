//! Performance benchmarks for classification and hashing

use std::collections::BTreeSet;
use std::fs;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use bucket_sync::cache::HashCache;
use bucket_sync::hash::{hash_bytes, hash_file};
use bucket_sync::revision::next_revision;
use bucket_sync::sync::{compare, ObjectInfo};

/// Tree of `count` 4 KiB files where every third file differs remotely
fn build_tree(count: usize) -> (TempDir, BTreeSet<String>, Vec<ObjectInfo>) {
    let dir = TempDir::new().unwrap();
    let mut local = BTreeSet::new();
    let mut remote = Vec::new();

    for i in 0..count {
        let name = format!("dir{}/file{}.bin", i % 16, i);
        let path = dir.path().join(&name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let data = vec![(i % 251) as u8; 4096];
        fs::write(&path, &data).unwrap();

        let remote_data = if i % 3 == 0 { vec![0xFF; 4096] } else { data };
        remote.push(ObjectInfo {
            key: name.clone(),
            integrity_tag: format!("\"{}\"", hash_bytes(&remote_data)),
            size: 4096,
            last_modified: None,
        });
        local.insert(name);
    }

    (dir, local, remote)
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    for count in [100, 1000] {
        let (dir, local, remote) = build_tree(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("uncached", count), &count, |b, _| {
            b.iter(|| compare(black_box(&remote), black_box(&local), dir.path(), None).unwrap())
        });

        let cache = HashCache::new();
        group.bench_with_input(BenchmarkId::new("cached", count), &count, |b, _| {
            b.iter(|| {
                compare(black_box(&remote), black_box(&local), dir.path(), Some(&cache)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_hash_file(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("large.bin");
    fs::write(&path, vec![42u8; 8 * 1024 * 1024]).unwrap();

    let mut group = c.benchmark_group("hash_file");
    group.throughput(Throughput::Bytes(8 * 1024 * 1024));
    group.bench_function("8MiB", |b| b.iter(|| hash_file(black_box(&path)).unwrap()));
    group.finish();
}

fn bench_next_revision(c: &mut Criterion) {
    c.bench_function("next_revision", |b| {
        b.iter(|| next_revision(black_box("photos/2020/[rem41]IMG_0001.jpg"), black_box("rem")))
    });
}

criterion_group!(benches, bench_compare, bench_hash_file, bench_next_revision);
criterion_main!(benches);
