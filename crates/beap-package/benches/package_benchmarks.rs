//! Package builder performance benchmarks
//!
//! - Capsule chunk sealing, serial and on scoped threads
//! - Complete private and public builds
//!
//! Run with: cargo bench -p beap-package

use std::sync::Arc;

use beap_core::{Fingerprint, HandshakeId, InMemoryDirectory, RecipientRecord};
use beap_crypto::{DeviceKeyPair, PQKemKeyPair};
use beap_package::chunking::seal_capsule;
use beap_package::{b64, BuildRequest, BuilderSettings, MemoryKeyStore, PackageBuilder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// ============================================================================
// Capsule Sealing Benchmarks
// ============================================================================

fn bench_capsule_sealing(c: &mut Criterion) {
    let mut group = c.benchmark_group("capsule_sealing");
    let key = [42u8; 32];
    let aad = b"bench aad";

    for size in [64 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
        let plaintext = vec![0x5au8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("serial", size), &plaintext, |b, data| {
            b.iter(|| seal_capsule(black_box(data), &key, aad, 256 * 1024, false).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel", size), &plaintext, |b, data| {
            b.iter(|| seal_capsule(black_box(data), &key, aad, 256 * 1024, true).unwrap())
        });
    }

    group.finish();
}

// ============================================================================
// Full Build Benchmarks
// ============================================================================

fn bench_builds(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    let receiver = DeviceKeyPair::generate();
    let receiver_kem = PQKemKeyPair::generate();
    let directory = Arc::new(InMemoryDirectory::new());
    directory.insert(
        RecipientRecord::new(
            HandshakeId::new("hs-bench").unwrap(),
            "Bench",
            Fingerprint::new("a1b2c3d4e5f60718").unwrap(),
        )
        .with_x25519_public_key(receiver.public_key_b64())
        .with_pq_public_key(b64::encode(&receiver_kem.encapsulation_key_bytes())),
    );
    let keys = Arc::new(MemoryKeyStore::new());
    let builder = PackageBuilder::new(BuilderSettings::default(), keys.clone(), keys, directory);

    let private = BuildRequest::private("5e9d3c1a0b7f2e44", "hs-bench")
        .with_body("You have a secure message")
        .with_encrypted_message("x".repeat(16 * 1024));
    group.bench_function("private_16k", |b| {
        b.iter(|| builder.build(black_box(&private)).unwrap())
    });

    let public = BuildRequest::public("5e9d3c1a0b7f2e44").with_body("y".repeat(16 * 1024));
    group.bench_function("public_16k", |b| {
        b.iter(|| builder.build(black_box(&public)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_capsule_sealing, bench_builds);
criterion_main!(benches);
