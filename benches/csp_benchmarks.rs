use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cspkit::ecdsa::{marshal_signature, unmarshal_signature};
use cspkit::prelude::*;

fn new_csp(level: u16, family: HashFamily) -> SwCsp {
    SwCsp::new(SwOpts::new(level, family), Some(Arc::new(InMemoryKeyStore::new())))
        .expect("Failed to create provider")
}

fn ecdsa_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("ecdsa");

    for (name, level, family) in [
        ("P-256", 256, HashFamily::Sha2),
        ("P-384", 384, HashFamily::Sha3),
    ] {
        let csp = new_csp(level, family);
        let hash_type = HashType::from_family(family, level).unwrap();
        let opts = EcdsaKeyGenOpts::new(true);

        group.bench_with_input(BenchmarkId::new("key_generation", name), &opts, |b, opts| {
            b.iter(|| csp.key_gen(Some(opts)))
        });

        let key = csp.key_gen(Some(&opts)).unwrap();
        let public = key.public_key().unwrap();
        let digest = csp.hash(b"benchmark message", hash_type).unwrap();
        let signature = csp.sign(Some(key.as_ref()), &digest, None).unwrap();

        group.bench_with_input(BenchmarkId::new("sign", name), &digest, |b, digest| {
            b.iter(|| csp.sign(Some(key.as_ref()), digest, None))
        });
        group.bench_with_input(BenchmarkId::new("verify", name), &signature, |b, signature| {
            b.iter(|| csp.verify(Some(public.as_ref()), signature, &digest, None))
        });
    }

    group.finish();
}

fn der_benchmarks(c: &mut Criterion) {
    let csp = new_csp(256, HashFamily::Sha2);
    let key = csp.key_gen(Some(&EcdsaP256KeyGenOpts::new(true))).unwrap();
    let digest = csp.hash(b"benchmark message", HashType::Sha2_256).unwrap();
    let signature = csp.sign(Some(key.as_ref()), &digest, None).unwrap();
    let (r, s) = unmarshal_signature(&signature).unwrap();

    let mut group = c.benchmark_group("der");
    group.bench_function("unmarshal", |b| b.iter(|| unmarshal_signature(&signature)));
    group.bench_function("marshal", |b| b.iter(|| marshal_signature(&r, &s)));
    group.finish();
}

fn aes_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("aes_cbc");
    let csp = new_csp(256, HashFamily::Sha2);

    for size in [64usize, 1024, 16 * 1024] {
        let key = csp.key_gen(Some(&Aes256KeyGenOpts::new(true))).unwrap();
        let plaintext = vec![0x42u8; size];
        let ciphertext = csp.encrypt(Some(key.as_ref()), &plaintext, None).unwrap();

        group.bench_with_input(BenchmarkId::new("encrypt", size), &plaintext, |b, plaintext| {
            b.iter(|| csp.encrypt(Some(key.as_ref()), plaintext, None))
        });
        group.bench_with_input(BenchmarkId::new("decrypt", size), &ciphertext, |b, ciphertext| {
            b.iter(|| csp.decrypt(Some(key.as_ref()), ciphertext, None))
        });
    }

    group.finish();
}

fn derivation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_derivation");
    let csp = new_csp(256, HashFamily::Sha2);

    let aes = csp.key_gen(Some(&Aes256KeyGenOpts::new(true))).unwrap();
    let hmac_opts = HmacTruncated256AesDeriveKeyOpts::new(true, b"benchmark".to_vec());
    group.bench_function("hmac_truncated", |b| {
        b.iter(|| csp.key_deriv(Some(aes.as_ref()), Some(&hmac_opts)))
    });

    let ecdsa = csp.key_gen(Some(&EcdsaP256KeyGenOpts::new(true))).unwrap();
    let rerand_opts = EcdsaReRandKeyOpts::new(true, vec![0x2a; 32]);
    group.bench_function("ecdsa_rerand", |b| {
        b.iter(|| csp.key_deriv(Some(ecdsa.as_ref()), Some(&rerand_opts)))
    });

    group.finish();
}

criterion_group!(
    benches,
    ecdsa_benchmarks,
    der_benchmarks,
    aes_benchmarks,
    derivation_benchmarks
);
criterion_main!(benches);
