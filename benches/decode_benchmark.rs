use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dlms_meter::mbus::frame::reassemble;
use dlms_meter::simulate::TelegramBuilder;
use dlms_meter::{AesKey, TelegramDecoder};

fn benchmark_key() -> AesKey {
    AesKey::from_bytes(&[0x5A; 16]).unwrap()
}

fn benchmark_reassemble(c: &mut Criterion) {
    let raw = TelegramBuilder::full_reading(Default::default())
        .build(&benchmark_key())
        .unwrap();

    c.bench_function("reassemble", |b| {
        b.iter(|| {
            let payload = reassemble(black_box(&raw), true);
            let _ = black_box(payload);
        })
    });
}

fn benchmark_decode_telegram(c: &mut Criterion) {
    let key = benchmark_key();
    let decoder = TelegramDecoder::new(key.clone());
    let full = TelegramBuilder::full_reading(Default::default())
        .build(&key)
        .unwrap();
    let small = TelegramBuilder::new()
        .voltage(dlms_meter::CodeType::VoltageL1, 230.1)
        .build(&key)
        .unwrap();

    let mut group = c.benchmark_group("decode");
    group.bench_function("full_reading", |b| {
        b.iter(|| black_box(decoder.decode(black_box(&full))))
    });
    group.bench_function("single_record", |b| {
        b.iter(|| black_box(decoder.decode(black_box(&small))))
    });
    group.finish();
}

criterion_group!(benches, benchmark_reassemble, benchmark_decode_telegram);
criterion_main!(benches);
