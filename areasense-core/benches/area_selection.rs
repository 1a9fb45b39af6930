//! Area selection cycle benchmarks
//!
//! Run with:
//!   cargo bench -p areasense-core --bench area_selection
//!
//! Measures one full `refresh_areas` pass for a growing number of devices
//! heard by eight scanners, plus the UKF update on its own.

use std::collections::BTreeMap;

use areasense_core::{
    Advert, Context, Device, Scanner, SelectionConfig, StaticTopology, UnscentedKalmanFilter,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const SCANNERS: usize = 8;

fn house(devices: usize) -> Context {
    let mut topology = StaticTopology::new().with_floor("ground", 0).with_floor("upstairs", 1);
    for i in 0..SCANNERS {
        let floor = if i < SCANNERS / 2 { "ground" } else { "upstairs" };
        topology = topology.with_area(format!("room-{i}"), format!("Room {i}"), Some(floor));
    }
    let mut ctx = Context::new(SelectionConfig::default(), Box::new(topology))
        .expect("default config is valid");
    for i in 0..SCANNERS {
        let level = if i < SCANNERS / 2 { 0 } else { 1 };
        let floor = if level == 0 { "ground" } else { "upstairs" };
        ctx.add_scanner(Scanner::new(format!("s-{i}"), format!("room-{i}")).on_floor(floor, level));
    }
    for d in 0..devices {
        let mut device = Device::new(format!("dev-{d}"), 0.0);
        for s in 0..SCANNERS {
            let mut advert = Advert::new(format!("s-{s}"));
            let distance = 1.0 + ((d + s) % SCANNERS) as f32;
            advert.record(-45.0 - 4.0 * distance, Some(distance), 1.0);
            device.insert_advert(advert);
        }
        ctx.add_device(device);
    }
    ctx
}

fn advance(ctx: &mut Context, now: f64) {
    for device in ctx.devices.values_mut() {
        for advert in device.adverts.values_mut() {
            let rssi = advert.rssi.unwrap_or(-80.0);
            let distance = advert.rssi_distance;
            advert.record(rssi, distance, now);
        }
    }
}

fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh_areas");
    for devices in [1usize, 10, 50] {
        group.throughput(Throughput::Elements(devices as u64));
        group.bench_with_input(BenchmarkId::from_parameter(devices), &devices, |b, &n| {
            let mut ctx = house(n);
            let mut now = 1.0;
            b.iter(|| {
                now += 1.0;
                advance(&mut ctx, now);
                ctx.refresh_areas(black_box(now));
            });
        });
    }
    group.finish();
}

fn bench_ukf(c: &mut Criterion) {
    let readings: BTreeMap<String, f32> = (0..SCANNERS)
        .map(|i| (format!("s-{i}"), -50.0 - 5.0 * i as f32))
        .collect();
    c.bench_function("ukf_update_multi_8", |b| {
        let mut ukf = UnscentedKalmanFilter::new();
        let mut now = 0.0;
        b.iter(|| {
            now += 1.0;
            let _ = ukf.predict_to(now);
            let _ = ukf.update_multi(black_box(&readings), now);
        });
    });
}

criterion_group!(benches, bench_refresh, bench_ukf);
criterion_main!(benches);
