use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use tokio::runtime::Runtime;
use wardbus::{batch, Channel, EventMeta, GroupHandler, ProtectedRegistry};

const GROUP_SIZES: &[usize] = &[16, 64, 256];

fn dispatch_throughput(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("emit_group_async");

    for &size in GROUP_SIZES {
        let registry = Arc::new(ProtectedRegistry::new());
        let channel = Channel::with_registry(Arc::clone(&registry));
        for i in 0..size {
            registry.register(format!("event-{i}"), EventMeta::new().with_group("bench"));
        }
        batch::on_group(
            "bench",
            GroupHandler::new(|_key, args| json!(args.len())),
            &channel,
            None,
        );

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.to_async(&runtime).iter(|| {
                let channel = channel.clone();
                async move {
                    batch::emit_group_async("bench", &[json!(1)], Some(&channel))
                        .await
                        .expect("emit");
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, dispatch_throughput);
criterion_main!(benches);
