//! 分页与内存仓储查询性能基准测试

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use flare_message_center_core::data::{
    DbModel, Filter, InMemoryRepository, OperationalRepository, PageMetrics, QueryRepository,
};
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Notice {
    #[serde(rename = "_id")]
    id: i64,
    group: String,
    tags: Vec<String>,
}

impl DbModel for Notice {
    type Key = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

fn bench_page_metrics(c: &mut Criterion) {
    c.bench_function("page_metrics_compute", |b| {
        b.iter(|| {
            for current_page in 0..64 {
                black_box(PageMetrics::compute(
                    black_box(1_000),
                    black_box(25),
                    current_page,
                ));
            }
        })
    });
}

fn bench_in_memory_paging(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cancel = CancellationToken::new();

    let mut group = c.benchmark_group("in_memory_paging");
    for size in [100_i64, 1_000, 10_000] {
        let repository = InMemoryRepository::<Notice>::new();
        rt.block_on(async {
            for id in 0..size {
                repository
                    .insert(
                        Notice {
                            id,
                            group: format!("g{}", id % 10),
                            tags: vec![format!("t{}", id % 3)],
                        },
                        &cancel,
                    )
                    .await
                    .unwrap();
            }
        });

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("filtered_page", size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let page = repository
                        .query(Filter::eq("group", "g3").and(Filter::contains("tags", "t1")), &cancel)
                        .to_paging(true, 20)
                        .order_by_descending("_id")
                        .get_page(1);
                    black_box(page.to_paging_data().await.unwrap());
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_page_metrics, bench_in_memory_paging);
criterion_main!(benches);
