use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::StreamExt;
use parley::{Body, DecodeError, RawResponse, Request, RequestDsl, RequestExt, Route};
use parley_loopback::Loopback;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

#[derive(Debug)]
struct Echo(u64);

impl Request for Echo {
    type Response = u64;

    fn route(&self) -> Route {
        Route::post("https://echo.test")
    }

    fn body(&self) -> Body {
        Body::Json(self.0.to_string())
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<u64>, DecodeError> {
        parley::decode_json(response).map(Some)
    }
}

/// `n` requests, each depending on the answer to the one before.
fn dependent(n: u64) -> RequestDsl<u64> {
    Echo(n).wrap().flat_map(|n| {
        if n == 0 {
            RequestDsl::pure(0)
        } else {
            dependent(n - 1)
        }
    })
}

/// `n` requests, none depending on any other.
fn independent(n: u64) -> RequestDsl<u64> {
    RequestDsl::concat((0..n).map(|i| Echo(i).wrap()))
}

/// `n` pure steps, which never touch the executor.
fn pure(n: u64) -> RequestDsl<u64> {
    (0..n).fold(RequestDsl::pure(0), |program, _| {
        program.flat_map(|x| RequestDsl::pure(x + 1))
    })
}

fn bench_chains(c: &mut Criterion) {
    let size: u64 = 1024;
    let rt = Runtime::new().unwrap();
    let executor = Loopback::echo();

    let mut group = c.benchmark_group("parley/loopback");
    group.throughput(Throughput::Elements(size));

    let programs: [(&str, fn(u64) -> RequestDsl<u64>); 3] = [
        ("dependent", dependent),
        ("independent", independent),
        ("pure", pure),
    ];

    for (name, build) in programs {
        group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &s| {
            b.iter_custom(|iters| {
                let mut total_duration = Duration::from_secs(0);
                for _ in 0..iters {
                    executor.clear_journal();
                    let program = build(s);
                    let start = Instant::now();
                    let count = rt.block_on(program.run(&executor).count());
                    total_duration += start.elapsed();
                    assert!(count > 0);
                }
                total_duration
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chains);
criterion_main!(benches);
