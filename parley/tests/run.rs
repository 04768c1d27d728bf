use futures::{executor::block_on, StreamExt};
use parley::{
    decode_json, Answer, Body, DecodeError, Failure, Payload, RawResponse, Request, RequestDsl,
    RequestExt, Route, Run, RunError, Submission,
};
use parley_loopback::Loopback;
use serde::Deserialize;
use static_assertions::assert_impl_all;

assert_impl_all!(RequestDsl<u8>: Send, Clone);
assert_impl_all!(Payload: Send, Clone);
assert_impl_all!(Submission: Send, Sync, Clone);
assert_impl_all!(Answer<Payload>: Send);
assert_impl_all!(Run<String, parley_loopback::Sender, parley_loopback::Receiver>: Send, Unpin);

const API: &str = "https://api.test";

#[derive(Debug, Deserialize)]
struct Count {
    count: u32,
}

/// `GET /count`, answered with a JSON object.
#[derive(Debug)]
struct GetCount;

impl Request for GetCount {
    type Response = u32;

    fn route(&self) -> Route {
        Route::get(format!("{}/count", API))
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<u32>, DecodeError> {
        decode_json::<Count>(response).map(|c| Some(c.count))
    }
}

/// `GET /label/{n}`, answered with a JSON string.
#[derive(Debug)]
struct GetLabel(u32);

impl Request for GetLabel {
    type Response = String;

    fn route(&self) -> Route {
        Route::get(format!("{}/label/{}", API, self.0))
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<String>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// Serves `/count` with `count`, or a 500 when `count` is `None`, and `/label/5` with `"ok"`.
fn service(count: Option<u32>) -> Loopback {
    Loopback::new(move |submission| {
        let route = submission.route();
        let path = route.uri().trim_start_matches(API);
        Ok(match (path, count) {
            ("/count", Some(count)) => RawResponse::ok(format!("{{\"count\":{}}}", count)),
            ("/count", None) => RawResponse::new(500, "internal error"),
            ("/label/5", _) => RawResponse::ok("\"ok\""),
            _ => RawResponse::new(404, "not found"),
        })
    })
}

fn label_of_count() -> RequestDsl<String> {
    GetCount.wrap().flat_map(|n| GetLabel(n).wrap())
}

#[test]
fn dependent_requests_feed_each_other() {
    let executor = service(Some(5));
    let values: Vec<String> = block_on(label_of_count().run(&executor).collect());
    assert_eq!(values, vec!["ok"]);
    assert_eq!(
        executor.journal(),
        vec![
            Route::get("https://api.test/count"),
            Route::get("https://api.test/label/5"),
        ]
    );
}

#[test]
fn a_failed_request_short_circuits_its_continuation() {
    let executor = service(None);
    let values: Vec<String> = block_on(label_of_count().run(&executor).collect());
    assert!(values.is_empty());
    assert_eq!(executor.journal(), vec![Route::get("https://api.test/count")]);
}

#[test]
fn try_run_distinguishes_failures_from_filtering() {
    let executor = service(Some(5));
    let program = RequestDsl::concat(vec![
        GetLabel(1).wrap(),
        GetLabel(5).wrap().filter(|label| label.is_empty()),
        GetLabel(5).wrap(),
    ]);
    let results: Vec<_> = block_on(program.try_run(&executor).collect());
    assert_eq!(results.len(), 2);
    assert!(matches!(
        &results[0],
        Err(RunError::Rejected {
            failure: Failure::Http { status: 404, .. },
            ..
        })
    ));
    assert_eq!(results[1], Ok("ok".to_string()));
}

#[test]
fn undecodable_responses_are_rejections() {
    let executor = Loopback::new(|_| Ok(RawResponse::ok("not json")));
    let results: Vec<_> = block_on(GetCount.wrap().try_run(&executor).collect());
    assert!(matches!(
        results.as_slice(),
        [Err(RunError::Rejected {
            failure: Failure::Decode(_),
            ..
        })]
    ));
}

#[test]
fn nothing_is_submitted_until_values_are_pulled() {
    let executor = service(Some(5));
    let program = RequestDsl::concat(vec![
        GetLabel(5).wrap(),
        GetLabel(5).wrap(),
        GetLabel(5).wrap(),
    ]);

    let mut stream = program.run(&executor);
    assert_eq!(executor.submitted(), 0);

    assert_eq!(block_on(stream.next()), Some("ok".to_string()));
    assert_eq!(executor.submitted(), 1);
    drop(stream);
    assert_eq!(executor.submitted(), 1);
}

#[test]
fn continuations_finish_before_the_next_value_starts() {
    let executor = service(Some(5));
    let program = RequestDsl::concat(vec![GetCount.wrap(), RequestDsl::pure(7)])
        .flat_map(|n| {
            RequestDsl::concat(vec![
                GetLabel(n).wrap().map(move |_| n),
                RequestDsl::pure(n * 10),
            ])
        });
    let values: Vec<u32> = block_on(program.run(&executor).collect());
    assert_eq!(values, vec![5, 50, 70]);
    assert_eq!(
        executor.journal(),
        vec![
            Route::get("https://api.test/count"),
            Route::get("https://api.test/label/5"),
            Route::get("https://api.test/label/7"),
        ]
    );
}

#[test]
fn pure_programs_never_touch_the_executor() {
    let executor = service(Some(5));
    let program = RequestDsl::pure(1)
        .flat_map(|n| RequestDsl::from_option(Some(n + 1)))
        .map(|n| n * 2);
    let values: Vec<u32> = block_on(program.run(&executor).collect());
    assert_eq!(values, vec![4]);
    assert!(executor.journal().is_empty());
}

/// A request answered (by an echo executor) with the number it carries.
#[derive(Debug)]
struct Echo(u32);

impl Request for Echo {
    type Response = u32;

    fn route(&self) -> Route {
        Route::post("https://echo.test")
    }

    fn body(&self) -> Body {
        Body::Json(self.0.to_string())
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<u32>, DecodeError> {
        decode_json(response).map(Some)
    }
}

fn countdown(n: u32) -> RequestDsl<u32> {
    Echo(n).wrap().flat_map(|n| {
        if n == 0 {
            RequestDsl::pure(0)
        } else {
            countdown(n - 1)
        }
    })
}

#[test]
fn long_dependent_chains_run_in_constant_stack() {
    let executor = Loopback::echo();
    let values: Vec<u32> = block_on(countdown(20_000).run(&executor).collect());
    assert_eq!(values, vec![0]);
    assert_eq!(executor.submitted(), 20_001);
}

#[test]
fn chains_built_step_by_step_run_in_order() {
    let executor = Loopback::echo();
    let program = (0..100_000).fold(Echo(0).wrap(), |program, _| {
        program.flat_map(|n| Echo(n + 1).wrap())
    });
    let values: Vec<u32> = block_on(program.run(&executor).collect());
    assert_eq!(values, vec![100_000]);
    assert_eq!(executor.submitted(), 100_001);
}

#[test]
fn long_runs_of_maps_and_filters_after_a_request() {
    let executor = Loopback::echo();
    let program = (0..100_000).fold(Echo(1).wrap().flat_map(|n| Echo(n).wrap()), |program, i| {
        if i % 2 == 0 {
            program.map(|n| n + 1)
        } else {
            program.filter(|n| *n > 0)
        }
    });
    let kept: Vec<u32> = block_on(program.clone().run(&executor).collect());
    assert_eq!(kept, vec![50_001]);
    assert_eq!(executor.submitted(), 2);

    let dropped = program.flat_map(|n| RequestDsl::pure(n + 1).filter(|n| n % 2 == 1));
    let values: Vec<u32> = block_on(dropped.run(&executor).collect());
    assert!(values.is_empty());
}

#[test]
fn each_run_gets_its_own_flow() {
    let executor = Loopback::echo();
    let program = Echo(3).wrap().map(|n| n + 1);
    let first: Vec<u32> = block_on(program.clone().run(&executor).collect());
    let second: Vec<u32> = block_on(parley::run(program, &executor).collect());
    assert_eq!(first, second);
    assert_eq!(executor.submitted(), 2);
}
