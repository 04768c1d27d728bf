//! The algebraic laws of `RequestDsl`, checked by running both sides against a fresh echo
//! executor and comparing what they yield and which requests they submit.

use futures::{executor::block_on, StreamExt};
use parley::{decode_json, Body, DecodeError, RawResponse, Request, RequestDsl, Route};
use parley_loopback::Loopback;
use quickcheck::{Arbitrary, Gen, QuickCheck};

/// A request answered (by an echo executor) with the number it carries.
#[derive(Debug)]
struct Echo(u8);

impl Request for Echo {
    type Response = u8;

    fn route(&self) -> Route {
        Route::post(format!("https://echo.test/{}", self.0))
    }

    fn body(&self) -> Body {
        Body::Json(self.0.to_string())
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<u8>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// A description of a program, from which the real `RequestDsl` is built.
#[derive(Debug, Clone)]
enum Program {
    Pure(u8),
    Empty,
    Echo(u8),
    Concat(Vec<Program>),
    Then(Box<Program>, Step),
}

/// A description of a continuation.
#[derive(Debug, Clone, Copy)]
enum Step {
    Pure(u8),
    Echo(u8),
    Drop,
    Twice(u8),
}

impl Arbitrary for Step {
    fn arbitrary(g: &mut Gen) -> Self {
        let n = u8::arbitrary(g);
        *g.choose(&[Step::Pure(n), Step::Echo(n), Step::Drop, Step::Twice(n)])
            .unwrap()
    }
}

impl Arbitrary for Program {
    fn arbitrary(g: &mut Gen) -> Self {
        arbitrary_program(g, 3)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            Program::Concat(parts) => Box::new(parts.clone().into_iter()),
            Program::Then(first, _) => Box::new(std::iter::once((**first).clone())),
            _ => Box::new(std::iter::empty()),
        }
    }
}

fn arbitrary_program(g: &mut Gen, depth: usize) -> Program {
    let choices: &[u8] = if depth == 0 { &[0, 1, 2] } else { &[0, 1, 2, 3, 4] };
    match *g.choose(choices).unwrap() {
        0 => Program::Pure(u8::arbitrary(g)),
        1 => Program::Empty,
        2 => Program::Echo(u8::arbitrary(g)),
        3 => {
            let len = usize::arbitrary(g) % 4;
            Program::Concat((0..len).map(|_| arbitrary_program(g, depth - 1)).collect())
        }
        _ => Program::Then(
            Box::new(arbitrary_program(g, depth - 1)),
            Step::arbitrary(g),
        ),
    }
}

fn step(step: Step) -> impl Fn(u8) -> RequestDsl<u8> + Send + Sync + 'static {
    move |x| match step {
        Step::Pure(n) => RequestDsl::pure(x.wrapping_add(n)),
        Step::Echo(n) => RequestDsl::wrap(Echo(x ^ n)),
        Step::Drop => RequestDsl::empty(),
        Step::Twice(n) => RequestDsl::concat(vec![
            RequestDsl::pure(x),
            RequestDsl::wrap(Echo(x.wrapping_add(n))),
        ]),
    }
}

fn build(program: &Program) -> RequestDsl<u8> {
    match program {
        Program::Pure(n) => RequestDsl::pure(*n),
        Program::Empty => RequestDsl::empty(),
        Program::Echo(n) => RequestDsl::wrap(Echo(*n)),
        Program::Concat(parts) => RequestDsl::concat(parts.iter().map(build)),
        Program::Then(first, s) => build(first).flat_map(step(*s)),
    }
}

/// Everything observable about one run: what it yielded, and which requests it submitted.
fn observe(program: RequestDsl<u8>) -> (Vec<u8>, Vec<Route>) {
    let executor = Loopback::echo();
    let values = block_on(program.run(&executor).collect());
    (values, executor.journal())
}

fn check<A: quickcheck::Testable>(property: A) {
    QuickCheck::new().gen(Gen::new(16)).quickcheck(property)
}

#[test]
fn left_identity() {
    fn property(x: u8, f: Step) -> bool {
        observe(RequestDsl::pure(x).flat_map(step(f))) == observe(step(f)(x))
    }
    check(property as fn(_, _) -> bool)
}

#[test]
fn right_identity() {
    fn property(m: Program) -> bool {
        observe(build(&m).flat_map(RequestDsl::pure)) == observe(build(&m))
    }
    check(property as fn(_) -> bool)
}

#[test]
fn associativity() {
    fn property(m: Program, f: Step, g: Step) -> bool {
        let left = build(&m).flat_map(step(f)).flat_map(step(g));
        let right = build(&m).flat_map(move |a| step(f)(a).flat_map(step(g)));
        observe(left) == observe(right)
    }
    check(property as fn(_, _, _) -> bool)
}

#[test]
fn map_is_flat_map_of_pure() {
    fn property(m: Program, n: u8) -> bool {
        observe(build(&m).map(move |x| x.wrapping_mul(n)))
            == observe(build(&m).flat_map(move |x| RequestDsl::pure(x.wrapping_mul(n))))
    }
    check(property as fn(_, _) -> bool)
}

#[test]
fn filter_keeps_exactly_what_satisfies_the_predicate() {
    fn property(m: Program, n: u8) -> bool {
        let keep = move |x: &u8| *x >= n;
        let (all, submitted) = observe(build(&m));
        let (kept, filtered_submitted) = observe(build(&m).filter(keep));
        kept == all.into_iter().filter(keep).collect::<Vec<_>>() && submitted == filtered_submitted
    }
    check(property as fn(_, _) -> bool)
}

#[test]
fn empty_and_rejected_values_yield_nothing() {
    fn property(x: u8, f: Step) -> bool {
        observe(RequestDsl::empty().filter(|_: &u8| true)) == (vec![], vec![])
            && observe(RequestDsl::pure(x).filter(|_| false)) == (vec![], vec![])
            && observe(RequestDsl::empty().flat_map(step(f))) == (vec![], vec![])
    }
    check(property as fn(_, _) -> bool)
}

#[test]
fn programs_can_be_rerun() {
    fn property(m: Program) -> bool {
        let program = build(&m);
        observe(program.clone()) == observe(program)
    }
    check(property as fn(_) -> bool)
}
