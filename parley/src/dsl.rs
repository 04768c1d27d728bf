//! The [`RequestDsl`] type: a lazily-interpreted description of dependent requests.

use std::{fmt, iter::FromIterator, marker::PhantomData, sync::Arc};

use crate::{
    run::{self, Run, TryRun},
    Collector, Dispatcher, Executor, Payload, Request, RequestExt, Value,
};

/// One step of a [`Sequence`]: from an erased value to the erased program it continues with.
pub(crate) type Step = Arc<dyn Fn(Payload) -> RequestDsl<Payload> + Send + Sync>;

/// A description of a computation which submits requests and yields values of type `A`.
///
/// Building a `RequestDsl` never performs any I/O: it is a plain, immutable value. Only
/// [`run`](RequestDsl::run)ning it against an [`Executor`] submits requests, and only as fast as
/// the resulting stream is consumed. The same program may be run any number of times (clone it
/// first; cloning is cheap, as requests are shared).
///
/// Programs are built from:
///
/// - [`pure`](RequestDsl::pure), [`empty`](RequestDsl::empty),
///   [`from_option`](RequestDsl::from_option), and [`concat`](RequestDsl::concat) for values,
/// - [`wrap`](RequestDsl::wrap) (or [`From`]) for requests,
///
/// and combined with [`map`](RequestDsl::map), [`filter`](RequestDsl::filter), and
/// [`flat_map`](RequestDsl::flat_map).
///
/// # Examples
///
/// ```
/// use parley::RequestDsl;
///
/// let program = RequestDsl::pure(20)
///     .flat_map(|n| RequestDsl::from_option(if n > 10 { Some(n * 2) } else { None }))
///     .filter(|n| n % 4 == 0)
///     .map(|n| n + 2);
///
/// assert!(matches!(program, RequestDsl::Done(42)));
/// ```
pub enum RequestDsl<A> {
    /// Yield exactly one value, without any I/O.
    Done(A),
    /// Yield nothing.
    Empty,
    /// Submit a request, and yield its decoded response if it succeeds.
    Submit(Arc<dyn Request<Response = A>>),
    /// Run a first program, then for each of its values, in order, run a continuation to
    /// completion. Constructed by [`flat_map`](RequestDsl::flat_map).
    Sequence(Sequence<A>),
    /// Run each part in order, yielding all of their values. Constructed by
    /// [`concat`](RequestDsl::concat).
    Concat(Vec<RequestDsl<A>>),
}

/// The contents of a [`RequestDsl::Sequence`]: a first program, whose value type is erased, and
/// the steps each of its values passes through in turn.
///
/// Every value of `first` is fed to the first step; every value of the program a step returns is
/// fed to the step after it; the values of the programs returned by the last step are the values
/// of the sequence. Adding a step never touches the ones already there, so a chain built one
/// [`flat_map`](RequestDsl::flat_map) at a time holds its steps side by side, not nested.
pub struct Sequence<A> {
    first: Box<RequestDsl<Payload>>,
    // Never empty.
    steps: Vec<Step>,
    output: PhantomData<fn() -> A>,
}

impl<A> Sequence<A> {
    fn new(first: RequestDsl<Payload>, step: Step) -> Self {
        Sequence {
            first: Box::new(first),
            steps: vec![step],
            output: PhantomData,
        }
    }

    /// Append a step, changing the type of the values the sequence yields.
    fn then<B>(self, step: Step) -> Sequence<B> {
        let Sequence {
            first, mut steps, ..
        } = self;
        steps.push(step);
        Sequence {
            first,
            steps,
            output: PhantomData,
        }
    }

    /// The program whose values feed the first step.
    pub fn first(&self) -> &RequestDsl<Payload> {
        &self.first
    }

    /// How many steps each value of [`first`](Sequence::first) passes through.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false`: a sequence has at least one step.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn into_parts(self) -> (RequestDsl<Payload>, Vec<Step>) {
        (*self.first, self.steps)
    }
}

impl<A> RequestDsl<A> {
    /// A program which yields `value` and does nothing else.
    pub fn pure(value: A) -> Self {
        RequestDsl::Done(value)
    }

    /// A program which yields nothing.
    pub fn empty() -> Self {
        RequestDsl::Empty
    }

    /// A program which yields the value, if there is one.
    pub fn from_option(value: Option<A>) -> Self {
        match value {
            Some(value) => RequestDsl::Done(value),
            None => RequestDsl::Empty,
        }
    }

    /// A program which runs each part in order and yields all of their values.
    pub fn concat(parts: impl IntoIterator<Item = RequestDsl<A>>) -> Self {
        let mut parts: Vec<_> = parts.into_iter().collect();
        match parts.len() {
            0 => RequestDsl::Empty,
            1 => parts.remove(0),
            _ => RequestDsl::Concat(parts),
        }
    }
}

impl<A: Send + 'static> RequestDsl<A> {
    /// A program which submits `request` and yields its response if it succeeds.
    pub fn wrap<R: Request<Response = A>>(request: R) -> Self {
        RequestDsl::Submit(Arc::new(request))
    }
}

impl<A: Value> RequestDsl<A> {
    /// Transform every value this program yields.
    ///
    /// A mapped request stays a single request: the function is composed onto its decoding with
    /// [`map_response`](RequestExt::map_response).
    pub fn map<B, F>(self, f: F) -> RequestDsl<B>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Value,
    {
        self.map_shared(Arc::new(f))
    }

    fn map_shared<B: Value>(self, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> RequestDsl<B> {
        match self {
            RequestDsl::Done(a) => RequestDsl::Done(f(a)),
            RequestDsl::Empty => RequestDsl::Empty,
            RequestDsl::Submit(request) => {
                RequestDsl::Submit(Arc::new(request.map_response(move |a| f(a))))
            }
            RequestDsl::Sequence(sequence) => {
                RequestDsl::Sequence(sequence.then(Arc::new(move |payload: Payload| {
                    RequestDsl::Done(Payload::new(f(payload.unerase::<A>())))
                })))
            }
            RequestDsl::Concat(parts) => RequestDsl::Concat(
                parts
                    .into_iter()
                    .map(|part| part.map_shared(f.clone()))
                    .collect(),
            ),
        }
    }

    /// Keep only the values which satisfy `predicate`. Rejected values silently disappear; they
    /// are not errors.
    pub fn filter<P>(self, predicate: P) -> RequestDsl<A>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.filter_shared(Arc::new(predicate))
    }

    fn filter_shared(self, predicate: Arc<dyn Fn(&A) -> bool + Send + Sync>) -> RequestDsl<A> {
        match self {
            RequestDsl::Done(a) => {
                if predicate(&a) {
                    RequestDsl::Done(a)
                } else {
                    RequestDsl::Empty
                }
            }
            RequestDsl::Empty => RequestDsl::Empty,
            RequestDsl::Submit(request) => RequestDsl::Submit(Arc::new(
                request.filter_response(move |a: &A| predicate(a)),
            )),
            RequestDsl::Sequence(sequence) => {
                RequestDsl::Sequence(sequence.then(Arc::new(move |payload: Payload| {
                    let a = payload.unerase::<A>();
                    if predicate(&a) {
                        RequestDsl::Done(Payload::new(a))
                    } else {
                        RequestDsl::Empty
                    }
                })))
            }
            RequestDsl::Concat(parts) => RequestDsl::Concat(
                parts
                    .into_iter()
                    .map(|part| part.filter_shared(predicate.clone()))
                    .collect(),
            ),
        }
    }

    /// For each value this program yields, in order, run the program `f` builds from it to
    /// completion, yielding all of its values.
    ///
    /// Chains of `flat_map` are kept right-associated: the first step of a
    /// [`Sequence`](RequestDsl::Sequence) is always a single request, however long the chain, and
    /// each further `flat_map` adds one step alongside the others.
    pub fn flat_map<B, F>(self, f: F) -> RequestDsl<B>
    where
        F: Fn(A) -> RequestDsl<B> + Send + Sync + 'static,
        B: Value,
    {
        self.flat_map_shared(Arc::new(f))
    }

    fn flat_map_shared<B: Value>(
        self,
        f: Arc<dyn Fn(A) -> RequestDsl<B> + Send + Sync>,
    ) -> RequestDsl<B> {
        match self {
            RequestDsl::Done(a) => f(a),
            RequestDsl::Empty => RequestDsl::Empty,
            RequestDsl::Submit(request) => RequestDsl::Sequence(Sequence::new(
                RequestDsl::Submit(Arc::new(request.map_response(Payload::new))),
                continue_with(f),
            )),
            RequestDsl::Sequence(sequence) => RequestDsl::Sequence(sequence.then(continue_with(f))),
            RequestDsl::Concat(parts) => RequestDsl::Concat(
                parts
                    .into_iter()
                    .map(|part| part.flat_map_shared(f.clone()))
                    .collect(),
            ),
        }
    }

    /// Erase the value type of this program, for interpretation.
    ///
    /// The steps of a sequence already yield erased values, so a sequence only changes its type.
    pub(crate) fn erase(self) -> RequestDsl<Payload> {
        match self {
            RequestDsl::Done(a) => RequestDsl::Done(Payload::new(a)),
            RequestDsl::Empty => RequestDsl::Empty,
            RequestDsl::Submit(request) => {
                RequestDsl::Submit(Arc::new(request.map_response(Payload::new)))
            }
            RequestDsl::Sequence(Sequence { first, steps, .. }) => {
                RequestDsl::Sequence(Sequence {
                    first,
                    steps,
                    output: PhantomData,
                })
            }
            RequestDsl::Concat(parts) => {
                RequestDsl::Concat(parts.into_iter().map(RequestDsl::erase).collect())
            }
        }
    }

    /// Run this program against a fresh flow from `executor`, yielding its values as a stream.
    ///
    /// Requests which are not answered successfully yield nothing; see
    /// [`try_run`](RequestDsl::try_run) to observe them instead.
    pub fn run<E: Executor>(self, executor: &E) -> Run<A, E::Tx, E::Rx> {
        run::run(self, executor)
    }

    /// Run this program over an already-established executor flow.
    pub fn run_over<Tx: Dispatcher, Rx: Collector>(self, tx: Tx, rx: Rx) -> Run<A, Tx, Rx> {
        Run::new(self, tx, rx)
    }

    /// Run this program against a fresh flow from `executor`, yielding its values as a stream of
    /// results in which failed requests appear as errors.
    pub fn try_run<E: Executor>(self, executor: &E) -> TryRun<A, E::Tx, E::Rx> {
        run::try_run(self, executor)
    }

    /// Like [`try_run`](RequestDsl::try_run), over an already-established executor flow.
    pub fn try_run_over<Tx: Dispatcher, Rx: Collector>(self, tx: Tx, rx: Rx) -> TryRun<A, Tx, Rx> {
        TryRun::new(self, tx, rx)
    }
}

/// The step which feeds each value to `f` and continues with the program it builds.
fn continue_with<A: Value, B: Value>(f: Arc<dyn Fn(A) -> RequestDsl<B> + Send + Sync>) -> Step {
    Arc::new(move |payload: Payload| f(payload.unerase::<A>()).erase())
}

impl<A> FromIterator<A> for RequestDsl<A> {
    fn from_iter<I: IntoIterator<Item = A>>(values: I) -> Self {
        RequestDsl::concat(values.into_iter().map(RequestDsl::Done))
    }
}

impl<A> Default for RequestDsl<A> {
    fn default() -> Self {
        RequestDsl::Empty
    }
}

impl<A: Clone> Clone for RequestDsl<A> {
    fn clone(&self) -> Self {
        match self {
            RequestDsl::Done(a) => RequestDsl::Done(a.clone()),
            RequestDsl::Empty => RequestDsl::Empty,
            RequestDsl::Submit(request) => RequestDsl::Submit(request.clone()),
            RequestDsl::Sequence(sequence) => RequestDsl::Sequence(sequence.clone()),
            RequestDsl::Concat(parts) => RequestDsl::Concat(parts.clone()),
        }
    }
}

impl<A> Clone for Sequence<A> {
    fn clone(&self) -> Self {
        Sequence {
            first: self.first.clone(),
            steps: self.steps.clone(),
            output: PhantomData,
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for RequestDsl<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestDsl::Done(a) => f.debug_tuple("Done").field(a).finish(),
            RequestDsl::Empty => f.write_str("Empty"),
            RequestDsl::Submit(request) => f.debug_tuple("Submit").field(request).finish(),
            RequestDsl::Sequence(sequence) => sequence.fmt(f),
            RequestDsl::Concat(parts) => f.debug_tuple("Concat").field(parts).finish(),
        }
    }
}

impl<A> fmt::Debug for Sequence<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("first", &self.first)
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecodeError, RawResponse, Route};

    #[derive(Debug)]
    struct Get(&'static str);

    impl Request for Get {
        type Response = String;

        fn route(&self) -> Route {
            Route::get(self.0)
        }

        fn decode(&self, response: &RawResponse) -> Result<Option<String>, DecodeError> {
            Ok(Some(response.text()))
        }
    }

    fn first_route<A: Send + 'static>(dsl: &RequestDsl<A>) -> Option<Route> {
        match dsl {
            RequestDsl::Submit(request) => Some(request.route()),
            RequestDsl::Sequence(sequence) => first_route(sequence.first()),
            _ => None,
        }
    }

    #[test]
    fn pure_values_reduce_eagerly() {
        let dsl = RequestDsl::pure(3).map(|n| n + 1).filter(|n| *n == 4);
        assert!(matches!(dsl, RequestDsl::Done(4)));
        let dsl = RequestDsl::pure(3).filter(|n| *n > 3);
        assert!(matches!(dsl, RequestDsl::Empty));
    }

    #[test]
    fn empty_absorbs_everything() {
        let dsl = RequestDsl::<u8>::empty()
            .map(|n| n + 1)
            .filter(|_| true)
            .flat_map(RequestDsl::pure);
        assert!(matches!(dsl, RequestDsl::Empty));
    }

    #[test]
    fn from_option_distinguishes_presence() {
        assert!(matches!(RequestDsl::from_option(Some(1)), RequestDsl::Done(1)));
        assert!(matches!(
            RequestDsl::<u8>::from_option(None),
            RequestDsl::Empty
        ));
    }

    #[test]
    fn map_and_filter_stay_inside_a_submit() {
        let dsl = Get("https://example.com/a")
            .wrap()
            .map(|s| s.len())
            .filter(|n| *n > 0);
        match dsl {
            RequestDsl::Submit(request) => {
                assert_eq!(request.decode(&RawResponse::ok("abc")), Ok(Some(3)));
                assert_eq!(request.decode(&RawResponse::ok("")), Ok(None));
            }
            other => panic!("expected a submit, got {:?}", other),
        }
    }

    #[test]
    fn flat_map_chains_stay_right_associated() {
        let dsl = RequestDsl::from(Get("https://example.com/a"))
            .flat_map(|_| Get("https://example.com/b").wrap())
            .flat_map(|_| Get("https://example.com/c").wrap())
            .map(|s| s.len());
        match &dsl {
            RequestDsl::Sequence(sequence) => {
                assert!(matches!(sequence.first(), RequestDsl::Submit(_)));
                assert_eq!(sequence.len(), 3);
            }
            other => panic!("expected a sequence, got {:?}", other),
        }
        assert_eq!(first_route(&dsl), Some(Route::get("https://example.com/a")));
    }

    #[test]
    fn folded_chains_keep_their_steps_side_by_side() {
        let dsl = (0..10_000).fold(Get("https://example.com/a").wrap(), |dsl, _| {
            dsl.flat_map(|_| Get("https://example.com/b").wrap())
        });
        match dsl.clone() {
            RequestDsl::Sequence(sequence) => {
                assert!(matches!(sequence.first(), RequestDsl::Submit(_)));
                assert_eq!(sequence.len(), 10_000);
            }
            other => panic!("expected a sequence, got {:?}", other),
        }
        match dsl.erase() {
            RequestDsl::Sequence(sequence) => assert_eq!(sequence.len(), 10_000),
            other => panic!("expected a sequence, got {:?}", other),
        }
    }

    #[test]
    fn concat_collapses_trivial_cases() {
        assert!(matches!(
            RequestDsl::<u8>::concat(Vec::new()),
            RequestDsl::Empty
        ));
        assert!(matches!(
            RequestDsl::concat(vec![RequestDsl::pure(1)]),
            RequestDsl::Done(1)
        ));
        let dsl: RequestDsl<u8> = vec![1, 2, 3].into_iter().collect();
        match dsl.map(|n| n * 10) {
            RequestDsl::Concat(parts) => {
                let values: Vec<u8> = parts
                    .into_iter()
                    .map(|part| match part {
                        RequestDsl::Done(n) => n,
                        other => panic!("unexpected part {:?}", other),
                    })
                    .collect();
                assert_eq!(values, vec![10, 20, 30]);
            }
            other => panic!("expected a concat, got {:?}", other),
        }
    }
}
