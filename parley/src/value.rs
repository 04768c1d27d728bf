//! Type-erased values flowing between the interpreter and an executor.
//!
//! A [`RequestDsl`](crate::RequestDsl) mixes requests with different response types, while an
//! executor flow carries a single stream of answers. Values cross that boundary as a [`Payload`]:
//! a clonable `dyn Any` which is downcast back to its true type (fixed when the program was
//! built) on the other side.

use std::{any::Any, fmt};

/// Any value which can be carried by a [`RequestDsl`](crate::RequestDsl) while it is being
/// interpreted.
///
/// This is implemented for every `T: Clone + Send + 'static`; you should never need to implement
/// it yourself.
pub trait Value: Any + Send {
    /// Clone this value into a new [`Payload`].
    fn clone_payload(&self) -> Payload;

    /// View this value as `dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Convert this boxed value into a `Box<dyn Any + Send>`, ready to be downcast.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Clone + Send + 'static> Value for T {
    fn clone_payload(&self) -> Payload {
        Payload::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A single type-erased [`Value`].
///
/// Executors hand these back inside [`Answer`](crate::Answer)s; they are usually produced by
/// [`Submission::answer`](crate::Submission::answer) and never need to be inspected.
pub struct Payload(Box<dyn Value>);

impl Payload {
    /// Erase a value.
    pub fn new<T: Value>(value: T) -> Self {
        Payload(Box::new(value))
    }

    /// Check whether this payload holds a value of type `T`.
    pub fn is<T: 'static>(&self) -> bool {
        // Deref explicitly so the call reaches the boxed value, not the box.
        Value::as_any(&*self.0).is::<T>()
    }

    /// Try to recover a value of type `T`, giving back the payload if it holds something else.
    pub fn downcast<T: 'static>(self) -> Result<T, Payload> {
        if !self.is::<T>() {
            return Err(self);
        }
        match Value::into_any(self.0).downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => unreachable!("payload type was checked before downcasting"),
        }
    }

    /// Recover a value whose type is known by construction.
    pub(crate) fn unerase<T: 'static>(self) -> T {
        self.downcast().unwrap_or_else(|_| {
            panic!(
                "payload does not hold a `{}`: a program was erased at the wrong type",
                std::any::type_name::<T>()
            )
        })
    }
}

impl Clone for Payload {
    fn clone(&self) -> Self {
        Value::clone_payload(&*self.0)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_recovers_the_erased_type() {
        let payload = Payload::new(5u32);
        assert!(payload.is::<u32>());
        let payload = payload.downcast::<String>().unwrap_err();
        assert_eq!(payload.downcast::<u32>().unwrap(), 5);
    }

    #[test]
    fn clone_is_deep_and_keeps_the_type() {
        let payload = Payload::new(vec![1u8, 2, 3]);
        let copy = payload.clone();
        assert_eq!(copy.downcast::<Vec<u8>>().unwrap(), vec![1, 2, 3]);
        assert_eq!(payload.downcast::<Vec<u8>>().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn nested_payloads_report_the_outer_type() {
        let payload = Payload::new(Payload::new(7u8));
        assert!(payload.is::<Payload>());
        assert!(!payload.is::<u8>());
        let inner = payload.downcast::<Payload>().unwrap();
        assert_eq!(inner.downcast::<u8>().unwrap(), 7);
    }
}
