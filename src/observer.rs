use crate::errors::ErrorPayload;

/// Receiving side of a stream: anything that accepts `next`, `error` and
/// `complete` notifications.
///
/// Implemented by [`Subscriber`] and by the emitters of every `Subject` variant,
/// which is what lets an emitter be used wherever an observer is expected.
///
/// [`Subscriber`]: crate::subscribe::Subscriber
pub trait Observer {
    type NextFnType;

    fn next(&mut self, _: Self::NextFnType);
    fn complete(&mut self);
    fn error(&mut self, _: ErrorPayload);
}
