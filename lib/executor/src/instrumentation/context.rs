use std::marker::PhantomData;

use crate::{
    execution::error::{ExecutionError, FieldError},
    response::value::Value,
};

/// Why a phase ended without a result.
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhaseError {
    #[error("{0}")]
    Request(ExecutionError),
    #[error("{0}")]
    Field(FieldError),
    /// A null in a non-null position nulled the field.
    #[error("non-null field resolved to null")]
    NullPropagated,
    /// The phase was dropped before it finished, for example on timeout.
    #[error("phase abandoned")]
    Abandoned,
}

/// Observer of one instrumented phase, returned by the `begin_*` hooks.
///
/// `on_completed` consumes the context, so it runs at most once.
pub trait InstrumentationContext<T: ?Sized>: Send {
    /// The phase handed its work off and is now waiting for it.
    fn on_dispatched(&mut self) {}

    fn on_completed(self: Box<Self>, result: Result<&T, &PhaseError>);
}

pub struct SimpleInstrumentationContext<T: ?Sized, F> {
    on_completed: F,
    phantom: PhantomData<fn(&T)>,
}

impl<T: ?Sized, F> InstrumentationContext<T> for SimpleInstrumentationContext<T, F>
where
    F: FnOnce(Result<&T, &PhaseError>) + Send,
{
    fn on_completed(self: Box<Self>, result: Result<&T, &PhaseError>) {
        let this = *self;
        (this.on_completed)(result)
    }
}

/// Context that only observes completion.
pub fn when_completed<T, F>(on_completed: F) -> Option<Box<dyn InstrumentationContext<T>>>
where
    T: ?Sized + 'static,
    F: FnOnce(Result<&T, &PhaseError>) + Send + 'static,
{
    Some(Box::new(SimpleInstrumentationContext {
        on_completed,
        phantom: PhantomData,
    }))
}

/// Incremental observer of a resolver invocation.
///
/// `on_fetched_value` sees the raw resolver output before `on_completed`.
pub trait FieldFetchingContext: InstrumentationContext<Value> {
    fn on_fetched_value(&mut self, _value: &Value) {}
}

/// Presents a whole-result fetch context as a [`FieldFetchingContext`].
pub struct FieldFetchingContextAdapter {
    delegate: Box<dyn InstrumentationContext<Value>>,
}

impl FieldFetchingContextAdapter {
    pub fn new(delegate: Box<dyn InstrumentationContext<Value>>) -> Self {
        FieldFetchingContextAdapter { delegate }
    }
}

impl InstrumentationContext<Value> for FieldFetchingContextAdapter {
    fn on_dispatched(&mut self) {
        self.delegate.on_dispatched();
    }

    fn on_completed(self: Box<Self>, result: Result<&Value, &PhaseError>) {
        self.delegate.on_completed(result);
    }
}

impl FieldFetchingContext for FieldFetchingContextAdapter {}

/// Completes its context exactly once.
///
/// Dropping the guard before `complete` reports [`PhaseError::Abandoned`].
pub struct PhaseGuard<T: ?Sized + 'static> {
    context: Option<Box<dyn InstrumentationContext<T>>>,
}

impl<T: ?Sized + 'static> PhaseGuard<T> {
    pub fn new(context: Option<Box<dyn InstrumentationContext<T>>>) -> Self {
        PhaseGuard { context }
    }

    pub fn dispatched(&mut self) {
        if let Some(context) = self.context.as_mut() {
            context.on_dispatched();
        }
    }

    pub fn complete(mut self, result: Result<&T, &PhaseError>) {
        if let Some(context) = self.context.take() {
            context.on_completed(result);
        }
    }
}

impl<T: ?Sized + 'static> Drop for PhaseGuard<T> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            context.on_completed(Err(&PhaseError::Abandoned));
        }
    }
}

/// [`PhaseGuard`] for the incremental field fetching context.
pub struct FieldFetchingGuard {
    context: Option<Box<dyn FieldFetchingContext>>,
}

impl FieldFetchingGuard {
    pub fn new(context: Option<Box<dyn FieldFetchingContext>>) -> Self {
        FieldFetchingGuard { context }
    }

    pub fn dispatched(&mut self) {
        if let Some(context) = self.context.as_mut() {
            context.on_dispatched();
        }
    }

    pub fn fetched(&mut self, value: &Value) {
        if let Some(context) = self.context.as_mut() {
            context.on_fetched_value(value);
        }
    }

    pub fn complete(mut self, result: Result<&Value, &PhaseError>) {
        if let Some(context) = self.context.take() {
            context.on_completed(result);
        }
    }
}

impl Drop for FieldFetchingGuard {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            context.on_completed(Err(&PhaseError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{
        when_completed, FieldFetchingContext, FieldFetchingContextAdapter, FieldFetchingGuard,
        PhaseError, PhaseGuard,
    };
    use crate::response::value::Value;

    fn recording(log: &Arc<Mutex<Vec<String>>>) -> PhaseGuard<Value> {
        let log = log.clone();
        PhaseGuard::new(when_completed(move |result: Result<&Value, &PhaseError>| {
            log.lock().unwrap().push(match result {
                Ok(value) => format!("ok {}", value),
                Err(error) => format!("err {}", error),
            });
        }))
    }

    #[test]
    fn completes_once_with_result_or_abandoned() {
        let log = Arc::new(Mutex::new(Vec::new()));

        recording(&log).complete(Ok(&Value::from(1)));
        drop(recording(&log));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["ok 1".to_string(), "err phase abandoned".to_string()]
        );
    }

    #[test]
    fn adapter_forwards_completion_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder = log.clone();
        let delegate = when_completed(move |result: Result<&Value, &PhaseError>| {
            recorder
                .lock()
                .unwrap()
                .push(format!("completed {}", result.is_ok()));
        });
        let adapter: Box<dyn FieldFetchingContext> =
            Box::new(FieldFetchingContextAdapter::new(delegate.unwrap()));

        let mut guard = FieldFetchingGuard::new(Some(adapter));
        guard.dispatched();
        guard.fetched(&Value::from("raw"));
        guard.complete(Ok(&Value::from("raw")));

        assert_eq!(*log.lock().unwrap(), vec!["completed true".to_string()]);
    }
}
