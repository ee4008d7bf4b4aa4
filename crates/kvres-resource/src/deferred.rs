//! Cold, single-value results.
//!
//! A [`Deferred`] holds the store call it will make, not the call's outcome.
//! Building one never touches the store. The call runs exactly once, when the
//! value is consumed, on whichever context consumes it:
//!
//! - `.await` runs it on the polling task
//! - [`Deferred::wait`] runs it on the calling thread
//! - [`Deferred::spawn_blocking`] moves it to tokio's blocking pool
//! - [`Deferred::into_stream`] yields it as a one-item stream
//!
//! Store failures and panics both come back as [`ResourceError`]s; nothing is
//! raised out of the code that merely builds the result.

use std::any::Any;
use std::fmt;
use std::future::IntoFuture;
use std::panic::{self, AssertUnwindSafe};

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{trace, warn};

use crate::error::{ResourceError, ResourceResult};

type Call<T> = Box<dyn FnOnce() -> ResourceResult<T> + Send>;

/// A blocking store call that has not run yet.
#[must_use = "a Deferred does nothing until it is awaited, waited on, or streamed"]
pub struct Deferred<T> {
    call: Call<T>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Wrap `call` without running it.
    pub fn new<F>(call: F) -> Self
    where
        F: FnOnce() -> ResourceResult<T> + Send + 'static,
    {
        Self {
            call: Box::new(call),
        }
    }

    /// A result that is already known to succeed.
    pub fn ready(value: T) -> Self {
        Self::new(move || Ok(value))
    }

    /// A result that is already known to fail.
    pub fn failed(error: ResourceError) -> Self {
        Self::new(move || Err(error))
    }

    /// Run the call on the current thread.
    ///
    /// A panic inside the call is caught and returned as
    /// [`ResourceError::Panicked`].
    pub fn wait(self) -> ResourceResult<T> {
        trace!("running deferred store call");
        match panic::catch_unwind(AssertUnwindSafe(self.call)) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(panic = %message, "deferred store call panicked");
                Err(ResourceError::Panicked(message))
            }
        }
    }

    /// Run the call on tokio's blocking thread pool.
    ///
    /// Must be awaited inside a tokio runtime. If the blocking task is
    /// aborted, the result is [`ResourceError::Cancelled`].
    pub async fn spawn_blocking(self) -> ResourceResult<T> {
        match tokio::task::spawn_blocking(move || self.wait()).await {
            Ok(result) => result,
            Err(e) => Err(ResourceError::Cancelled(e.to_string())),
        }
    }

    /// A stream that runs the call when first polled and yields its single
    /// outcome.
    pub fn into_stream(self) -> BoxStream<'static, ResourceResult<T>> {
        stream::once(self.into_future()).boxed()
    }

    /// Transform the success value once the call has run.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let call = self.call;
        Deferred::new(move || call().map(f))
    }

    /// Chain a fallible step after the call.
    pub fn and_then<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> ResourceResult<U> + Send + 'static,
    {
        let call = self.call;
        Deferred::new(move || call().and_then(f))
    }

    /// Replace a "not found" failure with `default`. Other failures pass
    /// through.
    pub fn recover_not_found(self, default: T) -> Deferred<T> {
        let call = self.call;
        Deferred::new(move || match call() {
            Err(e) if e.is_not_found() => Ok(default),
            other => other,
        })
    }
}

impl<T: Send + 'static> IntoFuture for Deferred<T> {
    type Output = ResourceResult<T>;
    type IntoFuture = BoxFuture<'static, ResourceResult<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait() })
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
