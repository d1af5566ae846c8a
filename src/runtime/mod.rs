//! Async execution
//!
//! Dispatches are blocking calls into backend code, so they run on tokio's
//! blocking pool. The caller's `ExecutionContext` is moved into the
//! scheduled closure and handed to the work as an argument.
//!
//! Work starts as soon as it is scheduled. Dropping the returned future
//! does not cancel it; the result is discarded.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::backend::{ActionDispatcher, ActionInput, ActionOutput, DispatchError, DispatchResult};
use crate::config::RuntimeConfig;
use crate::core::ExecutionContext;
use crate::observability::Event;

/// Build a multi-threaded runtime sized by `config`
pub fn build_runtime(config: &RuntimeConfig) -> std::io::Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder
        .enable_all()
        .max_blocking_threads(config.max_blocking_threads)
        .thread_name(config.thread_name.clone());
    if let Some(threads) = config.worker_threads {
        builder.worker_threads(threads);
    }
    builder.build()
}

/// Schedules dispatches on a runtime's blocking pool
#[derive(Debug, Clone)]
pub struct AsyncDispatcher {
    dispatcher: Arc<ActionDispatcher>,
    handle: Handle,
}

impl AsyncDispatcher {
    pub fn new(dispatcher: Arc<ActionDispatcher>, handle: Handle) -> Self {
        Self { dispatcher, handle }
    }

    /// Use the runtime the caller is running on, if any
    pub fn try_current(dispatcher: Arc<ActionDispatcher>) -> Option<Self> {
        Handle::try_current()
            .ok()
            .map(|handle| Self::new(dispatcher, handle))
    }

    pub fn dispatcher(&self) -> &Arc<ActionDispatcher> {
        &self.dispatcher
    }

    /// Run `work` on the blocking pool with `ctx` as its context
    pub fn run_async<F, R>(&self, ctx: ExecutionContext, work: F) -> ActionFuture<R>
    where
        F: FnOnce(&ExecutionContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        debug!(
            target: "backplane::runtime",
            event = Event::AsyncScheduled.as_str(),
            session = %ctx.session().id,
            "work scheduled"
        );
        let handle = self.handle.spawn_blocking(move || {
            let result = work(&ctx);
            debug!(
                target: "backplane::runtime",
                event = Event::AsyncComplete.as_str(),
                session = %ctx.session().id,
                "work complete"
            );
            result
        });
        ActionFuture { handle }
    }

    /// Dispatch one action on the blocking pool
    pub fn dispatch_async(&self, ctx: ExecutionContext, input: ActionInput) -> DispatchFuture {
        let dispatcher = Arc::clone(&self.dispatcher);
        DispatchFuture {
            inner: self.run_async(ctx, move |ctx| dispatcher.dispatch(ctx, input)),
        }
    }

    /// Block the current thread on a future.
    ///
    /// Panics when called from within an async context, like
    /// `tokio::runtime::Handle::block_on`.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }
}

/// Result of scheduled work
#[must_use = "dropping the future discards the result; the work still runs"]
pub struct ActionFuture<R> {
    handle: JoinHandle<R>,
}

impl<R> ActionFuture<R> {
    /// True once the work has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<R> Future for ActionFuture<R> {
    type Output = DispatchResult<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| joined.map_err(join_error))
    }
}

/// Result of `dispatch_async`
#[must_use = "dropping the future discards the result; the dispatch still runs"]
pub struct DispatchFuture {
    inner: ActionFuture<DispatchResult<ActionOutput>>,
}

impl Future for DispatchFuture {
    type Output = DispatchResult<ActionOutput>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx).map(|joined| joined.and_then(|r| r))
    }
}

fn join_error(error: JoinError) -> DispatchError {
    if error.is_panic() {
        let message = panic_message(error.into_panic());
        warn!(
            target: "backplane::runtime",
            event = Event::AsyncPanicked.as_str(),
            panic = %message,
            "scheduled work panicked"
        );
        DispatchError::WorkerPanicked(message)
    } else {
        DispatchError::Internal(format!("scheduled work did not finish: {}", error))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
