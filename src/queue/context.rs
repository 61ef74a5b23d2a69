//! Completion contexts: where unit hooks run.
//!
//! The mutation worker hands every hook to a [`CompletionContext`] and waits
//! for it to finish before moving on, so hooks observe units strictly in
//! submission order whichever context runs them.
//!
//! | Context | Runs hooks on |
//! |---------|---------------|
//! | [`Inline`] | the worker task itself |
//! | [`ChannelContext`] | whatever task drives the paired [`ContextRunner`] |
//!
//! # Examples
//!
//! ```
//! use ordered_source::queue::{channel_context, CompletionContext};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (context, mut runner) = channel_context();
//!
//! let delivery = tokio::spawn(async move {
//!     context.run(Box::new(|| println!("on the runner"))).await;
//! });
//!
//! assert!(runner.run_next().await);
//! delivery.await.unwrap();
//! # }
//! ```

use async_trait::async_trait;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::{mpsc, oneshot};

/// A unit of hook work handed to a completion context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Strategy deciding where and when hooks run.
///
/// `run` must not return before the job has run (or has been discarded);
/// the worker relies on this to keep deliveries ordered.
#[async_trait]
pub trait CompletionContext: Send + Sync + 'static {
    /// Run `job` and wait for it to finish.
    async fn run(&self, job: Job);
}

/// Runs hooks directly on the worker task.
///
/// A panicking hook is caught and logged; the worker keeps going.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

#[async_trait]
impl CompletionContext for Inline {
    async fn run(&self, job: Job) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            tracing::error!(message = %panic_message(payload.as_ref()), "completion hook panicked");
        }
    }
}

struct Envelope {
    job: Job,
    done: oneshot::Sender<()>,
}

impl Envelope {
    fn execute(self) {
        (self.job)();
        let _ = self.done.send(());
    }
}

/// Forwards hooks to a [`ContextRunner`] driven by the caller.
///
/// Use this to get results delivered on a specific thread, e.g. the task
/// that owns a UI. Create one with [`channel_context`].
#[derive(Clone)]
pub struct ChannelContext {
    sender: mpsc::UnboundedSender<Envelope>,
}

/// The receiving half of a [`ChannelContext`].
///
/// Jobs run on whichever task calls [`run_next`](Self::run_next),
/// [`run_pending`](Self::run_pending) or [`run`](Self::run). A job that panics
/// unwinds into that caller; the worker notices the missing acknowledgement
/// and continues with the next unit.
pub struct ContextRunner {
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

/// Create a connected [`ChannelContext`] / [`ContextRunner`] pair.
pub fn channel_context() -> (ChannelContext, ContextRunner) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelContext { sender }, ContextRunner { receiver })
}

#[async_trait]
impl CompletionContext for ChannelContext {
    async fn run(&self, job: Job) {
        let (done, acknowledged) = oneshot::channel();
        if self.sender.send(Envelope { job, done }).is_err() {
            tracing::warn!("completion runner is gone, discarding hook");
            return;
        }
        if acknowledged.await.is_err() {
            tracing::warn!("hook was dropped before it completed");
        }
    }
}

impl ContextRunner {
    /// Wait for the next job and run it.
    ///
    /// Returns `false` once every [`ChannelContext`] has been dropped and the
    /// queue is empty.
    pub async fn run_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(envelope) => {
                envelope.execute();
                true
            }
            None => false,
        }
    }

    /// Run every job that is already queued, without waiting. Returns how many ran.
    ///
    /// Suited to a frame loop that drains deliveries once per tick.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(envelope) = self.receiver.try_recv() {
            envelope.execute();
            ran += 1;
        }
        ran
    }

    /// Run jobs until every [`ChannelContext`] has been dropped.
    pub async fn run(mut self) {
        while self.run_next().await {}
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
