//! The serial mutation worker.
//!
//! A single tokio task drains an unbounded channel of [`Unit`]s. Each unit
//! runs to completion, both hooks included, before the next one is received,
//! which is what keeps commits and deliveries in submission order.
//!
//! Per unit:
//!
//! 1. the `before` hook runs on the completion context
//! 2. the committed snapshot and comparator are captured
//! 3. the plan is computed on the blocking pool; a panic there fails only this unit
//! 4. the new sequence is committed and published to subscribers
//! 5. the `after` hook receives the [`Changes`] or the error

use super::config::SourceConfig;
use super::context::{panic_message, CompletionContext, Job};
use super::state::{Committed, SharedState};
use crate::comparator::Comparator;
use crate::error::{Result, SourceError};
use crate::merge::{check_sorted, plan_add, plan_remove, plan_reset, plan_resort, Planned};
use crate::types::{Changes, MutationKind, SourceItem};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinError;

pub(crate) type BeforeHook = Box<dyn FnOnce() + Send + 'static>;
pub(crate) type AfterHook<T> = Box<dyn FnOnce(Result<Changes<T>>) + Send + 'static>;

/// A requested mutation.
pub(crate) enum Mutation<T> {
    Add(Vec<T>),
    Remove(Vec<T>),
    Reset(Vec<T>),
    SetComparator(Comparator<T>),
}

impl<T> Mutation<T> {
    fn kind(&self) -> MutationKind {
        match self {
            Mutation::Add(_) => MutationKind::Add,
            Mutation::Remove(_) => MutationKind::Remove,
            Mutation::Reset(_) => MutationKind::Reset,
            Mutation::SetComparator(_) => MutationKind::Resort,
        }
    }
}

/// One queued unit of work.
pub(crate) struct Unit<T> {
    pub mutation: Mutation<T>,
    pub before: Option<BeforeHook>,
    pub after: AfterHook<T>,
}

/// Submission side of the queue.
pub(crate) type UnitSender<T> = mpsc::UnboundedSender<Unit<T>>;

/// Spawn the worker on the current tokio runtime.
pub(crate) fn spawn<T: SourceItem>(
    state: Arc<SharedState<T>>,
    context: Arc<dyn CompletionContext>,
    config: SourceConfig,
) -> Result<UnitSender<T>> {
    let handle = Handle::try_current().map_err(|_| SourceError::NoRuntime)?;
    let (sender, receiver) = mpsc::unbounded_channel();

    let worker = Worker {
        state,
        context,
        config,
    };
    handle.spawn(worker.run(receiver));
    Ok(sender)
}

struct Worker<T> {
    state: Arc<SharedState<T>>,
    context: Arc<dyn CompletionContext>,
    config: SourceConfig,
}

/// A computed plan, with the comparator to install alongside it.
struct Computed<T> {
    planned: Planned<T>,
    comparator: Option<Comparator<T>>,
}

impl<T: SourceItem> Worker<T> {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<Unit<T>>) {
        let mut next_unit: u64 = 0;
        while let Some(unit) = receiver.recv().await {
            next_unit += 1;
            self.execute(next_unit, unit).await;
        }
        if self.config.enable_logging {
            tracing::debug!(units = next_unit, "mutation queue closed, worker stopping");
        }
    }

    async fn execute(&self, unit_id: u64, unit: Unit<T>) {
        let Unit {
            mutation,
            before,
            after,
        } = unit;
        let kind = mutation.kind();

        if let Some(before) = before {
            self.context.run(before).await;
        }

        let snapshot = self.state.snapshot();
        let validate = self.config.validate_order;
        let outcome =
            tokio::task::spawn_blocking(move || compute(snapshot, mutation, validate)).await;

        let result = match outcome {
            Ok(Ok(computed)) => Ok(self.commit(unit_id, kind, computed)),
            Ok(Err(err)) => {
                tracing::warn!(unit = unit_id, kind = kind.as_str(), error = %err, "mutation rejected");
                Err(err)
            }
            Err(join_error) => {
                let message = join_error_message(join_error);
                tracing::error!(unit = unit_id, kind = kind.as_str(), %message, "mutation unit panicked");
                Err(SourceError::UnitPanicked {
                    unit: unit_id,
                    message,
                })
            }
        };

        let delivery: Job = Box::new(move || after(result));
        self.context.run(delivery).await;
    }

    fn commit(&self, unit_id: u64, kind: MutationKind, computed: Computed<T>) -> Changes<T> {
        let Computed {
            planned,
            comparator,
        } = computed;

        let sequence = self.state.commit(planned.sequence, comparator);
        let changes = Changes {
            kind,
            sequence,
            changes: planned.changes,
        };

        if self.config.enable_logging {
            tracing::debug!(
                unit = unit_id,
                kind = kind.as_str(),
                len = changes.sequence.len(),
                removed = changes.changes.remove.len(),
                inserted = changes.changes.insert.len(),
                reloaded = changes.changes.reload.len(),
                "mutation committed"
            );
        }

        self.state.publish(&changes);
        changes
    }
}

fn compute<T: SourceItem>(
    snapshot: Committed<T>,
    mutation: Mutation<T>,
    validate: bool,
) -> Result<Computed<T>> {
    let Committed {
        items,
        index,
        comparator,
    } = snapshot;

    let computed = match mutation {
        Mutation::Add(batch) => {
            if validate {
                check_sorted(&items, &comparator)?;
            }
            Computed {
                planned: plan_add(&items, &index, batch, &comparator),
                comparator: None,
            }
        }
        Mutation::Remove(batch) => {
            if validate {
                check_sorted(&items, &comparator)?;
            }
            Computed {
                planned: plan_remove(&items, &index, &batch, &comparator),
                comparator: None,
            }
        }
        Mutation::Reset(batch) => Computed {
            planned: plan_reset(items.len(), batch, &comparator),
            comparator: None,
        },
        Mutation::SetComparator(next) => Computed {
            planned: plan_resort(&items, &next),
            comparator: Some(next),
        },
    };
    Ok(computed)
}

fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic().as_ref())
    } else {
        "unit was cancelled".to_string()
    }
}
