//! Deferred actions for servers that are offline.
//!
//! While a server is offline, queueable actions wait here, in order, per
//! server. Their answers stay pending until the server reconnects and the
//! queue is replayed. Enqueueing curates the queue: an action that would
//! repeat a queued one joins it as a follower instead of being queued
//! twice, and a newer description edit replaces the queued one.

use p4runner_concurrency::Promise;
use p4runner_core::{ActionId, ConnectionContext, Result, ServerName};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

use crate::request::Envelope;
use crate::{Command, Output};

/// An action waiting for its server to come back.
pub(crate) struct QueuedAction {
    pub context: ConnectionContext,
    pub envelope: Envelope,
    pub promise: Promise<Output>,
    /// Promises of curated duplicates; they settle with this action's outcome
    pub followers: Vec<Promise<Output>>,
}

impl QueuedAction {
    pub fn new(context: ConnectionContext, envelope: Envelope, promise: Promise<Output>) -> Self {
        Self {
            context,
            envelope,
            promise,
            followers: Vec::new(),
        }
    }

    /// Settle the action and every follower with `outcome`.
    pub fn settle(self, outcome: Result<Output>) {
        for follower in self.followers {
            follower.complete(outcome.clone());
        }
        self.promise.complete(outcome);
    }
}

/// Read-only view of one queued action.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    /// Identity the action will be dispatched under
    pub action_id: Option<ActionId>,
    /// Context it will run against
    pub context: ConnectionContext,
    /// The queued command
    pub command: Command,
    /// Number of curated duplicates riding on this action
    pub followers: usize,
}

enum Curation {
    /// The added action repeats the queued one
    Follow,
    /// The added action replaces the queued one
    Supersede,
}

fn curate(queued: &QueuedAction, added: &QueuedAction) -> Option<Curation> {
    if queued.context != added.context {
        return None;
    }
    match (&queued.envelope.command, &added.envelope.command) {
        // Two placeholder ids are two different jobs
        (Command::CreateJob(a), Command::CreateJob(b))
            if a.job.id == b.job.id && !a.job.id.is_new() =>
        {
            Some(Curation::Follow)
        }
        (Command::AddJobToChangelist(a), Command::AddJobToChangelist(b)) if a == b => {
            Some(Curation::Follow)
        }
        (Command::EditChangelistDescription(a), Command::EditChangelistDescription(b))
            if a.changelist == b.changelist =>
        {
            Some(Curation::Supersede)
        }
        _ => None,
    }
}

/// Per-server FIFO of deferred actions.
#[derive(Default)]
pub(crate) struct PendingActionQueue {
    queues: Mutex<HashMap<ServerName, VecDeque<QueuedAction>>>,
}

impl PendingActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn enqueue(&self, server: &ServerName, added: QueuedAction) {
        let _ = self.enqueue_while(server, added, || true);
    }

    /// Queue `added` for `server`, folding it into a matching queued action,
    /// but only if `still_offline` holds once the queue is locked.
    ///
    /// Reconnecting flips the server online before it takes the queue, and
    /// taking needs the same lock, so an action is either queued before the
    /// take or handed back here to run directly.
    pub fn enqueue_while(
        &self,
        server: &ServerName,
        added: QueuedAction,
        still_offline: impl FnOnce() -> bool,
    ) -> std::result::Result<(), QueuedAction> {
        let mut queues = self.queues.lock();
        if !still_offline() {
            return Err(added);
        }
        let queue = queues.entry(server.clone()).or_default();

        let matched = queue
            .iter()
            .enumerate()
            .find_map(|(i, queued)| curate(queued, &added).map(|c| (i, c)));

        match matched {
            Some((i, Curation::Follow)) => {
                debug!(
                    %server,
                    command = added.envelope.command.name(),
                    "offline action folded into queued duplicate"
                );
                let QueuedAction {
                    promise, followers, ..
                } = added;
                let target = &mut queue[i];
                target.followers.push(promise);
                target.followers.extend(followers);
            }
            Some((i, Curation::Supersede)) => {
                debug!(
                    %server,
                    command = added.envelope.command.name(),
                    "offline action replaces queued one"
                );
                let replaced = std::mem::replace(&mut queue[i], added);
                let target = &mut queue[i];
                target.followers.push(replaced.promise);
                target.followers.extend(replaced.followers);
            }
            None => {
                debug!(
                    %server,
                    command = added.envelope.command.name(),
                    depth = queue.len() + 1,
                    "offline action queued"
                );
                queue.push_back(added);
            }
        }
        Ok(())
    }

    /// Remove and return everything queued for `server`.
    pub fn take(&self, server: &ServerName) -> VecDeque<QueuedAction> {
        self.queues.lock().remove(server).unwrap_or_default()
    }

    /// Put unreplayed actions back at the head of `server`'s queue.
    ///
    /// Anything queued meanwhile stays behind them.
    pub fn restore_front(&self, server: &ServerName, mut remaining: VecDeque<QueuedAction>) {
        if remaining.is_empty() {
            return;
        }
        let mut queues = self.queues.lock();
        let queue = queues.entry(server.clone()).or_default();
        remaining.append(queue);
        *queue = remaining;
    }

    /// Number of queued actions for `server` (followers not counted)
    pub fn len(&self, server: &ServerName) -> usize {
        self.queues.lock().get(server).map_or(0, VecDeque::len)
    }

    /// Snapshot of `server`'s queue in replay order.
    pub fn snapshot(&self, server: &ServerName) -> Vec<PendingAction> {
        self.queues
            .lock()
            .get(server)
            .map(|queue| {
                queue
                    .iter()
                    .map(|q| PendingAction {
                        action_id: q.envelope.action_id,
                        context: q.context.clone(),
                        command: q.envelope.command.clone(),
                        followers: q.followers.len(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
