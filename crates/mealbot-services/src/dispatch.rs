//! Deferred reply execution.
//!
//! The webhook has already answered with a placeholder by the time a job
//! lands here, so the agent's answer can only reach the user by push.
//! Each chat identity gets its own FIFO queue drained by a single worker
//! task: two messages from one user are answered in arrival order and
//! never run the agent concurrently, while different users proceed in
//! parallel. Queues are bounded; a full queue rejects the new message.
//! A worker retires once its queue has been idle for a while.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mealbot_channels::NotificationPusher;
use mealbot_core::ReplyAgent;
use mealbot_types::{ChatIdentity, Profile};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// How long an identity's worker waits for more work before exiting.
const DEFAULT_IDLE: Duration = Duration::from_secs(60);

/// Why a job was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// [`Dispatcher::shutdown`] has been called.
    ShuttingDown,
    /// The identity already has `depth` messages waiting.
    QueueFull,
}

/// One message waiting for an agent reply.
#[derive(Debug, Clone)]
pub struct DeferredReply {
    /// Who asked, and who the answer is pushed to.
    pub identity: ChatIdentity,
    /// The user's message as received.
    pub text: String,
    /// Customer profile handed to the agent as context, if registered.
    pub profile: Option<Profile>,
}

type Queues = HashMap<ChatIdentity, mpsc::Sender<DeferredReply>>;

struct Inner {
    agent: Arc<dyn ReplyAgent>,
    pusher: NotificationPusher,
    queues: Mutex<Queues>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    idle: Duration,
    depth: usize,
}

/// Per-identity serialized job runner.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// `depth` is the number of messages one identity may have waiting.
    pub fn new(agent: Arc<dyn ReplyAgent>, pusher: NotificationPusher, depth: usize) -> Self {
        Self::with_idle(agent, pusher, depth, DEFAULT_IDLE)
    }

    /// Like [`Dispatcher::new`], with a custom idle timeout after which an
    /// identity's worker exits.
    pub fn with_idle(
        agent: Arc<dyn ReplyAgent>,
        pusher: NotificationPusher,
        depth: usize,
        idle: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                agent,
                pusher,
                queues: Mutex::new(HashMap::new()),
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
                idle,
                depth: depth.max(1),
            }),
        }
    }

    /// Queue a job behind earlier jobs for the same identity.
    pub fn enqueue(&self, job: DeferredReply) -> Result<(), Rejected> {
        let mut queues = self.inner.lock_queues();
        if self.inner.shutdown.is_cancelled() {
            warn!(chat_identity = %job.identity, "dispatcher shutting down, job dropped");
            return Err(Rejected::ShuttingDown);
        }

        let identity = job.identity.clone();
        let job = match queues.get(&identity) {
            Some(tx) => match tx.try_send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(chat_identity = %identity, "reply queue full, job dropped");
                    return Err(Rejected::QueueFull);
                }
                // Worker gone without deregistering; start a fresh one.
                Err(mpsc::error::TrySendError::Closed(job)) => job,
            },
            None => job,
        };

        let (tx, rx) = mpsc::channel(self.inner.depth);
        // Capacity is at least one and `rx` is alive, so this cannot fail.
        if let Err(e) = tx.try_send(job) {
            warn!(chat_identity = %identity, error = %e, "fresh reply queue refused job");
            return Err(Rejected::QueueFull);
        }
        queues.insert(identity.clone(), tx);
        drop(queues);

        debug!(chat_identity = %identity, "starting reply worker");
        let inner = self.inner.clone();
        self.inner.tracker.spawn(async move {
            inner.work(identity, rx).await;
        });
        Ok(())
    }

    /// Identities that currently have a worker.
    pub fn active_identities(&self) -> usize {
        self.inner.lock_queues().len()
    }

    /// Stop accepting jobs and wait up to `grace` for queued ones to finish.
    ///
    /// Returns `true` if everything drained in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        let drained = tokio::time::timeout(grace, self.inner.tracker.wait())
            .await
            .is_ok();
        if drained {
            info!("deferred replies drained");
        } else {
            warn!(
                grace_secs = grace.as_secs(),
                remaining = self.inner.tracker.len(),
                "shutdown grace period elapsed with replies still running"
            );
        }
        drained
    }
}

impl Inner {
    fn lock_queues(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn work(&self, identity: ChatIdentity, mut rx: mpsc::Receiver<DeferredReply>) {
        loop {
            let next = tokio::select! {
                job = rx.recv() => job,
                _ = tokio::time::sleep(self.idle) => None,
                _ = self.shutdown.cancelled() => None,
            };
            if let Some(job) = next {
                self.run(job).await;
                continue;
            }

            // Deregister under the lock so no sender can slip a job in
            // after the last check.
            let leftover = {
                let mut queues = self.lock_queues();
                match rx.try_recv() {
                    Ok(job) => Some(job),
                    Err(_) => {
                        queues.remove(&identity);
                        None
                    }
                }
            };
            match leftover {
                Some(job) => self.run(job).await,
                None => break,
            }
        }
        debug!(chat_identity = %identity, "reply worker retired");
    }

    async fn run(&self, job: DeferredReply) {
        let reply = self
            .agent
            .reply(&job.identity, &job.text, job.profile.as_ref())
            .await;
        self.pusher.push(&job.identity, &reply).await;
    }
}
