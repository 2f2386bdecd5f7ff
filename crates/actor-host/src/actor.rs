//! # Keyed Actor Host
//!
//! This module defines the [`ActorHost`], the router that owns one mailbox per key and the
//! workers behind them. It implements the "Server" side of the Actor Model, one level
//! higher than a single actor: every key behaves like its own actor.

use crate::client::HostClient;
use crate::clock::Clock;
use crate::config::HostConfig;
use crate::handler::{HostContext, KeyedHandler};
use crate::message::{HostRequest, IdleNotice, KeyRequest};
use crate::store::StateStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// The router that admits requests and serializes them per key.
///
/// # Concurrency Model
/// The router itself never runs handler code. For every key it sees, it spawns a worker
/// task that drains that key's mailbox *sequentially*. This gives:
///
/// * **Single writer per key**: at most one [`KeyedHandler::handle`] call for a key is in
///   flight; later requests for the same key queue in its mailbox.
/// * **Parallelism across keys**: workers for different keys run as independent Tokio
///   tasks, so a slow handler for one key never delays another key.
/// * **No locks in handlers**: the key's state is only ever touched by its own worker.
///
/// Worker mailboxes are unbounded so that one busy key cannot stall the router; the
/// router mailbox is bounded by [`HostConfig::mailbox_size`] and provides backpressure.
///
/// # Worker Retirement
/// A worker whose mailbox stays empty for [`HostConfig::idle_timeout`] sends the router an
/// [`IdleNotice`] and keeps waiting. The router retires it only if the notice comes from the
/// current worker for that key and every request sent to it has been received; it then drops
/// the mailbox sender and the worker exits. A later request for the key spawns a fresh
/// worker. Since the old worker had nothing left to run, two workers never overlap on a key.
///
/// # Usage Pattern
///
/// 1.  **Create**: `ActorHost::new()` returns the host (server) and a [`HostClient`].
/// 2.  **Run**: spawn `host.run()` on the runtime.
/// 3.  **Use**: clone the client wherever requests originate.
/// 4.  **Stop**: drop every client, then await the run task.
pub struct ActorHost<H: KeyedHandler> {
    receiver: mpsc::Receiver<HostRequest<H>>,
    handler: Arc<H>,
    store: Arc<dyn StateStore<H::State>>,
    clock: Arc<dyn Clock>,
    idle_timeout: Option<Duration>,
    workers: HashMap<String, WorkerSlot<H>>,
    tasks: JoinSet<()>,
    idle_tx: mpsc::UnboundedSender<IdleNotice>,
    idle_rx: mpsc::UnboundedReceiver<IdleNotice>,
    next_generation: u64,
}

/// The router's side of one live worker.
struct WorkerSlot<H: KeyedHandler> {
    sender: mpsc::UnboundedSender<KeyRequest<H>>,
    generation: u64,
    /// Requests handed to this worker so far.
    sent: u64,
}

enum Event<H: KeyedHandler> {
    Request(HostRequest<H>),
    Idle(IdleNotice),
    Exited(Result<(), JoinError>),
}

impl<H: KeyedHandler> ActorHost<H> {
    /// Creates a new host and its associated client.
    pub fn new(
        config: &HostConfig,
        handler: H,
        store: Arc<dyn StateStore<H::State>>,
        clock: Arc<dyn Clock>,
    ) -> (Self, HostClient<H>) {
        let (sender, receiver) = mpsc::channel(config.mailbox_size.max(1));
        let (idle_tx, idle_rx) = mpsc::unbounded_channel();
        let host = Self {
            receiver,
            handler: Arc::new(handler),
            store,
            clock,
            idle_timeout: config.idle_timeout,
            workers: HashMap::new(),
            tasks: JoinSet::new(),
            idle_tx,
            idle_rx,
            next_generation: 0,
        };
        (host, HostClient::new(sender))
    }

    /// Runs the router loop until every client has been dropped, then waits for all
    /// workers to drain their mailboxes.
    pub async fn run(mut self) {
        // e.g. "Orchestrator<Lead>" instead of the full module path
        let handler_type = std::any::type_name::<H>()
            .rsplit("::")
            .next()
            .unwrap_or("Unknown");
        info!(handler_type, idle_timeout = ?self.idle_timeout, "Host started");

        loop {
            let event = tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(msg) => Event::Request(msg),
                    None => break,
                },
                Some(notice) = self.idle_rx.recv() => Event::Idle(notice),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    Event::Exited(joined)
                }
            };
            match event {
                Event::Request(HostRequest::Invoke {
                    key,
                    request,
                    respond_to,
                }) => self.dispatch(
                    key,
                    KeyRequest::Invoke {
                        request,
                        respond_to,
                    },
                    handler_type,
                ),
                Event::Request(HostRequest::Read { key, respond_to }) => {
                    self.dispatch(key, KeyRequest::Read { respond_to }, handler_type)
                }
                Event::Request(HostRequest::Workers { respond_to }) => {
                    let _ = respond_to.send(self.workers.len());
                }
                Event::Idle(notice) => self.retire(notice, handler_type),
                Event::Exited(Err(e)) => warn!(handler_type, error = %e, "Key worker failed"),
                Event::Exited(Ok(())) => {}
            }
        }

        let workers = self.workers.len();
        // Closing the worker mailboxes lets each worker finish its queue and exit.
        self.workers.clear();
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                warn!(handler_type, error = %e, "Key worker failed");
            }
        }
        info!(handler_type, workers, "Shutdown");
    }

    fn dispatch(&mut self, key: String, request: KeyRequest<H>, handler_type: &'static str) {
        let request = match self.workers.get_mut(&key) {
            Some(worker) => match worker.sender.send(request) {
                Ok(()) => {
                    worker.sent += 1;
                    return;
                }
                // The previous worker died (handler panic); its mailbox is gone with it.
                Err(mpsc::error::SendError(request)) => {
                    warn!(handler_type, %key, "Key worker gone, restarting");
                    request
                }
            },
            None => request,
        };

        let mut worker = self.spawn_worker(key.clone(), handler_type);
        match worker.sender.send(request) {
            Ok(()) => worker.sent += 1,
            Err(_) => warn!(handler_type, %key, "Fresh key worker rejected request"),
        }
        self.workers.insert(key, worker);
    }

    fn retire(&mut self, notice: IdleNotice, handler_type: &'static str) {
        let drained = matches!(
            self.workers.get(&notice.key),
            Some(worker) if worker.generation == notice.generation && worker.sent == notice.received
        );
        if drained {
            // Dropping the sender closes the mailbox; the worker exits on its next receive.
            self.workers.remove(&notice.key);
            debug!(handler_type, key = %notice.key, "Key worker retired");
        }
    }

    fn spawn_worker(&mut self, key: String, handler_type: &'static str) -> WorkerSlot<H> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let generation = self.next_generation;
        self.next_generation += 1;
        let worker = KeyWorker {
            key,
            generation,
            receiver,
            handler: self.handler.clone(),
            store: self.store.clone(),
            clock: self.clock.clone(),
            idle_timeout: self.idle_timeout,
            idle_tx: self.idle_tx.clone(),
        };
        self.tasks.spawn(worker.run(handler_type));
        WorkerSlot {
            sender,
            generation,
            sent: 0,
        }
    }
}

/// Sequential executor for one key.
struct KeyWorker<H: KeyedHandler> {
    key: String,
    generation: u64,
    receiver: mpsc::UnboundedReceiver<KeyRequest<H>>,
    handler: Arc<H>,
    store: Arc<dyn StateStore<H::State>>,
    clock: Arc<dyn Clock>,
    idle_timeout: Option<Duration>,
    idle_tx: mpsc::UnboundedSender<IdleNotice>,
}

impl<H: KeyedHandler> KeyWorker<H> {
    async fn run(mut self, handler_type: &'static str) {
        let key = self.key.clone();
        debug!(handler_type, %key, generation = self.generation, "Key worker started");

        let mut received = 0u64;
        let mut offered = false;
        loop {
            let next = match self.idle_timeout {
                Some(idle) if !offered => {
                    match tokio::time::timeout(idle, self.receiver.recv()).await {
                        Ok(next) => next,
                        Err(_) => {
                            // Keep waiting: the router either retires us or sends more work.
                            let _ = self.idle_tx.send(IdleNotice {
                                key: key.clone(),
                                generation: self.generation,
                                received,
                            });
                            offered = true;
                            continue;
                        }
                    }
                }
                _ => self.receiver.recv().await,
            };
            let Some(msg) = next else {
                break;
            };
            received += 1;
            offered = false;

            match msg {
                KeyRequest::Invoke {
                    request,
                    respond_to,
                } => {
                    debug!(handler_type, %key, ?request, "Invoke");
                    let ctx = HostContext::new(key.clone(), self.clock.now(), self.store.clone());
                    let result = self.handler.handle(request, &ctx).await;
                    if let Err(e) = &result {
                        warn!(handler_type, %key, error = %e, "Invoke failed");
                    }
                    let _ = respond_to.send(result);
                }
                KeyRequest::Read { respond_to } => {
                    let result = self.store.load(&key).await;
                    debug!(handler_type, %key, found = matches!(result, Ok(Some(_))), "Read");
                    let _ = respond_to.send(result);
                }
            }
        }

        debug!(handler_type, %key, "Key worker stopped");
    }
}
