//! Turns bus events into running jobs.
//!
//! Each `message/sent` event becomes its own tokio task with its own
//! [`CancellationToken`], registered under the message id so a later
//! `message/cancel` can find it. The report of every finished job goes out
//! on the bus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::{InboundEvent, MessageBus, MessageCancel, MessageSent};
use crate::error::{HelmError, Result};

use super::controller::JobController;
use super::types::MessageJob;

type JobTokens = HashMap<String, CancellationToken>;
type ActiveJobs = Arc<Mutex<JobTokens>>;

fn lock_active(active: &Mutex<JobTokens>) -> MutexGuard<'_, JobTokens> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry entry of one running job. Dropping it frees the message id,
/// including when the job task panics.
struct ActiveEntry {
    active: ActiveJobs,
    message_id: String,
}

impl Drop for ActiveEntry {
    fn drop(&mut self) {
        lock_active(&self.active).remove(&self.message_id);
    }
}

/// Consumes inbound events and runs a [`JobController`] per message.
pub struct Dispatcher {
    controller: Arc<JobController>,
    bus: Arc<MessageBus>,
    active: ActiveJobs,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl Dispatcher {
    pub fn new(controller: Arc<JobController>, bus: Arc<MessageBus>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            controller,
            bus,
            active: Arc::new(Mutex::new(HashMap::new())),
            running: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of jobs currently in flight.
    pub fn active_jobs(&self) -> usize {
        lock_active(&self.active).len()
    }

    /// Run until [`stop`](Self::stop) is called or the inbound side closes.
    ///
    /// On shutdown, events already queued on the bus are still dispatched,
    /// then every job in flight is awaited before this returns. A stop
    /// requested before `start` is honoured: the queue is drained and the
    /// call returns without waiting for new events.
    ///
    /// # Errors
    /// Returns an error if the dispatcher is already running.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HelmError::Config("Dispatcher already running".into()));
        }
        crate::log_component!(info, "dispatcher", "Starting dispatcher");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut tasks = JoinSet::new();

        if *shutdown_rx.borrow_and_update() {
            info!("Shutdown requested before start");
        } else {
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Received shutdown signal");
                            break;
                        }
                    }
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                        if let Err(e) = joined {
                            error!(error = %e, "Job task panicked");
                        }
                    }
                    event = self.bus.consume_inbound() => {
                        match event {
                            Some(event) => self.dispatch(event, &mut tasks),
                            None => {
                                info!("Inbound channel closed");
                                break;
                            }
                        }
                    }
                }
            }
        }

        let mut drained = 0usize;
        while let Some(event) = self.bus.try_consume_inbound().await {
            self.dispatch(event, &mut tasks);
            drained += 1;
        }
        if drained > 0 {
            crate::log_component!(info, "dispatcher", "Dispatched queued events", drained = drained);
        }

        if !tasks.is_empty() {
            crate::log_component!(info, "dispatcher", "Waiting for running jobs", in_flight = tasks.len());
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Job task panicked");
            }
        }

        self.running.store(false, Ordering::SeqCst);
        crate::log_component!(info, "dispatcher", "Dispatcher stopped");
        Ok(())
    }

    /// Signal the loop to stop accepting new events.
    ///
    /// The request is remembered, so calling this before [`start`](Self::start)
    /// makes `start` drain the queue and return.
    pub fn stop(&self) {
        info!("Stopping dispatcher");
        self.shutdown_tx.send_replace(true);
    }

    fn dispatch(&self, event: InboundEvent, tasks: &mut JoinSet<()>) {
        match event {
            InboundEvent::MessageSent(sent) => self.handle_sent(sent, tasks),
            InboundEvent::MessageCancel(cancel) => self.handle_cancel(cancel),
        }
    }

    fn handle_sent(&self, sent: MessageSent, tasks: &mut JoinSet<()>) {
        let cancel = CancellationToken::new();
        {
            let mut active = lock_active(&self.active);
            if active.contains_key(&sent.message_id) {
                warn!(message_id = %sent.message_id, "Job already running for message, ignoring duplicate");
                return;
            }
            active.insert(sent.message_id.clone(), cancel.clone());
        }
        let entry = ActiveEntry {
            active: Arc::clone(&self.active),
            message_id: sent.message_id.clone(),
        };

        let job = MessageJob::from(sent);
        debug!(job_id = %job.job_id, message_id = %job.message_id, "Dispatching job");

        let controller = Arc::clone(&self.controller);
        let bus = Arc::clone(&self.bus);

        tasks.spawn(async move {
            let report = controller.run(&job, &cancel).await;
            drop(entry);
            if let Err(e) = bus.publish_outbound(report).await {
                error!(job_id = %job.job_id, error = %e, "Failed to publish job report");
            }
        });
    }

    fn handle_cancel(&self, cancel: MessageCancel) {
        match lock_active(&self.active).get(&cancel.message_id) {
            Some(token) => {
                info!(message_id = %cancel.message_id, "Cancelling job");
                token.cancel();
            }
            None => {
                debug!(message_id = %cancel.message_id, "No running job for cancel event");
            }
        }
    }
}
