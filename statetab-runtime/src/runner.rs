//! Queue-driven asynchronous runner.
//!
//! An [`AsyncRunner`] owns one [`Dispatcher`] and a bounded FIFO queue. A
//! single worker on tokio's blocking pool drains the queue and dispatches each
//! event, so guards and actions may block without stalling the async
//! executor. Any number of producers may submit events.
//!
//! ```text
//!  producers ──send_event──▶ [ bounded mpsc ] ──▶ worker ──on_event──▶ Dispatcher
//!                                                   │
//!                                                   └── watch ──▶ current_state()
//! ```
//!
//! Shutdown is cooperative: [`AsyncRunner::send_exit_event`] enqueues an
//! `EVENT_EXIT` marker and the worker stops when it reaches it, after every
//! event queued ahead of it.

use crate::config::{FailurePolicy, RunnerConfig};
use crate::error::RunnerError;
use parking_lot::Mutex;
use statetab_core::token::EVENT_EXIT;
use statetab_core::{Dispatcher, StateName};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// An item on the runner's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Event(String),
    /// Stops the worker without being dispatched.
    Exit,
}

impl RunnerEvent {
    pub fn parse(name: &str) -> Self {
        if name == EVENT_EXIT {
            RunnerEvent::Exit
        } else {
            RunnerEvent::Event(name.to_string())
        }
    }
}

/// Summary returned by the worker when it stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    /// Events dispatched, not counting the exit marker.
    pub events_processed: u64,
    /// Dispatched events that were handled.
    pub events_handled: u64,
    pub final_state: StateName,
}

/// Asynchronous wrapper around a [`Dispatcher`].
pub struct AsyncRunner {
    label: String,
    tx: mpsc::Sender<RunnerEvent>,
    state_rx: watch::Receiver<StateName>,
    running: Arc<AtomicBool>,
    paused: AtomicBool,
    /// Worker state until `start` hands it to the blocking pool.
    pending: Mutex<Option<Worker>>,
    handle: Mutex<Option<JoinHandle<WorkerReport>>>,
}

impl AsyncRunner {
    /// Creates a runner. The dispatcher is relabelled with the configured
    /// label and must not have been started.
    pub fn new(mut dispatcher: Dispatcher, config: RunnerConfig) -> Self {
        dispatcher.set_label(config.label.clone());
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(dispatcher.current_state().clone());
        let running = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            dispatcher,
            rx,
            state_tx,
            running: Arc::clone(&running),
            policy: config.failure_policy,
        };

        Self {
            label: config.label,
            tx,
            state_rx,
            running,
            paused: AtomicBool::new(false),
            pending: Mutex::new(Some(worker)),
            handle: Mutex::new(None),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Starts the machine and its worker.
    ///
    /// The initial state's entry actions run on the calling thread before
    /// this returns. Must be called from within a tokio runtime. A runner can
    /// be started once.
    pub fn start(&self) -> Result<(), RunnerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| RunnerError::NoRuntime)?;
        let mut worker = self.pending.lock().take().ok_or(RunnerError::AlreadyRunning)?;

        worker.dispatcher.start();
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(fsm = %self.label, state = %worker.dispatcher.current_state(), "runner started");

        let handle = runtime.spawn_blocking(move || worker.run());
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Queues an event, waiting while the queue is full.
    ///
    /// Returns whether the event was queued. Events are dropped while the
    /// runner is paused or not running.
    pub async fn send_event(&self, event: &str) -> bool {
        let Some(item) = self.admit(event) else {
            return false;
        };
        match self.tx.send(item).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(fsm = %self.label, event, "worker gone; event dropped");
                false
            }
        }
    }

    /// Blocking form of [`AsyncRunner::send_event`] for producers on plain
    /// threads. Panics if called from within an async context.
    pub fn blocking_send_event(&self, event: &str) -> bool {
        let Some(item) = self.admit(event) else {
            return false;
        };
        match self.tx.blocking_send(item) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(fsm = %self.label, event, "worker gone; event dropped");
                false
            }
        }
    }

    /// Queues the exit marker.
    pub async fn send_exit_event(&self) -> bool {
        self.send_event(EVENT_EXIT).await
    }

    fn admit(&self, event: &str) -> Option<RunnerEvent> {
        if !self.running.load(Ordering::SeqCst) {
            tracing::debug!(fsm = %self.label, event, "not running; event dropped");
            return None;
        }
        if self.paused.load(Ordering::SeqCst) {
            tracing::debug!(fsm = %self.label, event, "paused; event dropped");
            return None;
        }
        Some(RunnerEvent::parse(event))
    }

    /// Stops accepting events. Events already queued are still processed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Whether the runner accepts events: started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the worker task is still executing.
    pub fn is_alive(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// State after the most recently processed event.
    pub fn current_state(&self) -> StateName {
        self.state_rx.borrow().clone()
    }

    /// Waits until the worker publishes `state`.
    pub async fn wait_for_state(&self, state: &str) -> Result<(), RunnerError> {
        let mut rx = self.state_rx.clone();
        while *rx.borrow_and_update() != state {
            rx.changed()
                .await
                .map_err(|_| RunnerError::WorkerStopped(state.to_string()))?;
        }
        Ok(())
    }

    /// Waits for the worker to stop and returns its report.
    pub async fn join(&self) -> Result<WorkerReport, RunnerError> {
        let handle = self.handle.lock().take().ok_or(RunnerError::NotStarted)?;
        Ok(handle.await?)
    }
}

struct Worker {
    dispatcher: Dispatcher,
    rx: mpsc::Receiver<RunnerEvent>,
    state_tx: watch::Sender<StateName>,
    running: Arc<AtomicBool>,
    policy: FailurePolicy,
}

impl Worker {
    fn run(mut self) -> WorkerReport {
        let _running = RunningGuard(Arc::clone(&self.running));
        let mut processed = 0;
        let mut handled = 0;

        while let Some(item) = self.rx.blocking_recv() {
            let event = match item {
                RunnerEvent::Exit => {
                    tracing::info!(fsm = %self.dispatcher.label(), "exit event received");
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
                RunnerEvent::Event(event) => event,
            };

            processed += 1;
            if self.dispatch(&event) {
                handled += 1;
            }
            self.state_tx
                .send_replace(self.dispatcher.current_state().clone());
        }

        tracing::info!(
            fsm = %self.dispatcher.label(),
            processed,
            handled,
            "worker stopped"
        );
        WorkerReport {
            events_processed: processed,
            events_handled: handled,
            final_state: self.dispatcher.current_state().clone(),
        }
    }

    fn dispatch(&mut self, event: &str) -> bool {
        match self.policy {
            FailurePolicy::Propagate => self.dispatcher.on_event(event),
            FailurePolicy::Isolate => {
                let dispatcher = &mut self.dispatcher;
                match panic::catch_unwind(AssertUnwindSafe(|| dispatcher.on_event(event))) {
                    Ok(handled) => handled,
                    Err(payload) => {
                        tracing::error!(
                            fsm = %self.dispatcher.label(),
                            event,
                            state = %self.dispatcher.current_state(),
                            "capability panicked: {}",
                            panic_message(payload.as_ref())
                        );
                        false
                    }
                }
            }
        }
    }
}

/// Clears the running flag when the worker exits, including by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
