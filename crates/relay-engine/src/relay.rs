//! Connection manager: owns the single live worker connection and drives
//! its events through classification, consolidation and dispatch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use relay_channels::ChatSink;
use relay_core::config::OUTBOUND_QUEUE_CAPACITY;
use relay_core::RelayError;
use relay_protocol::names::EVENT_TASK_CREATED;
use relay_protocol::{handshake, OutboundFrame, WorkerEvent};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::classifier::{classify, Classification};
use crate::dispatcher::Dispatcher;
use crate::task_buffer::{Step, TaskBuffer};

#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Remember which destination has an active task and tag forwarded
    /// messages with an advisory `new_task` flag.
    pub track_active_task_per_destination: bool,
    /// Frames queued for the worker socket before new ones are dropped.
    pub outbound_capacity: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            track_active_task_per_destination: false,
            outbound_capacity: OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

/// Handle given to the task that drives one worker socket.
///
/// The task writes everything from `outbound` to the socket, feeds every
/// received frame to [`Relay::on_event`], stops when `cancel` fires, and
/// calls [`Relay::on_disconnect`] on exit. Dropping the handle tells
/// [`Relay::shutdown`] that teardown is complete.
pub struct Connection {
    pub id: String,
    pub outbound: mpsc::Receiver<String>,
    pub cancel: CancellationToken,
    _closed: oneshot::Sender<()>,
}

struct Live {
    id: String,
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
    closed: oneshot::Receiver<()>,
}

#[derive(Default)]
pub(crate) struct RelayState {
    live: Option<Live>,
    buffer: TaskBuffer,
    pub(crate) active_destination: Option<String>,
}

impl RelayState {
    fn is_current(&self, conn_id: &str) -> bool {
        self.live.as_ref().is_some_and(|l| l.id == conn_id)
    }

    /// Forget everything tied to the current connection. Returns the number
    /// of discarded buffered tasks.
    fn reset(&mut self) -> usize {
        self.active_destination = None;
        self.buffer.clear()
    }

    /// Queue a frame for the live worker without waiting.
    pub(crate) fn push(&self, frame: &OutboundFrame) -> Result<(), RelayError> {
        let live = self.live.as_ref().ok_or(RelayError::NoConnection)?;
        let json = frame.to_json()?;
        live.outbound.try_send(json).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RelayError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => RelayError::NoConnection,
        })
    }
}

/// The relay between one worker connection and the chat.
///
/// All shared state sits behind one mutex that is only held for
/// suspension-free transitions, never across an `.await`.
pub struct Relay {
    state: Mutex<RelayState>,
    dispatcher: Dispatcher,
    pub(crate) options: RelayOptions,
}

impl Relay {
    pub fn new(sink: Arc<dyn ChatSink>, options: RelayOptions) -> Self {
        Self {
            state: Mutex::new(RelayState::default()),
            dispatcher: Dispatcher::new(sink),
            options,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly connected worker as the current connection.
    ///
    /// Any previous connection is cancelled and all buffered tasks are
    /// discarded. The handshake frame is the first item on `outbound`.
    pub fn accept(&self) -> Connection {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.options.outbound_capacity.max(1));
        let (closed_tx, closed_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        // Fresh channel with capacity >= 1: cannot be full.
        let _ = tx.try_send(handshake::ack_json());

        let (previous, dropped) = {
            let mut st = self.lock();
            let previous = st.live.replace(Live {
                id: id.clone(),
                outbound: tx,
                cancel: cancel.clone(),
                closed: closed_rx,
            });
            (previous, st.reset())
        };

        if let Some(prev) = previous {
            info!(previous = %prev.id, conn_id = %id, dropped_tasks = dropped, "replacing worker connection");
            prev.cancel.cancel();
        }
        info!(conn_id = %id, "worker connected");

        Connection {
            id,
            outbound: rx,
            cancel,
            _closed: closed_tx,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().live.is_some()
    }

    pub fn is_current(&self, conn_id: &str) -> bool {
        self.lock().is_current(conn_id)
    }

    /// Number of tasks currently holding partial content.
    pub fn buffered_tasks(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Process one raw frame received on `conn_id`.
    ///
    /// Callers must await this before feeding the next frame from the same
    /// connection. Frames from a replaced connection are ignored.
    pub async fn on_event(&self, conn_id: &str, raw: &str) {
        let event = match WorkerEvent::parse(raw) {
            Ok(e) => e,
            Err(e) => {
                let err = RelayError::from(e);
                warn!(conn_id, code = err.code(), error = %err, "worker frame dropped");
                return;
            }
        };

        let Some((destination, text)) = self.consolidate(conn_id, &event) else {
            return;
        };

        match self.dispatcher.deliver(&destination, &text).await {
            Ok(chunks) => debug!(channel = %destination, chunks, "relayed to chat"),
            Err(e) => warn!(channel = %destination, error = %e, "chat delivery failed"),
        }
    }

    /// Apply one event to the relay state; returns what to dispatch, if anything.
    fn consolidate(&self, conn_id: &str, event: &WorkerEvent) -> Option<(String, String)> {
        let mut st = self.lock();
        if !st.is_current(conn_id) {
            debug!(conn_id, "event from replaced connection ignored");
            return None;
        }

        if self.options.track_active_task_per_destination
            && event.event_name == EVENT_TASK_CREATED
        {
            if let Some(channel) = event.channel_id() {
                info!(task_id = ?event.task_id(), channel, "task started");
                st.active_destination = Some(channel.to_string());
            }
        }

        let message = match classify(event) {
            Classification::Surface(m) => m,
            Classification::Suppressed(reason) => {
                trace!(?reason, event = %event.event_name, "event suppressed");
                return None;
            }
        };

        let text = match st.buffer.observe(event.task_id(), event.is_partial(), message.text) {
            Step::Emit(text) => text,
            Step::Buffered { created } => {
                debug!(task_id = ?event.task_id(), created, "partial buffered");
                return None;
            }
            Step::Dropped => {
                debug!("partial without task id dropped");
                return None;
            }
        };

        match event.channel_id() {
            Some(channel) => Some((channel.to_string(), text)),
            None => {
                warn!(task_id = ?event.task_id(), "finished message has no channel, dropped");
                None
            }
        }
    }

    /// Tear down `conn_id` if it is still the current connection.
    ///
    /// Idempotent; returns whether anything was torn down.
    pub fn on_disconnect(&self, conn_id: &str) -> bool {
        let mut st = self.lock();
        if !st.is_current(conn_id) {
            return false;
        }
        st.live = None;
        let dropped = st.reset();
        info!(conn_id, dropped_tasks = dropped, "worker disconnected");
        true
    }

    /// Close the current connection, if any, and wait for its task to finish.
    pub async fn shutdown(&self) {
        let live = {
            let mut st = self.lock();
            let live = st.live.take();
            st.reset();
            live
        };

        let Some(live) = live else {
            debug!("shutdown: no worker connection");
            return;
        };

        info!(conn_id = %live.id, "closing worker connection");
        live.cancel.cancel();
        // Resolves when the connection task drops its handle.
        let _ = live.closed.await;
        info!(conn_id = %live.id, "worker connection closed");
    }

    /// Queue a frame for the worker. Dropped with a warning when no
    /// connection is live; never blocks.
    pub fn send(&self, frame: &OutboundFrame) -> bool {
        let result = self.lock().push(frame);
        log_send(result)
    }
}

pub(crate) fn log_send(result: Result<(), RelayError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(code = e.code(), error = %e, "frame for worker dropped");
            false
        }
    }
}
