//! Chat → worker direction.

use relay_protocol::{OutboundFrame, WorkerCommand};
use tracing::debug;

use crate::relay::{log_send, Relay};

impl Relay {
    /// Forward a chat message to the worker as a `message` frame.
    ///
    /// With active-task tracking on, the frame carries `new_task: true` when
    /// `destination` has no active task yet. The flag is advisory only.
    pub fn forward(&self, destination: &str, text: &str) -> bool {
        let track = self.options.track_active_task_per_destination;
        let mut st = self.lock();

        let frame = OutboundFrame::Message {
            content: text.to_string(),
            channel_id: destination.to_string(),
            new_task: track.then(|| st.active_destination.as_deref() != Some(destination)),
        };

        let result = st.push(&frame);
        if result.is_ok() {
            debug!(channel = destination, len = text.len(), "forwarded to worker");
            if track {
                st.active_destination = Some(destination.to_string());
            }
        }
        drop(st);
        log_send(result)
    }

    /// Ask the worker to start a fresh task context for `destination`.
    pub fn start_new_task(&self, destination: &str) -> bool {
        let mut st = self.lock();
        st.active_destination = None;
        let result = st.push(&OutboundFrame::command(destination, WorkerCommand::New));
        drop(st);
        if result.is_ok() {
            debug!(channel = destination, "new task requested");
        }
        log_send(result)
    }
}
