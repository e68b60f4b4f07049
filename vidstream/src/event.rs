/*!
    Asynchronous session notifications.
*/

use crossbeam_channel::Sender;

/**
    Notifications emitted by a stream session.

    Delivered from whichever thread detects the condition, so receivers must
    not assume any ordering relative to frame delivery.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// An open attempt completed.
    LoadFinished { success: bool },
    /// The container was read to the end. Emitted at most once per session.
    EndOfStream,
    /// A human-readable failure description.
    Error { message: String },
}

/**
    Sending half shared by the orchestrator and the stages.

    Sends never block and are ignored once every receiver is gone.
*/
#[derive(Clone, Debug)]
pub(crate) struct EventSender {
    tx: Sender<StreamEvent>,
}

impl EventSender {
    pub(crate) fn new(tx: Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: StreamEvent) {
        let _ = self.tx.send(event);
    }

    pub(crate) fn error(&self, message: impl Into<String>) {
        self.emit(StreamEvent::Error {
            message: message.into(),
        });
    }
}
