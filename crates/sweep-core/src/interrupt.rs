//! Graceful interruption of a running orchestrator
//!
//! An interrupt never stops in-flight work. The orchestrator looks at the
//! manager only at batch boundaries and aborts there.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Reason for an interruption request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// User pressed Ctrl+C
    UserInterrupt,
    /// SIGTERM or a supervising process asked us to stop
    Shutdown,
    /// Requested through an [`OrchestratorHandle`](crate::orchestrator::OrchestratorHandle)
    Manual,
}

impl std::fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserInterrupt => write!(f, "user interrupt"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Cloneable interrupt flag shared between the orchestrator and its callers
#[derive(Debug, Clone)]
pub struct InterruptManager {
    cancellation_token: CancellationToken,
    interrupt_sender: broadcast::Sender<InterruptReason>,
    /// First reason received
    reason: Arc<Mutex<Option<InterruptReason>>>,
}

impl Default for InterruptManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptManager {
    pub fn new() -> Self {
        let (interrupt_sender, _) = broadcast::channel(16);

        Self {
            cancellation_token: CancellationToken::new(),
            interrupt_sender,
            reason: Arc::new(Mutex::new(None)),
        }
    }

    /// Request a stop at the next batch boundary
    pub fn interrupt(&self, reason: InterruptReason) {
        self.reason.lock().get_or_insert(reason);
        self.cancellation_token.cancel();
        let _ = self.interrupt_sender.send(reason);
        tracing::info!(reason = %reason, "Interrupt requested");
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn reason(&self) -> Option<InterruptReason> {
        *self.reason.lock()
    }

    /// Every interrupt request from now on, including repeated ones
    pub fn subscribe(&self) -> broadcast::Receiver<InterruptReason> {
        self.interrupt_sender.subscribe()
    }
}
