//! Ctrl+C and SIGTERM handling
//!
//! The first signal asks the orchestrator to stop at the next batch
//! boundary. A second Ctrl+C exits without waiting. Interrupts raised
//! through an orchestrator handle are announced the same way.

use futures::stream::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::{Handle, Signals};
use sweep_core::{InterruptManager, InterruptReason};
use tokio::task::JoinHandle;

/// Forwards process signals to an [`InterruptManager`]
pub struct SignalHandler {
    handle: Handle,
    task: JoinHandle<()>,
    notice: JoinHandle<()>,
}

impl SignalHandler {
    pub fn start(interrupt: InterruptManager) -> std::io::Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();

        let mut requests = interrupt.subscribe();
        let notice = tokio::spawn(async move {
            if let Ok(reason) = requests.recv().await {
                eprintln!("\nStopping after the current batch ({reason})... Ctrl+C again to force");
            }
        });

        let task = tokio::spawn(async move {
            while let Some(signal) = signals.next().await {
                if interrupt.is_interrupted() && signal == SIGINT {
                    eprintln!("\nInterrupted twice, exiting without waiting for the batch.");
                    std::process::exit(130);
                }
                let reason = match signal {
                    SIGTERM => InterruptReason::Shutdown,
                    _ => InterruptReason::UserInterrupt,
                };
                interrupt.interrupt(reason);
            }
        });

        Ok(Self {
            handle,
            task,
            notice,
        })
    }

    pub async fn stop(self) {
        self.handle.close();
        let _ = self.task.await;
        self.notice.abort();
    }
}
