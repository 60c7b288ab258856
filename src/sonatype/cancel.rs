//! External cancellation of an in-flight publish

use tokio::sync::watch;

/// Fires the cancellation of an in-flight publish
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation; already applied remote state is left as is
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Observed at step boundaries, between uploads and during the close wait
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { receiver: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|receiver| *receiver.borrow())
    }

    /// Resolve once cancellation is requested
    ///
    /// Pends forever when the signal can no longer fire, either because it
    /// was created with [`CancelSignal::never`] or its handle was dropped.
    pub async fn cancelled(&mut self) {
        if let Some(receiver) = &mut self.receiver {
            let handle_dropped = receiver.wait_for(|cancelled| *cancelled).await.is_err();
            if !handle_dropped {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

/// Create a connected handle and signal
///
/// # Examples
///
/// ```
/// use release_publisher::sonatype::cancellation;
///
/// let (handle, signal) = cancellation();
/// assert!(!signal.is_cancelled());
/// handle.cancel();
/// assert!(signal.is_cancelled());
/// ```
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        CancelHandle { sender },
        CancelSignal {
            receiver: Some(receiver),
        },
    )
}
