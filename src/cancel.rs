use tokio::sync::watch;

/// A token that can be checked or awaited for cancellation.
#[derive(Clone)]
pub struct CancellationToken(watch::Receiver<bool>);

impl CancellationToken {
    /// A token that can never be cancelled, for callers without a deadline.
    pub fn never() -> CancellationToken {
        let (tx, rx) = watch::channel(false);
        // Keep the sender alive so the receiver never observes a close.
        std::mem::forget(tx);
        CancellationToken(rx)
    }

    /// Returns true if cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is signalled. Also resolves if the handle
    /// is dropped, treating an abandoned caller as cancelled.
    pub async fn cancelled(&mut self) {
        while !*self.0.borrow() {
            if self.0.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Owning side of a cancellation pair.
pub struct CancellationHandle(watch::Sender<bool>);

impl CancellationHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

pub fn cancellation_pair() -> (CancellationHandle, CancellationToken) {
    let (tx, rx) = watch::channel(false);
    (CancellationHandle(tx), CancellationToken(rx))
}
