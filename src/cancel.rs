use std::fmt;

use async_channel::{Receiver, Sender};

/// Cloneable handle used to cancel cooperative calls.
///
/// Cancelling is one-way and visible to every clone. Nothing is ever sent on
/// the channel; closing it is the signal.
#[derive(Clone)]
pub struct CancelToken {
    sender: Sender<()>,
    receiver: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = async_channel::bounded(1);
        Self { sender, receiver }
    }

    pub fn cancel(&self) {
        self.sender.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        // recv only returns once the channel is closed
        let _ = self.receiver.recv().await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures_lite::future;

    use super::*;

    #[test]
    fn cancel_is_seen_by_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        future::block_on(clone.cancelled());
    }

    #[test]
    fn cancelled_stays_pending_until_cancel() {
        let token = CancelToken::new();
        assert!(future::block_on(future::poll_once(token.cancelled())).is_none());
        token.cancel();
        assert!(future::block_on(future::poll_once(token.cancelled())).is_some());
    }
}
