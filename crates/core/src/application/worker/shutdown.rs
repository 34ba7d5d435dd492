// Shutdown Token
//
// watch::Sender::send and watch::Receiver::borrow never await, so the token
// works from plain OS threads without a runtime.

use tokio::sync::watch;

/// Shutdown signal for graceful termination
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to every token holder
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_observes_shutdown() {
        let (tx, token) = shutdown_channel();
        let other = token.clone();
        assert!(!token.is_shutdown());

        tx.shutdown();

        assert!(token.is_shutdown());
        assert!(other.is_shutdown());
        assert!(tx.is_shutdown());
    }

    #[test]
    fn test_token_outlives_sender() {
        let (tx, token) = shutdown_channel();
        tx.shutdown();
        drop(tx);
        assert!(token.is_shutdown());
    }
}
