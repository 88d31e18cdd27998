use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;

/// Cooperative shutdown flag shared across the session tasks.
///
/// Install once from the binary; every long-lived task either polls
/// `is_requested()` or awaits `wait()`.
#[derive(Clone)]
pub struct ShutdownToken {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Spawn the Ctrl-C listener and install a panic hook that logs before
    /// the default handler runs. Returns the token for distribution.
    pub fn install() -> Self {
        let token = Self::new();

        let listener = token.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested via Ctrl-C");
                listener.request();
            }
        });

        let original_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            tracing::error!("PANIC: {}", panic_info);
            original_panic(panic_info);
        }));

        token
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register interest before the flag check; a request landing in
        // between would otherwise be missed forever
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_unblocks_waiters() {
        let token = ShutdownToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });
        token.request();
        handle.await.unwrap();
        assert!(token.is_requested());
    }
}
