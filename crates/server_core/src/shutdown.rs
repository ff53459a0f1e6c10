//! Process-wide stop signal shared by accept loops, sweeps and shard drains.

use tokio::sync::watch;

/// Owner side. Dropping it also releases every waiter.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Cloneable waiter side.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, ShutdownSignal { rx })
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal { rx: self.tx.subscribe() }
    }

    /// Trigger on Ctrl-C. Returns immediately; the watcher runs as a task.
    pub fn trigger_on_ctrl_c(&self) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                tx.send_replace(true);
            }
        });
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is triggered or the owner is dropped.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Borrow the underlying receiver (for code that selects on `watch` directly).
    pub fn receiver(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn waiters_wake_on_trigger() {
        let (stop, sig) = Shutdown::new();
        let mut a = sig.clone();
        let mut b = stop.signal();
        assert!(!sig.is_triggered());
        let h = tokio::spawn(async move {
            a.wait().await;
            b.wait().await;
        });
        stop.trigger();
        tokio::time::timeout(Duration::from_secs(1), h).await.unwrap().unwrap();
        assert!(sig.is_triggered());
    }

    #[tokio::test]
    async fn dropping_owner_releases_waiters() {
        let (stop, mut sig) = Shutdown::new();
        drop(stop);
        tokio::time::timeout(Duration::from_secs(1), sig.wait()).await.unwrap();
    }
}
