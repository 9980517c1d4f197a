//! Hierarchical cancellation signal
//!
//! A [`Lifetime`] is cancelled explicitly or when any ancestor is cancelled.
//! The registry owns the root; each path owns a child of it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable cancellation signal
#[derive(Debug, Clone)]
pub struct Lifetime {
    tx: Arc<watch::Sender<bool>>,
    parent: Option<Box<Lifetime>>,
}

impl Lifetime {
    /// Create a root lifetime
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            parent: None,
        }
    }

    /// Create a lifetime that ends with this one, or earlier
    pub fn child(&self) -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// End this lifetime and every child
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether this lifetime or an ancestor has ended
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow() || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Resolve once this lifetime or an ancestor has ended
    pub fn cancelled(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let own = wait_cancelled(self.tx.subscribe());

            match &self.parent {
                Some(parent) => {
                    tokio::select! {
                        _ = own => {}
                        _ = parent.cancelled() => {}
                    }
                }
                None => own.await,
            }
        })
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        // The sender lives as long as the Lifetime being awaited
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_cancel_root() {
        let root = Lifetime::new();
        assert!(!root.is_cancelled());

        let waiter = root.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });

        root.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(root.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancels_child() {
        let root = Lifetime::new();
        let child = root.child();
        let grandchild = child.child();

        root.cancel();

        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), grandchild.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_child_does_not_cancel_parent() {
        let root = Lifetime::new();
        let child = root.child();

        child.cancel();

        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());
        let pending = tokio::time::timeout(Duration::from_millis(20), root.cancelled()).await;
        assert!(pending.is_err());
    }
}
