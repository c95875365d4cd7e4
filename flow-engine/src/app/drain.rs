//! A shutdown/drain primitive: one `Signal` held by whoever decides it is
//! time to stop, and any number of cheaply `Clone`-able `Watch` handles held
//! by tasks that need to notice. Ported from the drain channel linkerd2-proxy
//! popularized for exactly this purpose.

use tokio::sync::watch;

/// The send half, held by the process that decides when to shut down.
pub struct Signal {
    tx: watch::Sender<bool>,
}

/// The receive half, held by every task that should stop on shutdown.
#[derive(Clone)]
pub struct Watch {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (Signal, Watch) {
    let (tx, rx) = watch::channel(false);
    (Signal { tx }, Watch { rx })
}

impl Signal {
    /// Tells every outstanding `Watch` to drain. Consumes `self`: a signal is
    /// sent at most once.
    pub fn drain(self) {
        let _ = self.tx.send(true);
    }
}

impl Watch {
    /// Resolves once `Signal::drain` has been called. Resolves immediately
    /// if it already has been.
    pub async fn signaled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // sender dropped without draining; treat as "never".
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signaled_resolves_after_drain() {
        let (signal, mut watch) = channel();
        let waited = tokio::spawn(async move {
            watch.signaled().await;
        });
        signal.drain();
        waited.await.unwrap();
    }
}
