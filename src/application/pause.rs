//! Inter-iteration sleeps that can be cut short by a stop signal.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

/// How a pause ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pause {
    Elapsed,
    Stopped,
}

/// Sleep for `interval` unless `stop` is (or becomes) true first.
pub(crate) async fn pause(interval: Duration, stop: &mut watch::Receiver<bool>) -> Pause {
    if *stop.borrow() {
        return Pause::Stopped;
    }
    tokio::select! {
        () = sleep(interval) => Pause::Elapsed,
        () = stopped(stop) => Pause::Stopped,
    }
}

/// Resolve once `stop` carries true; never resolves if the sender is gone.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
