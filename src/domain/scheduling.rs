use std::future::Future;
use std::pin::pin;

use futures::future::{Either, LocalBoxFuture, select};

use crate::time_utils::millis_to_secs;

/// Wall clock in epoch milliseconds
pub trait Clock {
    fn now_ms(&self) -> i64;

    fn now_secs(&self) -> i64 {
        millis_to_secs(self.now_ms())
    }
}

/// Cooperative delay source used for settle waits, poll cadence and timeouts
pub trait Timer {
    fn sleep(&self, ms: u64) -> LocalBoxFuture<'static, ()>;
}

/// Runs detached tasks on the single-threaded event loop
pub trait TaskSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Races `task` against a `ms` delay. `None` means the delay won.
///
/// The task is polled first, so a result that is already available wins even
/// with a zero budget.
pub async fn with_timeout<F: Future>(timer: &dyn Timer, ms: u64, task: F) -> Option<F::Output> {
    let task = pin!(task);
    match select(task, timer.sleep(ms)).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}
