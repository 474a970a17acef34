//! An "all-settled" join: run every task to completion, whatever happens to the others.

use std::future::Future;
use tokio::task::JoinHandle;

/// Outcome of one settled task.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T> {
    Fulfilled(T),
    /// The task panicked or was cancelled; carries a description.
    Rejected(String),
}

/// Spawns every future on the runtime and waits for all of them.
///
/// Tasks run concurrently. A failing task never cancels its siblings, and the
/// returned outcomes are in the same order as `futures`.
pub async fn settle_all<T, F>(futures: Vec<F>) -> Vec<Settled<T>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<JoinHandle<T>> = futures.into_iter().map(tokio::spawn).collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(match handle.await {
            Ok(value) => Settled::Fulfilled(value),
            Err(e) if e.is_panic() => Settled::Rejected(panic_message(e.into_panic())),
            Err(e) => Settled::Rejected(e.to_string()),
        });
    }
    outcomes
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("task panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("task panicked: {}", s)
    } else {
        "task panicked".to_string()
    }
}
