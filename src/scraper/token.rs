//! The single dispatch permit passed between workers and the dispatcher.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Permission to dispatch the next course query, no earlier than `not_before`.
///
/// `generation` names the dispatch that released it. The dispatcher only
/// accepts the token back from the dispatch it is currently waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchToken {
    pub not_before: Instant,
    pub generation: u64,
}

impl DispatchToken {
    pub fn now(generation: u64) -> Self {
        Self {
            not_before: Instant::now(),
            generation,
        }
    }

    pub fn after(delay: Duration, generation: u64) -> Self {
        Self {
            not_before: Instant::now() + delay,
            generation,
        }
    }
}

pub type TokenSender = mpsc::Sender<DispatchToken>;
pub type TokenReceiver = mpsc::Receiver<DispatchToken>;

/// A channel holding at most one token at a time.
pub fn channel() -> (TokenSender, TokenReceiver) {
    mpsc::channel(1)
}
