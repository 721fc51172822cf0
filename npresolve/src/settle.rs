//! Resolve-once primitive.
//!
//! A one-shot request races several completion paths: the resolution
//! finishing, a budget timer, transport errors. Exactly one of them may
//! produce the response. Rather than scattering `answered` booleans, the
//! winner is decided by taking the sender out of a mutex: whoever takes it
//! replies, everyone else finds the slot empty and becomes a no-op.

use std::sync::Mutex;
use tokio::sync::oneshot;

/// Single-assignment completion handle
pub struct Settle<T> {
    slot: Mutex<Option<oneshot::Sender<T>>>,
}

/// Create a settle handle and the receiver its value arrives on
pub fn channel<T>() -> (Settle<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Settle {
            slot: Mutex::new(Some(tx)),
        },
        rx,
    )
}

impl<T> Settle<T> {
    /// Try to complete with `value`; returns whether this call won.
    ///
    /// Losing calls drop the value silently.
    pub fn settle(&self, value: T) -> bool {
        let taken = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match taken {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_settle_wins() {
        let (settle, rx) = channel::<u32>();
        assert!(settle.settle(1));
        assert!(!settle.settle(2));
        assert_eq!(rx.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_settles_produce_one_value() {
        let (settle, rx) = channel::<usize>();
        let settle = Arc::new(settle);

        let mut handles = Vec::new();
        for i in 0..16 {
            let s = Arc::clone(&settle);
            handles.push(tokio::spawn(async move { s.settle(i) }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        rx.await.unwrap();
    }

    #[tokio::test]
    async fn settle_after_receiver_dropped_is_a_noop() {
        let (settle, rx) = channel::<u32>();
        drop(rx);
        assert!(!settle.settle(7));
    }
}
