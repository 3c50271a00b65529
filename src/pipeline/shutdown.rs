//! Interrupt handling for the poll loop.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Cancel `cancel` on the first interrupt and wait for a second one.
///
/// Returns `true` when a second interrupt arrived, meaning the caller should
/// exit without waiting for the in-flight iteration. Returns `false` when
/// the interrupt source ends first.
pub async fn escalate_interrupts<S>(mut interrupts: S, cancel: CancellationToken) -> bool
where
    S: Stream<Item = ()> + Unpin,
{
    if interrupts.next().await.is_none() {
        return false;
    }
    log::info!("Interrupt received, stopping after this round (interrupt again to force)");
    cancel.cancel();

    if interrupts.next().await.is_none() {
        return false;
    }
    log::warn!("Second interrupt received, exiting immediately");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_first_interrupt_cancels() {
        let cancel = CancellationToken::new();
        let forced = escalate_interrupts(stream::iter(vec![()]), cancel.clone()).await;
        assert!(cancel.is_cancelled());
        assert!(!forced);
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let cancel = CancellationToken::new();
        let forced = escalate_interrupts(stream::iter(vec![(), ()]), cancel.clone()).await;
        assert!(cancel.is_cancelled());
        assert!(forced);
    }

    #[tokio::test]
    async fn test_no_interrupt_leaves_loop_running() {
        let cancel = CancellationToken::new();
        let forced = escalate_interrupts(stream::iter(Vec::<()>::new()), cancel.clone()).await;
        assert!(!cancel.is_cancelled());
        assert!(!forced);
    }
}
