//! Cooperative cancellation helpers.

use std::future::Future;

use core_async::sync::CancellationToken;

use crate::error::{MinerError, Result};

/// Runs `future` unless `cancel` fires first, in which case the future is
/// dropped and `Cancelled` is returned.
pub async fn until_cancelled<F, T>(cancel: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(MinerError::Cancelled);
    }

    core_async::select! {
        biased;
        _ = cancel.cancelled() => Err(MinerError::Cancelled),
        result = future => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let value = until_cancelled(&token, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_already_cancelled_never_polls() {
        let token = CancellationToken::new();
        token.cancel();

        let result: Result<()> =
            until_cancelled(&token, async { panic!("must not be polled") }).await;
        assert!(matches!(result, Err(MinerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_future() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result: Result<()> = until_cancelled(&token, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(MinerError::Cancelled)));
    }
}
