use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::forum::{ForumError, ForumResult};

/// Run a forum request, retrying indefinitely on transient transport errors
/// with a fixed pause between attempts.
///
/// `NotFound` and unclassified errors pass straight through; only the caller
/// knows whether those are tolerable at its granularity.
pub async fn with_retry<T, F, Fut>(what: &str, delay: Duration, mut operation: F) -> ForumResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ForumResult<T>>,
{
    let mut attempt: u64 = 0;
    loop {
        match operation().await {
            Err(ForumError::Transient(e)) => {
                attempt += 1;
                warn!(what, attempt, "Transient forum error, retrying: {e:#}");
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let attempts = AtomicU32::new(0);
        let result = with_retry("test", Duration::ZERO, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(ForumError::Transient(anyhow!("connection reset")))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_not_found_passes_through() {
        let attempts = AtomicU32::new(0);
        let result: ForumResult<()> = with_retry("test", Duration::ZERO, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ForumError::NotFound) }
        })
        .await;

        assert!(matches!(result, Err(ForumError::NotFound)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
