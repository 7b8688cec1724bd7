//! Bounded retry for a single state transition

use mab_portal::PortalError;
use std::future::Future;

/// Run `op`, re-running it up to `retries` more times while the error is
/// retryable (timeouts and detached elements)
///
/// # Errors
/// The last error once retries are spent, or the first non-retryable one.
pub async fn with_retries<T, F, Fut>(
    transition: &'static str,
    retries: u32,
    mut op: F,
) -> Result<T, PortalError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PortalError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                tracing::warn!(transition, attempt, error = %e, "retrying transition");
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn timeout() -> PortalError {
        PortalError::ActionTimeout {
            action: "click",
            timeout_ms: 30_000,
        }
    }

    #[tokio::test]
    async fn retryable_error_gets_one_more_attempt() {
        let calls = AtomicU32::new(0);
        let value = with_retries("open_case", 1, || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(timeout())
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn budget_is_respected() {
        let calls = AtomicU32::new(0);
        let err = with_retries("open_case", 1, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(timeout())
        })
        .await
        .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let err = with_retries("open_case", 3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(PortalError::CaseNotFound("MAB-1".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err, PortalError::CaseNotFound("MAB-1".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
