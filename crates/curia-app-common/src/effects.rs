use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

/// Result of a best-effort operation.
///
/// Side effects that must never fail their caller (notifications, reward
/// minting, post-close anchoring) report through this type instead of
/// propagating errors. Callers are free to ignore the outcome.
#[derive(Debug)]
pub enum BestEffortOutcome<T> {
    Completed(T),
    Failed,
}

impl<T> BestEffortOutcome<T> {
    pub fn completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Completed(v) => Some(v),
            Self::Failed => None,
        }
    }
}

/// Run a fallible side effect without letting its failure surface.
///
/// A failure is logged with the operation name and swallowed; the primary
/// state transition that triggered the side effect stands either way.
pub async fn best_effort<T, E, F>(operation: &str, fut: F) -> BestEffortOutcome<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    match fut.await {
        Ok(value) => {
            debug!(operation = operation, "Best-effort operation completed");
            BestEffortOutcome::Completed(value)
        }
        Err(e) => {
            warn!(
                operation = operation,
                error = %e,
                "Best-effort operation failed"
            );
            BestEffortOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_best_effort_success() {
        let outcome = best_effort("noop", async { Ok::<_, String>(42) }).await;
        assert!(outcome.completed());
        assert_eq!(outcome.into_option(), Some(42));
    }

    #[tokio::test]
    async fn test_best_effort_failure_is_swallowed() {
        let outcome: BestEffortOutcome<()> =
            best_effort("broken", async { Err("boom".to_string()) }).await;
        assert!(!outcome.completed());
        assert!(outcome.into_option().is_none());
    }
}
