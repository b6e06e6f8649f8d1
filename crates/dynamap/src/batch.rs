//! Batch operation outcomes.

use crate::error::StoreError;

/// The per-entry outcomes of a batch operation, in input order.
///
/// Batch entries are independent requests, so one failure never aborts the
/// rest; the caller inspects successes and failures after the fact.
#[derive(Debug)]
pub struct BatchResult<T> {
    outcomes: Vec<Result<T, StoreError>>,
}

impl<T> BatchResult<T> {
    pub(crate) fn new(outcomes: Vec<Result<T, StoreError>>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|r| r.is_ok()).count()
    }

    pub fn fail_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn is_all_success(&self) -> bool {
        self.fail_count() == 0
    }

    /// Successful outcomes, in input order.
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(|r| r.as_ref().ok())
    }

    /// Failures, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &StoreError> {
        self.outcomes.iter().filter_map(|r| r.as_ref().err())
    }

    /// All per-entry outcomes, in input order.
    pub fn outcomes(&self) -> &[Result<T, StoreError>] {
        &self.outcomes
    }

    /// Consume the result, yielding the successful values in input order.
    pub fn into_successes(self) -> Vec<T> {
        self.outcomes.into_iter().filter_map(|r| r.ok()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_order() {
        let result: BatchResult<i64> = BatchResult::new(vec![
            Ok(1),
            Err(StoreError::ConditionFailed),
            Ok(3),
        ]);

        assert_eq!(result.len(), 3);
        assert_eq!(result.success_count(), 2);
        assert_eq!(result.fail_count(), 1);
        assert!(!result.is_all_success());
        assert_eq!(result.successes().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(result.into_successes(), vec![1, 3]);
    }
}
