//! `failOnErrors` accounting.

/// Running failure count against the request's `failOnErrors` threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureBudget {
    threshold: Option<usize>,
    failures: usize,
}

impl FailureBudget {
    /// `None` means no threshold: execution never stops on failures.
    pub fn new(threshold: Option<usize>) -> Self {
        Self {
            threshold,
            failures: 0,
        }
    }

    /// Record one finished operation; returns whether execution may continue.
    ///
    /// Called after the operation's outcome is recorded, so the response may
    /// contain exactly `threshold` failures but never more.
    pub fn record(&mut self, success: bool) -> bool {
        if !success {
            self.failures += 1;
        }
        !self.is_exhausted()
    }

    pub fn is_exhausted(&self) -> bool {
        self.threshold.is_some_and(|t| self.failures >= t)
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn threshold(&self) -> Option<usize> {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_budget_never_stops() {
        let mut budget = FailureBudget::new(None);
        for _ in 0..100 {
            assert!(budget.record(false));
        }
        assert_eq!(budget.failures(), 100);
    }

    #[test]
    fn test_stops_on_reaching_threshold() {
        let mut budget = FailureBudget::new(Some(2));
        assert!(budget.record(true));
        assert!(budget.record(false));
        assert!(budget.record(true));
        assert!(!budget.record(false));
        assert!(budget.is_exhausted());
        assert_eq!(budget.failures(), 2);
    }

    #[test]
    fn test_threshold_of_one() {
        let mut budget = FailureBudget::new(Some(1));
        assert!(budget.record(true));
        assert!(!budget.record(false));
    }
}
