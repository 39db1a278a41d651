//! The run's token budget.

/// Charging past the limit. Only reachable through a selector defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("charging {cost} tokens would exceed the budget ({consumed} of {limit} consumed)")]
pub struct BudgetExceeded {
    pub cost: usize,
    pub consumed: usize,
    pub limit: usize,
}

/// Token budget: `consumed` only grows and never exceeds `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    limit: usize,
    consumed: usize,
}

impl TokenBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, consumed: 0 }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Tokens still available.
    pub fn remaining(&self) -> usize {
        self.limit - self.consumed
    }

    pub fn fits(&self, cost: usize) -> bool {
        cost <= self.remaining()
    }

    /// Consume `cost` tokens, refusing anything that would overflow.
    pub fn charge(&mut self, cost: usize) -> Result<(), BudgetExceeded> {
        if !self.fits(cost) {
            return Err(BudgetExceeded {
                cost,
                consumed: self.consumed,
                limit: self.limit,
            });
        }
        self.consumed += cost;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_within_limit() {
        let mut budget = TokenBudget::new(100);
        budget.charge(80).unwrap();
        assert_eq!(budget.consumed(), 80);
        assert_eq!(budget.remaining(), 20);
        budget.charge(20).unwrap();
        assert_eq!(budget.remaining(), 0);
        budget.charge(0).unwrap();
    }

    #[test]
    fn test_charge_past_limit_is_refused() {
        let mut budget = TokenBudget::new(100);
        budget.charge(80).unwrap();
        let err = budget.charge(21).unwrap_err();
        assert_eq!(
            err,
            BudgetExceeded {
                cost: 21,
                consumed: 80,
                limit: 100
            }
        );
        // Unchanged after a refused charge
        assert_eq!(budget.consumed(), 80);
    }

    #[test]
    fn test_fits() {
        let budget = TokenBudget::new(10);
        assert!(budget.fits(10));
        assert!(!budget.fits(11));
    }
}
