use tracing::debug;

/// Shared store-wide balance, in minor currency units. Deliberately minimal:
/// credits always succeed (saturating), debits fail atomically when the
/// balance is short.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EconomyLedger {
    balance_minor: u64,
}

impl EconomyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance_minor: u64) -> Self {
        Self { balance_minor }
    }

    pub fn balance(&self) -> u64 {
        self.balance_minor
    }

    pub fn add(&mut self, amount_minor: u32) {
        self.balance_minor = self.balance_minor.saturating_add(u64::from(amount_minor));
        debug!(amount = amount_minor, balance = self.balance_minor, "ledger_credit");
    }

    pub fn try_remove(&mut self, amount_minor: u32) -> bool {
        let amount = u64::from(amount_minor);
        if amount > self.balance_minor {
            return false;
        }
        self.balance_minor -= amount;
        debug!(amount = amount_minor, balance = self.balance_minor, "ledger_debit");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_accumulate() {
        let mut ledger = EconomyLedger::new();
        ledger.add(25);
        ledger.add(75);
        assert_eq!(ledger.balance(), 100);
    }

    #[test]
    fn debit_fails_atomically_when_short() {
        let mut ledger = EconomyLedger::with_balance(50);
        assert!(!ledger.try_remove(51));
        assert_eq!(ledger.balance(), 50);
        assert!(ledger.try_remove(50));
        assert_eq!(ledger.balance(), 0);
    }
}
