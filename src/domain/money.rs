use {
    super::error::MarketError,
    serde::{Deserialize, Serialize},
    std::fmt,
    std::ops::{Add, Sub},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(cents: i64) -> Result<Self, MarketError> {
        if cents < 0 {
            return Err(MarketError::Validation(format!(
                "MoneyAmount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0.checked_add(other.0).map(MoneyAmount)
    }

    pub fn checked_sub(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0
            .checked_sub(other.0)
            .filter(|&v| v >= 0)
            .map(MoneyAmount)
    }
}

impl Add for MoneyAmount {
    type Output = MoneyAmount;

    fn add(self, rhs: MoneyAmount) -> MoneyAmount {
        self.checked_add(rhs).expect("MoneyAmount overflow")
    }
}

impl Sub for MoneyAmount {
    type Output = MoneyAmount;

    fn sub(self, rhs: MoneyAmount) -> MoneyAmount {
        self.checked_sub(rhs).expect("MoneyAmount underflow")
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Jpy => "jpy",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = MarketError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "usd" => Ok(Self::Usd),
            "eur" => Ok(Self::Eur),
            "gbp" => Ok(Self::Gbp),
            "jpy" => Ok(Self::Jpy),
            other => Err(MarketError::Validation(format!(
                "unknown currency: {other}"
            ))),
        }
    }
}

/// Platform fee policy, expressed in basis points of the winning amount.
#[derive(Debug, Clone, Copy)]
pub struct FeePolicy {
    bps: i64,
}

/// Result of splitting a winning bid between the platform and the influencer.
/// Invariant: `fee + payout == amount`, exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub fee: MoneyAmount,
    pub payout: MoneyAmount,
}

impl FeePolicy {
    pub const DEFAULT_BPS: i64 = 2_000;

    pub fn new(bps: i64) -> Result<Self, MarketError> {
        if !(0..=10_000).contains(&bps) {
            return Err(MarketError::Validation(format!(
                "fee must be between 0 and 10000 bps, got: {bps}"
            )));
        }
        Ok(Self { bps })
    }

    pub fn bps(&self) -> i64 {
        self.bps
    }

    /// Split an amount into platform fee and influencer payout.
    /// The fee rounds up to the nearest cent; the payout absorbs the
    /// remainder, so the two always sum back to the original amount.
    pub fn split(&self, amount: MoneyAmount) -> FeeSplit {
        // Ceiling division; both operands are non-negative by construction.
        let fee = MoneyAmount((amount.cents() * self.bps + 9_999) / 10_000);
        FeeSplit {
            fee,
            payout: amount - fee,
        }
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            bps: Self::DEFAULT_BPS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_amount() {
        assert!(MoneyAmount::new(-1).is_err());
        assert!(MoneyAmount::new(0).is_ok());
    }

    #[test]
    fn split_is_exact_for_even_amounts() {
        let policy = FeePolicy::new(2_000).unwrap();
        let amount = MoneyAmount::new(5_000).unwrap();
        let split = policy.split(amount);
        assert_eq!(split.fee.cents(), 1_000);
        assert_eq!(split.payout.cents(), 4_000);
        assert_eq!(split.fee + split.payout, amount);
    }

    #[test]
    fn split_fee_rounds_up_across_the_bps_range() {
        // Exercises the ceiling arithmetic over odd rates and amounts.
        for (amount, bps, want_fee) in [
            (1_i64, 1_i64, 1_i64),
            (9_999, 1, 1),
            (10_001, 1, 2),
            (1_300, 2_000, 260),
            (333, 3_333, 111),
            (1_000_000_007, 2_500, 250_000_002),
        ] {
            let split = FeePolicy::new(bps).unwrap().split(MoneyAmount::new(amount).unwrap());
            assert_eq!(split.fee.cents(), want_fee, "amount {amount} at {bps}bps");
            assert_eq!(split.fee.cents() + split.payout.cents(), amount);
        }
    }

    #[test]
    fn checked_arithmetic_guards_the_edges() {
        let max = MoneyAmount::new(i64::MAX).unwrap();
        let one = MoneyAmount::new(1).unwrap();
        assert!(max.checked_add(one).is_none());
        assert_eq!(one.checked_add(one), Some(MoneyAmount::new(2).unwrap()));
        assert!(one.checked_sub(max).is_none());
    }

    #[test]
    fn fee_rounds_up_and_payout_absorbs_remainder() {
        // 2000 bps of 1001 = 200.2 → fee 201, payout 800.
        let policy = FeePolicy::new(2_000).unwrap();
        let split = policy.split(MoneyAmount::new(1_001).unwrap());
        assert_eq!(split.fee.cents(), 201);
        assert_eq!(split.payout.cents(), 800);
        assert_eq!(split.fee.cents() + split.payout.cents(), 1_001);
    }

    #[test]
    fn zero_bps_gives_full_payout() {
        let policy = FeePolicy::new(0).unwrap();
        let split = policy.split(MoneyAmount::new(777).unwrap());
        assert_eq!(split.fee.cents(), 0);
        assert_eq!(split.payout.cents(), 777);
    }

    #[test]
    fn rejects_out_of_range_bps() {
        assert!(FeePolicy::new(-1).is_err());
        assert!(FeePolicy::new(10_001).is_err());
    }
}
