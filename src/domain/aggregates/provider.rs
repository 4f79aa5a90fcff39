//! Service provider aggregate: rating aggregate and earnings ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::{Money, Rating};

#[derive(Clone, Debug, Serialize)]
pub struct ServiceProvider {
    pub(crate) id: Uuid,
    pub(crate) display_name: String,
    pub(crate) average_rating: Decimal,
    pub(crate) total_reviews: i64,
    pub(crate) pending_balance: Money,
    pub(crate) total_earned: Money,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl ServiceProvider {
    pub fn new(display_name: impl Into<String>, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(), display_name: display_name.into(),
            average_rating: Decimal::ZERO, total_reviews: 0,
            pending_balance: Money::zero(currency), total_earned: Money::zero(currency),
            created_at: now, updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn display_name(&self) -> &str { &self.display_name }
    pub fn average_rating(&self) -> Decimal { self.average_rating }
    pub fn total_reviews(&self) -> i64 { self.total_reviews }
    pub fn pending_balance(&self) -> &Money { &self.pending_balance }
    pub fn total_earned(&self) -> &Money { &self.total_earned }

    /// Incremental running mean; the review store applies this together with
    /// the review insert so neither exists without the other.
    pub fn record_rating(&mut self, rating: Rating) {
        let count = Decimal::from(self.total_reviews);
        let sum = self.average_rating * count + Decimal::from(rating.value());
        self.total_reviews += 1;
        self.average_rating = sum / Decimal::from(self.total_reviews);
        self.touch();
    }

    /// Credits completed-booking earnings to the payable balance.
    pub fn accrue(&mut self, net: Money) {
        self.pending_balance = self.pending_balance.clone() + net.clone();
        self.total_earned = self.total_earned.clone() + net;
        self.touch();
    }

    pub fn debit_for_payout(&mut self, amount: &Money) -> Result<(), ProviderError> {
        if !amount.is_positive() { return Err(ProviderError::NonPositivePayout); }
        let remaining = self.pending_balance.clone() - amount.clone();
        if remaining.is_negative() { return Err(ProviderError::InsufficientBalance); }
        self.pending_balance = remaining;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Clone, Debug, Serialize)]
pub struct Payout {
    pub(crate) id: Uuid,
    pub(crate) provider_id: Uuid,
    pub(crate) amount: Money,
    pub(crate) status: PayoutStatus,
    pub(crate) requested_at: DateTime<Utc>,
    pub(crate) processed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus { #[default] Requested, Completed }

impl Payout {
    pub fn request(provider_id: Uuid, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(), provider_id, amount, status: PayoutStatus::Requested,
            requested_at: Utc::now(), processed_at: None,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn provider_id(&self) -> Uuid { self.provider_id }
    pub fn amount(&self) -> &Money { &self.amount }
    pub fn status(&self) -> PayoutStatus { self.status }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self { Self::Requested => "requested", Self::Completed => "completed" };
        write!(f, "{s}")
    }
}

impl FromStr for PayoutStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(Self::Requested), "completed" => Ok(Self::Completed),
            other => Err(format!("unknown payout status: {other}")),
        }
    }
}

#[derive(Debug, Clone)] pub enum ProviderError { NonPositivePayout, InsufficientBalance }
impl std::error::Error for ProviderError {}
impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositivePayout => write!(f, "payout amount must be positive"),
            Self::InsufficientBalance => write!(f, "payout exceeds pending balance"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(v: i32) -> Rating { Rating::new(v).unwrap() }

    #[test]
    fn running_mean_matches_arithmetic_mean() {
        let mut p = ServiceProvider::new("Fix-It Crew", "SAR");
        p.record_rating(rating(5));
        assert_eq!(p.average_rating(), Decimal::from(5));
        p.record_rating(rating(3));
        assert_eq!(p.average_rating(), Decimal::from(4));
        p.record_rating(rating(4));
        assert_eq!(p.average_rating(), Decimal::from(4));
        assert_eq!(p.total_reviews(), 3);
    }

    #[test]
    fn running_mean_close_for_non_terminating_divisions() {
        let mut p = ServiceProvider::new("Spark Electric", "SAR");
        for v in [5, 5, 4, 2, 1, 4, 3] { p.record_rating(rating(v)); }
        let expected = Decimal::from(24) / Decimal::from(7);
        assert!((p.average_rating() - expected).abs() < Decimal::new(1, 9));
    }

    #[test]
    fn accrue_and_payout() {
        let mut p = ServiceProvider::new("Leak Busters", "SAR");
        p.accrue(Money::sar(Decimal::new(170, 0)));
        assert_eq!(p.pending_balance().amount(), Decimal::new(170, 0));
        assert_eq!(p.total_earned().amount(), Decimal::new(170, 0));
        p.debit_for_payout(&Money::sar(Decimal::new(100, 0))).unwrap();
        assert_eq!(p.pending_balance().amount(), Decimal::new(70, 0));
        assert_eq!(p.total_earned().amount(), Decimal::new(170, 0));
    }

    #[test]
    fn payout_cannot_exceed_balance() {
        let mut p = ServiceProvider::new("Shine Cleaners", "SAR");
        p.accrue(Money::sar(Decimal::new(50, 0)));
        let err = p.debit_for_payout(&Money::sar(Decimal::new(80, 0))).unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientBalance));
        assert_eq!(p.pending_balance().amount(), Decimal::new(50, 0));
    }

    #[test]
    fn payout_must_be_positive() {
        let mut p = ServiceProvider::new("Shine Cleaners", "SAR");
        assert!(matches!(p.debit_for_payout(&Money::sar(Decimal::ZERO)), Err(ProviderError::NonPositivePayout)));
    }
}
