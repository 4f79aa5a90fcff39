//! Value Objects for the Marketplace

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Money value object: exact decimal amount plus a currency code.
///
/// All arithmetic is decimal-exact. Mixing currencies in `+`/`-` is a
/// programming error and panics; every value in a booking flow derives from
/// that booking's currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_uppercase() } }
    pub fn sar(amount: Decimal) -> Self { Self::new(amount, "SAR") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_zero(&self) -> bool { self.amount.is_zero() }
    pub fn is_negative(&self) -> bool { self.amount.is_sign_negative() && !self.amount.is_zero() }
    pub fn is_positive(&self) -> bool { self.amount.is_sign_positive() && !self.amount.is_zero() }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
    /// `pct` percent of this amount, e.g. `percent(20)` on 500 is 100.
    pub fn percent(&self, pct: Decimal) -> Money { Money::new(self.amount * pct / Decimal::ONE_HUNDRED, &self.currency) }
    /// Gross amount after applying a VAT rate, e.g. `add_vat(15)` on 100 SAR is 115 SAR.
    pub fn add_vat(&self, rate: Decimal) -> Money { self.clone() + self.percent(rate) }
    /// The smaller of two amounts of the same currency.
    pub fn min(self, other: Money) -> Money {
        self.assert_same_currency(&other);
        if other.amount < self.amount { other } else { self }
    }

    fn assert_same_currency(&self, other: &Money) {
        assert_eq!(self.currency, other.currency, "money arithmetic across currencies");
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        self.assert_same_currency(&rhs);
        Money::new(self.amount + rhs.amount, &self.currency)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        self.assert_same_currency(&rhs);
        Money::new(self.amount - rhs.amount, &self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency) }
}

/// Review rating, constrained to 1..=5 at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Rating(i32);

impl Rating {
    pub fn new(value: i32) -> Result<Self, RatingError> {
        if !(1..=5).contains(&value) { return Err(RatingError::OutOfRange); }
        Ok(Self(value))
    }
    pub fn value(&self) -> i32 { self.0 }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone)] pub enum RatingError { OutOfRange }
impl std::error::Error for RatingError {}
impl fmt::Display for RatingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "rating must be between 1 and 5") }
}
