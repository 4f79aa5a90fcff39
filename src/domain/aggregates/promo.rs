//! Promo codes: validity rules and discount computation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
pub struct PromoCode {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub max_total_uses: Option<i64>,
    pub max_uses_per_customer: Option<i64>,
    pub minimum_order_amount: Option<Decimal>,
    pub allowed_services: Vec<Uuid>,
    pub allowed_categories: Vec<Uuid>,
    pub allowed_regions: Vec<String>,
    pub first_order_only: bool,
    pub is_active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType { Percentage, Fixed }

/// Usage counters sourced from recorded redemptions.
#[derive(Clone, Copy, Debug, Default)]
pub struct PromoUsage { pub total: i64, pub by_customer: i64 }

/// Everything about the order being quoted that the rules inspect.
#[derive(Clone, Debug)]
pub struct RedemptionContext {
    pub order_amount: Money,
    pub service_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub region: Option<String>,
    pub prior_uses: PromoUsage,
    pub completed_bookings: i64,
}

impl PromoCode {
    /// Runs the checks in order, short-circuiting on the first failure, and
    /// returns the discount amount on success.
    pub fn validate(&self, ctx: &RedemptionContext, now: DateTime<Utc>) -> Result<Money, PromoRejection> {
        if !self.is_active { return Err(PromoRejection::NotFound); }
        if now < self.valid_from || now > self.valid_until { return Err(PromoRejection::Expired); }
        if let Some(min) = self.minimum_order_amount {
            if ctx.order_amount.amount() < min { return Err(PromoRejection::BelowMinimum); }
        }
        if let Some(cap) = self.max_total_uses {
            if ctx.prior_uses.total >= cap { return Err(PromoRejection::UsageLimitReached); }
        }
        if let Some(cap) = self.max_uses_per_customer {
            if ctx.prior_uses.by_customer >= cap { return Err(PromoRejection::CustomerLimitReached); }
        }
        if !self.allowed_services.is_empty()
            && !ctx.service_id.is_some_and(|s| self.allowed_services.contains(&s))
        {
            return Err(PromoRejection::NotApplicable);
        }
        if !self.allowed_categories.is_empty()
            && !ctx.category_id.is_some_and(|c| self.allowed_categories.contains(&c))
        {
            return Err(PromoRejection::NotApplicable);
        }
        if !self.allowed_regions.is_empty() {
            let matched = ctx.region.as_deref()
                .is_some_and(|r| self.allowed_regions.iter().any(|a| a.eq_ignore_ascii_case(r)));
            if !matched { return Err(PromoRejection::NotApplicable); }
        }
        if self.first_order_only && ctx.completed_bookings > 0 {
            return Err(PromoRejection::NotEligible);
        }
        Ok(self.discount_for(&ctx.order_amount))
    }

    /// Percentage discounts are capped by `max_discount_amount`; fixed
    /// discounts never exceed the order itself.
    pub fn discount_for(&self, order: &Money) -> Money {
        match self.discount_type {
            DiscountType::Percentage => {
                let discount = order.percent(self.value);
                match self.max_discount_amount {
                    Some(cap) => discount.min(Money::new(cap, order.currency())),
                    None => discount,
                }
            }
            DiscountType::Fixed => Money::new(self.value, order.currency()).min(order.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromoRejection {
    NotFound,
    Expired,
    BelowMinimum,
    UsageLimitReached,
    CustomerLimitReached,
    NotApplicable,
    NotEligible,
}

impl PromoRejection {
    /// Stable machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::BelowMinimum => "below_minimum",
            Self::UsageLimitReached => "usage_limit_reached",
            Self::CustomerLimitReached => "customer_limit_reached",
            Self::NotApplicable => "not_applicable",
            Self::NotEligible => "not_eligible",
        }
    }
}

impl std::error::Error for PromoRejection {}
impl fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "promo code not found"),
            Self::Expired => write!(f, "promo code is not valid at this time"),
            Self::BelowMinimum => write!(f, "order is below the promo code minimum"),
            Self::UsageLimitReached => write!(f, "promo code usage limit reached"),
            Self::CustomerLimitReached => write!(f, "you have already used this promo code the maximum number of times"),
            Self::NotApplicable => write!(f, "promo code does not apply to this order"),
            Self::NotEligible => write!(f, "promo code is for first orders only"),
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self { Self::Percentage => "percentage", Self::Fixed => "fixed" };
        write!(f, "{s}")
    }
}

impl FromStr for DiscountType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage), "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown discount type: {other}")),
        }
    }
}

/// A recorded application of a code to a booking; backs the usage caps.
#[derive(Clone, Debug, Serialize)]
pub struct PromoRedemption {
    pub(crate) id: Uuid,
    pub(crate) code: String,
    pub(crate) customer_id: Uuid,
    pub(crate) booking_id: Uuid,
    pub(crate) redeemed_at: DateTime<Utc>,
}

impl PromoRedemption {
    pub fn new(code: impl Into<String>, customer_id: Uuid, booking_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(), code: code.into(), customer_id, booking_id, redeemed_at: Utc::now() }
    }
    pub fn code(&self) -> &str { &self.code }
    pub fn customer_id(&self) -> Uuid { self.customer_id }
    pub fn booking_id(&self) -> Uuid { self.booking_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_code() -> PromoCode {
        PromoCode {
            code: "WELCOME20".into(),
            discount_type: DiscountType::Percentage,
            value: Decimal::new(20, 0),
            max_discount_amount: None,
            valid_from: Utc::now() - Duration::days(1),
            valid_until: Utc::now() + Duration::days(30),
            max_total_uses: None,
            max_uses_per_customer: None,
            minimum_order_amount: None,
            allowed_services: vec![],
            allowed_categories: vec![],
            allowed_regions: vec![],
            first_order_only: false,
            is_active: true,
        }
    }

    fn ctx(order: Decimal) -> RedemptionContext {
        RedemptionContext {
            order_amount: Money::sar(order),
            service_id: None, category_id: None, region: None,
            prior_uses: PromoUsage::default(), completed_bookings: 2,
        }
    }

    #[test]
    fn percentage_discount_is_capped() {
        let mut code = base_code();
        code.max_discount_amount = Some(Decimal::new(50, 0));
        let discount = code.validate(&ctx(Decimal::new(500, 0)), Utc::now()).unwrap();
        assert_eq!(discount.amount(), Decimal::new(50, 0));
    }

    #[test]
    fn percentage_discount_uncapped() {
        let discount = base_code().validate(&ctx(Decimal::new(500, 0)), Utc::now()).unwrap();
        assert_eq!(discount.amount(), Decimal::new(100, 0));
    }

    #[test]
    fn fixed_discount_never_exceeds_order() {
        let mut code = base_code();
        code.discount_type = DiscountType::Fixed;
        code.value = Decimal::new(75, 0);
        let discount = code.validate(&ctx(Decimal::new(40, 0)), Utc::now()).unwrap();
        assert_eq!(discount.amount(), Decimal::new(40, 0));
    }

    #[test]
    fn expired_wins_over_everything_else() {
        let mut code = base_code();
        code.valid_until = Utc::now() - Duration::days(1);
        code.max_discount_amount = Some(Decimal::new(50, 0));
        assert_eq!(code.validate(&ctx(Decimal::new(500, 0)), Utc::now()), Err(PromoRejection::Expired));
    }

    #[test]
    fn not_yet_started_is_also_expired() {
        let mut code = base_code();
        code.valid_from = Utc::now() + Duration::days(1);
        assert_eq!(code.validate(&ctx(Decimal::ONE), Utc::now()), Err(PromoRejection::Expired));
    }

    #[test]
    fn inactive_reads_as_not_found() {
        let mut code = base_code();
        code.is_active = false;
        assert_eq!(code.validate(&ctx(Decimal::ONE), Utc::now()), Err(PromoRejection::NotFound));
    }

    #[test]
    fn below_minimum_order() {
        let mut code = base_code();
        code.minimum_order_amount = Some(Decimal::new(100, 0));
        assert_eq!(code.validate(&ctx(Decimal::new(99, 0)), Utc::now()), Err(PromoRejection::BelowMinimum));
    }

    #[test]
    fn usage_caps() {
        let mut code = base_code();
        code.max_total_uses = Some(10);
        code.max_uses_per_customer = Some(2);
        let mut c = ctx(Decimal::new(200, 0));
        c.prior_uses = PromoUsage { total: 10, by_customer: 0 };
        assert_eq!(code.validate(&c, Utc::now()), Err(PromoRejection::UsageLimitReached));
        c.prior_uses = PromoUsage { total: 5, by_customer: 2 };
        assert_eq!(code.validate(&c, Utc::now()), Err(PromoRejection::CustomerLimitReached));
    }

    #[test]
    fn service_restriction() {
        let allowed = Uuid::new_v4();
        let mut code = base_code();
        code.allowed_services = vec![allowed];
        let mut c = ctx(Decimal::new(200, 0));
        c.service_id = Some(Uuid::new_v4());
        assert_eq!(code.validate(&c, Utc::now()), Err(PromoRejection::NotApplicable));
        c.service_id = Some(allowed);
        assert!(code.validate(&c, Utc::now()).is_ok());
    }

    #[test]
    fn region_restriction_ignores_case() {
        let mut code = base_code();
        code.allowed_regions = vec!["riyadh".into()];
        let mut c = ctx(Decimal::new(200, 0));
        c.region = Some("Riyadh".into());
        assert!(code.validate(&c, Utc::now()).is_ok());
        c.region = Some("Jeddah".into());
        assert_eq!(code.validate(&c, Utc::now()), Err(PromoRejection::NotApplicable));
    }

    #[test]
    fn first_order_only() {
        let mut code = base_code();
        code.first_order_only = true;
        let mut c = ctx(Decimal::new(200, 0));
        assert_eq!(code.validate(&c, Utc::now()), Err(PromoRejection::NotEligible));
        c.completed_bookings = 0;
        assert!(code.validate(&c, Utc::now()).is_ok());
    }
}
