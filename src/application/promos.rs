//! Promo code validation service

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::application::error::CoreResult;
use crate::application::ports::MarketplaceStore;
use crate::domain::aggregates::{PromoRejection, RedemptionContext};
use crate::domain::value_objects::Money;

#[derive(Clone)]
pub struct PromoService {
    store: Arc<dyn MarketplaceStore>,
}

#[derive(Clone, Debug)]
pub struct QuoteRequest {
    pub code: String,
    pub customer_id: Uuid,
    pub order_amount: Money,
    pub service_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub region: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DiscountQuote {
    pub code: String,
    pub discount: Money,
    pub final_amount: Money,
}

/// Outcome of a validation request. A rejection is a normal answer, not an
/// error: the endpoint reports it, booking creation turns it into a
/// validation failure.
#[derive(Clone, Debug)]
pub enum PromoEvaluation {
    Approved(DiscountQuote),
    Rejected(PromoRejection),
}

impl PromoService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, req), fields(code = %req.code))]
    pub async fn evaluate(&self, req: QuoteRequest) -> CoreResult<PromoEvaluation> {
        let code = req.code.trim().to_uppercase();
        let Some(promo) = self.store.promo_code(&code).await? else {
            return Ok(PromoEvaluation::Rejected(PromoRejection::NotFound));
        };
        let prior_uses = self.store.promo_usage(&code, req.customer_id).await?;
        let completed_bookings = if promo.first_order_only {
            self.store.count_completed_bookings(req.customer_id).await?
        } else {
            0
        };
        let ctx = RedemptionContext {
            order_amount: req.order_amount.clone(),
            service_id: req.service_id,
            category_id: req.category_id,
            region: req.region,
            prior_uses,
            completed_bookings,
        };
        Ok(match promo.validate(&ctx, Utc::now()) {
            Ok(discount) => PromoEvaluation::Approved(DiscountQuote {
                code,
                final_amount: req.order_amount - discount.clone(),
                discount,
            }),
            Err(rejection) => PromoEvaluation::Rejected(rejection),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{DiscountType, PromoCode};
    use crate::infra::memory::MemoryStore;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn service() -> (PromoService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (PromoService::new(store.clone()), store)
    }

    fn percent_code(code: &str, value: i64) -> PromoCode {
        PromoCode {
            code: code.into(),
            discount_type: DiscountType::Percentage,
            value: Decimal::new(value, 0),
            max_discount_amount: None,
            valid_from: Utc::now() - Duration::days(1),
            valid_until: Utc::now() + Duration::days(1),
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

    #[tokio::test]
    async fn unknown_code_is_rejected_not_an_error() {
        let (svc, _) = service();
        let out = svc
            .evaluate(QuoteRequest {
                code: "NOPE".into(),
                customer_id: Uuid::new_v4(),
                order_amount: Money::sar(Decimal::new(100, 0)),
                service_id: None,
                category_id: None,
                region: None,
            })
            .await
            .unwrap();
        assert!(matches!(out, PromoEvaluation::Rejected(PromoRejection::NotFound)));
    }

    #[tokio::test]
    async fn code_lookup_is_case_insensitive() {
        let (svc, store) = service();
        store.seed_promo(percent_code("SPRING10", 10));
        let out = svc
            .evaluate(QuoteRequest {
                code: " spring10 ".into(),
                customer_id: Uuid::new_v4(),
                order_amount: Money::sar(Decimal::new(200, 0)),
                service_id: None,
                category_id: None,
                region: None,
            })
            .await
            .unwrap();
        match out {
            PromoEvaluation::Approved(q) => {
                assert_eq!(q.discount.amount(), Decimal::new(20, 0));
                assert_eq!(q.final_amount.amount(), Decimal::new(180, 0));
            }
            other => panic!("expected approval, got {other:?}"),
        }
    }
}
