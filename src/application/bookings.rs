//! Booking lifecycle commands

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::error::{CoreError, CoreResult};
use crate::application::ports::{MarketplaceStore, Notifier};
use crate::application::promos::{PromoEvaluation, PromoService, QuoteRequest};
use crate::domain::aggregates::{Booking, BookingStatus, NewBooking, ProgressStep, PromoRedemption};
use crate::domain::value_objects::Money;

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn MarketplaceStore>,
    notifier: Arc<dyn Notifier>,
    promos: PromoService,
    /// Platform commission withheld from provider earnings, in percent.
    commission_rate: Decimal,
}

#[derive(Clone, Debug)]
pub struct CreateBooking {
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub address_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub instructions: Option<String>,
    pub promo_code: Option<String>,
}

impl BookingService {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: Arc<dyn Notifier>, commission_rate: Decimal) -> Self {
        let promos = PromoService::new(store.clone());
        Self { store, notifier, promos, commission_rate }
    }

    #[instrument(skip(self, cmd), fields(customer = %cmd.customer_id, service = %cmd.service_id))]
    pub async fn create(&self, cmd: CreateBooking) -> CoreResult<Booking> {
        let offering = self
            .store
            .service_offering(cmd.service_id)
            .await?
            .filter(|o| o.is_active)
            .ok_or(CoreError::NotFound("service"))?;
        let address = self
            .store
            .customer_address(cmd.address_id)
            .await?
            .filter(|a| a.customer_id == cmd.customer_id)
            .ok_or(CoreError::NotFound("address"))?;

        let base = offering.base_price.clone();
        let mut discount = Money::zero(base.currency());
        let mut applied_code = None;
        if let Some(code) = cmd.promo_code.as_deref() {
            let evaluation = self
                .promos
                .evaluate(QuoteRequest {
                    code: code.to_owned(),
                    customer_id: cmd.customer_id,
                    order_amount: base.clone(),
                    service_id: Some(offering.id),
                    category_id: Some(offering.category_id),
                    region: Some(address.region.clone()),
                })
                .await?;
            match evaluation {
                PromoEvaluation::Approved(quote) => {
                    discount = quote.discount;
                    applied_code = Some(quote.code);
                }
                PromoEvaluation::Rejected(rejection) => {
                    return Err(CoreError::Validation(rejection.to_string()));
                }
            }
        }

        let total = base - discount.clone();
        let mut booking = Booking::create(NewBooking {
            customer_id: cmd.customer_id,
            service_id: cmd.service_id,
            address_id: cmd.address_id,
            scheduled_at: cmd.scheduled_at,
            instructions: cmd.instructions,
            promo_code: applied_code.clone(),
            total,
            discount,
        })?;
        let redemption = applied_code.map(|c| PromoRedemption::new(c, cmd.customer_id, booking.id()));
        self.store.insert_booking(&booking, redemption.as_ref()).await?;
        info!(booking = %booking.id(), reference = booking.reference(), "booking created");
        self.publish(&mut booking).await;
        Ok(booking)
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Booking> {
        self.store.booking(id).await?.ok_or(CoreError::NotFound("booking"))
    }

    pub async fn list(&self, limit: i64, offset: i64) -> CoreResult<(Vec<Booking>, i64)> {
        Ok(self.store.bookings_page(limit, offset).await?)
    }

    #[instrument(skip(self), fields(booking = %booking_id, provider = %provider_id))]
    pub async fn accept(&self, booking_id: Uuid, provider_id: Uuid, estimated_arrival: Option<DateTime<Utc>>) -> CoreResult<Booking> {
        let mut booking = self.get(booking_id).await?;
        booking.accept(provider_id, estimated_arrival)?;
        self.store.update_booking(&mut booking).await?;
        self.notifier
            .notify(
                booking.customer_id(),
                "Booking confirmed",
                &format!("Your booking {} has been accepted.", booking.reference()),
                serde_json::json!({ "booking_id": booking.id() }),
            )
            .await;
        self.publish(&mut booking).await;
        Ok(booking)
    }

    #[instrument(skip(self, reason), fields(booking = %booking_id, provider = %provider_id))]
    pub async fn decline(&self, booking_id: Uuid, provider_id: Uuid, reason: String) -> CoreResult<Booking> {
        let mut booking = self.get(booking_id).await?;
        booking.decline(provider_id, reason)?;
        self.store.update_booking(&mut booking).await?;
        self.notifier
            .notify(
                booking.customer_id(),
                "Booking declined",
                &format!("Booking {} was declined by the provider.", booking.reference()),
                serde_json::json!({ "booking_id": booking.id() }),
            )
            .await;
        self.publish(&mut booking).await;
        Ok(booking)
    }

    /// Provider progress report. Completion also accrues the provider's net
    /// earnings in the same atomic store call.
    #[instrument(skip(self, notes, photos), fields(booking = %booking_id, step = %step))]
    pub async fn update_progress(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
        step: ProgressStep,
        notes: Option<String>,
        photos: Vec<String>,
    ) -> CoreResult<Booking> {
        let mut booking = self.get(booking_id).await?;
        booking.record_progress(provider_id, step, notes, photos)?;
        if booking.status() == BookingStatus::Completed {
            let net = self.net_earnings(booking.total());
            self.store.complete_booking(&mut booking, &net).await?;
            info!(booking = %booking.id(), net = %net, "booking completed, earnings accrued");
            self.notifier
                .notify(
                    booking.customer_id(),
                    "Service completed",
                    &format!("Booking {} is complete. You can now leave a review.", booking.reference()),
                    serde_json::json!({ "booking_id": booking.id() }),
                )
                .await;
        } else {
            self.store.update_booking(&mut booking).await?;
        }
        self.publish(&mut booking).await;
        Ok(booking)
    }

    #[instrument(skip(self, reason), fields(booking = %booking_id))]
    pub async fn cancel(&self, booking_id: Uuid, user_id: Uuid, reason: String, by_customer: bool) -> CoreResult<Booking> {
        let mut booking = self.get(booking_id).await?;
        booking.cancel(user_id, reason, by_customer)?;
        self.store.update_booking(&mut booking).await?;
        if let Some(provider_id) = booking.provider_id() {
            if by_customer {
                self.notifier
                    .notify(
                        provider_id,
                        "Booking cancelled",
                        &format!("Booking {} was cancelled by the customer.", booking.reference()),
                        serde_json::json!({ "booking_id": booking.id() }),
                    )
                    .await;
            }
        }
        self.publish(&mut booking).await;
        Ok(booking)
    }

    #[instrument(skip(self, reason), fields(booking = %booking_id))]
    pub async fn dispute(&self, booking_id: Uuid, user_id: Uuid, reason: String) -> CoreResult<Booking> {
        let mut booking = self.get(booking_id).await?;
        booking.dispute(user_id, reason)?;
        self.store.update_booking(&mut booking).await?;
        self.publish(&mut booking).await;
        Ok(booking)
    }

    fn net_earnings(&self, total: &Money) -> Money {
        total.clone() - total.percent(self.commission_rate)
    }

    async fn publish(&self, booking: &mut Booking) {
        for event in booking.take_events() {
            self.notifier.broadcast(&event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{DiscountType, PromoCode, ServiceProvider};
    use crate::domain::catalog::{CustomerAddress, ServiceOffering};
    use crate::infra::memory::MemoryStore;
    use crate::infra::notify::LogNotifier;
    use chrono::Duration;

    struct Fixture {
        svc: BookingService,
        store: Arc<MemoryStore>,
        customer_id: Uuid,
        service_id: Uuid,
        address_id: Uuid,
        category_id: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let svc = BookingService::new(store.clone(), Arc::new(LogNotifier), Decimal::new(15, 0));
        let customer_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();
        let offering = ServiceOffering {
            id: Uuid::new_v4(),
            name: "Deep cleaning".into(),
            category_id,
            base_price: Money::sar(Decimal::new(500, 0)),
            is_active: true,
        };
        let address = CustomerAddress {
            id: Uuid::new_v4(),
            customer_id,
            label: "Home".into(),
            region: "Riyadh".into(),
        };
        let service_id = offering.id;
        let address_id = address.id;
        store.seed_offering(offering);
        store.seed_address(address);
        Fixture { svc, store, customer_id, service_id, address_id, category_id }
    }

    fn create_cmd(f: &Fixture) -> CreateBooking {
        CreateBooking {
            customer_id: f.customer_id,
            service_id: f.service_id,
            address_id: f.address_id,
            scheduled_at: Utc::now() + Duration::hours(6),
            instructions: Some("gate code 4411".into()),
            promo_code: None,
        }
    }

    #[tokio::test]
    async fn create_prices_from_the_catalog() {
        let f = fixture();
        let booking = f.svc.create(create_cmd(&f)).await.unwrap();
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.total().amount(), Decimal::new(500, 0));
        assert!(f.svc.get(booking.id()).await.is_ok());
    }

    #[tokio::test]
    async fn create_rejects_unknown_service_and_foreign_address() {
        let f = fixture();
        let mut cmd = create_cmd(&f);
        cmd.service_id = Uuid::new_v4();
        assert!(matches!(f.svc.create(cmd).await, Err(CoreError::NotFound("service"))));

        let other = CustomerAddress { id: Uuid::new_v4(), customer_id: Uuid::new_v4(), label: "Other".into(), region: "Riyadh".into() };
        let other_id = other.id;
        f.store.seed_address(other);
        let mut cmd = create_cmd(&f);
        cmd.address_id = other_id;
        assert!(matches!(f.svc.create(cmd).await, Err(CoreError::NotFound("address"))));
    }

    #[tokio::test]
    async fn promo_discount_reduces_total_and_records_redemption() {
        let f = fixture();
        f.store.seed_promo(PromoCode {
            code: "SAVE20".into(),
            discount_type: DiscountType::Percentage,
            value: Decimal::new(20, 0),
            max_discount_amount: Some(Decimal::new(50, 0)),
            valid_from: Utc::now() - Duration::days(1),
            valid_until: Utc::now() + Duration::days(1),
            max_total_uses: None,
            max_uses_per_customer: Some(1),
            minimum_order_amount: None,
            allowed_services: vec![],
            allowed_categories: vec![f.category_id],
            allowed_regions: vec!["Riyadh".into()],
            first_order_only: false,
            is_active: true,
        });
        let mut cmd = create_cmd(&f);
        cmd.promo_code = Some("save20".into());
        let booking = f.svc.create(cmd).await.unwrap();
        assert_eq!(booking.discount().amount(), Decimal::new(50, 0));
        assert_eq!(booking.total().amount(), Decimal::new(450, 0));
        assert_eq!(booking.promo_code(), Some("SAVE20"));

        let usage = f.store.promo_usage("SAVE20", f.customer_id).await.unwrap();
        assert_eq!(usage.total, 1);
        assert_eq!(usage.by_customer, 1);

        // per-customer cap now exhausted
        let mut again = create_cmd(&f);
        again.promo_code = Some("SAVE20".into());
        assert!(matches!(f.svc.create(again).await, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn concurrent_accepts_resolve_to_one_winner() {
        let f = fixture();
        let booking = f.svc.create(create_cmd(&f)).await.unwrap();
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let (r1, r2) = tokio::join!(
            f.svc.accept(booking.id(), p1, None),
            f.svc.accept(booking.id(), p2, None)
        );
        let winners = [r1.is_ok(), r2.is_ok()].into_iter().filter(|ok| *ok).count();
        assert_eq!(winners, 1);
        let loser_err = if r1.is_err() { r1.unwrap_err() } else { r2.unwrap_err() };
        assert!(matches!(loser_err, CoreError::Conflict(_) | CoreError::InvalidTransition(_)));

        let fresh = f.svc.get(booking.id()).await.unwrap();
        assert_eq!(fresh.status(), BookingStatus::Confirmed);
        assert!(fresh.provider_id() == Some(p1) || fresh.provider_id() == Some(p2));
    }

    #[tokio::test]
    async fn completion_accrues_net_earnings() {
        let f = fixture();
        let provider = ServiceProvider::new("Shine Cleaners", "SAR");
        let provider_id = provider.id();
        f.store.seed_provider(provider);

        let booking = f.svc.create(create_cmd(&f)).await.unwrap();
        f.svc.accept(booking.id(), provider_id, None).await.unwrap();
        f.svc.update_progress(booking.id(), provider_id, ProgressStep::OnTheWay, None, vec![]).await.unwrap();
        f.svc.update_progress(booking.id(), provider_id, ProgressStep::InProgress, None, vec![]).await.unwrap();
        let done = f.svc.update_progress(booking.id(), provider_id, ProgressStep::Completed, None, vec![]).await.unwrap();
        assert_eq!(done.status(), BookingStatus::Completed);
        assert!(done.completed_at().is_some());

        // 500 total minus 15% commission
        let p = f.store.provider(provider_id).await.unwrap().unwrap();
        assert_eq!(p.pending_balance().amount(), Decimal::new(425, 0));
    }

    #[tokio::test]
    async fn skipping_straight_to_completed_is_rejected() {
        let f = fixture();
        let provider_id = Uuid::new_v4();
        let booking = f.svc.create(create_cmd(&f)).await.unwrap();
        f.svc.accept(booking.id(), provider_id, None).await.unwrap();
        let err = f
            .svc
            .update_progress(booking.id(), provider_id, ProgressStep::Completed, None, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
        assert_eq!(f.svc.get(booking.id()).await.unwrap().status(), BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn cancel_allowed_until_work_starts() {
        let f = fixture();
        let booking = f.svc.create(create_cmd(&f)).await.unwrap();
        let cancelled = f.svc.cancel(booking.id(), f.customer_id, "plans changed".into(), true).await.unwrap();
        assert_eq!(cancelled.status(), BookingStatus::Cancelled);

        let booking = f.svc.create(create_cmd(&f)).await.unwrap();
        let provider_id = Uuid::new_v4();
        f.svc.accept(booking.id(), provider_id, None).await.unwrap();
        f.svc.update_progress(booking.id(), provider_id, ProgressStep::OnTheWay, None, vec![]).await.unwrap();
        let err = f.svc.cancel(booking.id(), f.customer_id, "too late".into(), true).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
    }
}
