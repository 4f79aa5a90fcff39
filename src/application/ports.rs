//! Collaborator interfaces the core calls through

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{
    Booking, Payment, PaymentMethod, Payout, PromoCode, PromoRedemption, PromoUsage, Review,
    ServiceProvider,
};
use crate::domain::catalog::{CustomerAddress, ServiceOffering};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{Money, Rating};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("version conflict")]
    VersionConflict,
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("storage backend: {0}")]
    Backend(String),
}

/// Entity lookup and persistence. Methods that name more than one record are
/// single atomic units; booking writes compare-and-swap on
/// [`Booking::version`] and bump it on success.
#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    // bookings
    async fn insert_booking(&self, booking: &Booking, redemption: Option<&PromoRedemption>) -> Result<(), StoreError>;
    async fn booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;
    async fn bookings_page(&self, limit: i64, offset: i64) -> Result<(Vec<Booking>, i64), StoreError>;
    async fn update_booking(&self, booking: &mut Booking) -> Result<(), StoreError>;
    /// Booking update plus provider earnings credit.
    async fn complete_booking(&self, booking: &mut Booking, net: &Money) -> Result<(), StoreError>;
    async fn count_completed_bookings(&self, customer_id: Uuid) -> Result<i64, StoreError>;

    // payments
    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;
    async fn completed_payment(&self, booking_id: Uuid) -> Result<Option<Payment>, StoreError>;
    /// Final payment state plus, when the capture confirmed it, the booking.
    async fn finalize_payment(&self, payment: &Payment, booking: Option<&mut Booking>) -> Result<(), StoreError>;

    // reviews
    async fn review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, StoreError>;
    async fn review(&self, id: Uuid) -> Result<Option<Review>, StoreError>;
    /// Review insert plus the provider's running-mean update; returns the
    /// provider as updated.
    async fn insert_review(&self, review: &Review, rating: Rating) -> Result<ServiceProvider, StoreError>;
    async fn update_review(&self, review: &Review) -> Result<(), StoreError>;

    // providers & payouts
    async fn provider(&self, id: Uuid) -> Result<Option<ServiceProvider>, StoreError>;
    /// Payout insert plus pending-balance debit; fails with
    /// [`StoreError::InsufficientFunds`] rather than overdrawing.
    async fn insert_payout(&self, payout: &Payout) -> Result<(), StoreError>;

    // promo codes
    async fn promo_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError>;
    async fn promo_usage(&self, code: &str, customer_id: Uuid) -> Result<PromoUsage, StoreError>;

    // catalog lookups
    async fn service_offering(&self, id: Uuid) -> Result<Option<ServiceOffering>, StoreError>;
    async fn customer_address(&self, id: Uuid) -> Result<Option<CustomerAddress>, StoreError>;
}

#[derive(Clone, Debug)]
pub enum ChargeOutcome {
    Approved { transaction_id: String },
    Declined { reason: String },
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ExternalServiceError(pub String);

/// The single slow, money-moving collaborator. Implementations carry their
/// own bounded timeout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, method: PaymentMethod, amount: &Money, token: Option<&str>) -> Result<ChargeOutcome, ExternalServiceError>;
}

/// Best-effort review enrichment; failures never block the write path.
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<f64, ExternalServiceError>;
}

/// Fire-and-forget from the core's perspective: implementations log and
/// swallow their own delivery failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, title: &str, body: &str, metadata: serde_json::Value);
    async fn broadcast(&self, event: &DomainEvent);
}
