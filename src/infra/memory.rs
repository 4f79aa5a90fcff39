//! In-memory store: backs tests and ephemeral deployments without a database

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::ports::{MarketplaceStore, StoreError};
use crate::domain::aggregates::{
    Booking, BookingStatus, Payment, PaymentStatus, Payout, PromoCode, PromoRedemption, PromoUsage,
    ProviderError, Review, ServiceProvider,
};
use crate::domain::catalog::{CustomerAddress, ServiceOffering};
use crate::domain::value_objects::{Money, Rating};

#[derive(Default)]
struct Tables {
    bookings: HashMap<Uuid, Booking>,
    payments: Vec<Payment>,
    reviews: HashMap<Uuid, Review>,
    providers: HashMap<Uuid, ServiceProvider>,
    promos: HashMap<String, PromoCode>,
    redemptions: Vec<PromoRedemption>,
    payouts: Vec<Payout>,
    offerings: HashMap<Uuid, ServiceOffering>,
    addresses: HashMap<Uuid, CustomerAddress>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn seed_offering(&self, offering: ServiceOffering) {
        self.write().offerings.insert(offering.id, offering);
    }

    pub fn seed_address(&self, address: CustomerAddress) {
        self.write().addresses.insert(address.id, address);
    }

    pub fn seed_provider(&self, provider: ServiceProvider) {
        self.write().providers.insert(provider.id(), provider);
    }

    pub fn seed_promo(&self, promo: PromoCode) {
        self.write().promos.insert(promo.code.to_uppercase(), promo);
    }

    pub fn payment_count(&self, booking_id: Uuid) -> usize {
        self.read().payments.iter().filter(|p| p.booking_id() == booking_id).count()
    }

    fn stored_clone(booking: &Booking) -> Booking {
        let mut clone = booking.clone();
        clone.events.clear();
        clone
    }

    fn cas_update(tables: &mut Tables, booking: &mut Booking) -> Result<(), StoreError> {
        let stored = tables
            .bookings
            .get_mut(&booking.id())
            .ok_or_else(|| StoreError::Backend("booking vanished".into()))?;
        if stored.version() != booking.version() {
            return Err(StoreError::VersionConflict);
        }
        booking.version += 1;
        *stored = Self::stored_clone(booking);
        Ok(())
    }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn insert_booking(&self, booking: &Booking, redemption: Option<&PromoRedemption>) -> Result<(), StoreError> {
        let mut tables = self.write();
        if tables.bookings.contains_key(&booking.id()) {
            return Err(StoreError::Duplicate("booking"));
        }
        tables.bookings.insert(booking.id(), Self::stored_clone(booking));
        if let Some(redemption) = redemption {
            tables.redemptions.push(redemption.clone());
        }
        Ok(())
    }

    async fn booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.read().bookings.get(&id).cloned())
    }

    async fn bookings_page(&self, limit: i64, offset: i64) -> Result<(Vec<Booking>, i64), StoreError> {
        let tables = self.read();
        let mut all: Vec<&Booking> = tables.bookings.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = all.len() as i64;
        let page = all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn update_booking(&self, booking: &mut Booking) -> Result<(), StoreError> {
        Self::cas_update(&mut self.write(), booking)
    }

    async fn complete_booking(&self, booking: &mut Booking, net: &Money) -> Result<(), StoreError> {
        let mut tables = self.write();
        let provider_id = booking
            .provider_id()
            .ok_or_else(|| StoreError::Backend("completed booking has no provider".into()))?;
        Self::cas_update(&mut tables, booking)?;
        let provider = tables
            .providers
            .get_mut(&provider_id)
            .ok_or_else(|| StoreError::Backend("provider vanished".into()))?;
        provider.accrue(net.clone());
        Ok(())
    }

    async fn count_completed_bookings(&self, customer_id: Uuid) -> Result<i64, StoreError> {
        Ok(self
            .read()
            .bookings
            .values()
            .filter(|b| b.customer_id() == customer_id && b.status() == BookingStatus::Completed)
            .count() as i64)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        self.write().payments.push(payment.clone());
        Ok(())
    }

    async fn completed_payment(&self, booking_id: Uuid) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .read()
            .payments
            .iter()
            .find(|p| p.booking_id() == booking_id && p.status() == PaymentStatus::Completed)
            .cloned())
    }

    async fn finalize_payment(&self, payment: &Payment, booking: Option<&mut Booking>) -> Result<(), StoreError> {
        let mut tables = self.write();
        let stored = tables
            .payments
            .iter_mut()
            .find(|p| p.id() == payment.id())
            .ok_or_else(|| StoreError::Backend("payment vanished".into()))?;
        *stored = payment.clone();
        if let Some(booking) = booking {
            Self::cas_update(&mut tables, booking)?;
        }
        Ok(())
    }

    async fn review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, StoreError> {
        Ok(self.read().reviews.values().find(|r| r.booking_id() == booking_id).cloned())
    }

    async fn review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        Ok(self.read().reviews.get(&id).cloned())
    }

    async fn insert_review(&self, review: &Review, rating: Rating) -> Result<ServiceProvider, StoreError> {
        let mut tables = self.write();
        if tables.reviews.values().any(|r| r.booking_id() == review.booking_id()) {
            return Err(StoreError::Duplicate("review"));
        }
        let provider = tables
            .providers
            .get_mut(&review.provider_id())
            .ok_or_else(|| StoreError::Backend("provider vanished".into()))?;
        provider.record_rating(rating);
        let updated = provider.clone();
        tables.reviews.insert(review.id(), review.clone());
        Ok(updated)
    }

    async fn update_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut tables = self.write();
        let stored = tables
            .reviews
            .get_mut(&review.id())
            .ok_or_else(|| StoreError::Backend("review vanished".into()))?;
        *stored = review.clone();
        Ok(())
    }

    async fn provider(&self, id: Uuid) -> Result<Option<ServiceProvider>, StoreError> {
        Ok(self.read().providers.get(&id).cloned())
    }

    async fn insert_payout(&self, payout: &Payout) -> Result<(), StoreError> {
        let mut tables = self.write();
        let provider = tables
            .providers
            .get_mut(&payout.provider_id())
            .ok_or_else(|| StoreError::Backend("provider vanished".into()))?;
        provider.debit_for_payout(payout.amount()).map_err(|e| match e {
            ProviderError::InsufficientBalance => StoreError::InsufficientFunds,
            ProviderError::NonPositivePayout => StoreError::Backend(e.to_string()),
        })?;
        tables.payouts.push(payout.clone());
        Ok(())
    }

    async fn promo_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        Ok(self.read().promos.get(&code.to_uppercase()).cloned())
    }

    async fn promo_usage(&self, code: &str, customer_id: Uuid) -> Result<PromoUsage, StoreError> {
        let code = code.to_uppercase();
        let tables = self.read();
        let mut usage = PromoUsage::default();
        for redemption in tables.redemptions.iter().filter(|r| r.code() == code) {
            usage.total += 1;
            if redemption.customer_id() == customer_id {
                usage.by_customer += 1;
            }
        }
        Ok(usage)
    }

    async fn service_offering(&self, id: Uuid) -> Result<Option<ServiceOffering>, StoreError> {
        Ok(self.read().offerings.get(&id).cloned())
    }

    async fn customer_address(&self, id: Uuid) -> Result<Option<CustomerAddress>, StoreError> {
        Ok(self.read().addresses.get(&id).cloned())
    }
}
