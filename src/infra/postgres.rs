//! Postgres store: sqlx runtime queries, statuses as TEXT, money as NUMERIC

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::application::ports::{MarketplaceStore, StoreError};
use crate::domain::aggregates::{
    Booking, Cancellation, Payment, Payout, PromoCode, PromoRedemption, PromoUsage, Review,
    ServiceProvider,
};
use crate::domain::catalog::{CustomerAddress, ServiceOffering};
use crate::domain::value_objects::{Money, Rating};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn insert_err(e: sqlx::Error, what: &'static str) -> StoreError {
    if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
        StoreError::Duplicate(what)
    } else {
        backend(e)
    }
}

fn parse<T: std::str::FromStr<Err = String>>(s: &str) -> Result<T, StoreError> {
    s.parse().map_err(StoreError::Backend)
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reference: String,
    customer_id: Uuid,
    service_id: Uuid,
    address_id: Uuid,
    provider_id: Option<Uuid>,
    scheduled_at: DateTime<Utc>,
    status: String,
    progress: Option<String>,
    total: Decimal,
    discount: Decimal,
    currency: String,
    promo_code: Option<String>,
    instructions: Option<String>,
    estimated_arrival: Option<DateTime<Utc>>,
    progress_notes: serde_json::Value,
    decline_reason: Option<String>,
    dispute_reason: Option<String>,
    cancel_reason: Option<String>,
    cancelled_by: Option<Uuid>,
    cancelled_by_customer: Option<bool>,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl BookingRow {
    fn into_domain(self) -> Result<Booking, StoreError> {
        let cancellation = match (self.cancel_reason, self.cancelled_by, self.cancelled_by_customer) {
            (Some(reason), Some(cancelled_by), Some(by_customer)) => {
                Some(Cancellation { reason, by_customer, cancelled_by })
            }
            _ => None,
        };
        Ok(Booking {
            id: self.id,
            reference: self.reference,
            customer_id: self.customer_id,
            service_id: self.service_id,
            address_id: self.address_id,
            provider_id: self.provider_id,
            scheduled_at: self.scheduled_at,
            status: parse(&self.status)?,
            progress: self.progress.as_deref().map(parse).transpose()?,
            total: Money::new(self.total, &self.currency),
            discount: Money::new(self.discount, &self.currency),
            promo_code: self.promo_code,
            instructions: self.instructions,
            estimated_arrival: self.estimated_arrival,
            progress_notes: serde_json::from_value(self.progress_notes)
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            decline_reason: self.decline_reason,
            dispute_reason: self.dispute_reason,
            cancellation,
            created_at: self.created_at,
            accepted_at: self.accepted_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
            updated_at: self.updated_at,
            version: self.version,
            events: vec![],
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: Decimal,
    currency: String,
    method: String,
    status: String,
    transaction_id: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_domain(self) -> Result<Payment, StoreError> {
        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            amount: Money::new(self.amount, &self.currency),
            method: parse(&self.method)?,
            status: parse(&self.status)?,
            transaction_id: self.transaction_id,
            failure_reason: self.failure_reason,
            created_at: self.created_at,
            processed_at: self.processed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    booking_id: Uuid,
    customer_id: Uuid,
    provider_id: Uuid,
    rating: i32,
    comment: Option<String>,
    media_urls: Vec<String>,
    sentiment_score: Option<f64>,
    is_visible: bool,
    provider_response: Option<String>,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_domain(self) -> Result<Review, StoreError> {
        Ok(Review {
            id: self.id,
            booking_id: self.booking_id,
            customer_id: self.customer_id,
            provider_id: self.provider_id,
            rating: Rating::new(self.rating).map_err(|e| StoreError::Backend(e.to_string()))?,
            comment: self.comment,
            media_urls: self.media_urls,
            sentiment_score: self.sentiment_score,
            is_visible: self.is_visible,
            provider_response: self.provider_response,
            responded_at: self.responded_at,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProviderRow {
    id: Uuid,
    display_name: String,
    average_rating: Decimal,
    total_reviews: i64,
    pending_balance: Decimal,
    total_earned: Decimal,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProviderRow {
    fn into_domain(self) -> ServiceProvider {
        ServiceProvider {
            id: self.id,
            display_name: self.display_name,
            average_rating: self.average_rating,
            total_reviews: self.total_reviews,
            pending_balance: Money::new(self.pending_balance, &self.currency),
            total_earned: Money::new(self.total_earned, &self.currency),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PromoRow {
    code: String,
    discount_type: String,
    value: Decimal,
    max_discount_amount: Option<Decimal>,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    max_total_uses: Option<i64>,
    max_uses_per_customer: Option<i64>,
    minimum_order_amount: Option<Decimal>,
    allowed_services: Vec<Uuid>,
    allowed_categories: Vec<Uuid>,
    allowed_regions: Vec<String>,
    first_order_only: bool,
    is_active: bool,
}

impl PromoRow {
    fn into_domain(self) -> Result<PromoCode, StoreError> {
        Ok(PromoCode {
            discount_type: parse(&self.discount_type)?,
            code: self.code,
            value: self.value,
            max_discount_amount: self.max_discount_amount,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            max_total_uses: self.max_total_uses,
            max_uses_per_customer: self.max_uses_per_customer,
            minimum_order_amount: self.minimum_order_amount,
            allowed_services: self.allowed_services,
            allowed_categories: self.allowed_categories,
            allowed_regions: self.allowed_regions,
            first_order_only: self.first_order_only,
            is_active: self.is_active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OfferingRow {
    id: Uuid,
    name: String,
    category_id: Uuid,
    base_price: Decimal,
    currency: String,
    is_active: bool,
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: Uuid,
    customer_id: Uuid,
    label: String,
    region: String,
}

const BOOKING_COLUMNS: &str = "id, reference, customer_id, service_id, address_id, provider_id, scheduled_at, status, progress, total, discount, currency, promo_code, instructions, estimated_arrival, progress_notes, decline_reason, dispute_reason, cancel_reason, cancelled_by, cancelled_by_customer, created_at, accepted_at, started_at, completed_at, cancelled_at, updated_at, version";

/// Conditional update on the stored version; zero rows means a concurrent
/// writer won.
async fn cas_update(conn: &mut PgConnection, booking: &Booking) -> Result<(), StoreError> {
    let notes = serde_json::to_value(&booking.progress_notes)
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let (cancel_reason, cancelled_by, cancelled_by_customer) = cancellation_columns(&booking.cancellation);
    let result = sqlx::query(
        "UPDATE bookings SET provider_id = $2, status = $3, progress = $4, estimated_arrival = $5, \
         progress_notes = $6, decline_reason = $7, dispute_reason = $8, cancel_reason = $9, \
         cancelled_by = $10, cancelled_by_customer = $11, accepted_at = $12, started_at = $13, \
         completed_at = $14, cancelled_at = $15, updated_at = $16, version = version + 1 \
         WHERE id = $1 AND version = $17",
    )
    .bind(booking.id)
    .bind(booking.provider_id)
    .bind(booking.status.to_string())
    .bind(booking.progress.map(|p| p.to_string()))
    .bind(booking.estimated_arrival)
    .bind(notes)
    .bind(&booking.decline_reason)
    .bind(&booking.dispute_reason)
    .bind(cancel_reason)
    .bind(cancelled_by)
    .bind(cancelled_by_customer)
    .bind(booking.accepted_at)
    .bind(booking.started_at)
    .bind(booking.completed_at)
    .bind(booking.cancelled_at)
    .bind(booking.updated_at)
    .bind(booking.version)
    .execute(conn)
    .await
    .map_err(backend)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::VersionConflict);
    }
    Ok(())
}

fn cancellation_columns(c: &Option<Cancellation>) -> (Option<String>, Option<Uuid>, Option<bool>) {
    match c {
        Some(c) => (Some(c.reason.clone()), Some(c.cancelled_by), Some(c.by_customer)),
        None => (None, None, None),
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn insert_booking(&self, booking: &Booking, redemption: Option<&PromoRedemption>) -> Result<(), StoreError> {
        let notes = serde_json::to_value(&booking.progress_notes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let (cancel_reason, cancelled_by, cancelled_by_customer) = cancellation_columns(&booking.cancellation);
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query(
            "INSERT INTO bookings (id, reference, customer_id, service_id, address_id, provider_id, \
             scheduled_at, status, progress, total, discount, currency, promo_code, instructions, \
             estimated_arrival, progress_notes, decline_reason, dispute_reason, cancel_reason, \
             cancelled_by, cancelled_by_customer, created_at, accepted_at, started_at, completed_at, \
             cancelled_at, updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
             $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)",
        )
        .bind(booking.id)
        .bind(&booking.reference)
        .bind(booking.customer_id)
        .bind(booking.service_id)
        .bind(booking.address_id)
        .bind(booking.provider_id)
        .bind(booking.scheduled_at)
        .bind(booking.status.to_string())
        .bind(booking.progress.map(|p| p.to_string()))
        .bind(booking.total.amount())
        .bind(booking.discount.amount())
        .bind(booking.total.currency())
        .bind(&booking.promo_code)
        .bind(&booking.instructions)
        .bind(booking.estimated_arrival)
        .bind(notes)
        .bind(&booking.decline_reason)
        .bind(&booking.dispute_reason)
        .bind(cancel_reason)
        .bind(cancelled_by)
        .bind(cancelled_by_customer)
        .bind(booking.created_at)
        .bind(booking.accepted_at)
        .bind(booking.started_at)
        .bind(booking.completed_at)
        .bind(booking.cancelled_at)
        .bind(booking.updated_at)
        .bind(booking.version)
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_err(e, "booking"))?;
        if let Some(redemption) = redemption {
            sqlx::query(
                "INSERT INTO promo_redemptions (id, code, customer_id, booking_id, redeemed_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(redemption.id)
            .bind(redemption.code())
            .bind(redemption.customer_id())
            .bind(redemption.booking_id())
            .bind(redemption.redeemed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| insert_err(e, "promo redemption"))?;
        }
        tx.commit().await.map_err(backend)
    }

    async fn booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(BookingRow::into_domain).transpose()
    }

    async fn bookings_page(&self, limit: i64, offset: i64) -> Result<(Vec<Booking>, i64), StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let bookings = rows.into_iter().map(BookingRow::into_domain).collect::<Result<_, _>>()?;
        Ok((bookings, total.0))
    }

    async fn update_booking(&self, booking: &mut Booking) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        cas_update(&mut conn, booking).await?;
        booking.version += 1;
        Ok(())
    }

    async fn complete_booking(&self, booking: &mut Booking, net: &Money) -> Result<(), StoreError> {
        let provider_id = booking
            .provider_id()
            .ok_or_else(|| StoreError::Backend("completed booking has no provider".into()))?;
        let mut tx = self.pool.begin().await.map_err(backend)?;
        cas_update(&mut tx, booking).await?;
        let result = sqlx::query(
            "UPDATE service_providers SET pending_balance = pending_balance + $2, \
             total_earned = total_earned + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(provider_id)
        .bind(net.amount())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Backend("provider vanished".into()));
        }
        tx.commit().await.map_err(backend)?;
        booking.version += 1;
        Ok(())
    }

    async fn count_completed_bookings(&self, customer_id: Uuid) -> Result<i64, StoreError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings WHERE customer_id = $1 AND status = 'completed'",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(count.0)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO payments (id, booking_id, amount, currency, method, status, transaction_id, \
             failure_reason, created_at, processed_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(payment.id())
        .bind(payment.booking_id())
        .bind(payment.amount().amount())
        .bind(payment.amount().currency())
        .bind(payment.method().to_string())
        .bind(payment.status().to_string())
        .bind(payment.transaction_id())
        .bind(payment.failure_reason())
        .bind(payment.created_at)
        .bind(payment.processed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_err(e, "payment"))?;
        Ok(())
    }

    async fn completed_payment(&self, booking_id: Uuid) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, booking_id, amount, currency, method, status, transaction_id, failure_reason, \
             created_at, processed_at FROM payments WHERE booking_id = $1 AND status = 'completed'",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(PaymentRow::into_domain).transpose()
    }

    async fn finalize_payment(&self, payment: &Payment, booking: Option<&mut Booking>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query(
            "UPDATE payments SET status = $2, transaction_id = $3, failure_reason = $4, \
             processed_at = $5 WHERE id = $1",
        )
        .bind(payment.id())
        .bind(payment.status().to_string())
        .bind(payment.transaction_id())
        .bind(payment.failure_reason())
        .bind(payment.processed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_err(e, "completed payment"))?;
        let bumped = if let Some(booking) = &booking {
            cas_update(&mut tx, booking).await?;
            true
        } else {
            false
        };
        tx.commit().await.map_err(backend)?;
        if bumped {
            if let Some(booking) = booking {
                booking.version += 1;
            }
        }
        Ok(())
    }

    async fn review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, booking_id, customer_id, provider_id, rating, comment, media_urls, \
             sentiment_score, is_visible, provider_response, responded_at, created_at \
             FROM reviews WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(ReviewRow::into_domain).transpose()
    }

    async fn review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, booking_id, customer_id, provider_id, rating, comment, media_urls, \
             sentiment_score, is_visible, provider_response, responded_at, created_at \
             FROM reviews WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(ReviewRow::into_domain).transpose()
    }

    async fn insert_review(&self, review: &Review, rating: Rating) -> Result<ServiceProvider, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query(
            "INSERT INTO reviews (id, booking_id, customer_id, provider_id, rating, comment, \
             media_urls, sentiment_score, is_visible, provider_response, responded_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(review.id())
        .bind(review.booking_id())
        .bind(review.customer_id)
        .bind(review.provider_id())
        .bind(rating.value())
        .bind(review.comment())
        .bind(&review.media_urls)
        .bind(review.sentiment_score())
        .bind(review.is_visible)
        .bind(&review.provider_response)
        .bind(review.responded_at)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_err(e, "review"))?;
        // running mean updated in SQL so the insert and the aggregate move together
        let row = sqlx::query_as::<_, ProviderRow>(
            "UPDATE service_providers SET \
             average_rating = (average_rating * total_reviews + $2) / (total_reviews + 1), \
             total_reviews = total_reviews + 1, updated_at = NOW() WHERE id = $1 \
             RETURNING id, display_name, average_rating, total_reviews, pending_balance, \
             total_earned, currency, created_at, updated_at",
        )
        .bind(review.provider_id())
        .bind(Decimal::from(rating.value()))
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .ok_or_else(|| StoreError::Backend("provider vanished".into()))?;
        tx.commit().await.map_err(backend)?;
        Ok(row.into_domain())
    }

    async fn update_review(&self, review: &Review) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE reviews SET provider_response = $2, responded_at = $3, is_visible = $4, \
             sentiment_score = $5 WHERE id = $1",
        )
        .bind(review.id())
        .bind(&review.provider_response)
        .bind(review.responded_at)
        .bind(review.is_visible)
        .bind(review.sentiment_score())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn provider(&self, id: Uuid) -> Result<Option<ServiceProvider>, StoreError> {
        let row = sqlx::query_as::<_, ProviderRow>(
            "SELECT id, display_name, average_rating, total_reviews, pending_balance, total_earned, \
             currency, created_at, updated_at FROM service_providers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(ProviderRow::into_domain))
    }

    async fn insert_payout(&self, payout: &Payout) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        // conditional debit so a concurrent payout cannot overdraw
        let result = sqlx::query(
            "UPDATE service_providers SET pending_balance = pending_balance - $2, updated_at = NOW() \
             WHERE id = $1 AND pending_balance >= $2",
        )
        .bind(payout.provider_id())
        .bind(payout.amount().amount())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::InsufficientFunds);
        }
        sqlx::query(
            "INSERT INTO payouts (id, provider_id, amount, currency, status, requested_at, processed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(payout.id())
        .bind(payout.provider_id())
        .bind(payout.amount().amount())
        .bind(payout.amount().currency())
        .bind(payout.status().to_string())
        .bind(payout.requested_at)
        .bind(payout.processed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_err(e, "payout"))?;
        tx.commit().await.map_err(backend)
    }

    async fn promo_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        let row = sqlx::query_as::<_, PromoRow>(
            "SELECT code, discount_type, value, max_discount_amount, valid_from, valid_until, \
             max_total_uses, max_uses_per_customer, minimum_order_amount, allowed_services, \
             allowed_categories, allowed_regions, first_order_only, is_active \
             FROM promo_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(PromoRow::into_domain).transpose()
    }

    async fn promo_usage(&self, code: &str, customer_id: Uuid) -> Result<PromoUsage, StoreError> {
        let counts: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE customer_id = $2) \
             FROM promo_redemptions WHERE code = $1",
        )
        .bind(code)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(PromoUsage { total: counts.0, by_customer: counts.1 })
    }

    async fn service_offering(&self, id: Uuid) -> Result<Option<ServiceOffering>, StoreError> {
        let row = sqlx::query_as::<_, OfferingRow>(
            "SELECT id, name, category_id, base_price, currency, is_active \
             FROM service_offerings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(|r| ServiceOffering {
            id: r.id,
            name: r.name,
            category_id: r.category_id,
            base_price: Money::new(r.base_price, &r.currency),
            is_active: r.is_active,
        }))
    }

    async fn customer_address(&self, id: Uuid) -> Result<Option<CustomerAddress>, StoreError> {
        let row = sqlx::query_as::<_, AddressRow>(
            "SELECT id, customer_id, label, region FROM customer_addresses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(|r| CustomerAddress {
            id: r.id,
            customer_id: r.customer_id,
            label: r.label,
            region: r.region,
        }))
    }
}
