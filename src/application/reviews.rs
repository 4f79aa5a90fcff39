//! Reviews and provider rating aggregation

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::error::{CoreError, CoreResult};
use crate::application::ports::{MarketplaceStore, Notifier, SentimentAnalyzer, StoreError};
use crate::domain::aggregates::{BookingStatus, Review};
use crate::domain::events::{DomainEvent, ReviewEvent};
use crate::domain::value_objects::Rating;

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn MarketplaceStore>,
    sentiment: Arc<dyn SentimentAnalyzer>,
    notifier: Arc<dyn Notifier>,
    sentiment_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct CreateReview {
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub media_urls: Vec<String>,
}

impl ReviewService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        sentiment: Arc<dyn SentimentAnalyzer>,
        notifier: Arc<dyn Notifier>,
        sentiment_timeout: Duration,
    ) -> Self {
        Self { store, sentiment, notifier, sentiment_timeout }
    }

    #[instrument(skip(self, cmd), fields(booking = %cmd.booking_id))]
    pub async fn create(&self, cmd: CreateReview) -> CoreResult<Review> {
        let booking = self
            .store
            .booking(cmd.booking_id)
            .await?
            .ok_or(CoreError::NotFound("booking"))?;
        if booking.customer_id() != cmd.customer_id {
            return Err(CoreError::Unauthorized("only the booking's customer may leave a review".into()));
        }
        if booking.status() != BookingStatus::Completed {
            return Err(CoreError::InvalidTransition("can only review completed bookings".into()));
        }
        let provider_id = booking
            .provider_id()
            .ok_or_else(|| CoreError::Validation("completed booking has no provider".into()))?;
        if self.store.review_for_booking(booking.id()).await?.is_some() {
            return Err(CoreError::Conflict("booking already reviewed".into()));
        }
        let rating = Rating::new(cmd.rating)?;

        let mut review = Review::new(booking.id(), cmd.customer_id, provider_id, rating, cmd.comment, cmd.media_urls);
        if let Some(text) = review.comment() {
            // enrichment only; never blocks the write path
            match tokio::time::timeout(self.sentiment_timeout, self.sentiment.analyze(text)).await {
                Ok(Ok(score)) => review.attach_sentiment(score),
                Ok(Err(e)) => warn!(review = %review.id(), error = %e, "sentiment analysis failed, continuing without score"),
                Err(_) => warn!(review = %review.id(), "sentiment analysis timed out, continuing without score"),
            }
        }

        let provider = self.store.insert_review(&review, rating).await.map_err(|e| match e {
            StoreError::Duplicate(_) => CoreError::Conflict("booking already reviewed".into()),
            other => CoreError::from(other),
        })?;
        info!(
            review = %review.id(),
            provider = %provider.id(),
            average = %provider.average_rating(),
            reviews = provider.total_reviews(),
            "review recorded"
        );
        self.notifier
            .notify(
                provider_id,
                "New review",
                &format!("You received a {rating}-star review."),
                serde_json::json!({ "review_id": review.id(), "booking_id": booking.id() }),
            )
            .await;
        self.notifier
            .broadcast(&DomainEvent::Review(ReviewEvent::Created {
                review_id: review.id(),
                booking_id: booking.id(),
                provider_id,
                rating: rating.value(),
            }))
            .await;
        Ok(review)
    }

    #[instrument(skip(self, text), fields(review = %review_id, provider = %provider_id))]
    pub async fn respond(&self, review_id: Uuid, provider_id: Uuid, text: String) -> CoreResult<Review> {
        let mut review = self.store.review(review_id).await?.ok_or(CoreError::NotFound("review"))?;
        review.respond(provider_id, text)?;
        self.store.update_review(&review).await?;
        self.notifier
            .broadcast(&DomainEvent::Review(ReviewEvent::ResponseAdded { review_id, provider_id }))
            .await;
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ExternalServiceError;
    use crate::domain::aggregates::{Booking, NewBooking, ProgressStep, ServiceProvider};
    use crate::domain::value_objects::Money;
    use crate::infra::memory::MemoryStore;
    use crate::infra::notify::LogNotifier;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use rust_decimal::Decimal;

    struct FixedSentiment(f64);

    #[async_trait]
    impl SentimentAnalyzer for FixedSentiment {
        async fn analyze(&self, _text: &str) -> Result<f64, ExternalServiceError> { Ok(self.0) }
    }

    struct BrokenSentiment;

    #[async_trait]
    impl SentimentAnalyzer for BrokenSentiment {
        async fn analyze(&self, _text: &str) -> Result<f64, ExternalServiceError> {
            Err(ExternalServiceError("model offline".into()))
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        customer_id: Uuid,
        provider_id: Uuid,
    }

    async fn completed_booking(store: &Arc<MemoryStore>, customer_id: Uuid, provider_id: Uuid) -> Booking {
        let mut booking = Booking::create(NewBooking {
            customer_id,
            service_id: Uuid::new_v4(),
            address_id: Uuid::new_v4(),
            scheduled_at: Utc::now() + ChronoDuration::hours(1),
            instructions: None,
            promo_code: None,
            total: Money::sar(Decimal::new(150, 0)),
            discount: Money::sar(Decimal::ZERO),
        })
        .unwrap();
        booking.accept(provider_id, None).unwrap();
        booking.record_progress(provider_id, ProgressStep::InProgress, None, vec![]).unwrap();
        booking.record_progress(provider_id, ProgressStep::Completed, None, vec![]).unwrap();
        store.insert_booking(&booking, None).await.unwrap();
        booking
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let provider = ServiceProvider::new("Fix-It Crew", "SAR");
        let provider_id = provider.id();
        store.seed_provider(provider);
        Fixture { store, customer_id: Uuid::new_v4(), provider_id }
    }

    fn service(store: Arc<MemoryStore>, sentiment: Arc<dyn SentimentAnalyzer>) -> ReviewService {
        ReviewService::new(store, sentiment, Arc::new(LogNotifier), Duration::from_millis(250))
    }

    fn cmd(booking_id: Uuid, customer_id: Uuid, rating: i32) -> CreateReview {
        CreateReview { booking_id, customer_id, rating, comment: Some("spotless work".into()), media_urls: vec![] }
    }

    #[tokio::test]
    async fn review_updates_provider_running_mean() {
        let f = fixture().await;
        let svc = service(f.store.clone(), Arc::new(FixedSentiment(0.9)));

        let b1 = completed_booking(&f.store, f.customer_id, f.provider_id).await;
        let review = svc.create(cmd(b1.id(), f.customer_id, 5)).await.unwrap();
        assert_eq!(review.sentiment_score(), Some(0.9));

        let b2 = completed_booking(&f.store, f.customer_id, f.provider_id).await;
        svc.create(cmd(b2.id(), f.customer_id, 3)).await.unwrap();

        let provider = f.store.provider(f.provider_id).await.unwrap().unwrap();
        assert_eq!(provider.total_reviews(), 2);
        assert_eq!(provider.average_rating(), Decimal::from(4));
    }

    #[tokio::test]
    async fn sentiment_failure_never_blocks_the_review() {
        let f = fixture().await;
        let svc = service(f.store.clone(), Arc::new(BrokenSentiment));
        let booking = completed_booking(&f.store, f.customer_id, f.provider_id).await;
        let review = svc.create(cmd(booking.id(), f.customer_id, 4)).await.unwrap();
        assert_eq!(review.sentiment_score(), None);
        assert_eq!(review.rating().value(), 4);
    }

    #[tokio::test]
    async fn only_completed_bookings_can_be_reviewed() {
        let f = fixture().await;
        let svc = service(f.store.clone(), Arc::new(FixedSentiment(0.5)));
        let pending = Booking::create(NewBooking {
            customer_id: f.customer_id,
            service_id: Uuid::new_v4(),
            address_id: Uuid::new_v4(),
            scheduled_at: Utc::now() + ChronoDuration::hours(1),
            instructions: None,
            promo_code: None,
            total: Money::sar(Decimal::new(80, 0)),
            discount: Money::sar(Decimal::ZERO),
        })
        .unwrap();
        f.store.insert_booking(&pending, None).await.unwrap();
        let err = svc.create(cmd(pending.id(), f.customer_id, 5)).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn second_review_is_a_conflict() {
        let f = fixture().await;
        let svc = service(f.store.clone(), Arc::new(FixedSentiment(0.5)));
        let booking = completed_booking(&f.store, f.customer_id, f.provider_id).await;
        svc.create(cmd(booking.id(), f.customer_id, 5)).await.unwrap();
        let err = svc.create(cmd(booking.id(), f.customer_id, 1)).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        let provider = f.store.provider(f.provider_id).await.unwrap().unwrap();
        assert_eq!(provider.total_reviews(), 1);
    }

    #[tokio::test]
    async fn rating_must_be_in_range_and_customer_must_own_booking() {
        let f = fixture().await;
        let svc = service(f.store.clone(), Arc::new(FixedSentiment(0.5)));
        let booking = completed_booking(&f.store, f.customer_id, f.provider_id).await;

        let err = svc.create(cmd(booking.id(), Uuid::new_v4(), 5)).await.unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));

        let err = svc.create(cmd(booking.id(), f.customer_id, 6)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn provider_response_is_recorded_once() {
        let f = fixture().await;
        let svc = service(f.store.clone(), Arc::new(FixedSentiment(0.5)));
        let booking = completed_booking(&f.store, f.customer_id, f.provider_id).await;
        let review = svc.create(cmd(booking.id(), f.customer_id, 5)).await.unwrap();

        svc.respond(review.id(), f.provider_id, "thank you!".into()).await.unwrap();
        let err = svc.respond(review.id(), f.provider_id, "again".into()).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }
}
