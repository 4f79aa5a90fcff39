//! HomeServe - Self-hosted Home-Services Marketplace

use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::Validate;

use homeserve::application::bookings::{BookingService, CreateBooking};
use homeserve::application::payments::{PaymentService, ProcessPayment};
use homeserve::application::payouts::PayoutService;
use homeserve::application::ports::{MarketplaceStore, Notifier, PaymentGateway, SentimentAnalyzer};
use homeserve::application::promos::{PromoEvaluation, PromoService, QuoteRequest};
use homeserve::application::reviews::{CreateReview, ReviewService};
use homeserve::config::Config;
use homeserve::domain::aggregates::{Booking, Payment, PaymentMethod, Payout, ProgressStep, Review};
use homeserve::domain::value_objects::Money;
use homeserve::infra::gateway::{DisabledSentiment, HttpPaymentGateway, HttpSentimentAnalyzer, SandboxGateway};
use homeserve::infra::memory::MemoryStore;
use homeserve::infra::notify::{LogNotifier, NatsNotifier};
use homeserve::infra::postgres::PgStore;
use homeserve::CoreError;

#[derive(Clone)]
struct AppState {
    bookings: BookingService,
    payments: PaymentService,
    reviews: ReviewService,
    payouts: PayoutService,
    promos: PromoService,
    currency: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    let config = Config::from_env()?;

    let store: Arc<dyn MarketplaceStore> = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Arc::new(PgStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; running on the ephemeral in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    let notifier: Arc<dyn Notifier> = match &config.nats_url {
        Some(url) => Arc::new(NatsNotifier::new(async_nats::connect(url).await?, "homeserve")),
        None => Arc::new(LogNotifier),
    };
    let gateway: Arc<dyn PaymentGateway> = match &config.payment_gateway_url {
        Some(url) => Arc::new(HttpPaymentGateway::new(url, config.gateway_timeout)?),
        None => {
            tracing::warn!("PAYMENT_GATEWAY_URL not set; charges run through the sandbox gateway");
            Arc::new(SandboxGateway)
        }
    };
    let sentiment: Arc<dyn SentimentAnalyzer> = match &config.sentiment_url {
        Some(url) => Arc::new(HttpSentimentAnalyzer::new(url, config.sentiment_timeout)?),
        None => Arc::new(DisabledSentiment),
    };

    let state = AppState {
        bookings: BookingService::new(store.clone(), notifier.clone(), config.commission_rate),
        payments: PaymentService::new(store.clone(), gateway, notifier.clone()),
        reviews: ReviewService::new(store.clone(), sentiment, notifier.clone(), config.sentiment_timeout),
        payouts: PayoutService::new(store.clone(), notifier.clone()),
        promos: PromoService::new(store),
        currency: config.currency.clone(),
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "homeserve"})) }))
        .route("/api/v1/bookings", get(list_bookings).post(create_booking))
        .route("/api/v1/bookings/:id", get(get_booking))
        .route("/api/v1/bookings/:id/accept", post(accept_booking))
        .route("/api/v1/bookings/:id/decline", post(decline_booking))
        .route("/api/v1/bookings/:id/progress", post(update_progress))
        .route("/api/v1/bookings/:id/cancel", post(cancel_booking))
        .route("/api/v1/bookings/:id/dispute", post(dispute_booking))
        .route("/api/v1/bookings/:id/payments", post(process_payment))
        .route("/api/v1/bookings/:id/reviews", post(create_review))
        .route("/api/v1/reviews/:id/response", post(respond_to_review))
        .route("/api/v1/promo-codes/validate", post(validate_promo))
        .route("/api/v1/providers/:id/payouts", post(request_payout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!("🚀 HomeServe marketplace listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn reject(e: CoreError) -> ApiError {
    let status = match &e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Unauthorized(_) => StatusCode::FORBIDDEN,
        CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::InvalidTransition(_) | CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        CoreError::Reconciliation { .. } | CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.kind(), "message": e.to_string() })))
}

fn invalid(e: validator::ValidationErrors) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({ "error": "validation_error", "message": e.to_string() })),
    )
}

#[derive(Debug, Deserialize)]
struct ListParams { page: Option<u32>, per_page: Option<u32> }

#[derive(Debug, Serialize)]
struct PaginatedResponse<T> { data: Vec<T>, total: i64, page: u32 }

async fn list_bookings(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Booking>>, ApiError> {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);
    let (data, total) = s.bookings.list(per_page as i64, ((page - 1) * per_page) as i64).await.map_err(reject)?;
    Ok(Json(PaginatedResponse { data, total, page }))
}

async fn get_booking(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Booking>, ApiError> {
    s.bookings.get(id).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize, Validate)]
struct CreateBookingRequest {
    customer_id: Uuid,
    service_id: Uuid,
    address_id: Uuid,
    scheduled_at: DateTime<Utc>,
    #[validate(length(max = 2000))]
    instructions: Option<String>,
    #[validate(length(min = 1, max = 64))]
    promo_code: Option<String>,
}

async fn create_booking(State(s): State<AppState>, Json(r): Json<CreateBookingRequest>) -> Result<(StatusCode, Json<Booking>), ApiError> {
    r.validate().map_err(invalid)?;
    let booking = s
        .bookings
        .create(CreateBooking {
            customer_id: r.customer_id,
            service_id: r.service_id,
            address_id: r.address_id,
            scheduled_at: r.scheduled_at,
            instructions: r.instructions,
            promo_code: r.promo_code,
        })
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[derive(Debug, Deserialize)]
struct AcceptRequest { provider_id: Uuid, estimated_arrival: Option<DateTime<Utc>> }

async fn accept_booking(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<AcceptRequest>) -> Result<Json<Booking>, ApiError> {
    s.bookings.accept(id, r.provider_id, r.estimated_arrival).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize, Validate)]
struct DeclineRequest {
    provider_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    reason: String,
}

async fn decline_booking(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<DeclineRequest>) -> Result<Json<Booking>, ApiError> {
    r.validate().map_err(invalid)?;
    s.bookings.decline(id, r.provider_id, r.reason).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize, Validate)]
struct ProgressRequest {
    provider_id: Uuid,
    step: ProgressStep,
    #[validate(length(max = 2000))]
    notes: Option<String>,
    #[serde(default)]
    photos: Vec<String>,
}

async fn update_progress(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<ProgressRequest>) -> Result<Json<Booking>, ApiError> {
    r.validate().map_err(invalid)?;
    s.bookings.update_progress(id, r.provider_id, r.step, r.notes, r.photos).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize, Validate)]
struct CancelRequest {
    user_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    reason: String,
    by_customer: bool,
}

async fn cancel_booking(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<CancelRequest>) -> Result<Json<Booking>, ApiError> {
    r.validate().map_err(invalid)?;
    s.bookings.cancel(id, r.user_id, r.reason, r.by_customer).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize, Validate)]
struct DisputeRequest {
    user_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    reason: String,
}

async fn dispute_booking(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<DisputeRequest>) -> Result<Json<Booking>, ApiError> {
    r.validate().map_err(invalid)?;
    s.bookings.dispute(id, r.user_id, r.reason).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize)]
struct PaymentRequest { method: PaymentMethod, payment_token: Option<String> }

async fn process_payment(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<PaymentRequest>) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let payment = s
        .payments
        .process(ProcessPayment { booking_id: id, method: r.method, payment_token: r.payment_token })
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[derive(Debug, Deserialize, Validate)]
struct ReviewRequest {
    customer_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    rating: i32,
    #[validate(length(max = 4000))]
    comment: Option<String>,
    #[serde(default)]
    media_urls: Vec<String>,
}

async fn create_review(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<ReviewRequest>) -> Result<(StatusCode, Json<Review>), ApiError> {
    r.validate().map_err(invalid)?;
    let review = s
        .reviews
        .create(CreateReview {
            booking_id: id,
            customer_id: r.customer_id,
            rating: r.rating,
            comment: r.comment,
            media_urls: r.media_urls,
        })
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[derive(Debug, Deserialize, Validate)]
struct ReviewResponseRequest {
    provider_id: Uuid,
    #[validate(length(min = 1, max = 4000))]
    response: String,
}

async fn respond_to_review(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<ReviewResponseRequest>) -> Result<Json<Review>, ApiError> {
    r.validate().map_err(invalid)?;
    s.reviews.respond(id, r.provider_id, r.response).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize, Validate)]
struct ValidatePromoRequest {
    #[validate(length(min = 1, max = 64))]
    code: String,
    customer_id: Uuid,
    order_amount: Decimal,
    service_id: Option<Uuid>,
    category_id: Option<Uuid>,
    region: Option<String>,
}

async fn validate_promo(State(s): State<AppState>, Json(r): Json<ValidatePromoRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    r.validate().map_err(invalid)?;
    let evaluation = s
        .promos
        .evaluate(QuoteRequest {
            code: r.code,
            customer_id: r.customer_id,
            order_amount: Money::new(r.order_amount, &s.currency),
            service_id: r.service_id,
            category_id: r.category_id,
            region: r.region,
        })
        .await
        .map_err(reject)?;
    Ok(Json(match evaluation {
        PromoEvaluation::Approved(q) => serde_json::json!({
            "valid": true, "code": q.code, "discount": q.discount, "final_amount": q.final_amount,
        }),
        PromoEvaluation::Rejected(rejection) => serde_json::json!({
            "valid": false, "reason": rejection.code(), "message": rejection.to_string(),
        }),
    }))
}

#[derive(Debug, Deserialize)]
struct PayoutRequest { amount: Decimal }

async fn request_payout(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<PayoutRequest>) -> Result<(StatusCode, Json<Payout>), ApiError> {
    let payout = s.payouts.request(id, r.amount).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(payout)))
}
