//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Booking(BookingEvent),
    Payment(PaymentEvent),
    Review(ReviewEvent),
    Payout(PayoutEvent),
}

impl DomainEvent {
    /// Dotted subject for message routing, e.g. `booking.accepted`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Booking(e) => match e {
                BookingEvent::Created { .. } => "booking.created",
                BookingEvent::Accepted { .. } => "booking.accepted",
                BookingEvent::Declined { .. } => "booking.declined",
                BookingEvent::ProgressUpdated { .. } => "booking.progress",
                BookingEvent::Completed { .. } => "booking.completed",
                BookingEvent::Cancelled { .. } => "booking.cancelled",
                BookingEvent::Disputed { .. } => "booking.disputed",
            },
            Self::Payment(e) => match e {
                PaymentEvent::Completed { .. } => "payment.completed",
                PaymentEvent::Failed { .. } => "payment.failed",
            },
            Self::Review(e) => match e {
                ReviewEvent::Created { .. } => "review.created",
                ReviewEvent::ResponseAdded { .. } => "review.response_added",
            },
            Self::Payout(e) => match e {
                PayoutEvent::Requested { .. } => "payout.requested",
            },
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    Created { booking_id: Uuid, customer_id: Uuid, total: Decimal },
    Accepted { booking_id: Uuid, provider_id: Uuid },
    Declined { booking_id: Uuid, provider_id: Uuid, reason: String },
    ProgressUpdated { booking_id: Uuid, step: String },
    Completed { booking_id: Uuid, provider_id: Uuid },
    Cancelled { booking_id: Uuid, by_customer: bool },
    Disputed { booking_id: Uuid, reason: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEvent {
    Completed { payment_id: Uuid, booking_id: Uuid, transaction_id: String },
    Failed { payment_id: Uuid, booking_id: Uuid, reason: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewEvent {
    Created { review_id: Uuid, booking_id: Uuid, provider_id: Uuid, rating: i32 },
    ResponseAdded { review_id: Uuid, provider_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutEvent {
    Requested { payout_id: Uuid, provider_id: Uuid, amount: Decimal },
}
