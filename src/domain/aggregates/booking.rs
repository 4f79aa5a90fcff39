//! Booking Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::events::{BookingEvent, DomainEvent};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
pub struct Booking {
    pub(crate) id: Uuid,
    pub(crate) reference: String,
    pub(crate) customer_id: Uuid,
    pub(crate) service_id: Uuid,
    pub(crate) address_id: Uuid,
    pub(crate) provider_id: Option<Uuid>,
    pub(crate) scheduled_at: DateTime<Utc>,
    pub(crate) status: BookingStatus,
    pub(crate) progress: Option<ProgressStep>,
    pub(crate) total: Money,
    pub(crate) discount: Money,
    pub(crate) promo_code: Option<String>,
    pub(crate) instructions: Option<String>,
    pub(crate) estimated_arrival: Option<DateTime<Utc>>,
    pub(crate) progress_notes: Vec<ProgressNote>,
    pub(crate) decline_reason: Option<String>,
    pub(crate) dispute_reason: Option<String>,
    pub(crate) cancellation: Option<Cancellation>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) accepted_at: Option<DateTime<Utc>>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) cancelled_at: Option<DateTime<Utc>>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: i64,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus { #[default] Pending, Confirmed, InProgress, Completed, Cancelled, Rejected, Disputed }

/// Provider-reported progress along a confirmed booking, ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStep { OnTheWay, Arrived, InProgress, Completed }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingAction { Confirm, Decline, Start, Complete, Cancel, Dispute }

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressNote {
    pub step: ProgressStep,
    pub notes: Option<String>,
    pub photos: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
    pub by_customer: bool,
    pub cancelled_by: Uuid,
}

/// Legal status edges. Pure; timestamps and events are applied by the
/// aggregate only after an edge is accepted.
pub fn transition(from: BookingStatus, action: BookingAction) -> Result<BookingStatus, BookingError> {
    use BookingAction::*;
    use BookingStatus::*;
    match (from, action) {
        (Pending, Confirm) => Ok(Confirmed),
        (Pending, Decline) => Ok(Rejected),
        (Confirmed, Start) | (InProgress, Start) => Ok(InProgress),
        (InProgress, Complete) => Ok(Completed),
        (Pending, Cancel) | (Confirmed, Cancel) => Ok(Cancelled),
        (InProgress, Dispute) | (Completed, Dispute) => Ok(Disputed),
        (from, action) => Err(BookingError::InvalidTransition { from, action }),
    }
}

/// Input for [`Booking::create`].
#[derive(Clone, Debug)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub address_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub instructions: Option<String>,
    pub promo_code: Option<String>,
    pub total: Money,
    pub discount: Money,
}

impl Booking {
    pub fn create(new: NewBooking) -> Result<Self, BookingError> {
        if new.scheduled_at <= Utc::now() { return Err(BookingError::ScheduledInPast); }
        if new.total.is_negative() { return Err(BookingError::NegativeTotal); }
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut booking = Self {
            id, reference: format!("BKG-{:08}", rand::random::<u32>()),
            customer_id: new.customer_id, service_id: new.service_id, address_id: new.address_id,
            provider_id: None, scheduled_at: new.scheduled_at, status: BookingStatus::Pending,
            progress: None, total: new.total, discount: new.discount, promo_code: new.promo_code,
            instructions: new.instructions, estimated_arrival: None, progress_notes: vec![],
            decline_reason: None, dispute_reason: None, cancellation: None,
            created_at: now, accepted_at: None, started_at: None, completed_at: None,
            cancelled_at: None, updated_at: now, version: 1, events: vec![],
        };
        booking.raise_event(DomainEvent::Booking(BookingEvent::Created {
            booking_id: id, customer_id: booking.customer_id, total: booking.total.amount(),
        }));
        Ok(booking)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn reference(&self) -> &str { &self.reference }
    pub fn customer_id(&self) -> Uuid { self.customer_id }
    pub fn service_id(&self) -> Uuid { self.service_id }
    pub fn provider_id(&self) -> Option<Uuid> { self.provider_id }
    pub fn scheduled_at(&self) -> DateTime<Utc> { self.scheduled_at }
    pub fn status(&self) -> BookingStatus { self.status }
    pub fn progress(&self) -> Option<ProgressStep> { self.progress }
    pub fn total(&self) -> &Money { &self.total }
    pub fn discount(&self) -> &Money { &self.discount }
    pub fn promo_code(&self) -> Option<&str> { self.promo_code.as_deref() }
    pub fn completed_at(&self) -> Option<DateTime<Utc>> { self.completed_at }
    pub fn version(&self) -> i64 { self.version }

    /// Provider accepts a pending booking. An unassigned booking is claimed by
    /// the accepting provider; an assigned one may only be accepted by that
    /// provider. Concurrent claims are resolved by the store's version check.
    pub fn accept(&mut self, provider_id: Uuid, estimated_arrival: Option<DateTime<Utc>>) -> Result<(), BookingError> {
        let next = transition(self.status, BookingAction::Confirm)?;
        if let Some(assigned) = self.provider_id {
            if assigned != provider_id { return Err(BookingError::NotAssignedProvider); }
        }
        self.status = next;
        self.provider_id = Some(provider_id);
        self.accepted_at = Some(Utc::now());
        self.estimated_arrival = estimated_arrival;
        self.touch();
        self.raise_event(DomainEvent::Booking(BookingEvent::Accepted { booking_id: self.id, provider_id }));
        Ok(())
    }

    pub fn decline(&mut self, provider_id: Uuid, reason: String) -> Result<(), BookingError> {
        let next = transition(self.status, BookingAction::Decline)?;
        if let Some(assigned) = self.provider_id {
            if assigned != provider_id { return Err(BookingError::NotAssignedProvider); }
        }
        self.status = next;
        self.decline_reason = Some(reason.clone());
        self.touch();
        self.raise_event(DomainEvent::Booking(BookingEvent::Declined { booking_id: self.id, provider_id, reason }));
        Ok(())
    }

    /// A successful capture confirms a pending booking, but only one a
    /// provider has already claimed: the provider-set-before-confirmed
    /// invariant holds even when payment arrives first. Returns whether the
    /// status changed.
    pub fn confirm_on_payment(&mut self) -> Result<bool, BookingError> {
        if self.status != BookingStatus::Pending || self.provider_id.is_none() { return Ok(false); }
        self.status = transition(self.status, BookingAction::Confirm)?;
        self.touch();
        Ok(true)
    }

    /// Provider reports progress. Steps only move forward; the `Completed`
    /// step is only reachable once work is in progress.
    pub fn record_progress(&mut self, provider_id: Uuid, step: ProgressStep, notes: Option<String>, photos: Vec<String>) -> Result<(), BookingError> {
        if self.provider_id != Some(provider_id) { return Err(BookingError::NotAssignedProvider); }
        if let Some(current) = self.progress {
            if step <= current { return Err(BookingError::ProgressNotForward { from: current, to: step }); }
        }
        let action = if step == ProgressStep::Completed { BookingAction::Complete } else { BookingAction::Start };
        self.status = transition(self.status, action)?;
        let now = Utc::now();
        if self.status == BookingStatus::InProgress && self.started_at.is_none() { self.started_at = Some(now); }
        if self.status == BookingStatus::Completed { self.completed_at = Some(now); }
        self.progress = Some(step);
        self.progress_notes.push(ProgressNote { step, notes, photos, recorded_at: now });
        self.touch();
        if self.status == BookingStatus::Completed {
            self.raise_event(DomainEvent::Booking(BookingEvent::Completed { booking_id: self.id, provider_id }));
        } else {
            self.raise_event(DomainEvent::Booking(BookingEvent::ProgressUpdated { booking_id: self.id, step: step.to_string() }));
        }
        Ok(())
    }

    pub fn cancel(&mut self, user_id: Uuid, reason: String, by_customer: bool) -> Result<(), BookingError> {
        let allowed = if by_customer { user_id == self.customer_id } else { self.provider_id == Some(user_id) };
        if !allowed { return Err(BookingError::NotParticipant); }
        self.status = transition(self.status, BookingAction::Cancel)?;
        self.cancellation = Some(Cancellation { reason, by_customer, cancelled_by: user_id });
        self.cancelled_at = Some(Utc::now());
        self.touch();
        self.raise_event(DomainEvent::Booking(BookingEvent::Cancelled { booking_id: self.id, by_customer }));
        Ok(())
    }

    pub fn dispute(&mut self, user_id: Uuid, reason: String) -> Result<(), BookingError> {
        if user_id != self.customer_id && self.provider_id != Some(user_id) {
            return Err(BookingError::NotParticipant);
        }
        self.status = transition(self.status, BookingAction::Dispute)?;
        self.dispute_reason = Some(reason.clone());
        self.touch();
        self.raise_event(DomainEvent::Booking(BookingEvent::Disputed { booking_id: self.id, reason }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending", Self::Confirmed => "confirmed", Self::InProgress => "in_progress",
            Self::Completed => "completed", Self::Cancelled => "cancelled", Self::Rejected => "rejected",
            Self::Disputed => "disputed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for BookingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending), "confirmed" => Ok(Self::Confirmed),
            "in_progress" => Ok(Self::InProgress), "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled), "rejected" => Ok(Self::Rejected),
            "disputed" => Ok(Self::Disputed),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

impl fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OnTheWay => "on_the_way", Self::Arrived => "arrived",
            Self::InProgress => "in_progress", Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ProgressStep {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_the_way" => Ok(Self::OnTheWay), "arrived" => Ok(Self::Arrived),
            "in_progress" => Ok(Self::InProgress), "completed" => Ok(Self::Completed),
            other => Err(format!("unknown progress step: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BookingError {
    ScheduledInPast,
    NegativeTotal,
    InvalidTransition { from: BookingStatus, action: BookingAction },
    ProgressNotForward { from: ProgressStep, to: ProgressStep },
    NotAssignedProvider,
    NotParticipant,
}

impl std::error::Error for BookingError {}
impl fmt::Display for BookingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScheduledInPast => write!(f, "scheduled time must be in the future"),
            Self::NegativeTotal => write!(f, "booking total cannot be negative"),
            Self::InvalidTransition { from, action } => write!(f, "cannot {action:?} a {from} booking"),
            Self::ProgressNotForward { from, to } => write!(f, "progress cannot move from {from} back to {to}"),
            Self::NotAssignedProvider => write!(f, "only the assigned provider may act on this booking"),
            Self::NotParticipant => write!(f, "only the booking's customer or provider may act on it"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn pending_booking() -> Booking {
        Booking::create(NewBooking {
            customer_id: Uuid::new_v4(), service_id: Uuid::new_v4(), address_id: Uuid::new_v4(),
            scheduled_at: Utc::now() + Duration::hours(4), instructions: None, promo_code: None,
            total: Money::sar(Decimal::new(200, 0)), discount: Money::sar(Decimal::ZERO),
        }).unwrap()
    }

    #[test]
    fn full_lifecycle() {
        let mut b = pending_booking();
        let provider = Uuid::new_v4();
        b.accept(provider, None).unwrap();
        assert_eq!(b.status(), BookingStatus::Confirmed);
        assert!(b.accepted_at.is_some());
        b.record_progress(provider, ProgressStep::OnTheWay, None, vec![]).unwrap();
        assert_eq!(b.status(), BookingStatus::InProgress);
        assert!(b.started_at.is_some());
        b.record_progress(provider, ProgressStep::InProgress, Some("started".into()), vec![]).unwrap();
        b.record_progress(provider, ProgressStep::Completed, None, vec!["after.jpg".into()]).unwrap();
        assert_eq!(b.status(), BookingStatus::Completed);
        assert!(b.completed_at().is_some());
        assert_eq!(b.progress_notes.len(), 3);
    }

    #[test]
    fn cannot_schedule_in_past() {
        let err = Booking::create(NewBooking {
            customer_id: Uuid::new_v4(), service_id: Uuid::new_v4(), address_id: Uuid::new_v4(),
            scheduled_at: Utc::now() - Duration::hours(1), instructions: None, promo_code: None,
            total: Money::sar(Decimal::ONE), discount: Money::sar(Decimal::ZERO),
        }).unwrap_err();
        assert!(matches!(err, BookingError::ScheduledInPast));
    }

    #[test]
    fn cannot_complete_from_pending() {
        let mut b = pending_booking();
        let provider = Uuid::new_v4();
        b.provider_id = Some(provider);
        let err = b.record_progress(provider, ProgressStep::Completed, None, vec![]).unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { from: BookingStatus::Pending, .. }));
        assert_eq!(b.status(), BookingStatus::Pending);
    }

    #[test]
    fn cannot_complete_straight_from_confirmed() {
        let mut b = pending_booking();
        let provider = Uuid::new_v4();
        b.accept(provider, None).unwrap();
        let err = b.record_progress(provider, ProgressStep::Completed, None, vec![]).unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { from: BookingStatus::Confirmed, .. }));
        assert_eq!(b.status(), BookingStatus::Confirmed);
    }

    #[test]
    fn progress_never_moves_backward() {
        let mut b = pending_booking();
        let provider = Uuid::new_v4();
        b.accept(provider, None).unwrap();
        b.record_progress(provider, ProgressStep::Arrived, None, vec![]).unwrap();
        let err = b.record_progress(provider, ProgressStep::OnTheWay, None, vec![]).unwrap_err();
        assert!(matches!(err, BookingError::ProgressNotForward { .. }));
    }

    #[test]
    fn only_assigned_provider_may_accept() {
        let mut b = pending_booking();
        b.provider_id = Some(Uuid::new_v4());
        let err = b.accept(Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, BookingError::NotAssignedProvider));
        assert_eq!(b.status(), BookingStatus::Pending);
    }

    #[test]
    fn decline_rejects_pending() {
        let mut b = pending_booking();
        b.decline(Uuid::new_v4(), "fully booked".into()).unwrap();
        assert_eq!(b.status(), BookingStatus::Rejected);
    }

    #[test]
    fn cancel_blocked_once_in_progress() {
        let mut b = pending_booking();
        let provider = Uuid::new_v4();
        b.accept(provider, None).unwrap();
        b.record_progress(provider, ProgressStep::OnTheWay, None, vec![]).unwrap();
        let err = b.cancel(b.customer_id(), "changed my mind".into(), true).unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { from: BookingStatus::InProgress, .. }));
    }

    #[test]
    fn cancel_requires_participant() {
        let mut b = pending_booking();
        let err = b.cancel(Uuid::new_v4(), "not mine".into(), true).unwrap_err();
        assert!(matches!(err, BookingError::NotParticipant));
    }

    #[test]
    fn dispute_only_after_work_started() {
        let mut b = pending_booking();
        let err = b.dispute(b.customer_id(), "no show".into()).unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
        let provider = Uuid::new_v4();
        b.accept(provider, None).unwrap();
        b.record_progress(provider, ProgressStep::InProgress, None, vec![]).unwrap();
        b.record_progress(provider, ProgressStep::Completed, None, vec![]).unwrap();
        b.dispute(b.customer_id(), "damage to property".into()).unwrap();
        assert_eq!(b.status(), BookingStatus::Disputed);
    }

    #[test]
    fn paid_pending_booking_confirms_only_with_provider() {
        let mut b = pending_booking();
        assert!(!b.confirm_on_payment().unwrap());
        assert_eq!(b.status(), BookingStatus::Pending);
        b.provider_id = Some(Uuid::new_v4());
        assert!(b.confirm_on_payment().unwrap());
        assert_eq!(b.status(), BookingStatus::Confirmed);
    }
}
