//! Payment entity, owned 1:1 by a booking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::booking::Booking;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
pub struct Payment {
    pub(crate) id: Uuid,
    pub(crate) booking_id: Uuid,
    pub(crate) amount: Money,
    pub(crate) method: PaymentMethod,
    pub(crate) status: PaymentStatus,
    pub(crate) transaction_id: Option<String>,
    pub(crate) failure_reason: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) processed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Processing, Completed, Failed }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { Card, Wallet, Cash, BankTransfer }

impl Payment {
    /// An in-flight capture attempt; amount and currency come from the booking.
    pub fn processing(booking: &Booking, method: PaymentMethod) -> Self {
        Self {
            id: Uuid::new_v4(), booking_id: booking.id(), amount: booking.total().clone(),
            method, status: PaymentStatus::Processing, transaction_id: None, failure_reason: None,
            created_at: Utc::now(), processed_at: None,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn booking_id(&self) -> Uuid { self.booking_id }
    pub fn amount(&self) -> &Money { &self.amount }
    pub fn method(&self) -> PaymentMethod { self.method }
    pub fn status(&self) -> PaymentStatus { self.status }
    pub fn transaction_id(&self) -> Option<&str> { self.transaction_id.as_deref() }
    pub fn failure_reason(&self) -> Option<&str> { self.failure_reason.as_deref() }

    pub fn succeed(&mut self, transaction_id: String) {
        self.status = PaymentStatus::Completed;
        self.transaction_id = Some(transaction_id);
        self.processed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, reason: String) {
        self.status = PaymentStatus::Failed;
        self.failure_reason = Some(reason);
        self.processed_at = Some(Utc::now());
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending", Self::Processing => "processing",
            Self::Completed => "completed", Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending), "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed), "failed" => Ok(Self::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Card => "card", Self::Wallet => "wallet",
            Self::Cash => "cash", Self::BankTransfer => "bank_transfer",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentMethod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card), "wallet" => Ok(Self::Wallet),
            "cash" => Ok(Self::Cash), "bank_transfer" => Ok(Self::BankTransfer),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}
