//! Outbound HTTP adapters: payment gateway and sentiment analysis

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::application::ports::{ChargeOutcome, ExternalServiceError, PaymentGateway, SentimentAnalyzer};
use crate::domain::aggregates::PaymentMethod;
use crate::domain::value_objects::Money;

fn http_client(timeout: Duration) -> Result<reqwest::Client, ExternalServiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ExternalServiceError(e.to_string()))
}

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpPaymentGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ExternalServiceError> {
        Ok(Self { client: http_client(timeout)?, url: url.into() })
    }
}

#[derive(Serialize)]
struct ChargeBody<'a> {
    amount: Decimal,
    currency: &'a str,
    method: String,
    token: Option<&'a str>,
}

#[derive(Deserialize)]
struct ChargeReply {
    success: bool,
    transaction_id: Option<String>,
    reason: Option<String>,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge(&self, method: PaymentMethod, amount: &Money, token: Option<&str>) -> Result<ChargeOutcome, ExternalServiceError> {
        let body = ChargeBody {
            amount: amount.amount(),
            currency: amount.currency(),
            method: method.to_string(),
            token,
        };
        let reply: ChargeReply = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExternalServiceError(e.to_string()))?
            .error_for_status()
            .map_err(|e| ExternalServiceError(e.to_string()))?
            .json()
            .await
            .map_err(|e| ExternalServiceError(e.to_string()))?;
        if reply.success {
            let transaction_id = reply
                .transaction_id
                .ok_or_else(|| ExternalServiceError("gateway omitted transaction id".into()))?;
            Ok(ChargeOutcome::Approved { transaction_id })
        } else {
            Ok(ChargeOutcome::Declined { reason: reply.reason.unwrap_or_else(|| "charge declined".into()) })
        }
    }
}

/// Approves every charge. Stands in for a processor in deployments without
/// one configured; transactions are tagged so they are recognizable.
pub struct SandboxGateway;

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn charge(&self, method: PaymentMethod, amount: &Money, _token: Option<&str>) -> Result<ChargeOutcome, ExternalServiceError> {
        debug!(%method, %amount, "sandbox charge approved");
        Ok(ChargeOutcome::Approved { transaction_id: format!("sandbox-{}", Uuid::new_v4()) })
    }
}

pub struct HttpSentimentAnalyzer {
    client: reqwest::Client,
    url: String,
}

impl HttpSentimentAnalyzer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ExternalServiceError> {
        Ok(Self { client: http_client(timeout)?, url: url.into() })
    }
}

#[derive(Serialize)]
struct AnalyzeBody<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeReply {
    score: f64,
}

#[async_trait]
impl SentimentAnalyzer for HttpSentimentAnalyzer {
    async fn analyze(&self, text: &str) -> Result<f64, ExternalServiceError> {
        let reply: AnalyzeReply = self
            .client
            .post(&self.url)
            .json(&AnalyzeBody { text })
            .send()
            .await
            .map_err(|e| ExternalServiceError(e.to_string()))?
            .error_for_status()
            .map_err(|e| ExternalServiceError(e.to_string()))?
            .json()
            .await
            .map_err(|e| ExternalServiceError(e.to_string()))?;
        Ok(reply.score)
    }
}

/// Used when no analysis endpoint is configured; reviews proceed unscored.
pub struct DisabledSentiment;

#[async_trait]
impl SentimentAnalyzer for DisabledSentiment {
    async fn analyze(&self, _text: &str) -> Result<f64, ExternalServiceError> {
        Err(ExternalServiceError("sentiment analysis not configured".into()))
    }
}
