//! Payment capture flow

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::application::error::{CoreError, CoreResult};
use crate::application::ports::{ChargeOutcome, MarketplaceStore, Notifier, PaymentGateway};
use crate::domain::aggregates::{Payment, PaymentMethod};
use crate::domain::events::{DomainEvent, PaymentEvent};

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn MarketplaceStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
}

#[derive(Clone, Debug)]
pub struct ProcessPayment {
    pub booking_id: Uuid,
    pub method: PaymentMethod,
    pub payment_token: Option<String>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn MarketplaceStore>, gateway: Arc<dyn PaymentGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, gateway, notifier }
    }

    /// Captures payment for a booking. A failed charge yields an `Ok` payment
    /// in `Failed` status (user-visible and retryable); a second attempt
    /// after success is a conflict.
    #[instrument(skip(self, cmd), fields(booking = %cmd.booking_id, method = %cmd.method))]
    pub async fn process(&self, cmd: ProcessPayment) -> CoreResult<Payment> {
        let mut booking = self
            .store
            .booking(cmd.booking_id)
            .await?
            .ok_or(CoreError::NotFound("booking"))?;
        if self.store.completed_payment(booking.id()).await?.is_some() {
            return Err(CoreError::Conflict("payment already processed for this booking".into()));
        }

        let mut payment = Payment::processing(&booking, cmd.method);
        self.store.insert_payment(&payment).await?;

        let charge = self
            .gateway
            .charge(cmd.method, payment.amount(), cmd.payment_token.as_deref())
            .await;

        // The gateway may have moved money; recording the outcome must
        // survive caller cancellation, so it runs on its own task.
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let finalizer = tokio::spawn(async move {
            let outcome = match charge {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(payment = %payment.id(), error = %e, "payment gateway unreachable");
                    ChargeOutcome::Declined { reason: format!("gateway unavailable: {e}") }
                }
            };
            match outcome {
                ChargeOutcome::Approved { transaction_id } => {
                    payment.succeed(transaction_id.clone());
                    let confirmed = booking.confirm_on_payment()?;
                    if let Err(e) = store
                        .finalize_payment(&payment, confirmed.then_some(&mut booking))
                        .await
                    {
                        error!(
                            payment = %payment.id(),
                            transaction = %transaction_id,
                            error = %e,
                            "charge captured but local persistence failed; manual reconciliation required"
                        );
                        return Err(CoreError::Reconciliation { transaction_id });
                    }
                    info!(payment = %payment.id(), transaction = %transaction_id, "payment captured");
                    notifier
                        .notify(
                            booking.customer_id(),
                            "Payment received",
                            &format!("Payment for booking {} was successful.", booking.reference()),
                            serde_json::json!({ "booking_id": booking.id(), "payment_id": payment.id() }),
                        )
                        .await;
                    notifier
                        .broadcast(&DomainEvent::Payment(PaymentEvent::Completed {
                            payment_id: payment.id(),
                            booking_id: booking.id(),
                            transaction_id,
                        }))
                        .await;
                    Ok(payment)
                }
                ChargeOutcome::Declined { reason } => {
                    payment.fail(reason.clone());
                    store.finalize_payment(&payment, None).await?;
                    info!(payment = %payment.id(), reason = %reason, "payment declined");
                    notifier
                        .broadcast(&DomainEvent::Payment(PaymentEvent::Failed {
                            payment_id: payment.id(),
                            booking_id: booking.id(),
                            reason,
                        }))
                        .await;
                    Ok(payment)
                }
            }
        });
        finalizer
            .await
            .map_err(|e| CoreError::Storage(format!("payment finalizer aborted: {e}")))?
    }
}
