//! Provider payout requests

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::error::{CoreError, CoreResult};
use crate::application::ports::{MarketplaceStore, Notifier};
use crate::domain::aggregates::Payout;
use crate::domain::events::{DomainEvent, PayoutEvent};
use crate::domain::value_objects::Money;

#[derive(Clone)]
pub struct PayoutService {
    store: Arc<dyn MarketplaceStore>,
    notifier: Arc<dyn Notifier>,
}

impl PayoutService {
    pub fn new(store: Arc<dyn MarketplaceStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Moves part of the provider's pending balance into a payout request.
    /// Disbursement itself happens outside the platform.
    #[instrument(skip(self), fields(provider = %provider_id))]
    pub async fn request(&self, provider_id: Uuid, amount: Decimal) -> CoreResult<Payout> {
        let mut provider = self
            .store
            .provider(provider_id)
            .await?
            .ok_or(CoreError::NotFound("provider"))?;
        let amount = Money::new(amount, provider.pending_balance().currency());
        // validates against the loaded balance; the store's conditional debit
        // guards the concurrent case
        provider.debit_for_payout(&amount)?;

        let payout = Payout::request(provider_id, amount.clone());
        self.store.insert_payout(&payout).await?;
        info!(payout = %payout.id(), amount = %amount, "payout requested");
        self.notifier
            .notify(
                provider_id,
                "Payout requested",
                &format!("Your payout of {amount} has been queued."),
                serde_json::json!({ "payout_id": payout.id() }),
            )
            .await;
        self.notifier
            .broadcast(&DomainEvent::Payout(PayoutEvent::Requested {
                payout_id: payout.id(),
                provider_id,
                amount: amount.amount(),
            }))
            .await;
        Ok(payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{PayoutStatus, ServiceProvider};
    use crate::infra::memory::MemoryStore;
    use crate::infra::notify::LogNotifier;

    fn fixture(balance: i64) -> (PayoutService, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let mut provider = ServiceProvider::new("Spark Electric", "SAR");
        provider.accrue(Money::sar(Decimal::new(balance, 0)));
        let id = provider.id();
        store.seed_provider(provider);
        (PayoutService::new(store.clone(), Arc::new(LogNotifier)), store, id)
    }

    #[tokio::test]
    async fn payout_debits_pending_balance() {
        let (svc, store, provider_id) = fixture(400);
        let payout = svc.request(provider_id, Decimal::new(250, 0)).await.unwrap();
        assert_eq!(payout.status(), PayoutStatus::Requested);
        assert_eq!(payout.amount().amount(), Decimal::new(250, 0));

        let provider = store.provider(provider_id).await.unwrap().unwrap();
        assert_eq!(provider.pending_balance().amount(), Decimal::new(150, 0));
    }

    #[tokio::test]
    async fn payout_cannot_exceed_balance() {
        let (svc, store, provider_id) = fixture(100);
        let err = svc.request(provider_id, Decimal::new(150, 0)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        let provider = store.provider(provider_id).await.unwrap().unwrap();
        assert_eq!(provider.pending_balance().amount(), Decimal::new(100, 0));
    }

    #[tokio::test]
    async fn payout_must_be_positive() {
        let (svc, _, provider_id) = fixture(100);
        assert!(matches!(svc.request(provider_id, Decimal::ZERO).await, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let (svc, _, _) = fixture(100);
        assert!(matches!(svc.request(Uuid::new_v4(), Decimal::ONE).await, Err(CoreError::NotFound("provider"))));
    }
}
