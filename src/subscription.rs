//! Subscription plans, boosters and billing history.

use std::sync::Arc;

use crate::api::{ApiRequest, Transport, decode, decode_list};
use crate::error::Result;
use crate::model::{Booster, CurrentSubscription, SubscriptionPlan, Transaction};

pub struct SubscriptionService {
    transport: Arc<dyn Transport>,
}

impl SubscriptionService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let data = self
            .transport
            .send(ApiRequest::get("/subscription-plans"))
            .await?;
        Ok(decode_list(data, "plans")?)
    }

    pub async fn boosters(&self) -> Result<Vec<Booster>> {
        let data = self.transport.send(ApiRequest::get("/boosters")).await?;
        Ok(decode_list(data, "boosters")?)
    }

    /// The current plan, if any, and boosters still running.
    pub async fn current(&self) -> Result<CurrentSubscription> {
        let data = self.transport.send(ApiRequest::get("/me/subscription")).await?;
        if data.is_null() {
            return Ok(CurrentSubscription::default());
        }
        Ok(decode(data)?)
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        let data = self.transport.send(ApiRequest::get("/me/transactions")).await?;
        Ok(decode_list(data, "transactions")?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::Method;
    use crate::i18n::{Locale, localized};
    use crate::testing::StubTransport;

    #[tokio::test]
    async fn plans_and_boosters() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Get, "/subscription-plans", json!({"plans": [{
            "id": "p1", "slug": "pro", "display_name": {"en": "Pro", "tr": "Profesyonel"},
            "monthly_price_cents": 19900, "yearly_price_cents": 199000, "features": ["badge"]
        }]}));
        stub.on(Method::Get, "/boosters", json!({"boosters": [{
            "id": "b1", "slug": "week", "display_name": {"en": "Weekly boost"},
            "price_cents": 4900, "duration_days": 7, "search_ranking_boost": 1.5
        }]}));
        let service = SubscriptionService::new(stub);

        let plans = service.plans().await.unwrap();
        assert_eq!(localized(&plans[0].display_name, Locale::Tr), "Profesyonel");
        let boosters = service.boosters().await.unwrap();
        assert_eq!(boosters[0].duration_days, 7);
    }

    #[tokio::test]
    async fn current_subscription_with_boosters() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Get, "/me/subscription", json!({
            "current_subscription": null,
            "active_boosters": [{
                "booster": {"display_name": {"en": "Weekly boost"}},
                "expires_at": "2024-06-01T00:00:00Z"
            }]
        }));
        stub.on(Method::Get, "/me/subscription", json!(null));
        let service = SubscriptionService::new(stub);

        let current = service.current().await.unwrap();
        assert!(current.current_subscription.is_none());
        assert_eq!(current.active_boosters.len(), 1);
        assert_eq!(service.current().await.unwrap(), CurrentSubscription::default());
    }

    #[tokio::test]
    async fn transactions_list() {
        let stub = Arc::new(StubTransport::new());
        stub.on(Method::Get, "/me/transactions", json!({"transactions": [{
            "id": "t1", "type": "subscription", "amount_cents": 19900, "currency": "TRY",
            "status": "completed", "billing_provider": "iyzico", "created_at": "2024-05-01T10:00:00Z"
        }]}));
        let list = SubscriptionService::new(stub).transactions().await.unwrap();
        assert_eq!(list[0].amount_cents, 19900);
    }
}
