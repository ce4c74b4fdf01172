//! 通知订阅测试器

use std::sync::Arc;

use serde_json::Value;

use super::{activity_log::ActivityLog, mint::models::Subscription, mint::MintClient};
use crate::error::MintError;

#[derive(Clone)]
pub struct NotificationTester {
    client: Arc<MintClient>,
    log: ActivityLog,
}

impl NotificationTester {
    pub fn new(client: Arc<MintClient>, log: ActivityLog) -> Self {
        Self { client, log }
    }

    /// 订阅 webhook 推送；远端只投递到 HTTPS 地址
    pub async fn subscribe(&self, endpoint: &str) -> Result<Subscription, MintError> {
        let endpoint = endpoint.trim();
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| MintError::Validation(format!("invalid webhook URL {:?}: {}", endpoint, e)))?;
        if url.scheme() != "https" {
            return Err(MintError::Validation(format!(
                "webhook endpoint must use https://, got {}",
                endpoint
            )));
        }

        self.log
            .info(format!("🔔 Subscribing {} to notifications", endpoint));
        let subscription = self.client.create_subscription(endpoint).await?;
        self.log
            .info(format!("   subscription {}", subscription.id));
        Ok(subscription)
    }

    pub async fn list(&self) -> Result<Vec<Subscription>, MintError> {
        let subscriptions = self.client.list_subscriptions().await?;
        self.log
            .info(format!("📋 {} notification subscriptions", subscriptions.len()));
        Ok(subscriptions)
    }

    pub async fn unsubscribe(&self, id: &str) -> Result<Value, MintError> {
        self.log.info(format!("🔕 Removing subscription {}", id));
        self.client.delete_subscription(id).await
    }
}
