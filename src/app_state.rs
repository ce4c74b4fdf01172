use std::{sync::Arc, time::Duration};

use crate::{
    api::events::EventHub,
    config::Config,
    error::MintError,
    service::{
        mint::{MintClient, MintTransport},
        AccountTester, ActivityLog, ExpressRouteTester, NotificationTester,
    },
};

/// 应用状态
/// 配置启动后只读；唯一共享的可变状态是事件监听者集合
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: Arc<MintClient>,
    pub events: EventHub,
    /// 用于确认 SNS 订阅的通用 HTTP 客户端
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Result<Self, MintError> {
        let client = Arc::new(MintClient::new(&config.mint)?);
        Self::build(config, client)
    }

    /// 使用自定义传输层（测试用）
    pub fn with_transport(
        config: Arc<Config>,
        transport: Arc<dyn MintTransport>,
    ) -> Result<Self, MintError> {
        let client = Arc::new(MintClient::with_transport(&config.mint, transport));
        Self::build(config, client)
    }

    fn build(config: Arc<Config>, client: Arc<MintClient>) -> Result<Self, MintError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.mint.timeout_secs))
            .build()
            .map_err(|e| MintError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            events: EventHub::default(),
            http,
        })
    }

    pub fn account_tester(&self, log: &ActivityLog) -> AccountTester {
        AccountTester::new(self.client.clone(), log.clone())
    }

    pub fn express_route_tester(&self, log: &ActivityLog) -> ExpressRouteTester {
        ExpressRouteTester::new(self.account_tester(log), self.config.polling.policy())
    }

    pub fn notification_tester(&self, log: &ActivityLog) -> NotificationTester {
        NotificationTester::new(self.client.clone(), log.clone())
    }
}
