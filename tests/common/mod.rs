//! 测试辅助模块
//! 脚本化的内存传输层与测试配置

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mint_harness::{
    config::Config,
    error::MintError,
    service::mint::{HttpMethod, MintClient, MintTransport, TransportRequest, TransportResponse},
};
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://mint.test";
pub const API_KEY: &str = "test-key";

/// 按 (方法, 路径) 预设响应；队列只剩一个时重复返回它
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<TransportResponse>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: HttpMethod, path: &str, status: u16, body: Value) -> &Self {
        self.on_raw(method, path, status, &body.to_string())
    }

    pub fn on_raw(&self, method: HttpMethod, path: &str, status: u16, body: &str) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(TransportResponse {
                status,
                body: body.to_string(),
            });
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: HttpMethod, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && path_of(&r.url) == path)
            .count()
    }

    pub fn bodies_sent_to(&self, method: HttpMethod, path: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && path_of(&r.url) == path)
            .filter_map(|r| r.body)
            .collect()
    }
}

fn path_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl MintTransport for ScriptedTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, MintError> {
        let key = (request.method, path_of(&request.url));
        self.requests.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        let response = match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| TransportResponse {
            status: 404,
            body: json!({"code": -1, "message": "no route"}).to_string(),
        }))
    }
}

/// HTTPS 地址、测试密钥、毫秒级轮询
pub fn test_config() -> Config {
    config_with(|_| None)
}

pub fn config_with<F>(overrides: F) -> Config
where
    F: Fn(&str) -> Option<&'static str>,
{
    Config::from_vars(|key| {
        if let Some(value) = overrides(key) {
            return Some(value.to_string());
        }
        let value = match key {
            "MINT_API_KEY" => API_KEY,
            "MINT_BASE_URL" => BASE_URL,
            "POLL_INITIAL_DELAY_MS" => "1",
            "POLL_MAX_DELAY_MS" => "5",
            "POLL_TIMEOUT_SECS" => "1",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("test config")
}

pub fn client(transport: &Arc<ScriptedTransport>) -> Arc<MintClient> {
    let transport: Arc<dyn MintTransport> = transport.clone();
    Arc::new(MintClient::with_transport(&test_config().mint, transport))
}

pub fn data(value: Value) -> Value {
    json!({ "data": value })
}

pub fn balance(amount: &str) -> Value {
    data(json!({
        "available": [{"amount": amount, "currency": "USD"}],
        "unsettled": []
    }))
}

pub fn duplicate_error() -> Value {
    json!({"code": 1092, "message": "Resource already exists"})
}
