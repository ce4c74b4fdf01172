//! HTTP 传输层
//!
//! `MintClient` 负责拼装请求与解析响应，真正的网络 I/O 交给 `MintTransport`。
//! 生产环境使用 reqwest，测试中可以替换为脚本化实现。

use std::time::Duration;

use async_trait::async_trait;

use crate::error::MintError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl TransportRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait MintTransport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, MintError>;
}

/// reqwest 实现
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, MintError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MintError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MintTransport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, MintError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            MintError::Transport(format!("{} {} failed: {}", request.method.as_str(), request.url, e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            MintError::Transport(format!("failed to read response body: {}", e))
        })?;

        // 空响应体时用状态码原因短语兜底
        let body = if body.is_empty() && !status.is_success() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            body
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}
