use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::remote_error::RemoteErrorKind;

/// 与 Mint API 交互过程中的统一错误
#[derive(Debug, Error)]
pub enum MintError {
    /// 非 HTTPS 基础地址，在发出任何请求前拒绝
    #[error("refusing to call non-HTTPS base URL: {0}")]
    InsecureUrl(String),

    #[error("MINT_API_KEY is not configured")]
    MissingCredential,

    /// 远端返回非 2xx
    #[error("Mint API error (HTTP {status}): {payload}")]
    Api {
        status: u16,
        kind: RemoteErrorKind,
        code: Option<i64>,
        message: String,
        payload: serde_json::Value,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("timed out after {waited:?} waiting for {operation}")]
    Timeout { operation: String, waited: Duration },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode Mint API response: {0}")]
    Decode(String),

    /// 多步流程中必需步骤失败
    #[error("step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<MintError>,
    },
}

impl MintError {
    /// 远端错误分类；本地错误返回 `None`
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            MintError::Api { kind, .. } => Some(*kind),
            MintError::Step { source, .. } => source.remote_kind(),
            _ => None,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        self.remote_kind() == Some(RemoteErrorKind::AlreadyExists)
    }

    pub fn is_not_found(&self) -> bool {
        self.remote_kind() == Some(RemoteErrorKind::NotFound)
    }

    pub fn in_step(self, step: &'static str) -> Self {
        MintError::Step {
            step,
            source: Box::new(self),
        }
    }

    /// 去掉 `Step` 包装后的根因
    pub fn root(&self) -> &MintError {
        match self {
            MintError::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for MintError {
    fn from(err: serde_json::Error) -> Self {
        MintError::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorCode {
    BadRequest,
    NotFound,
    Conflict,
    Unauthorized,
    RateLimit,
    Timeout,
    ExternalServiceError,
    Internal,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "bad_request",
            AppErrorCode::NotFound => "not_found",
            AppErrorCode::Conflict => "conflict",
            AppErrorCode::Unauthorized => "unauthorized",
            AppErrorCode::RateLimit => "rate_limit",
            AppErrorCode::Timeout => "timeout",
            AppErrorCode::ExternalServiceError => "external_service_error",
            AppErrorCode::Internal => "internal",
        }
    }
}

/// 仪表盘 HTTP 错误
#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
    pub trace_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl AppError {
    fn new(code: AppErrorCode, status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status,
            trace_id: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::BadRequest, StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::NotFound, StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Internal, StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code.as_str().to_string(),
            message: self.message.clone(),
            trace_id: self.trace_id.clone(),
        }
    }
}

impl From<&MintError> for AppError {
    fn from(err: &MintError) -> Self {
        let message = err.to_string();
        match err.root() {
            MintError::Validation(_) => AppError::bad_request(message),
            MintError::InsecureUrl(_) | MintError::MissingCredential => {
                AppError::internal(message)
            }
            MintError::Timeout { .. } => {
                Self::new(AppErrorCode::Timeout, StatusCode::GATEWAY_TIMEOUT, message)
            }
            MintError::Api { kind, .. } => match kind {
                RemoteErrorKind::NotFound => AppError::not_found(message),
                RemoteErrorKind::AlreadyExists => {
                    Self::new(AppErrorCode::Conflict, StatusCode::CONFLICT, message)
                }
                RemoteErrorKind::Unauthorized => Self::new(
                    AppErrorCode::Unauthorized,
                    StatusCode::BAD_GATEWAY,
                    message,
                ),
                RemoteErrorKind::RateLimited => Self::new(
                    AppErrorCode::RateLimit,
                    StatusCode::TOO_MANY_REQUESTS,
                    message,
                ),
                RemoteErrorKind::InvalidRequest => AppError::bad_request(message),
                RemoteErrorKind::Server | RemoteErrorKind::Other => Self::new(
                    AppErrorCode::ExternalServiceError,
                    StatusCode::BAD_GATEWAY,
                    message,
                ),
            },
            MintError::Transport(_) | MintError::Decode(_) => Self::new(
                AppErrorCode::ExternalServiceError,
                StatusCode::BAD_GATEWAY,
                message,
            ),
            // root() 已展开 Step
            MintError::Step { .. } => AppError::internal(message),
        }
    }
}

impl From<MintError> for AppError {
    fn from(err: MintError) -> Self {
        AppError::from(&err)
    }
}

/// 独立返回时仍使用 `{ logs, data, error }` 信封
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "logs": [],
            "data": null,
            "error": self.body(),
        });
        (self.status, Json(body)).into_response()
    }
}
