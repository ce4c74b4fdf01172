//! Mint API 错误分类
//!
//! 远端错误体形如 `{"code": 2, "message": "..."}`。这里把 HTTP 状态码和
//! 结构化 `code` 映射为有限的 `RemoteErrorKind`，调用方对其做穷尽匹配。

use serde::{Deserialize, Serialize};

/// 沙箱环境下表示"资源已存在"的业务错误码
pub const DUPLICATE_ENTITY_CODES: &[i64] = &[1092, 5011, 5035];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    AlreadyExists,
    NotFound,
    Unauthorized,
    InvalidRequest,
    RateLimited,
    Server,
    Other,
}

impl RemoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteErrorKind::AlreadyExists => "already_exists",
            RemoteErrorKind::NotFound => "not_found",
            RemoteErrorKind::Unauthorized => "unauthorized",
            RemoteErrorKind::InvalidRequest => "invalid_request",
            RemoteErrorKind::RateLimited => "rate_limited",
            RemoteErrorKind::Server => "server_error",
            RemoteErrorKind::Other => "remote_error",
        }
    }
}

/// 远端错误体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// 根据状态码与结构化错误码分类
///
/// 只有在错误体没有 `code` 时才退回到消息文本匹配。
pub fn classify(status: u16, code: Option<i64>, message: &str) -> RemoteErrorKind {
    if status == 409 {
        return RemoteErrorKind::AlreadyExists;
    }
    if let Some(code) = code {
        if DUPLICATE_ENTITY_CODES.contains(&code) {
            return RemoteErrorKind::AlreadyExists;
        }
    }

    match status {
        404 => RemoteErrorKind::NotFound,
        401 | 403 => RemoteErrorKind::Unauthorized,
        429 => RemoteErrorKind::RateLimited,
        500..=599 => RemoteErrorKind::Server,
        400 | 422 => {
            if code.is_none() && mentions_duplicate(message) {
                RemoteErrorKind::AlreadyExists
            } else {
                RemoteErrorKind::InvalidRequest
            }
        }
        _ => RemoteErrorKind::Other,
    }
}

fn mentions_duplicate(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("already exist") || lower.contains("duplicate")
}
