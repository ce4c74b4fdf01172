//! 统一 API 响应格式
//!
//! 所有控制台接口返回 `{ logs, data, error? }`：
//! `logs` 是本次操作的活动日志，失败时 `data` 为 null。

use axum::{
    body::Bytes,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{AppError, ErrorBody, MintError},
    service::ActivityLog,
};

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub logs: Vec<String>,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// 把操作结果包装成信封响应
pub fn respond<T: Serialize>(log: &ActivityLog, result: Result<T, MintError>) -> Response {
    match result {
        Ok(data) => (
            StatusCode::OK,
            Json(Envelope {
                logs: log.entries(),
                data: Some(data),
                error: None,
            }),
        )
            .into_response(),
        Err(err) => {
            log.warn(format!("❌ {}", err));
            failure(log, AppError::from(&err))
        }
    }
}

pub fn failure(log: &ActivityLog, error: AppError) -> Response {
    (
        error.status,
        Json(Envelope::<()> {
            logs: log.entries(),
            data: None,
            error: Some(error.body()),
        }),
    )
        .into_response()
}

/// JSON 请求体解析失败按校验错误处理
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MintError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| MintError::Validation(rejection.body_text()))
}

/// 可选请求体：空 body 取默认值
pub fn optional_body<T: DeserializeOwned + Default>(bytes: &Bytes) -> Result<T, MintError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|e| MintError::Validation(format!("invalid JSON body: {}", e)))
}
