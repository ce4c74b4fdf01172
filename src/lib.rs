//! mint-harness - Mint 结算 API 开发测试工具
//!
//! API 客户端、资源测试器、命令行与带 webhook 转发的控制台

pub mod api;
pub mod app_state;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod service;

// 重新导出常用类型
pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, AppErrorCode, MintError};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        config::Config,
        error::{AppError, MintError},
        service::{AccountTester, ActivityLog, ExpressRouteTester, MintClient, NotificationTester},
    };
}
