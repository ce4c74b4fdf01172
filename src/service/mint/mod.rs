//! Mint API 客户端
//!
//! - `transport`: 网络 I/O 接缝
//! - `models`: 请求/响应载荷
//! - `mint_client`: 每个远端操作一个方法

pub mod mint_client;
pub mod models;
pub mod transport;

pub use mint_client::MintClient;
pub use transport::{
    HttpMethod, MintTransport, ReqwestTransport, TransportRequest, TransportResponse,
};
