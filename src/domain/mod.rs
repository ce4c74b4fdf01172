//! 领域层：金额、幂等键、远端错误分类与有界轮询

pub mod amount;
pub mod idempotency;
pub mod polling;
pub mod remote_error;

pub use amount::{format_major_units, parse_amount};
pub use idempotency::IdempotencyKey;
pub use polling::{poll_until, PollPolicy};
pub use remote_error::{classify, RemoteErrorBody, RemoteErrorKind};
