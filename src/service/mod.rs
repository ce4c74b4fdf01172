pub mod account_tester;
pub mod activity_log;
pub mod express_route_tester;
pub mod mint; // Mint API 客户端
pub mod notification_tester;

pub use account_tester::{AccountTester, AutoTransfer, TestFlowReport};
pub use activity_log::ActivityLog;
pub use express_route_tester::{ExpressRouteTester, FullFlowOptions, FullFlowReport};
pub use mint::MintClient;
pub use notification_tester::NotificationTester;
