//! Group broadcast の実装
//!
//! - `inmemory`: 単一プロセス内の購読者マップを使った実装

pub mod inmemory;

pub use inmemory::InMemoryGroupBroadcaster;
