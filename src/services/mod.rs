pub mod logs;
pub mod notifier;
pub mod storage;
