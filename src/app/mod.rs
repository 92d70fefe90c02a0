// ==========================================
// ForgeDB 核心 - 应用层
// ==========================================
// 职责: 组装应用状态；告警轮询监听
// ==========================================

pub mod state;
pub mod watcher;

// 重导出
pub use state::AppState;
pub use watcher::{AlertWatcher, WatchEvent, WatcherSettings};
