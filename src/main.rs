// ==========================================
// ForgeDB 核心 - 告警监听主入口
// ==========================================
// 周期性执行告警检测，事件以 JSON 行写到 stdout，日志写到 stderr
// Ctrl-C 退出
// ==========================================

use std::io::Write;

use forge_core::app::{AlertWatcher, AppState, WatchEvent, WatcherSettings};
use forge_core::{i18n, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();
    i18n::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 服务告警监听", forge_core::APP_NAME);
    tracing::info!("系统版本: {}", forge_core::VERSION);
    tracing::info!("==================================================");

    let settings = WatcherSettings::from_env();
    tracing::info!(
        db_path = %settings.db_path,
        poll_secs = settings.poll_interval.as_secs(),
        user_id = ?settings.user_id,
        "使用数据库"
    );

    let state = AppState::new(&settings.db_path, settings.user_id).map_err(anyhow::Error::msg)?;
    let mut watcher = AlertWatcher::new(state.alert_api.clone());
    emit(&watcher.connected())?;

    let mut interval = tokio::time::interval(settings.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let event = watcher.tick().await;
                emit(&event)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(stream_id = %watcher.stream_id(), "收到退出信号，停止监听");
                break;
            }
        }
    }

    Ok(())
}

fn emit(event: &WatchEvent) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", event.to_json_line())?;
    stdout.flush()
}
