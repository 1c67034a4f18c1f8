use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

/// 优雅关闭管理器
///
/// Signal handlers call [`ShutdownManager::shutdown`]; the campaign loop holds a
/// receiver and cancels the running engine once the flag flips.
#[derive(Clone)]
pub struct ShutdownManager {
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// 订阅关闭信号。关闭之后订阅的接收器会立即看到已关闭状态
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// 触发关闭，重复调用无副作用
    pub fn shutdown(&self) {
        let triggered = self.shutdown_tx.send_if_modified(|is_shutdown| {
            if *is_shutdown {
                return false;
            }
            *is_shutdown = true;
            true
        });

        if triggered {
            info!(
                "触发系统关闭，通知 {} 个订阅者",
                self.shutdown_tx.receiver_count()
            );
        } else {
            debug!("关闭管理器已经触发过关闭");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 等待关闭信号被触发
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|is_shutdown| *is_shutdown).await.is_err() {
        // 管理器已被释放，不会再有关闭信号
        std::future::pending::<()>().await;
    }
}
