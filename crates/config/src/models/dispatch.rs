use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Inter-send pacing. The jitter keeps the gateway's abuse detection quiet,
/// so both bounds stay tunable per deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PacingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Wait before the first attempt after `start()`.
    pub start_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 300,
            max_delay_ms: 800,
            start_delay_ms: 500,
        }
    }
}

impl PacingConfig {
    /// Pacing with a fixed delay and no start delay, mostly useful in tests.
    pub fn fixed(delay_ms: u64) -> Self {
        Self {
            min_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            start_delay_ms: 0,
        }
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(anyhow::anyhow!(
                "最小发送间隔({}ms)不能大于最大发送间隔({}ms)",
                self.min_delay_ms,
                self.max_delay_ms
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of concurrent send workers. 1 keeps sends strictly sequential.
    pub max_concurrency: usize,
    /// Token replaced by the recipient's display name.
    pub placeholder: String,
    /// Capacity of the observer event channel.
    pub event_buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            placeholder: "{nome}".to_string(),
            event_buffer: 256,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrency == 0 {
            return Err(anyhow::anyhow!("最大并发发送数必须大于0"));
        }
        if self.max_concurrency > 16 {
            return Err(anyhow::anyhow!(
                "最大并发发送数不能超过16，当前: {}",
                self.max_concurrency
            ));
        }
        if self.placeholder.trim().is_empty() {
            return Err(anyhow::anyhow!("姓名占位符不能为空"));
        }
        if self.event_buffer == 0 {
            return Err(anyhow::anyhow!("事件缓冲区大小必须大于0"));
        }
        Ok(())
    }
}
