use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub ready_timeout_seconds: u64,
    pub demo_pairing_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ready_timeout_seconds: 30,
            demo_pairing_delay_ms: 3000,
        }
    }
}

impl SessionConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_seconds)
    }

    pub fn demo_pairing_delay(&self) -> Duration {
        Duration::from_millis(self.demo_pairing_delay_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ready_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("会话就绪超时时间必须大于0"));
        }
        Ok(())
    }
}
