//! Service configuration
//!
//! Tuning knobs for chunked delivery, keepalive, and liveness probing.
//! The server binary maps CLI/env arguments onto this struct.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Size, in characters, of each progressive delivery slice.
    pub chunk_size: usize,
    /// Pause between emitted slices, in milliseconds.
    pub chunk_delay_ms: u64,
    /// Queue-wait window before a keepalive comment is sent.
    pub keepalive_secs: u64,
    /// Interval between liveness pings per connection.
    pub ping_interval_secs: u64,
    /// Extra time after a ping before the connection is declared dead.
    pub pong_grace_secs: u64,
    /// Daily request allowance for anonymous fingerprints.
    pub anonymous_daily_limit: u32,
    /// Daily request allowance for free accounts.
    pub free_daily_limit: u32,
    /// Daily request allowance for subscribed accounts.
    pub subscribed_daily_limit: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64,
            chunk_delay_ms: 30,
            keepalive_secs: 30,
            ping_interval_secs: 25,
            pong_grace_secs: 10,
            anonymous_daily_limit: 3,
            free_daily_limit: 20,
            subscribed_daily_limit: 500,
        }
    }
}

impl ChatConfig {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Full window a connection has to answer a ping.
    pub fn pong_window(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs + self.pong_grace_secs)
    }
}
