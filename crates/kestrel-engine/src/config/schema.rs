use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KestrelConfig {
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// Where the extension connects and how long a command may wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
    /// How long a command waits for an extension to connect; 0 fails at once.
    #[serde(default)]
    pub connect_grace_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reply_timeout_ms: default_reply_timeout_ms(),
            connect_grace_ms: 0,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9001
}

fn default_reply_timeout_ms() -> u64 {
    30000
}
