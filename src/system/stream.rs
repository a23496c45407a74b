// src/system/stream.rs

use crate::{
    models::StreamConfig,
    system::services::{StreamInfo, StreamInfoProvider},
};

/// Reports the same configured status for every channel.
#[derive(Debug, Clone, Default)]
pub struct StaticStreamInfo {
    info: StreamInfo,
}

impl StaticStreamInfo {
    /// Creates a provider from the `[stream]` table.
    pub fn from_config(config: &StreamConfig) -> Self {
        Self {
            info: StreamInfo {
                live: config.live,
                title: config.title.clone(),
                game: config.game.clone(),
                viewers: config.viewers,
                uptime: config.uptime.clone(),
            },
        }
    }
}

impl StreamInfoProvider for StaticStreamInfo {
    fn stream_info(&self, _channel: &str) -> Option<StreamInfo> {
        Some(self.info.clone())
    }
}
