//! Buffering watchdog for the channel being played.
//!
//! Live streams routinely buffer for a moment after a switch, so stalls that
//! start inside the zap window only count from the end of that window.  A
//! stall that outlasts the grace period reports the channel once.

use std::time::{Duration, Instant};

use crate::config::PlaybackConfig;
use crate::protocol::PlayerEvent;

#[derive(Debug, Clone)]
pub struct BufferingWatchdog {
    grace: Duration,
    zap_window: Duration,
    stream_url: Option<String>,
    switched_at: Option<Instant>,
    stalled_since: Option<Instant>,
    reported: bool,
}

impl BufferingWatchdog {
    pub fn new(grace: Duration, zap_window: Duration) -> Self {
        Self {
            grace,
            zap_window,
            stream_url: None,
            switched_at: None,
            stalled_since: None,
            reported: false,
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(
            Duration::from_millis(config.buffering_grace_ms),
            Duration::from_millis(config.zap_window_ms),
        )
    }

    /// The player was pointed at a different stream (or stopped).
    pub fn channel_switched(&mut self, stream_url: Option<&str>, now: Instant) {
        if self.stream_url.as_deref() == stream_url {
            return;
        }
        self.stream_url = stream_url.map(str::to_string);
        self.switched_at = Some(now);
        self.stalled_since = None;
        self.reported = false;
    }

    pub fn on_event(&mut self, event: PlayerEvent, now: Instant) {
        match event {
            PlayerEvent::Buffering(true) | PlayerEvent::Error => {
                if self.stalled_since.is_none() && self.stream_url.is_some() {
                    let start = self.zap_window_end().map_or(now, |end| end.max(now));
                    self.stalled_since = Some(start);
                }
            }
            PlayerEvent::Buffering(false) | PlayerEvent::Ready => {
                self.stalled_since = None;
            }
        }
    }

    fn zap_window_end(&self) -> Option<Instant> {
        self.switched_at.map(|at| at + self.zap_window)
    }

    /// When the current stall will be reported, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        if self.reported {
            return None;
        }
        self.stalled_since.map(|since| since + self.grace)
    }

    /// Returns the stream URL to mark broken once its stall has outlasted
    /// the grace period.  Reports at most once per channel.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.reported = true;
        self.stream_url.clone()
    }
}
