use serde::{Deserialize, Serialize};

/// Current protocol version.  Bump this when the wire format changes in a
/// breaking way.  Front ends check this on connect and can refuse to talk to
/// an incompatible daemon.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest frame payload a peer may announce in its length header.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Messages sent from a front end to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    /// Reload the catalog for a region code (`"all"` = category partitions).
    SelectRegion { code: String },
    /// Re-filter the loaded catalog; never reloads.
    SelectCategory { label: String },
    /// Select a channel of the full catalog by its stream URL.
    Select { stream_url: String },
    Next,
    Prev,
    MarkBroken { stream_url: String },
    /// Signal forwarded from the playback engine.
    Player { event: PlayerEvent },
    ToggleAutoSkip,
    ToggleSubtitles,
    GetState,
}

/// Messages sent from the daemon to front ends (broadcasts)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "broadcast")]
pub enum Broadcast {
    /// Sent immediately on connect: protocol version + full state snapshot.
    Hello {
        protocol_version: u32,
        rev: u64,
        state: TvState,
    },
    State {
        data: TvState,
    },
    Log {
        message: String,
    },
}

/// Signals reported by the playback engine for the channel it is playing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value")]
pub enum PlayerEvent {
    Buffering(bool),
    /// Playback is running.
    Ready,
    /// The engine entered its error state.
    Error,
}

/// A single playable stream.  Navigation and the broken set key on
/// `stream_url`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Channel {
    /// Stable identifier from the source, may be empty.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub stream_url: String,
    /// Lower-cased, trimmed category label.
    pub category: String,
    /// Region code of the partition this channel came from; `"all"` when it
    /// was fetched by category.
    pub region: String,
}

impl Channel {
    pub fn same_stream(&self, other: &Channel) -> bool {
        self.stream_url == other.stream_url
    }
}

/// Consistent snapshot of catalog + cursor, as seen by front ends.  `rev` is
/// a monotonically increasing counter bumped on every state change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TvState {
    #[serde(default)]
    pub rev: u64,
    /// True between the start of a load and the application of its result.
    pub loading: bool,
    pub region: String,
    pub category: String,
    /// Distinct categories of the full catalog, `"All"` first.
    pub categories: Vec<String>,
    /// Size of the full catalog.
    pub total_channels: usize,
    /// The filtered view, in presentation order.
    pub channels: Vec<Channel>,
    pub selected: Option<Channel>,
    /// Channel after the selection in the view (for pre-buffering).
    pub next: Option<Channel>,
    /// Channel before the selection in the view (for pre-buffering).
    pub prev: Option<Channel>,
    pub broken_count: usize,
    #[serde(default)]
    pub auto_skip_broken: bool,
    #[serde(default)]
    pub subtitles_enabled: bool,
}

/// Wrapper for socket communication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Command(Command),
    Broadcast(Broadcast),
}

impl Message {
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        let len = json.len() as u32;
        let mut result = Vec::with_capacity(4 + json.len());
        result.extend_from_slice(&len.to_be_bytes());
        result.extend_from_slice(&json);
        Ok(result)
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<(Self, usize)> {
        if data.len() < 4 {
            anyhow::bail!("Insufficient data for length header");
        }
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if data.len() < 4 + len {
            anyhow::bail!("Insufficient data for message");
        }
        let msg: Self = serde_json::from_slice(&data[4..4 + len])?;
        Ok((msg, 4 + len))
    }

    /// Split the first complete frame (header included) off the front of
    /// `buf`.  `Ok(None)` means more bytes are needed.  A header announcing
    /// more than [`MAX_FRAME_LEN`] bytes is an error and leaves `buf` as is.
    pub fn take_frame(buf: &mut Vec<u8>) -> anyhow::Result<Option<Vec<u8>>> {
        if buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if len > MAX_FRAME_LEN {
            anyhow::bail!("Frame of {} bytes exceeds limit of {}", len, MAX_FRAME_LEN);
        }
        if buf.len() < 4 + len {
            return Ok(None);
        }
        Ok(Some(buf.drain(..4 + len).collect()))
    }
}
