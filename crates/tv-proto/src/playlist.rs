//! Extended-M3U playlist parsing.
//!
//! The format is line oriented: an `#EXTM3U` header, then for every channel a
//! `#EXTINF:` metadata line followed by the stream URL.  Parsing never fails;
//! anything that does not fit the shape is skipped.

use std::sync::OnceLock;

use regex::Regex;

use crate::protocol::Channel;

const EXTINF: &str = "#EXTINF:";

fn attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([a-zA-Z0-9-]+)="([^"]*)""#).expect("valid attribute regex")
    })
}

/// Metadata of an `#EXTINF` line waiting for its URL line.
#[derive(Debug, Clone, PartialEq)]
struct PendingEntry {
    id: String,
    name: Option<String>,
    logo_url: Option<String>,
    category: String,
}

impl PendingEntry {
    fn from_extinf(info: &str, partition: &str) -> Self {
        let mut id = String::new();
        let mut logo_url = None;
        let mut group = None;

        for caps in attribute_re().captures_iter(info) {
            let value = &caps[2];
            match &caps[1] {
                "tvg-id" => id = value.trim().to_string(),
                "tvg-logo" | "logo" => logo_url = Some(value.trim().to_string()),
                "group-title" | "group" => group = Some(value.to_string()),
                _ => {}
            }
        }

        // Multi-category entries ("News;Weather") keep their first category
        let category = group
            .as_deref()
            .and_then(|g| g.split(';').next())
            .map(normalize_category)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| normalize_category(partition));

        let name = info
            .rfind(',')
            .map(|idx| info[idx + 1..].trim().to_string())
            .filter(|n| !n.is_empty());

        Self {
            id,
            name,
            logo_url: logo_url.filter(|l| !l.is_empty()),
            category,
        }
    }

    fn into_channel(self, stream_url: &str, region: &str) -> Option<Channel> {
        let name = self.name?;
        Some(Channel {
            id: self.id,
            name,
            logo_url: self.logo_url,
            stream_url: stream_url.to_string(),
            category: self.category,
            region: region.to_string(),
        })
    }
}

fn normalize_category(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Parse a playlist document into channels, in document order.
///
/// `partition` is the label the document was fetched under and becomes the
/// category of entries without a `group-title`; `region` is stamped on every
/// channel.
pub fn parse_playlist(text: &str, partition: &str, region: &str) -> Vec<Channel> {
    let (channels, _) = text.lines().map(str::trim).fold(
        (Vec::new(), None::<PendingEntry>),
        |(mut channels, pending), line| {
            if let Some(info) = line.strip_prefix(EXTINF) {
                // A second #EXTINF before any URL replaces the first
                return (channels, Some(PendingEntry::from_extinf(info, partition)));
            }
            if line.is_empty() || line.starts_with('#') {
                return (channels, pending);
            }
            // First URL line consumes the pending metadata, emitted or not
            if let Some(channel) = pending.and_then(|p| p.into_channel(line, region)) {
                channels.push(channel);
            }
            (channels, None)
        },
    );
    channels
}
