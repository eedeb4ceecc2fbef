// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip contract consumed by the timeline.
//!
//! A clip is a demuxed media source with its own time base. The timeline only
//! ever seeks a clip to a clip-local position and pulls packets from it; how
//! packets are produced is up to the implementation.

use crate::time::TimeBase;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a clip on a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    /// Create a new random clip ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of media carried by a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaKind {
    /// Video frame
    #[default]
    Video,
    /// Audio samples
    Audio,
}

/// An encoded media packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Presentation timestamp, in `time_base` ticks
    pub pts: i64,
    /// Decode timestamp, in `time_base` ticks
    pub dts: i64,
    /// Duration, in `time_base` ticks (0 if unknown)
    pub duration: i64,
    /// Time base of the timestamps
    pub time_base: TimeBase,
    /// Stream index within the source
    pub stream_index: u32,
    /// Media kind
    pub kind: MediaKind,
    /// Whether the packet starts a decodable unit
    pub keyframe: bool,
    /// Encoded payload
    pub data: Vec<u8>,
}

impl Packet {
    /// Create a video keyframe packet with pts == dts
    pub fn new(pts: i64, duration: i64, time_base: TimeBase, data: Vec<u8>) -> Self {
        Self {
            pts,
            dts: pts,
            duration,
            time_base,
            stream_index: 0,
            kind: MediaKind::Video,
            keyframe: true,
            data,
        }
    }

    /// Set the media kind and stream index
    pub fn with_stream(mut self, stream_index: u32, kind: MediaKind) -> Self {
        self.stream_index = stream_index;
        self.kind = kind;
        self
    }

    /// End of the packet (`pts + duration`)
    pub fn end_pts(&self) -> i64 {
        self.pts.saturating_add(self.duration)
    }
}

/// Error reported by a clip
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    /// Seek target outside the clip
    #[error("Seek to {pts} is outside clip duration {duration}")]
    SeekOutOfBounds {
        /// Requested clip-local position
        pts: i64,
        /// Clip duration
        duration: i64,
    },

    /// IO error from the underlying source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Packet could not be demuxed
    #[error("Decode error: {0}")]
    Decode(String),
}

/// A media source that can be placed on a timeline.
///
/// Releasing a clip is dropping it; the timeline owns each clip exclusively.
pub trait Clip: fmt::Debug + Send {
    /// Display name
    fn name(&self) -> &str;

    /// Time base of the clip's own timestamps
    fn time_base(&self) -> TimeBase;

    /// Total duration of the source, in clip ticks
    fn duration(&self) -> i64;

    /// Position the read cursor so the next packet covers `pts`
    fn seek(&mut self, pts: i64) -> Result<(), ClipError>;

    /// Read the next packet, or `None` once the clip is exhausted
    fn read_packet(&mut self) -> Result<Option<Packet>, ClipError>;
}

/// A clip backed by packets held in memory
#[derive(Debug, Clone)]
pub struct MemoryClip {
    name: String,
    time_base: TimeBase,
    duration: i64,
    packets: Vec<Packet>,
    cursor: usize,
}

impl MemoryClip {
    /// Create a clip from packets, sorted by pts.
    ///
    /// The duration is the end of the last packet.
    pub fn new(name: impl Into<String>, time_base: TimeBase, mut packets: Vec<Packet>) -> Self {
        packets.sort_by_key(|p| p.pts);
        let duration = packets.iter().map(Packet::end_pts).max().unwrap_or(0);
        Self {
            name: name.into(),
            time_base,
            duration,
            packets,
            cursor: 0,
        }
    }

    /// Create a video clip of `frames` frames, each `frame_duration` ticks long.
    ///
    /// Each payload holds the frame number as little-endian bytes.
    pub fn with_frames(
        name: impl Into<String>,
        time_base: TimeBase,
        frames: u32,
        frame_duration: i64,
    ) -> Self {
        let packets = (0..frames)
            .map(|i| {
                let pts = i as i64 * frame_duration;
                Packet::new(pts, frame_duration, time_base, i.to_le_bytes().to_vec())
            })
            .collect();
        Self::new(name, time_base, packets)
    }

    /// Number of packets
    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }

    /// Index of the next packet to be read
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Clip for MemoryClip {
    fn name(&self) -> &str {
        &self.name
    }

    fn time_base(&self) -> TimeBase {
        self.time_base
    }

    fn duration(&self) -> i64 {
        self.duration
    }

    fn seek(&mut self, pts: i64) -> Result<(), ClipError> {
        if pts < 0 || pts >= self.duration {
            return Err(ClipError::SeekOutOfBounds {
                pts,
                duration: self.duration,
            });
        }
        self.cursor = self.packets.partition_point(|p| p.end_pts() <= pts);
        Ok(())
    }

    fn read_packet(&mut self) -> Result<Option<Packet>, ClipError> {
        let packet = self.packets.get(self.cursor).cloned();
        if packet.is_some() {
            self.cursor += 1;
        }
        Ok(packet)
    }
}
