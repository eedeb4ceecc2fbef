// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline of clips with seek and continuous packet reading.

use crate::clip::{Clip, ClipError, ClipId, Packet};
use crate::index::ClipIndex;
use crate::placement::Placement;
use crate::settings::TimelineSettings;
use crate::time::{FrameClock, Rational, TimeBase, TimeError};

/// Errors reported by timeline operations
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// Time base or frame rate rejected at creation
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] TimeError),

    /// Placement start before the timeline origin
    #[error("Invalid placement position: {0}")]
    InvalidPosition(i64),

    /// No clip covers the frame
    #[error("Frame {frame_index} is not covered by any clip")]
    OutOfRange {
        /// Requested frame index
        frame_index: i64,
    },

    /// Placement maps outside the clip's media
    #[error("Clip {clip} resolved to position {position}, outside its duration {duration}")]
    ClipInconsistency {
        /// Clip ID
        clip: ClipId,
        /// Resolved clip-local position
        position: i64,
        /// Clip duration
        duration: i64,
    },

    /// Clip is not on this timeline
    #[error("Clip not found: {0}")]
    ClipNotFound(ClipId),

    /// Every clip has been read
    #[error("End of sequence")]
    EndOfSequence,

    /// Read attempted before a successful seek
    #[error("Timeline has not been positioned by a seek")]
    NotPositioned,

    /// Error from a clip
    #[error("Clip {clip} failed: {source}")]
    Clip {
        /// Clip ID
        clip: ClipId,
        /// Underlying error
        #[source]
        source: ClipError,
    },
}

impl TimelineError {
    /// Whether this is the normal end of reading
    pub fn is_end_of_sequence(&self) -> bool {
        matches!(self, Self::EndOfSequence)
    }
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Read position of the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekState {
    /// No successful seek yet
    #[default]
    Unseeked,
    /// Next read comes from `clip`, at `frame_index`
    Positioned {
        /// Active clip
        clip: ClipId,
        /// Next frame to be read
        frame_index: i64,
    },
    /// Past the last clip; reads fail until the next seek
    End {
        /// Frame just past the last clip
        frame_index: i64,
    },
}

/// A packet read from the timeline, timestamped in timeline ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePacket {
    /// Clip the packet came from
    pub clip: ClipId,
    /// Frame index containing the packet's pts
    pub frame_index: i64,
    /// The packet, rescaled to the timeline time base
    pub packet: Packet,
}

/// A single track of clips ordered by start position.
///
/// The timeline owns its clips and releases each one exactly once, when it
/// is removed, on [`Timeline::teardown`], or when the timeline is dropped.
#[derive(Debug)]
pub struct Timeline {
    clips: ClipIndex,
    clock: FrameClock,
    state: SeekState,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new(time_base: TimeBase, frame_rate: Rational) -> Result<Self> {
        let clock = FrameClock::new(time_base, frame_rate)?;
        tracing::debug!(
            "Created timeline at {} fps, time base {}, frame duration {} ticks",
            frame_rate,
            time_base,
            clock.frame_duration()
        );
        Ok(Self {
            clips: ClipIndex::new(clock),
            clock,
            state: SeekState::Unseeked,
        })
    }

    /// Create an empty timeline from settings
    pub fn from_settings(settings: &TimelineSettings) -> Result<Self> {
        Self::new(settings.time_base, settings.frame_rate)
    }

    /// Frame/tick conversion used by this timeline
    pub fn frame_clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Time base of timeline ticks
    pub fn time_base(&self) -> TimeBase {
        self.clock.time_base()
    }

    /// Frames per second
    pub fn frame_rate(&self) -> Rational {
        self.clock.frame_rate()
    }

    /// Duration of one frame in ticks
    pub fn frame_duration(&self) -> i64 {
        self.clock.frame_duration()
    }

    /// Convert a frame index to timeline ticks
    pub fn frame_index_to_pts(&self, frame_index: i64) -> i64 {
        self.clock.frame_index_to_pts(frame_index)
    }

    /// Convert timeline ticks to the frame containing them
    pub fn pts_to_frame_index(&self, pts: i64) -> i64 {
        self.clock.pts_to_frame_index(pts)
    }

    /// Place a clip at a frame index
    pub fn add_clip(&mut self, clip: Box<dyn Clip>, start_frame: i64) -> Result<ClipId> {
        self.add_clip_at_pts(clip, self.clock.frame_index_to_pts(start_frame))
    }

    /// Place a clip at a timeline pts
    pub fn add_clip_at_pts(&mut self, clip: Box<dyn Clip>, start_pts: i64) -> Result<ClipId> {
        self.add_clip_with_origin(clip, start_pts, 0)
    }

    /// Place a clip at a timeline pts, starting from `clip_origin_pts` inside the clip.
    ///
    /// A clip with an invalid time base is rejected and released.
    pub fn add_clip_with_origin(
        &mut self,
        clip: Box<dyn Clip>,
        start_pts: i64,
        clip_origin_pts: i64,
    ) -> Result<ClipId> {
        if start_pts < 0 {
            return Err(TimelineError::InvalidPosition(start_pts));
        }
        let clip_time_base = clip.time_base();
        if !clip_time_base.is_valid() {
            return Err(TimeError::InvalidTimeBase(clip_time_base).into());
        }

        let placement = Placement::new(clip, start_pts, clip_origin_pts);
        let id = placement.id();
        tracing::debug!(
            "Adding clip '{}' ({}) at pts {}",
            placement.clip().name(),
            id,
            start_pts
        );
        self.clips.insert(placement);
        self.resolve_after_edit(id);
        Ok(id)
    }

    /// Place a clip right after the last clip (at 0 on an empty timeline)
    pub fn append_clip(&mut self, clip: Box<dyn Clip>) -> Result<ClipId> {
        self.append_clip_with_origin(clip, 0)
    }

    /// Place a clip right after the last clip, starting from `clip_origin_pts` inside the clip
    pub fn append_clip_with_origin(
        &mut self,
        clip: Box<dyn Clip>,
        clip_origin_pts: i64,
    ) -> Result<ClipId> {
        let start_pts = self
            .clips
            .last()
            .map(|p| p.end_pts(&self.clock))
            .unwrap_or(0);
        self.add_clip_with_origin(clip, start_pts, clip_origin_pts)
    }

    /// Move a clip to start at a frame index
    pub fn move_clip(&mut self, id: ClipId, start_frame: i64) -> Result<()> {
        self.move_clip_pts(id, self.clock.frame_index_to_pts(start_frame))
    }

    /// Move a clip to start at a timeline pts
    pub fn move_clip_pts(&mut self, id: ClipId, start_pts: i64) -> Result<()> {
        if start_pts < 0 {
            return Err(TimelineError::InvalidPosition(start_pts));
        }

        let mut placement = self.clips.remove(id).ok_or(TimelineError::ClipNotFound(id))?;
        tracing::debug!(
            "Moving clip '{}' from pts {} to {}",
            placement.clip().name(),
            placement.timeline_start_pts(),
            start_pts
        );
        placement.set_timeline_start_pts(start_pts);
        self.clips.insert(placement);
        self.resolve_after_edit(id);
        Ok(())
    }

    /// Take a clip off the timeline, handing ownership back to the caller
    pub fn remove_clip(&mut self, id: ClipId) -> Option<Box<dyn Clip>> {
        let placement = self.clips.remove(id)?;
        tracing::debug!("Removed clip '{}' ({})", placement.clip().name(), id);
        self.resolve_after_edit(id);
        Some(placement.into_clip())
    }

    /// Get a placement by clip ID
    pub fn clip(&self, id: ClipId) -> Option<&Placement> {
        self.clips.get(id)
    }

    /// All placements in timeline order
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.clips.iter()
    }

    /// Number of clips
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Whether the timeline has no clips
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// End of the furthest-reaching clip, in ticks
    pub fn duration_pts(&self) -> i64 {
        self.clips
            .iter()
            .map(|p| p.end_pts(&self.clock))
            .max()
            .unwrap_or(0)
    }

    /// End of the furthest-reaching clip, in frames
    pub fn duration_frames(&self) -> i64 {
        self.clock.pts_to_frame_index(self.duration_pts())
    }

    /// Current read state
    pub fn state(&self) -> SeekState {
        self.state
    }

    /// Next frame to be read, if positioned or at the end
    pub fn current_frame_index(&self) -> Option<i64> {
        match self.state {
            SeekState::Unseeked => None,
            SeekState::Positioned { frame_index, .. } | SeekState::End { frame_index } => {
                Some(frame_index)
            }
        }
    }

    /// Placement the next read comes from
    pub fn current_clip(&self) -> Option<&Placement> {
        match self.state {
            SeekState::Positioned { clip, .. } => self.clips.get(clip),
            SeekState::Unseeked | SeekState::End { .. } => None,
        }
    }

    /// Position of the active placement in timeline order
    pub fn current_clip_position(&self) -> Option<usize> {
        match self.state {
            SeekState::Positioned { clip, .. } => self.clips.position_of(clip),
            SeekState::Unseeked | SeekState::End { .. } => None,
        }
    }

    /// Whether every clip has been read
    pub fn is_at_end(&self) -> bool {
        matches!(self.state, SeekState::End { .. })
    }

    /// Clip-local pts shown at `frame_index`, in the clip's ticks.
    ///
    /// A placement starting inside a frame maps that frame to its origin.
    pub fn frame_within_clip(&self, id: ClipId, frame_index: i64) -> Result<i64> {
        let placement = self.clips.get(id).ok_or(TimelineError::ClipNotFound(id))?;
        if !placement.contains_frame(frame_index, &self.clock) {
            return Err(TimelineError::OutOfRange { frame_index });
        }

        let offset = self
            .clock
            .frame_index_to_pts(frame_index)
            .saturating_sub(placement.timeline_start_pts())
            .max(0);
        let clip = placement.clip();
        let position = placement
            .clip_origin_pts()
            .saturating_add(self.clock.time_base().rescale(offset, clip.time_base()));

        if position < 0 || position >= clip.duration() {
            return Err(TimelineError::ClipInconsistency {
                clip: id,
                position,
                duration: clip.duration(),
            });
        }
        Ok(position)
    }

    /// Seek to a frame index.
    ///
    /// On failure the previous read state is kept.
    pub fn seek(&mut self, frame_index: i64) -> Result<()> {
        let id = self
            .clips
            .find_containing(frame_index)
            .and_then(|position| self.clips.get_index(position))
            .map(Placement::id)
            .ok_or(TimelineError::OutOfRange { frame_index })?;
        self.seek_clip(id, frame_index)
    }

    /// Seek to the frame containing a timeline pts
    pub fn seek_pts(&mut self, pts: i64) -> Result<()> {
        self.seek(self.clock.pts_to_frame_index(pts))
    }

    fn seek_clip(&mut self, id: ClipId, frame_index: i64) -> Result<()> {
        let position = self.frame_within_clip(id, frame_index)?;
        let placement = self.clips.get_mut(id).ok_or(TimelineError::ClipNotFound(id))?;
        placement
            .clip_mut()
            .seek(position)
            .map_err(|source| TimelineError::Clip { clip: id, source })?;

        tracing::debug!(
            "Seeked to frame {} in clip '{}' at local pts {}",
            frame_index,
            placement.clip().name(),
            position
        );
        self.state = SeekState::Positioned {
            clip: id,
            frame_index,
        };
        Ok(())
    }

    /// Read the next packet, moving on to the next clip when one runs out.
    ///
    /// Returns [`TimelineError::EndOfSequence`] after the last clip and
    /// [`TimelineError::NotPositioned`] before the first seek; neither
    /// changes the read state.
    pub fn read_packet(&mut self) -> Result<TimelinePacket> {
        loop {
            let (id, frame_index) = match self.state {
                SeekState::Unseeked => return Err(TimelineError::NotPositioned),
                SeekState::End { .. } => return Err(TimelineError::EndOfSequence),
                SeekState::Positioned { clip, frame_index } => (clip, frame_index),
            };

            let clock = self.clock;
            let placement = self.clips.get_mut(id).ok_or(TimelineError::ClipNotFound(id))?;
            let read = placement
                .clip_mut()
                .read_packet()
                .map_err(|source| TimelineError::Clip { clip: id, source })?;

            match read {
                Some(packet) => {
                    let packet = to_timeline_packet(placement, packet, &clock);
                    let frame_after = if packet.duration > 0 {
                        clock.pts_to_frame_index(packet.end_pts())
                    } else {
                        clock.pts_to_frame_index(packet.pts) + 1
                    };
                    let timeline_packet = TimelinePacket {
                        clip: id,
                        frame_index: clock.pts_to_frame_index(packet.pts),
                        packet,
                    };
                    tracing::trace!(
                        "Read packet pts {} (frame {}) from clip {}",
                        timeline_packet.packet.pts,
                        timeline_packet.frame_index,
                        id
                    );

                    self.state = SeekState::Positioned {
                        clip: id,
                        frame_index: frame_index.max(frame_after),
                    };
                    return Ok(timeline_packet);
                }
                None => self.advance_past(id, frame_index)?,
            }
        }
    }

    /// Iterate packets until the end of the sequence
    pub fn packets(&mut self) -> Packets<'_> {
        Packets {
            timeline: self,
            done: false,
        }
    }

    /// Position on the first non-empty clip after `id`, or mark the end
    fn advance_past(&mut self, id: ClipId, frame_index: i64) -> Result<()> {
        let mut next = self.clips.next_after(id);
        while let Some(placement) = next {
            if placement.end_frame(&self.clock) > placement.start_frame(&self.clock) {
                break;
            }
            next = self.clips.next_after(placement.id());
        }

        match next.map(|p| (p.id(), p.start_frame(&self.clock))) {
            Some((next_id, start_frame)) => {
                tracing::debug!("Clip {} exhausted, continuing with {}", id, next_id);
                self.seek_clip(next_id, start_frame)
            }
            None => {
                let end = self.duration_frames().max(frame_index);
                tracing::debug!("Reached end of sequence at frame {}", end);
                self.state = SeekState::End { frame_index: end };
                Err(TimelineError::EndOfSequence)
            }
        }
    }

    /// Keep the read state consistent after the clip `changed` was edited.
    ///
    /// Editing another clip leaves the read position alone unless the edited
    /// clip now covers the current frame. This includes the position just
    /// past an exhausted clip, which the next read moves on from.
    fn resolve_after_edit(&mut self, changed: ClipId) {
        let SeekState::Positioned { clip, frame_index } = self.state else {
            return;
        };

        if clip != changed && self.clips.get(clip).is_some() {
            let resolved = self
                .clips
                .find_containing(frame_index)
                .and_then(|position| self.clips.get_index(position))
                .map(Placement::id);
            if resolved != Some(changed) {
                return;
            }
        }

        if let Err(e) = self.seek(frame_index) {
            tracing::debug!("Read position at frame {} invalidated: {}", frame_index, e);
            self.state = SeekState::Unseeked;
        }
    }

    /// Release every clip and consume the timeline; returns how many were released
    pub fn teardown(mut self) -> usize {
        self.release_clips()
    }

    /// Take every clip off the timeline, in timeline order
    pub fn into_clips(mut self) -> Vec<Box<dyn Clip>> {
        self.state = SeekState::Unseeked;
        self.clips.drain().map(Placement::into_clip).collect()
    }

    fn release_clips(&mut self) -> usize {
        self.state = SeekState::Unseeked;
        let mut released = 0;
        for placement in self.clips.drain() {
            tracing::trace!("Releasing clip '{}'", placement.clip().name());
            drop(placement);
            released += 1;
        }
        if released > 0 {
            tracing::info!("Released {} clips", released);
        }
        released
    }
}

impl Drop for Timeline {
    fn drop(&mut self) {
        self.release_clips();
    }
}

fn to_timeline_packet(placement: &Placement, mut packet: Packet, clock: &FrameClock) -> Packet {
    let clip_time_base = placement.clip().time_base();
    let pts = packet.time_base.rescale(packet.pts, clip_time_base);
    let dts = packet.time_base.rescale(packet.dts, clip_time_base);

    packet.duration = packet.time_base.rescale(packet.duration, clock.time_base());
    packet.pts = placement.clip_pts_to_timeline(pts, clock);
    packet.dts = placement.clip_pts_to_timeline(dts, clock);
    packet.time_base = clock.time_base();
    packet
}

/// Iterator over [`Timeline::read_packet`].
///
/// Ends at the end of the sequence; stops after yielding any other error.
pub struct Packets<'a> {
    timeline: &'a mut Timeline,
    done: bool,
}

impl Iterator for Packets<'_> {
    type Item = Result<TimelinePacket>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.timeline.read_packet() {
            Ok(packet) => Some(Ok(packet)),
            Err(TimelineError::EndOfSequence) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
