// SPDX-License-Identifier: MIT OR Apache-2.0
//! Placement of a clip on the timeline.

use crate::clip::{Clip, ClipId};
use crate::time::FrameClock;

/// A clip positioned on the timeline.
///
/// `timeline_start_pts` is in timeline ticks, `clip_origin_pts` in the clip's
/// own ticks. The span is derived from the clip duration and is never stored.
#[derive(Debug)]
pub struct Placement {
    id: ClipId,
    clip: Box<dyn Clip>,
    timeline_start_pts: i64,
    clip_origin_pts: i64,
}

impl Placement {
    /// Create a placement owning `clip`
    pub fn new(clip: Box<dyn Clip>, timeline_start_pts: i64, clip_origin_pts: i64) -> Self {
        Self {
            id: ClipId::new(),
            clip,
            timeline_start_pts,
            clip_origin_pts,
        }
    }

    /// Clip ID
    pub fn id(&self) -> ClipId {
        self.id
    }

    /// The placed clip
    pub fn clip(&self) -> &dyn Clip {
        self.clip.as_ref()
    }

    /// The placed clip, mutably
    pub fn clip_mut(&mut self) -> &mut dyn Clip {
        self.clip.as_mut()
    }

    /// Release ownership of the clip
    pub fn into_clip(self) -> Box<dyn Clip> {
        self.clip
    }

    /// Start on the timeline, in timeline ticks
    pub fn timeline_start_pts(&self) -> i64 {
        self.timeline_start_pts
    }

    /// Clip-local position shown at `timeline_start_pts`, in clip ticks
    pub fn clip_origin_pts(&self) -> i64 {
        self.clip_origin_pts
    }

    pub(crate) fn set_timeline_start_pts(&mut self, pts: i64) {
        self.timeline_start_pts = pts;
    }

    /// Length on the timeline, in timeline ticks
    pub fn span_pts(&self, clock: &FrameClock) -> i64 {
        let remaining = self.clip.duration().saturating_sub(self.clip_origin_pts).max(0);
        self.clip.time_base().rescale(remaining, clock.time_base())
    }

    /// End on the timeline (exclusive), in timeline ticks
    pub fn end_pts(&self, clock: &FrameClock) -> i64 {
        self.timeline_start_pts.saturating_add(self.span_pts(clock))
    }

    /// First frame index covered
    pub fn start_frame(&self, clock: &FrameClock) -> i64 {
        clock.pts_to_frame_index(self.timeline_start_pts)
    }

    /// Frame index just past the placement
    pub fn end_frame(&self, clock: &FrameClock) -> i64 {
        clock.pts_to_frame_index(self.end_pts(clock))
    }

    /// Whether `frame_index` lies within the placement
    pub fn contains_frame(&self, frame_index: i64, clock: &FrameClock) -> bool {
        frame_index >= self.start_frame(clock) && frame_index < self.end_frame(clock)
    }

    /// Map a clip-local pts to timeline ticks
    pub fn clip_pts_to_timeline(&self, pts: i64, clock: &FrameClock) -> i64 {
        let offset = self
            .clip
            .time_base()
            .rescale(pts.saturating_sub(self.clip_origin_pts), clock.time_base());
        self.timeline_start_pts.saturating_add(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::MemoryClip;
    use crate::time::{Rational, TimeBase};

    fn clock() -> FrameClock {
        FrameClock::new(TimeBase::new(1, 600_000), Rational::from_int(30)).unwrap()
    }

    #[test]
    fn test_span_in_same_time_base() {
        let clock = clock();
        let clip = MemoryClip::with_frames("A", clock.time_base(), 90, 20_000);
        let placement = Placement::new(Box::new(clip), 0, 0);

        assert_eq!(placement.span_pts(&clock), 1_800_000);
        assert_eq!(placement.start_frame(&clock), 0);
        assert_eq!(placement.end_frame(&clock), 90);
        assert!(placement.contains_frame(89, &clock));
        assert!(!placement.contains_frame(90, &clock));
    }

    #[test]
    fn test_span_rescaled_and_trimmed() {
        let clock = clock();
        // 10 frames at 3000 ticks of 1/90000 = 1/3 s
        let clip = MemoryClip::with_frames("A", TimeBase::MPEG, 10, 3000);
        let placement = Placement::new(Box::new(clip), 200_000, 6000);

        // 8 remaining frames = 8/30 s
        assert_eq!(placement.span_pts(&clock), 160_000);
        assert_eq!(placement.start_frame(&clock), 10);
        assert_eq!(placement.end_frame(&clock), 18);
    }

    #[test]
    fn test_clip_pts_to_timeline() {
        let clock = clock();
        let clip = MemoryClip::with_frames("A", TimeBase::MPEG, 10, 3000);
        let placement = Placement::new(Box::new(clip), 200_000, 6000);

        assert_eq!(placement.clip_pts_to_timeline(6000, &clock), 200_000);
        assert_eq!(placement.clip_pts_to_timeline(9000, &clock), 220_000);
    }

    #[test]
    fn test_origin_past_duration_has_empty_span() {
        let clock = clock();
        let clip = MemoryClip::with_frames("A", clock.time_base(), 2, 20_000);
        let placement = Placement::new(Box::new(clip), 0, 100_000);
        assert_eq!(placement.span_pts(&clock), 0);
        assert!(!placement.contains_frame(0, &clock));
    }
}
