// SPDX-License-Identifier: MIT OR Apache-2.0
//! Player project files.
//!
//! A project describes a timeline made of synthetic in-memory clips, which is
//! enough to exercise seeking and reading without a demuxer.

use ordoplay_editor_timeline::{
    MemoryClip, TimeBase, Timeline, TimelineError, TimelineSettings,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default project file name
pub const PROJECT_FILE_NAME: &str = "timeline_project.ron";

/// Project errors
#[derive(Debug, Error)]
pub enum ProjectError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Project file could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Timeline rejected the project
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),
}

/// Where a clip goes on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClipPosition {
    /// Right after the last clip
    #[default]
    Append,
    /// At a frame index
    AtFrame(i64),
    /// At a timeline pts
    AtPts(i64),
}

/// A synthetic clip of evenly spaced video frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipDescription {
    /// Clip name
    pub name: String,
    /// Time base of the clip's packets
    pub time_base: TimeBase,
    /// Number of frames
    pub frames: u32,
    /// Ticks per frame, in the clip's time base
    pub frame_duration: i64,
    /// In-point inside the clip, in the clip's time base
    #[serde(default)]
    pub origin: i64,
    /// Placement on the timeline
    #[serde(default)]
    pub position: ClipPosition,
}

/// A timeline project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescription {
    /// Timeline settings
    pub settings: TimelineSettings,
    /// Clips, added in order
    pub clips: Vec<ClipDescription>,
    /// Frame to start reading from
    #[serde(default)]
    pub start_frame: i64,
}

impl ProjectDescription {
    /// Three clips in different time bases, the last one after a gap
    pub fn demo() -> Self {
        Self {
            settings: TimelineSettings::default(),
            clips: vec![
                ClipDescription {
                    name: "intro".into(),
                    time_base: TimeBase::new(1, 600_000),
                    frames: 90,
                    frame_duration: 20_000,
                    origin: 0,
                    position: ClipPosition::Append,
                },
                ClipDescription {
                    name: "interview".into(),
                    time_base: TimeBase::MPEG,
                    frames: 60,
                    frame_duration: 3000,
                    origin: 15_000,
                    position: ClipPosition::Append,
                },
                ClipDescription {
                    name: "outro".into(),
                    time_base: TimeBase::new(1, 30_000),
                    frames: 45,
                    frame_duration: 1000,
                    origin: 0,
                    position: ClipPosition::AtFrame(200),
                },
            ],
            start_frame: 0,
        }
    }

    /// Parse a project from RON
    pub fn from_ron_str(content: &str) -> Result<Self, ProjectError> {
        Ok(ron::from_str(content)?)
    }

    /// Load a project file
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Build the timeline described by this project
    pub fn build_timeline(&self) -> Result<Timeline, ProjectError> {
        let mut timeline = Timeline::from_settings(&self.settings)?;

        for desc in &self.clips {
            let clip = Box::new(MemoryClip::with_frames(
                desc.name.clone(),
                desc.time_base,
                desc.frames,
                desc.frame_duration,
            ));
            match desc.position {
                ClipPosition::Append => timeline.append_clip_with_origin(clip, desc.origin)?,
                ClipPosition::AtFrame(frame) => {
                    let start_pts = timeline.frame_index_to_pts(frame);
                    timeline.add_clip_with_origin(clip, start_pts, desc.origin)?
                }
                ClipPosition::AtPts(pts) => timeline.add_clip_with_origin(clip, pts, desc.origin)?,
            };
        }

        Ok(timeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_timeline_layout() {
        let timeline = ProjectDescription::demo().build_timeline().unwrap();
        let starts: Vec<i64> = timeline
            .placements()
            .map(|p| p.start_frame(timeline.frame_clock()))
            .collect();
        assert_eq!(starts, [0, 90, 200]);
        assert_eq!(timeline.duration_frames(), 245);
    }

    #[test]
    fn test_demo_reads_every_frame() {
        let mut timeline = ProjectDescription::demo().build_timeline().unwrap();
        timeline.seek(0).unwrap();
        let count = timeline.packets().filter(Result::is_ok).count();
        assert_eq!(count, 90 + 55 + 45);
        assert!(timeline.is_at_end());
    }

    #[test]
    fn test_serialization() {
        let project = ProjectDescription::demo();
        let ron_str =
            ron::ser::to_string_pretty(&project, ron::ser::PrettyConfig::default()).unwrap();
        let loaded = ProjectDescription::from_ron_str(&ron_str).unwrap();
        assert_eq!(loaded, project);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut project = ProjectDescription::demo();
        project.settings.frame_rate.num = 0;
        assert!(matches!(
            project.build_timeline(),
            Err(ProjectError::Timeline(TimelineError::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn test_invalid_clip_time_base_rejected() {
        let mut project = ProjectDescription::demo();
        project.clips[1].time_base = TimeBase::new(0, 90_000);
        assert!(matches!(
            project.build_timeline(),
            Err(ProjectError::Timeline(TimelineError::InvalidConfiguration(_)))
        ));
    }
}
