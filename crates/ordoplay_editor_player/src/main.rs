// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` timeline player - headless packet dump
//!
//! Builds a timeline from a project file (or a built-in demo), seeks to the
//! project's start frame and reads every packet to the end of the sequence,
//! logging each one.
//!
//! ```text
//! timeline_player [project.ron]
//! ```
//!
//! Log verbosity follows `RUST_LOG`.

mod project;

use project::{ProjectDescription, ProjectError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("ordoplay_editor_player=info,ordoplay_editor_timeline=info")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(std::env::args_os().nth(1).map(PathBuf::from)) {
        Ok(count) => {
            tracing::info!("Read {} packets", count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Playback failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(path: Option<PathBuf>) -> Result<usize, ProjectError> {
    let project = match path {
        Some(path) => {
            tracing::info!("Loading project {:?}", path);
            ProjectDescription::load(&path)?
        }
        None => {
            tracing::info!(
                "No project given, using the demo (pass a {} file to override)",
                project::PROJECT_FILE_NAME
            );
            ProjectDescription::demo()
        }
    };

    let mut timeline = project.build_timeline()?;
    tracing::info!(
        "Timeline: {} clips, {} frames at {} fps",
        timeline.clip_count(),
        timeline.duration_frames(),
        timeline.frame_rate()
    );

    timeline.seek(project.start_frame)?;

    let mut count = 0;
    let mut current = None;
    for packet in timeline.packets() {
        let packet = packet?;
        if current != Some(packet.clip) {
            current = Some(packet.clip);
            tracing::info!("Entering clip {} at frame {}", packet.clip, packet.frame_index);
        }
        tracing::info!(
            "frame {:>6}  pts {:>10}  dts {:>10}  duration {:>6}  {} bytes",
            packet.frame_index,
            packet.packet.pts,
            packet.packet.dts,
            packet.packet.duration,
            packet.packet.data.len()
        );
        count += 1;
    }

    let released = timeline.teardown();
    tracing::debug!("Released {} clips", released);
    Ok(count)
}
