// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip timeline for `OrdoPlay` Editor.
//!
//! This crate orders media clips along a single presentation axis and
//! streams their packets across clip boundaries:
//! - Exact tick/frame conversion with rational time bases
//! - Clip placements sorted by timeline start
//! - Seeking to any frame, resolved to a clip-local position
//! - Continuous packet reading that moves from clip to clip
//!
//! ## Architecture
//!
//! The timeline is built on:
//! - [`FrameClock`] for tick arithmetic
//! - [`ClipIndex`] holding [`Placement`]s in start order
//! - The [`Clip`] trait for demuxed media sources
//! - [`Timeline`], which owns the clips and the read state

pub mod time;
pub mod clip;
pub mod placement;
pub mod index;
pub mod timeline;
pub mod settings;

pub use time::{Rational, TimeBase, FrameClock, TimeError};
pub use clip::{Clip, ClipId, ClipError, MemoryClip, MediaKind, Packet};
pub use placement::Placement;
pub use index::ClipIndex;
pub use timeline::{Timeline, TimelineError, TimelinePacket, SeekState, Packets};
pub use settings::{TimelineSettings, SettingsError, SETTINGS_FILE_NAME};
