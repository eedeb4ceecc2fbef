// SPDX-License-Identifier: MIT OR Apache-2.0
//! Placements ordered by timeline start.

use crate::clip::ClipId;
use crate::placement::Placement;
use crate::time::FrameClock;
use indexmap::IndexMap;

/// Placements sorted by `timeline_start_pts`, ascending.
///
/// Equal start positions keep insertion order. Positions shift on every
/// insert and remove, so callers hold on to [`ClipId`]s and re-derive
/// positions when needed.
#[derive(Debug)]
pub struct ClipIndex {
    placements: IndexMap<ClipId, Placement>,
    /// Furthest end frame among the placements up to each position
    reach: Vec<i64>,
    clock: FrameClock,
}

impl ClipIndex {
    /// Create an empty index measuring frames with `clock`
    pub fn new(clock: FrameClock) -> Self {
        Self {
            placements: IndexMap::new(),
            reach: Vec::new(),
            clock,
        }
    }

    /// Number of placements
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether the index holds no placements
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Insert after every placement starting at or before it; returns the position
    pub fn insert(&mut self, placement: Placement) -> usize {
        let start = placement.timeline_start_pts();
        let position = self.partition_point(|p| p.timeline_start_pts() <= start);
        self.placements.shift_insert(position, placement.id(), placement);
        self.update_reach();
        position
    }

    /// Remove a placement, keeping the order of the rest
    pub fn remove(&mut self, id: ClipId) -> Option<Placement> {
        let removed = self.placements.shift_remove(&id);
        if removed.is_some() {
            self.update_reach();
        }
        removed
    }

    /// Remove every placement, in timeline order
    pub fn drain(&mut self) -> impl Iterator<Item = Placement> + '_ {
        self.reach.clear();
        self.placements.drain(..).map(|(_, placement)| placement)
    }

    /// Get a placement by ID
    pub fn get(&self, id: ClipId) -> Option<&Placement> {
        self.placements.get(&id)
    }

    /// Get a mutable placement by ID
    pub fn get_mut(&mut self, id: ClipId) -> Option<&mut Placement> {
        self.placements.get_mut(&id)
    }

    /// Get a placement by position
    pub fn get_index(&self, position: usize) -> Option<&Placement> {
        self.placements.get_index(position).map(|(_, p)| p)
    }

    /// Current position of a placement
    pub fn position_of(&self, id: ClipId) -> Option<usize> {
        self.placements.get_index_of(&id)
    }

    /// The placement following `id` in timeline order
    pub fn next_after(&self, id: ClipId) -> Option<&Placement> {
        let position = self.position_of(id)?;
        self.get_index(position + 1)
    }

    /// First placement
    pub fn first(&self) -> Option<&Placement> {
        self.placements.first().map(|(_, p)| p)
    }

    /// Last placement
    pub fn last(&self) -> Option<&Placement> {
        self.placements.last().map(|(_, p)| p)
    }

    /// All placements in timeline order
    pub fn iter(&self) -> impl Iterator<Item = &Placement> {
        self.placements.values()
    }

    /// Position of the placement covering `frame_index`.
    ///
    /// Binary-searches for the last placement starting at or before the
    /// frame. If that one ends before the frame, earlier placements are
    /// checked only while one of them reaches past the frame, so a frame in
    /// a gap costs a single search. The latest-starting placement covering
    /// the frame wins.
    pub fn find_containing(&self, frame_index: i64) -> Option<usize> {
        let clock = &self.clock;
        let upper = self.partition_point(|p| p.start_frame(clock) <= frame_index);
        for position in (0..upper).rev() {
            if self.reach.get(position).map_or(true, |&end| end <= frame_index) {
                return None;
            }
            if self
                .get_index(position)
                .is_some_and(|p| p.contains_frame(frame_index, clock))
            {
                return Some(position);
            }
        }
        None
    }

    /// Furthest end frame of any placement
    pub fn end_frame(&self) -> i64 {
        self.reach.last().copied().unwrap_or(0)
    }

    fn update_reach(&mut self) {
        let clock = self.clock;
        let mut furthest = i64::MIN;
        self.reach = self
            .placements
            .values()
            .map(|p| {
                furthest = furthest.max(p.end_frame(&clock));
                furthest
            })
            .collect();
    }

    /// First position for which `pred` is false, assuming `pred` holds for a prefix
    fn partition_point(&self, pred: impl Fn(&Placement) -> bool) -> usize {
        let (mut low, mut high) = (0, self.placements.len());
        while low < high {
            let mid = low + (high - low) / 2;
            match self.get_index(mid) {
                Some(placement) if pred(placement) => low = mid + 1,
                _ => high = mid,
            }
        }
        low
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

    fn placement(name: &str, frames: u32, start_frame: i64, clock: &FrameClock) -> Placement {
        let clip = MemoryClip::with_frames(name, clock.time_base(), frames, clock.frame_duration());
        Placement::new(Box::new(clip), clock.frame_index_to_pts(start_frame), 0)
    }

    fn names(index: &ClipIndex) -> Vec<String> {
        index.iter().map(|p| p.clip().name().to_string()).collect()
    }

    #[test]
    fn test_insert_keeps_ascending_order() {
        let clock = clock();
        let mut index = ClipIndex::new(clock);
        index.insert(placement("C", 5, 40, &clock));
        index.insert(placement("A", 5, 0, &clock));
        index.insert(placement("B", 5, 20, &clock));

        assert_eq!(names(&index), ["A", "B", "C"]);
        let starts: Vec<i64> = index.iter().map(Placement::timeline_start_pts).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_equal_keys_keep_insertion_order() {
        let clock = clock();
        let mut index = ClipIndex::new(clock);
        index.insert(placement("first", 5, 10, &clock));
        index.insert(placement("early", 5, 0, &clock));
        index.insert(placement("second", 5, 10, &clock));
        index.insert(placement("third", 5, 10, &clock));

        assert_eq!(names(&index), ["early", "first", "second", "third"]);
    }

    #[test]
    fn test_remove_and_positions() {
        let clock = clock();
        let mut index = ClipIndex::new(clock);
        let a = placement("A", 5, 0, &clock);
        let a_id = a.id();
        index.insert(a);
        let b = placement("B", 5, 5, &clock);
        let b_id = b.id();
        index.insert(b);

        assert_eq!(index.position_of(b_id), Some(1));
        assert_eq!(index.next_after(a_id).map(Placement::id), Some(b_id));
        assert!(index.next_after(b_id).is_none());

        let removed = index.remove(a_id).unwrap();
        assert_eq!(removed.clip().name(), "A");
        assert_eq!(index.position_of(b_id), Some(0));
        assert!(index.remove(a_id).is_none());
    }

    #[test]
    fn test_find_containing() {
        let clock = clock();
        let mut index = ClipIndex::new(clock);
        index.insert(placement("A", 10, 0, &clock));
        index.insert(placement("B", 15, 10, &clock));
        index.insert(placement("C", 5, 30, &clock));

        assert_eq!(index.find_containing(0), Some(0));
        assert_eq!(index.find_containing(9), Some(0));
        assert_eq!(index.find_containing(10), Some(1));
        assert_eq!(index.find_containing(24), Some(1));
        // gap between B and C
        assert_eq!(index.find_containing(25), None);
        assert_eq!(index.find_containing(29), None);
        assert_eq!(index.find_containing(34), Some(2));
        assert_eq!(index.find_containing(35), None);
        assert_eq!(index.find_containing(-1), None);
    }

    #[test]
    fn test_find_containing_empty() {
        let clock = clock();
        let index = ClipIndex::new(clock);
        assert_eq!(index.find_containing(0), None);
        assert!(index.first().is_none());
        assert!(index.last().is_none());
    }

    #[test]
    fn test_find_containing_overlap_prefers_later_start() {
        let clock = clock();
        let mut index = ClipIndex::new(clock);
        index.insert(placement("long", 100, 0, &clock));
        index.insert(placement("short", 10, 20, &clock));

        assert_eq!(index.find_containing(25), Some(1));
        assert_eq!(index.find_containing(50), Some(0));
    }

    #[test]
    fn test_reach_tracks_furthest_end() {
        let clock = clock();
        let mut index = ClipIndex::new(clock);
        assert_eq!(index.end_frame(), 0);

        let long = placement("long", 100, 0, &clock);
        let long_id = long.id();
        index.insert(long);
        index.insert(placement("short", 10, 20, &clock));
        index.insert(placement("late", 10, 200, &clock));

        assert_eq!(index.end_frame(), 210);
        assert_eq!(index.find_containing(99), Some(0));
        assert_eq!(index.find_containing(150), None);
        assert_eq!(index.find_containing(205), Some(2));

        index.remove(long_id);
        assert_eq!(index.find_containing(50), None);
        assert_eq!(index.find_containing(25), Some(0));
        assert_eq!(index.end_frame(), 210);
    }
}
