use std::{collections::HashMap, hash::Hash, ops::Range};

/// Identifies a single [EditRange] for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditRangeId(usize);

/// A single contiguous run of frames assigned the same value.
#[derive(Debug, Clone)]
pub struct EditRange<V> {
    id: EditRangeId,
    frames: Range<u32>,
    value: V,
}

impl<V> EditRange<V> {
    /// The id of this range.
    pub fn id(&self) -> EditRangeId {
        self.id
    }

    /// The frames this range covers.
    pub fn frames(&self) -> Range<u32> {
        self.frames.clone()
    }

    /// The value assigned across this range.
    pub fn value(&self) -> &V {
        &self.value
    }
}

/// A single column's set of disjoint ranges.
#[derive(Debug)]
struct Ranges<V> {
    ranges: HashMap<EditRangeId, EditRange<V>>,
    ranges_by_frame: HashMap<u32, EditRangeId>,
}

impl<V: Clone + PartialEq> Ranges<V> {
    fn new() -> Self {
        Self {
            ranges: HashMap::new(),
            ranges_by_frame: HashMap::new(),
        }
    }

    fn find_range_id(&self, frame: u32) -> Option<EditRangeId> {
        self.ranges_by_frame.get(&frame).copied()
    }

    fn range(&self, frame: u32) -> Option<&EditRange<V>> {
        self.find_range_id(frame).map(|id| &self.ranges[&id])
    }

    fn remove_range(&mut self, id: EditRangeId) -> EditRange<V> {
        let range = self.ranges.remove(&id).expect("range exists");
        for frame in range.frames.clone() {
            self.ranges_by_frame.remove(&frame);
        }
        range
    }

    fn insert_range(&mut self, id: EditRangeId, frames: Range<u32>, value: V) {
        for frame in frames.clone() {
            self.ranges_by_frame.insert(frame, id);
        }
        self.ranges.insert(
            id,
            EditRange {
                id,
                frames,
                value,
            },
        );
    }

    /// Assign `value` to `frame`, splitting or shrinking any overlapping range so that ranges
    /// over this column remain disjoint, then merging with an adjacent range holding the same
    /// value where possible.
    fn write(&mut self, frame: u32, value: V, next_id: &mut usize) {
        if let Some(existing) = self.range(frame) {
            if *existing.value() == value {
                return;
            }
            let id = existing.id();
            let frames = existing.frames();
            let old_value = self.remove_range(id).value;

            if frames.start < frame {
                let left_id = EditRangeId(*next_id);
                *next_id += 1;
                self.insert_range(left_id, frames.start..frame, old_value.clone());
            }
            if frame + 1 < frames.end {
                let right_id = EditRangeId(*next_id);
                *next_id += 1;
                self.insert_range(right_id, (frame + 1)..frames.end, old_value);
            }
        }

        let left = frame
            .checked_sub(1)
            .and_then(|f| self.range(f))
            .filter(|r| *r.value() == value)
            .map(|r| (r.id(), r.frames()));
        let right = self
            .range(frame + 1)
            .filter(|r| *r.value() == value)
            .map(|r| (r.id(), r.frames()));

        match (left, right) {
            (Some((left_id, left_frames)), Some((right_id, right_frames))) => {
                self.remove_range(left_id);
                self.remove_range(right_id);
                self.insert_range(left_id, left_frames.start..right_frames.end, value);
            }
            (Some((left_id, left_frames)), None) => {
                self.remove_range(left_id);
                self.insert_range(left_id, left_frames.start..(frame + 1), value);
            }
            (None, Some((right_id, right_frames))) => {
                self.remove_range(right_id);
                self.insert_range(right_id, frame..right_frames.end, value);
            }
            (None, None) => {
                let id = EditRangeId(*next_id);
                *next_id += 1;
                self.insert_range(id, frame..(frame + 1), value);
            }
        }
    }

    /// Remove any edit at `frame`, shrinking or splitting its range as needed.
    fn reset(&mut self, frame: u32, next_id: &mut usize) {
        if let Some(existing) = self.range(frame) {
            let id = existing.id();
            let frames = existing.frames();
            let value = self.remove_range(id).value;

            if frames.start < frame {
                let left_id = EditRangeId(*next_id);
                *next_id += 1;
                self.insert_range(left_id, frames.start..frame, value.clone());
            }
            if frame + 1 < frames.end {
                let right_id = EditRangeId(*next_id);
                *next_id += 1;
                self.insert_range(right_id, (frame + 1)..frames.end, value);
            }
        }
    }

    /// Shift ranges to account for a frame inserted at `frame`.
    fn insert_frame(&mut self, frame: u32) {
        let ranges: Vec<EditRange<V>> = self.ranges.drain().map(|(_, r)| r).collect();
        self.ranges_by_frame.clear();
        for range in ranges {
            let frames = if range.frames.start >= frame {
                (range.frames.start + 1)..(range.frames.end + 1)
            } else if range.frames.start < frame && frame <= range.frames.end {
                range.frames.start..(range.frames.end + 1)
            } else {
                range.frames.clone()
            };
            for f in frames.clone() {
                self.ranges_by_frame.insert(f, range.id);
            }
            self.ranges.insert(
                range.id,
                EditRange {
                    id: range.id,
                    frames,
                    value: range.value,
                },
            );
        }
    }

    /// Shift ranges to account for a frame deleted at `frame`.
    fn delete_frame(&mut self, frame: u32) {
        let ranges: Vec<EditRange<V>> = self.ranges.drain().map(|(_, r)| r).collect();
        self.ranges_by_frame.clear();
        for range in ranges {
            if range.frames.start >= frame + 1 {
                let frames = (range.frames.start - 1)..(range.frames.end - 1);
                if !frames.is_empty() {
                    for f in frames.clone() {
                        self.ranges_by_frame.insert(f, range.id);
                    }
                    self.ranges.insert(
                        range.id,
                        EditRange {
                            id: range.id,
                            frames,
                            value: range.value,
                        },
                    );
                }
            } else if range.frames.contains(&frame) {
                let new_end = range.frames.end.saturating_sub(1).max(range.frames.start);
                let frames = range.frames.start..new_end;
                if !frames.is_empty() {
                    for f in frames.clone() {
                        self.ranges_by_frame.insert(f, range.id);
                    }
                    self.ranges.insert(
                        range.id,
                        EditRange {
                            id: range.id,
                            frames,
                            value: range.value,
                        },
                    );
                }
            } else {
                for f in range.frames.clone() {
                    self.ranges_by_frame.insert(f, range.id);
                }
                self.ranges.insert(range.id, range);
            }
        }
    }
}

/// A set of disjoint ranges per column, supporting the insert/shrink/split set algebra and
/// frame insertion/deletion shifting described for the edit controller's range edits.
#[derive(Debug)]
pub struct RangeEdits<C, V> {
    ranges: HashMap<C, Ranges<V>>,
    next_range_id: usize,
}

impl<C: Eq + Hash + Clone, V: Clone + PartialEq> RangeEdits<C, V> {
    /// An empty set of range edits.
    pub fn new() -> Self {
        Self {
            ranges: HashMap::new(),
            next_range_id: 0,
        }
    }

    /// The range covering `frame` for `column`, if any.
    pub fn find_range(&self, column: &C, frame: u32) -> Option<&EditRange<V>> {
        self.ranges.get(column).and_then(|ranges| ranges.range(frame))
    }

    /// The value assigned to `column` at `frame`, if any.
    pub fn value(&self, column: &C, frame: u32) -> Option<&V> {
        self.find_range(column, frame).map(|r| r.value())
    }

    /// Assign `value` to `column` at `frame`.
    pub fn write(&mut self, column: C, frame: u32, value: V) {
        let next_range_id = &mut self.next_range_id;
        self.ranges
            .entry(column)
            .or_insert_with(Ranges::new)
            .write(frame, value, next_range_id);
    }

    /// Remove any edit on `column` at `frame`.
    pub fn reset(&mut self, column: &C, frame: u32) {
        let next_range_id = &mut self.next_range_id;
        if let Some(ranges) = self.ranges.get_mut(column) {
            ranges.reset(frame, next_range_id);
        }
    }

    /// Shift every column's ranges to account for a frame inserted at `frame`.
    pub fn insert_frame(&mut self, frame: u32) {
        for ranges in self.ranges.values_mut() {
            ranges.insert_frame(frame);
        }
    }

    /// Shift every column's ranges to account for a frame deleted at `frame`.
    pub fn delete_frame(&mut self, frame: u32) {
        for ranges in self.ranges.values_mut() {
            ranges.delete_frame(frame);
        }
    }
}

impl<C: Eq + Hash + Clone, V: Clone + PartialEq> Default for RangeEdits<C, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserting_an_overlapping_range_shrinks_the_original() {
        let mut edits: RangeEdits<&str, char> = RangeEdits::new();
        for frame in 10..20 {
            edits.write("x", frame, 'A');
        }
        for frame in 15..25 {
            edits.write("x", frame, 'B');
        }

        for frame in 10..15 {
            assert_eq!(edits.value(&"x", frame), Some(&'A'));
        }
        for frame in 15..25 {
            assert_eq!(edits.value(&"x", frame), Some(&'B'));
        }
    }

    #[test]
    fn insert_frame_shifts_ranges_starting_at_or_after_the_insertion_point() {
        let mut edits: RangeEdits<&str, char> = RangeEdits::new();
        for frame in 10..20 {
            edits.write("x", frame, 'A');
        }

        edits.insert_frame(5);
        let range = edits.find_range(&"x", 11).unwrap();
        assert_eq!(range.frames(), 11..21);

        edits.insert_frame(15);
        let range = edits.find_range(&"x", 11).unwrap();
        assert_eq!(range.frames(), 11..22);
    }

    #[test]
    fn reset_removes_a_single_frame_from_a_range() {
        let mut edits: RangeEdits<&str, char> = RangeEdits::new();
        for frame in 10..20 {
            edits.write("x", frame, 'A');
        }
        edits.reset(&"x", 15);

        assert_eq!(edits.value(&"x", 14), Some(&'A'));
        assert_eq!(edits.value(&"x", 15), None);
        assert_eq!(edits.value(&"x", 16), Some(&'A'));
    }
}
