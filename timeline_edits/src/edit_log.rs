use std::{collections::HashMap, error::Error, fmt, marker::PhantomData};

use timeline_core::{Controller, InvalidatedFrames};
use timeline_data_path::GlobalDataPath;
use timeline_memory::GameMemory;
use timeline_types::Value;

use crate::range_edit::RangeEdits;

/// A single scheduled mutation: either an outright value assignment, or a masked bit flip
/// over an integer field (used for boolean flags packed into a larger word).
#[derive(Debug, Clone, PartialEq)]
pub enum EditValue {
    /// Assign the field this exact value.
    Value(Value),
    /// Set or clear the bits in `mask` of the field's raw integer, leaving the rest untouched.
    Flag { mask: u32, set: bool },
}

/// An error raised while editing the log, rather than while applying it to a slot.
#[derive(Debug, Clone)]
pub enum EditError {
    /// Adds context to an inner error.
    Context { context: String, error: Box<EditError> },
    /// A tentative drag was started while another was already in flight for the same column.
    Conflict,
}

impl EditError {
    /// Wrap this error with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        EditError::Context {
            context: context.into(),
            error: Box::new(self),
        }
    }
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::Context { context, error } => write!(f, "{}:\n  {}", context, error),
            EditError::Conflict => write!(f, "a tentative drag is already in progress"),
        }
    }
}

impl Error for EditError {}

#[derive(Debug)]
struct DragState {
    column: String,
    source_frame: u32,
    value: EditValue,
    target_frame: u32,
    snapshot: HashMap<u32, Option<EditValue>>,
}

/// A time-indexed mutation log. Implements [Controller] so it can be handed directly to a
/// [SlotManager](timeline_core::SlotManager) or [Timeline](timeline_core::Timeline); edits are
/// applied to the base slot's new frame every time it's advanced.
pub struct EditLog<M> {
    paths: HashMap<String, GlobalDataPath>,
    edits: RangeEdits<String, EditValue>,
    drag: Option<DragState>,
    listeners: Vec<Box<dyn FnMut(u32)>>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> EditLog<M> {
    /// An empty edit log.
    pub fn new() -> Self {
        Self {
            paths: HashMap::new(),
            edits: RangeEdits::new(),
            drag: None,
            listeners: Vec::new(),
            _marker: PhantomData,
        }
    }

    fn intern(&mut self, path: &GlobalDataPath) -> String {
        let key = path.source().to_string();
        self.paths.entry(key.clone()).or_insert_with(|| path.clone());
        key
    }

    fn notify(&mut self, frame: u32) {
        for listener in &mut self.listeners {
            listener(frame);
        }
    }

    /// Register a callback to be run whenever an edit invalidates frames at or after some
    /// point, given that frame.
    pub fn on_change(&mut self, callback: impl FnMut(u32) + 'static) {
        self.listeners.push(Box::new(callback));
    }

    /// Assign `path` the value `value` at `frame`, returning the first invalidated frame.
    pub fn write(&mut self, path: &GlobalDataPath, frame: u32, value: Value) -> u32 {
        let column = self.intern(path);
        self.edits.write(column, frame, EditValue::Value(value));
        self.notify(frame);
        frame
    }

    /// Set or clear `mask`'s bits of `path`'s raw integer at `frame`.
    pub fn write_flag(&mut self, path: &GlobalDataPath, frame: u32, mask: u32, set: bool) -> u32 {
        let column = self.intern(path);
        self.edits.write(column, frame, EditValue::Flag { mask, set });
        self.notify(frame);
        frame
    }

    /// Remove any edit on `path` at `frame`, returning the first invalidated frame.
    pub fn reset(&mut self, path: &GlobalDataPath, frame: u32) -> u32 {
        let column = path.source().to_string();
        self.edits.reset(&column, frame);
        self.notify(frame);
        frame
    }

    /// Shift every edit to account for a frame inserted at `frame`.
    pub fn insert_frame(&mut self, frame: u32) {
        self.edits.insert_frame(frame);
        self.notify(frame);
    }

    /// Shift every edit to account for a frame deleted at `frame`.
    pub fn delete_frame(&mut self, frame: u32) {
        self.edits.delete_frame(frame);
        self.notify(frame);
    }

    /// Begin a tentative drag starting from `path`'s existing edit at `source_frame`.
    ///
    /// Fails with [EditError::Conflict] if a drag is already in progress; the prior tentative
    /// state, if any, is left untouched.
    pub fn begin_drag(&mut self, path: &GlobalDataPath, source_frame: u32) -> Result<(), EditError> {
        if self.drag.is_some() {
            return Err(EditError::Conflict);
        }
        let column = self.intern(path);
        let value = self
            .edits
            .value(&column, source_frame)
            .cloned()
            .unwrap_or(EditValue::Value(Value::None));
        self.drag = Some(DragState {
            column,
            source_frame,
            value,
            target_frame: source_frame,
            snapshot: HashMap::new(),
        });
        Ok(())
    }

    fn touch(&mut self, frame: u32) {
        let drag = self.drag.as_mut().expect("drag in progress");
        if !drag.snapshot.contains_key(&frame) {
            let prior = self.edits.value(&drag.column, frame).cloned();
            self.drag.as_mut().unwrap().snapshot.insert(frame, prior);
        }
    }

    /// Extend (or shrink) the in-progress drag to cover `[source_frame, target_frame]`.
    pub fn update_drag(&mut self, target_frame: u32) -> InvalidatedFrames {
        let drag = match &self.drag {
            Some(drag) => drag,
            None => return InvalidatedFrames::None,
        };
        let (old_lo, old_hi) = (
            drag.source_frame.min(drag.target_frame),
            drag.source_frame.max(drag.target_frame),
        );
        let (new_lo, new_hi) = (
            drag.source_frame.min(target_frame),
            drag.source_frame.max(target_frame),
        );
        let column = drag.column.clone();
        let value = drag.value.clone();

        let mut invalidated = InvalidatedFrames::None;

        for frame in new_lo..=new_hi {
            self.touch(frame);
            self.edits.write(column.clone(), frame, value.clone());
            invalidated.include(frame);
        }
        for frame in old_lo..=old_hi {
            if !(new_lo..=new_hi).contains(&frame) {
                self.restore_snapshot(frame);
                invalidated.include(frame);
            }
        }

        if let Some(drag) = &mut self.drag {
            drag.target_frame = target_frame;
        }
        if let InvalidatedFrames::StartingAt(frame) = invalidated {
            self.notify(frame);
        }
        invalidated
    }

    fn restore_snapshot(&mut self, frame: u32) {
        let column = match &self.drag {
            Some(drag) => drag.column.clone(),
            None => return,
        };
        let prior = self
            .drag
            .as_ref()
            .and_then(|drag| drag.snapshot.get(&frame).cloned())
            .flatten();
        match prior {
            Some(value) => self.edits.write(column, frame, value),
            None => self.edits.reset(&column, frame),
        }
    }

    /// Commit the in-progress drag, keeping its current extent.
    pub fn release_drag(&mut self) {
        self.drag = None;
    }

    /// Revert the in-progress drag, restoring every touched frame to its pre-drag value.
    pub fn rollback_drag(&mut self) -> InvalidatedFrames {
        let frames: Vec<u32> = match &self.drag {
            Some(drag) => drag.snapshot.keys().copied().collect(),
            None => return InvalidatedFrames::None,
        };
        let mut invalidated = InvalidatedFrames::None;
        for frame in frames {
            self.restore_snapshot(frame);
            invalidated.include(frame);
        }
        self.drag = None;
        invalidated
    }
}

impl<M> Default for EditLog<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for EditLog<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditLog")
            .field("paths", &self.paths.keys().collect::<Vec<_>>())
            .field("drag", &self.drag)
            .finish()
    }
}

fn apply_flag(current: &Value, mask: u32, set: bool) -> Value {
    let n = current.try_as_int().unwrap_or(0);
    let mask = mask as timeline_types::IntValue;
    let n = if set { n | mask } else { n & !mask };
    Value::Int(n)
}

impl<M: GameMemory> Controller<M> for EditLog<M> {
    type Error = timeline_data_path::DataError;

    fn apply(&self, memory: &M, slot: &mut M::Slot, frame: u32) -> Result<(), Self::Error> {
        let mut view = memory.with_slot_mut(slot);
        for (column, path) in &self.paths {
            let edit = match self.edits.value(column, frame) {
                Some(edit) => edit,
                None => continue,
            };
            match edit {
                EditValue::Value(value) => {
                    path.write(&mut view, value.clone())?;
                }
                EditValue::Flag { mask, set } => {
                    let current = path.read(&view)?;
                    let updated = apply_flag(&current, *mask, *set);
                    path.write(&mut view, updated)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    #[test]
    fn drag_rollback_restores_the_pre_drag_state() {
        let mut log: EditLog<Dummy> = EditLog::new();
        // Synthesize a path-free column write directly through the range-edit substrate to
        // avoid needing a real compiled path for this unit test.
        log.edits.write("col".to_string(), 10, EditValue::Value(Value::Int(1)));

        log.drag = Some(DragState {
            column: "col".to_string(),
            source_frame: 10,
            value: EditValue::Value(Value::Int(2)),
            target_frame: 10,
            snapshot: HashMap::new(),
        });
        log.update_drag(13);
        assert_eq!(log.edits.value(&"col".to_string(), 12), Some(&EditValue::Value(Value::Int(2))));

        log.rollback_drag();
        assert_eq!(log.edits.value(&"col".to_string(), 10), Some(&EditValue::Value(Value::Int(1))));
        assert_eq!(log.edits.value(&"col".to_string(), 12), None);
    }
}
