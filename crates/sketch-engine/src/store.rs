//! The Stroke Store: ordered strokes, a redo buffer, and the live transform map.
//!
//! Strokes are append-only. Undo pops the newest stroke into the redo
//! buffer, redo pushes it back, and appending anything new discards the
//! redo buffer. Visibility changes only ever touch `active`.

use std::collections::BTreeSet;

use chronosketch_common::error::{SketchError, SketchResult};
use chronosketch_layout::Selection;
use chronosketch_model::{Record, Stroke, StrokeId, Transform, TransformMap};

/// Owner of the stroke list, redo stack, and transform map.
#[derive(Debug, Clone, Default)]
pub struct StrokeStore {
    strokes: Vec<Stroke>,
    redo: Vec<Stroke>,
    transforms: TransformMap,
}

impl StrokeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding already-migrated strokes, with empty history.
    pub fn from_strokes(strokes: Vec<Stroke>) -> Self {
        Self {
            strokes,
            ..Self::default()
        }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Stroke> {
        self.strokes.get(index)
    }

    pub fn index_of(&self, id: &StrokeId) -> Option<usize> {
        self.strokes.iter().position(|s| &s.id == id)
    }

    /// Strokes waiting in the redo buffer, oldest undo last.
    pub fn redo_stack(&self) -> &[Stroke] {
        &self.redo
    }

    pub fn can_undo(&self) -> bool {
        !self.strokes.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn transforms(&self) -> &TransformMap {
        &self.transforms
    }

    /// Transform for one stroke; identity when none is recorded.
    pub fn transform_of(&self, id: &StrokeId) -> Transform {
        self.transforms.get(id).copied().unwrap_or_default()
    }

    /// Append a stroke and discard the redo buffer.
    pub fn append(&mut self, stroke: Stroke) -> SketchResult<usize> {
        validate(&stroke)?;
        self.strokes.push(stroke);
        self.redo.clear();
        Ok(self.strokes.len() - 1)
    }

    /// Pop the newest stroke into the redo buffer. `None` when empty.
    ///
    /// The stroke's transform entry goes with it, so the live transform map
    /// never names a stroke that is not in the list.
    pub fn undo(&mut self) -> Option<StrokeId> {
        let stroke = self.strokes.pop()?;
        self.transforms.remove(&stroke.id);
        let id = stroke.id.clone();
        self.redo.push(stroke);
        tracing::debug!(
            stroke = %id,
            len = self.strokes.len(),
            redo_depth = self.redo.len(),
            "Undo"
        );
        Some(id)
    }

    /// Push the most recently undone stroke back. `None` when empty.
    pub fn redo(&mut self) -> Option<StrokeId> {
        let stroke = self.redo.pop()?;
        let id = stroke.id.clone();
        self.strokes.push(stroke);
        tracing::debug!(
            stroke = %id,
            len = self.strokes.len(),
            redo_depth = self.redo.len(),
            "Redo"
        );
        Some(id)
    }

    /// Set one stroke's visibility. Returns false when `index` is out of range.
    pub fn set_active(&mut self, index: usize, active: bool) -> bool {
        match self.strokes.get_mut(index) {
            Some(stroke) => {
                stroke.active = active;
                true
            }
            None => false,
        }
    }

    pub fn set_active_by_id(&mut self, id: &StrokeId, active: bool) -> bool {
        match self.index_of(id) {
            Some(index) => self.set_active(index, active),
            None => false,
        }
    }

    /// Flip one stroke's visibility, returning the new state.
    pub fn toggle_active(&mut self, index: usize) -> Option<bool> {
        let stroke = self.strokes.get_mut(index)?;
        stroke.active = !stroke.active;
        Some(stroke.active)
    }

    /// Flip visibility of every selected stroke. Returns how many flipped.
    pub fn toggle_selected(&mut self, selection: &Selection) -> usize {
        selection
            .iter()
            .filter(|&i| self.toggle_active(i).is_some())
            .count()
    }

    /// Make exactly the selected strokes active. False on an empty selection.
    pub fn isolate(&mut self, selection: &Selection) -> bool {
        if selection.is_empty() {
            return false;
        }
        for (i, stroke) in self.strokes.iter_mut().enumerate() {
            stroke.active = selection.contains(i);
        }
        true
    }

    pub fn deactivate_all(&mut self) {
        for stroke in &mut self.strokes {
            stroke.active = false;
        }
    }

    pub fn discard_redo(&mut self) {
        self.redo.clear();
    }

    pub fn active_ids(&self) -> BTreeSet<StrokeId> {
        self.strokes
            .iter()
            .filter(|s| s.active)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Activate exactly the strokes named in `ids`. Unknown ids are ignored.
    /// Returns how many ids matched a stroke.
    pub fn apply_active_set(&mut self, ids: &BTreeSet<StrokeId>) -> usize {
        let mut matched = 0;
        for stroke in &mut self.strokes {
            stroke.active = ids.contains(&stroke.id);
            if stroke.active {
                matched += 1;
            }
        }
        matched
    }

    /// Replace the live transform map wholesale.
    pub fn replace_transforms(&mut self, transforms: TransformMap) {
        self.transforms = transforms;
    }

    /// Set each id's transform to its `base` entry plus `delta`.
    ///
    /// `base` is the map captured when the drag started, so repeated calls
    /// during one drag do not accumulate.
    pub fn commit_transform<'a, I>(&mut self, ids: I, base: &TransformMap, delta: Transform)
    where
        I: IntoIterator<Item = &'a StrokeId>,
    {
        for id in ids {
            let start = base.get(id).copied().unwrap_or_default();
            self.transforms.insert(id.clone(), start.plus(delta));
        }
    }

    /// Turn the selected strokes' transforms into new strokes.
    ///
    /// Each selected stroke gets a displaced copy with a fresh id and
    /// `parentId` set to the source; the source is deactivated and loses its
    /// transform entry. Returns the indices of the new strokes.
    pub fn materialize_move(&mut self, selection: &Selection, now_wall: i64, now_abs: f64) -> Vec<usize> {
        let mut created = Vec::new();
        for index in selection.iter() {
            let Some(source) = self.strokes.get(index) else {
                continue;
            };
            let offset = self.transform_of(&source.id);
            let moved = match Stroke::moved_from(source, StrokeId::generate(now_wall), offset, now_wall, now_abs) {
                Ok(moved) => moved,
                Err(e) => {
                    tracing::warn!(stroke = %source.id, error = %e, "Cannot move stroke");
                    continue;
                }
            };
            let source_id = source.id.clone();
            self.strokes[index].active = false;
            self.transforms.remove(&source_id);
            self.strokes.push(moved);
            created.push(self.strokes.len() - 1);
        }
        if !created.is_empty() {
            self.redo.clear();
            tracing::debug!(moved = created.len(), "Materialized move");
        }
        created
    }

    /// Append foreign-origin strokes. Returns the index of the first one.
    pub fn extend_imported(&mut self, strokes: Vec<Stroke>) -> usize {
        let first = self.strokes.len();
        self.strokes.extend(strokes);
        self.redo.clear();
        first
    }

    /// Replace everything with a freshly loaded stroke list.
    pub fn replace_all(&mut self, strokes: Vec<Stroke>) {
        self.strokes = strokes;
        self.redo.clear();
        self.transforms.clear();
    }

    /// The `paths` record for the current stroke list.
    pub fn to_record(&self) -> Record {
        Record::Paths(self.strokes.clone())
    }
}

fn validate(stroke: &Stroke) -> SketchResult<()> {
    if stroke.points.len() < 2 {
        return Err(SketchError::invalid_stroke(format!(
            "{} has {} point(s), need at least 2",
            stroke.id,
            stroke.points.len()
        )));
    }
    if stroke.points.windows(2).any(|w| w[1].t_abs < w[0].t_abs) {
        return Err(SketchError::invalid_stroke(format!(
            "{} goes back in time",
            stroke.id
        )));
    }
    Ok(())
}
