use tracing::debug;

use crate::core::{
    error::Result,
    id::{ContainerId, FocusToken, ItemId, SelectionVersion},
    model::{ItemKind, Model},
};

/// State of an extend chord: consecutive moves with the range modifier held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    /// First item selected in the chord.
    pub anchor: ItemId,
    /// Most recently reached item.
    pub cursor: ItemId,
    /// Container the range lives in.
    pub container: ContainerId,
    /// Selection version observed after the chord's last update.
    pub version: Option<SelectionVersion>,
}

/// Selection change produced by one move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeUpdate {
    /// The new selection, focus target first.
    pub tokens: Vec<FocusToken>,
    /// True if the move extended a range.
    pub extended: bool,
}

impl RangeUpdate {
    /// A single-target replacement.
    fn single(token: FocusToken) -> Self {
        Self {
            tokens: vec![token],
            extended: false,
        }
    }

    /// Return the focus target of the update.
    pub fn target(&self) -> FocusToken {
        self.tokens.first().copied().unwrap_or_default()
    }
}

/// Turns resolved moves into replace-or-extend selection changes.
#[derive(Debug, Clone, Default)]
pub struct RangeAccumulator {
    /// Active chord, if any.
    chord: Option<Chord>,
}

impl RangeAccumulator {
    /// Create an accumulator with no active chord.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the active chord.
    pub fn chord(&self) -> Option<&Chord> {
        self.chord.as_ref()
    }

    /// Return the chord's cursor if a chord is active and still current at
    /// `version`.
    pub fn cursor(&self, version: SelectionVersion) -> Option<ItemId> {
        self.chord
            .filter(|c| c.version.is_none_or(|v| v == version))
            .map(|c| c.cursor)
    }

    /// End the active chord.
    pub fn clear(&mut self) {
        if self.chord.take().is_some() {
            debug!("extend chord ended");
        }
    }

    /// Record the selection version produced by applying the last update, so
    /// a later external selection change can be detected.
    pub fn stamp(&mut self, version: SelectionVersion) {
        if let Some(chord) = &mut self.chord {
            chord.version = Some(version);
        }
    }

    /// Drop the chord if it references a removed item.
    pub fn forget_item(&mut self, id: ItemId) {
        if self
            .chord
            .is_some_and(|c| c.anchor == id || c.cursor == id)
        {
            self.clear();
        }
    }

    /// Drop the chord if its container was removed.
    pub fn forget_container(&mut self, id: ContainerId) {
        if self.chord.is_some_and(|c| c.container == id) {
            self.clear();
        }
    }

    /// Drop the chord if any node it references has left `model`.
    pub fn retain_live(&mut self, model: &Model) {
        if self.chord.is_some_and(|c| {
            !model.contains_item(c.anchor)
                || !model.contains_item(c.cursor)
                || !model.contains_container(c.container)
        }) {
            self.clear();
        }
    }

    /// Compute the selection change for a move from `start` to `resolved`.
    ///
    /// Returns `None` when the move must not touch the selection: extending
    /// onto a template node or an overflow button.
    pub fn accumulate(
        &mut self,
        model: &Model,
        start: FocusToken,
        resolved: FocusToken,
        extend: bool,
        version: SelectionVersion,
    ) -> Result<Option<RangeUpdate>> {
        let (Some(start_item), Some(target), true) = (start.item(), resolved.item(), extend)
        else {
            self.clear();
            return Ok(Some(RangeUpdate::single(resolved)));
        };
        if model.item(target)?.kind() != ItemKind::Item {
            return Ok(None);
        }

        if self
            .chord
            .is_some_and(|c| c.version.is_some_and(|v| v != version))
        {
            debug!(%version, "selection changed outside the chord");
            self.clear();
        }

        let anchor = match self.chord {
            Some(chord) => chord.anchor,
            None => start_item,
        };
        let container = model.owner(anchor)?;
        if model.owner(target)? != container {
            debug!(?anchor, ?target, "range crossed a container boundary");
            self.clear();
            return Ok(Some(RangeUpdate::single(resolved)));
        }

        let a = model.index_of(anchor)?;
        let t = model.index_of(target)?;
        let (lo, hi) = if a <= t { (a, t) } else { (t, a) };
        let mut tokens = vec![resolved];
        for id in &model.items(container)?[lo..=hi] {
            let item = model.item(*id)?;
            if *id != target && item.kind() == ItemKind::Item && !item.hidden() {
                tokens.push(FocusToken::Item(*id));
            }
        }

        self.chord = Some(Chord {
            anchor,
            cursor: target,
            container,
            version: None,
        });
        Ok(Some(RangeUpdate {
            tokens,
            extended: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(names: &[&str]) -> (Model, Vec<ItemId>) {
        let mut model = Model::new();
        let root = model.add_root("form").unwrap();
        let (_, strip) = model.add_strip(root, "strip", 0).unwrap();
        let items = names
            .iter()
            .map(|n| model.add_item(strip, *n).unwrap())
            .collect();
        (model, items)
    }

    fn set(update: &RangeUpdate) -> Vec<FocusToken> {
        let mut v = update.tokens.clone();
        v.sort_by_key(|t| format!("{t:?}"));
        v
    }

    fn tokens(ids: &[ItemId]) -> Vec<FocusToken> {
        let mut v: Vec<FocusToken> = ids.iter().map(|i| FocusToken::Item(*i)).collect();
        v.sort_by_key(|t| format!("{t:?}"));
        v
    }

    #[test]
    fn extend_grows_then_shrinks() {
        let (model, i) = strip(&["a", "b", "c", "d"]);
        let v = SelectionVersion::INITIAL;
        let mut acc = RangeAccumulator::new();
        let item = FocusToken::Item;

        let u = acc.accumulate(&model, item(i[1]), item(i[2]), true, v).unwrap().unwrap();
        assert_eq!(set(&u), tokens(&[i[1], i[2]]));
        let u = acc.accumulate(&model, item(i[2]), item(i[3]), true, v).unwrap().unwrap();
        assert_eq!(set(&u), tokens(&[i[1], i[2], i[3]]));
        assert_eq!(u.target(), item(i[3]));
        let u = acc.accumulate(&model, item(i[3]), item(i[2]), true, v).unwrap().unwrap();
        assert_eq!(set(&u), tokens(&[i[1], i[2]]));
        assert_eq!(acc.chord().unwrap().anchor, i[1]);
    }

    #[test]
    fn plain_move_ends_chord() {
        let (model, i) = strip(&["a", "b", "c"]);
        let v = SelectionVersion::INITIAL;
        let mut acc = RangeAccumulator::new();
        acc.accumulate(&model, i[0].into(), i[1].into(), true, v).unwrap();
        let u = acc.accumulate(&model, i[1].into(), i[2].into(), false, v).unwrap().unwrap();
        assert_eq!(u.tokens, vec![FocusToken::Item(i[2])]);
        assert!(!u.extended);
        assert!(acc.chord().is_none());
    }

    #[test]
    fn external_selection_change_restarts_chord() {
        let (model, i) = strip(&["a", "b", "c", "d"]);
        let mut acc = RangeAccumulator::new();
        acc.accumulate(&model, i[0].into(), i[1].into(), true, SelectionVersion(1))
            .unwrap();
        acc.stamp(SelectionVersion(2));
        assert_eq!(acc.cursor(SelectionVersion(2)), Some(i[1]));
        assert_eq!(acc.cursor(SelectionVersion(3)), None);

        let u = acc
            .accumulate(&model, i[2].into(), i[3].into(), true, SelectionVersion(3))
            .unwrap()
            .unwrap();
        assert_eq!(acc.chord().unwrap().anchor, i[2]);
        assert_eq!(u.tokens.len(), 2);
    }

    #[test]
    fn removal_drops_chord() {
        let (model, i) = strip(&["a", "b"]);
        let mut acc = RangeAccumulator::new();
        acc.accumulate(&model, i[0].into(), i[1].into(), true, SelectionVersion(1))
            .unwrap();
        acc.forget_item(i[0]);
        assert!(acc.chord().is_none());
    }
}
