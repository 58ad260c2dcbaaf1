use std::fmt;

use tracing::trace;

use crate::core::id::{FocusToken, SelectionVersion};

/// How `set_selected` combines the given tokens with the current set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    /// The tokens become the whole selection. The first becomes primary.
    Replace,
    /// The tokens join the selection. The last one added becomes primary.
    Add,
    /// The tokens leave the selection.
    Remove,
}

/// Callback run after every selection change with the new version.
pub type SelectionCallback = Box<dyn FnMut(SelectionVersion)>;

/// The authority owning the persisted selection and its version counter.
pub trait SelectionAuthority {
    /// Return the version currently in effect.
    fn current_version(&self) -> SelectionVersion;

    /// Return the primary selected token, or `NoSelection`.
    fn primary(&self) -> FocusToken;

    /// Return the selected tokens, primary first.
    fn selected_set(&self) -> Vec<FocusToken>;

    /// Is this token part of the selection?
    fn is_selected(&self, token: FocusToken) -> bool {
        self.selected_set().contains(&token)
    }

    /// Apply a selection change. Implementations bump the version exactly
    /// once if, and only if, the selection actually changed.
    fn set_selected(&mut self, tokens: &[FocusToken], mode: SelectionMode);

    /// Register a callback for selection changes.
    fn on_selection_changed(&mut self, callback: SelectionCallback);
}

/// Default in-process selection authority.
pub struct Selection {
    /// Selected tokens. The primary is always first.
    selected: Vec<FocusToken>,
    /// Current version.
    version: SelectionVersion,
    /// Registered change callbacks.
    listeners: Vec<SelectionCallback>,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("selected", &self.selected)
            .field("version", &self.version)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl Selection {
    /// Create an empty selection at the initial version.
    pub fn new() -> Self {
        Self {
            selected: Vec::new(),
            version: SelectionVersion::INITIAL,
            listeners: Vec::new(),
        }
    }

    /// Clear the selection.
    pub fn clear(&mut self) {
        self.set_selected(&[], SelectionMode::Replace);
    }

    /// Compute the next selection without applying it.
    fn combine(&self, tokens: &[FocusToken], mode: SelectionMode) -> Vec<FocusToken> {
        let incoming = tokens.iter().copied().filter(|t| !t.is_none());
        match mode {
            SelectionMode::Replace => {
                let mut next = Vec::new();
                for t in incoming {
                    if !next.contains(&t) {
                        next.push(t);
                    }
                }
                next
            }
            SelectionMode::Add => {
                let mut next = self.selected.clone();
                let mut primary = None;
                for t in incoming {
                    if !next.contains(&t) {
                        next.push(t);
                    }
                    primary = Some(t);
                }
                if let Some(pos) = primary.and_then(|p| next.iter().position(|t| *t == p)) {
                    let p = next.remove(pos);
                    next.insert(0, p);
                }
                next
            }
            SelectionMode::Remove => {
                let gone: Vec<FocusToken> = incoming.collect();
                self.selected
                    .iter()
                    .copied()
                    .filter(|t| !gone.contains(t))
                    .collect()
            }
        }
    }
}

impl SelectionAuthority for Selection {
    fn current_version(&self) -> SelectionVersion {
        self.version
    }

    fn primary(&self) -> FocusToken {
        self.selected.first().copied().unwrap_or_default()
    }

    fn selected_set(&self) -> Vec<FocusToken> {
        self.selected.clone()
    }

    fn is_selected(&self, token: FocusToken) -> bool {
        self.selected.contains(&token)
    }

    fn set_selected(&mut self, tokens: &[FocusToken], mode: SelectionMode) {
        let next = self.combine(tokens, mode);
        if next == self.selected {
            return;
        }
        self.selected = next;
        self.version = self.version.next();
        trace!(version = %self.version, count = self.selected.len(), "selection changed");
        let version = self.version;
        for listener in &mut self.listeners {
            listener(version);
        }
    }

    fn on_selection_changed(&mut self, callback: SelectionCallback) {
        self.listeners.push(callback);
    }
}
