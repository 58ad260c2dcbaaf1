use std::fmt;

use slotmap::new_key_type;

new_key_type! {
    /// Opaque identifier for an item stored in the model arena.
    pub struct ItemId;
    /// Opaque identifier for a strip, dropdown or overflow container.
    pub struct ContainerId;
    /// Opaque identifier for a control on the design surface or tray.
    pub struct ControlId;
}

/// Monotonic counter of selection changes.
///
/// Owned by the selection authority and bumped exactly once per
/// selection-changed notification. A 64-bit counter cannot wrap within a
/// design session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SelectionVersion(pub u64);

impl SelectionVersion {
    /// The version a fresh selection starts at.
    pub const INITIAL: Self = Self(1);

    /// Return the following version.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for SelectionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// What currently has design-time focus.
///
/// Distinct from the persisted selection: an item token may name an unsited
/// node such as a template node, which is never placed in the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusToken {
    /// Nothing is focused.
    #[default]
    NoSelection,
    /// An item on a strip, dropdown or overflow.
    Item(ItemId),
    /// A control on the design surface or a component on the tray.
    Control(ControlId),
}

impl FocusToken {
    /// Return the item id if this token names an item.
    pub fn item(self) -> Option<ItemId> {
        match self {
            Self::Item(id) => Some(id),
            _ => None,
        }
    }

    /// Return the control id if this token names a control.
    pub fn control(self) -> Option<ControlId> {
        match self {
            Self::Control(id) => Some(id),
            _ => None,
        }
    }

    /// Is this the empty token?
    pub fn is_none(self) -> bool {
        self == Self::NoSelection
    }
}

impl From<ItemId> for FocusToken {
    fn from(value: ItemId) -> Self {
        Self::Item(value)
    }
}

impl From<ControlId> for FocusToken {
    fn from(value: ControlId) -> Self {
        Self::Control(value)
    }
}
