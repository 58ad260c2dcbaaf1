//! Directional focus resolution over the strip/dropdown/overflow hierarchy.
//!
//! The resolver is a pure function of the model it borrows: every call sees
//! one consistent snapshot and never mutates anything. Opening a dropdown
//! that focus moves into is the keyboard layer's job.

use std::fmt;

use tracing::{debug, warn};

use crate::core::{
    config::NavigationConfig,
    error::{Error, Result},
    id::{ContainerId, FocusToken, ItemId},
    model::{ContainerKind, Model},
    tab::TabWalk,
};

/// An arrow-key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Up.
    Up,
    /// Down.
    Down,
    /// Left.
    Left,
    /// Right.
    Right,
}

impl Direction {
    /// All directions.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Return the opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Is this a horizontal direction?
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Mirror horizontal directions, leaving vertical ones alone.
    pub fn mirrored(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            other => other,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(s)
    }
}

/// Logical step through a container's item order, after mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Towards higher indexes.
    Forward,
    /// Towards lower indexes.
    Backward,
}

impl Step {
    /// Return the opposite step.
    pub fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// Derive the logical step for a direction, mirroring horizontal ones
    /// once when `right_to_left` is set.
    pub fn horizontal(direction: Direction, right_to_left: bool) -> Self {
        let direction = if right_to_left {
            direction.mirrored()
        } else {
            direction
        };
        match direction {
            Direction::Right | Direction::Down => Self::Forward,
            Direction::Left | Direction::Up => Self::Backward,
        }
    }
}

/// A movement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    /// An arrow key.
    Arrow(Direction),
    /// Tab or shift-tab.
    Tab {
        /// True for tab, false for shift-tab.
        forward: bool,
    },
}

/// Resolves movement requests against one snapshot of the model.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    /// The model being navigated.
    pub(crate) model: &'a Model,
    /// Navigation settings.
    pub(crate) config: &'a NavigationConfig,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a model snapshot.
    pub fn new(model: &'a Model, config: &'a NavigationConfig) -> Self {
        Self { model, config }
    }

    /// Resolve any motion. `extend` reports whether the range modifier is
    /// held. Never fails: inconsistencies are logged and the current token is
    /// returned unchanged.
    pub fn resolve(&self, current: FocusToken, motion: Motion, extend: bool) -> FocusToken {
        match self.try_resolve(current, motion, extend) {
            Ok(token) => token,
            Err(e) => {
                warn!(?current, ?motion, error = %e, "navigation aborted");
                current
            }
        }
    }

    /// Resolve any motion, surfacing structural inconsistencies.
    pub fn try_resolve(&self, current: FocusToken, motion: Motion, extend: bool) -> Result<FocusToken> {
        match motion {
            Motion::Arrow(direction) => self.try_resolve_direction(current, direction, extend),
            Motion::Tab { forward } => self.try_resolve_tab(current, forward, extend),
        }
    }

    /// Resolve an arrow key, recovering from failures by returning `current`.
    pub fn resolve_direction(
        &self,
        current: FocusToken,
        direction: Direction,
        extend: bool,
    ) -> FocusToken {
        self.resolve(current, Motion::Arrow(direction), extend)
    }

    /// Resolve tab or shift-tab, recovering from failures by returning
    /// `current`.
    pub fn resolve_tab(&self, current: FocusToken, forward: bool, extend: bool) -> FocusToken {
        self.resolve(current, Motion::Tab { forward }, extend)
    }

    /// Resolve tab or shift-tab, surfacing structural inconsistencies.
    pub fn try_resolve_tab(
        &self,
        current: FocusToken,
        forward: bool,
        extend: bool,
    ) -> Result<FocusToken> {
        TabWalk::new(*self).resolve(current, forward, extend)
    }

    /// Resolve an arrow key, surfacing structural inconsistencies.
    pub fn try_resolve_direction(
        &self,
        current: FocusToken,
        direction: Direction,
        extend: bool,
    ) -> Result<FocusToken> {
        match current {
            FocusToken::Item(item) => self.item_direction(item, direction),
            FocusToken::Control(_) | FocusToken::NoSelection => {
                let forward = matches!(direction, Direction::Right | Direction::Down);
                debug!(?current, %direction, "no item target, falling back to tab order");
                self.try_resolve_tab(current, forward, extend)
            }
        }
    }

    /// Can focus land on this item through sibling lookup?
    pub fn is_navigable(&self, id: ItemId) -> Result<bool> {
        let item = self.model.item(id)?;
        Ok(!item.hidden() && (!item.is_template() || self.config.navigate_template_nodes))
    }

    /// Return the first (or last) navigable item of a container.
    pub fn boundary_item(&self, container: ContainerId, step: Step) -> Result<Option<ItemId>> {
        let items = self.model.items(container)?;
        let mut ordered: Box<dyn Iterator<Item = &ItemId>> = match step {
            Step::Forward => Box::new(items.iter()),
            Step::Backward => Box::new(items.iter().rev()),
        };
        for id in ordered.by_ref() {
            if self.is_navigable(*id)? {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }

    /// Find the next navigable sibling of the item at `start` by cyclic index
    /// lookup, without any mirroring. A full cycle may land back on `start`.
    /// Returns the sibling and whether the lookup wrapped past the end.
    pub fn sibling(
        &self,
        container: ContainerId,
        start: usize,
        step: Step,
    ) -> Result<Option<(ItemId, bool)>> {
        let items = self.model.items(container)?;
        let len = items.len();
        if start >= len {
            return Err(Error::Structural(format!(
                "index {start} out of range for {container:?}"
            )));
        }
        for k in 1..=len {
            let index = match step {
                Step::Forward => (start + k) % len,
                Step::Backward => (start + len - k) % len,
            };
            let id = items[index];
            if self.is_navigable(id)? {
                let wrapped = match step {
                    Step::Forward => index <= start,
                    Step::Backward => index >= start,
                };
                return Ok(Some((id, wrapped)));
            }
        }
        Ok(None)
    }

    /// Resolve an arrow key from an item.
    ///
    /// Inside a dropdown or overflow every key moves within the container,
    /// promoting on wrap, except that a forward horizontal key enters the
    /// sub-dropdown of the item it starts from. On a strip Left and Right
    /// walk the strip, while Down and Up enter an item's dropdown at its
    /// first or last item.
    fn item_direction(&self, item: ItemId, direction: Direction) -> Result<FocusToken> {
        let index = self.model.index_of(item)?;
        let owner = self.model.owner(item)?;
        let inside = self.model.is_on_dropdown(item)?;

        let mirror = direction.is_horizontal() && self.model.right_to_left(owner)?;
        let step = Step::horizontal(direction, mirror);
        let enters = match direction {
            Direction::Up | Direction::Down => !inside,
            Direction::Left | Direction::Right => inside && step == Step::Forward,
        };
        if enters {
            let entry_step = if inside { Step::Forward } else { step };
            if let Some(target) = self.entry_point(item, entry_step)? {
                debug!(?item, ?target, %direction, "entering dropdown");
                return Ok(FocusToken::Item(target));
            }
        }
        self.traverse(item, owner, index, step)
    }

    /// Return the item focus enters the dropdown of `item` at: its first
    /// navigable item stepping forward, its last stepping backward.
    pub fn entry_point(&self, item: ItemId, step: Step) -> Result<Option<ItemId>> {
        match self.model.item(item)?.dropdown() {
            Some(dropdown) => self.boundary_item(dropdown, step),
            None => Ok(None),
        }
    }

    /// Step through a container's items, promoting on wrap where the
    /// container kind asks for it.
    fn traverse(
        &self,
        item: ItemId,
        owner: ContainerId,
        index: usize,
        step: Step,
    ) -> Result<FocusToken> {
        let Some((next, wrapped)) = self.sibling(owner, index, step)? else {
            return Ok(FocusToken::Item(item));
        };
        if wrapped && self.config.promote_on_wrap {
            if let Some(target) = self.promotion(owner, step)? {
                debug!(?item, ?target, ?step, "wrap promoted out of container");
                return Ok(target);
            }
        }
        Ok(FocusToken::Item(next))
    }

    /// Where a wrap inside `container` promotes to, if anywhere.
    ///
    /// Strips and ownerless dropdowns never promote. Dropdowns promote to
    /// their owner item, unless that item lives on an overflow, in which case
    /// focus leaves onto the strip next to the overflow trigger. Overflows
    /// leave onto the strip the same way.
    fn promotion(&self, container: ContainerId, step: Step) -> Result<Option<FocusToken>> {
        let c = self.model.container(container)?;
        let Some(owner_item) = c.owner_item() else {
            return Ok(None);
        };
        match c.kind() {
            ContainerKind::Strip => Ok(None),
            ContainerKind::Overflow => self.beside_overflow_trigger(container, step),
            ContainerKind::Dropdown => {
                if self.model.is_on_overflow(owner_item)? {
                    self.beside_overflow_trigger(self.model.owner(owner_item)?, step)
                } else {
                    Ok(Some(FocusToken::Item(owner_item)))
                }
            }
        }
    }

    /// Return the strip item next to the trigger of `overflow`, in `step`
    /// order along the strip.
    pub fn beside_overflow_trigger(
        &self,
        overflow: ContainerId,
        step: Step,
    ) -> Result<Option<FocusToken>> {
        let Some(trigger) = self.model.container(overflow)?.owner_item() else {
            return Ok(None);
        };
        let strip = self.model.owner(trigger)?;
        let index = self.model.index_of(trigger)?;
        Ok(self
            .sibling(strip, index, step)?
            .map(|(id, _)| FocusToken::Item(id)))
    }
}
