//! Tab-order traversal.
//!
//! Controls are walked in pre-order from the root form, siblings ordered by
//! tab index with ties broken by z-order. Unsited controls and their subtrees
//! are skipped. After the last control come the tray components, and after
//! the last tray component the walk returns to the root, so traversal never
//! dead-ends.

use tracing::debug;

use crate::core::{
    error::Result,
    id::{ContainerId, ControlId, FocusToken, ItemId},
    model::ContainerKind,
    navigation::{Resolver, Step},
};

/// Walks the tab order of one model snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TabWalk<'a> {
    /// Supplies the model, the settings and the sibling rules.
    resolver: Resolver<'a>,
}

impl<'a> TabWalk<'a> {
    /// Create a walk sharing a resolver's snapshot.
    pub fn new(resolver: Resolver<'a>) -> Self {
        Self { resolver }
    }

    /// Resolve tab or shift-tab, surfacing structural inconsistencies.
    pub fn resolve(&self, current: FocusToken, forward: bool, extend: bool) -> Result<FocusToken> {
        match current {
            FocusToken::NoSelection => Ok(self.start_token()),
            FocusToken::Item(item) => self.item_tab(item, forward, extend),
            FocusToken::Control(control) => self.control_tab(control, forward),
        }
    }

    /// Where tabbing starts from an empty focus.
    fn start_token(&self) -> FocusToken {
        if let Some(root) = self.resolver.model.root() {
            FocusToken::Control(root)
        } else {
            self.sited_tray()
                .first()
                .map_or(FocusToken::NoSelection, |c| FocusToken::Control(*c))
        }
    }

    /// Return the sequence of sited controls in tab order, root first.
    pub fn tab_order(&self) -> Result<Vec<ControlId>> {
        let mut out = Vec::new();
        let Some(root) = self.resolver.model.root() else {
            return Ok(out);
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let control = self.resolver.model.control(id)?;
            if !control.sited() {
                continue;
            }
            out.push(id);
            let mut children = Vec::with_capacity(control.children().len());
            for child in control.children() {
                children.push((self.resolver.model.tab_index(*child)?, *child));
            }
            // Stable sort keeps z-order among duplicate tab indexes.
            children.sort_by_key(|(tab, _)| *tab);
            stack.extend(children.into_iter().rev().map(|(_, id)| id));
        }
        Ok(out)
    }

    /// Return the sited tray components.
    fn sited_tray(&self) -> Vec<ControlId> {
        self.resolver.model
            .tray()
            .iter()
            .copied()
            .filter(|c| self.resolver.model.control(*c).is_ok_and(|c| c.sited()))
            .collect()
    }

    /// The full cyclic order of controls followed by tray components.
    fn cycle(&self) -> Result<Vec<ControlId>> {
        let mut order = self.tab_order()?;
        order.extend(self.sited_tray());
        Ok(order)
    }

    /// Return the control after (or before) `control` in the cyclic order,
    /// or the root if `control` is not part of it.
    pub fn next_control(&self, control: ControlId, forward: bool) -> Result<FocusToken> {
        let order = self.cycle()?;
        let Some(pos) = order.iter().position(|c| *c == control) else {
            return Ok(self.start_token());
        };
        let len = order.len();
        let next = if forward {
            order[(pos + 1) % len]
        } else {
            order[(pos + len - 1) % len]
        };
        Ok(FocusToken::Control(next))
    }

    /// Tab from a control. Tabbing onto a strip host enters its items.
    fn control_tab(&self, control: ControlId, forward: bool) -> Result<FocusToken> {
        if let Some(strip) = self.resolver.model.control(control)?.strip() {
            let step = if forward {
                Step::Forward
            } else {
                Step::Backward
            };
            if let Some(item) = self.resolver.boundary_item(strip, step)? {
                return Ok(FocusToken::Item(item));
            }
        }
        self.next_control(control, forward)
    }

    /// Tab from an item.
    fn item_tab(&self, item: ItemId, forward: bool, extend: bool) -> Result<FocusToken> {
        let owner = self.resolver.model.owner(item)?;
        let index = self.resolver.model.index_of(item)?;
        if let Some(next) = self.linear_sibling(owner, index, forward)? {
            return Ok(FocusToken::Item(next));
        }
        let container = self.resolver.model.container(owner)?;
        match container.kind() {
            ContainerKind::Strip => {
                if extend && self.resolver.config.extend_stops_at_strip_edge {
                    return Ok(FocusToken::Item(item));
                }
                self.leave_strip(owner, forward)
            }
            ContainerKind::Dropdown => match container.owner_item() {
                Some(owner_item) if forward => self.item_tab(owner_item, forward, extend),
                Some(owner_item) => Ok(FocusToken::Item(owner_item)),
                None => Ok(self.start_token()),
            },
            ContainerKind::Overflow => {
                let Some(trigger) = container.owner_item() else {
                    return Ok(self.start_token());
                };
                if forward {
                    return self.item_tab(trigger, forward, extend);
                }
                let strip = self.resolver.model.owner(trigger)?;
                let index = self.resolver.model.index_of(trigger)?;
                match self.linear_sibling(strip, index, false)? {
                    Some(prev) => Ok(FocusToken::Item(prev)),
                    None if extend && self.resolver.config.extend_stops_at_strip_edge => {
                        Ok(FocusToken::Item(item))
                    }
                    None => self.leave_strip(strip, false),
                }
            }
        }
    }

    /// Next navigable sibling without wrapping.
    fn linear_sibling(
        &self,
        container: ContainerId,
        index: usize,
        forward: bool,
    ) -> Result<Option<ItemId>> {
        let items = self.resolver.model.items(container)?;
        let candidates: Box<dyn Iterator<Item = &ItemId>> = if forward {
            Box::new(items.iter().skip(index + 1))
        } else {
            Box::new(items[..index.min(items.len())].iter().rev())
        };
        for id in candidates {
            if self.resolver.is_navigable(*id)? {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }

    /// Leave a strip past either end, onto the control after (or before) its
    /// host.
    fn leave_strip(&self, strip: ContainerId, forward: bool) -> Result<FocusToken> {
        let Some(host) = self.resolver.model.container(strip)?.host() else {
            return Ok(self.start_token());
        };
        let target = self.next_control(host, forward)?;
        debug!(?strip, ?target, forward, "tab left strip");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{config::NavigationConfig, model::Model};

    #[test]
    fn duplicate_tab_indexes_follow_z_order() {
        let mut model = Model::new();
        let root = model.add_root("form").unwrap();
        let a = model.add_control(root, "a", 1).unwrap();
        let b = model.add_control(root, "b", 0).unwrap();
        let c = model.add_control(root, "c", 1).unwrap();
        let hidden = model.add_control(root, "hidden", 0).unwrap();
        model.set_sited(hidden, false).unwrap();
        let config = NavigationConfig::default();
        let r = Resolver::new(&model, &config);
        assert_eq!(TabWalk::new(r).tab_order().unwrap(), vec![root, b, a, c]);
    }

    #[test]
    fn empty_model_never_panics() {
        let model = Model::new();
        let config = NavigationConfig::default();
        let r = Resolver::new(&model, &config);
        for forward in [true, false] {
            assert_eq!(
                r.resolve_tab(FocusToken::NoSelection, forward, false),
                FocusToken::NoSelection
            );
        }
    }
}
