use slotmap::SlotMap;
use tracing::trace;

use crate::core::{
    error::{Error, Result},
    id::{ContainerId, ControlId, ItemId},
};

/// Kind of item container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Top-level strip hosted by a control.
    Strip,
    /// Dropdown opened on demand from its owner item.
    Dropdown,
    /// Pseudo-container holding the items that did not fit on a strip.
    Overflow,
}

/// Where an item currently renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// On its strip or dropdown.
    Main,
    /// In the overflow of its strip.
    Overflow,
}

/// Kind of navigable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// A regular sited item.
    Item,
    /// The trigger that reveals a strip's overflow.
    OverflowButton,
    /// The in-place "add new item" affordance. Never persisted in the
    /// selection.
    TemplateNode,
}

/// Item data stored in the arena.
#[derive(Debug, Clone)]
pub struct Item {
    /// Display name.
    pub(crate) name: String,
    /// Item kind.
    pub(crate) kind: ItemKind,
    /// Container the item currently belongs to.
    pub(crate) owner: ContainerId,
    /// Dropdown or overflow revealed by activating this item.
    pub(crate) dropdown: Option<ContainerId>,
    /// Hidden items are skipped by sibling lookup.
    pub(crate) hidden: bool,
}

impl Item {
    /// Return the item name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the item kind.
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Return the owning container.
    pub fn owner(&self) -> ContainerId {
        self.owner
    }

    /// Return the dropdown this item reveals, if any.
    pub fn dropdown(&self) -> Option<ContainerId> {
        self.dropdown
    }

    /// Return true if the item is hidden.
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// Is this the "add new item" affordance?
    pub fn is_template(&self) -> bool {
        self.kind == ItemKind::TemplateNode
    }

    /// Can this item be placed in the persisted selection?
    pub fn is_selectable(&self) -> bool {
        self.kind != ItemKind::TemplateNode
    }
}

/// Container data stored in the arena.
#[derive(Debug, Clone)]
pub struct Container {
    /// Container kind.
    pub(crate) kind: ContainerKind,
    /// Ordered items. Order is authoritative for traversal.
    pub(crate) items: Vec<ItemId>,
    /// Right-to-left layout.
    pub(crate) right_to_left: bool,
    /// Item whose activation reveals this container.
    pub(crate) owner_item: Option<ItemId>,
    /// Control hosting a strip.
    pub(crate) host: Option<ControlId>,
    /// Overflow pseudo-container of a strip.
    pub(crate) overflow: Option<ContainerId>,
    /// Whether a dropdown or overflow is currently shown. Strips are always
    /// open.
    pub(crate) open: bool,
}

impl Container {
    /// Return the container kind.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Return the ordered items.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Return true for right-to-left layout.
    pub fn right_to_left(&self) -> bool {
        self.right_to_left
    }

    /// Return the owner item, if any.
    pub fn owner_item(&self) -> Option<ItemId> {
        self.owner_item
    }

    /// Return the host control of a strip.
    pub fn host(&self) -> Option<ControlId> {
        self.host
    }

    /// Return the overflow of a strip.
    pub fn overflow(&self) -> Option<ContainerId> {
        self.overflow
    }

    /// Return true if the container is shown.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Is this a dropdown or overflow?
    pub fn is_drop_down(&self) -> bool {
        matches!(self.kind, ContainerKind::Dropdown | ContainerKind::Overflow)
    }
}

/// Control data stored in the arena.
#[derive(Debug, Clone)]
pub struct Control {
    /// Display name.
    pub(crate) name: String,
    /// Parent control.
    pub(crate) parent: Option<ControlId>,
    /// Children in z-order.
    pub(crate) children: Vec<ControlId>,
    /// Tab index among siblings. Duplicates are allowed.
    pub(crate) tab_index: i32,
    /// Whether the control belongs to the design container.
    pub(crate) sited: bool,
    /// Strip hosted by this control.
    pub(crate) strip: Option<ContainerId>,
    /// Non-visual component living on the tray.
    pub(crate) on_tray: bool,
}

impl Control {
    /// Return the control name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the parent control.
    pub fn parent(&self) -> Option<ControlId> {
        self.parent
    }

    /// Return the children in z-order.
    pub fn children(&self) -> &[ControlId] {
        &self.children
    }

    /// Return the tab index.
    pub fn tab_index(&self) -> i32 {
        self.tab_index
    }

    /// Return true if the control is sited in the design container.
    pub fn sited(&self) -> bool {
        self.sited
    }

    /// Return the strip hosted by this control.
    pub fn strip(&self) -> Option<ContainerId> {
        self.strip
    }

    /// Return true for tray components.
    pub fn on_tray(&self) -> bool {
        self.on_tray
    }
}

/// Ids removed by a structural removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removed {
    /// Removed items.
    pub items: Vec<ItemId>,
    /// Removed containers.
    pub containers: Vec<ContainerId>,
}

impl Removed {
    /// Does the removal include this item?
    pub fn contains_item(&self, id: ItemId) -> bool {
        self.items.contains(&id)
    }

    /// Does the removal include this container?
    pub fn contains_container(&self, id: ContainerId) -> bool {
        self.containers.contains(&id)
    }
}

/// Arena of items, containers and controls being edited.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Item storage.
    pub(crate) items: SlotMap<ItemId, Item>,
    /// Container storage.
    pub(crate) containers: SlotMap<ContainerId, Container>,
    /// Control storage.
    pub(crate) controls: SlotMap<ControlId, Control>,
    /// Root form control.
    pub(crate) root: Option<ControlId>,
    /// Tray components in tray order.
    pub(crate) tray: Vec<ControlId>,
    /// Structural change counter.
    pub(crate) generation: u64,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the root form control.
    pub fn root(&self) -> Option<ControlId> {
        self.root
    }

    /// Return the tray components in order.
    pub fn tray(&self) -> &[ControlId] {
        &self.tray
    }

    /// Return the structural change counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Look up an item.
    pub fn item(&self, id: ItemId) -> Result<&Item> {
        self.items.get(id).ok_or(Error::ItemNotFound(id))
    }

    /// Look up a container.
    pub fn container(&self, id: ContainerId) -> Result<&Container> {
        self.containers.get(id).ok_or(Error::ContainerNotFound(id))
    }

    /// Look up a control.
    pub fn control(&self, id: ControlId) -> Result<&Control> {
        self.controls.get(id).ok_or(Error::ControlNotFound(id))
    }

    /// Does the arena still hold this item?
    pub fn contains_item(&self, id: ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Does the arena still hold this container?
    pub fn contains_container(&self, id: ContainerId) -> bool {
        self.containers.contains_key(id)
    }

    /// Return the owning container of an item.
    pub fn owner(&self, id: ItemId) -> Result<ContainerId> {
        Ok(self.item(id)?.owner)
    }

    /// Return an item's placement classification.
    pub fn placement(&self, id: ItemId) -> Result<Placement> {
        let owner = self.container(self.owner(id)?)?;
        Ok(match owner.kind {
            ContainerKind::Overflow => Placement::Overflow,
            ContainerKind::Strip | ContainerKind::Dropdown => Placement::Main,
        })
    }

    /// Is the item on a dropdown or overflow?
    pub fn is_on_dropdown(&self, id: ItemId) -> Result<bool> {
        Ok(self.container(self.owner(id)?)?.is_drop_down())
    }

    /// Is the item on an overflow?
    pub fn is_on_overflow(&self, id: ItemId) -> Result<bool> {
        Ok(self.placement(id)? == Placement::Overflow)
    }

    /// Return a container's ordered items.
    pub fn items(&self, id: ContainerId) -> Result<&[ItemId]> {
        Ok(&self.container(id)?.items)
    }

    /// Return a container's right-to-left flag.
    pub fn right_to_left(&self, id: ContainerId) -> Result<bool> {
        Ok(self.container(id)?.right_to_left)
    }

    /// Return a control's tab index.
    pub fn tab_index(&self, id: ControlId) -> Result<i32> {
        Ok(self.control(id)?.tab_index)
    }

    /// Return the index of an item within its owner, verifying that the
    /// owner actually lists it.
    pub fn index_of(&self, id: ItemId) -> Result<usize> {
        let owner_id = self.owner(id)?;
        let owner = self.containers.get(owner_id).ok_or_else(|| {
            Error::Structural(format!("item {id:?} claims missing owner {owner_id:?}"))
        })?;
        owner
            .items
            .iter()
            .position(|i| *i == id)
            .ok_or_else(|| {
                Error::Structural(format!("item {id:?} not present in its owner {owner_id:?}"))
            })
    }

    /// Return the strip a container ultimately hangs off, following owner
    /// items upwards. Returns `None` for ownerless dropdowns.
    pub fn root_strip(&self, id: ContainerId) -> Result<Option<ContainerId>> {
        let mut current = id;
        // Owner chains are acyclic; the bound guards against corrupt models.
        for _ in 0..=self.containers.len() {
            let container = self.container(current)?;
            if container.kind == ContainerKind::Strip {
                return Ok(Some(current));
            }
            let Some(owner_item) = container.owner_item else {
                return Ok(None);
            };
            current = self.owner(owner_item)?;
        }
        Err(Error::Structural(format!("owner chain of {id:?} has a cycle")))
    }

    /// Find an item by name.
    pub fn find_item(&self, name: &str) -> Option<ItemId> {
        self.items
            .iter()
            .find(|(_, item)| item.name == name)
            .map(|(id, _)| id)
    }

    /// Find a control by name.
    pub fn find_control(&self, name: &str) -> Option<ControlId> {
        self.controls
            .iter()
            .find(|(_, control)| control.name == name)
            .map(|(id, _)| id)
    }

    /// Bump the structural generation.
    fn touch(&mut self) {
        self.generation = self.generation.saturating_add(1);
    }

    /// Create the root form control.
    pub fn add_root(&mut self, name: impl Into<String>) -> Result<ControlId> {
        if self.root.is_some() {
            return Err(Error::Invalid("model already has a root control".into()));
        }
        let id = self.controls.insert(Control {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            tab_index: 0,
            sited: true,
            strip: None,
            on_tray: false,
        });
        self.root = Some(id);
        self.touch();
        Ok(id)
    }

    /// Add a child control.
    pub fn add_control(
        &mut self,
        parent: ControlId,
        name: impl Into<String>,
        tab_index: i32,
    ) -> Result<ControlId> {
        self.control(parent)?;
        let id = self.controls.insert(Control {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
            tab_index,
            sited: true,
            strip: None,
            on_tray: false,
        });
        self.controls[parent].children.push(id);
        self.touch();
        Ok(id)
    }

    /// Add a non-visual component to the tray.
    pub fn add_tray_component(&mut self, name: impl Into<String>) -> ControlId {
        let id = self.controls.insert(Control {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            tab_index: 0,
            sited: true,
            strip: None,
            on_tray: true,
        });
        self.tray.push(id);
        self.touch();
        id
    }

    /// Mark a control as sited or unsited.
    pub fn set_sited(&mut self, id: ControlId, sited: bool) -> Result<()> {
        self.controls
            .get_mut(id)
            .ok_or(Error::ControlNotFound(id))?
            .sited = sited;
        self.touch();
        Ok(())
    }

    /// Add a strip hosted by a new child control of `parent`.
    pub fn add_strip(
        &mut self,
        parent: ControlId,
        name: impl Into<String>,
        tab_index: i32,
    ) -> Result<(ControlId, ContainerId)> {
        let host = self.add_control(parent, name, tab_index)?;
        let strip = self.containers.insert(Container {
            kind: ContainerKind::Strip,
            items: Vec::new(),
            right_to_left: false,
            owner_item: None,
            host: Some(host),
            overflow: None,
            open: true,
        });
        self.controls[host].strip = Some(strip);
        Ok((host, strip))
    }

    /// Set the right-to-left flag of a container. Dropdowns and overflows
    /// below it follow.
    pub fn set_right_to_left(&mut self, id: ContainerId, rtl: bool) -> Result<()> {
        let mut stack = vec![id];
        while let Some(cid) = stack.pop() {
            let container = self
                .containers
                .get_mut(cid)
                .ok_or(Error::ContainerNotFound(cid))?;
            container.right_to_left = rtl;
            let items = container.items.clone();
            stack.extend(items.iter().filter_map(|i| self.items.get(*i)?.dropdown));
        }
        self.touch();
        Ok(())
    }

    /// Insert a new item at `index` (clamped) of a container.
    pub fn insert_item(
        &mut self,
        container: ContainerId,
        index: usize,
        name: impl Into<String>,
        kind: ItemKind,
    ) -> Result<ItemId> {
        self.container(container)?;
        let id = self.items.insert(Item {
            name: name.into(),
            kind,
            owner: container,
            dropdown: None,
            hidden: false,
        });
        let items = &mut self.containers[container].items;
        let index = index.min(items.len());
        items.insert(index, id);
        self.touch();
        Ok(id)
    }

    /// Append a regular item to a container.
    ///
    /// On a strip with an overflow the item lands before the overflow
    /// button, which always stays last.
    pub fn add_item(&mut self, container: ContainerId, name: impl Into<String>) -> Result<ItemId> {
        let index = self.append_index(container)?;
        self.insert_item(container, index, name, ItemKind::Item)
    }

    /// Append a template node to a container.
    pub fn add_template_node(&mut self, container: ContainerId) -> Result<ItemId> {
        let index = self.append_index(container)?;
        self.insert_item(container, index, "template", ItemKind::TemplateNode)
    }

    /// Index at which appended items land.
    fn append_index(&self, container: ContainerId) -> Result<usize> {
        let c = self.container(container)?;
        let trailing_button = c
            .items
            .last()
            .and_then(|i| self.items.get(*i))
            .is_some_and(|i| i.kind == ItemKind::OverflowButton);
        Ok(if trailing_button {
            c.items.len() - 1
        } else {
            c.items.len()
        })
    }

    /// Give an item a closed dropdown. Returns the existing dropdown if it
    /// already has one.
    pub fn add_dropdown(&mut self, owner_item: ItemId) -> Result<ContainerId> {
        let item = self.item(owner_item)?;
        if let Some(existing) = item.dropdown {
            return Ok(existing);
        }
        let rtl = self.container(item.owner)?.right_to_left;
        let id = self.containers.insert(Container {
            kind: ContainerKind::Dropdown,
            items: Vec::new(),
            right_to_left: rtl,
            owner_item: Some(owner_item),
            host: None,
            overflow: None,
            open: false,
        });
        self.items[owner_item].dropdown = Some(id);
        self.touch();
        Ok(id)
    }

    /// Return the overflow of a strip, creating it and its trigger button on
    /// first use.
    pub fn ensure_overflow(&mut self, strip: ContainerId) -> Result<ContainerId> {
        let c = self.container(strip)?;
        if c.kind != ContainerKind::Strip {
            return Err(Error::Invalid(format!("{strip:?} is not a strip")));
        }
        if let Some(existing) = c.overflow {
            return Ok(existing);
        }
        let rtl = c.right_to_left;
        let len = c.items.len();
        let button = self.insert_item(strip, len, "overflow", ItemKind::OverflowButton)?;
        let overflow = self.containers.insert(Container {
            kind: ContainerKind::Overflow,
            items: Vec::new(),
            right_to_left: rtl,
            owner_item: Some(button),
            host: None,
            overflow: None,
            open: false,
        });
        self.items[button].dropdown = Some(overflow);
        self.containers[strip].overflow = Some(overflow);
        Ok(overflow)
    }

    /// Move the last `count` regular items of a strip into its overflow,
    /// preserving their relative order. Template nodes stay on the strip.
    pub fn overflow_trailing(&mut self, strip: ContainerId, count: usize) -> Result<()> {
        let overflow = self.ensure_overflow(strip)?;
        let moving: Vec<ItemId> = {
            let items = &self.containers[strip].items;
            let regular: Vec<ItemId> = items
                .iter()
                .copied()
                .filter(|i| self.items.get(*i).is_some_and(|it| it.kind == ItemKind::Item))
                .collect();
            regular[regular.len().saturating_sub(count)..].to_vec()
        };
        self.containers[strip].items.retain(|i| !moving.contains(i));
        for (n, id) in moving.iter().enumerate() {
            self.containers[overflow].items.insert(n, *id);
            self.items[*id].owner = overflow;
        }
        trace!(?strip, moved = moving.len(), "items moved to overflow");
        self.touch();
        Ok(())
    }

    /// Move every overflowed item back onto its strip, before the overflow
    /// button.
    pub fn restore_overflow(&mut self, strip: ContainerId) -> Result<()> {
        let Some(overflow) = self.container(strip)?.overflow else {
            return Ok(());
        };
        let moving = std::mem::take(&mut self.containers[overflow].items);
        for id in moving {
            let index = self.append_index(strip)?;
            self.containers[strip].items.insert(index, id);
            self.items[id].owner = strip;
        }
        self.containers[overflow].open = false;
        self.touch();
        Ok(())
    }

    /// Show or hide a dropdown or overflow. Returns the previous state.
    pub fn set_open(&mut self, id: ContainerId, open: bool) -> Result<bool> {
        let container = self
            .containers
            .get_mut(id)
            .ok_or(Error::ContainerNotFound(id))?;
        if container.kind == ContainerKind::Strip {
            return Ok(true);
        }
        let was = container.open;
        container.open = open;
        Ok(was)
    }

    /// Hide or show an item.
    pub fn set_hidden(&mut self, id: ItemId, hidden: bool) -> Result<()> {
        self.items.get_mut(id).ok_or(Error::ItemNotFound(id))?.hidden = hidden;
        self.touch();
        Ok(())
    }

    /// Remove an item together with any dropdown it owns.
    pub fn remove_item(&mut self, id: ItemId) -> Result<Removed> {
        let owner = self.owner(id)?;
        let mut removed = Removed::default();
        if let Some(dropdown) = self.items[id].dropdown {
            self.remove_container_inner(dropdown, &mut removed);
        }
        if let Some(c) = self.containers.get_mut(owner) {
            c.items.retain(|i| *i != id);
            if c.overflow.is_some_and(|o| removed.contains_container(o)) {
                c.overflow = None;
            }
        }
        self.items.remove(id);
        removed.items.push(id);
        self.touch();
        Ok(removed)
    }

    /// Remove a container together with its items and nested dropdowns.
    pub fn remove_container(&mut self, id: ContainerId) -> Result<Removed> {
        let container = self.container(id)?;
        let owner_item = container.owner_item;
        let host = container.host;
        let mut removed = Removed::default();
        self.remove_container_inner(id, &mut removed);
        let owner = owner_item.and_then(|i| self.items.get_mut(i).map(|item| (i, item)));
        if let Some((owner_item, item)) = owner {
            item.dropdown = None;
            if item.kind == ItemKind::OverflowButton {
                let strip = item.owner;
                if let Some(strip) = self.containers.get_mut(strip) {
                    strip.overflow = None;
                }
                let extra = self.remove_item(owner_item)?;
                removed.items.extend(extra.items);
                removed.containers.extend(extra.containers);
            }
        }
        if let Some(control) = host.and_then(|h| self.controls.get_mut(h)) {
            control.strip = None;
        }
        self.touch();
        Ok(removed)
    }

    /// Remove a container subtree, recording what went.
    fn remove_container_inner(&mut self, id: ContainerId, removed: &mut Removed) {
        let mut stack = vec![id];
        while let Some(cid) = stack.pop() {
            let Some(container) = self.containers.remove(cid) else {
                continue;
            };
            if let Some(overflow) = container.overflow {
                stack.push(overflow);
            }
            for item_id in container.items {
                if let Some(item) = self.items.remove(item_id) {
                    if let Some(dropdown) = item.dropdown {
                        stack.push(dropdown);
                    }
                    removed.items.push(item_id);
                }
            }
            removed.containers.push(cid);
        }
    }

    /// Check the structural invariants of the whole model.
    pub fn validate(&self) -> Result<()> {
        for (id, item) in &self.items {
            let owner = self.containers.get(item.owner).ok_or_else(|| {
                Error::Structural(format!("item {id:?} has missing owner {:?}", item.owner))
            })?;
            if owner.items.iter().filter(|i| **i == id).count() != 1 {
                return Err(Error::Structural(format!(
                    "item {id:?} must appear exactly once in its owner"
                )));
            }
            if let Some(dropdown) = item.dropdown {
                let d = self.container(dropdown)?;
                if d.owner_item != Some(id) {
                    return Err(Error::Structural(format!(
                        "dropdown {dropdown:?} does not point back at {id:?}"
                    )));
                }
            }
        }
        for (cid, container) in &self.containers {
            for item in &container.items {
                if self.items.get(*item).map(|i| i.owner) != Some(cid) {
                    return Err(Error::Structural(format!(
                        "container {cid:?} lists foreign item {item:?}"
                    )));
                }
            }
            if container.kind == ContainerKind::Overflow
                && container
                    .owner_item
                    .and_then(|i| self.items.get(i))
                    .map(|i| i.kind)
                    != Some(ItemKind::OverflowButton)
            {
                return Err(Error::Structural(format!(
                    "overflow {cid:?} is not owned by an overflow button"
                )));
            }
        }
        for (id, control) in &self.controls {
            for child in &control.children {
                if self.control(*child)?.parent != Some(id) {
                    return Err(Error::Structural(format!(
                        "control {child:?} does not point back at parent {id:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}
