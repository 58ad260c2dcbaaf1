//! The keyboard command set.
//!
//! Wires a resolved move through the range accumulator into the selection
//! authority, opening dropdowns inside a transaction on the way, and gates
//! every command on a cached status function.

use std::{fmt, io::Write, rc::Rc};

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use tracing::{debug, error};

use crate::core::{
    commands::{
        CommandCache, CommandError, CommandStatus, KeyCommand, PARENT_AVAILABLE,
        RANGE_AVAILABLE, SELECT_ALL, StatusContext, StatusFn, StatusHandle,
    },
    config::NavigationConfig,
    error::{self, Result},
    id::{ContainerId, ControlId, FocusToken, ItemId},
    model::{ContainerKind, ItemKind, Model, Removed},
    navigation::{Motion, Resolver, Step},
    range::RangeAccumulator,
    selection::{SelectionAuthority, SelectionMode},
    transaction::{ChangeTransactions, with_transaction},
};

/// Hook that may claim a command before the default handler runs.
pub trait CommandOverride {
    /// Return `Ok(true)` to claim the command.
    fn intercept(&mut self, command: KeyCommand) -> anyhow::Result<bool>;
}

impl<F> CommandOverride for F
where
    F: FnMut(KeyCommand) -> anyhow::Result<bool>,
{
    fn intercept(&mut self, command: KeyCommand) -> anyhow::Result<bool> {
        self(command)
    }
}

/// What an invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// Focus moved to this token.
    Moved(FocusToken),
    /// Nothing to do.
    Unchanged,
    /// The override hook claimed the command.
    Overridden,
    /// The user cancelled; nothing changed.
    Cancelled,
}

/// Mutable collaborators a command runs against.
pub struct Surface<'a> {
    /// The model.
    pub model: &'a mut Model,
    /// The selection authority.
    pub selection: &'a mut dyn SelectionAuthority,
    /// The undo journal.
    pub transactions: &'a mut dyn ChangeTransactions,
}

/// Keyboard command set for strips, dropdowns and overflows.
pub struct KeyboardCommands {
    /// Navigation settings.
    config: NavigationConfig,
    /// Shared status cache.
    cache: CommandCache,
    /// One registration per command.
    handles: Vec<(KeyCommand, StatusHandle)>,
    /// Extend chord state.
    range: RangeAccumulator,
    /// Template node holding design focus outside the selection.
    designer_focus: Option<ItemId>,
    /// Optional override hook.
    override_hook: Option<Box<dyn CommandOverride>>,
}

impl fmt::Debug for KeyboardCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardCommands")
            .field("config", &self.config)
            .field("commands", &self.handles.len())
            .field("range", &self.range)
            .field("designer_focus", &self.designer_focus)
            .field("override", &self.override_hook.is_some())
            .finish()
    }
}

/// Regular, visible items of a container.
fn real_items(model: &Model, container: ContainerId) -> Result<Vec<ItemId>> {
    let mut out = Vec::new();
    for id in model.items(container)? {
        let item = model.item(*id)?;
        if item.kind() == ItemKind::Item && !item.hidden() {
            out.push(*id);
        }
    }
    Ok(out)
}

/// Enabled whenever anything has design focus.
fn item_focused() -> StatusFn {
    Rc::new(|ctx: &StatusContext<'_>| -> anyhow::Result<CommandStatus> {
        Ok(CommandStatus::enabled_if(!ctx.focus.is_none()))
    })
}

/// Enabled when the focused item's container has enough items.
fn range_available(min: usize) -> StatusFn {
    Rc::new(move |ctx: &StatusContext<'_>| -> anyhow::Result<CommandStatus> {
        let Some(item) = ctx.focus.item() else {
            return Ok(CommandStatus::enabled_if(false));
        };
        let count = real_items(ctx.model, ctx.model.owner(item)?)?.len();
        Ok(CommandStatus::enabled_if(count >= min))
    })
}

/// Enabled when there is something to select.
fn select_all() -> StatusFn {
    Rc::new(|ctx: &StatusContext<'_>| -> anyhow::Result<CommandStatus> {
        Ok(CommandStatus::enabled_if(!ctx.focus.is_none()))
    })
}

/// Enabled when the focus has a parent to move to.
fn parent_available() -> StatusFn {
    Rc::new(|ctx: &StatusContext<'_>| -> anyhow::Result<CommandStatus> {
        let enabled = match ctx.focus {
            FocusToken::Item(_) => true,
            FocusToken::Control(c) => ctx.model.control(c)?.parent().is_some(),
            FocusToken::NoSelection => false,
        };
        Ok(CommandStatus::enabled_if(enabled))
    })
}

impl KeyboardCommands {
    /// Build the command set, registering every command's status function
    /// with `cache`.
    pub fn new(config: NavigationConfig, cache: CommandCache) -> Self {
        let min = config.min_items_for_home_end;
        let handles = KeyCommand::all()
            .into_iter()
            .map(|cmd| {
                let status_fn = match cmd.handler() {
                    RANGE_AVAILABLE => range_available(min),
                    SELECT_ALL => select_all(),
                    PARENT_AVAILABLE => parent_available(),
                    _ => item_focused(),
                };
                (cmd, cache.register(cmd.handler(), status_fn))
            })
            .collect();
        Self {
            config,
            cache,
            handles,
            range: RangeAccumulator::new(),
            designer_focus: None,
            override_hook: None,
        }
    }

    /// Return the navigation settings.
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Return the status cache.
    pub fn cache(&self) -> &CommandCache {
        &self.cache
    }

    /// Return the range accumulator.
    pub fn range(&self) -> &RangeAccumulator {
        &self.range
    }

    /// Return the registered commands.
    pub fn commands(&self) -> impl Iterator<Item = KeyCommand> + '_ {
        self.handles.iter().map(|(c, _)| *c)
    }

    /// Return the template node holding design focus, if any.
    pub fn designer_focus(&self) -> Option<ItemId> {
        self.designer_focus
    }

    /// Move design focus onto or off a template node. Status answers depend
    /// on it without a selection version bump, so the cache is dropped.
    fn set_designer_focus(&mut self, focus: Option<ItemId>) {
        if self.designer_focus != focus {
            self.designer_focus = focus;
            self.cache.reset();
        }
    }

    /// Install or remove the override hook.
    pub fn set_override(&mut self, hook: Option<Box<dyn CommandOverride>>) {
        self.override_hook = hook;
    }

    /// Return the token commands start from: the primary selection, or the
    /// template node holding design focus when nothing is selected.
    pub fn focus(&self, selection: &dyn SelectionAuthority) -> FocusToken {
        match selection.primary() {
            FocusToken::NoSelection => self
                .designer_focus
                .map_or(FocusToken::NoSelection, FocusToken::Item),
            primary => primary,
        }
    }

    /// Return the status of a command.
    pub fn status(
        &self,
        command: KeyCommand,
        model: &Model,
        selection: &dyn SelectionAuthority,
    ) -> std::result::Result<CommandStatus, CommandError> {
        let ctx = StatusContext {
            selection,
            model,
            focus: self.focus(selection),
        };
        self.cache.get_status(command.handler(), &ctx)
    }

    /// Run a command. The override hook gets the first chance to claim it.
    /// Cancellations are silent; any other failure is logged, resets the
    /// status cache, and is returned.
    pub fn invoke(
        &mut self,
        command: KeyCommand,
        surface: &mut Surface<'_>,
    ) -> std::result::Result<InvokeOutcome, CommandError> {
        let result = match self.override_hook.as_mut().map(|h| h.intercept(command)) {
            Some(Ok(true)) => {
                debug!(%command, "command claimed by override");
                return Ok(InvokeOutcome::Overridden);
            }
            Some(Err(e)) => Err(CommandError::classify(e)),
            Some(Ok(false)) | None => self.execute(command, surface),
        };
        match result {
            Ok(outcome) => Ok(outcome),
            Err(CommandError::Cancelled) => {
                debug!(%command, "command cancelled by the user");
                Ok(InvokeOutcome::Cancelled)
            }
            Err(e) => {
                error!(%command, error = %e, "command failed");
                self.cache.reset();
                Err(e)
            }
        }
    }

    /// Run the default handler for a command.
    fn execute(
        &mut self,
        command: KeyCommand,
        s: &mut Surface<'_>,
    ) -> std::result::Result<InvokeOutcome, CommandError> {
        let extend = command.extends();
        // An extend chord continues from its cursor.
        let current = match (extend, self.range.cursor(s.selection.current_version())) {
            (true, Some(cursor)) => FocusToken::Item(cursor),
            _ => self.focus(&*s.selection),
        };
        let mut close = None;
        let target = {
            let resolver = Resolver::new(&*s.model, &self.config);
            match command {
                KeyCommand::Move(d) | KeyCommand::Nudge(d) | KeyCommand::Extend(d) => {
                    resolver.try_resolve(current, Motion::Arrow(d), extend)?
                }
                KeyCommand::SelectNext => {
                    resolver.try_resolve(current, Motion::Tab { forward: true }, false)?
                }
                KeyCommand::SelectPrevious => {
                    resolver.try_resolve(current, Motion::Tab { forward: false }, false)?
                }
                KeyCommand::Home | KeyCommand::ExtendHome => {
                    match self.home_end(s.model, current, Step::Backward)? {
                        Some(t) => t,
                        None => return Ok(InvokeOutcome::Unchanged),
                    }
                }
                KeyCommand::End | KeyCommand::ExtendEnd => {
                    match self.home_end(s.model, current, Step::Forward)? {
                        Some(t) => t,
                        None => return Ok(InvokeOutcome::Unchanged),
                    }
                }
                KeyCommand::SelectAll => return self.select_all(current, s),
                KeyCommand::Cancel => {
                    let (target, closing) = rotate_parent(s.model, current)?;
                    close = closing;
                    target
                }
                KeyCommand::ReverseCancel => rotate_child(&resolver, current)?,
            }
        };
        self.apply_target(current, target, extend, close, s)
    }

    /// Home and End: the first or last real item of the focused item's
    /// container, if it holds enough items.
    fn home_end(&self, model: &Model, current: FocusToken, step: Step) -> Result<Option<FocusToken>> {
        let Some(item) = current.item() else {
            return Ok(None);
        };
        let items = real_items(model, model.owner(item)?)?;
        if items.len() < self.config.min_items_for_home_end {
            return Ok(None);
        }
        let target = match step {
            Step::Forward => items.last(),
            Step::Backward => items.first(),
        };
        Ok(target.map(|id| FocusToken::Item(*id)))
    }

    /// Select every item of the focused container, or every sited child of
    /// a focused control.
    fn select_all(
        &mut self,
        current: FocusToken,
        s: &mut Surface<'_>,
    ) -> std::result::Result<InvokeOutcome, CommandError> {
        let model = &*s.model;
        let mut tokens: Vec<FocusToken> = match current {
            FocusToken::NoSelection => return Ok(InvokeOutcome::Unchanged),
            FocusToken::Item(id) => {
                let owner = model.owner(id)?;
                let scope = match model.container(owner)?.kind() {
                    ContainerKind::Overflow => model.root_strip(owner)?.unwrap_or(owner),
                    ContainerKind::Strip | ContainerKind::Dropdown => owner,
                };
                strip_items(model, scope)?
            }
            FocusToken::Control(c) => {
                let control = model.control(c)?;
                match control.strip() {
                    Some(strip) => strip_items(model, strip)?,
                    None => control
                        .children()
                        .iter()
                        .filter(|child| model.control(**child).is_ok_and(|c| c.sited()))
                        .map(|child| FocusToken::Control(*child))
                        .collect(),
                }
            }
        };
        if tokens.is_empty() {
            return Ok(InvokeOutcome::Unchanged);
        }
        if let Some(pos) = tokens.iter().position(|t| *t == current) {
            let t = tokens.remove(pos);
            tokens.insert(0, t);
        }
        self.range.clear();
        self.set_designer_focus(None);
        s.selection.set_selected(&tokens, SelectionMode::Replace);
        debug!(count = tokens.len(), "selected all");
        Ok(InvokeOutcome::Moved(tokens[0]))
    }

    /// Move design focus to `target`, opening any closed dropdown on the way
    /// inside a transaction, then update the selection.
    fn apply_target(
        &mut self,
        start: FocusToken,
        target: FocusToken,
        extend: bool,
        close: Option<ContainerId>,
        s: &mut Surface<'_>,
    ) -> std::result::Result<InvokeOutcome, CommandError> {
        if target.is_none() || (target == start && close.is_none()) {
            return Ok(InvokeOutcome::Unchanged);
        }
        let target = self.reveal_overflow(s.model, target, extend)?;

        let template = match target.item() {
            Some(id) => s.model.item(id)?.is_template(),
            None => false,
        };
        if template && extend {
            return Ok(InvokeOutcome::Unchanged);
        }

        let opening = match target.item() {
            Some(id) => closed_ancestors(s.model, id)?,
            None => Vec::new(),
        };
        if !opening.is_empty() || close.is_some() {
            with_transaction(&mut *s.transactions, &mut *s.model, "keyboard navigation", |model, rb| {
                if let Some(c) = close {
                    rb.set_open(model, c, false)?;
                }
                for c in &opening {
                    rb.set_open(model, *c, true)?;
                }
                Ok(())
            })
            .map_err(CommandError::classify)?;
        }

        if let (true, Some(id)) = (template, target.item()) {
            self.range.clear();
            self.set_designer_focus(Some(id));
            s.selection.set_selected(&[], SelectionMode::Replace);
            debug!(?id, "template node holds design focus");
            return Ok(InvokeOutcome::Moved(target));
        }

        let version = s.selection.current_version();
        let Some(update) = self
            .range
            .accumulate(s.model, start, target, extend, version)?
        else {
            return Ok(InvokeOutcome::Unchanged);
        };
        self.set_designer_focus(None);
        s.selection.set_selected(&update.tokens, SelectionMode::Replace);
        self.range.stamp(s.selection.current_version());
        debug!(?start, target = ?update.target(), extended = update.extended, "focus moved");
        Ok(InvokeOutcome::Moved(update.target()))
    }

    /// Selecting an overflow button moves into its overflow instead.
    fn reveal_overflow(&self, model: &Model, target: FocusToken, extend: bool) -> Result<FocusToken> {
        let Some(id) = target.item() else {
            return Ok(target);
        };
        let item = model.item(id)?;
        if extend || item.kind() != ItemKind::OverflowButton {
            return Ok(target);
        }
        let Some(overflow) = item.dropdown() else {
            return Ok(target);
        };
        let first = Resolver::new(model, &self.config).boundary_item(overflow, Step::Forward)?;
        Ok(first.map_or(target, FocusToken::Item))
    }

    /// Forget state that references removed items or containers.
    pub fn on_removed(&mut self, removed: &Removed) {
        for id in &removed.items {
            self.range.forget_item(*id);
            if self.designer_focus == Some(*id) {
                self.set_designer_focus(None);
            }
        }
        for id in &removed.containers {
            self.range.forget_container(*id);
        }
    }

    /// Forget chord and designer focus state whose nodes are gone from
    /// `model`, for edits that removed nodes without reporting them.
    pub fn prune(&mut self, model: &Model) {
        self.range.retain_live(model);
        if self.designer_focus.is_some_and(|id| !model.contains_item(id)) {
            self.set_designer_focus(None);
        }
    }

    /// Write a table of commands, their status handlers and cache state.
    pub fn print_command_table(&self, w: &mut dyn Write) -> Result<()> {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["command", "handler", "refs", "state", "stamp", "enabled"]);
        for (cmd, handle) in &self.handles {
            let Some(entry) = self.cache.entry(handle.handler()) else {
                continue;
            };
            table.add_row(vec![
                comfy_table::Cell::new(cmd.id().0).fg(comfy_table::Color::Green),
                comfy_table::Cell::new(entry.handler.0),
                comfy_table::Cell::new(entry.ref_count),
                comfy_table::Cell::new(entry.state),
                comfy_table::Cell::new(
                    entry
                        .stamped_version
                        .map_or_else(|| "-".to_string(), |v| v.to_string()),
                ),
                comfy_table::Cell::new(entry.flags.enabled),
            ]);
        }
        writeln!(w, "{table}").map_err(|x| error::Error::Internal(x.to_string()))
    }
}

/// Items of a strip with its overflow items spliced in at the trigger, or
/// the items of any other container.
fn strip_items(model: &Model, container: ContainerId) -> Result<Vec<FocusToken>> {
    let mut out = Vec::new();
    for id in model.items(container)? {
        let item = model.item(*id)?;
        match item.kind() {
            ItemKind::Item if !item.hidden() => out.push(FocusToken::Item(*id)),
            ItemKind::OverflowButton => {
                if let Some(overflow) = item.dropdown() {
                    out.extend(real_items(model, overflow)?.into_iter().map(FocusToken::Item));
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Dropdowns and overflows between `item` and its strip that are closed,
/// outermost first.
fn closed_ancestors(model: &Model, item: ItemId) -> Result<Vec<ContainerId>> {
    let mut out = Vec::new();
    let mut current = model.owner(item)?;
    for _ in 0..=model.containers.len() {
        let container = model.container(current)?;
        if !container.is_drop_down() {
            break;
        }
        if !container.is_open() {
            out.push(current);
        }
        match container.owner_item() {
            Some(owner) => current = model.owner(owner)?,
            None => break,
        }
    }
    out.reverse();
    Ok(out)
}

/// Escape: the parent of the focus, plus an overflow to close on the way.
fn rotate_parent(model: &Model, current: FocusToken) -> Result<(FocusToken, Option<ContainerId>)> {
    match current {
        FocusToken::NoSelection => Ok((
            model.root().map_or(FocusToken::NoSelection, FocusToken::Control),
            None,
        )),
        FocusToken::Item(id) => {
            let owner = model.owner(id)?;
            let container = model.container(owner)?;
            match container.kind() {
                ContainerKind::Dropdown => Ok((
                    container.owner_item().map_or(current, FocusToken::Item),
                    None,
                )),
                ContainerKind::Overflow => match model.root_strip(owner)? {
                    Some(strip) => Ok((host_token(model, strip, current)?, Some(owner))),
                    None => Ok((current, None)),
                },
                ContainerKind::Strip => Ok((host_token(model, owner, current)?, None)),
            }
        }
        FocusToken::Control(c) => {
            let parent = model
                .control(c)?
                .parent()
                .filter(|p| model.control(*p).is_ok_and(|p| p.sited()));
            Ok((parent.map_or(current, FocusToken::Control), None))
        }
    }
}

/// The host control of a strip, or `fallback`.
fn host_token(model: &Model, strip: ContainerId, fallback: FocusToken) -> Result<FocusToken> {
    Ok(model
        .container(strip)?
        .host()
        .map_or(fallback, FocusToken::Control))
}

/// Shift-escape: the first child of the focus.
fn rotate_child(resolver: &Resolver<'_>, current: FocusToken) -> Result<FocusToken> {
    let model = resolver.model;
    match current {
        FocusToken::NoSelection => Ok(model.root().map_or(current, FocusToken::Control)),
        FocusToken::Item(id) => Ok(resolver
            .entry_point(id, Step::Forward)?
            .map_or(current, FocusToken::Item)),
        FocusToken::Control(c) => {
            let control = model.control(c)?;
            if let Some(strip) = control.strip() {
                return Ok(resolver
                    .boundary_item(strip, Step::Forward)?
                    .map_or(current, FocusToken::Item));
            }
            Ok(first_child(model, c)?.map_or(current, FocusToken::Control))
        }
    }
}

/// The sited child with the lowest tab index, first in z-order on ties.
fn first_child(model: &Model, control: ControlId) -> Result<Option<ControlId>> {
    let mut best: Option<(i32, ControlId)> = None;
    for child in model.control(control)?.children() {
        let c = model.control(*child)?;
        if c.sited() && best.is_none_or(|(tab, _)| c.tab_index() < tab) {
            best = Some((c.tab_index(), *child));
        }
    }
    Ok(best.map(|(_, id)| id))
}
