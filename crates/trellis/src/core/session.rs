use std::io::Write;

use tracing::debug;

use crate::core::{
    commands::{CommandCache, CommandError, CommandStatus, KeyCommand},
    config::NavigationConfig,
    dump,
    error::Result,
    id::{ContainerId, FocusToken, ItemId},
    keyboard::{CommandOverride, InvokeOutcome, KeyboardCommands, Surface},
    model::{Model, Removed},
    navigation::{Direction, Resolver},
    selection::{Selection, SelectionAuthority, SelectionMode},
    transaction::{ChangeTransactions, NoTransactions},
};

/// A design session: the model under edit, its selection, the status cache
/// and the keyboard command set, wired together.
#[derive(Debug)]
pub struct DesignSession<T: ChangeTransactions = NoTransactions> {
    /// The model being edited.
    model: Model,
    /// The selection authority.
    selection: Selection,
    /// Status cache shared with the command set.
    cache: CommandCache,
    /// Keyboard commands.
    keyboard: KeyboardCommands,
    /// Undo journal.
    transactions: T,
}

impl DesignSession<NoTransactions> {
    /// Start a session without an undo journal.
    pub fn new(model: Model, config: NavigationConfig) -> Self {
        Self::with_transactions(model, config, NoTransactions)
    }
}

impl<T: ChangeTransactions> DesignSession<T> {
    /// Start a session recording mutations in `transactions`.
    pub fn with_transactions(model: Model, config: NavigationConfig, transactions: T) -> Self {
        let mut selection = Selection::new();
        let cache = CommandCache::new();
        cache.attach(&mut selection);
        let keyboard = KeyboardCommands::new(config, cache.clone());
        Self {
            model,
            selection,
            cache,
            keyboard,
            transactions,
        }
    }

    /// Return the model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Apply a structural edit to the model. Cached status answers are
    /// dropped afterwards, and if the edit changed the structure, so is any
    /// selection or chord state pointing at nodes it removed.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Model) -> R) -> R {
        let generation = self.model.generation();
        let r = f(&mut self.model);
        if self.model.generation() != generation {
            self.prune();
        }
        self.cache.reset();
        r
    }

    /// Drop selected tokens and keyboard state whose nodes have left the
    /// model.
    fn prune(&mut self) {
        self.keyboard.prune(&self.model);
        let model = &self.model;
        let dead: Vec<FocusToken> = self
            .selection
            .selected_set()
            .into_iter()
            .filter(|t| match t {
                FocusToken::Item(id) => !model.contains_item(*id),
                FocusToken::Control(id) => model.control(*id).is_err(),
                FocusToken::NoSelection => false,
            })
            .collect();
        if !dead.is_empty() {
            debug!(count = dead.len(), "dropped removed nodes from the selection");
            self.selection.set_selected(&dead, SelectionMode::Remove);
        }
    }

    /// Return the selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the selection from outside the keyboard, as a mouse click
    /// would.
    pub fn select(&mut self, tokens: &[FocusToken]) {
        self.selection.set_selected(tokens, SelectionMode::Replace);
    }

    /// Return the status cache.
    pub fn cache(&self) -> &CommandCache {
        &self.cache
    }

    /// Return the keyboard command set.
    pub fn keyboard(&self) -> &KeyboardCommands {
        &self.keyboard
    }

    /// Return the undo journal.
    pub fn transactions(&self) -> &T {
        &self.transactions
    }

    /// Return the undo journal mutably.
    pub fn transactions_mut(&mut self) -> &mut T {
        &mut self.transactions
    }

    /// Return the current design focus.
    pub fn focus(&self) -> FocusToken {
        self.keyboard.focus(&self.selection)
    }

    /// Resolve an arrow key from the current focus without applying it.
    pub fn resolve_direction(&self, direction: Direction, extend: bool) -> FocusToken {
        Resolver::new(&self.model, self.keyboard.config()).resolve_direction(
            self.focus(),
            direction,
            extend,
        )
    }

    /// Resolve tab or shift-tab from the current focus without applying it.
    pub fn resolve_tab(&self, forward: bool, extend: bool) -> FocusToken {
        Resolver::new(&self.model, self.keyboard.config()).resolve_tab(self.focus(), forward, extend)
    }

    /// Return the status of a command.
    pub fn status(&self, command: KeyCommand) -> std::result::Result<CommandStatus, CommandError> {
        self.keyboard.status(command, &self.model, &self.selection)
    }

    /// Run a command.
    pub fn invoke(&mut self, command: KeyCommand) -> std::result::Result<InvokeOutcome, CommandError> {
        let mut surface = Surface {
            model: &mut self.model,
            selection: &mut self.selection,
            transactions: &mut self.transactions,
        };
        self.keyboard.invoke(command, &mut surface)
    }

    /// Install or remove the command override hook.
    pub fn set_override(&mut self, hook: Option<Box<dyn CommandOverride>>) {
        self.keyboard.set_override(hook);
    }

    /// Remove an item and everything below it, notifying the selection and
    /// the command set.
    pub fn remove_item(&mut self, id: ItemId) -> Result<Removed> {
        let removed = self.model.remove_item(id)?;
        self.forget(&removed);
        Ok(removed)
    }

    /// Remove a container and everything below it, notifying the selection
    /// and the command set.
    pub fn remove_container(&mut self, id: ContainerId) -> Result<Removed> {
        let removed = self.model.remove_container(id)?;
        self.forget(&removed);
        Ok(removed)
    }

    /// Drop every reference to removed nodes.
    fn forget(&mut self, removed: &Removed) {
        self.keyboard.on_removed(removed);
        let tokens: Vec<FocusToken> = removed.items.iter().map(|i| FocusToken::Item(*i)).collect();
        self.selection.set_selected(&tokens, SelectionMode::Remove);
        self.cache.reset();
        debug!(
            items = removed.items.len(),
            containers = removed.containers.len(),
            "removed from model"
        );
    }

    /// Render the model with the focus marked.
    pub fn dump(&self, color: bool) -> Result<String> {
        dump::dump(&self.model, self.focus(), color)
    }

    /// Write the command table.
    pub fn print_command_table(&self, w: &mut dyn Write) -> Result<()> {
        self.keyboard.print_command_table(w)
    }
}
