//! Command kinds and the selection-versioned status cache.
//!
//! Status functions compute a command's enabled/visible/checked flags. Many
//! commands share one function, so entries are keyed by [`HandlerId`] and
//! reference counted through [`StatusHandle`]s. An entry is served from the
//! cache only while its stamp matches the selection version in effect.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt, mem,
    rc::{Rc, Weak},
};

use thiserror::Error;
use tracing::{error, trace};

use crate::core::{
    error::Error,
    id::{FocusToken, SelectionVersion},
    model::Model,
    navigation::Direction,
    selection::SelectionAuthority,
};

/// Identifier of a keyboard command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub &'static str);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a status function shared by one or more commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub &'static str);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The keyboard commands a design surface routes to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCommand {
    /// Arrow key.
    Move(Direction),
    /// Control-arrow. Navigates like `Move`.
    Nudge(Direction),
    /// Shift-arrow: move and extend the range.
    Extend(Direction),
    /// Tab.
    SelectNext,
    /// Shift-tab.
    SelectPrevious,
    /// First item of the current container.
    Home,
    /// Last item of the current container.
    End,
    /// Extend the range to the first item.
    ExtendHome,
    /// Extend the range to the last item.
    ExtendEnd,
    /// Select every item of the current container.
    SelectAll,
    /// Escape: move to the parent.
    Cancel,
    /// Shift-escape: move to the first child.
    ReverseCancel,
}

/// Status function shared by every focus-dependent navigation command.
pub const ITEM_FOCUSED: HandlerId = HandlerId("item-focused");
/// Status function for Home/End and their extend forms.
pub const RANGE_AVAILABLE: HandlerId = HandlerId("range-available");
/// Status function for select-all.
pub const SELECT_ALL: HandlerId = HandlerId("select-all");
/// Status function for cancel and reverse cancel.
pub const PARENT_AVAILABLE: HandlerId = HandlerId("parent-available");

impl KeyCommand {
    /// Every command, in menu order.
    pub fn all() -> Vec<Self> {
        let mut out = Vec::new();
        for d in Direction::ALL {
            out.push(Self::Move(d));
        }
        for d in Direction::ALL {
            out.push(Self::Nudge(d));
        }
        for d in Direction::ALL {
            out.push(Self::Extend(d));
        }
        out.extend([
            Self::SelectNext,
            Self::SelectPrevious,
            Self::Home,
            Self::End,
            Self::ExtendHome,
            Self::ExtendEnd,
            Self::SelectAll,
            Self::Cancel,
            Self::ReverseCancel,
        ]);
        out
    }

    /// Return the command identifier.
    pub fn id(self) -> CommandId {
        use Direction::*;
        CommandId(match self {
            Self::Move(Up) => "key-move-up",
            Self::Move(Down) => "key-move-down",
            Self::Move(Left) => "key-move-left",
            Self::Move(Right) => "key-move-right",
            Self::Nudge(Up) => "key-nudge-up",
            Self::Nudge(Down) => "key-nudge-down",
            Self::Nudge(Left) => "key-nudge-left",
            Self::Nudge(Right) => "key-nudge-right",
            Self::Extend(Up) => "key-extend-up",
            Self::Extend(Down) => "key-extend-down",
            Self::Extend(Left) => "key-extend-left",
            Self::Extend(Right) => "key-extend-right",
            Self::SelectNext => "key-select-next",
            Self::SelectPrevious => "key-select-previous",
            Self::Home => "key-home",
            Self::End => "key-end",
            Self::ExtendHome => "key-extend-home",
            Self::ExtendEnd => "key-extend-end",
            Self::SelectAll => "select-all",
            Self::Cancel => "key-cancel",
            Self::ReverseCancel => "key-reverse-cancel",
        })
    }

    /// Return the status function this command is gated on.
    pub fn handler(self) -> HandlerId {
        match self {
            Self::Move(_)
            | Self::Nudge(_)
            | Self::Extend(_)
            | Self::SelectNext
            | Self::SelectPrevious => ITEM_FOCUSED,
            Self::Home | Self::End | Self::ExtendHome | Self::ExtendEnd => RANGE_AVAILABLE,
            Self::SelectAll => SELECT_ALL,
            Self::Cancel | Self::ReverseCancel => PARENT_AVAILABLE,
        }
    }

    /// Does the command hold the range modifier?
    pub fn extends(self) -> bool {
        matches!(self, Self::Extend(_) | Self::ExtendHome | Self::ExtendEnd)
    }
}

impl fmt::Display for KeyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Marker error returned (inside `anyhow::Error`) by a status function,
/// handler or transaction collaborator when the user cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled by the user")]
pub struct Cancelled;

/// Errors from the command layer.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No status function is registered under this id.
    #[error("unknown status handler: {0}")]
    UnknownHandler(HandlerId),

    /// The user cancelled the operation.
    #[error("operation cancelled by the user")]
    Cancelled,

    /// A status function or handler failed unexpectedly.
    #[error("handler fault: {0}")]
    HandlerFault(#[source] anyhow::Error),

    /// The model was inconsistent.
    #[error(transparent)]
    Core(#[from] Error),
}

impl CommandError {
    /// Classify a collaborator error as a cancellation or a fault.
    pub fn classify(err: anyhow::Error) -> Self {
        if err.is::<Cancelled>() {
            Self::Cancelled
        } else {
            match err.downcast::<Error>() {
                Ok(core) => Self::Core(core),
                Err(err) => Self::HandlerFault(err),
            }
        }
    }

    /// Is this a user cancellation?
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Flags computed by a status function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandStatus {
    /// The command can run.
    pub enabled: bool,
    /// The command is shown.
    pub visible: bool,
    /// The command shows a check mark.
    pub checked: bool,
    /// The command is handled at all.
    pub supported: bool,
}

impl CommandStatus {
    /// Supported, visible, and enabled iff `enabled`.
    pub fn enabled_if(enabled: bool) -> Self {
        Self {
            enabled,
            visible: true,
            checked: false,
            supported: true,
        }
    }
}

/// Read-only view handed to status functions.
#[derive(Clone, Copy)]
pub struct StatusContext<'a> {
    /// The selection authority.
    pub selection: &'a dyn SelectionAuthority,
    /// The model.
    pub model: &'a Model,
    /// Current design focus, which may name an unsited node.
    pub focus: FocusToken,
}

impl fmt::Debug for StatusContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusContext")
            .field("version", &self.selection.current_version())
            .field("focus", &self.focus)
            .finish()
    }
}

/// A status function.
pub type StatusFn = Rc<dyn Fn(&StatusContext<'_>) -> anyhow::Result<CommandStatus>>;

/// Per-entry state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheState {
    /// Needs computing on the next query.
    Idle,
    /// The status function is running.
    Computing,
    /// Flags are valid for the stamped version.
    Cached,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Computing => "computing",
            Self::Cached => "cached",
        })
    }
}

/// One cache slot.
struct StatusEntry {
    /// Last computed flags.
    flags: CommandStatus,
    /// Version the flags were computed at.
    stamped_version: Option<SelectionVersion>,
    /// Live registrations.
    ref_count: u32,
    /// State machine position.
    state: CacheState,
    /// Number of times the status function ran.
    computations: u64,
    /// The shared status function.
    status_fn: StatusFn,
}

/// Read-only snapshot of a cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySnapshot {
    /// Handler id.
    pub handler: HandlerId,
    /// Last computed flags.
    pub flags: CommandStatus,
    /// Version the flags were computed at.
    pub stamped_version: Option<SelectionVersion>,
    /// Live registrations.
    pub ref_count: u32,
    /// State.
    pub state: CacheState,
    /// Number of times the status function ran.
    pub computations: u64,
}

/// Cache slots.
#[derive(Default)]
struct CacheInner {
    /// Entries by handler.
    entries: BTreeMap<HandlerId, StatusEntry>,
}

impl CacheInner {
    /// Drop one registration of `handler`. Returns the slot if that was its
    /// last registration; the caller drops it once the borrow is released.
    fn release(&mut self, handler: HandlerId) -> Option<StatusEntry> {
        let entry = self.entries.get_mut(&handler)?;
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            return None;
        }
        trace!(%handler, "status entry released");
        self.entries.remove(&handler)
    }
}

/// Storage shared between a cache, its clones and its handles.
#[derive(Default)]
struct Shared {
    /// Cache slots.
    inner: RefCell<CacheInner>,
    /// Releases from handles dropped while `inner` was borrowed. Applied on
    /// the next cache access.
    deferred: RefCell<Vec<HandlerId>>,
}

/// Selection-versioned memo of command status flags.
#[derive(Clone, Default)]
pub struct CommandCache {
    /// Shared storage. Handles hold weak references to it.
    shared: Rc<Shared>,
}

impl fmt::Debug for CommandCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCache")
            .field("entries", &self.entries())
            .finish()
    }
}

/// Registration of one command against a cache slot. Dropping the handle
/// unregisters it; the slot is removed with its last handle.
pub struct StatusHandle {
    /// Cache the handle belongs to.
    cache: Weak<Shared>,
    /// Slot key.
    handler: HandlerId,
}

impl StatusHandle {
    /// Return the handler this handle keeps alive.
    pub fn handler(&self) -> HandlerId {
        self.handler
    }
}

impl fmt::Debug for StatusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusHandle").field(&self.handler).finish()
    }
}

impl Drop for StatusHandle {
    fn drop(&mut self) {
        let Some(shared) = self.cache.upgrade() else {
            return;
        };
        let released = match shared.inner.try_borrow_mut() {
            Ok(mut inner) => inner.release(self.handler),
            Err(_) => {
                trace!(handler = %self.handler, "status handle release deferred");
                shared.deferred.borrow_mut().push(self.handler);
                None
            }
        };
        drop(released);
    }
}

impl CommandCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply releases deferred by handles dropped mid-access. Slots freed
    /// here are dropped outside the borrow, so handles they own release
    /// directly.
    fn settle(&self) {
        loop {
            let pending = mem::take(&mut *self.shared.deferred.borrow_mut());
            if pending.is_empty() {
                return;
            }
            let released: Vec<StatusEntry> = {
                let mut inner = self.shared.inner.borrow_mut();
                pending
                    .into_iter()
                    .filter_map(|handler| inner.release(handler))
                    .collect()
            };
            drop(released);
        }
    }

    /// Register a command's status function under `handler`. Commands that
    /// share a handler share one slot; the first registered function is kept.
    pub fn register(&self, handler: HandlerId, status_fn: StatusFn) -> StatusHandle {
        self.settle();
        let unused = {
            let mut inner = self.shared.inner.borrow_mut();
            match inner.entries.get_mut(&handler) {
                Some(entry) => {
                    entry.ref_count += 1;
                    Some(status_fn)
                }
                None => {
                    inner.entries.insert(
                        handler,
                        StatusEntry {
                            flags: CommandStatus::default(),
                            stamped_version: None,
                            ref_count: 1,
                            state: CacheState::Idle,
                            computations: 0,
                            status_fn,
                        },
                    );
                    None
                }
            }
        };
        drop(unused);
        StatusHandle {
            cache: Rc::downgrade(&self.shared),
            handler,
        }
    }

    /// Subscribe to a selection authority so cached entries go idle as soon
    /// as the version moves.
    pub fn attach(&self, selection: &mut dyn SelectionAuthority) {
        let weak = Rc::downgrade(&self.shared);
        selection.on_selection_changed(Box::new(move |version| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            // A change raised from inside a status function is picked up by
            // the stamp comparison instead.
            if let Ok(mut inner) = shared.inner.try_borrow_mut() {
                for entry in inner.entries.values_mut() {
                    if entry.state == CacheState::Cached && entry.stamped_version != Some(version)
                    {
                        entry.state = CacheState::Idle;
                    }
                }
            }
        }));
    }

    /// Return the status flags for `handler` at the context's selection
    /// version, computing them at most once per version.
    pub fn get_status(
        &self,
        handler: HandlerId,
        ctx: &StatusContext<'_>,
    ) -> Result<CommandStatus, CommandError> {
        self.settle();
        let version = ctx.selection.current_version();
        let status_fn = {
            let mut inner = self.shared.inner.borrow_mut();
            let entry = inner
                .entries
                .get_mut(&handler)
                .ok_or(CommandError::UnknownHandler(handler))?;
            match entry.state {
                CacheState::Cached if entry.stamped_version == Some(version) => {
                    trace!(%handler, %version, "status cache hit");
                    return Ok(entry.flags);
                }
                CacheState::Computing => {
                    trace!(%handler, "re-entrant status query");
                    return Ok(entry.flags);
                }
                CacheState::Cached | CacheState::Idle => {}
            }
            entry.state = CacheState::Computing;
            entry.status_fn.clone()
        };

        // Leave no entry stuck in Computing if the status function unwinds.
        let weak = Rc::downgrade(&self.shared);
        let _reset = scopeguard::guard((), move |_| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let Ok(mut inner) = shared.inner.try_borrow_mut() else {
                return;
            };
            if let Some(entry) = inner.entries.get_mut(&handler) {
                if entry.state == CacheState::Computing {
                    entry.state = CacheState::Idle;
                }
            }
        });

        let result = status_fn(ctx);

        let mut inner = self.shared.inner.borrow_mut();
        let entry = inner.entries.get_mut(&handler);
        match result {
            Ok(flags) => {
                if let Some(entry) = entry {
                    entry.flags = flags;
                    entry.stamped_version = Some(version);
                    entry.state = CacheState::Cached;
                    entry.computations += 1;
                }
                Ok(flags)
            }
            Err(err) => {
                if let Some(entry) = entry {
                    entry.state = CacheState::Idle;
                    entry.computations += 1;
                }
                match CommandError::classify(err) {
                    CommandError::Cancelled => {
                        trace!(%handler, "status query cancelled");
                        Ok(CommandStatus::default())
                    }
                    other => {
                        error!(%handler, error = %other, "status function failed");
                        Err(other)
                    }
                }
            }
        }
    }

    /// Drop every cached answer. Registrations survive.
    pub fn reset(&self) {
        self.settle();
        let mut inner = self.shared.inner.borrow_mut();
        for entry in inner.entries.values_mut() {
            entry.state = CacheState::Idle;
            entry.stamped_version = None;
        }
    }

    /// Number of live slots.
    pub fn entry_count(&self) -> usize {
        self.settle();
        self.shared.inner.borrow().entries.len()
    }

    /// Live registrations for a handler.
    pub fn ref_count(&self, handler: HandlerId) -> u32 {
        self.settle();
        self.shared
            .inner
            .borrow()
            .entries
            .get(&handler)
            .map_or(0, |e| e.ref_count)
    }

    /// Snapshot a single slot.
    pub fn entry(&self, handler: HandlerId) -> Option<EntrySnapshot> {
        self.settle();
        self.shared
            .inner
            .borrow()
            .entries
            .get(&handler)
            .map(|e| snapshot(handler, e))
    }

    /// Snapshot every slot, ordered by handler id.
    pub fn entries(&self) -> Vec<EntrySnapshot> {
        self.settle();
        self.shared
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(h, e)| snapshot(*h, e))
            .collect()
    }
}

/// Build a snapshot of a slot.
fn snapshot(handler: HandlerId, e: &StatusEntry) -> EntrySnapshot {
    EntrySnapshot {
        handler,
        flags: e.flags,
        stamped_version: e.stamped_version,
        ref_count: e.ref_count,
        state: e.state,
        computations: e.computations,
    }
}
