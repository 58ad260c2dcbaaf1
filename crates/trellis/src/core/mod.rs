//! The focus-navigation and command-status engine.

/// Command kinds, status handles and the status cache.
pub mod commands;
/// Navigation settings.
pub mod config;
/// Debug dump utilities.
pub mod dump;
/// Core error types.
pub mod error;
/// Arena keys, focus tokens and selection versions.
pub mod id;
/// The keyboard command set.
pub mod keyboard;
/// Items, containers and controls.
pub mod model;
/// Directional navigation.
pub mod navigation;
/// Shift-chord range accumulation.
pub mod range;
/// The selection authority contract.
pub mod selection;
/// The design-session context.
pub mod session;
/// Tab rotation.
pub mod tab;
/// Testing utilities.
#[cfg(any(test, feature = "testing"))]
pub mod testing;
/// Undo journal contract.
pub mod transaction;

pub use commands::{CommandCache, CommandError, CommandStatus, KeyCommand, StatusHandle};
pub use config::NavigationConfig;
pub use id::{ContainerId, ControlId, FocusToken, ItemId, SelectionVersion};
pub use keyboard::{InvokeOutcome, KeyboardCommands};
pub use model::Model;
pub use navigation::{Direction, Motion, Resolver};
pub use range::RangeAccumulator;
pub use selection::{Selection, SelectionAuthority, SelectionMode};
pub use session::DesignSession;
