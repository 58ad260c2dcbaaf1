//! Trellis: keyboard navigation for strip and menu designers.
//!
//! Trellis resolves arrow and tab keys against a tree of strips, dropdowns
//! and overflows, turns shift-held moves into contiguous range selections,
//! and caches command status between selection changes.
//!
//! # Quick Start
//!
//! The main entry points are:
//! - [`DesignSession`] - Owns the model, selection, cache and command set
//! - [`Resolver`] - Pure navigation over a [`Model`] snapshot
//! - [`CommandCache`] - Version-stamped status memoization
//!
//! # Module Organization
//!
//! - [`model`] - The arena of items, containers and controls
//! - [`navigation`] and [`tab`] - Focus resolution
//! - [`range`] - Shift-chord range selection
//! - [`commands`] and [`keyboard`] - Command status and dispatch
//! - `testing` - Fixtures and a recording undo journal, behind the
//!   `testing` feature

#![warn(missing_docs)]

mod core;

pub use crate::core::{
    CommandCache, CommandError, CommandStatus, ContainerId, ControlId, DesignSession, Direction,
    FocusToken, InvokeOutcome, ItemId, KeyCommand, KeyboardCommands, Model, Motion,
    NavigationConfig, RangeAccumulator, Resolver, Selection, SelectionAuthority, SelectionMode,
    SelectionVersion, StatusHandle,
};
pub use crate::core::{
    commands, config, dump, error, id, keyboard, model, navigation, range, selection, session, tab,
    transaction,
};
#[cfg(any(test, feature = "testing"))]
pub use crate::core::testing;
pub use crate::core::error::{Error, Result};
