//! Tree builders addressed by name.
//!
//! Lookups panic on unknown names; these helpers are for tests only.

use crate::core::{
    config::NavigationConfig,
    id::{ContainerId, ControlId, FocusToken, ItemId},
    model::Model,
    session::DesignSession,
    transaction::ChangeTransactions,
};

/// A form holding one strip, plus whatever the test adds.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// The model under construction.
    pub model: Model,
    /// Root form.
    pub root: ControlId,
    /// Control hosting the main strip.
    pub host: ControlId,
    /// The main strip.
    pub strip: ContainerId,
}

impl Fixture {
    /// A form with a strip, hosted at tab index 1, holding `names`.
    pub fn strip(names: &[&str]) -> Self {
        let mut model = Model::new();
        let root = model.add_root("form").expect("fresh model");
        let (host, strip) = model.add_strip(root, "strip", 1).expect("root exists");
        for name in names {
            model.add_item(strip, *name).expect("strip exists");
        }
        Self {
            model,
            root,
            host,
            strip,
        }
    }

    /// The menu used across the integration tests:
    ///
    /// ```text
    /// form
    ///     before (tab 0)
    ///     strip (tab 1): File, Edit, View
    ///         File: New, Open, Save
    ///     after (tab 2)
    /// tray: timer
    /// ```
    pub fn menu() -> Self {
        let mut f = Self::strip(&["File", "Edit", "View"]);
        f.control("before", 0);
        f.control("after", 2);
        f.dropdown("File", &["New", "Open", "Save"]);
        f.tray("timer");
        f
    }

    /// Look up an item by name.
    pub fn item(&self, name: &str) -> ItemId {
        self.model
            .find_item(name)
            .unwrap_or_else(|| panic!("no item named {name}"))
    }

    /// Token for an item by name.
    pub fn token(&self, name: &str) -> FocusToken {
        FocusToken::Item(self.item(name))
    }

    /// Look up a control by name.
    pub fn find_control(&self, name: &str) -> ControlId {
        self.model
            .find_control(name)
            .unwrap_or_else(|| panic!("no control named {name}"))
    }

    /// Add a child control of the form.
    pub fn control(&mut self, name: &str, tab_index: i32) -> ControlId {
        self.model
            .add_control(self.root, name, tab_index)
            .expect("root exists")
    }

    /// Add a tray component.
    pub fn tray(&mut self, name: &str) -> ControlId {
        self.model.add_tray_component(name)
    }

    /// Give the named item a closed dropdown holding `names`.
    pub fn dropdown(&mut self, owner: &str, names: &[&str]) -> ContainerId {
        let owner = self.item(owner);
        let dd = self.model.add_dropdown(owner).expect("owner exists");
        for name in names {
            self.model.add_item(dd, *name).expect("dropdown exists");
        }
        dd
    }

    /// Move the last `count` items of the main strip into its overflow.
    pub fn overflow(&mut self, count: usize) -> ContainerId {
        self.model
            .overflow_trailing(self.strip, count)
            .expect("strip exists");
        self.model
            .container(self.strip)
            .ok()
            .and_then(|c| c.overflow())
            .expect("overflow created")
    }

    /// Append a template node to a container.
    pub fn template(&mut self, container: ContainerId) -> ItemId {
        self.model
            .add_template_node(container)
            .expect("container exists")
    }

    /// Lay the main strip out right to left.
    pub fn rtl(&mut self) {
        self.model
            .set_right_to_left(self.strip, true)
            .expect("strip exists");
    }

    /// Start a session with default settings.
    pub fn session(self) -> DesignSession {
        DesignSession::new(self.model, NavigationConfig::default())
    }

    /// Start a session with custom settings and journal.
    pub fn session_with<T: ChangeTransactions>(
        self,
        config: NavigationConfig,
        transactions: T,
    ) -> DesignSession<T> {
        DesignSession::with_transactions(self.model, config, transactions)
    }
}

/// Name of whatever a token points at, for readable assertions.
pub fn name_of(model: &Model, token: FocusToken) -> String {
    match token {
        FocusToken::NoSelection => "<none>".to_string(),
        FocusToken::Item(id) => model
            .item(id)
            .map_or_else(|_| "<gone>".to_string(), |i| i.name().to_string()),
        FocusToken::Control(id) => model
            .control(id)
            .map_or_else(|_| "<gone>".to_string(), |c| c.name().to_string()),
    }
}

/// Names of a token list, sorted.
pub fn sorted_names(model: &Model, tokens: &[FocusToken]) -> Vec<String> {
    let mut names: Vec<String> = tokens.iter().map(|t| name_of(model, *t)).collect();
    names.sort();
    names
}
