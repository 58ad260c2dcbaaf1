use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Tunables for keyboard navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
    /// Promote the owner item instead of wrapping inside dropdowns and
    /// overflows. When false every container wraps cyclically.
    pub promote_on_wrap: bool,
    /// Let template nodes take part in sibling lookup.
    pub navigate_template_nodes: bool,
    /// With the extend modifier held, tabbing past either end of a strip
    /// stays on the boundary item.
    pub extend_stops_at_strip_edge: bool,
    /// Minimum number of real items a container needs before Home and End
    /// act.
    pub min_items_for_home_end: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            promote_on_wrap: true,
            navigate_template_nodes: true,
            extend_stops_at_strip_edge: true,
            min_items_for_home_end: 2,
        }
    }
}

impl NavigationConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Serialize the configuration to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
