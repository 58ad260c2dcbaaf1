//! Directional navigation across strips, dropdowns and overflows.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis::{
        Direction, FocusToken, Model, NavigationConfig, Resolver,
        testing::{
            fixtures::{Fixture, name_of},
            init_tracing,
        },
    };

    /// Resolve an arrow key from a named item and name the result.
    fn go(f: &Fixture, config: &NavigationConfig, from: &str, direction: Direction) -> String {
        let r = Resolver::new(&f.model, config);
        name_of(
            &f.model,
            r.resolve_direction(f.token(from), direction, false),
        )
    }

    #[test]
    fn strip_wraps_cyclically() {
        init_tracing();
        let f = Fixture::strip(&["A", "B", "C"]);
        let config = NavigationConfig::default();
        assert_eq!(go(&f, &config, "B", Direction::Right), "C");
        assert_eq!(go(&f, &config, "C", Direction::Right), "A");
        assert_eq!(go(&f, &config, "A", Direction::Left), "C");
    }

    #[test]
    fn dropdown_wrap_promotes_owner() {
        init_tracing();
        let mut f = Fixture::strip(&["M"]);
        f.dropdown("M", &["X", "Y"]);
        let config = NavigationConfig::default();
        assert_eq!(go(&f, &config, "X", Direction::Right), "Y");
        assert_eq!(go(&f, &config, "Y", Direction::Right), "M");
        assert_eq!(go(&f, &config, "X", Direction::Left), "M");
    }

    #[test]
    fn wrap_without_promotion_cycles() {
        let mut f = Fixture::strip(&["M"]);
        f.dropdown("M", &["X", "Y"]);
        let config = NavigationConfig {
            promote_on_wrap: false,
            ..NavigationConfig::default()
        };
        assert_eq!(go(&f, &config, "Y", Direction::Right), "X");
        assert_eq!(go(&f, &config, "X", Direction::Left), "Y");
    }

    #[test]
    fn vertical_keys_walk_inside_dropdown() {
        let f = Fixture::menu();
        let config = NavigationConfig::default();
        assert_eq!(go(&f, &config, "New", Direction::Down), "Open");
        assert_eq!(go(&f, &config, "Open", Direction::Up), "New");
        assert_eq!(go(&f, &config, "Save", Direction::Up), "Open");
        // Wrapping past either end promotes to the owner.
        assert_eq!(go(&f, &config, "Save", Direction::Down), "File");
        assert_eq!(go(&f, &config, "New", Direction::Up), "File");
    }

    #[test]
    fn vertical_keys_enter_dropdown_from_strip() {
        let f = Fixture::menu();
        let config = NavigationConfig::default();
        assert_eq!(go(&f, &config, "File", Direction::Down), "New");
        assert_eq!(go(&f, &config, "File", Direction::Up), "Save");
        // Items without a dropdown step along the strip.
        assert_eq!(go(&f, &config, "Edit", Direction::Down), "View");
        assert_eq!(go(&f, &config, "Edit", Direction::Up), "File");
    }

    #[test]
    fn sub_dropdown_is_entered_sideways() {
        let mut f = Fixture::menu();
        f.dropdown("Open", &["Recent", "Pinned"]);
        let config = NavigationConfig::default();
        // Down moves past an item that owns a submenu.
        assert_eq!(go(&f, &config, "Open", Direction::Down), "Save");
        assert_eq!(go(&f, &config, "Open", Direction::Right), "Recent");
        assert_eq!(go(&f, &config, "Recent", Direction::Down), "Pinned");
        assert_eq!(go(&f, &config, "Recent", Direction::Left), "Open");
        assert_eq!(go(&f, &config, "Pinned", Direction::Down), "Open");
        // Left inside a top-level dropdown keeps moving within it.
        assert_eq!(go(&f, &config, "Save", Direction::Left), "Open");
    }

    #[test]
    fn right_to_left_mirrors_horizontal_keys() {
        let mut f = Fixture::strip(&["A", "B", "C"]);
        f.dropdown("A", &["X", "Y", "Z"]);
        f.rtl();
        let config = NavigationConfig::default();
        assert_eq!(go(&f, &config, "B", Direction::Right), "A");
        assert_eq!(go(&f, &config, "B", Direction::Left), "C");
        // The dropdown follows its strip.
        assert_eq!(go(&f, &config, "Y", Direction::Left), "Z");
        assert_eq!(go(&f, &config, "Y", Direction::Right), "X");
        // Vertical keys are never mirrored.
        assert_eq!(go(&f, &config, "X", Direction::Down), "Y");
    }

    #[test]
    fn hidden_items_are_skipped() {
        let mut f = Fixture::strip(&["A", "B", "C"]);
        let b = f.item("B");
        f.model.set_hidden(b, true).unwrap();
        let config = NavigationConfig::default();
        assert_eq!(go(&f, &config, "A", Direction::Right), "C");
        assert_eq!(go(&f, &config, "C", Direction::Left), "A");
    }

    #[test]
    fn overflow_leaves_beside_trigger() {
        let mut f = Fixture::strip(&["A", "B", "C", "D"]);
        f.overflow(2);
        let names: Vec<String> = f
            .model
            .items(f.strip)
            .unwrap()
            .iter()
            .map(|i| f.model.item(*i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["A", "B", "overflow"]);

        let config = NavigationConfig::default();
        assert_eq!(go(&f, &config, "C", Direction::Right), "D");
        assert_eq!(go(&f, &config, "D", Direction::Right), "A");
        assert_eq!(go(&f, &config, "C", Direction::Left), "B");
        assert_eq!(go(&f, &config, "D", Direction::Up), "C");
        assert_eq!(go(&f, &config, "C", Direction::Up), "B");
        assert_eq!(go(&f, &config, "B", Direction::Right), "overflow");
    }

    #[test]
    fn dropdown_on_overflow_leaves_beside_trigger() {
        let mut f = Fixture::strip(&["A", "B", "C"]);
        f.dropdown("C", &["X", "Y"]);
        f.overflow(1);
        let config = NavigationConfig::default();
        assert_eq!(go(&f, &config, "Y", Direction::Right), "A");
        assert_eq!(go(&f, &config, "X", Direction::Left), "B");
        assert_eq!(go(&f, &config, "Y", Direction::Up), "X");
        assert_eq!(go(&f, &config, "X", Direction::Up), "B");
    }

    #[test]
    fn template_node_participation_is_configurable() {
        let mut f = Fixture::strip(&["A", "B"]);
        let strip = f.strip;
        f.template(strip);
        let on = NavigationConfig::default();
        let off = NavigationConfig {
            navigate_template_nodes: false,
            ..NavigationConfig::default()
        };
        assert_eq!(go(&f, &on, "B", Direction::Right), "template");
        assert_eq!(go(&f, &off, "B", Direction::Right), "A");
    }

    #[test]
    fn controls_fall_back_to_tab_order() {
        let f = Fixture::menu();
        let config = NavigationConfig::default();
        let r = Resolver::new(&f.model, &config);
        let before = f.find_control("before");
        let next = r.resolve_direction(FocusToken::Control(before), Direction::Right, false);
        assert_eq!(next, FocusToken::Control(f.host));
        let first = r.resolve_direction(next, Direction::Down, false);
        assert_eq!(name_of(&f.model, first), "File");
    }

    #[test]
    fn empty_model_returns_current() {
        let model = Model::new();
        let config = NavigationConfig::default();
        let r = Resolver::new(&model, &config);
        for d in Direction::ALL {
            assert_eq!(
                r.resolve_direction(FocusToken::NoSelection, d, false),
                FocusToken::NoSelection
            );
        }
    }

    #[test]
    fn stale_token_is_returned_unchanged() {
        init_tracing();
        let mut f = Fixture::strip(&["A", "B"]);
        let a = f.token("A");
        let id = f.item("A");
        f.model.remove_item(id).unwrap();
        let config = NavigationConfig::default();
        let r = Resolver::new(&f.model, &config);
        assert!(r.try_resolve_direction(a, Direction::Right, false).is_err());
        assert_eq!(r.resolve_direction(a, Direction::Right, false), a);
    }

    #[test]
    fn single_item_strip_stays_put() {
        let f = Fixture::strip(&["A"]);
        let config = NavigationConfig::default();
        for d in Direction::ALL {
            assert_eq!(go(&f, &config, "A", d), "A");
        }
    }
}
