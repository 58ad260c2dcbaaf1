//! Tab rotation through controls, strips and the component tray.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis::{
        FocusToken, Model, NavigationConfig, Resolver,
        testing::fixtures::{Fixture, name_of},
    };

    /// Walk `steps` tabs from `start`, naming every stop.
    fn walk(f: &Fixture, start: FocusToken, forward: bool, steps: usize) -> Vec<String> {
        let config = NavigationConfig::default();
        let r = Resolver::new(&f.model, &config);
        let mut current = start;
        let mut out = Vec::new();
        for _ in 0..steps {
            current = r.resolve_tab(current, forward, false);
            out.push(name_of(&f.model, current));
        }
        out
    }

    #[test]
    fn forward_walk_is_cyclic() {
        let f = Fixture::menu();
        assert_eq!(
            walk(&f, FocusToken::NoSelection, true, 10),
            vec![
                "form", "before", "strip", "File", "Edit", "View", "after", "timer", "form",
                "before"
            ]
        );
    }

    #[test]
    fn backward_walk_enters_strip_from_the_end() {
        let f = Fixture::menu();
        let after = FocusToken::Control(f.find_control("after"));
        assert_eq!(
            walk(&f, after, false, 6),
            vec!["strip", "View", "Edit", "File", "before", "form"]
        );
    }

    #[test]
    fn dropdown_items_leave_through_owner() {
        let f = Fixture::menu();
        assert_eq!(walk(&f, f.token("Open"), true, 3), vec!["Save", "Edit", "View"]);
        assert_eq!(walk(&f, f.token("New"), false, 1), vec!["File"]);
    }

    #[test]
    fn extend_stops_at_strip_edge() {
        let f = Fixture::menu();
        let view = f.token("View");
        let file = f.token("File");
        let stop = NavigationConfig::default();
        let r = Resolver::new(&f.model, &stop);
        assert_eq!(r.resolve_tab(view, true, true), view);
        assert_eq!(r.resolve_tab(file, false, true), file);

        let leave = NavigationConfig {
            extend_stops_at_strip_edge: false,
            ..NavigationConfig::default()
        };
        let r = Resolver::new(&f.model, &leave);
        assert_eq!(name_of(&f.model, r.resolve_tab(view, true, true)), "after");
    }

    #[test]
    fn overflow_items_follow_their_trigger() {
        let mut f = Fixture::strip(&["A", "B", "C", "D"]);
        f.overflow(2);
        f.control("next", 5);
        assert_eq!(walk(&f, f.token("B"), true, 1), vec!["overflow"]);
        assert_eq!(walk(&f, f.token("C"), true, 2), vec!["D", "next"]);
        assert_eq!(walk(&f, f.token("C"), false, 2), vec!["B", "A"]);
    }

    #[test]
    fn tab_ignores_right_to_left() {
        let mut f = Fixture::strip(&["A", "B", "C"]);
        f.rtl();
        assert_eq!(walk(&f, f.token("A"), true, 2), vec!["B", "C"]);
    }

    #[test]
    fn unsited_controls_are_skipped() {
        let mut f = Fixture::menu();
        let before = f.find_control("before");
        f.model.set_sited(before, false).unwrap();
        assert_eq!(
            walk(&f, FocusToken::NoSelection, true, 3),
            vec!["form", "strip", "File"]
        );
    }

    #[test]
    fn tray_only_model_cycles_the_tray() {
        let mut model = Model::new();
        model.add_tray_component("a");
        model.add_tray_component("b");
        let config = NavigationConfig::default();
        let r = Resolver::new(&model, &config);
        let mut current = FocusToken::NoSelection;
        let mut names = Vec::new();
        for _ in 0..3 {
            current = r.resolve_tab(current, true, false);
            names.push(name_of(&model, current));
        }
        assert_eq!(names, vec!["a", "b", "a"]);
    }
}
