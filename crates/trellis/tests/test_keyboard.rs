//! The keyboard command set: dispatch, dropdown auto-open, overrides and
//! the parent/child rotations.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis::{
        CommandError, DesignSession, Direction, FocusToken, InvokeOutcome, KeyCommand,
        NavigationConfig, SelectionAuthority,
        commands::Cancelled,
        testing::{
            fixtures::{Fixture, name_of, sorted_names},
            init_tracing,
            transactions::{Failure, RecordingTransactions, TxEvent},
        },
        transaction::ChangeTransactions,
    };

    /// Name of the current focus.
    fn focus<T: ChangeTransactions>(s: &DesignSession<T>) -> String {
        name_of(s.model(), s.focus())
    }

    #[test]
    fn moving_into_a_dropdown_opens_it_in_a_transaction() {
        init_tracing();
        let f = Fixture::menu();
        let file = f.token("File");
        let dropdown = f.model.item(f.item("File")).unwrap().dropdown().unwrap();
        let journal = RecordingTransactions::new();
        let mut s = f.session_with(NavigationConfig::default(), journal.clone());
        s.select(&[file]);

        let outcome = s.invoke(KeyCommand::Move(Direction::Down)).unwrap();
        assert_eq!(outcome, InvokeOutcome::Moved(s.focus()));
        assert_eq!(focus(&s), "New");
        assert!(s.model().container(dropdown).unwrap().is_open());
        assert_eq!(
            journal.events(),
            vec![TxEvent::Open("keyboard navigation".into()), TxEvent::Commit]
        );
        assert!(!journal.is_open());

        // Moving inside an open dropdown needs no transaction.
        s.invoke(KeyCommand::Move(Direction::Down)).unwrap();
        assert_eq!(focus(&s), "Open");
        assert_eq!(journal.events().len(), 2);
    }

    #[test]
    fn failed_commit_rolls_back_and_surfaces() {
        init_tracing();
        let f = Fixture::menu();
        let file = f.token("File");
        let dropdown = f.model.item(f.item("File")).unwrap().dropdown().unwrap();
        let journal = RecordingTransactions::new().fail_commit(Failure::Fault);
        let mut s = f.session_with(NavigationConfig::default(), journal.clone());
        s.select(&[file]);

        let err = s.invoke(KeyCommand::Move(Direction::Down)).unwrap_err();
        assert!(matches!(err, CommandError::HandlerFault(_)));
        assert!(!s.model().container(dropdown).unwrap().is_open());
        assert_eq!(focus(&s), "File");
        assert_eq!(
            journal.events(),
            vec![
                TxEvent::Open("keyboard navigation".into()),
                TxEvent::Commit,
                TxEvent::Cancel
            ]
        );

        s.transactions_mut().heal();
        s.invoke(KeyCommand::Move(Direction::Down)).unwrap();
        assert_eq!(focus(&s), "New");
    }

    #[test]
    fn cancelled_open_is_silent() {
        let f = Fixture::menu();
        let file = f.token("File");
        let dropdown = f.model.item(f.item("File")).unwrap().dropdown().unwrap();
        let journal = RecordingTransactions::new().fail_open(Failure::Cancel);
        let mut s = f.session_with(NavigationConfig::default(), journal.clone());
        s.select(&[file]);

        let outcome = s.invoke(KeyCommand::Move(Direction::Down)).unwrap();
        assert_eq!(outcome, InvokeOutcome::Cancelled);
        assert_eq!(focus(&s), "File");
        assert!(!s.model().container(dropdown).unwrap().is_open());
        assert!(journal.events().is_empty());
    }

    #[test]
    fn selecting_the_overflow_button_reveals_its_first_item() {
        let mut f = Fixture::strip(&["A", "B", "C", "D"]);
        let overflow = f.overflow(2);
        let b = f.token("B");
        let mut s = f.session();
        s.select(&[b]);

        s.invoke(KeyCommand::Move(Direction::Right)).unwrap();
        assert_eq!(focus(&s), "C");
        assert!(s.model().container(overflow).unwrap().is_open());

        // Escape closes the overflow and lands on the strip host.
        s.invoke(KeyCommand::Cancel).unwrap();
        assert_eq!(focus(&s), "strip");
        assert!(!s.model().container(overflow).unwrap().is_open());
    }

    #[test]
    fn template_node_holds_design_focus_outside_the_selection() {
        let mut f = Fixture::strip(&["A", "B"]);
        let strip = f.strip;
        let template = f.template(strip);
        let b = f.token("B");
        let mut s = f.session();
        s.select(&[b]);

        let outcome = s.invoke(KeyCommand::Move(Direction::Right)).unwrap();
        assert_eq!(outcome, InvokeOutcome::Moved(FocusToken::Item(template)));
        assert!(s.selection().selected_set().is_empty());
        assert_eq!(s.keyboard().designer_focus(), Some(template));
        assert_eq!(focus(&s), "template");

        s.invoke(KeyCommand::Move(Direction::Left)).unwrap();
        assert_eq!(focus(&s), "B");
        assert_eq!(s.keyboard().designer_focus(), None);
        assert_eq!(s.selection().primary(), s.focus());
    }

    #[test]
    fn tab_commands_walk_the_form() {
        let f = Fixture::menu();
        let view = f.token("View");
        let mut s = f.session();
        s.select(&[view]);
        s.invoke(KeyCommand::SelectNext).unwrap();
        assert_eq!(focus(&s), "after");
        s.invoke(KeyCommand::SelectNext).unwrap();
        assert_eq!(focus(&s), "timer");
        s.invoke(KeyCommand::SelectPrevious).unwrap();
        assert_eq!(focus(&s), "after");
    }

    #[test]
    fn home_and_end() {
        let f = Fixture::menu();
        let edit = f.token("Edit");
        let mut s = f.session();
        s.select(&[edit]);
        s.invoke(KeyCommand::End).unwrap();
        assert_eq!(focus(&s), "View");
        s.invoke(KeyCommand::Home).unwrap();
        assert_eq!(focus(&s), "File");
        assert_eq!(
            s.invoke(KeyCommand::Home).unwrap(),
            InvokeOutcome::Unchanged
        );
    }

    #[test]
    fn home_needs_enough_items() {
        let f = Fixture::strip(&["A"]);
        let a = f.token("A");
        let mut s = f.session();
        s.select(&[a]);
        assert_eq!(s.invoke(KeyCommand::End).unwrap(), InvokeOutcome::Unchanged);
        assert!(!s.status(KeyCommand::End).unwrap().enabled);
    }

    #[test]
    fn select_all_covers_the_container() {
        let f = Fixture::menu();
        let edit = f.token("Edit");
        let mut s = f.session();
        s.select(&[edit]);
        s.invoke(KeyCommand::SelectAll).unwrap();
        assert_eq!(
            sorted_names(s.model(), &s.selection().selected_set()),
            vec!["Edit", "File", "View"]
        );
        assert_eq!(focus(&s), "Edit");
    }

    #[test]
    fn select_all_counts_overflow_items_with_their_strip() {
        let mut f = Fixture::strip(&["A", "B", "C", "D"]);
        f.overflow(2);
        let c = f.token("C");
        let mut s = f.session();
        s.select(&[c]);
        s.invoke(KeyCommand::SelectAll).unwrap();
        assert_eq!(
            sorted_names(s.model(), &s.selection().selected_set()),
            vec!["A", "B", "C", "D"]
        );
        assert_eq!(focus(&s), "C");
    }

    #[test]
    fn select_all_on_a_form_selects_its_children() {
        let f = Fixture::menu();
        let root = FocusToken::Control(f.root);
        let mut s = f.session();
        s.select(&[root]);
        s.invoke(KeyCommand::SelectAll).unwrap();
        assert_eq!(
            sorted_names(s.model(), &s.selection().selected_set()),
            vec!["after", "before", "strip"]
        );
    }

    #[test]
    fn cancel_climbs_to_the_form() {
        let f = Fixture::menu();
        let open = f.token("Open");
        let mut s = f.session();
        s.select(&[open]);
        let mut stops = Vec::new();
        for _ in 0..4 {
            s.invoke(KeyCommand::Cancel).unwrap();
            stops.push(focus(&s));
        }
        assert_eq!(stops, vec!["File", "strip", "form", "form"]);
    }

    #[test]
    fn reverse_cancel_descends() {
        let f = Fixture::menu();
        let root = FocusToken::Control(f.root);
        let mut s = f.session();
        s.select(&[root]);
        s.invoke(KeyCommand::ReverseCancel).unwrap();
        assert_eq!(focus(&s), "before");

        let host = FocusToken::Control(s.model().find_control("strip").unwrap());
        s.select(&[host]);
        s.invoke(KeyCommand::ReverseCancel).unwrap();
        assert_eq!(focus(&s), "File");
        s.invoke(KeyCommand::ReverseCancel).unwrap();
        assert_eq!(focus(&s), "New");
        assert_eq!(
            s.invoke(KeyCommand::ReverseCancel).unwrap(),
            InvokeOutcome::Unchanged
        );
    }

    #[test]
    fn override_claims_commands() {
        let f = Fixture::menu();
        let edit = f.token("Edit");
        let mut s = f.session();
        s.select(&[edit]);
        s.set_override(Some(Box::new(
            |cmd: KeyCommand| -> anyhow::Result<bool> { Ok(cmd == KeyCommand::SelectAll) },
        )));

        assert_eq!(
            s.invoke(KeyCommand::SelectAll).unwrap(),
            InvokeOutcome::Overridden
        );
        assert_eq!(s.selection().selected_set(), vec![s.focus()]);
        s.invoke(KeyCommand::Move(Direction::Right)).unwrap();
        assert_eq!(focus(&s), "View");

        s.set_override(None);
        s.invoke(KeyCommand::SelectAll).unwrap();
        assert_eq!(s.selection().selected_set().len(), 3);
    }

    #[test]
    fn override_failures_are_classified() {
        let f = Fixture::menu();
        let mut s = f.session();
        s.set_override(Some(Box::new(
            |_: KeyCommand| -> anyhow::Result<bool> { Err(Cancelled.into()) },
        )));
        assert_eq!(
            s.invoke(KeyCommand::SelectNext).unwrap(),
            InvokeOutcome::Cancelled
        );

        s.set_override(Some(Box::new(
            |_: KeyCommand| -> anyhow::Result<bool> { Err(anyhow::anyhow!("hook broke")) },
        )));
        let err = s.invoke(KeyCommand::SelectNext).unwrap_err();
        assert!(matches!(err, CommandError::HandlerFault(_)));
        assert_eq!(s.focus(), FocusToken::NoSelection);
    }

    #[test]
    fn removing_a_dropdown_clears_its_items_from_the_selection() {
        let f = Fixture::menu();
        let file = f.token("File");
        let dropdown = f.model.item(f.item("File")).unwrap().dropdown().unwrap();
        let mut s = f.session();
        s.select(&[file]);
        s.invoke(KeyCommand::Move(Direction::Down)).unwrap();
        assert_eq!(focus(&s), "New");

        let removed = s.remove_container(dropdown).unwrap();
        assert_eq!(removed.items.len(), 3);
        assert!(s.selection().selected_set().is_empty());
        let file = s.model().find_item("File").unwrap();
        assert!(s.model().item(file).unwrap().dropdown().is_none());
        s.model().validate().unwrap();
    }

    #[test]
    fn dump_marks_the_focus() {
        let f = Fixture::menu();
        let edit = f.token("Edit");
        let mut s = f.session();
        s.select(&[edit]);
        let out = s.dump(false).unwrap();
        assert!(out.lines().any(|l| l.trim() == "Edit <"));
        assert!(out.contains("[dropdown] (closed)"));
    }

    #[test]
    fn edits_that_remove_nodes_prune_selection_and_chord() {
        init_tracing();
        let f = Fixture::menu();
        let edit = f.item("Edit");
        let mut s = f.session();
        s.select(&[FocusToken::Item(edit)]);
        s.invoke(KeyCommand::Extend(Direction::Right)).unwrap();
        assert!(s.keyboard().range().chord().is_some());

        s.edit(|m| m.remove_item(edit)).unwrap();
        assert!(!s.selection().is_selected(FocusToken::Item(edit)));
        assert_eq!(sorted_names(s.model(), &s.selection().selected_set()), vec!["View"]);
        assert!(s.keyboard().range().chord().is_none());
        assert_eq!(focus(&s), "View");

        s.invoke(KeyCommand::Move(Direction::Left)).unwrap();
        assert_eq!(focus(&s), "File");
    }

    #[test]
    fn moving_after_the_focused_item_is_edited_away() {
        let f = Fixture::menu();
        let edit = f.item("Edit");
        let mut s = f.session();
        s.select(&[FocusToken::Item(edit)]);

        s.edit(|m| m.remove_item(edit)).unwrap();
        assert_eq!(s.focus(), FocusToken::NoSelection);
        assert!(s.invoke(KeyCommand::Move(Direction::Right)).is_ok());
    }

    #[test]
    fn edits_that_remove_the_template_node_drop_design_focus() {
        let mut f = Fixture::strip(&["A", "B"]);
        let strip = f.strip;
        let template = f.template(strip);
        let b = f.token("B");
        let mut s = f.session();
        s.select(&[b]);
        s.invoke(KeyCommand::Move(Direction::Right)).unwrap();
        assert_eq!(s.keyboard().designer_focus(), Some(template));

        s.edit(|m| m.remove_item(template)).unwrap();
        assert_eq!(s.keyboard().designer_focus(), None);
        assert_eq!(s.focus(), FocusToken::NoSelection);
    }
}
