//! Integration tests for merging recordings into a document

use std::sync::mpsc;

use pretty_assertions::assert_eq;
use tas_editor::{
    Buttons, DocumentEvent, EditorError, InputLine, MatchKind, Node, ReconcileOutcome,
    ScriptDocument,
};

fn late_jump() -> Vec<InputLine> {
    vec![
        InputLine::new(10, Buttons::RIGHT),
        InputLine::new(5, Buttons::RIGHT),
        InputLine::new(15, Buttons::RIGHT | Buttons::JUMP),
    ]
}

#[test]
fn divergent_take_forks_a_recorded_branch() {
    let (tx, rx) = mpsc::channel();
    let mut doc = ScriptDocument::from_text("downhill", "  10,R\n  20,RJ");
    doc.set_event_channel(tx);
    let prefix = doc.root().nodes()[0].handle();

    let outcome = doc.reconcile("downhill", &late_jump(), false).unwrap();
    let ReconcileOutcome::Forked {
        branch_point,
        focus,
    } = outcome
    else {
        panic!("expected a fork, got {outcome:?}");
    };

    assert_eq!(doc.root().nodes().len(), 2);
    assert_eq!(doc.root().nodes()[0].handle(), prefix);
    assert_eq!(doc.root().nodes()[0].text(), "  10,R");
    assert_eq!(doc.root().nodes()[1].handle(), branch_point);

    let Node::BranchPoint(point) = &doc.root().nodes()[1] else {
        panic!("expected a branch point");
    };
    assert_eq!(point.active_index(), 1);
    assert_eq!(point.branches()[0].name(), "main");
    assert_eq!(point.branches()[0].active_text(), "  20,RJ");
    assert_eq!(point.branches()[1].name(), "recorded");
    assert_eq!(point.branches()[1].active_text(), "   5,R\n  15,RJ");
    assert_eq!(doc.total_frames(), 30);

    assert_eq!(
        doc.locate(focus, MatchKind::BranchGroupContaining)
            .and_then(|coordinate| doc.root().handle_at(&coordinate)),
        Some(branch_point)
    );

    let events: Vec<DocumentEvent> = rx.try_iter().collect();
    assert!(matches!(events[0], DocumentEvent::Edited { structural: true, .. }));
    assert_eq!(
        events.last(),
        Some(&DocumentEvent::Reconciled {
            outcome: "forked",
            frames: 30,
        })
    );
}

#[test]
fn reconciling_the_same_take_twice_merges() {
    let mut doc = ScriptDocument::from_text("downhill", "  10,R\n  20,RJ");
    doc.reconcile("downhill", &late_jump(), false).unwrap();
    let after_fork = doc.root().clone();

    let outcome = doc.reconcile("downhill", &late_jump(), false).unwrap();
    assert_eq!(outcome, ReconcileOutcome::Merged);
    assert_eq!(doc.root(), &after_fork);
    assert_eq!(doc.history_stats().undo_count, 1);
}

#[test]
fn undo_removes_the_fork() {
    let mut doc = ScriptDocument::from_text("downhill", "  10,R\n  20,RJ");
    let prefix = doc.root().nodes()[0].handle();
    doc.reconcile("downhill", &late_jump(), false).unwrap();

    doc.undo().unwrap();
    assert_eq!(doc.root().nodes().len(), 1);
    assert_eq!(doc.root().nodes()[0].handle(), prefix);
    assert_eq!(doc.text(), "  10,R\n  20,RJ");
}

#[test]
fn overflow_without_force_changes_nothing() {
    let mut doc = ScriptDocument::from_text("downhill", "  10,R");
    let take = [
        InputLine::new(10, Buttons::RIGHT),
        InputLine::new(5, Buttons::JUMP),
    ];

    let outcome = doc.reconcile("downhill", &take, false).unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Incomplete {
            remaining: vec![InputLine::new(5, Buttons::JUMP)]
        }
    );
    assert_eq!(doc.text(), "  10,R");
    assert!(!doc.can_undo());
    assert!(!doc.is_modified());
}

#[test]
fn overflow_with_force_appends_to_the_last_segment() {
    let mut doc = ScriptDocument::from_text("downhill", "  10,R");
    let last = doc.root().nodes()[0].handle();
    let take = [
        InputLine::new(10, Buttons::RIGHT),
        InputLine::new(5, Buttons::JUMP),
        InputLine::new(0, Buttons::empty()),
    ];

    let outcome = doc.reconcile("downhill", &take, true).unwrap();
    assert_eq!(outcome, ReconcileOutcome::Appended { segment: last });
    assert_eq!(doc.text(), "  10,R\n   5,J\n   0,");
    assert!(doc.is_modified());

    doc.undo().unwrap();
    assert_eq!(doc.text(), "  10,R");
}

#[test]
fn take_from_another_stage_is_rejected() {
    let mut doc = ScriptDocument::from_text("downhill", "  10,R\n  20,RJ");
    let err = doc.reconcile("uphill", &late_jump(), false).unwrap_err();
    assert_eq!(
        err,
        EditorError::StageMismatch {
            expected: "downhill".to_string(),
            actual: "uphill".to_string(),
        }
    );
    assert_eq!(doc.text(), "  10,R\n  20,RJ");
    assert!(!doc.can_undo());
}
