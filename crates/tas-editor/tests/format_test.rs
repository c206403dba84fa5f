//! Integration tests for loading and saving scripts
#![cfg(feature = "formats")]

use std::sync::mpsc;

use pretty_assertions::assert_eq;
use tas_editor::{
    DocumentEvent, EditorError, FormatOptions, FormatRegistry, Node, Position, Range,
    ScriptDocument,
};
use tempfile::TempDir;

const SCRIPT: &str = "# start\n  10,R\n  20,RJ\n  30,L";

fn two_variants() -> ScriptDocument {
    let mut doc = ScriptDocument::from_text("downhill", SCRIPT);
    doc.set_rerecords(Some(4));
    let segment = doc.root().nodes()[0].handle();
    doc.create_branch_point(segment, Range::new(Position::new(8), Position::new(15)))
        .unwrap();
    let variant = doc.focus().unwrap();
    doc.replace(variant, Range::new(Position::new(2), Position::new(4)), "12")
        .unwrap();
    doc
}

#[test]
fn markup_round_trip_keeps_branches() {
    let doc = two_variants();
    let markup = doc.to_markup();
    assert!(markup.starts_with("<tas stage=\"downhill\" rerecords=\"4\">\n"));
    assert!(markup.contains("<branches active=\"1\">\n<branch name=\"main\">\n"));

    let loaded = ScriptDocument::from_content(&markup).unwrap();
    assert_eq!(loaded.stage(), "downhill");
    assert_eq!(loaded.rerecords(), Some(4));
    assert_eq!(loaded.root(), doc.root());
    assert_eq!(loaded.text(), "# start\n  12,R\n  20,RJ\n  30,L");
    assert!(!loaded.can_undo());
    assert!(!loaded.is_modified());
}

#[test]
fn indented_export_loads_back() {
    let doc = two_variants();
    let markup = doc.export_with(&FormatOptions {
        indent_tags: true,
        ..FormatOptions::default()
    });
    assert!(markup.contains("\n  <branches active=\"1\">\n"));
    let loaded = ScriptDocument::from_content(&markup).unwrap();
    assert_eq!(loaded.root(), doc.root());
}

#[test]
fn save_and_reopen_through_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("downhill.tas");
    let path = path.to_str().unwrap();

    let (tx, rx) = mpsc::channel();
    let mut doc = two_variants();
    doc.set_event_channel(tx);
    assert!(doc.is_modified());
    assert!(matches!(doc.save(), Err(EditorError::IoError(_))));

    doc.save_to_file(path).unwrap();
    assert!(!doc.is_modified());
    assert_eq!(doc.file_path(), Some(path));
    doc.save().unwrap();

    let saves: Vec<DocumentEvent> = rx
        .try_iter()
        .filter(|event| event.event_type() == "saved")
        .collect();
    assert_eq!(
        saves,
        vec![
            DocumentEvent::Saved {
                file_path: path.to_string(),
                save_as: true,
            },
            DocumentEvent::Saved {
                file_path: path.to_string(),
                save_as: false,
            },
        ]
    );

    let reopened = ScriptDocument::from_file(path).unwrap();
    assert_eq!(reopened.file_path(), Some(path));
    assert_eq!(reopened.root(), doc.root());
}

#[test]
fn legacy_script_is_transcoded_on_load() {
    let legacy = "set stage downhill\n\n  10,R\n>startbranch main\n  20,RJ\n>branch short cut\n  5,L\n>endbranch\n   3,\n";
    let mut doc = ScriptDocument::new();
    let result = doc.load_str(legacy).unwrap();
    assert!(result.transcoded);
    assert_eq!(doc.stage(), "downhill");
    assert_eq!(doc.rerecords(), None);
    assert_eq!(doc.text(), "  10,R\n  20,RJ\n   3,");

    let Node::BranchPoint(point) = &doc.root().nodes()[1] else {
        panic!("expected a branch point");
    };
    assert_eq!(point.branches()[1].name(), "short cut");
    assert!(doc.to_markup().contains("<branch name=\"short cut\">"));
}

#[test]
fn registry_picks_importer_by_extension() {
    let dir = TempDir::new().unwrap();
    let legacy = dir.path().join("old.txt");
    std::fs::write(&legacy, "set stage uphill\n  7,U\n").unwrap();
    let unknown = dir.path().join("clip.mp4");
    std::fs::write(&unknown, "").unwrap();

    let registry = FormatRegistry::with_builtin();
    let (script, result) = registry
        .import_path(&legacy, &FormatOptions::default())
        .unwrap();
    assert!(result.transcoded);
    assert_eq!(script.stage, "uphill");
    assert_eq!(script.root.active_text(), "  7,U");

    let err = registry
        .import_path(&unknown, &FormatOptions::default())
        .unwrap_err();
    assert!(matches!(err, EditorError::InvalidFormat(_)));
}

#[test]
fn carriage_return_typed_at_line_end_survives_a_round_trip() {
    let mut doc = ScriptDocument::from_text("downhill", "  10,R");
    let segment = doc.root().nodes()[0].handle();
    doc.insert(segment, Position::new(6), "\r").unwrap();

    let markup = doc.to_markup();
    assert!(markup.contains("  10,R&#13;\n"));
    let back = ScriptDocument::from_content(&markup).unwrap();
    assert_eq!(back.root(), doc.root());
    assert_eq!(back.text(), "  10,R\r");
}

#[test]
fn byte_order_mark_and_prolog_are_tolerated() {
    let doc = two_variants();
    let markup = format!(
        "\u{feff}<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n{}",
        doc.to_markup()
    );
    let mut loaded = ScriptDocument::new();
    let result = loaded.load_str(&markup).unwrap();
    assert!(!result.transcoded);
    assert_eq!(loaded.stage(), "downhill");
    assert_eq!(loaded.root(), doc.root());

    let plain = ScriptDocument::from_content("\u{feff}<tas stage=\"downhill\">\n<inputs>\n  3,J\n</inputs>\n</tas>\n")
        .unwrap();
    assert_eq!(plain.stage(), "downhill");
    assert_eq!(plain.text(), "  3,J");
}

#[test]
fn single_alternative_groups_load_as_plain_inputs() {
    let legacy = ScriptDocument::from_content(">startbranch only\n  5,J\n>endbranch").unwrap();
    assert_eq!(legacy.root().nodes().len(), 1);
    assert_eq!(legacy.text(), "  5,J");

    let markup = ScriptDocument::from_content(
        "<tas stage=\"downhill\">\n<inputs>\n  10,R\n</inputs>\n<branches>\n<branch name=\"only\">\n<inputs>\n   5,J\n</inputs>\n</branch>\n</branches>\n</tas>\n",
    )
    .unwrap();
    assert_eq!(markup.root().nodes().len(), 1);
    assert_eq!(markup.text(), "  10,R\n   5,J");
    assert_eq!(markup.total_frames(), 15);
}

#[test]
fn malformed_input_leaves_the_document_alone() {
    let mut doc = two_variants();
    let before = doc.root().clone();
    for broken in [
        "<tas stage=\"x\">\n<inputs>\n  1,G\n",
        "<tas stage=\"x\">\n<branch name=\"a\">\n</branch>\n</tas>\n",
        "<tas>\n</tas>\n",
        ">startbranch\n  1,G\n",
    ] {
        let err = doc.load_str(broken).unwrap_err();
        assert!(matches!(err, EditorError::InvalidFormat(_)), "{broken:?}");
        assert_eq!(doc.root(), &before);
        assert_eq!(doc.stage(), "downhill");
        assert!(doc.can_undo());
    }
}
