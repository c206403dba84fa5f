//! Builders turning branch operations into undoable commands
//!
//! Every builder reads the current tree, computes the complete splice with
//! owned node snapshots, and returns an [`EditCommand`] that the caller
//! applies through the document's normal `apply` path. Builders never mutate.

use crate::core::address::Coordinate;
use crate::core::errors::{EditorError, Result};
use crate::core::position::Range;
use crate::core::tree::{Branch, BranchPoint, Handle, Node, Segment};

use super::branch::{AddBranch, RemoveBranch, RenameBranch, RestructureEdit, SetActiveBranch};
use super::{BranchNames, Edit, EditCommand};

/// Second branch of a freshly created branch point
enum Alternative {
    /// A handle-fresh copy of the main branch with this name
    Duplicate(String),
    /// A prepared branch, e.g. a recorded take
    Prepared(Branch),
}

/// Create a branch point from a caret or selection inside a segment
///
/// The split snaps to whole lines. Lines before the one holding the start of
/// `selection` stay in the segment. With a bare caret everything from that
/// line on, including all following sibling nodes, moves into the new
/// `main` branch. With a selection only the selected lines move and the
/// lines after it form a trailing segment. A handle-fresh duplicate of the
/// main branch is added next to it and made active.
///
/// # Errors
/// Fails when `target` is not a segment or `selection` is out of bounds.
pub fn create_branch_point(
    root: &Branch,
    target: &Coordinate,
    selection: Range,
    names: &BranchNames,
) -> Result<EditCommand> {
    const COMMAND: &str = "create branch point";
    let node = root.resolve(target)?;
    let segment = node
        .as_segment()
        .ok_or_else(|| EditorError::unsupported(COMMAND, node.kind_name(), target))?;
    selection.validate(segment.text())?;

    let start_line = segment.line_at(selection.start.offset);
    let end_line = if selection.is_empty() {
        None
    } else {
        let last = segment.line_at(selection.end.offset);
        let ends_on_boundary = selection.end.offset == segment.line_start_offset(last);
        if ends_on_boundary && last > start_line {
            Some(last)
        } else {
            Some(last + 1)
        }
    };

    split_into_branch_point(
        root,
        target,
        start_line,
        end_line,
        &names.main,
        Alternative::Duplicate(names.variant.clone()),
    )
}

/// Fork a segment at the start of `line`, adding `alternative` as the
/// active second branch
///
/// Bottomless: the rest of the segment and all following siblings become
/// the `main` branch.
///
/// # Errors
/// Fails when `target` is not a segment.
pub fn fork_at_line(
    root: &Branch,
    target: &Coordinate,
    line: usize,
    alternative: Branch,
    names: &BranchNames,
) -> Result<EditCommand> {
    let node = root.resolve(target)?;
    if node.as_segment().is_none() {
        return Err(EditorError::unsupported(
            "fork branch point",
            node.kind_name(),
            target,
        ));
    }
    split_into_branch_point(
        root,
        target,
        line,
        None,
        &names.main,
        Alternative::Prepared(alternative),
    )
}

fn split_into_branch_point(
    root: &Branch,
    target: &Coordinate,
    start_line: usize,
    end_line: Option<usize>,
    main_name: &str,
    alternative: Alternative,
) -> Result<EditCommand> {
    let (parent_coordinate, index) = split_target(target, "create branch point")?;
    let parent = parent_branch(root, &parent_coordinate)?;
    let Some(Node::Segment(segment)) = parent.nodes().get(index) else {
        return Err(EditorError::invalid_address(target, "expected a segment"));
    };

    let lines: Vec<&str> = segment.lines().collect();
    let start = start_line.min(lines.len());
    let end = end_line.unwrap_or(lines.len()).clamp(start, lines.len());
    let bottomless = end_line.is_none();
    let keeps_pre = start > 0;

    let split_handle = if keeps_pre {
        Handle::fresh()
    } else {
        segment.handle()
    };
    let mut main_nodes = vec![Node::Segment(Segment::with_handle(
        split_handle,
        lines[start..end].join("\n"),
    ))];
    if bottomless {
        main_nodes.extend(parent.nodes()[index + 1..].iter().cloned());
    }
    let main = Branch::new(main_name, main_nodes);
    let second = match alternative {
        Alternative::Duplicate(name) => {
            let mut copy = main.duplicate();
            copy.set_name(name);
            copy
        }
        Alternative::Prepared(branch) => branch,
    };
    let point = BranchPoint::new(vec![main, second], 1)?;

    let mut inserted = Vec::with_capacity(3);
    if keeps_pre {
        inserted.push(Node::Segment(Segment::with_handle(
            segment.handle(),
            lines[..start].join("\n"),
        )));
    }
    inserted.push(Node::BranchPoint(point));
    if !bottomless && end < lines.len() {
        inserted.push(Node::Segment(Segment::new(lines[end..].join("\n"))));
    }

    let removed = if bottomless {
        parent.nodes()[index..].to_vec()
    } else {
        vec![Node::Segment(segment.clone())]
    };

    let point_index = index + usize::from(keeps_pre);
    let focus = parent_coordinate.node(point_index).branch(1).node(0);
    Ok(EditCommand::new(Edit::Restructure(RestructureEdit {
        target: parent_coordinate,
        index,
        removed,
        inserted,
    }))
    .with_focus_after(focus))
}

/// Remove a branch point, leaving a single empty line in its place
///
/// The empty line is stitched together with adjacent sibling segments.
///
/// # Errors
/// Fails when `target` is not a branch point.
pub fn delete_branch_point(root: &Branch, target: &Coordinate) -> Result<EditCommand> {
    expect_branch_point(root, target, "delete branch point")?;
    dissolve(root, target, vec![Node::Segment(Segment::new(""))])
}

/// Collapse a branch point into its active branch
///
/// The active branch's nodes replace the branch point; its boundary
/// segments merge with adjacent sibling segments.
///
/// # Errors
/// Fails when `target` is not a branch point.
pub fn accept_branch_point(root: &Branch, target: &Coordinate) -> Result<EditCommand> {
    let point = expect_branch_point(root, target, "accept branch point")?;
    dissolve(root, target, point.active_branch().nodes().to_vec())
}

/// Remove branch `index` of a branch point
///
/// With more than two branches this is a plain [`RemoveBranch`]. With
/// exactly two the point is dissolved into the surviving branch so that no
/// single-branch point is ever left behind.
///
/// # Errors
/// Fails when `target` is not a branch point, `index` is out of range, or
/// the point has a single branch.
pub fn remove_branch(root: &Branch, target: &Coordinate, index: usize) -> Result<EditCommand> {
    let point = expect_branch_point(root, target, "remove branch")?;
    let Some(removed) = point.branches().get(index) else {
        return Err(EditorError::invalid_address(
            target,
            format!("branch index {index} out of range ({} available)", point.len()),
        ));
    };
    match point.len() {
        0 | 1 => Err(EditorError::branch_point("cannot remove the only branch")),
        2 => {
            let survivor = &point.branches()[1 - index];
            dissolve(root, target, survivor.nodes().to_vec())
        }
        len => {
            let active = point.active_index();
            let active_after = match index.cmp(&active) {
                core::cmp::Ordering::Less => active - 1,
                core::cmp::Ordering::Equal => index.min(len - 2),
                core::cmp::Ordering::Greater => active,
            };
            Ok(EditCommand::new(Edit::RemoveBranch(RemoveBranch {
                target: target.clone(),
                index,
                active_before: active,
                active_after,
                removed: removed.clone(),
            }))
            .with_focus_after(target.clone()))
        }
    }
}

/// Append a new active branch to a branch point
///
/// With `duplicate_active` the new branch is a handle-fresh copy of the
/// active one, otherwise it holds a single empty line.
///
/// # Errors
/// Fails when `target` is not a branch point.
pub fn add_branch(
    root: &Branch,
    target: &Coordinate,
    name: impl Into<String>,
    duplicate_active: bool,
) -> Result<EditCommand> {
    let point = expect_branch_point(root, target, "add branch")?;
    let name = name.into();
    let branch = if duplicate_active {
        let mut copy = point.active_branch().duplicate();
        copy.set_name(name);
        copy
    } else {
        Branch::new(name, vec![Node::Segment(Segment::new(""))])
    };
    let focus = first_node_or_header(target, point.len(), &branch);
    Ok(EditCommand::new(Edit::AddBranch(AddBranch {
        target: target.clone(),
        active_before: point.active_index(),
        branch,
    }))
    .with_focus_after(focus))
}

/// Switch the active branch
///
/// # Errors
/// Fails when `target` is not a branch point or `index` is out of range.
pub fn set_active_branch(root: &Branch, target: &Coordinate, index: usize) -> Result<EditCommand> {
    let point = expect_branch_point(root, target, "set active branch")?;
    let Some(branch) = point.branches().get(index) else {
        return Err(EditorError::invalid_address(
            target,
            format!("branch index {index} out of range ({} available)", point.len()),
        ));
    };
    let focus = first_node_or_header(target, index, branch);
    Ok(EditCommand::new(Edit::SetActiveBranch(SetActiveBranch {
        target: target.clone(),
        active_before: point.active_index(),
        active_after: index,
    }))
    .with_focus_after(focus))
}

/// Rename the branch at `target`
///
/// # Errors
/// Fails when `target` is the root or does not name a branch.
pub fn rename_branch(
    root: &Branch,
    target: &Coordinate,
    name: impl Into<String>,
) -> Result<EditCommand> {
    const COMMAND: &str = "rename branch";
    if target.is_empty() {
        return Err(EditorError::unsupported(COMMAND, "root", target));
    }
    let node = root.resolve(target)?;
    let branch = node
        .as_branch()
        .ok_or_else(|| EditorError::unsupported(COMMAND, node.kind_name(), target))?;
    let mut command = EditCommand::new(Edit::RenameBranch(RenameBranch {
        target: target.clone(),
        name_before: branch.name().to_string(),
        name_after: name.into(),
    }));
    if let Some(header) = target.enclosing_branch_point() {
        command = command.with_focus_after(header);
    }
    Ok(command)
}

/// Replace the branch point at `target` with `replacement`, merging the
/// boundary segments with adjacent sibling segments
fn dissolve(root: &Branch, target: &Coordinate, replacement: Vec<Node>) -> Result<EditCommand> {
    let (parent_coordinate, index) = split_target(target, "dissolve branch point")?;
    let parent = parent_branch(root, &parent_coordinate)?;
    let nodes = parent.nodes();

    let mut inserted = replacement;
    let mut start = index;
    let mut end = index + 1;

    let previous = index.checked_sub(1).and_then(|before| nodes.get(before));
    let merged_front = match (previous, inserted.first()) {
        (Some(Node::Segment(prev)), Some(Node::Segment(first))) => Some(Segment::with_handle(
            prev.handle(),
            format!("{}\n{}", prev.text(), first.text()),
        )),
        _ => None,
    };
    if let Some(merged) = merged_front {
        inserted[0] = Node::Segment(merged);
        start -= 1;
    }

    let merged_back = match (nodes.get(index + 1), inserted.last()) {
        (Some(Node::Segment(next)), Some(Node::Segment(last))) => Some(Segment::with_handle(
            last.handle(),
            format!("{}\n{}", last.text(), next.text()),
        )),
        _ => None,
    };
    if let (Some(merged), Some(last)) = (merged_back, inserted.last_mut()) {
        *last = Node::Segment(merged);
        end += 1;
    }

    let removed = nodes[start..end].to_vec();
    let mut command = EditCommand::new(Edit::Restructure(RestructureEdit {
        target: parent_coordinate.clone(),
        index: start,
        removed,
        inserted: inserted.clone(),
    }));
    if !inserted.is_empty() {
        command = command.with_focus_after(parent_coordinate.node(start));
    }
    Ok(command)
}

fn split_target(target: &Coordinate, command: &'static str) -> Result<(Coordinate, usize)> {
    target
        .split_node()
        .ok_or_else(|| EditorError::unsupported(command, "branch", target))
}

fn parent_branch<'a>(root: &'a Branch, coordinate: &Coordinate) -> Result<&'a Branch> {
    root.resolve(coordinate)?
        .as_branch()
        .ok_or_else(|| EditorError::invalid_address(coordinate, "expected a branch"))
}

fn expect_branch_point<'a>(
    root: &'a Branch,
    target: &Coordinate,
    command: &'static str,
) -> Result<&'a BranchPoint> {
    let node = root.resolve(target)?;
    node.as_branch_point()
        .ok_or_else(|| EditorError::unsupported(command, node.kind_name(), target))
}

fn first_node_or_header(target: &Coordinate, index: usize, branch: &Branch) -> Coordinate {
    if branch.nodes().is_empty() {
        target.clone()
    } else {
        target.branch(index).node(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::Position;
    use pretty_assertions::assert_eq;

    fn names() -> BranchNames {
        BranchNames::default()
    }

    fn seg(text: &str) -> Node {
        Node::Segment(Segment::new(text))
    }

    fn caret(offset: usize) -> Range {
        Range::caret(Position::new(offset))
    }

    #[test]
    fn caret_split_is_bottomless() {
        let mut root = Branch::new("", vec![seg("   1,R\n   2,J\n   3,X"), seg("# tail")]);
        let original = root.active_text();
        let command =
            create_branch_point(&root, &Coordinate::from(vec![0]), caret(8), &names()).unwrap();
        command.apply(&mut root).unwrap();

        assert_eq!(root.nodes().len(), 2);
        assert_eq!(root.nodes()[0], seg("   1,R"));
        let point = root.nodes()[1].clone();
        let Node::BranchPoint(point) = point else {
            panic!("expected a branch point");
        };
        assert_eq!(point.active_index(), 1);
        assert_eq!(point.branches()[0].name(), "main");
        assert_eq!(point.branches()[1].name(), "");
        assert_eq!(point.branches()[0].active_text(), "   2,J\n   3,X\n# tail");
        assert_eq!(root.active_text(), original);
        assert_eq!(command.focus_after, Some(Coordinate::from(vec![1, 1, 0])));
    }

    #[test]
    fn selection_split_keeps_post_segment() {
        let mut root = Branch::new("", vec![seg("   1,R\n   2,J\n   3,X\n   4,G")]);
        let selection = Range::new(Position::new(9), Position::new(14));
        let command =
            create_branch_point(&root, &Coordinate::from(vec![0]), selection, &names()).unwrap();
        command.apply(&mut root).unwrap();

        assert_eq!(root.nodes().len(), 3);
        assert_eq!(root.nodes()[0], seg("   1,R"));
        assert_eq!(root.nodes()[2], seg("   3,X\n   4,G"));
        assert_eq!(root.active_text(), "   1,R\n   2,J\n   3,X\n   4,G");
    }

    #[test]
    fn selection_ending_at_line_start_excludes_that_line() {
        let mut root = Branch::new("", vec![seg("   1,R\n   2,J\n   3,X")]);
        let selection = Range::new(Position::new(7), Position::new(14));
        create_branch_point(&root, &Coordinate::from(vec![0]), selection, &names())
            .unwrap()
            .apply(&mut root)
            .unwrap();
        let point = root.nodes()[1].clone();
        let Node::BranchPoint(point) = point else {
            panic!("expected a branch point");
        };
        assert_eq!(point.branches()[0].active_text(), "   2,J");
        assert_eq!(root.nodes()[2], seg("   3,X"));
    }

    #[test]
    fn split_at_first_line_drops_empty_pre() {
        let mut root = Branch::new("", vec![seg("   1,R")]);
        let handle = root.nodes()[0].handle();
        create_branch_point(&root, &Coordinate::from(vec![0]), caret(0), &names())
            .unwrap()
            .apply(&mut root)
            .unwrap();
        assert_eq!(root.nodes().len(), 1);
        let Node::BranchPoint(point) = &root.nodes()[0] else {
            panic!("expected a branch point");
        };
        assert_eq!(point.branches()[0].nodes()[0].handle(), handle);
        assert_ne!(point.branches()[1].nodes()[0].handle(), handle);
    }

    #[test]
    fn delete_stitches_neighbours_with_blank_line() {
        let mut root = Branch::new("", vec![seg("   1,R\n   2,J")]);
        create_branch_point(
            &root,
            &Coordinate::from(vec![0]),
            Range::new(Position::new(7), Position::new(13)),
            &names(),
        )
        .unwrap()
        .apply(&mut root)
        .unwrap();
        root.nodes_mut().push(seg("   9,"));
        let command = delete_branch_point(&root, &Coordinate::from(vec![1])).unwrap();
        command.apply(&mut root).unwrap();
        assert_eq!(root.nodes().len(), 1);
        assert_eq!(root.active_text(), "   1,R\n\n   9,");
    }

    #[test]
    fn accept_restores_original_structure() {
        let original = Branch::new("", vec![seg("   1,R\n   2,J"), seg("# a"), seg("   3,")]);
        let mut root = original.clone();
        create_branch_point(&root, &Coordinate::from(vec![0]), caret(7), &names())
            .unwrap()
            .apply(&mut root)
            .unwrap();
        accept_branch_point(&root, &Coordinate::from(vec![1]))
            .unwrap()
            .apply(&mut root)
            .unwrap();
        assert_eq!(root, original);
        assert_eq!(root.nodes()[0].handle(), original.nodes()[0].handle());
    }

    #[test]
    fn remove_branch_dissolves_pair() {
        let mut root = Branch::new("", vec![seg("   1,R\n   2,J")]);
        create_branch_point(&root, &Coordinate::from(vec![0]), caret(7), &names())
            .unwrap()
            .apply(&mut root)
            .unwrap();
        let command = remove_branch(&root, &Coordinate::from(vec![1]), 1).unwrap();
        assert!(matches!(command.edit, Edit::Restructure(_)));
        command.apply(&mut root).unwrap();
        assert_eq!(root.nodes(), &[seg("   1,R\n   2,J")]);
    }

    #[test]
    fn remove_branch_adjusts_active_index() {
        let point = BranchPoint::new(
            vec![
                Branch::from_text("a"),
                Branch::from_text("b"),
                Branch::from_text("c"),
            ],
            2,
        )
        .unwrap();
        let root = Branch::new("", vec![Node::BranchPoint(point)]);
        let target = Coordinate::from(vec![0]);
        let Edit::RemoveBranch(edit) = remove_branch(&root, &target, 0).unwrap().edit else {
            panic!("expected remove branch");
        };
        assert_eq!(edit.active_after, 1);
        let Edit::RemoveBranch(edit) = remove_branch(&root, &target, 2).unwrap().edit else {
            panic!("expected remove branch");
        };
        assert_eq!(edit.active_after, 1);
        assert!(remove_branch(&root, &target, 3).is_err());
    }

    #[test]
    fn add_and_rename_builders() {
        let mut root = Branch::new("", vec![seg("   1,R")]);
        create_branch_point(&root, &Coordinate::from(vec![0]), caret(0), &names())
            .unwrap()
            .apply(&mut root)
            .unwrap();
        let target = Coordinate::from(vec![0]);

        let add = add_branch(&root, &target, "third", true).unwrap();
        assert_eq!(add.focus_after, Some(Coordinate::from(vec![0, 2, 0])));
        add.apply(&mut root).unwrap();

        let rename = rename_branch(&root, &Coordinate::from(vec![0, 2]), "safe").unwrap();
        rename.apply(&mut root).unwrap();
        let point = root.resolve(&target).unwrap().as_branch_point().unwrap();
        assert_eq!(point.branches()[2].name(), "safe");
        assert_eq!(point.active_index(), 2);
        assert!(rename_branch(&root, &Coordinate::root(), "x").is_err());
    }
}
