//! Merging recorded input into an existing script
//!
//! [`plan`] walks the reachable segments in play order and matches their
//! input lines against a recorded take. Runs of equal buttons consume each
//! other frame by frame, so a 20-frame script line can match two 10-frame
//! recorded lines and vice versa. The first run whose buttons differ forks
//! the script at the start of that script line: everything from there on
//! becomes the `main` branch and the recording, from the same frame on,
//! becomes the active `recorded` branch.
//!
//! Zero-frame script lines are skipped. Zero-frame recorded lines carry no
//! frames and are dropped, except a final one which is kept in any fork or
//! appended text as the end-of-take marker.

use tas_core::{classify_line, InputLine, LineFormat, LineKind};
use tracing::debug;

use crate::commands::{fork_at_line, BranchNames, Edit, EditCommand, RestructureEdit, TextEdit};
use crate::core::address::Coordinate;
use crate::core::errors::Result;
use crate::core::position::Position;
use crate::core::tree::{Branch, Handle, Node, Segment};

/// What reconciling a take will do to the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The recording matches the script; nothing changes
    Merged,
    /// The recording diverges; applying the command forks a branch point
    Fork {
        /// Command creating the branch point
        command: EditCommand,
        /// Coordinate of the new branch point once applied
        branch_point: Coordinate,
    },
    /// The recording runs past the script and `force` was set
    Append {
        /// Command appending the unmatched lines
        command: EditCommand,
    },
    /// The recording runs past the script and `force` was not set
    Incomplete {
        /// Recorded lines past the end of the script
        remaining: Vec<InputLine>,
    },
}

/// Outcome reported to the caller after a take was reconciled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Merged in place with no change
    Merged,
    /// A branch point was created
    Forked {
        /// Header handle of the new branch point
        branch_point: Handle,
        /// Handle of the segment holding the recorded lines
        focus: Handle,
    },
    /// Unmatched lines were appended to the last segment
    Appended {
        /// Handle of the extended segment
        segment: Handle,
    },
    /// Nothing was changed; these lines run past the script
    Incomplete {
        /// Recorded lines past the end of the script
        remaining: Vec<InputLine>,
    },
}

impl ReconcileOutcome {
    /// Short name used in events and logs
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::Forked { .. } => "forked",
            Self::Appended { .. } => "appended",
            Self::Incomplete { .. } => "incomplete",
        }
    }
}

/// Position in the recorded take: current line and frames left in it
#[derive(Debug, Clone, Copy)]
struct Cursor {
    line: usize,
    left: u32,
}

/// Work out how a recorded take merges into `root`
///
/// # Errors
/// Fails only when the tree changes shape under the walk, which indicates a
/// defect in the caller.
pub fn plan(
    root: &Branch,
    recorded: &[InputLine],
    force: bool,
    names: &BranchNames,
    format: &LineFormat,
) -> Result<Reconciliation> {
    let trailing = recorded.last().copied().filter(InputLine::is_zero_length);
    let incoming: Vec<InputLine> = recorded
        .iter()
        .copied()
        .filter(|line| !line.is_zero_length())
        .collect();

    let mut cursor = Cursor {
        line: 0,
        left: incoming.first().map_or(0, |line| line.frames),
    };
    let entries = root.segments_by_start_frame();

    for entry in &entries {
        for (line_index, text) in entry.segment.lines().enumerate() {
            let LineKind::Input(expected) = classify_line(text) else {
                continue;
            };
            let checkpoint = cursor;
            let mut needed = expected.frames;
            while needed > 0 {
                let Some(current) = incoming.get(cursor.line) else {
                    debug!(start_frame = entry.start_frame, "recording matched script prefix");
                    return Ok(Reconciliation::Merged);
                };
                if current.buttons != expected.buttons {
                    let remainder = remainder_from(&incoming, checkpoint, trailing);
                    debug!(
                        coordinate = %entry.coordinate,
                        line = line_index,
                        lines = remainder.len(),
                        "recording diverges, forking"
                    );
                    return fork(root, &entry.coordinate, line_index, &remainder, names, format);
                }
                let take = needed.min(cursor.left);
                needed -= take;
                cursor.left -= take;
                if cursor.left == 0 {
                    cursor.line += 1;
                    cursor.left = incoming.get(cursor.line).map_or(0, |line| line.frames);
                }
            }
        }
    }

    if cursor.line >= incoming.len() {
        debug!("recording matched whole script");
        return Ok(Reconciliation::Merged);
    }

    let remaining = remainder_from(&incoming, cursor, trailing);
    if !force {
        debug!(lines = remaining.len(), "recording runs past script end");
        return Ok(Reconciliation::Incomplete { remaining });
    }
    debug!(lines = remaining.len(), "appending recording past script end");
    let text = render(&remaining, format);
    let command = match entries.last() {
        Some(last) => append_to_segment(root, &last.coordinate, last.segment, text)?,
        None => EditCommand::new(Edit::Restructure(RestructureEdit {
            target: Coordinate::root(),
            index: root.nodes().len(),
            removed: Vec::new(),
            inserted: vec![Node::Segment(Segment::new(text))],
        }))
        .with_focus_after(Coordinate::root().node(root.nodes().len())),
    };
    Ok(Reconciliation::Append { command })
}

fn remainder_from(incoming: &[InputLine], from: Cursor, trailing: Option<InputLine>) -> Vec<InputLine> {
    let mut remainder = Vec::with_capacity(incoming.len().saturating_sub(from.line) + 1);
    if let Some(first) = incoming.get(from.line) {
        remainder.push(InputLine::new(from.left, first.buttons));
        remainder.extend_from_slice(&incoming[from.line + 1..]);
    }
    remainder.extend(trailing);
    remainder
}

fn render(lines: &[InputLine], format: &LineFormat) -> String {
    lines
        .iter()
        .map(|line| line.format(format))
        .collect::<Vec<_>>()
        .join("\n")
}

fn fork(
    root: &Branch,
    coordinate: &Coordinate,
    line: usize,
    remainder: &[InputLine],
    names: &BranchNames,
    format: &LineFormat,
) -> Result<Reconciliation> {
    let recorded = Branch::new(
        names.recorded.clone(),
        vec![Node::Segment(Segment::new(render(remainder, format)))],
    );
    let command = fork_at_line(root, coordinate, line, recorded, names)?;
    let branch_point = command
        .focus_after
        .as_ref()
        .and_then(Coordinate::enclosing_branch_point)
        .unwrap_or_else(|| coordinate.clone());
    Ok(Reconciliation::Fork {
        command,
        branch_point,
    })
}

fn append_to_segment(
    root: &Branch,
    coordinate: &Coordinate,
    segment: &Segment,
    text: String,
) -> Result<EditCommand> {
    let existing = segment.text();
    let separator = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    let edit = TextEdit::insert(
        root,
        coordinate.clone(),
        Position::new(existing.len()),
        format!("{separator}{text}"),
    )?;
    Ok(edit.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(frames: u32, letters: &str) -> InputLine {
        InputLine::new(frames, letters.parse().unwrap())
    }

    fn plan_for(text: &str, recorded: &[InputLine], force: bool) -> (Branch, Reconciliation) {
        let root = Branch::from_text(text);
        let plan = plan(
            &root,
            recorded,
            force,
            &BranchNames::default(),
            &LineFormat::default(),
        )
        .unwrap();
        (root, plan)
    }

    #[test]
    fn exact_match_merges() {
        let (_, result) = plan_for("  10,R\n  20,RJ", &[line(10, "R"), line(20, "RJ")], false);
        assert_eq!(result, Reconciliation::Merged);
    }

    #[test]
    fn split_runs_still_match() {
        let (_, result) = plan_for(
            "# setup\n  20,R\n   0,J\n   5,",
            &[line(5, "R"), line(15, "R"), line(5, "")],
            false,
        );
        assert_eq!(result, Reconciliation::Merged);
    }

    #[test]
    fn shorter_recording_merges() {
        let (_, result) = plan_for("  10,R\n  20,RJ", &[line(10, "R"), line(4, "RJ")], false);
        assert_eq!(result, Reconciliation::Merged);
    }

    #[test]
    fn divergence_forks_at_script_line() {
        let (mut root, result) = plan_for(
            "  10,R\n  20,RJ\n",
            &[line(10, "R"), line(5, "R"), line(15, "RJ")],
            false,
        );
        let Reconciliation::Fork {
            command,
            branch_point,
        } = result
        else {
            panic!("expected a fork");
        };
        assert_eq!(branch_point, Coordinate::from(vec![1]));
        command.apply(&mut root).unwrap();

        assert_eq!(root.nodes()[0].text(), "  10,R");
        let point = root
            .resolve(&branch_point)
            .unwrap()
            .as_branch_point()
            .unwrap();
        assert_eq!(point.active_index(), 1);
        assert_eq!(point.branches()[0].name(), "main");
        assert_eq!(point.branches()[0].active_text(), "  20,RJ\n");
        assert_eq!(point.branches()[1].name(), "recorded");
        assert_eq!(point.branches()[1].active_text(), "   5,R\n  15,RJ");
        assert_eq!(root.total_frames(), 30);
    }

    #[test]
    fn divergence_inside_line_keeps_matched_frames() {
        let (mut root, result) = plan_for("  20,R", &[line(10, "R"), line(10, "J")], false);
        let Reconciliation::Fork { command, .. } = result else {
            panic!("expected a fork");
        };
        command.apply(&mut root).unwrap();
        assert_eq!(root.active_text(), "  10,R\n  10,J");
    }

    #[test]
    fn overflow_without_force_is_incomplete() {
        let (_, result) = plan_for(
            "  10,R",
            &[line(15, "R"), line(5, "J"), line(0, "")],
            false,
        );
        assert_eq!(
            result,
            Reconciliation::Incomplete {
                remaining: vec![line(5, "R"), line(5, "J"), line(0, "")]
            }
        );
    }

    #[test]
    fn overflow_with_force_appends() {
        let (mut root, result) = plan_for("  10,R", &[line(10, "R"), line(5, "J")], true);
        let Reconciliation::Append { command } = result else {
            panic!("expected an append");
        };
        assert!(matches!(command.edit, Edit::Text(_)));
        command.apply(&mut root).unwrap();
        assert_eq!(root.active_text(), "  10,R\n   5,J");
    }

    #[test]
    fn force_into_empty_script() {
        let (mut root, result) = plan_for("", &[line(3, "U")], true);
        let Reconciliation::Append { command } = result else {
            panic!("expected an append");
        };
        command.apply(&mut root).unwrap();
        assert_eq!(root.active_text(), "   3,U");
    }

    #[test]
    fn walks_into_active_branch() {
        let point = crate::core::tree::BranchPoint::new(
            vec![Branch::from_text("   5,L"), Branch::from_text("   5,R")],
            1,
        )
        .unwrap();
        let root = Branch::new(
            "",
            vec![
                Node::Segment(Segment::new("  10,")),
                Node::BranchPoint(point),
            ],
        );
        let result = plan(
            &root,
            &[line(10, ""), line(5, "R")],
            false,
            &BranchNames::default(),
            &LineFormat::default(),
        )
        .unwrap();
        assert_eq!(result, Reconciliation::Merged);

        let result = plan(
            &root,
            &[line(10, ""), line(5, "L")],
            false,
            &BranchNames::default(),
            &LineFormat::default(),
        )
        .unwrap();
        let Reconciliation::Fork { branch_point, .. } = result else {
            panic!("expected a fork");
        };
        assert_eq!(branch_point, Coordinate::from(vec![1, 1, 0]));
    }
}
