//! Structural edits: node splices and branch bookkeeping
//!
//! Every edit stores owned snapshots of whatever it removes or inserts and
//! verifies the live tree still matches them before touching it.

use crate::core::address::Coordinate;
use crate::core::errors::{EditorError, Result};
use crate::core::tree::{Branch, BranchPoint, Node};

/// Replace a run of nodes inside one branch
///
/// Creating, deleting, accepting and dissolving branch points are all
/// expressed as a single splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestructureEdit {
    /// Coordinate of the branch holding the nodes
    pub target: Coordinate,
    /// Index of the first replaced node
    pub index: usize,
    /// Nodes present before the edit
    pub removed: Vec<Node>,
    /// Nodes present after the edit
    pub inserted: Vec<Node>,
}

impl RestructureEdit {
    const COMMAND: &'static str = "restructure";

    /// Apply the splice
    ///
    /// # Errors
    /// Fails without mutating when the branch no longer holds `removed`.
    pub fn apply(&self, root: &mut Branch) -> Result<()> {
        self.splice(root, &self.removed, &self.inserted)
    }

    /// Undo the splice
    ///
    /// # Errors
    /// Fails without mutating when the branch no longer holds `inserted`.
    pub fn revert(&self, root: &mut Branch) -> Result<()> {
        self.splice(root, &self.inserted, &self.removed)
    }

    fn splice(&self, root: &mut Branch, expected: &[Node], replacement: &[Node]) -> Result<()> {
        let branch = root
            .resolve_mut(&self.target)?
            .into_branch(Self::COMMAND, &self.target)?;
        let end = self.index + expected.len();
        if branch.nodes().get(self.index..end) != Some(expected) {
            return Err(EditorError::history(format!(
                "branch at {} no longer holds the expected {} node(s) at index {}",
                self.target,
                expected.len(),
                self.index
            )));
        }
        branch
            .nodes_mut()
            .splice(self.index..end, replacement.iter().cloned());
        Ok(())
    }
}

/// Append a branch to a branch point and make it active
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddBranch {
    /// Coordinate of the branch point
    pub target: Coordinate,
    /// Active index before the edit
    pub active_before: usize,
    /// The appended branch
    pub branch: Branch,
}

impl AddBranch {
    const COMMAND: &'static str = "add branch";

    /// Append the branch
    ///
    /// # Errors
    /// Fails when `target` is not a branch point.
    pub fn apply(&self, root: &mut Branch) -> Result<()> {
        let point = branch_point(root, &self.target, Self::COMMAND)?;
        check_active(point, self.active_before, &self.target)?;
        point.branches_mut().push(self.branch.clone());
        let active = point.len() - 1;
        point.set_active_index(active);
        Ok(())
    }

    /// Remove the appended branch again
    ///
    /// # Errors
    /// Fails without mutating when the last branch is not the appended one.
    pub fn revert(&self, root: &mut Branch) -> Result<()> {
        let point = branch_point(root, &self.target, Self::COMMAND)?;
        if point.len() < 2 || point.branches().last() != Some(&self.branch) {
            return Err(EditorError::history(format!(
                "branch point at {} does not end with the added branch",
                self.target
            )));
        }
        point.branches_mut().pop();
        point.set_active_index(self.active_before);
        Ok(())
    }
}

/// Remove one branch of a branch point that keeps at least two
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveBranch {
    /// Coordinate of the branch point
    pub target: Coordinate,
    /// Index of the removed branch
    pub index: usize,
    /// Active index before the edit
    pub active_before: usize,
    /// Active index after the edit
    pub active_after: usize,
    /// The removed branch
    pub removed: Branch,
}

impl RemoveBranch {
    const COMMAND: &'static str = "remove branch";

    /// Remove the branch
    ///
    /// # Errors
    /// Fails without mutating when fewer than two branches would remain or
    /// the branch at `index` is not the recorded one.
    pub fn apply(&self, root: &mut Branch) -> Result<()> {
        let point = branch_point(root, &self.target, Self::COMMAND)?;
        if point.len() <= 2 {
            return Err(EditorError::branch_point(
                "removing a branch would leave a single-branch point",
            ));
        }
        check_active(point, self.active_before, &self.target)?;
        if point.branches().get(self.index) != Some(&self.removed) {
            return Err(EditorError::history(format!(
                "branch point at {} no longer holds the removed branch at {}",
                self.target, self.index
            )));
        }
        point.branches_mut().remove(self.index);
        point.set_active_index(self.active_after);
        Ok(())
    }

    /// Put the branch back
    ///
    /// # Errors
    /// Fails when `target` is not a branch point or `index` is out of range.
    pub fn revert(&self, root: &mut Branch) -> Result<()> {
        let point = branch_point(root, &self.target, Self::COMMAND)?;
        if self.index > point.len() {
            return Err(EditorError::invalid_address(
                &self.target,
                format!("cannot reinsert branch at {}", self.index),
            ));
        }
        point.branches_mut().insert(self.index, self.removed.clone());
        point.set_active_index(self.active_before);
        Ok(())
    }
}

/// Switch the active branch of a branch point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetActiveBranch {
    /// Coordinate of the branch point
    pub target: Coordinate,
    /// Active index before the edit
    pub active_before: usize,
    /// Active index after the edit
    pub active_after: usize,
}

impl SetActiveBranch {
    const COMMAND: &'static str = "set active branch";

    /// Activate `active_after`
    ///
    /// # Errors
    /// Fails when the current active index is not `active_before`.
    pub fn apply(&self, root: &mut Branch) -> Result<()> {
        self.switch(root, self.active_before, self.active_after)
    }

    /// Activate `active_before`
    ///
    /// # Errors
    /// Fails when the current active index is not `active_after`.
    pub fn revert(&self, root: &mut Branch) -> Result<()> {
        self.switch(root, self.active_after, self.active_before)
    }

    fn switch(&self, root: &mut Branch, from: usize, to: usize) -> Result<()> {
        let point = branch_point(root, &self.target, Self::COMMAND)?;
        check_active(point, from, &self.target)?;
        if to >= point.len() {
            return Err(EditorError::invalid_address(
                &self.target,
                format!("branch index {to} out of range ({} available)", point.len()),
            ));
        }
        point.set_active_index(to);
        Ok(())
    }
}

/// Rename a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameBranch {
    /// Coordinate of the branch
    pub target: Coordinate,
    /// Name before the edit
    pub name_before: String,
    /// Name after the edit
    pub name_after: String,
}

impl RenameBranch {
    const COMMAND: &'static str = "rename branch";

    /// Set `name_after`
    ///
    /// # Errors
    /// Fails when the branch is not currently named `name_before`.
    pub fn apply(&self, root: &mut Branch) -> Result<()> {
        self.rename(root, &self.name_before, &self.name_after)
    }

    /// Restore `name_before`
    ///
    /// # Errors
    /// Fails when the branch is not currently named `name_after`.
    pub fn revert(&self, root: &mut Branch) -> Result<()> {
        self.rename(root, &self.name_after, &self.name_before)
    }

    fn rename(&self, root: &mut Branch, from: &str, to: &str) -> Result<()> {
        if self.target.is_empty() {
            return Err(EditorError::unsupported(Self::COMMAND, "root", &self.target));
        }
        let branch = root
            .resolve_mut(&self.target)?
            .into_branch(Self::COMMAND, &self.target)?;
        if branch.name() != from {
            return Err(EditorError::history(format!(
                "branch at {} is named {:?}, expected {from:?}",
                self.target,
                branch.name()
            )));
        }
        branch.set_name(to.to_string());
        Ok(())
    }
}

fn branch_point<'a>(
    root: &'a mut Branch,
    target: &Coordinate,
    command: &'static str,
) -> Result<&'a mut BranchPoint> {
    root.resolve_mut(target)?.into_branch_point(command, target)
}

fn check_active(point: &BranchPoint, expected: usize, target: &Coordinate) -> Result<()> {
    if point.active_index() == expected {
        Ok(())
    } else {
        Err(EditorError::history(format!(
            "branch point at {target} has active branch {}, expected {expected}",
            point.active_index()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::Segment;
    use pretty_assertions::assert_eq;

    fn with_point(count: usize) -> Branch {
        let branches = (0..count)
            .map(|index| Branch::from_text(format!("   {index},R")))
            .collect();
        let point = BranchPoint::new(branches, 0).unwrap();
        Branch::new(
            "",
            vec![
                Node::Segment(Segment::new("  10,")),
                Node::BranchPoint(point),
            ],
        )
    }

    fn point_at(root: &Branch) -> &BranchPoint {
        root.resolve(&Coordinate::from(vec![1]))
            .unwrap()
            .as_branch_point()
            .unwrap()
    }

    #[test]
    fn restructure_round_trip() {
        let mut root = with_point(2);
        let before = root.clone();
        let edit = RestructureEdit {
            target: Coordinate::root(),
            index: 1,
            removed: root.nodes()[1..].to_vec(),
            inserted: vec![Node::Segment(Segment::new("   0,R"))],
        };
        edit.apply(&mut root).unwrap();
        assert_eq!(root.active_text(), "  10,\n   0,R");
        assert!(edit.apply(&mut root).is_err());
        edit.revert(&mut root).unwrap();
        assert_eq!(root, before);
    }

    #[test]
    fn add_branch_activates_and_reverts() {
        let mut root = with_point(2);
        let edit = AddBranch {
            target: Coordinate::from(vec![1]),
            active_before: 0,
            branch: Branch::from_text("   9,J"),
        };
        edit.apply(&mut root).unwrap();
        assert_eq!(point_at(&root).active_index(), 2);
        assert_eq!(root.active_text(), "  10,\n   9,J");
        edit.revert(&mut root).unwrap();
        assert_eq!(point_at(&root).len(), 2);
        assert_eq!(point_at(&root).active_index(), 0);
    }

    #[test]
    fn remove_branch_keeps_two() {
        let mut root = with_point(3);
        let removed = point_at(&root).branches()[0].clone();
        let edit = RemoveBranch {
            target: Coordinate::from(vec![1]),
            index: 0,
            active_before: 0,
            active_after: 0,
            removed,
        };
        edit.apply(&mut root).unwrap();
        assert_eq!(point_at(&root).len(), 2);
        assert_eq!(root.active_text(), "  10,\n   1,R");
        assert!(edit.apply(&mut root).is_err());
        edit.revert(&mut root).unwrap();
        assert_eq!(root, with_point(3));
    }

    #[test]
    fn set_active_checks_current() {
        let mut root = with_point(2);
        let edit = SetActiveBranch {
            target: Coordinate::from(vec![1]),
            active_before: 0,
            active_after: 1,
        };
        edit.apply(&mut root).unwrap();
        assert_eq!(root.active_text(), "  10,\n   1,R");
        assert!(edit.apply(&mut root).is_err());
        edit.revert(&mut root).unwrap();
        assert_eq!(point_at(&root).active_index(), 0);
    }

    #[test]
    fn rename_branch_and_root_rejected() {
        let mut root = with_point(2);
        let edit = RenameBranch {
            target: Coordinate::from(vec![1, 1]),
            name_before: String::new(),
            name_after: "safe".to_string(),
        };
        edit.apply(&mut root).unwrap();
        assert_eq!(point_at(&root).branches()[1].name(), "safe");
        edit.revert(&mut root).unwrap();
        assert_eq!(point_at(&root).branches()[1].name(), "");

        let on_root = RenameBranch {
            target: Coordinate::root(),
            ..edit
        };
        assert!(matches!(
            on_root.apply(&mut root),
            Err(EditorError::UnsupportedCommand { .. })
        ));
    }

    #[test]
    fn wrong_kind_is_unsupported() {
        let mut root = with_point(2);
        let edit = SetActiveBranch {
            target: Coordinate::from(vec![0]),
            active_before: 0,
            active_after: 1,
        };
        assert!(matches!(
            edit.apply(&mut root),
            Err(EditorError::UnsupportedCommand { .. })
        ));
    }
}
