//! Command system for script edits
//!
//! Every mutation of a script tree is an [`EditCommand`]: a closed set of
//! edit kinds ([`Edit`]), each with a forward `apply` and an inverse
//! `revert`, plus the focus coordinates the UI should return to. Commands
//! are built immutably from the current tree and applied atomically: a
//! failing `apply` or `revert` leaves the tree untouched.

pub mod branch;
pub mod builders;
pub mod text;

pub use branch::{AddBranch, RemoveBranch, RenameBranch, RestructureEdit, SetActiveBranch};
pub use builders::{
    accept_branch_point, add_branch, create_branch_point, delete_branch_point, fork_at_line,
    remove_branch, rename_branch, set_active_branch,
};
pub use text::TextEdit;

use crate::core::address::Coordinate;
use crate::core::errors::Result;
use crate::core::position::Position;
use crate::core::tree::Branch;

/// Default names given to branches created by the editor
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BranchNames {
    /// Branch holding the pre-existing content of a new branch point
    pub main: String,
    /// Branch holding a recorded take that diverged
    pub recorded: String,
    /// Variant added next to `main` when a branch point is created
    pub variant: String,
}

impl Default for BranchNames {
    fn default() -> Self {
        Self {
            main: "main".to_string(),
            recorded: "recorded".to_string(),
            variant: String::new(),
        }
    }
}

/// The closed set of edit kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Replace text inside one segment
    Text(TextEdit),
    /// Splice nodes inside one branch
    Restructure(RestructureEdit),
    /// Append a branch to a branch point
    AddBranch(AddBranch),
    /// Remove a branch from a branch point
    RemoveBranch(RemoveBranch),
    /// Switch the active branch
    SetActiveBranch(SetActiveBranch),
    /// Rename a branch
    RenameBranch(RenameBranch),
}

impl Edit {
    /// Apply the forward effect
    ///
    /// # Errors
    /// Fails without mutating when the tree does not match the edit.
    pub fn apply(&self, root: &mut Branch) -> Result<()> {
        match self {
            Self::Text(edit) => edit.apply(root),
            Self::Restructure(edit) => edit.apply(root),
            Self::AddBranch(edit) => edit.apply(root),
            Self::RemoveBranch(edit) => edit.apply(root),
            Self::SetActiveBranch(edit) => edit.apply(root),
            Self::RenameBranch(edit) => edit.apply(root),
        }
    }

    /// Apply the inverse effect
    ///
    /// # Errors
    /// Fails without mutating when the tree does not match the edit.
    pub fn revert(&self, root: &mut Branch) -> Result<()> {
        match self {
            Self::Text(edit) => edit.revert(root),
            Self::Restructure(edit) => edit.revert(root),
            Self::AddBranch(edit) => edit.revert(root),
            Self::RemoveBranch(edit) => edit.revert(root),
            Self::SetActiveBranch(edit) => edit.revert(root),
            Self::RenameBranch(edit) => edit.revert(root),
        }
    }

    /// Coordinate the edit acts on
    #[must_use]
    pub const fn target(&self) -> &Coordinate {
        match self {
            Self::Text(edit) => &edit.target,
            Self::Restructure(edit) => &edit.target,
            Self::AddBranch(edit) => &edit.target,
            Self::RemoveBranch(edit) => &edit.target,
            Self::SetActiveBranch(edit) => &edit.target,
            Self::RenameBranch(edit) => &edit.target,
        }
    }

    /// Short description for menus and logs
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Text(_) => "Edit text",
            Self::Restructure(_) => "Restructure branches",
            Self::AddBranch(_) => "Add branch",
            Self::RemoveBranch(_) => "Remove branch",
            Self::SetActiveBranch(_) => "Switch branch",
            Self::RenameBranch(_) => "Rename branch",
        }
    }

    /// Whether the edit changes the node structure and so invalidates
    /// coordinates computed before it
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Restructure(_) | Self::AddBranch(_) | Self::RemoveBranch(_)
        )
    }
}

/// An edit plus the UI focus to restore around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCommand {
    /// What the command does to the tree
    pub edit: Edit,
    /// Focus to restore on undo; filled from the current focus when applied
    pub focus_before: Option<Coordinate>,
    /// Focus to restore on redo
    pub focus_after: Option<Coordinate>,
}

impl EditCommand {
    /// Wrap an edit without focus information
    #[must_use]
    pub const fn new(edit: Edit) -> Self {
        Self {
            edit,
            focus_before: None,
            focus_after: None,
        }
    }

    /// Set the focus to restore on undo
    #[must_use]
    pub fn with_focus_before(mut self, focus: Coordinate) -> Self {
        self.focus_before = Some(focus);
        self
    }

    /// Set the focus to restore on redo
    #[must_use]
    pub fn with_focus_after(mut self, focus: Coordinate) -> Self {
        self.focus_after = Some(focus);
        self
    }

    /// Apply the forward effect
    ///
    /// # Errors
    /// Fails without mutating when the tree does not match the edit.
    pub fn apply(&self, root: &mut Branch) -> Result<()> {
        self.edit.apply(root)
    }

    /// Apply the inverse effect
    ///
    /// # Errors
    /// Fails without mutating when the tree does not match the edit.
    pub fn revert(&self, root: &mut Branch) -> Result<()> {
        self.edit.revert(root)
    }

    /// Coordinate the command acts on
    #[must_use]
    pub const fn target(&self) -> &Coordinate {
        self.edit.target()
    }

    /// Short description for menus and logs
    #[must_use]
    pub const fn description(&self) -> &'static str {
        self.edit.description()
    }

    /// Caret to restore on undo, for text edits
    #[must_use]
    pub const fn cursor_before(&self) -> Option<Position> {
        match &self.edit {
            Edit::Text(edit) => Some(edit.cursor_before),
            _ => None,
        }
    }

    /// Caret to restore on redo, for text edits
    #[must_use]
    pub const fn cursor_after(&self) -> Option<Position> {
        match &self.edit {
            Edit::Text(edit) => Some(edit.cursor_after),
            _ => None,
        }
    }

    /// Merge `next` into this command if both are text edits of one typing
    /// burst
    #[must_use]
    pub fn coalesce(&self, next: &Self) -> Option<Self> {
        let (Edit::Text(first), Edit::Text(second)) = (&self.edit, &next.edit) else {
            return None;
        };
        first.coalesce(second).map(|merged| Self {
            edit: Edit::Text(merged),
            focus_before: self.focus_before.clone(),
            focus_after: next.focus_after.clone(),
        })
    }
}

impl From<Edit> for EditCommand {
    fn from(edit: Edit) -> Self {
        Self::new(edit)
    }
}

impl From<TextEdit> for EditCommand {
    fn from(edit: TextEdit) -> Self {
        let target = edit.target.clone();
        Self::new(Edit::Text(edit)).with_focus_after(target)
    }
}
