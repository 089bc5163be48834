//! Selection state machine and keyboard navigation decisions.
//!
//! Navigation works purely on the linear row index of the flattened tree. The functions here only
//! decide; [crate::view::TreeView] carries out the resulting selection change, expansion, or move.

use serde::{Deserialize, Serialize};

use crate::{
    error::TreeError,
    properties::{FlatNode, NodeId},
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    None,
    Selected(NodeId),
    /// Move mode: the next select request names the target parent for this node.
    Moving(NodeId),
}

/// What a select request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectAction {
    Selected(NodeId),
    Deselected,
    Unchanged,
    /// Move mode is active; the owner must run the move and then call [Selection::complete_move]
    /// on success. `None` targets the top level.
    Move {
        node: NodeId,
        target: Option<NodeId>,
    },
}

impl Selection {
    pub fn selected(&self) -> Option<&NodeId> {
        match self {
            Selection::Selected(id) => Some(id),
            _ => None,
        }
    }

    pub fn moving(&self) -> Option<&NodeId> {
        match self {
            Selection::Moving(id) => Some(id),
            _ => None,
        }
    }

    /// Selecting the selected node again deselects it.
    pub fn select(&mut self, id: Option<NodeId>) -> SelectAction {
        let action = match (&*self, id) {
            (Selection::Moving(node), target) => {
                return SelectAction::Move {
                    node: node.clone(),
                    target,
                }
            }
            (Selection::Selected(current), Some(id)) if *current == id => SelectAction::Deselected,
            (_, Some(id)) => SelectAction::Selected(id),
            (Selection::Selected(_), None) => SelectAction::Deselected,
            (Selection::None, None) => SelectAction::Unchanged,
        };
        match &action {
            SelectAction::Selected(id) => *self = Selection::Selected(id.clone()),
            SelectAction::Deselected => *self = Selection::None,
            _ => {}
        }
        action
    }

    /// Selects `id` without the toggle-off behaviour. Returns whether anything changed.
    pub fn focus(&mut self, id: &NodeId) -> bool {
        if self.selected() == Some(id) {
            return false;
        }
        *self = Selection::Selected(id.clone());
        true
    }

    pub fn start_move(&mut self) -> Result<NodeId, TreeError> {
        match self {
            Selection::Selected(id) => {
                let id = id.clone();
                *self = Selection::Moving(id.clone());
                Ok(id)
            }
            Selection::Moving(id) => Err(TreeError::Command(format!(
                "already moving node '{id}'"
            ))),
            Selection::None => Err(TreeError::Command(
                "select a node before starting a move".to_string(),
            )),
        }
    }

    pub fn cancel_move(&mut self) -> Result<NodeId, TreeError> {
        match self {
            Selection::Moving(id) => {
                let id = id.clone();
                *self = Selection::None;
                Ok(id)
            }
            _ => Err(TreeError::Command("no move in progress".to_string())),
        }
    }

    /// Leaves move mode with the moved node selected.
    pub fn complete_move(&mut self) -> Option<NodeId> {
        let id = self.moving()?.clone();
        *self = Selection::Selected(id.clone());
        Some(id)
    }

    /// Drops the selection or move when its node is among the removed ids.
    ///
    /// Returns true only when a visible selection was cleared, i.e. when a deselection must be
    /// announced.
    pub fn forget<F>(&mut self, removed: F) -> bool
    where
        F: Fn(&NodeId) -> bool,
    {
        match self {
            Selection::Selected(id) if removed(id) => {
                *self = Selection::None;
                true
            }
            Selection::Moving(id) if removed(id) => {
                *self = Selection::None;
                false
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Next,
    Previous,
    FirstChild,
    Parent,
    Home,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// Select the row at this index.
    Focus(usize),
    /// Open this node and keep the current row selected.
    Expand(NodeId),
    Stay,
}

pub fn navigate(rows: &[FlatNode], current: Option<usize>, direction: Direction) -> NavOutcome {
    let Some(last) = rows.len().checked_sub(1) else {
        return NavOutcome::Stay;
    };
    let Some(cur) = current.filter(|&i| i <= last) else {
        return match direction {
            Direction::End => NavOutcome::Focus(last),
            _ => NavOutcome::Focus(0),
        };
    };
    let focus = |i: usize| {
        if i == cur {
            NavOutcome::Stay
        } else {
            NavOutcome::Focus(i)
        }
    };
    match direction {
        Direction::Next => focus((cur + 1).min(last)),
        Direction::Previous => focus(cur.saturating_sub(1)),
        Direction::Home => focus(0),
        Direction::End => focus(last),
        Direction::FirstChild => {
            let row = &rows[cur];
            if !row.has_children {
                NavOutcome::Stay
            } else if !row.is_open {
                NavOutcome::Expand(row.id.clone())
            } else {
                match rows.get(cur + 1) {
                    Some(next) if next.depth == row.depth + 1 => NavOutcome::Focus(cur + 1),
                    _ => NavOutcome::Stay,
                }
            }
        }
        Direction::Parent => {
            let depth = rows[cur].depth;
            if depth == 0 {
                return NavOutcome::Stay;
            }
            rows[..cur]
                .iter()
                .rposition(|r| r.depth == depth - 1)
                .map_or(NavOutcome::Stay, NavOutcome::Focus)
        }
    }
}
