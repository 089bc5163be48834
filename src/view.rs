//! [TreeView]: the stateful command surface over the pure tree algorithms.
//!
//! A `TreeView` owns the current [Tree] together with the open, loading, and checked id sets and
//! the selection state. All reads and writes of that state happen synchronously under one lock; the
//! only suspension points are the calls into the [NodeSource]. Fetch results are applied to
//! whatever tree is current when they arrive, so concurrent fetches for different nodes never
//! overwrite each other.
//!
//! Commands never return errors for validation or unknown ids. They return `false`/`None` and
//! publish a [TreeEvent::Error] instead.
//!
//! ```rust
//! use lazytree_core::{properties::RawNode, source::MemorySource, view::TreeView};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), lazytree_core::TreeError> {
//! let source = MemorySource::new(vec![RawNode {
//!     children: Some(vec![RawNode::new("a1", "A1")]),
//!     ..RawNode::folder("a", "A")
//! }]);
//! let view = TreeView::simple(source);
//! view.load().await?;
//! view.expand_node(&"a".into(), false).await?;
//! assert_eq!(view.flat_nodes().len(), 2);
//! # Ok(())
//! # }
//! ```

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::Arc,
};
use tokio::sync::{mpsc::UnboundedSender, watch};

use crate::{
    checkbox::{self, CheckState},
    config::TreeConfig,
    error::TreeError,
    event::{MutationEvent, TreeEvent},
    navigation::{self, Direction, NavOutcome, SelectAction, Selection},
    properties::{
        id_set_with, id_set_without, FlatNode, IdSet, NodeId, NodePatch, NodeRef, RawNode,
        TreeNode,
    },
    source::NodeSource,
    tree::{
        add_node_at_path, find_and_remove_node, find_node_and_path, move_node, update_node_data,
        update_node_in_children, FlatCache, IndexCache, NodeIndex, Tree,
    },
};

#[derive(Debug, Default)]
struct ViewState {
    tree: Tree,
    open: IdSet,
    loading: IdSet,
    /// One receiver per loading id; it closes when the owning fetch releases its guard.
    in_flight: BTreeMap<NodeId, watch::Receiver<()>>,
    checked: IdSet,
    selection: Selection,
    index: IndexCache,
    flat: FlatCache,
}

impl ViewState {
    fn index(&mut self) -> Arc<NodeIndex> {
        self.index.get(&self.tree)
    }

    fn rows(&mut self) -> Arc<Vec<FlatNode>> {
        self.flat.get(&self.tree, &self.open, &self.loading)
    }

    fn open(&mut self, id: &NodeId) {
        if !self.open.contains(id) {
            self.open = id_set_with(&self.open, [id.clone()]);
        }
    }

    /// Re-derives the checked state of each id and its ancestors. Returns the new set if it changed.
    fn recheck(&mut self, ids: &[NodeId]) -> Option<BTreeSet<NodeId>> {
        let index = self.index();
        let mut checked = BTreeSet::clone(&self.checked);
        for id in ids {
            checkbox::recompute_chain(&self.tree, &index, &mut checked, id);
        }
        self.replace_checked(checked)
    }

    fn replace_checked(&mut self, checked: BTreeSet<NodeId>) -> Option<BTreeSet<NodeId>> {
        if checked == *self.checked {
            return None;
        }
        self.checked = Arc::new(checked.clone());
        Some(checked)
    }
}

/// Holds one id in the loading set for the lifetime of a fetch and releases it exactly once when
/// dropped, whatever the fetch outcome.
struct LoadingGuard<'a> {
    state: &'a Mutex<ViewState>,
    id: NodeId,
    // Dropped after the loading entry is gone, which wakes every waiter.
    _done: watch::Sender<()>,
}

impl<'a> LoadingGuard<'a> {
    /// Marks `id` as loading unless a fetch for it is already in flight. `locked` must be the
    /// guard of `state`.
    fn acquire(
        state: &'a Mutex<ViewState>,
        locked: &mut ViewState,
        id: &NodeId,
    ) -> Option<LoadingGuard<'a>> {
        if locked.loading.contains(id) {
            return None;
        }
        locked.loading = id_set_with(&locked.loading, [id.clone()]);
        let (done, pending) = watch::channel(());
        locked.in_flight.insert(id.clone(), pending);
        Some(LoadingGuard {
            state,
            id: id.clone(),
            _done: done,
        })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.loading = id_set_without(&state.loading, [&self.id]);
        state.in_flight.remove(&self.id);
    }
}

fn subtree_ids(node: &NodeRef) -> BTreeSet<NodeId> {
    let mut ids = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        ids.insert(node.id.clone());
        stack.extend(node.children.loaded().unwrap_or(&[]));
    }
    ids
}

fn raw_ids(raw: &RawNode, ids: &mut Vec<NodeId>) {
    ids.push(raw.id.clone());
    for child in raw.children.iter().flatten() {
        raw_ids(child, ids);
    }
}

pub struct TreeView<S> {
    source: S,
    config: TreeConfig,
    state: Mutex<ViewState>,
    events: Option<UnboundedSender<TreeEvent>>,
}

impl<S: NodeSource> TreeView<S> {
    pub fn new(
        source: S,
        config: TreeConfig,
        events: Option<UnboundedSender<TreeEvent>>,
    ) -> TreeView<S> {
        TreeView {
            source,
            config,
            state: Mutex::new(ViewState::default()),
            events,
        }
    }

    /// A view with default configuration and no event listener.
    pub fn simple(source: S) -> TreeView<S> {
        TreeView::new(source, TreeConfig::default(), None)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    fn emit(&self, event: TreeEvent) {
        tracing::trace!("[TreeView] emit {event}");
        if let Some(tx) = &self.events {
            if let Err(e) = tx.send(event) {
                tracing::debug!("[TreeView] event receiver closed, dropping {}", e.0);
            }
        }
    }

    fn report(&self, error: TreeError) {
        tracing::warn!("[TreeView] {error}");
        self.emit(TreeEvent::Error(error));
    }

    fn emit_checked(&self, checked: Option<BTreeSet<NodeId>>) {
        if let Some(checked) = checked {
            self.emit(TreeEvent::Checked(checked));
        }
    }

    // ---- snapshots ----

    pub fn tree(&self) -> Tree {
        self.state.lock().tree.clone()
    }

    pub fn open_ids(&self) -> IdSet {
        self.state.lock().open.clone()
    }

    pub fn loading_ids(&self) -> IdSet {
        self.state.lock().loading.clone()
    }

    pub fn selection(&self) -> Selection {
        self.state.lock().selection.clone()
    }

    pub fn node(&self, id: &NodeId) -> Option<NodeRef> {
        self.state.lock().index().get(id).cloned()
    }

    /// The visible rows, recomputed only when the tree, open set, or loading set changed.
    pub fn flat_nodes(&self) -> Arc<Vec<FlatNode>> {
        self.state.lock().rows()
    }

    // ---- loading & expansion ----

    /// Fetches and installs the top-level nodes.
    ///
    /// Loading again replaces the whole tree: open, checked and selection state start over, and a
    /// dropped selection is announced. Fetches still in flight keep their loading entries.
    pub async fn load(&self) -> Result<(), TreeError> {
        let fetched = match self.source.fetch_top_level_nodes().await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.report(e.clone());
                return Err(e);
            }
        };
        let count = fetched.len();
        let (checked, deselected) = {
            let mut state = self.state.lock();
            state.tree = Tree::from_raw(fetched.iter().map(RawNode::detached).collect());
            if !state.open.is_empty() {
                state.open = IdSet::default();
            }
            let deselected = state.selection.selected().is_some();
            state.selection = Selection::None;
            let initial = self.config.initial_checked.iter().cloned().collect();
            (state.replace_checked(initial), deselected)
        };
        tracing::info!("[TreeView::load] installed {count} top-level nodes");
        self.emit(TreeEvent::Mutation(MutationEvent::TopLevelLoaded(count)));
        self.emit_checked(checked);
        if deselected {
            self.emit(TreeEvent::Select(None, None));
        }
        Ok(())
    }

    /// Opens `id`, fetching its children first when they were never loaded.
    ///
    /// With `recursive`, every loaded descendant is opened as well, fetching unloaded ones on the
    /// way. Sibling fetches run concurrently, up to `max_concurrent_fetches`, and each result is
    /// applied as soon as it arrives. Failed branches are rolled back individually and reported
    /// one error each; successful branches stay applied. The first failure is returned.
    pub async fn expand_node(&self, id: &NodeId, recursive: bool) -> Result<(), TreeError> {
        let limit = self.config.max_concurrent_fetches.max(1);
        let mut visited = BTreeSet::new();
        let mut pending = VecDeque::from([id.clone()]);
        let mut in_flight = FuturesUnordered::new();
        let mut first_error = None;
        loop {
            while in_flight.len() < limit {
                let Some(next) = pending.pop_front() else {
                    break;
                };
                if visited.insert(next.clone()) {
                    in_flight.push(self.expand_one(next, recursive));
                }
            }
            let Some(result) = in_flight.next().await else {
                break;
            };
            match result {
                Ok(children) if recursive => pending.extend(children),
                Ok(_) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Opens one node. Returns the ids of its loaded children for recursive expansion.
    ///
    /// When another caller is already fetching `id`, a non-recursive call returns at once. A
    /// recursive one waits for that fetch to finish so it can descend into the result.
    async fn expand_one(&self, id: NodeId, recursive: bool) -> Result<Vec<NodeId>, TreeError> {
        let loading = {
            let mut state = self.state.lock();
            let index = state.index();
            let Some(node) = index.get(&id) else {
                let e = TreeError::not_found(&id);
                self.report(e.clone());
                return Err(e);
            };
            if let Some(children) = node.children.loaded() {
                state.open(&id);
                return Ok(children.iter().map(|c| c.id.clone()).collect());
            }
            if !node.has_children {
                return Ok(Vec::new());
            }
            state.open(&id);
            match LoadingGuard::acquire(&self.state, &mut state, &id) {
                Some(guard) => guard,
                None if recursive => {
                    let pending = state.in_flight.get(&id).cloned();
                    drop(state);
                    return self.join_in_flight(id, pending).await;
                }
                None => {
                    tracing::debug!("[TreeView::expand] '{id}' already loading, not refetching");
                    return Ok(Vec::new());
                }
            }
        };

        tracing::debug!("[TreeView::expand] fetching children of '{id}'");
        let fetched = self.source.fetch_children_for_node(id.clone()).await;

        let outcome = {
            let mut state = self.state.lock();
            match fetched {
                Ok(raw) => {
                    let count = raw.len();
                    let next = update_node_in_children(&state.tree, &id, raw);
                    if next.ptr_eq(&state.tree) {
                        Ok(Vec::new())
                    } else {
                        state.tree = next;
                        let index = state.index();
                        let children: Vec<NodeId> = index
                            .get(&id)
                            .and_then(|n| n.children.loaded())
                            .unwrap_or(&[])
                            .iter()
                            .map(|c| c.id.clone())
                            .collect();
                        let checked = if self.config.checkboxes && self.config.cascade_on_load {
                            let mut checked = BTreeSet::clone(&state.checked);
                            checkbox::inherit_into_children(&index, &mut checked, &id);
                            state.replace_checked(checked)
                        } else {
                            None
                        };
                        self.emit(TreeEvent::Mutation(MutationEvent::ChildrenLoaded(
                            id.clone(),
                            count,
                        )));
                        self.emit_checked(checked);
                        Ok(children)
                    }
                }
                Err(e) => {
                    state.open = id_set_without(&state.open, [&id]);
                    Err(e)
                }
            }
        };
        drop(loading);

        if let Err(e) = &outcome {
            self.report(e.clone());
        }
        outcome
    }

    /// Waits for someone else's fetch of `id` and reports the children it loaded. A failed or
    /// discarded fetch yields no children; its owner already reported the failure.
    async fn join_in_flight(
        &self,
        id: NodeId,
        pending: Option<watch::Receiver<()>>,
    ) -> Result<Vec<NodeId>, TreeError> {
        if let Some(mut pending) = pending {
            tracing::debug!("[TreeView::expand] waiting for in-flight fetch of '{id}'");
            // Never sent on; resolves with an error once the sender is dropped.
            let _ = pending.changed().await;
        }
        let mut state = self.state.lock();
        let children: Option<Vec<NodeId>> = state
            .index()
            .get(&id)
            .and_then(|n| n.children.loaded())
            .map(|c| c.iter().map(|c| c.id.clone()).collect());
        match children {
            Some(children) => {
                state.open(&id);
                Ok(children)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Closes `id`, and with `recursive` every loaded descendant too, in one update. Data stays
    /// loaded.
    pub fn collapse_node(&self, id: &NodeId, recursive: bool) {
        let mut state = self.state.lock();
        let index = state.index();
        if !index.contains(id) {
            drop(state);
            self.report(TreeError::not_found(id));
            return;
        }
        let mut closing = vec![id.clone()];
        if recursive {
            closing.extend(index.loaded_descendants(id));
        }
        if closing.iter().any(|c| state.open.contains(c)) {
            state.open = id_set_without(&state.open, &closing);
        }
    }

    // ---- structural commands ----

    /// Appends `data` under `parent` (the top level when `None`). The parent must be loaded.
    pub fn add_node(&self, data: RawNode, parent: Option<&NodeId>) -> bool {
        let mut state = self.state.lock();
        let index = state.index();
        let mut incoming = Vec::new();
        raw_ids(&data, &mut incoming);
        let mut seen = BTreeSet::new();
        if let Some(dup) = incoming
            .iter()
            .find(|id| index.contains(id) || !seen.insert(*id))
        {
            let e = TreeError::DuplicateId((*dup).clone());
            drop(state);
            self.report(e);
            return false;
        }

        let path = match parent {
            None => Vec::new(),
            Some(parent) => match find_node_and_path(&state.tree, parent) {
                None => {
                    drop(state);
                    self.report(TreeError::not_found(parent));
                    return false;
                }
                Some((node, _)) if !node.is_loaded() => {
                    drop(state);
                    self.report(TreeError::ParentNotLoaded(parent.clone()));
                    return false;
                }
                Some((_, mut path)) => {
                    path.push(parent.clone());
                    path
                }
            },
        };

        let id = data.id.clone();
        state.tree = add_node_at_path(&state.tree, &path, Arc::new(TreeNode::from_raw(data)));
        let checked = match parent {
            Some(parent) => state.recheck(&[parent.clone()]),
            None => None,
        };
        drop(state);

        tracing::debug!("[TreeView::add_node] added '{id}'");
        self.emit(TreeEvent::Mutation(MutationEvent::NodeAdded {
            id,
            parent: parent.cloned(),
        }));
        self.emit_checked(checked);
        true
    }

    /// Removes `id` and its subtree.
    pub fn remove_node(&self, id: &NodeId) -> bool {
        let mut state = self.state.lock();
        let parent = find_node_and_path(&state.tree, id).and_then(|(_, path)| path.last().cloned());
        let (next, removed) = find_and_remove_node(&state.tree, id);
        let Some(removed) = removed else {
            drop(state);
            self.report(TreeError::not_found(id));
            return false;
        };
        let gone = subtree_ids(&removed);
        state.tree = next;
        if gone.iter().any(|g| state.open.contains(g)) {
            state.open = id_set_without(&state.open, &gone);
        }
        let mut checked = BTreeSet::clone(&state.checked);
        checked.retain(|c| !gone.contains(c));
        if let Some(parent) = &parent {
            let index = state.index();
            checkbox::recompute_chain(&state.tree, &index, &mut checked, parent);
        }
        let checked = state.replace_checked(checked);
        let deselected = state.selection.forget(|s| gone.contains(s));
        drop(state);

        tracing::debug!("[TreeView::remove_node] removed '{id}' ({} nodes)", gone.len());
        self.emit(TreeEvent::Mutation(MutationEvent::NodeRemoved(id.clone())));
        self.emit_checked(checked);
        if deselected {
            self.emit(TreeEvent::Select(None, None));
        }
        true
    }

    /// Merges `patch` over the data fields of `id`. Id and children are left alone.
    pub fn update_node(&self, id: &NodeId, patch: NodePatch) -> bool {
        let mut state = self.state.lock();
        let (next, found) = update_node_data(&state.tree, id, patch);
        if !found {
            drop(state);
            self.report(TreeError::not_found(id));
            return false;
        }
        state.tree = next;
        drop(state);
        self.emit(TreeEvent::Mutation(MutationEvent::NodeUpdated(id.clone())));
        true
    }

    /// Ancestor ids from the top level down, followed by `id` itself.
    pub fn get_node_hierarchy(&self, id: &NodeId) -> Option<Vec<NodeId>> {
        let found = find_node_and_path(&self.state.lock().tree, id);
        match found {
            Some((_, mut path)) => {
                path.push(id.clone());
                Some(path)
            }
            None => {
                self.report(TreeError::not_found(id));
                None
            }
        }
    }

    // ---- selection & move mode ----

    /// Selects `id`, or clears the selection with `None`. Selecting the selected node deselects
    /// it.
    ///
    /// In move mode the request names the move target instead, and `None` moves the node to the
    /// top level rather than deselecting. Hosts that use `None` as a plain deselect should call
    /// [TreeView::cancel_move] first, or use [TreeView::move_to_root] to make the intent explicit.
    pub fn select_node(&self, id: Option<NodeId>) {
        let mut state = self.state.lock();
        if let Some(target) = &id {
            if state.selection.moving().is_none() && !state.index().contains(target) {
                drop(state);
                self.report(TreeError::not_found(target));
                return;
            }
        }
        match state.selection.select(id) {
            SelectAction::Selected(id) => {
                let node = state.index().get(&id).cloned();
                drop(state);
                self.emit(TreeEvent::Select(Some(id), node));
            }
            SelectAction::Deselected => {
                drop(state);
                self.emit(TreeEvent::Select(None, None));
            }
            SelectAction::Unchanged => {}
            SelectAction::Move { node, target } => {
                self.apply_move(state, node, target);
            }
        }
    }

    fn apply_move(
        &self,
        mut state: parking_lot::MutexGuard<'_, ViewState>,
        node: NodeId,
        target: Option<NodeId>,
    ) -> bool {
        let from = find_node_and_path(&state.tree, &node).and_then(|(_, path)| path.last().cloned());
        match move_node(&state.tree, &node, target.as_ref()) {
            Ok(next) => {
                state.tree = next;
                let affected: Vec<NodeId> = from.iter().chain(target.iter()).cloned().collect();
                let checked = state.recheck(&affected);
                state.selection.complete_move();
                let data = state.index().get(&node).cloned();
                drop(state);
                tracing::debug!("[TreeView::move] moved '{node}'");
                self.emit(TreeEvent::Mutation(MutationEvent::NodeMoved {
                    id: node.clone(),
                    from,
                    to: target,
                }));
                self.emit_checked(checked);
                self.emit(TreeEvent::Select(Some(node), data));
                true
            }
            Err(e) => {
                drop(state);
                self.report(e);
                false
            }
        }
    }

    /// Completes the pending move by placing the node at the end of the top level.
    pub fn move_to_root(&self) -> bool {
        let state = self.state.lock();
        let Some(node) = state.selection.moving().cloned() else {
            drop(state);
            self.report(TreeError::Command("no move in progress".to_string()));
            return false;
        };
        self.apply_move(state, node, None)
    }

    /// Enters move mode for the selected node. The selection is cleared while moving.
    pub fn start_move(&self) -> bool {
        let started = self.state.lock().selection.start_move();
        match started {
            Ok(id) => {
                tracing::debug!("[TreeView::start_move] moving '{id}'");
                self.emit(TreeEvent::Select(None, None));
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    pub fn cancel_move(&self) -> bool {
        let cancelled = self.state.lock().selection.cancel_move();
        match cancelled {
            Ok(_) => true,
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    /// Moves the selection through the visible rows. First-child on a closed node expands it
    /// and keeps the current row selected.
    pub async fn navigate(&self, direction: Direction) {
        let (rows, outcome) = {
            let mut state = self.state.lock();
            if let Some(id) = state.selection.moving() {
                tracing::debug!("[TreeView::navigate] ignored while moving '{id}'");
                return;
            }
            let rows = state.rows();
            let current = state
                .selection
                .selected()
                .and_then(|id| rows.iter().position(|r| &r.id == id));
            let outcome = navigation::navigate(&rows, current, direction);
            (rows, outcome)
        };
        match outcome {
            NavOutcome::Focus(i) => {
                let row = &rows[i];
                let changed = self.state.lock().selection.focus(&row.id);
                if changed {
                    self.emit(TreeEvent::Select(Some(row.id.clone()), Some(row.node.clone())));
                }
            }
            NavOutcome::Expand(id) => {
                // Failures are already reported through the event stream.
                let _ = self.expand_node(&id, false).await;
            }
            NavOutcome::Stay => {}
        }
    }

    // ---- checkboxes ----

    fn checkboxes_enabled(&self) -> bool {
        if !self.config.checkboxes {
            self.report(TreeError::Command("checkboxes are disabled".to_string()));
        }
        self.config.checkboxes
    }

    /// Flips the checkbox of `id`, cascading through loaded descendants and ancestors.
    pub fn toggle_checked(&self, id: &NodeId) -> bool {
        if !self.checkboxes_enabled() {
            return false;
        }
        let mut state = self.state.lock();
        let index = state.index();
        if !index.contains(id) {
            drop(state);
            self.report(TreeError::not_found(id));
            return false;
        }
        let next = checkbox::toggle(&state.tree, &index, &state.checked, id);
        let checked = state.replace_checked(next);
        drop(state);
        self.emit_checked(checked);
        true
    }

    pub fn get_checked_nodes(&self) -> Vec<NodeId> {
        self.state.lock().checked.iter().cloned().collect()
    }

    pub fn checked_ids(&self) -> IdSet {
        self.state.lock().checked.clone()
    }

    /// Replaces the checked set wholesale. No cascade is applied.
    pub fn set_checked_nodes(&self, ids: Vec<NodeId>) {
        if !self.checkboxes_enabled() {
            return;
        }
        let checked = self
            .state
            .lock()
            .replace_checked(ids.into_iter().collect());
        self.emit_checked(checked);
    }

    pub fn check_state(&self, id: &NodeId) -> Option<CheckState> {
        let mut state = self.state.lock();
        let node = state.index().get(id).cloned()?;
        Some(checkbox::check_state(&node, &state.checked))
    }
}
