//! Workflow Data Model
//!
//! Core data structures: a [`Workflow`] is an ordered list of [`Stage`]s
//! sharing one [`Store`]; a stage is an ordered list of actions plus data
//! merged into the store when the stage starts.
//!
//! Both lists are append-only. Items are disabled rather than removed, so
//! positions stay valid while the engine iterates and actions grow the lists.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::store::Store;

use super::action::Action;
use super::tags::{filter_by_all_tags, filter_by_any_tag, filter_by_tag, TagSet, Tagged};

/// An action together with its enabled flag.
#[derive(Clone)]
pub(crate) struct ActionSlot {
    pub(crate) action: Arc<dyn Action>,
    pub(crate) enabled: bool,
}

/// An ordered group of actions.
///
/// # Example
///
/// ```
/// use stagerunner::{FnAction, Stage, Tagged};
///
/// let mut stage = Stage::with_tags("load", "Load", "Loads inputs", ["setup"]);
/// stage.set_initial_data("source", "inputs.csv".to_string());
/// stage.add_action(FnAction::noop("read", "Read"));
///
/// assert_eq!(stage.len(), 1);
/// assert!(stage.has_tag("setup"));
/// ```
pub struct Stage {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: TagSet,
    actions: Vec<ActionSlot>,
    initial_data: Store,
}

impl Stage {
    /// Creates an empty stage.
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            description: description.into(),
            tags: TagSet::new(),
            actions: Vec::new(),
            initial_data: Store::new(),
        }
    }

    /// Creates an empty stage carrying `tags`.
    pub fn with_tags(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: impl Into<TagSet>,
    ) -> Self {
        let mut stage = Self::new(id, name, description);
        stage.tags = tags.into();
        stage
    }

    /// Appends an action; it starts enabled.
    pub fn add_action<A: Action + 'static>(&mut self, action: A) {
        self.push_action(Arc::new(action));
    }

    pub(crate) fn push_action(&mut self, action: Arc<dyn Action>) {
        self.actions.push(ActionSlot {
            action,
            enabled: true,
        });
    }

    /// Records a value to merge into the workflow store when this stage starts.
    pub fn set_initial_data<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: std::any::Any + Send + Sync,
    {
        self.initial_data.put(key, value);
    }

    /// Records an explicit nil value for `key`.
    pub fn set_initial_nil(&mut self, key: impl Into<String>) {
        self.initial_data.put_nil(key);
    }

    /// Entries merged into the workflow store when the stage starts.
    pub fn initial_data(&self) -> &Store {
        &self.initial_data
    }

    /// Actions in execution order, disabled ones included.
    pub fn actions(&self) -> impl Iterator<Item = &Arc<dyn Action>> {
        self.actions.iter().map(|slot| &slot.action)
    }

    /// Looks up an action by id.
    pub fn action(&self, id: &str) -> Option<&Arc<dyn Action>> {
        self.actions
            .iter()
            .find(|slot| slot.action.id() == id)
            .map(|slot| &slot.action)
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&ActionSlot> {
        self.actions.get(index)
    }

    /// Sets the enabled flag of every action with `id`. Returns false if none matched.
    pub fn set_action_enabled(&mut self, id: &str, enabled: bool) -> bool {
        let mut found = false;
        for slot in self.actions.iter_mut().filter(|slot| slot.action.id() == id) {
            slot.enabled = enabled;
            found = true;
        }
        found
    }

    pub fn disable_action(&mut self, id: &str) -> bool {
        self.set_action_enabled(id, false)
    }

    pub fn enable_action(&mut self, id: &str) -> bool {
        self.set_action_enabled(id, true)
    }

    /// Returns false for disabled and for unknown actions.
    pub fn is_action_enabled(&self, id: &str) -> bool {
        self.actions
            .iter()
            .any(|slot| slot.enabled && slot.action.id() == id)
    }

    /// Actions carrying `tag`, in list order.
    pub fn find_actions_by_tag(&self, tag: &str) -> Vec<Arc<dyn Action>> {
        self.find_actions(|tags| tags.contains(tag))
    }

    /// Actions carrying every tag in `tags`, in list order.
    pub fn find_actions_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Vec<Arc<dyn Action>> {
        self.find_actions(|own| own.contains_all(tags))
    }

    /// Actions carrying at least one tag in `tags`, in list order.
    pub fn find_actions_by_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> Vec<Arc<dyn Action>> {
        self.find_actions(|own| own.contains_any(tags))
    }

    fn find_actions(&self, matches: impl Fn(&TagSet) -> bool) -> Vec<Arc<dyn Action>> {
        self.actions
            .iter()
            .filter(|slot| matches(slot.action.tags()))
            .map(|slot| Arc::clone(&slot.action))
            .collect()
    }

    /// Number of actions, disabled ones included.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Tagged for Stage {
    fn tags(&self) -> &TagSet {
        &self.tags
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<&str> = self.actions.iter().map(|slot| slot.action.id()).collect();
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("actions", &actions)
            .field("initial_data", &self.initial_data)
            .finish()
    }
}

/// Represents a complete workflow: ordered stages plus the shared store.
///
/// # Example
///
/// ```
/// use stagerunner::{Stage, Workflow};
///
/// let mut workflow = Workflow::new("etl", "ETL", "Extract, transform, load");
/// workflow.add_stage(Stage::new("extract", "Extract", ""));
/// workflow.add_stage(Stage::new("load", "Load", ""));
///
/// workflow.disable_stage("load");
/// assert!(!workflow.is_stage_enabled("load"));
/// ```
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: TagSet,
    stages: Vec<Stage>,
    store: Store,
    enabled: HashMap<String, bool>,
}

impl Workflow {
    /// Creates a new empty workflow with an empty store.
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            description: description.into(),
            tags: TagSet::new(),
            stages: Vec::new(),
            store: Store::new(),
            enabled: HashMap::new(),
        }
    }

    /// Replaces the workflow tags.
    pub fn with_tags(mut self, tags: impl Into<TagSet>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Appends a stage. New ids start enabled; a reused id keeps its current state.
    pub fn add_stage(&mut self, stage: Stage) {
        self.enabled.entry(stage.id.clone()).or_insert(true);
        self.stages.push(stage);
    }

    /// The store shared by every stage and action of this workflow.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Stages in execution order, disabled ones included.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    pub fn stage_mut(&mut self, id: &str) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|stage| stage.id == id)
    }

    pub(crate) fn stage_at_mut(&mut self, index: usize) -> &mut Stage {
        &mut self.stages[index]
    }

    pub fn set_stage_enabled(&mut self, id: impl Into<String>, enabled: bool) {
        self.enabled.insert(id.into(), enabled);
    }

    pub fn disable_stage(&mut self, id: &str) {
        self.set_stage_enabled(id, false);
    }

    pub fn enable_stage(&mut self, id: &str) {
        self.set_stage_enabled(id, true);
    }

    /// Returns the current enabled state; unknown stages report false.
    pub fn is_stage_enabled(&self, id: &str) -> bool {
        self.enabled.get(id).copied().unwrap_or(false)
    }

    /// Marks every known stage as enabled.
    pub fn enable_all_stages(&mut self) {
        for enabled in self.enabled.values_mut() {
            *enabled = true;
        }
        for stage in &self.stages {
            self.enabled.insert(stage.id.clone(), true);
        }
    }

    /// Stages carrying `tag`, in workflow order, regardless of enabled state.
    pub fn list_stages_by_tag(&self, tag: &str) -> Vec<&Stage> {
        filter_by_tag(&self.stages, tag)
    }

    /// Stages carrying every tag in `tags`.
    pub fn list_stages_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Vec<&Stage> {
        filter_by_all_tags(&self.stages, tags)
    }

    /// Stages carrying at least one tag in `tags`.
    pub fn list_stages_by_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> Vec<&Stage> {
        filter_by_any_tag(&self.stages, tags)
    }

    /// Returns the number of stages in the workflow.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the workflow has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Tagged for Workflow {
    fn tags(&self) -> &TagSet {
        &self.tags
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("enabled", &self.enabled)
            .field("store", &self.store)
            .finish()
    }
}
