//! Action Context
//!
//! The capability object handed to every [`Action::execute`] call. It gives
//! read access to the running workflow and stage, write access to the shared
//! store, and records mutation requests (new actions, new stages, enable and
//! disable requests). The engine applies recorded mutations in order as soon
//! as the action returns successfully, before it looks at the next position.

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::errors::CancelReason;
use crate::logger::Logger;
use crate::store::Store;
use crate::workflow::{Action, Stage, Workflow};

/// A change requested by an action while it executes.
pub(crate) enum Mutation {
    AddAction(Arc<dyn Action>),
    AddStage(Stage),
    SetActionEnabled { id: String, enabled: bool },
    SetStageEnabled { id: String, enabled: bool },
}

/// Per-invocation view of a run, passed to [`Action::execute`].
pub struct ActionContext<'a> {
    cancel: &'a CancelToken,
    workflow: &'a Workflow,
    stage: &'a Stage,
    logger: &'a dyn Logger,
    pending: Vec<Mutation>,
}

impl<'a> ActionContext<'a> {
    /// Creates a context for `stage` within `workflow`.
    ///
    /// The engine builds one per action invocation; building one by hand is
    /// useful for running the query API outside of a run.
    pub fn new(
        cancel: &'a CancelToken,
        workflow: &'a Workflow,
        stage: &'a Stage,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            cancel,
            workflow,
            stage,
            logger,
            pending: Vec::new(),
        }
    }

    /// The store shared by the whole run.
    pub fn store(&self) -> &'a Store {
        self.workflow.store()
    }

    pub fn workflow(&self) -> &'a Workflow {
        self.workflow
    }

    /// The stage currently executing.
    pub fn stage(&self) -> &'a Stage {
        self.stage
    }

    pub fn logger(&self) -> &'a dyn Logger {
        self.logger
    }

    pub fn cancel_token(&self) -> &'a CancelToken {
        self.cancel
    }

    /// Lets long-running actions stop early once the run is cancelled.
    pub fn check_cancelled(&self) -> Result<(), CancelReason> {
        self.cancel.check()
    }

    /// Appends an action to the current stage; it runs before the stage completes.
    pub fn add_dynamic_action<A: Action + 'static>(&mut self, action: A) {
        self.pending.push(Mutation::AddAction(Arc::new(action)));
    }

    /// Appends a stage to the workflow; it runs after the current stage.
    pub fn add_dynamic_stage(&mut self, stage: Stage) {
        self.pending.push(Mutation::AddStage(stage));
    }

    /// Disables an action of the current stage that has not been reached yet.
    pub fn disable_action(&mut self, id: impl Into<String>) {
        self.pending.push(Mutation::SetActionEnabled {
            id: id.into(),
            enabled: false,
        });
    }

    pub fn enable_action(&mut self, id: impl Into<String>) {
        self.pending.push(Mutation::SetActionEnabled {
            id: id.into(),
            enabled: true,
        });
    }

    /// Disables a workflow stage; stages already started are unaffected.
    pub fn disable_stage(&mut self, id: impl Into<String>) {
        self.pending.push(Mutation::SetStageEnabled {
            id: id.into(),
            enabled: false,
        });
    }

    pub fn enable_stage(&mut self, id: impl Into<String>) {
        self.pending.push(Mutation::SetStageEnabled {
            id: id.into(),
            enabled: true,
        });
    }

    /// Actions of the current stage carrying `tag`, in list order.
    pub fn find_actions_by_tag(&self, tag: &str) -> Vec<Arc<dyn Action>> {
        self.stage.find_actions_by_tag(tag)
    }

    /// Actions of the current stage carrying every tag in `tags`.
    pub fn find_actions_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Vec<Arc<dyn Action>> {
        self.stage.find_actions_by_tags(tags)
    }

    /// Actions of the current stage carrying at least one tag in `tags`.
    pub fn find_actions_by_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> Vec<Arc<dyn Action>> {
        self.stage.find_actions_by_any_tag(tags)
    }

    /// Number of mutations recorded and not yet applied.
    pub fn pending_mutations(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn into_mutations(self) -> Vec<Mutation> {
        self.pending
    }
}
