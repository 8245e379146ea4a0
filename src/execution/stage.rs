//! Stage Execution
//!
//! Runs the actions of one stage in list order:
//! - Refuses to start once the run is cancelled
//! - Merges the stage's initial data into the workflow store
//! - Skips disabled actions without invoking them
//! - Applies the mutations an action recorded as soon as it returns
//! - Stops at the first failing action
//!
//! The loop walks positions and re-reads the action count on every step, so
//! actions appended during the pass are executed before the stage completes.

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::errors::RunError;
use crate::logger::Logger;
use crate::workflow::{Stage, Workflow};

use super::context::{ActionContext, Mutation};

/// Where the executing stage lives.
pub(crate) enum StageSlot<'s> {
    /// Index into the workflow's own stage list.
    Member(usize),
    /// A stage run against the workflow without being part of it.
    Detached(&'s mut Stage),
}

impl StageSlot<'_> {
    fn get<'b>(&'b self, workflow: &'b Workflow) -> &'b Stage {
        match self {
            Self::Member(index) => &workflow.stages()[*index],
            Self::Detached(stage) => &**stage,
        }
    }

    fn get_mut<'b>(&'b mut self, workflow: &'b mut Workflow) -> &'b mut Stage {
        match self {
            Self::Member(index) => workflow.stage_at_mut(*index),
            Self::Detached(stage) => &mut **stage,
        }
    }
}

/// Executes one stage to completion or to its first failure.
pub(crate) fn run_stage(
    cancel: &CancelToken,
    workflow: &mut Workflow,
    mut slot: StageSlot<'_>,
    logger: &dyn Logger,
) -> Result<(), RunError> {
    if let Err(reason) = cancel.check() {
        let stage_id = slot.get(workflow).id.clone();
        logger.warn(format_args!(
            "Stage '{}' cancelled before it started: {}",
            stage_id, reason
        ));
        return Err(RunError::Cancelled {
            workflow_id: workflow.id.clone(),
            checkpoint: format!("stage '{}'", stage_id),
            reason,
        });
    }

    let stage_id = {
        let stage = slot.get(workflow);
        logger.info(format_args!(
            "Starting stage '{}' ({} actions)",
            stage.id,
            stage.len()
        ));

        let merged = workflow.store().merge(stage.initial_data());
        if merged > 0 {
            logger.debug(format_args!(
                "Stage '{}' merged {} initial keys into the store",
                stage.id, merged
            ));
        }
        stage.id.clone()
    };

    let mut index = 0;
    let mut executed = 0;

    loop {
        let (action, enabled) = match slot.get(workflow).slot(index) {
            Some(entry) => (Arc::clone(&entry.action), entry.enabled),
            None => break,
        };

        if let Err(reason) = cancel.check() {
            logger.warn(format_args!(
                "Stage '{}' cancelled before action '{}': {}",
                stage_id,
                action.id(),
                reason
            ));
            return Err(RunError::Cancelled {
                workflow_id: workflow.id.clone(),
                checkpoint: format!("action '{}' of stage '{}'", action.id(), stage_id),
                reason,
            });
        }

        if !enabled {
            logger.debug(format_args!(
                "Skipping disabled action '{}' in stage '{}'",
                action.id(),
                stage_id
            ));
            index += 1;
            continue;
        }

        logger.debug(format_args!(
            "Executing action '{}' ({}) in stage '{}'",
            action.id(),
            action.name(),
            stage_id
        ));

        let (result, mutations) = {
            let mut ctx = ActionContext::new(cancel, workflow, slot.get(workflow), logger);
            let result = action.execute(&mut ctx);
            (result, ctx.into_mutations())
        };

        if let Err(source) = result {
            logger.error(format_args!(
                "Action '{}' in stage '{}' failed: {}",
                action.id(),
                stage_id,
                source
            ));
            return Err(RunError::ActionExecution {
                stage_id,
                action_id: action.id().to_string(),
                action_name: action.name().to_string(),
                source,
            });
        }

        apply_mutations(workflow, &mut slot, mutations, logger);
        executed += 1;
        index += 1;
    }

    logger.info(format_args!(
        "Stage '{}' completed ({} actions executed)",
        stage_id, executed
    ));
    Ok(())
}

/// Applies recorded mutations in the order the action requested them.
fn apply_mutations(
    workflow: &mut Workflow,
    slot: &mut StageSlot<'_>,
    mutations: Vec<Mutation>,
    logger: &dyn Logger,
) {
    for mutation in mutations {
        match mutation {
            Mutation::AddAction(action) => {
                let stage = slot.get_mut(workflow);
                logger.debug(format_args!(
                    "Adding dynamic action '{}' to stage '{}'",
                    action.id(),
                    stage.id
                ));
                stage.push_action(action);
            }
            Mutation::AddStage(stage) => {
                logger.debug(format_args!("Adding dynamic stage '{}'", stage.id));
                workflow.add_stage(stage);
            }
            Mutation::SetActionEnabled { id, enabled } => {
                let stage = slot.get_mut(workflow);
                if !stage.set_action_enabled(&id, enabled) {
                    logger.warn(format_args!(
                        "Cannot {} unknown action '{}' in stage '{}'",
                        if enabled { "enable" } else { "disable" },
                        id,
                        stage.id
                    ));
                }
            }
            Mutation::SetStageEnabled { id, enabled } => {
                if workflow.stage(&id).is_none() {
                    logger.warn(format_args!(
                        "Recording enabled={} for unknown stage '{}'",
                        enabled, id
                    ));
                }
                workflow.set_stage_enabled(id, enabled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::testing::RecordingLogger;
    use crate::logger::NullLogger;
    use crate::workflow::FnAction;
    use log::Level;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting(id: &str, counter: &Arc<AtomicUsize>) -> FnAction {
        let counter = Arc::clone(counter);
        FnAction::new(id, id, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn run_first_stage(workflow: &mut Workflow) -> Result<(), RunError> {
        run_stage(&CancelToken::new(), workflow, StageSlot::Member(0), &NullLogger)
    }

    #[test]
    fn test_runs_actions_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut stage = Stage::new("s", "Stage", "");
        for id in ["a", "b", "c"] {
            let order = Arc::clone(&order);
            stage.add_action(FnAction::new(id, id, move |ctx| {
                order.lock().unwrap().push(ctx.stage().id.clone() + "/" + id);
                Ok(())
            }));
        }
        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);

        run_first_stage(&mut workflow).unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["s/a", "s/b", "s/c"]);
    }

    #[test]
    fn test_fail_fast_within_stage() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stage = Stage::new("test-stage", "Test Stage", "");
        stage.add_action(counting("success-action", &counter));
        let failing = Arc::clone(&counter);
        stage.add_action(FnAction::new("failing-action", "Failing Action", move |_| {
            failing.fetch_add(1, Ordering::SeqCst);
            Err("action failed".into())
        }));
        stage.add_action(counting("never-executed", &counter));

        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);

        let err = run_first_stage(&mut workflow).unwrap_err();

        assert!(err.to_string().contains("action failed"));
        assert_eq!(err.action_id(), Some("failing-action"));
        assert_eq!(err.stage_id(), Some("test-stage"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_skips_disabled_actions() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stage = Stage::new("s", "Stage", "");
        stage.add_action(counting("a", &counter));
        stage.add_action(counting("b", &counter));
        stage.disable_action("b");

        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);
        run_first_stage(&mut workflow).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_initial_data_overrides_store() {
        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.store().put("key", "workflow".to_string());

        let mut stage = Stage::new("s", "Stage", "");
        stage.set_initial_data("key", "stage".to_string());
        stage.add_action(FnAction::new("check", "Check", |ctx| {
            let value: String = ctx.store().get("key")?;
            if value != "stage" {
                return Err(format!("unexpected value {}", value).into());
            }
            Ok(())
        }));
        workflow.add_stage(stage);

        run_first_stage(&mut workflow).unwrap();
    }

    #[test]
    fn test_dynamic_actions_run_in_same_pass() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let generator_order = Arc::clone(&order);

        let mut stage = Stage::new("dynamic-stage", "Dynamic Stage", "");
        stage.add_action(FnAction::new("generator", "Generator", move |ctx| {
            generator_order.lock().unwrap().push("generator");
            for id in ["dynamic1", "dynamic2"] {
                let order = Arc::clone(&generator_order);
                ctx.add_dynamic_action(FnAction::new(id, id, move |_| {
                    order.lock().unwrap().push(id);
                    Ok(())
                }));
            }
            Ok(())
        }));
        let tail_order = Arc::clone(&order);
        stage.add_action(FnAction::new("static", "Static", move |_| {
            tail_order.lock().unwrap().push("static");
            Ok(())
        }));

        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);
        run_first_stage(&mut workflow).unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            vec!["generator", "static", "dynamic1", "dynamic2"]
        );
        assert_eq!(workflow.stages()[0].len(), 4);
    }

    #[test]
    fn test_disable_not_yet_reached_action() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stage = Stage::new("control-stage", "Control Stage", "");
        stage.add_action(FnAction::new("control", "Control", |ctx| {
            ctx.disable_action("target");
            Ok(())
        }));
        stage.add_action(counting("target", &counter));
        stage.add_action(counting("final", &counter));

        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);
        run_first_stage(&mut workflow).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!workflow.stages()[0].is_action_enabled("target"));
    }

    #[test]
    fn test_disabling_passed_action_has_no_effect() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stage = Stage::new("s", "Stage", "");
        stage.add_action(counting("first", &counter));
        stage.add_action(FnAction::new("late-disable", "Late Disable", |ctx| {
            ctx.disable_action("first");
            Ok(())
        }));

        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);
        run_first_stage(&mut workflow).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_action_mutations_are_discarded() {
        let mut stage = Stage::new("s", "Stage", "");
        stage.add_action(FnAction::new("fails", "Fails", |ctx| {
            ctx.add_dynamic_action(FnAction::noop("never", "Never"));
            ctx.add_dynamic_stage(Stage::new("never-stage", "Never", ""));
            Err("boom".into())
        }));

        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);

        assert!(run_first_stage(&mut workflow).is_err());
        assert_eq!(workflow.stages()[0].len(), 1);
        assert_eq!(workflow.len(), 1);
    }

    #[test]
    fn test_detached_stage_uses_workflow_store() {
        let mut workflow = Workflow::new("wf", "Workflow", "");
        let mut stage = Stage::new("detached", "Detached", "");
        stage.set_initial_data("stage-key", "stage-value".to_string());
        stage.add_action(FnAction::new("copy", "Copy", |ctx| {
            let value: String = ctx.store().get("stage-key")?;
            ctx.store().put("copied", value);
            ctx.add_dynamic_action(FnAction::noop("extra", "Extra"));
            Ok(())
        }));

        run_stage(
            &CancelToken::new(),
            &mut workflow,
            StageSlot::Detached(&mut stage),
            &NullLogger,
        )
        .unwrap();

        assert_eq!(workflow.store().get::<String>("copied").unwrap(), "stage-value");
        assert_eq!(stage.len(), 2);
        assert!(workflow.is_empty());
    }

    #[test]
    fn test_cancelled_before_first_action() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stage = Stage::new("s", "Stage", "");
        stage.add_action(counting("a", &counter));
        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = run_stage(&cancel, &mut workflow, StageSlot::Member(0), &NullLogger).unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_action_cancelling_stops_following_actions() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stage = Stage::new("s", "Stage", "");
        stage.add_action(FnAction::new("stopper", "Stopper", |ctx| {
            ctx.cancel_token().cancel();
            Ok(())
        }));
        stage.add_action(counting("after", &counter));
        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);

        let err = run_first_stage(&mut workflow).unwrap_err();

        assert!(err.is_cancelled());
        assert!(err.to_string().contains("'after'"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_mutation_targets_are_logged() {
        let mut stage = Stage::new("s", "Stage", "");
        stage.add_action(FnAction::new("confused", "Confused", |ctx| {
            ctx.disable_action("ghost");
            ctx.disable_stage("ghost-stage");
            Ok(())
        }));
        let mut workflow = Workflow::new("wf", "Workflow", "");
        workflow.add_stage(stage);

        let logger = RecordingLogger::default();
        run_stage(&CancelToken::new(), &mut workflow, StageSlot::Member(0), &logger).unwrap();

        assert!(logger.contains(Level::Warn, "unknown action 'ghost'"));
        assert!(logger.contains(Level::Warn, "unknown stage 'ghost-stage'"));
        assert!(logger.contains(Level::Info, "Stage 's' completed"));
    }
}
