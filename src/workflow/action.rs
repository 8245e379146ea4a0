//! Actions
//!
//! An action is the unit of work inside a stage. The engine only needs an
//! identity, a tag set and an `execute` operation, so user code can supply
//! any type implementing [`Action`]. Two ready-made building blocks are
//! provided: [`BaseAction`] to embed identity and tags in a custom type, and
//! [`FnAction`] to wrap a closure.

use std::fmt;

use crate::errors::ActionError;
use crate::execution::ActionContext;

use super::tags::TagSet;

/// A unit of work executed within a stage.
///
/// Implementations must be `Send + Sync` so a workflow can be moved between
/// threads; execution itself is always sequential.
pub trait Action: Send + Sync {
    /// Identifier, unique within the owning stage.
    fn id(&self) -> &str;

    /// Human readable name.
    fn name(&self) -> &str {
        self.id()
    }

    fn description(&self) -> &str {
        ""
    }

    fn tags(&self) -> &TagSet;

    /// Runs the action. Returning an error aborts the whole workflow run.
    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError>;
}

/// Identity and tags shared by most action implementations.
///
/// # Example
///
/// ```
/// use stagerunner::{Action, ActionContext, ActionError, BaseAction, TagSet};
///
/// struct Cleanup {
///     base: BaseAction,
/// }
///
/// impl Action for Cleanup {
///     fn id(&self) -> &str { &self.base.id }
///     fn name(&self) -> &str { &self.base.name }
///     fn tags(&self) -> &TagSet { &self.base.tags }
///
///     fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
///         ctx.store().remove("scratch");
///         Ok(())
///     }
/// }
///
/// let action = Cleanup { base: BaseAction::new("cleanup", "Cleanup").with_tags(["teardown"]) };
/// assert!(action.tags().contains("teardown"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseAction {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: TagSet,
}

impl BaseAction {
    /// Creates an identity with no description and no tags.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            description: String::new(),
            tags: TagSet::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replaces the tag set.
    pub fn with_tags(mut self, tags: impl Into<TagSet>) -> Self {
        self.tags = tags.into();
        self
    }
}

type ActionFn = dyn Fn(&mut ActionContext<'_>) -> Result<(), ActionError> + Send + Sync;

/// Action backed by a closure.
///
/// # Example
///
/// ```
/// use stagerunner::FnAction;
///
/// let action = FnAction::new("greet", "Greet", |ctx| {
///     ctx.store().put("greeting", "hello".to_string());
///     Ok(())
/// })
/// .with_tags(["setup"]);
/// ```
pub struct FnAction {
    base: BaseAction,
    func: Box<ActionFn>,
}

impl FnAction {
    pub fn new<F>(id: impl Into<String>, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self {
            base: BaseAction::new(id, name),
            func: Box::new(func),
        }
    }

    /// An action that succeeds without doing anything.
    pub fn noop(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, |_| Ok(()))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.base = self.base.with_description(description);
        self
    }

    pub fn with_tags(mut self, tags: impl Into<TagSet>) -> Self {
        self.base = self.base.with_tags(tags);
        self
    }
}

impl Action for FnAction {
    fn id(&self) -> &str {
        &self.base.id
    }

    fn name(&self) -> &str {
        &self.base.name
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn tags(&self) -> &TagSet {
        &self.base.tags
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        (self.func)(ctx)
    }
}

impl fmt::Debug for FnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction").field("base", &self.base).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_action_builder() {
        let base = BaseAction::new(" fetch ", "Fetch Data")
            .with_description("Downloads inputs")
            .with_tags(["io", "network"]);

        assert_eq!(base.id, "fetch");
        assert_eq!(base.name, "Fetch Data");
        assert_eq!(base.description, "Downloads inputs");
        assert!(base.tags.contains_all(&["io", "network"]));
    }

    #[test]
    fn test_fn_action_identity() {
        let action = FnAction::noop("a1", "Action 1")
            .with_description("does nothing")
            .with_tags(["tag1"]);

        assert_eq!(action.id(), "a1");
        assert_eq!(action.name(), "Action 1");
        assert_eq!(action.description(), "does nothing");
        assert!(action.tags().contains("tag1"));
    }

    #[test]
    fn test_default_name_is_id() {
        struct Bare(TagSet);

        impl Action for Bare {
            fn id(&self) -> &str {
                "bare"
            }
            fn tags(&self) -> &TagSet {
                &self.0
            }
            fn execute(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
                Ok(())
            }
        }

        let action = Bare(TagSet::new());
        assert_eq!(action.name(), "bare");
        assert_eq!(action.description(), "");
    }

    #[test]
    fn test_fn_action_debug() {
        let action = FnAction::noop("dbg", "Debug");
        assert!(format!("{:?}", action).contains("dbg"));
    }
}
