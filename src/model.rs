//! Models: immutable instance prototypes, and the registry that shares them.
//!
//! A model holds the pad specs and activity specs a class of instances is
//! built from, plus the synthetic `start` spec carrying the model's entry
//! point. Models are immutable once built and shared as `Arc<Model>` through
//! a [`ModelRegistry`], which is an injected collaborator rather than
//! process-global state: each simulation is handed the registry it should
//! resolve model names against.
//!
//! # Example
//!
//! ```
//! use padsim::model::{Model, ModelRegistry};
//! use padsim::pad::PadSpec;
//! use padsim::activity::StepResult;
//!
//! let model = Model::builder("Blinker")
//!     .pad(PadSpec::output("out"))
//!     .start(|ctx| {
//!         ctx.pad_send("out", 1i64.into())?;
//!         Ok(StepResult::Done)
//!     })
//!     .build()
//!     .unwrap();
//!
//! let registry = ModelRegistry::new();
//! registry.register(model).unwrap();
//! assert!(registry.lookup("Blinker").is_some());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::activity::{ActivityKind, ActivitySpec, StepResult};
use crate::context::ActivityCtx;
use crate::error::{SimError, SimResult};
use crate::pad::PadSpec;

/// Name of the synthetic entry-point activity every model carries.
pub const START_ACTIVITY: &str = "start";

/// An immutable instance prototype: pad specs, activity specs, and the
/// `start` body.
#[derive(Debug)]
pub struct Model {
    name: String,
    pad_specs: HashMap<String, PadSpec>,
    activity_specs: HashMap<String, ActivitySpec>,
}

impl Model {
    /// Starts building a model with the given name.
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            pad_specs: Vec::new(),
            activity_specs: Vec::new(),
            start: None,
        }
    }

    /// The model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a pad spec by name.
    pub fn pad_spec(&self, name: &str) -> Option<&PadSpec> {
        self.pad_specs.get(name)
    }

    /// Iterates over the model's pad specs.
    pub fn pad_specs(&self) -> impl Iterator<Item = &PadSpec> {
        self.pad_specs.values()
    }

    /// Looks up an activity spec by name.
    pub fn activity_spec(&self, name: &str) -> Option<&ActivitySpec> {
        self.activity_specs.get(name)
    }

    /// Iterates over the model's activity specs, `start` included.
    pub fn activity_specs(&self) -> impl Iterator<Item = &ActivitySpec> {
        self.activity_specs.values()
    }
}

/// Builder for [`Model`].
pub struct ModelBuilder {
    name: String,
    pad_specs: Vec<PadSpec>,
    activity_specs: Vec<ActivitySpec>,
    start: Option<ActivitySpec>,
}

impl ModelBuilder {
    /// Adds a pad spec.
    pub fn pad(mut self, spec: PadSpec) -> Self {
        self.pad_specs.push(spec);
        self
    }

    /// Adds a non-start activity spec.
    pub fn activity(mut self, spec: ActivitySpec) -> Self {
        self.activity_specs.push(spec);
        self
    }

    /// Sets the model's entry point: the body of the synthetic `start` spec.
    pub fn start<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut ActivityCtx<'_>) -> SimResult<StepResult> + Send + Sync + 'static,
    {
        self.start = Some(ActivitySpec::new(START_ACTIVITY, ActivityKind::Plain, body));
        self
    }

    /// Validates and builds the model.
    ///
    /// Fails on an empty model name, a missing start body, an empty or
    /// duplicate spec name, or a non-start activity named `start`.
    pub fn build(self) -> SimResult<Model> {
        if self.name.is_empty() {
            return Err(SimError::Validation("model name is empty".into()));
        }
        let start = self
            .start
            .ok_or_else(|| SimError::Validation(format!("model {:?} has no start body", self.name)))?;

        let mut pad_specs = HashMap::new();
        for spec in self.pad_specs {
            if spec.name.is_empty() {
                return Err(SimError::Validation("pad spec name is empty".into()));
            }
            if pad_specs.insert(spec.name.clone(), spec).is_some() {
                return Err(SimError::Validation(format!(
                    "duplicate pad spec in model {:?}",
                    self.name
                )));
            }
        }

        let mut activity_specs = HashMap::new();
        activity_specs.insert(START_ACTIVITY.to_string(), start);
        for spec in self.activity_specs {
            if spec.name.is_empty() {
                return Err(SimError::Validation("activity spec name is empty".into()));
            }
            if activity_specs.insert(spec.name.clone(), spec).is_some() {
                return Err(SimError::Validation(format!(
                    "duplicate activity spec in model {:?}",
                    self.name
                )));
            }
        }

        Ok(Model {
            name: self.name,
            pad_specs,
            activity_specs,
        })
    }
}

/// A shareable, name-keyed registry of models.
///
/// Cloning the registry clones a handle to the same underlying map. The
/// registry is append-only: models cannot be replaced or removed, so reads
/// during a run observe a stable set.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: Arc<RwLock<HashMap<String, Arc<Model>>>>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model. Fails if a model with the same name is already
    /// registered.
    pub fn register(&self, model: Model) -> SimResult<()> {
        self.register_arc(Arc::new(model))
    }

    /// Registers an already-shared model.
    pub fn register_arc(&self, model: Arc<Model>) -> SimResult<()> {
        let mut models = self.models.write();
        if models.contains_key(model.name()) {
            return Err(SimError::Validation(format!(
                "model {:?} is already registered",
                model.name()
            )));
        }
        models.insert(model.name().to_string(), model);
        Ok(())
    }

    /// Looks up a model by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<Model>> {
        self.models.read().get(name).cloned()
    }

    /// True if a model with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.models.read().contains_key(name)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    /// True when no models are registered.
    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }

    /// Returns the registered model names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_model(name: &str) -> Model {
        Model::builder(name)
            .start(|_ctx| Ok(StepResult::Done))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_start() {
        let err = Model::builder("M").build().unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        let err = Model::builder("")
            .start(|_ctx| Ok(StepResult::Done))
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[test]
    fn test_builder_rejects_duplicate_pad() {
        let err = Model::builder("M")
            .pad(PadSpec::input("in"))
            .pad(PadSpec::output("in"))
            .start(|_ctx| Ok(StepResult::Done))
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[test]
    fn test_builder_rejects_activity_named_start() {
        let err = Model::builder("M")
            .activity(ActivitySpec::new("start", ActivityKind::Plain, |_ctx| {
                Ok(StepResult::Done)
            }))
            .start(|_ctx| Ok(StepResult::Done))
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[test]
    fn test_model_lookup() {
        let model = Model::builder("M")
            .pad(PadSpec::input("in"))
            .activity(ActivitySpec::new("tick", ActivityKind::Plain, |_ctx| {
                Ok(StepResult::Done)
            }))
            .start(|_ctx| Ok(StepResult::Done))
            .build()
            .unwrap();

        assert_eq!(model.name(), "M");
        assert!(model.pad_spec("in").is_some());
        assert!(model.pad_spec("out").is_none());
        assert!(model.activity_spec("start").is_some());
        assert!(model.activity_spec("tick").is_some());
        assert_eq!(model.activity_specs().count(), 2);
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let registry = ModelRegistry::new();
        assert!(registry.is_empty());

        registry.register(noop_model("A")).unwrap();
        registry.register(noop_model("B")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("A"));
        assert!(registry.lookup("B").is_some());
        assert!(registry.lookup("C").is_none());
        assert_eq!(registry.names(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let registry = ModelRegistry::new();
        registry.register(noop_model("A")).unwrap();
        let err = registry.register(noop_model("A")).unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[test]
    fn test_registry_clones_share_state() {
        let registry = ModelRegistry::new();
        let clone = registry.clone();
        registry.register(noop_model("A")).unwrap();
        assert!(clone.contains("A"));
    }
}
