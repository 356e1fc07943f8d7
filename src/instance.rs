//! Instances: live, named realizations of a model.
//!
//! An instance owns its pads and activities by value, keyed by name. Pads
//! are materialized from the model's non-template pad specs at construction,
//! and the synthetic `start` activity is inserted at the same time.

use std::collections::HashMap;
use std::sync::Arc;

use crate::activity::{Activity, ActivityState};
use crate::error::{SimError, SimResult};
use crate::model::{Model, START_ACTIVITY};
use crate::pad::Pad;
use crate::value::{Properties, Value};

/// A named instance of a [`Model`] within a simulation.
#[derive(Clone, Debug)]
pub struct Instance {
    name: String,
    model: Arc<Model>,
    pub(crate) parameters: Properties,
    pub(crate) pads: HashMap<String, Pad>,
    pub(crate) activities: HashMap<String, Activity>,
}

impl Instance {
    /// Builds an instance: materializes pads from the model's materializable
    /// pad specs and inserts the `start` activity in its initial state.
    pub fn new(model: Arc<Model>, name: impl Into<String>, parameters: Properties) -> SimResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SimError::Validation("instance name is empty".into()));
        }

        let mut pads = HashMap::new();
        for spec in model.pad_specs() {
            if spec.flags.materializes() {
                pads.insert(spec.name.clone(), Pad::new(name.clone(), spec.clone()));
            }
        }

        let start_spec = model
            .activity_spec(START_ACTIVITY)
            .ok_or_else(|| SimError::NoSuchSpec(START_ACTIVITY.into()))?
            .clone();
        let mut activities = HashMap::new();
        activities.insert(
            START_ACTIVITY.to_string(),
            Activity::new(name.clone(), start_spec, START_ACTIVITY),
        );

        Ok(Self {
            name,
            model,
            parameters,
            pads,
            activities,
        })
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The model this instance was spawned from.
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Looks up an instance parameter.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Sets an instance parameter, replacing any previous value.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    /// Looks up a pad by name.
    pub fn pad(&self, name: &str) -> Option<&Pad> {
        self.pads.get(name)
    }

    pub(crate) fn pad_mut(&mut self, name: &str) -> Option<&mut Pad> {
        self.pads.get_mut(name)
    }

    /// Looks up an activity by name.
    pub fn activity(&self, name: &str) -> Option<&Activity> {
        self.activities.get(name)
    }

    pub(crate) fn activity_mut(&mut self, name: &str) -> Option<&mut Activity> {
        self.activities.get_mut(name)
    }

    /// Iterates over the instance's pads.
    pub fn pads(&self) -> impl Iterator<Item = &Pad> {
        self.pads.values()
    }

    /// Iterates over the instance's activities.
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    /// Creates a non-start activity from one of the model's specs without
    /// scheduling it. The engine steps it once a spawn event fires for it.
    pub fn add_activity(&mut self, spec_name: &str, name: impl Into<String>) -> SimResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(SimError::Validation("activity name is empty".into()));
        }
        let spec = self
            .model
            .activity_spec(spec_name)
            .ok_or_else(|| SimError::NoSuchSpec(spec_name.into()))?
            .clone();
        if self.activities.contains_key(&name) {
            return Err(SimError::Validation(format!(
                "activity {name:?} already exists on instance {:?}",
                self.name
            )));
        }
        self.activities
            .insert(name.clone(), Activity::new(self.name.clone(), spec, name));
        Ok(())
    }

    /// True when every activity of the instance is done.
    pub fn is_idle(&self) -> bool {
        self.activities
            .values()
            .all(|a| a.state == ActivityState::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityKind, ActivitySpec, StepResult};
    use crate::model::Model;
    use crate::pad::PadSpec;

    fn test_model() -> Arc<Model> {
        let mut template = PadSpec::output("tmpl");
        template.flags.is_template = true;
        Arc::new(
            Model::builder("M")
                .pad(PadSpec::input("in"))
                .pad(PadSpec::output("out"))
                .pad(template)
                .activity(ActivitySpec::new("tick", ActivityKind::Plain, |_ctx| {
                    Ok(StepResult::Done)
                }))
                .start(|_ctx| Ok(StepResult::Done))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_materializes_non_template_pads() {
        let inst = Instance::new(test_model(), "a", Properties::new()).unwrap();
        assert!(inst.pad("in").is_some());
        assert!(inst.pad("out").is_some());
        assert!(inst.pad("tmpl").is_none());
    }

    #[test]
    fn test_start_activity_created_at_spawn() {
        let inst = Instance::new(test_model(), "a", Properties::new()).unwrap();
        let start = inst.activity("start").unwrap();
        assert_eq!(start.state, ActivityState::Init);
        assert_eq!(start.owner, "a");
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Instance::new(test_model(), "", Properties::new()).unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[test]
    fn test_add_activity() {
        let mut inst = Instance::new(test_model(), "a", Properties::new()).unwrap();
        inst.add_activity("tick", "tick-1").unwrap();
        assert!(inst.activity("tick-1").is_some());

        // Duplicate name.
        let err = inst.add_activity("tick", "tick-1").unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));

        // Unknown spec.
        let err = inst.add_activity("nope", "x").unwrap_err();
        assert!(matches!(err, SimError::NoSuchSpec(_)));
    }

    #[test]
    fn test_parameters() {
        let mut params = Properties::new();
        params.insert("rate".into(), Value::Double(2.0));
        let mut inst = Instance::new(test_model(), "a", params).unwrap();

        assert_eq!(inst.parameter("rate").and_then(Value::as_f64), Some(2.0));
        inst.set_parameter("rate", Value::Double(3.0));
        assert_eq!(inst.parameter("rate").and_then(Value::as_f64), Some(3.0));
        assert!(inst.parameter("missing").is_none());
    }
}
