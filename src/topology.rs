//! Topology documents: declarative simulation setup.
//!
//! A topology describes the parameters, instances, pad bindings, and extra
//! activities of a simulation in JSON (or YAML):
//!
//! ```json
//! {
//!   "parameters": { "seed": 7 },
//!   "instances": [
//!     { "name": "src", "model": "Source", "parameters": { "count": 10 } },
//!     { "name": "snk", "model": "Sink" }
//!   ],
//!   "bindings": [
//!     { "from": "src.out", "to": "snk.in" }
//!   ],
//!   "activities": []
//! }
//! ```
//!
//! [`TopologyDoc::apply`] replays the document onto a simulation: global
//! parameters, instance spawns, bindings, then activities, in that order.
//! Bindings need materialized pads, so `apply` settles the queued spawns
//! before binding; it must run before the simulation starts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::SimTime;
use crate::engine::Simulation;
use crate::error::SimError;
use crate::pad::PadRef;
use crate::value::Properties;

/// Errors from loading or applying a topology document.
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown file format: {0}")]
    UnknownFormat(String),

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// One instance declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstanceDecl {
    /// Instance name, unique within the document.
    pub name: String,
    /// Model to instantiate.
    pub model: String,
    /// Initial instance parameters.
    #[serde(default)]
    pub parameters: Properties,
}

/// One pad binding, both endpoints in `"instance.pad"` form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BindingDecl {
    /// First endpoint.
    pub from: String,
    /// Second endpoint.
    pub to: String,
}

/// One extra activity to schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityDecl {
    /// Target instance.
    pub instance: String,
    /// Activity spec name within the instance's model.
    pub spec: String,
    /// Activity name, unique within the instance.
    pub name: String,
    /// Spawn time in nanoseconds; absent means at start.
    #[serde(default)]
    pub at: Option<SimTime>,
}

/// A complete topology document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TopologyDoc {
    /// Simulation-global parameters.
    #[serde(default)]
    pub parameters: Properties,

    /// Instances to spawn.
    #[serde(default)]
    pub instances: Vec<InstanceDecl>,

    /// Pad bindings between instances.
    #[serde(default)]
    pub bindings: Vec<BindingDecl>,

    /// Extra activities to schedule.
    #[serde(default)]
    pub activities: Vec<ActivityDecl>,
}

impl TopologyDoc {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a document from a JSON string.
    pub fn from_json(json: &str) -> TopologyResult<Self> {
        let doc: TopologyDoc = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Parses a document from a YAML string.
    pub fn from_yaml(yaml: &str) -> TopologyResult<Self> {
        let doc: TopologyDoc = serde_yaml::from_str(yaml)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Loads a document from a file, auto-detecting the format from the
    /// extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> TopologyResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let content = std::fs::read_to_string(path)?;
        match ext.to_lowercase().as_str() {
            "json" => Self::from_json(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            _ => Err(TopologyError::UnknownFormat(ext.to_string())),
        }
    }

    /// Serializes the document to pretty JSON.
    pub fn to_json(&self) -> TopologyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates internal consistency: unique instance names, well-formed
    /// binding endpoints referring to declared instances, and activity
    /// declarations referring to declared instances.
    pub fn validate(&self) -> TopologyResult<()> {
        let mut names = std::collections::HashSet::new();
        for decl in &self.instances {
            if decl.name.is_empty() {
                return Err(TopologyError::Validation("instance name is empty".into()));
            }
            if decl.model.is_empty() {
                return Err(TopologyError::Validation(format!(
                    "instance {:?} has no model",
                    decl.name
                )));
            }
            if !names.insert(decl.name.as_str()) {
                return Err(TopologyError::Validation(format!(
                    "duplicate instance name: {}",
                    decl.name
                )));
            }
        }

        for binding in &self.bindings {
            for endpoint in [&binding.from, &binding.to] {
                let padref: PadRef = endpoint
                    .parse()
                    .map_err(|e: SimError| TopologyError::Validation(e.to_string()))?;
                if !names.contains(padref.instance.as_str()) {
                    return Err(TopologyError::Validation(format!(
                        "binding references undeclared instance: {}",
                        padref.instance
                    )));
                }
            }
        }

        for activity in &self.activities {
            if !names.contains(activity.instance.as_str()) {
                return Err(TopologyError::Validation(format!(
                    "activity {:?} references undeclared instance: {}",
                    activity.name, activity.instance
                )));
            }
        }

        Ok(())
    }

    /// Replays the document onto a simulation: parameters, instance spawns,
    /// bindings (after settling the spawns), then activities.
    ///
    /// The simulation must still be in its initial state.
    pub fn apply(&self, sim: &Simulation) -> TopologyResult<()> {
        for (name, value) in &self.parameters {
            sim.set_parameter(name.clone(), value.clone());
        }
        for decl in &self.instances {
            sim.spawn_instance(&decl.model, &decl.name, decl.parameters.clone(), None)?;
        }
        sim.settle()?;
        for binding in &self.bindings {
            let from: PadRef = binding.from.parse()?;
            let to: PadRef = binding.to.parse()?;
            sim.bind(&from, &to)?;
        }
        for activity in &self.activities {
            sim.spawn_activity(&activity.spec, &activity.name, &activity.instance, activity.at)?;
        }
        Ok(())
    }
}
