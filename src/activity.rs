//! Activities: units of model behavior driven by the dispatcher.
//!
//! An activity body is a cooperative step function. The engine invokes it in
//! response to spawn and resume events; the body runs without blocking and
//! returns a [`StepResult`] telling the engine whether it finished, wants to
//! run again at the same instant, or is suspended on a [`Suspension`]. The
//! engine never runs two steps of the same activity concurrently.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::SimTime;
use crate::context::ActivityCtx;
use crate::error::SimResult;
use crate::value::Value;

/// The callable body of an activity.
///
/// Bodies are shared by all instances of a model, so per-activity state
/// lives in instance parameters, not in the closure.
pub type ActivityFn = Arc<dyn Fn(&mut ActivityCtx<'_>) -> SimResult<StepResult> + Send + Sync>;

/// Identifies an activity within a simulation: `(instance, activity)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId {
    /// Owning instance name.
    pub instance: String,
    /// Activity name within the instance.
    pub name: String,
}

impl ActivityId {
    /// Creates an activity id.
    pub fn new(instance: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instance, self.name)
    }
}

/// The flavor of an activity spec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Ordinary activity, spawned explicitly.
    #[default]
    Plain,
    /// Activity whose body is organized around receiving from a pad.
    PadReceive,
    /// Activity whose body is organized around sending to a pad.
    PadSend,
}

/// Static description of an activity within a model.
///
/// Every model carries a synthetic `start` spec holding the model's entry
/// point; it is created through [`ModelBuilder::start`](crate::model::ModelBuilder::start).
#[derive(Clone)]
pub struct ActivitySpec {
    /// Spec name, unique within its model.
    pub name: String,
    /// Spec flavor.
    pub kind: ActivityKind,
    /// Signal that triggers the body instead of an immediate first step.
    /// An activity spawned from a triggered spec parks on this signal and
    /// runs its body when the signal is raised.
    pub triggering_event: Option<String>,
    /// The step function.
    pub body: ActivityFn,
}

impl ActivitySpec {
    /// Creates an activity spec with the given body.
    pub fn new<F>(name: impl Into<String>, kind: ActivityKind, body: F) -> Self
    where
        F: Fn(&mut ActivityCtx<'_>) -> SimResult<StepResult> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            triggering_event: None,
            body: Arc::new(body),
        }
    }

    /// Sets the triggering signal for this spec.
    pub fn with_trigger(mut self, signal: impl Into<String>) -> Self {
        self.triggering_event = Some(signal.into());
        self
    }
}

impl fmt::Debug for ActivitySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivitySpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("triggering_event", &self.triggering_event)
            .finish_non_exhaustive()
    }
}

/// Lifecycle state of an activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    /// Created but not yet stepped.
    #[default]
    Init,
    /// Currently being stepped, or runnable.
    Run,
    /// Suspended on a [`Suspension`].
    Pause,
    /// Terminal.
    Done,
}

/// What a suspended activity is waiting for.
///
/// Deadlines are absolute simulation times; the engine pairs each suspension
/// with a pending resume event on the timeline and cancels that event if the
/// activity wakes early.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Suspension {
    /// Sleep until the given time.
    Timer {
        /// Absolute wake time.
        wake_at: SimTime,
    },
    /// Wait for a named signal.
    Signal {
        /// Signal name.
        name: String,
        /// Optional absolute timeout.
        deadline: Option<SimTime>,
    },
    /// Wait for a payload on a pad of the owning instance.
    PadReceive {
        /// Pad name.
        pad: String,
        /// Optional absolute timeout.
        deadline: Option<SimTime>,
    },
}

/// The reason an activity body is being invoked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Wake {
    /// First step after spawn.
    Start,
    /// Rescheduled after the body returned [`StepResult::Ready`].
    Ready,
    /// A `wait_for`/`wait_until` timer elapsed.
    Timer,
    /// A signal wait ended.
    Signal {
        /// The signal waited on.
        name: String,
        /// True when the deadline elapsed before the signal was raised.
        timed_out: bool,
    },
    /// A pad wait ended.
    Pad {
        /// The pad waited on.
        pad: String,
        /// The delivered payload, or `None` when the deadline elapsed first.
        payload: Option<Value>,
    },
}

/// Outcome of one step of an activity body.
#[derive(Debug)]
pub enum StepResult {
    /// The activity is finished; its state becomes [`ActivityState::Done`].
    Done,
    /// The activity wants another step at the current simulation time.
    Ready,
    /// The activity is suspended until the described condition occurs.
    Paused(Suspension),
}

/// A live activity attached to an instance.
#[derive(Clone, Debug)]
pub struct Activity {
    /// Activity name (may differ from the spec name for non-start activities).
    pub name: String,
    /// Name of the owning instance.
    pub owner: String,
    /// The spec this activity was created from.
    pub spec: ActivitySpec,
    /// Lifecycle state.
    pub state: ActivityState,
}

impl Activity {
    /// Creates an activity in [`ActivityState::Init`].
    pub fn new(owner: impl Into<String>, spec: ActivitySpec, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            spec,
            state: ActivityState::Init,
        }
    }

    /// Returns this activity as an [`ActivityId`].
    pub fn id(&self) -> ActivityId {
        ActivityId::new(self.owner.clone(), self.name.clone())
    }
}
