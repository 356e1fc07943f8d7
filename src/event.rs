//! Event definitions for the simulation engine.
//!
//! Events are the unit of work on the timeline. Each carries the simulation
//! time at which it fires and a kind describing the handler to route to.
//! Events are totally ordered by `(time, seq)`, where `seq` is the
//! monotonically increasing insertion counter assigned by the
//! [`Timeline`](crate::timeline::Timeline); the tie-break makes runs with
//! identical inputs reproduce identical dispatch orders.

use serde::{Deserialize, Serialize};

use crate::activity::Wake;
use crate::clock::SimTime;
use crate::pad::PadRef;
use crate::value::{Properties, Value};

/// A time-stamped event on the timeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// Insertion sequence number, assigned by the timeline on push.
    pub seq: u64,
    /// The simulation time at which this event fires.
    pub time: SimTime,
    /// What the event does.
    pub kind: EventKind,
}

impl Event {
    /// Creates an event with an unassigned sequence number.
    pub fn new(time: SimTime, kind: EventKind) -> Self {
        Self { seq: 0, time, kind }
    }

    /// True when `self` fires strictly before `other` in dispatch order.
    #[inline]
    pub fn is_before(&self, other: &Event) -> bool {
        (self.time, self.seq) < (other.time, other.seq)
    }

    /// A short label for the event kind, used in traces and logs.
    pub fn label(&self) -> &'static str {
        match &self.kind {
            EventKind::StateChange => "state_change",
            EventKind::SpawnInstance { .. } => "spawn_instance",
            EventKind::SpawnActivity { .. } => "spawn_activity",
            EventKind::ResumeActivity { .. } => "resume_activity",
            EventKind::PadDeliver { .. } => "pad_deliver",
        }
    }

    /// The name of the entity this event targets, used in traces and logs.
    pub fn target(&self) -> String {
        match &self.kind {
            EventKind::StateChange => String::new(),
            EventKind::SpawnInstance { name, .. } => name.clone(),
            EventKind::SpawnActivity { instance, name, .. } => format!("{instance}/{name}"),
            EventKind::ResumeActivity {
                instance, activity, ..
            } => format!("{instance}/{activity}"),
            EventKind::PadDeliver { to, .. } => to.to_string(),
        }
    }
}

/// The payload of an [`Event`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventKind {
    /// Apply the pending run-state transition.
    StateChange,

    /// Create an instance of a registered model.
    SpawnInstance {
        /// Model name to instantiate.
        model: String,
        /// Name of the new instance, unique within the simulation.
        name: String,
        /// Initial instance parameters.
        parameters: Properties,
    },

    /// Create (or first-step) an activity on a live instance.
    SpawnActivity {
        /// Activity spec name within the instance's model.
        spec: String,
        /// Name of the new activity, unique within the instance.
        name: String,
        /// Target instance name.
        instance: String,
    },

    /// Wake a suspended activity.
    ResumeActivity {
        /// Target instance name.
        instance: String,
        /// Target activity name.
        activity: String,
        /// Why the activity is waking.
        wake: Wake,
    },

    /// Deliver a payload to a pad's buffer, waking a receive waiter if one
    /// is queued.
    PadDeliver {
        /// Destination pad.
        to: PadRef,
        /// The payload being delivered.
        payload: Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let mut a = Event::new(10, EventKind::StateChange);
        a.seq = 1;
        let mut b = Event::new(10, EventKind::StateChange);
        b.seq = 2;
        let mut c = Event::new(5, EventKind::StateChange);
        c.seq = 3;

        assert!(a.is_before(&b)); // same time, earlier seq
        assert!(c.is_before(&a)); // earlier time beats later seq
        assert!(!b.is_before(&a));
    }

    #[test]
    fn test_event_labels() {
        let ev = Event::new(
            0,
            EventKind::SpawnInstance {
                model: "m".into(),
                name: "a".into(),
                parameters: Properties::new(),
            },
        );
        assert_eq!(ev.label(), "spawn_instance");
        assert_eq!(ev.target(), "a");

        let ev = Event::new(
            0,
            EventKind::ResumeActivity {
                instance: "a".into(),
                activity: "start".into(),
                wake: Wake::Timer,
            },
        );
        assert_eq!(ev.label(), "resume_activity");
        assert_eq!(ev.target(), "a/start");
    }

    #[test]
    fn test_event_serialization() {
        let ev = Event::new(
            7,
            EventKind::PadDeliver {
                to: PadRef::new("snk", "in"),
                payload: Value::Int(42),
            },
        );
        let json = serde_json::to_string(&ev).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.time, 7);
        assert_eq!(back.label(), "pad_deliver");
    }
}
