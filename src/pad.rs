//! Pads: named connection points on instances.
//!
//! A pad is one endpoint of a point-to-point binding between two instances.
//! It owns a FIFO buffer of payloads delivered by its peer and a queue of
//! activities currently blocked waiting to receive from it. Peers are
//! represented by a logical [`PadRef`] handle resolved through the
//! simulation's instance map, so there are no reference cycles between
//! instances.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::activity::ActivityId;
use crate::error::SimError;
use crate::value::{Properties, Value};

/// Capability and materialization flags of a pad spec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadFlags {
    /// The pad accepts incoming payloads.
    #[serde(default)]
    pub can_input: bool,
    /// The pad may send payloads to its peer.
    #[serde(default)]
    pub can_output: bool,
    /// Blueprint pad, materialized per binding. Parsed and stored but not
    /// materialized; instances never grow a pad from a template spec.
    #[serde(default)]
    pub is_template: bool,
    /// Creation deferred until a peer asks. Parsed and stored but not
    /// materialized, like `is_template`.
    #[serde(default)]
    pub by_request: bool,
}

impl PadFlags {
    /// Flags for an input-only pad.
    pub fn input() -> Self {
        Self {
            can_input: true,
            ..Self::default()
        }
    }

    /// Flags for an output-only pad.
    pub fn output() -> Self {
        Self {
            can_output: true,
            ..Self::default()
        }
    }

    /// Flags for a bidirectional pad.
    pub fn bidirectional() -> Self {
        Self {
            can_input: true,
            can_output: true,
            ..Self::default()
        }
    }

    /// True when the pad is created at instance spawn.
    pub fn materializes(&self) -> bool {
        !self.is_template && !self.by_request
    }
}

/// Static description of a pad within a model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PadSpec {
    /// Pad name, unique within its model.
    pub name: String,
    /// Capability flags.
    pub flags: PadFlags,
    /// Free-form pad properties.
    #[serde(default)]
    pub properties: Properties,
}

impl PadSpec {
    /// Creates a pad spec with the given flags.
    pub fn new(name: impl Into<String>, flags: PadFlags) -> Self {
        Self {
            name: name.into(),
            flags,
            properties: Properties::new(),
        }
    }

    /// Creates an input-only pad spec.
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, PadFlags::input())
    }

    /// Creates an output-only pad spec.
    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, PadFlags::output())
    }

    /// Creates a bidirectional pad spec.
    pub fn bidirectional(name: impl Into<String>) -> Self {
        Self::new(name, PadFlags::bidirectional())
    }

    /// Adds a property to this pad spec.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// A logical handle naming a pad: `(instance, pad)`.
///
/// Renders and parses as `"instance.pad"`, the form the topology document
/// uses for binding endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PadRef {
    /// Owning instance name.
    pub instance: String,
    /// Pad name within the instance.
    pub pad: String,
}

impl PadRef {
    /// Creates a pad reference.
    pub fn new(instance: impl Into<String>, pad: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            pad: pad.into(),
        }
    }
}

impl fmt::Display for PadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.instance, self.pad)
    }
}

impl FromStr for PadRef {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((instance, pad)) if !instance.is_empty() && !pad.is_empty() => {
                Ok(PadRef::new(instance, pad))
            }
            _ => Err(SimError::Validation(format!(
                "malformed pad reference {s:?}, expected \"instance.pad\""
            ))),
        }
    }
}

/// A materialized pad on a live instance.
#[derive(Clone, Debug)]
pub struct Pad {
    /// Pad name (same as `spec.name`).
    pub name: String,
    /// Name of the owning instance.
    pub owner: String,
    /// The spec this pad was materialized from.
    pub spec: PadSpec,
    /// The bound peer, if any. Symmetric: the peer's `peer` names this pad.
    pub peer: Option<PadRef>,
    /// FIFO buffer of delivered payloads not yet received.
    pub(crate) buffer: VecDeque<Value>,
    /// Activities blocked waiting to receive from this pad, oldest first.
    pub(crate) waiters: VecDeque<ActivityId>,
}

impl Pad {
    /// Materializes a pad from its spec for the named instance.
    pub fn new(owner: impl Into<String>, spec: PadSpec) -> Self {
        Self {
            name: spec.name.clone(),
            owner: owner.into(),
            spec,
            peer: None,
            buffer: VecDeque::new(),
            waiters: VecDeque::new(),
        }
    }

    /// Returns this pad as a [`PadRef`].
    pub fn pad_ref(&self) -> PadRef {
        PadRef::new(self.owner.clone(), self.name.clone())
    }

    /// True when bound to a peer.
    pub fn is_bound(&self) -> bool {
        self.peer.is_some()
    }

    /// Number of buffered payloads awaiting receive.
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Dequeues the oldest buffered payload, if any.
    pub fn take_payload(&mut self) -> Option<Value> {
        self.buffer.pop_front()
    }

    /// Enqueues a delivered payload.
    pub(crate) fn push_payload(&mut self, payload: Value) {
        self.buffer.push_back(payload);
    }
}
