//! # Padsim
//!
//! A deterministic discrete-event simulator for networks of communicating
//! components. A topology is assembled from named instances of registered
//! models; instances expose named connection points ("pads") that are bound
//! pairwise, and model behavior runs as cooperative activities that suspend
//! on timers, signals, or pad receives.
//!
//! ## Design principles
//!
//! - **Virtual time**: the clock advances only when the dispatcher pops an
//!   event; model code never observes wall-clock time.
//! - **Deterministic dispatch**: events are totally ordered by
//!   `(time, insertion sequence)`, so identical inputs reproduce identical
//!   runs.
//! - **Cooperative activities**: bodies are step functions returning a
//!   [`StepResult`]; there is no thread per activity, and two steps of one
//!   activity never overlap.
//! - **Handle-based bindings**: pads reference their peers by
//!   `(instance, pad)` name, resolved through the simulation, so the data
//!   graph has no ownership cycles.

pub mod activity;
pub mod clock;
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod instance;
pub mod model;
pub mod models;
pub mod pad;
pub mod timeline;
pub mod topology;
pub mod value;

// Re-export commonly used types
pub use activity::{ActivityId, ActivityKind, ActivitySpec, ActivityState, StepResult, Suspension, Wake};
pub use clock::{SimDuration, SimTime};
pub use context::{ActivityCtx, Recv};
pub use engine::{EngineStats, RunState, Simulation, TraceEntry};
pub use error::{SimError, SimResult};
pub use event::{Event, EventKind};
pub use instance::Instance;
pub use model::{Model, ModelBuilder, ModelRegistry};
pub use pad::{Pad, PadFlags, PadRef, PadSpec};
pub use timeline::{EventHandle, Timeline};
pub use topology::{TopologyDoc, TopologyError};
pub use value::{Properties, Value};
