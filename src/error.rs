//! Error taxonomy for the simulation engine.
//!
//! Every public operation reports failure through [`SimError`]; the engine
//! never panics on bad input. Internal invariant violations (a waiter missing
//! from the suspended map, a one-sided binding) abort the run with a panic
//! instead, since they indicate a bug in the engine rather than the caller.

use thiserror::Error;

/// Result alias used across the crate.
pub type SimResult<T> = Result<T, SimError>;

/// Errors surfaced by the simulation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    // ---- validation ----
    /// A name, parameter, or request failed validation before any state
    /// changed.
    #[error("validation error: {0}")]
    Validation(String),

    /// No model with this name is registered.
    #[error("no such model: {0}")]
    NoSuchModel(String),

    /// No instance with this name exists or is queued to spawn in time.
    #[error("no such instance: {0}")]
    NoSuchInstance(String),

    /// The model defines no activity spec with this name.
    #[error("no such activity spec: {0}")]
    NoSuchSpec(String),

    /// The instance has no pad with this name.
    #[error("no such pad: {0}")]
    NoSuchPad(String),

    // ---- binding ----
    /// Attempt to bind a pad to itself.
    #[error("cannot bind pad {0} to itself")]
    BindSelf(String),

    /// Attempt to bind two pads of the same instance.
    #[error("pads {0} and {1} are on the same instance")]
    BindSameInstance(String, String),

    /// One side of the requested binding is already bound elsewhere.
    #[error("pad {0} is already bound to {1}")]
    AlreadyBound(String, String),

    // ---- runtime / suspension ----
    /// Send attempted on a pad with no peer.
    #[error("pad {0} is not bound")]
    NotBound(String),

    /// Send attempted on a pad without the output capability.
    #[error("pad {0} is not an output pad")]
    NotOutput(String),

    /// Receive attempted on a pad without the input capability.
    #[error("pad {0} is not an input pad")]
    NotInput(String),

    // ---- state machine ----
    /// The requested run-state transition is not allowed.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state name.
        from: &'static str,
        /// Requested state name.
        to: &'static str,
    },
}
