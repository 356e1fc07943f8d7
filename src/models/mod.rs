//! Queuing-network model library.
//!
//! Six ready-made models for assembling queuing topologies: a traffic
//! [`source`], a bounded [`queue`], a rate-proportional [`processor`], a
//! fixed [`delay`], a round-robin [`multiplex`], and a counting [`sink`].
//!
//! Payloads carry a message length as an unsigned integer; the processor and
//! delay models derive their service time from it. Models keep their
//! inter-step state in instance parameters (`sent`, `pending`, `received`,
//! ...) so the same body can serve any number of instances.

pub mod delay;
pub mod multiplex;
pub mod processor;
pub mod queue;
pub mod sink;
pub mod source;

use crate::error::SimResult;
use crate::model::ModelRegistry;

/// Registers the whole queuing library into `registry`.
pub fn register_queuing_models(registry: &ModelRegistry) -> SimResult<()> {
    registry.register(source::model())?;
    registry.register(queue::model())?;
    registry.register(processor::model())?;
    registry.register(delay::model())?;
    registry.register(multiplex::model())?;
    registry.register(sink::model())?;
    Ok(())
}
