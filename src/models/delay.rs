//! Fixed-latency stage model.
//!
//! Like the processor, but every message is held for the same `delay_ns`
//! regardless of its length.
//!
//! Parameters:
//! - `delay_ns` — per-message latency in nanoseconds (default 1 ms).

use crate::activity::{StepResult, Wake};
use crate::clock::millis;
use crate::context::{ActivityCtx, Recv};
use crate::error::SimResult;
use crate::model::Model;
use crate::pad::PadSpec;
use crate::value::Value;

/// Builds the `Delay` model.
pub fn model() -> Model {
    Model::builder("Delay")
        .pad(PadSpec::input("in"))
        .pad(PadSpec::output("out"))
        .start(|ctx| match ctx.wake().clone() {
            Wake::Pad {
                payload: Some(payload),
                ..
            } => hold(ctx, payload),
            Wake::Timer => {
                if let Some(pending) = ctx.parameter("pending").filter(|p| !p.is_none()) {
                    ctx.pad_send("out", pending)?;
                    ctx.set_parameter("pending", Value::None);
                }
                receive(ctx)
            }
            _ => receive(ctx),
        })
        .build()
        .expect("delay model is well-formed")
}

fn hold(ctx: &mut ActivityCtx<'_>, payload: Value) -> SimResult<StepResult> {
    let delay = ctx
        .parameter("delay_ns")
        .and_then(|v| v.as_i64())
        .unwrap_or(millis(1));
    ctx.set_parameter("pending", payload);
    Ok(ctx.wait_for(delay))
}

fn receive(ctx: &mut ActivityCtx<'_>) -> SimResult<StepResult> {
    match ctx.pad_receive("in", None)? {
        Recv::Ready(payload) => hold(ctx, payload),
        Recv::Blocked(step) => Ok(step),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_shape() {
        let m = model();
        assert_eq!(m.name(), "Delay");
        assert!(m.pad_spec("in").unwrap().flags.can_input);
        assert!(m.pad_spec("out").unwrap().flags.can_output);
    }
}
