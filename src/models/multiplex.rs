//! Round-robin multiplexer model.
//!
//! Distributes messages arriving on `in` across its bound output pads
//! (`out0` through `out3`) in rotation. Messages arriving while no output is
//! bound are dropped and counted in the `dropped` instance parameter.

use crate::activity::{StepResult, Wake};
use crate::context::{ActivityCtx, Recv};
use crate::error::SimResult;
use crate::model::Model;
use crate::pad::PadSpec;
use crate::value::Value;

const OUTPUTS: [&str; 4] = ["out0", "out1", "out2", "out3"];

/// Builds the `Multiplex` model.
pub fn model() -> Model {
    let mut builder = Model::builder("Multiplex").pad(PadSpec::input("in"));
    for out in OUTPUTS {
        builder = builder.pad(PadSpec::output(out));
    }
    builder
        .start(|ctx| {
            if let Wake::Pad {
                payload: Some(payload),
                ..
            } = ctx.wake().clone()
            {
                forward(ctx, payload)?;
            }
            match ctx.pad_receive("in", None)? {
                Recv::Ready(payload) => {
                    forward(ctx, payload)?;
                    Ok(StepResult::Ready)
                }
                Recv::Blocked(step) => Ok(step),
            }
        })
        .build()
        .expect("multiplex model is well-formed")
}

/// Sends `payload` to the next bound output in rotation; drops it when no
/// output is bound.
fn forward(ctx: &mut ActivityCtx<'_>, payload: Value) -> SimResult<()> {
    let next = ctx.parameter("next").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    for offset in 0..OUTPUTS.len() {
        let idx = (next + offset) % OUTPUTS.len();
        if ctx.pad_peer(OUTPUTS[idx])?.is_some() {
            ctx.pad_send(OUTPUTS[idx], payload)?;
            ctx.set_parameter("next", Value::UInt(((idx + 1) % OUTPUTS.len()) as u64));
            return Ok(());
        }
    }
    let dropped = ctx
        .parameter("dropped")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    ctx.set_parameter("dropped", Value::UInt(dropped + 1));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplex_shape() {
        let m = model();
        assert_eq!(m.name(), "Multiplex");
        assert!(m.pad_spec("in").unwrap().flags.can_input);
        for out in OUTPUTS {
            assert!(m.pad_spec(out).unwrap().flags.can_output, "{out}");
        }
    }
}
