//! Processing stage model.
//!
//! Receives a message on `in`, holds it for a service time proportional to
//! its length (`length * rate` seconds), then emits it on `out` and receives
//! the next one.
//!
//! Parameters:
//! - `rate` — seconds of service per unit of message length (default 1.0).

use crate::activity::{StepResult, Wake};
use crate::clock::secs_f64;
use crate::context::{ActivityCtx, Recv};
use crate::error::SimResult;
use crate::model::Model;
use crate::pad::PadSpec;
use crate::value::Value;

/// Builds the `Processor` model.
pub fn model() -> Model {
    Model::builder("Processor")
        .pad(PadSpec::input("in"))
        .pad(PadSpec::output("out"))
        .start(|ctx| match ctx.wake().clone() {
            Wake::Pad {
                payload: Some(payload),
                ..
            } => hold(ctx, payload),
            Wake::Timer => {
                // Service time elapsed; emit the held message.
                if let Some(pending) = ctx.parameter("pending").filter(|p| !p.is_none()) {
                    ctx.pad_send("out", pending)?;
                    ctx.set_parameter("pending", Value::None);
                }
                receive(ctx)
            }
            _ => receive(ctx),
        })
        .build()
        .expect("processor model is well-formed")
}

fn hold(ctx: &mut ActivityCtx<'_>, payload: Value) -> SimResult<StepResult> {
    let rate = ctx
        .parameter("rate")
        .and_then(|v| v.as_f64())
        .unwrap_or(1.0);
    let length = payload.as_f64().unwrap_or(1.0);
    ctx.set_parameter("pending", payload);
    Ok(ctx.wait_for(secs_f64(length * rate)))
}

fn receive(ctx: &mut ActivityCtx<'_>) -> SimResult<StepResult> {
    match ctx.pad_receive("in", None)? {
        Recv::Ready(payload) => hold(ctx, payload),
        Recv::Blocked(step) => Ok(step),
    }
}
