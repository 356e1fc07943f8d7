//! Terminal sink model.
//!
//! Consumes every message arriving on `in`, counting them in the `received`
//! instance parameter and keeping the most recent payload in `last`.

use crate::activity::{StepResult, Wake};
use crate::context::{ActivityCtx, Recv};
use crate::model::Model;
use crate::pad::PadSpec;
use crate::value::Value;

/// Builds the `Sink` model.
pub fn model() -> Model {
    Model::builder("Sink")
        .pad(PadSpec::input("in"))
        .start(|ctx| {
            if let Wake::Pad {
                payload: Some(payload),
                ..
            } = ctx.wake().clone()
            {
                record(ctx, payload);
            }
            match ctx.pad_receive("in", None)? {
                Recv::Ready(payload) => {
                    record(ctx, payload);
                    Ok(StepResult::Ready)
                }
                Recv::Blocked(step) => Ok(step),
            }
        })
        .build()
        .expect("sink model is well-formed")
}

fn record(ctx: &mut ActivityCtx<'_>, payload: Value) {
    let received = ctx
        .parameter("received")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    ctx.set_parameter("received", Value::UInt(received + 1));
    ctx.set_parameter("last", payload);
}
