//! Bounded forwarding queue model.
//!
//! Forwards messages from `in` to `out` while the downstream buffer holds
//! fewer than `depth` messages; above the watermark it polls until the
//! backlog drains.
//!
//! Parameters:
//! - `depth` — downstream backlog watermark (default 1).
//! - `poll_interval_ns` — re-check period while over the watermark.

use crate::activity::{StepResult, Wake};
use crate::clock::millis;
use crate::context::Recv;
use crate::model::Model;
use crate::pad::PadSpec;

/// Builds the `Queue` model.
pub fn model() -> Model {
    Model::builder("Queue")
        .pad(PadSpec::input("in"))
        .pad(PadSpec::output("out"))
        .start(|ctx| {
            let depth = ctx
                .parameter("depth")
                .and_then(|v| v.as_u64())
                .unwrap_or(1) as usize;
            let poll = ctx
                .parameter("poll_interval_ns")
                .and_then(|v| v.as_i64())
                .unwrap_or(millis(1));

            if let Wake::Pad {
                payload: Some(payload),
                ..
            } = ctx.wake().clone()
            {
                ctx.pad_send("out", payload)?;
            }
            if ctx.peer_available("out")? >= depth {
                return Ok(ctx.wait_for(poll));
            }
            match ctx.pad_receive("in", None)? {
                Recv::Ready(payload) => {
                    ctx.pad_send("out", payload)?;
                    Ok(StepResult::Ready)
                }
                Recv::Blocked(step) => Ok(step),
            }
        })
        .build()
        .expect("queue model is well-formed")
}
