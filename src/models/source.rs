//! Traffic source model.
//!
//! Emits a message of `length` on its `out` pad every `interval_ns`, up to
//! an optional `count`, then finishes.
//!
//! Parameters:
//! - `interval_ns` — emission period in nanoseconds.
//! - `duty_cycle` — emissions per second, used when `interval_ns` is absent.
//! - `count` — number of messages to emit; unlimited when absent.
//! - `length` — message length carried in each payload (default 1).

use crate::activity::{StepResult, Wake};
use crate::clock::{millis, secs_f64};
use crate::model::Model;
use crate::pad::PadSpec;
use crate::value::Value;

/// Builds the `Source` model.
pub fn model() -> Model {
    Model::builder("Source")
        .pad(PadSpec::output("out"))
        .start(|ctx| {
            match ctx.wake() {
                Wake::Start | Wake::Timer | Wake::Ready => {}
                _ => return Ok(StepResult::Done),
            }
            let interval = ctx
                .parameter("interval_ns")
                .and_then(|v| v.as_i64())
                .or_else(|| {
                    ctx.parameter("duty_cycle")
                        .and_then(|v| v.as_f64())
                        .filter(|d| *d > 0.0)
                        .map(|d| secs_f64(1.0 / d))
                })
                .unwrap_or(millis(500));
            let length = ctx
                .parameter("length")
                .and_then(|v| v.as_u64())
                .unwrap_or(1);
            let limit = ctx.parameter("count").and_then(|v| v.as_u64());
            let sent = ctx.parameter("sent").and_then(|v| v.as_u64()).unwrap_or(0);

            if limit.is_some_and(|n| sent >= n) {
                return Ok(StepResult::Done);
            }
            ctx.pad_send("out", Value::UInt(length))?;
            ctx.set_parameter("sent", Value::UInt(sent + 1));
            Ok(ctx.wait_for(interval))
        })
        .build()
        .expect("source model is well-formed")
}
