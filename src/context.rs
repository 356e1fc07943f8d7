//! The execution context handed to activity bodies.
//!
//! An [`ActivityCtx`] is constructed by the dispatcher for exactly one step
//! of one activity. It exposes the suspension primitives (`wait_for`,
//! `wait_on`, `pad_receive`), non-blocking pad operations, and parameter
//! access. Suspension constructors only build a [`StepResult`]; the engine
//! installs the suspension (and any timeout event) when the body returns it.

use crate::activity::{ActivityId, StepResult, Suspension, Wake};
use crate::clock::{SimDuration, SimTime};
use crate::engine::Core;
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventKind};
use crate::pad::{Pad, PadRef};
use crate::value::Value;

/// Outcome of [`ActivityCtx::pad_receive`].
#[derive(Debug)]
pub enum Recv {
    /// A payload was already buffered; the body keeps running.
    Ready(Value),
    /// Nothing buffered. Return the wrapped step result to suspend until a
    /// peer sends (or the timeout elapses).
    Blocked(StepResult),
}

/// One activity's view of the engine for the duration of a single step.
pub struct ActivityCtx<'a> {
    core: &'a mut Core,
    id: ActivityId,
    wake: Wake,
}

impl<'a> ActivityCtx<'a> {
    pub(crate) fn new(core: &'a mut Core, id: ActivityId, wake: Wake) -> Self {
        Self { core, id, wake }
    }

    /// Why this step is running.
    pub fn wake(&self) -> &Wake {
        &self.wake
    }

    /// Current simulation time.
    pub fn simtime(&self) -> SimTime {
        self.core.simtime
    }

    /// Name of the owning instance.
    pub fn instance_name(&self) -> &str {
        &self.id.instance
    }

    /// Name of this activity.
    pub fn activity_name(&self) -> &str {
        &self.id.name
    }

    /// Looks up a parameter of the owning instance.
    pub fn parameter(&self, name: &str) -> Option<Value> {
        self.core
            .instances
            .get(&self.id.instance)
            .and_then(|inst| inst.parameter(name))
            .cloned()
    }

    /// Sets a parameter on the owning instance.
    ///
    /// Bodies are shared between instances of a model, so instance
    /// parameters are where per-activity state across steps lives.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) {
        if let Some(inst) = self.core.instances.get_mut(&self.id.instance) {
            inst.set_parameter(name, value);
        }
    }

    /// Looks up a simulation-global parameter.
    pub fn sim_parameter(&self, name: &str) -> Option<Value> {
        self.core.parameters.get(name).cloned()
    }

    // ---- pad operations ----

    /// Number of payloads buffered on one of the instance's pads.
    pub fn available(&self, pad: &str) -> SimResult<usize> {
        Ok(self.own_pad(pad)?.available())
    }

    /// The peer bound to one of the instance's pads, if any.
    pub fn pad_peer(&self, pad: &str) -> SimResult<Option<PadRef>> {
        Ok(self.own_pad(pad)?.peer.clone())
    }

    /// Number of payloads backed up in the peer's buffer, for watermark
    /// checks before sending. Fails with `NotBound` on an unbound pad.
    pub fn peer_available(&self, pad: &str) -> SimResult<usize> {
        let own = self.own_pad(pad)?;
        let peer = own
            .peer
            .clone()
            .ok_or_else(|| SimError::NotBound(own.pad_ref().to_string()))?;
        Ok(self
            .core
            .instances
            .get(&peer.instance)
            .and_then(|inst| inst.pad(&peer.pad))
            .map(|p| p.available())
            .unwrap_or(0))
    }

    /// Dequeues the head of a pad's buffer without suspending.
    pub fn try_receive(&mut self, pad: &str) -> SimResult<Option<Value>> {
        let p = self.own_pad_mut(pad)?;
        if !p.spec.flags.can_input {
            return Err(SimError::NotInput(p.pad_ref().to_string()));
        }
        Ok(p.take_payload())
    }

    /// Receives from a pad: returns the head payload immediately when one is
    /// buffered, otherwise a step result that parks this activity on the
    /// pad's waiter queue until a peer sends or `timeout` elapses.
    pub fn pad_receive(&mut self, pad: &str, timeout: Option<SimDuration>) -> SimResult<Recv> {
        let deadline = timeout.map(|d| self.core.simtime + d);
        let p = self.own_pad_mut(pad)?;
        if !p.spec.flags.can_input {
            return Err(SimError::NotInput(p.pad_ref().to_string()));
        }
        if let Some(payload) = p.take_payload() {
            return Ok(Recv::Ready(payload));
        }
        Ok(Recv::Blocked(StepResult::Paused(Suspension::PadReceive {
            pad: pad.to_string(),
            deadline,
        })))
    }

    /// Sends a payload to the peer of one of the instance's pads.
    ///
    /// Non-blocking: the payload is scheduled for delivery to the peer's
    /// buffer at the current simulation time. The sender's own buffer is
    /// never touched.
    pub fn pad_send(&mut self, pad: &str, payload: Value) -> SimResult<()> {
        let peer = {
            let p = self.own_pad(pad)?;
            if !p.spec.flags.can_output {
                return Err(SimError::NotOutput(p.pad_ref().to_string()));
            }
            p.peer
                .clone()
                .ok_or_else(|| SimError::NotBound(p.pad_ref().to_string()))?
        };
        let time = self.core.simtime;
        self.core
            .timeline
            .push(Event::new(time, EventKind::PadDeliver { to: peer, payload }));
        Ok(())
    }

    // ---- suspension constructors ----

    /// Suspends for a duration; the activity resumes with [`Wake::Timer`] at
    /// `simtime + dur`.
    pub fn wait_for(&self, dur: SimDuration) -> StepResult {
        self.wait_until(self.core.simtime + dur)
    }

    /// Suspends until an absolute time. A time at or before the current
    /// simtime resumes at the current time, on the next dispatch.
    pub fn wait_until(&self, time: SimTime) -> StepResult {
        StepResult::Paused(Suspension::Timer {
            wake_at: time.max(self.core.simtime),
        })
    }

    /// Suspends until `signal` is raised or `timeout` elapses.
    pub fn wait_on(&self, signal: impl Into<String>, timeout: Option<SimDuration>) -> StepResult {
        StepResult::Paused(Suspension::Signal {
            name: signal.into(),
            deadline: timeout.map(|d| self.core.simtime + d),
        })
    }

    /// Raises a signal, waking every activity currently waiting on it.
    /// Returns the number of activities woken.
    pub fn raise(&mut self, signal: &str) -> usize {
        self.core.wake_signal(signal)
    }

    // ---- scheduling ----

    /// Schedules a new activity on the owning instance after `delay`.
    pub fn spawn_activity(
        &mut self,
        spec: &str,
        name: &str,
        delay: SimDuration,
    ) -> SimResult<()> {
        let at = self.core.simtime + delay.max(0);
        let instance = self.id.instance.clone();
        self.core.insert_spawn_activity(spec, name, &instance, Some(at))
    }

    fn own_pad(&self, pad: &str) -> SimResult<&Pad> {
        self.core
            .instances
            .get(&self.id.instance)
            .and_then(|inst| inst.pad(pad))
            .ok_or_else(|| SimError::NoSuchPad(format!("{}.{}", self.id.instance, pad)))
    }

    fn own_pad_mut(&mut self, pad: &str) -> SimResult<&mut Pad> {
        let instance = &self.id.instance;
        self.core
            .instances
            .get_mut(instance)
            .and_then(|inst| inst.pad_mut(pad))
            .ok_or_else(|| SimError::NoSuchPad(format!("{instance}.{pad}")))
    }
}
