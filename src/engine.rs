//! The simulation engine: event dispatcher and run-state machine.
//!
//! A [`Simulation`] owns the timeline, the instance map, the suspended-
//! activity map, and the virtual clock. The dispatcher drains events in
//! `(time, seq)` order and routes each to its handler; activity bodies run
//! cooperatively on the dispatching thread and suspend only by returning a
//! [`StepResult`]. The outcome of a run therefore depends only on event
//! ordering, never on wall-clock scheduling.
//!
//! `Simulation` is a clone-able handle. All operations serialize on a single
//! engine mutex, so external threads may enqueue spawns, bind pads, or
//! request state changes while the run loop is draining events; internal and
//! external scheduling share one serialization order.
//!
//! # Example
//!
//! ```
//! use padsim::clock::secs;
//! use padsim::engine::{RunState, Simulation};
//! use padsim::model::{Model, ModelRegistry};
//! use padsim::activity::StepResult;
//!
//! let registry = ModelRegistry::new();
//! registry
//!     .register(
//!         Model::builder("Sleeper")
//!             .start(|ctx| match ctx.wake() {
//!                 padsim::activity::Wake::Start => Ok(ctx.wait_for(secs(1))),
//!                 _ => Ok(StepResult::Done),
//!             })
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let sim = Simulation::new(registry);
//! sim.spawn_instance("Sleeper", "a", Default::default(), None).unwrap();
//! sim.run().unwrap();
//! assert_eq!(sim.simtime(), secs(1));
//! assert_eq!(sim.state(), RunState::Done);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::activity::{Activity, ActivityId, ActivityState, StepResult, Suspension, Wake};
use crate::clock::SimTime;
use crate::context::ActivityCtx;
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventKind};
use crate::instance::Instance;
use crate::model::{ModelRegistry, START_ACTIVITY};
use crate::pad::PadRef;
use crate::timeline::{EventHandle, Timeline};
use crate::value::{Properties, Value};

/// Run state of a simulation.
///
/// Transitions are monotone through `Init -> Run <-> Pause -> Done`; `Done`
/// is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Assembled but not yet driven.
    #[default]
    Init,
    /// The dispatcher is draining events.
    Run,
    /// The dispatcher is parked until resumed.
    Pause,
    /// Terminal; the timeline has drained or the run was ended.
    Done,
}

impl RunState {
    /// Short lowercase name, used in errors and stats.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::Run => "run",
            RunState::Pause => "pause",
            RunState::Done => "done",
        }
    }
}

/// Counters collected over a run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Events popped from the timeline and routed.
    pub events_dispatched: u64,
    /// Events dropped because their target was gone or stale.
    pub events_dropped: u64,
    /// Instances created.
    pub instances_spawned: u64,
    /// Activities created or first-stepped.
    pub activities_spawned: u64,
    /// Payloads that reached a pad buffer or waiter.
    pub payloads_delivered: u64,
    /// Signals raised.
    pub signals_raised: u64,
    /// Activity bodies that returned an error and were terminated.
    pub activity_failures: u64,
    /// Simulation time when the run finished.
    pub final_time: SimTime,
}

/// One dispatched event, as recorded when tracing is enabled.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceEntry {
    /// Simulation time of the dispatch.
    pub time: SimTime,
    /// The event's insertion sequence number.
    pub seq: u64,
    /// Event kind label.
    pub label: String,
    /// Name of the targeted entity.
    pub target: String,
}

/// A suspension installed in the engine, paired with its pending timeout
/// event (if the suspension carries a deadline or wake time).
#[derive(Debug)]
pub(crate) struct Parked {
    pub(crate) suspension: Suspension,
    pub(crate) timeout: Option<EventHandle>,
}

/// Engine state behind the mutex. Everything the dispatcher and the activity
/// contexts touch lives here.
pub(crate) struct Core {
    pub(crate) simtime: SimTime,
    pub(crate) state: RunState,
    pub(crate) pending_state: RunState,
    pub(crate) registry: ModelRegistry,
    pub(crate) parameters: Properties,
    pub(crate) instances: BTreeMap<String, Instance>,
    pub(crate) timeline: Timeline,
    pub(crate) suspended: HashMap<ActivityId, Parked>,
    pub(crate) signal_waiters: HashMap<String, Vec<ActivityId>>,
    pub(crate) stats: EngineStats,
    pub(crate) trace: Option<Vec<TraceEntry>>,
}

impl Core {
    fn new(registry: ModelRegistry) -> Self {
        Self {
            simtime: 0,
            state: RunState::Init,
            pending_state: RunState::Init,
            registry,
            parameters: Properties::new(),
            instances: BTreeMap::new(),
            timeline: Timeline::new(),
            suspended: HashMap::new(),
            signal_waiters: HashMap::new(),
            stats: EngineStats::default(),
            trace: None,
        }
    }

    // ---- state machine ----

    fn request_state(&mut self, to: RunState) -> SimResult<()> {
        use RunState::*;
        let from = self.state;
        let allowed = match (from, to) {
            (f, t) if f == t => true,
            (Done, _) => false,
            (_, Done) => true,
            (Init, Run) => true,
            (Run, Pause) | (Pause, Run) => true,
            _ => false,
        };
        if !allowed {
            return Err(SimError::InvalidTransition {
                from: from.as_str(),
                to: to.as_str(),
            });
        }
        self.pending_state = to;
        Ok(())
    }

    fn apply_pending(&mut self) {
        if self.pending_state != self.state {
            debug!(
                from = self.state.as_str(),
                to = self.pending_state.as_str(),
                "state transition"
            );
            self.state = self.pending_state;
        }
    }

    fn finish(&mut self) {
        if self.state == RunState::Done {
            return;
        }
        self.state = RunState::Done;
        self.pending_state = RunState::Done;
        self.stats.final_time = self.simtime;
        if !self.suspended.is_empty() {
            warn!(
                count = self.suspended.len(),
                "run finished with suspended activities; their waits are cancelled"
            );
        }
    }

    // ---- ingress ----

    fn insert_spawn_instance(
        &mut self,
        model: &str,
        name: &str,
        parameters: Properties,
        at: Option<SimTime>,
    ) -> SimResult<()> {
        if name.is_empty() {
            return Err(SimError::Validation("instance name is empty".into()));
        }
        if self.registry.lookup(model).is_none() {
            return Err(SimError::NoSuchModel(model.into()));
        }
        let duplicate = self.instances.contains_key(name)
            || self.timeline.iter().any(|ev| {
                matches!(&ev.kind, EventKind::SpawnInstance { name: queued, .. } if queued == name)
            });
        if duplicate {
            return Err(SimError::Validation("instance not unique".into()));
        }
        let time = at.unwrap_or(self.simtime).max(self.simtime);
        self.timeline.push(Event::new(
            time,
            EventKind::SpawnInstance {
                model: model.into(),
                name: name.into(),
                parameters,
            },
        ));
        Ok(())
    }

    pub(crate) fn insert_spawn_activity(
        &mut self,
        spec: &str,
        name: &str,
        instance: &str,
        at: Option<SimTime>,
    ) -> SimResult<()> {
        if name.is_empty() || spec.is_empty() {
            return Err(SimError::Validation("activity or spec name is empty".into()));
        }
        let time = at.unwrap_or(self.simtime).max(self.simtime);

        // The target instance must exist now, or be queued to spawn no later
        // than this activity fires.
        let model = if let Some(inst) = self.instances.get(instance) {
            // An activity pre-created with `add_activity` is still in `Init`
            // and may be scheduled; anything past that is a duplicate.
            if inst
                .activity(name)
                .is_some_and(|a| a.state != ActivityState::Init)
            {
                return Err(SimError::Validation("activity not unique".into()));
            }
            inst.model().clone()
        } else {
            let queued_model = self.timeline.iter().find_map(|ev| match &ev.kind {
                EventKind::SpawnInstance {
                    model,
                    name: queued,
                    ..
                } if queued == instance && ev.time <= time => Some(model.clone()),
                _ => None,
            });
            let Some(model_name) = queued_model else {
                return Err(SimError::NoSuchInstance(instance.into()));
            };
            if name == START_ACTIVITY {
                return Err(SimError::Validation("activity not unique".into()));
            }
            self.registry
                .lookup(&model_name)
                .ok_or_else(|| SimError::NoSuchModel(model_name.clone()))?
        };
        if model.activity_spec(spec).is_none() {
            return Err(SimError::NoSuchSpec(spec.into()));
        }
        let queued_dup = self.timeline.iter().any(|ev| {
            matches!(&ev.kind, EventKind::SpawnActivity { name: n, instance: i, .. }
                if n == name && i == instance)
        });
        if queued_dup {
            return Err(SimError::Validation("activity not unique".into()));
        }

        self.timeline.push(Event::new(
            time,
            EventKind::SpawnActivity {
                spec: spec.into(),
                name: name.into(),
                instance: instance.into(),
            },
        ));
        Ok(())
    }

    fn bind(&mut self, a: &PadRef, b: &PadRef) -> SimResult<()> {
        if a == b {
            return Err(SimError::BindSelf(a.to_string()));
        }
        if a.instance == b.instance {
            return Err(SimError::BindSameInstance(a.to_string(), b.to_string()));
        }
        self.resolve_pad(a)?;
        self.resolve_pad(b)?;

        let peer_of_a = self.pad_peer(a);
        let peer_of_b = self.pad_peer(b);
        if peer_of_a.as_ref() == Some(b) && peer_of_b.as_ref() == Some(a) {
            return Ok(()); // already bound to each other
        }
        if let Some(p) = peer_of_a {
            return Err(SimError::AlreadyBound(a.to_string(), p.to_string()));
        }
        if let Some(p) = peer_of_b {
            return Err(SimError::AlreadyBound(b.to_string(), p.to_string()));
        }

        self.set_peer(a, Some(b.clone()));
        self.set_peer(b, Some(a.clone()));
        Ok(())
    }

    fn unbind(&mut self, p: &PadRef) -> SimResult<()> {
        self.resolve_pad(p)?;
        if let Some(peer) = self.pad_peer(p) {
            self.set_peer(&peer, None);
            self.set_peer(p, None);
        }
        Ok(())
    }

    fn resolve_pad(&self, r: &PadRef) -> SimResult<()> {
        let inst = self
            .instances
            .get(&r.instance)
            .ok_or_else(|| SimError::NoSuchInstance(r.instance.clone()))?;
        inst.pad(&r.pad)
            .map(|_| ())
            .ok_or_else(|| SimError::NoSuchPad(r.to_string()))
    }

    fn pad_peer(&self, r: &PadRef) -> Option<PadRef> {
        self.instances
            .get(&r.instance)
            .and_then(|i| i.pad(&r.pad))
            .and_then(|p| p.peer.clone())
    }

    fn set_peer(&mut self, r: &PadRef, peer: Option<PadRef>) {
        if let Some(pad) = self
            .instances
            .get_mut(&r.instance)
            .and_then(|i| i.pad_mut(&r.pad))
        {
            pad.peer = peer;
        }
    }

    // ---- dispatch ----

    /// Pops and dispatches the earliest event. Returns false when the
    /// timeline is empty.
    fn dispatch_next(&mut self) -> bool {
        let Some(event) = self.timeline.pop_min() else {
            return false;
        };
        // The clock only ever advances.
        if event.time > self.simtime {
            self.simtime = event.time;
        }
        self.stats.events_dispatched += 1;
        if let Some(trace) = &mut self.trace {
            trace.push(TraceEntry {
                time: self.simtime,
                seq: event.seq,
                label: event.label().to_string(),
                target: event.target(),
            });
        }
        debug!(time = self.simtime, kind = event.label(), entity = %event.target(), "dispatch");

        match event.kind {
            EventKind::StateChange => self.apply_pending(),
            EventKind::SpawnInstance {
                model,
                name,
                parameters,
            } => self.handle_spawn_instance(&model, name, parameters),
            EventKind::SpawnActivity {
                spec,
                name,
                instance,
            } => self.handle_spawn_activity(&spec, name, instance),
            EventKind::ResumeActivity {
                instance,
                activity,
                wake,
            } => self.handle_resume(instance, activity, wake),
            EventKind::PadDeliver { to, payload } => self.handle_deliver(to, payload),
        }
        true
    }

    fn drop_event(&mut self, what: &str, entity: &str) {
        warn!(what, entity, "event dropped");
        self.stats.events_dropped += 1;
    }

    fn handle_spawn_instance(&mut self, model: &str, name: String, parameters: Properties) {
        let Some(model_arc) = self.registry.lookup(model) else {
            self.drop_event("spawn_instance: unknown model", model);
            return;
        };
        if self.instances.contains_key(&name) {
            self.drop_event("spawn_instance: duplicate name", &name);
            return;
        }
        match Instance::new(model_arc, name.clone(), parameters) {
            Ok(instance) => {
                self.instances.insert(name.clone(), instance);
                self.stats.instances_spawned += 1;
                let time = self.simtime;
                self.timeline.push(Event::new(
                    time,
                    EventKind::SpawnActivity {
                        spec: START_ACTIVITY.into(),
                        name: START_ACTIVITY.into(),
                        instance: name,
                    },
                ));
            }
            Err(err) => {
                warn!(%err, instance = %name, "spawn_instance failed");
                self.stats.events_dropped += 1;
            }
        }
    }

    fn handle_spawn_activity(&mut self, spec: &str, name: String, instance: String) {
        let trigger = {
            let Some(inst) = self.instances.get_mut(&instance) else {
                self.drop_event("spawn_activity: unknown instance", &instance);
                return;
            };
            let Some(spec_obj) = inst.model().activity_spec(spec).cloned() else {
                self.drop_event("spawn_activity: unknown spec", spec);
                return;
            };
            match inst.activity(&name) {
                // The start activity is pre-created at instance spawn.
                Some(a) if a.state == ActivityState::Init => {}
                Some(_) => {
                    self.drop_event("spawn_activity: duplicate activity", &name);
                    return;
                }
                None => {
                    let activity = Activity::new(instance.clone(), spec_obj.clone(), name.clone());
                    inst.activities.insert(name.clone(), activity);
                }
            }
            spec_obj.triggering_event
        };
        self.stats.activities_spawned += 1;

        let id = ActivityId::new(instance, name);
        match trigger {
            // A triggered activity parks on its signal instead of taking a
            // first step.
            Some(signal) => self.park(
                id,
                Suspension::Signal {
                    name: signal,
                    deadline: None,
                },
                Wake::Timer,
            ),
            None => self.invoke(id, Wake::Start),
        }
    }

    fn handle_resume(&mut self, instance: String, activity: String, wake: Wake) {
        let id = ActivityId::new(instance, activity);
        let Some(parked) = self.suspended.remove(&id) else {
            // The wait was already satisfied or the activity is gone.
            self.drop_event("resume_activity: stale resume", &id.to_string());
            return;
        };
        // Timed-out waits are still queued on their pad or signal; drop the
        // membership before re-entering the body.
        match &parked.suspension {
            Suspension::Signal { name, .. } => {
                if let Some(waiters) = self.signal_waiters.get_mut(name) {
                    waiters.retain(|w| w != &id);
                }
            }
            Suspension::PadReceive { pad, .. } => {
                if let Some(p) = self
                    .instances
                    .get_mut(&id.instance)
                    .and_then(|i| i.pad_mut(pad))
                {
                    p.waiters.retain(|w| w != &id);
                }
            }
            Suspension::Timer { .. } => {}
        }
        self.invoke(id, wake);
    }

    fn handle_deliver(&mut self, to: PadRef, payload: Value) {
        let woken = {
            let Some(pad) = self
                .instances
                .get_mut(&to.instance)
                .and_then(|i| i.pad_mut(&to.pad))
            else {
                self.drop_event("pad_deliver: unknown pad", &to.to_string());
                return;
            };
            if !pad.is_bound() {
                self.drop_event("pad_deliver: pad unbound since send", &to.to_string());
                return;
            }
            pad.push_payload(payload);
            match pad.waiters.pop_front() {
                // A waiter implies the buffer was empty, so the head is the
                // payload delivered just now.
                Some(waiter) => pad.take_payload().map(|p| (waiter, p)),
                None => None,
            }
        };
        self.stats.payloads_delivered += 1;

        if let Some((waiter, payload)) = woken {
            let timeout = match self.suspended.get_mut(&waiter) {
                Some(parked) => parked.timeout.take(),
                None => panic!("pad waiter {waiter} is not in the suspended map"),
            };
            if let Some(handle) = timeout {
                self.timeline.remove(handle);
            }
            self.schedule_resume(
                &waiter,
                Wake::Pad {
                    pad: to.pad,
                    payload: Some(payload),
                },
            );
        }
    }

    // ---- activity lifecycle ----

    fn invoke(&mut self, id: ActivityId, wake: Wake) {
        let body = {
            let Some(activity) = self
                .instances
                .get_mut(&id.instance)
                .and_then(|i| i.activity_mut(&id.name))
            else {
                self.drop_event("invoke: unknown activity", &id.to_string());
                return;
            };
            if activity.state == ActivityState::Done {
                self.drop_event("invoke: activity already done", &id.to_string());
                return;
            }
            activity.state = ActivityState::Run;
            activity.spec.body.clone()
        };

        let step = {
            let mut ctx = ActivityCtx::new(self, id.clone(), wake);
            body(&mut ctx)
        };

        match step {
            Ok(StepResult::Done) => self.set_activity_state(&id, ActivityState::Done),
            Ok(StepResult::Ready) => {
                let now = self.simtime;
                self.park(id, Suspension::Timer { wake_at: now }, Wake::Ready);
            }
            Ok(StepResult::Paused(suspension)) => self.park(id, suspension, Wake::Timer),
            Err(err) => {
                warn!(activity = %id, %err, "activity body failed; terminating it");
                self.stats.activity_failures += 1;
                self.set_activity_state(&id, ActivityState::Done);
            }
        }
    }

    /// Installs a suspension: flips the activity to `Pause`, queues waiter
    /// list entries, and schedules the timeout/wake event on the timeline.
    fn park(&mut self, id: ActivityId, suspension: Suspension, timer_wake: Wake) {
        if self.suspended.contains_key(&id) {
            panic!("activity {id} is already suspended");
        }
        let timeout = match &suspension {
            Suspension::Timer { wake_at } => {
                let time = (*wake_at).max(self.simtime);
                Some(self.schedule_resume_at(&id, time, timer_wake))
            }
            Suspension::Signal { name, deadline } => {
                self.signal_waiters
                    .entry(name.clone())
                    .or_default()
                    .push(id.clone());
                let wake = Wake::Signal {
                    name: name.clone(),
                    timed_out: true,
                };
                deadline.map(|t| self.schedule_resume_at(&id, t.max(self.simtime), wake))
            }
            Suspension::PadReceive { pad, deadline } => {
                let queued = self
                    .instances
                    .get_mut(&id.instance)
                    .and_then(|i| i.pad_mut(pad))
                    .map(|p| p.waiters.push_back(id.clone()))
                    .is_some();
                if !queued {
                    warn!(activity = %id, pad = %pad, "suspension on unknown pad; terminating activity");
                    self.stats.activity_failures += 1;
                    self.set_activity_state(&id, ActivityState::Done);
                    return;
                }
                let wake = Wake::Pad {
                    pad: pad.clone(),
                    payload: None,
                };
                deadline.map(|t| self.schedule_resume_at(&id, t.max(self.simtime), wake))
            }
        };
        self.set_activity_state(&id, ActivityState::Pause);
        self.suspended.insert(id, Parked { suspension, timeout });
    }

    fn schedule_resume(&mut self, id: &ActivityId, wake: Wake) -> EventHandle {
        self.schedule_resume_at(id, self.simtime, wake)
    }

    fn schedule_resume_at(&mut self, id: &ActivityId, time: SimTime, wake: Wake) -> EventHandle {
        self.timeline.push(Event::new(
            time,
            EventKind::ResumeActivity {
                instance: id.instance.clone(),
                activity: id.name.clone(),
                wake,
            },
        ))
    }

    /// Wakes every activity waiting on `signal`, cancelling their deadline
    /// events before the resumes are scheduled.
    pub(crate) fn wake_signal(&mut self, signal: &str) -> usize {
        let waiters = self.signal_waiters.remove(signal).unwrap_or_default();
        let woken = waiters.len();
        for id in waiters {
            let timeout = match self.suspended.get_mut(&id) {
                Some(parked) => parked.timeout.take(),
                None => panic!("signal waiter {id} is not in the suspended map"),
            };
            if let Some(handle) = timeout {
                self.timeline.remove(handle);
            }
            self.schedule_resume(
                &id,
                Wake::Signal {
                    name: signal.to_string(),
                    timed_out: false,
                },
            );
        }
        self.stats.signals_raised += 1;
        woken
    }

    fn set_activity_state(&mut self, id: &ActivityId, state: ActivityState) {
        match self
            .instances
            .get_mut(&id.instance)
            .and_then(|i| i.activity_mut(&id.name))
        {
            Some(activity) => activity.state = state,
            None => warn!(activity = %id, "state change for missing activity"),
        }
    }
}

struct SimShared {
    core: Mutex<Core>,
    state_cvar: Condvar,
}

/// A discrete-event simulation. Clone-able handle; see the module docs.
#[derive(Clone)]
pub struct Simulation {
    shared: Arc<SimShared>,
}

impl Simulation {
    /// Creates an empty simulation resolving model names against `registry`.
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            shared: Arc::new(SimShared {
                core: Mutex::new(Core::new(registry)),
                state_cvar: Condvar::new(),
            }),
        }
    }

    // ---- assembly ----

    /// Schedules an instance of `model` named `name` to spawn at `at`
    /// (clamped to the current simtime; `None` means now).
    ///
    /// Fails if the model is unregistered or the name collides with a live
    /// or queued instance.
    pub fn spawn_instance(
        &self,
        model: &str,
        name: &str,
        parameters: Properties,
        at: Option<SimTime>,
    ) -> SimResult<()> {
        self.shared
            .core
            .lock()
            .insert_spawn_instance(model, name, parameters, at)
    }

    /// Schedules an activity from `spec` named `name` on `instance`.
    ///
    /// The instance must be live, or queued to spawn no later than the
    /// activity event fires.
    pub fn spawn_activity(
        &self,
        spec: &str,
        name: &str,
        instance: &str,
        at: Option<SimTime>,
    ) -> SimResult<()> {
        self.shared
            .core
            .lock()
            .insert_spawn_activity(spec, name, instance, at)
    }

    /// Binds two pads symmetrically. Idempotent when the two are already
    /// bound to each other.
    pub fn bind(&self, a: &PadRef, b: &PadRef) -> SimResult<()> {
        self.shared.core.lock().bind(a, b)
    }

    /// Severs a binding from either side. Buffered payloads survive and stay
    /// receivable; later sends fail.
    pub fn unbind(&self, p: &PadRef) -> SimResult<()> {
        self.shared.core.lock().unbind(p)
    }

    /// Sets a simulation-global parameter.
    pub fn set_parameter(&self, name: impl Into<String>, value: Value) {
        self.shared.core.lock().parameters.insert(name.into(), value);
    }

    /// Looks up a simulation-global parameter.
    pub fn parameter(&self, name: &str) -> Option<Value> {
        self.shared.core.lock().parameters.get(name).cloned()
    }

    // ---- observers ----

    /// Current simulation time.
    pub fn simtime(&self) -> SimTime {
        self.shared.core.lock().simtime
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.shared.core.lock().state
    }

    /// Current run state plus the last requested (possibly not yet applied)
    /// state.
    pub fn state_with_pending(&self) -> (RunState, RunState) {
        let core = self.shared.core.lock();
        (core.state, core.pending_state)
    }

    /// Names of live instances, sorted.
    pub fn instance_names(&self) -> Vec<String> {
        self.shared.core.lock().instances.keys().cloned().collect()
    }

    /// Reads a parameter off a live instance.
    pub fn instance_parameter(&self, instance: &str, name: &str) -> Option<Value> {
        self.shared
            .core
            .lock()
            .instances
            .get(instance)
            .and_then(|i| i.parameter(name))
            .cloned()
    }

    /// Buffered payload count on a pad.
    pub fn pad_available(&self, r: &PadRef) -> SimResult<usize> {
        let core = self.shared.core.lock();
        core.resolve_pad(r)?;
        Ok(core
            .instances
            .get(&r.instance)
            .and_then(|i| i.pad(&r.pad))
            .map(|p| p.available())
            .unwrap_or(0))
    }

    /// The peer a pad is bound to, if any.
    pub fn pad_peer(&self, r: &PadRef) -> SimResult<Option<PadRef>> {
        let core = self.shared.core.lock();
        core.resolve_pad(r)?;
        Ok(core.pad_peer(r))
    }

    /// Lifecycle state of an activity, if it exists.
    pub fn activity_state(&self, instance: &str, activity: &str) -> Option<ActivityState> {
        self.shared
            .core
            .lock()
            .instances
            .get(instance)
            .and_then(|i| i.activity(activity))
            .map(|a| a.state)
    }

    /// Number of events pending on the timeline.
    pub fn pending_events(&self) -> usize {
        self.shared.core.lock().timeline.len()
    }

    /// Number of currently suspended activities.
    pub fn suspended_count(&self) -> usize {
        self.shared.core.lock().suspended.len()
    }

    /// Snapshot of the run counters.
    pub fn stats(&self) -> EngineStats {
        self.shared.core.lock().stats.clone()
    }

    /// Exports engine and per-instance statistics as JSON.
    pub fn export_stats(&self) -> serde_json::Value {
        let core = self.shared.core.lock();
        let mut instances = serde_json::Map::new();
        for (name, inst) in &core.instances {
            instances.insert(
                name.clone(),
                serde_json::json!({
                    "model": inst.model().name(),
                    "pads": inst.pads().count(),
                    "activities": inst.activities().count(),
                }),
            );
        }
        serde_json::json!({
            "engine": {
                "simtime": core.simtime,
                "state": core.state.as_str(),
                "events_dispatched": core.stats.events_dispatched,
                "events_dropped": core.stats.events_dropped,
                "instances_spawned": core.stats.instances_spawned,
                "activities_spawned": core.stats.activities_spawned,
                "payloads_delivered": core.stats.payloads_delivered,
                "signals_raised": core.stats.signals_raised,
                "pending_events": core.timeline.len(),
            },
            "instances": instances,
        })
    }

    /// Enables or disables dispatch tracing. Enabling clears any previous
    /// trace.
    pub fn set_trace(&self, enabled: bool) {
        self.shared.core.lock().trace = if enabled { Some(Vec::new()) } else { None };
    }

    /// Drains the recorded dispatch trace.
    pub fn take_trace(&self) -> Vec<TraceEntry> {
        let mut core = self.shared.core.lock();
        match &mut core.trace {
            Some(trace) => std::mem::take(trace),
            None => Vec::new(),
        }
    }

    // ---- driving ----

    /// Requests a run-state transition. The dispatch loop observes it before
    /// its next dispatch; a paused loop wakes immediately.
    pub fn set_state(&self, to: RunState) -> SimResult<()> {
        let mut core = self.shared.core.lock();
        core.request_state(to)?;
        let time = core.simtime;
        core.timeline.push(Event::new(time, EventKind::StateChange));
        drop(core);
        self.shared.state_cvar.notify_all();
        Ok(())
    }

    /// Drives the simulation until it is done: enters `Run` and drains the
    /// timeline, honoring pause requests along the way. Returns when the
    /// state reaches `Done`.
    pub fn run(&self) -> SimResult<()> {
        {
            let mut core = self.shared.core.lock();
            core.request_state(RunState::Run)?;
            core.apply_pending();
        }
        loop {
            let mut core = self.shared.core.lock();
            core.apply_pending();
            match core.state {
                RunState::Done => {
                    drop(core);
                    self.shared.state_cvar.notify_all();
                    return Ok(());
                }
                RunState::Run => {
                    if !core.dispatch_next() {
                        core.finish();
                    }
                }
                RunState::Init | RunState::Pause => {
                    self.shared.state_cvar.wait(&mut core);
                }
            }
        }
    }

    /// Dispatches a single event, for manual driving in tests and tools.
    /// Returns false when the timeline is empty. Does not transition to
    /// `Done` on its own.
    pub fn step(&self) -> SimResult<bool> {
        let mut core = self.shared.core.lock();
        if core.state == RunState::Done {
            return Err(SimError::InvalidTransition {
                from: "done",
                to: "run",
            });
        }
        core.apply_pending();
        Ok(core.dispatch_next())
    }

    /// Processes instance-spawn events already due at the current time while
    /// the simulation is still in `Init`.
    ///
    /// Bindings need materialized pads; a topology loader spawns instances,
    /// settles, then binds, all before the run starts. No activity body runs
    /// here.
    pub fn settle(&self) -> SimResult<()> {
        let mut core = self.shared.core.lock();
        if core.state != RunState::Init {
            return Err(SimError::Validation(
                "settle is only valid before the run starts".into(),
            ));
        }
        loop {
            let due_spawn = core.timeline.peek().is_some_and(|ev| {
                ev.time <= core.simtime && matches!(ev.kind, EventKind::SpawnInstance { .. })
            });
            if !due_spawn {
                return Ok(());
            }
            core.dispatch_next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::StepResult;
    use crate::model::Model;

    fn registry_with_noop(name: &str) -> ModelRegistry {
        let registry = ModelRegistry::new();
        registry
            .register(
                Model::builder(name)
                    .start(|_ctx| Ok(StepResult::Done))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_initial_state() {
        let sim = Simulation::new(ModelRegistry::new());
        assert_eq!(sim.state(), RunState::Init);
        assert_eq!(sim.simtime(), 0);
        assert_eq!(sim.pending_events(), 0);
    }

    #[test]
    fn test_state_transitions() {
        let sim = Simulation::new(ModelRegistry::new());
        assert!(sim.set_state(RunState::Pause).is_err()); // init -> pause
        sim.set_state(RunState::Run).unwrap();
        let (_, pending) = sim.state_with_pending();
        assert_eq!(pending, RunState::Run);
        sim.set_state(RunState::Done).unwrap();
    }

    #[test]
    fn test_done_is_terminal() {
        let sim = Simulation::new(registry_with_noop("M"));
        sim.spawn_instance("M", "a", Properties::new(), None).unwrap();
        sim.run().unwrap();
        assert_eq!(sim.state(), RunState::Done);
        assert!(sim.set_state(RunState::Run).is_err());
        assert!(sim.step().is_err());
    }

    #[test]
    fn test_spawn_unknown_model() {
        let sim = Simulation::new(ModelRegistry::new());
        let err = sim
            .spawn_instance("nope", "a", Properties::new(), None)
            .unwrap_err();
        assert!(matches!(err, SimError::NoSuchModel(_)));
    }

    #[test]
    fn test_duplicate_spawn_rejected_while_queued() {
        let sim = Simulation::new(registry_with_noop("M"));
        sim.spawn_instance("M", "a", Properties::new(), None).unwrap();
        let err = sim
            .spawn_instance("M", "a", Properties::new(), None)
            .unwrap_err();
        assert_eq!(err, SimError::Validation("instance not unique".into()));
        // Only one instance exists after the run.
        sim.run().unwrap();
        assert_eq!(sim.instance_names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_spawn_activity_requires_instance() {
        let sim = Simulation::new(registry_with_noop("M"));
        let err = sim.spawn_activity("start", "x", "ghost", None).unwrap_err();
        assert!(matches!(err, SimError::NoSuchInstance(_)));

        // Queued instance is enough when it spawns in time.
        sim.spawn_instance("M", "a", Properties::new(), None).unwrap();
        assert!(matches!(
            sim.spawn_activity("nope", "x", "a", None).unwrap_err(),
            SimError::NoSuchSpec(_)
        ));
    }

    #[test]
    fn test_settle_materializes_queued_instances() {
        let sim = Simulation::new(registry_with_noop("M"));
        sim.spawn_instance("M", "a", Properties::new(), None).unwrap();
        sim.spawn_instance("M", "b", Properties::new(), None).unwrap();
        assert!(sim.instance_names().is_empty());

        sim.settle().unwrap();
        assert_eq!(sim.instance_names(), vec!["a".to_string(), "b".to_string()]);
        // The start activities have not run.
        assert_eq!(
            sim.activity_state("a", "start"),
            Some(ActivityState::Init)
        );
    }

    #[test]
    fn test_run_drains_and_finishes() {
        let sim = Simulation::new(registry_with_noop("M"));
        sim.spawn_instance("M", "a", Properties::new(), None).unwrap();
        sim.run().unwrap();

        assert_eq!(sim.state(), RunState::Done);
        assert_eq!(sim.pending_events(), 0);
        let stats = sim.stats();
        assert_eq!(stats.instances_spawned, 1);
        assert_eq!(stats.activities_spawned, 1);
        assert_eq!(sim.activity_state("a", "start"), Some(ActivityState::Done));
    }

    #[test]
    fn test_trace_records_dispatches() {
        let sim = Simulation::new(registry_with_noop("M"));
        sim.set_trace(true);
        sim.spawn_instance("M", "a", Properties::new(), None).unwrap();
        sim.run().unwrap();

        let trace = sim.take_trace();
        let labels: Vec<&str> = trace.iter().map(|t| t.label.as_str()).collect();
        assert!(labels.contains(&"spawn_instance"));
        assert!(labels.contains(&"spawn_activity"));
    }

    #[test]
    fn test_export_stats_shape() {
        let sim = Simulation::new(registry_with_noop("M"));
        sim.spawn_instance("M", "a", Properties::new(), None).unwrap();
        sim.run().unwrap();

        let stats = sim.export_stats();
        assert_eq!(stats["engine"]["state"], "done");
        assert_eq!(stats["engine"]["instances_spawned"], 1);
        assert!(stats["instances"]["a"].is_object());
    }

    #[test]
    fn test_global_parameters() {
        let sim = Simulation::new(ModelRegistry::new());
        sim.set_parameter("seed", Value::UInt(7));
        assert_eq!(sim.parameter("seed"), Some(Value::UInt(7)));
        assert_eq!(sim.parameter("missing"), None);
    }
}
