// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        descriptor::{Descriptor, Machine, Process, Unhandled},
        dispatch::Dispatch,
        error::Error,
        event::{Event, InstanceId, Message, StateId, TimerId},
        external::{ExternalQueue, ExternalSender},
        table::ProcessTable,
        time::{Clock, Time},
        timer::TimerQueue,
        trace::Trace,
    },
    log::{debug, error, trace, warn},
    std::{collections::VecDeque, mem, sync::Arc, time::Duration},
};

pub const DEFAULT_MAX_INSTANCES: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub max_instances: usize,
    /// Programming errors panic instead of being logged and dropped.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_instances: DEFAULT_MAX_INSTANCES, strict: cfg!(debug_assertions) }
    }
}

type LeakHook<M> = Box<dyn FnMut(&Event<M>) + Send>;

pub(crate) struct Core<M: Message> {
    pub table: ProcessTable<M>,
    pub internal: VecDeque<Event<M>>,
    /// Saved events released by a state change. Drained ahead of `internal`.
    pub replay: VecDeque<Event<M>>,
    pub timers: TimerQueue<M>,
    pub external: Arc<ExternalQueue<M>>,
    pub clock: Box<dyn Clock>,
    config: Config,
    trace: Option<Box<dyn Trace>>,
    leak_hook: Option<LeakHook<M>>,
}

impl<M: Message> Core<M> {
    pub fn create<D: Send + 'static>(
        &mut self,
        descriptor: &'static Descriptor<M, D>,
        data: D,
        owner: Option<InstanceId>,
        persistent: bool,
    ) -> Result<InstanceId, Error> {
        if let Some(owner) = owner {
            match self.table.get(owner) {
                Some(record) if record.child.is_some() => {
                    return Err(Error::SubInstanceBusy(owner))
                }
                Some(_) => (),
                None => return Err(Error::NoSuchInstance(owner)),
            }
        }
        let id =
            self.table.allocate(Box::new(Process::new(descriptor, data)), owner, persistent)?;
        if let Some(record) = owner.and_then(|owner| self.table.get_mut(owner)) {
            record.child = Some(id);
        }
        debug!("{}[{}] created", descriptor.name, id);

        if descriptor.entry.is_some() {
            if let Some(mut machine) = self.take_machine(id) {
                let state = descriptor.initial;
                let mut dispatch = Dispatch::new(self, id, owner, state);
                machine.entry(&mut dispatch);
                let to = dispatch.state();
                self.complete(id, machine, state, to);
            }
        }
        Ok(id)
    }

    pub fn is_active(&self, id: InstanceId) -> bool {
        self.table.get(id).map_or(false, |record| !record.state.is_terminated())
    }

    pub fn save(&mut self, id: InstanceId, event: Event<M>) {
        if let Some(trace) = &mut self.trace {
            trace.saved(id, &event.body);
        }
        match self.table.get_mut(id) {
            Some(record) => record.saved.push_back(event),
            None => self.invalid(event, "cannot save for a missing instance"),
        }
    }

    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        if self.timers.cancel(id).is_some() {
            return true;
        }
        // The timer may already have fired and been saved by the state its destination was in.
        for record in self.table.records_mut() {
            if let Some(pos) = record.saved.iter().position(|event| event.timer == Some(id)) {
                record.saved.remove(pos);
                return true;
            }
        }
        if let Some(pos) = self.replay.iter().position(|event| event.timer == Some(id)) {
            self.replay.remove(pos);
            return true;
        }
        false
    }

    fn take_machine(&mut self, id: InstanceId) -> Option<Box<dyn Machine<M>>> {
        self.table.get_mut(id).and_then(|record| record.machine.take())
    }

    fn drain_internal(&mut self) -> bool {
        let mut worked = false;
        while let Some(event) = self.replay.pop_front().or_else(|| self.internal.pop_front()) {
            worked = true;
            self.dispatch(event);
        }
        worked
    }

    fn dispatch(&mut self, event: Event<M>) {
        let (mut target, mut owner) = match self.table.get(event.dest) {
            Some(record) if record.is_active() => (event.dest, record.owner),
            _ => return self.invalid(event, "destination is not an active instance"),
        };
        while let Some(child) = self.table.get(target).and_then(|record| record.child) {
            match self.table.get(child) {
                Some(record) if record.is_active() => {
                    owner = Some(target);
                    target = child;
                }
                _ => break,
            }
        }

        let (state, mut machine) = match self.table.get_mut(target) {
            Some(record) => match record.machine.take() {
                Some(machine) => (record.state, machine),
                None => return self.invalid(event, "instance is already dispatching"),
            },
            None => return self.invalid(event, "destination vanished"),
        };
        trace!("{}[{}] {} <- {:?}", machine.name(), target, machine.state_name(state), event.body);
        if let Some(trace) = &mut self.trace {
            trace.dispatched(target, machine.name(), machine.state_name(state), &event.body);
        }

        let mut dispatch = Dispatch::new(self, target, owner, state);
        let result = machine.handle(&mut dispatch, event);
        let to = dispatch.state();

        if let Err(Unhandled { mut event, save_all }) = result {
            if save_all {
                self.save(target, event);
            } else if let Some(owner) = owner {
                event.dest = owner;
                self.save(owner, event);
            } else {
                self.invalid(event, "no transition for event");
            }
        }
        self.complete(target, machine, state, to);
    }

    /// Returns the machine to its record and acts on a state change.
    fn complete(
        &mut self,
        id: InstanceId,
        machine: Box<dyn Machine<M>>,
        from: StateId,
        to: StateId,
    ) {
        let record = match self.table.get_mut(id) {
            Some(record) => record,
            None => return,
        };
        if to.is_terminated() && record.persistent {
            record.machine = Some(machine);
            let name = record.machine.as_ref().map_or("", |m| m.name());
            if self.config.strict {
                panic!("{}[{}] is registered and cannot terminate", name, id);
            }
            error!("{}[{}] is registered and cannot terminate; staying in its state", name, id);
            return;
        }
        record.state = to;
        if from == to {
            record.machine = Some(machine);
            return;
        }
        debug!("{}[{}] {} -> {}", machine.name(), id, machine.state_name(from), machine.state_name(to));
        if let Some(trace) = &mut self.trace {
            trace.transition(id, machine.name(), machine.state_name(from), machine.state_name(to));
        }
        if to.is_terminated() {
            self.terminate(id, machine);
        } else {
            record.machine = Some(machine);
            let saved = mem::take(&mut record.saved);
            for event in saved.into_iter().rev() {
                self.replay.push_front(event);
            }
        }
    }

    fn terminate(&mut self, id: InstanceId, mut machine: Box<dyn Machine<M>>) {
        let owner = self.table.get(id).and_then(|record| record.owner);
        let mut dispatch = Dispatch::new(self, id, owner, StateId::TERMINATED);
        machine.reset(&mut dispatch);

        let record = match self.table.free(id) {
            Some(record) => record,
            None => return,
        };
        // A top-level instance only runs handlers while it has no sub-instance, so it cannot
        // leave one behind.
        debug_assert!(
            record.owner.is_some() || record.child.is_none(),
            "top-level {} terminated while it still owns sub-instance {:?}",
            id,
            record.child
        );
        // Promote a grand-sub-instance into the slot this instance occupied.
        if let Some(owner) = record.owner.and_then(|owner| self.table.get_mut(owner)) {
            owner.child = record.child;
        }
        if let Some(child) = record.child.and_then(|child| self.table.get_mut(child)) {
            child.owner = record.owner;
        }

        let mut purged: Vec<Event<M>> = record.saved.into_iter().collect();
        for queue in [&mut self.internal, &mut self.replay] {
            let (removed, kept): (VecDeque<_>, VecDeque<_>) =
                mem::take(queue).into_iter().partition(|event| event.dest == id);
            *queue = kept;
            purged.extend(removed);
        }
        purged.extend(self.external.remove_for(id));
        purged.extend(self.timers.remove_for(id));
        for event in purged {
            if machine.ignores(event.id()) {
                trace!("{}[{}] discarding {:?}", machine.name(), id, event.body);
                continue;
            }
            warn!("{}[{}] terminated with {:?} pending", machine.name(), id, event.body);
            if let Some(hook) = &mut self.leak_hook {
                hook(&event);
            }
        }
        debug!("{}[{}] freed", machine.name(), id);
    }

    fn invalid(&mut self, event: Event<M>, reason: &str) {
        if let Some(trace) = &mut self.trace {
            trace.invalid(event.dest, &event.body);
        }
        if self.config.strict {
            panic!("invalid event {:?} from {} to {}: {}", event.body, event.sender, event.dest, reason);
        }
        error!("dropping {:?} from {} to {}: {}", event.body, event.sender, event.dest, reason);
    }
}

/// A deterministic, run-to-completion executor for a set of state machine instances.
pub struct Context<M: Message> {
    core: Core<M>,
}

impl<M: Message> Context<M> {
    pub fn new(config: Config, clock: impl Clock + 'static) -> Self {
        Self {
            core: Core {
                table: ProcessTable::with_capacity(config.max_instances),
                internal: VecDeque::new(),
                replay: VecDeque::new(),
                timers: TimerQueue::new(),
                external: Arc::new(ExternalQueue::new()),
                clock: Box::new(clock),
                config,
                trace: None,
                leak_hook: None,
            },
        }
    }

    /// Registers a root instance that lives as long as the context.
    pub fn register<D: Send + 'static>(
        &mut self,
        descriptor: &'static Descriptor<M, D>,
        data: D,
    ) -> Result<InstanceId, Error> {
        self.core.create(descriptor, data, None, true)
    }

    /// Creates a dynamic top-level instance. It is freed once it terminates.
    pub fn spawn<D: Send + 'static>(
        &mut self,
        descriptor: &'static Descriptor<M, D>,
        data: D,
    ) -> Result<InstanceId, Error> {
        self.core.create(descriptor, data, None, false)
    }

    pub fn submit_internal(&mut self, dest: InstanceId, body: M) {
        self.core.internal.push_back(Event::new(dest, InstanceId::EXTERNAL, body));
    }

    /// Safe to call from any thread through `external_sender`; this is the same queue.
    pub fn submit_external(&self, dest: InstanceId, body: M) {
        self.external_sender().submit(dest, body);
    }

    pub fn external_sender(&self) -> ExternalSender<M> {
        ExternalSender::new(Arc::clone(&self.core.external))
    }

    /// Installs a callback run after every external submission, e.g. to wake the thread
    /// driving `run_once`.
    pub fn set_wake(&self, wake: impl Fn() + Send + Sync + 'static) {
        self.core.external.set_wake(Arc::new(wake));
    }

    pub fn arm_timer(
        &mut self,
        dest: InstanceId,
        body: M,
        delay: Duration,
        tolerance: Duration,
    ) -> TimerId {
        let deadline = self.core.clock.now() + delay;
        self.core.timers.insert(deadline, tolerance, Event::new(dest, InstanceId::EXTERNAL, body))
    }

    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.core.cancel_timer(id)
    }

    /// Processes all pending work: the internal queue (with saved-event replay), then every
    /// expired timer oldest-first, then one external event; repeats until nothing is left.
    /// Returns the deadline of the next pending timer.
    pub fn run_once(&mut self) -> Option<Time> {
        loop {
            let mut worked = self.core.drain_internal();
            loop {
                let now = self.core.clock.now();
                match self.core.timers.pop_expired(now) {
                    Some(entry) => {
                        worked = true;
                        self.core.dispatch(entry.event);
                        self.core.drain_internal();
                    }
                    None => break,
                }
            }
            if let Some(event) = self.core.external.pop() {
                worked = true;
                self.core.dispatch(event);
            }
            if !worked {
                return self.core.timers.next_deadline();
            }
        }
    }

    /// Time until the earliest pending timer, zero if it is already due.
    pub fn next_timeout(&self) -> Option<Duration> {
        let now = self.core.clock.now();
        self.core.timers.next_deadline().map(|deadline| deadline - now)
    }

    /// Earliest deadline and the latest instant a wake-up may be deferred to.
    pub fn next_wake(&self) -> Option<(Time, Time)> {
        self.core.timers.next_wake()
    }

    pub fn now(&self) -> Time {
        self.core.clock.now()
    }

    pub fn is_active(&self, id: InstanceId) -> bool {
        self.core.is_active(id)
    }

    pub fn state_of(&self, id: InstanceId) -> Option<StateId> {
        self.core.table.get(id).map(|record| record.state)
    }

    pub fn state_name(&self, id: InstanceId) -> Option<&'static str> {
        let record = self.core.table.get(id)?;
        record.machine.as_ref().map(|machine| machine.state_name(record.state))
    }

    /// Private data of an instance, if it exists and has type `D`.
    pub fn data<D: 'static>(&self, id: InstanceId) -> Option<&D> {
        self.core.table.get(id)?.machine.as_ref()?.data().downcast_ref::<D>()
    }

    pub fn sub_instance(&self, id: InstanceId) -> Option<InstanceId> {
        self.core.table.get(id).and_then(|record| record.child)
    }

    pub fn saved_len(&self, id: InstanceId) -> usize {
        self.core.table.get(id).map_or(0, |record| record.saved.len())
    }

    pub fn pending_timers(&self) -> usize {
        self.core.timers.len()
    }

    pub fn pending_external(&self) -> usize {
        self.core.external.len()
    }

    pub fn instance_count(&self) -> usize {
        self.core.table.len()
    }

    pub fn set_trace(&mut self, trace: Box<dyn Trace>) {
        self.core.trace = Some(trace);
    }

    /// Called for every event discarded on termination that the descriptor does not list as
    /// ignorable. The event is dropped afterwards, releasing whatever it references.
    pub fn set_leak_hook(&mut self, hook: impl FnMut(&Event<M>) + Send + 'static) {
        self.core.leak_hook = Some(Box::new(hook));
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{assert_variant, descriptor::StateTable, time::FakeClock, transitions},
        parking_lot::Mutex,
        std::{
            sync::atomic::{AtomicUsize, Ordering},
            thread,
        },
        test_case::test_case,
    };

    #[derive(Debug)]
    enum Msg {
        Go,
        Poke(u32),
        Tracked(Arc<()>),
        Tick,
        Chain(u32),
        Done,
        Finished,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum MsgId {
        Go,
        Poke,
        Tracked,
        Tick,
        Chain,
        Done,
        Finished,
    }

    impl Message for Msg {
        type Id = MsgId;

        fn id(&self) -> MsgId {
            match self {
                Msg::Go => MsgId::Go,
                Msg::Poke(_) => MsgId::Poke,
                Msg::Tracked(_) => MsgId::Tracked,
                Msg::Tick => MsgId::Tick,
                Msg::Chain(_) => MsgId::Chain,
                Msg::Done => MsgId::Done,
                Msg::Finished => MsgId::Finished,
            }
        }
    }

    const CLOSED: StateId = StateId(0);
    const OPEN: StateId = StateId(1);

    #[derive(Default)]
    struct Gate {
        log: Vec<String>,
    }

    impl Gate {
        fn open(&mut self, d: &mut Dispatch<'_, Msg>, _: Event<Msg>) {
            d.set_state(OPEN);
        }

        fn poke(&mut self, _: &mut Dispatch<'_, Msg>, e: Event<Msg>) {
            let n = assert_variant!(e.into_body(), Msg::Poke(n) => n);
            self.log.push(n.to_string());
        }

        fn tracked(&mut self, _: &mut Dispatch<'_, Msg>, _: Event<Msg>) {
            self.log.push("tracked".to_string());
        }

        fn tick(&mut self, _: &mut Dispatch<'_, Msg>, _: Event<Msg>) {
            self.log.push("tick".to_string());
        }

        fn chain(&mut self, d: &mut Dispatch<'_, Msg>, e: Event<Msg>) {
            let n = assert_variant!(e.into_body(), Msg::Chain(n) => n);
            self.log.push(format!("chain {}", n));
            let current = d.current();
            d.send(current, Msg::Poke(n));
        }

        fn finish(&mut self, d: &mut Dispatch<'_, Msg>, _: Event<Msg>) {
            d.terminate();
        }
    }

    static GATE: Descriptor<Msg, Gate> = Descriptor {
        name: "Gate",
        initial: CLOSED,
        states: &[
            StateTable {
                name: "Closed",
                save_all: true,
                transitions: transitions![MsgId::Go => Gate::open, MsgId::Done => Gate::finish],
            },
            StateTable {
                name: "Open",
                save_all: false,
                transitions: transitions![
                    MsgId::Poke => Gate::poke,
                    MsgId::Tracked => Gate::tracked,
                    MsgId::Done => Gate::finish,
                ],
            },
        ],
        default: transitions![MsgId::Tick => Gate::tick, MsgId::Chain => Gate::chain],
        ignore: &[MsgId::Poke],
        entry: None,
        reset: None,
    };

    const IDLE: StateId = StateId(0);
    const BUSY: StateId = StateId(1);

    #[derive(Default)]
    struct Parent {
        log: Vec<String>,
    }

    impl Parent {
        fn start(&mut self, d: &mut Dispatch<'_, Msg>, _: Event<Msg>) {
            d.spawn_sub(&CHILD, Child::default()).expect("spawn child");
            d.set_state(BUSY);
        }

        fn poke(&mut self, _: &mut Dispatch<'_, Msg>, e: Event<Msg>) {
            let n = assert_variant!(e.into_body(), Msg::Poke(n) => n);
            self.log.push(n.to_string());
        }

        fn start_and_quit(&mut self, d: &mut Dispatch<'_, Msg>, _: Event<Msg>) {
            d.spawn_sub(&CHILD, Child::default()).expect("spawn child");
            d.terminate();
        }

        fn finished(&mut self, d: &mut Dispatch<'_, Msg>, _: Event<Msg>) {
            self.log.push("finished".to_string());
            d.set_state(IDLE);
        }
    }

    static PARENT: Descriptor<Msg, Parent> = Descriptor {
        name: "Parent",
        initial: IDLE,
        states: &[
            StateTable {
                name: "Idle",
                save_all: false,
                transitions: transitions![MsgId::Go => Parent::start, MsgId::Poke => Parent::poke],
            },
            StateTable {
                name: "Busy",
                save_all: false,
                transitions: transitions![MsgId::Finished => Parent::finished],
            },
        ],
        default: &[],
        ignore: &[],
        entry: None,
        reset: None,
    };

    static QUITTER: Descriptor<Msg, Parent> = Descriptor {
        name: "Quitter",
        initial: IDLE,
        states: &[StateTable {
            name: "Idle",
            save_all: false,
            transitions: transitions![MsgId::Go => Parent::start_and_quit],
        }],
        default: &[],
        ignore: &[],
        entry: None,
        reset: None,
    };

    #[derive(Default)]
    struct Child {
        ticks: usize,
    }

    impl Child {
        fn tick(&mut self, _: &mut Dispatch<'_, Msg>, _: Event<Msg>) {
            self.ticks += 1;
        }

        fn done(&mut self, d: &mut Dispatch<'_, Msg>, _: Event<Msg>) {
            d.terminate();
        }

        fn reset(&mut self, d: &mut Dispatch<'_, Msg>) {
            if let Some(owner) = d.owner() {
                d.send(owner, Msg::Finished);
            }
        }
    }

    static CHILD: Descriptor<Msg, Child> = Descriptor {
        name: "Child",
        initial: StateId(0),
        states: &[StateTable {
            name: "Running",
            save_all: false,
            transitions: transitions![MsgId::Tick => Child::tick, MsgId::Done => Child::done],
        }],
        default: &[],
        ignore: &[],
        entry: None,
        reset: Some(Child::reset),
    };

    fn lenient() -> Config {
        Config { strict: false, ..Config::default() }
    }

    fn context(config: Config) -> (Context<Msg>, FakeClock) {
        let clock = FakeClock::new();
        (Context::new(config, clock.clone()), clock)
    }

    fn gate_log(ctx: &Context<Msg>, id: InstanceId) -> Vec<String> {
        ctx.data::<Gate>(id).expect("gate data").log.clone()
    }

    #[test]
    fn saved_events_replay_in_arrival_order() {
        let (mut ctx, _) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        ctx.submit_external(gate, Msg::Poke(1));
        ctx.submit_external(gate, Msg::Poke(2));
        ctx.submit_external(gate, Msg::Go);
        ctx.submit_external(gate, Msg::Poke(3));
        assert_eq!(ctx.run_once(), None);
        assert_eq!(gate_log(&ctx, gate), vec!["1", "2", "3"]);
        assert_eq!(ctx.saved_len(gate), 0);
        assert_eq!(ctx.state_name(gate), Some("Open"));
    }

    #[test]
    fn saved_events_stay_put_without_state_change() {
        let (mut ctx, _) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        for n in 0..3 {
            ctx.submit_internal(gate, Msg::Poke(n));
        }
        assert_eq!(ctx.run_once(), None);
        assert_eq!(ctx.saved_len(gate), 3);
        assert!(gate_log(&ctx, gate).is_empty());
    }

    #[test]
    fn default_table_wins_over_save_all() {
        let (mut ctx, _) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        ctx.submit_internal(gate, Msg::Tick);
        ctx.run_once();
        assert_eq!(gate_log(&ctx, gate), vec!["tick"]);
        assert_eq!(ctx.saved_len(gate), 0);
    }

    #[test]
    fn every_event_is_released_exactly_once() {
        let (mut ctx, _) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        let token = Arc::new(());
        for _ in 0..3 {
            ctx.submit_external(gate, Msg::Tracked(token.clone()));
        }
        ctx.run_once();
        assert_eq!(Arc::strong_count(&token), 4);
        ctx.submit_external(gate, Msg::Go);
        ctx.run_once();
        assert_eq!(Arc::strong_count(&token), 1);
        assert_eq!(gate_log(&ctx, gate), vec!["tracked"; 3]);
    }

    #[test]
    fn termination_purges_pending_events() {
        let (mut ctx, _) = context(Config::default());
        let leaked = Arc::new(Mutex::new(Vec::new()));
        let sink = leaked.clone();
        ctx.set_leak_hook(move |event| sink.lock().push(event.id()));

        let gate = ctx.spawn(&GATE, Gate::default()).expect("spawn");
        let token = Arc::new(());
        ctx.submit_external(gate, Msg::Tracked(token.clone()));
        ctx.submit_external(gate, Msg::Poke(1));
        ctx.arm_timer(gate, Msg::Tick, Duration::from_secs(10), Duration::ZERO);
        ctx.run_once();
        assert_eq!(ctx.saved_len(gate), 2);

        ctx.submit_internal(gate, Msg::Done);
        assert_eq!(ctx.run_once(), None);
        assert!(!ctx.is_active(gate));
        assert_eq!(ctx.instance_count(), 0);
        assert_eq!(ctx.pending_timers(), 0);
        assert_eq!(Arc::strong_count(&token), 1);
        // Poke is on the ignore list.
        assert_eq!(*leaked.lock(), vec![MsgId::Tracked, MsgId::Tick]);
    }

    #[test]
    fn sub_instance_sees_events_first_and_bubbles_the_rest() {
        let (mut ctx, _) = context(Config::default());
        let parent = ctx.register(&PARENT, Parent::default()).expect("register");
        ctx.submit_external(parent, Msg::Go);
        ctx.submit_external(parent, Msg::Tick);
        ctx.run_once();

        let child = ctx.sub_instance(parent).expect("child spawned");
        assert_eq!(ctx.data::<Child>(child).map(|c| c.ticks), Some(1));

        ctx.submit_external(parent, Msg::Poke(7));
        ctx.run_once();
        assert_eq!(ctx.saved_len(child), 0);
        assert_eq!(ctx.saved_len(parent), 1);

        ctx.submit_external(parent, Msg::Done);
        ctx.run_once();
        assert_eq!(ctx.sub_instance(parent), None);
        assert!(!ctx.is_active(child));
        assert_eq!(ctx.data::<Parent>(parent).map(|p| p.log.clone()), Some(vec![
            "finished".to_string(),
            "7".to_string()
        ]));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "still owns sub-instance")]
    fn top_level_instance_cannot_abandon_sub_instance() {
        let (mut ctx, _) = context(lenient());
        let quitter = ctx.spawn(&QUITTER, Parent::default()).expect("spawn");
        ctx.submit_internal(quitter, Msg::Go);
        ctx.run_once();
    }

    #[test]
    fn second_sub_instance_is_refused() {
        let (mut ctx, _) = context(Config::default());
        let parent = ctx.register(&PARENT, Parent::default()).expect("register");
        ctx.submit_internal(parent, Msg::Go);
        ctx.run_once();
        let child = ctx.sub_instance(parent).expect("child spawned");
        let err = ctx.core.create(&CHILD, Child::default(), Some(parent), false);
        assert_eq!(err, Err(Error::SubInstanceBusy(parent)));
        assert!(ctx.is_active(child));
    }

    #[test]
    #[should_panic(expected = "invalid event")]
    fn strict_mode_panics_on_unknown_destination() {
        let (mut ctx, _) = context(Config { strict: true, ..Config::default() });
        ctx.submit_internal(InstanceId::new(3, 1), Msg::Go);
        ctx.run_once();
    }

    #[test]
    fn lenient_mode_drops_unhandled_events() {
        let (mut ctx, _) = context(lenient());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        let token = Arc::new(());
        ctx.submit_internal(gate, Msg::Go);
        // No transition for Go in Open and Open does not save.
        ctx.submit_internal(gate, Msg::Go);
        ctx.submit_internal(InstanceId::new(9, 4), Msg::Tracked(token.clone()));
        ctx.run_once();
        assert_eq!(ctx.state_name(gate), Some("Open"));
        assert_eq!(ctx.saved_len(gate), 0);
        assert_eq!(Arc::strong_count(&token), 1);
    }

    #[test]
    fn timer_fires_at_deadline() {
        let (mut ctx, clock) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        ctx.arm_timer(gate, Msg::Tick, Duration::from_secs(5), Duration::ZERO);
        assert_eq!(ctx.run_once(), Some(Time::from_origin(Duration::from_secs(5))));
        assert!(gate_log(&ctx, gate).is_empty());

        clock.advance(Duration::from_secs(5));
        assert_eq!(ctx.run_once(), None);
        assert_eq!(gate_log(&ctx, gate), vec!["tick"]);
    }

    #[test]
    fn internal_work_from_a_timer_runs_before_the_next_timer() {
        let (mut ctx, clock) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        ctx.submit_internal(gate, Msg::Go);
        ctx.run_once();
        ctx.arm_timer(gate, Msg::Chain(1), Duration::from_secs(1), Duration::ZERO);
        ctx.arm_timer(gate, Msg::Chain(2), Duration::from_secs(2), Duration::ZERO);
        clock.advance(Duration::from_secs(3));
        ctx.run_once();
        assert_eq!(gate_log(&ctx, gate), vec!["chain 1", "1", "chain 2", "2"]);
    }

    #[test]
    fn cancel_reaches_a_fired_and_saved_timer() {
        let (mut ctx, clock) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        let timer = ctx.arm_timer(gate, Msg::Poke(9), Duration::from_secs(1), Duration::ZERO);
        clock.advance(Duration::from_secs(1));
        ctx.run_once();
        assert_eq!(ctx.saved_len(gate), 1);

        assert!(ctx.cancel_timer(timer));
        assert!(!ctx.cancel_timer(timer));
        assert_eq!(ctx.saved_len(gate), 0);
        ctx.submit_internal(gate, Msg::Go);
        ctx.run_once();
        assert!(gate_log(&ctx, gate).is_empty());
    }

    #[test]
    fn cancel_pending_timer() {
        let (mut ctx, clock) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        let timer = ctx.arm_timer(gate, Msg::Tick, Duration::from_secs(1), Duration::ZERO);
        assert!(ctx.cancel_timer(timer));
        clock.advance(Duration::from_secs(2));
        assert_eq!(ctx.run_once(), None);
        assert!(gate_log(&ctx, gate).is_empty());
    }

    #[test_case(0, 10; "fresh")]
    #[test_case(4, 6; "partway")]
    #[test_case(15, 0; "overdue")]
    fn next_timeout_counts_down(elapsed: u64, remaining: u64) {
        let (mut ctx, clock) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        assert_eq!(ctx.next_timeout(), None);
        ctx.arm_timer(gate, Msg::Tick, Duration::from_secs(10), Duration::ZERO);
        clock.advance(Duration::from_secs(elapsed));
        assert_eq!(ctx.next_timeout(), Some(Duration::from_secs(remaining)));
    }

    #[test]
    fn external_submission_from_another_thread_wakes() {
        let (mut ctx, _) = context(Config::default());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        ctx.set_wake(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let sender = ctx.external_sender();
        thread::spawn(move || {
            sender.submit(gate, Msg::Go);
            sender.submit(gate, Msg::Poke(1));
        })
        .join()
        .expect("submitter");

        assert_eq!(wakes.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.pending_external(), 2);
        ctx.run_once();
        assert_eq!(ctx.pending_external(), 0);
        assert_eq!(gate_log(&ctx, gate), vec!["1"]);
    }

    #[test]
    fn table_capacity_is_enforced() {
        let (mut ctx, _) = context(Config { max_instances: 1, ..Config::default() });
        ctx.register(&GATE, Gate::default()).expect("register");
        assert_eq!(
            ctx.register(&GATE, Gate::default()).map(|_| ()),
            Err(Error::TableFull { capacity: 1 })
        );
    }

    #[test]
    fn stale_instance_id_does_not_reach_slot_reuser() {
        let (mut ctx, _) = context(lenient());
        let first = ctx.spawn(&GATE, Gate::default()).expect("spawn");
        ctx.submit_internal(first, Msg::Done);
        ctx.run_once();
        let second = ctx.spawn(&GATE, Gate::default()).expect("spawn");
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert_eq!(ctx.state_of(first), None);

        ctx.submit_internal(first, Msg::Tick);
        ctx.run_once();
        assert!(gate_log(&ctx, second).is_empty());
    }

    #[test]
    fn registered_instance_survives_terminate() {
        let (mut ctx, _) = context(lenient());
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        ctx.submit_internal(gate, Msg::Done);
        ctx.run_once();
        assert!(ctx.is_active(gate));
        assert_eq!(ctx.state_of(gate), Some(CLOSED));
    }

    #[test]
    #[should_panic(expected = "cannot terminate")]
    fn strict_mode_panics_when_registered_instance_terminates() {
        let (mut ctx, _) = context(Config { strict: true, ..Config::default() });
        let gate = ctx.register(&GATE, Gate::default()).expect("register");
        ctx.submit_internal(gate, Msg::Done);
        ctx.run_once();
    }

    struct Transitions(Arc<Mutex<Vec<String>>>);

    impl Trace for Transitions {
        fn transition(
            &mut self,
            _: InstanceId,
            machine: &'static str,
            from: &'static str,
            to: &'static str,
        ) {
            self.0.lock().push(format!("{}: {} -> {}", machine, from, to));
        }
    }

    #[test]
    fn trace_observes_transitions() {
        let (mut ctx, _) = context(Config::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        ctx.set_trace(Box::new(Transitions(seen.clone())));
        let gate = ctx.spawn(&GATE, Gate::default()).expect("spawn");
        ctx.submit_internal(gate, Msg::Go);
        ctx.submit_internal(gate, Msg::Done);
        ctx.run_once();
        assert_eq!(
            *seen.lock(),
            vec!["Gate: Closed -> Open".to_string(), "Gate: Open -> Terminated".to_string()]
        );
    }
}
