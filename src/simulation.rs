//! Simulation configuration and execution.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::handler::{EventCancellationPolicy, EventHandler};
use crate::log::log_undelivered_event;
use crate::state::SimulationState;

/// Represents a simulation, provides methods for its configuration and execution.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed))),
            handlers: Vec::new(),
        }
    }

    /// Creates a new simulation context with specified name.
    ///
    /// Creating a context for an already registered name returns a context bound to the existing component id.
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let id = self.sim_state.borrow_mut().register(name.as_ref());
        SimulationContext::new(id, name.as_ref(), self.sim_state.clone())
    }

    /// Registers the event handler implementation for component with specified name, returns the component id.
    pub fn add_handler<S>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.sim_state.borrow_mut().register(name.as_ref());
        let idx = id as usize;
        if idx >= self.handlers.len() {
            self.handlers.resize(idx + 1, None);
        }
        self.handlers[idx] = Some(handler);
        id
    }

    /// Removes the event handler of component with specified name and cancels its pending events
    /// according to the given policy.
    pub fn remove_handler<S>(&mut self, name: S, cancel_policy: EventCancellationPolicy)
    where
        S: AsRef<str>,
    {
        let Some(id) = self.lookup_id(name.as_ref()) else {
            return;
        };
        if let Some(slot) = self.handlers.get_mut(id as usize) {
            *slot = None;
        }
        let mut state = self.sim_state.borrow_mut();
        match cancel_policy {
            EventCancellationPolicy::Incoming => state.cancel_events(|e| e.dst == id),
            EventCancellationPolicy::Outgoing => state.cancel_events(|e| e.src == id),
            EventCancellationPolicy::All => state.cancel_events(|e| e.src == id || e.dst == id),
            EventCancellationPolicy::None => {}
        }
    }

    /// Returns the identifier of component by its name.
    pub fn lookup_id(&self, name: &str) -> Option<Id> {
        self.sim_state.borrow().lookup_id(name)
    }

    /// Returns the name of component by its identifier.
    pub fn lookup_name(&self, id: Id) -> Option<String> {
        self.sim_state.borrow().lookup_name(id).map(str::to_owned)
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns a random float in the range _[0, 1)_ using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Returns the total number of created events.
    ///
    /// Canceled events are also counted here.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }

    /// Performs a single step through the simulation.
    ///
    /// Takes the next event from the queue, advances the simulation time to event time and tries to process it
    /// by invoking the [`EventHandler::on`] method of the corresponding event handler.
    /// If there is no handler registered for component with id `event.dst`, logs the undelivered event and discards it.
    ///
    /// Returns `true` if some pending event was found (no matter was it properly processed or not) and `false`
    /// otherwise. The latter means that there are no pending events, so no progress can be made.
    pub fn step(&mut self) -> bool {
        let next = self.sim_state.borrow_mut().next_event();
        let Some(event) = next else {
            return false;
        };
        let handler = self.handlers.get(event.dst as usize).and_then(|h| h.clone());
        match handler {
            Some(handler) => handler.borrow_mut().on(event),
            None => log_undelivered_event(event),
        }
        true
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps through the simulation until there are no pending events left.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Steps through the simulation with duration limit.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.time() + duration;
        self.step_until_time(end_time)
    }

    /// Steps through the simulation until the specified time, processing all events with timestamp not
    /// greater than `time`. The simulation clock is then set to `time` if it is in the future.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_until_time(&mut self, time: f64) -> bool {
        let result = loop {
            let next_time = self.sim_state.borrow_mut().peek_event().map(|e| e.time);
            match next_time {
                Some(t) if t <= time => {
                    self.step();
                }
                Some(_) => break true,
                None => break false,
            }
        };
        let mut state = self.sim_state.borrow_mut();
        if state.time() < time {
            state.set_time(time);
        }
        result
    }
}
