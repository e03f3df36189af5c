use std::collections::BinaryHeap;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::component::Id;
use crate::event::{Event, EventData, EventId};
use crate::log::log_incorrect_event;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

pub(crate) struct SimulationState {
    clock: f64,
    rand: Pcg64,
    events: BinaryHeap<Event>,
    canceled_events: FxHashSet<EventId>,
    event_count: u64,
    component_name_to_id: FxHashMap<String, Id>,
    component_names: Vec<String>,
}

impl SimulationState {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: 0.0,
            rand: Pcg64::seed_from_u64(seed),
            events: BinaryHeap::new(),
            canceled_events: FxHashSet::default(),
            event_count: 0,
            component_name_to_id: FxHashMap::default(),
            component_names: Vec::new(),
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn set_time(&mut self, time: f64) {
        self.clock = time;
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        dist.sample(&mut self.rand)
    }

    pub fn register(&mut self, name: &str) -> Id {
        if let Some(id) = self.component_name_to_id.get(name) {
            return *id;
        }
        let id = self.component_names.len() as Id;
        self.component_name_to_id.insert(name.to_owned(), id);
        self.component_names.push(name.to_owned());
        id
    }

    pub fn lookup_id(&self, name: &str) -> Option<Id> {
        self.component_name_to_id.get(name).copied()
    }

    pub fn lookup_name(&self, id: Id) -> Option<&str> {
        self.component_names.get(id as usize).map(|s| s.as_str())
    }

    pub fn add_event<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        let event_id = self.event_count;
        let mut event = Event {
            id: event_id,
            time: self.clock + delay,
            src,
            dst,
            data: Box::new(data),
        };
        if delay < -EPSILON {
            log_incorrect_event(event.clone(), &format!("negative delay {}, clamped to zero", delay));
        }
        if delay < 0.0 {
            event.time = self.clock;
        }
        self.events.push(event);
        self.event_count += 1;
        event_id
    }

    pub fn next_event(&mut self) -> Option<Event> {
        loop {
            let event = self.events.pop()?;
            if self.canceled_events.remove(&event.id) {
                continue;
            }
            self.clock = event.time;
            return Some(event);
        }
    }

    pub fn peek_event(&mut self) -> Option<&Event> {
        while let Some(event) = self.events.peek() {
            if self.canceled_events.contains(&event.id) {
                let id = event.id;
                self.events.pop();
                self.canceled_events.remove(&id);
            } else {
                break;
            }
        }
        self.events.peek()
    }

    pub fn cancel_event(&mut self, id: EventId) {
        self.canceled_events.insert(id);
    }

    pub fn cancel_events<F>(&mut self, pred: F)
    where
        F: Fn(&Event) -> bool,
    {
        for event in self.events.iter() {
            if pred(event) {
                self.canceled_events.insert(event.id);
            }
        }
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }
}
