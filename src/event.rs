//! Simulation events.

use std::cmp::Ordering;
use std::fmt;

use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::{clone_trait_object, DynClone};
use serde::ser::Serialize;

use crate::component::Id;

/// Identifier of a simulation event.
pub type EventId = u64;

/// Trait that should be implemented by event payload.
///
/// It is implemented automatically for every type that is `Clone + Serialize + 'static`.
pub trait EventData: Downcast + DynClone + erased_serde::Serialize {}

impl_downcast!(EventData);

clone_trait_object!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + Clone + 'static> EventData for T {}

/// Representation of an event.
#[derive(Clone)]
pub struct Event {
    /// Unique event identifier.
    ///
    /// Identifiers are assigned in emission order, so among events with equal timestamps the one emitted first
    /// is processed first.
    pub id: EventId,
    /// Time of event occurrence.
    pub time: f64,
    /// Identifier of event source.
    pub src: Id,
    /// Identifier of event destination.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Reversed so that BinaryHeap pops the earliest event first.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = serde_json::to_string(&self.data).unwrap_or_else(|_| "?".to_string());
        let type_name = serde_type_name::type_name(&self.data).unwrap_or("?");
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("time", &self.time)
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("type", &type_name)
            .field("data", &data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use serde::Serialize;

    use super::*;

    #[derive(Clone, Serialize)]
    struct Ping {
        seq: u32,
    }

    fn event(id: EventId, time: f64) -> Event {
        Event {
            id,
            time,
            src: 0,
            dst: 1,
            data: Box::new(Ping { seq: id as u32 }),
        }
    }

    #[test]
    fn heap_orders_by_time_then_id() {
        let mut heap = BinaryHeap::new();
        heap.push(event(2, 1.0));
        heap.push(event(0, 3.0));
        heap.push(event(1, 1.0));
        heap.push(event(3, 0.5));
        let order: Vec<EventId> = std::iter::from_fn(|| heap.pop().map(|e| e.id)).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
    }

    #[test]
    fn payload_downcasts_and_prints() {
        let e = event(7, 2.0);
        assert!(e.data.is::<Ping>());
        let text = format!("{:?}", e);
        assert!(text.contains("\"seq\":7"));
        let ping = e.data.downcast::<Ping>().ok().unwrap();
        assert_eq!(ping.seq, 7);
    }
}
