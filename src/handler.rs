//! Event handling.

use crate::event::Event;

/// Trait for consuming events in simulation components.
pub trait EventHandler {
    /// Processes event.
    ///
    /// This is the main entry point for all incoming events.
    /// The event payload can be matched against the expected types with the [`cast!`](crate::cast) macro.
    fn on(&mut self, event: Event);
}

/// Defines which pending events to cancel when a handler is removed via
/// [`Simulation::remove_handler`](crate::Simulation::remove_handler).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventCancellationPolicy {
    /// Cancel events destined to the component.
    Incoming,
    /// Cancel events emitted by the component.
    Outgoing,
    /// Cancel both incoming and outgoing events.
    All,
    /// Keep all pending events.
    None,
}

/// Matches the payload of an event against a list of concrete types.
///
/// Each arm names a payload type and destructures its fields. The first type the payload downcasts to is used.
/// When no arm matches, the event is reported via [`log_unhandled_event`](crate::log::log_unhandled_event).
///
/// ```ignore
/// cast!(match event.data {
///     NetMessage { event, source_section, target_section } => {
///         self.deliver(src, event, source_section, target_section);
///     }
/// })
/// ```
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if $event.data.is::<$type>() {
                if let Ok(__value) = $event.data.downcast::<$type>() {
                    let $type { $($tt)* } = *__value;
                    $($expr)*
                }
            } else
        )*
        {
            $crate::log::log_unhandled_event($event);
        }
    }
}
