//! Component identifier.

/// Identifier of a simulation component.
///
/// Identifiers are assigned by [`Simulation`](crate::Simulation) in registration order and are never reused.
pub type Id = u32;
