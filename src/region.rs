//! Blocking regions: groups of stations whose entrance is controlled by a dedicated input station.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::component::Id;
use crate::job::ClassId;

/// A set of stations admitted through a single input station.
///
/// Jobs sent to a member from outside the region are redirected to the input station first. The region also
/// tracks how many jobs of every class are inside it.
#[derive(Debug)]
pub struct BlockingRegion {
    name: String,
    input_station: Id,
    members: FxHashSet<Id>,
    occupancy: Vec<usize>,
}

/// Region shared by its member stations.
pub type SharedRegion = Rc<RefCell<BlockingRegion>>;

impl BlockingRegion {
    /// Creates a region for the given number of classes.
    pub fn new(name: &str, input_station: Id, members: impl IntoIterator<Item = Id>, classes: usize) -> Self {
        Self {
            name: name.to_owned(),
            input_station,
            members: members.into_iter().collect(),
            occupancy: vec![0; classes],
        }
    }

    /// Wraps the region for sharing between stations.
    pub fn shared(self) -> SharedRegion {
        Rc::new(RefCell::new(self))
    }

    /// Region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Station controlling access to the region.
    pub fn input_station(&self) -> Id {
        self.input_station
    }

    /// Returns `true` if the station is a member.
    pub fn contains(&self, station: Id) -> bool {
        self.members.contains(&station)
    }

    /// Returns `true` if a job coming from `source` must pass the input station first.
    pub fn should_redirect(&self, source: Id) -> bool {
        !self.contains(source) && source != self.input_station
    }

    /// Jobs of the class inside the region.
    pub fn occupancy_of(&self, class: ClassId) -> usize {
        self.occupancy.get(class).copied().unwrap_or(0)
    }

    /// Jobs inside the region.
    pub fn occupancy(&self) -> usize {
        self.occupancy.iter().sum()
    }

    /// Counts a job of the class entering the region.
    pub fn increase_occupancy(&mut self, class: ClassId) {
        if let Some(n) = self.occupancy.get_mut(class) {
            *n += 1;
        }
    }

    /// Counts a job of the class leaving the region.
    pub fn decrease_occupancy(&mut self, class: ClassId) {
        if let Some(n) = self.occupancy.get_mut(class) {
            *n = n.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirects_only_outside_sources() {
        let region = BlockingRegion::new("r", 10, [1, 2], 1);
        assert!(!region.should_redirect(1));
        assert!(!region.should_redirect(10));
        assert!(region.should_redirect(5));
    }

    #[test]
    fn occupancy_never_underflows() {
        let mut region = BlockingRegion::new("r", 10, [1], 2);
        region.increase_occupancy(1);
        region.decrease_occupancy(1);
        region.decrease_occupancy(1);
        assert_eq!(region.occupancy(), 0);
    }
}
