use std::collections::VecDeque;

use crate::work::WorkItem;

/// Pending work items owned by the coordinator.
///
/// FIFO order: results re-enter at the back, operands leave from the front,
/// so freshly produced items wait behind older ones. Order only affects
/// fairness; any pairing yields the same final product.
#[derive(Debug, Default, Clone)]
pub struct WorkQueue {
    items: VecDeque<WorkItem>,
    high_water: usize,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: WorkItem) {
        self.items.push_back(item);
        self.high_water = self.high_water.max(self.items.len());
    }

    /// Remove exactly two items, or none when fewer than two are queued.
    pub fn pop_pair(&mut self) -> Option<(WorkItem, WorkItem)> {
        if self.items.len() < 2 {
            return None;
        }
        let a = self.items.pop_front()?;
        let b = self.items.pop_front()?;
        Some((a, b))
    }

    /// Take the sole remaining item. Returns `None` unless exactly one is queued.
    pub fn take_last(&mut self) -> Option<WorkItem> {
        if self.items.len() == 1 {
            self.items.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Largest length the queue has reached.
    pub fn high_water(&self) -> usize {
        self.high_water
    }
}

impl FromIterator<WorkItem> for WorkQueue {
    fn from_iter<I: IntoIterator<Item = WorkItem>>(iter: I) -> Self {
        let mut queue = Self::new();
        for item in iter {
            queue.push(item);
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(c: i64) -> WorkItem {
        WorkItem::new(vec![c])
    }

    #[test]
    fn pop_pair_takes_two_from_front() {
        let mut q: WorkQueue = [item(1), item(2), item(3)].into_iter().collect();
        let (a, b) = q.pop_pair().unwrap();
        assert_eq!(a, item(1));
        assert_eq!(b, item(2));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn pop_pair_leaves_single_item_alone() {
        let mut q: WorkQueue = [item(9)].into_iter().collect();
        assert!(q.pop_pair().is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn take_last_requires_exactly_one() {
        let mut q: WorkQueue = [item(1), item(2)].into_iter().collect();
        assert!(q.take_last().is_none());
        q.pop_pair();
        assert!(q.take_last().is_none());
        q.push(item(5));
        assert_eq!(q.take_last(), Some(item(5)));
        assert!(q.is_empty());
    }

    #[test]
    fn high_water_tracks_peak() {
        let mut q: WorkQueue = (0..4).map(item).collect();
        q.pop_pair();
        q.push(item(10));
        assert_eq!(q.len(), 3);
        assert_eq!(q.high_water(), 4);
    }
}
