//! Deferred release of GPU resources.
//!
//! A resource replaced while recording frame N may still be referenced by
//! commands of frame N. It is parked here stamped with the last frame index
//! that used it and dropped once that frame has been presented.

pub(crate) struct RetireQueue<T> {
    items: Vec<(u64, T)>,
}

impl<T> Default for RetireQueue<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> RetireQueue<T> {
    pub(crate) fn retire(&mut self, last_used_frame: u64, item: T) {
        self.items.push((last_used_frame, item));
    }

    /// Drops everything last used at or before `presented_frame`; returns how many.
    pub(crate) fn release_through(&mut self, presented_frame: u64) -> usize {
        let before = self.items.len();
        self.items.retain(|(stamp, _)| *stamp > presented_frame);
        before - self.items.len()
    }

    /// Drops everything regardless of stamp.
    pub(crate) fn release_all(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        n
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_items_until_their_frame_is_presented() {
        let mut q = RetireQueue::default();
        q.retire(3, "a");
        q.retire(5, "b");
        assert_eq!(q.release_through(2), 0);
        assert_eq!(q.release_through(3), 1);
        assert_eq!(q.len(), 1);
        assert_eq!(q.release_through(5), 1);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn release_all_ignores_stamps() {
        let mut q = RetireQueue::default();
        q.retire(u64::MAX, 1);
        assert_eq!(q.release_all(), 1);
    }
}
