use parking_lot::Mutex;

/// A single-slot mailbox that always holds only the most recently pushed
/// value, dropping whatever was there before. This is the `raw` queue of
/// spec.md §4.1: "push to `raw` if the queue has capacity (else drop the
/// oldest and push, preferring freshness)" — for a live camera stream the
/// only sensible bound on a frame backlog is "one frame of slack", so a
/// drop-oldest queue of any depth collapses to this shape in practice.
/// Grounded on the teacher's `rt-image-viewer` use of `parking_lot` for a
/// single shared "latest value" cell.
pub struct LatestSlot<T> {
    value: Mutex<Option<T>>,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    /// Overwrite the slot, returning whatever was dropped.
    pub fn push(&self, item: T) -> Option<T> {
        self.value.lock().replace(item)
    }

    /// Take the current value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.value.lock().take()
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_drops_the_previous_value() {
        let slot: LatestSlot<u32> = LatestSlot::new();
        assert_eq!(slot.push(1), None);
        assert_eq!(slot.push(2), Some(1));
        assert_eq!(slot.take(), Some(2));
        assert_eq!(slot.take(), None);
    }
}
