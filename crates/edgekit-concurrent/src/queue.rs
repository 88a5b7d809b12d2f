use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue is empty")]
    Empty,
}

/// Unbounded FIFO queue safe for use from many threads.
///
/// Every operation runs inside one critical section over the whole sequence,
/// so operations are serializable with respect to each other. There is no
/// reader/writer split: `len`, `peek` and `values` take the same exclusive
/// lock as the mutating calls.
///
/// Share it across threads with `Arc<SafeQueue<T>>`.
pub struct SafeQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> SafeQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Append `item` to the tail. Never blocks beyond lock acquisition.
    #[inline]
    pub fn enqueue(&self, item: T) {
        self.items.lock().push_back(item);
    }

    /// Remove and return the head item.
    #[inline]
    pub fn dequeue(&self) -> Result<T, QueueError> {
        self.items.lock().pop_front().ok_or(QueueError::Empty)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Take every item out in FIFO order within a single critical section.
    pub fn drain(&self) -> Vec<T> {
        let mut items = self.items.lock();
        items.drain(..).collect()
    }
}

impl<T: Clone> SafeQueue<T> {
    /// Return a copy of the head item without removing it.
    pub fn peek(&self) -> Result<T, QueueError> {
        self.items.lock().front().cloned().ok_or(QueueError::Empty)
    }

    /// Snapshot of the current contents, head first.
    ///
    /// The returned vector is independent of the queue.
    pub fn values(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }
}

impl<T> Default for SafeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for SafeQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.get_mut().extend(iter);
    }
}

impl<T> FromIterator<T> for SafeQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

impl<T> fmt::Debug for SafeQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeQueue")
            .field("len", &self.len())
            .finish()
    }
}
