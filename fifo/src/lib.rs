//! Bounded history buffer; pushing into a full buffer evicts the oldest entry.
//!
//! Index 0 is the oldest element, `len() - 1` the one added last.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct FIFO<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> FIFO<T> {
    pub fn new(capacity: usize) -> Self {
        FIFO {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the evicted element, if any. A zero-capacity buffer keeps nothing.
    pub fn push(&mut self, elem: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(elem);
        }

        let evicted = if self.data.len() == self.capacity {
            self.data.pop_front()
        } else {
            None
        };

        self.data.push_back(elem);

        evicted
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    pub fn last(&self) -> Option<&T> {
        self.data.back()
    }

    /// The k-th most recent element; `recent(0)` equals `last()`.
    pub fn recent(&self, k: usize) -> Option<&T> {
        if k < self.data.len() {
            self.data.get(self.data.len() - 1 - k)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.data.iter()
    }
}

impl<T> std::ops::Index<usize> for FIFO<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        &self.data[idx]
    }
}

#[test]
fn test_fifo() {
    let mut fq = FIFO::<f64>::new(3);

    assert!(fq.is_empty());
    assert_eq!(fq.last(), None);

    fq.push(1.0);
    fq.push(2.0);
    fq.push(3.0);
    assert!(fq.is_full());

    let evicted = fq.push(4.0);

    assert_eq!(evicted, Some(1.0));
    assert_eq!(fq.len(), 3);
    assert_eq!(fq[0], 2.0);
    assert_eq!(fq[2], 4.0);
    assert_eq!(fq.last(), Some(&4.0));
    assert_eq!(fq.recent(1), Some(&3.0));
    assert_eq!(fq.recent(3), None);
}

#[test]
fn test_fifo_zero_capacity_keeps_nothing() {
    let mut fq = FIFO::<i32>::new(0);

    assert_eq!(fq.push(7), Some(7));
    assert!(fq.is_empty());
}

#[test]
fn test_fifo_clear() {
    let mut fq = FIFO::<i32>::new(2);

    fq.push(1);
    fq.push(2);
    fq.clear();

    assert_eq!(fq.len(), 0);
    assert_eq!(fq.capacity(), 2);
    assert_eq!(fq.iter().count(), 0);
}
