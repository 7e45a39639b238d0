use std::fmt;

/// Fixed capacity ring buffer, the oldest item is overwritten once full.
pub struct CircularQueue<T> {
    buf: Vec<T>,
    // next slot to write, equals the oldest item when full
    cursor: usize,
    capacity: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            buf: self.buf.clone(),
            cursor: self.cursor,
            capacity: self.capacity,
        }
    }
}

impl<T: PartialEq> PartialEq for CircularQueue<T> {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.iter().eq(other.iter())
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.asc_iter()).finish()
    }
}

impl<T> CircularQueue<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        let capacity = cap.max(1);

        Self {
            buf: Vec::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Appends `item`, returning the evicted oldest item if the queue was full
    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let poped = if self.is_full() {
            Some(std::mem::replace(&mut self.buf[self.cursor], item))
        } else {
            self.buf.push(item);
            None
        };

        self.cursor = (self.cursor + 1) % self.capacity;

        poped
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
        self.cursor = 0;
    }

    /// `idx`-th item counting back from the newest one
    #[inline]
    pub fn nth_newest(&self, idx: usize) -> Option<&T> {
        let n = self.buf.len();
        if idx >= n {
            return None;
        }

        self.buf.get((self.cursor + n - 1 - idx) % n)
    }

    #[inline]
    pub fn top(&self) -> Option<&T> {
        self.nth_newest(0)
    }

    /// Newest first
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        (0..self.buf.len()).filter_map(move |i| self.nth_newest(i))
    }

    /// Oldest first
    #[inline]
    pub fn asc_iter(&self) -> impl Iterator<Item = &'_ T> {
        let n = self.buf.len();

        (0..n).map(move |i| &self.buf[(self.cursor + i) % n])
    }
}
