// Bounded Task Queue
//
// Fixed-capacity circular buffer shared by one accept loop and N workers.
// One lock guards head/tail/count/slots; producers wait on `not_full`,
// consumers wait on `not_empty`. The lock is only held for O(1) slot updates.

use super::error::{DomainError, QueueClosed, Result, TryEnqueueError};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

struct QueueState<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    count: usize,
    closed: bool,
}

impl<T> QueueState<T> {
    fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    fn push(&mut self, item: T) {
        debug_assert!(self.count < self.slots.len(), "push into a full queue");
        let tail = self.tail;
        debug_assert!(self.slots[tail].is_none(), "tail slot {tail} already occupied");
        self.slots[tail] = Some(item);
        self.tail = (tail + 1) % self.slots.len();
        self.count += 1;
    }

    fn pop(&mut self) -> T {
        let head = self.head;
        let Some(item) = self.slots[head].take() else {
            unreachable!("queue underflow: slot {head} empty with count {}", self.count);
        };
        self.head = (head + 1) % self.slots.len();
        self.count -= 1;
        item
    }
}

/// Bounded FIFO queue with blocking backpressure
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> TaskQueue<T> {
    /// Create an empty queue holding at most `capacity` items.
    ///
    /// # Errors
    /// - DomainError::InvalidCapacity if `capacity` is 0 (enqueue could never succeed)
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DomainError::InvalidCapacity(capacity));
        }

        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>().into_boxed_slice();

        Ok(Self {
            state: Mutex::new(QueueState {
                slots,
                head: 0,
                tail: 0,
                count: 0,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        })
    }

    /// Append `item` at the tail, blocking while the queue is full.
    ///
    /// # Errors
    /// - QueueClosed if the queue is closed before a slot frees up; the item is handed back
    pub fn enqueue(&self, item: T) -> std::result::Result<(), QueueClosed<T>> {
        let mut state = self.state.lock();
        while state.is_full() && !state.closed {
            self.not_full.wait(&mut state);
        }

        if state.closed {
            return Err(QueueClosed(item));
        }

        state.push(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Append `item` only if a slot is free right now.
    pub fn try_enqueue(&self, item: T) -> std::result::Result<(), TryEnqueueError<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TryEnqueueError::Closed(item));
        }
        if state.is_full() {
            return Err(TryEnqueueError::Full(item));
        }

        state.push(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the head item, blocking while the queue is empty.
    ///
    /// Returns `None` only when the queue is closed and every buffered item
    /// has been handed out.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        while state.count == 0 && !state.closed {
            self.not_empty.wait(&mut state);
        }

        self.take_head(state)
    }

    /// Remove the head item if one is buffered right now.
    pub fn try_dequeue(&self) -> Option<T> {
        let state = self.state.lock();
        self.take_head(state)
    }

    /// Like `dequeue`, but gives up after `timeout`.
    ///
    /// A timeout too large to express as a deadline waits like `dequeue`.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.dequeue();
        };
        let mut state = self.state.lock();
        while state.count == 0 && !state.closed {
            if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }

        self.take_head(state)
    }

    fn take_head(&self, mut state: parking_lot::MutexGuard<'_, QueueState<T>>) -> Option<T> {
        if state.count == 0 {
            return None;
        }

        let item = state.pop();
        drop(state);
        self.not_full.notify_one();
        Some(item)
    }

    /// Stop accepting items and wake every waiter.
    ///
    /// Blocked producers get their item back; consumers keep draining the
    /// buffer and then receive `None`. Calling this more than once is a no-op.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);

        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.state.lock().is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> TaskQueue<T> {
    /// Buffered items in dequeue order
    pub fn pending(&self) -> Vec<T> {
        let state = self.state.lock();
        (0..state.count)
            .map(|offset| {
                let index = (state.head + offset) % self.capacity;
                match &state.slots[index] {
                    Some(item) => item.clone(),
                    None => unreachable!(
                        "queue corrupted: slot {index} empty with count {}",
                        state.count
                    ),
                }
            })
            .collect()
    }
}

impl<T> std::fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaskQueue")
            .field("capacity", &self.capacity)
            .field("count", &state.count)
            .field("head", &state.head)
            .field("tail", &state.tail)
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_capacity_rejected() {
        let result = TaskQueue::<u32>::new(0);
        assert_eq!(result.unwrap_err(), DomainError::InvalidCapacity(0));
    }

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new(4).unwrap();
        for i in 0..4 {
            queue.enqueue(i).unwrap();
        }

        let drained: Vec<_> = (0..4).map(|_| queue.dequeue().unwrap()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wraparound_keeps_order() {
        let queue = TaskQueue::new(3).unwrap();
        let mut expected = 0;

        // Push head/tail around the ring several times
        for round in 0..5 {
            queue.enqueue(round * 2).unwrap();
            queue.enqueue(round * 2 + 1).unwrap();
            assert_eq!(queue.dequeue(), Some(expected));
            assert_eq!(queue.dequeue(), Some(expected + 1));
            expected += 2;
        }
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_try_enqueue_full() {
        let queue = TaskQueue::new(1).unwrap();
        queue.try_enqueue("a").unwrap();

        let err = queue.try_enqueue("b").unwrap_err();
        assert!(err.is_full());
        assert_eq!(err.into_inner(), "b");
        assert!(queue.is_full());
    }

    #[test]
    fn test_try_dequeue_empty() {
        let queue = TaskQueue::<u8>::new(2).unwrap();
        assert_eq!(queue.try_dequeue(), None);
    }

    #[test]
    fn test_dequeue_timeout_expires_on_empty_queue() {
        let queue = TaskQueue::<u8>::new(2).unwrap();
        let start = Instant::now();

        assert_eq!(queue.dequeue_timeout(Duration::from_millis(50)), None);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_dequeue_timeout_unbounded_returns_buffered_item() {
        let queue = TaskQueue::<u8>::new(2).unwrap();
        queue.enqueue(7).unwrap();

        assert_eq!(queue.dequeue_timeout(Duration::MAX), Some(7));
    }

    #[test]
    fn test_dequeue_timeout_unbounded_returns_none_once_closed() {
        let queue = TaskQueue::<u8>::new(1).unwrap();
        queue.close();

        assert_eq!(queue.dequeue_timeout(Duration::MAX), None);
    }

    #[test]
    #[should_panic(expected = "queue corrupted")]
    fn test_pending_panics_on_hole_in_live_range() {
        let queue = TaskQueue::new(3).unwrap();
        queue.enqueue(1).unwrap();
        queue.enqueue(2).unwrap();
        queue.state.lock().slots[1] = None;

        queue.pending();
    }

    #[test]
    #[should_panic(expected = "queue underflow")]
    fn test_dequeue_panics_on_hole_at_head() {
        let queue = TaskQueue::new(2).unwrap();
        queue.enqueue(1).unwrap();
        queue.state.lock().slots[0] = None;

        queue.try_dequeue();
    }

    #[test]
    fn test_pending_snapshot_in_fifo_order() {
        let queue = TaskQueue::new(3).unwrap();
        queue.enqueue('x').unwrap();
        queue.enqueue('y').unwrap();
        queue.dequeue();
        queue.enqueue('z').unwrap();
        queue.enqueue('w').unwrap();

        assert_eq!(queue.pending(), vec!['y', 'z', 'w']);
    }

    #[test]
    fn test_closed_queue_rejects_and_returns_item() {
        let queue = TaskQueue::new(2).unwrap();
        queue.close();

        let rejected = queue.enqueue(String::from("late")).unwrap_err();
        assert_eq!(rejected.into_inner(), "late");
        assert!(queue.is_closed());
    }

    #[test]
    fn test_close_drains_before_none() {
        let queue = TaskQueue::new(3).unwrap();
        queue.enqueue(1).unwrap();
        queue.enqueue(2).unwrap();
        queue.close();
        queue.close();

        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_enqueue_blocks_until_dequeue() {
        let queue = Arc::new(TaskQueue::new(1).unwrap());
        queue.enqueue(1).unwrap();

        let (tx, rx) = mpsc::channel();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                queue.enqueue(2).unwrap();
                tx.send(()).unwrap();
            })
        };

        assert!(
            rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "enqueue into a full queue must block"
        );

        assert_eq!(queue.dequeue(), Some(1));
        rx.recv_timeout(Duration::from_secs(5))
            .expect("enqueue should unblock after a dequeue");
        producer.join().unwrap();
        assert_eq!(queue.pending(), vec![2]);
    }

    #[test]
    fn test_close_wakes_blocked_producer() {
        let queue = Arc::new(TaskQueue::new(1).unwrap());
        queue.enqueue(1).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.enqueue(2))
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();

        let result = producer.join().unwrap();
        assert_eq!(result.unwrap_err().into_inner(), 2);
        assert_eq!(queue.pending(), vec![1]);
    }

    #[test]
    fn test_close_wakes_blocked_consumer() {
        let queue = Arc::new(TaskQueue::<u32>::new(1).unwrap());

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.dequeue())
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();

        assert_eq!(consumer.join().unwrap(), None);
    }
}
