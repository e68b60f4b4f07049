/*!
    Bounded FIFO used to hand packets and frames between pipeline stages.
*/

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

struct QueueState<T> {
    items: VecDeque<T>,
    stopped: bool,
}

/**
    A fixed-capacity FIFO queue shared between one producer stage and its
    consumers.

    Pushing never blocks: a full queue hands the item back and the producer
    decides whether to retry or drop it. Popping waits for a bounded time.
    Stopping wakes every waiter; items still queued can be drained afterwards.
*/
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /**
        Create an empty queue holding at most `capacity` items.

        A capacity of zero is raised to one.
    */
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                stopped: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /**
        Append an item if there is room.

        When the queue is full the item is returned unchanged in `Err`.
    */
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        if state.items.len() >= self.capacity {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /**
        Remove the oldest item, waiting up to `timeout` for one to arrive.

        Returns `None` on timeout, or promptly once the queue is stopped and
        empty.
    */
    pub fn pop(&self, timeout: Duration) -> Option<T> {
        let mut state = self.state.lock();
        if state.items.is_empty() && !state.stopped && !timeout.is_zero() {
            self.available
                .wait_while_for(&mut state, |s| s.items.is_empty() && !s.stopped, timeout);
        }
        state.items.pop_front()
    }

    /**
        Remove the oldest item without waiting.
    */
    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /**
        Drop every queued item, returning how many were removed.
    */
    pub fn clear(&self) -> usize {
        let drained: Vec<T> = self.state.lock().items.drain(..).collect();
        // Items are dropped here, outside the lock
        drained.len()
    }

    /**
        Wake all waiters. Later pops return immediately when empty.
    */
    pub fn stop(&self) {
        self.state.lock().stopped = true;
        self.available.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    pub fn is_full(&self) -> bool {
        self.state.lock().items.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/**
    Type-erased access to [`BoundedQueue::clear`], so one stage can flush
    queues of different item types.
*/
pub(crate) trait Flush: Send + Sync {
    fn flush(&self) -> usize;
}

impl<T: Send> Flush for BoundedQueue<T> {
    fn flush(&self) -> usize {
        self.clear()
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedQueue")
            .field("len", &state.items.len())
            .field("capacity", &self.capacity)
            .field("stopped", &state.stopped)
            .finish()
    }
}

static_assertions::assert_impl_all!(BoundedQueue<Vec<u8>>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn push_until_full_then_reject() {
        let queue = BoundedQueue::new(3);
        for i in 0..3 {
            assert!(queue.push(i).is_ok());
            assert_eq!(queue.len(), i + 1);
        }
        assert!(queue.is_full());
        assert_eq!(queue.push(99), Err(99));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn fifo_order() {
        let queue = BoundedQueue::new(4);
        for i in 0..4 {
            queue.push(i).unwrap();
        }
        let popped: Vec<_> = std::iter::from_fn(|| queue.try_pop()).collect();
        assert_eq!(popped, vec![0, 1, 2, 3]);
    }

    #[test]
    fn pop_times_out_on_empty_queue() {
        let queue: BoundedQueue<u8> = BoundedQueue::new(1);
        let start = Instant::now();
        assert_eq!(queue.pop(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn pop_wakes_on_push() {
        let queue = Arc::new(BoundedQueue::new(1));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(7).unwrap();
            })
        };
        assert_eq!(queue.pop(Duration::from_secs(5)), Some(7));
        producer.join().unwrap();
    }

    #[test]
    fn stop_wakes_waiters_promptly() {
        let queue: Arc<BoundedQueue<u8>> = Arc::new(BoundedQueue::new(1));
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let start = Instant::now();
                let item = queue.pop(Duration::from_secs(10));
                (item, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        queue.stop();
        let (item, waited) = waiter.join().unwrap();
        assert_eq!(item, None);
        assert!(waited < Duration::from_secs(5));
        assert!(queue.is_stopped());
    }

    #[test]
    fn items_survive_stop() {
        let queue = BoundedQueue::new(2);
        queue.push(1).unwrap();
        queue.stop();
        assert_eq!(queue.pop(Duration::from_secs(1)), Some(1));
        assert_eq!(queue.pop(Duration::from_secs(1)), None);
    }

    #[test]
    fn clear_drops_each_item_once() {
        struct Counted(Arc<AtomicUsize>);
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let queue = BoundedQueue::new(5);
        for _ in 0..4 {
            assert!(queue.push(Counted(Arc::clone(&drops))).is_ok());
        }
        assert_eq!(queue.clear(), 4);
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn zero_capacity_is_raised() {
        let queue = BoundedQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.push(()).is_ok());
        assert!(queue.push(()).is_err());
    }
}
