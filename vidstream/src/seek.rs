/*!
    Seek hand-off between the orchestrator and the pipeline stages.
*/

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

/**
    A pending reposition of the demux cursor.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SeekRequest {
    pub target: Duration,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Mailbox {
    pending: Option<SeekRequest>,
    closed: bool,
}

/**
    Latest-wins seek mailbox plus the generation counter.

    Every request bumps the generation immediately, so stages and pull
    accessors can tell frames of a superseded position apart before the demux
    stage has even picked the request up. Once the demux stage is done the
    mailbox is closed and further requests are refused, so no generation is
    ever bumped without a demux stage left to apply it.
*/
#[derive(Debug, Default)]
pub(crate) struct SeekControl {
    mailbox: Mutex<Mailbox>,
    requested: AtomicU64,
}

impl SeekControl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /**
        Schedule a seek, replacing any request not yet picked up.

        Returns None once the mailbox has been closed.
    */
    pub(crate) fn request(&self, target: Duration) -> Option<SeekRequest> {
        let mut mailbox = self.mailbox.lock();
        if mailbox.closed {
            return None;
        }
        let generation = self.requested.fetch_add(1, Ordering::AcqRel) + 1;
        let request = SeekRequest { target, generation };
        mailbox.pending = Some(request);
        Some(request)
    }

    pub(crate) fn take(&self) -> Option<SeekRequest> {
        self.mailbox.lock().pending.take()
    }

    /**
        Close the mailbox because the demux stage is about to exit.

        A request that slipped in is handed back instead, and the mailbox
        stays open so the caller can apply it and carry on.
    */
    pub(crate) fn close(&self) -> Option<SeekRequest> {
        let mut mailbox = self.mailbox.lock();
        if let Some(request) = mailbox.pending.take() {
            return Some(request);
        }
        mailbox.closed = true;
        None
    }

    /**
        Close the mailbox for good. A pending request is dropped and the
        generation rolled back to `current`, so whatever is still queued at
        that position stays deliverable.
    */
    pub(crate) fn abandon(&self, current: u64) -> Option<SeekRequest> {
        let mut mailbox = self.mailbox.lock();
        mailbox.closed = true;
        let dropped = mailbox.pending.take();
        if dropped.is_some() {
            self.requested.store(current, Ordering::Release);
        }
        dropped
    }

    /**
        Generation of the most recent request. Anything older is stale.
    */
    pub(crate) fn requested(&self) -> u64 {
        self.requested.load(Ordering::Acquire)
    }

    pub(crate) fn is_stale(&self, generation: u64) -> bool {
        generation < self.requested()
    }
}

static_assertions::assert_impl_all!(SeekControl: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_request_wins() {
        let seek = SeekControl::new();
        assert_eq!(seek.requested(), 0);
        seek.request(Duration::from_secs(1));
        let second = seek.request(Duration::from_secs(5)).unwrap();
        assert_eq!(second.generation, 2);
        assert_eq!(seek.take(), Some(second));
        assert_eq!(seek.take(), None);
    }

    #[test]
    fn closed_mailbox_refuses_requests() {
        let seek = SeekControl::new();
        assert_eq!(seek.close(), None);
        assert_eq!(seek.request(Duration::from_secs(2)), None);
        assert_eq!(seek.requested(), 0);
    }

    #[test]
    fn close_hands_back_a_late_request() {
        let seek = SeekControl::new();
        let late = seek.request(Duration::from_secs(3)).unwrap();
        assert_eq!(seek.close(), Some(late));
        assert_eq!(seek.take(), None);

        // Still open after handing the request back
        let next = seek.request(Duration::ZERO).unwrap();
        assert_eq!(next.generation, late.generation + 1);
        assert_eq!(seek.close(), Some(next));
        assert_eq!(seek.close(), None);
        assert_eq!(seek.request(Duration::ZERO), None);
    }

    #[test]
    fn abandoned_request_restores_the_generation() {
        let seek = SeekControl::new();
        seek.request(Duration::from_secs(1)).unwrap();
        assert!(seek.take().is_some());
        seek.request(Duration::from_secs(4)).unwrap();
        assert!(seek.is_stale(1));

        let dropped = seek.abandon(1).unwrap();
        assert_eq!(dropped.target, Duration::from_secs(4));
        assert!(!seek.is_stale(1));
        assert_eq!(seek.request(Duration::ZERO), None);
    }

    #[test]
    fn older_generations_are_stale() {
        let seek = SeekControl::new();
        assert!(!seek.is_stale(0));
        seek.request(Duration::ZERO);
        assert!(seek.is_stale(0));
        assert!(!seek.is_stale(1));
    }
}
