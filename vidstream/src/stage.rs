/*!
    Worker thread plumbing shared by the demux and decode stages.
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::{OverflowPolicy, StreamConfig};
use crate::error::{StreamError, StreamResult};
use crate::event::EventSender;
use crate::seek::SeekControl;
use crate::status::PipelineStatus;

/**
    Everything a stage thread shares with the orchestrator.
*/
#[derive(Clone)]
pub(crate) struct StageContext {
    pub label: Arc<str>,
    pub trace_items: bool,
    pub backoff: Duration,
    pub pop_timeout: Duration,
    pub overflow: OverflowPolicy,
    pub stop: Arc<AtomicBool>,
    pub seek: Arc<SeekControl>,
    pub status: Arc<PipelineStatus>,
    pub events: EventSender,
}

impl StageContext {
    pub(crate) fn new(
        config: &StreamConfig,
        seek: Arc<SeekControl>,
        status: Arc<PipelineStatus>,
        events: EventSender,
    ) -> Self {
        Self {
            label: Arc::from(config.log.label.as_str()),
            trace_items: config.log.trace_items,
            backoff: config.backoff,
            pop_timeout: config.pop_timeout,
            overflow: config.overflow,
            stop: Arc::new(AtomicBool::new(false)),
            seek,
            status,
            events,
        }
    }

    /**
        A copy of this context with its own stop flag, so each stage can be
        stopped individually.
    */
    pub(crate) fn for_stage(&self) -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            ..self.clone()
        }
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /**
        Sleep for the backoff interval. Returns false if a stop was requested.
    */
    pub(crate) fn idle(&self) -> bool {
        thread::sleep(self.backoff);
        !self.stop_requested()
    }
}

/**
    A running stage thread.
*/
pub(crate) struct StageHandle {
    name: &'static str,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl StageHandle {
    /**
        Start a named stage thread running `body`.
    */
    pub(crate) fn spawn<F>(name: &'static str, ctx: &StageContext, body: F) -> StreamResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(format!("{}-{name}", ctx.label))
            .spawn(body)
            .map_err(|source| StreamError::Spawn {
                stage: name,
                source,
            })?;
        Ok(Self {
            name,
            stop: Arc::clone(&ctx.stop),
            handle,
        })
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /**
        Wait for the thread to finish.

        Overrunning `timeout` is reported, but the join still happens so the
        thread never outlives the resources it borrows from the session.
    */
    pub(crate) fn join(self, label: &str, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if !self.handle.is_finished() {
            log::error!(
                "[{label}] {} thread did not stop within {timeout:?}, still waiting",
                self.name
            );
        }
        if self.handle.join().is_err() {
            log::error!("[{label}] {} thread panicked", self.name);
        }
    }
}

impl std::fmt::Debug for StageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageHandle")
            .field("name", &self.name)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seek::SeekControl;
    use crate::status::PipelineStatus;

    fn context() -> StageContext {
        let (tx, _rx) = crossbeam_channel::unbounded();
        StageContext::new(
            &StreamConfig::default(),
            Arc::new(SeekControl::new()),
            Arc::new(PipelineStatus::new(true, true)),
            EventSender::new(tx),
        )
    }

    #[test]
    fn join_waits_past_the_timeout() {
        let ctx = context();
        let done = Arc::new(AtomicBool::new(false));
        let body_done = Arc::clone(&done);

        let handle = StageHandle::spawn("slow", &ctx, move || {
            thread::sleep(Duration::from_millis(150));
            body_done.store(true, Ordering::Release);
        })
        .unwrap();

        let start = Instant::now();
        handle.join("stage-test", Duration::from_millis(10));

        assert!(done.load(Ordering::Acquire));
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn request_stop_reaches_the_stage() {
        let ctx = context().for_stage();
        let stage_ctx = ctx.clone();
        let handle = StageHandle::spawn("idle", &ctx, move || while stage_ctx.idle() {}).unwrap();

        handle.request_stop();
        handle.join("stage-test", Duration::from_secs(3));
        assert!(ctx.stop_requested());
    }

    #[test]
    fn stages_stop_individually() {
        let base = context();
        let first = base.for_stage();
        let second = base.for_stage();
        first.stop.store(true, Ordering::Release);
        assert!(first.stop_requested());
        assert!(!second.stop_requested());
        assert!(!base.stop_requested());
    }
}
