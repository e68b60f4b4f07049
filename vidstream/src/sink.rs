/*!
    Consumers of decoded frames.
*/

use crate::frame::TimedFrame;

/**
    Anything that can take delivery of decoded frames: a renderer, an audio
    output, a recorder in tests.

    Implemented for every `FnMut(TimedFrame<F>)`, so a closure works as a
    sink without a wrapper type.
*/
pub trait FrameSink<F> {
    fn accept(&mut self, frame: TimedFrame<F>);
}

impl<F, T> FrameSink<F> for T
where
    T: FnMut(TimedFrame<F>),
{
    fn accept(&mut self, frame: TimedFrame<F>) {
        self(frame)
    }
}

/**
    A sink that keeps every frame it is given, in order.
*/
#[derive(Debug)]
pub struct CollectSink<F> {
    pub frames: Vec<TimedFrame<F>>,
}

impl<F> CollectSink<F> {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl<F> Default for CollectSink<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> FrameSink<F> for CollectSink<F> {
    fn accept(&mut self, frame: TimedFrame<F>) {
        self.frames.push(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frame(ms: u64) -> TimedFrame<u32> {
        TimedFrame::new(ms as u32, Duration::from_millis(ms), Duration::ZERO, 0)
    }

    fn feed(sink: &mut impl FrameSink<u32>) {
        sink.accept(frame(0));
        sink.accept(frame(40));
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        feed(&mut |f: TimedFrame<u32>| seen.push(f.pts));
        assert_eq!(seen, vec![Duration::ZERO, Duration::from_millis(40)]);
    }

    #[test]
    fn collect_sink_keeps_order() {
        let mut sink = CollectSink::new();
        feed(&mut sink);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.frames[1].frame, 40);
    }
}
