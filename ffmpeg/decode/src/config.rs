/*!
    Decoder configuration types.
*/

/**
    Configuration shared by the video and audio decoders.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /**
        Number of codec worker threads.

        Zero lets FFmpeg pick based on the number of cores.
    */
    pub thread_count: u16,
}

impl DecoderConfig {
    /**
        Create a new config with default settings (automatic threading).
    */
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Create a config with a fixed number of codec threads.
    */
    pub fn with_threads(thread_count: u16) -> Self {
        Self { thread_count }
    }

    /**
        Apply this config to a codec context before it is opened.
    */
    pub(crate) fn apply(&self, ctx: &mut ffmpeg_next::codec::context::Context) {
        // Not exposed by ffmpeg-next before open
        unsafe {
            (*ctx.as_mut_ptr()).thread_count = i32::from(self.thread_count);
        }
    }
}
