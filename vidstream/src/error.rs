/*!
    Session-level error type.
*/

use thiserror::Error;

/**
    Errors returned when opening a stream session.

    Failures after a session is running are not returned from any call;
    they are reported through [`StreamEvent::Error`](crate::StreamEvent::Error).
*/
#[derive(Debug, Error)]
pub enum StreamError {
    /// The backend could not open or probe the container.
    #[error(transparent)]
    Source(#[from] ffmpeg_types::Error),
    /// The container holds neither a video nor an audio stream.
    #[error("no video or audio stream found")]
    NoStreams,
    /// Every selected stream failed to open its decoder.
    #[error("no usable decoder: {0}")]
    NoDecoders(String),
    /// A pipeline thread could not be started.
    #[error("failed to spawn {stage} thread: {source}")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/**
    Result type alias for stream sessions.
*/
pub type StreamResult<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_are_transparent() {
        let e: StreamError = ffmpeg_types::Error::open("a.mkv", "Invalid data").into();
        assert_eq!(e.to_string(), "cannot open a.mkv: Invalid data");
    }

    #[test]
    fn spawn_error_names_stage() {
        let e = StreamError::Spawn {
            stage: "demux",
            source: std::io::Error::other("resource limit"),
        };
        assert_eq!(e.to_string(), "failed to spawn demux thread: resource limit");
    }
}
