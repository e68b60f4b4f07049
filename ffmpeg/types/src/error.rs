/*!
    Error types shared by media sources and decoders.
*/

use thiserror::Error;

/**
    Error type for media sources and decoders.
*/
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The container could not be opened.
    #[error("cannot open {path}: {message}")]
    Open { path: String, message: String },
    /// The container opened but its stream information could not be read.
    #[error("cannot read stream info: {message}")]
    StreamInfo { message: String },
    /// Codec error (a packet failed to decode, a codec failed to open)
    #[error("codec error: {message}")]
    Codec { message: String },
    /// The codec context is gone and cannot accept further input.
    #[error("decoder closed: {message}")]
    DecoderClosed { message: String },
    /// Invalid data (malformed input)
    #[error("invalid data: {message}")]
    InvalidData { message: String },
    /// Unsupported format (valid but not handled)
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },
    /// Repositioning the read cursor failed.
    #[error("seek failed: {message}")]
    Seek { message: String },
    /// End of stream (not really an error, but part of control flow)
    #[error("end of stream")]
    Eof,
}

impl Error {
    /**
        Create an open error for the given path.
    */
    pub fn open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }

    /**
        Create a stream info error with the given message.
    */
    pub fn stream_info(message: impl Into<String>) -> Self {
        Self::StreamInfo {
            message: message.into(),
        }
    }

    /**
        Create a codec error with the given message.
    */
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /**
        Create a decoder-closed error with the given message.
    */
    pub fn decoder_closed(message: impl Into<String>) -> Self {
        Self::DecoderClosed {
            message: message.into(),
        }
    }

    /**
        Create an invalid data error with the given message.
    */
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /**
        Create an unsupported format error with the given message.
    */
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }

    /**
        Create a seek error with the given message.
    */
    pub fn seek(message: impl Into<String>) -> Self {
        Self::Seek {
            message: message.into(),
        }
    }

    /**
        Returns true if this is an EOF error.
    */
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /**
        Returns true if the component that produced this error cannot continue.

        Per-packet failures (`Codec`, `InvalidData`, ...) are recoverable;
        a closed decoder is not.
    */
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DecoderClosed { .. })
    }
}

/**
    Result type alias for media sources and decoders.
*/
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn error_display() {
        let e = Error::open("clip.mp4", "No such file or directory");
        assert_eq!(format!("{e}"), "cannot open clip.mp4: No such file or directory");

        let e = Error::codec("decode failed");
        assert_eq!(format!("{e}"), "codec error: decode failed");

        let e = Error::seek("position out of range");
        assert_eq!(format!("{e}"), "seek failed: position out of range");

        assert_eq!(format!("{}", Error::Eof), "end of stream");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn only_closed_decoder_is_fatal() {
        assert!(Error::decoder_closed("context freed").is_fatal());
        assert!(!Error::codec("bad packet").is_fatal());
        assert!(!Error::invalid_data("truncated").is_fatal());
        assert!(!Error::Eof.is_fatal());
    }

    #[test]
    fn error_is_eof() {
        assert!(Error::Eof.is_eof());
        assert!(!Error::codec("test").is_eof());
    }
}
