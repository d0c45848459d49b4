//! Error types shared by every stage of the pipeline.
//!
//! Nothing is recovered locally: the first error aborts the run and is
//! reported by the binary.

use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be read, or the output could not be written.
    #[error("cannot access '{}': {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input file is not valid UTF-8.
    #[error("'{}' is not valid UTF-8 text: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: FromUtf8Error,
    },

    /// The document could not be laid out or serialized to PDF.
    #[error("render failed: {0}")]
    Render(String),
}

impl Error {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileAccess {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn file_access_names_the_path() {
        let e = Error::file_access(
            "submission-file.md",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let msg = e.to_string();
        assert!(msg.contains("submission-file.md"), "got: {msg}");
        assert!(msg.contains("no such file"), "got: {msg}");
    }

    #[test]
    fn decode_display() {
        let source = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let e = Error::Decode {
            path: "in.md".into(),
            source,
        };
        assert!(e.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn render_display() {
        let e = Error::Render("unknown paper size".into());
        assert_eq!(e.to_string(), "render failed: unknown paper size");
    }
}
