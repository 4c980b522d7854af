use crate::messaging::frame_reader::FrameReader;
use crate::messaging::PROTOCOL_VERSION;
use snafu::{ensure, OptionExt, Snafu};
use std::error::Error;

#[derive(Debug, Snafu)]
enum FrameError {
    #[snafu(display("The client sent an empty frame."))]
    EmptyFrame,
    #[snafu(display(
        "The client sent protocol version {version} but only {PROTOCOL_VERSION} is supported."
    ))]
    UnsupportedVersion { version: u8 },
}

/// One inbound command frame, version-checked and ready to be read.
pub struct Frame {
    pub reader: FrameReader,
}

impl Frame {
    pub fn new(buf: Vec<u8>) -> Result<Self, Box<dyn Error>> {
        let version = *buf.first().context(EmptyFrameSnafu)?;
        ensure!(
            version == PROTOCOL_VERSION,
            UnsupportedVersionSnafu { version }
        );

        Ok(Frame {
            reader: FrameReader::new(Vec::from(&buf[1..])),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_accepts_current_version() {
        let frame = Frame::new(vec![PROTOCOL_VERSION, 0x00]);

        assert!(frame.is_ok());
    }

    #[test]
    fn ensure_rejects_empty_frame() {
        assert!(Frame::new(Vec::new()).is_err());
    }

    #[test]
    fn ensure_rejects_unknown_version() {
        assert!(Frame::new(vec![0x42, 0x00]).is_err());
    }
}
