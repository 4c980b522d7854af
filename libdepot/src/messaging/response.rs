use crate::messaging::frame_writer::FrameWriter;
use crate::messaging::PROTOCOL_VERSION;
use crate::networking::connection::Connection;
use byteorder::{LittleEndian, WriteBytesExt};
use std::error::Error;
use std::io::Write;

/// One outbound response frame.
///
/// The payload is assembled up front; `send` prefixes the length header and
/// version byte and writes everything to the connection in one go, so the
/// peer never observes a partially framed response.
pub struct Response {
    data: Vec<u8>,
}

impl Response {
    pub fn build<F>(write: F) -> Result<Response, Box<dyn Error>>
    where
        F: FnOnce(&mut FrameWriter) -> Result<(), Box<dyn Error>>,
    {
        let mut data = Vec::new();

        {
            let mut writer = FrameWriter::new(&mut data);
            write(&mut writer)?;
        }

        Ok(Response { data })
    }

    /// A response carrying a single status marker string.
    pub fn status(marker: &str) -> Result<Response, Box<dyn Error>> {
        Response::build(|writer| writer.write_str(marker))
    }

    /// The absent marker response.
    pub fn absent() -> Result<Response, Box<dyn Error>> {
        Response::build(|writer| writer.write_nil())
    }

    pub fn send(&mut self, connection: &mut Connection) -> Result<(), Box<dyn Error>> {
        // Written length minus the length field itself: version byte + payload
        let frame_length = self.data.len() + 1;
        connection.write_u32::<LittleEndian>(frame_length as u32)?;
        connection.write_u8(PROTOCOL_VERSION)?;
        connection.write_all(self.data.as_slice())?;

        Ok(())
    }
}
