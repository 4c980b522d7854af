use crate::messaging::value_type::ValueType;
use byteorder::{LittleEndian, ReadBytesExt};
use snafu::{ensure, Snafu};
use std::error::Error;
use std::io::{Cursor, Read};

#[derive(Debug, Snafu)]
enum FrameReaderError {
    #[snafu(display(
        "Expected type {expected_type:?} but got type {actual_type:?} when reading from frame."
    ))]
    UnexpectedValueType {
        expected_type: ValueType,
        actual_type: ValueType,
    },
    #[snafu(display("The frame terminated unexpectedly."))]
    UnexpectedEndOfFrame,
}

/// Reads the typed values of one decoded frame payload.
///
/// Values are read in wire order. The `next_is_*` methods peek at the
/// upcoming tag without consuming it.
pub struct FrameReader {
    cursor: Cursor<Vec<u8>>,
    cached_value_type: Option<ValueType>,
}

impl FrameReader {
    pub fn new(buf: Vec<u8>) -> Self {
        FrameReader {
            cursor: Cursor::new(buf),
            cached_value_type: None,
        }
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    pub fn has_remaining(&self) -> bool {
        self.cached_value_type.is_some() || self.remaining() > 0
    }

    fn read_value_type(&mut self) -> Result<ValueType, Box<dyn Error>> {
        if let Some(cached) = self.cached_value_type.take() {
            return Ok(cached);
        }

        ValueType::from_value(self.cursor.read_u8()?)
    }

    fn next_value_type(&mut self) -> Result<ValueType, Box<dyn Error>> {
        if let Some(cached) = self.cached_value_type {
            return Ok(cached);
        }

        let value_type = ValueType::from_value(self.cursor.read_u8()?)?;
        self.cached_value_type = Some(value_type);

        Ok(value_type)
    }

    pub fn next_is_nil(&mut self) -> Result<bool, Box<dyn Error>> {
        Ok(self.next_value_type()? == ValueType::NilType)
    }

    pub fn next_is_str(&mut self) -> Result<bool, Box<dyn Error>> {
        Ok(self.next_value_type()? == ValueType::StrType)
    }

    pub fn next_is_blob(&mut self) -> Result<bool, Box<dyn Error>> {
        Ok(self.next_value_type()? == ValueType::BlobType)
    }

    pub fn next_is_str_list(&mut self) -> Result<bool, Box<dyn Error>> {
        Ok(self.next_value_type()? == ValueType::StrListType)
    }

    fn expect_value_type(&mut self, expected_type: ValueType) -> Result<(), Box<dyn Error>> {
        let actual_type = self.read_value_type()?;
        ensure!(
            actual_type == expected_type,
            UnexpectedValueTypeSnafu {
                actual_type,
                expected_type
            }
        );

        Ok(())
    }

    fn read_length_prefixed_bytes(&mut self) -> Result<Vec<u8>, Box<dyn Error>> {
        let len = self.cursor.read_u32::<LittleEndian>()? as usize;

        // The length field must never promise more than the frame holds.
        ensure!(len <= self.remaining(), UnexpectedEndOfFrameSnafu);

        let mut buf = vec![0; len];
        ensure!(
            self.cursor.read(buf.as_mut_slice())? == len,
            UnexpectedEndOfFrameSnafu
        );

        Ok(buf)
    }

    pub fn read_nil(&mut self) -> Result<(), Box<dyn Error>> {
        self.expect_value_type(ValueType::NilType)
    }

    pub fn read_str(&mut self) -> Result<String, Box<dyn Error>> {
        self.expect_value_type(ValueType::StrType)?;

        let buf = self.read_length_prefixed_bytes()?;
        Ok(String::from_utf8(buf)?)
    }

    pub fn read_blob(&mut self) -> Result<Vec<u8>, Box<dyn Error>> {
        self.expect_value_type(ValueType::BlobType)?;

        self.read_length_prefixed_bytes()
    }

    pub fn read_str_list(&mut self) -> Result<Vec<String>, Box<dyn Error>> {
        self.expect_value_type(ValueType::StrListType)?;

        let num_elements = self.cursor.read_u32::<LittleEndian>()? as usize;

        // Every element takes at least its length field.
        ensure!(
            num_elements.saturating_mul(4) <= self.remaining(),
            UnexpectedEndOfFrameSnafu
        );

        let mut result = Vec::with_capacity(num_elements);
        for _ in 0..num_elements {
            let buf = self.read_length_prefixed_bytes()?;
            result.push(String::from_utf8(buf)?);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::frame_writer::FrameWriter;

    fn written(write: impl FnOnce(&mut FrameWriter) -> Result<(), Box<dyn Error>>) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buf);
            write(&mut writer).unwrap();
        }
        buf
    }

    #[test]
    fn ensure_can_read_str() {
        let buf = written(|writer| writer.write_str("hello"));
        let mut reader = FrameReader::new(buf);

        assert_eq!(reader.read_str().unwrap(), "hello");
        assert!(!reader.has_remaining());
    }

    #[test]
    fn ensure_can_read_empty_str() {
        let buf = written(|writer| writer.write_str(""));
        let mut reader = FrameReader::new(buf);

        assert_eq!(reader.read_str().unwrap(), "");
    }

    #[test]
    fn ensure_can_read_blob() {
        let content = vec![0u8, 1, 2, 250, 255];
        let buf = written(|writer| writer.write_blob(&content));
        let mut reader = FrameReader::new(buf);

        assert_eq!(reader.read_blob().unwrap(), content);
    }

    #[test]
    fn ensure_can_read_str_list() {
        let names = vec!["a.txt".to_owned(), "b.bin".to_owned(), "".to_owned()];
        let buf = written(|writer| writer.write_str_list(&names));
        let mut reader = FrameReader::new(buf);

        assert_eq!(reader.read_str_list().unwrap(), names);
    }

    #[test]
    fn ensure_can_read_nil() {
        let buf = written(|writer| writer.write_nil());
        let mut reader = FrameReader::new(buf);

        reader.read_nil().unwrap();
        assert!(!reader.has_remaining());
    }

    #[test]
    fn ensure_can_read_value_sequence() {
        let buf = written(|writer| {
            writer.write_str("UPLOAD")?;
            writer.write_str("token")?;
            writer.write_str("a.txt")?;
            writer.write_blob(&[1, 2, 3])
        });
        let mut reader = FrameReader::new(buf);

        assert_eq!(reader.read_str().unwrap(), "UPLOAD");
        assert_eq!(reader.read_str().unwrap(), "token");
        assert_eq!(reader.read_str().unwrap(), "a.txt");
        assert_eq!(reader.read_blob().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn ensure_peeking_does_not_consume() {
        let buf = written(|writer| writer.write_blob(&[9, 9]));
        let mut reader = FrameReader::new(buf);

        assert!(!reader.next_is_nil().unwrap());
        assert!(reader.next_is_blob().unwrap());
        assert_eq!(reader.read_blob().unwrap(), vec![9, 9]);
    }

    #[test]
    fn ensure_errors_on_wrong_value_type() {
        let buf = written(|writer| writer.write_blob(&[1]));
        let mut reader = FrameReader::new(buf);

        assert!(reader.read_str().is_err());
    }

    #[test]
    fn ensure_errors_on_unknown_tag() {
        let mut reader = FrameReader::new(vec![0x7F]);

        assert!(reader.read_str().is_err());
    }

    #[test]
    fn ensure_errors_on_truncated_payload() {
        // Str tag claiming 10 bytes but carrying 2
        let mut reader = FrameReader::new(vec![0x01, 10, 0, 0, 0, b'a', b'b']);

        assert!(reader.read_str().is_err());
    }

    #[test]
    fn ensure_errors_on_lying_list_count() {
        // StrList tag claiming u32::MAX elements with an empty body
        let mut reader = FrameReader::new(vec![0x03, 0xFF, 0xFF, 0xFF, 0xFF]);

        assert!(reader.read_str_list().is_err());
    }

    #[test]
    fn ensure_errors_on_empty_buffer() {
        let mut reader = FrameReader::new(Vec::new());

        assert!(reader.read_str().is_err());
    }

    #[test]
    fn ensure_errors_on_invalid_utf8() {
        let mut reader = FrameReader::new(vec![0x01, 2, 0, 0, 0, 0xC0, 0xAF]);

        assert!(reader.read_str().is_err());
    }
}
