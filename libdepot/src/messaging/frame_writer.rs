use crate::messaging::value_type::ValueType;
use byteorder::{LittleEndian, WriteBytesExt};
use std::error::Error;
use std::io::{Cursor, Write};

/// Writes typed values into a frame payload buffer.
pub struct FrameWriter<'a> {
    cursor: Cursor<&'a mut Vec<u8>>,
}

impl<'a> FrameWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        FrameWriter {
            cursor: Cursor::new(buf),
        }
    }

    fn write_value_type(&mut self, value_type: ValueType) -> Result<(), Box<dyn Error>> {
        self.cursor.write_u8(value_type.to_value())?;
        Ok(())
    }

    fn write_length_prefixed_bytes(&mut self, buf: &[u8]) -> Result<(), Box<dyn Error>> {
        self.cursor.write_u32::<LittleEndian>(buf.len() as u32)?;
        self.cursor.write_all(buf)?;
        Ok(())
    }

    pub fn write_nil(&mut self) -> Result<(), Box<dyn Error>> {
        self.write_value_type(ValueType::NilType)
    }

    pub fn write_str(&mut self, value: &str) -> Result<(), Box<dyn Error>> {
        self.write_value_type(ValueType::StrType)?;
        self.write_length_prefixed_bytes(value.as_bytes())
    }

    pub fn write_blob(&mut self, value: &[u8]) -> Result<(), Box<dyn Error>> {
        self.write_value_type(ValueType::BlobType)?;
        self.write_length_prefixed_bytes(value)
    }

    pub fn write_str_list(&mut self, values: &[String]) -> Result<(), Box<dyn Error>> {
        self.write_value_type(ValueType::StrListType)?;
        self.cursor.write_u32::<LittleEndian>(values.len() as u32)?;

        for value in values {
            self.write_length_prefixed_bytes(value.as_bytes())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_writes_str_with_tag_and_length() {
        let mut buf = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buf);
            writer.write_str("ok").unwrap();
        }

        assert_eq!(buf, vec![0x01, 2, 0, 0, 0, b'o', b'k']);
    }

    #[test]
    fn ensure_writes_nil_as_single_tag() {
        let mut buf = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buf);
            writer.write_nil().unwrap();
        }

        assert_eq!(buf, vec![0x00]);
    }

    #[test]
    fn ensure_writes_str_list_with_count() {
        let mut buf = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buf);
            writer
                .write_str_list(&["a".to_owned(), "bc".to_owned()])
                .unwrap();
        }

        assert_eq!(
            buf,
            vec![0x03, 2, 0, 0, 0, 1, 0, 0, 0, b'a', 2, 0, 0, 0, b'b', b'c']
        );
    }
}
