use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use snafu::{OptionExt, Snafu};
use std::error::Error;

/// Tag byte preceding every value on the wire.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum ValueType {
    /// The absent marker. Carries no payload.
    NilType = 0x00,
    /// Length-prefixed UTF-8 text.
    StrType = 0x01,
    /// Length-prefixed raw bytes.
    BlobType = 0x02,
    /// Count-prefixed sequence of length-prefixed UTF-8 strings.
    StrListType = 0x03,
}

#[derive(Debug, Snafu)]
#[snafu(display("The value {value} cannot be represented as a ValueType."))]
struct IllegalValueTypeError {
    value: u8,
}

impl ValueType {
    pub fn from_value(value: u8) -> Result<Self, Box<dyn Error>> {
        let value_type =
            ValueType::from_u8(value).with_context(|| IllegalValueTypeSnafu { value })?;

        Ok(value_type)
    }

    pub fn to_value(self) -> u8 {
        self.to_u8().unwrap()
    }
}
