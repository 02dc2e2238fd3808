use crate::jvm::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// Utility trait for serializing data inside class files
///
/// Java class files have some peculiarities that make it useful to define an extra trait (instead
/// of just using `serde`):
///
///   - tags are always `u8`
///   - when serializing a sequence, the length of the sequence is usually `u16`
///   - lengths that don't fit in their encoded width must be rejected _before_ anything is written
///
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error>;

    /// Serialize construct into a fresh buffer
    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![];
        self.serialize(&mut bytes)?;
        Ok(bytes)
    }
}

/// Counterpart of [`Serialize`] for reading class files
pub trait Deserialize: Sized {
    /// Deserialize construct from a binary input stream
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error>;

    /// Deserialize construct from a buffer, which must be consumed entirely
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes);
        let value = Self::deserialize(&mut cursor)?;
        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(Error::Format(format!(
                "expected {} bytes but only {} were consumed",
                bytes.len(),
                consumed
            )));
        }
        Ok(value)
    }
}

/// Check that a length fits in the `u16` used to encode it
pub fn u16_length(what: &'static str, length: usize) -> Result<u16, Error> {
    u16::try_from(length).map_err(|_| Error::ValueTooLarge {
        what,
        value: length,
        max: u16::MAX as usize,
    })
}

/// Check that a length fits in the `u32` used to encode it
pub fn u32_length(what: &'static str, length: usize) -> Result<u32, Error> {
    u32::try_from(length).map_err(|_| Error::ValueTooLarge {
        what,
        value: length,
        max: u32::MAX as usize,
    })
}

/// Read exactly `length` bytes into a fresh buffer
///
/// Lengths come from untrusted input, so the buffer only grows as bytes actually arrive.
pub fn read_bytes<R: ReadBytesExt>(reader: &mut R, length: usize) -> Result<Vec<u8>, Error> {
    let mut bytes = vec![];
    reader.by_ref().take(length as u64).read_to_end(&mut bytes)?;
    if bytes.len() != length {
        return Err(Error::Format(format!(
            "expected {} bytes but the input ends after {}",
            length,
            bytes.len()
        )));
    }
    Ok(bytes)
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_u8(*self)?)
    }
}

impl Deserialize for u8 {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_u8()?)
    }
}

impl Serialize for i8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        Ok(writer.write_i8(*self)?)
    }
}

impl Deserialize for i8 {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(reader.read_i8()?)
    }
}

/// Multi-byte primitives are all big endian
macro_rules! big_endian_primitive {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Serialize for $ty {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
                Ok(writer.$write::<BigEndian>(*self)?)
            }
        }

        impl Deserialize for $ty {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
                Ok(reader.$read::<BigEndian>()?)
            }
        }
    };
}

big_endian_primitive!(u16, write_u16, read_u16);
big_endian_primitive!(u32, write_u32, read_u32);
big_endian_primitive!(i16, write_i16, read_i16);
big_endian_primitive!(i32, write_i32, read_i32);
big_endian_primitive!(i64, write_i64, read_i64);
big_endian_primitive!(f32, write_f32, read_f32);
big_endian_primitive!(f64, write_f64, read_f64);

/// Size in `u16` is the first thing serialized/deserialized
impl<A: Serialize> Serialize for Vec<A> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        u16_length("sequence length", self.len())?.serialize(writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

impl<A: Deserialize> Deserialize for Vec<A> {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let count = u16::deserialize(reader)?;
        let mut elems = Vec::with_capacity(count as usize);
        for _ in 0..count {
            elems.push(A::deserialize(reader)?);
        }
        Ok(elems)
    }
}
