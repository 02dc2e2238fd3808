use crate::jvm::class_file::{ClassConstantIndex, ConstantIndex, ConstantPool, Utf8ConstantIndex};
use crate::jvm::{read_bytes, u32_length, Deserialize, Error, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Attributes (used in classes, fields, methods, and even on some attributes)
///
/// Attributes are kept in their raw form: only the name is interpreted. Recognized attributes
/// are decoded on demand with [`Attribute::decode`], and everything else is carried along
/// byte-for-byte.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Attribute {
    /// Name of the attribute, as found in the constant pool
    pub fn name<'a>(&self, constants: &'a ConstantPool) -> Result<&'a str, Error> {
        constants.get_utf8(self.name_index)
    }

    /// Decode the payload, which must be exactly as long as the declared attribute length
    pub fn decode<A: AttributeLike>(&self) -> Result<A, Error> {
        A::from_bytes(&self.info).map_err(|err| match err {
            Error::Format(msg) => Error::Format(format!("{} attribute: {}", A::NAME, msg)),
            other => other,
        })
    }

    /// Find the first attribute with the given name
    pub fn find<'a>(
        attributes: &'a [Attribute],
        constants: &ConstantPool,
        name: &str,
    ) -> Result<Option<&'a Attribute>, Error> {
        for attribute in attributes {
            if attribute.name(constants)? == name {
                return Ok(Some(attribute));
            }
        }
        Ok(None)
    }

    /// Find and decode the first attribute of a known kind
    pub fn find_decoded<A: AttributeLike>(
        attributes: &[Attribute],
        constants: &ConstantPool,
    ) -> Result<Option<A>, Error> {
        Attribute::find(attributes, constants, A::NAME)?
            .map(Attribute::decode)
            .transpose()
    }
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        // Attribute info length is 4 bytes
        let len = u32_length("attribute length", self.info.len())?;
        self.name_index.serialize(writer)?;
        len.serialize(writer)?;
        writer.write_all(&self.info)?;
        Ok(())
    }
}

impl Deserialize for Attribute {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let name_index = Utf8ConstantIndex::deserialize(reader)?;
        let len = u32::deserialize(reader)?;
        let info = read_bytes(reader, len as usize)?;
        Ok(Attribute { name_index, info })
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into (and read back out of) attributes.
pub trait AttributeLike: Serialize + Deserialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantValue(pub ConstantIndex);

impl Serialize for ConstantValue {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantValue {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        ConstantIndex::deserialize(reader).map(ConstantValue)
    }
}

impl AttributeLike for ConstantValue {
    const NAME: &'static str = "ConstantValue";
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFile(pub Utf8ConstantIndex);

impl Serialize for SourceFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.0.serialize(writer)
    }
}

impl Deserialize for SourceFile {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Utf8ConstantIndex::deserialize(reader).map(SourceFile)
    }
}

impl AttributeLike for SourceFile {
    const NAME: &'static str = "SourceFile";
}

/// Checked exceptions a method may throw
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.5
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exceptions(pub Vec<ClassConstantIndex>);

impl Serialize for Exceptions {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.0.serialize(writer)
    }
}

impl Deserialize for Exceptions {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Vec::deserialize(reader).map(Exceptions)
    }
}

impl AttributeLike for Exceptions {
    const NAME: &'static str = "Exceptions";
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.3
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: BytecodeArray,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        self.code_array.serialize(writer)?;
        self.exception_table.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Code {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Code {
            max_stack: u16::deserialize(reader)?,
            max_locals: u16::deserialize(reader)?,
            code_array: BytecodeArray::deserialize(reader)?,
            exception_table: Vec::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of exception handler range (inclusive)
    pub start_pc: BytecodeIndex,

    /// End of exception handler range (exclusive)
    pub end_pc: BytecodeIndex,

    /// Start of the exception handler
    pub handler_pc: BytecodeIndex,

    /// Exception class caught (`None` catches everything, eg. for `finally`)
    pub catch_type: Option<ClassConstantIndex>,
}

impl Serialize for ExceptionHandler {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.start_pc.serialize(writer)?;
        self.end_pc.serialize(writer)?;
        self.handler_pc.serialize(writer)?;
        match self.catch_type {
            None => 0u16.serialize(writer)?,
            Some(catch_type) => catch_type.serialize(writer)?,
        }
        Ok(())
    }
}

impl Deserialize for ExceptionHandler {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let start_pc = BytecodeIndex::deserialize(reader)?;
        let end_pc = BytecodeIndex::deserialize(reader)?;
        let handler_pc = BytecodeIndex::deserialize(reader)?;
        let catch_type = match ClassConstantIndex::deserialize(reader)? {
            ClassConstantIndex(ConstantIndex(0)) => None,
            other => Some(other),
        };
        Ok(ExceptionHandler {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        })
    }
}

/// Encoded bytecode instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodeArray(pub Vec<u8>);

impl Serialize for BytecodeArray {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        let len = u32_length("code length", self.0.len())?;
        len.serialize(writer)?;
        writer.write_all(&self.0)?;
        Ok(())
    }
}

impl Deserialize for BytecodeArray {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let len = u32::deserialize(reader)?;
        read_bytes(reader, len as usize).map(BytecodeArray)
    }
}

/// Index into `BytecodeArray`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BytecodeIndex(pub u16);

impl Serialize for BytecodeIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.0.serialize(writer)
    }
}

impl Deserialize for BytecodeIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        u16::deserialize(reader).map(BytecodeIndex)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn attribute_length_must_match_payload() {
        let short = Attribute {
            name_index: Utf8ConstantIndex(ConstantIndex(1)),
            info: vec![0],
        };
        assert!(matches!(short.decode::<SourceFile>(), Err(Error::Format(_))));

        let long = Attribute {
            name_index: Utf8ConstantIndex(ConstantIndex(1)),
            info: vec![0, 3, 0],
        };
        assert!(matches!(long.decode::<SourceFile>(), Err(Error::Format(_))));

        let exact = Attribute {
            name_index: Utf8ConstantIndex(ConstantIndex(1)),
            info: vec![0, 3],
        };
        assert_eq!(
            exact.decode::<SourceFile>().unwrap(),
            SourceFile(Utf8ConstantIndex(ConstantIndex(3)))
        );
    }

    #[test]
    fn unknown_attributes_are_carried_verbatim() {
        let mut pool = ConstantPool::new();
        let name_index = pool.add_utf8("Custom").unwrap();
        let attribute = Attribute {
            name_index,
            info: vec![9, 8, 7],
        };
        let bytes = attribute.to_bytes().unwrap();
        assert_eq!(bytes, vec![0, 1, 0, 0, 0, 3, 9, 8, 7]);
        assert_eq!(Attribute::from_bytes(&bytes).unwrap(), attribute);
        assert_eq!(attribute.name(&pool).unwrap(), "Custom");
    }

    #[test]
    fn code_attribute_round_trip() {
        let mut pool = ConstantPool::new();
        let catch_type = pool.add_class("java/lang/Exception").unwrap();
        let code = Code {
            max_stack: 2,
            max_locals: 1,
            code_array: BytecodeArray(vec![0x03, 0xac]),
            exception_table: vec![
                ExceptionHandler {
                    start_pc: BytecodeIndex(0),
                    end_pc: BytecodeIndex(1),
                    handler_pc: BytecodeIndex(1),
                    catch_type: Some(catch_type),
                },
                ExceptionHandler {
                    start_pc: BytecodeIndex(0),
                    end_pc: BytecodeIndex(1),
                    handler_pc: BytecodeIndex(1),
                    catch_type: None,
                },
            ],
            attributes: vec![],
        };
        let attribute = pool.encode_attribute(&code).unwrap();
        assert_eq!(attribute.name(&pool).unwrap(), "Code");
        assert_eq!(attribute.decode::<Code>().unwrap(), code);
        assert_eq!(
            Attribute::find_decoded::<Code>(&[attribute], &pool).unwrap(),
            Some(code)
        );
    }
}
