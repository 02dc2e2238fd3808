use crate::jvm::class_file::{Attribute, AttributeLike};
use crate::jvm::{read_bytes, u16_length, Deserialize, Error, Serialize};
use crate::util::{SlotVec, Width};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;

/// Class file constant pool
///
/// Indexing starts at 1 and `long`/`double` entries use up two indices. Entries are never mutated
/// once added: [`ConstantPool::add_or_reuse`] hands back the index of a bit-identical existing
/// entry if there is one, and otherwise appends.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    constants: SlotVec<Constant>,

    /// Index of each distinct constant, keyed by its serialized form
    existing: HashMap<Vec<u8>, ConstantIndex>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        ConstantPool::new()
    }
}

impl ConstantPool {
    /// Make a fresh empty constant pool
    pub fn new() -> ConstantPool {
        ConstantPool {
            constants: SlotVec::starting_at(1),
            existing: HashMap::new(),
        }
    }

    /// Number of entries (`long`/`double` count once)
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Value of `constant_pool_count` (one more than the largest index in use)
    pub fn count(&self) -> u16 {
        self.constants.next_slot() as u16
    }

    /// Iterate over all entries, along with their indices
    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> + '_ {
        self.constants
            .iter()
            .map(|(slot, constant)| (ConstantIndex(slot as u16), constant))
    }

    /// Look up a constant
    ///
    /// Index 0, indices past the end of the pool, and the unusable index following a `long` or
    /// `double` are all out of range.
    pub fn get(&self, index: impl Into<ConstantIndex>) -> Result<&Constant, Error> {
        let index = index.into();
        self.constants
            .at_slot(index.0 as usize)
            .ok_or(Error::ConstantIndexOutOfRange(index))
    }

    /// Get the index of a constant, adding it to the pool if it isn't already there
    pub fn add_or_reuse(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let key = constant.to_bytes()?;
        if let Some(idx) = self.existing.get(&key) {
            return Ok(*idx);
        }
        let idx = self.push_constant(constant)?;
        self.existing.insert(key, idx);
        Ok(idx)
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65534, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let offset: u16 = self.count();

        if offset.checked_add(constant.width() as u16).is_none() {
            return Err(Error::ConstantPoolOverflow { constant, offset });
        }

        self.constants.push(constant);
        Ok(ConstantIndex(offset))
    }

    pub fn add_utf8(&mut self, utf8: impl Into<String>) -> Result<Utf8ConstantIndex, Error> {
        self.add_or_reuse(Constant::Utf8(utf8.into()))
            .map(Utf8ConstantIndex)
    }

    /// Add a class by its internal name (or array descriptor)
    pub fn add_class(&mut self, name: impl Into<String>) -> Result<ClassConstantIndex, Error> {
        let name = self.add_utf8(name)?;
        self.add_or_reuse(Constant::Class(name))
            .map(ClassConstantIndex)
    }

    pub fn add_string(&mut self, string: impl Into<String>) -> Result<ConstantIndex, Error> {
        let utf8 = self.add_utf8(string)?;
        self.add_or_reuse(Constant::String(utf8))
    }

    pub fn add_integer(&mut self, integer: i32) -> Result<ConstantIndex, Error> {
        self.add_or_reuse(Constant::Integer(integer))
    }

    pub fn add_long(&mut self, long: i64) -> Result<ConstantIndex, Error> {
        self.add_or_reuse(Constant::Long(long))
    }

    pub fn add_float(&mut self, float: f32) -> Result<ConstantIndex, Error> {
        self.add_or_reuse(Constant::Float(float))
    }

    pub fn add_double(&mut self, double: f64) -> Result<ConstantIndex, Error> {
        self.add_or_reuse(Constant::Double(double))
    }

    pub fn add_name_and_type(
        &mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.add_utf8(name)?;
        let descriptor = self.add_utf8(descriptor)?;
        self.add_or_reuse(Constant::NameAndType { name, descriptor })
            .map(NameAndTypeConstantIndex)
    }

    pub fn add_field_ref(
        &mut self,
        class: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Result<ConstantIndex, Error> {
        let class = self.add_class(class)?;
        let name_and_type = self.add_name_and_type(name, descriptor)?;
        self.add_or_reuse(Constant::FieldRef {
            class,
            name_and_type,
        })
    }

    pub fn add_method_ref(
        &mut self,
        class: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        is_interface: bool,
    ) -> Result<ConstantIndex, Error> {
        let class = self.add_class(class)?;
        let name_and_type = self.add_name_and_type(name, descriptor)?;
        self.add_or_reuse(Constant::MethodRef {
            class,
            name_and_type,
            is_interface,
        })
    }

    /// Encode an attribute payload, adding its name to the pool
    pub fn encode_attribute<A: AttributeLike>(&mut self, attribute: &A) -> Result<Attribute, Error> {
        let name_index = self.add_utf8(A::NAME)?;
        let info = attribute.to_bytes()?;
        Ok(Attribute { name_index, info })
    }

    pub fn get_utf8(&self, index: impl Into<ConstantIndex>) -> Result<&str, Error> {
        let index = index.into();
        match self.get(index)? {
            Constant::Utf8(utf8) => Ok(utf8),
            other => Err(unexpected(index, "a Utf8", other)),
        }
    }

    /// Internal name (or array descriptor) of a class constant
    pub fn get_class_name(&self, index: impl Into<ConstantIndex>) -> Result<&str, Error> {
        let index = index.into();
        match self.get(index)? {
            Constant::Class(name) => self.get_utf8(*name),
            other => Err(unexpected(index, "a Class", other)),
        }
    }

    /// Name and descriptor of a name-and-type constant
    pub fn get_name_and_type(
        &self,
        index: impl Into<ConstantIndex>,
    ) -> Result<(&str, &str), Error> {
        let index = index.into();
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.get_utf8(*name)?, self.get_utf8(*descriptor)?))
            }
            other => Err(unexpected(index, "a NameAndType", other)),
        }
    }

    /// Resolve a field or method reference to its class, name and descriptor
    pub fn get_member_ref(&self, index: impl Into<ConstantIndex>) -> Result<MemberRef<'_>, Error> {
        let index = index.into();
        let (class, name_and_type, kind) = match self.get(index)? {
            Constant::FieldRef {
                class,
                name_and_type,
            } => (class, name_and_type, MemberKind::Field),
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface: false,
            } => (class, name_and_type, MemberKind::Method),
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface: true,
            } => (class, name_and_type, MemberKind::InterfaceMethod),
            other => return Err(unexpected(index, "a field or method reference", other)),
        };
        let (name, descriptor) = self.get_name_and_type(*name_and_type)?;
        Ok(MemberRef {
            class: self.get_class_name(*class)?,
            name,
            descriptor,
            kind,
        })
    }
}

fn unexpected(index: ConstantIndex, expected: &'static str, found: &Constant) -> Error {
    Error::UnexpectedConstant {
        index,
        expected,
        found: found.clone(),
    }
}

/// Count, then entries (`long`/`double` entries are followed by an unusable index)
impl Serialize for ConstantPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.count().serialize(writer)?;
        for (_, constant) in self.constants.iter() {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

impl Deserialize for ConstantPool {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let count = u16::deserialize(reader)?;
        if count == 0 {
            return Err(Error::Format(String::from("constant_pool_count is 0")));
        }

        let mut pool = ConstantPool::new();
        while pool.count() < count {
            let constant = Constant::deserialize(reader)?;
            if pool.count() as usize + constant.width() > count as usize {
                return Err(Error::Format(format!(
                    "constant at index {} spills past constant_pool_count {}",
                    pool.count(),
                    count
                )));
            }

            // First occurrence wins when the file itself contains duplicates
            let key = constant.to_bytes()?;
            let idx = pool.push_constant(constant)?;
            pool.existing.entry(key).or_insert(idx);
        }
        Ok(pool)
    }
}

/// Constants as in the constant pool
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(String),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`
    Float(f32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`
    Double(f64),

    /// Class or an interface (or an array type)
    Class(Utf8ConstantIndex),

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Field
    FieldRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Method (this combines `Methodref` and `InterfaceMethodref`)
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: HandleKind,

        /// Depending on the handle kind, this points to different things:
        ///
        ///   - `FieldRef` for `GetField`, `GetStatic`, `PutField`, `PutStatic`
        ///   - `MethodRef` for the rest
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    Module(Utf8ConstantIndex),

    Package(Utf8ConstantIndex),
}

impl Constant {
    /// Tag byte which precedes the constant in the class file
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => 1,
            Constant::Integer(_) => 3,
            Constant::Float(_) => 4,
            Constant::Long(_) => 5,
            Constant::Double(_) => 6,
            Constant::Class(_) => 7,
            Constant::String(_) => 8,
            Constant::FieldRef { .. } => 9,
            Constant::MethodRef {
                is_interface: false,
                ..
            } => 10,
            Constant::MethodRef {
                is_interface: true,
                ..
            } => 11,
            Constant::NameAndType { .. } => 12,
            Constant::MethodHandle { .. } => 15,
            Constant::MethodType { .. } => 16,
            Constant::Dynamic { .. } => 17,
            Constant::InvokeDynamic { .. } => 18,
            Constant::Module(_) => 19,
            Constant::Package(_) => 20,
        }
    }

    /// Can this constant be pushed with `ldc`/`ldc_w`?
    pub fn is_single_width_loadable(&self) -> bool {
        matches!(
            self,
            Constant::Integer(_)
                | Constant::Float(_)
                | Constant::String(_)
                | Constant::Class(_)
                | Constant::MethodHandle { .. }
                | Constant::MethodType { .. }
                | Constant::Dynamic { .. }
        )
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        let tag = self.tag();
        match self {
            Constant::Utf8(string) => {
                let buffer: Vec<u8> = encode_modified_utf8(string);
                let len = u16_length("Utf8 constant length", buffer.len())?;
                tag.serialize(writer)?;
                len.serialize(writer)?;
                writer.write_all(&buffer)?;
            }
            Constant::Integer(integer) => {
                tag.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Float(float) => {
                tag.serialize(writer)?;
                float.serialize(writer)?;
            }
            Constant::Long(long) => {
                tag.serialize(writer)?;
                long.serialize(writer)?;
            }
            Constant::Double(double) => {
                tag.serialize(writer)?;
                double.serialize(writer)?;
            }
            Constant::Class(name)
            | Constant::String(name)
            | Constant::Module(name)
            | Constant::Package(name)
            | Constant::MethodType { descriptor: name } => {
                tag.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::FieldRef {
                class,
                name_and_type,
            }
            | Constant::MethodRef {
                class,
                name_and_type,
                ..
            } => {
                tag.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                tag.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                tag.serialize(writer)?;
                handle_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            }
            | Constant::InvokeDynamic {
                bootstrap_method,
                name_and_type,
            } => {
                tag.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl Deserialize for Constant {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let constant = match u8::deserialize(reader)? {
            1 => {
                let len = u16::deserialize(reader)?;
                let bytes = read_bytes(reader, len as usize)?;
                Constant::Utf8(decode_modified_utf8(&bytes).map_err(Error::Format)?)
            }
            3 => Constant::Integer(i32::deserialize(reader)?),
            4 => Constant::Float(f32::deserialize(reader)?),
            5 => Constant::Long(i64::deserialize(reader)?),
            6 => Constant::Double(f64::deserialize(reader)?),
            7 => Constant::Class(Utf8ConstantIndex::deserialize(reader)?),
            8 => Constant::String(Utf8ConstantIndex::deserialize(reader)?),
            9 => Constant::FieldRef {
                class: ClassConstantIndex::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            tag @ (10 | 11) => Constant::MethodRef {
                class: ClassConstantIndex::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex::deserialize(reader)?,
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            15 => Constant::MethodHandle {
                handle_kind: HandleKind::deserialize(reader)?,
                member: ConstantIndex::deserialize(reader)?,
            },
            16 => Constant::MethodType {
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            19 => Constant::Module(Utf8ConstantIndex::deserialize(reader)?),
            20 => Constant::Package(Utf8ConstantIndex::deserialize(reader)?),
            other => return Err(Error::Format(format!("unknown constant tag {}", other))),
        };
        Ok(constant)
    }
}

/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// the JVM specification:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2. The constant_pool
/// > index n+1 must be valid but is considered unusable.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    for unit in string.encode_utf16() {
        let code = unit as u32;
        if code != 0 && code < 0x80 {
            buffer.push(code as u8);
        } else if code < 0x800 {
            buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
            buffer.push((code & 0x3F) as u8 | 0b1000_0000);
        } else {
            buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
            buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
            buffer.push((code & 0x3F) as u8 | 0b1000_0000);
        }
    }
    buffer
}

/// Inverse of [`encode_modified_utf8`]
///
/// Unpaired surrogates have no `String` representation, so they are rejected.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, String> {
    let continuation = |idx: usize| -> Result<u16, String> {
        match bytes.get(idx) {
            Some(b) if b & 0b1100_0000 == 0b1000_0000 => Ok((b & 0x3F) as u16),
            Some(b) => Err(format!("invalid continuation byte {:#04x} at {}", b, idx)),
            None => Err(String::from("truncated multi-byte sequence")),
        }
    };

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let b = bytes[idx];
        if b == 0 {
            return Err(format!("null byte at {}", idx));
        } else if b & 0b1000_0000 == 0 {
            units.push(b as u16);
            idx += 1;
        } else if b & 0b1110_0000 == 0b1100_0000 {
            units.push(((b & 0x1F) as u16) << 6 | continuation(idx + 1)?);
            idx += 2;
        } else if b & 0b1111_0000 == 0b1110_0000 {
            units.push(
                ((b & 0x0F) as u16) << 12 | continuation(idx + 1)? << 6 | continuation(idx + 2)?,
            );
            idx += 3;
        } else {
            return Err(format!("invalid leading byte {:#04x} at {}", b, idx));
        }
    }

    String::from_utf16(&units).map_err(|_| String::from("unpaired surrogate"))
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        u16::deserialize(reader).map(ConstantIndex)
    }
}

/// Index which is expected to point at a particular kind of constant
///
/// Nothing stops a class file from lying, so these are only a claim about what the index should
/// point at.
macro_rules! typed_constant_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
        pub struct $name(pub ConstantIndex);

        impl From<$name> for ConstantIndex {
            fn from(index: $name) -> ConstantIndex {
                index.0
            }
        }

        impl Serialize for $name {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
                self.0.serialize(writer)
            }
        }

        impl Deserialize for $name {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
                ConstantIndex::deserialize(reader).map($name)
            }
        }
    };
}

typed_constant_index!(
    /// Index of a `CONSTANT_Utf8_info`
    Utf8ConstantIndex
);
typed_constant_index!(
    /// Index of a `CONSTANT_Class_info`
    ClassConstantIndex
);
typed_constant_index!(
    /// Index of a `CONSTANT_NameAndType_info`
    NameAndTypeConstantIndex
);

/// Type of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-5.html#jvms-5.4.3.5-220
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl HandleKind {
    /// Does the handle point at a field (as opposed to a method)?
    pub fn is_field(&self) -> bool {
        matches!(
            self,
            HandleKind::GetField | HandleKind::GetStatic | HandleKind::PutField | HandleKind::PutStatic
        )
    }
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        let byte: u8 = match self {
            HandleKind::GetField => 1,
            HandleKind::GetStatic => 2,
            HandleKind::PutField => 3,
            HandleKind::PutStatic => 4,
            HandleKind::InvokeVirtual => 5,
            HandleKind::InvokeStatic => 6,
            HandleKind::InvokeSpecial => 7,
            HandleKind::NewInvokeSpecial => 8,
            HandleKind::InvokeInterface => 9,
        };
        byte.serialize(writer)
    }
}

impl Deserialize for HandleKind {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(match u8::deserialize(reader)? {
            1 => HandleKind::GetField,
            2 => HandleKind::GetStatic,
            3 => HandleKind::PutField,
            4 => HandleKind::PutStatic,
            5 => HandleKind::InvokeVirtual,
            6 => HandleKind::InvokeStatic,
            7 => HandleKind::InvokeSpecial,
            8 => HandleKind::NewInvokeSpecial,
            9 => HandleKind::InvokeInterface,
            other => return Err(Error::Format(format!("unknown method handle kind {}", other))),
        })
    }
}

/// Kind of member pointed to by a `Fieldref`, `Methodref` or `InterfaceMethodref`
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemberKind {
    Field,
    Method,
    InterfaceMethod,
}

/// Resolved field or method reference
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemberRef<'a> {
    pub class: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub kind: MemberKind,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identical_constants_are_reused() {
        let mut pool = ConstantPool::new();
        let first = pool.add_utf8("hello").unwrap();
        let second = pool.add_utf8("hello").unwrap();
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);

        let string = pool.add_string("hello").unwrap();
        assert_eq!(string, ConstantIndex(2));
        assert_eq!(pool.get(string).unwrap(), &Constant::String(first));
    }

    #[test]
    fn wide_constants_use_two_indices() {
        let mut pool = ConstantPool::new();
        let long = pool.add_long(42).unwrap();
        let int = pool.add_integer(7).unwrap();
        assert_eq!(long, ConstantIndex(1));
        assert_eq!(int, ConstantIndex(3));
        assert_eq!(pool.count(), 4);
        assert!(matches!(
            pool.get(ConstantIndex(2)),
            Err(Error::ConstantIndexOutOfRange(ConstantIndex(2)))
        ));
    }

    #[test]
    fn out_of_range_indices() {
        let mut pool = ConstantPool::new();
        assert!(matches!(
            pool.get(ConstantIndex(0)),
            Err(Error::ConstantIndexOutOfRange(_))
        ));
        pool.add_integer(1).unwrap();
        assert!(matches!(
            pool.get(ConstantIndex(0)),
            Err(Error::ConstantIndexOutOfRange(_))
        ));
        assert!(matches!(
            pool.get(ConstantIndex(2)),
            Err(Error::ConstantIndexOutOfRange(_))
        ));
    }

    #[test]
    fn nan_floats_deduplicate_by_bits() {
        let mut pool = ConstantPool::new();
        let a = pool.add_float(f32::NAN).unwrap();
        let b = pool.add_float(f32::NAN).unwrap();
        let c = pool.add_float(-0.0).unwrap();
        let d = pool.add_float(0.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(c, d);
    }

    #[test]
    fn pool_overflow() {
        let mut pool = ConstantPool::new();
        for i in 0..65533 {
            pool.add_integer(i).unwrap();
        }
        assert_eq!(pool.count(), 65534);
        assert!(matches!(
            pool.add_long(0),
            Err(Error::ConstantPoolOverflow { offset: 65534, .. })
        ));
        assert_eq!(pool.add_integer(-1).unwrap(), ConstantIndex(65534));
        assert!(matches!(
            pool.add_integer(-2),
            Err(Error::ConstantPoolOverflow { .. })
        ));
        assert_eq!(pool.add_integer(5).unwrap(), ConstantIndex(6));
    }

    #[test]
    fn typed_accessors() {
        let mut pool = ConstantPool::new();
        let method = pool
            .add_method_ref("java/lang/Object", "<init>", "()V", false)
            .unwrap();
        let member = pool.get_member_ref(method).unwrap();
        assert_eq!(member.class, "java/lang/Object");
        assert_eq!(member.name, "<init>");
        assert_eq!(member.descriptor, "()V");
        assert_eq!(member.kind, MemberKind::Method);

        assert!(matches!(
            pool.get_utf8(method),
            Err(Error::UnexpectedConstant { expected: "a Utf8", .. })
        ));
    }

    #[test]
    fn pool_round_trips() {
        let mut pool = ConstantPool::new();
        pool.add_field_ref("Foo", "x", "I").unwrap();
        pool.add_double(1.5).unwrap();
        pool.add_string("caf\u{e9} \u{1F600}\0").unwrap();
        let bytes = pool.to_bytes().unwrap();
        let decoded = ConstantPool::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.count(), pool.count());
        assert_eq!(
            decoded.iter().collect::<Vec<_>>(),
            pool.iter().collect::<Vec<_>>()
        );
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn long_spilling_past_count_is_malformed() {
        let bytes = [0, 2, 5, 0, 0, 0, 0, 0, 0, 0, 1];
        assert!(matches!(ConstantPool::from_bytes(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn unknown_tag_is_malformed() {
        assert!(matches!(Constant::from_bytes(&[2, 0, 0]), Err(Error::Format(_))));
    }
}

#[cfg(test)]
mod modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
        assert_eq!(decode_modified_utf8(&[97, 192, 128, 97]).unwrap(), "a\x00a");
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
        assert_eq!(decode_modified_utf8(b"hel10_World").unwrap(), "hel10_World");
    }

    #[test]
    fn two_and_three_byte_encodings() {
        let two_byte = "ĄǍǞǠǺȀȂȦȺӐӒ";
        let encoded = encode_modified_utf8(two_byte);
        assert_eq!(&encoded[..4], &[196, 132, 199, 141]);
        assert_eq!(decode_modified_utf8(&encoded).unwrap(), two_byte);

        let three_byte = "ऄअॲঅਅઅଅஅఅಅഅะະ༁ཨ";
        let encoded = encode_modified_utf8(three_byte);
        assert_eq!(&encoded[..6], &[224, 164, 132, 224, 164, 133]);
        assert_eq!(decode_modified_utf8(&encoded).unwrap(), three_byte);
    }

    #[test]
    fn supplementary_characters() {
        let encoded = encode_modified_utf8("\u{10000}\u{dffff}\u{10FFFF}");
        assert_eq!(
            encoded,
            vec![
                237, 160, 128, 237, 176, 128, 237, 172, 191, 237, 191, 191, 237, 175, 191, 237,
                191, 191
            ]
        );
        assert_eq!(
            decode_modified_utf8(&encoded).unwrap(),
            "\u{10000}\u{dffff}\u{10FFFF}"
        );
    }

    #[test]
    fn malformed_input() {
        assert!(decode_modified_utf8(&[0]).is_err());
        assert!(decode_modified_utf8(&[0xC0]).is_err());
        assert!(decode_modified_utf8(&[0xE0, 0x80, 0x41]).is_err());
        assert!(decode_modified_utf8(&[0xF0, 0x80, 0x80, 0x80]).is_err());
        assert!(decode_modified_utf8(&[237, 160, 128]).is_err());
    }
}
