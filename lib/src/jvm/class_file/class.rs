use crate::jvm::class_file::{
    Attribute, ClassConstantIndex, ConstantIndex, ConstantPool, Field, Method, Version,
};
use crate::jvm::{read_bytes, ClassAccessFlags, Deserialize, Error, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Representation of the [`class` file format of the JVM][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub version: Version,
    pub constants: ConstantPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: ClassConstantIndex,

    /// Only `java/lang/Object` has no super class
    pub super_class: Option<ClassConstantIndex>,
    pub interfaces: Vec<ClassConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

    /// Empty class (no members or attributes) with the given name and super class
    pub fn new(
        version: Version,
        access_flags: ClassAccessFlags,
        this_class: &str,
        super_class: Option<&str>,
    ) -> Result<ClassFile, Error> {
        let mut constants = ConstantPool::new();
        let this_class = constants.add_class(this_class)?;
        let super_class = super_class
            .map(|super_class| constants.add_class(super_class))
            .transpose()?;
        Ok(ClassFile {
            version,
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        })
    }

    /// Decode a class file, which must span the entire input
    pub fn parse(bytes: &[u8]) -> Result<ClassFile, Error> {
        ClassFile::from_bytes(bytes)
    }

    /// Internal name of the class (eg. `java/lang/String`)
    pub fn class_name(&self) -> Result<&str, Error> {
        self.constants.get_class_name(self.this_class)
    }

    pub fn super_class_name(&self) -> Result<Option<&str>, Error> {
        self.super_class
            .map(|super_class| self.constants.get_class_name(super_class))
            .transpose()
    }

    /// Find a method by name and descriptor
    pub fn find_method(&self, name: &str, descriptor: &str) -> Result<Option<&Method>, Error> {
        for method in &self.methods {
            if method.name(&self.constants)? == name
                && method.descriptor(&self.constants)? == descriptor
            {
                return Ok(Some(method));
            }
        }
        Ok(None)
    }
}

impl Serialize for ClassFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_all(&ClassFile::MAGIC)?;
        self.version.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        match self.super_class {
            None => 0u16.serialize(writer)?,
            Some(super_class) => super_class.serialize(writer)?,
        }
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for ClassFile {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let magic = read_bytes(reader, 4)?;
        if magic != ClassFile::MAGIC {
            return Err(Error::Format(format!(
                "bad magic number {:02X?} (expected CAFEBABE)",
                magic
            )));
        }
        let version = Version::deserialize(reader)?;
        let constants = ConstantPool::deserialize(reader)?;
        let access_flags = ClassAccessFlags::deserialize(reader)?;
        let this_class = ClassConstantIndex::deserialize(reader)?;
        let super_class = match ClassConstantIndex::deserialize(reader)? {
            ClassConstantIndex(ConstantIndex(0)) => None,
            other => Some(other),
        };
        Ok(ClassFile {
            version,
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces: Vec::deserialize(reader)?,
            fields: Vec::deserialize(reader)?,
            methods: Vec::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_class_round_trip() {
        let class = ClassFile::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            "me/Foo",
            Some("java/lang/Object"),
        )
        .unwrap();
        let bytes = class.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &ClassFile::MAGIC);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 52]);

        let decoded = ClassFile::parse(&bytes).unwrap();
        assert_eq!(decoded.class_name().unwrap(), "me/Foo");
        assert_eq!(decoded.super_class_name().unwrap(), Some("java/lang/Object"));
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn methods_by_name_and_descriptor() {
        let mut class = ClassFile::new(Version::JAVA8, ClassAccessFlags::PUBLIC, "Foo", None).unwrap();
        for descriptor in ["()V", "(I)V"] {
            let method = Method {
                access_flags: crate::jvm::MethodAccessFlags::STATIC,
                name_index: class.constants.add_utf8("run").unwrap(),
                descriptor_index: class.constants.add_utf8(descriptor).unwrap(),
                attributes: vec![],
            };
            class.methods.push(method);
        }

        let found = class.find_method("run", "(I)V").unwrap().unwrap();
        assert_eq!(found.descriptor(&class.constants).unwrap(), "(I)V");
        assert!(class.find_method("run", "(J)V").unwrap().is_none());
        assert!(class.find_method("walk", "()V").unwrap().is_none());
    }

    #[test]
    fn bad_magic() {
        let err = ClassFile::parse(&[0xCA, 0xFE, 0xBA, 0xBF, 0, 0, 0, 52]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn huge_attribute_length() {
        let mut class = ClassFile::new(Version::JAVA8, ClassAccessFlags::PUBLIC, "Foo", None).unwrap();
        let name_index = class.constants.add_utf8("Custom").unwrap();
        class.attributes.push(Attribute {
            name_index,
            info: vec![],
        });
        let mut bytes = class.to_bytes().unwrap();

        // The attribute is last, so its length is in the final four bytes
        let length_at = bytes.len() - 4;
        bytes[length_at..].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xF0]);
        assert!(matches!(ClassFile::parse(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn truncated_and_trailing_bytes() {
        let class = ClassFile::new(Version::JAVA8, ClassAccessFlags::PUBLIC, "Foo", None).unwrap();
        let mut bytes = class.to_bytes().unwrap();
        for len in 0..bytes.len() {
            assert!(matches!(ClassFile::parse(&bytes[..len]), Err(Error::Format(_))));
        }
        bytes.push(0);
        assert!(matches!(ClassFile::parse(&bytes), Err(Error::Format(_))));
    }
}
