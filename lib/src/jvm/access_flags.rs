use crate::jvm::{Deserialize, Error, Serialize};
use bitflags::bitflags;
use byteorder::{ReadBytesExt, WriteBytesExt};

bitflags! {
    /// Access flags on classes
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Access flags on fields
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.5-200-A.1
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

/// Visibility flags which are mutually exclusive on fields and methods
const VISIBILITY: u16 = 0x0001 | 0x0002 | 0x0004;

impl MethodAccessFlags {
    /// At most one of `public`, `private`, `protected` is set
    pub fn has_valid_visibility(&self) -> bool {
        (self.bits() & VISIBILITY).count_ones() <= 1
    }
}

impl FieldAccessFlags {
    /// At most one of `public`, `private`, `protected` is set
    pub fn has_valid_visibility(&self) -> bool {
        (self.bits() & VISIBILITY).count_ones() <= 1
    }
}

/// Bits not assigned a meaning are ignored when reading, as the JVM does
macro_rules! flags_codec {
    ($flags:ty) => {
        impl Serialize for $flags {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
                self.bits().serialize(writer)
            }
        }

        impl Deserialize for $flags {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
                Ok(<$flags>::from_bits_truncate(u16::deserialize(reader)?))
            }
        }
    };
}

flags_codec!(ClassAccessFlags);
flags_codec!(MethodAccessFlags);
flags_codec!(FieldAccessFlags);
