use crate::jvm::{Deserialize, Error, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fmt;

/// Version of the class file, which is used to verify that the JVM has the
/// necessary features to interpret the class
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major_version: u16,
    pub minor_version: u16,
}

impl Version {
    /// JVM class file version corresponding to Java SE 6
    pub const JAVA6: Version = Version {
        major_version: 50,
        minor_version: 0,
    };

    /// JVM class file version corresponding to Java SE 7 (first to forbid `jsr`/`ret`)
    pub const JAVA7: Version = Version {
        major_version: 51,
        minor_version: 0,
    };

    /// JVM class file version corresponding to Java SE 8 (released March 2014)
    pub const JAVA8: Version = Version {
        major_version: 52,
        minor_version: 0,
    };

    /// JVM class file version corresponding to Java SE 17
    pub const JAVA17: Version = Version {
        major_version: 61,
        minor_version: 0,
    };
}

/// Minor version comes first in the class file
impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Version {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let minor_version = u16::deserialize(reader)?;
        let major_version = u16::deserialize(reader)?;
        Ok(Version {
            major_version,
            minor_version,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major_version, self.minor_version)
    }
}
