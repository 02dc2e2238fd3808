use crate::jvm::class_file::{AttributeLike, BytecodeIndex, Utf8ConstantIndex};
use crate::jvm::{u16_length, Deserialize, Error, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};

/// Mapping from code offsets back to lines in the source file
///
/// Entries are kept in file order. Compilers emit them sorted by `start_pc`, which is what
/// [`LineNumberTable::source_line`] relies on, but unsorted tables are still accepted.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.12
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineNumberTable(pub Vec<LineNumber>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    /// Code offset where the line starts
    pub start_pc: BytecodeIndex,
    pub line_number: u16,
}

impl LineNumberTable {
    /// Source line for the instruction at this code offset
    ///
    /// Finds the entry starting exactly at `pc`, or else the closest one starting before it. Offsets
    /// before the first entry (including negative ones) have no line. On an unsorted table the
    /// answer is some line from the table, but which one is unspecified.
    pub fn source_line(&self, pc: i32) -> Option<u16> {
        if pc < 0 {
            return None;
        }
        match self.0.binary_search_by_key(&pc, |entry| entry.start_pc.0 as i32) {
            Ok(found) => Some(self.0[found].line_number),
            Err(0) => None,
            Err(insert_at) => Some(self.0[insert_at - 1].line_number),
        }
    }
}

impl Serialize for LineNumberTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        let count = u16_length("line number table length", self.0.len())?;
        count.serialize(writer)?;
        for entry in &self.0 {
            entry.start_pc.serialize(writer)?;
            entry.line_number.serialize(writer)?;
        }
        Ok(())
    }
}

impl Deserialize for LineNumberTable {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let count = u16::deserialize(reader)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(LineNumber {
                start_pc: BytecodeIndex::deserialize(reader)?,
                line_number: u16::deserialize(reader)?,
            });
        }
        Ok(LineNumberTable(entries))
    }
}

impl AttributeLike for LineNumberTable {
    const NAME: &'static str = "LineNumberTable";
}

/// Names and types of local variables over ranges of code
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.13
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalVariableTable(pub Vec<LocalVariable>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: BytecodeIndex,

    /// Number of bytes, starting at `start_pc`, over which the variable is in scope
    pub length: u16,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub index: u16,
}

impl Serialize for LocalVariable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.start_pc.serialize(writer)?;
        self.length.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.index.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for LocalVariable {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(LocalVariable {
            start_pc: BytecodeIndex::deserialize(reader)?,
            length: u16::deserialize(reader)?,
            name_index: Utf8ConstantIndex::deserialize(reader)?,
            descriptor_index: Utf8ConstantIndex::deserialize(reader)?,
            index: u16::deserialize(reader)?,
        })
    }
}

impl Serialize for LocalVariableTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<(), Error> {
        self.0.serialize(writer)
    }
}

impl Deserialize for LocalVariableTable {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Vec::deserialize(reader).map(LocalVariableTable)
    }
}

impl AttributeLike for LocalVariableTable {
    const NAME: &'static str = "LocalVariableTable";
}
