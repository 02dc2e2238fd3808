use crate::jvm::class_file::ConstantIndex;
use crate::jvm::code::{Facets, OperandShape, Opcode};
use crate::jvm::{BaseType, Deserialize, Error, Serialize};
use byteorder::WriteBytesExt;
use std::fmt;
use std::io::Cursor;

/// Bytecode instruction
///
/// Instructions are grouped by the shape of their operands rather than by opcode, so every
/// variant except `Plain` is shared by several opcodes. The `Target` parameter is what branch
/// operands point at: relative `i32` offsets when the instruction was just decoded (or is about to
/// be encoded), and [`super::InstructionHandle`] inside an [`super::InstructionList`].
///
/// Local variable and `iinc` instructions only get a `wide` prefix when their operands need it,
/// and `ldc` with an index past 255 is written as `ldc_w`.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html#jvms-6.5
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction<Target> {
    /// Instruction without operands (including `iload_0` and friends)
    Plain(Opcode),

    BiPush(i8),
    SiPush(i16),

    /// Instruction whose only operand is a constant pool index
    Constant(Opcode, ConstantIndex),

    /// Load, store, or `ret` with an explicit local variable index
    Local(Opcode, u16),

    IInc {
        index: u16,
        delta: i16,
    },

    InvokeInterface {
        method: ConstantIndex,
        count: u8,
    },

    InvokeDynamic(ConstantIndex),

    NewArray(BaseType),

    MultiANewArray {
        class: ConstantIndex,
        dimensions: u8,
    },

    /// Conditional or unconditional jump (including `jsr`)
    Branch(Opcode, Target),

    /// Jump table indexed by `value - low`
    TableSwitch {
        default: Target,
        low: i32,
        targets: Vec<Target>,
    },

    LookupSwitch(Select<Target>),
}

/// Lookup switch operands
///
/// Keys and targets are paired up positionally. Keys are _not_ required to be sorted.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Select<Target> {
    keys: Vec<i32>,
    targets: Vec<Target>,
    default: Target,
}

impl<Target> Select<Target> {
    pub fn new(keys: Vec<i32>, targets: Vec<Target>, default: Target) -> Result<Self, Error> {
        if keys.len() != targets.len() {
            return Err(Error::InvalidSelect {
                keys: keys.len(),
                targets: targets.len(),
            });
        }
        Ok(Select {
            keys,
            targets,
            default,
        })
    }

    pub fn keys(&self) -> &[i32] {
        &self.keys
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn default(&self) -> &Target {
        &self.default
    }

    /// Key-target pairs, in order
    pub fn pairs(&self) -> impl Iterator<Item = (i32, &Target)> + '_ {
        self.keys.iter().copied().zip(self.targets.iter())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Padding needed after an opcode at `offset` so that the next byte is 4-byte aligned
pub fn switch_padding(offset: usize) -> usize {
    (4 - (offset + 1) % 4) % 4
}

impl<Target> Instruction<Target> {
    /// Opcode written out for this instruction
    ///
    /// This is the opcode that was given, so an `ldc` past index 255 still reports `ldc`.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Plain(op)
            | Instruction::Constant(op, _)
            | Instruction::Local(op, _)
            | Instruction::Branch(op, _) => *op,
            Instruction::BiPush(_) => Opcode::BIPUSH,
            Instruction::SiPush(_) => Opcode::SIPUSH,
            Instruction::IInc { .. } => Opcode::IINC,
            Instruction::InvokeInterface { .. } => Opcode::INVOKEINTERFACE,
            Instruction::InvokeDynamic(_) => Opcode::INVOKEDYNAMIC,
            Instruction::NewArray(_) => Opcode::NEWARRAY,
            Instruction::MultiANewArray { .. } => Opcode::MULTIANEWARRAY,
            Instruction::TableSwitch { .. } => Opcode::TABLESWITCH,
            Instruction::LookupSwitch(_) => Opcode::LOOKUPSWITCH,
        }
    }

    pub fn facets(&self) -> Facets {
        self.opcode().facets()
    }

    /// Local variable read or written (implicit indices included)
    pub fn local_index(&self) -> Option<u16> {
        match self {
            Instruction::Local(_, index) | Instruction::IInc { index, .. } => Some(*index),
            Instruction::Plain(op) => op.local_access().and_then(|access| access.implicit_index),
            _ => None,
        }
    }

    /// Number of bytes this instruction takes up when it starts at `offset`
    pub fn width_at(&self, offset: usize) -> usize {
        match self {
            Instruction::Plain(_) => 1,
            Instruction::BiPush(_) | Instruction::NewArray(_) => 2,
            Instruction::SiPush(_) => 3,
            Instruction::Constant(op, ConstantIndex(index)) => {
                if *op == Opcode::LDC && *index <= u8::MAX as u16 {
                    2
                } else {
                    3
                }
            }
            Instruction::Local(_, index) => {
                if *index <= u8::MAX as u16 {
                    2
                } else {
                    4
                }
            }
            Instruction::IInc { index, delta } => {
                if *index <= u8::MAX as u16 && i8::try_from(*delta).is_ok() {
                    3
                } else {
                    6
                }
            }
            Instruction::InvokeInterface { .. } | Instruction::InvokeDynamic(_) => 5,
            Instruction::MultiANewArray { .. } => 4,
            Instruction::Branch(op, _) => {
                if op.shape() == Some(OperandShape::BranchWide) {
                    5
                } else {
                    3
                }
            }
            Instruction::TableSwitch { targets, .. } => {
                1 + switch_padding(offset) + 12 + 4 * targets.len()
            }
            Instruction::LookupSwitch(select) => {
                1 + switch_padding(offset) + 8 + 8 * select.len()
            }
        }
    }

    /// Branch targets, in operand order (switch defaults come first)
    pub fn targets(&self) -> Vec<&Target> {
        match self {
            Instruction::Branch(_, target) => vec![target],
            Instruction::TableSwitch {
                default, targets, ..
            } => std::iter::once(default).chain(targets.iter()).collect(),
            Instruction::LookupSwitch(select) => std::iter::once(&select.default)
                .chain(select.targets.iter())
                .collect(),
            _ => vec![],
        }
    }

    pub fn targets_mut(&mut self) -> Vec<&mut Target> {
        match self {
            Instruction::Branch(_, target) => vec![target],
            Instruction::TableSwitch {
                default, targets, ..
            } => std::iter::once(default).chain(targets.iter_mut()).collect(),
            Instruction::LookupSwitch(select) => std::iter::once(&mut select.default)
                .chain(select.targets.iter_mut())
                .collect(),
            _ => vec![],
        }
    }

    /// Replace every branch target, possibly failing
    pub fn try_map_targets<T2, E>(
        &self,
        mut f: impl FnMut(&Target) -> Result<T2, E>,
    ) -> Result<Instruction<T2>, E> {
        Ok(match self {
            Instruction::Plain(op) => Instruction::Plain(*op),
            Instruction::BiPush(b) => Instruction::BiPush(*b),
            Instruction::SiPush(s) => Instruction::SiPush(*s),
            Instruction::Constant(op, idx) => Instruction::Constant(*op, *idx),
            Instruction::Local(op, idx) => Instruction::Local(*op, *idx),
            Instruction::IInc { index, delta } => Instruction::IInc {
                index: *index,
                delta: *delta,
            },
            Instruction::InvokeInterface { method, count } => Instruction::InvokeInterface {
                method: *method,
                count: *count,
            },
            Instruction::InvokeDynamic(idx) => Instruction::InvokeDynamic(*idx),
            Instruction::NewArray(typ) => Instruction::NewArray(*typ),
            Instruction::MultiANewArray { class, dimensions } => Instruction::MultiANewArray {
                class: *class,
                dimensions: *dimensions,
            },
            Instruction::Branch(op, target) => Instruction::Branch(*op, f(target)?),
            Instruction::TableSwitch {
                default,
                low,
                targets,
            } => Instruction::TableSwitch {
                default: f(default)?,
                low: *low,
                targets: targets.iter().map(&mut f).collect::<Result<_, E>>()?,
            },
            Instruction::LookupSwitch(select) => Instruction::LookupSwitch(Select {
                keys: select.keys.clone(),
                targets: select.targets.iter().map(&mut f).collect::<Result<_, E>>()?,
                default: f(&select.default)?,
            }),
        })
    }

    /// Check that the opcode fits the variant it is stored in
    fn check_shape(&self) -> Result<(), Error> {
        let op = self.opcode();
        let shape = op.shape().ok_or_else(|| {
            Error::Format(format!("invalid opcode {:#04x}", op.0))
        })?;
        let ok = match self {
            Instruction::Plain(_) => shape == OperandShape::None,
            Instruction::Constant(..) => {
                matches!(shape, OperandShape::Constant | OperandShape::ConstantU8)
            }
            Instruction::Local(..) => shape == OperandShape::Local,
            Instruction::Branch(..) => {
                matches!(shape, OperandShape::Branch | OperandShape::BranchWide)
            }
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Format(format!(
                "{} does not take operands of shape {:?}",
                op, shape
            )))
        }
    }
}

impl Instruction<i32> {
    /// Write out the instruction, assuming it starts at `offset` in the code array
    pub fn serialize_at<W: WriteBytesExt>(&self, writer: &mut W, offset: usize) -> Result<(), Error> {
        self.check_shape()?;
        match self {
            Instruction::Plain(op) => op.0.serialize(writer)?,
            Instruction::BiPush(b) => {
                Opcode::BIPUSH.0.serialize(writer)?;
                b.serialize(writer)?;
            }
            Instruction::SiPush(s) => {
                Opcode::SIPUSH.0.serialize(writer)?;
                s.serialize(writer)?;
            }
            Instruction::Constant(op, idx) => match u8::try_from(idx.0) {
                Ok(idx) if *op == Opcode::LDC => {
                    Opcode::LDC.0.serialize(writer)?;
                    idx.serialize(writer)?;
                }
                _ => {
                    let op = if *op == Opcode::LDC { Opcode::LDC_W } else { *op };
                    op.0.serialize(writer)?;
                    idx.serialize(writer)?;
                }
            },
            Instruction::Local(op, idx) => match u8::try_from(*idx) {
                Ok(idx) => {
                    op.0.serialize(writer)?;
                    idx.serialize(writer)?;
                }
                Err(_) => {
                    Opcode::WIDE.0.serialize(writer)?;
                    op.0.serialize(writer)?;
                    idx.serialize(writer)?;
                }
            },
            Instruction::IInc { index, delta } => {
                match (u8::try_from(*index), i8::try_from(*delta)) {
                    (Ok(index), Ok(delta)) => {
                        Opcode::IINC.0.serialize(writer)?;
                        index.serialize(writer)?;
                        delta.serialize(writer)?;
                    }
                    _ => {
                        Opcode::WIDE.0.serialize(writer)?;
                        Opcode::IINC.0.serialize(writer)?;
                        index.serialize(writer)?;
                        delta.serialize(writer)?;
                    }
                }
            }
            Instruction::InvokeInterface { method, count } => {
                Opcode::INVOKEINTERFACE.0.serialize(writer)?;
                method.serialize(writer)?;
                count.serialize(writer)?;
                0u8.serialize(writer)?;
            }
            Instruction::InvokeDynamic(idx) => {
                Opcode::INVOKEDYNAMIC.0.serialize(writer)?;
                idx.serialize(writer)?;
                0u16.serialize(writer)?;
            }
            Instruction::NewArray(typ) => {
                Opcode::NEWARRAY.0.serialize(writer)?;
                typ.array_type_code().serialize(writer)?;
            }
            Instruction::MultiANewArray { class, dimensions } => {
                Opcode::MULTIANEWARRAY.0.serialize(writer)?;
                class.serialize(writer)?;
                dimensions.serialize(writer)?;
            }
            Instruction::Branch(op, target) => {
                op.0.serialize(writer)?;
                if op.shape() == Some(OperandShape::BranchWide) {
                    target.serialize(writer)?;
                } else {
                    let target = i16::try_from(*target).map_err(|_| {
                        Error::Format(format!("{} offset {} does not fit in 16 bits", op, target))
                    })?;
                    target.serialize(writer)?;
                }
            }
            Instruction::TableSwitch {
                default,
                low,
                targets,
            } => {
                let high = i32::try_from(targets.len())
                    .ok()
                    .filter(|len| *len > 0)
                    .and_then(|len| low.checked_add(len - 1))
                    .ok_or_else(|| {
                        Error::Format(format!(
                            "tableswitch from {} with {} targets has no valid high key",
                            low,
                            targets.len()
                        ))
                    })?;
                Opcode::TABLESWITCH.0.serialize(writer)?;
                for _ in 0..switch_padding(offset) {
                    0u8.serialize(writer)?;
                }
                default.serialize(writer)?;
                low.serialize(writer)?;
                high.serialize(writer)?;
                for target in targets {
                    target.serialize(writer)?;
                }
            }
            Instruction::LookupSwitch(select) => {
                let npairs = i32::try_from(select.len()).map_err(|_| Error::ValueTooLarge {
                    what: "lookupswitch pairs",
                    value: select.len(),
                    max: i32::MAX as usize,
                })?;
                Opcode::LOOKUPSWITCH.0.serialize(writer)?;
                for _ in 0..switch_padding(offset) {
                    0u8.serialize(writer)?;
                }
                select.default.serialize(writer)?;
                npairs.serialize(writer)?;
                for (key, target) in select.pairs() {
                    key.serialize(writer)?;
                    target.serialize(writer)?;
                }
            }
        }
        Ok(())
    }

    /// Decode the instruction starting at `offset` in a code array
    ///
    /// Returns the instruction (with branch targets relative to `offset`) and its width.
    pub fn decode_at(code: &[u8], offset: usize) -> Result<(Instruction<i32>, usize), Error> {
        let bytes = code.get(offset..).unwrap_or(&[]);
        let mut cursor = Cursor::new(bytes);
        let reader = &mut cursor;

        let op = Opcode(u8::deserialize(reader)?);
        let shape = op.shape().ok_or_else(|| {
            Error::Format(format!("invalid opcode {:#04x} at offset {}", op.0, offset))
        })?;

        let insn = match shape {
            OperandShape::None => Instruction::Plain(op),
            OperandShape::Byte => Instruction::BiPush(i8::deserialize(reader)?),
            OperandShape::Short => Instruction::SiPush(i16::deserialize(reader)?),
            OperandShape::Local => Instruction::Local(op, u8::deserialize(reader)? as u16),
            OperandShape::IInc => Instruction::IInc {
                index: u8::deserialize(reader)? as u16,
                delta: i8::deserialize(reader)? as i16,
            },
            OperandShape::ConstantU8 => {
                Instruction::Constant(op, ConstantIndex(u8::deserialize(reader)? as u16))
            }
            OperandShape::Constant => Instruction::Constant(op, ConstantIndex::deserialize(reader)?),
            OperandShape::InvokeInterface => {
                let method = ConstantIndex::deserialize(reader)?;
                let count = u8::deserialize(reader)?;
                if u8::deserialize(reader)? != 0 {
                    return Err(Error::Format(format!(
                        "invokeinterface at offset {} has a non-zero fourth operand byte",
                        offset
                    )));
                }
                Instruction::InvokeInterface { method, count }
            }
            OperandShape::InvokeDynamic => {
                let idx = ConstantIndex::deserialize(reader)?;
                if u16::deserialize(reader)? != 0 {
                    return Err(Error::Format(format!(
                        "invokedynamic at offset {} has non-zero padding bytes",
                        offset
                    )));
                }
                Instruction::InvokeDynamic(idx)
            }
            OperandShape::NewArray => {
                let code = u8::deserialize(reader)?;
                let typ = BaseType::from_array_type_code(code).ok_or_else(|| {
                    Error::Format(format!(
                        "newarray at offset {} has invalid type code {}",
                        offset, code
                    ))
                })?;
                Instruction::NewArray(typ)
            }
            OperandShape::MultiANewArray => Instruction::MultiANewArray {
                class: ConstantIndex::deserialize(reader)?,
                dimensions: u8::deserialize(reader)?,
            },
            OperandShape::Branch => Instruction::Branch(op, i16::deserialize(reader)? as i32),
            OperandShape::BranchWide => Instruction::Branch(op, i32::deserialize(reader)?),
            OperandShape::TableSwitch => {
                for _ in 0..switch_padding(offset) {
                    u8::deserialize(reader)?;
                }
                let default = i32::deserialize(reader)?;
                let low = i32::deserialize(reader)?;
                let high = i32::deserialize(reader)?;
                if low > high {
                    return Err(Error::Format(format!(
                        "tableswitch at offset {} has low {} > high {}",
                        offset, low, high
                    )));
                }
                let count = (high as i64 - low as i64 + 1) as usize;
                check_remaining(reader, count, 4, offset)?;
                let mut targets = Vec::with_capacity(count);
                for _ in 0..count {
                    targets.push(i32::deserialize(reader)?);
                }
                Instruction::TableSwitch {
                    default,
                    low,
                    targets,
                }
            }
            OperandShape::LookupSwitch => {
                for _ in 0..switch_padding(offset) {
                    u8::deserialize(reader)?;
                }
                let default = i32::deserialize(reader)?;
                let npairs = i32::deserialize(reader)?;
                let count = usize::try_from(npairs).map_err(|_| {
                    Error::Format(format!(
                        "lookupswitch at offset {} has negative pair count {}",
                        offset, npairs
                    ))
                })?;
                check_remaining(reader, count, 8, offset)?;
                let mut keys = Vec::with_capacity(count);
                let mut targets = Vec::with_capacity(count);
                for _ in 0..count {
                    keys.push(i32::deserialize(reader)?);
                    targets.push(i32::deserialize(reader)?);
                }
                Instruction::LookupSwitch(Select {
                    keys,
                    targets,
                    default,
                })
            }
            OperandShape::Wide => {
                let modified = Opcode(u8::deserialize(reader)?);
                if modified == Opcode::IINC {
                    Instruction::IInc {
                        index: u16::deserialize(reader)?,
                        delta: i16::deserialize(reader)?,
                    }
                } else if modified.is_widenable() {
                    Instruction::Local(modified, u16::deserialize(reader)?)
                } else {
                    return Err(Error::Format(format!(
                        "wide at offset {} cannot modify {}",
                        offset, modified
                    )));
                }
            }
        };

        Ok((insn, cursor.position() as usize))
    }
}

/// Fail early if a count of `size`-byte entries can't fit in what is left of the code array
fn check_remaining(
    cursor: &Cursor<&[u8]>,
    count: usize,
    size: usize,
    offset: usize,
) -> Result<(), Error> {
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if count.saturating_mul(size) > remaining {
        return Err(Error::Format(format!(
            "switch at offset {} has {} entries, but only {} bytes remain",
            offset, count, remaining
        )));
    }
    Ok(())
}

fn base_type_name(typ: BaseType) -> &'static str {
    match typ {
        BaseType::Boolean => "boolean",
        BaseType::Char => "char",
        BaseType::Float => "float",
        BaseType::Double => "double",
        BaseType::Byte => "byte",
        BaseType::Short => "short",
        BaseType::Int => "int",
        BaseType::Long => "long",
    }
}

/// One line `mnemonic operands` description
impl<Target: fmt::Debug> fmt::Display for Instruction<Target> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.opcode().mnemonic();
        match self {
            Instruction::Plain(_) => f.write_str(mnemonic),
            Instruction::BiPush(b) => write!(f, "{} {}", mnemonic, b),
            Instruction::SiPush(s) => write!(f, "{} {}", mnemonic, s),
            Instruction::Constant(_, idx) | Instruction::InvokeDynamic(idx) => {
                write!(f, "{} #{}", mnemonic, idx.0)
            }
            Instruction::Local(_, idx) => write!(f, "{} {}", mnemonic, idx),
            Instruction::IInc { index, delta } => write!(f, "{} {} {}", mnemonic, index, delta),
            Instruction::InvokeInterface { method, count } => {
                write!(f, "{} #{} {}", mnemonic, method.0, count)
            }
            Instruction::NewArray(typ) => write!(f, "{} {}", mnemonic, base_type_name(*typ)),
            Instruction::MultiANewArray { class, dimensions } => {
                write!(f, "{} #{} {}", mnemonic, class.0, dimensions)
            }
            Instruction::Branch(_, target) => write!(f, "{} {:?}", mnemonic, target),
            Instruction::TableSwitch {
                default,
                low,
                targets,
            } => {
                write!(f, "{} {{", mnemonic)?;
                for (i, target) in targets.iter().enumerate() {
                    let key = *low as i64 + i as i64;
                    write!(f, " {}: {:?},", key, target)?;
                }
                write!(f, " default: {:?} }}", default)
            }
            Instruction::LookupSwitch(select) => {
                write!(f, "{} {{", mnemonic)?;
                for (key, target) in select.pairs() {
                    write!(f, " {}: {:?},", key, target)?;
                }
                write!(f, " default: {:?} }}", select.default)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode(insn: &Instruction<i32>, offset: usize) -> Vec<u8> {
        let mut bytes = vec![];
        insn.serialize_at(&mut bytes, offset).unwrap();
        assert_eq!(bytes.len(), insn.width_at(offset), "{}", insn);
        bytes
    }

    #[test]
    fn lookupswitch_alignment() {
        let select = Select::new(vec![1, 5], vec![20, 30], 40).unwrap();
        let insn = Instruction::LookupSwitch(select);
        assert_eq!(insn.width_at(1), 27);
        assert_eq!(insn.width_at(3), 25);

        let bytes = encode(&insn, 1);
        assert_eq!(&bytes[..3], &[0xab, 0, 0]);
        assert_eq!(&bytes[3..7], &40i32.to_be_bytes());
        assert_eq!(&bytes[7..11], &2i32.to_be_bytes());

        // Decode in place, as if the opcode was at offset 1
        let mut code = vec![0x00];
        code.extend(&bytes);
        let (decoded, width) = Instruction::decode_at(&code, 1).unwrap();
        assert_eq!(width, 27);
        assert_eq!(decoded, insn);
    }

    #[test]
    fn tableswitch_round_trip() {
        let insn = Instruction::TableSwitch {
            default: -4,
            low: -1,
            targets: vec![8, 12, 16],
        };
        for offset in 0..4 {
            let mut code = vec![0x00; offset];
            code.extend(encode(&insn, offset));
            let (decoded, width) = Instruction::decode_at(&code, offset).unwrap();
            assert_eq!(decoded, insn);
            assert_eq!(width, insn.width_at(offset));
        }
    }

    #[test]
    fn select_needs_matching_lengths() {
        assert!(matches!(
            Select::new(vec![1, 2], vec![3], 0),
            Err(Error::InvalidSelect {
                keys: 2,
                targets: 1
            })
        ));
    }

    #[test]
    fn newarray_type_codes() {
        let (insn, width) = Instruction::decode_at(&[0xbc, 10], 0).unwrap();
        assert_eq!(insn, Instruction::NewArray(BaseType::Int));
        assert_eq!(width, 2);
        assert!(matches!(
            Instruction::decode_at(&[0xbc, 3], 0),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            Instruction::decode_at(&[0xbc, 12], 0),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn wide_forms() {
        let load = Instruction::Local(Opcode::ALOAD, 300);
        assert_eq!(encode(&load, 0), vec![0xc4, 0x19, 0x01, 0x2c]);
        assert_eq!(Instruction::decode_at(&[0xc4, 0x19, 0x01, 0x2c], 0).unwrap(), (load, 4));

        // Narrow operands are re-emitted without the prefix
        let (small, width) = Instruction::decode_at(&[0xc4, 0x15, 0x00, 0x02], 0).unwrap();
        assert_eq!(width, 4);
        assert_eq!(encode(&small, 0), vec![0x15, 0x02]);

        let inc = Instruction::IInc {
            index: 1,
            delta: 1000,
        };
        assert_eq!(encode(&inc, 0), vec![0xc4, 0x84, 0x00, 0x01, 0x03, 0xe8]);

        assert!(matches!(
            Instruction::decode_at(&[0xc4, 0x60], 0),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn ldc_widens() {
        assert_eq!(
            encode(&Instruction::Constant(Opcode::LDC, ConstantIndex(7)), 0),
            vec![0x12, 7]
        );
        assert_eq!(
            encode(&Instruction::Constant(Opcode::LDC, ConstantIndex(300)), 0),
            vec![0x13, 0x01, 0x2c]
        );
        assert_eq!(
            encode(&Instruction::Constant(Opcode::LDC_W, ConstantIndex(7)), 0),
            vec![0x13, 0x00, 0x07]
        );
    }

    #[test]
    fn malformed_code() {
        // Unknown opcode
        assert!(matches!(Instruction::decode_at(&[0xcb], 0), Err(Error::Format(_))));

        // Truncated operand
        assert!(matches!(Instruction::decode_at(&[0x11, 0x00], 0), Err(Error::Format(_))));

        // Switch claiming more pairs than there are bytes
        let mut code = vec![0xab, 0, 0, 0, 0, 0, 0, 0];
        code.extend(&i32::MAX.to_be_bytes());
        assert!(matches!(Instruction::decode_at(&code, 0), Err(Error::Format(_))));

        // Negative pair count
        let mut code = vec![0xab, 0, 0, 0, 0, 0, 0, 0];
        code.extend(&(-1i32).to_be_bytes());
        assert!(matches!(Instruction::decode_at(&code, 0), Err(Error::Format(_))));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut bytes = vec![];
        let bad: Instruction<i32> = Instruction::Plain(Opcode::GOTO);
        assert!(bad.serialize_at(&mut bytes, 0).is_err());
        let bad: Instruction<i32> = Instruction::Branch(Opcode::IADD, 3);
        assert!(bad.serialize_at(&mut bytes, 0).is_err());
    }

    #[test]
    fn short_branch_overflow() {
        let mut bytes = vec![];
        let far = Instruction::Branch(Opcode::GOTO, 40_000);
        assert!(far.serialize_at(&mut bytes, 0).is_err());
        let far_wide = Instruction::Branch(Opcode::GOTO_W, 40_000);
        assert_eq!(encode(&far_wide, 0).len(), 5);
    }

    #[test]
    fn display() {
        let insn: Instruction<i32> = Instruction::Local(Opcode::ILOAD, 4);
        assert_eq!(insn.to_string(), "iload 4");
        let insn: Instruction<i32> = Instruction::Branch(Opcode::IFNE, -3);
        assert_eq!(insn.to_string(), "ifne -3");
        let insn: Instruction<i32> = Instruction::NewArray(BaseType::Long);
        assert_eq!(insn.to_string(), "newarray long");
        let insn: Instruction<i32> =
            Instruction::LookupSwitch(Select::new(vec![3], vec![9], 12).unwrap());
        assert_eq!(insn.to_string(), "lookupswitch { 3: 9, default: 12 }");
    }

    #[test]
    fn implicit_local_indices() {
        let insn: Instruction<i32> = Instruction::Plain(Opcode::ISTORE_2);
        assert_eq!(insn.local_index(), Some(2));
        let insn: Instruction<i32> = Instruction::IInc { index: 7, delta: 1 };
        assert_eq!(insn.local_index(), Some(7));
    }
}
