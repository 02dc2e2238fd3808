use bitflags::bitflags;
use std::fmt;

/// Single byte instruction opcode
///
/// Every opcode of the instruction set has an associated constant (eg. [`Opcode::IADD`]) and an
/// entry in a shared table of [`OpcodeInfo`], which is how the rest of the crate asks questions
/// about instructions (what operands follow, does it branch, how does it affect the stack).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html#jvms-6.5
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode(pub u8);

/// Static description of an opcode
#[derive(Copy, Clone, Debug)]
pub struct OpcodeInfo {
    pub mnemonic: &'static str,
    pub shape: OperandShape,
    pub facets: Facets,
    pub effect: StackEffect,
}

/// Operands which follow an opcode in the code array
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandShape {
    /// No operands
    None,

    /// Signed byte (`bipush`)
    Byte,

    /// Signed short (`sipush`)
    Short,

    /// Local variable index (one byte, or two under `wide`)
    Local,

    /// Local variable index and signed increment (`iinc`)
    IInc,

    /// One byte constant pool index (`ldc`)
    ConstantU8,

    /// Two byte constant pool index
    Constant,

    /// Constant pool index, argument count, and a zero byte
    InvokeInterface,

    /// Constant pool index and two zero bytes
    InvokeDynamic,

    /// Array type code (`newarray`)
    NewArray,

    /// Constant pool index and dimension count
    MultiANewArray,

    /// Signed 16-bit branch offset
    Branch,

    /// Signed 32-bit branch offset
    BranchWide,

    TableSwitch,
    LookupSwitch,

    /// Prefix widening the operands of the next instruction
    Wide,
}

bitflags! {
    /// Capabilities of an instruction
    pub struct Facets: u32 {
        /// May transfer control somewhere other than the next instruction
        const BRANCH = 0x0001;

        /// Branch which may also fall through
        const CONDITIONAL = 0x0002;

        /// Multi-way branch (`tableswitch`, `lookupswitch`)
        const SELECT = 0x0004;

        /// Returns from the method
        const RETURN = 0x0008;

        const EXCEPTION_THROWER = 0x0010;

        /// Has a constant pool index operand
        const CONSTANT_POOL = 0x0020;

        /// Reads or writes a local variable
        const LOCAL_VARIABLE = 0x0040;

        const INVOKE = 0x0080;
        const FIELD_ACCESS = 0x0100;
        const ALLOCATION = 0x0200;

        /// Pushes onto the operand stack
        const STACK_PRODUCER = 0x0400;

        /// Pops off the operand stack
        const STACK_CONSUMER = 0x0800;

        /// Encoded length depends on operands or position
        const VARIABLE_LENGTH = 0x1000;

        /// `jsr`, `jsr_w`, `ret`
        const SUBROUTINE = 0x2000;
    }
}

/// How an instruction changes the operand stack, in terms of value kinds
///
/// Kinds are written with one character per value, bottom of the stack first: `I` (int), `J`
/// (long), `F` (float), `D` (double), and `A` (initialized reference or `null`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StackEffect {
    Fixed {
        pops: &'static str,
        pushes: &'static str,
    },

    /// Depends on operands, constants, local variables, or the shape of the stack
    Special,
}

/// Kind of value, as far as loads, stores and array accesses are concerned
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl ValueKind {
    pub fn from_code(code: char) -> Option<ValueKind> {
        Some(match code {
            'I' => ValueKind::Int,
            'J' => ValueKind::Long,
            'F' => ValueKind::Float,
            'D' => ValueKind::Double,
            'A' => ValueKind::Reference,
            _ => return None,
        })
    }

    /// Local variable slots used by this kind
    pub fn slots(&self) -> u16 {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            _ => 1,
        }
    }
}

/// Local variable access performed by a load or store instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LocalAccess {
    pub kind: ValueKind,
    pub is_store: bool,

    /// Index baked into the opcode (eg. `2` for `istore_2`)
    pub implicit_index: Option<u16>,
}

const LOCAL_KINDS: [ValueKind; 5] = [
    ValueKind::Int,
    ValueKind::Long,
    ValueKind::Float,
    ValueKind::Double,
    ValueKind::Reference,
];

impl Opcode {
    /// Table entry for this opcode (`None` for unassigned or reserved opcodes)
    pub fn info(self) -> Option<&'static OpcodeInfo> {
        OPCODE_TABLE[self.0 as usize].as_ref()
    }

    pub fn is_valid(self) -> bool {
        self.info().is_some()
    }

    pub fn mnemonic(self) -> &'static str {
        self.info().map_or("<invalid>", |info| info.mnemonic)
    }

    pub fn shape(self) -> Option<OperandShape> {
        self.info().map(|info| info.shape)
    }

    pub fn facets(self) -> Facets {
        self.info().map_or(Facets::empty(), |info| info.facets)
    }

    /// Local variable load/store performed by this opcode (not including `iinc` or `ret`)
    pub fn local_access(self) -> Option<LocalAccess> {
        let code = self.0;
        let (kind, is_store, implicit_index) = match code {
            0x15..=0x19 => (LOCAL_KINDS[(code - 0x15) as usize], false, None),
            0x1a..=0x2d => {
                let n = code - 0x1a;
                (LOCAL_KINDS[(n / 4) as usize], false, Some((n % 4) as u16))
            }
            0x36..=0x3a => (LOCAL_KINDS[(code - 0x36) as usize], true, None),
            0x3b..=0x4e => {
                let n = code - 0x3b;
                (LOCAL_KINDS[(n / 4) as usize], true, Some((n % 4) as u16))
            }
            _ => return None,
        };
        Some(LocalAccess {
            kind,
            is_store,
            implicit_index,
        })
    }

    /// Can this opcode follow a `wide` prefix?
    pub fn is_widenable(self) -> bool {
        matches!(self.0, 0x15..=0x19 | 0x36..=0x3a | 0x84 | 0xa9)
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

macro_rules! stack_effect {
    ((*)) => {
        StackEffect::Special
    };
    (($pops:literal => $pushes:literal)) => {
        StackEffect::Fixed {
            pops: $pops,
            pushes: $pushes,
        }
    };
}

macro_rules! opcodes {
    ($( $code:literal $konst:ident $mnemonic:literal $shape:ident [$($facet:ident)|*] $effect:tt; )*) => {
        impl Opcode {
            $( pub const $konst: Opcode = Opcode($code); )*
        }

        static OPCODE_TABLE: [Option<OpcodeInfo>; 256] = {
            let mut table: [Option<OpcodeInfo>; 256] = [None; 256];
            $(
                table[$code] = Some(OpcodeInfo {
                    mnemonic: $mnemonic,
                    shape: OperandShape::$shape,
                    facets: Facets::from_bits_truncate(0 $(| Facets::$facet.bits())*),
                    effect: stack_effect!($effect),
                });
            )*
            table
        };
    };
}

opcodes! {
    0x00 NOP "nop" None [] ("" => "");
    0x01 ACONST_NULL "aconst_null" None [STACK_PRODUCER] (*);
    0x02 ICONST_M1 "iconst_m1" None [STACK_PRODUCER] ("" => "I");
    0x03 ICONST_0 "iconst_0" None [STACK_PRODUCER] ("" => "I");
    0x04 ICONST_1 "iconst_1" None [STACK_PRODUCER] ("" => "I");
    0x05 ICONST_2 "iconst_2" None [STACK_PRODUCER] ("" => "I");
    0x06 ICONST_3 "iconst_3" None [STACK_PRODUCER] ("" => "I");
    0x07 ICONST_4 "iconst_4" None [STACK_PRODUCER] ("" => "I");
    0x08 ICONST_5 "iconst_5" None [STACK_PRODUCER] ("" => "I");
    0x09 LCONST_0 "lconst_0" None [STACK_PRODUCER] ("" => "J");
    0x0a LCONST_1 "lconst_1" None [STACK_PRODUCER] ("" => "J");
    0x0b FCONST_0 "fconst_0" None [STACK_PRODUCER] ("" => "F");
    0x0c FCONST_1 "fconst_1" None [STACK_PRODUCER] ("" => "F");
    0x0d FCONST_2 "fconst_2" None [STACK_PRODUCER] ("" => "F");
    0x0e DCONST_0 "dconst_0" None [STACK_PRODUCER] ("" => "D");
    0x0f DCONST_1 "dconst_1" None [STACK_PRODUCER] ("" => "D");
    0x10 BIPUSH "bipush" Byte [STACK_PRODUCER] ("" => "I");
    0x11 SIPUSH "sipush" Short [STACK_PRODUCER] ("" => "I");
    0x12 LDC "ldc" ConstantU8 [CONSTANT_POOL | STACK_PRODUCER | EXCEPTION_THROWER] (*);
    0x13 LDC_W "ldc_w" Constant [CONSTANT_POOL | STACK_PRODUCER | EXCEPTION_THROWER] (*);
    0x14 LDC2_W "ldc2_w" Constant [CONSTANT_POOL | STACK_PRODUCER] (*);
    0x15 ILOAD "iload" Local [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x16 LLOAD "lload" Local [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x17 FLOAD "fload" Local [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x18 DLOAD "dload" Local [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x19 ALOAD "aload" Local [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x1a ILOAD_0 "iload_0" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x1b ILOAD_1 "iload_1" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x1c ILOAD_2 "iload_2" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x1d ILOAD_3 "iload_3" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x1e LLOAD_0 "lload_0" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x1f LLOAD_1 "lload_1" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x20 LLOAD_2 "lload_2" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x21 LLOAD_3 "lload_3" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x22 FLOAD_0 "fload_0" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x23 FLOAD_1 "fload_1" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x24 FLOAD_2 "fload_2" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x25 FLOAD_3 "fload_3" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x26 DLOAD_0 "dload_0" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x27 DLOAD_1 "dload_1" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x28 DLOAD_2 "dload_2" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x29 DLOAD_3 "dload_3" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x2a ALOAD_0 "aload_0" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x2b ALOAD_1 "aload_1" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x2c ALOAD_2 "aload_2" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x2d ALOAD_3 "aload_3" None [LOCAL_VARIABLE | STACK_PRODUCER] (*);
    0x2e IALOAD "iaload" None [EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0x2f LALOAD "laload" None [EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0x30 FALOAD "faload" None [EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0x31 DALOAD "daload" None [EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0x32 AALOAD "aaload" None [EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0x33 BALOAD "baload" None [EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0x34 CALOAD "caload" None [EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0x35 SALOAD "saload" None [EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0x36 ISTORE "istore" Local [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x37 LSTORE "lstore" Local [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x38 FSTORE "fstore" Local [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x39 DSTORE "dstore" Local [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x3a ASTORE "astore" Local [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x3b ISTORE_0 "istore_0" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x3c ISTORE_1 "istore_1" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x3d ISTORE_2 "istore_2" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x3e ISTORE_3 "istore_3" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x3f LSTORE_0 "lstore_0" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x40 LSTORE_1 "lstore_1" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x41 LSTORE_2 "lstore_2" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x42 LSTORE_3 "lstore_3" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x43 FSTORE_0 "fstore_0" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x44 FSTORE_1 "fstore_1" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x45 FSTORE_2 "fstore_2" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x46 FSTORE_3 "fstore_3" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x47 DSTORE_0 "dstore_0" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x48 DSTORE_1 "dstore_1" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x49 DSTORE_2 "dstore_2" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x4a DSTORE_3 "dstore_3" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x4b ASTORE_0 "astore_0" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x4c ASTORE_1 "astore_1" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x4d ASTORE_2 "astore_2" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x4e ASTORE_3 "astore_3" None [LOCAL_VARIABLE | STACK_CONSUMER] (*);
    0x4f IASTORE "iastore" None [EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0x50 LASTORE "lastore" None [EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0x51 FASTORE "fastore" None [EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0x52 DASTORE "dastore" None [EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0x53 AASTORE "aastore" None [EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0x54 BASTORE "bastore" None [EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0x55 CASTORE "castore" None [EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0x56 SASTORE "sastore" None [EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0x57 POP "pop" None [STACK_CONSUMER] (*);
    0x58 POP2 "pop2" None [STACK_CONSUMER] (*);
    0x59 DUP "dup" None [STACK_CONSUMER | STACK_PRODUCER] (*);
    0x5a DUP_X1 "dup_x1" None [STACK_CONSUMER | STACK_PRODUCER] (*);
    0x5b DUP_X2 "dup_x2" None [STACK_CONSUMER | STACK_PRODUCER] (*);
    0x5c DUP2 "dup2" None [STACK_CONSUMER | STACK_PRODUCER] (*);
    0x5d DUP2_X1 "dup2_x1" None [STACK_CONSUMER | STACK_PRODUCER] (*);
    0x5e DUP2_X2 "dup2_x2" None [STACK_CONSUMER | STACK_PRODUCER] (*);
    0x5f SWAP "swap" None [STACK_CONSUMER | STACK_PRODUCER] (*);
    0x60 IADD "iadd" None [STACK_CONSUMER | STACK_PRODUCER] ("II" => "I");
    0x61 LADD "ladd" None [STACK_CONSUMER | STACK_PRODUCER] ("JJ" => "J");
    0x62 FADD "fadd" None [STACK_CONSUMER | STACK_PRODUCER] ("FF" => "F");
    0x63 DADD "dadd" None [STACK_CONSUMER | STACK_PRODUCER] ("DD" => "D");
    0x64 ISUB "isub" None [STACK_CONSUMER | STACK_PRODUCER] ("II" => "I");
    0x65 LSUB "lsub" None [STACK_CONSUMER | STACK_PRODUCER] ("JJ" => "J");
    0x66 FSUB "fsub" None [STACK_CONSUMER | STACK_PRODUCER] ("FF" => "F");
    0x67 DSUB "dsub" None [STACK_CONSUMER | STACK_PRODUCER] ("DD" => "D");
    0x68 IMUL "imul" None [STACK_CONSUMER | STACK_PRODUCER] ("II" => "I");
    0x69 LMUL "lmul" None [STACK_CONSUMER | STACK_PRODUCER] ("JJ" => "J");
    0x6a FMUL "fmul" None [STACK_CONSUMER | STACK_PRODUCER] ("FF" => "F");
    0x6b DMUL "dmul" None [STACK_CONSUMER | STACK_PRODUCER] ("DD" => "D");
    0x6c IDIV "idiv" None [STACK_CONSUMER | STACK_PRODUCER | EXCEPTION_THROWER] ("II" => "I");
    0x6d LDIV "ldiv" None [STACK_CONSUMER | STACK_PRODUCER | EXCEPTION_THROWER] ("JJ" => "J");
    0x6e FDIV "fdiv" None [STACK_CONSUMER | STACK_PRODUCER] ("FF" => "F");
    0x6f DDIV "ddiv" None [STACK_CONSUMER | STACK_PRODUCER] ("DD" => "D");
    0x70 IREM "irem" None [STACK_CONSUMER | STACK_PRODUCER | EXCEPTION_THROWER] ("II" => "I");
    0x71 LREM "lrem" None [STACK_CONSUMER | STACK_PRODUCER | EXCEPTION_THROWER] ("JJ" => "J");
    0x72 FREM "frem" None [STACK_CONSUMER | STACK_PRODUCER] ("FF" => "F");
    0x73 DREM "drem" None [STACK_CONSUMER | STACK_PRODUCER] ("DD" => "D");
    0x74 INEG "ineg" None [STACK_CONSUMER | STACK_PRODUCER] ("I" => "I");
    0x75 LNEG "lneg" None [STACK_CONSUMER | STACK_PRODUCER] ("J" => "J");
    0x76 FNEG "fneg" None [STACK_CONSUMER | STACK_PRODUCER] ("F" => "F");
    0x77 DNEG "dneg" None [STACK_CONSUMER | STACK_PRODUCER] ("D" => "D");
    0x78 ISHL "ishl" None [STACK_CONSUMER | STACK_PRODUCER] ("II" => "I");
    0x79 LSHL "lshl" None [STACK_CONSUMER | STACK_PRODUCER] ("JI" => "J");
    0x7a ISHR "ishr" None [STACK_CONSUMER | STACK_PRODUCER] ("II" => "I");
    0x7b LSHR "lshr" None [STACK_CONSUMER | STACK_PRODUCER] ("JI" => "J");
    0x7c IUSHR "iushr" None [STACK_CONSUMER | STACK_PRODUCER] ("II" => "I");
    0x7d LUSHR "lushr" None [STACK_CONSUMER | STACK_PRODUCER] ("JI" => "J");
    0x7e IAND "iand" None [STACK_CONSUMER | STACK_PRODUCER] ("II" => "I");
    0x7f LAND "land" None [STACK_CONSUMER | STACK_PRODUCER] ("JJ" => "J");
    0x80 IOR "ior" None [STACK_CONSUMER | STACK_PRODUCER] ("II" => "I");
    0x81 LOR "lor" None [STACK_CONSUMER | STACK_PRODUCER] ("JJ" => "J");
    0x82 IXOR "ixor" None [STACK_CONSUMER | STACK_PRODUCER] ("II" => "I");
    0x83 LXOR "lxor" None [STACK_CONSUMER | STACK_PRODUCER] ("JJ" => "J");
    0x84 IINC "iinc" IInc [LOCAL_VARIABLE] (*);
    0x85 I2L "i2l" None [STACK_CONSUMER | STACK_PRODUCER] ("I" => "J");
    0x86 I2F "i2f" None [STACK_CONSUMER | STACK_PRODUCER] ("I" => "F");
    0x87 I2D "i2d" None [STACK_CONSUMER | STACK_PRODUCER] ("I" => "D");
    0x88 L2I "l2i" None [STACK_CONSUMER | STACK_PRODUCER] ("J" => "I");
    0x89 L2F "l2f" None [STACK_CONSUMER | STACK_PRODUCER] ("J" => "F");
    0x8a L2D "l2d" None [STACK_CONSUMER | STACK_PRODUCER] ("J" => "D");
    0x8b F2I "f2i" None [STACK_CONSUMER | STACK_PRODUCER] ("F" => "I");
    0x8c F2L "f2l" None [STACK_CONSUMER | STACK_PRODUCER] ("F" => "J");
    0x8d F2D "f2d" None [STACK_CONSUMER | STACK_PRODUCER] ("F" => "D");
    0x8e D2I "d2i" None [STACK_CONSUMER | STACK_PRODUCER] ("D" => "I");
    0x8f D2L "d2l" None [STACK_CONSUMER | STACK_PRODUCER] ("D" => "J");
    0x90 D2F "d2f" None [STACK_CONSUMER | STACK_PRODUCER] ("D" => "F");
    0x91 I2B "i2b" None [STACK_CONSUMER | STACK_PRODUCER] ("I" => "I");
    0x92 I2C "i2c" None [STACK_CONSUMER | STACK_PRODUCER] ("I" => "I");
    0x93 I2S "i2s" None [STACK_CONSUMER | STACK_PRODUCER] ("I" => "I");
    0x94 LCMP "lcmp" None [STACK_CONSUMER | STACK_PRODUCER] ("JJ" => "I");
    0x95 FCMPL "fcmpl" None [STACK_CONSUMER | STACK_PRODUCER] ("FF" => "I");
    0x96 FCMPG "fcmpg" None [STACK_CONSUMER | STACK_PRODUCER] ("FF" => "I");
    0x97 DCMPL "dcmpl" None [STACK_CONSUMER | STACK_PRODUCER] ("DD" => "I");
    0x98 DCMPG "dcmpg" None [STACK_CONSUMER | STACK_PRODUCER] ("DD" => "I");
    0x99 IFEQ "ifeq" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("I" => "");
    0x9a IFNE "ifne" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("I" => "");
    0x9b IFLT "iflt" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("I" => "");
    0x9c IFGE "ifge" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("I" => "");
    0x9d IFGT "ifgt" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("I" => "");
    0x9e IFLE "ifle" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("I" => "");
    0x9f IF_ICMPEQ "if_icmpeq" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("II" => "");
    0xa0 IF_ICMPNE "if_icmpne" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("II" => "");
    0xa1 IF_ICMPLT "if_icmplt" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("II" => "");
    0xa2 IF_ICMPGE "if_icmpge" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("II" => "");
    0xa3 IF_ICMPGT "if_icmpgt" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("II" => "");
    0xa4 IF_ICMPLE "if_icmple" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("II" => "");
    0xa5 IF_ACMPEQ "if_acmpeq" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("AA" => "");
    0xa6 IF_ACMPNE "if_acmpne" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("AA" => "");
    0xa7 GOTO "goto" Branch [BRANCH] ("" => "");
    0xa8 JSR "jsr" Branch [BRANCH | SUBROUTINE | STACK_PRODUCER] (*);
    0xa9 RET "ret" Local [BRANCH | SUBROUTINE | LOCAL_VARIABLE] (*);
    0xaa TABLESWITCH "tableswitch" TableSwitch [BRANCH | SELECT | VARIABLE_LENGTH | STACK_CONSUMER] ("I" => "");
    0xab LOOKUPSWITCH "lookupswitch" LookupSwitch [BRANCH | SELECT | VARIABLE_LENGTH | STACK_CONSUMER] ("I" => "");
    0xac IRETURN "ireturn" None [RETURN | EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0xad LRETURN "lreturn" None [RETURN | EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0xae FRETURN "freturn" None [RETURN | EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0xaf DRETURN "dreturn" None [RETURN | EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0xb0 ARETURN "areturn" None [RETURN | EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0xb1 RETURN "return" None [RETURN | EXCEPTION_THROWER] (*);
    0xb2 GETSTATIC "getstatic" Constant [CONSTANT_POOL | FIELD_ACCESS | EXCEPTION_THROWER | STACK_PRODUCER] (*);
    0xb3 PUTSTATIC "putstatic" Constant [CONSTANT_POOL | FIELD_ACCESS | EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0xb4 GETFIELD "getfield" Constant [CONSTANT_POOL | FIELD_ACCESS | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xb5 PUTFIELD "putfield" Constant [CONSTANT_POOL | FIELD_ACCESS | EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0xb6 INVOKEVIRTUAL "invokevirtual" Constant [CONSTANT_POOL | INVOKE | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xb7 INVOKESPECIAL "invokespecial" Constant [CONSTANT_POOL | INVOKE | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xb8 INVOKESTATIC "invokestatic" Constant [CONSTANT_POOL | INVOKE | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xb9 INVOKEINTERFACE "invokeinterface" InvokeInterface [CONSTANT_POOL | INVOKE | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xba INVOKEDYNAMIC "invokedynamic" InvokeDynamic [CONSTANT_POOL | INVOKE | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xbb NEW "new" Constant [CONSTANT_POOL | ALLOCATION | EXCEPTION_THROWER | STACK_PRODUCER] (*);
    0xbc NEWARRAY "newarray" NewArray [ALLOCATION | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xbd ANEWARRAY "anewarray" Constant [CONSTANT_POOL | ALLOCATION | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xbe ARRAYLENGTH "arraylength" None [EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xbf ATHROW "athrow" None [EXCEPTION_THROWER | STACK_CONSUMER] (*);
    0xc0 CHECKCAST "checkcast" Constant [CONSTANT_POOL | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xc1 INSTANCEOF "instanceof" Constant [CONSTANT_POOL | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] ("A" => "I");
    0xc2 MONITORENTER "monitorenter" None [EXCEPTION_THROWER | STACK_CONSUMER] ("A" => "");
    0xc3 MONITOREXIT "monitorexit" None [EXCEPTION_THROWER | STACK_CONSUMER] ("A" => "");
    0xc4 WIDE "wide" Wide [VARIABLE_LENGTH] (*);
    0xc5 MULTIANEWARRAY "multianewarray" MultiANewArray [CONSTANT_POOL | ALLOCATION | EXCEPTION_THROWER | STACK_CONSUMER | STACK_PRODUCER] (*);
    0xc6 IFNULL "ifnull" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("A" => "");
    0xc7 IFNONNULL "ifnonnull" Branch [BRANCH | CONDITIONAL | STACK_CONSUMER] ("A" => "");
    0xc8 GOTO_W "goto_w" BranchWide [BRANCH] ("" => "");
    0xc9 JSR_W "jsr_w" BranchWide [BRANCH | SUBROUTINE | STACK_PRODUCER] (*);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_is_complete() {
        for code in 0x00..=0xc9u8 {
            assert!(Opcode(code).is_valid(), "missing opcode {:#04x}", code);
        }
        for code in 0xcau8..=0xff {
            assert!(!Opcode(code).is_valid(), "unexpected opcode {:#04x}", code);
        }
    }

    #[test]
    fn mnemonics_and_facets() {
        assert_eq!(Opcode::LOOKUPSWITCH.mnemonic(), "lookupswitch");
        assert_eq!(Opcode(0xfe).mnemonic(), "<invalid>");
        assert!(Opcode::IFEQ.facets().contains(Facets::BRANCH | Facets::CONDITIONAL));
        assert!(!Opcode::GOTO.facets().contains(Facets::CONDITIONAL));
        assert!(Opcode::TABLESWITCH.facets().contains(Facets::SELECT));
        assert!(Opcode::ARETURN.facets().contains(Facets::RETURN));
        assert!(Opcode::IDIV.facets().contains(Facets::EXCEPTION_THROWER));
        assert!(!Opcode::IADD.facets().contains(Facets::EXCEPTION_THROWER));
        assert_eq!(
            Opcode::LADD.info().unwrap().effect,
            StackEffect::Fixed {
                pops: "JJ",
                pushes: "J"
            }
        );
        assert_eq!(Opcode::DUP.info().unwrap().effect, StackEffect::Special);
    }

    #[test]
    fn local_access() {
        assert_eq!(
            Opcode::ALOAD_3.local_access(),
            Some(LocalAccess {
                kind: ValueKind::Reference,
                is_store: false,
                implicit_index: Some(3)
            })
        );
        assert_eq!(
            Opcode::DSTORE.local_access(),
            Some(LocalAccess {
                kind: ValueKind::Double,
                is_store: true,
                implicit_index: None
            })
        );
        assert_eq!(
            Opcode::LSTORE_0.local_access().map(|a| a.kind),
            Some(ValueKind::Long)
        );
        assert_eq!(Opcode::IINC.local_access(), None);
        assert!(Opcode::IINC.is_widenable());
        assert!(!Opcode::BIPUSH.is_widenable());
    }
}
