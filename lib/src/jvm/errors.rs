use crate::jvm::class_file::{Constant, ConstantIndex};
use crate::jvm::code::{InstructionHandle, Targeter};
use crate::jvm::verifier::VerificationType;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// Input is not a well-formed class file (truncation, bad magic, unknown tag or opcode, ...)
    Format(String),

    /// A count or length does not fit in the width used to encode it
    ///
    /// This is always detected before anything gets written.
    ValueTooLarge {
        what: &'static str,
        value: usize,
        max: usize,
    },

    IoError(io::Error),

    ConstantPoolOverflow {
        constant: Constant,
        offset: u16,
    },

    /// Index is zero, past the end of the pool, or the unusable slot after a `long`/`double`
    ConstantIndexOutOfRange(ConstantIndex),

    /// Constant exists, but it is not of the expected kind
    UnexpectedConstant {
        index: ConstantIndex,
        expected: &'static str,
        found: Constant,
    },

    /// Instruction can't be removed since something still points at it
    StillTargeted {
        handle: InstructionHandle,
        targeters: Vec<Targeter>,
    },

    /// Handle does not belong to the instruction list
    UnknownHandle(InstructionHandle),

    /// Branch (or code attribute offset) which does not land on the start of an instruction
    MissingTarget {
        from: usize,
        target: i64,
    },

    /// Keys and targets of a select instruction don't pair up
    InvalidSelect {
        keys: usize,
        targets: usize,
    },

    /// Relative branch distance does not fit in the branch operand
    BranchOffsetOverflow {
        branch: InstructionHandle,
        distance: i64,
    },

    /// Method code is larger than the 65535 bytes a `Code` attribute can address
    MethodCodeOverflow(usize),

    /// Class file does not contain the class that was asked for
    NameMismatch {
        requested: String,
        found: String,
    },

    MissingClass(String),

    /// Class-level static constraint is violated
    ClassConstraint(String),

    /// Structural constraint on a method body is violated
    CodeConstraint {
        method: String,
        offset: Option<usize>,
        message: String,
    },

    /// Type error found while simulating a method body
    VerifierError {
        method: String,
        offset: usize,
        instruction: String,
        kind: VerifierErrorKind,
    },
}

#[derive(Debug)]
pub enum VerifierErrorKind {
    EmptyStack,
    StackOverflow(u16),
    InvalidWidth(usize),
    NotArrayType,
    InvalidIndex(u16),
    InvalidType,
    IncompatibleTypes(VerificationType, VerificationType),
    StackHeightMismatch(usize, usize),
    FallsOffEnd,
    UninitializedObject,
    BadReturn,
    Subroutine,
    BadDescriptor(String),
    InvalidConstant(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Format(String::from("unexpected end of input"))
        } else {
            Error::IoError(err)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(msg) => write!(f, "malformed class file: {}", msg),
            Error::ValueTooLarge { what, value, max } => {
                write!(f, "{} of {} exceeds the maximum of {}", what, value, max)
            }
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::ConstantPoolOverflow { constant, offset } => write!(
                f,
                "constant pool is full (next index {}, adding {:?})",
                offset, constant
            ),
            Error::ConstantIndexOutOfRange(idx) => {
                write!(f, "constant pool index {} is out of range", idx.0)
            }
            Error::UnexpectedConstant {
                index,
                expected,
                found,
            } => write!(
                f,
                "constant #{} should be {} but is {:?}",
                index.0, expected, found
            ),
            Error::StillTargeted { handle, targeters } => write!(
                f,
                "{:?} is still targeted by {:?}",
                handle, targeters
            ),
            Error::UnknownHandle(handle) => write!(f, "{:?} is not in this instruction list", handle),
            Error::MissingTarget { from, target } => write!(
                f,
                "offset {} (referenced from {}) is not the start of an instruction",
                target, from
            ),
            Error::InvalidSelect { keys, targets } => write!(
                f,
                "select has {} keys but {} targets",
                keys, targets
            ),
            Error::BranchOffsetOverflow { branch, distance } => write!(
                f,
                "branch {:?} jumps {} bytes, which does not fit in 16 bits",
                branch, distance
            ),
            Error::MethodCodeOverflow(len) => write!(f, "method code is {} bytes long", len),
            Error::NameMismatch { requested, found } => write!(
                f,
                "Wrong name: the internal name of the .class file '{}' does not match the file's name '{}'",
                found, requested
            ),
            Error::MissingClass(name) => write!(f, "class '{}' could not be found", name),
            Error::ClassConstraint(msg) => f.write_str(msg),
            Error::CodeConstraint {
                method,
                offset: Some(offset),
                message,
            } => write!(f, "{} @ {}: {}", method, offset, message),
            Error::CodeConstraint {
                method,
                offset: None,
                message,
            } => write!(f, "{}: {}", method, message),
            Error::VerifierError {
                method,
                offset,
                instruction,
                kind,
            } => write!(f, "{} @ {} ({}): {}", method, offset, instruction, kind),
        }
    }
}

impl fmt::Display for VerifierErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifierErrorKind::EmptyStack => f.write_str("operand stack underflow"),
            VerifierErrorKind::StackOverflow(max) => {
                write!(f, "operand stack grows past max_stack {}", max)
            }
            VerifierErrorKind::InvalidWidth(width) => {
                write!(f, "expected a value of width {}", width)
            }
            VerifierErrorKind::NotArrayType => f.write_str("expected an array"),
            VerifierErrorKind::InvalidIndex(idx) => write!(f, "invalid local variable {}", idx),
            VerifierErrorKind::InvalidType => f.write_str("invalid type"),
            VerifierErrorKind::IncompatibleTypes(expected, found) => {
                write!(f, "expected {} but found {}", expected, found)
            }
            VerifierErrorKind::StackHeightMismatch(a, b) => {
                write!(f, "operand stack heights {} and {} do not merge", a, b)
            }
            VerifierErrorKind::FallsOffEnd => f.write_str("execution falls off the end of the code"),
            VerifierErrorKind::UninitializedObject => {
                f.write_str("uninitialized object used before its constructor ran")
            }
            VerifierErrorKind::BadReturn => f.write_str("return does not match the method descriptor"),
            VerifierErrorKind::Subroutine => f.write_str("subroutines (jsr/ret) are not supported"),
            VerifierErrorKind::BadDescriptor(desc) => write!(f, "malformed descriptor {}", desc),
            VerifierErrorKind::InvalidConstant(msg) => write!(f, "invalid constant: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
