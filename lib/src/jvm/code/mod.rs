//! Bytecode representation and editing
//!
//! ### Structure
//!
//! Despite being pushed off into [just another method attribute](crate::jvm::class_file::Code),
//! the bytecode is arguably the most important part of the class file - it contains the actual
//! executable instructions. The [list of bytecode instructions][0] is described once, in a table
//! of [`OpcodeInfo`] keyed by [`Opcode`], and instructions themselves are grouped by the shape of
//! their operands in [`Instruction`].
//!
//! ### Editing
//!
//! Raw code arrays address everything by byte offset, which makes editing them painful: insert one
//! instruction and every branch crossing it needs patching (and `tableswitch`/`lookupswitch`
//! padding can change too). [`InstructionList`] stores instructions behind stable
//! [`InstructionHandle`]s and only works out offsets when encoding. [`MethodCode`] does the same
//! for the tables hanging off the `Code` attribute.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html#jvms-6.5

mod handle;
mod instruction;
mod instruction_list;
mod method_code;
mod opcode;

pub use handle::*;
pub use instruction::*;
pub use instruction_list::*;
pub use method_code::*;
pub use opcode::*;
