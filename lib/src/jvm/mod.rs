//! Manipulate JVM class files
//!
//! ### Simple example
//!
//! Building a class with one method body, and reading it back:
//!
//! ```
//! use classkit::jvm::class_file::{ClassFile, Version};
//! use classkit::jvm::code::{Instruction, MethodCode, Opcode};
//! use classkit::jvm::*;
//!
//! # fn edit_class() -> Result<(), Error> {
//! let mut class = ClassFile::new(
//!     Version::JAVA8,
//!     ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
//!     "me/alec/Counter",
//!     Some("java/lang/Object"),
//! )?;
//!
//! // Build a method body: `return 0`
//! let mut code = MethodCode::new(1, 1);
//! code.instructions.append(Instruction::Plain(Opcode::ICONST_0))?;
//! code.instructions.append(Instruction::Plain(Opcode::IRETURN))?;
//! let encoded = code.into_code(&mut class.constants)?;
//!
//! // Round-trip through bytes
//! let bytes = class.to_bytes()?;
//! let decoded = ClassFile::parse(&bytes)?;
//! assert_eq!(decoded.class_name()?, "me/alec/Counter");
//! assert_eq!(encoded.code_array.0, vec![0x03, 0xac]);
//! # Ok(())
//! # }
//! # edit_class().unwrap();
//! ```

mod access_flags;
mod binary_format;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
mod names;
pub mod verifier;

pub use access_flags::*;
pub use binary_format::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
