//! Read, edit, and verify JVM class files
//!
//! The [`jvm`] module holds the class-file object model (constant pool, attributes, fields and
//! methods), the editable instruction list used to rewrite method bodies, and the staged
//! verifier which checks a class before it would be handed to a virtual machine.

pub mod jvm;
pub mod util;
