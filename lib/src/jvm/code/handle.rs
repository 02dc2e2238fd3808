use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Opaque, stable identity of an instruction inside an [`super::InstructionList`]
///
/// Handles stay valid across insertions and removals of _other_ instructions, which is why
/// branches point at handles instead of byte offsets. A handle also records which generator
/// produced it, so a handle from one list is never mistaken for one in another list.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct InstructionHandle {
    generator: usize,
    index: usize,
}

/// Produces fresh handles
///
/// Every new generator gets its own identity. Cloning does not split the generator source - the
/// cloned generator will produce the same sequence of handles as the original.
#[derive(Clone)]
pub struct HandleGenerator {
    id: usize,
    next: usize,
}

static NEXT_GENERATOR_ID: AtomicUsize = AtomicUsize::new(0);

impl Default for HandleGenerator {
    fn default() -> HandleGenerator {
        HandleGenerator {
            id: NEXT_GENERATOR_ID.fetch_add(1, Ordering::Relaxed),
            next: 0,
        }
    }
}

impl HandleGenerator {
    pub fn fresh_handle(&mut self) -> InstructionHandle {
        let to_return = InstructionHandle {
            generator: self.id,
            index: self.next,
        };
        self.next += 1;
        to_return
    }
}

impl fmt::Debug for InstructionHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("h{}", self.index))
    }
}

/// Something which refers to an instruction handle
///
/// Handles track (but don't own) the things referencing them, so that an instruction can't be
/// removed while it is still the target of a branch, an exception handler boundary, a local
/// variable scope, or a line number entry.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub enum Targeter {
    /// Branch or switch instruction
    Instruction(InstructionHandle),

    /// Exception handler, by its identifier in [`super::MethodCode`]
    ExceptionHandler(usize),

    LocalVariable(usize),

    LineNumber(usize),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generators_never_share_handles() {
        let mut first = HandleGenerator::default();
        let mut second = HandleGenerator::default();
        let a = first.fresh_handle();
        let b = second.fresh_handle();
        assert_ne!(a, b);
        assert_eq!(format!("{:?}", a), format!("{:?}", b));

        // Clones continue the same sequence
        let mut cloned = first.clone();
        assert_eq!(first.fresh_handle(), cloned.fresh_handle());
    }
}
