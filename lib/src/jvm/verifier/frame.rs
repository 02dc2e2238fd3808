use super::VerificationType;
use crate::jvm::VerifierErrorKind;
use crate::util::{SlotVec, Width};

/// Snapshot of the stack and local variables at a point in the bytecode
///
/// Local variables are stored one entry per slot: the slot after a `long` or `double` holds
/// `Top`. The stack is stored one entry per value, with offsets counting slots.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame {
    /// Local variables in scope (exactly `max_locals` slots)
    pub locals: Vec<VerificationType>,

    /// Types of values on the stack
    pub stack: SlotVec<VerificationType>,

    /// Largest stack size allowed (in slots)
    max_stack: u16,
}

impl Frame {
    /// Frame with `max_locals` unusable locals and an empty stack
    pub fn new(max_locals: u16, max_stack: u16) -> Frame {
        Frame {
            locals: vec![VerificationType::Top; max_locals as usize],
            stack: SlotVec::new(),
            max_stack,
        }
    }

    /// Same locals, but the stack only holds the caught exception
    pub fn with_caught(&self, caught: VerificationType) -> Result<Frame, VerifierErrorKind> {
        let mut frame = Frame {
            locals: self.locals.clone(),
            stack: SlotVec::new(),
            max_stack: self.max_stack,
        };
        frame.push(caught)?;
        Ok(frame)
    }

    pub fn push(&mut self, typ: VerificationType) -> Result<(), VerifierErrorKind> {
        if self.stack.width() + typ.width() > self.max_stack as usize {
            return Err(VerifierErrorKind::StackOverflow(self.max_stack));
        }
        self.stack.push(typ);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<VerificationType, VerifierErrorKind> {
        self.stack.pop().ok_or(VerifierErrorKind::EmptyStack)
    }

    /// Pop a value which must be of the given width
    pub fn pop_width(&mut self, expected_width: usize) -> Result<VerificationType, VerifierErrorKind> {
        let typ = self.pop()?;
        let found_width = typ.width();
        if found_width == expected_width {
            Ok(typ)
        } else {
            Err(VerifierErrorKind::InvalidWidth(found_width))
        }
    }

    /// Pop a value which must be assignable to the given type
    pub fn pop_expecting(
        &mut self,
        expected: &VerificationType,
    ) -> Result<VerificationType, VerifierErrorKind> {
        let typ = self.pop()?;
        if VerificationType::is_assignable(&typ, expected) {
            Ok(typ)
        } else {
            Err(VerifierErrorKind::IncompatibleTypes(expected.clone(), typ))
        }
    }

    /// Pop a value which must be an initialized reference (or `null`)
    pub fn pop_reference(&mut self) -> Result<VerificationType, VerifierErrorKind> {
        let typ = self.pop()?;
        if typ.is_uninitialized() {
            Err(VerifierErrorKind::UninitializedObject)
        } else if typ.is_reference() {
            Ok(typ)
        } else {
            Err(VerifierErrorKind::IncompatibleTypes(
                VerificationType::Object(String::from("java/lang/Object")),
                typ,
            ))
        }
    }

    /// Read a local variable, which must be assignable to the given type
    pub fn load(
        &self,
        index: u16,
        expected: &VerificationType,
    ) -> Result<VerificationType, VerifierErrorKind> {
        let idx = index as usize;
        if idx + expected.width() > self.locals.len() {
            return Err(VerifierErrorKind::InvalidIndex(index));
        }
        let typ = &self.locals[idx];
        let ok = match expected {
            // Uninitialized references can be loaded too
            VerificationType::Object(_) => typ.is_reference(),
            _ => VerificationType::is_assignable(typ, expected),
        };
        if ok {
            Ok(typ.clone())
        } else {
            Err(VerifierErrorKind::IncompatibleTypes(expected.clone(), typ.clone()))
        }
    }

    /// Write a local variable
    ///
    /// A `long` or `double` also overwrites the slot after it. Overwriting the second half of a
    /// `long` or `double` makes the first half unusable.
    pub fn store(&mut self, index: u16, typ: VerificationType) -> Result<(), VerifierErrorKind> {
        let idx = index as usize;
        let width = typ.width();
        if idx + width > self.locals.len() {
            return Err(VerifierErrorKind::InvalidIndex(index));
        }
        if idx > 0 && self.locals[idx - 1].width() == 2 {
            self.locals[idx - 1] = VerificationType::Top;
        }
        self.locals[idx] = typ;
        if width == 2 {
            self.locals[idx + 1] = VerificationType::Top;
        }
        Ok(())
    }

    /// Replace every occurrence of an uninitialized type (after its constructor ran)
    pub fn initialize(&mut self, uninitialized: &VerificationType, initialized: VerificationType) {
        for local in &mut self.locals {
            if local == uninitialized {
                *local = initialized.clone();
            }
        }
        let stack: Vec<VerificationType> = self
            .stack
            .iter()
            .map(|(_, typ)| {
                if typ == uninitialized {
                    initialized.clone()
                } else {
                    typ.clone()
                }
            })
            .collect();
        self.stack.clear();
        self.stack.extend(stack);
    }

    /// Is there a local variable which is still an uninitialized `this`?
    pub fn has_uninitialized_this(&self) -> bool {
        self.locals
            .iter()
            .any(|local| *local == VerificationType::UninitializedThis)
    }

    /// Combine the frames coming from two different control flow edges
    ///
    /// Locals which don't agree become unusable, but the stacks must have the same shape.
    pub fn merge(&self, other: &Frame) -> Result<Frame, VerifierErrorKind> {
        let this_height = self.stack.width();
        let other_height = other.stack.width();
        if self.stack.len() != other.stack.len() || this_height != other_height {
            return Err(VerifierErrorKind::StackHeightMismatch(
                this_height,
                other_height,
            ));
        }

        let mut stack = SlotVec::new();
        for ((_, t1), (_, t2)) in self.stack.iter().zip(other.stack.iter()) {
            let merged = t1.merge(t2);
            if merged == VerificationType::Top {
                return Err(VerifierErrorKind::IncompatibleTypes(t1.clone(), t2.clone()));
            }
            stack.push(merged);
        }

        let locals = self
            .locals
            .iter()
            .zip(other.locals.iter())
            .map(|(t1, t2)| t1.merge(t2))
            .collect();

        Ok(Frame {
            locals,
            stack,
            max_stack: self.max_stack,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use VerificationType::*;

    #[test]
    fn stack_limits() {
        let mut frame = Frame::new(0, 3);
        frame.push(Integer).unwrap();
        frame.push(Long).unwrap();
        assert!(matches!(
            frame.push(Integer),
            Err(VerifierErrorKind::StackOverflow(3))
        ));
        assert!(matches!(
            frame.pop_width(1),
            Err(VerifierErrorKind::InvalidWidth(2))
        ));
        frame.pop().unwrap();
        assert!(matches!(frame.pop(), Err(VerifierErrorKind::EmptyStack)));
    }

    #[test]
    fn caught_exception_needs_stack_room() {
        let mut frame = Frame::new(1, 2);
        frame.store(0, Float).unwrap();
        frame.push(Integer).unwrap();
        frame.push(Integer).unwrap();

        let caught = frame.with_caught(Object(String::from("java/lang/Throwable"))).unwrap();
        assert_eq!(caught.locals, vec![Float]);
        assert_eq!(caught.stack.len(), 1);

        assert!(matches!(
            Frame::new(0, 0).with_caught(Object(String::from("java/lang/Throwable"))),
            Err(VerifierErrorKind::StackOverflow(0))
        ));
    }

    #[test]
    fn wide_locals() {
        let mut frame = Frame::new(3, 0);
        frame.store(0, Double).unwrap();
        assert_eq!(frame.locals, vec![Double, Top, Top]);
        assert!(frame.load(0, &Double).is_ok());

        // Clobber the second half
        frame.store(1, Integer).unwrap();
        assert_eq!(frame.locals, vec![Top, Integer, Top]);
        assert!(frame.load(0, &Double).is_err());

        assert!(matches!(
            frame.store(2, Long),
            Err(VerifierErrorKind::InvalidIndex(2))
        ));
    }

    #[test]
    fn merge_frames() {
        let mut f1 = Frame::new(2, 2);
        f1.store(0, Integer).unwrap();
        f1.store(1, Object(String::from("a/B"))).unwrap();
        f1.push(Null).unwrap();

        let mut f2 = Frame::new(2, 2);
        f2.store(0, Float).unwrap();
        f2.store(1, Object(String::from("a/C"))).unwrap();
        f2.push(Object(String::from("a/D"))).unwrap();

        let merged = f1.merge(&f2).unwrap();
        assert_eq!(
            merged.locals,
            vec![Top, Object(String::from("java/lang/Object"))]
        );
        assert_eq!(merged.stack.last(), Some(&Object(String::from("a/D"))));

        f2.push(Integer).unwrap();
        assert!(matches!(
            f1.merge(&f2),
            Err(VerifierErrorKind::StackHeightMismatch(1, 2))
        ));
    }

    #[test]
    fn constructor_initializes_every_copy() {
        let mut frame = Frame::new(1, 2);
        frame.push(Uninitialized(0)).unwrap();
        frame.push(Uninitialized(0)).unwrap();
        frame.store(0, Uninitialized(0)).unwrap();
        frame.initialize(&Uninitialized(0), Object(String::from("a/B")));
        assert_eq!(frame.locals, vec![Object(String::from("a/B"))]);
        assert!(frame
            .stack
            .iter()
            .all(|(_, typ)| *typ == Object(String::from("a/B"))));
    }
}
