use std::fmt;

/// Number of slots a value takes up
///
/// In class files, `long` and `double` are the odd ones out: they take two constant pool indices,
/// two local variables, and two operand stack slots.
pub trait Width {
    fn width(&self) -> usize;
}

/// Vector addressed by slot instead of by position
///
/// Each entry starts at the slot after the end of the previous entry, so wide entries leave a gap
/// that can't be addressed. The constant pool (whose first slot is 1) and the operand stack are
/// both laid out like this.
#[derive(Clone)]
pub struct SlotVec<T> {
    /// Entries, each with its starting slot (in increasing order)
    entries: Vec<(usize, T)>,

    /// Slot that the next entry will start at
    next_slot: usize,

    first_slot: usize,
}

impl<T: Width> SlotVec<T> {
    pub fn new() -> SlotVec<T> {
        SlotVec::starting_at(0)
    }

    pub fn starting_at(first_slot: usize) -> SlotVec<T> {
        SlotVec {
            entries: vec![],
            next_slot: first_slot,
            first_slot,
        }
    }

    /// Number of entries (wide ones count once)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_slot(&self) -> usize {
        self.next_slot
    }

    /// Slots used by all of the entries
    pub fn width(&self) -> usize {
        self.next_slot - self.first_slot
    }

    /// Add an entry, returning the slot it starts at
    pub fn push(&mut self, entry: T) -> usize {
        let slot = self.next_slot;
        self.next_slot += entry.width();
        self.entries.push((slot, entry));
        slot
    }

    pub fn pop(&mut self) -> Option<T> {
        let (slot, entry) = self.entries.pop()?;
        self.next_slot = slot;
        Some(entry)
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last().map(|(_, entry)| entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_slot = self.first_slot;
    }

    /// Entry starting exactly at `slot`
    ///
    /// Slots before the first entry, past the end, or in the middle of a wide entry have nothing.
    pub fn at_slot(&self, slot: usize) -> Option<&T> {
        self.entries
            .binary_search_by_key(&slot, |(start, _)| *start)
            .ok()
            .map(|found| &self.entries[found].1)
    }

    /// Entries in order, along with their starting slots
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &T)> + '_ {
        self.entries.iter().map(|(slot, entry)| (*slot, entry))
    }
}

impl<T: Width> Default for SlotVec<T> {
    fn default() -> Self {
        SlotVec::new()
    }
}

impl<T: PartialEq> PartialEq for SlotVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<T: Eq> Eq for SlotVec<T> {}

impl<T: Width> Extend<T> for SlotVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, entries: I) {
        for entry in entries {
            self.push(entry);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SlotVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (slot, entry) in &self.entries {
            list.entry(&format_args!("#{} = {:?}", slot, entry));
        }
        list.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    enum Value {
        Int(i32),
        Long(i64),
    }

    impl Width for Value {
        fn width(&self) -> usize {
            match self {
                Value::Int(_) => 1,
                Value::Long(_) => 2,
            }
        }
    }

    #[test]
    fn wide_entries_skip_a_slot() {
        let mut values = SlotVec::new();
        values.extend([Value::Int(1), Value::Long(2), Value::Int(3)]);
        assert_eq!(
            values.iter().collect::<Vec<_>>(),
            vec![
                (0, &Value::Int(1)),
                (1, &Value::Long(2)),
                (3, &Value::Int(3)),
            ]
        );
        assert_eq!(values.len(), 3);
        assert_eq!(values.width(), 4);
    }

    #[test]
    fn lookup_by_slot() {
        let mut pool = SlotVec::starting_at(1);
        assert_eq!(pool.push(Value::Long(1)), 1);
        assert_eq!(pool.push(Value::Int(2)), 3);

        assert_eq!(pool.at_slot(0), None);
        assert_eq!(pool.at_slot(1), Some(&Value::Long(1)));
        assert_eq!(pool.at_slot(2), None);
        assert_eq!(pool.at_slot(3), Some(&Value::Int(2)));
        assert_eq!(pool.at_slot(4), None);
        assert_eq!(pool.next_slot(), 4);
    }

    #[test]
    fn pop_gives_back_slots() {
        let mut stack = SlotVec::new();
        stack.push(Value::Int(1));
        stack.push(Value::Long(2));
        assert_eq!(stack.pop(), Some(Value::Long(2)));
        assert_eq!(stack.next_slot(), 1);
        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.next_slot(), 0);
    }
}
