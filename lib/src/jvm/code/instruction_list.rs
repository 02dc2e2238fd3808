use crate::jvm::code::{
    HandleGenerator, Instruction, InstructionHandle, OperandShape, Targeter,
};
use crate::jvm::Error;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Editable sequence of instructions
///
/// Every instruction is identified by an [`InstructionHandle`] and branches point at handles, so
/// instructions can be inserted, removed, or reordered without patching any byte offsets. Offsets
/// only exist between a call to [`InstructionList::resolve_offsets`] (which [`Self::encode`] also
/// does) and the next structural edit.
///
/// The list also keeps a reverse index from each handle to everything targeting it. Branches
/// inside the list register themselves, while exception handlers, local variable scopes, and line
/// numbers are registered by [`super::MethodCode`].
#[derive(Clone, Default)]
pub struct InstructionList {
    instructions: HashMap<InstructionHandle, Instruction<InstructionHandle>>,

    /// Order of the instructions (elements are unique and exactly match keys of `instructions`)
    order: Vec<InstructionHandle>,

    /// Reverse index of references to each handle
    targeters: HashMap<InstructionHandle, BTreeSet<Targeter>>,

    generator: HandleGenerator,

    /// Byte offsets of the last resolution, cleared on every structural edit
    resolved: Option<Resolved>,
}

#[derive(Clone)]
struct Resolved {
    offsets: HashMap<InstructionHandle, usize>,
    code_length: usize,
}

impl InstructionList {
    pub fn new() -> InstructionList {
        InstructionList::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, handle: InstructionHandle) -> bool {
        self.instructions.contains_key(&handle)
    }

    pub fn get(&self, handle: InstructionHandle) -> Option<&Instruction<InstructionHandle>> {
        self.instructions.get(&handle)
    }

    /// Handles in program order
    pub fn handles(&self) -> &[InstructionHandle] {
        &self.order
    }

    /// Instructions in program order
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (InstructionHandle, &Instruction<InstructionHandle>)> + '_ {
        self.order
            .iter()
            .filter_map(move |handle| self.instructions.get(handle).map(|insn| (*handle, insn)))
    }

    pub fn first(&self) -> Option<InstructionHandle> {
        self.order.first().copied()
    }

    pub fn last(&self) -> Option<InstructionHandle> {
        self.order.last().copied()
    }

    /// Handle of the instruction right after this one
    pub fn next(&self, handle: InstructionHandle) -> Option<InstructionHandle> {
        let position = self.position(handle).ok()?;
        self.order.get(position + 1).copied()
    }

    /// Position of an instruction in program order
    pub fn index_of(&self, handle: InstructionHandle) -> Option<usize> {
        self.order.iter().position(|h| *h == handle)
    }

    fn position(&self, handle: InstructionHandle) -> Result<usize, Error> {
        self.index_of(handle).ok_or(Error::UnknownHandle(handle))
    }

    /// Add an instruction to the end
    pub fn append(
        &mut self,
        instruction: Instruction<InstructionHandle>,
    ) -> Result<InstructionHandle, Error> {
        self.insert_at(self.order.len(), instruction)
    }

    pub fn insert_before(
        &mut self,
        existing: InstructionHandle,
        instruction: Instruction<InstructionHandle>,
    ) -> Result<InstructionHandle, Error> {
        let position = self.position(existing)?;
        self.insert_at(position, instruction)
    }

    pub fn insert_after(
        &mut self,
        existing: InstructionHandle,
        instruction: Instruction<InstructionHandle>,
    ) -> Result<InstructionHandle, Error> {
        let position = self.position(existing)?;
        self.insert_at(position + 1, instruction)
    }

    fn insert_at(
        &mut self,
        position: usize,
        instruction: Instruction<InstructionHandle>,
    ) -> Result<InstructionHandle, Error> {
        self.check_targets(&instruction)?;
        let handle = self.generator.fresh_handle();
        self.register_branch(handle, &instruction);
        self.instructions.insert(handle, instruction);
        self.order.insert(position, handle);
        self.resolved = None;
        Ok(handle)
    }

    /// Swap out the instruction behind a handle, returning the old instruction
    ///
    /// Everything targeting the handle keeps targeting it.
    pub fn replace(
        &mut self,
        handle: InstructionHandle,
        instruction: Instruction<InstructionHandle>,
    ) -> Result<Instruction<InstructionHandle>, Error> {
        if !self.contains(handle) {
            return Err(Error::UnknownHandle(handle));
        }
        self.check_targets(&instruction)?;
        let old = self
            .instructions
            .insert(handle, instruction)
            .ok_or(Error::UnknownHandle(handle))?;
        self.unregister_branch(handle, &old);
        if let Some(new) = self.instructions.get(&handle) {
            let targets: Vec<InstructionHandle> = new.targets().into_iter().copied().collect();
            for target in targets {
                self.targeters
                    .entry(target)
                    .or_default()
                    .insert(Targeter::Instruction(handle));
            }
        }
        self.resolved = None;
        Ok(old)
    }

    /// Remove an instruction
    ///
    /// This fails (leaving the list untouched) if anything other than the instruction itself
    /// still targets the handle.
    pub fn remove(
        &mut self,
        handle: InstructionHandle,
    ) -> Result<Instruction<InstructionHandle>, Error> {
        let position = self.position(handle)?;
        let targeters: Vec<Targeter> = self
            .targeters(handle)
            .into_iter()
            .filter(|targeter| *targeter != Targeter::Instruction(handle))
            .collect();
        if !targeters.is_empty() {
            return Err(Error::StillTargeted { handle, targeters });
        }

        self.order.remove(position);
        let instruction = self
            .instructions
            .remove(&handle)
            .ok_or(Error::UnknownHandle(handle))?;
        self.unregister_branch(handle, &instruction);
        self.targeters.remove(&handle);
        self.resolved = None;
        Ok(instruction)
    }

    /// Point every `old` target of a branch at `new` instead
    pub fn update_target(
        &mut self,
        branch: InstructionHandle,
        old: InstructionHandle,
        new: InstructionHandle,
    ) -> Result<(), Error> {
        if !self.contains(new) {
            return Err(Error::UnknownHandle(new));
        }
        let instruction = self
            .instructions
            .get_mut(&branch)
            .ok_or(Error::UnknownHandle(branch))?;
        let mut found = false;
        for target in instruction.targets_mut() {
            if *target == old {
                *target = new;
                found = true;
            }
        }
        if !found {
            return Err(Error::UnknownHandle(old));
        }
        self.remove_targeter(old, Targeter::Instruction(branch));
        self.add_targeter(new, Targeter::Instruction(branch))?;

        // Instruction widths don't depend on targets, so resolved offsets stay valid
        Ok(())
    }

    /// Point every branch targeting `old` at `new` instead
    pub fn redirect_branches(
        &mut self,
        old: InstructionHandle,
        new: InstructionHandle,
    ) -> Result<(), Error> {
        if !self.contains(new) {
            return Err(Error::UnknownHandle(new));
        }
        for targeter in self.targeters(old) {
            if let Targeter::Instruction(branch) = targeter {
                self.update_target(branch, old, new)?;
            }
        }
        Ok(())
    }

    /// Everything that currently targets a handle
    pub fn targeters(&self, handle: InstructionHandle) -> Vec<Targeter> {
        self.targeters
            .get(&handle)
            .map(|targeters| targeters.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn add_targeter(
        &mut self,
        handle: InstructionHandle,
        targeter: Targeter,
    ) -> Result<(), Error> {
        if !self.contains(handle) {
            return Err(Error::UnknownHandle(handle));
        }
        self.targeters.entry(handle).or_default().insert(targeter);
        Ok(())
    }

    pub(crate) fn remove_targeter(&mut self, handle: InstructionHandle, targeter: Targeter) {
        if let Some(targeters) = self.targeters.get_mut(&handle) {
            targeters.remove(&targeter);
            if targeters.is_empty() {
                self.targeters.remove(&handle);
            }
        }
    }

    fn check_targets(&self, instruction: &Instruction<InstructionHandle>) -> Result<(), Error> {
        for target in instruction.targets() {
            if !self.contains(*target) {
                return Err(Error::UnknownHandle(*target));
            }
        }
        Ok(())
    }

    fn register_branch(
        &mut self,
        handle: InstructionHandle,
        instruction: &Instruction<InstructionHandle>,
    ) {
        for target in instruction.targets() {
            self.targeters
                .entry(*target)
                .or_default()
                .insert(Targeter::Instruction(handle));
        }
    }

    fn unregister_branch(
        &mut self,
        handle: InstructionHandle,
        instruction: &Instruction<InstructionHandle>,
    ) {
        for target in instruction.targets() {
            self.remove_targeter(*target, Targeter::Instruction(handle));
        }
    }

    /// Assign byte offsets to every instruction
    ///
    /// This is a single forward pass: the width of an instruction only ever depends on its own
    /// position, never on the position of later instructions.
    pub fn resolve_offsets(&mut self) -> Result<(), Error> {
        let mut offsets = HashMap::with_capacity(self.order.len());
        let mut offset = 0;
        for handle in &self.order {
            let instruction = self
                .instructions
                .get(handle)
                .ok_or(Error::UnknownHandle(*handle))?;
            offsets.insert(*handle, offset);
            offset += instruction.width_at(offset);
        }
        if offset > u16::MAX as usize {
            return Err(Error::MethodCodeOverflow(offset));
        }
        self.resolved = Some(Resolved {
            offsets,
            code_length: offset,
        });
        Ok(())
    }

    /// Byte offset of an instruction, if offsets are currently resolved
    pub fn offset_of(&self, handle: InstructionHandle) -> Option<usize> {
        self.resolved.as_ref()?.offsets.get(&handle).copied()
    }

    /// Length of the code array, if offsets are currently resolved
    pub fn code_length(&self) -> Option<usize> {
        self.resolved.as_ref().map(|resolved| resolved.code_length)
    }

    /// Resolve offsets and encode the instructions into a code array
    pub fn encode(&mut self) -> Result<Vec<u8>, Error> {
        self.resolve_offsets()?;
        let resolved = self
            .resolved
            .as_ref()
            .ok_or_else(|| Error::Format(String::from("offsets were not resolved")))?;

        let mut code = Vec::with_capacity(resolved.code_length);
        for handle in &self.order {
            let instruction = self
                .instructions
                .get(handle)
                .ok_or(Error::UnknownHandle(*handle))?;
            let offset = resolved
                .offsets
                .get(handle)
                .copied()
                .ok_or(Error::UnknownHandle(*handle))?;
            let short_branch = matches!(
                instruction,
                Instruction::Branch(op, _) if op.shape() == Some(OperandShape::Branch)
            );

            let relative = instruction.try_map_targets(|target| {
                let target_offset = resolved
                    .offsets
                    .get(target)
                    .copied()
                    .ok_or(Error::UnknownHandle(*target))?;
                let distance = target_offset as i64 - offset as i64;
                if short_branch && i16::try_from(distance).is_err() {
                    return Err(Error::BranchOffsetOverflow {
                        branch: *handle,
                        distance,
                    });
                }
                Ok(distance as i32)
            })?;
            relative.serialize_at(&mut code, offset)?;
        }
        Ok(code)
    }

    /// Decode a code array
    ///
    /// Also returns the handle at the start of every instruction, keyed by byte offset, so that
    /// other offsets into the code (exception tables, debug tables) can be turned into handles.
    pub fn decode(
        code: &[u8],
    ) -> Result<(InstructionList, BTreeMap<usize, InstructionHandle>), Error> {
        let mut list = InstructionList::new();

        let mut decoded: Vec<(usize, InstructionHandle, Instruction<i32>)> = vec![];
        let mut handles: BTreeMap<usize, InstructionHandle> = BTreeMap::new();
        let mut offset = 0;
        while offset < code.len() {
            let (instruction, width) = Instruction::decode_at(code, offset)?;
            let handle = list.generator.fresh_handle();
            handles.insert(offset, handle);
            decoded.push((offset, handle, instruction));
            offset += width;
        }

        let mut offsets = HashMap::with_capacity(decoded.len());
        for (offset, handle, instruction) in decoded {
            let instruction = instruction.try_map_targets(|relative| {
                let target = offset as i64 + *relative as i64;
                usize::try_from(target)
                    .ok()
                    .and_then(|target| handles.get(&target).copied())
                    .ok_or(Error::MissingTarget {
                        from: offset,
                        target,
                    })
            })?;
            list.register_branch(handle, &instruction);
            list.instructions.insert(handle, instruction);
            list.order.push(handle);
            offsets.insert(handle, offset);
        }
        list.resolved = Some(Resolved {
            offsets,
            code_length: code.len(),
        });

        Ok((list, handles))
    }
}

impl fmt::Debug for InstructionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (handle, instruction) in self.iter() {
            list.entry(&format_args!("{:?}: {}", handle, instruction));
        }
        list.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{Opcode, Select};

    #[test]
    fn branches_resolve_to_relative_offsets() {
        let mut list = InstructionList::new();
        let start = list.append(Instruction::Plain(Opcode::ICONST_0)).unwrap();
        let ret = list.append(Instruction::Plain(Opcode::IRETURN)).unwrap();
        let branch = list
            .insert_after(start, Instruction::Branch(Opcode::IFEQ, ret))
            .unwrap();
        list.insert_after(branch, Instruction::Branch(Opcode::GOTO, start))
            .unwrap();

        let code = list.encode().unwrap();
        assert_eq!(
            code,
            vec![0x03, 0x99, 0x00, 0x06, 0xa7, 0xff, 0xfc, 0xac]
        );
        assert_eq!(list.offset_of(ret), Some(7));
        assert_eq!(list.targeters(ret), vec![Targeter::Instruction(branch)]);
    }

    #[test]
    fn edits_invalidate_offsets() {
        let mut list = InstructionList::new();
        let first = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
        list.resolve_offsets().unwrap();
        assert_eq!(list.offset_of(first), Some(0));

        list.insert_before(first, Instruction::Plain(Opcode::NOP))
            .unwrap();
        assert_eq!(list.offset_of(first), None);
        list.resolve_offsets().unwrap();
        assert_eq!(list.offset_of(first), Some(1));
    }

    #[test]
    fn remove_still_targeted() {
        let mut list = InstructionList::new();
        let a = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
        let b = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
        let jump = list.append(Instruction::Branch(Opcode::GOTO, a)).unwrap();

        match list.remove(a) {
            Err(Error::StillTargeted { handle, targeters }) => {
                assert_eq!(handle, a);
                assert_eq!(targeters, vec![Targeter::Instruction(jump)]);
            }
            other => panic!("expected StillTargeted, got {:?}", other.map(|_| ())),
        }
        assert_eq!(list.handles(), &[a, b, jump]);

        list.update_target(jump, a, b).unwrap();
        assert!(list.targeters(a).is_empty());
        list.remove(a).unwrap();
        assert_eq!(list.handles(), &[b, jump]);

        let code = list.encode().unwrap();
        assert_eq!(code, vec![0x00, 0xa7, 0xff, 0xff]);
    }

    #[test]
    fn self_loops_can_be_removed() {
        let mut list = InstructionList::new();
        let a = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
        list.replace(a, Instruction::Branch(Opcode::GOTO, a)).unwrap();
        assert_eq!(list.targeters(a), vec![Targeter::Instruction(a)]);
        list.remove(a).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn unknown_handles() {
        let mut other = InstructionList::new();
        let foreign = other.append(Instruction::Plain(Opcode::NOP)).unwrap();

        // Both lists hand out their first handle, but they are not interchangeable
        let mut list = InstructionList::new();
        let a = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
        assert!(!list.contains(foreign));
        assert!(list.targeters(foreign).is_empty());
        assert!(matches!(
            list.append(Instruction::Branch(Opcode::GOTO, foreign)),
            Err(Error::UnknownHandle(_))
        ));
        let jump = list.append(Instruction::Branch(Opcode::GOTO, a)).unwrap();
        assert!(matches!(
            list.update_target(jump, foreign, a),
            Err(Error::UnknownHandle(h)) if h == foreign
        ));
    }

    #[test]
    fn redirect_all_branches() {
        let mut list = InstructionList::new();
        let a = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
        let b = list.append(Instruction::Plain(Opcode::ICONST_0)).unwrap();
        let switch = Select::new(vec![1, 2], vec![a, a], a).unwrap();
        let select = list.append(Instruction::LookupSwitch(switch)).unwrap();
        let jump = list.append(Instruction::Branch(Opcode::GOTO, a)).unwrap();

        list.redirect_branches(a, b).unwrap();
        assert!(list.targeters(a).is_empty());
        assert_eq!(
            list.targeters(b),
            vec![Targeter::Instruction(select), Targeter::Instruction(jump)]
        );
        match list.get(select) {
            Some(Instruction::LookupSwitch(select)) => {
                assert_eq!(select.targets(), &[b, b]);
                assert_eq!(*select.default(), b);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn short_branch_overflow() {
        let mut list = InstructionList::new();
        let jump = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
        for _ in 0..40_000 {
            list.append(Instruction::Plain(Opcode::NOP)).unwrap();
        }
        let end = list.append(Instruction::Plain(Opcode::RETURN)).unwrap();
        list.replace(jump, Instruction::Branch(Opcode::GOTO, end))
            .unwrap();
        assert!(matches!(
            list.encode(),
            Err(Error::BranchOffsetOverflow { branch, distance: 40_003 }) if branch == jump
        ));

        list.replace(jump, Instruction::Branch(Opcode::GOTO_W, end))
            .unwrap();
        assert_eq!(list.encode().unwrap().len(), 40_006);
    }

    #[test]
    fn code_too_long() {
        let mut list = InstructionList::new();
        for _ in 0..=u16::MAX as usize {
            list.append(Instruction::Plain(Opcode::NOP)).unwrap();
        }
        assert!(matches!(
            list.resolve_offsets(),
            Err(Error::MethodCodeOverflow(65536))
        ));
    }

    #[test]
    fn decode_rejects_misaligned_targets() {
        // goto +1 lands in the middle of the goto
        let code = [0xa7, 0x00, 0x01, 0xb1];
        assert!(matches!(
            InstructionList::decode(&code),
            Err(Error::MissingTarget { from: 0, target: 1 })
        ));

        // Jumping before the start of the code
        let code = [0xa7, 0xff, 0xff];
        assert!(matches!(
            InstructionList::decode(&code),
            Err(Error::MissingTarget { from: 0, target: -1 })
        ));
    }

    #[test]
    fn decode_then_encode() {
        let code = [0x1a, 0x99, 0x00, 0x05, 0x04, 0xac, 0x03, 0xac];
        let (mut list, handles) = InstructionList::decode(&code).unwrap();
        assert_eq!(list.len(), 6);
        assert_eq!(handles.keys().copied().collect::<Vec<_>>(), vec![0, 1, 4, 5, 6, 7]);
        assert_eq!(list.offset_of(handles[&6]), Some(6));
        assert_eq!(
            list.targeters(handles[&6]),
            vec![Targeter::Instruction(handles[&1])]
        );
        assert_eq!(list.encode().unwrap(), code.to_vec());
    }
}
