use crate::jvm::class_file::{
    Attribute, AttributeLike, BytecodeArray, BytecodeIndex, ClassConstantIndex, Code,
    ConstantPool, ExceptionHandler, LineNumber, LineNumberTable, LocalVariable,
    LocalVariableTable, Utf8ConstantIndex,
};
use crate::jvm::code::{InstructionHandle, InstructionList, Targeter};
use crate::jvm::Error;
use log::debug;
use std::collections::BTreeMap;

/// Editable form of a [`Code`] attribute
///
/// Everything in the `Code` attribute that refers to byte offsets (the exception table, the local
/// variable and line number tables) refers to instruction handles here instead, and registers
/// itself as a [`Targeter`] of those handles. Each of those entries has an identifier which stays
/// stable until the entry is removed.
///
/// Stack map frames can't be kept valid across arbitrary edits, so `StackMapTable` attributes are
/// dropped when a method body gets lifted into a `MethodCode`. All other unrecognized attributes
/// are kept as they are.
#[derive(Debug, Clone, Default)]
pub struct MethodCode {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: InstructionList,
    exception_handlers: BTreeMap<usize, ExceptionRange>,
    local_variables: BTreeMap<usize, LocalVariableScope>,
    line_numbers: BTreeMap<usize, LineNumberEntry>,
    next_id: usize,

    /// Remaining attributes of the `Code` attribute
    pub attributes: Vec<Attribute>,
}

/// Exception handler covering an inclusive range of instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionRange {
    pub start: InstructionHandle,

    /// Last instruction covered (inclusive)
    pub end: InstructionHandle,
    pub handler: InstructionHandle,

    /// Exception class caught (`None` catches everything)
    pub catch_type: Option<ClassConstantIndex>,
}

/// Local variable, in scope over an inclusive range of instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariableScope {
    pub start: InstructionHandle,

    /// Last instruction in scope (`None` if the scope is empty and only marks `start`)
    pub end: Option<InstructionHandle>,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub index: u16,
}

impl LocalVariableScope {
    fn handles(&self) -> Vec<InstructionHandle> {
        std::iter::once(self.start).chain(self.end).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start: InstructionHandle,
    pub line_number: u16,
}

const STACK_MAP_TABLE: &str = "StackMapTable";

impl MethodCode {
    pub fn new(max_stack: u16, max_locals: u16) -> MethodCode {
        MethodCode {
            max_stack,
            max_locals,
            ..MethodCode::default()
        }
    }

    /// Lift a decoded `Code` attribute into its editable form
    pub fn from_code(code: &Code, constants: &ConstantPool) -> Result<MethodCode, Error> {
        let code_length = code.code_array.0.len();
        let (instructions, handles) = InstructionList::decode(&code.code_array.0)?;
        let mut method_code = MethodCode {
            max_stack: code.max_stack,
            max_locals: code.max_locals,
            instructions,
            ..MethodCode::default()
        };

        // Offsets must land on the start of an instruction
        let at = |offset: usize| -> Result<InstructionHandle, Error> {
            handles.get(&offset).copied().ok_or(Error::MissingTarget {
                from: offset,
                target: offset as i64,
            })
        };

        // Exclusive end offsets must land on an instruction or the end of the code. The
        // instruction covered last is the one before that.
        let last_before = |start: usize, end: usize| -> Result<InstructionHandle, Error> {
            if end != code_length && !handles.contains_key(&end) {
                return Err(Error::MissingTarget {
                    from: start,
                    target: end as i64,
                });
            }
            handles
                .range(start..end)
                .next_back()
                .map(|(_, handle)| *handle)
                .ok_or_else(|| {
                    Error::Format(format!("empty code range from {} to {}", start, end))
                })
        };

        for handler in &code.exception_table {
            let start_pc = handler.start_pc.0 as usize;
            let range = ExceptionRange {
                start: at(start_pc)?,
                end: last_before(start_pc, handler.end_pc.0 as usize)?,
                handler: at(handler.handler_pc.0 as usize)?,
                catch_type: handler.catch_type,
            };
            method_code.add_exception_handler(range)?;
        }

        for attribute in &code.attributes {
            match attribute.name(constants)? {
                LineNumberTable::NAME => {
                    let table: LineNumberTable = attribute.decode()?;
                    for entry in table.0 {
                        let start = at(entry.start_pc.0 as usize)?;
                        method_code.add_line_number(start, entry.line_number)?;
                    }
                }
                LocalVariableTable::NAME => {
                    let table: LocalVariableTable = attribute.decode()?;
                    for variable in table.0 {
                        let start_pc = variable.start_pc.0 as usize;
                        let end_pc = start_pc + variable.length as usize;
                        let end = if variable.length == 0 {
                            None
                        } else {
                            Some(last_before(start_pc, end_pc)?)
                        };
                        method_code.add_local_variable(LocalVariableScope {
                            start: at(start_pc)?,
                            end,
                            name_index: variable.name_index,
                            descriptor_index: variable.descriptor_index,
                            index: variable.index,
                        })?;
                    }
                }
                STACK_MAP_TABLE => {
                    debug!(
                        "Dropping {} byte stack map table from lifted method code",
                        attribute.info.len()
                    );
                }
                _ => method_code.attributes.push(attribute.clone()),
            }
        }

        Ok(method_code)
    }

    /// Encode back into a `Code` attribute
    ///
    /// Line numbers and local variables (if there are any) are emitted before the other
    /// attributes.
    pub fn into_code(mut self, constants: &mut ConstantPool) -> Result<Code, Error> {
        let code_array = self.instructions.encode()?;

        let mut exception_table = Vec::with_capacity(self.exception_handlers.len());
        for range in self.exception_handlers.values() {
            exception_table.push(ExceptionHandler {
                start_pc: self.start_index(range.start)?,
                end_pc: self.end_index(range.end)?,
                handler_pc: self.start_index(range.handler)?,
                catch_type: range.catch_type,
            });
        }

        let mut attributes = vec![];
        if !self.line_numbers.is_empty() {
            let table = self.resolved_line_numbers()?;
            attributes.push(constants.encode_attribute(&table)?);
        }
        if !self.local_variables.is_empty() {
            let mut table = Vec::with_capacity(self.local_variables.len());
            for scope in self.local_variables.values() {
                let start_pc = self.start_index(scope.start)?;
                let length = match scope.end {
                    Some(end) => self.end_index(end)?.0.saturating_sub(start_pc.0),
                    None => 0,
                };
                table.push(LocalVariable {
                    start_pc,
                    length,
                    name_index: scope.name_index,
                    descriptor_index: scope.descriptor_index,
                    index: scope.index,
                });
            }
            attributes.push(constants.encode_attribute(&LocalVariableTable(table))?);
        }
        attributes.append(&mut self.attributes);

        Ok(Code {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code_array: BytecodeArray(code_array),
            exception_table,
            attributes,
        })
    }

    /// Offset of the start of an instruction (offsets must be resolved)
    fn start_index(&self, handle: InstructionHandle) -> Result<BytecodeIndex, Error> {
        let offset = self
            .instructions
            .offset_of(handle)
            .ok_or(Error::UnknownHandle(handle))?;
        u16::try_from(offset)
            .map(BytecodeIndex)
            .map_err(|_| Error::MethodCodeOverflow(offset))
    }

    /// Offset just past the end of an instruction (offsets must be resolved)
    fn end_index(&self, handle: InstructionHandle) -> Result<BytecodeIndex, Error> {
        let offset = self
            .instructions
            .offset_of(handle)
            .ok_or(Error::UnknownHandle(handle))?;
        let instruction = self
            .instructions
            .get(handle)
            .ok_or(Error::UnknownHandle(handle))?;
        let end = offset + instruction.width_at(offset);
        u16::try_from(end)
            .map(BytecodeIndex)
            .map_err(|_| Error::MethodCodeOverflow(end))
    }

    /// Line number table, with entries sorted by offset
    pub fn line_number_table(&mut self) -> Result<LineNumberTable, Error> {
        self.instructions.resolve_offsets()?;
        self.resolved_line_numbers()
    }

    fn resolved_line_numbers(&self) -> Result<LineNumberTable, Error> {
        let mut entries = Vec::with_capacity(self.line_numbers.len());
        for entry in self.line_numbers.values() {
            entries.push(LineNumber {
                start_pc: self.start_index(entry.start)?,
                line_number: entry.line_number,
            });
        }
        entries.sort_by_key(|entry| entry.start_pc);
        Ok(LineNumberTable(entries))
    }

    fn fresh_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Register `targeter` on each handle, rolling back if one of them is unknown
    fn register(&mut self, handles: &[InstructionHandle], targeter: Targeter) -> Result<(), Error> {
        if let Some(unknown) = handles.iter().find(|h| !self.instructions.contains(**h)) {
            return Err(Error::UnknownHandle(*unknown));
        }
        for handle in handles {
            self.instructions.add_targeter(*handle, targeter)?;
        }
        Ok(())
    }

    fn unregister(&mut self, handles: &[InstructionHandle], targeter: Targeter) {
        for handle in handles {
            self.instructions.remove_targeter(*handle, targeter);
        }
    }

    fn check_range(&self, start: InstructionHandle, end: InstructionHandle) -> Result<(), Error> {
        let start_index = self
            .instructions
            .index_of(start)
            .ok_or(Error::UnknownHandle(start))?;
        let end_index = self
            .instructions
            .index_of(end)
            .ok_or(Error::UnknownHandle(end))?;
        if start_index > end_index {
            return Err(Error::Format(format!(
                "range {:?}..={:?} ends before it starts",
                start, end
            )));
        }
        Ok(())
    }

    pub fn add_exception_handler(&mut self, range: ExceptionRange) -> Result<usize, Error> {
        self.check_range(range.start, range.end)?;
        let id = self.fresh_id();
        self.register(
            &[range.start, range.end, range.handler],
            Targeter::ExceptionHandler(id),
        )?;
        self.exception_handlers.insert(id, range);
        Ok(id)
    }

    pub fn remove_exception_handler(&mut self, id: usize) -> Option<ExceptionRange> {
        let range = self.exception_handlers.remove(&id)?;
        self.unregister(
            &[range.start, range.end, range.handler],
            Targeter::ExceptionHandler(id),
        );
        Some(range)
    }

    /// Exception handlers, in the order they were added (which is their priority)
    pub fn exception_handlers(&self) -> impl Iterator<Item = (usize, &ExceptionRange)> + '_ {
        self.exception_handlers.iter().map(|(id, range)| (*id, range))
    }

    pub fn add_local_variable(&mut self, scope: LocalVariableScope) -> Result<usize, Error> {
        if let Some(end) = scope.end {
            self.check_range(scope.start, end)?;
        }
        let id = self.fresh_id();
        self.register(&scope.handles(), Targeter::LocalVariable(id))?;
        self.local_variables.insert(id, scope);
        Ok(id)
    }

    pub fn remove_local_variable(&mut self, id: usize) -> Option<LocalVariableScope> {
        let scope = self.local_variables.remove(&id)?;
        self.unregister(&scope.handles(), Targeter::LocalVariable(id));
        Some(scope)
    }

    /// Drop all local variable debug information
    pub fn remove_local_variables(&mut self) {
        let ids: Vec<usize> = self.local_variables.keys().copied().collect();
        for id in ids {
            self.remove_local_variable(id);
        }
    }

    pub fn local_variables(&self) -> impl Iterator<Item = (usize, &LocalVariableScope)> + '_ {
        self.local_variables.iter().map(|(id, scope)| (*id, scope))
    }

    pub fn add_line_number(
        &mut self,
        start: InstructionHandle,
        line_number: u16,
    ) -> Result<usize, Error> {
        let id = self.fresh_id();
        self.register(&[start], Targeter::LineNumber(id))?;
        self.line_numbers.insert(id, LineNumberEntry { start, line_number });
        Ok(id)
    }

    pub fn remove_line_number(&mut self, id: usize) -> Option<LineNumberEntry> {
        let entry = self.line_numbers.remove(&id)?;
        self.unregister(&[entry.start], Targeter::LineNumber(id));
        Some(entry)
    }

    pub fn line_numbers(&self) -> impl Iterator<Item = (usize, &LineNumberEntry)> + '_ {
        self.line_numbers.iter().map(|(id, entry)| (*id, entry))
    }

    /// Move everything targeting `old` (branches, exception handler boundaries, local variable
    /// scopes, line numbers) over to `new`
    pub fn redirect_targeters(
        &mut self,
        old: InstructionHandle,
        new: InstructionHandle,
    ) -> Result<(), Error> {
        if !self.instructions.contains(new) {
            return Err(Error::UnknownHandle(new));
        }
        if old == new {
            return Ok(());
        }
        for targeter in self.instructions.targeters(old) {
            match targeter {
                Targeter::Instruction(branch) => {
                    self.instructions.update_target(branch, old, new)?;
                    continue;
                }
                Targeter::ExceptionHandler(id) => {
                    if let Some(range) = self.exception_handlers.get_mut(&id) {
                        for handle in [&mut range.start, &mut range.end, &mut range.handler] {
                            if *handle == old {
                                *handle = new;
                            }
                        }
                    }
                }
                Targeter::LocalVariable(id) => {
                    if let Some(scope) = self.local_variables.get_mut(&id) {
                        let handles = std::iter::once(&mut scope.start).chain(scope.end.as_mut());
                        for handle in handles {
                            if *handle == old {
                                *handle = new;
                            }
                        }
                    }
                }
                Targeter::LineNumber(id) => {
                    if let Some(entry) = self.line_numbers.get_mut(&id) {
                        entry.start = new;
                    }
                }
            }
            self.instructions.remove_targeter(old, targeter);
            self.instructions.add_targeter(new, targeter)?;
        }
        Ok(())
    }
}
