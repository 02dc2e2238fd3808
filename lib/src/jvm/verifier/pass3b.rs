use super::{class_constant_type, method_label, Frame, VerificationType};
use crate::jvm::class_file::{ClassFile, Constant, ConstantIndex, ConstantPool};
use crate::jvm::code::{
    Facets, Instruction, InstructionHandle, InstructionList, Opcode, StackEffect, ValueKind,
};
use crate::jvm::{
    BinaryName, Error, FieldType, MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor,
    RefType, RenderDescriptor, UnqualifiedName, VerifierErrorKind,
};
use crate::util::Width;
use log::trace;
use std::collections::HashMap;

/// Simulate a method body over verification types
///
/// Starting from the frame implied by the method descriptor, every reachable instruction is
/// executed abstractly. Frames flowing into the same instruction are merged, and the instruction
/// is revisited whenever its incoming frame changes, until nothing changes any more. Exception
/// handlers see the frame from before each instruction they cover, with only the caught exception
/// on the stack.
pub fn verify(class: &ClassFile, method_index: usize) -> Result<(), Error> {
    let label = method_label(class, method_index);
    let constants = &class.constants;
    let method = class.methods.get(method_index).ok_or_else(|| Error::CodeConstraint {
        method: label.clone(),
        offset: None,
        message: format!("class has only {} methods", class.methods.len()),
    })?;
    let code = match method.code(constants)? {
        Some(code) => code,
        None => return Ok(()),
    };
    let this_class = class.class_name()?;
    let name = method.name(constants)?;
    let descriptor = MethodDescriptor::parse(method.descriptor(constants)?).map_err(|msg| {
        Error::CodeConstraint {
            method: label.clone(),
            offset: None,
            message: msg,
        }
    })?;

    let (instructions, _) = InstructionList::decode(&code.code_array.0)?;
    let body: Vec<(usize, &Instruction<InstructionHandle>)> = instructions
        .iter()
        .filter_map(|(handle, insn)| Some((instructions.offset_of(handle)?, insn)))
        .collect();
    let position_of: HashMap<InstructionHandle, usize> = instructions
        .handles()
        .iter()
        .enumerate()
        .map(|(pos, handle)| (*handle, pos))
        .collect();
    let position_at: HashMap<usize, usize> = body
        .iter()
        .enumerate()
        .map(|(pos, (offset, _))| (*offset, pos))
        .collect();

    let fail = |pos: usize, kind: VerifierErrorKind| -> Error {
        let (offset, insn) = body
            .get(pos)
            .map_or((0, String::new()), |(offset, insn)| (*offset, insn.to_string()));
        Error::VerifierError {
            method: label.clone(),
            offset,
            instruction: insn,
            kind,
        }
    };

    // Handlers, with the position they jump to and the type they push
    let mut handlers = vec![];
    for handler in &code.exception_table {
        let handler_pos = position_at
            .get(&(handler.handler_pc.0 as usize))
            .copied()
            .ok_or_else(|| fail(0, VerifierErrorKind::InvalidType))?;
        let caught = match handler.catch_type {
            None => VerificationType::object(&BinaryName::THROWABLE),
            Some(catch_type) => {
                let name = constants.get_class_name(catch_type)?;
                class_constant_type(name)
                    .map_err(|msg| fail(handler_pos, VerifierErrorKind::InvalidConstant(msg)))?
            }
        };
        handlers.push((
            handler.start_pc.0 as usize..handler.end_pc.0 as usize,
            handler_pos,
            caught,
        ));
    }

    let is_static = method.access_flags.contains(MethodAccessFlags::STATIC);
    let is_constructor = name == UnqualifiedName::INIT.as_str();
    let context = Context {
        constants,
        this_class,
        descriptor: &descriptor,
        is_constructor,
    };

    let entry = context
        .entry_frame(code.max_locals, code.max_stack, is_static)
        .map_err(|kind| fail(0, kind))?;

    if body.is_empty() {
        return Ok(());
    }
    let mut dataflow = Dataflow::new(body.len());
    dataflow.flow_into(0, entry).map_err(|kind| fail(0, kind))?;

    while let Some((pos, frame)) = dataflow.next() {
        let (offset, insn) = body[pos];
        trace!("{} @ {}: {} with stack {:?}", label, offset, insn, frame.stack);

        for (range, handler_pos, caught) in &handlers {
            if range.contains(&offset) {
                let caught = frame
                    .with_caught(caught.clone())
                    .map_err(|kind| fail(pos, kind))?;
                dataflow
                    .flow_into(*handler_pos, caught)
                    .map_err(|kind| fail(pos, kind))?;
            }
        }

        let mut after = frame;
        context
            .execute(&mut after, insn, offset)
            .map_err(|kind| fail(pos, kind))?;

        for successor in successors(insn, pos, &position_of) {
            let successor = match successor {
                Some(successor) if successor < body.len() => successor,
                _ => return Err(fail(pos, VerifierErrorKind::FallsOffEnd)),
            };
            dataflow
                .flow_into(successor, after.clone())
                .map_err(|kind| fail(pos, kind))?;
        }
    }

    Ok(())
}

/// Frames at the start of every instruction, and the instructions left to (re)visit
struct Dataflow {
    frames: Vec<Option<Frame>>,
    queued: Vec<bool>,
    worklist: Vec<usize>,
}

impl Dataflow {
    fn new(len: usize) -> Dataflow {
        Dataflow {
            frames: vec![None; len],
            queued: vec![false; len],
            worklist: vec![],
        }
    }

    /// Merge a frame into the frame of an instruction, queueing it if something changed
    fn flow_into(&mut self, target: usize, frame: Frame) -> Result<(), VerifierErrorKind> {
        let updated = match &self.frames[target] {
            None => Some(frame),
            Some(existing) => {
                let merged = existing.merge(&frame)?;
                if merged != *existing {
                    Some(merged)
                } else {
                    None
                }
            }
        };
        if let Some(updated) = updated {
            self.frames[target] = Some(updated);
            if !self.queued[target] {
                self.queued[target] = true;
                self.worklist.push(target);
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Option<(usize, Frame)> {
        while let Some(pos) = self.worklist.pop() {
            self.queued[pos] = false;
            if let Some(frame) = &self.frames[pos] {
                return Some((pos, frame.clone()));
            }
        }
        None
    }
}

/// Positions control may flow to after an instruction (`None` when the target is unknown)
fn successors(
    insn: &Instruction<InstructionHandle>,
    pos: usize,
    position_of: &HashMap<InstructionHandle, usize>,
) -> Vec<Option<usize>> {
    let target = |handle: &InstructionHandle| position_of.get(handle).copied();
    let facets = insn.facets();
    if facets.contains(Facets::RETURN) || insn.opcode() == Opcode::ATHROW {
        return vec![];
    }
    match insn {
        Instruction::Branch(op, handle) if *op == Opcode::GOTO || *op == Opcode::GOTO_W => {
            vec![target(handle)]
        }
        Instruction::Branch(_, handle) => vec![Some(pos + 1), target(handle)],
        Instruction::TableSwitch {
            default, targets, ..
        } => std::iter::once(default)
            .chain(targets.iter())
            .map(target)
            .collect(),
        Instruction::LookupSwitch(select) => std::iter::once(select.default())
            .chain(select.targets().iter())
            .map(target)
            .collect(),
        _ => vec![Some(pos + 1)],
    }
}

struct Context<'a> {
    constants: &'a ConstantPool,
    this_class: &'a str,
    descriptor: &'a MethodDescriptor,
    is_constructor: bool,
}

fn kind_type(kind: ValueKind) -> VerificationType {
    match kind {
        ValueKind::Int => VerificationType::Integer,
        ValueKind::Long => VerificationType::Long,
        ValueKind::Float => VerificationType::Float,
        ValueKind::Double => VerificationType::Double,
        ValueKind::Reference => VerificationType::object(&BinaryName::OBJECT),
    }
}

fn invalid_constant(err: Error) -> VerifierErrorKind {
    VerifierErrorKind::InvalidConstant(err.to_string())
}

fn parse_field_type(descriptor: &str) -> Result<VerificationType, VerifierErrorKind> {
    FieldType::parse(descriptor)
        .map(|field_type| VerificationType::from_field_type(&field_type))
        .map_err(|_| VerifierErrorKind::BadDescriptor(descriptor.to_owned()))
}

fn parse_method_descriptor(descriptor: &str) -> Result<MethodDescriptor, VerifierErrorKind> {
    MethodDescriptor::parse(descriptor)
        .map_err(|_| VerifierErrorKind::BadDescriptor(descriptor.to_owned()))
}

impl<'a> Context<'a> {
    /// `this` (unless the method is static), then the parameters, then unusable locals
    fn entry_frame(
        &self,
        max_locals: u16,
        max_stack: u16,
        is_static: bool,
    ) -> Result<Frame, VerifierErrorKind> {
        let mut frame = Frame::new(max_locals, max_stack);
        let mut index: u16 = 0;
        if !is_static {
            let this = if self.is_constructor && self.this_class != BinaryName::OBJECT.as_str() {
                VerificationType::UninitializedThis
            } else {
                VerificationType::Object(self.this_class.to_owned())
            };
            frame.store(index, this)?;
            index += 1;
        }
        for parameter in &self.descriptor.parameters {
            let typ = VerificationType::from_field_type(parameter);
            let width = typ.width() as u16;
            frame.store(index, typ)?;
            index += width;
        }
        Ok(frame)
    }

    fn pop_kind(frame: &mut Frame, kind: ValueKind) -> Result<VerificationType, VerifierErrorKind> {
        match kind {
            ValueKind::Reference => frame.pop_reference(),
            other => frame.pop_expecting(&kind_type(other)),
        }
    }

    /// Pop the arguments of a method (last argument first)
    fn pop_arguments(
        frame: &mut Frame,
        descriptor: &MethodDescriptor,
    ) -> Result<(), VerifierErrorKind> {
        for parameter in descriptor.parameters.iter().rev() {
            frame.pop_expecting(&VerificationType::from_field_type(parameter))?;
        }
        Ok(())
    }

    fn push_return(frame: &mut Frame, descriptor: &MethodDescriptor) -> Result<(), VerifierErrorKind> {
        if let Some(return_type) = &descriptor.return_type {
            frame.push(VerificationType::from_field_type(return_type))?;
        }
        Ok(())
    }

    fn execute(
        &self,
        frame: &mut Frame,
        insn: &Instruction<InstructionHandle>,
        offset: usize,
    ) -> Result<(), VerifierErrorKind> {
        use VerificationType as VT;

        let opcode = insn.opcode();

        // Loads and stores (including the forms with an implicit index)
        if let Some(access) = opcode.local_access() {
            let index = insn.local_index().ok_or(VerifierErrorKind::InvalidType)?;
            if access.is_store {
                let value = match access.kind {
                    ValueKind::Reference => {
                        let value = frame.pop()?;
                        if !value.is_reference() {
                            return Err(VerifierErrorKind::IncompatibleTypes(
                                kind_type(ValueKind::Reference),
                                value,
                            ));
                        }
                        value
                    }
                    kind => frame.pop_expecting(&kind_type(kind))?,
                };
                frame.store(index, value)?;
            } else {
                let value = frame.load(index, &kind_type(access.kind))?;
                frame.push(value)?;
            }
            return Ok(());
        }

        if let Some(StackEffect::Fixed { pops, pushes }) = opcode.info().map(|info| info.effect) {
            for code in pops.chars().rev() {
                let kind = ValueKind::from_code(code).ok_or(VerifierErrorKind::InvalidType)?;
                Self::pop_kind(frame, kind)?;
            }
            for code in pushes.chars() {
                let kind = ValueKind::from_code(code).ok_or(VerifierErrorKind::InvalidType)?;
                frame.push(kind_type(kind))?;
            }
            return Ok(());
        }

        match insn {
            Instruction::Plain(Opcode::ACONST_NULL) => frame.push(VT::Null)?,

            Instruction::IInc { index, .. } => {
                frame.load(*index, &VT::Integer)?;
            }

            // Array loads
            Instruction::Plain(op) if (Opcode::IALOAD..=Opcode::SALOAD).contains(op) => {
                frame.pop_expecting(&VT::Integer)?;
                let array = frame.pop_reference()?;
                let element = match *op {
                    Opcode::AALOAD => match array.array_component() {
                        Some(component) if component.is_reference() => component,
                        _ => return Err(VerifierErrorKind::NotArrayType),
                    },
                    Opcode::BALOAD if array.is_byte_or_boolean_array() => VT::Integer,
                    _ => {
                        let (element, typ) = primitive_array_element(*op);
                        if !array.is_array_of(element) {
                            return Err(VerifierErrorKind::NotArrayType);
                        }
                        typ
                    }
                };
                frame.push(element)?;
            }

            // Array stores
            Instruction::Plain(op) if (Opcode::IASTORE..=Opcode::SASTORE).contains(op) => {
                match *op {
                    Opcode::AASTORE => {
                        frame.pop_reference()?;
                    }
                    Opcode::BASTORE => {
                        frame.pop_expecting(&VT::Integer)?;
                    }
                    other => {
                        let (_, typ) = primitive_array_element(Opcode(other.0 - 0x21));
                        frame.pop_expecting(&typ)?;
                    }
                }
                frame.pop_expecting(&VT::Integer)?;
                let array = frame.pop_reference()?;
                let is_right_array = match *op {
                    Opcode::AASTORE => {
                        matches!(array.array_component(), Some(component) if component.is_reference())
                    }
                    Opcode::BASTORE => array.is_byte_or_boolean_array(),
                    other => array.is_array_of(primitive_array_element(Opcode(other.0 - 0x21)).0),
                };
                if !is_right_array {
                    return Err(VerifierErrorKind::NotArrayType);
                }
            }

            Instruction::Plain(Opcode::POP) => {
                frame.pop_width(1)?;
            }
            Instruction::Plain(Opcode::POP2) => {
                if frame.pop()?.width() == 1 {
                    frame.pop_width(1)?;
                }
            }
            Instruction::Plain(Opcode::DUP) => {
                let value = frame.pop_width(1)?;
                frame.push(value.clone())?;
                frame.push(value)?;
            }
            Instruction::Plain(Opcode::DUP_X1) => {
                let value1 = frame.pop_width(1)?;
                let value2 = frame.pop_width(1)?;
                push_all(frame, [&value1, &value2, &value1])?;
            }
            Instruction::Plain(Opcode::DUP_X2) => {
                let value1 = frame.pop_width(1)?;
                let value2 = frame.pop()?;
                if value2.width() == 2 {
                    push_all(frame, [&value1, &value2, &value1])?;
                } else {
                    let value3 = frame.pop_width(1)?;
                    push_all(frame, [&value1, &value3, &value2, &value1])?;
                }
            }
            Instruction::Plain(Opcode::DUP2) => {
                let value1 = frame.pop()?;
                if value1.width() == 2 {
                    push_all(frame, [&value1, &value1])?;
                } else {
                    let value2 = frame.pop_width(1)?;
                    push_all(frame, [&value2, &value1, &value2, &value1])?;
                }
            }
            Instruction::Plain(Opcode::DUP2_X1) => {
                let value1 = frame.pop()?;
                if value1.width() == 2 {
                    let value2 = frame.pop_width(1)?;
                    push_all(frame, [&value1, &value2, &value1])?;
                } else {
                    let value2 = frame.pop_width(1)?;
                    let value3 = frame.pop_width(1)?;
                    push_all(frame, [&value2, &value1, &value3, &value2, &value1])?;
                }
            }
            Instruction::Plain(Opcode::DUP2_X2) => {
                let value1 = frame.pop()?;
                if value1.width() == 2 {
                    let value2 = frame.pop()?;
                    if value2.width() == 2 {
                        push_all(frame, [&value1, &value2, &value1])?;
                    } else {
                        let value3 = frame.pop_width(1)?;
                        push_all(frame, [&value1, &value3, &value2, &value1])?;
                    }
                } else {
                    let value2 = frame.pop_width(1)?;
                    let value3 = frame.pop()?;
                    if value3.width() == 2 {
                        push_all(frame, [&value2, &value1, &value3, &value2, &value1])?;
                    } else {
                        let value4 = frame.pop_width(1)?;
                        push_all(
                            frame,
                            [&value2, &value1, &value4, &value3, &value2, &value1],
                        )?;
                    }
                }
            }
            Instruction::Plain(Opcode::SWAP) => {
                let value1 = frame.pop_width(1)?;
                let value2 = frame.pop_width(1)?;
                push_all(frame, [&value1, &value2])?;
            }

            Instruction::Plain(Opcode::RETURN) => {
                if self.descriptor.return_type.is_some() {
                    return Err(VerifierErrorKind::BadReturn);
                }
                if self.is_constructor && frame.has_uninitialized_this() {
                    return Err(VerifierErrorKind::UninitializedObject);
                }
            }
            Instruction::Plain(op) if (Opcode::IRETURN..=Opcode::ARETURN).contains(op) => {
                let expected = match &self.descriptor.return_type {
                    Some(return_type) => VerificationType::from_field_type(return_type),
                    None => return Err(VerifierErrorKind::BadReturn),
                };
                let matches_opcode = match *op {
                    Opcode::IRETURN => expected == VT::Integer,
                    Opcode::LRETURN => expected == VT::Long,
                    Opcode::FRETURN => expected == VT::Float,
                    Opcode::DRETURN => expected == VT::Double,
                    _ => expected.is_reference(),
                };
                if !matches_opcode {
                    return Err(VerifierErrorKind::BadReturn);
                }
                if expected.is_reference() {
                    let value = frame.pop_reference()?;
                    if !VerificationType::is_assignable(&value, &expected) {
                        return Err(VerifierErrorKind::IncompatibleTypes(expected, value));
                    }
                } else {
                    frame.pop_expecting(&expected)?;
                }
            }

            Instruction::Plain(Opcode::ARRAYLENGTH) => {
                let array = frame.pop_reference()?;
                if array.array_component().is_none() {
                    return Err(VerifierErrorKind::NotArrayType);
                }
                frame.push(VT::Integer)?;
            }
            Instruction::Plain(Opcode::ATHROW) => {
                frame.pop_reference()?;
            }

            Instruction::Constant(op, index) => self.execute_constant(frame, *op, *index, offset)?,

            Instruction::InvokeInterface { method, .. } => {
                let member = self.constants.get_member_ref(*method).map_err(invalid_constant)?;
                let descriptor = parse_method_descriptor(member.descriptor)?;
                Self::pop_arguments(frame, &descriptor)?;
                frame.pop_reference()?;
                Self::push_return(frame, &descriptor)?;
            }

            Instruction::InvokeDynamic(index) => {
                let name_and_type = match self.constants.get(*index).map_err(invalid_constant)? {
                    Constant::InvokeDynamic { name_and_type, .. } => *name_and_type,
                    other => {
                        return Err(VerifierErrorKind::InvalidConstant(format!(
                            "expected InvokeDynamic, found {:?}",
                            other
                        )))
                    }
                };
                let (_, descriptor) = self
                    .constants
                    .get_name_and_type(name_and_type)
                    .map_err(invalid_constant)?;
                let descriptor = parse_method_descriptor(descriptor)?;
                Self::pop_arguments(frame, &descriptor)?;
                Self::push_return(frame, &descriptor)?;
            }

            Instruction::NewArray(base_type) => {
                frame.pop_expecting(&VT::Integer)?;
                let array = FieldType::array(FieldType::Base(*base_type));
                frame.push(VT::Object(array.render()))?;
            }

            Instruction::MultiANewArray { class, dimensions } => {
                for _ in 0..*dimensions {
                    frame.pop_expecting(&VT::Integer)?;
                }
                frame.push(self.class_type(*class)?)?;
            }

            Instruction::Branch(op, _) if op.facets().contains(Facets::SUBROUTINE) => {
                return Err(VerifierErrorKind::Subroutine)
            }
            Instruction::Local(Opcode::RET, _) => return Err(VerifierErrorKind::Subroutine),

            _ => return Err(VerifierErrorKind::InvalidType),
        }
        Ok(())
    }

    fn class_type(&self, index: ConstantIndex) -> Result<VerificationType, VerifierErrorKind> {
        let name = self.constants.get_class_name(index).map_err(invalid_constant)?;
        class_constant_type(name).map_err(VerifierErrorKind::InvalidConstant)
    }

    fn execute_constant(
        &self,
        frame: &mut Frame,
        opcode: Opcode,
        index: ConstantIndex,
        offset: usize,
    ) -> Result<(), VerifierErrorKind> {
        use VerificationType as VT;

        match opcode {
            Opcode::LDC | Opcode::LDC_W | Opcode::LDC2_W => {
                let typ = match self.constants.get(index).map_err(invalid_constant)? {
                    Constant::Integer(_) => VT::Integer,
                    Constant::Float(_) => VT::Float,
                    Constant::Long(_) => VT::Long,
                    Constant::Double(_) => VT::Double,
                    Constant::String(_) => VT::object(&BinaryName::STRING),
                    Constant::Class(_) => VT::object(&BinaryName::CLASS),
                    Constant::MethodHandle { .. } => VT::object(&BinaryName::METHODHANDLE),
                    Constant::MethodType { .. } => VT::object(&BinaryName::METHODTYPE),
                    Constant::Dynamic { name_and_type, .. } => {
                        let (_, descriptor) = self
                            .constants
                            .get_name_and_type(*name_and_type)
                            .map_err(invalid_constant)?;
                        parse_field_type(descriptor)?
                    }
                    other => {
                        return Err(VerifierErrorKind::InvalidConstant(format!(
                            "{:?} is not loadable",
                            other
                        )))
                    }
                };
                if (opcode == Opcode::LDC2_W) != (typ.width() == 2) {
                    return Err(VerifierErrorKind::InvalidWidth(typ.width()));
                }
                frame.push(typ)?;
            }

            Opcode::GETSTATIC | Opcode::PUTSTATIC | Opcode::GETFIELD | Opcode::PUTFIELD => {
                let member = self.constants.get_member_ref(index).map_err(invalid_constant)?;
                let field_type = parse_field_type(member.descriptor)?;
                match opcode {
                    Opcode::GETSTATIC => frame.push(field_type)?,
                    Opcode::PUTSTATIC => {
                        frame.pop_expecting(&field_type)?;
                    }
                    Opcode::GETFIELD => {
                        frame.pop_reference()?;
                        frame.push(field_type)?;
                    }
                    _ => {
                        frame.pop_expecting(&field_type)?;
                        // Constructors may set their own fields before calling the super constructor
                        let object = frame.pop()?;
                        let own_field = object == VT::UninitializedThis && member.class == self.this_class;
                        if !own_field {
                            if object.is_uninitialized() {
                                return Err(VerifierErrorKind::UninitializedObject);
                            } else if !object.is_reference() {
                                return Err(VerifierErrorKind::IncompatibleTypes(
                                    kind_type(ValueKind::Reference),
                                    object,
                                ));
                            }
                        }
                    }
                }
            }

            Opcode::INVOKEVIRTUAL | Opcode::INVOKESPECIAL | Opcode::INVOKESTATIC => {
                let member = self.constants.get_member_ref(index).map_err(invalid_constant)?;
                let descriptor = parse_method_descriptor(member.descriptor)?;
                Self::pop_arguments(frame, &descriptor)?;
                if opcode == Opcode::INVOKESPECIAL && member.name == UnqualifiedName::INIT.as_str() {
                    let receiver = frame.pop()?;
                    let initialized = match &receiver {
                        VT::UninitializedThis => VT::Object(self.this_class.to_owned()),
                        VT::Uninitialized(_) => class_constant_type(member.class)
                            .map_err(VerifierErrorKind::InvalidConstant)?,
                        other => {
                            return Err(VerifierErrorKind::IncompatibleTypes(
                                VT::UninitializedThis,
                                other.clone(),
                            ))
                        }
                    };
                    frame.initialize(&receiver, initialized);
                } else if opcode != Opcode::INVOKESTATIC {
                    frame.pop_reference()?;
                }
                Self::push_return(frame, &descriptor)?;
            }

            Opcode::NEW => {
                self.class_type(index)?;
                frame.push(VT::Uninitialized(offset))?;
            }

            Opcode::ANEWARRAY => {
                frame.pop_expecting(&VT::Integer)?;
                let name = self.constants.get_class_name(index).map_err(invalid_constant)?;
                let component = RefType::from_class_constant(name)
                    .map_err(VerifierErrorKind::InvalidConstant)?;
                let array = RefType::array_of(FieldType::Ref(component));
                frame.push(VT::Object(array.class_constant_name()))?;
            }

            Opcode::CHECKCAST => {
                frame.pop_reference()?;
                frame.push(self.class_type(index)?)?;
            }

            _ => return Err(VerifierErrorKind::InvalidType),
        }
        Ok(())
    }
}

/// Element descriptor and loaded type for the primitive array loads
fn primitive_array_element(load: Opcode) -> (&'static str, VerificationType) {
    match load {
        Opcode::IALOAD => ("I", VerificationType::Integer),
        Opcode::LALOAD => ("J", VerificationType::Long),
        Opcode::FALOAD => ("F", VerificationType::Float),
        Opcode::DALOAD => ("D", VerificationType::Double),
        Opcode::CALOAD => ("C", VerificationType::Integer),
        Opcode::SALOAD => ("S", VerificationType::Integer),
        _ => ("B", VerificationType::Integer),
    }
}

fn push_all<const N: usize>(
    frame: &mut Frame,
    values: [&VerificationType; N],
) -> Result<(), VerifierErrorKind> {
    for value in values {
        frame.push(value.clone())?;
    }
    Ok(())
}
