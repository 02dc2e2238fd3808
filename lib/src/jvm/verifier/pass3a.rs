use super::method_label;
use crate::jvm::class_file::{ClassFile, Constant, ConstantIndex, ConstantPool, MemberKind};
use crate::jvm::code::{Instruction, InstructionHandle, MethodCode, Opcode};
use crate::jvm::{
    Error, MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor, RefType,
    UnqualifiedName, MAX_ARRAY_DIMENSIONS,
};

/// Largest code array a `Code` attribute can hold
const MAX_CODE_LENGTH: usize = 65535;

/// First class file major version in which `jsr` and `ret` are forbidden
const NO_SUBROUTINES_MAJOR_VERSION: u16 = 51;

/// Check the structural constraints on one method body
///
/// This covers everything that can be checked one instruction at a time, without simulating
/// the operand stack: the code decodes, branches land on instructions, exception and debug
/// tables cover sensible ranges, constant operands have the right kinds, and local variable
/// indices fit in `max_locals`. Methods without code (abstract or native) trivially pass.
pub fn verify(class: &ClassFile, method_index: usize) -> Result<(), Error> {
    let label = method_label(class, method_index);
    let constants = &class.constants;
    let method = class.methods.get(method_index).ok_or_else(|| Error::CodeConstraint {
        method: label.clone(),
        offset: None,
        message: format!("class has only {} methods", class.methods.len()),
    })?;
    let checker = Checker {
        label: &label,
        constants,
        major_version: class.version.major_version,
    };

    let code = match method.code(constants).map_err(|err| checker.fault(None, err))? {
        Some(code) => code,
        None => return Ok(()),
    };

    let code_length = code.code_array.0.len();
    if code_length == 0 || code_length > MAX_CODE_LENGTH {
        return Err(checker.fault(
            None,
            format!("code length {} is outside 1..={}", code_length, MAX_CODE_LENGTH),
        ));
    }

    let is_static = method.access_flags.contains(MethodAccessFlags::STATIC);
    let descriptor = method
        .descriptor(constants)
        .map_err(|err| checker.fault(None, err))?;
    let descriptor =
        MethodDescriptor::parse(descriptor).map_err(|msg| checker.fault(None, msg))?;
    let parameter_slots = descriptor.parameter_length(!is_static);
    if parameter_slots > code.max_locals as usize {
        return Err(checker.fault(
            None,
            format!(
                "max_locals {} is too small for {} parameter slots",
                code.max_locals, parameter_slots
            ),
        ));
    }

    // Branch targets, exception ranges and debug tables must all land on instructions
    let lifted = MethodCode::from_code(&code, constants).map_err(|err| checker.fault(None, err))?;

    for (_, range) in lifted.exception_handlers() {
        if let Some(catch_type) = range.catch_type {
            let offset = lifted.instructions.offset_of(range.handler);
            let class_name = constants
                .get_class_name(catch_type)
                .map_err(|err| checker.fault(offset, format!("bad catch type: {}", err)))?;
            if class_name.starts_with('[') {
                return Err(checker.fault(
                    offset,
                    format!("arrays can't be caught ({})", class_name),
                ));
            }
        }
    }

    for (handle, instruction) in lifted.instructions.iter() {
        let offset = lifted.instructions.offset_of(handle);
        checker
            .check_instruction(instruction, code.max_locals)
            .map_err(|msg| checker.fault(offset, format!("{}: {}", instruction, msg)))?;
    }

    Ok(())
}

struct Checker<'a> {
    label: &'a str,
    constants: &'a ConstantPool,
    major_version: u16,
}

impl<'a> Checker<'a> {
    fn fault(&self, offset: Option<usize>, message: impl ToString) -> Error {
        Error::CodeConstraint {
            method: self.label.to_owned(),
            offset,
            message: message.to_string(),
        }
    }

    fn constant(&self, index: ConstantIndex) -> Result<&'a Constant, String> {
        self.constants.get(index).map_err(|err| err.to_string())
    }

    fn check_instruction(
        &self,
        instruction: &Instruction<InstructionHandle>,
        max_locals: u16,
    ) -> Result<(), String> {
        let opcode = instruction.opcode();
        match instruction {
            Instruction::Plain(op) => {
                if let Some(access) = op.local_access() {
                    if let Some(index) = access.implicit_index {
                        check_local(index, access.kind.slots(), max_locals)?;
                    }
                }
            }

            Instruction::Local(op, index) => {
                let slots = op.local_access().map_or(1, |access| access.kind.slots());
                check_local(*index, slots, max_locals)?;
                if *op == Opcode::RET {
                    self.check_subroutines_allowed()?;
                }
            }

            Instruction::IInc { index, .. } => check_local(*index, 1, max_locals)?,

            Instruction::Branch(op, _) => {
                if *op == Opcode::JSR || *op == Opcode::JSR_W {
                    self.check_subroutines_allowed()?;
                }
            }

            Instruction::Constant(op, index) => self.check_constant_operand(*op, *index)?,

            Instruction::InvokeInterface { method, count } => {
                let member = self
                    .constants
                    .get_member_ref(*method)
                    .map_err(|err| err.to_string())?;
                if member.kind != MemberKind::InterfaceMethod {
                    return Err(format!("{} is not an interface method", member.name));
                }
                check_invoked_name(opcode, member.name)?;
                let descriptor = MethodDescriptor::parse(member.descriptor)?;
                let expected = descriptor.parameter_length(true);
                if *count as usize != expected {
                    return Err(format!(
                        "argument count is {} but the descriptor needs {}",
                        count, expected
                    ));
                }
            }

            Instruction::InvokeDynamic(index) => match self.constant(*index)? {
                Constant::InvokeDynamic { name_and_type, .. } => {
                    let (name, _) = self
                        .constants
                        .get_name_and_type(*name_and_type)
                        .map_err(|err| err.to_string())?;
                    check_invoked_name(opcode, name)?;
                }
                other => return Err(format!("expected an InvokeDynamic constant, found {:?}", other)),
            },

            Instruction::MultiANewArray { class, dimensions } => {
                let array = match self.class_operand(*class)? {
                    RefType::Array(array) => array,
                    RefType::Object(name) => {
                        return Err(format!("{} is not an array type", name.as_str()))
                    }
                };
                if *dimensions == 0 || *dimensions as usize > array.dimensions {
                    return Err(format!(
                        "can't create {} dimensions of a {} dimensional array",
                        dimensions, array.dimensions
                    ));
                }
            }

            Instruction::BiPush(_)
            | Instruction::SiPush(_)
            | Instruction::NewArray(_)
            | Instruction::TableSwitch { .. }
            | Instruction::LookupSwitch(_) => (),
        }
        Ok(())
    }

    fn check_subroutines_allowed(&self) -> Result<(), String> {
        if self.major_version >= NO_SUBROUTINES_MAJOR_VERSION {
            Err(format!(
                "subroutines are not allowed in class file version {}",
                self.major_version
            ))
        } else {
            Ok(())
        }
    }

    fn class_operand(&self, index: ConstantIndex) -> Result<RefType, String> {
        let name = self
            .constants
            .get_class_name(index)
            .map_err(|err| err.to_string())?;
        RefType::from_class_constant(name)
    }

    fn check_constant_operand(&self, opcode: Opcode, index: ConstantIndex) -> Result<(), String> {
        match opcode {
            Opcode::LDC | Opcode::LDC_W => {
                let constant = self.constant(index)?;
                if !constant.is_single_width_loadable() {
                    return Err(format!("{:?} can't be loaded with {}", constant, opcode));
                }
            }

            Opcode::LDC2_W => match self.constant(index)? {
                Constant::Long(_) | Constant::Double(_) => (),
                other => return Err(format!("{:?} can't be loaded with {}", other, opcode)),
            },

            Opcode::GETSTATIC | Opcode::PUTSTATIC | Opcode::GETFIELD | Opcode::PUTFIELD => {
                let member = self
                    .constants
                    .get_member_ref(index)
                    .map_err(|err| err.to_string())?;
                if member.kind != MemberKind::Field {
                    return Err(format!("{} is not a field", member.name));
                }
            }

            Opcode::INVOKEVIRTUAL | Opcode::INVOKESPECIAL | Opcode::INVOKESTATIC => {
                let member = self
                    .constants
                    .get_member_ref(index)
                    .map_err(|err| err.to_string())?;
                match member.kind {
                    MemberKind::Field => return Err(format!("{} is not a method", member.name)),
                    MemberKind::InterfaceMethod if opcode == Opcode::INVOKEVIRTUAL => {
                        return Err(format!(
                            "{} is an interface method (use invokeinterface)",
                            member.name
                        ))
                    }
                    _ => (),
                }
                check_invoked_name(opcode, member.name)?;
            }

            Opcode::NEW => {
                if let RefType::Array(_) = self.class_operand(index)? {
                    return Err(String::from("new can't create arrays"));
                }
            }

            Opcode::ANEWARRAY => {
                if let RefType::Array(array) = self.class_operand(index)? {
                    if array.dimensions >= MAX_ARRAY_DIMENSIONS {
                        return Err(format!(
                            "array would have more than {} dimensions",
                            MAX_ARRAY_DIMENSIONS
                        ));
                    }
                }
            }

            Opcode::CHECKCAST | Opcode::INSTANCEOF => {
                self.class_operand(index)?;
            }

            _ => (),
        }
        Ok(())
    }
}

/// Constructors are only called through `invokespecial`, and class initializers never are
fn check_invoked_name(opcode: Opcode, name: &str) -> Result<(), String> {
    if name == UnqualifiedName::CLINIT.as_str() {
        Err(String::from("class initializers can't be invoked"))
    } else if name == UnqualifiedName::INIT.as_str() && opcode != Opcode::INVOKESPECIAL {
        Err(format!("constructors can't be invoked with {}", opcode))
    } else {
        Ok(())
    }
}

fn check_local(index: u16, slots: u16, max_locals: u16) -> Result<(), String> {
    if index as usize + slots as usize > max_locals as usize {
        Err(format!(
            "local variable {} is out of range (max_locals is {})",
            index, max_locals
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::{Method, Version};
    use crate::jvm::ClassAccessFlags;

    fn class() -> ClassFile {
        ClassFile::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            "a/Foo",
            Some("java/lang/Object"),
        )
        .unwrap()
    }

    /// Check `static void m()` with the given body
    fn check(
        mut class: ClassFile,
        max_locals: u16,
        instructions: Vec<Instruction<InstructionHandle>>,
    ) -> Result<(), String> {
        let mut code = MethodCode::new(4, max_locals);
        for instruction in instructions {
            code.instructions.append(instruction).unwrap();
        }
        code.instructions
            .append(Instruction::Plain(Opcode::RETURN))
            .unwrap();
        let code = code.into_code(&mut class.constants).unwrap();
        let mut method = Method {
            access_flags: MethodAccessFlags::STATIC,
            name_index: class.constants.add_utf8("m").unwrap(),
            descriptor_index: class.constants.add_utf8("()V").unwrap(),
            attributes: vec![],
        };
        method.set_code(&mut class.constants, &code).unwrap();
        class.methods.push(method);
        verify(&class, 0).map_err(|err| err.to_string())
    }

    #[test]
    fn missing_method() {
        assert!(verify(&class(), 0).is_err());
    }

    #[test]
    fn invokeinterface_counts() {
        let mut good = class();
        let method = good
            .constants
            .add_method_ref("a/Iface", "m", "(JI)V", true)
            .unwrap();
        check(good, 0, vec![Instruction::InvokeInterface { method, count: 4 }]).unwrap();

        let mut bad = class();
        let method = bad
            .constants
            .add_method_ref("a/Iface", "m", "(JI)V", true)
            .unwrap();
        let err = check(bad, 0, vec![Instruction::InvokeInterface { method, count: 3 }])
            .unwrap_err();
        assert!(err.contains("argument count is 3"), "{}", err);

        let mut not_interface = class();
        let method = not_interface
            .constants
            .add_method_ref("a/Bar", "m", "()V", false)
            .unwrap();
        let err = check(
            not_interface,
            0,
            vec![Instruction::InvokeInterface { method, count: 1 }],
        )
        .unwrap_err();
        assert!(err.contains("is not an interface method"), "{}", err);
    }

    #[test]
    fn special_method_names() {
        let mut clinit = class();
        let method = clinit
            .constants
            .add_method_ref("a/Foo", "<clinit>", "()V", false)
            .unwrap();
        let err = check(clinit, 0, vec![Instruction::Constant(Opcode::INVOKESTATIC, method)])
            .unwrap_err();
        assert!(err.contains("class initializers"), "{}", err);

        let mut init = class();
        let method = init
            .constants
            .add_method_ref("a/Foo", "<init>", "()V", false)
            .unwrap();
        let err = check(
            init,
            0,
            vec![
                Instruction::Plain(Opcode::ACONST_NULL),
                Instruction::Constant(Opcode::INVOKEVIRTUAL, method),
            ],
        )
        .unwrap_err();
        assert!(err.contains("constructors can't be invoked with invokevirtual"), "{}", err);
    }

    #[test]
    fn array_class_operands() {
        let mut new_array = class();
        let array = new_array.constants.add_class("[I").unwrap();
        let err = check(new_array, 0, vec![Instruction::Constant(Opcode::NEW, array.0)])
            .unwrap_err();
        assert!(err.contains("new can't create arrays"), "{}", err);

        for (dimensions, ok) in [(0, false), (1, true), (2, true), (3, false)] {
            let mut multi = class();
            let array = multi.constants.add_class("[[I").unwrap();
            let result = check(
                multi,
                0,
                vec![
                    Instruction::Plain(Opcode::ICONST_1),
                    Instruction::Plain(Opcode::ICONST_1),
                    Instruction::MultiANewArray {
                        class: array.0,
                        dimensions,
                    },
                ],
            );
            assert_eq!(result.is_ok(), ok, "{} dimensions: {:?}", dimensions, result);
        }

        let mut not_array = class();
        let object = not_array.constants.add_class("java/lang/Object").unwrap();
        let err = check(
            not_array,
            0,
            vec![Instruction::MultiANewArray {
                class: object.0,
                dimensions: 1,
            }],
        )
        .unwrap_err();
        assert!(err.contains("is not an array type"), "{}", err);
    }

    #[test]
    fn constant_operand_kinds() {
        let mut ldc2 = class();
        let int = ldc2.constants.add_integer(5).unwrap();
        assert!(check(ldc2, 0, vec![Instruction::Constant(Opcode::LDC2_W, int)]).is_err());

        let mut getfield = class();
        let method = getfield
            .constants
            .add_method_ref("a/Foo", "m", "()V", false)
            .unwrap();
        let err = check(
            getfield,
            0,
            vec![Instruction::Constant(Opcode::GETSTATIC, method)],
        )
        .unwrap_err();
        assert!(err.contains("is not a field"), "{}", err);

        let mut string = class();
        let value = string.constants.add_string("hello").unwrap();
        check(string, 0, vec![Instruction::Constant(Opcode::LDC, value)]).unwrap();
    }

    #[test]
    fn local_indices() {
        check(class(), 2, vec![Instruction::IInc { index: 1, delta: 1 }]).unwrap();
        assert!(check(class(), 1, vec![Instruction::IInc { index: 1, delta: 1 }]).is_err());

        // A long in local 1 needs slots 1 and 2
        let err = check(
            class(),
            2,
            vec![
                Instruction::Plain(Opcode::LCONST_0),
                Instruction::Local(Opcode::LSTORE, 1),
            ],
        )
        .unwrap_err();
        assert!(err.contains("local variable 1 is out of range"), "{}", err);
    }
}
