use crate::jvm::class_file::{
    Attribute, AttributeLike, ClassFile, Code, Constant, ConstantIndex, ConstantPool,
    ConstantValue,
};
use crate::jvm::{
    BaseType, BinaryName, ClassAccessFlags, Error, FieldType, MethodAccessFlags,
    MethodDescriptor, Name, ParseDescriptor, RefType, UnqualifiedName, MAX_PARAMETER_SLOTS,
};
use std::collections::HashSet;

/// Check static constraints that only need the class itself
///
/// These are the checks that don't look inside method bodies: constant pool entries point at
/// the right kinds of entries and contain valid names and descriptors, the class and its members
/// have sensible access flags, no member is declared twice, and attributes agree with the members
/// they are attached to.
pub fn verify(class: &ClassFile) -> Result<(), Error> {
    check_constant_pool(&class.constants)?;
    check_class_header(class)?;
    check_fields(class)?;
    check_methods(class)?;
    Ok(())
}

fn constraint(message: String) -> Error {
    Error::ClassConstraint(message)
}

/// Wrap lookups into the pool so that they read as constraint violations
fn lookup<T>(result: Result<T, Error>, context: impl FnOnce() -> String) -> Result<T, Error> {
    result.map_err(|err| constraint(format!("{}: {}", context(), err)))
}

fn check_constant_pool(constants: &ConstantPool) -> Result<(), Error> {
    for (index, constant) in constants.iter() {
        let context = || format!("constant #{}", index.0);
        match constant {
            Constant::Utf8(_)
            | Constant::Integer(_)
            | Constant::Float(_)
            | Constant::Long(_)
            | Constant::Double(_) => (),

            Constant::Class(name) => {
                let name = lookup(constants.get_utf8(*name), context)?;
                RefType::from_class_constant(name)
                    .map_err(|msg| constraint(format!("{}: invalid class name: {}", context(), msg)))?;
            }

            Constant::String(value) => {
                lookup(constants.get_utf8(*value), context)?;
            }

            Constant::FieldRef {
                class,
                name_and_type,
            } => {
                lookup(constants.get_class_name(*class), context)?;
                let (name, descriptor) = lookup(constants.get_name_and_type(*name_and_type), context)?;
                UnqualifiedName::check_valid(name)
                    .map_err(|msg| constraint(format!("{}: {}", context(), msg)))?;
                FieldType::parse(descriptor)
                    .map_err(|msg| constraint(format!("{}: {}", context(), msg)))?;
            }

            Constant::MethodRef {
                class,
                name_and_type,
                ..
            } => {
                lookup(constants.get_class_name(*class), context)?;
                let (name, descriptor) = lookup(constants.get_name_and_type(*name_and_type), context)?;
                check_method_ref(name, descriptor)
                    .map_err(|msg| constraint(format!("{}: {}", context(), msg)))?;
            }

            Constant::NameAndType { name, descriptor } => {
                lookup(constants.get_utf8(*name), context)?;
                lookup(constants.get_utf8(*descriptor), context)?;
            }

            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                let member_constant = lookup(constants.get(*member), context)?;
                let is_field = matches!(member_constant, Constant::FieldRef { .. });
                let is_method = matches!(member_constant, Constant::MethodRef { .. });
                if (handle_kind.is_field() && !is_field) || (!handle_kind.is_field() && !is_method) {
                    return Err(constraint(format!(
                        "{}: {:?} method handle points at {:?}",
                        context(),
                        handle_kind,
                        member_constant
                    )));
                }
            }

            Constant::MethodType { descriptor } => {
                let descriptor = lookup(constants.get_utf8(*descriptor), context)?;
                MethodDescriptor::parse(descriptor)
                    .map_err(|msg| constraint(format!("{}: {}", context(), msg)))?;
            }

            Constant::Dynamic { name_and_type, .. } => {
                let (_, descriptor) = lookup(constants.get_name_and_type(*name_and_type), context)?;
                FieldType::parse(descriptor)
                    .map_err(|msg| constraint(format!("{}: {}", context(), msg)))?;
            }

            Constant::InvokeDynamic { name_and_type, .. } => {
                let (name, descriptor) = lookup(constants.get_name_and_type(*name_and_type), context)?;
                UnqualifiedName::check_valid(name)
                    .map_err(|msg| constraint(format!("{}: {}", context(), msg)))?;
                MethodDescriptor::parse(descriptor)
                    .map_err(|msg| constraint(format!("{}: {}", context(), msg)))?;
            }

            Constant::Module(name) | Constant::Package(name) => {
                lookup(constants.get_utf8(*name), context)?;
            }
        }
    }
    Ok(())
}

fn check_method_ref(name: &str, descriptor: &str) -> Result<(), String> {
    UnqualifiedName::check_valid_method(name)?;
    let descriptor = MethodDescriptor::parse(descriptor)?;
    if name == UnqualifiedName::CLINIT.as_str() {
        Err(String::from("class initializers can't be referenced"))
    } else if name == UnqualifiedName::INIT.as_str() && descriptor.return_type.is_some() {
        Err(String::from("constructors must return void"))
    } else {
        Ok(())
    }
}

fn check_class_header(class: &ClassFile) -> Result<(), Error> {
    let constants = &class.constants;
    let this_name = lookup(class.class_name(), || String::from("this class"))?;

    match class.super_class {
        Some(super_class) => {
            lookup(constants.get_class_name(super_class), || String::from("super class"))?;
        }
        None if this_name == BinaryName::OBJECT.as_str() => (),
        None => {
            return Err(constraint(format!(
                "{} has no super class (only {} may omit it)",
                this_name,
                BinaryName::OBJECT.as_str()
            )))
        }
    }

    for interface in &class.interfaces {
        lookup(constants.get_class_name(*interface), || String::from("interface"))?;
    }

    let flags = class.access_flags;
    if flags.contains(ClassAccessFlags::INTERFACE) && !flags.contains(ClassAccessFlags::ABSTRACT) {
        return Err(constraint(format!("interface {} is not abstract", this_name)));
    }
    if flags.contains(ClassAccessFlags::FINAL | ClassAccessFlags::ABSTRACT) {
        return Err(constraint(format!(
            "class {} is both final and abstract",
            this_name
        )));
    }
    Ok(())
}

fn check_fields(class: &ClassFile) -> Result<(), Error> {
    let constants = &class.constants;
    let mut seen = HashSet::new();
    for (idx, field) in class.fields.iter().enumerate() {
        let context = || format!("field #{}", idx);
        let name = lookup(field.name(constants), context)?;
        let descriptor = lookup(field.descriptor(constants), context)?;
        UnqualifiedName::check_valid(name).map_err(constraint)?;
        let field_type = FieldType::parse(descriptor)
            .map_err(|msg| constraint(format!("field {}: {}", name, msg)))?;
        if !seen.insert((name, descriptor)) {
            return Err(constraint(format!(
                "field {} {} is declared twice",
                name, descriptor
            )));
        }
        if !field.access_flags.has_valid_visibility() {
            return Err(constraint(format!(
                "field {} has conflicting visibility flags",
                name
            )));
        }

        if let Some(value) = lookup(
            Attribute::find_decoded::<ConstantValue>(&field.attributes, constants),
            context,
        )? {
            check_constant_value(constants, value.0, &field_type)
                .map_err(|msg| constraint(format!("field {}: {}", name, msg)))?;
        }
    }
    Ok(())
}

/// `ConstantValue` must hold a constant of the kind the field stores
fn check_constant_value(
    constants: &ConstantPool,
    value: ConstantIndex,
    field_type: &FieldType,
) -> Result<(), String> {
    let constant = constants.get(value).map_err(|err| err.to_string())?;
    let matches = match field_type {
        FieldType::Base(BaseType::Long) => matches!(constant, Constant::Long(_)),
        FieldType::Base(BaseType::Float) => matches!(constant, Constant::Float(_)),
        FieldType::Base(BaseType::Double) => matches!(constant, Constant::Double(_)),
        FieldType::Base(_) => matches!(constant, Constant::Integer(_)),
        FieldType::Ref(RefType::Object(name)) => {
            *name == BinaryName::STRING && matches!(constant, Constant::String(_))
        }
        FieldType::Ref(RefType::Array(_)) => false,
    };
    if matches {
        Ok(())
    } else {
        Err(format!(
            "constant value {:?} does not fit type {}",
            constant, field_type
        ))
    }
}

fn check_methods(class: &ClassFile) -> Result<(), Error> {
    let constants = &class.constants;
    let is_interface = class.access_flags.contains(ClassAccessFlags::INTERFACE);
    let mut seen = HashSet::new();
    for (idx, method) in class.methods.iter().enumerate() {
        let context = || format!("method #{}", idx);
        let name = lookup(method.name(constants), context)?;
        let descriptor = lookup(method.descriptor(constants), context)?;
        UnqualifiedName::check_valid_method(name).map_err(constraint)?;
        let parsed = MethodDescriptor::parse(descriptor)
            .map_err(|msg| constraint(format!("method {}: {}", name, msg)))?;
        if !seen.insert((name, descriptor)) {
            return Err(constraint(format!(
                "method {}{} is declared twice",
                name, descriptor
            )));
        }

        let flags = method.access_flags;
        if !flags.has_valid_visibility() {
            return Err(constraint(format!(
                "method {}{} has conflicting visibility flags",
                name, descriptor
            )));
        }

        let is_static = flags.contains(MethodAccessFlags::STATIC);
        let slots = parsed.parameter_length(!is_static);
        if slots > MAX_PARAMETER_SLOTS {
            return Err(constraint(format!(
                "method {}{} takes {} parameter slots (at most {} are allowed)",
                name, descriptor, slots, MAX_PARAMETER_SLOTS
            )));
        }

        if name == UnqualifiedName::INIT.as_str() {
            if is_static || parsed.return_type.is_some() {
                return Err(constraint(format!(
                    "constructor {} must be an instance method returning void",
                    descriptor
                )));
            }
            if is_interface {
                return Err(constraint(String::from("interfaces can't have constructors")));
            }
        }

        let is_abstract = flags.contains(MethodAccessFlags::ABSTRACT);
        let is_native = flags.contains(MethodAccessFlags::NATIVE);
        if is_abstract
            && flags.intersects(
                MethodAccessFlags::FINAL
                    | MethodAccessFlags::NATIVE
                    | MethodAccessFlags::PRIVATE
                    | MethodAccessFlags::STATIC
                    | MethodAccessFlags::SYNCHRONIZED,
            )
        {
            return Err(constraint(format!(
                "abstract method {}{} has incompatible flags {:?}",
                name, descriptor, flags
            )));
        }

        let has_code = lookup(
            Attribute::find(&method.attributes, constants, Code::NAME),
            context,
        )?
        .is_some();
        if has_code && (is_abstract || is_native) {
            return Err(constraint(format!(
                "abstract or native method {}{} has code",
                name, descriptor
            )));
        }
        if !has_code && !(is_abstract || is_native) {
            return Err(constraint(format!(
                "method {}{} has no code",
                name, descriptor
            )));
        }
    }
    Ok(())
}
