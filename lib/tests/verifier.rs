use classkit::jvm::class_file::{ClassFile, Method, Version};
use classkit::jvm::code::{
    ExceptionRange, Instruction, InstructionHandle, LocalVariableScope, MethodCode, Opcode,
};
use classkit::jvm::verifier::{
    InMemoryRepository, Pass, Settings, VerificationResult, VerificationStatus, Verifier,
};
use classkit::jvm::*;

fn new_class(name: &str) -> ClassFile {
    ClassFile::new(
        Version::JAVA8,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        name,
        Some("java/lang/Object"),
    )
    .unwrap()
}

fn add_method(
    class: &mut ClassFile,
    access_flags: MethodAccessFlags,
    name: &str,
    descriptor: &str,
    code: MethodCode,
) {
    let code = code.into_code(&mut class.constants).unwrap();
    let mut method = Method {
        access_flags,
        name_index: class.constants.add_utf8(name).unwrap(),
        descriptor_index: class.constants.add_utf8(descriptor).unwrap(),
        attributes: vec![],
    };
    method.set_code(&mut class.constants, &code).unwrap();
    class.methods.push(method);
}

fn static_method(class: &mut ClassFile, name: &str, descriptor: &str, code: MethodCode) {
    add_method(
        class,
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        name,
        descriptor,
        code,
    );
}

/// `public <init>() { super(); }`
fn add_constructor(class: &mut ClassFile) {
    let super_init = class
        .constants
        .add_method_ref("java/lang/Object", "<init>", "()V", false)
        .unwrap();
    let mut code = MethodCode::new(1, 1);
    code.instructions
        .append(Instruction::Plain(Opcode::ALOAD_0))
        .unwrap();
    code.instructions
        .append(Instruction::Constant(Opcode::INVOKESPECIAL, super_init))
        .unwrap();
    code.instructions
        .append(Instruction::Plain(Opcode::RETURN))
        .unwrap();
    add_method(class, MethodAccessFlags::PUBLIC, "<init>", "()V", code);
}

fn body(
    max_stack: u16,
    max_locals: u16,
    instructions: Vec<Instruction<InstructionHandle>>,
) -> MethodCode {
    let mut code = MethodCode::new(max_stack, max_locals);
    for instruction in instructions {
        code.instructions.append(instruction).unwrap();
    }
    code
}

fn verify_with(
    name: &str,
    class: &ClassFile,
    settings: Settings,
) -> (VerificationResult, Vec<Pass>) {
    let repository = InMemoryRepository::new();
    repository.add_class_bytes(name, class.to_bytes().unwrap()).unwrap();
    let mut verifier = Verifier::new(name, &repository, settings);
    let result = verifier.verify();
    (result, verifier.executed_passes().to_vec())
}

fn verify(class: &ClassFile) -> (VerificationResult, Vec<Pass>) {
    let name = class.class_name().unwrap().to_owned();
    verify_with(&name, class, Settings::default())
}

fn assert_rejected(result: &VerificationResult, fragment: &str) {
    assert_eq!(result.status, VerificationStatus::Rejected, "{}", result);
    assert!(
        result.message.contains(fragment),
        "expected '{}' in '{}'",
        fragment,
        result.message
    );
}

#[test]
fn valid_class_verifies() {
    let mut class = new_class("me/alec/Adder");
    add_constructor(&mut class);
    static_method(
        &mut class,
        "add",
        "(II)I",
        body(
            2,
            2,
            vec![
                Instruction::Plain(Opcode::ILOAD_0),
                Instruction::Plain(Opcode::ILOAD_1),
                Instruction::Plain(Opcode::IADD),
                Instruction::Plain(Opcode::IRETURN),
            ],
        ),
    );

    let (result, passes) = verify(&class);
    assert!(result.is_ok(), "{}", result);
    assert_eq!(
        passes,
        vec![
            Pass::Pass1,
            Pass::Pass2,
            Pass::Pass3a(0),
            Pass::Pass3a(1),
            Pass::Pass3b(0),
            Pass::Pass3b(1),
        ]
    );
}

#[test]
fn dotted_names_are_accepted() {
    let mut class = new_class("me/alec/Foo");
    add_constructor(&mut class);
    let repository = InMemoryRepository::new();
    repository.add_class_bytes("me/alec/Foo", class.to_bytes().unwrap()).unwrap();
    let mut verifier = Verifier::new("me.alec.Foo", &repository, Settings::default());
    assert_eq!(verifier.class_name(), "me/alec/Foo");
    assert!(verifier.verify().is_ok());
    assert!(verifier.class().is_some());
}

#[test]
fn dotted_names_work_end_to_end() {
    let mut class = new_class("a/b/Foo");
    add_constructor(&mut class);
    let repository = InMemoryRepository::new();
    repository
        .add_class_bytes("a.b.Foo", class.to_bytes().unwrap())
        .unwrap();
    let mut verifier = Verifier::new("a.b.Foo", &repository, Settings::default());
    let result = verifier.verify();
    assert!(result.is_ok(), "{}", result.message);
}

#[test]
fn name_suffixes_are_accepted() {
    let mut class = new_class("a/XFoo");
    add_constructor(&mut class);
    let (result, _) = verify_with("Foo", &class, Settings::default());
    assert!(result.is_ok(), "{}", result.message);

    let mut class = new_class("a/b/Foo");
    add_constructor(&mut class);
    let (result, _) = verify_with("b/Foo", &class, Settings::default());
    assert!(result.is_ok(), "{}", result.message);
}

#[test]
fn wrong_name_is_rejected() {
    let class = new_class("Bar");
    let (result, passes) = verify_with("Foo", &class, Settings::default());
    assert_rejected(&result, "Wrong name");
    assert_eq!(passes, vec![Pass::Pass1]);
}

#[test]
fn malformed_bytes_are_rejected() {
    let repository = InMemoryRepository::new();
    let truncated = new_class("a/Truncated").to_bytes().unwrap();
    repository.add_class_bytes("a/Truncated", truncated[..20].to_vec()).unwrap();
    repository.add_class_bytes("a/Magic", vec![0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 52]).unwrap();

    for name in ["a/Truncated", "a/Magic", "a/Missing"] {
        let mut verifier = Verifier::new(name, &repository, Settings::default());
        let result = verifier.verify();
        assert_eq!(result.status, VerificationStatus::Rejected, "{}", name);
        assert_eq!(verifier.executed_passes(), &[Pass::Pass1]);
    }
}

#[test]
fn static_failure_stops_before_method_passes() {
    let mut class = new_class("a/NoCode");
    class.methods.push(Method {
        access_flags: MethodAccessFlags::PUBLIC,
        name_index: class.constants.add_utf8("m").unwrap(),
        descriptor_index: class.constants.add_utf8("()V").unwrap(),
        attributes: vec![],
    });
    let (result, passes) = verify(&class);
    assert_rejected(&result, "has no code");
    assert_eq!(passes, vec![Pass::Pass1, Pass::Pass2]);
}

#[test]
fn results_are_remembered() {
    let mut class = new_class("a/Foo");
    add_constructor(&mut class);
    let repository = InMemoryRepository::new();
    repository.add_class_bytes("a/Foo", class.to_bytes().unwrap()).unwrap();
    let mut verifier = Verifier::new("a/Foo", &repository, Settings::default());

    assert!(verifier.do_pass3b(0).is_ok());
    assert!(verifier.do_pass2().is_ok());
    assert!(verifier.do_pass3b(0).is_ok());
    assert_eq!(
        verifier.executed_passes(),
        &[Pass::Pass1, Pass::Pass2, Pass::Pass3a(0), Pass::Pass3b(0)]
    );

    // There is no method #1
    assert_eq!(verifier.do_pass3a(1).status, VerificationStatus::Rejected);
}

#[test]
fn type_error_is_rejected() {
    let mut class = new_class("a/Types");
    static_method(
        &mut class,
        "m",
        "()I",
        body(
            1,
            0,
            vec![
                Instruction::Plain(Opcode::FCONST_0),
                Instruction::Plain(Opcode::IRETURN),
            ],
        ),
    );
    let (result, passes) = verify(&class);
    assert_rejected(&result, "m()I @ 1 (ireturn): expected int but found float");
    assert_eq!(passes.last(), Some(&Pass::Pass3b(0)));

    // Without dataflow analysis, nothing catches this
    let settings = Settings {
        verify_dataflow: false,
        ..Settings::default()
    };
    let (result, passes) = verify_with("a/Types", &class, settings);
    assert!(result.is_ok(), "{}", result);
    assert_eq!(passes, vec![Pass::Pass1, Pass::Pass2, Pass::Pass3a(0)]);
}

#[test]
fn falling_off_the_end() {
    let mut class = new_class("a/Fall");
    static_method(
        &mut class,
        "m",
        "()V",
        body(
            1,
            0,
            vec![
                Instruction::Plain(Opcode::ICONST_0),
                Instruction::Plain(Opcode::POP),
            ],
        ),
    );
    let (result, _) = verify(&class);
    assert_rejected(&result, "falls off the end");
}

#[test]
fn stack_limits_are_enforced() {
    let mut class = new_class("a/Deep");
    static_method(
        &mut class,
        "m",
        "()I",
        body(
            1,
            0,
            vec![
                Instruction::Plain(Opcode::ICONST_0),
                Instruction::Plain(Opcode::ICONST_1),
                Instruction::Plain(Opcode::IADD),
                Instruction::Plain(Opcode::IRETURN),
            ],
        ),
    );
    let (result, _) = verify(&class);
    assert_rejected(&result, "max_stack 1");

    let mut class = new_class("a/Shallow");
    static_method(
        &mut class,
        "m",
        "()V",
        body(
            1,
            0,
            vec![
                Instruction::Plain(Opcode::POP),
                Instruction::Plain(Opcode::RETURN),
            ],
        ),
    );
    let (result, _) = verify(&class);
    assert_rejected(&result, "underflow");
}

#[test]
fn constructor_must_call_super() {
    let mut class = new_class("a/Lazy");
    add_method(
        &mut class,
        MethodAccessFlags::PUBLIC,
        "<init>",
        "()V",
        body(0, 1, vec![Instruction::Plain(Opcode::RETURN)]),
    );
    let (result, _) = verify(&class);
    assert_rejected(&result, "uninitialized object");
}

#[test]
fn objects_must_be_initialized_before_use() {
    let mut class = new_class("a/Maker");
    let object = class.constants.add_class("java/lang/Object").unwrap();
    let init = class
        .constants
        .add_method_ref("java/lang/Object", "<init>", "()V", false)
        .unwrap();

    static_method(
        &mut class,
        "make",
        "()Ljava/lang/Object;",
        body(
            2,
            0,
            vec![
                Instruction::Constant(Opcode::NEW, object.0),
                Instruction::Plain(Opcode::DUP),
                Instruction::Constant(Opcode::INVOKESPECIAL, init),
                Instruction::Plain(Opcode::ARETURN),
            ],
        ),
    );
    let (result, _) = verify(&class);
    assert!(result.is_ok(), "{}", result);

    let mut class = new_class("a/HalfMaker");
    let object = class.constants.add_class("java/lang/Object").unwrap();
    static_method(
        &mut class,
        "make",
        "()Ljava/lang/Object;",
        body(
            1,
            0,
            vec![
                Instruction::Constant(Opcode::NEW, object.0),
                Instruction::Plain(Opcode::ARETURN),
            ],
        ),
    );
    let (result, _) = verify(&class);
    assert_rejected(&result, "uninitialized object");
}

#[test]
fn loops_converge() {
    // int m(int n) { int acc = 0; while (n != 0) { acc++; n--; } return acc; }
    let mut class = new_class("a/Loop");
    let mut code = MethodCode::new(1, 2);
    let list = &mut code.instructions;
    list.append(Instruction::Plain(Opcode::ICONST_0)).unwrap();
    list.append(Instruction::Plain(Opcode::ISTORE_1)).unwrap();
    let head = list.append(Instruction::Plain(Opcode::ILOAD_0)).unwrap();
    let test = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
    list.append(Instruction::IInc { index: 1, delta: 1 }).unwrap();
    list.append(Instruction::IInc { index: 0, delta: -1 }).unwrap();
    list.append(Instruction::Branch(Opcode::GOTO, head)).unwrap();
    let exit = list.append(Instruction::Plain(Opcode::ILOAD_1)).unwrap();
    list.append(Instruction::Plain(Opcode::IRETURN)).unwrap();
    list.replace(test, Instruction::Branch(Opcode::IFEQ, exit))
        .unwrap();
    static_method(&mut class, "m", "(I)I", code);

    let (result, _) = verify(&class);
    assert!(result.is_ok(), "{}", result);
}

#[test]
fn merged_stacks_must_agree() {
    let mut class = new_class("a/Uneven");
    let mut code = MethodCode::new(2, 1);
    let list = &mut code.instructions;
    list.append(Instruction::Plain(Opcode::ICONST_1)).unwrap();
    list.append(Instruction::Plain(Opcode::ILOAD_0)).unwrap();
    let branch = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
    list.append(Instruction::Plain(Opcode::POP)).unwrap();
    let join = list.append(Instruction::Plain(Opcode::RETURN)).unwrap();
    list.replace(branch, Instruction::Branch(Opcode::IFEQ, join))
        .unwrap();
    static_method(&mut class, "m", "(I)V", code);

    let (result, _) = verify(&class);
    assert_rejected(&result, "do not merge");
}

#[test]
fn switches_and_handlers() {
    // static void m(int x) { try { switch (x) { case 0: case 1: ... } } catch (Exception e) { } }
    let mut class = new_class("a/Switch");
    let exception = class.constants.add_class("java/lang/Exception").unwrap();
    let mut code = MethodCode::new(1, 2);
    let list = &mut code.instructions;
    let load = list.append(Instruction::Plain(Opcode::ILOAD_0)).unwrap();
    let switch = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
    let case0 = list.append(Instruction::Plain(Opcode::ICONST_0)).unwrap();
    list.append(Instruction::Plain(Opcode::POP)).unwrap();
    let done = list.append(Instruction::Plain(Opcode::RETURN)).unwrap();
    let handler = list.append(Instruction::Plain(Opcode::ASTORE_1)).unwrap();
    list.append(Instruction::Plain(Opcode::RETURN)).unwrap();
    list.replace(
        switch,
        Instruction::TableSwitch {
            default: done,
            low: 0,
            targets: vec![case0, case0],
        },
    )
    .unwrap();
    code.add_exception_handler(ExceptionRange {
        start: load,
        end: done,
        handler,
        catch_type: Some(exception),
    })
    .unwrap();
    static_method(&mut class, "m", "(I)V", code);

    let (result, _) = verify(&class);
    assert!(result.is_ok(), "{}", result);
}

#[test]
fn handlers_need_room_for_the_exception() {
    let mut class = new_class("a/NoRoom");
    let mut code = MethodCode::new(0, 0);
    let start = code
        .instructions
        .append(Instruction::Plain(Opcode::NOP))
        .unwrap();
    let handler = code
        .instructions
        .append(Instruction::Plain(Opcode::RETURN))
        .unwrap();
    code.add_exception_handler(ExceptionRange {
        start,
        end: start,
        handler,
        catch_type: None,
    })
    .unwrap();
    static_method(&mut class, "m", "()V", code);

    let (result, _) = verify(&class);
    assert_rejected(&result, "operand stack grows past max_stack 0");
}

#[test]
fn subroutines_are_rejected() {
    let mut class = new_class("a/Jsr");
    let mut code = MethodCode::new(1, 1);
    let list = &mut code.instructions;
    let jump = list.append(Instruction::Plain(Opcode::NOP)).unwrap();
    list.append(Instruction::Plain(Opcode::RETURN)).unwrap();
    let subroutine = list.append(Instruction::Plain(Opcode::ASTORE_0)).unwrap();
    list.append(Instruction::Local(Opcode::RET, 0)).unwrap();
    list.replace(jump, Instruction::Branch(Opcode::JSR, subroutine))
        .unwrap();
    static_method(&mut class, "m", "()V", code);

    // Forbidden outright from Java 7 onwards
    let (result, passes) = verify(&class);
    assert_rejected(&result, "subroutines are not allowed");
    assert_eq!(passes.last(), Some(&Pass::Pass3a(0)));

    // Older class files get further, but the dataflow pass does not follow subroutines
    class.version = Version::JAVA6;
    let (result, passes) = verify(&class);
    assert_rejected(&result, "jsr/ret");
    assert_eq!(passes.last(), Some(&Pass::Pass3b(0)));
}

#[test]
fn constant_kinds_are_checked() {
    let mut class = new_class("a/Ldc");
    let long = class.constants.add_long(1).unwrap();
    static_method(
        &mut class,
        "m",
        "()V",
        body(
            2,
            0,
            vec![
                Instruction::Constant(Opcode::LDC, long),
                Instruction::Plain(Opcode::POP2),
                Instruction::Plain(Opcode::RETURN),
            ],
        ),
    );
    let (result, passes) = verify(&class);
    assert_rejected(&result, "can't be loaded with ldc");
    assert_eq!(passes.last(), Some(&Pass::Pass3a(0)));
}

#[test]
fn empty_local_variable_scopes_are_accepted() {
    let mut class = new_class("a/Foo");
    add_constructor(&mut class);
    let mut code = body(0, 1, vec![Instruction::Plain(Opcode::RETURN)]);
    let start = code.instructions.handles()[0];
    code.add_local_variable(LocalVariableScope {
        start,
        end: None,
        name_index: class.constants.add_utf8("unused").unwrap(),
        descriptor_index: class.constants.add_utf8("I").unwrap(),
        index: 0,
    })
    .unwrap();
    static_method(&mut class, "m", "()V", code);

    let (result, _) = verify(&class);
    assert!(result.is_ok(), "{}", result);
}

#[test]
fn local_variables_must_fit() {
    let mut class = new_class("a/Locals");
    static_method(
        &mut class,
        "m",
        "()V",
        body(
            1,
            1,
            vec![
                Instruction::Plain(Opcode::ICONST_0),
                Instruction::Local(Opcode::ISTORE, 1),
                Instruction::Plain(Opcode::RETURN),
            ],
        ),
    );
    let (result, _) = verify(&class);
    assert_rejected(&result, "local variable 1 is out of range");

    // Parameters alone need two slots here
    let mut class = new_class("a/Params");
    static_method(
        &mut class,
        "m",
        "(J)V",
        body(0, 1, vec![Instruction::Plain(Opcode::RETURN)]),
    );
    let (result, _) = verify(&class);
    assert_rejected(&result, "too small");
}

#[test]
fn shared_repository_across_threads() {
    let repository = InMemoryRepository::new();
    let names = ["a/One", "a/Two", "a/Three"];
    for name in names {
        let mut class = new_class(name);
        add_constructor(&mut class);
        repository.add_class_bytes(name, class.to_bytes().unwrap()).unwrap();
    }

    std::thread::scope(|scope| {
        for name in names {
            let repository = &repository;
            scope.spawn(move || {
                let mut verifier = Verifier::new(name, repository, Settings::default());
                assert!(verifier.verify().is_ok());
            });
        }
    });
    assert!(names.iter().all(|name| repository.is_cached(name)));
}
