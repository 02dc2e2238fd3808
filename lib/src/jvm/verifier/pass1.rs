use super::{ClassRepository, Settings};
use crate::jvm::class_file::{
    Attribute, AttributeLike, ClassFile, Code, ConstantPool, ConstantValue, Exceptions,
    LineNumberTable, LocalVariableTable, SourceFile,
};
use crate::jvm::Error;
use log::debug;
use std::sync::Arc;

/// Oldest class file major version there is (JDK 1.0.2)
const MIN_MAJOR_VERSION: u16 = 45;

/// Load the class and check that it is structurally sound
///
/// Beyond decoding (which the repository already does), this checks that the class is the one
/// which was requested, that its version is supported, and that every attribute this crate
/// understands decodes to exactly its declared length.
pub fn verify<R: ClassRepository + ?Sized>(
    repository: &R,
    class_name: &str,
    settings: &Settings,
) -> Result<Arc<ClassFile>, Error> {
    let class = repository
        .lookup_class(class_name)?
        .ok_or_else(|| Error::MissingClass(class_name.to_owned()))?;

    // The recorded name only has to end with the requested one
    let found = class.class_name()?;
    if !found.ends_with(class_name) {
        return Err(Error::NameMismatch {
            requested: class_name.to_owned(),
            found: found.to_owned(),
        });
    }

    let major = class.version.major_version;
    if major < MIN_MAJOR_VERSION || major > settings.max_major_version {
        return Err(Error::Format(format!(
            "unsupported class file version {} (expected major version {} to {})",
            class.version, MIN_MAJOR_VERSION, settings.max_major_version
        )));
    }

    check_attributes(&class)?;
    debug!("{} is structurally sound", class_name);
    Ok(class)
}

fn check_attributes(class: &ClassFile) -> Result<(), Error> {
    let constants = &class.constants;
    for attribute in &class.attributes {
        if attribute_named(attribute, constants, SourceFile::NAME) {
            attribute.decode::<SourceFile>()?;
        }
    }
    for field in &class.fields {
        for attribute in &field.attributes {
            if attribute_named(attribute, constants, ConstantValue::NAME) {
                attribute.decode::<ConstantValue>()?;
            }
        }
    }
    for method in &class.methods {
        for attribute in &method.attributes {
            if attribute_named(attribute, constants, Exceptions::NAME) {
                attribute.decode::<Exceptions>()?;
            } else if attribute_named(attribute, constants, Code::NAME) {
                let code: Code = attribute.decode()?;
                for nested in &code.attributes {
                    if attribute_named(nested, constants, LineNumberTable::NAME) {
                        nested.decode::<LineNumberTable>()?;
                    } else if attribute_named(nested, constants, LocalVariableTable::NAME) {
                        nested.decode::<LocalVariableTable>()?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Attributes with names that don't resolve are left to pass 2
fn attribute_named(attribute: &Attribute, constants: &ConstantPool, name: &str) -> bool {
    matches!(attribute.name(constants), Ok(found) if found == name)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::verifier::InMemoryRepository;
    use crate::jvm::{ClassAccessFlags, Serialize};

    fn repository_with(name: &str, class: &ClassFile) -> InMemoryRepository {
        let repository = InMemoryRepository::new();
        repository
            .add_class_bytes(name, class.to_bytes().unwrap())
            .unwrap();
        repository
    }

    fn class(name: &str) -> ClassFile {
        ClassFile::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC,
            name,
            Some("java/lang/Object"),
        )
        .unwrap()
    }

    #[test]
    fn loads_requested_class() {
        let repository = repository_with("a/Foo", &class("a/Foo"));
        let loaded = verify(&repository, "a/Foo", &Settings::default()).unwrap();
        assert_eq!(loaded.class_name().unwrap(), "a/Foo");
    }

    #[test]
    fn wrong_name() {
        let repository = repository_with("a/Foo", &class("a/Bar"));
        let err = verify(&repository, "a/Foo", &Settings::default()).unwrap_err();
        assert!(matches!(err, Error::NameMismatch { .. }));
        assert!(err.to_string().starts_with("Wrong name"));
    }

    #[test]
    fn suffix_of_recorded_name() {
        let repository = repository_with("Foo", &class("a/XFoo"));
        let loaded = verify(&repository, "Foo", &Settings::default()).unwrap();
        assert_eq!(loaded.class_name().unwrap(), "a/XFoo");

        let repository = repository_with("Foo", &class("a/Fooz"));
        assert!(matches!(
            verify(&repository, "Foo", &Settings::default()),
            Err(Error::NameMismatch { .. })
        ));
    }

    #[test]
    fn missing_class() {
        let repository = InMemoryRepository::new();
        assert!(matches!(
            verify(&repository, "a/Foo", &Settings::default()),
            Err(Error::MissingClass(_))
        ));
    }

    #[test]
    fn version_range() {
        let mut too_new = class("a/Foo");
        too_new.version = Version::JAVA17;
        let repository = repository_with("a/Foo", &too_new);
        let settings = Settings {
            max_major_version: 52,
            ..Settings::default()
        };
        assert!(matches!(
            verify(&repository, "a/Foo", &settings),
            Err(Error::Format(_))
        ));
        assert!(verify(&repository, "a/Foo", &Settings::default()).is_ok());
    }

    #[test]
    fn attribute_lengths() {
        let mut bad = class("a/Foo");
        let name_index = bad.constants.add_utf8(SourceFile::NAME).unwrap();
        bad.attributes.push(Attribute {
            name_index,
            info: vec![0, 1, 0],
        });
        let repository = repository_with("a/Foo", &bad);
        assert!(matches!(
            verify(&repository, "a/Foo", &Settings::default()),
            Err(Error::Format(_))
        ));
    }
}
