use crate::jvm::{BaseType, BinaryName, FieldType, Name, RefType};
use crate::util::Width;
use std::fmt;

/// These types are from [this hierarchy][0], plus `Top` for unusable local variables
///
/// Reference types are named the way `Class` constants name them: internal names for classes
/// (`java/lang/String`) and descriptors for arrays (`[I`).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.10.1.2
#[derive(Clone, Hash, Eq, PartialEq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Long,
    Double,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// Result of the `new` instruction at this offset, before `<init>` is called on it
    Uninitialized(usize),

    /// Initialized object or array
    Object(String),
}

impl VerificationType {
    pub fn object(name: &BinaryName) -> VerificationType {
        VerificationType::Object(name.as_str().to_owned())
    }

    pub fn from_field_type(field_type: &FieldType) -> VerificationType {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            FieldType::Ref(ref_type) => VerificationType::Object(ref_type.class_constant_name()),
        }
    }

    /// Is this type is a reference type?
    pub fn is_reference(&self) -> bool {
        match self {
            VerificationType::Top
            | VerificationType::Integer
            | VerificationType::Float
            | VerificationType::Double
            | VerificationType::Long => false,

            VerificationType::Null
            | VerificationType::UninitializedThis
            | VerificationType::Object(_)
            | VerificationType::Uninitialized(_) => true,
        }
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(
            self,
            VerificationType::UninitializedThis | VerificationType::Uninitialized(_)
        )
    }

    /// Element type of an array type
    ///
    /// `Null` is treated as an array of `Null` (so loading from it type checks).
    pub fn array_component(&self) -> Option<VerificationType> {
        match self {
            VerificationType::Null => Some(VerificationType::Null),
            VerificationType::Object(name) => match RefType::from_class_constant(name).ok()? {
                RefType::Array(array) => {
                    Some(VerificationType::from_field_type(&array.component_type()))
                }
                RefType::Object(_) => None,
            },
            _ => None,
        }
    }

    /// Array of booleans or bytes (both use `baload`/`bastore`)
    pub fn is_byte_or_boolean_array(&self) -> bool {
        match self {
            VerificationType::Null => true,
            VerificationType::Object(name) => name == "[B" || name == "[Z",
            _ => false,
        }
    }

    /// Array with this element descriptor (eg. `C` for `char[]`)
    pub fn is_array_of(&self, element: &str) -> bool {
        match self {
            VerificationType::Null => true,
            VerificationType::Object(name) => name.strip_prefix('[') == Some(element),
            _ => false,
        }
    }

    /// Check if one verification type is assignable to another
    ///
    /// Class hierarchies are not loaded, so any class type is assumed to be assignable to any
    /// other class type. Arrays of primitives are only assignable to themselves and to the types
    /// every array is assignable to.
    pub fn is_assignable(sub_type: &Self, super_type: &Self) -> bool {
        use VerificationType::*;
        match (sub_type, super_type) {
            (_, Top) => true,
            (Null, Object(_)) => true,
            (Object(sub), Object(sup)) => {
                sub == sup
                    || sup == BinaryName::OBJECT.as_str()
                    || sup == BinaryName::CLONEABLE.as_str()
                    || sup == BinaryName::SERIALIZABLE.as_str()
                    || !(is_primitive_array(sub) || is_primitive_array(sup))
            }
            (t1, t2) => t1 == t2,
        }
    }

    /// Least upper bound, as far as local variables are concerned
    ///
    /// Types that have nothing in common merge to `Top`.
    pub fn merge(&self, other: &Self) -> VerificationType {
        use VerificationType::*;
        match (self, other) {
            (t1, t2) if t1 == t2 => t1.clone(),
            (Null, Object(name)) | (Object(name), Null) => Object(name.clone()),
            (Object(_), Object(_)) => VerificationType::object(&BinaryName::OBJECT),
            _ => Top,
        }
    }
}

fn is_primitive_array(name: &str) -> bool {
    name.starts_with('[') && !name.ends_with(';') && !name[1..].starts_with('[')
}

impl Width for VerificationType {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationType::Top => f.write_str("top"),
            VerificationType::Integer => f.write_str("int"),
            VerificationType::Float => f.write_str("float"),
            VerificationType::Long => f.write_str("long"),
            VerificationType::Double => f.write_str("double"),
            VerificationType::Null => f.write_str("null"),
            VerificationType::UninitializedThis => f.write_str("uninitializedThis"),
            VerificationType::Uninitialized(offset) => write!(f, "uninitialized({})", offset),
            VerificationType::Object(name) => f.write_str(name),
        }
    }
}

impl fmt::Debug for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Verification type of the values created by a `Class` constant (`new`, `checkcast`, ...)
pub fn class_constant_type(name: &str) -> Result<VerificationType, String> {
    let ref_type = RefType::from_class_constant(name)?;
    Ok(VerificationType::Object(ref_type.class_constant_name()))
}

#[cfg(test)]
mod test {
    use super::*;
    use VerificationType::*;

    fn object(name: &str) -> VerificationType {
        Object(name.to_owned())
    }

    #[test]
    fn assignability() {
        assert!(VerificationType::is_assignable(&Integer, &Integer));
        assert!(!VerificationType::is_assignable(&Integer, &Float));
        assert!(VerificationType::is_assignable(&Null, &object("java/lang/String")));
        assert!(VerificationType::is_assignable(
            &object("java/lang/String"),
            &object("java/lang/CharSequence")
        ));
        assert!(VerificationType::is_assignable(&object("[I"), &object("java/lang/Object")));
        assert!(!VerificationType::is_assignable(&object("[I"), &object("[J")));
        assert!(!VerificationType::is_assignable(&object("[I"), &object("java/lang/String")));
        assert!(!VerificationType::is_assignable(&Uninitialized(3), &object("java/lang/Object")));
    }

    #[test]
    fn merging() {
        assert_eq!(Integer.merge(&Integer), Integer);
        assert_eq!(Integer.merge(&Float), Top);
        assert_eq!(Null.merge(&object("a/B")), object("a/B"));
        assert_eq!(object("a/B").merge(&object("a/C")), object("java/lang/Object"));
        assert_eq!(Uninitialized(1).merge(&Uninitialized(4)), Top);
    }

    #[test]
    fn array_components() {
        assert_eq!(object("[I").array_component(), Some(Integer));
        assert_eq!(object("[[J").array_component(), Some(object("[J")));
        assert_eq!(
            object("[Ljava/lang/String;").array_component(),
            Some(object("java/lang/String"))
        );
        assert_eq!(object("java/lang/String").array_component(), None);
        assert!(object("[Z").is_byte_or_boolean_array());
        assert!(object("[C").is_array_of("C"));
    }

    #[test]
    fn widths() {
        assert_eq!(Long.width(), 2);
        assert_eq!(object("[D").width(), 1);
    }
}
