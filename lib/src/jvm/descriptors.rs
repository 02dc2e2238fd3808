use crate::jvm::{BinaryName, Name};
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// Utility trait for converting descriptors to and from string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor from a string, which must be consumed entirely
    fn parse(source: &str) -> Result<Self, String> {
        let mut chars = source.chars().peekable();
        let ret = Self::parse_from(&mut chars)?;
        match chars.next() {
            None => Ok(ret),
            Some(c) => Err(format!("Unexpected leftover input '{}' in '{}'", c, source)),
        }
    }

    /// Read the descriptor from a character buffer
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, String>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    /// Number of local variable (or operand stack) slots a value of this type occupies
    pub fn slots(&self) -> usize {
        match self {
            BaseType::Double | BaseType::Long => 2,
            _ => 1,
        }
    }

    /// Type code used by the `newarray` instruction
    pub fn array_type_code(&self) -> u8 {
        match self {
            BaseType::Boolean => 4,
            BaseType::Char => 5,
            BaseType::Float => 6,
            BaseType::Double => 7,
            BaseType::Byte => 8,
            BaseType::Short => 9,
            BaseType::Int => 10,
            BaseType::Long => 11,
        }
    }

    pub fn from_array_type_code(code: u8) -> Option<BaseType> {
        Some(match code {
            4 => BaseType::Boolean,
            5 => BaseType::Char,
            6 => BaseType::Float,
            7 => BaseType::Double,
            8 => BaseType::Byte,
            9 => BaseType::Short,
            10 => BaseType::Int,
            11 => BaseType::Long,
            _ => return None,
        })
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        let c = match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        };
        write_to.push(c);
    }
}

impl ParseDescriptor for BaseType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, String> {
        let typ = match source.next() {
            Some('B') => BaseType::Byte,
            Some('C') => BaseType::Char,
            Some('D') => BaseType::Double,
            Some('F') => BaseType::Float,
            Some('I') => BaseType::Int,
            Some('J') => BaseType::Long,
            Some('S') => BaseType::Short,
            Some('Z') => BaseType::Boolean,
            Some(c) => return Err(format!("Invalid base type character '{}'", c)),
            None => return Err(String::from("Missing base type character")),
        };
        Ok(typ)
    }
}

/// Reference type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType {
    Object(BinaryName),
    Array(ArrayType),
}

/// Array type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType {
    /// Total number of dimensions (`A[]` has 1, `A[][][][]` has 4)
    pub dimensions: usize,

    /// Underlying non-array element type (`A` is the element type of `A[][]`)
    pub element_type: Box<FieldType>,
}

/// Arrays can have at most 255 dimensions
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

impl ArrayType {
    /// Type of the values stored in the array (`A[]` for `A[][]`)
    pub fn component_type(&self) -> FieldType {
        if self.dimensions > 1 {
            FieldType::Ref(RefType::Array(ArrayType {
                dimensions: self.dimensions - 1,
                element_type: self.element_type.clone(),
            }))
        } else {
            (*self.element_type).clone()
        }
    }
}

impl RenderDescriptor for ArrayType {
    fn render_to(&self, write_to: &mut String) {
        for _ in 0..self.dimensions {
            write_to.push('[');
        }
        self.element_type.render_to(write_to);
    }
}

impl ParseDescriptor for ArrayType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, String> {
        let mut dimensions = 0;
        while source.next_if_eq(&'[').is_some() {
            dimensions += 1;
        }
        if dimensions < 1 {
            return Err(String::from("Expected at least one `[` for array type"));
        } else if dimensions > MAX_ARRAY_DIMENSIONS {
            return Err(format!("Array type has {} dimensions", dimensions));
        }
        Ok(ArrayType {
            dimensions,
            element_type: Box::new(FieldType::parse_from(source)?),
        })
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('L');
        write_to.push_str(self.as_str());
        write_to.push(';');
    }
}

impl ParseDescriptor for BinaryName {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, String> {
        if source.next_if_eq(&'L').is_none() {
            return Err(String::from("Expected object type to start with `L`"));
        }
        let mut class_name = String::new();
        loop {
            match source.next() {
                Some(';') => return BinaryName::from_string(class_name),
                Some(c) => class_name.push(c),
                None => return Err(format!("Missing terminator for 'L{}'", class_name)),
            }
        }
    }
}

impl RenderDescriptor for RefType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            RefType::Object(cls) => cls.render_to(write_to),
            RefType::Array(arr) => arr.render_to(write_to),
        }
    }
}

impl ParseDescriptor for RefType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, String> {
        match source.peek().copied() {
            Some('L') => BinaryName::parse_from(source).map(RefType::Object),
            Some('[') => ArrayType::parse_from(source).map(RefType::Array),
            Some(c) => Err(format!("Invalid reference type character '{}'", c)),
            None => Err(String::from("Missing reference type")),
        }
    }
}

impl RefType {
    /// Interpret the name stored in a `CONSTANT_Class_info`
    ///
    /// These are usually binary names, but array types are written as descriptors.
    pub fn from_class_constant(name: &str) -> Result<RefType, String> {
        if name.starts_with('[') {
            ArrayType::parse(name).map(RefType::Array)
        } else {
            BinaryName::from_string(name.to_owned()).map(RefType::Object)
        }
    }

    /// Inverse of [`RefType::from_class_constant`]
    pub fn class_constant_name(&self) -> String {
        match self {
            RefType::Object(cls) => cls.as_str().to_owned(),
            RefType::Array(arr) => arr.render(),
        }
    }

    /// Array of this type
    pub fn array_of(field_type: FieldType) -> RefType {
        match field_type {
            FieldType::Ref(RefType::Array(arr)) => RefType::Array(ArrayType {
                dimensions: arr.dimensions + 1,
                element_type: arr.element_type,
            }),
            element_type => RefType::Array(ArrayType {
                dimensions: 1,
                element_type: Box::new(element_type),
            }),
        }
    }
}

/// Type of a class, instance, or local variable
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),
    Ref(RefType),
}

impl FieldType {
    pub fn array(field_type: FieldType) -> FieldType {
        FieldType::Ref(RefType::array_of(field_type))
    }

    /// Number of local variable (or operand stack) slots a value of this type occupies
    pub fn slots(&self) -> usize {
        match self {
            FieldType::Base(base_type) => base_type.slots(),
            FieldType::Ref(_) => 1,
        }
    }
}

impl RenderDescriptor for FieldType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(write_to),
            FieldType::Ref(reference_type) => reference_type.render_to(write_to),
        }
    }
}

impl ParseDescriptor for FieldType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, String> {
        match source.peek().copied() {
            None => Err(String::from("Missing field type")),
            Some('B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z') => {
                BaseType::parse_from(source).map(FieldType::Base)
            }
            Some('L' | '[') => RefType::parse_from(source).map(FieldType::Ref),
            Some(c) => Err(format!("Invalid field type character '{}'", c)),
        }
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: Option<FieldType>, // `None` is for `void` (ie. no return)
}

/// Parameters of a method may use up at most 255 local variable slots
pub const MAX_PARAMETER_SLOTS: usize = 255;

impl MethodDescriptor {
    /// Total length of parameters (not the same as the length of the vector),
    /// which must be 255 or less for it to be valid
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let this_len = if has_this_param { 1 } else { 0 };
        this_len + self.parameters.iter().map(FieldType::slots).sum::<usize>()
    }
}

impl RenderDescriptor for MethodDescriptor {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        };
    }
}

impl ParseDescriptor for MethodDescriptor {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, String> {
        if source.next_if_eq(&'(').is_none() {
            return Err(String::from("Expected '(' for method"));
        }

        let mut parameters = vec![];
        loop {
            match source.peek().copied() {
                Some(')') => break,
                None => return Err(String::from("Expected ')' for method")),
                Some(_) => parameters.push(FieldType::parse_from(source)?),
            }
        }
        let _ = source.next();

        let return_type = if source.next_if_eq(&'V').is_some() {
            None
        } else {
            Some(FieldType::parse_from(source)?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
