// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use std::fmt;

/// The recursive type algebra of the source language. Equality is
/// structural; `Display` yields the canonical spelling used in type
/// compatibility checks and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    I32,
    Void,
    /// A `let` binding with neither a declared type nor an initializer,
    /// fixed by the first assignment.
    Unknown,
    Ref {
        mutable: bool,
        inner: Box<Type>,
    },
    Array {
        element: Box<Type>,
        length: u32,
    },
    Tuple(Vec<Type>),
}

impl Type {
    pub fn reference(mutable: bool, inner: Type) -> Self {
        Type::Ref {
            mutable,
            inner: Box::new(inner),
        }
    }

    pub fn array(element: Type, length: u32) -> Self {
        Type::Array {
            element: Box::new(element),
            length,
        }
    }

    /// Word-sized values: everything that fits one stack slot.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::I32 | Type::Ref { .. })
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Array { .. } | Type::Tuple(_))
    }

    /// Stack words occupied by a value of this type.
    pub fn word_size(&self) -> u32 {
        match self {
            Type::Array { element, length } => element.word_size() * length,
            Type::Tuple(elements) => elements.iter().map(Type::word_size).sum(),
            _ => 1,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::I32 => write!(f, "i32"),
            Type::Void => write!(f, "()"),
            Type::Unknown => write!(f, "{{unknown}}"),
            Type::Ref { mutable, inner } => {
                if *mutable {
                    write!(f, "&mut {}", inner)
                } else {
                    write!(f, "&{}", inner)
                }
            }
            Type::Array { element, length } => write!(f, "[{}; {}]", element, length),
            Type::Tuple(elements) => {
                let spelled: Vec<String> = elements.iter().map(|t| t.to_string()).collect();
                write!(f, "({})", spelled.join(", "))
            }
        }
    }
}

/// Whether `found` is acceptable where `expected` is required.
pub fn compatible(expected: &Type, found: &Type) -> bool {
    if expected == found {
        return true;
    }
    if *expected == Type::Unknown && *found != Type::Void {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_spellings() {
        let t = Type::reference(true, Type::array(Type::I32, 3));
        assert_eq!(t.to_string(), "&mut [i32; 3]");
        let t = Type::Tuple(vec![Type::I32, Type::I32]);
        assert_eq!(t.to_string(), "(i32, i32)");
        assert_eq!(Type::reference(false, Type::I32).to_string(), "&i32");
    }

    #[test]
    fn compatibility_rules() {
        assert!(compatible(&Type::I32, &Type::I32));
        assert!(compatible(&Type::Unknown, &Type::I32));
        assert!(compatible(&Type::Unknown, &Type::array(Type::I32, 2)));
        assert!(!compatible(&Type::Unknown, &Type::Void));
        assert!(!compatible(&Type::I32, &Type::Void));
        assert!(!compatible(&Type::array(Type::I32, 3), &Type::array(Type::I32, 2)));
        assert!(!compatible(
            &Type::reference(false, Type::I32),
            &Type::reference(true, Type::I32)
        ));
    }

    #[test]
    fn word_sizes() {
        assert_eq!(Type::I32.word_size(), 1);
        assert_eq!(Type::reference(true, Type::I32).word_size(), 1);
        assert_eq!(Type::array(Type::I32, 3).word_size(), 3);
        assert_eq!(Type::Tuple(vec![Type::I32, Type::I32]).word_size(), 2);
    }
}
