//! Column type descriptor grammar.
//!
//! A type descriptor is a type name with an optional parameter list:
//!
//! ```text
//! descriptor := name [ "(" arg { "," arg } ")" ]
//! name       := word { " " word }          (letters, digits, '_'; first char a letter)
//! arg        := digits | "max"
//! ```
//!
//! Names are case-insensitive and internal whitespace is collapsed, so
//! `NVarChar ( 50 )` and `nvarchar(50)` parse to the same descriptor.
//! Numeric arguments keep their original digits so they can be re-emitted
//! verbatim. Anything outside the grammar fails to parse; callers treat that
//! as "no rule applies" and keep the original text.

use std::fmt;

/// One argument in a descriptor's parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArg {
    /// A length, precision or scale, stored as the original digit string.
    Number(String),
    /// The `max` keyword, as in `nvarchar(max)`.
    Max,
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Number(digits) => write!(f, "{}", digits),
            TypeArg::Max => write!(f, "max"),
        }
    }
}

/// A parsed column type descriptor.
///
/// ```
/// use orbis_persistence::schema::{TypeArg, TypeDescriptor};
///
/// let ty = TypeDescriptor::parse("DECIMAL(10, 2)").unwrap();
/// assert_eq!(ty.name(), "decimal");
/// assert_eq!(ty.numeric_args(), Some(vec!["10", "2"]));
/// assert_eq!(ty.to_string(), "decimal(10,2)");
///
/// assert!(TypeDescriptor::parse("decimal(10,x)").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    name: String,
    args: Vec<TypeArg>,
}

impl TypeDescriptor {
    /// Parses a descriptor, returning `None` if the input is outside the grammar.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();

        let (raw_name, args) = match input.find('(') {
            Some(open) => {
                let rest = input[open + 1..].trim_end();
                let inner = rest.strip_suffix(')')?;
                (&input[..open], parse_args(inner)?)
            }
            None => (input, Vec::new()),
        };

        let name = normalize_name(raw_name)?;
        Some(Self { name, args })
    }

    /// Returns the normalized (lowercase, single-spaced) type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter list.
    pub fn args(&self) -> &[TypeArg] {
        &self.args
    }

    /// Returns `true` if there is no parameter list.
    pub fn is_bare(&self) -> bool {
        self.args.is_empty()
    }

    /// Returns the digit strings if every argument is numeric and there is at least one.
    pub fn numeric_args(&self) -> Option<Vec<&str>> {
        if self.args.is_empty() {
            return None;
        }
        self.args
            .iter()
            .map(|arg| match arg {
                TypeArg::Number(digits) => Some(digits.as_str()),
                TypeArg::Max => None,
            })
            .collect()
    }

    /// Returns `true` if the descriptor has no numeric arguments.
    ///
    /// These descriptors are the ones matched by exact rules: a bare name, or a
    /// name with only keyword arguments such as `nvarchar(max)`.
    pub fn is_non_numeric(&self) -> bool {
        self.args.iter().all(|arg| matches!(arg, TypeArg::Max))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
            write!(f, "({})", args.join(","))?;
        }
        Ok(())
    }
}

fn parse_args(inner: &str) -> Option<Vec<TypeArg>> {
    inner
        .split(',')
        .map(|arg| {
            let arg = arg.trim();
            if arg.eq_ignore_ascii_case("max") {
                Some(TypeArg::Max)
            } else if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) {
                Some(TypeArg::Number(arg.to_string()))
            } else {
                None
            }
        })
        .collect()
}

fn normalize_name(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw.split_whitespace().collect();
    let first = words.first()?.chars().next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }

    let valid = words
        .iter()
        .all(|w| w.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if !valid {
        return None;
    }

    Some(words.join(" ").to_ascii_lowercase())
}
