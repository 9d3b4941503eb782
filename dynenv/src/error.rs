use dynenv_attrs::ErrorKind;
use dynenv_error::ErrorKind;

/// A name was missing or empty.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("invalid dynamic variable name: {}", self.found),
    help = "names must be non-empty strings or tokens",
)]
pub struct InvalidName {
    /// Description of what was found in place of a valid name.
    pub found: String,
}

/// No frame, including the global frame, holds the name.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("unbound dynamic variable: `{}`", self.name),
    help = if self.suggestions.is_empty() {
        "bind it when constructing the environment, or rebind it around this call".to_string()
    } else if self.suggestions.len() == 1 {
        format!("did you mean `{}`?", self.suggestions[0])
    } else {
        format!(
            "did you mean one of these? {}",
            self.suggestions
                .iter()
                .map(|s| format!("`{}`", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    },
)]
pub struct UnboundVariable {
    /// The name that was looked up.
    pub name: String,

    /// Visible names that are spelled similarly.
    pub suggestions: Vec<String>,
}

/// A flattened name / value list was malformed, or a mutation was given no pairs.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("bindings arguments, expected {}, but got: {}", self.expected, self.given),
    note = "bindings are given as name / value pairs",
)]
pub struct ArityError {
    /// What the argument list should have looked like.
    pub expected: &'static str,

    /// The number of elements that were given.
    pub given: usize,
}
