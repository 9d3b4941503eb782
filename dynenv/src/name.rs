use crate::error::InvalidName;
use dynenv_error::Error;
use std::{
    fmt,
    sync::{atomic::{AtomicU64, Ordering}, Arc},
};

/// An unforgeable identity.
///
/// Tokens can only be obtained by minting a fresh one with [`Token::fresh`], so a token can never
/// collide with a name chosen by anyone who did not receive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u64);

impl Token {
    /// Mints a token distinct from every other token minted by this process.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The identity under which a value is bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// A caller-chosen string name.
    Symbol(Arc<str>),

    /// A private identity, used where names must never collide.
    Token(Token),
}

impl Name {
    /// Returns the name as a string, if it is a symbol.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Name::Symbol(sym) => Some(sym.as_ref()),
            Name::Token(_) => None,
        }
    }

    /// Checks that the name can be bound. The empty symbol is not a valid name.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Name::Symbol(sym) if sym.is_empty() => Err(Error::new(InvalidName {
                found: "the empty string".to_string(),
            })),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Symbol(sym) => write!(f, "{}", sym),
            Name::Token(Token(id)) => write!(f, "#<token {}>", id),
        }
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name::Symbol(name.into())
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Name::Symbol(name.into())
    }
}

impl From<&Name> for Name {
    fn from(name: &Name) -> Self {
        name.clone()
    }
}

impl From<Token> for Name {
    fn from(token: Token) -> Self {
        Name::Token(token)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::InvalidName;
    use super::*;

    #[test]
    fn tokens_are_distinct() {
        let a = Token::fresh();
        let b = Token::fresh();
        assert_ne!(a, b);
        assert_ne!(Name::from(a), Name::from(b));
    }

    #[test]
    fn token_never_equals_symbol() {
        let token = Token::fresh();
        let printed = Name::from(token).to_string();
        assert_ne!(Name::from(token), Name::from(printed.as_str()));
    }

    #[test]
    fn empty_symbol_is_invalid() {
        let err = Name::from("").validate().unwrap_err();
        assert!(err.is::<InvalidName>());
        assert!(Name::from("x").validate().is_ok());
        assert!(Name::from(Token::fresh()).validate().is_ok());
    }

    #[test]
    fn display() {
        assert_eq!(Name::from("request_id").to_string(), "request_id");
        assert!(Name::from(Token::fresh()).to_string().starts_with("#<token "));
    }
}
