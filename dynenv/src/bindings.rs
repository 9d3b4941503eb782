use crate::{error::{ArityError, InvalidName}, name::Name};
use dynenv_error::Error;
use std::vec;

/// One element of a flattened name / value list.
///
/// Flattened lists alternate names and values: `[Name, Value, Name, Value, ...]`. They are the
/// form used by callers that assemble bindings dynamically; statically known bindings are easier
/// to write as pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg<V> {
    /// A name, expected at even positions.
    Name(Name),

    /// A value, expected at odd positions.
    Value(V),
}

impl<V> Arg<V> {
    /// Creates a name element.
    pub fn name(name: impl Into<Name>) -> Self {
        Arg::Name(name.into())
    }

    /// Creates a value element.
    pub fn value(value: V) -> Self {
        Arg::Value(value)
    }
}

/// An ordered list of name / value pairs, used to seed environments, build rebinding frames, and
/// perform in-place mutations.
///
/// Names are checked with [`Bindings::validate`] by whatever consumes the bindings, before any
/// frame is built or written.
#[derive(Debug, Clone, PartialEq)]
pub struct Bindings<V> {
    pairs: Vec<(Name, V)>,
}

impl<V> Default for Bindings<V> {
    fn default() -> Self {
        Self { pairs: Vec::new() }
    }
}

impl<V> Bindings<V> {
    /// Creates an empty list of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding to the end of the list.
    pub fn bind(mut self, name: impl Into<Name>, value: V) -> Self {
        self.pairs.push((name.into(), value));
        self
    }

    /// Parses a flattened list of alternating names and values.
    ///
    /// Fails with [`ArityError`] if the list has an odd number of elements or a name appears
    /// where a value is expected, and with [`InvalidName`] if a value appears where a name is
    /// expected.
    pub fn from_flat(args: impl IntoIterator<Item = Arg<V>>) -> Result<Self, Error> {
        let args = args.into_iter().collect::<Vec<_>>();
        if args.len() % 2 != 0 {
            return Err(Error::new(ArityError {
                expected: "an even number of elements",
                given: args.len(),
            }));
        }

        let given = args.len();
        let mut pairs = Vec::with_capacity(given / 2);
        let mut args = args.into_iter();
        while let (Some(name), Some(value)) = (args.next(), args.next()) {
            match (name, value) {
                (Arg::Name(name), Arg::Value(value)) => pairs.push((name, value)),
                (Arg::Value(_), _) => return Err(Error::new(InvalidName {
                    found: format!("a value at position {}", pairs.len() * 2),
                })),
                (Arg::Name(_), Arg::Name(_)) => return Err(Error::new(ArityError {
                    expected: "a value after every name",
                    given,
                })),
            }
        }

        Ok(Self { pairs })
    }

    /// Checks every name in the list.
    pub fn validate(&self) -> Result<(), Error> {
        self.pairs.iter().try_for_each(|(name, _)| name.validate())
    }

    /// Returns the number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns an iterator over the pairs.
    pub fn iter(&self) -> impl Iterator<Item = &(Name, V)> {
        self.pairs.iter()
    }
}

impl<V> IntoIterator for Bindings<V> {
    type Item = (Name, V);
    type IntoIter = vec::IntoIter<(Name, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl<N: Into<Name>, V> FromIterator<(N, V)> for Bindings<V> {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(name, value)| (name.into(), value)).collect(),
        }
    }
}

impl<N: Into<Name>, V> From<(N, V)> for Bindings<V> {
    fn from((name, value): (N, V)) -> Self {
        Self::new().bind(name, value)
    }
}

impl<N: Into<Name>, V, const K: usize> From<[(N, V); K]> for Bindings<V> {
    fn from(pairs: [(N, V); K]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<N: Into<Name>, V> From<Vec<(N, V)>> for Bindings<V> {
    fn from(pairs: Vec<(N, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn flat_pairs() {
        let bindings = Bindings::from_flat([
            Arg::name("x"), Arg::value(1),
            Arg::name("y"), Arg::value(2),
        ]).unwrap();
        assert_eq!(bindings, Bindings::from([("x", 1), ("y", 2)]));
    }

    #[test]
    fn flat_empty() {
        let bindings = Bindings::<i32>::from_flat([]).unwrap();
        assert!(bindings.is_empty());
    }

    #[test]
    fn flat_odd_length() {
        let err = Bindings::from_flat([Arg::name("x"), Arg::value(1), Arg::name("y")])
            .unwrap_err();
        let kind = err.downcast_ref::<ArityError>().unwrap();
        assert_eq!(kind.given, 3);
        assert_eq!(
            err.to_string(),
            "bindings arguments, expected an even number of elements, but got: 3",
        );
    }

    #[test]
    fn flat_value_in_name_position() {
        let err = Bindings::from_flat([Arg::value(1), Arg::value(2)]).unwrap_err();
        assert!(err.is::<InvalidName>());
    }

    #[test]
    fn flat_name_in_value_position() {
        let err = Bindings::<i32>::from_flat([Arg::name("x"), Arg::name("y")]).unwrap_err();
        assert!(err.is::<ArityError>());
    }

    #[test]
    fn validate_reports_empty_names() {
        assert!(Bindings::from([("x", 1), ("", 2)]).validate().unwrap_err().is::<InvalidName>());
        assert!(Bindings::from(vec![("x", 1)]).validate().is_ok());
    }
}
