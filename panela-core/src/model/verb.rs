//! HTTP verbs and the static marker

use crate::error::DeclarationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A verb an endpoint answers to.
///
/// `Static` is not an HTTP method: it marks an endpoint whose directory is
/// served by nginx as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Head,
    Put,
    Patch,
    Post,
    Delete,
    Options,
    Static,
}

impl Verb {
    /// Every real HTTP verb, in the order `all` declares them
    pub const HTTP: [Verb; 7] = [
        Verb::Get,
        Verb::Head,
        Verb::Put,
        Verb::Patch,
        Verb::Post,
        Verb::Delete,
        Verb::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Head => "head",
            Verb::Put => "put",
            Verb::Patch => "patch",
            Verb::Post => "post",
            Verb::Delete => "delete",
            Verb::Options => "options",
            Verb::Static => "static",
        }
    }

    /// The HTTP method, `None` for the static marker
    pub fn method(&self) -> Option<http::Method> {
        match self {
            Verb::Get => Some(http::Method::GET),
            Verb::Head => Some(http::Method::HEAD),
            Verb::Put => Some(http::Method::PUT),
            Verb::Patch => Some(http::Method::PATCH),
            Verb::Post => Some(http::Method::POST),
            Verb::Delete => Some(http::Method::DELETE),
            Verb::Options => Some(http::Method::OPTIONS),
            Verb::Static => None,
        }
    }

    pub fn from_method(method: &http::Method) -> Option<Verb> {
        Verb::HTTP
            .into_iter()
            .find(|verb| verb.method().as_ref() == Some(method))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let verb = match s.to_ascii_lowercase().as_str() {
            "get" => Verb::Get,
            "head" => Verb::Head,
            "put" => Verb::Put,
            "patch" => Verb::Patch,
            "post" => Verb::Post,
            "delete" => Verb::Delete,
            "options" => Verb::Options,
            "static" => Verb::Static,
            _ => {
                return Err(DeclarationError::UnknownVerb {
                    verb: s.to_string(),
                })
            }
        };
        Ok(verb)
    }
}

/// Ordered set of verbs
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbSet(BTreeSet<Verb>);

impl VerbSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(verb: Verb) -> Self {
        Self(BTreeSet::from([verb]))
    }

    /// All seven HTTP verbs
    pub fn all() -> Self {
        Verb::HTTP.into_iter().collect()
    }

    pub fn insert(&mut self, verb: Verb) -> bool {
        self.0.insert(verb)
    }

    pub fn contains(&self, verb: Verb) -> bool {
        self.0.contains(&verb)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the set is exactly `{static}`
    pub fn is_static_marker(&self) -> bool {
        self.0.len() == 1 && self.contains(Verb::Static)
    }

    /// Whether a request method is served by this set
    pub fn allows(&self, method: &http::Method) -> bool {
        Verb::from_method(method).is_some_and(|verb| self.contains(verb))
    }

    pub fn iter(&self) -> impl Iterator<Item = Verb> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Verb> for VerbSet {
    fn from_iter<I: IntoIterator<Item = Verb>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for VerbSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for verb in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            f.write_str(verb.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verbs() {
        assert_eq!("GET".parse::<Verb>().unwrap(), Verb::Get);
        assert_eq!("static".parse::<Verb>().unwrap(), Verb::Static);
        assert!(matches!(
            "fetch".parse::<Verb>(),
            Err(DeclarationError::UnknownVerb { .. })
        ));
    }

    #[test]
    fn test_static_marker() {
        assert!(VerbSet::single(Verb::Static).is_static_marker());
        let mixed: VerbSet = [Verb::Static, Verb::Get].into_iter().collect();
        assert!(!mixed.is_static_marker());
        assert!(!VerbSet::all().contains(Verb::Static));
    }

    #[test]
    fn test_allows_method() {
        let verbs: VerbSet = [Verb::Get, Verb::Post].into_iter().collect();
        assert!(verbs.allows(&http::Method::POST));
        assert!(!verbs.allows(&http::Method::DELETE));
        assert!(!VerbSet::single(Verb::Static).allows(&http::Method::GET));
        assert_eq!(verbs.to_string(), "get post");
    }
}
