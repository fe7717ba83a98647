//! nginx configuration tree
//!
//! A document is a root [`Clause`] holding directives, clauses and
//! locations in declaration order. Rendering is a pure function of the tree.

use std::fmt;

const INDENT_WIDTH: usize = 2;

fn indent(depth: usize) -> String {
    " ".repeat(depth * INDENT_WIDTH)
}

/// A single `name value;` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    name: String,
    value: String,
}

impl Directive {
    pub fn new(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {};", self.name, self.value)
    }
}

/// Entry of a clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Directive(Directive),
    Clause(Clause),
    Location(Location),
}

/// A named block of entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    name: String,
    depth: usize,
    entries: Vec<Entry>,
}

impl Clause {
    fn new(name: impl Into<String>, depth: usize) -> Self {
        Self {
            name: name.into(),
            depth,
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Append a directive
    pub fn directive(&mut self, name: impl Into<String>, value: impl fmt::Display) -> &mut Self {
        self.entries.push(Entry::Directive(Directive::new(name, value)));
        self
    }

    /// Append a child clause, populated by `build` before it is linked
    pub fn clause<F>(&mut self, name: impl Into<String>, build: F) -> &mut Self
    where
        F: FnOnce(&mut Clause),
    {
        let mut clause = Clause::new(name, self.depth + 1);
        build(&mut clause);
        self.entries.push(Entry::Clause(clause));
        self
    }

    /// Append a location, populated by `build` before it is linked
    pub fn location<F>(&mut self, path: impl Into<String>, build: F) -> &mut Self
    where
        F: FnOnce(&mut Location),
    {
        let mut location = Location::new(path, self.depth + 1);
        build(&mut location);
        self.entries.push(Entry::Location(location));
        self
    }

    /// Like [`Clause::clause`]; nothing is linked when `build` fails
    pub fn try_clause<F, E>(&mut self, name: impl Into<String>, build: F) -> Result<&mut Self, E>
    where
        F: FnOnce(&mut Clause) -> Result<(), E>,
    {
        let mut clause = Clause::new(name, self.depth + 1);
        build(&mut clause)?;
        self.entries.push(Entry::Clause(clause));
        Ok(self)
    }

    /// Like [`Clause::location`]; nothing is linked when `build` fails
    pub fn try_location<F, E>(&mut self, path: impl Into<String>, build: F) -> Result<&mut Self, E>
    where
        F: FnOnce(&mut Location) -> Result<(), E>,
    {
        let mut location = Location::new(path, self.depth + 1);
        build(&mut location)?;
        self.entries.push(Entry::Location(location));
        Ok(self)
    }

    /// Child clauses with a name
    pub fn clauses<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Clause> + 'a {
        self.entries.iter().filter_map(move |entry| match entry {
            Entry::Clause(clause) if clause.name == name => Some(clause),
            _ => None,
        })
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Location(location) => Some(location),
            _ => None,
        })
    }

    /// Values of the directives with a name, in order
    pub fn directive_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries.iter().filter_map(move |entry| match entry {
            Entry::Directive(directive) if directive.name == name => Some(directive.value()),
            _ => None,
        })
    }

    fn render(&self, spaced: bool) -> String {
        let ws = indent(self.depth);
        let spacer = if spaced && self.depth <= 1 { "\n" } else { "" };
        self.entries
            .iter()
            .map(|entry| match entry {
                Entry::Directive(directive) => format!("{}{}", ws, directive),
                Entry::Clause(clause) => {
                    format!("{}{}{} {{\n{}\n{}}}", spacer, ws, clause.name, clause.render(true), ws)
                }
                Entry::Location(location) => format!(
                    "{}{}{} {{\n{}\n{}}}",
                    spacer,
                    ws,
                    location.body.name,
                    location.body.render(false),
                    ws
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

/// A clause named `location <path>`.
///
/// Locations cannot open nested locations themselves; a nested clause can.
/// Their bodies never get blank-line spacers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    body: Clause,
}

impl Location {
    fn new(path: impl Into<String>, depth: usize) -> Self {
        let path = path.into();
        Self {
            body: Clause::new(format!("location {}", path), depth),
            path,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full clause name, `location <path>`
    pub fn name(&self) -> &str {
        &self.body.name
    }

    pub fn depth(&self) -> usize {
        self.body.depth
    }

    pub fn entries(&self) -> &[Entry] {
        &self.body.entries
    }

    pub fn directive(&mut self, name: impl Into<String>, value: impl fmt::Display) -> &mut Self {
        self.body.directive(name, value);
        self
    }

    pub fn clause<F>(&mut self, name: impl Into<String>, build: F) -> &mut Self
    where
        F: FnOnce(&mut Clause),
    {
        self.body.clause(name, build);
        self
    }

    pub fn try_clause<F, E>(&mut self, name: impl Into<String>, build: F) -> Result<&mut Self, E>
    where
        F: FnOnce(&mut Clause) -> Result<(), E>,
    {
        self.body.try_clause(name, build)?;
        Ok(self)
    }

    pub fn directive_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.body.directive_values(name)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body.render(false))
    }
}

/// Root of an nginx configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationRoot {
    root: Clause,
}

impl ConfigurationRoot {
    pub fn new() -> Self {
        Self {
            root: Clause::new("root", 0),
        }
    }
}

impl Default for ConfigurationRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for ConfigurationRoot {
    type Target = Clause;

    fn deref(&self) -> &Clause {
        &self.root
    }
}

impl std::ops::DerefMut for ConfigurationRoot {
    fn deref_mut(&mut self) -> &mut Clause {
        &mut self.root
    }
}

impl fmt::Display for ConfigurationRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}
