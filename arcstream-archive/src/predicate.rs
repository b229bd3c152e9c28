//! Boolean tests on the current entry of a reader.
//!
//! Predicates drive [`FilterReader`](crate::filter::FilterReader). They only
//! look at the entry's name, metadata and MIME type, never at its data.
//!
//! ```rust
//! use arcstream_archive::predicate::{self, Predicate, PredicateExt};
//! use arcstream_archive::memory::MemoryReader;
//! use arcstream_core::Reader;
//!
//! let wanted = predicate::extension(["txt", "md"])
//!     .and(predicate::min_size(3))
//!     .and(predicate::max_depth(0).not());
//!
//! let mut entry = MemoryReader::new("hello", "docs/readme.md");
//! entry.next().unwrap();
//! assert!(wanted.is_true(&entry));
//! ```

use arcstream_core::error::Result;
use arcstream_core::path::{self, Scope};
use arcstream_core::Reader;
use regex::{Regex, RegexBuilder};

/// A test on the current entry of a reader.
pub trait Predicate {
    /// Evaluate the predicate on the current entry of `source`.
    fn is_true(&self, source: &dyn Reader) -> bool;
}

impl<P: Predicate + ?Sized> Predicate for Box<P> {
    fn is_true(&self, source: &dyn Reader) -> bool {
        (**self).is_true(source)
    }
}

/// Combinators available on every predicate.
pub trait PredicateExt: Predicate + Sized + 'static {
    /// Both predicates hold. `other` is not evaluated when `self` fails.
    fn and<P: Predicate + 'static>(self, other: P) -> And {
        And::new().with(self).with(other)
    }

    /// Either predicate holds. `other` is not evaluated when `self` holds.
    fn or<P: Predicate + 'static>(self, other: P) -> Or {
        Or::new().with(self).with(other)
    }

    /// The predicate does not hold.
    fn not(self) -> Not {
        Not(Box::new(self))
    }

    /// Box the predicate.
    fn boxed(self) -> Box<dyn Predicate> {
        Box::new(self)
    }
}

impl<P: Predicate + Sized + 'static> PredicateExt for P {}

/// Always true.
#[derive(Debug, Clone, Copy, Default)]
pub struct True;

impl Predicate for True {
    fn is_true(&self, _source: &dyn Reader) -> bool {
        true
    }
}

/// Always false.
#[derive(Debug, Clone, Copy, Default)]
pub struct False;

impl Predicate for False {
    fn is_true(&self, _source: &dyn Reader) -> bool {
        false
    }
}

/// Conjunction, evaluated left to right. Empty conjunctions hold.
#[derive(Default)]
pub struct And(Vec<Box<dyn Predicate>>);

impl And {
    /// Create an empty conjunction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operand.
    pub fn with<P: Predicate + 'static>(mut self, predicate: P) -> Self {
        self.0.push(Box::new(predicate));
        self
    }
}

impl Predicate for And {
    fn is_true(&self, source: &dyn Reader) -> bool {
        self.0.iter().all(|p| p.is_true(source))
    }
}

/// Disjunction, evaluated left to right. Empty disjunctions fail.
#[derive(Default)]
pub struct Or(Vec<Box<dyn Predicate>>);

impl Or {
    /// Create an empty disjunction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operand.
    pub fn with<P: Predicate + 'static>(mut self, predicate: P) -> Self {
        self.0.push(Box::new(predicate));
        self
    }
}

impl Predicate for Or {
    fn is_true(&self, source: &dyn Reader) -> bool {
        self.0.iter().any(|p| p.is_true(source))
    }
}

/// Negation.
pub struct Not(Box<dyn Predicate>);

impl Predicate for Not {
    fn is_true(&self, source: &dyn Reader) -> bool {
        !self.0.is_true(source)
    }
}

/// Entries of at least the given size. Entries of unknown size pass.
#[derive(Debug, Clone, Copy)]
pub struct MinSize(pub u64);

impl Predicate for MinSize {
    fn is_true(&self, source: &dyn Reader) -> bool {
        source.stat().size.is_none_or(|size| size >= self.0)
    }
}

/// Entries modified at or after the given Unix time. Entries without a
/// modification time pass.
#[derive(Debug, Clone, Copy)]
pub struct MinTime(pub u64);

impl Predicate for MinTime {
    fn is_true(&self, source: &dyn Reader) -> bool {
        source.stat().mtime.is_none_or(|mtime| mtime >= self.0)
    }
}

/// Entries with at most the given number of `/` in their name.
#[derive(Debug, Clone, Copy)]
pub struct MaxDepth(pub usize);

impl Predicate for MaxDepth {
    fn is_true(&self, source: &dyn Reader) -> bool {
        path::depth(&source.filename()) <= self.0
    }
}

/// Entries whose extension is in a list, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct Extension(Vec<String>);

impl Extension {
    /// Accept the given extensions (without the dot).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        )
    }
}

impl Predicate for Extension {
    fn is_true(&self, source: &dyn Reader) -> bool {
        let name = source.filename();
        match path::extension(&name) {
            Some(ext) => {
                let ext = ext.to_ascii_lowercase();
                self.0.iter().any(|e| *e == ext)
            }
            None => false,
        }
    }
}

/// Entries whose MIME type is in a list. `type/*` matches a whole family.
#[derive(Debug, Clone)]
pub struct Mime(Vec<String>);

impl Mime {
    /// Accept the given MIME types.
    pub fn new<I, S>(mimes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            mimes
                .into_iter()
                .map(|m| m.as_ref().to_ascii_lowercase())
                .collect(),
        )
    }
}

impl Predicate for Mime {
    fn is_true(&self, source: &dyn Reader) -> bool {
        let mime = source.mime().to_ascii_lowercase();
        self.0.iter().any(|wanted| match wanted.strip_suffix("/*") {
            Some(family) => mime
                .split_once('/')
                .is_some_and(|(kind, _)| kind == family),
            None => *wanted == mime,
        })
    }
}

/// A closure over the current entry.
pub struct Custom<F>(pub F);

impl<F: Fn(&dyn Reader) -> bool> Predicate for Custom<F> {
    fn is_true(&self, source: &dyn Reader) -> bool {
        (self.0)(source)
    }
}

/// Entries whose name matches a regular expression.
#[derive(Debug, Clone)]
pub struct NameRegex(Regex);

impl NameRegex {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self(Regex::new(pattern)?))
    }

    /// Compile `pattern`, ignoring case.
    pub fn case_insensitive(pattern: &str) -> Result<Self> {
        Ok(Self(RegexBuilder::new(pattern).case_insensitive(true).build()?))
    }
}

impl Predicate for NameRegex {
    fn is_true(&self, source: &dyn Reader) -> bool {
        self.0.is_match(&source.filename())
    }
}

/// A fixed path and everything below it. The empty path matches every
/// entry.
#[derive(Debug, Clone)]
pub struct Select(String);

impl Select {
    /// Match `path` or its subtree. A trailing `/` is ignored.
    pub fn new(target: &str) -> Self {
        Self(path::normalize(target).trim_end_matches('/').to_string())
    }
}

impl Predicate for Select {
    fn is_true(&self, source: &dyn Reader) -> bool {
        matches!(
            path::scope(&self.0, &source.filename()),
            Scope::Exact | Scope::Inside
        )
    }
}

/// [`True`].
pub fn always() -> True {
    True
}

/// [`False`].
pub fn never() -> False {
    False
}

/// [`MinSize`].
pub fn min_size(size: u64) -> MinSize {
    MinSize(size)
}

/// [`MinTime`].
pub fn min_time(mtime: u64) -> MinTime {
    MinTime(mtime)
}

/// [`MaxDepth`].
pub fn max_depth(depth: usize) -> MaxDepth {
    MaxDepth(depth)
}

/// [`Extension`].
pub fn extension<I, S>(extensions: I) -> Extension
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Extension::new(extensions)
}

/// [`Mime`].
pub fn mime<I, S>(mimes: I) -> Mime
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Mime::new(mimes)
}

/// [`NameRegex`].
pub fn regex(pattern: &str) -> Result<NameRegex> {
    NameRegex::new(pattern)
}

/// Case-insensitive [`NameRegex`].
pub fn regex_ci(pattern: &str) -> Result<NameRegex> {
    NameRegex::case_insensitive(pattern)
}

/// [`Select`].
pub fn select(target: &str) -> Select {
    Select::new(target)
}

/// [`Custom`].
pub fn custom<F: Fn(&dyn Reader) -> bool>(f: F) -> Custom<F> {
    Custom(f)
}
