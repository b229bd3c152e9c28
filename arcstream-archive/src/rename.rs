//! Decorators rewriting entry names.

use arcstream_core::error::Result;
use arcstream_core::path::{self, Scope};
use arcstream_core::{Reader, Stat};
use std::path::PathBuf;

/// Strip the directory `base` from `name` when `name` lies inside it.
fn relative_to<'a>(base: &str, name: &'a str) -> Option<&'a str> {
    match path::scope(base, name) {
        Scope::Exact => Some(""),
        Scope::Inside => Some(name[base.len()..].trim_start_matches('/')),
        Scope::Ancestor | Scope::Outside => None,
    }
}

macro_rules! relay_data {
    () => {
        fn stat(&self) -> Stat {
            self.source.stat()
        }

        fn mime(&self) -> String {
            self.source.mime()
        }

        fn data_filename(&self) -> Option<PathBuf> {
            self.source.data_filename()
        }

        fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
            self.source.read_data(length)
        }

        fn skip(&mut self, length: u64) -> Result<u64> {
            self.source.skip(length)
        }

        fn close(&mut self) -> Result<()> {
            self.source.close()
        }

        fn into_source(self: Box<Self>) -> Option<Box<dyn Reader>> {
            Some(self.source)
        }
    };
}

/// Prefixes every entry name with a base directory.
pub struct AddBaseName {
    base: String,
    source: Box<dyn Reader>,
}

impl AddBaseName {
    /// Prefix names from `source` with `base`.
    pub fn new(base: &str, source: Box<dyn Reader>) -> Self {
        Self {
            base: path::normalize(base),
            source,
        }
    }
}

impl Reader for AddBaseName {
    fn next(&mut self) -> Result<bool> {
        self.source.next()
    }

    fn filename(&self) -> String {
        path::join(&self.base, &self.source.filename())
    }

    fn select(&mut self, target: &str) -> Result<bool> {
        let target = path::normalize(target);
        if self.base.is_empty() {
            return self.source.select(&target);
        }
        match path::scope(&self.base, &target) {
            Scope::Exact | Scope::Ancestor => self.source.select(""),
            Scope::Inside => {
                let rest = target[self.base.len()..].trim_start_matches('/');
                self.source.select(rest)
            }
            Scope::Outside => {
                self.source.close()?;
                Ok(false)
            }
        }
    }

    relay_data!();
}

/// Replaces a leading directory of entry names by another one.
///
/// Names outside the old base pass through unchanged.
pub struct ChangeBaseName {
    old_base: String,
    new_base: String,
    source: Box<dyn Reader>,
}

impl ChangeBaseName {
    /// Rename `old_base/...` to `new_base/...`.
    pub fn new(old_base: &str, new_base: &str, source: Box<dyn Reader>) -> Self {
        Self {
            old_base: path::normalize(old_base)
                .trim_end_matches('/')
                .to_string(),
            new_base: path::normalize(new_base)
                .trim_end_matches('/')
                .to_string(),
            source,
        }
    }
}

impl Reader for ChangeBaseName {
    fn next(&mut self) -> Result<bool> {
        self.source.next()
    }

    fn filename(&self) -> String {
        let name = self.source.filename();
        match relative_to(&self.old_base, &name) {
            Some(rest) => path::join(&self.new_base, rest),
            None => name,
        }
    }

    fn select(&mut self, target: &str) -> Result<bool> {
        let target = path::normalize(target);
        let mapped = match relative_to(&self.new_base, &target) {
            Some(rest) => path::join(&self.old_base, rest),
            None => target,
        };
        self.source.select(&mapped)
    }

    relay_data!();
}
