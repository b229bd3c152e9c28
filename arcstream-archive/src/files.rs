//! Writer materializing entries as files on disk.

use arcstream_core::error::{ArcError, Result};
use arcstream_core::{Stat, Writer, path};
use filetime::FileTime;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

struct OpenFile {
    path: PathBuf,
    stat: Stat,
    out: BufWriter<File>,
}

impl OpenFile {
    fn finish(mut self) -> Result<()> {
        self.out.flush()?;
        drop(self.out);
        if let Some(mtime) = self.stat.mtime {
            let mtime = FileTime::from_unix_time(i64::try_from(mtime).unwrap_or(i64::MAX), 0);
            filetime::set_file_mtime(&self.path, mtime)?;
        }
        #[cfg(unix)]
        if let Some(mode) = self.stat.mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(mode & 0o7777))?;
        }
        Ok(())
    }
}

/// Writes every entry to a file below a base directory.
///
/// Missing parent directories are created. Entry names are made relative
/// first, so `../` components cannot leave the base directory. Modification
/// times, and permissions on Unix, are restored from the entry metadata.
pub struct FilesWriter {
    base: PathBuf,
    current: Option<OpenFile>,
}

impl FilesWriter {
    /// Write below `base`. An empty path means the working directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            current: None,
        }
    }

    /// The base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Physical path of the entry named `name`.
    pub fn target(&self, name: &str) -> PathBuf {
        let mut target = self.base.clone();
        for part in path::normalize(name).split('/') {
            if !part.is_empty() && part != ".." {
                target.push(part);
            }
        }
        target
    }

    fn finish_current(&mut self) -> Result<()> {
        match self.current.take() {
            Some(file) => file.finish(),
            None => Ok(()),
        }
    }

    fn current_mut(&mut self) -> Result<&mut OpenFile> {
        self.current
            .as_mut()
            .ok_or_else(|| ArcError::usage("data written before new_file"))
    }
}

/// Create `dir` and its missing parents, failing when one of them exists as
/// something other than a directory.
fn make_dirs(dir: &Path) -> Result<()> {
    let mut current = PathBuf::new();
    for component in dir.components() {
        current.push(component);
        match fs::metadata(&current) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ArcError::path_conflict(current.display().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => match fs::create_dir(&current) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && current.is_dir() => {}
                Err(e) => return Err(e.into()),
            },
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

impl Writer for FilesWriter {
    fn new_file(&mut self, filename: &str, stat: &Stat, _mime: &str) -> Result<()> {
        self.finish_current()?;
        let target = self.target(filename);
        if let Some(parent) = target.parent() {
            make_dirs(parent)?;
        }
        log::debug!("writing {}", target.display());
        let file = File::create(&target)?;
        self.current = Some(OpenFile {
            path: target,
            stat: *stat,
            out: BufWriter::new(file),
        });
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.current_mut()?.out.write_all(data)?;
        Ok(())
    }

    fn write_file(&mut self, source: &Path) -> Result<()> {
        let current = self.current_mut()?;
        io::copy(&mut File::open(source)?, &mut current.out)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.finish_current()
    }
}
