//! Hosts-file aliases for declared hostnames

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Loopback address every alias points to
pub const LOOPBACK: &str = "127.0.0.1";

/// Something that can point a hostname at the loopback address
pub trait HostsFile {
    /// Add `127.0.0.1 <hostname>` unless it is already present.
    ///
    /// Returns `true` when an entry was appended.
    fn set_alias(&mut self, hostname: &str) -> io::Result<bool>;
}

/// A hosts file on disk, `/etc/hosts` by default
#[derive(Debug, Clone)]
pub struct EtcHosts {
    path: PathBuf,
}

impl EtcHosts {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn has_alias(content: &str, hostname: &str) -> bool {
        content.lines().any(|line| {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            fields.next() == Some(LOOPBACK) && fields.any(|name| name.eq_ignore_ascii_case(hostname))
        })
    }
}

impl Default for EtcHosts {
    fn default() -> Self {
        Self::new("/etc/hosts")
    }
}

impl HostsFile for EtcHosts {
    fn set_alias(&mut self, hostname: &str) -> io::Result<bool> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        if Self::has_alias(&content, hostname) {
            return Ok(false);
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        if !content.is_empty() && !content.ends_with('\n') {
            writeln!(file)?;
        }
        writeln!(file, "{} {}", LOOPBACK, hostname)?;
        Ok(true)
    }
}

impl<H: HostsFile + ?Sized> HostsFile for &mut H {
    fn set_alias(&mut self, hostname: &str) -> io::Result<bool> {
        (**self).set_alias(hostname)
    }
}
