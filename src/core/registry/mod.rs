//! Client-group registry.
//!
//! Maps devices (by serial) to groups in a flat, hand-editable text file:
//!
//! ```text
//! @@lab@@
//! 10.0.0.6:SN2
//! 10.0.0.5:SN1
//! @@field@@
//! 192.168.1.1:SN9
//! ```
//!
//! Invariants enforced on every write:
//!
//! - a serial appears in at most one membership across the file;
//! - within one group an IP appears at most once.
//!
//! The [`GroupStore`] trait is the interface callers program against;
//! [`FlatFileRegistry`] is the line-oriented file implementation.

mod file;
pub mod scan;

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::core::constants::{MARKER, MEMBER_SEPARATOR};
use crate::core::types::{GroupName, Ip, Serial};
use crate::core::validation;
use crate::error::{RegistryError, Result};

use scan::{scan, Line};

/// One device's place in a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Membership {
    pub ip: Ip,
    pub serial: Serial,
}

impl Membership {
    pub fn new(ip: impl Into<Ip>, serial: impl Into<Serial>) -> Self {
        Self {
            ip: ip.into(),
            serial: serial.into(),
        }
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.ip, MEMBER_SEPARATOR, self.serial)
    }
}

/// Result of a successful `add_client`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The group did not exist; its marker was appended with the membership.
    CreatedGroup,
    /// The membership was added to an existing group.
    Joined,
}

impl AddOutcome {
    /// True when the caller has to provision keys for a new group.
    pub fn created_group(self) -> bool {
        self == AddOutcome::CreatedGroup
    }
}

/// Group membership store.
///
/// Every mutation is all-or-nothing: either the whole new registry is
/// visible afterwards or the old one is.
pub trait GroupStore {
    /// Lazy sequence of group names.
    type Groups: Iterator<Item = Result<GroupName>>;

    /// Group holding a membership with `serial`, if any.
    fn find_group_of(&self, serial: &str) -> Result<Option<GroupName>>;

    /// True if `group`'s span has a membership for `ip`.
    fn group_has_ip(&self, group: &str, ip: &str) -> Result<bool>;

    /// True if a marker line for `group` exists.
    fn group_exists(&self, group: &str) -> Result<bool>;

    /// Run the `add_client` preconditions without writing.
    ///
    /// Returns whether `group` already exists.
    ///
    /// # Errors
    ///
    /// `AlreadyInGroup` if the serial is registered anywhere,
    /// `IpConflict` if the group already has the IP.
    fn check_join(&self, group: &str, ip: &str, serial: &str) -> Result<bool>;

    /// Register a device in a group, creating the group if needed.
    ///
    /// # Errors
    ///
    /// Same as [`GroupStore::check_join`], plus I/O and validation errors.
    fn add_client(&self, group: &str, ip: &str, serial: &str) -> Result<AddOutcome>;

    /// Remove the membership carrying `serial`, whatever its group.
    ///
    /// # Errors
    ///
    /// `DeviceNotFound` if no membership has the serial; the file is untouched.
    fn remove_device(&self, serial: &str) -> Result<Membership>;

    /// Remove a group marker and every membership in its span.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` if no marker exists.
    fn delete_group(&self, group: &str) -> Result<Vec<Membership>>;

    /// Group names in file order. Each call starts a fresh read.
    fn list_groups(&self) -> Result<Self::Groups>;

    /// Memberships of `group` in file order.
    fn members(&self, group: &str) -> Result<Vec<Membership>>;
}

/// Registry backed by a line-oriented text file.
#[derive(Debug, Clone)]
pub struct FlatFileRegistry {
    path: PathBuf,
}

impl FlatFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String> {
        file::read(&self.path)
    }

    fn write(&self, content: &str) -> Result<()> {
        file::replace(&self.path, content)
    }
}

/// Group owning the membership with `serial`.
///
/// Member-shaped lines before the first marker belong to no group and are
/// ignored like any other unparseable line.
fn owner_of<'a>(content: &'a str, serial: &str) -> Option<&'a str> {
    scan(content).find_map(|s| match s.line {
        Line::Member { serial: found, .. } if found == serial => s.owner,
        _ => None,
    })
}

fn has_marker(content: &str, group: &str) -> bool {
    scan(content).any(|s| s.line == Line::Marker(group))
}

fn has_ip(content: &str, group: &str, ip: &str) -> bool {
    scan(content).any(|s| {
        s.owner == Some(group) && matches!(s.line, Line::Member { ip: found, .. } if found == ip)
    })
}

fn check_join_in(content: &str, group: &str, ip: &str, serial: &str) -> Result<bool> {
    if let Some(owner) = owner_of(content, serial) {
        return Err(RegistryError::AlreadyInGroup {
            serial: serial.to_string(),
            group: owner.to_string(),
        }
        .into());
    }

    if has_ip(content, group, ip) {
        return Err(RegistryError::IpConflict {
            ip: ip.to_string(),
            group: group.to_string(),
        }
        .into());
    }

    Ok(has_marker(content, group))
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Insert `entry` right after the first marker of `group`.
fn insert_after_marker(content: &str, group: &str, entry: &str) -> String {
    let mut out = String::with_capacity(content.len() + entry.len() + 1);
    let mut inserted = false;

    for s in scan(content) {
        out.push_str(s.raw);
        if !inserted && s.line == Line::Marker(group) {
            ensure_newline(&mut out);
            out.push_str(entry);
            out.push('\n');
            inserted = true;
        }
    }

    out
}

/// Append a new group marker followed by `entry` at the end of the file.
fn append_group(content: &str, group: &str, entry: &str) -> String {
    let mut out = String::with_capacity(content.len() + group.len() + entry.len() + 8);
    out.push_str(content);
    ensure_newline(&mut out);
    out.push_str(&format!("{MARKER}{group}{MARKER}\n{entry}\n"));
    out
}

impl GroupStore for FlatFileRegistry {
    type Groups = GroupNames;

    fn find_group_of(&self, serial: &str) -> Result<Option<GroupName>> {
        let content = self.read()?;
        Ok(owner_of(&content, serial).map(str::to_string))
    }

    fn group_has_ip(&self, group: &str, ip: &str) -> Result<bool> {
        let content = self.read()?;
        Ok(has_ip(&content, group, ip))
    }

    fn group_exists(&self, group: &str) -> Result<bool> {
        let content = self.read()?;
        Ok(has_marker(&content, group))
    }

    fn check_join(&self, group: &str, ip: &str, serial: &str) -> Result<bool> {
        validation::validate_group(group)?;
        validation::validate_ip(ip)?;
        validation::validate_serial(serial)?;

        let content = self.read()?;
        check_join_in(&content, group, ip, serial)
    }

    fn add_client(&self, group: &str, ip: &str, serial: &str) -> Result<AddOutcome> {
        validation::validate_group(group)?;
        validation::validate_ip(ip)?;
        validation::validate_serial(serial)?;

        let content = self.read()?;
        let exists = check_join_in(&content, group, ip, serial)?;
        let entry = Membership::new(ip, serial).to_string();

        let (updated, outcome) = if exists {
            (insert_after_marker(&content, group, &entry), AddOutcome::Joined)
        } else {
            (append_group(&content, group, &entry), AddOutcome::CreatedGroup)
        };

        self.write(&updated)?;
        info!(group, ip, serial, created = outcome.created_group(), "client registered");

        Ok(outcome)
    }

    fn remove_device(&self, serial: &str) -> Result<Membership> {
        let content = self.read()?;
        let mut removed = None;
        let mut out = String::with_capacity(content.len());

        for s in scan(&content) {
            match s.line {
                Line::Member { ip, serial: found } if found == serial && s.owner.is_some() => {
                    debug!(line = s.index + 1, group = ?s.owner, "removing membership");
                    removed.get_or_insert_with(|| Membership::new(ip, found));
                }
                _ => out.push_str(s.raw),
            }
        }

        let removed = removed.ok_or_else(|| RegistryError::DeviceNotFound(serial.to_string()))?;
        self.write(&out)?;
        info!(serial, "device removed");

        Ok(removed)
    }

    fn delete_group(&self, group: &str) -> Result<Vec<Membership>> {
        let content = self.read()?;
        if !has_marker(&content, group) {
            return Err(RegistryError::GroupNotFound(group.to_string()).into());
        }

        let mut removed = Vec::new();
        let mut out = String::with_capacity(content.len());

        for s in scan(&content) {
            match s.line {
                Line::Marker(name) if name == group => {}
                Line::Member { ip, serial } if s.owner == Some(group) => {
                    removed.push(Membership::new(ip, serial));
                }
                _ => out.push_str(s.raw),
            }
        }

        self.write(&out)?;
        info!(group, members = removed.len(), "group deleted");

        Ok(removed)
    }

    fn list_groups(&self) -> Result<GroupNames> {
        GroupNames::open(&self.path)
    }

    fn members(&self, group: &str) -> Result<Vec<Membership>> {
        let content = self.read()?;
        Ok(scan(&content)
            .filter(|s| s.owner == Some(group))
            .filter_map(|s| match s.line {
                Line::Member { ip, serial } => Some(Membership::new(ip, serial)),
                _ => None,
            })
            .collect())
    }
}

/// Lazy iterator over the marker lines of a registry file.
pub struct GroupNames {
    path: PathBuf,
    lines: Option<io::Lines<BufReader<File>>>,
}

impl GroupNames {
    fn open(path: &Path) -> Result<Self> {
        let lines = match File::open(path) {
            Ok(f) => Some(BufReader::new(f).lines()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(RegistryError::Read {
                    path: path.to_path_buf(),
                    source,
                }
                .into())
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            lines,
        })
    }
}

impl Iterator for GroupNames {
    type Item = Result<GroupName>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.as_mut()?.next()? {
                Ok(line) => line,
                Err(source) => {
                    self.lines = None;
                    return Some(Err(RegistryError::Read {
                        path: self.path.clone(),
                        source,
                    }
                    .into()));
                }
            };

            if let Line::Marker(name) = Line::parse(&line) {
                return Some(Ok(name.to_string()));
            }
        }
    }
}
