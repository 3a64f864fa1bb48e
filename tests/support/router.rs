//! In-memory router for exercising device operations without SSH.
//!
//! `FakeRouter` implements both transport traits. It keeps a tiny remote
//! filesystem, a user table and a log of every rendered command, and
//! interprets exactly the commands fleetssh issues.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use fleetssh::core::remote::{CommandOutput, FileTransfer, RemoteCommand, RemoteExecutor};
use fleetssh::error::{RemoteError, Result, TransferError};

pub const SERIAL: &str = "1109438724";
pub const MAC: &str = "00:1E:42:16:5A:7C";

fn norm(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Split a sed `s` expression on its unescaped delimiter.
fn sed_parts(expr: &str) -> Option<(String, String)> {
    let mut chars = expr.chars();
    if chars.next()? != 's' {
        return None;
    }
    let delim = chars.next()?;

    let mut parts = vec![String::new()];
    let mut escaped = false;
    for c in chars {
        if escaped {
            if c != delim {
                parts.last_mut()?.push('\\');
            }
            parts.last_mut()?.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delim {
            parts.push(String::new());
        } else {
            parts.last_mut()?.push(c);
        }
    }

    if parts.len() < 2 {
        return None;
    }
    let replacement = parts[1].replace("\\&", "&").replace("\\\\", "\\");
    Some((parts[0].clone(), replacement))
}

/// Scripted device state.
pub struct FakeRouter {
    pub serial: String,
    pub mac: String,
    files: RefCell<BTreeMap<String, Vec<u8>>>,
    dirs: RefCell<BTreeSet<String>>,
    users: RefCell<BTreeMap<String, Option<String>>>,
    log: RefCell<Vec<String>>,
    restored: RefCell<Vec<String>>,
    module: RefCell<Option<String>>,
    failing: RefCell<Vec<String>>,
    corrupt: Cell<bool>,
    refuse_put: Cell<bool>,
    operator_status: Cell<i32>,
    rebooted: Cell<bool>,
    unreachable: Cell<bool>,
}

impl Default for FakeRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRouter {
    pub fn new() -> Self {
        let router = Self {
            serial: SERIAL.to_string(),
            mac: MAC.to_string(),
            files: RefCell::new(BTreeMap::new()),
            dirs: RefCell::new(BTreeSet::new()),
            users: RefCell::new(BTreeMap::new()),
            log: RefCell::new(Vec::new()),
            restored: RefCell::new(Vec::new()),
            module: RefCell::new(None),
            failing: RefCell::new(Vec::new()),
            corrupt: Cell::new(false),
            refuse_put: Cell::new(false),
            operator_status: Cell::new(0),
            rebooted: Cell::new(false),
            unreachable: Cell::new(false),
        };
        for dir in ["/", "/root", "/opt", "/etc"] {
            router.dirs.borrow_mut().insert(dir.to_string());
        }
        router
    }

    pub fn with_serial(mut self, serial: &str) -> Self {
        self.serial = serial.to_string();
        self
    }

    /// Seed a remote file.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(norm(path), content.as_bytes().to_vec());
        self
    }

    pub fn with_user(self, name: &str) -> Self {
        self.users.borrow_mut().insert(name.to_string(), None);
        self
    }

    /// Archive listings report a module with this name.
    pub fn with_module(self, name: &str) -> Self {
        *self.module.borrow_mut() = Some(name.to_string());
        self
    }

    /// Every command whose rendering starts with `prefix` exits 1.
    pub fn fail_on(self, prefix: &str) -> Self {
        self.failing.borrow_mut().push(prefix.to_string());
        self
    }

    /// Flip the uploaded bytes so the remote digest differs.
    pub fn corrupting(self) -> Self {
        self.corrupt.set(true);
        self
    }

    pub fn refusing_uploads(self) -> Self {
        self.refuse_put.set(true);
        self
    }

    /// Every command fails as if the ssh connection could not be set up.
    pub fn unreachable(self) -> Self {
        self.unreachable.set(true);
        self
    }

    pub fn with_operator_status(self, status: i32) -> Self {
        self.operator_status.set(status);
        self
    }

    /// Rendered commands in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.log.borrow().iter().any(|c| c.starts_with(prefix))
    }

    /// Paths passed to `restore`, in order.
    pub fn restored(&self) -> Vec<String> {
        self.restored.borrow().clone()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files
            .borrow()
            .get(&norm(path))
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn exists(&self, path: &str) -> bool {
        let path = norm(path);
        let prefix = format!("{}/", path);
        self.files.borrow().contains_key(&path)
            || self.dirs.borrow().contains(&path)
            || self.files.borrow().keys().any(|k| k.starts_with(&prefix))
    }

    pub fn has_user(&self, name: &str) -> bool {
        self.users.borrow().contains_key(name)
    }

    pub fn password_of(&self, name: &str) -> Option<String> {
        self.users.borrow().get(name).cloned().flatten()
    }

    pub fn rebooted(&self) -> bool {
        self.rebooted.get()
    }

    fn write(&self, path: &str, text: &str, append: bool) {
        let mut files = self.files.borrow_mut();
        let entry = files.entry(norm(path)).or_default();
        if !append {
            entry.clear();
        }
        entry.extend_from_slice(text.as_bytes());
    }

    fn lines_of(&self, path: &str) -> Option<Vec<String>> {
        self.file(path)
            .map(|s| s.lines().map(str::to_string).collect())
    }

    fn remove(&self, path: &str) -> bool {
        let path = norm(path);
        let prefix = format!("{}/", path);
        let existed = self.exists(&path);
        self.files
            .borrow_mut()
            .retain(|k, _| k != &path && !k.starts_with(&prefix));
        self.dirs
            .borrow_mut()
            .retain(|k| k != &path && !k.starts_with(&prefix));
        existed
    }

    fn copy_tree(&self, src: &str, dest_dir: &str) -> bool {
        let src = norm(src);
        if !self.exists(&src) {
            return false;
        }
        let name = src.rsplit('/').next().unwrap_or_default().to_string();
        let target = format!("{}/{}", norm(dest_dir).trim_end_matches('/'), name);
        let prefix = format!("{}/", src);

        let copied: Vec<(String, Vec<u8>)> = self
            .files
            .borrow()
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (format!("{}/{}", target, &k[prefix.len()..]), v.clone()))
            .collect();
        self.dirs.borrow_mut().insert(target);
        self.files.borrow_mut().extend(copied);
        true
    }

    fn sed(&self, expr: &str, path: &str) -> i32 {
        let Some(mut lines) = self.lines_of(path) else {
            return 2;
        };
        // Like real sed, an empty file has no line to address and is left as is.
        if lines.is_empty() {
            return 0;
        }

        if let Some(text) = expr.strip_prefix("1i\\") {
            lines.insert(0, text.to_string());
        } else if let Some((pattern, replacement)) = sed_parts(expr) {
            let Some(anchor) = pattern
                .strip_prefix('^')
                .and_then(|p| p.strip_suffix(".*"))
            else {
                return 1;
            };
            for line in lines.iter_mut() {
                if line.starts_with(anchor) {
                    *line = replacement.clone();
                }
            }
        } else {
            return 1;
        }

        let mut content = lines.join("\n");
        content.push('\n');
        self.write(path, &content, false);
        0
    }

    fn grep(&self, args: &[&str]) -> CommandOutput {
        match args {
            ["-l", pattern, "/etc/settings.*"] => {
                let anchor = pattern.trim_start_matches('^');
                let found: Vec<String> = self
                    .files
                    .borrow()
                    .iter()
                    .filter(|(k, _)| k.starts_with("/etc/settings."))
                    .filter(|(_, v)| {
                        String::from_utf8_lossy(v)
                            .lines()
                            .any(|l| l.starts_with(anchor))
                    })
                    .map(|(k, _)| k.clone())
                    .collect();
                if found.is_empty() {
                    CommandOutput::failed(1)
                } else {
                    CommandOutput::ok(found)
                }
            }
            ["-q", pattern, path] => {
                let anchor = pattern.trim_start_matches('^');
                match self.lines_of(path) {
                    Some(lines) if lines.iter().any(|l| l.starts_with(anchor)) => {
                        CommandOutput::ok(Vec::<String>::new())
                    }
                    Some(_) => CommandOutput::failed(1),
                    None => CommandOutput::failed(2),
                }
            }
            ["-qxF", text, path] => match self.lines_of(path) {
                Some(lines) if lines.iter().any(|l| l == text) => {
                    CommandOutput::ok(Vec::<String>::new())
                }
                Some(_) => CommandOutput::failed(1),
                None => CommandOutput::failed(2),
            },
            ["-qF", text, path] => match self.file(path) {
                Some(content) if content.contains(text) => CommandOutput::ok(Vec::<String>::new()),
                Some(_) => CommandOutput::failed(1),
                None => CommandOutput::failed(2),
            },
            _ => CommandOutput::failed(2),
        }
    }

    fn tar(&self, args: &[&str]) -> CommandOutput {
        let module = self.module.borrow().clone();
        match (args, module) {
            (["-tzf", path], Some(name)) if self.exists(path) => CommandOutput::ok([
                format!("{}/", name),
                format!("{}/etc/", name),
                format!("{}/etc/defaults", name),
            ]),
            (["-xzf", path, "-C", dir], Some(name)) if self.exists(path) => {
                let root = format!("{}/{}", norm(dir), name);
                self.dirs.borrow_mut().insert(root.clone());
                self.write(&format!("{}/etc/defaults", root), "ENABLED=1\n", false);
                CommandOutput::ok(Vec::<String>::new())
            }
            _ => CommandOutput::failed(2),
        }
    }

    fn run_program(&self, program: &str, args: &[&str]) -> CommandOutput {
        let done = |ok: bool| {
            if ok {
                CommandOutput::ok(Vec::<String>::new())
            } else {
                CommandOutput::failed(1)
            }
        };

        match (program, args) {
            ("status", ["-v", "sys"]) => CommandOutput::ok([
                "Product Type   : SPECTRE-V3L-LTE".to_string(),
                format!("Serial Number  : {}", self.serial),
            ]),
            ("ifconfig", ["eth0"]) => CommandOutput::ok([format!(
                "eth0      Link encap:Ethernet  HWaddr {}",
                self.mac
            )]),
            ("openssl", ["dgst", "-sha256", "-r", path]) => {
                match self.files.borrow().get(&norm(path)) {
                    Some(bytes) => CommandOutput::ok([format!("{} *{}", hex(bytes), path)]),
                    None => CommandOutput::failed(1),
                }
            }
            ("mkdir", ["-p", path]) => {
                self.dirs.borrow_mut().insert(norm(path));
                done(true)
            }
            ("cat", [path]) => match self.lines_of(path) {
                Some(lines) => CommandOutput::ok(lines),
                None => CommandOutput::failed(1),
            },
            ("ls", [path]) => done(self.exists(path)),
            ("test", ["-s", path]) => done(self.file(path).is_some_and(|c| !c.is_empty())),
            ("rm", ["-f", path]) => {
                self.remove(path);
                done(true)
            }
            ("rm", ["-rf", path]) => {
                self.remove(path);
                done(true)
            }
            ("cp", ["-r", src, dest]) => done(self.copy_tree(src, dest)),
            ("cp", [src, dest]) => {
                let source = self.files.borrow().get(&norm(src)).cloned();
                match source {
                    Some(bytes) => {
                        self.files.borrow_mut().insert(norm(dest), bytes);
                        done(true)
                    }
                    None => done(false),
                }
            }
            ("sed", ["-i", expr, path]) => {
                let status = self.sed(expr, path);
                CommandOutput::new(status, Vec::new())
            }
            ("grep", rest) => self.grep(rest),
            ("tar", rest) => self.tar(rest),
            ("restore", [path]) => {
                let ok = self.exists(path);
                if ok {
                    self.restored.borrow_mut().push(path.to_string());
                }
                done(ok)
            }
            ("id", ["-u", name]) => done(self.has_user(name)),
            ("adduser", [.., name, "-G", "root"]) | ("adduser", ["-D", name, _]) => {
                let fresh = !self.has_user(name);
                self.users.borrow_mut().insert(name.to_string(), None);
                done(fresh)
            }
            ("deluser", [name]) => done(self.users.borrow_mut().remove(*name).is_some()),
            ("reboot", []) => {
                self.rebooted.set(true);
                done(true)
            }
            _ => CommandOutput::failed(127),
        }
    }

    fn run_pipeline(&self, command: &RemoteCommand) -> CommandOutput {
        let Some(program) = command.program() else {
            return CommandOutput::new(self.operator_status.get(), Vec::new());
        };
        let args = command.arguments();

        if let ("printf", [r"'%s\n'", rest @ ..]) = (program, args.as_slice()) {
            let text = rest.join(" ");
            if let Some(next) = command.piped() {
                if next.program() == Some("chpasswd") {
                    let Some((user, password)) = text.split_once(':') else {
                        return CommandOutput::failed(1);
                    };
                    let mut users = self.users.borrow_mut();
                    return match users.get_mut(user) {
                        Some(slot) => {
                            *slot = Some(password.to_string());
                            CommandOutput::ok(Vec::<String>::new())
                        }
                        None => CommandOutput::failed(1),
                    };
                }
            }
            if let Some((path, append)) = command.redirect() {
                let parent = norm(path).rsplit_once('/').map(|(p, _)| p.to_string());
                if let Some(parent) = parent {
                    if !parent.is_empty() && !self.exists(&parent) {
                        return CommandOutput::failed(1);
                    }
                }
                self.write(path, &format!("{}\n", text), append);
                return CommandOutput::ok(Vec::<String>::new());
            }
            return CommandOutput::ok([text]);
        }

        self.run_program(program, &args)
    }
}

impl RemoteExecutor for FakeRouter {
    fn execute(&self, command: &RemoteCommand) -> Result<CommandOutput> {
        let rendered = command.render();
        self.log.borrow_mut().push(rendered.clone());

        if self.unreachable.get() {
            return Err(RemoteError::ConnectionFailed {
                host: "fake-router".to_string(),
                reason: "Connection timed out".to_string(),
            }
            .into());
        }

        if self
            .failing
            .borrow()
            .iter()
            .any(|prefix| rendered.starts_with(prefix.as_str()))
        {
            return Ok(CommandOutput::failed(1));
        }

        Ok(self.run_pipeline(command))
    }
}

impl FileTransfer for FakeRouter {
    fn put(&self, local: &Path, remote: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("put {}", remote));

        if self.refuse_put.get() {
            return Err(TransferError::TransferFailed {
                path: local.to_path_buf(),
                reason: "connection refused".to_string(),
            }
            .into());
        }

        let mut bytes = fs::read(local).map_err(|e| TransferError::TransferFailed {
            path: local.to_path_buf(),
            reason: e.to_string(),
        })?;
        if self.corrupt.get() {
            bytes.push(b'!');
        }
        self.files.borrow_mut().insert(norm(remote), bytes);
        Ok(())
    }
}
