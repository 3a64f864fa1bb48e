//! Typed remote commands.
//!
//! A [`RemoteCommand`] keeps the program name (always a static template) apart
//! from its arguments. Arguments are single-quoted for a POSIX shell when the
//! command is rendered, so values read from users or devices can never be
//! interpreted as shell syntax.

use std::borrow::Cow;
use std::fmt;

const PRINT_FORMAT: &str = "'%s\\n'";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    /// Quoted on render.
    Value(String),
    /// Static template text rendered verbatim (globs such as `/etc/settings.*`).
    Literal(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Redirect {
    Append(String),
    Overwrite(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Body {
    Program {
        program: &'static str,
        args: Vec<Arg>,
    },
    /// Shell text typed by the operator, run as-is.
    Operator(String),
}

/// A command to run on a remote device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    body: Body,
    pipe: Option<Box<RemoteCommand>>,
    redirect: Option<Redirect>,
}

impl RemoteCommand {
    /// Start a command for a fixed program.
    pub fn new(program: &'static str) -> Self {
        Self {
            body: Body::Program {
                program,
                args: Vec::new(),
            },
            pipe: None,
            redirect: None,
        }
    }

    /// Operator-supplied shell text, executed without quoting.
    ///
    /// Only for commands the administrator typed explicitly.
    pub fn operator(script: impl Into<String>) -> Self {
        Self {
            body: Body::Operator(script.into()),
            pipe: None,
            redirect: None,
        }
    }

    /// Print `text` followed by a newline.
    ///
    /// Uses `printf '%s\n'` so text starting with `-n` or `-e` is never
    /// read as an option.
    pub fn print(text: impl Into<String>) -> Self {
        Self::new("printf").literal(PRINT_FORMAT).arg(text)
    }

    /// Append a quoted argument.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        if let Body::Program { args, .. } = &mut self.body {
            args.push(Arg::Value(value.into()));
        }
        self
    }

    /// Append several quoted arguments.
    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for v in values {
            self = self.arg(v);
        }
        self
    }

    /// Append static template text without quoting.
    pub fn literal(mut self, text: &'static str) -> Self {
        if let Body::Program { args, .. } = &mut self.body {
            args.push(Arg::Literal(text));
        }
        self
    }

    /// Pipe stdout into another command.
    pub fn pipe(mut self, next: RemoteCommand) -> Self {
        match self.pipe {
            Some(ref mut tail) => {
                let tail = std::mem::replace(tail.as_mut(), RemoteCommand::new("true"));
                self.pipe = Some(Box::new(tail.pipe(next)));
            }
            None => self.pipe = Some(Box::new(next)),
        }
        self
    }

    /// Append stdout of the whole pipeline to a file.
    pub fn append_to(mut self, path: impl Into<String>) -> Self {
        self.redirect = Some(Redirect::Append(path.into()));
        self
    }

    /// Overwrite a file with stdout of the whole pipeline.
    pub fn write_to(mut self, path: impl Into<String>) -> Self {
        self.redirect = Some(Redirect::Overwrite(path.into()));
        self
    }

    /// Program name of the first command (`None` for operator text).
    pub fn program(&self) -> Option<&'static str> {
        match &self.body {
            Body::Program { program, .. } => Some(program),
            Body::Operator(_) => None,
        }
    }

    /// Unquoted arguments of the first command.
    pub fn arguments(&self) -> Vec<&str> {
        match &self.body {
            Body::Program { args, .. } => args
                .iter()
                .map(|a| match a {
                    Arg::Value(v) => v.as_str(),
                    Arg::Literal(l) => l,
                })
                .collect(),
            Body::Operator(_) => Vec::new(),
        }
    }

    /// Next command in the pipeline.
    pub fn piped(&self) -> Option<&RemoteCommand> {
        self.pipe.as_deref()
    }

    /// Redirect target, with `true` for append.
    pub fn redirect(&self) -> Option<(&str, bool)> {
        match &self.redirect {
            Some(Redirect::Append(p)) => Some((p, true)),
            Some(Redirect::Overwrite(p)) => Some((p, false)),
            None => None,
        }
    }

    /// Render as a single shell command line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match &self.body {
            Body::Program { program, args } => {
                out.push_str(program);
                for arg in args {
                    out.push(' ');
                    match arg {
                        Arg::Value(v) => out.push_str(&quote(v)),
                        Arg::Literal(l) => out.push_str(l),
                    }
                }
            }
            Body::Operator(script) => out.push_str(script),
        }

        if let Some(next) = &self.pipe {
            out.push_str(" | ");
            next.render_into(out);
        }

        match &self.redirect {
            Some(Redirect::Append(p)) => {
                out.push_str(" >> ");
                out.push_str(&quote(p));
            }
            Some(Redirect::Overwrite(p)) => {
                out.push_str(" > ");
                out.push_str(&quote(p));
            }
            None => {}
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-.,/:@%+=".contains(c)
}

/// Quote a value for a POSIX shell.
///
/// Plain words are returned unchanged; anything else is wrapped in single
/// quotes with embedded quotes written as `'\''`.
pub fn quote(value: &str) -> Cow<'_, str> {
    if !value.is_empty() && value.chars().all(is_safe) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(format!("'{}'", value.replace('\'', r"'\''")))
}
