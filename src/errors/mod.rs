use crate::span::Source;

use colored::*;
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::{fmt, num::ParseIntError};

pub type BindResult<T = ()> = Result<T, BindError>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BindErrorKind {
    Syntax,
    Resolve,
    Semantic,
    IO,
    Unknown,
}

impl fmt::Display for BindErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                BindErrorKind::Syntax => "syntax error",
                BindErrorKind::Resolve => "resolution error",
                BindErrorKind::Semantic => "semantic error",
                BindErrorKind::IO => "i/o error",
                BindErrorKind::Unknown => "unknown error",
            }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindError {
    pub msg: String,
    pub src: Vec<Source>,
    pub kind: BindErrorKind,
}

const ELLIPSIS: &'static str = "...";

impl BindError {
    pub fn new(msg: String, src: Source, kind: BindErrorKind) -> BindError {
        BindError {
            msg,
            src: vec![src],
            kind,
        }
    }

    pub fn emit(&self) {
        let kind = format!("{}:", self.kind);
        eprintln!("{} {}", kind.bold().red(), self.msg.bold());

        for src in self.src.iter() {
            let arrow = "-->".bold();
            if let Some(span) = src.span {
                let start_line = span.start.lineno;
                let line_count = span.lines();
                let mut buf = String::new();
                let readable = File::open(&src.filepath)
                    .and_then(|mut f| f.read_to_string(&mut buf))
                    .is_ok();
                if !readable {
                    eprintln!(" {} {}:{}", arrow, src.filepath.display(), span);
                    continue;
                }

                let max_num_width = if line_count == 1 {
                    (span.end.lineno + 1).to_string().len() + 1
                } else {
                    ELLIPSIS.len() + 1
                };
                let full_spacing = " ".repeat(max_num_width);
                let pipe = "|".bold();

                eprintln!(
                    "{}{} {}:{}",
                    " ".repeat(max_num_width - 1),
                    arrow,
                    src.filepath.display(),
                    span
                );
                eprintln!("{}{}", full_spacing, pipe);

                let mut lines = buf.lines().skip(start_line).take(line_count);
                let red_pipe = "|".bold().red();
                if line_count == 1 {
                    if let Some(line) = lines.next() {
                        let lineno_str = (start_line + 1).to_string();
                        let spacing = " ".repeat(max_num_width - lineno_str.len());
                        eprintln!("{}{}{} {}", lineno_str.bold(), spacing, pipe, line);
                        let indent = " ".repeat(span.start.col);
                        let indicator = "^".repeat(span.len().max(1)).bold().red();
                        eprintln!("{}{} {}{}", full_spacing, pipe, indent, indicator);
                    }
                } else {
                    for (i, line) in lines.enumerate() {
                        let lineno_str = (start_line + i + 1).to_string();
                        let spacing = " ".repeat(max_num_width - lineno_str.len());
                        eprintln!(
                            "{}{}{} {} {}",
                            lineno_str.bold(),
                            spacing,
                            pipe,
                            red_pipe,
                            line
                        );
                    }
                    let indent = "_".repeat(span.end.col + 1).bold().red();
                    let indicator = "^".bold().red();
                    eprintln!(
                        "{}{} {}{}{}",
                        full_spacing, pipe, red_pipe, indent, indicator
                    );
                }
            } else {
                eprintln!(" {} {}", arrow, src.filepath.display());
            }
        }
        eprintln!()
    }
}

impl From<BindError> for Vec<BindError> {
    fn from(err: BindError) -> Vec<BindError> {
        vec![err]
    }
}

impl From<io::Error> for BindError {
    fn from(err: io::Error) -> BindError {
        BindError {
            msg: err.to_string(),
            src: vec![],
            kind: BindErrorKind::IO,
        }
    }
}

impl From<quick_xml::Error> for BindError {
    fn from(err: quick_xml::Error) -> BindError {
        BindError {
            msg: err.to_string(),
            src: vec![],
            kind: BindErrorKind::Syntax,
        }
    }
}

impl From<ParseIntError> for BindError {
    fn from(err: ParseIntError) -> Self {
        BindError {
            msg: err.to_string(),
            src: vec![],
            kind: BindErrorKind::Syntax,
        }
    }
}

/// Accumulates every finding across one compiler invocation so a single run
/// reports all problems at once. The gate at the end of the pass is the only
/// place errors become fatal.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<BindError>,
    warnings: Vec<BindError>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics {
            errors: vec![],
            warnings: vec![],
        }
    }

    pub fn error(&mut self, err: BindError) {
        log::debug!("collected error: {}", err.msg);
        self.errors.push(err);
    }

    pub fn warn(&mut self, err: BindError) {
        log::debug!("collected warning: {}", err.msg);
        self.warnings.push(err);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[BindError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[BindError] {
        &self.warnings
    }

    /// Turns the accumulated findings into one batch failure. Warnings never
    /// block generation.
    pub fn assert_no_errors(self) -> Result<Vec<BindError>, Vec<BindError>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(self.errors)
        }
    }
}
