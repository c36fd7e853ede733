//! Econet path specifiers.
//!
//! ```text
//! <directory base>      ::= :[<disc name>] | $[<disc name>] | & | @ | ^
//! <directory specifier> ::= [<directory base>.] {<name>.} <name>
//! ```
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{EconetError, EconetResult};

lazy_static! {
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9!_-]{1,10}$").unwrap();
    static ref VALID_WILDCARD_NAME: Regex = Regex::new(r"^[a-zA-Z0-9!_*#-]{1,10}$").unwrap();
}

pub fn is_valid_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

pub fn is_valid_wildcard_name(name: &str) -> bool {
    VALID_WILDCARD_NAME.is_match(name)
}

pub fn is_wildcard_name(name: &str) -> bool {
    name.contains(['*', '#'])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirBase {
    /// `:` or `$`, optionally followed by a disc name.
    Disc { anchor: char, disc_name: Option<String> },
    /// `@`
    Current,
    /// `&`
    UserRoot,
    /// `^`
    Parent,
}

impl DirBase {
    pub fn disc_name(&self) -> Option<&str> {
        match self {
            DirBase::Disc { disc_name, .. } => disc_name.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for DirBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirBase::Disc { anchor, disc_name } => write!(f, "{anchor}{}", disc_name.as_deref().unwrap_or_default()),
            DirBase::Current => write!(f, "@"),
            DirBase::UserRoot => write!(f, "&"),
            DirBase::Parent => write!(f, "^"),
        }
    }
}

/// Parses the first segment of a path. `Ok(None)` means the segment is an
/// ordinary name rather than a directory base.
pub fn parse_dir_base(path_part: &str) -> EconetResult<Option<DirBase>> {
    let mut chars = path_part.chars();
    let Some(first) = chars.next() else {
        return Ok(None);
    };
    let rest = chars.as_str();
    match first {
        ':' | '$' => {
            if rest.is_empty() {
                return Ok(Some(DirBase::Disc { anchor: first, disc_name: None }));
            }
            if !is_valid_name(rest) {
                return Err(EconetError::validation(format!("Invalid disc name '{rest}'")));
            }
            Ok(Some(DirBase::Disc {
                anchor: first,
                disc_name: Some(rest.to_string()),
            }))
        }
        '@' | '&' | '^' if !rest.is_empty() => Ok(None),
        '@' => Ok(Some(DirBase::Current)),
        '&' => Ok(Some(DirBase::UserRoot)),
        '^' => Ok(Some(DirBase::Parent)),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileSpecifier {
    pub dir_base: Option<DirBase>,
    pub path_parts: Vec<String>,
    pub dirname: Option<String>,
    pub basename: Option<String>,
}

impl FileSpecifier {
    pub fn disc_name(&self) -> Option<&str> {
        self.dir_base.as_ref().and_then(DirBase::disc_name)
    }

    /// True when the basename is a pattern (`*` included) rather than a single object.
    pub fn has_wildcard_basename(&self) -> bool {
        self.basename.as_deref().map_or(false, is_wildcard_name)
    }
}

fn validate_path_parts(parts: &[&str]) -> EconetResult<Vec<String>> {
    parts
        .iter()
        .map(|part| {
            if is_valid_wildcard_name(part) {
                Ok(part.to_string())
            } else {
                Err(EconetError::validation(format!("Invalid path part '{part}'")))
            }
        })
        .collect()
}

fn validate_basename(basename: &str) -> EconetResult<()> {
    if basename.is_empty() {
        return Ok(());
    }
    let valid = if is_wildcard_name(basename) {
        is_valid_wildcard_name(basename)
    } else {
        is_valid_name(basename)
    };
    if valid {
        Ok(())
    } else {
        Err(EconetError::validation(format!("Invalid file name '{basename}'")))
    }
}

pub fn parse_file_specifier(path: &str) -> EconetResult<FileSpecifier> {
    let parts: Vec<&str> = path.split('.').collect();
    let dir_base = parse_dir_base(parts[0])?;

    let spec = match (parts.len(), dir_base) {
        (1, Some(dir_base)) => FileSpecifier {
            dir_base: Some(dir_base),
            path_parts: Vec::new(),
            dirname: Some(parts[0].to_string()),
            basename: None,
        },
        (1, None) => FileSpecifier {
            basename: Some(parts[0].to_string()),
            ..Default::default()
        },
        (len, dir_base) => {
            let dir_parts = &parts[..len - 1];
            let path_parts = if dir_base.is_some() {
                validate_path_parts(&dir_parts[1..])?
            } else {
                validate_path_parts(dir_parts)?
            };
            FileSpecifier {
                dir_base,
                path_parts,
                dirname: Some(dir_parts.join(".")),
                basename: Some(parts[len - 1].to_string()),
            }
        }
    };

    if let Some(basename) = &spec.basename {
        validate_basename(basename)?;
    }
    Ok(spec)
}

/// Anchored, case-sensitive match: `*` is any run of characters, `#` exactly one.
pub fn is_wildcard_match(wildcard: &str, filename: &str) -> EconetResult<bool> {
    if !is_valid_wildcard_name(wildcard) {
        return Err(EconetError::validation(format!("Invalid wildcard '{wildcard}'")));
    }
    if !is_valid_name(filename) {
        return Err(EconetError::validation(format!("Invalid filename '{filename}'")));
    }
    let mut pattern = String::with_capacity(wildcard.len() * 2 + 2);
    pattern.push('^');
    for ch in wildcard.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '#' => pattern.push('.'),
            // '!', '_' and '-' are not regex metacharacters outside a class
            _ => pattern.push(ch),
        }
    }
    pattern.push('$');
    let re = Regex::new(&pattern).map_err(|err| EconetError::validation(format!("Invalid wildcard '{wildcard}': {err}")))?;
    Ok(re.is_match(filename))
}
