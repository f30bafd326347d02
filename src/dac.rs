//! Rewrites a DAC configuration file so that exactly one of DAC1..DAC7 sits at
//! the active level and the rest at the inactive level.
//!
//! Each relevant line carries a literal `DAC{i} 5 {value}`. Lines naming no DAC
//! are copied through untouched, terminators included.

use std::borrow::Cow;
use std::fs;
use std::io::{self, Write as _};
use std::path::Path;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, FromRepr};

use crate::error::DacError;

pub const DAC_CONFIG_FILE: &str = "DACCONFIG.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, EnumIter, Display, FromRepr)]
#[repr(u8)]
pub enum Dac {
    #[strum(to_string = "DAC1")]
    Dac1 = 1,
    #[strum(to_string = "DAC2")]
    Dac2 = 2,
    #[strum(to_string = "DAC3")]
    Dac3 = 3,
    #[strum(to_string = "DAC4")]
    Dac4 = 4,
    #[strum(to_string = "DAC5")]
    Dac5 = 5,
    #[strum(to_string = "DAC6")]
    Dac6 = 6,
    #[strum(to_string = "DAC7")]
    Dac7 = 7,
}

impl Dac {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Result<Self, DacError> {
        Self::from_repr(index).ok_or(DacError::InvalidIndex(index))
    }

    /// Text that marks a line as belonging to this DAC.
    pub fn prefix(self) -> String {
        format!("{self} 5 ")
    }

    fn field(self, value: &str) -> String {
        format!("{}{value}", self.prefix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Level {
    #[strum(to_string = "active")]
    Active,
    #[strum(to_string = "inactive")]
    Inactive,
}

/// The two literal values a DAC line can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DacLevels {
    pub active: String,
    pub inactive: String,
}

impl Default for DacLevels {
    fn default() -> Self {
        Self {
            active: "-4.5".to_string(),
            inactive: "-2.5".to_string(),
        }
    }
}

impl DacLevels {
    pub fn literal(&self, level: Level) -> &str {
        match level {
            Level::Active => &self.active,
            Level::Inactive => &self.inactive,
        }
    }
}

/// A line that was actually rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DacChange {
    pub dac: Dac,
    pub level: Level,
    /// Zero-based line number.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToggleReport {
    pub changes: Vec<DacChange>,
}

impl ToggleReport {
    pub fn modified(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// First DAC, in ascending order, whose prefix occurs in `line`.
pub fn classify(line: &str) -> Option<Dac> {
    Dac::iter().find(|dac| line.contains(&dac.prefix()))
}

/// Bring one line belonging to `dac` to the level it should have when `target` is active.
///
/// A line already at that level is returned as is. Otherwise the other level's
/// literal is swapped for the wanted one.
pub fn toggle_line<'a>(line: &'a str, dac: Dac, target: Dac, levels: &DacLevels) -> Cow<'a, str> {
    let (want, other) = match dac == target {
        true => (Level::Active, Level::Inactive),
        false => (Level::Inactive, Level::Active),
    };
    let wanted = dac.field(levels.literal(want));
    if line.contains(&wanted) {
        return Cow::Borrowed(line);
    }
    let current = dac.field(levels.literal(other));
    if line.contains(&current) {
        Cow::Owned(line.replace(&current, &wanted))
    } else {
        Cow::Borrowed(line)
    }
}

/// Apply a toggle to a whole document. Returns the new text and what changed.
pub fn toggle_text(text: &str, target: Dac, levels: &DacLevels) -> (String, ToggleReport) {
    let mut output = String::with_capacity(text.len());
    let mut report = ToggleReport::default();

    for (line_no, line) in text.split_inclusive('\n').enumerate() {
        let Some(dac) = classify(line) else {
            output.push_str(line);
            continue;
        };
        let new_line = toggle_line(line, dac, target, levels);
        if let Cow::Owned(_) = new_line {
            let level = if dac == target {
                Level::Active
            } else {
                Level::Inactive
            };
            report.changes.push(DacChange {
                dac,
                level,
                line: line_no,
            });
        }
        output.push_str(&new_line);
    }
    (output, report)
}

/// Toggle the file at `path` so that `target` is the one active DAC.
///
/// The new content is written to a temporary file next to `path` and renamed
/// over it, so the file is either fully old or fully new. Nothing is written if
/// no line changes.
pub fn toggle_file(path: &Path, target: Dac, levels: &DacLevels) -> Result<ToggleReport, DacError> {
    let io_err = |source: io::Error| DacError::Io {
        path: path.to_path_buf(),
        source,
    };
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => DacError::NotFound(path.to_path_buf()),
        _ => io_err(source),
    })?;

    let (new_text, report) = toggle_text(&text, target, levels);
    for change in &report.changes {
        log::info!(
            "set {} to {} V ({})",
            change.dac,
            levels.literal(change.level),
            change.level
        );
    }
    if !report.modified() {
        log::info!("{} already selects {target}, nothing to change", path.display());
        return Ok(report);
    }

    let permissions = fs::metadata(path).map_err(io_err)?.permissions();
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    staged.write_all(new_text.as_bytes()).map_err(io_err)?;
    staged.as_file().sync_all().map_err(io_err)?;
    fs::set_permissions(staged.path(), permissions).map_err(io_err)?;
    staged.persist(path).map_err(|e| io_err(e.error))?;
    Ok(report)
}
