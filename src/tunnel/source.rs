//! Profile file loading.
//!
//! Every top-level table of the profile file is one profile, keyed by its
//! name. Tables are enumerated in file order.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::tunnel::error::TunnelError;
use crate::tunnel::profile::{ConnectionProfile, RawProfile};

/// A profile that could not be coerced.
#[derive(Debug)]
pub struct RejectedProfile {
    pub name: String,
    pub error: TunnelError,
}

/// One table of the profile file.
#[derive(Debug)]
pub enum ProfileEntry {
    /// Enabled or disabled profile with valid values
    Valid(ConnectionProfile),
    /// Invalid values on a profile that was not explicitly disabled
    Rejected(RejectedProfile),
}

impl ProfileEntry {
    pub fn name(&self) -> &str {
        match self {
            ProfileEntry::Valid(profile) => &profile.name,
            ProfileEntry::Rejected(rejected) => &rejected.name,
        }
    }
}

/// Result of reading the profile file, in file order.
#[derive(Debug, Default)]
pub struct ProfileSet {
    pub entries: Vec<ProfileEntry>,
}

impl ProfileSet {
    pub fn profiles(&self) -> Vec<&ConnectionProfile> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                ProfileEntry::Valid(profile) => Some(profile),
                ProfileEntry::Rejected(_) => None,
            })
            .collect()
    }

    pub fn rejected(&self) -> Vec<&RejectedProfile> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                ProfileEntry::Rejected(rejected) => Some(rejected),
                ProfileEntry::Valid(_) => None,
            })
            .collect()
    }
}

/// Directory holding the running executable.
///
/// Relative key file paths are resolved against it.
pub fn app_dir() -> Result<PathBuf, TunnelError> {
    let exe = std::env::current_exe()
        .map_err(|e| TunnelError::Source(format!("cannot locate executable: {}", e)))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| TunnelError::Source(format!("{} has no parent directory", exe.display())))
}

/// Read and parse the profile file at `path`.
pub fn load_profiles(path: &Path) -> Result<ProfileSet, TunnelError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| TunnelError::Source(format!("cannot read {}: {}", path.display(), e)))?;
    parse_profiles(&contents)
        .map_err(|e| TunnelError::Source(format!("{}: {}", path.display(), e)))
}

/// Parse profile file contents.
///
/// A profile whose values cannot be coerced is rejected, unless it is
/// explicitly disabled, in which case it is skipped without a report.
pub fn parse_profiles(contents: &str) -> Result<ProfileSet, TunnelError> {
    let table: toml::Table = toml::from_str(contents).map_err(|e| {
        TunnelError::Source(format!("invalid profile file: {}", e.message()))
    })?;

    let mut set = ProfileSet::default();
    for (name, value) in table {
        if !value.is_table() {
            return Err(TunnelError::Source(format!(
                "`{}` is not a profile table",
                name
            )));
        }

        let raw: RawProfile = match value.try_into() {
            Ok(raw) => raw,
            Err(e) => {
                set.entries.push(ProfileEntry::Rejected(RejectedProfile {
                    error: TunnelError::profile("table", e.message().to_string()),
                    name,
                }));
                continue;
            }
        };

        let enabled = raw.enabled_flag();
        match ConnectionProfile::from_raw(&name, raw) {
            Ok(profile) => set.entries.push(ProfileEntry::Valid(profile)),
            Err(e) if matches!(enabled, Ok(false)) => {
                debug!("Skipping disabled profile {} with invalid values: {}", name, e);
            }
            Err(error) => {
                set.entries
                    .push(ProfileEntry::Rejected(RejectedProfile { name, error }))
            }
        }
    }

    Ok(set)
}
