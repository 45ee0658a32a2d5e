//! INI parsing: `Ini` to `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

const SIZE_REASON: &str = "expected format like '100MB', '5MB', or '512KB'";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [qid] section
    if let Some(section) = ini.section(Some("qid")) {
        let qid = &mut config.qid;
        if let Some(v) = non_empty(section, "directory") {
            qid.directory = expand_tilde(v);
        }
        read_number(section, "qid", "max_entries", &mut qid.max_entries)?;
        read_number(section, "qid", "min_entries", &mut qid.min_entries)?;
        read_size(section, "qid", "max_size", &mut qid.max_size)?;
        read_size(section, "qid", "min_size", &mut qid.min_size)?;
        read_size(
            section,
            "qid",
            "largest_cacheable_size",
            &mut qid.largest_cacheable_size,
        )?;
        read_number(section, "qid", "max_file_age_secs", &mut qid.max_file_age_secs)?;
        read_number(section, "qid", "cleaner_batch", &mut qid.cleaner_batch)?;
        read_number(section, "qid", "reap_interval_secs", &mut qid.reap_interval_secs)?;

        if qid.min_entries > qid.max_entries {
            return Err(invalid(
                "qid",
                "min_entries",
                qid.min_entries,
                "must not exceed max_entries",
            ));
        }
        if qid.min_size > qid.max_size {
            return Err(invalid("qid", "min_size", qid.min_size, "must not exceed max_size"));
        }
    }

    // [tile] section
    if let Some(section) = ini.section(Some("tile")) {
        let tile = &mut config.tile;
        read_size(section, "tile", "max_size", &mut tile.max_size)?;
        read_size(section, "tile", "min_size", &mut tile.min_size)?;
        read_size(
            section,
            "tile",
            "largest_cacheable_size",
            &mut tile.largest_cacheable_size,
        )?;
        read_number(section, "tile", "max_age_secs", &mut tile.max_age_secs)?;

        if tile.min_size > tile.max_size {
            return Err(invalid("tile", "min_size", tile.min_size, "must not exceed max_size"));
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn read_size(
    section: &Properties,
    section_name: &str,
    key: &str,
    target: &mut u64,
) -> Result<(), ConfigFileError> {
    if let Some(v) = section.get(key) {
        *target = parse_size(v).map_err(|_| invalid(section_name, key, v, SIZE_REASON))?;
    }
    Ok(())
}

fn read_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigFileError> {
    if let Some(v) = section.get(key) {
        *target = v
            .trim()
            .parse()
            .map_err(|_| invalid(section_name, key, v, "must be a non-negative integer"))?;
    }
    Ok(())
}

fn invalid(
    section: &str,
    key: &str,
    value: impl ToString,
    reason: &str,
) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Display a path, collapsing the home directory to `~`.
pub(super) fn path_to_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
