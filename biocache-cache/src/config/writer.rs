//! INI serialization: `ConfigFile` to the commented text written to config.ini.

use super::parser::path_to_display;
use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let qid = &config.qid;
    let tile = &config.tile;

    format!(
        r#"[qid]
; Directory holding stored query files (qid_<id>.json)
directory = {}
; Resident entry high/low water marks. The cleaner wakes when more than
; max_entries are resident and evicts least recently used entries down to
; min_entries. Evicted entries stay readable from the directory.
max_entries = {}
min_entries = {}
; Resident size high/low water marks (default: 100MB / 50MB)
; Supports: KB, MB, GB suffixes
max_size = {}
min_size = {}
; Largest single query accepted (default: 5MB)
largest_cacheable_size = {}
; Queries older than this are unreachable and deleted (default: 86400 = 24h)
max_file_age_secs = {}
; Over-limit insertions needed to wake the cleaner (default: 1)
cleaner_batch = {}
; How often expired queries are deleted when idle (default: 3600 = 1h)
reap_interval_secs = {}

[tile]
; Aggregate size high/low water marks (default: 100MB / 50MB)
; Set max_size = 0 to disable tile caching
max_size = {}
min_size = {}
; Largest single tile accepted (default: 50MB)
largest_cacheable_size = {}
; Tiles older than this are recomputed (default: 3600 = 1h)
max_age_secs = {}

[logging]
; Directory and file name for the log file
directory = {}
file = {}
"#,
        path_to_display(&qid.directory),
        qid.max_entries,
        qid.min_entries,
        format_size(qid.max_size),
        format_size(qid.min_size),
        format_size(qid.largest_cacheable_size),
        qid.max_file_age_secs,
        qid.cleaner_batch,
        qid.reap_interval_secs,
        format_size(tile.max_size),
        format_size(tile.min_size),
        format_size(tile.largest_cacheable_size),
        tile.max_age_secs,
        path_to_display(&config.logging.directory),
        config.logging.file,
    )
}
