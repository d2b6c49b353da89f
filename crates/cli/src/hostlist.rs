//! Host-list file parsing: one `host[:port]` per line, line index
//! becomes that line's shard id, `N` is the number of lines.

use shardlog_core::{Error, Result};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub host: String,
    pub port: u16,
}

/// Parse a host-list file, skipping blank lines and `#`-prefixed
/// comments. The returned vector's index is each entry's shard id.
pub fn parse_host_list(path: impl AsRef<Path>) -> Result<Vec<HostEntry>> {
    let contents = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        entries.push(parse_entry(line)?);
    }
    if entries.is_empty() {
        return Err(Error::ArgumentError("host-list file has no entries".to_string()));
    }
    Ok(entries)
}

fn parse_entry(line: &str) -> Result<HostEntry> {
    match line.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| {
                Error::ArgumentError(format!("invalid port in host-list entry {line:?}"))
            })?;
            Ok(HostEntry {
                host: host.to_string(),
                port,
            })
        }
        None => Ok(HostEntry {
            host: line.to_string(),
            port: shardlog_core::limits::DEFAULT_PORT,
        }),
    }
}
