//! List command implementation.

use super::{CliResult, SourceArgs};
use crate::utils::format_size;
use arcstream_core::{Reader, Result};
use serde::{Deserialize, Serialize};

/// JSON serializable entry data for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryJson {
    /// Entry name.
    pub name: String,
    /// Size in bytes, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Modification time (Unix seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<u64>,
    /// Permission bits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    /// MIME type.
    pub mime: String,
}

/// JSON output for a listing.
#[derive(Debug, Serialize, Deserialize)]
struct ListJson {
    url: String,
    entries: Vec<EntryJson>,
}

/// Describe every remaining entry of `reader`, then close it.
pub fn collect_entries(reader: &mut dyn Reader) -> Result<Vec<EntryJson>> {
    let mut entries = Vec::new();
    while reader.next()? {
        let stat = reader.stat();
        entries.push(EntryJson {
            name: reader.filename(),
            size: stat.size,
            mtime: stat.mtime,
            mode: stat.mode,
            mime: reader.mime(),
        });
    }
    reader.close()?;
    Ok(entries)
}

pub fn cmd_list(source: &SourceArgs, json: bool, long: bool) -> CliResult<()> {
    let mut reader = source.open()?;
    let entries = collect_entries(reader.as_mut())?;

    if json {
        let listing = ListJson {
            url: source.url.clone(),
            entries,
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if !long {
        for entry in &entries {
            println!("{}", entry.name);
        }
        return Ok(());
    }

    println!("{:>10} {:>12} {:>6}  {:<24}  Name", "Size", "Modified", "Mode", "Type");
    println!("{}", "-".repeat(72));
    let mut total = 0u64;
    for entry in &entries {
        total += entry.size.unwrap_or(0);
        println!(
            "{:>10} {:>12} {:>6}  {:<24}  {}",
            format_size(entry.size),
            entry.mtime.map_or_else(|| "-".to_string(), |t| t.to_string()),
            entry.mode.map_or_else(|| "-".to_string(), |m| format!("{:o}", m & 0o7777)),
            entry.mime,
            entry.name
        );
    }
    println!("{}", "-".repeat(72));
    println!("{:>10} {} files", total, entries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcstream_archive::source::{read_memory, read_multi};
    use arcstream_core::Stat;

    #[test]
    fn test_collect_entries() {
        let mut reader = read_multi([
            Box::new(read_memory("abc", "a.txt").with_stat(Stat::new().with_mtime(5)))
                as Box<dyn Reader>,
            Box::new(read_memory("<p/>", "b.html")),
        ]);
        let entries = collect_entries(&mut reader).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].size, Some(3));
        assert_eq!(entries[0].mtime, Some(5));
        assert_eq!(entries[1].mime, "text/html");
    }

    #[test]
    fn test_json_skips_unknown_fields() {
        let entry = EntryJson {
            name: "x".to_string(),
            size: Some(1),
            mtime: None,
            mode: None,
            mime: "application/octet-stream".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["size"], 1);
        assert!(json.get("mtime").is_none());
    }
}
