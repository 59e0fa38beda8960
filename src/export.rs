use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::record::{BasicInfo, ExperienceEntry, ProfileRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Json,
    Csv,
    Tsv,
}

impl Format {
    fn separator(self) -> Option<char> {
        match self {
            Format::Json => None,
            Format::Csv => Some(','),
            Format::Tsv => Some('\t'),
        }
    }
}

#[derive(Serialize)]
struct ExportedProfile<'a> {
    profile_url: &'a str,
    #[serde(flatten)]
    record: &'a ProfileRecord,
}

pub fn headers() -> Vec<String> {
    let basic = BasicInfo::default();
    let entry = ExperienceEntry::default();
    std::iter::once("profile_url")
        .chain(basic.fields().iter().map(|(k, _)| *k))
        .chain(entry.fields().iter().map(|(k, _)| *k))
        .map(String::from)
        .collect()
}

/// One row per experience entry, with the profile columns repeated. A profile
/// without experience still gets one row.
pub fn to_rows(people: &[(String, ProfileRecord)]) -> Vec<Vec<String>> {
    let blank = ExperienceEntry::default();
    let mut rows = Vec::new();
    for (url, record) in people {
        let entries: Vec<&ExperienceEntry> = if record.experience.is_empty() {
            vec![&blank]
        } else {
            record.experience.iter().collect()
        };
        for entry in entries {
            let row = std::iter::once(url.as_str())
                .chain(record.basic_info.fields().iter().map(|(_, v)| *v))
                .chain(entry.fields().iter().map(|(_, v)| *v))
                .map(String::from)
                .collect();
            rows.push(row);
        }
    }
    rows
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV/TSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", sep)?;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

pub fn to_export_string(format: Format, people: &[(String, ProfileRecord)]) -> Result<String> {
    let Some(sep) = format.separator() else {
        let exported: Vec<_> = people
            .iter()
            .map(|(url, record)| ExportedProfile { profile_url: url, record })
            .collect();
        return Ok(serde_json::to_string_pretty(&exported)?);
    };

    let mut buf: Vec<u8> = Vec::new();
    write_row(&mut buf, &headers(), sep)?;
    for row in to_rows(people) {
        write_row(&mut buf, &row, sep)?;
    }
    Ok(String::from_utf8(buf)?)
}

pub fn write_export(path: &Path, format: Format, people: &[(String, ProfileRecord)]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let contents = to_export_string(format, people)?;
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
