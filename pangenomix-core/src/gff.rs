use std::io::BufRead;
use std::path::Path;

use anyhow::Result;

use crate::errors::PangenomeError;
use crate::models::Strand;
use crate::utils::get_dynamic_reader;

///
/// A single GFF feature in 0-based, half-open coordinates.
///
/// The contig name has any `accn|`-style prefix (everything up to the last
/// `|`) removed so it matches the identifiers in the genome's contig file.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GffRecord {
    pub contig: String,
    pub feature_type: String,
    pub start: usize,
    pub stop: usize,
    pub strand: Strand,
    pub attributes: Vec<(String, String)>,
}

impl GffRecord {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("ID")
    }

    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }
}

///
/// Strip a database prefix such as `accn|` from a contig identifier.
///
pub fn strip_contig_prefix(contig: &str) -> &str {
    contig.rsplit('|').next().unwrap_or(contig)
}

///
/// Decode GFF3 `%XX` escapes in an attribute value, e.g. `%3B` back to `;`.
/// Malformed escapes are kept verbatim.
///
pub fn unescape_attribute(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = byte {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

///
/// Parse one line of a GFF file. Comment and blank lines yield `Ok(None)`.
///
pub fn parse_gff_line(
    line: &str,
    path: &str,
    line_number: usize,
) -> std::result::Result<Option<GffRecord>, PangenomeError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let malformed = |reason: String| PangenomeError::GffParseError {
        path: path.to_string(),
        line: line_number,
        reason,
    };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 9 {
        return Err(malformed(format!(
            "expected 9 tab-separated columns, found {}",
            fields.len()
        )));
    }

    let start: usize = fields[3]
        .parse()
        .map_err(|_| malformed(format!("invalid start coordinate '{}'", fields[3])))?;
    let stop: usize = fields[4]
        .parse()
        .map_err(|_| malformed(format!("invalid stop coordinate '{}'", fields[4])))?;
    if start == 0 || stop < start {
        return Err(malformed(format!("invalid interval {}..{}", start, stop)));
    }

    let strand: Strand = fields[6]
        .parse()
        .map_err(|_| malformed(format!("invalid strand '{}'", fields[6])))?;

    let mut attributes = Vec::new();
    for entry in fields[8].split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| malformed(format!("attribute '{}' is not key=value", entry)))?;
        attributes.push((key.to_string(), value.to_string()));
    }

    Ok(Some(GffRecord {
        contig: strip_contig_prefix(fields[0]).to_string(),
        feature_type: fields[2].to_string(),
        // 1-based inclusive -> 0-based half-open
        start: start - 1,
        stop,
        strand,
        attributes,
    }))
}

///
/// Read every feature of a (optionally gzipped) GFF file, in file order.
/// Parsing stops at an embedded `##FASTA` section.
///
pub fn read_gff(path: &Path) -> Result<Vec<GffRecord>> {
    let reader = get_dynamic_reader(path)?;
    let path_str = path.display().to_string();

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with("##FASTA") {
            break;
        }
        if let Some(record) = parse_gff_line(&line, &path_str, i + 1)? {
            records.push(record);
        }
    }

    Ok(records)
}
