//! Streaming FASTA reading that keeps the original line layout of each record.
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use bio::alphabets::dna;

use crate::utils::get_dynamic_reader;

///
/// One FASTA record as it appeared on disk: the header identifier (first
/// whitespace-delimited token after `>`) and the trimmed, non-empty
/// sequence lines.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub header: String,
    pub lines: Vec<String>,
}

impl FastaRecord {
    pub fn new(header: &str) -> Self {
        FastaRecord {
            header: header.to_string(),
            lines: Vec::new(),
        }
    }

    /// The full sequence, line breaks removed.
    pub fn sequence(&self) -> String {
        self.lines.concat()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    /// Write the record back out with its original line wrapping.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, ">{}", self.header)?;
        for line in &self.lines {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }

    /// Same record under a different header.
    pub fn write_renamed<W: Write + ?Sized>(&self, writer: &mut W, header: &str) -> io::Result<()> {
        writeln!(writer, ">{}", header)?;
        for line in &self.lines {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }
}

///
/// Extract the record identifier from a header line: everything after `>`
/// up to the first whitespace.
///
pub fn parse_header_id(line: &str) -> &str {
    let line = line.strip_prefix('>').unwrap_or(line);
    line.split_whitespace().next().unwrap_or("")
}

///
/// Iterator over the records of a FASTA stream.
///
/// Records are accumulated line by line; a header line closes the record in
/// progress and the end of the stream flushes the last one. Sequence lines
/// found before the first header have nowhere to go and are discarded.
///
pub struct FastaRecordReader<R: BufRead> {
    reader: R,
    buf: String,
    current: Option<FastaRecord>,
    orphan_lines: usize,
    done: bool,
}

impl FastaRecordReader<io::BufReader<Box<dyn io::Read>>> {
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(FastaRecordReader::new(get_dynamic_reader(path)?))
    }
}

impl<R: BufRead> FastaRecordReader<R> {
    pub fn new(reader: R) -> Self {
        FastaRecordReader {
            reader,
            buf: String::new(),
            current: None,
            orphan_lines: 0,
            done: false,
        }
    }

    /// Number of sequence lines dropped because they preceded any header.
    pub fn orphan_lines(&self) -> usize {
        self.orphan_lines
    }

    fn flush(&mut self) -> Option<FastaRecord> {
        if self.orphan_lines > 0 {
            log::warn!(
                "Discarded {} sequence line(s) found before the first header",
                self.orphan_lines
            );
        }
        self.current.take()
    }
}

impl<R: BufRead> Iterator for FastaRecordReader<R> {
    type Item = io::Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return self.flush().map(Ok);
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }

            let line = self.buf.trim();
            if line.starts_with('>') {
                let next = FastaRecord::new(parse_header_id(line));
                if let Some(finished) = self.current.replace(next) {
                    return Some(Ok(finished));
                }
            } else if !line.is_empty() {
                match self.current.as_mut() {
                    Some(record) => record.lines.push(line.to_string()),
                    None => self.orphan_lines += 1,
                }
            }
        }
    }
}

///
/// Read every record of a (optionally gzipped) FASTA file into memory.
///
pub fn read_fasta(path: &Path) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    for record in FastaRecordReader::from_path(path)? {
        records.push(record?);
    }
    Ok(records)
}

///
/// Write a sequence under `header`, wrapping lines at `width` characters.
///
pub fn write_wrapped<W: Write + ?Sized>(
    writer: &mut W,
    header: &str,
    sequence: &str,
    width: usize,
) -> io::Result<()> {
    writeln!(writer, ">{}", header)?;
    let bytes = sequence.as_bytes();
    for chunk in bytes.chunks(width.max(1)) {
        writer.write_all(chunk)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

///
/// Reverse complement of a nucleotide sequence. IUPAC ambiguity codes are
/// complemented and case is preserved; anything else is only reversed.
///
pub fn reverse_complement(sequence: &str) -> String {
    String::from_utf8_lossy(&dna::revcomp(sequence.as_bytes())).into_owned()
}
