//! `.unis` snapshot format
//!
//! Line oriented, space separated:
//!
//! ```text
//! <totalSize> <pageSize>
//! <startAddress> <size> <id> <content>
//! ...
//! ```
//!
//! One header line, then one line per resident block in address order.
//! Content bytes in `0x21..=0x7E` are written as-is except `\`; every other
//! byte becomes `\xHH`. Plain tokens therefore look exactly like the classic
//! format while spaces, newlines and binary data still round-trip.

use crate::block::Block;
use crate::error::{MemError, Result};
use crate::validation::{normalize_unis_path, BlockId};
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Decoded contents of a `.unis` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnisImage {
    pub total_size: u64,
    pub page_size: u64,
    /// Blocks in address order
    pub blocks: Vec<Block>,
}

impl UnisImage {
    /// Render the full document
    pub fn encode(&self) -> String {
        let mut out = format!("{} {}\n", self.total_size, self.page_size);
        for block in &self.blocks {
            let _ = writeln!(
                out,
                "{} {} {} {}",
                block.start_address,
                block.size,
                block.id,
                escape_content(&block.payload)
            );
        }
        out
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(self.encode().as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Write to `path`, appending `.unis` when missing
    ///
    /// Returns the path actually written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = normalize_unis_path(path.as_ref())?;
        let file = std::fs::File::create(&path)?;
        self.write_to(std::io::BufWriter::new(file))?;
        info!("Saved {} blocks to {:?}", self.blocks.len(), path);
        Ok(path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a document
    ///
    /// Checks syntax, ids and `payload <= size`; layout checks happen when
    /// the image is restored into a manager.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)));

        let (_, header) = lines.next().ok_or(MemError::Format {
            line: 1,
            reason: "missing header".to_string(),
        })?;

        let mut fields = header.split_whitespace();
        let total_size = parse_number(fields.next(), 1, "totalSize")?;
        let page_size = parse_number(fields.next(), 1, "pageSize")?;
        if fields.next().is_some() {
            return Err(format_error(1, "unexpected field after pageSize"));
        }

        let mut blocks = Vec::new();
        for (line_no, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            blocks.push(parse_block_line(line, line_no)?);
        }

        Ok(UnisImage {
            total_size,
            page_size,
            blocks,
        })
    }
}

fn parse_block_line(line: &str, line_no: usize) -> Result<Block> {
    let mut fields = line.splitn(4, ' ');
    let start_address = parse_number(fields.next(), line_no, "startAddress")?;
    let size = parse_number(fields.next(), line_no, "size")?;

    let id = fields
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format_error(line_no, "missing id"))?;
    let id = BlockId::new(id).map_err(|e| format_error(line_no, &e.to_string()))?;

    let payload = unescape_content(fields.next().unwrap_or(""))
        .map_err(|reason| format_error(line_no, &reason))?;

    if payload.len() as u64 > size {
        return Err(format_error(
            line_no,
            &format!("content of {} bytes exceeds size {}", payload.len(), size),
        ));
    }

    Ok(Block::new(id, start_address, size, payload))
}

fn parse_number(field: Option<&str>, line: usize, name: &str) -> Result<u64> {
    let field = field.ok_or_else(|| format_error(line, &format!("missing {}", name)))?;
    field
        .parse()
        .map_err(|_| format_error(line, &format!("invalid {} '{}'", name, field)))
}

fn format_error(line: usize, reason: &str) -> MemError {
    MemError::Format {
        line,
        reason: reason.to_string(),
    }
}

/// Escape payload bytes into a single whitespace-free token
pub fn escape_content(payload: &[u8]) -> String {
    let mut out = String::with_capacity(payload.len());
    for &byte in payload {
        if (0x21..=0x7E).contains(&byte) && byte != b'\\' {
            out.push(byte as char);
        } else {
            let _ = write!(out, "\\x{:02X}", byte);
        }
    }
    out
}

/// Reverse of [`escape_content`]
pub fn unescape_content(field: &str) -> std::result::Result<Vec<u8>, String> {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let escape = bytes
            .get(i + 1..i + 4)
            .filter(|e| e[0] == b'x')
            .ok_or_else(|| format!("truncated escape at byte {}", i))?;
        if !escape[1..].iter().all(u8::is_ascii_hexdigit) {
            return Err(format!("bad escape at byte {}", i));
        }
        let hex = std::str::from_utf8(&escape[1..]).map_err(|_| format!("bad escape at byte {}", i))?;
        let value = u8::from_str_radix(hex, 16).map_err(|_| format!("bad escape '\\x{}'", hex))?;
        out.push(value);
        i += 4;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn block(id: &str, start: u64, size: u64, payload: &[u8]) -> Block {
        Block::new(BlockId::new(id).unwrap(), start, size, payload.to_vec())
    }

    #[test]
    fn test_plain_content_is_verbatim() {
        let image = UnisImage {
            total_size: 1024,
            page_size: 64,
            blocks: vec![block("textFile.txt", 0, 64, b"Hola")],
        };

        assert_eq!(image.encode(), "1024 64\n0 64 textFile.txt Hola\n");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_content(b"a b\n\\"), "a\\x20b\\x0A\\x5C");
        assert_eq!(unescape_content("a\\x20b\\x0A\\x5C").unwrap(), b"a b\n\\");
        assert_eq!(escape_content(&[0x00, 0xFF]), "\\x00\\xFF");
    }

    #[test]
    fn test_bad_escapes() {
        assert!(unescape_content("\\").is_err());
        assert!(unescape_content("\\x4").is_err());
        assert!(unescape_content("\\y41").is_err());
        assert!(unescape_content("\\xZZ").is_err());
        // from_str_radix alone would take a sign
        assert!(unescape_content("\\x+F").is_err());
        assert!(unescape_content("\\x-1").is_err());
    }

    #[test]
    fn test_parse_document() {
        let text = "1024 64\r\n0 128 a.txt hello\n128 64 empty \n\n192 64 b.bin \\x00\\x01\n";
        let image = UnisImage::parse(text).unwrap();

        assert_eq!(image.total_size, 1024);
        assert_eq!(image.page_size, 64);
        assert_eq!(image.blocks.len(), 3);
        assert_eq!(image.blocks[0].payload, b"hello");
        assert!(image.blocks[1].payload.is_empty());
        assert_eq!(image.blocks[2].payload, vec![0, 1]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(UnisImage::parse(""), Err(MemError::Format { line: 1, .. })));
        assert!(matches!(UnisImage::parse("1024"), Err(MemError::Format { line: 1, .. })));
        assert!(matches!(
            UnisImage::parse("1024 64\nx 64 a b"),
            Err(MemError::Format { line: 2, .. })
        ));
        assert!(matches!(
            UnisImage::parse("1024 64\n0 64"),
            Err(MemError::Format { line: 2, .. })
        ));
        // Content longer than its block
        let long = format!("1024 64\n0 64 a {}", "x".repeat(65));
        assert!(matches!(UnisImage::parse(&long), Err(MemError::Format { line: 2, .. })));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = TempDir::new().unwrap();
        let image = UnisImage {
            total_size: 1024,
            page_size: 64,
            blocks: vec![
                block("a", 0, 128, b"first payload\twith tab"),
                block("b", 128, 64, &[0, 159, 146, 150]),
            ],
        };

        let written = image.save(dir.path().join("dump")).unwrap();
        assert_eq!(written, dir.path().join("dump.unis"));

        let loaded = UnisImage::load(&written).unwrap();
        assert_eq!(loaded, image);
    }
}
