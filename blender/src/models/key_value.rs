/*
    Deadline reads job and plugin info as plain `Key=Value` lines. The submission scripts
    write them as UTF-16 (little endian, with BOM), so we do the same and accept both that
    and UTF-8 when reading them back on the render node.
*/
use std::collections::HashMap;
use std::path::Path;
use std::{fs, io};

/// Render entries to `Key=Value` lines.
pub fn to_lines(entries: &[(&str, String)]) -> String {
    entries
        .iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect()
}

/// Parse `Key=Value` lines. Keys are case sensitive, blank lines and lines without `=` are skipped.
/// Later entries override earlier ones.
pub fn parse(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_owned(), value.trim_end_matches('\r').to_owned()))
        })
        .collect()
}

pub fn encode_utf16(content: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(content.encode_utf16().flat_map(|unit| unit.to_le_bytes()));
    bytes
}

pub fn decode(bytes: &[u8]) -> io::Result<String> {
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let units = rest
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>();
        return String::from_utf16(&units)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
    }

    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn write(path: impl AsRef<Path>, entries: &[(&str, String)]) -> io::Result<()> {
    fs::write(path, encode_utf16(&to_lines(entries)))
}

pub fn read(path: impl AsRef<Path>) -> io::Result<HashMap<String, String>> {
    let bytes = fs::read(path)?;
    Ok(parse(&decode(&bytes)?))
}
