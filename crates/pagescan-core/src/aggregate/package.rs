//! Per-page export as a zip archive.

use std::io::{Cursor, Write};

use tracing::debug;

use crate::Result;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Default entry name prefix.
pub const DEFAULT_PREFIX: &str = "page";

/// Archive entry name for a 1-based page number, zero-padded to three digits.
pub fn entry_name(prefix: &str, page_number: usize) -> String {
    format!("{prefix}_{page_number:03}.txt")
}

/// Package page texts as `page_001.txt`, `page_002.txt`, ...
pub fn package(ordered_page_texts: &[String]) -> Result<Vec<u8>> {
    package_with_prefix(ordered_page_texts, DEFAULT_PREFIX)
}

/// Package page texts with a custom entry prefix.
pub fn package_with_prefix(
    ordered_page_texts: &[String],
    prefix: &str,
) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for (index, text) in ordered_page_texts.iter().enumerate() {
        writer.start_file(entry_name(prefix, index + 1), options)?;
        writer.write_all(text.as_bytes())?;
    }

    let bytes = writer.finish()?.into_inner();
    debug!(
        "Packaged {} pages into {} bytes",
        ordered_page_texts.len(),
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_entry_name_padding() {
        assert_eq!(entry_name("page", 1), "page_001.txt");
        assert_eq!(entry_name("page", 42), "page_042.txt");
        assert_eq!(entry_name("scan", 1234), "scan_1234.txt");
    }

    #[test]
    fn test_package_entries_in_page_order() {
        let texts = vec!["first".to_string(), String::new(), "third".to_string()];
        let bytes = package(&texts).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);

        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["page_001.txt", "page_002.txt", "page_003.txt"]);

        let mut content = String::new();
        archive
            .by_name("page_003.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "third");
    }

    #[test]
    fn test_package_is_deterministic() {
        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(package(&texts).unwrap(), package(&texts).unwrap());
    }

    #[test]
    fn test_package_empty() {
        let bytes = package(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
