//! Byte-level I/O: input reading, encoding resolution and strict decoding.
//!
//! Census extracts arrive in whatever encoding the publishing office used, so
//! decoding walks an ordered list of candidates and keeps the first one that
//! decodes without replacement characters. The `-` path convention routes
//! through standard streams.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::debug;

use crate::error::{CensusError, Result};

pub const DEFAULT_DELIMITER: u8 = b';';

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

/// Maps an encoding label to an encoding.
///
/// WHATWG labels (`latin1`, `utf-8`, `windows-1252`, ...) are accepted as is;
/// `latin-1` and `latin_1` are common spellings WHATWG lacks and resolve to
/// windows-1252 like `latin1`.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    let trimmed = label.trim();
    if trimmed.eq_ignore_ascii_case("latin-1") || trimmed.eq_ignore_ascii_case("latin_1") {
        return Ok(WINDOWS_1252);
    }
    Encoding::for_label(trimmed.as_bytes())
        .ok_or_else(|| CensusError::UnknownEncoding(label.to_string()))
}

pub fn parse_delimiter(value: &str) -> std::result::Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn resolve_encodings<S: AsRef<str>>(labels: &[S]) -> Result<Vec<&'static Encoding>> {
    labels.iter().map(|l| resolve_encoding(l.as_ref())).collect()
}

/// Latin-1 first, then UTF-8: the order the census extracts are published in.
pub fn default_encodings() -> Vec<&'static Encoding> {
    vec![WINDOWS_1252, UTF_8]
}

pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let outcome = if is_dash(path) {
        io::stdin().lock().read_to_end(&mut buffer)
    } else {
        File::open(path).and_then(|mut file| file.read_to_end(&mut buffer))
    };
    outcome.map_err(|source| CensusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(buffer)
}

/// Decodes `bytes` without replacement; `None` when any sequence is invalid.
pub fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let body = if encoding == UTF_8 {
        bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
}

/// Tries each candidate in order and returns the text with the encoding used.
pub fn decode_with_fallback(
    bytes: &[u8],
    candidates: &[&'static Encoding],
) -> Result<(String, &'static Encoding)> {
    if candidates.is_empty() {
        return Err(CensusError::InvalidArgument(
            "At least one encoding candidate is required".to_string(),
        ));
    }
    for &encoding in candidates {
        match decode_strict(bytes, encoding) {
            Some(text) => {
                debug!("Decoded {} byte(s) as {}", bytes.len(), encoding.name());
                return Ok((text, encoding));
            }
            None => debug!("Input is not valid {}, trying next candidate", encoding.name()),
        }
    }
    Err(CensusError::Decode {
        tried: candidates.iter().map(|e| e.name().to_string()).collect(),
    })
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(File::create(p).map_err(
            |source| CensusError::Io {
                path: p.to_path_buf(),
                source,
            },
        )?)),
        _ => Box::new(io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_labels_resolve_to_windows_1252() {
        assert_eq!(resolve_encoding("latin-1").unwrap(), WINDOWS_1252);
        assert_eq!(resolve_encoding(" latin1 ").unwrap(), WINDOWS_1252);
        assert_eq!(resolve_encoding("LATIN_1").unwrap(), WINDOWS_1252);
        assert_eq!(resolve_encoding("iso-8859-1").unwrap(), WINDOWS_1252);
        assert_eq!(resolve_encoding("UTF-8").unwrap(), UTF_8);
        assert!(matches!(
            resolve_encoding("klingon"),
            Err(CensusError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn default_encoding_labels_resolve() {
        let encodings = resolve_encodings(&["latin-1", "utf-8"]).unwrap();
        assert_eq!(encodings, vec![WINDOWS_1252, UTF_8]);
        assert_eq!(encodings, default_encodings());
    }

    #[test]
    fn delimiter_names_and_characters() {
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn strict_utf8_rejects_latin1_bytes() {
        assert!(decode_strict(b"S\xE3o Paulo", UTF_8).is_none());
        assert_eq!(
            decode_strict(b"S\xE3o Paulo", WINDOWS_1252).as_deref(),
            Some("São Paulo")
        );
    }

    #[test]
    fn utf8_bom_is_dropped() {
        assert_eq!(
            decode_strict(b"\xEF\xBB\xBFUF;VALOR", UTF_8).as_deref(),
            Some("UF;VALOR")
        );
    }

    #[test]
    fn fallback_moves_to_next_candidate() {
        let (text, used) =
            decode_with_fallback(b"\xC3\x81REA", &[UTF_8, WINDOWS_1252]).unwrap();
        assert_eq!(text, "ÁREA");
        assert_eq!(used, UTF_8);

        let (text, used) = decode_with_fallback(b"\xC1REA", &[UTF_8, WINDOWS_1252]).unwrap();
        assert_eq!(text, "ÁREA");
        assert_eq!(used, WINDOWS_1252);
    }

    #[test]
    fn exhausted_candidates_report_every_attempt() {
        let err = decode_with_fallback(b"\xFF\xFE\xFD", &[UTF_8]).unwrap_err();
        match err {
            CensusError::Decode { tried } => assert_eq!(tried, vec!["UTF-8".to_string()]),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
