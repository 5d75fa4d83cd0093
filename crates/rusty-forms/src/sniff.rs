//! Content sniffing for uploaded files
//!
//! `enforce_mime_match` compares an upload's declared MIME type with what
//! its bytes look like. The detection backend is pluggable.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Bytes read from the start of a file
const HEADER_LEN: usize = 512;

/// Trait for MIME detection backends
#[async_trait]
pub trait ContentSniffer: Send + Sync {
    /// MIME type of the file at `path`, judged by its contents
    async fn sniff(&self, path: &Path) -> Result<String>;

    /// Get backend name
    fn name(&self) -> &'static str;
}

/// Detects common formats by their magic numbers.
///
/// Anything unrecognised is `text/plain` if its header is valid UTF-8 and
/// `application/octet-stream` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureSniffer;

impl SignatureSniffer {
    pub fn new() -> Self {
        Self
    }

    /// Classify a file header
    pub fn detect(header: &[u8]) -> &'static str {
        const SIGNATURES: &[(&[u8], &str)] = &[
            (b"\x89PNG\r\n\x1a\n", "image/png"),
            (b"\xff\xd8\xff", "image/jpeg"),
            (b"GIF87a", "image/gif"),
            (b"GIF89a", "image/gif"),
            (b"%PDF-", "application/pdf"),
            (b"PK\x03\x04", "application/zip"),
            (b"\x1f\x8b", "application/gzip"),
            (b"BM", "image/bmp"),
            (b"MZ", "application/x-dosexec"),
        ];

        if header.len() >= 12 && &header[..4] == b"RIFF" && &header[8..12] == b"WEBP" {
            return "image/webp";
        }
        if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| header.starts_with(magic)) {
            return mime;
        }
        if utf8_prefix(header) {
            "text/plain"
        } else {
            "application/octet-stream"
        }
    }
}

// A header cut mid-character is still text
fn utf8_prefix(header: &[u8]) -> bool {
    match std::str::from_utf8(header) {
        Ok(_) => true,
        Err(err) => err.error_len().is_none(),
    }
}

#[async_trait]
impl ContentSniffer for SignatureSniffer {
    async fn sniff(&self, path: &Path) -> Result<String> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open upload for sniffing: {:?}", path))?;

        let mut header = Vec::with_capacity(HEADER_LEN);
        file.take(HEADER_LEN as u64)
            .read_to_end(&mut header)
            .await
            .with_context(|| format!("Failed to read upload header: {:?}", path))?;

        let mime = Self::detect(&header);
        tracing::trace!(?path, mime, "sniffed upload");
        Ok(mime.to_string())
    }

    fn name(&self) -> &'static str {
        "signature"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR", "image/png")]
    #[case(b"\xff\xd8\xff\xe0\0\x10JFIF", "image/jpeg")]
    #[case(b"GIF89a\x01\0\x01\0", "image/gif")]
    #[case(b"%PDF-1.7\n", "application/pdf")]
    #[case(b"RIFF\x24\0\0\0WEBPVP8 ", "image/webp")]
    #[case(b"MZ\x90\0\x03\0", "application/x-dosexec")]
    #[case(b"hello, world\n", "text/plain")]
    #[case(b"\0\xfe\xfd\xfc\xfb", "application/octet-stream")]
    fn test_detect(#[case] header: &[u8], #[case] expected: &str) {
        assert_eq!(SignatureSniffer::detect(header), expected);
    }

    #[tokio::test]
    async fn test_sniff_reads_file_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4\n%rest of document").unwrap();

        let mime = SignatureSniffer::new().sniff(file.path()).await.unwrap();
        assert_eq!(mime, "application/pdf");
    }

    #[tokio::test]
    async fn test_sniff_missing_file_is_an_error() {
        let err = SignatureSniffer::new()
            .sniff(Path::new("/no/such/upload.bin"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to open upload"));
    }
}
