//! PDF text extraction.
//!
//! Uploads supply raw bytes; this module returns plain UTF-8 text. An
//! unreadable file returns an error and the upload is rejected — no
//! panic, no partial record.

use anyhow::Result;

/// Extracts plain text from PDF bytes.
///
/// The result may be empty for image-only PDFs; callers must check and
/// reject documents with no extractable text.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e))
}
