//! Text extraction: raw document bytes → cleaned plain text.
//!
//! ## Why spawn_blocking?
//!
//! Both parsers are synchronous and CPU-bound. pdfium additionally keeps
//! thread-local state and must not run on a Tokio worker. [`extract`] moves
//! the work onto the blocking pool; a parser panic on a hostile file comes
//! back as a `JoinError` and is reported as [`QuizError::ExtractionFailed`]
//! instead of taking the process down.
//!
//! Failure reasons are fixed phrases meant for end users. Parser details are
//! logged, never returned.
//!
//! ## Formats
//!
//! | Format | Parser | Fails when |
//! |--------|--------|------------|
//! | PDF  | pdfium text layer, page by page | every page is empty (scanned/image-only) |
//! | DOCX | docx-rs, paragraphs first, then table rows | nothing but blank paragraphs |
//! | TXT  | UTF-8, falling back to Latin-1 | never |

use crate::config::QuizConfig;
use crate::error::QuizError;
use crate::model::{Document, DocumentFormat, ExtractedText};
use crate::pipeline::clean::clean_text;
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Separator placed between the non-blank cells of one table row.
pub const CELL_SEPARATOR: &str = " | ";

/// Separator placed between pages, paragraphs and table rows.
const BLOCK_SEPARATOR: &str = "\n\n";

/// Extract and clean the text of `document` on the blocking pool.
pub async fn extract(document: &Document, config: &QuizConfig) -> Result<ExtractedText, QuizError> {
    let bytes = document.bytes.clone();
    let format = document.format;
    let lib_path = config.pdfium_lib_path.clone();
    info!(
        "Extracting text from '{}' ({}, {} bytes)",
        document.filename,
        format,
        bytes.len()
    );

    let text = tokio::task::spawn_blocking(move || {
        extract_text(&bytes, format, lib_path.as_deref())
    })
    .await
    .map_err(|e| {
        warn!(error = %e, "{format} parser task did not complete");
        QuizError::ExtractionFailed {
            format: format.to_string(),
            reason: "the parser stopped unexpectedly".to_string(),
        }
    })??;

    info!("Extracted {} characters", text.char_count());
    Ok(text)
}

/// Blocking extraction: dispatch on `format`, then apply [`clean_text`].
pub fn extract_text(
    bytes: &[u8],
    format: DocumentFormat,
    pdfium_lib_path: Option<&Path>,
) -> Result<ExtractedText, QuizError> {
    let raw = match format {
        DocumentFormat::Pdf => extract_pdf(bytes, pdfium_lib_path)?,
        DocumentFormat::Docx => extract_docx(bytes)?,
        DocumentFormat::Txt => decode_txt(bytes),
    };
    Ok(ExtractedText {
        content: clean_text(&raw),
    })
}

// ── PDF ──────────────────────────────────────────────────────────────────────

fn pdf_failure(reason: impl Into<String>) -> QuizError {
    QuizError::ExtractionFailed {
        format: DocumentFormat::Pdf.to_string(),
        reason: reason.into(),
    }
}

/// Bind to the pdfium shared library.
///
/// An explicit path may name the library file itself or the directory that
/// holds it. Without one, the working directory is tried before the system
/// library search path.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, PdfiumError> {
    let bindings = match lib_path {
        Some(path) if path.is_file() => Pdfium::bind_to_library(path)?,
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))?,
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())?,
    };
    Ok(Pdfium::new(bindings))
}

fn extract_pdf(bytes: &[u8], lib_path: Option<&Path>) -> Result<String, QuizError> {
    let pdfium = bind_pdfium(lib_path).map_err(|e| {
        warn!(error = ?e, "Could not bind pdfium");
        pdf_failure("the PDF parser library is not available")
    })?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        warn!(error = ?e, "pdfium rejected the document");
        pdf_failure("the file is not a readable PDF")
    })?;

    let mut pages: Vec<String> = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| {
            warn!(error = ?e, "No text layer on PDF page {}", idx + 1);
            pdf_failure(format!("page {} has no readable text layer", idx + 1))
        })?;
        pages.push(text.all());
    }
    assemble_pages(pages)
}

/// Join the text of each page with a blank line, skipping blank pages.
///
/// Fails when no page has any text, which is what a scanned or image-only
/// PDF looks like.
fn assemble_pages<I>(pages: I) -> Result<String, QuizError>
where
    I: IntoIterator<Item = String>,
{
    let mut kept: Vec<String> = Vec::new();
    for (idx, text) in pages.into_iter().enumerate() {
        if text.trim().is_empty() {
            debug!("PDF page {} yielded no text", idx + 1);
            continue;
        }
        kept.push(text);
    }

    if kept.is_empty() {
        return Err(pdf_failure(
            "no text could be extracted. It may be scanned or image-based",
        ));
    }
    debug!("PDF: {} pages with text", kept.len());
    Ok(kept.join(BLOCK_SEPARATOR))
}

// ── DOCX ─────────────────────────────────────────────────────────────────────

fn docx_failure(reason: impl Into<String>) -> QuizError {
    QuizError::ExtractionFailed {
        format: DocumentFormat::Docx.to_string(),
        reason: reason.into(),
    }
}

/// Keep the non-blank body paragraphs, then one line per table row.
///
/// Tables always follow the paragraphs, wherever they sit in the body.
fn extract_docx(bytes: &[u8]) -> Result<String, QuizError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| {
        warn!(error = %e, "docx-rs could not read the document");
        docx_failure("the file is not a readable DOCX document")
    })?;

    let mut paragraphs: Vec<String> = Vec::new();
    let mut rows: Vec<String> = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(para) => {
                let text = paragraph_text(para);
                if !text.trim().is_empty() {
                    paragraphs.push(text);
                }
            }
            DocumentChild::Table(table) => rows.extend(table_rows(table)),
            _ => {}
        }
    }

    debug!("DOCX: {} paragraphs, {} table rows", paragraphs.len(), rows.len());
    paragraphs.append(&mut rows);
    if paragraphs.is_empty() {
        return Err(docx_failure("no text could be extracted from document"));
    }
    Ok(paragraphs.join(BLOCK_SEPARATOR))
}

/// Concatenate the runs of a paragraph, following hyperlinks.
fn paragraph_text(para: &Paragraph) -> String {
    let mut out = String::new();
    push_paragraph_children(&para.children, &mut out);
    out
}

fn push_paragraph_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, out),
            _ => {}
        }
    }
}

/// One `" | "`-joined line per row that has at least one non-blank cell.
fn table_rows(table: &Table) -> Vec<String> {
    let mut lines = Vec::new();
    #[allow(irrefutable_let_patterns)]
    for child in &table.rows {
        let TableChild::TableRow(row) = child else {
            continue;
        };
        let cells: Vec<String> = row
            .cells
            .iter()
            .filter_map(|cell| match cell {
                TableRowChild::TableCell(cell) => Some(cell_text(&cell.children)),
                #[allow(unreachable_patterns)]
                _ => None,
            })
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();
        if !cells.is_empty() {
            lines.push(cells.join(CELL_SEPARATOR));
        }
    }
    lines
}

/// Text of a cell: its paragraphs joined by newlines; nested tables are
/// flattened row by row.
fn cell_text(contents: &[TableCellContent]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for content in contents {
        match content {
            TableCellContent::Paragraph(para) => parts.push(paragraph_text(para)),
            TableCellContent::Table(nested) => parts.extend(table_rows(nested)),
            _ => {}
        }
    }
    parts.join("\n")
}

// ── TXT ──────────────────────────────────────────────────────────────────────

/// Decode as UTF-8; on failure treat every byte as one Latin-1 character,
/// which cannot fail.
fn decode_txt(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            debug!("TXT is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    };
    match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Run, TableCell, TableRow};
    use std::io::Cursor;

    fn build_docx(docx: Docx) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(para(text))
    }

    #[test]
    fn txt_utf8() {
        let out = extract_text("Grüße  aus\r\nBerlin".as_bytes(), DocumentFormat::Txt, None).unwrap();
        assert_eq!(out.content, "Grüße aus\nBerlin");
    }

    #[test]
    fn txt_latin1_fallback() {
        // "café" in Latin-1: 0xE9 is not valid UTF-8 on its own.
        let bytes = [b'c', b'a', b'f', 0xE9];
        let out = extract_text(&bytes, DocumentFormat::Txt, None).unwrap();
        assert_eq!(out.content, "café");
    }

    #[test]
    fn txt_strips_bom() {
        let mut bytes = "\u{FEFF}hello".as_bytes().to_vec();
        bytes.extend_from_slice(b" world");
        let out = extract_text(&bytes, DocumentFormat::Txt, None).unwrap();
        assert_eq!(out.content, "hello world");
    }

    #[test]
    fn txt_empty_is_not_an_extraction_failure() {
        let out = extract_text(b"   \n\n ", DocumentFormat::Txt, None).unwrap();
        assert!(out.content.is_empty());
    }

    #[test]
    fn docx_paragraph_then_table_row() {
        let bytes = build_docx(
            Docx::new()
                .add_paragraph(para("Hello"))
                .add_table(Table::new(vec![TableRow::new(vec![cell("A"), cell("B")])])),
        );
        let out = extract_text(&bytes, DocumentFormat::Docx, None).unwrap();
        let hello = out.content.find("Hello").expect("paragraph text");
        let row = out.content.find("A | B").expect("table row text");
        assert!(hello < row, "got: {:?}", out.content);
    }

    #[test]
    fn docx_tables_follow_all_paragraphs() {
        let bytes = build_docx(
            Docx::new()
                .add_table(Table::new(vec![TableRow::new(vec![cell("A"), cell("B")])]))
                .add_paragraph(para("Hello")),
        );
        let out = extract_text(&bytes, DocumentFormat::Docx, None).unwrap();
        assert_eq!(out.content, "Hello\n\nA | B");
    }

    #[test]
    fn docx_skips_blank_cells_and_paragraphs() {
        let bytes = build_docx(
            Docx::new()
                .add_paragraph(para("   "))
                .add_paragraph(para("Intro"))
                .add_table(Table::new(vec![
                    TableRow::new(vec![cell("X"), cell("  "), cell("Y")]),
                    TableRow::new(vec![cell(""), cell(" ")]),
                ])),
        );
        let out = extract_text(&bytes, DocumentFormat::Docx, None).unwrap();
        assert_eq!(out.content, "Intro\n\nX | Y");
    }

    #[test]
    fn docx_with_only_blank_paragraphs_fails() {
        let bytes = build_docx(Docx::new().add_paragraph(para(" ")).add_paragraph(Paragraph::new()));
        let err = extract_text(&bytes, DocumentFormat::Docx, None).unwrap_err();
        assert!(matches!(err, QuizError::ExtractionFailed { .. }), "{err:?}");
    }

    #[test]
    fn docx_corrupt_archive_fails() {
        let err = extract_text(b"PK\x03\x04 definitely not a zip", DocumentFormat::Docx, None).unwrap_err();
        match err {
            QuizError::ExtractionFailed { format, reason } => {
                assert_eq!(format, "DOCX");
                assert_eq!(reason, "the file is not a readable DOCX document");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pdf_garbage_fails_with_a_fixed_reason() {
        // Either pdfium is missing or it rejects the bytes; neither leaks
        // parser internals into the reason.
        let err = extract_text(b"not a pdf at all", DocumentFormat::Pdf, None).unwrap_err();
        match err {
            QuizError::ExtractionFailed { format, reason } => {
                assert_eq!(format, "PDF");
                assert!(
                    reason == "the PDF parser library is not available"
                        || reason == "the file is not a readable PDF",
                    "reason: {reason}"
                );
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pdf_pages_join_with_blank_line_in_order() {
        let text = assemble_pages(vec!["Page one".to_string(), "Page two".to_string()]).unwrap();
        assert_eq!(text, "Page one\n\nPage two");
    }

    #[test]
    fn pdf_blank_pages_are_skipped() {
        let pages = vec![
            "  \n ".to_string(),
            "Intro".to_string(),
            String::new(),
            "Summary".to_string(),
        ];
        assert_eq!(assemble_pages(pages).unwrap(), "Intro\n\nSummary");
    }

    #[test]
    fn pdf_without_any_page_text_fails() {
        for pages in [Vec::new(), vec![" ".to_string(), "\n\t".to_string()]] {
            let err = assemble_pages(pages).unwrap_err();
            match err {
                QuizError::ExtractionFailed { format, reason } => {
                    assert_eq!(format, "PDF");
                    assert!(reason.contains("scanned or image-based"), "reason: {reason}");
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn pdf_blank_document_fails_when_pdfium_is_present() {
        let Ok(pdfium) = bind_pdfium(None) else {
            println!("SKIP: pdfium library not found");
            return;
        };
        let bytes = {
            let mut doc = pdfium.create_new_pdf().unwrap();
            doc.pages_mut()
                .create_page_at_end(PdfPagePaperSize::a4())
                .unwrap();
            doc.save_to_bytes().unwrap()
        };
        drop(pdfium);

        let err = extract_text(&bytes, DocumentFormat::Pdf, None).unwrap_err();
        assert!(
            matches!(err, QuizError::ExtractionFailed { ref reason, .. } if reason.contains("scanned")),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn extract_runs_on_blocking_pool() {
        let doc = Document::from_filename(b"  some   notes  ".to_vec(), "notes.txt").unwrap();
        let out = extract(&doc, &QuizConfig::default()).await.unwrap();
        assert_eq!(out.content, "some notes");
    }
}
