//! Multi-format text extraction for uploaded documents.
//!
//! Dispatch is by lowercased file extension. Failures never escape this
//! module: [`extract_text_from_file`] turns every [`ExtractError`] into an
//! inline bracketed marker inside the returned text, so the indexing and
//! analysis stages only ever see strings.

use std::io::Read;
use std::path::Path;

use anyhow::Result;
use thiserror::Error;

/// Maximum sheets to process in a workbook.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to process per sheet (avoids unbounded memory).
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Excel's last column is `XFD`.
const XLSX_MAX_COLUMNS: usize = 16_384;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("PDF extraction error: {0}")]
    Pdf(String),
    #[error("DOCX extraction error: {0}")]
    Docx(String),
    #[error("XLSX extraction error: {0}")]
    Xlsx(String),
}

impl ExtractError {
    /// Render the error as the inline marker embedded in extracted text.
    pub fn to_inline(&self) -> String {
        format!("[{}]", self)
    }
}

/// Supported formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Xlsx,
    Txt,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Result<Self, ExtractError> {
        let ext = extension_of(filename);
        match ext.as_str() {
            ".pdf" => Ok(FileKind::Pdf),
            ".docx" | ".doc" => Ok(FileKind::Docx),
            ".xlsx" | ".xls" => Ok(FileKind::Xlsx),
            ".txt" => Ok(FileKind::Txt),
            "" => Err(ExtractError::Unsupported("(no extension)".to_string())),
            _ => Err(ExtractError::Unsupported(ext)),
        }
    }
}

/// Lowercased extension including the dot, or an empty string.
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Extract plain text from a file's bytes, never failing.
///
/// Unsupported extensions and handler failures come back as a bracketed
/// marker such as `[unsupported file type: .csv]`.
pub fn extract_text_from_file(bytes: &[u8], filename: &str) -> String {
    match try_extract(bytes, filename) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(filename, error = %e, "text extraction failed");
            e.to_inline()
        }
    }
}

/// Extract plain text, surfacing failures as [`ExtractError`].
pub fn try_extract(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    match FileKind::from_filename(filename)? {
        FileKind::Pdf => extract_pdf(bytes),
        FileKind::Docx => extract_docx(bytes),
        FileKind::Xlsx => extract_xlsx(bytes),
        FileKind::Txt => Ok(extract_txt(bytes)),
    }
}

/// `cadv extract <file>`: print the extracted text of a single file.
pub fn run_extract(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    println!("{}", extract_text_from_file(&bytes, &filename));
    Ok(())
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// UTF-8 decode, dropping invalid sequences and a leading BOM.
fn extract_txt(bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    decoded
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect()
}

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, String> {
    let entry = archive.by_name(name).map_err(|e| format!("{}: {}", name, e))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| e.to_string())?;
    if out.len() as u64 >= max_bytes {
        return Err(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        ));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let doc_xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)
        .map_err(ExtractError::Docx)?;
    docx_paragraphs(&doc_xml).map_err(ExtractError::Docx)
}

/// One line per `<w:p>` paragraph, runs concatenated, tabs preserved.
fn docx_paragraphs(xml: &[u8]) -> Result<String, String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_t = true,
            Ok(Event::Text(te)) if in_t => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Xlsx(e.to_string()))?;
    let shared_strings = read_shared_strings(&mut archive).map_err(ExtractError::Xlsx)?;
    let sheet_titles = read_sheet_titles(&mut archive).map_err(ExtractError::Xlsx)?;
    let sheet_files = list_worksheet_files(&archive);

    let mut out = String::new();
    for (idx, file) in sheet_files.into_iter().take(XLSX_MAX_SHEETS).enumerate() {
        let sheet_xml = read_zip_entry_bounded(&mut archive, &file, MAX_XML_ENTRY_BYTES)
            .map_err(ExtractError::Xlsx)?;
        let rows = sheet_rows(&sheet_xml, &shared_strings).map_err(ExtractError::Xlsx)?;
        let title = sheet_titles
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("Sheet{}", idx + 1));
        out.push_str(&format!("\n=== Sheet: {} ===\n", title));
        for row in rows {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
    }
    Ok(out)
}

/// Shared string table; each `<si>` may hold several rich-text runs.
fn read_shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>, String> {
    use quick_xml::events::Event;

    if archive.index_for_name("xl/sharedStrings.xml").is_none() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.extend(current.take()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Sheet display names from `xl/workbook.xml`, in workbook order.
fn read_sheet_titles(archive: &mut Archive<'_>) -> Result<Vec<String>, String> {
    use quick_xml::events::Event;

    if archive.index_for_name("xl/workbook.xml").is_none() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/workbook.xml", MAX_XML_ENTRY_BYTES)?;
    let mut titles = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let name = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"name")
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                if let Some(name) = name {
                    titles.push(name);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(titles)
}

fn list_worksheet_files(archive: &Archive<'_>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Zero-based column index from a cell reference such as `"C7"`.
///
/// References past column `XFD` are rejected.
fn column_index(cell_ref: &str) -> Result<Option<usize>, String> {
    let letters = cell_ref.bytes().take_while(|b| b.is_ascii_alphabetic());
    let mut n = 0usize;
    for b in letters {
        n = n
            .checked_mul(26)
            .and_then(|n| n.checked_add((b.to_ascii_uppercase() - b'A' + 1) as usize))
            .filter(|&n| n <= XLSX_MAX_COLUMNS)
            .ok_or_else(|| format!("cell reference out of range: {}", cell_ref))?;
    }
    Ok(n.checked_sub(1))
}

/// Cell values grouped by `<row>`; gaps between referenced columns become
/// empty fields.
fn sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<String>>, String> {
    use quick_xml::events::Event;

    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut cell_type = String::new();
    let mut cell_col: Option<usize> = None;
    let mut cell_value = String::new();
    let mut in_value = false;
    let mut cell_count = 0usize;

    loop {
        if cell_count >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    cell_type.clear();
                    cell_col = None;
                    cell_value.clear();
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(attr.value.as_ref()).to_string();
                        match attr.key.as_ref() {
                            b"t" => cell_type = value,
                            b"r" => cell_col = column_index(&value)?,
                            _ => {}
                        }
                    }
                }
                // `<v>` holds the raw value, `<t>` the text of inline strings.
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"row" => rows.push(Vec::new()),
            Ok(Event::Text(te)) if in_value => {
                cell_value.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let text = if cell_type == "s" {
                        cell_value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared_strings.get(i).cloned())
                            .unwrap_or_default()
                    } else {
                        cell_value.clone()
                    };
                    // Padding counts against the per-sheet cap.
                    if let Some(col) = cell_col {
                        let padding = col.saturating_sub(row.len());
                        if cell_count + padding >= XLSX_MAX_CELLS_PER_SHEET {
                            rows.push(std::mem::take(&mut row));
                            break;
                        }
                        row.resize(row.len() + padding, String::new());
                        cell_count += padding;
                    }
                    row.push(text);
                    cell_count += 1;
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}
