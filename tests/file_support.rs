//! Extraction of office formats built in-test: DOCX paragraphs, XLSX sheets
//! with shared strings, malformed PDFs and unsupported extensions.

use std::io::Write;

use claim_advisor::extract::{extract_text_from_file, try_extract, ExtractError};

fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, content) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );
    zip_with(&[("word/document.xml", &xml)])
}

fn minimal_xlsx() -> Vec<u8> {
    let workbook = r#"<?xml version="1.0"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Schedule" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;
    let shared = r#"<?xml version="1.0"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>Activity</t></si>
  <si><t>Days</t></si>
  <si><t>Foundation pour</t></si>
</sst>"#;
    let sheet = r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
    <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>14</v></c></row>
  </sheetData>
</worksheet>"#;
    zip_with(&[
        ("xl/workbook.xml", workbook),
        ("xl/sharedStrings.xml", shared),
        ("xl/worksheets/sheet1.xml", sheet),
    ])
}

#[test]
fn docx_yields_one_line_per_paragraph() {
    let bytes = minimal_docx(&["Notice of delay", "Issued under clause 20.1"]);
    let text = extract_text_from_file(&bytes, "Letter.DOCX");
    assert!(text.contains("Notice of delay\n"));
    assert!(text.contains("Issued under clause 20.1"));
}

#[test]
fn xlsx_yields_sheet_header_and_tab_joined_rows() {
    let text = extract_text_from_file(&minimal_xlsx(), "schedule.xlsx");
    assert!(text.contains("=== Sheet: Schedule ==="), "got: {}", text);
    assert!(text.contains("Activity\tDays"), "got: {}", text);
    assert!(text.contains("Foundation pour\t14"), "got: {}", text);
}

#[test]
fn invalid_pdf_becomes_inline_marker() {
    let text = extract_text_from_file(b"%PDF-1.4 definitely not a pdf", "contract.pdf");
    assert!(text.starts_with("[PDF extraction error:"), "got: {}", text);
}

#[test]
fn legacy_doc_becomes_inline_marker() {
    let text = extract_text_from_file(b"\xd0\xcf\x11\xe0 binary word", "old.doc");
    assert!(text.starts_with("[DOCX extraction error:"), "got: {}", text);
}

#[test]
fn unsupported_extension_is_reported_inline() {
    let text = extract_text_from_file(b"a,b,c", "costs.csv");
    assert!(text.contains("unsupported"));
    assert_eq!(text, "[unsupported file type: .csv]");
    assert!(matches!(
        try_extract(b"a,b,c", "costs.csv"),
        Err(ExtractError::Unsupported(_))
    ));
}

#[test]
fn txt_drops_invalid_utf8() {
    let text = extract_text_from_file(b"site \xff\xfelog", "daily.txt");
    assert_eq!(text, "site log");
}
