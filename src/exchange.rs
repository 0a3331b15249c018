use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{LogbookError, Result};
use crate::store::{AttendanceRecord, NewRecord, COLUMNS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const SHEET_NAME: &str = "attendance";
/// Worksheet column limit of the spreadsheet format.
const MAX_COLUMNS: usize = 16_384;
const REQUIRED_COLUMNS: [&str; 5] = ["student_name", "date", "period", "subject", "status"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Extension wins; otherwise a zip signature means a workbook.
    pub fn detect(path: &Path, bytes: &[u8]) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("xlsx") => Self::Xlsx,
            Some("csv") => Self::Csv,
            _ if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) => Self::Xlsx,
            _ => Self::Csv,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Header plus data rows, as read from a file before column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn export_csv(records: &[AttendanceRecord]) -> Vec<u8> {
    let mut csv = String::new();
    csv.push_str(&COLUMNS.join(","));
    csv.push('\n');
    for record in records {
        let fields: Vec<String> = record.values().iter().map(|v| csv_quote(v)).collect();
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }
    let mut out = Vec::with_capacity(UTF8_BOM.len() + csv.len());
    out.extend_from_slice(UTF8_BOM);
    out.extend_from_slice(csv.as_bytes());
    out
}

/// Splits CSV text into records. Quoted fields may contain commas, quotes and newlines.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '"' {
            if in_quotes && i + 1 < chars.len() && chars[i + 1] == '"' {
                buf.push('"');
                i += 2;
                continue;
            }
            in_quotes = !in_quotes;
            i += 1;
            continue;
        }
        if !in_quotes && ch == ',' {
            record.push(std::mem::take(&mut buf));
            i += 1;
            continue;
        }
        if !in_quotes && (ch == '\n' || ch == '\r') {
            if ch == '\r' && i + 1 < chars.len() && chars[i + 1] == '\n' {
                i += 1;
            }
            record.push(std::mem::take(&mut buf));
            records.push(std::mem::take(&mut record));
            i += 1;
            continue;
        }
        buf.push(ch);
        i += 1;
    }
    if !buf.is_empty() || !record.is_empty() {
        record.push(buf);
        records.push(record);
    }
    records
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn xml_unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
            }
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

/// "A" -> 0, "Z" -> 25, "AA" -> 26.
fn column_letters(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// `None` for references without letters or past the last sheet column (XFD).
fn column_index(cell_ref: &str) -> Option<usize> {
    let letters: String = cell_ref
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut idx = 0usize;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        idx = idx.checked_mul(26)?.checked_add(digit)?;
        if idx > MAX_COLUMNS {
            return None;
        }
    }
    Some(idx - 1)
}

fn sheet_xml(records: &[AttendanceRecord]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    let mut push_row = |row_no: usize, cells: Vec<(bool, String)>| {
        xml.push_str(&format!("<row r=\"{}\">", row_no));
        for (col, (numeric, value)) in cells.into_iter().enumerate() {
            let cell_ref = format!("{}{}", column_letters(col), row_no);
            if numeric {
                xml.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", cell_ref, value));
            } else {
                xml.push_str(&format!(
                    "<c r=\"{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                    cell_ref,
                    xml_escape(&value)
                ));
            }
        }
        xml.push_str("</row>");
    };
    push_row(1, COLUMNS.iter().map(|c| (false, c.to_string())).collect());
    for (i, record) in records.iter().enumerate() {
        let cells = record
            .values()
            .into_iter()
            .enumerate()
            .map(|(col, v)| (col == 0, v))
            .collect();
        push_row(i + 2, cells);
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn workbook_parts(records: &[AttendanceRecord]) -> Vec<(&'static str, String)> {
    vec![
        (
            "[Content_Types].xml",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
             <Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\
             </Types>"
                .to_string(),
        ),
        (
            "_rels/.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
             </Relationships>"
                .to_string(),
        ),
        (
            "xl/workbook.xml",
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
                 <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
                 xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
                 <sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>",
                SHEET_NAME
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>\
             </Relationships>"
                .to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet_xml(records)),
    ]
}

pub fn export_xlsx(records: &[AttendanceRecord]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in workbook_parts(records) {
        zip.start_file(name, opts).map_err(zip_io)?;
        zip.write_all(body.as_bytes())?;
    }
    let cursor = zip.finish().map_err(zip_io)?;
    Ok(cursor.into_inner())
}

fn zip_io(e: zip::result::ZipError) -> LogbookError {
    LogbookError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

fn bad_archive(e: impl std::fmt::Display) -> LogbookError {
    LogbookError::import_format(1, format!("invalid spreadsheet archive: {e}"))
}

/// Finds `<tag ...>inner</tag>` and `<tag .../>` occurrences, returning the
/// attribute text and the inner text.
fn elements<'a>(xml: &'a str, tag: &str) -> Vec<(&'a str, &'a str)> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(pos) = rest.find(&open) {
        let after = &rest[pos + open.len()..];
        match after.chars().next() {
            Some(' ') | Some('>') | Some('/') | Some('\t') | Some('\n') | Some('\r') => {}
            _ => {
                rest = after;
                continue;
            }
        }
        let Some(head_end) = after.find('>') else {
            break;
        };
        let head = &after[..head_end];
        if let Some(attrs) = head.strip_suffix('/') {
            out.push((attrs, ""));
            rest = &after[head_end + 1..];
            continue;
        }
        let body = &after[head_end + 1..];
        let Some(body_end) = body.find(&close) else {
            break;
        };
        out.push((head, &body[..body_end]));
        rest = &body[body_end + close.len()..];
    }
    out
}

fn attr<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let mut search = attrs;
    while let Some(pos) = search.find(&needle) {
        let preceded_ok = pos == 0
            || search[..pos]
                .chars()
                .last()
                .map(|c| c.is_whitespace())
                .unwrap_or(true);
        let value_start = pos + needle.len();
        if preceded_ok {
            let value = &search[value_start..];
            return value.find('"').map(|end| &value[..end]);
        }
        search = &search[value_start..];
    }
    None
}

fn text_runs(xml: &str) -> String {
    elements(xml, "t")
        .into_iter()
        .map(|(_, inner)| xml_unescape(inner))
        .collect()
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(e) => e,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(bad_archive(e)),
    };
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| bad_archive(format!("{name}: {e}")))?;
    Ok(Some(text))
}

/// Reads the first worksheet. Handles inline and shared strings.
pub fn parse_xlsx(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(bad_archive)?;

    let shared: Vec<String> = match read_entry(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => elements(&xml, "si")
            .into_iter()
            .map(|(_, inner)| text_runs(inner))
            .collect(),
        None => Vec::new(),
    };

    let mut sheet_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/") && n.ends_with(".xml"))
        .map(|n| n.to_string())
        .collect();
    sheet_names.sort();
    let first = if sheet_names.iter().any(|n| n == "xl/worksheets/sheet1.xml") {
        "xl/worksheets/sheet1.xml".to_string()
    } else {
        sheet_names
            .into_iter()
            .next()
            .ok_or_else(|| bad_archive("workbook has no worksheet"))?
    };
    let sheet = read_entry(&mut archive, &first)?
        .ok_or_else(|| bad_archive("workbook has no worksheet"))?;

    let mut rows = Vec::new();
    for (_, row_xml) in elements(&sheet, "row") {
        let mut cells: Vec<String> = Vec::new();
        for (cell_attrs, cell_xml) in elements(row_xml, "c") {
            let col = match attr(cell_attrs, "r") {
                Some(cell_ref) => column_index(cell_ref).ok_or_else(|| {
                    bad_archive(format!("cell reference '{}' out of range", cell_ref))
                })?,
                None => cells.len(),
            };
            let value = match attr(cell_attrs, "t") {
                Some("inlineStr") => text_runs(cell_xml),
                Some("s") => {
                    let idx = elements(cell_xml, "v")
                        .first()
                        .and_then(|(_, v)| v.trim().parse::<usize>().ok());
                    match idx.and_then(|i| shared.get(i)) {
                        Some(s) => s.clone(),
                        None => return Err(bad_archive("shared string index out of range")),
                    }
                }
                _ => elements(cell_xml, "v")
                    .first()
                    .map(|(_, v)| xml_unescape(v))
                    .unwrap_or_default(),
            };
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value;
        }
        rows.push(cells);
    }
    Ok(rows)
}

/// Decodes raw upload bytes into a header and data rows.
pub fn parse_table(bytes: &[u8], format: FileFormat) -> Result<Table> {
    let mut records = match format {
        FileFormat::Csv => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            let text = std::str::from_utf8(body)
                .map_err(|e| LogbookError::import_format(1, format!("file is not UTF-8: {e}")))?;
            parse_csv(text)
        }
        FileFormat::Xlsx => parse_xlsx(bytes)?,
    };
    if records.is_empty() {
        return Err(LogbookError::import_format(1, "missing header row"));
    }
    let headers = records
        .remove(0)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    Ok(Table {
        headers,
        rows: records,
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Maps a table onto attendance columns. Any mismatch is reported before a
/// single row is produced. An `id` column is accepted and dropped.
pub fn map_import_rows(table: &Table) -> Result<Vec<NewRecord>> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (i, header) in table.headers.iter().enumerate() {
        let Some(column) = COLUMNS.iter().find(|c| **c == header.as_str()) else {
            return Err(LogbookError::import_format(
                1,
                format!("unknown column '{}'", header),
            ));
        };
        if positions.insert(column, i).is_some() {
            return Err(LogbookError::import_format(
                1,
                format!("duplicate column '{}'", header),
            ));
        }
    }
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !positions.contains_key(c))
        .collect();
    if !missing.is_empty() {
        return Err(LogbookError::import_format(
            1,
            format!("missing columns: {}", missing.join(", ")),
        ));
    }

    let width = table.headers.len();
    let mut out = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let line = i + 2;
        if row.iter().all(|v| v.is_empty()) {
            continue;
        }
        if row.len() != width {
            return Err(LogbookError::import_format(
                line,
                format!("expected {} columns, found {}", width, row.len()),
            ));
        }
        let field = |name: &str| -> String {
            positions
                .get(name)
                .and_then(|&p| row.get(p))
                .cloned()
                .unwrap_or_default()
        };
        out.push(NewRecord {
            student_name: field("student_name"),
            date: field("date"),
            period: field("period"),
            subject: field("subject"),
            status: field("status"),
            moderator: non_empty(field("moderator")),
            semester: non_empty(field("semester")),
        });
    }
    Ok(out)
}

impl Table {
    /// Workbooks omit empty trailing cells, so rows are evened out to the
    /// header width before mapping. Non-empty cells past the header are kept.
    pub fn pad_rows(&mut self) {
        let width = self.headers.len();
        for row in &mut self.rows {
            while row.len() > width && row.last().map(|v| v.is_empty()).unwrap_or(false) {
                row.pop();
            }
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
    }
}

/// Parses, pads (workbooks only) and maps an uploaded file.
pub fn read_import(bytes: &[u8], format: FileFormat) -> Result<Vec<NewRecord>> {
    let mut table = parse_table(bytes, format)?;
    if format == FileFormat::Xlsx {
        table.pad_rows();
    }
    map_import_rows(&table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(id: i64, name: &str, status: &str) -> AttendanceRecord {
        AttendanceRecord {
            id,
            student_name: name.to_string(),
            date: "2025-11-03".to_string(),
            period: "3".to_string(),
            subject: "Вища математика".to_string(),
            status: status.to_string(),
            moderator: Some("monitor".to_string()),
            semester: None,
        }
    }

    #[test]
    fn csv_export_has_bom_and_schema_header() {
        let bytes = export_csv(&[record(7, "Гунько Іван, ст.", "н")]);
        assert!(bytes.starts_with(UTF8_BOM));
        let text = std::str::from_utf8(&bytes[3..]).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,student_name,date,period,subject,status,moderator,semester")
        );
        assert_eq!(
            lines.next(),
            Some("7,\"Гунько Іван, ст.\",2025-11-03,3,Вища математика,н,monitor,")
        );
    }

    #[test]
    fn csv_parser_handles_quotes_and_embedded_newlines() {
        let rows = parse_csv("a,b\r\n\"x, \"\"y\"\"\",\"line1\nline2\"\n");
        assert_eq!(
            rows,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["x, \"y\"".to_string(), "line1\nline2".to_string()],
            ]
        );
    }

    #[test]
    fn csv_import_maps_exported_rows() {
        let source = vec![record(2, "B", ""), record(1, "A", "н")];
        let imported = read_import(&export_csv(&source), FileFormat::Csv).expect("import");
        let expected: Vec<NewRecord> = source.iter().map(|r| r.without_id()).collect();
        assert_eq!(imported, expected);
    }

    #[test]
    fn xlsx_import_maps_exported_rows() {
        let mut odd = record(3, "O'Neil <&> \"Q\"", "н");
        odd.semester = Some("2025-2".to_string());
        let source = vec![odd, record(1, "Чорна Єлизавета", "")];
        let bytes = export_xlsx(&source).expect("export");
        assert!(bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]));
        let imported = read_import(&bytes, FileFormat::Xlsx).expect("import");
        let expected: Vec<NewRecord> = source.iter().map(|r| r.without_id()).collect();
        assert_eq!(imported, expected);
    }

    #[test]
    fn xlsx_workbook_names_the_sheet() {
        let bytes = export_xlsx(&[]).expect("export");
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).expect("zip");
        let workbook = read_entry(&mut archive, "xl/workbook.xml")
            .expect("read")
            .expect("workbook entry");
        assert!(workbook.contains("name=\"attendance\""));
    }

    #[test]
    fn xlsx_shared_strings_are_resolved() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = FileOptions::default();
        zip.start_file("xl/sharedStrings.xml", opts).expect("start");
        zip.write_all(
            b"<sst><si><t>student_name</t></si><si><r><t>Ki</t></r><r><t>tsia</t></r></si></sst>",
        )
        .expect("write");
        zip.start_file("xl/worksheets/sheet1.xml", opts).expect("start");
        zip.write_all(
            b"<worksheet><sheetData><row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c></row>\
              <row r=\"2\"><c r=\"A2\" t=\"s\"><v>1</v></c><c r=\"C2\"><v>4</v></c></row></sheetData></worksheet>",
        )
        .expect("write");
        let bytes = zip.finish().expect("finish").into_inner();
        let rows = parse_xlsx(&bytes).expect("parse");
        assert_eq!(rows[0], vec!["student_name".to_string()]);
        assert_eq!(
            rows[1],
            vec!["Kitsia".to_string(), String::new(), "4".to_string()]
        );
    }

    #[test]
    fn unknown_or_missing_columns_are_rejected() {
        let err = read_import(
            b"student_name,date,period,subject,status,grade\n",
            FileFormat::Csv,
        )
        .unwrap_err();
        assert_eq!(err.code(), "import_format");
        assert!(err.to_string().contains("grade"));

        let err = read_import(b"student_name,date\nA,2025-01-01\n", FileFormat::Csv).unwrap_err();
        assert!(err.to_string().contains("period"));

        let err = read_import(b"", FileFormat::Csv).unwrap_err();
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn ragged_csv_row_reports_its_line() {
        let err = read_import(
            b"student_name,date,period,subject,status\nA,2025-01-01,1,Art,\nB,2025-01-01,1\n",
            FileFormat::Csv,
        )
        .unwrap_err();
        match err {
            LogbookError::ImportFormat { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn status_domain_is_not_checked() {
        let rows = read_import(
            b"status,subject,period,date,student_name\nlate,Art,1,2025-01-01,Stranger\n",
            FileFormat::Csv,
        )
        .expect("import");
        assert_eq!(rows[0].status, "late");
        assert_eq!(rows[0].student_name, "Stranger");
        assert_eq!(rows[0].moderator, None);
    }

    #[test]
    fn detects_format_from_extension_then_signature() {
        assert_eq!(FileFormat::detect(&PathBuf::from("a.XLSX"), b""), FileFormat::Xlsx);
        assert_eq!(FileFormat::detect(&PathBuf::from("a.csv"), b"PK\x03\x04"), FileFormat::Csv);
        assert_eq!(FileFormat::detect(&PathBuf::from("upload"), b"PK\x03\x04"), FileFormat::Xlsx);
        assert_eq!(FileFormat::detect(&PathBuf::from("upload"), b"id,"), FileFormat::Csv);
    }

    #[test]
    fn column_letters_and_indexes_agree() {
        for idx in [0usize, 7, 25, 26, 27, 51, 52, 701, 702] {
            assert_eq!(column_index(&format!("{}12", column_letters(idx))), Some(idx));
        }
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_index("XFD1"), Some(MAX_COLUMNS - 1));
        assert_eq!(column_index("XFE1"), None);
        assert_eq!(column_index("AAAAAAAAAAAAAAAA1"), None);
        assert_eq!(column_index("12"), None);
    }

    fn one_cell_workbook(cell_ref: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("xl/worksheets/sheet1.xml", FileOptions::default())
            .expect("start");
        let sheet = format!(
            "<worksheet><sheetData><row r=\"1\"><c r=\"{}\" t=\"inlineStr\"><is><t>student_name</t></is></c></row></sheetData></worksheet>",
            cell_ref
        );
        zip.write_all(sheet.as_bytes()).expect("write");
        zip.finish().expect("finish").into_inner()
    }

    #[test]
    fn oversized_cell_reference_is_an_import_error() {
        for cell_ref in ["AAAAAAAAAAAAAAAA1", "ZZZZZZZ1", "XFE1"] {
            let err = read_import(&one_cell_workbook(cell_ref), FileFormat::Xlsx).unwrap_err();
            assert_eq!(err.code(), "import_format", "{cell_ref}");
            assert!(err.to_string().contains("out of range"), "{err}");
        }
    }
}
