//! Multi-format document loader

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{DocumentMetadata, FileType, SourceDocument};

/// Glyph names some PDF fonts leak into extracted text
const GLYPH_REPLACEMENTS: &[(&str, &str)] = &[
    ("uni2010", "-"),
    ("uni2013", "-"),
    ("uni2014", "--"),
    ("uni2019", "'"),
    ("uni201C", "\""),
    ("uni201D", "\""),
    ("uni2022", "* "),
    ("uni00A0", " "),
];

/// Unicode punctuation and ligatures folded to ASCII
const CHAR_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Clean up PDF text: glyph names, ligatures, null chars and blank lines
fn cleanup_pdf_text(text: &str) -> String {
    let mut result = text.replace('\0', "");

    for (glyph, replacement) in GLYPH_REPLACEMENTS {
        result = result.replace(glyph, replacement);
    }

    let mut folded = String::with_capacity(result.len());
    for ch in result.chars() {
        match CHAR_REPLACEMENTS.iter().find(|(c, _)| *c == ch) {
            Some((_, replacement)) => folded.push_str(replacement),
            None => folded.push(ch),
        }
    }

    folded
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Loads a file into one or more source documents
pub struct DocumentLoader;

impl DocumentLoader {
    /// Detect the loader for a path; anything but pdf, txt, csv, docx and pptx is rejected
    pub fn detect(path: &Path) -> Result<FileType> {
        FileType::from_path(path).ok_or_else(|| {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            Error::UnsupportedFileType(format!("'{}'", ext))
        })
    }

    /// Parse file bytes into source documents
    ///
    /// PDFs yield one document per page and CSVs one per row; the other
    /// formats yield a single document.
    pub fn load(path: &Path, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let file_type = Self::detect(path)?;
        let source = path.to_string_lossy().to_string();

        let docs = match file_type {
            FileType::Pdf => Self::load_pdf(&source, data)?,
            FileType::Txt => Self::load_text(&source, data),
            FileType::Csv => Self::load_csv(&source, data)?,
            FileType::Docx => Self::load_docx(&source, data)?,
            FileType::Pptx => Self::load_pptx(&source, data)?,
        };

        tracing::debug!("Loaded {} document(s) from {}", docs.len(), source);
        Ok(docs)
    }

    /// One document per PDF page; falls back to whole-document extraction
    fn load_pdf(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let mut docs = Vec::new();

        match lopdf::Document::load_mem(data) {
            Ok(pdf) => {
                for (index, page_number) in pdf.get_pages().into_keys().enumerate() {
                    match pdf.extract_text(&[page_number]) {
                        Ok(text) => {
                            let text = cleanup_pdf_text(&text);
                            if text.is_empty() {
                                continue;
                            }
                            let mut metadata = DocumentMetadata::new(source, FileType::Pdf);
                            metadata.page = Some(index as u32);
                            docs.push(SourceDocument::new(text, metadata));
                        }
                        Err(e) => {
                            tracing::debug!("Could not extract text from page {}: {}", page_number, e);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!("lopdf failed to load {}: {}, trying pdf-extract", source, e);
            }
        }

        if docs.is_empty() {
            let text = pdf_extract::extract_text_from_mem(data)
                .map_err(|e| Error::file_parse(source, format!("Failed to extract PDF text: {}", e)))?;
            let text = cleanup_pdf_text(&text);

            if text.is_empty() {
                return Err(Error::file_parse(
                    source,
                    "No text content could be extracted from PDF",
                ));
            }

            let mut metadata = DocumentMetadata::new(source, FileType::Pdf);
            metadata.page = Some(0);
            docs.push(SourceDocument::new(text, metadata));
        }

        Ok(docs)
    }

    /// Whole file as text
    fn load_text(source: &str, data: &[u8]) -> Vec<SourceDocument> {
        let content = String::from_utf8_lossy(data).to_string();
        vec![SourceDocument::new(
            content,
            DocumentMetadata::new(source, FileType::Txt),
        )]
    }

    /// One document per record, formatted as `header: value` lines
    fn load_csv(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);

        let headers = reader
            .headers()
            .map_err(|e| Error::file_parse(source, e.to_string()))?
            .clone();

        let mut docs = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping malformed CSV row {} in {}: {}", row, source, e);
                    continue;
                }
            };

            let content = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| format!("{}: {}", h.trim(), v.trim()))
                .collect::<Vec<_>>()
                .join("\n");

            let mut metadata = DocumentMetadata::new(source, FileType::Csv);
            metadata.row = Some(row as u32);
            docs.push(SourceDocument::new(content, metadata));
        }

        Ok(docs)
    }

    /// Paragraph and table text of a Word document
    fn load_docx(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(source, e.to_string()))?;

        let mut content = String::new();

        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => {
                    content.push_str(&paragraph_text(p));
                    content.push('\n');
                }
                docx_rs::DocumentChild::Table(table) => {
                    for docx_rs::TableChild::TableRow(row) in &table.rows {
                        let cells: Vec<String> = row
                            .cells
                            .iter()
                            .map(|docx_rs::TableRowChild::TableCell(cell)| {
                                cell.children
                                    .iter()
                                    .filter_map(|c| match c {
                                        docx_rs::TableCellContent::Paragraph(p) => {
                                            Some(paragraph_text(p))
                                        }
                                        _ => None,
                                    })
                                    .collect::<Vec<_>>()
                                    .join(" ")
                            })
                            .collect();
                        content.push_str(&cells.join(" | "));
                        content.push('\n');
                    }
                }
                _ => {}
            }
        }

        Ok(vec![SourceDocument::new(
            content,
            DocumentMetadata::new(source, FileType::Docx),
        )])
    }

    /// Slide text of a PowerPoint presentation, slides in numeric order
    fn load_pptx(source: &str, data: &[u8]) -> Result<Vec<SourceDocument>> {
        let cursor = std::io::Cursor::new(data);
        let mut archive =
            zip::ZipArchive::new(cursor).map_err(|e| Error::file_parse(source, e.to_string()))?;

        let mut slide_names: Vec<(u32, String)> = archive
            .file_names()
            .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
            .filter_map(|name| {
                name.trim_start_matches("ppt/slides/slide")
                    .trim_end_matches(".xml")
                    .parse::<u32>()
                    .ok()
                    .map(|n| (n, name.to_string()))
            })
            .collect();
        slide_names.sort_by_key(|(n, _)| *n);

        let mut slides = Vec::new();
        for (_, name) in slide_names {
            let mut xml = String::new();
            match archive.by_name(&name) {
                Ok(mut file) => {
                    if let Err(e) = file.read_to_string(&mut xml) {
                        tracing::warn!("Could not read {} in {}: {}", name, source, e);
                        continue;
                    }
                }
                Err(e) => {
                    tracing::warn!("Missing {} in {}: {}", name, source, e);
                    continue;
                }
            }

            let text = extract_text_from_slide_xml(&xml);
            if !text.is_empty() {
                slides.push(text);
            }
        }

        Ok(vec![SourceDocument::new(
            slides.join("\n\n"),
            DocumentMetadata::new(source, FileType::Pptx),
        )])
    }
}

fn paragraph_text(p: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                if let docx_rs::RunChild::Text(t) = child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

/// Collect `<a:t>` runs, one line per `<a:p>` paragraph
fn extract_text_from_slide_xml(xml: &str) -> String {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(e)) if in_text => {
                if let Ok(text) = e.unescape() {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    line.push_str(text.trim());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !line.trim().is_empty() {
                        lines.push(std::mem::take(&mut line));
                    }
                    line.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Stopping slide XML parse: {}", e);
                break;
            }
            _ => {}
        }
    }

    if !line.trim().is_empty() {
        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unsupported_extension() {
        let err = DocumentLoader::load(Path::new("notes.md"), b"# hi").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_load_text() {
        let docs = DocumentLoader::load(Path::new("documents/a.txt"), b"hello world").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "hello world");
        assert_eq!(docs[0].metadata.source, "documents/a.txt");
        assert_eq!(docs[0].metadata.file_type, FileType::Txt);
    }

    #[test]
    fn test_load_csv_one_document_per_row() {
        let data = b"name,role\nAda,engineer\nGrace,admiral\n";
        let docs = DocumentLoader::load(Path::new("team.csv"), data).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "name: Ada\nrole: engineer");
        assert_eq!(docs[1].metadata.row, Some(1));
    }

    #[test]
    fn test_load_pptx_orders_slides_numerically() {
        let slide = |text: &str| {
            format!(
                r#"<p:sld xmlns:a="a" xmlns:p="p"><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sld>"#,
                text
            )
        };

        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("ppt/slides/slide10.xml", options).unwrap();
            zip.write_all(slide("Tenth").as_bytes()).unwrap();
            zip.start_file("ppt/slides/slide2.xml", options).unwrap();
            zip.write_all(slide("Second").as_bytes()).unwrap();
            zip.start_file("ppt/presentation.xml", options).unwrap();
            zip.write_all(b"<p:presentation/>").unwrap();
            zip.finish().unwrap();
        }

        let docs = DocumentLoader::load(Path::new("deck.pptx"), buf.get_ref()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "Second\n\nTenth");
    }

    fn two_page_pdf() -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in ["Revenue grew this quarter", "Costs stayed flat"] {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_load_pdf_one_document_per_page() {
        let docs = DocumentLoader::load(Path::new("report.pdf"), &two_page_pdf()).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].metadata.page, Some(0));
        assert_eq!(docs[1].metadata.page, Some(1));
        assert_eq!(docs[1].metadata.file_type, FileType::Pdf);
        assert!(docs[0].content.contains("Revenue grew this quarter"));
        assert!(docs[1].content.contains("Costs stayed flat"));
    }

    #[test]
    fn test_unreadable_pdf_is_a_parse_error() {
        let err = DocumentLoader::load(Path::new("broken.pdf"), b"not a pdf at all").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn test_load_docx_flattens_tables_by_row() {
        use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

        let cell = |text: &str| TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)));

        let mut buf = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Quarterly summary")))
            .add_table(Table::new(vec![
                TableRow::new(vec![cell("a"), cell("b")]),
                TableRow::new(vec![cell("c"), cell("d")]),
            ]))
            .build()
            .pack(&mut buf)
            .unwrap();

        let docs = DocumentLoader::load(Path::new("summary.docx"), buf.get_ref()).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.file_type, FileType::Docx);
        assert!(docs[0].content.starts_with("Quarterly summary\n"));
        assert!(docs[0].content.contains("a | b\nc | d\n"));
    }

    #[test]
    fn test_cleanup_pdf_text() {
        let cleaned = cleanup_pdf_text("  \u{FB01}rst line\u{2019}s  \n\n\0 second\u{2014}line ");
        assert_eq!(cleaned, "first line's\nsecond--line");
    }
}
