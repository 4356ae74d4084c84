// Minimal WordprocessingML (`.docx`) writer.
//
// Only what the report needs: headings, plain paragraphs, a simple table,
// inline PNG pictures, page breaks and sections with optional coloured page
// borders. The document is assembled as a block list and packaged into a
// zip archive in memory.

use crate::error::RenderError;
use crate::util::xml_text;
use chrono::{SecondsFormat, Utc};
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const EMU_PER_INCH: f64 = 914_400.0;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

impl Align {
    fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        align: Align,
    },
    Paragraph {
        text: String,
        align: Align,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Picture {
        media: usize,
        width_in: f64,
        height_in: f64,
    },
    PageBreak,
}

/// Properties applied to one section; every section starts on a new page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionProps {
    /// Page border colour, hex RGB without '#'.
    pub border_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub props: SectionProps,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    title: String,
    sections: Vec<Section>,
    media: Vec<Vec<u8>>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Document {
            title: title.into(),
            sections: vec![Section::default()],
            media: Vec::new(),
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn media_count(&self) -> usize {
        self.media.len()
    }

    fn current(&mut self) -> &mut Section {
        if self.sections.is_empty() {
            self.sections.push(Section::default());
        }
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    pub fn add_heading(&mut self, level: u8, text: impl Into<String>, align: Align) {
        self.current().blocks.push(Block::Heading {
            level: level.clamp(1, 2),
            text: text.into(),
            align,
        });
    }

    pub fn add_paragraph(&mut self, text: impl Into<String>, align: Align) {
        self.current().blocks.push(Block::Paragraph {
            text: text.into(),
            align,
        });
    }

    pub fn add_table(&mut self, header: Vec<String>, rows: Vec<Vec<String>>) {
        self.current().blocks.push(Block::Table { header, rows });
    }

    /// Embed PNG bytes as an inline picture of the given size in inches.
    pub fn add_picture(&mut self, png: Vec<u8>, width_in: f64, height_in: f64) {
        self.media.push(png);
        let media = self.media.len() - 1;
        self.current().blocks.push(Block::Picture {
            media,
            width_in,
            height_in,
        });
    }

    pub fn add_page_break(&mut self) {
        self.current().blocks.push(Block::PageBreak);
    }

    /// Close the current section and start a new one on the next page.
    pub fn add_section(&mut self, props: SectionProps) {
        self.sections.push(Section {
            props,
            blocks: Vec::new(),
        });
    }

    /// Package the document as a `.docx` archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            zip.start_file("[Content_Types].xml", options)?;
            zip.write_all(content_types_xml().as_bytes())?;
            zip.start_file("_rels/.rels", options)?;
            zip.write_all(ROOT_RELS.as_bytes())?;
            zip.start_file("docProps/core.xml", options)?;
            zip.write_all(core_xml(&self.title).as_bytes())?;
            zip.start_file("docProps/app.xml", options)?;
            zip.write_all(APP_XML.as_bytes())?;
            zip.start_file("word/styles.xml", options)?;
            zip.write_all(STYLES_XML.as_bytes())?;
            zip.start_file("word/_rels/document.xml.rels", options)?;
            zip.write_all(self.document_rels_xml().as_bytes())?;
            zip.start_file("word/document.xml", options)?;
            zip.write_all(self.document_xml().as_bytes())?;
            // PNG data is already compressed
            let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
            for (i, png) in self.media.iter().enumerate() {
                zip.start_file(format!("word/media/image{}.png", i + 1), stored)?;
                zip.write_all(png)?;
            }
            zip.finish()?;
        }
        Ok(buf)
    }

    fn document_rels_xml(&self) -> String {
        let mut s = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        let _ = write!(
            s,
            r#"<Relationship Id="rIdStyles" Type="{REL_STYLES}" Target="styles.xml"/>"#
        );
        for i in 0..self.media.len() {
            let _ = write!(
                s,
                r#"<Relationship Id="{}" Type="{REL_IMAGE}" Target="media/image{}.png"/>"#,
                image_rel_id(i),
                i + 1
            );
        }
        s.push_str("</Relationships>");
        s
    }

    pub fn document_xml(&self) -> String {
        let mut s = String::with_capacity(16 * 1024);
        let _ = write!(
            s,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}" xmlns:wp="{NS_WP}" xmlns:a="{NS_A}" xmlns:pic="{NS_PIC}"><w:body>"#
        );
        let last = self.sections.len().saturating_sub(1);
        let mut drawing_id = 0usize;
        for (i, section) in self.sections.iter().enumerate() {
            for block in &section.blocks {
                write_block(&mut s, block, &mut drawing_id);
            }
            if i < last {
                // a section ends with a paragraph carrying its properties
                s.push_str("<w:p><w:pPr>");
                write_sect_pr(&mut s, &section.props);
                s.push_str("</w:pPr></w:p>");
            } else {
                write_sect_pr(&mut s, &section.props);
            }
        }
        s.push_str("</w:body></w:document>");
        s
    }
}

fn image_rel_id(media: usize) -> String {
    format!("rIdImage{}", media + 1)
}

fn write_run(s: &mut String, text: &str, bold: bool) {
    s.push_str("<w:r>");
    if bold {
        s.push_str("<w:rPr><w:b/></w:rPr>");
    }
    let _ = write!(
        s,
        r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(&xml_text(text))
    );
}

fn write_block(s: &mut String, block: &Block, drawing_id: &mut usize) {
    match block {
        Block::Heading { level, text, align } => {
            let _ = write!(
                s,
                r#"<w:p><w:pPr><w:pStyle w:val="Heading{level}"/><w:jc w:val="{}"/></w:pPr>"#,
                align.as_str()
            );
            write_run(s, text, false);
            s.push_str("</w:p>");
        }
        Block::Paragraph { text, align } => {
            let _ = write!(s, r#"<w:p><w:pPr><w:jc w:val="{}"/></w:pPr>"#, align.as_str());
            write_run(s, text, false);
            s.push_str("</w:p>");
        }
        Block::Table { header, rows } => write_table(s, header, rows),
        Block::Picture {
            media,
            width_in,
            height_in,
        } => {
            *drawing_id += 1;
            let id = *drawing_id;
            let cx = (width_in * EMU_PER_INCH).round() as i64;
            let cy = (height_in * EMU_PER_INCH).round() as i64;
            let rid = image_rel_id(*media);
            let _ = write!(
                s,
                r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{id}" name="Picture {id}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="{NS_PIC}"><pic:pic><pic:nvPicPr><pic:cNvPr id="{id}" name="image{}.png"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
                media + 1
            );
        }
        Block::PageBreak => s.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#),
    }
}

fn write_table(s: &mut String, header: &[String], rows: &[Vec<String>]) {
    // 9360 twips = 6.5in text width on Letter with 1in margins
    let cols = header.len().max(1);
    let widths: Vec<usize> = match cols {
        3 => vec![1200, 6360, 1800],
        n => vec![9360 / n; n],
    };
    s.push_str(r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid>"#);
    for w in &widths {
        let _ = write!(s, r#"<w:gridCol w:w="{w}"/>"#);
    }
    s.push_str("</w:tblGrid>");
    let write_row = |s: &mut String, cells: &[String], bold: bool| {
        s.push_str("<w:tr>");
        for (i, w) in widths.iter().enumerate() {
            let _ = write!(s, r#"<w:tc><w:tcPr><w:tcW w:w="{w}" w:type="dxa"/></w:tcPr><w:p>"#);
            write_run(s, cells.get(i).map(String::as_str).unwrap_or(""), bold);
            s.push_str("</w:p></w:tc>");
        }
        s.push_str("</w:tr>");
    };
    write_row(s, header, true);
    for row in rows {
        write_row(s, row.as_slice(), false);
    }
    s.push_str("</w:tbl>");
}

fn write_sect_pr(s: &mut String, props: &SectionProps) {
    s.push_str(r#"<w:sectPr><w:type w:val="nextPage"/><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/>"#);
    if let Some(color) = &props.border_color {
        s.push_str(r#"<w:pgBorders w:offsetFrom="page">"#);
        for side in ["top", "left", "bottom", "right"] {
            let _ = write!(
                s,
                r#"<w:{side} w:val="single" w:sz="30" w:space="24" w:color="{}"/>"#,
                escape(color.as_str())
            );
        }
        s.push_str("</w:pgBorders>");
    }
    s.push_str("</w:sectPr>");
}

fn content_types_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#
        .to_string()
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>sdg_report</Application></Properties>"#;

fn core_xml(title: &str) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>sdg_report</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#,
        escape(&xml_text(title))
    )
}

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="240"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="36"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="120" w:after="120"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="30"/></w:rPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:left w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:right w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="000000"/></w:tblBorders></w:tblPr></w:style></w:styles>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn packages_required_parts() {
        let mut doc = Document::new("Report");
        doc.add_heading(1, "Sustainable Development Goals", Align::Center);
        doc.add_picture(vec![0x89, b'P', b'N', b'G'], 6.0, 4.0);
        let bytes = doc.to_bytes().unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for expected in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
            "word/media/image1.png",
            "docProps/core.xml",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        let rels = part(&bytes, "word/_rels/document.xml.rels");
        assert!(rels.contains(r#"Id="rIdImage1""#));
        let body = part(&bytes, "word/document.xml");
        assert!(body.contains(r#"r:embed="rIdImage1""#));
        assert!(body.contains(r#"<wp:extent cx="5486400" cy="3657600"/>"#));
    }

    #[test]
    fn escapes_text() {
        let mut doc = Document::new("R&D <draft>");
        doc.add_paragraph("Peace, Justice & <Strong> Institutions", Align::Left);
        let xml = doc.document_xml();
        assert!(xml.contains("Peace, Justice &amp; &lt;Strong&gt; Institutions"));
    }

    #[test]
    fn control_codes_are_stripped_from_runs() {
        let mut doc = Document::new("Report\u{1}");
        doc.add_heading(2, "SDG 5: Seats \u{1} held", Align::Center);
        let xml = doc.document_xml();
        assert!(xml.contains(">SDG 5: Seats  held<"));
        assert!(!xml.contains('\u{1}'));
        let core = part(&doc.to_bytes().unwrap(), "docProps/core.xml");
        assert!(core.contains("<dc:title>Report</dc:title>"));
    }

    #[test]
    fn sections_carry_their_borders() {
        let mut doc = Document::new("Report");
        doc.add_paragraph("front", Align::Left);
        doc.add_section(SectionProps {
            border_color: Some("E5243B".into()),
        });
        doc.add_paragraph("goal one", Align::Left);
        doc.add_section(SectionProps {
            border_color: Some("4C9F38".into()),
        });
        doc.add_paragraph("goal three", Align::Left);
        let xml = doc.document_xml();

        assert_eq!(xml.matches("<w:sectPr>").count(), 3);
        let first_border = xml.find("E5243B").unwrap();
        let goal_one = xml.find("goal one").unwrap();
        let goal_three = xml.find("goal three").unwrap();
        // properties of a section follow its content
        assert!(goal_one < first_border && first_border < goal_three);
        assert!(xml.rfind("4C9F38").unwrap() > goal_three);
        assert_eq!(xml.matches(r#"<w:top w:val="single" w:sz="30""#).count(), 2);
    }

    #[test]
    fn table_has_header_and_rows() {
        let mut doc = Document::new("Report");
        doc.add_table(
            vec!["S.No".into(), "SDG Goal".into(), "Page No.".into()],
            vec![vec!["1".into(), "No Poverty".into(), "3".into()]],
        );
        let xml = doc.document_xml();
        assert_eq!(xml.matches("<w:tr>").count(), 2);
        assert!(xml.contains("<w:b/></w:rPr><w:t xml:space=\"preserve\">S.No</w:t>"));
    }
}
