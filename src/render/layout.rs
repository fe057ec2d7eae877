//! Print layout of a contract and its slicing into A4 pages.
//!
//! The whole document is first laid out as one tall column of lines (millimetres from
//! the top of the content area). Pages are then cut as fixed-height bands of that
//! column, so the page count is `ceil(content height / page content height)`.

use chrono::DateTime;

use super::qr::QR_SIZE_MM;
use crate::contract::signature::SignatureRecord;
use crate::contract::ContractMetadata;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_LEFT_MM: f32 = 15.0;
pub const MARGIN_RIGHT_MM: f32 = 10.0;
pub const MARGIN_TOP_MM: f32 = 20.0;
pub const MARGIN_BOTTOM_MM: f32 = 20.0;
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - MARGIN_LEFT_MM - MARGIN_RIGHT_MM;
pub const CONTENT_HEIGHT_MM: f32 = PAGE_HEIGHT_MM - MARGIN_TOP_MM - MARGIN_BOTTOM_MM;

pub const MM_PER_PT: f32 = 25.4 / 72.0;
const LINE_HEIGHT_FACTOR: f32 = 1.4;
/// Average Helvetica advance, as a fraction of the font size.
const AVG_CHAR_WIDTH_EM: f32 = 0.5;

const TITLE_SIZE: f32 = 20.0;
const HEADING_SIZE: f32 = 11.0;
const BODY_SIZE: f32 = 10.0;
const SMALL_SIZE: f32 = 8.0;

const BOLD_MARKERS: &[&str] = &["CLÁUSULA", "CONTRATO", "LOCADOR", "LOCATÁRIO"];

const TAGLINE: &str = "MR3X - Tecnologia em Gestão de Pagamentos e Cobranças de Aluguéis";
const COMPANY_LINE: &str = "MR3X TECNOLOGIA LTDA • CNPJ: 27.960.990/0001-66";
const DISCLAIMER: &str = "A MR3X atua apenas como plataforma tecnológica para geração e armazenamento deste documento. Todo o conteúdo, termos, valores e informações aqui inseridos são de responsabilidade exclusiva das partes. A MR3X não revisa, valida ou participa de negociações, nem responde por inadimplência, descumprimento ou qualquer acordo firmado entre os envolvidos.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    pub align: Align,
    /// Distance from the top of the content column
    pub top_mm: f32,
}

impl Line {
    pub fn height_mm(&self) -> f32 {
        line_height_mm(self.size)
    }
}

const QR_GAP_MM: f32 = 4.0;

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub lines: Vec<Line>,
    pub height_mm: f32,
    /// Top of the verification QR code, right-aligned in the metadata block
    pub qr_top_mm: f32,
}

/// Left edge of the verification QR code.
pub const QR_X_MM: f32 = MARGIN_LEFT_MM + CONTENT_WIDTH_MM - QR_SIZE_MM;

/// A line positioned on a specific page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine<'a> {
    pub line: &'a Line,
    /// Distance from the top of the page's content area
    pub top_mm: f32,
}

/// Everything printed on an exported contract.
#[derive(Debug, Clone)]
pub struct PrintDocument<'a> {
    pub content: &'a str,
    pub metadata: &'a ContractMetadata,
    pub signatures: &'a [SignatureRecord],
    pub inspection_token: Option<&'a str>,
    pub inspection_filename: Option<&'a str>,
    pub agency_name: Option<&'a str>,
    pub verify_url: String,
}

pub fn line_height_mm(size_pt: f32) -> f32 {
    size_pt * LINE_HEIGHT_FACTOR * MM_PER_PT
}

/// Greedy word wrap against an average glyph width. Words longer than a full line
/// are split.
pub fn wrap_text(text: &str, size_pt: f32, width_mm: f32) -> Vec<String> {
    let char_width = size_pt * AVG_CHAR_WIDTH_EM * MM_PER_PT;
    let max_chars = ((width_mm / char_width).floor() as usize).max(1);

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

struct LayoutBuilder {
    lines: Vec<Line>,
    cursor: f32,
}

impl LayoutBuilder {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            cursor: 0.0,
        }
    }

    fn text(&mut self, text: &str, size: f32, bold: bool, align: Align) {
        self.text_within(text, size, bold, align, CONTENT_WIDTH_MM);
    }

    fn text_within(&mut self, text: &str, size: f32, bold: bool, align: Align, width_mm: f32) {
        for wrapped in wrap_text(text, size, width_mm) {
            self.lines.push(Line {
                text: wrapped,
                size,
                bold,
                align,
                top_mm: self.cursor,
            });
            self.cursor += line_height_mm(size);
        }
    }

    fn gap(&mut self, mm: f32) {
        self.cursor += mm;
    }

    fn finish(self, qr_top_mm: f32) -> Layout {
        Layout {
            lines: self.lines,
            height_mm: self.cursor,
            qr_top_mm,
        }
    }
}

fn display_instant(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|at| at.format("%d/%m/%Y %H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

fn is_emphasized(line: &str) -> bool {
    line.starts_with("**") || BOLD_MARKERS.iter().any(|marker| line.contains(marker))
}

/// Lays out the whole document as a single column.
pub fn layout_document(doc: &PrintDocument<'_>) -> Layout {
    let mut out = LayoutBuilder::new();

    out.text("CONTRATO", TITLE_SIZE, true, Align::Center);
    out.text(&TAGLINE.to_uppercase(), SMALL_SIZE, true, Align::Center);
    if let Some(agency) = doc.agency_name.filter(|a| !a.trim().is_empty()) {
        out.gap(2.0);
        out.text(agency, BODY_SIZE, true, Align::Center);
    }
    out.gap(6.0);

    let metadata = doc.metadata;
    let qr_top = out.cursor;
    let beside_qr = CONTENT_WIDTH_MM - QR_SIZE_MM - QR_GAP_MM;
    out.text_within(
        &format!(
            "Token: {} | Data: {}",
            metadata.token,
            display_instant(&metadata.timestamp)
        ),
        SMALL_SIZE,
        false,
        Align::Left,
        beside_qr,
    );
    out.text_within("Hash SHA-256:", SMALL_SIZE, true, Align::Left, beside_qr);
    out.text_within(&metadata.hash, SMALL_SIZE, false, Align::Left, beside_qr);
    out.text_within(&format!("IP: {}", metadata.ip), SMALL_SIZE, false, Align::Left, beside_qr);
    out.text_within(
        "Escaneie o QR Code para verificar a autenticidade",
        SMALL_SIZE,
        false,
        Align::Left,
        beside_qr,
    );
    out.cursor = out.cursor.max(qr_top + QR_SIZE_MM);
    out.gap(4.0);

    if doc.inspection_token.is_none() && doc.inspection_filename.is_none() {
        out.text(
            "ATENÇÃO: Termo de Vistoria Não Anexado",
            BODY_SIZE,
            true,
            Align::Left,
        );
        out.text(
            "Não há termo de vistoria vinculado a este contrato. Recomenda-se anexar o PDF do termo de vistoria ou informar o token correspondente.",
            SMALL_SIZE,
            false,
            Align::Left,
        );
    } else {
        out.text("Termo de Vistoria", BODY_SIZE, true, Align::Left);
        if let Some(token) = doc.inspection_token {
            out.text(&format!("Token: {}", token), SMALL_SIZE, false, Align::Left);
        }
        if let Some(filename) = doc.inspection_filename {
            out.text(&format!("PDF Anexado: {}", filename), SMALL_SIZE, false, Align::Left);
        }
    }
    out.gap(6.0);

    for raw in doc.content.lines() {
        if raw.trim().is_empty() {
            out.gap(line_height_mm(BODY_SIZE));
            continue;
        }
        let bold = is_emphasized(raw);
        out.text(&raw.replace("**", ""), BODY_SIZE, bold, Align::Left);
    }

    if !doc.signatures.is_empty() {
        out.gap(8.0);
        out.text("Assinaturas Digitais", HEADING_SIZE, true, Align::Left);
        for signature in doc.signatures {
            out.gap(2.0);
            out.text(signature.role.label(), BODY_SIZE, true, Align::Left);
            out.text(&format!("Nome: {}", signature.name), SMALL_SIZE, false, Align::Left);
            out.text(&format!("CPF: {}", signature.tax_id), SMALL_SIZE, false, Align::Left);
            out.text(&format!("E-mail: {}", signature.email), SMALL_SIZE, false, Align::Left);
            out.text(&format!("IP: {}", signature.ip), SMALL_SIZE, false, Align::Left);
            out.text(
                &format!("Data/Hora: {}", display_instant(&signature.timestamp)),
                SMALL_SIZE,
                false,
                Align::Left,
            );
            let short_hash: String = signature.hash.chars().take(32).collect();
            out.text(&format!("Hash: {}...", short_hash), SMALL_SIZE, false, Align::Left);
        }
    }

    out.gap(8.0);
    out.text(COMPANY_LINE, SMALL_SIZE, true, Align::Center);
    out.text(
        "Documento protegido por criptografia SHA-256 e tokens únicos",
        SMALL_SIZE,
        false,
        Align::Center,
    );
    out.text(
        &format!("Verificação de autenticidade: {}", doc.verify_url),
        SMALL_SIZE,
        false,
        Align::Center,
    );
    out.gap(3.0);
    out.text(DISCLAIMER, SMALL_SIZE - 1.0, false, Align::Left);

    out.finish(qr_top)
}

/// `ceil(height / page content height)`, and never less than one page.
pub fn page_count(height_mm: f32) -> usize {
    ((height_mm / CONTENT_HEIGHT_MM).ceil() as usize).max(1)
}

/// Page index and page-relative top for a position in the column of a layout that
/// spans `pages` pages.
pub fn page_position(top_mm: f32, pages: usize) -> (usize, f32) {
    let index = ((top_mm / CONTENT_HEIGHT_MM).floor() as usize).min(pages.saturating_sub(1));
    (index, top_mm - index as f32 * CONTENT_HEIGHT_MM)
}

/// Cuts the column into pages. A line lands on the page its top falls in.
pub fn paginate(layout: &Layout) -> Vec<Vec<PlacedLine<'_>>> {
    let mut pages: Vec<Vec<PlacedLine<'_>>> = vec![Vec::new(); page_count(layout.height_mm)];

    for line in &layout.lines {
        let (index, top_mm) = page_position(line.top_mm, pages.len());
        pages[index].push(PlacedLine { line, top_mm });
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ContractMetadata {
        ContractMetadata {
            token: "MR3X-CTR-2026-ABC".to_string(),
            hash: "f".repeat(64),
            ip: "10.0.0.1".to_string(),
            timestamp: "2026-01-02T03:04:05.000Z".to_string(),
        }
    }

    fn document<'a>(content: &'a str, metadata: &'a ContractMetadata) -> PrintDocument<'a> {
        PrintDocument {
            content,
            metadata,
            signatures: &[],
            inspection_token: None,
            inspection_filename: None,
            agency_name: None,
            verify_url: "https://mr3x.com.br/verify/x".to_string(),
        }
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let text = "palavra ".repeat(100);
        let lines = wrap_text(&text, 10.0, 50.0);
        let max_chars = (50.0 / (10.0 * AVG_CHAR_WIDTH_EM * MM_PER_PT)).floor() as usize;
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= max_chars));
        assert_eq!(lines.join(" "), text.trim_end());
    }

    #[test]
    fn test_wrap_text_splits_long_words() {
        let long = "x".repeat(300);
        let lines = wrap_text(&long, 10.0, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), long);
        assert_eq!(wrap_text("", 10.0, 50.0), vec![String::new()]);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0.0), 1);
        assert_eq!(page_count(CONTENT_HEIGHT_MM), 1);
        assert_eq!(page_count(CONTENT_HEIGHT_MM + 0.1), 2);
        assert_eq!(page_count(CONTENT_HEIGHT_MM * 3.0 - 1.0), 3);
    }

    #[test]
    fn test_paginate_keeps_every_line() {
        let metadata = metadata();
        let content = "CLÁUSULA 1\nTexto da cláusula.\n\n".repeat(120);
        let layout = layout_document(&document(&content, &metadata));
        let pages = paginate(&layout);

        assert_eq!(pages.len(), page_count(layout.height_mm));
        assert!(pages.len() > 1);
        let placed: usize = pages.iter().map(Vec::len).sum();
        assert_eq!(placed, layout.lines.len());
        assert!(pages
            .iter()
            .flatten()
            .all(|p| p.top_mm >= 0.0 && p.top_mm < CONTENT_HEIGHT_MM));
    }

    #[test]
    fn test_layout_marks_emphasis_and_inspection_warning() {
        let metadata = metadata();
        let layout = layout_document(&document("**Título**\nCLÁUSULA 2\ncomum", &metadata));

        let find = |text: &str| layout.lines.iter().find(|l| l.text == text).cloned();
        assert!(find("Título").unwrap().bold);
        assert!(find("CLÁUSULA 2").unwrap().bold);
        assert!(!find("comum").unwrap().bold);
        assert!(find("ATENÇÃO: Termo de Vistoria Não Anexado").is_some());
        assert!(find("Token: MR3X-CTR-2026-ABC | Data: 02/01/2026 03:04:05").is_some());
    }

    #[test]
    fn test_metadata_block_leaves_room_for_qr() {
        let metadata = metadata();
        let layout = layout_document(&document("corpo", &metadata));

        assert_eq!(page_position(layout.qr_top_mm, 1), (0, layout.qr_top_mm));
        let hash_line = layout.lines.iter().find(|l| l.text == metadata.hash).unwrap();
        assert!(hash_line.top_mm >= layout.qr_top_mm);
        assert!(hash_line.top_mm < layout.qr_top_mm + QR_SIZE_MM);

        let after_block = layout
            .lines
            .iter()
            .find(|l| l.text == "ATENÇÃO: Termo de Vistoria Não Anexado")
            .unwrap();
        assert!(after_block.top_mm >= layout.qr_top_mm + QR_SIZE_MM);
        assert!(QR_X_MM + QR_SIZE_MM <= PAGE_WIDTH_MM - MARGIN_RIGHT_MM + f32::EPSILON);
    }
}
