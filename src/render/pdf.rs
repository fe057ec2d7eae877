//! PDF export.
//!
//! The document is assembled in memory and only handed out once complete, so a failed
//! export never yields a truncated file.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::barcode::{SideBarcode, BARCODE_WIDTH_MM, BARCODE_X_MM};
use super::layout::{
    layout_document, page_position, paginate, Align, PlacedLine, PrintDocument,
    CONTENT_WIDTH_MM, MARGIN_LEFT_MM, MARGIN_TOP_MM, MM_PER_PT, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
    QR_X_MM,
};
use super::qr::{VerifyQr, QR_SIZE_MM, QUIET_ZONE_MODULES};
use super::RenderError;

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";
const WATERMARK: &str = "CONFIDENCIAL";
const WATERMARK_SIZE: f32 = 64.0;
const WATERMARK_GRAY: f32 = 0.92;
const PAGE_NUMBER_SIZE: f32 = 7.0;

/// A finished export.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Height of the laid-out content column
    pub content_height_mm: f32,
}

pub fn export_filename(token: &str) -> String {
    format!("contrato-mr3x-{}.pdf", token)
}

fn pt(mm: f32) -> f32 {
    mm / MM_PER_PT
}

/// Maps text onto WinAnsiEncoding, replacing anything it cannot represent with `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn text_object(text: &str) -> Object {
    Object::String(win_ansi(text), StringFormat::Hexadecimal)
}

fn estimated_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * MM_PER_PT
}

fn draw_text(ops: &mut Vec<Operation>, text: &str, font: &str, size: f32, x_mm: f32, baseline_mm: f32) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new(
        "Td",
        vec![pt(x_mm).into(), pt(PAGE_HEIGHT_MM - baseline_mm).into()],
    ));
    ops.push(Operation::new("Tj", vec![text_object(text)]));
    ops.push(Operation::new("ET", vec![]));
}

fn draw_watermark(ops: &mut Vec<Operation>) {
    let (sin, cos) = std::f32::consts::FRAC_PI_4.sin_cos();
    let half = estimated_width_mm(WATERMARK, WATERMARK_SIZE) / 2.0;
    let x = PAGE_WIDTH_MM / 2.0 - half * cos;
    let y = PAGE_HEIGHT_MM / 2.0 - half * sin;

    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("g", vec![WATERMARK_GRAY.into()]));
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![BOLD_FONT.into(), WATERMARK_SIZE.into()]));
    ops.push(Operation::new(
        "Tm",
        vec![
            cos.into(),
            sin.into(),
            (-sin).into(),
            cos.into(),
            pt(x).into(),
            pt(y).into(),
        ],
    ));
    ops.push(Operation::new("Tj", vec![text_object(WATERMARK)]));
    ops.push(Operation::new("ET", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

fn draw_barcode(ops: &mut Vec<Operation>, barcode: &SideBarcode) {
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("g", vec![0.into()]));
    for bar in &barcode.bars {
        ops.push(Operation::new(
            "re",
            vec![
                pt(BARCODE_X_MM).into(),
                pt(PAGE_HEIGHT_MM - bar.y_mm - bar.height_mm).into(),
                pt(BARCODE_WIDTH_MM).into(),
                pt(bar.height_mm).into(),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
    }
    ops.push(Operation::new("Q", vec![]));
}

/// Draws `qr` with its top-left corner `top_mm` below the top of the page.
fn draw_qr(ops: &mut Vec<Operation>, qr: &VerifyQr, top_mm: f32) {
    let module = qr.module_mm();
    let origin = module * QUIET_ZONE_MODULES as f32;

    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("g", vec![1.into()]));
    ops.push(Operation::new(
        "re",
        vec![
            pt(QR_X_MM).into(),
            pt(PAGE_HEIGHT_MM - top_mm - QR_SIZE_MM).into(),
            pt(QR_SIZE_MM).into(),
            pt(QR_SIZE_MM).into(),
        ],
    ));
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("g", vec![0.into()]));
    for run in qr.runs() {
        let x = QR_X_MM + origin + run.x as f32 * module;
        let y = top_mm + origin + (run.y + 1) as f32 * module;
        ops.push(Operation::new(
            "re",
            vec![
                pt(x).into(),
                pt(PAGE_HEIGHT_MM - y).into(),
                pt(run.len as f32 * module).into(),
                pt(module).into(),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
    }
    ops.push(Operation::new("Q", vec![]));
}

/// Top of the QR code on the page that carries it.
struct QrPlacement<'a> {
    qr: &'a VerifyQr,
    top_mm: f32,
}

fn page_operations(
    lines: &[PlacedLine<'_>],
    barcode: &SideBarcode,
    qr: Option<&QrPlacement<'_>>,
    page_number: usize,
    page_total: usize,
) -> Vec<Operation> {
    let mut ops = Vec::new();
    draw_watermark(&mut ops);
    draw_barcode(&mut ops, barcode);
    if let Some(placement) = qr {
        draw_qr(&mut ops, placement.qr, MARGIN_TOP_MM + placement.top_mm);
    }

    ops.push(Operation::new("g", vec![0.into()]));
    for placed in lines {
        let line = placed.line;
        let font = if line.bold { BOLD_FONT } else { REGULAR_FONT };
        let x = match line.align {
            Align::Left => MARGIN_LEFT_MM,
            Align::Center => {
                let slack = (CONTENT_WIDTH_MM - estimated_width_mm(&line.text, line.size)).max(0.0);
                MARGIN_LEFT_MM + slack / 2.0
            }
        };
        let baseline = MARGIN_TOP_MM + placed.top_mm + line.size * MM_PER_PT;
        draw_text(&mut ops, &line.text, font, line.size, x, baseline);
    }

    let label = format!("Página {} de {}", page_number, page_total);
    let x = (PAGE_WIDTH_MM - estimated_width_mm(&label, PAGE_NUMBER_SIZE)) / 2.0;
    draw_text(&mut ops, &label, REGULAR_FONT, PAGE_NUMBER_SIZE, x, PAGE_HEIGHT_MM - 8.0);

    ops
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Lays out and renders `doc` as an A4 PDF.
pub fn render_pdf(doc: &PrintDocument<'_>) -> Result<RenderedPdf, RenderError> {
    let layout = layout_document(doc);
    let pages = paginate(&layout);
    let barcode = SideBarcode::random();
    let qr = VerifyQr::encode(&doc.verify_url)?;
    let (qr_page, qr_top_mm) = page_position(layout.qr_top_mm, pages.len());
    let qr_placement = QrPlacement {
        qr: &qr,
        top_mm: qr_top_mm,
    };

    let mut pdf = Document::with_version("1.5");
    let pages_id: ObjectId = pdf.new_object_id();
    let regular_id = pdf.add_object(font("Helvetica"));
    let bold_id = pdf.add_object(font("Helvetica-Bold"));
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR_FONT => regular_id,
            BOLD_FONT => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (index, lines) in pages.iter().enumerate() {
        let content = Content {
            operations: page_operations(
                lines,
                &barcode,
                (index == qr_page).then_some(&qr_placement),
                index + 1,
                pages.len(),
            ),
        };
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), pt(PAGE_WIDTH_MM).into(), pt(PAGE_HEIGHT_MM).into()],
    };
    pdf.objects.insert(pages_id, Object::Dictionary(page_tree));

    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);
    pdf.trailer.set("Creator", Object::string_literal("contract-generator-server"));
    pdf.compress();

    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes).map_err(lopdf::Error::from)?;

    log::debug!(
        "Rendered {} page(s) for {} ({} bytes)",
        pages.len(),
        doc.metadata.token,
        bytes.len()
    );

    Ok(RenderedPdf {
        filename: export_filename(&doc.metadata.token),
        bytes,
        page_count: pages.len(),
        content_height_mm: layout.height_mm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractMetadata;
    use crate::render::layout::{page_count, CONTENT_HEIGHT_MM};

    fn metadata() -> ContractMetadata {
        ContractMetadata {
            token: "MR3X-CTR-2026-TEST".to_string(),
            hash: "0".repeat(64),
            ip: "0.0.0.0".to_string(),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn print(content: &str, metadata: &ContractMetadata) -> RenderedPdf {
        render_pdf(&PrintDocument {
            content,
            metadata,
            signatures: &[],
            inspection_token: Some("MR3X-VST-2026-X1"),
            inspection_filename: None,
            agency_name: Some("Imobiliária Exemplo"),
            verify_url: "https://mr3x.com.br/verify/abc".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("ação"), vec![b'a', 0xE7, 0xE3, b'o']);
        assert_eq!(win_ansi("•"), vec![0x95]);
        assert_eq!(win_ansi("✓"), vec![b'?']);
    }

    #[test]
    fn test_single_page_document() {
        let metadata = metadata();
        let pdf = print("CLÁUSULA 1\nCurta.", &metadata);
        assert_eq!(pdf.filename, "contrato-mr3x-MR3X-CTR-2026-TEST.pdf");
        assert_eq!(pdf.page_count, 1);
        assert!(pdf.bytes.starts_with(b"%PDF-1.5"));

        let parsed = Document::load_mem(&pdf.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn test_page_count_follows_content_height() {
        let metadata = metadata();
        let content = "Linha de conteúdo do contrato.\n".repeat(400);
        let pdf = print(&content, &metadata);

        let expected = (pdf.content_height_mm / CONTENT_HEIGHT_MM).ceil() as usize;
        assert_eq!(pdf.page_count, expected);
        assert_eq!(pdf.page_count, page_count(pdf.content_height_mm));
        assert!(pdf.page_count > 1);

        let parsed = Document::load_mem(&pdf.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), pdf.page_count);
    }

    #[test]
    fn test_qr_is_drawn_once_on_the_first_page() {
        let metadata = metadata();
        let content = "Linha de conteúdo do contrato.\n".repeat(400);
        let doc = PrintDocument {
            content: &content,
            metadata: &metadata,
            signatures: &[],
            inspection_token: None,
            inspection_filename: None,
            agency_name: None,
            verify_url: "https://mr3x.com.br/verify/abc".to_string(),
        };
        let layout = layout_document(&doc);
        let pages = paginate(&layout);
        let barcode = SideBarcode::random();
        let qr = VerifyQr::encode(&doc.verify_url).unwrap();
        let placement = QrPlacement {
            qr: &qr,
            top_mm: layout.qr_top_mm,
        };

        let count_fills = |ops: &[Operation]| ops.iter().filter(|op| op.operator == "re").count();
        let first = page_operations(&pages[0], &barcode, Some(&placement), 1, pages.len());
        let second = page_operations(&pages[1], &barcode, None, 2, pages.len());

        assert_eq!(count_fills(&second), barcode.bars.len());
        assert_eq!(
            count_fills(&first),
            barcode.bars.len() + 1 + qr.runs().len()
        );

        let pdf = render_pdf(&doc).unwrap();
        let parsed = Document::load_mem(&pdf.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), pages.len());
    }
}
