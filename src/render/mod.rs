//! Print layout and PDF export.

pub mod barcode;
pub mod layout;
pub mod pdf;
pub mod qr;

pub use layout::{layout_document, page_count, paginate, PrintDocument};
pub use pdf::{export_filename, render_pdf, RenderedPdf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to build PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to encode verification QR code: {0}")]
    Qr(#[from] qrcode::types::QrError),
}
