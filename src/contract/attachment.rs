//! Inspection report attached to a contract session.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::validation::validate_inspection_token;

pub const MAX_ATTACHMENT_BYTES: usize = 20 * 1024 * 1024;
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error, PartialEq)]
pub enum AttachmentError {
    #[error("apenas arquivos PDF são aceitos (recebido '{0}')")]
    NotPdf(String),
    #[error("arquivo excede o limite de 20MB ({0} bytes)")]
    TooLarge(usize),
    #[error("arquivo vazio")]
    Empty,
    #[error("token de vistoria inválido: '{0}'")]
    InvalidToken(String),
}

/// An accepted PDF upload. Only constructible through [`Attachment::accept`].
#[derive(Debug, Clone)]
pub struct Attachment {
    filename: String,
    bytes: Vec<u8>,
    uploaded_at: DateTime<Utc>,
}

impl Attachment {
    /// Checks size and type before taking ownership of the upload.
    pub fn accept(
        filename: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, AttachmentError> {
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentError::TooLarge(bytes.len()));
        }

        let declared = content_type.unwrap_or_default();
        let essence = declared.split(';').next().unwrap_or_default().trim();
        if !essence.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
            return Err(AttachmentError::NotPdf(declared.to_string()));
        }
        if bytes.is_empty() {
            return Err(AttachmentError::Empty);
        }
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(AttachmentError::NotPdf(declared.to_string()));
        }

        Ok(Self {
            filename: sanitize_filename::sanitize(filename),
            bytes,
            uploaded_at: Utc::now(),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `data:application/pdf;base64,...` preview of the document.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", PDF_CONTENT_TYPE, STANDARD.encode(&self.bytes))
    }

    pub fn info(&self) -> AttachmentInfo {
        AttachmentInfo {
            filename: self.filename.clone(),
            size: self.bytes.len(),
            uploaded_at: self.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttachmentInfo {
    pub filename: String,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Inspection evidence: a report token, an uploaded report, both or neither.
#[derive(Debug, Clone, Default)]
pub struct Inspection {
    token: Option<String>,
    attachment: Option<Attachment>,
}

impl Inspection {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Sets the token, or clears it when `token` is blank. An invalid token leaves
    /// the current one in place.
    pub fn set_token(&mut self, token: &str, year: i32) -> Result<(), AttachmentError> {
        let token = token.trim().to_ascii_uppercase();
        if token.is_empty() {
            self.token = None;
            return Ok(());
        }
        if !validate_inspection_token(&token, year) {
            return Err(AttachmentError::InvalidToken(token));
        }
        self.token = Some(token);
        Ok(())
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    pub fn remove_attachment(&mut self) -> Option<Attachment> {
        self.attachment.take()
    }
}
