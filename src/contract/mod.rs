//! Contract generation core.
//!
//! - `validation` - tax id, phone, email, postal code and date formatters/validators
//! - `fields` - placeholder extraction and field-name classification
//! - `templates` - static template registry
//! - `form` - per-session form state controller
//! - `assembler` - placeholder substitution
//! - `metadata` - token and fingerprint generation
//! - `attachment` - inspection token and PDF upload
//! - `signature` - party signatures
//! - `verification` - authenticity checks
//! - `share` - messaging share links

pub mod assembler;
pub mod attachment;
pub mod fields;
pub mod form;
pub mod metadata;
pub mod share;
pub mod signature;
pub mod templates;
pub mod validation;
pub mod verification;

pub use assembler::assemble;
pub use attachment::{Attachment, AttachmentError, Inspection};
pub use fields::{classify_field, extract_fields, FieldKind};
pub use form::{FieldUpdate, FormData, FormSession};
pub use metadata::{generate_metadata, ContractMetadata};
pub use signature::{Role, SignatureRecord, SignerInput};
pub use templates::{all_templates, template_by_id, Template};
pub use validation::{ValidationError, ValidationErrors};

use thiserror::Error;

/// Errors raised by the form controller.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("nenhum modelo de contrato selecionado")]
    NoTemplate,
    #[error("modelo de contrato '{0}' não existe")]
    UnknownTemplate(String),
    #[error("campo '{0}' não pertence ao modelo selecionado")]
    UnknownField(String),
    #[error(transparent)]
    Inspection(#[from] AttachmentError),
    #[error("{}", .0.to_message())]
    Invalid(ValidationErrors),
}
