//! Per-client contract session.
//!
//! A session owns one form, the current preview with its metadata, the signatures
//! collected over that preview and the terms acceptance flag. Sessions live in the
//! shared cache behind a mutex; the lock is only ever held for synchronous state
//! transitions, never across a lookup or an upload.

pub mod handlers;
pub mod models;
pub mod workflow;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::contract::attachment::Attachment;
use crate::contract::metadata::ContractMetadata;
use crate::contract::signature::{self, Role, SignatureRecord, SignerInput};
use crate::contract::{
    AttachmentError, FieldUpdate, FormData, FormError, FormSession, ValidationError,
    ValidationErrors,
};
use crate::lookup::PostalAddress;
use crate::render::RenderError;

pub type SharedSession = Arc<parking_lot::Mutex<ContractSession>>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("sessão {0} não encontrada")]
    NotFound(Uuid),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error("{}", .0.to_message())]
    Signature(ValidationErrors),
    #[error("gere a pré-visualização do contrato primeiro")]
    NoPreview,
    #[error("o conteúdo do contrato não pode ficar vazio")]
    EmptyContent,
    #[error("aceite os termos de uso antes de exportar")]
    TermsNotAccepted,
    #[error("o contrato foi alterado durante a geração, gere a pré-visualização novamente")]
    Stale,
    #[error("{}", .0.message)]
    Share(ValidationError),
    #[error("erro ao gerar PDF: {0}")]
    Render(#[from] RenderError),
}

/// Assembled text and the metadata generated for exactly that text.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub content: String,
    pub metadata: ContractMetadata,
}

/// Everything an export needs, copied out of the session.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub template_id: String,
    pub content: String,
    pub metadata: ContractMetadata,
    pub signatures: Vec<SignatureRecord>,
    pub form_data: FormData,
    pub inspection_token: Option<String>,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone)]
pub struct ContractSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    form: FormSession,
    preview: Option<Preview>,
    signatures: BTreeMap<Role, SignatureRecord>,
    terms_accepted: bool,
    /// Bumped whenever the form or the preview changes
    revision: u64,
}

impl Default for ContractSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            form: FormSession::new(),
            preview: None,
            signatures: BTreeMap::new(),
            terms_accepted: false,
            revision: 0,
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(parking_lot::Mutex::new(self))
    }

    pub fn form(&self) -> &FormSession {
        &self.form
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn signatures(&self) -> impl Iterator<Item = &SignatureRecord> {
        self.signatures.values()
    }

    pub fn terms_accepted(&self) -> bool {
        self.terms_accepted
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drops the preview and everything derived from it.
    fn discard_preview(&mut self) {
        self.preview = None;
        self.revision += 1;
        self.discard_signatures();
    }

    fn discard_signatures(&mut self) {
        self.signatures.clear();
        self.terms_accepted = false;
    }

    pub fn select_template(&mut self, template_id: &str) -> Result<(), SessionError> {
        self.form.select_template(template_id)?;
        self.discard_preview();
        Ok(())
    }

    pub fn edit_field(&mut self, field: &str, raw: &str) -> Result<FieldUpdate, SessionError> {
        let update = self.form.edit_field(field, raw)?;
        self.discard_preview();
        Ok(update)
    }

    pub fn postal_autofill_target(&self, field: &str) -> Option<String> {
        self.form.postal_autofill_target(field)
    }

    /// Applies a resolved address, unless the postal field changed while the lookup
    /// was in flight.
    pub fn apply_postal_address(
        &mut self,
        postal_field: &str,
        postal_code: &str,
        address: &PostalAddress,
    ) -> Vec<String> {
        if self.form.postal_autofill_target(postal_field).as_deref() != Some(postal_code) {
            log::debug!("Discarding stale postal lookup for {}", postal_field);
            return Vec::new();
        }
        let filled = self.form.apply_postal_address(postal_field, address);
        if !filled.is_empty() {
            self.discard_preview();
        }
        filled
    }

    pub fn set_inspection_token(&mut self, token: &str) -> Result<(), SessionError> {
        self.form.set_inspection_token(token, current_year())?;
        Ok(())
    }

    pub fn attach_inspection(&mut self, attachment: Attachment) {
        self.form.attach_inspection(attachment);
    }

    pub fn remove_inspection_attachment(&mut self) -> bool {
        self.form.remove_inspection_attachment().is_some()
    }

    /// Runs the submit guard and returns the assembled text.
    pub fn assemble(&mut self) -> Result<String, SessionError> {
        Ok(self.form.assemble()?)
    }

    /// Installs a preview generated from the state at `revision`. Signatures and terms
    /// acceptance from an earlier preview are discarded.
    ///
    /// Fails with [`SessionError::Stale`] when the form or the preview changed after
    /// `revision` was read.
    pub fn set_preview(&mut self, revision: u64, preview: Preview) -> Result<(), SessionError> {
        if revision != self.revision {
            return Err(SessionError::Stale);
        }
        self.preview = Some(preview);
        self.revision += 1;
        self.discard_signatures();
        Ok(())
    }

    /// Validates an edited preview text. Returns `None` when the text is unchanged.
    pub fn check_preview_edit(&self, content: &str) -> Result<Option<String>, SessionError> {
        let preview = self.preview.as_ref().ok_or(SessionError::NoPreview)?;
        if content.trim().is_empty() {
            return Err(SessionError::EmptyContent);
        }
        Ok((preview.content != content).then(|| content.to_string()))
    }

    /// Current preview text, for signing.
    pub fn preview_content(&self) -> Result<String, SessionError> {
        self.preview
            .as_ref()
            .map(|p| p.content.clone())
            .ok_or(SessionError::NoPreview)
    }

    /// Records a signature for `role` over `content`, replacing any previous record for
    /// that role. Fails when the preview moved on since `content` was read.
    pub fn sign(
        &mut self,
        role: Role,
        signer: &SignerInput,
        content: &str,
        ip: String,
        at: DateTime<Utc>,
    ) -> Result<SignatureRecord, SessionError> {
        match &self.preview {
            Some(preview) if preview.content == content => {}
            _ => return Err(SessionError::NoPreview),
        }

        let record =
            signature::sign(role, signer, content, ip, at).map_err(SessionError::Signature)?;
        self.signatures.insert(role, record.clone());
        Ok(record)
    }

    pub fn accept_terms(&mut self) -> Result<(), SessionError> {
        if self.preview.is_none() {
            return Err(SessionError::NoPreview);
        }
        self.terms_accepted = true;
        Ok(())
    }

    pub fn export_job(&self) -> Result<ExportJob, SessionError> {
        let preview = self.preview.as_ref().ok_or(SessionError::NoPreview)?;
        if !self.terms_accepted {
            return Err(SessionError::TermsNotAccepted);
        }
        let template = self.form.template().ok_or(FormError::NoTemplate)?;
        let inspection = self.form.inspection();

        Ok(ExportJob {
            template_id: template.id.to_string(),
            content: preview.content.clone(),
            metadata: preview.metadata.clone(),
            signatures: self.signatures.values().cloned().collect(),
            form_data: self.form.form_data(),
            inspection_token: inspection.token().map(str::to_string),
            attachment: inspection.attachment().cloned(),
        })
    }
}

pub fn current_year() -> i32 {
    use chrono::Datelike;
    Utc::now().year()
}
