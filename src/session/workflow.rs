//! Session operations that reach out to collaborators.
//!
//! Each operation reads what it needs under the session lock, releases it, awaits the
//! lookup or upload, and then re-acquires the lock to commit.

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::{ExportJob, Preview, SessionError, SharedSession};
use crate::archive::models::{ContractRecord, NewContract};
use crate::contract::metadata::generate_metadata;
use crate::contract::share::verify_url;
use crate::contract::{FieldUpdate, Role, SignatureRecord, SignerInput};
use crate::db::AppState;
use crate::lookup::{resolve_address, LookupError};
use crate::render::{render_pdf, PrintDocument, RenderedPdf};

/// Outcome of the postal auto-fill attempted after a field edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AddressLookupStatus {
    NotRequested,
    Filled,
    NotFound,
    Failed,
}

#[derive(Debug, Clone)]
pub struct FieldEdit {
    pub update: FieldUpdate,
    pub address_lookup: AddressLookupStatus,
    pub filled_fields: Vec<String>,
}

/// Edits one field and, for a complete postal code, fills the paired address fields.
pub async fn edit_field(
    state: &AppState,
    session: &SharedSession,
    field: &str,
    raw: &str,
) -> Result<FieldEdit, SessionError> {
    let (update, postal_code) = {
        let mut guard = session.lock();
        let update = guard.edit_field(field, raw)?;
        let postal_code = guard.postal_autofill_target(field);
        (update, postal_code)
    };

    let Some(postal_code) = postal_code else {
        return Ok(FieldEdit {
            update,
            address_lookup: AddressLookupStatus::NotRequested,
            filled_fields: Vec::new(),
        });
    };

    let (address_lookup, filled_fields) = match state.postal_lookup.lookup(&postal_code).await {
        Ok(address) => {
            let filled = session
                .lock()
                .apply_postal_address(field, &postal_code, &address);
            log::debug!("Postal code {} filled {:?}", postal_code, filled);
            (AddressLookupStatus::Filled, filled)
        }
        Err(LookupError::NotFound(_)) | Err(LookupError::InvalidPostalCode(_)) => {
            log::warn!("Postal code {} not found", postal_code);
            (AddressLookupStatus::NotFound, Vec::new())
        }
        Err(e) => {
            log::warn!("Postal lookup for {} failed: {}", postal_code, e);
            (AddressLookupStatus::Failed, Vec::new())
        }
    };

    Ok(FieldEdit {
        update,
        address_lookup,
        filled_fields,
    })
}

/// Runs the submit guard, assembles the contract and stamps fresh metadata on it.
///
/// Fails with [`SessionError::Stale`] when the form changed during the address lookup.
pub async fn open_preview(state: &AppState, session: &SharedSession) -> Result<Preview, SessionError> {
    let (content, revision) = {
        let mut guard = session.lock();
        (guard.assemble()?, guard.revision())
    };
    let metadata = generate_metadata(&content, state.address_lookup.as_ref()).await;

    let preview = Preview { content, metadata };
    session.lock().set_preview(revision, preview.clone()).map_err(|e| {
        log::warn!("Discarding preview {}: session changed", preview.metadata.token);
        e
    })?;
    log::info!("Preview generated with token {}", preview.metadata.token);
    Ok(preview)
}

/// Replaces the preview text. Unchanged text keeps the current metadata and signatures.
pub async fn edit_preview(
    state: &AppState,
    session: &SharedSession,
    content: &str,
) -> Result<Preview, SessionError> {
    let (changed, revision) = {
        let guard = session.lock();
        (guard.check_preview_edit(content)?, guard.revision())
    };
    let Some(content) = changed else {
        return session
            .lock()
            .preview()
            .cloned()
            .ok_or(SessionError::NoPreview);
    };

    let metadata = generate_metadata(&content, state.address_lookup.as_ref()).await;

    let preview = Preview { content, metadata };
    session.lock().set_preview(revision, preview.clone()).map_err(|e| {
        log::warn!("Discarding edited preview {}: session changed", preview.metadata.token);
        e
    })?;
    log::info!("Preview edited, new token {}", preview.metadata.token);
    Ok(preview)
}

pub async fn sign(
    state: &AppState,
    session: &SharedSession,
    role: Role,
    signer: &SignerInput,
) -> Result<SignatureRecord, SessionError> {
    signer.validate().map_err(SessionError::Signature)?;
    let content = session.lock().preview_content()?;

    let ip = resolve_address(state.address_lookup.as_ref()).await;
    let record = session.lock().sign(role, signer, &content, ip, Utc::now())?;
    log::info!("Contract signed as {}", role.label());
    Ok(record)
}

/// A rendered export and, when persistence succeeded, the stored record.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub pdf: RenderedPdf,
    pub record: Option<ContractRecord>,
}

pub fn print_document<'a>(job: &'a ExportJob, state: &'a AppState) -> PrintDocument<'a> {
    PrintDocument {
        content: &job.content,
        metadata: &job.metadata,
        signatures: &job.signatures,
        inspection_token: job.inspection_token.as_deref(),
        inspection_filename: job.attachment.as_ref().map(|a| a.filename()),
        agency_name: state.config.agency_name.as_deref(),
        verify_url: verify_url(&state.config.verify_base_url, &job.metadata.hash),
    }
}

/// Renders the contract, uploads the inspection report and archives the record.
///
/// Only rendering failures are returned. Upload and persistence failures are logged and
/// the rendered PDF is still handed back.
pub async fn export(state: &AppState, session: &SharedSession) -> Result<ExportOutcome, SessionError> {
    let job = session.lock().export_job()?;

    let pdf = render_pdf(&print_document(&job, state)).map_err(|e| {
        log::error!("Failed to render contract {}: {}", job.metadata.token, e);
        e
    })?;
    log::info!(
        "Rendered {} ({} pages, {} bytes)",
        pdf.filename,
        pdf.page_count,
        pdf.bytes.len()
    );

    let uploaded = upload_inspection(state, &job).await;
    let inspection_pdf_url = uploaded
        .as_ref()
        .and_then(|name| state.storage.as_ref().map(|s| s.get_asset_url(name)));

    let form_data = match serde_json::to_value(&job.form_data) {
        Ok(value) => value,
        Err(e) => {
            log::error!("Failed to serialize form data for {}: {}", job.metadata.token, e);
            serde_json::Value::Null
        }
    };

    let contract = NewContract {
        token: job.metadata.token.clone(),
        hash: job.metadata.hash.clone(),
        contract_type: job.template_id.clone(),
        content: job.content.clone(),
        form_data,
        inspection_token: job.inspection_token.clone(),
        inspection_pdf_url,
    };

    let record = match state.insert_contract(contract).await {
        Ok(record) => Some(record),
        Err(e) => {
            log::error!("Failed to archive contract {}: {}", job.metadata.token, e);
            if let (Some(name), Some(storage)) = (uploaded.as_deref(), state.storage.as_ref()) {
                if let Err(e) = storage.delete_file(name).await {
                    log::warn!("Orphaned inspection report {} left in storage: {}", name, e);
                }
            }
            None
        }
    };

    Ok(ExportOutcome { pdf, record })
}

/// Uploads the inspection report, returning the object name on success.
async fn upload_inspection(state: &AppState, job: &ExportJob) -> Option<String> {
    let attachment = job.attachment.as_ref()?;
    let Some(storage) = state.storage.as_ref() else {
        log::debug!("No object storage configured, inspection report not uploaded");
        return None;
    };

    let object_name = format!("inspections/{}-{}", job.metadata.token, attachment.filename());
    match storage.upload_file(&object_name, attachment.bytes()).await {
        Ok(()) => Some(object_name),
        Err(e) => {
            log::error!("Failed to upload inspection report {}: {}", object_name, e);
            None
        }
    }
}
