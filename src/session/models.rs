use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::workflow::{AddressLookupStatus, FieldEdit};
use super::{ContractSession, Preview};
use crate::contract::attachment::AttachmentInfo;
use crate::contract::{
    ContractMetadata, FieldUpdate, FormData, Role, SignatureRecord, SignerInput, ValidationError,
};
use crate::ErrorResponse;

/// Full view of a session after any change.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub form: FormData,
    pub preview: Option<PreviewResponse>,
    pub signatures: Vec<SignatureRecord>,
    pub terms_accepted: bool,
}

impl From<&ContractSession> for SessionSnapshot {
    fn from(session: &ContractSession) -> Self {
        Self {
            id: session.id,
            created_at: session.created_at,
            form: session.form().form_data(),
            preview: session.preview().cloned().map(PreviewResponse::from),
            signatures: session.signatures().cloned().collect(),
            terms_accepted: session.terms_accepted(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PreviewResponse {
    pub content: String,
    pub metadata: ContractMetadata,
}

impl From<Preview> for PreviewResponse {
    fn from(preview: Preview) -> Self {
        Self {
            content: preview.content,
            metadata: preview.metadata,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectTemplateRequest {
    #[serde(rename = "templateId")]
    #[schema(example = "residencial_pf")]
    pub template_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditFieldRequest {
    #[schema(example = "CPF_LOCADOR")]
    pub field: String,
    pub value: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EditFieldResponse {
    pub update: FieldUpdate,
    pub address_lookup: AddressLookupStatus,
    /// Address fields filled from the postal code
    pub filled_fields: Vec<String>,
    pub form: FormData,
}

impl EditFieldResponse {
    pub fn new(edit: FieldEdit, form: FormData) -> Self {
        Self {
            update: edit.update,
            address_lookup: edit.address_lookup,
            filled_fields: edit.filled_fields,
            form,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InspectionTokenRequest {
    /// Blank clears the token
    #[schema(example = "MR3X-VST-2026-AB12CD")]
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentResponse {
    pub attachment: AttachmentInfo,
    /// `data:application/pdf;base64,...` preview of the uploaded report
    pub data_url: String,
}

#[derive(Debug, serde::Deserialize, ToSchema)]
pub struct UploadInspectionRequest {
    #[allow(unused)]
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditPreviewRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignRequest {
    pub role: Role,
    pub name: String,
    #[serde(rename = "taxId")]
    pub tax_id: String,
    pub email: String,
}

impl SignRequest {
    pub fn signer(&self) -> SignerInput {
        SignerInput {
            name: self.name.clone(),
            tax_id: self.tax_id.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShareRequest {
    #[schema(example = "+55 (11) 98888-8888")]
    pub phone: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShareResponse {
    pub token: String,
    pub url: String,
}

/// Field-level validation failures, reported with status 422.
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationFailureResponse {
    pub error: String,
    pub message: String,
    pub errors: Vec<ValidationError>,
    pub timestamp: String,
}

impl ValidationFailureResponse {
    pub fn new(message: &str, errors: Vec<ValidationError>) -> Self {
        let base = ErrorResponse::unprocessable(message);
        Self {
            error: base.error,
            message: base.message,
            errors,
            timestamp: base.timestamp,
        }
    }
}
