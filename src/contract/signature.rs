//! Party signatures over the previewed contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::fields::FieldKind;
use super::metadata::{fingerprint, to_iso8601};
use super::validation::{validate_required, ValidationError, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Locador
    Landlord,
    /// Locatário
    Tenant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Landlord => "LOCADOR",
            Role::Tenant => "LOCATÁRIO",
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignerInput {
    pub name: String,
    #[serde(rename = "taxId")]
    pub tax_id: String,
    pub email: String,
}

impl SignerInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_required(&self.name, "name", "Nome", &mut errors);
        validate_required(&self.tax_id, "taxId", "CPF", &mut errors);
        validate_required(&self.email, "email", "E-mail", &mut errors);

        if !self.email.trim().is_empty() && !FieldKind::Email.is_valid(self.email.trim()) {
            errors.add(ValidationError::invalid_email("email"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A signature as recorded at signing time. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SignatureRecord {
    pub name: String,
    #[serde(rename = "taxId")]
    pub tax_id: String,
    pub email: String,
    pub ip: String,
    pub timestamp: String,
    pub hash: String,
    pub role: Role,
}

/// Signs `content` on behalf of `role`.
///
/// The fingerprint covers `name|taxId|email|content`, the address and the instant.
pub fn sign(
    role: Role,
    signer: &SignerInput,
    content: &str,
    ip: String,
    at: DateTime<Utc>,
) -> Result<SignatureRecord, ValidationErrors> {
    signer.validate()?;

    let name = signer.name.trim().to_string();
    let tax_id = FieldKind::PersonTaxId.format(&signer.tax_id);
    let email = signer.email.trim().to_string();
    let data = format!("{}|{}|{}|{}", name, tax_id, email, content);

    Ok(SignatureRecord {
        hash: fingerprint(&data, &ip, at),
        timestamp: to_iso8601(at),
        name,
        tax_id,
        email,
        ip,
        role,
    })
}
