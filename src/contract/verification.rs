//! Authenticity checks for a token and fingerprint pair.
//!
//! [`verify_shape`] only looks at the shape of its inputs. [`verify_against_store`]
//! compares the supplied fingerprint with the one stored when the contract was
//! generated; it never recomputes a fingerprint from the text, since the stored value
//! is salted with its generation instant.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::metadata::is_contract_token;
use super::validation::{validate_required, ValidationErrors};
use crate::db::{ContractStore, StoreError};

const FINGERPRINT_HEX_LEN: usize = 64;

const AUTHENTIC: &str = "Hash verificado com sucesso! O contrato é autêntico e não foi alterado.";
const NOT_AUTHENTIC: &str =
    "Hash inválido! O contrato pode ter sido alterado ou o token está incorreto.";
const UNKNOWN_TOKEN: &str = "Nenhum contrato registrado com este token.";

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("{}", .0.to_message())]
    MissingInput(ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Verdict {
    pub valid: bool,
    pub message: String,
}

impl Verdict {
    fn new(valid: bool, message: &str) -> Self {
        Self {
            valid,
            message: message.to_string(),
        }
    }
}

fn require_inputs(token: &str, hash: &str) -> Result<(), VerificationError> {
    let mut errors = ValidationErrors::new();
    validate_required(token, "token", "Token", &mut errors);
    validate_required(hash, "hash", "Hash", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(VerificationError::MissingInput(errors))
    }
}

/// Shape-only verdict: a 64 character hash and a contract token prefix.
pub fn verify_shape(token: &str, hash: &str) -> Result<Verdict, VerificationError> {
    require_inputs(token, hash)?;

    let valid = hash.trim().len() == FINGERPRINT_HEX_LEN && is_contract_token(token.trim());
    Ok(if valid {
        Verdict::new(true, AUTHENTIC)
    } else {
        Verdict::new(false, NOT_AUTHENTIC)
    })
}

/// Authentic only when a stored contract carries `token` and its stored fingerprint
/// equals `hash`.
pub async fn verify_against_store(
    token: &str,
    hash: &str,
    store: &dyn ContractStore,
) -> Result<Verdict, VerificationError> {
    require_inputs(token, hash)?;

    let Some(record) = store.find_by_token(token.trim()).await? else {
        log::info!("Verification requested for unknown token {}", token.trim());
        return Ok(Verdict::new(false, UNKNOWN_TOKEN));
    };

    if record.hash.eq_ignore_ascii_case(hash.trim()) {
        Ok(Verdict::new(true, AUTHENTIC))
    } else {
        log::warn!("Fingerprint mismatch for contract {}", record.token);
        Ok(Verdict::new(false, NOT_AUTHENTIC))
    }
}
