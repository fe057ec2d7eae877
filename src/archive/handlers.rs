use actix_web::{
    http::header::ContentDisposition,
    web::{self, Json, Path, Query},
    HttpResponse, Responder,
};
use log::{error, info};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::models::{download_filename, filter_contracts, ContractFilter, ContractRecord};
use crate::contract::verification::{verify_against_store, verify_shape, Verdict, VerificationError};
use crate::session::models::ValidationFailureResponse;
use crate::{db::AppState, ErrorResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    #[schema(example = "MR3X-CTR-2026-AB12CD34EF56GHK1X2Y3")]
    pub token: String,
    pub hash: String,
}

fn verification_error_response(e: &VerificationError) -> HttpResponse {
    match e {
        VerificationError::MissingInput(errors) => HttpResponse::UnprocessableEntity().json(
            ValidationFailureResponse::new("Preencha o token e o hash", errors.iter().cloned().collect()),
        ),
        VerificationError::Store(e) => {
            error!("Verification lookup failed: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Falha ao consultar contratos"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Contract Archive",
    get,
    path = "/contracts",
    responses(
        (status = 200, description = "Archived contracts, newest first", body = [ContractRecord]),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    ),
    params(ContractFilter)
)]
pub async fn get_all_contracts(filter: Query<ContractFilter>, data: web::Data<AppState>) -> impl Responder {
    info!("Executing get_all_contracts handler");
    match data.list_contracts().await {
        Ok(records) => HttpResponse::Ok().json(filter_contracts(&records, &filter)),
        Err(e) => {
            error!("Failed to list contracts: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Falha ao listar contratos"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Contract Archive",
    get,
    path = "/contracts/{id}",
    responses(
        (status = 200, description = "Contract found", body = ContractRecord),
        (status = 404, description = "Contract not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Contract id")
    )
)]
pub async fn get_contract_by_id(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = id.into_inner();
    match data.get_contract(id).await {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound()
            .json(ErrorResponse::not_found(&format!("Contrato {} não encontrado", id))),
        Err(e) => {
            error!("Failed to load contract {}: {}", id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Falha ao carregar contrato"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Contract Archive",
    get,
    path = "/contracts/{id}/download",
    responses(
        (status = 200, description = "Contract text as a plain-text attachment"),
        (status = 404, description = "Contract not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Contract id")
    )
)]
pub async fn download_contract(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = id.into_inner();
    match data.get_contract(id).await {
        Ok(Some(record)) => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .insert_header(ContentDisposition::attachment(download_filename(&record)))
            .body(record.content),
        Ok(None) => HttpResponse::NotFound()
            .json(ErrorResponse::not_found(&format!("Contrato {} não encontrado", id))),
        Err(e) => {
            error!("Failed to load contract {}: {}", id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Falha ao carregar contrato"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Contract Archive",
    post,
    path = "/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Shape-only verdict", body = Verdict),
        (status = 422, description = "Token or hash missing", body = ValidationFailureResponse)
    )
)]
pub async fn verify(req: Json<VerifyRequest>) -> impl Responder {
    match verify_shape(&req.token, &req.hash) {
        Ok(verdict) => HttpResponse::Ok().json(verdict),
        Err(e) => verification_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Contract Archive",
    post,
    path = "/verify/record",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verdict against the archived fingerprint", body = Verdict),
        (status = 422, description = "Token or hash missing", body = ValidationFailureResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn verify_record(req: Json<VerifyRequest>, data: web::Data<AppState>) -> impl Responder {
    info!("Executing verify_record for token {}", req.token.trim());
    match verify_against_store(&req.token, &req.hash, data.store.as_ref()).await {
        Ok(verdict) => HttpResponse::Ok().json(verdict),
        Err(e) => verification_error_response(&e),
    }
}
