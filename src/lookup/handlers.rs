use actix_web::{
    web::{self, Path},
    HttpResponse, Responder,
};
use log::{error, info, warn};

use super::{LookupError, PostalAddress};
use crate::{db::AppState, ErrorResponse};

#[utoipa::path(
    context_path = "/api",
    tag = "Lookup Service",
    get,
    path = "/postal-codes/{cep}",
    responses(
        (status = 200, description = "Address for the postal code", body = PostalAddress),
        (status = 400, description = "Malformed postal code", body = ErrorResponse),
        (status = 404, description = "Unknown postal code", body = ErrorResponse),
        (status = 502, description = "Lookup service unavailable", body = ErrorResponse)
    ),
    params(
        ("cep" = String, Path, description = "Postal code, with or without punctuation")
    )
)]
pub async fn lookup_postal_code(cep: Path<String>, data: web::Data<AppState>) -> impl Responder {
    let cep = cep.into_inner();
    info!("Executing lookup_postal_code handler for {}", cep);

    match data.postal_lookup.lookup(&cep).await {
        Ok(address) => HttpResponse::Ok().json(address),
        Err(LookupError::InvalidPostalCode(value)) => HttpResponse::BadRequest().json(
            ErrorResponse::bad_request(&format!("CEP '{}' deve conter 8 dígitos", value)),
        ),
        Err(LookupError::NotFound(value)) => {
            warn!("Postal code {} not found", value);
            HttpResponse::NotFound()
                .json(ErrorResponse::not_found(&format!("CEP {} não encontrado", value)))
        }
        Err(e) => {
            error!("Postal lookup failed for {}: {}", cep, e);
            HttpResponse::BadGateway().json(ErrorResponse::new(
                "BadGateway",
                "Serviço de CEP indisponível",
            ))
        }
    }
}
