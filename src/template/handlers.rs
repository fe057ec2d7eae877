use actix_web::{
    web::Path,
    HttpResponse, Responder,
};
use log::{info, warn};

use super::models::{TemplateDetail, TemplateSummary};
use crate::contract::{all_templates, template_by_id};
use crate::ErrorResponse;

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    get,
    path = "/templates",
    responses(
        (status = 200, description = "Every contract template with its classified fields", body = [TemplateSummary])
    )
)]
pub async fn get_all_templates() -> impl Responder {
    info!("Executing get_all_templates handler");
    let templates: Vec<TemplateSummary> = all_templates().iter().map(TemplateSummary::from).collect();
    HttpResponse::Ok().json(templates)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    get,
    path = "/templates/{id}",
    responses(
        (status = 200, description = "Template found", body = TemplateDetail),
        (status = 404, description = "Template not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Template id, e.g. residencial_pf")
    )
)]
pub async fn get_template_by_id(id: Path<String>) -> impl Responder {
    let id = id.into_inner();
    match template_by_id(&id) {
        Some(template) => HttpResponse::Ok().json(TemplateDetail::from(template)),
        None => {
            warn!("Template {} not found", id);
            HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
                "Modelo de contrato '{}' não encontrado",
                id
            )))
        }
    }
}
