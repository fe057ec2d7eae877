use actix_multipart::Multipart;
use actix_web::{
    http::header::ContentDisposition,
    web::{self, Json, Path},
    HttpResponse, Responder,
};
use futures_util::TryStreamExt;
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::models::{
    AttachmentResponse, EditFieldRequest, EditFieldResponse, EditPreviewRequest,
    InspectionTokenRequest, PreviewResponse, SelectTemplateRequest, SessionSnapshot, ShareRequest,
    ShareResponse, SignRequest, UploadInspectionRequest, ValidationFailureResponse,
};
use super::{workflow, ContractSession, SessionError, SharedSession};
use crate::contract::attachment::{Attachment, MAX_ATTACHMENT_BYTES};
use crate::contract::share::share_link;
use crate::contract::{AttachmentError, FormError, SignatureRecord};
use crate::{db::AppState, ErrorResponse};

async fn load_session(data: &AppState, id: Uuid) -> Result<SharedSession, SessionError> {
    data.session(&id).await.ok_or(SessionError::NotFound(id))
}

fn attachment_error_response(e: &AttachmentError) -> HttpResponse {
    let body = ErrorResponse::bad_request(&e.to_string());
    match e {
        AttachmentError::TooLarge(_) => HttpResponse::PayloadTooLarge().json(body),
        AttachmentError::NotPdf(_) => HttpResponse::UnsupportedMediaType().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

fn error_response(e: &SessionError) -> HttpResponse {
    let message = e.to_string();
    match e {
        SessionError::NotFound(_) | SessionError::Form(FormError::UnknownTemplate(_)) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found(&message))
        }
        SessionError::Form(FormError::Invalid(errors)) | SessionError::Signature(errors) => {
            HttpResponse::UnprocessableEntity().json(ValidationFailureResponse::new(
                "Corrija os campos destacados",
                errors.iter().cloned().collect(),
            ))
        }
        SessionError::Share(error) => HttpResponse::UnprocessableEntity()
            .json(ValidationFailureResponse::new(&message, vec![error.clone()])),
        SessionError::Form(FormError::Inspection(e)) | SessionError::Attachment(e) => {
            attachment_error_response(e)
        }
        SessionError::NoPreview | SessionError::TermsNotAccepted | SessionError::Stale => {
            HttpResponse::Conflict().json(ErrorResponse::new("Conflict", &message))
        }
        SessionError::Form(_) | SessionError::EmptyContent => {
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&message))
        }
        SessionError::Render(_) => {
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&message))
        }
    }
}

fn snapshot(session: &SharedSession) -> SessionSnapshot {
    SessionSnapshot::from(&*session.lock())
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session opened", body = SessionSnapshot)
    )
)]
pub async fn create_session(data: web::Data<AppState>) -> impl Responder {
    let session = ContractSession::new();
    let id = session.id;
    let body = SessionSnapshot::from(&session);

    data.sessions.insert(id, session.shared()).await;
    info!("Opened contract session {}", id);
    HttpResponse::Created().json(body)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session state", body = SessionSnapshot),
        (status = 404, description = "Session not found or expired", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn get_session(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    match load_session(&data, id.into_inner()).await {
        Ok(session) => HttpResponse::Ok().json(snapshot(&session)),
        Err(e) => error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    put,
    path = "/sessions/{id}/template",
    request_body = SelectTemplateRequest,
    responses(
        (status = 200, description = "Template selected, form cleared", body = SessionSnapshot),
        (status = 404, description = "Session or template not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn select_template(
    id: Path<Uuid>,
    req: Json<SelectTemplateRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let id = id.into_inner();
    info!("Executing select_template for session {}: {}", id, req.template_id);

    let result = match load_session(&data, id).await {
        Ok(session) => {
            let selected = session.lock().select_template(&req.template_id);
            selected.map(|_| snapshot(&session))
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => {
            warn!("Template selection failed for session {}: {}", id, e);
            error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    put,
    path = "/sessions/{id}/fields",
    request_body = EditFieldRequest,
    responses(
        (status = 200, description = "Formatted value, inline error and postal auto-fill outcome", body = EditFieldResponse),
        (status = 400, description = "No template selected or unknown field", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn edit_field(
    id: Path<Uuid>,
    req: Json<EditFieldRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let id = id.into_inner();
    debug!("Editing field {} in session {}", req.field, id);

    let session = match load_session(&data, id).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    match workflow::edit_field(&data, &session, &req.field, &req.value).await {
        Ok(edit) => {
            let form = session.lock().form().form_data();
            HttpResponse::Ok().json(EditFieldResponse::new(edit, form))
        }
        Err(e) => {
            warn!("Field edit rejected in session {}: {}", id, e);
            error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    put,
    path = "/sessions/{id}/inspection/token",
    request_body = InspectionTokenRequest,
    responses(
        (status = 200, description = "Inspection token stored (or cleared when blank)", body = SessionSnapshot),
        (status = 400, description = "Malformed inspection token", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn set_inspection_token(
    id: Path<Uuid>,
    req: Json<InspectionTokenRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let session = match load_session(&data, id.into_inner()).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let result = session.lock().set_inspection_token(&req.token);
    match result {
        Ok(()) => HttpResponse::Ok().json(snapshot(&session)),
        Err(e) => error_response(&e),
    }
}

/// Reads the `file` part of an upload, keeping at most one byte past the size cap.
async fn read_upload(
    mut payload: Multipart,
) -> Result<(String, Option<String>, Vec<u8>), String> {
    while let Some(mut field) = payload.try_next().await.map_err(|e| e.to_string())? {
        let content_disposition = field
            .content_disposition()
            .ok_or("Content-Disposition not set")?;
        if content_disposition.get_name() != Some("file") {
            continue;
        }

        let filename = content_disposition
            .get_filename()
            .ok_or_else(|| "No filename".to_string())?
            .to_string();
        let content_type = field.content_type().map(|mime| mime.essence_str().to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| e.to_string())? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > MAX_ATTACHMENT_BYTES {
                break;
            }
        }
        return Ok((filename, content_type, bytes));
    }

    Err("No file was uploaded".to_string())
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    post,
    path = "/sessions/{id}/inspection/attachment",
    request_body(content = inline(UploadInspectionRequest), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Inspection report attached", body = AttachmentResponse),
        (status = 400, description = "Missing or empty file", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 413, description = "File larger than 20MB", body = ErrorResponse),
        (status = 415, description = "File is not a PDF", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn upload_inspection_attachment(
    id: Path<Uuid>,
    payload: Multipart,
    data: web::Data<AppState>,
) -> impl Responder {
    let id = id.into_inner();
    info!("Executing upload_inspection_attachment for session {}", id);

    let session = match load_session(&data, id).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let (filename, content_type, bytes) = match read_upload(payload).await {
        Ok(upload) => upload,
        Err(e) => {
            error!("Failed to read inspection upload: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e));
        }
    };

    let attachment = match Attachment::accept(&filename, content_type.as_deref(), bytes) {
        Ok(attachment) => attachment,
        Err(e) => {
            warn!("Inspection upload rejected for session {}: {}", id, e);
            return attachment_error_response(&e);
        }
    };

    let body = AttachmentResponse {
        attachment: attachment.info(),
        data_url: attachment.data_url(),
    };
    session.lock().attach_inspection(attachment);
    info!(
        "Inspection report {} ({} bytes) attached to session {}",
        body.attachment.filename, body.attachment.size, id
    );
    HttpResponse::Created().json(body)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    delete,
    path = "/sessions/{id}/inspection/attachment",
    responses(
        (status = 204, description = "Attachment removed"),
        (status = 404, description = "Session not found or nothing attached", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn remove_inspection_attachment(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let session = match load_session(&data, id.into_inner()).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let removed = session.lock().remove_inspection_attachment();
    if removed {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::NotFound().json(ErrorResponse::not_found("Nenhum laudo anexado"))
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    post,
    path = "/sessions/{id}/preview",
    responses(
        (status = 200, description = "Assembled contract with fresh metadata", body = PreviewResponse),
        (status = 400, description = "No template selected", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Form changed while the preview was generated", body = ErrorResponse),
        (status = 422, description = "Form has invalid fields", body = ValidationFailureResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn open_preview(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = id.into_inner();
    info!("Executing open_preview for session {}", id);

    let session = match load_session(&data, id).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    match workflow::open_preview(&data, &session).await {
        Ok(preview) => HttpResponse::Ok().json(PreviewResponse::from(preview)),
        Err(e) => {
            warn!("Preview refused for session {}: {}", id, e);
            error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    put,
    path = "/sessions/{id}/preview",
    request_body = EditPreviewRequest,
    responses(
        (status = 200, description = "Preview updated; changed text gets new metadata", body = PreviewResponse),
        (status = 400, description = "Empty content", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No preview yet, or the session changed meanwhile", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn edit_preview(
    id: Path<Uuid>,
    req: Json<EditPreviewRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let session = match load_session(&data, id.into_inner()).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    match workflow::edit_preview(&data, &session, &req.content).await {
        Ok(preview) => HttpResponse::Ok().json(PreviewResponse::from(preview)),
        Err(e) => error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    post,
    path = "/sessions/{id}/signatures",
    request_body = SignRequest,
    responses(
        (status = 201, description = "Signature recorded", body = SignatureRecord),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No preview generated yet", body = ErrorResponse),
        (status = 422, description = "Missing signer data", body = ValidationFailureResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn sign(id: Path<Uuid>, req: Json<SignRequest>, data: web::Data<AppState>) -> impl Responder {
    let id = id.into_inner();
    let session = match load_session(&data, id).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    match workflow::sign(&data, &session, req.role, &req.signer()).await {
        Ok(record) => HttpResponse::Created().json(record),
        Err(e) => {
            warn!("Signature refused for session {}: {}", id, e);
            error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    post,
    path = "/sessions/{id}/terms",
    responses(
        (status = 200, description = "Terms accepted", body = SessionSnapshot),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No preview generated yet", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn accept_terms(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let session = match load_session(&data, id.into_inner()).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let result = session.lock().accept_terms();
    match result {
        Ok(()) => HttpResponse::Ok().json(snapshot(&session)),
        Err(e) => error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    post,
    path = "/sessions/{id}/export",
    responses(
        (status = 200, description = "Rendered contract PDF (application/pdf)"),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No preview or terms not accepted", body = ErrorResponse),
        (status = 500, description = "PDF generation failed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn export(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = id.into_inner();
    info!("Executing export for session {}", id);

    let session = match load_session(&data, id).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    match workflow::export(&data, &session).await {
        Ok(outcome) => {
            let mut response = HttpResponse::Ok();
            response
                .content_type("application/pdf")
                .insert_header(ContentDisposition::attachment(outcome.pdf.filename.clone()));
            if let Some(record) = &outcome.record {
                response.insert_header(("X-Contract-Id", record.id.to_string()));
            }
            response.body(outcome.pdf.bytes)
        }
        Err(e) => {
            warn!("Export refused for session {}: {}", id, e);
            error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Session Service",
    post,
    path = "/sessions/{id}/share",
    request_body = ShareRequest,
    responses(
        (status = 200, description = "Messaging link with a pre-filled message", body = ShareResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No preview generated yet", body = ErrorResponse),
        (status = 422, description = "Invalid phone number", body = ValidationFailureResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn share(id: Path<Uuid>, req: Json<ShareRequest>, data: web::Data<AppState>) -> impl Responder {
    let session = match load_session(&data, id.into_inner()).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let token = session.lock().preview().map(|p| p.metadata.token.clone());
    let Some(token) = token else {
        return error_response(&SessionError::NoPreview);
    };

    match share_link(&req.phone, &token, &data.config.verify_base_url) {
        Ok(url) => HttpResponse::Ok().json(ShareResponse {
            token,
            url: url.to_string(),
        }),
        Err(e) => error_response(&SessionError::Share(e)),
    }
}
