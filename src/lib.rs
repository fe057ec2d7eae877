use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod archive;
pub mod config;
pub mod contract;
pub mod db;
pub mod lookup;
pub mod render;
pub mod session;
pub mod storage;
pub mod template;

pub use crate::config::AppConfig;
pub use crate::db::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn unprocessable(message: &str) -> Self {
        Self::new("UnprocessableEntity", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::template::handlers::get_all_templates,
        crate::template::handlers::get_template_by_id,
        crate::session::handlers::create_session,
        crate::session::handlers::get_session,
        crate::session::handlers::select_template,
        crate::session::handlers::edit_field,
        crate::session::handlers::set_inspection_token,
        crate::session::handlers::upload_inspection_attachment,
        crate::session::handlers::remove_inspection_attachment,
        crate::session::handlers::open_preview,
        crate::session::handlers::edit_preview,
        crate::session::handlers::sign,
        crate::session::handlers::accept_terms,
        crate::session::handlers::export,
        crate::session::handlers::share,
        crate::archive::handlers::get_all_contracts,
        crate::archive::handlers::get_contract_by_id,
        crate::archive::handlers::download_contract,
        crate::archive::handlers::verify,
        crate::archive::handlers::verify_record,
        crate::lookup::handlers::lookup_postal_code
    ),
    components(
        schemas(
            template::models::TemplateSummary,
            template::models::TemplateDetail,
            template::models::TemplateField,
            contract::FieldKind,
            contract::FieldUpdate,
            contract::FormData,
            contract::ContractMetadata,
            contract::Role,
            contract::SignatureRecord,
            contract::ValidationError,
            contract::attachment::AttachmentInfo,
            contract::verification::Verdict,
            session::models::SessionSnapshot,
            session::models::PreviewResponse,
            session::models::SelectTemplateRequest,
            session::models::EditFieldRequest,
            session::models::EditFieldResponse,
            session::models::InspectionTokenRequest,
            session::models::AttachmentResponse,
            session::models::UploadInspectionRequest,
            session::models::EditPreviewRequest,
            session::models::SignRequest,
            session::models::ShareRequest,
            session::models::ShareResponse,
            session::models::ValidationFailureResponse,
            session::workflow::AddressLookupStatus,
            archive::models::ContractRecord,
            archive::handlers::VerifyRequest,
            lookup::PostalAddress,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Template Service", description = "Contract template catalogue."),
        (name = "Session Service", description = "Form filling, preview, signatures and export."),
        (name = "Contract Archive", description = "Stored contracts and authenticity checks."),
        (name = "Lookup Service", description = "Postal code lookup.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost server")
    )
)]
pub struct ApiDoc;

/// Registers every `/api` route.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/templates")
                    .route(web::get().to(template::handlers::get_all_templates)),
            )
            .service(
                web::resource("/templates/{id}")
                    .route(web::get().to(template::handlers::get_template_by_id)),
            )
            .service(
                web::resource("/sessions")
                    .route(web::post().to(session::handlers::create_session)),
            )
            .service(
                web::resource("/sessions/{id}")
                    .route(web::get().to(session::handlers::get_session)),
            )
            .service(
                web::resource("/sessions/{id}/template")
                    .route(web::put().to(session::handlers::select_template)),
            )
            .service(
                web::resource("/sessions/{id}/fields")
                    .route(web::put().to(session::handlers::edit_field)),
            )
            .service(
                web::resource("/sessions/{id}/inspection/token")
                    .route(web::put().to(session::handlers::set_inspection_token)),
            )
            .service(
                web::resource("/sessions/{id}/inspection/attachment")
                    .route(web::post().to(session::handlers::upload_inspection_attachment))
                    .route(web::delete().to(session::handlers::remove_inspection_attachment)),
            )
            .service(
                web::resource("/sessions/{id}/preview")
                    .route(web::post().to(session::handlers::open_preview))
                    .route(web::put().to(session::handlers::edit_preview)),
            )
            .service(
                web::resource("/sessions/{id}/signatures")
                    .route(web::post().to(session::handlers::sign)),
            )
            .service(
                web::resource("/sessions/{id}/terms")
                    .route(web::post().to(session::handlers::accept_terms)),
            )
            .service(
                web::resource("/sessions/{id}/export")
                    .route(web::post().to(session::handlers::export)),
            )
            .service(
                web::resource("/sessions/{id}/share")
                    .route(web::post().to(session::handlers::share)),
            )
            .service(
                web::resource("/contracts")
                    .route(web::get().to(archive::handlers::get_all_contracts)),
            )
            .service(
                web::resource("/contracts/{id}")
                    .route(web::get().to(archive::handlers::get_contract_by_id)),
            )
            .service(
                web::resource("/contracts/{id}/download")
                    .route(web::get().to(archive::handlers::download_contract)),
            )
            .service(web::resource("/verify").route(web::post().to(archive::handlers::verify)))
            .service(
                web::resource("/verify/record")
                    .route(web::post().to(archive::handlers::verify_record)),
            )
            .service(
                web::resource("/postal-codes/{cep}")
                    .route(web::get().to(lookup::handlers::lookup_postal_code)),
            ),
    );
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    let bind_address = config.bind_address.clone();

    let app_state = match AppState::new(config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to connect to database. Please check your SUPABASE_DATABASE_URL in .env and ensure the database is running. Error: {}", e);
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("contract_generator_server")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus metrics middleware");

    log::info!("Starting server at http://{}", bind_address);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .configure(configure_api)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind_address)?
    .run()
    .await
}
