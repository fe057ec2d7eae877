mod common;

use std::sync::Arc;

use chrono::{Datelike, Duration, Utc};
use contract_generator_server::contract::assembler::unresolved_placeholders;
use contract_generator_server::contract::attachment::{Attachment, MAX_ATTACHMENT_BYTES};
use contract_generator_server::contract::metadata::build_metadata;
use contract_generator_server::contract::templates::RESIDENTIAL_PERSON;
use contract_generator_server::contract::{
    all_templates, generate_metadata, AttachmentError, FormSession, Role, SignerInput,
};
use contract_generator_server::archive::models::{ContractRecord, NewContract};
use contract_generator_server::config::AppConfig;
use contract_generator_server::db::{ContractStore, InMemoryContractStore, StoreError};
use contract_generator_server::lookup::NULL_ADDRESS;
use contract_generator_server::render::layout::CONTENT_HEIGHT_MM;
use contract_generator_server::render::{export_filename, render_pdf, PrintDocument};
use contract_generator_server::session::{workflow, ContractSession, SessionError, SharedSession};
use contract_generator_server::storage::ObjectStorage;
use contract_generator_server::AppState;
use regex::Regex;

use common::{
    sample_value, FailingAddressLookup, FixedAddressLookup, MockObjectStorage, SlowAddressLookup,
    StubPostalLookup, CLIENT_IP,
};

fn filled_form(template_id: &str) -> FormSession {
    let mut form = FormSession::new();
    let template = form.select_template(template_id).unwrap();
    for field in template.field_names() {
        let update = form.edit_field(field, &sample_value(field)).unwrap();
        assert!(update.error.is_empty(), "{} rejected: {}", field, update.error);
    }
    form
}

#[tokio::test]
async fn test_residential_contract_end_to_end() {
    let mut form = filled_form(RESIDENTIAL_PERSON);
    let content = form.assemble().unwrap();
    assert!(unresolved_placeholders(&content).is_empty());
    assert!(content.contains("111.444.777-35"));

    let lookup = FixedAddressLookup(CLIENT_IP.to_string());
    let metadata = generate_metadata(&content, &lookup).await;

    let pattern = format!(r"^MR3X-CTR-{}-[A-Z0-9]+$", Utc::now().year());
    assert!(Regex::new(&pattern).unwrap().is_match(&metadata.token));
    assert_eq!(metadata.hash.len(), 64);
    assert_eq!(metadata.ip, CLIENT_IP);

    let signer = SignerInput {
        name: "Maria Souza".to_string(),
        tax_id: "11144477735".to_string(),
        email: "maria@example.com".to_string(),
    };
    let signature = contract_generator_server::contract::signature::sign(
        Role::Tenant,
        &signer,
        &content,
        CLIENT_IP.to_string(),
        Utc::now(),
    )
    .unwrap();
    let signatures = vec![signature];

    let doc = PrintDocument {
        content: &content,
        metadata: &metadata,
        signatures: &signatures,
        inspection_token: None,
        inspection_filename: None,
        agency_name: Some("Imobiliária Central"),
        verify_url: format!("https://mr3x.com.br/verify/{}", metadata.hash),
    };
    let pdf = render_pdf(&doc).unwrap();

    assert_eq!(pdf.filename, export_filename(&metadata.token));
    assert!(pdf.bytes.starts_with(b"%PDF"));
    let expected_pages = ((pdf.content_height_mm / CONTENT_HEIGHT_MM).ceil() as usize).max(1);
    assert_eq!(pdf.page_count, expected_pages);

    let parsed = lopdf::Document::load_mem(&pdf.bytes).unwrap();
    assert_eq!(parsed.get_pages().len(), expected_pages);
}

#[test]
fn test_every_template_assembles_when_filled() {
    for template in all_templates() {
        let mut form = filled_form(template.id);
        let content = form.assemble().unwrap();
        assert!(
            unresolved_placeholders(&content).is_empty(),
            "{} left placeholders",
            template.id
        );
    }
}

#[tokio::test]
async fn test_metadata_uses_null_address_when_lookup_fails() {
    let metadata = generate_metadata("conteúdo", &FailingAddressLookup).await;
    assert_eq!(metadata.ip, NULL_ADDRESS);
    assert_eq!(metadata.hash.len(), 64);
}

#[test]
fn test_identical_content_gets_distinct_metadata() {
    let now = Utc::now();
    let first = build_metadata("mesmo texto", CLIENT_IP.to_string(), now);
    let second = build_metadata(
        "mesmo texto",
        CLIENT_IP.to_string(),
        now + Duration::milliseconds(1),
    );

    assert_ne!(first.token, second.token);
    assert_ne!(first.hash, second.hash);
}

#[test]
fn test_rejected_attachment_leaves_form_untouched() {
    let mut form = filled_form(RESIDENTIAL_PERSON);
    let before = form.form_data();

    let oversized = common::pdf_bytes(MAX_ATTACHMENT_BYTES + 1);
    let err = Attachment::accept("laudo.pdf", Some("application/pdf"), oversized).unwrap_err();
    assert_eq!(err, AttachmentError::TooLarge(MAX_ATTACHMENT_BYTES + 1));

    let err = Attachment::accept("foto.png", Some("image/png"), b"\x89PNG".to_vec()).unwrap_err();
    assert!(matches!(err, AttachmentError::NotPdf(_)));
    assert_eq!(form.form_data(), before);

    let accepted = Attachment::accept("laudo.pdf", Some("application/pdf"), common::pdf_bytes(64));
    form.attach_inspection(accepted.unwrap());
    assert_eq!(
        form.form_data()
            .inspection_attachment
            .map(|info| info.filename),
        Some("laudo.pdf".to_string())
    );
}

fn filled_session() -> SharedSession {
    let session = ContractSession::new().shared();
    {
        let mut guard = session.lock();
        guard.select_template(RESIDENTIAL_PERSON).unwrap();
        let fields = guard.form().template().unwrap().field_names().to_vec();
        for field in fields {
            guard.edit_field(&field, &sample_value(&field)).unwrap();
        }
    }
    session
}

struct RejectingStore;

#[async_trait::async_trait]
impl ContractStore for RejectingStore {
    async fn insert(&self, _contract: NewContract) -> Result<ContractRecord, StoreError> {
        Err(StoreError::Storage("store offline".to_string()))
    }

    async fn list(&self) -> Result<Vec<ContractRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn get(&self, _id: uuid::Uuid) -> Result<Option<ContractRecord>, StoreError> {
        Ok(None)
    }

    async fn find_by_token(&self, _token: &str) -> Result<Option<ContractRecord>, StoreError> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_export_survives_archive_failure_and_cleans_up_upload() {
    let storage = Arc::new(MockObjectStorage::new());
    let state = AppState::new_with_collaborators(
        AppConfig::default(),
        Arc::new(RejectingStore),
        Some(storage.clone() as Arc<dyn ObjectStorage>),
        Arc::new(FixedAddressLookup(CLIENT_IP.to_string())),
        Arc::new(StubPostalLookup),
    );

    let session = filled_session();
    {
        let mut guard = session.lock();
        let attachment =
            Attachment::accept("laudo.pdf", Some("application/pdf"), common::pdf_bytes(64));
        guard.attach_inspection(attachment.unwrap());
    }

    let preview = workflow::open_preview(&state, &session).await.unwrap();
    session.lock().accept_terms().unwrap();

    let outcome = workflow::export(&state, &session).await.unwrap();
    assert!(outcome.record.is_none());
    assert!(outcome.pdf.bytes.starts_with(b"%PDF"));

    let object_name = format!("inspections/{}-laudo.pdf", preview.metadata.token);
    assert!(!storage.has_file(&object_name).await);
}

#[tokio::test]
async fn test_field_edit_during_preview_generation_is_not_lost() {
    let state = AppState::new_with_collaborators(
        AppConfig::default(),
        Arc::new(InMemoryContractStore::new()),
        None,
        Arc::new(SlowAddressLookup(std::time::Duration::from_millis(200))),
        Arc::new(StubPostalLookup),
    );
    let session = filled_session();
    session.lock().edit_field("NOME_LOCADOR", "Ana").unwrap();

    let pending = tokio::spawn({
        let state = state.clone();
        let session = session.clone();
        async move { workflow::open_preview(&state, &session).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    workflow::edit_field(&state, &session, "NOME_LOCADOR", "Beatriz")
        .await
        .unwrap();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(SessionError::Stale)));
    assert!(session.lock().preview().is_none());

    let preview = workflow::open_preview(&state, &session).await.unwrap();
    assert!(preview.content.contains("Beatriz"));
    assert_eq!(
        session.lock().preview().map(|p| p.content.clone()),
        Some(preview.content)
    );
}
