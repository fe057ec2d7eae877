//! Form state controller.
//!
//! A form is either waiting for a template or bound to one. Picking a template clears
//! every value and error. Edits are formatted by the field's kind and only judged once
//! complete; an empty error message means the value is valid (or not yet judged).

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use utoipa::ToSchema;

use super::assembler::assemble;
use super::attachment::{Attachment, AttachmentInfo, Inspection};
use super::fields::{classify_field, FieldKind};
use super::templates::{template_by_id, Template};
use super::validation::{digits_only, ValidationError, ValidationErrors, POSTAL_CODE_DIGITS};
use super::FormError;
use crate::lookup::PostalAddress;

const POSTAL_PREFIX: &str = "CEP_";

#[derive(Debug, Clone, Default)]
enum FormState {
    #[default]
    NoTemplate,
    Selected {
        template: &'static Template,
        values: HashMap<String, String>,
        errors: HashMap<String, String>,
    },
}

/// Result of a single field edit.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldUpdate {
    pub field: String,
    pub kind: FieldKind,
    pub value: String,
    /// Empty when the value is valid or incomplete
    pub error: String,
}

/// Consolidated form state, reported after every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct FormData {
    #[serde(rename = "templateId")]
    pub template_id: Option<String>,
    pub fields: BTreeMap<String, String>,
    pub errors: BTreeMap<String, String>,
    pub inspection_token: Option<String>,
    pub inspection_attachment: Option<AttachmentInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct FormSession {
    state: FormState,
    inspection: Inspection,
}

impl FormSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(&self) -> Option<&'static Template> {
        match &self.state {
            FormState::NoTemplate => None,
            FormState::Selected { template, .. } => Some(*template),
        }
    }

    /// Binds the form to `template_id`, discarding all values and errors.
    pub fn select_template(&mut self, template_id: &str) -> Result<&'static Template, FormError> {
        let template = template_by_id(template_id)
            .ok_or_else(|| FormError::UnknownTemplate(template_id.to_string()))?;

        self.state = FormState::Selected {
            template,
            values: HashMap::new(),
            errors: HashMap::new(),
        };
        log::debug!("Form bound to template {}", template.id);
        Ok(template)
    }

    /// Formats and stores one field value.
    pub fn edit_field(&mut self, field: &str, raw: &str) -> Result<FieldUpdate, FormError> {
        let FormState::Selected {
            template,
            values,
            errors,
        } = &mut self.state
        else {
            return Err(FormError::NoTemplate);
        };
        if !template.has_field(field) {
            return Err(FormError::UnknownField(field.to_string()));
        }

        let kind = classify_field(field);
        let (value, error) = kind.apply(field, raw);
        values.insert(field.to_string(), value.clone());
        errors.insert(field.to_string(), error.clone());

        Ok(FieldUpdate {
            field: field.to_string(),
            kind,
            value,
            error,
        })
    }

    /// The normalized postal code to look up when `field` is a complete `CEP_<X>`
    /// field whose template also carries address fields for `<X>`.
    pub fn postal_autofill_target(&self, field: &str) -> Option<String> {
        let template = self.template()?;
        if classify_field(field) != FieldKind::PostalCode {
            return None;
        }
        let suffix = field.strip_prefix(POSTAL_PREFIX)?;
        if !address_fields(suffix).iter().any(|f| template.has_field(f)) {
            return None;
        }
        if self.error(field).is_some_and(|e| !e.is_empty()) {
            return None;
        }

        let digits = digits_only(self.value(field)?);
        (digits.len() == POSTAL_CODE_DIGITS).then_some(digits)
    }

    /// Fills the street, neighborhood, city and state fields paired with `postal_field`.
    /// Returns the names of the fields that were filled.
    pub fn apply_postal_address(
        &mut self,
        postal_field: &str,
        address: &PostalAddress,
    ) -> Vec<String> {
        let Some(suffix) = postal_field.strip_prefix(POSTAL_PREFIX) else {
            return Vec::new();
        };
        let FormState::Selected {
            template,
            values,
            errors,
        } = &mut self.state
        else {
            return Vec::new();
        };

        let [street, neighborhood, city, state] = address_fields(suffix);
        let pairs = [
            (street, &address.street),
            (neighborhood, &address.neighborhood),
            (city, &address.city),
            (state, &address.state),
        ];

        let mut filled = Vec::new();
        for (field, value) in pairs {
            if value.is_empty() || !template.has_field(&field) {
                continue;
            }
            values.insert(field.clone(), value.clone());
            errors.insert(field.clone(), String::new());
            filled.push(field);
        }
        filled
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        match &self.state {
            FormState::Selected { values, .. } => values.get(field).map(String::as_str),
            FormState::NoTemplate => None,
        }
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        match &self.state {
            FormState::Selected { errors, .. } => errors.get(field).map(String::as_str),
            FormState::NoTemplate => None,
        }
    }

    pub fn inspection(&self) -> &Inspection {
        &self.inspection
    }

    pub fn set_inspection_token(&mut self, token: &str, year: i32) -> Result<(), FormError> {
        self.inspection.set_token(token, year)?;
        Ok(())
    }

    pub fn attach_inspection(&mut self, attachment: Attachment) {
        self.inspection.attach(attachment);
    }

    pub fn remove_inspection_attachment(&mut self) -> Option<Attachment> {
        self.inspection.remove_attachment()
    }

    pub fn form_data(&self) -> FormData {
        let (template_id, fields, errors) = match &self.state {
            FormState::NoTemplate => (None, BTreeMap::new(), BTreeMap::new()),
            FormState::Selected {
                template,
                values,
                errors,
            } => (
                Some(template.id.to_string()),
                values.clone().into_iter().collect(),
                errors
                    .iter()
                    .filter(|(_, message)| !message.is_empty())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        };

        FormData {
            template_id,
            fields,
            errors,
            inspection_token: self.inspection.token().map(str::to_string),
            inspection_attachment: self.inspection.attachment().map(Attachment::info),
        }
    }

    /// Submit guard. Rejects while any stored error is non-empty, and re-validates
    /// every email field of the template, edited or not. Email errors found here are
    /// stored like edit-time errors.
    pub fn submit(&mut self) -> Result<&'static Template, FormError> {
        let FormState::Selected {
            template,
            values,
            errors,
        } = &mut self.state
        else {
            return Err(FormError::NoTemplate);
        };
        let template: &'static Template = *template;

        for field in template.field_names() {
            if classify_field(field) != FieldKind::Email {
                continue;
            }
            let value = values.get(field).map(String::as_str).unwrap_or_default();
            let message = if FieldKind::Email.is_valid(value) {
                String::new()
            } else {
                ValidationError::invalid_email(field).message
            };
            errors.insert(field.clone(), message);
        }

        let mut failures = ValidationErrors::new();
        for field in template.field_names() {
            let Some(message) = errors.get(field).filter(|m| !m.is_empty()) else {
                continue;
            };
            let value = values.get(field).map(String::as_str).unwrap_or_default();
            let error = classify_field(field)
                .check(field, value)
                .unwrap_or_else(|| ValidationError::new(field.as_str(), message.as_str()));
            failures.add(error.with_message(message.as_str()));
        }

        if failures.is_empty() {
            Ok(template)
        } else {
            Err(FormError::Invalid(failures))
        }
    }

    /// Runs the submit guard and substitutes the values into the template body.
    pub fn assemble(&mut self) -> Result<String, FormError> {
        let template = self.submit()?;
        let FormState::Selected { values, .. } = &self.state else {
            return Err(FormError::NoTemplate);
        };
        Ok(assemble(template.body, values))
    }
}

fn address_fields(suffix: &str) -> [String; 4] {
    [
        format!("ENDERECO_{}", suffix),
        format!("BAIRRO_{}", suffix),
        format!("CIDADE_{}", suffix),
        format!("ESTADO_{}", suffix),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::templates::RESIDENTIAL_PERSON;

    fn residential() -> FormSession {
        let mut form = FormSession::new();
        form.select_template(RESIDENTIAL_PERSON).unwrap();
        form
    }

    #[test]
    fn test_edit_requires_template() {
        let mut form = FormSession::new();
        assert!(matches!(
            form.edit_field("NOME_LOCADOR", "Ana"),
            Err(FormError::NoTemplate)
        ));
    }

    #[test]
    fn test_unknown_template_and_field() {
        let mut form = FormSession::new();
        assert!(matches!(
            form.select_template("nope"),
            Err(FormError::UnknownTemplate(_))
        ));

        let mut form = residential();
        assert!(matches!(
            form.edit_field("CNPJ_LOCATARIO", "1"),
            Err(FormError::UnknownField(_))
        ));
    }

    #[test]
    fn test_template_switch_clears_values() {
        let mut form = residential();
        form.edit_field("NOME_LOCADOR", "Ana").unwrap();
        assert_eq!(form.value("NOME_LOCADOR"), Some("Ana"));

        form.select_template(RESIDENTIAL_PERSON).unwrap();
        assert_eq!(form.value("NOME_LOCADOR"), None);
        assert!(form.form_data().fields.is_empty());
    }

    #[test]
    fn test_edit_formats_and_defers_errors() {
        let mut form = residential();
        let update = form.edit_field("CPF_LOCADOR", "111444").unwrap();
        assert_eq!(update.value, "111.444");
        assert!(update.error.is_empty());

        let update = form.edit_field("CPF_LOCADOR", "11144477736").unwrap();
        assert_eq!(update.error, "CPF inválido");
        assert_eq!(
            form.form_data().errors.get("CPF_LOCADOR").map(String::as_str),
            Some("CPF inválido")
        );

        let update = form.edit_field("CPF_LOCADOR", "").unwrap();
        assert_eq!(update.value, "");
        assert!(update.error.is_empty());
    }

    #[test]
    fn test_submit_rejects_stored_errors() {
        let mut form = residential();
        form.edit_field("EMAIL_LOCADOR", "ana@example.com").unwrap();
        form.edit_field("EMAIL_LOCATARIO", "bia@example.com").unwrap();
        form.edit_field("TELEFONE_LOCADOR", "0199998888").unwrap();

        match form.submit() {
            Err(FormError::Invalid(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors.iter().next().unwrap().field, "TELEFONE_LOCADOR");
            }
            other => panic!("unexpected submit result: {:?}", other.map(|t| t.id)),
        }
    }

    #[test]
    fn test_submit_revalidates_untouched_email_fields() {
        let mut form = residential();
        form.edit_field("EMAIL_LOCADOR", "ana@example.com").unwrap();

        match form.submit() {
            Err(FormError::Invalid(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["EMAIL_LOCATARIO"]);
            }
            other => panic!("unexpected submit result: {:?}", other.map(|t| t.id)),
        }

        form.edit_field("EMAIL_LOCATARIO", "bia@example.com").unwrap();
        assert!(form.submit().is_ok());
    }

    #[test]
    fn test_postal_autofill() {
        let mut form = residential();
        form.edit_field("CEP_IMOVEL", "01310").unwrap();
        assert_eq!(form.postal_autofill_target("CEP_IMOVEL"), None);

        form.edit_field("CEP_IMOVEL", "01310100").unwrap();
        assert_eq!(
            form.postal_autofill_target("CEP_IMOVEL").as_deref(),
            Some("01310100")
        );
        assert_eq!(form.postal_autofill_target("NOME_LOCADOR"), None);

        let address = PostalAddress {
            street: "Avenida Paulista".to_string(),
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
        };
        let filled = form.apply_postal_address("CEP_IMOVEL", &address);
        assert_eq!(
            filled,
            vec!["ENDERECO_IMOVEL", "BAIRRO_IMOVEL", "CIDADE_IMOVEL", "ESTADO_IMOVEL"]
        );
        assert_eq!(form.value("CIDADE_IMOVEL"), Some("São Paulo"));
    }
}
