//! Placeholder extraction and field-name classification.

use serde::Serialize;
use utoipa::ToSchema;

use super::validation::{
    self, ValidationError, ORG_TAX_ID_DIGITS, PERSON_TAX_ID_DIGITS, PHONE_MIN_DIGITS,
    POSTAL_CODE_DIGITS,
};

/// Returns the distinct `[NAME]` placeholders of `body` in first-appearance order.
///
/// Each `[` pairs with the nearest following `]`. A `[` that reappears before the
/// closing bracket restarts the candidate, so `[[A]` yields `A`. Empty brackets and
/// unterminated openings are ignored.
pub fn extract_fields(body: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut open: Option<usize> = None;

    for (index, ch) in body.char_indices() {
        match ch {
            '[' => open = Some(index + ch.len_utf8()),
            ']' => {
                if let Some(start) = open.take() {
                    let name = &body[start..index];
                    if !name.is_empty() && !fields.iter().any(|f| f == name) {
                        fields.push(name.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    fields
}

/// Semantic type of a form field, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    PersonTaxId,
    OrgTaxId,
    Phone,
    Email,
    PostalCode,
    Date,
    Text,
}

/// Ordered classification table: the first rule with a token present in the field
/// name wins.
const CLASSIFICATION_RULES: &[(&[&str], FieldKind)] = &[
    (&["CNPJ"], FieldKind::OrgTaxId),
    (&["CPF"], FieldKind::PersonTaxId),
    (&["TELEFONE", "CELULAR", "WHATSAPP"], FieldKind::Phone),
    (&["EMAIL"], FieldKind::Email),
    (&["CEP"], FieldKind::PostalCode),
    (&["DATA"], FieldKind::Date),
];

/// Classifies a field by the `_`-separated tokens of its name.
pub fn classify_field(name: &str) -> FieldKind {
    let upper = name.to_ascii_uppercase();
    let tokens: Vec<&str> = upper.split('_').collect();

    CLASSIFICATION_RULES
        .iter()
        .find(|(keys, _)| keys.iter().any(|key| tokens.contains(key)))
        .map(|(_, kind)| *kind)
        .unwrap_or(FieldKind::Text)
}

impl FieldKind {
    /// Applies the kind's input mask. Plain text is passed through untouched.
    pub fn format(self, raw: &str) -> String {
        match self {
            Self::PersonTaxId => validation::format_tax_id_person(raw),
            Self::OrgTaxId => validation::format_tax_id_org(raw),
            Self::Phone => validation::format_phone(raw),
            Self::PostalCode => validation::format_postal_code(raw),
            Self::Date => validation::format_date(raw),
            Self::Email => raw.trim().to_string(),
            Self::Text => raw.to_string(),
        }
    }

    /// Whether a formatted value is complete enough to be judged.
    pub fn is_complete(self, formatted: &str) -> bool {
        let digits = validation::digits_only(formatted).len();
        match self {
            Self::PersonTaxId => digits >= PERSON_TAX_ID_DIGITS,
            Self::OrgTaxId => digits >= ORG_TAX_ID_DIGITS,
            Self::Phone => digits >= PHONE_MIN_DIGITS,
            Self::PostalCode => digits >= POSTAL_CODE_DIGITS,
            Self::Date => digits >= 8,
            Self::Email => formatted.contains('@'),
            Self::Text => false,
        }
    }

    pub fn is_valid(self, formatted: &str) -> bool {
        self.check("", formatted).is_none()
    }

    /// The error for `formatted`, or `None` when it is valid. Free text always is.
    pub fn check(self, field: &str, formatted: &str) -> Option<ValidationError> {
        let (valid, error): (bool, fn(&str) -> ValidationError) = match self {
            Self::PersonTaxId => (
                validation::validate_tax_id_person(formatted),
                ValidationError::invalid_person_tax_id,
            ),
            Self::OrgTaxId => (
                validation::validate_tax_id_org(formatted),
                ValidationError::invalid_org_tax_id,
            ),
            Self::Phone => (validation::validate_phone(formatted), ValidationError::invalid_phone),
            Self::Email => (validation::validate_email(formatted), ValidationError::invalid_email),
            Self::PostalCode => (
                validation::validate_postal_code(formatted),
                ValidationError::invalid_postal_code,
            ),
            Self::Date => {
                return (!validation::validate_date(formatted))
                    .then(|| ValidationError::invalid_date(field, formatted));
            }
            Self::Text => return None,
        };
        (!valid).then(|| error(field))
    }

    /// Formats `raw`, then judges it once complete.
    ///
    /// Returns the formatted value and the error message; an empty message means the
    /// value is valid or not yet complete enough to judge.
    pub fn apply(self, field: &str, raw: &str) -> (String, String) {
        let formatted = self.format(raw);
        let message = if !formatted.is_empty() && self.is_complete(&formatted) {
            self.check(field, &formatted)
                .map(|error| error.message)
                .unwrap_or_default()
        } else {
            String::new()
        };
        (formatted, message)
    }
}

/// Human label for a field name, e.g. `NOME_LOCADOR` becomes `Nome locador`.
pub fn field_label(name: &str) -> String {
    let spaced = name.replace('_', " ").to_lowercase();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fields_first_appearance_order() {
        let body = "[B] and [A], then [B] again and [C].";
        assert_eq!(extract_fields(body), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_extract_fields_without_placeholders() {
        assert!(extract_fields("no placeholders here").is_empty());
        assert!(extract_fields("").is_empty());
    }

    #[test]
    fn test_extract_fields_odd_brackets() {
        assert_eq!(extract_fields("[A][B]"), vec!["A", "B"]);
        assert_eq!(extract_fields("[[A]]"), vec!["A"]);
        assert_eq!(extract_fields("[] [X"), Vec::<String>::new());
        assert_eq!(extract_fields("] [Ç] "), vec!["Ç"]);
    }

    #[test]
    fn test_classify_field() {
        assert_eq!(classify_field("CPF_LOCADOR"), FieldKind::PersonTaxId);
        assert_eq!(classify_field("CPF_REPRESENTANTE_IMOB"), FieldKind::PersonTaxId);
        assert_eq!(classify_field("CNPJ_LOCATARIO"), FieldKind::OrgTaxId);
        assert_eq!(classify_field("TELEFONE_LOCATARIO"), FieldKind::Phone);
        assert_eq!(classify_field("EMAIL_IMOBILIARIA"), FieldKind::Email);
        assert_eq!(classify_field("CEP_IMOVEL"), FieldKind::PostalCode);
        assert_eq!(classify_field("DATA_INICIO"), FieldKind::Date);
        assert_eq!(classify_field("ESTADO_CIVIL_LOCADOR"), FieldKind::Text);
        assert_eq!(classify_field("DIA_VENCIMENTO"), FieldKind::Text);
    }

    #[test]
    fn test_apply_defers_judgement_until_complete() {
        let (value, error) = FieldKind::PersonTaxId.apply("CPF_LOCADOR", "1114447");
        assert_eq!(value, "111.444.7");
        assert!(error.is_empty());

        let (value, error) = FieldKind::PersonTaxId.apply("CPF_LOCADOR", "11144477736");
        assert_eq!(value, "111.444.777-36");
        assert_eq!(error, "CPF inválido");

        let (_, error) = FieldKind::Email.apply("EMAIL_LOCADOR", "maria");
        assert!(error.is_empty());
        let (_, error) = FieldKind::Email.apply("EMAIL_LOCADOR", "maria@");
        assert_eq!(error, "E-mail inválido");
    }

    #[test]
    fn test_check_never_rejects_free_text() {
        assert!(FieldKind::Text.check("NOME_LOCADOR", "").is_none());
        assert!(FieldKind::Text.check("NOME_LOCADOR", "qualquer coisa").is_none());
        assert!(FieldKind::Text.is_valid("[NOME_LOCADOR]"));

        let error = FieldKind::Date.check("DATA_INICIO", "31/02/2026").unwrap();
        assert_eq!(error.field, "DATA_INICIO");
        assert!(error.message.contains("31/02/2026"));
        assert!(FieldKind::Phone.check("TELEFONE", "+55 (11) 98888-8888").is_none());
    }

    #[test]
    fn test_field_label() {
        assert_eq!(field_label("NOME_LOCADOR"), "Nome locador");
        assert_eq!(field_label(""), "");
    }
}
