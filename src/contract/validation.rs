//! Field formatters and validators for contract form input.
//!
//! Every function here is pure and total: any input, including the empty string,
//! yields a defined result. Formatters never fail, validators only answer yes/no,
//! and `ValidationError` carries the user-facing message (in Portuguese) for the
//! form controller.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

/// Number of digits in a person tax id (CPF).
pub const PERSON_TAX_ID_DIGITS: usize = 11;
/// Number of digits in an organization tax id (CNPJ).
pub const ORG_TAX_ID_DIGITS: usize = 14;
/// Number of digits in a postal code (CEP).
pub const POSTAL_CODE_DIGITS: usize = 8;
pub const PHONE_MIN_DIGITS: usize = 10;
pub const PHONE_MAX_DIGITS: usize = 13;

const ORG_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const ORG_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

static PHONE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+\d{2} )?\([1-9]\d\) 9?\d{4}-\d{4}$").expect("phone pattern is valid")
});

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Validation error with detailed, user-friendly messages.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message in Portuguese
    pub message: String,
    /// Suggestion for how to fix the error
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} é obrigatório", label))
            .with_suggestion(format!("Preencha {} com um valor válido", label.to_lowercase()))
    }

    pub fn invalid_person_tax_id(field: &str) -> Self {
        Self::new(field, "CPF inválido")
            .with_suggestion("Confira os 11 dígitos, exemplo: 111.444.777-35")
    }

    pub fn invalid_org_tax_id(field: &str) -> Self {
        Self::new(field, "CNPJ inválido")
            .with_suggestion("Confira os 14 dígitos, exemplo: 11.222.333/0001-81")
    }

    pub fn invalid_phone(field: &str) -> Self {
        Self::new(field, "Telefone inválido")
            .with_suggestion("Use o formato +55 (11) 98888-8888")
    }

    pub fn invalid_email(field: &str) -> Self {
        Self::new(field, "E-mail inválido").with_suggestion("Use o formato nome@dominio.com")
    }

    pub fn invalid_postal_code(field: &str) -> Self {
        Self::new(field, "CEP inválido").with_suggestion("Use o formato 00000-000")
    }

    pub fn invalid_date(field: &str, value: &str) -> Self {
        Self::new(field, format!("Data '{}' inválida", value))
            .with_suggestion("Use o formato DD/MM/AAAA, exemplo: 01/02/2025")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors with formatted output.
#[derive(Debug, Default, Clone)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Multi-line message listing every error, suitable for a user-facing toast.
    pub fn to_message(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }

        let mut parts = vec![format!(
            "Validação falhou: {} erro(s) encontrado(s)\n",
            self.errors.len()
        )];

        for (i, error) in self.errors.iter().enumerate() {
            parts.push(format!("{}. {}", i + 1, error));
        }

        parts.push(String::new());
        parts.push("Corrija os dados acima e tente novamente.".to_string());

        parts.join("\n")
    }
}

// ============================================================================
// Formatters
// ============================================================================

pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn digits_truncated(value: &str, max: usize) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).take(max).collect()
}

/// Inserts each `(index, separator)` break before the digit at `index`, once the
/// value is long enough to reach it.
fn mask(digits: &str, breaks: &[(usize, char)]) -> String {
    let mut out = String::with_capacity(digits.len() + breaks.len());
    for (index, ch) in digits.chars().enumerate() {
        if let Some((_, separator)) = breaks.iter().find(|(at, _)| *at == index) {
            out.push(*separator);
        }
        out.push(ch);
    }
    out
}

/// Formats a CPF progressively as `000.000.000-00`, keeping at most 11 digits.
pub fn format_tax_id_person(raw: &str) -> String {
    let digits = digits_truncated(raw, PERSON_TAX_ID_DIGITS);
    mask(&digits, &[(3, '.'), (6, '.'), (9, '-')])
}

/// Formats a CNPJ progressively as `00.000.000/0000-00`, keeping at most 14 digits.
pub fn format_tax_id_org(raw: &str) -> String {
    let digits = digits_truncated(raw, ORG_TAX_ID_DIGITS);
    mask(&digits, &[(2, '.'), (5, '.'), (8, '/'), (12, '-')])
}

/// Formats a phone number.
///
/// Below ten digits the bare digits are returned so partial input stays editable.
/// From ten digits on, area-code punctuation is inserted; twelve and thirteen digit
/// values carry a leading country code.
pub fn format_phone(raw: &str) -> String {
    let digits = digits_truncated(raw, PHONE_MAX_DIGITS);
    if digits.len() < PHONE_MIN_DIGITS {
        return digits;
    }

    let (country, rest) = if digits.len() >= 12 {
        (Some(&digits[..2]), &digits[2..])
    } else {
        (None, digits.as_str())
    };

    let area = &rest[..2];
    let subscriber = &rest[2..];
    let split = subscriber.len() - 4;
    let local = format!("({}) {}-{}", area, &subscriber[..split], &subscriber[split..]);

    match country {
        Some(code) => format!("+{} {}", code, local),
        None => local,
    }
}

/// Formats a CEP as `00000-000`, keeping at most 8 digits.
pub fn format_postal_code(raw: &str) -> String {
    let digits = digits_truncated(raw, POSTAL_CODE_DIGITS);
    mask(&digits, &[(5, '-')])
}

/// Formats a date progressively as `DD/MM/AAAA`, keeping at most 8 digits.
pub fn format_date(raw: &str) -> String {
    let digits = digits_truncated(raw, 8);
    mask(&digits, &[(2, '/'), (4, '/')])
}

// ============================================================================
// Validators
// ============================================================================

fn to_digit_values(digits: &str) -> Vec<u32> {
    digits.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_equal(values: &[u32]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

fn mod11_check_digit(sum: u32) -> u32 {
    let rest = sum % 11;
    if rest < 2 {
        0
    } else {
        11 - rest
    }
}

/// Validates a CPF by recomputing both modulo-11 check digits.
pub fn validate_tax_id_person(formatted: &str) -> bool {
    let values = to_digit_values(&digits_only(formatted));
    if values.len() != PERSON_TAX_ID_DIGITS || all_equal(&values) {
        return false;
    }

    let first_sum: u32 = values[..9]
        .iter()
        .enumerate()
        .map(|(i, d)| d * (10 - i as u32))
        .sum();
    let first = mod11_check_digit(first_sum);

    let second_sum: u32 = values[..10]
        .iter()
        .enumerate()
        .map(|(i, d)| d * (11 - i as u32))
        .sum();
    let second = mod11_check_digit(second_sum);

    first == values[9] && second == values[10]
}

/// Validates a CNPJ against its weighted modulo-11 check digits.
pub fn validate_tax_id_org(formatted: &str) -> bool {
    let values = to_digit_values(&digits_only(formatted));
    if values.len() != ORG_TAX_ID_DIGITS || all_equal(&values) {
        return false;
    }

    let weighted = |weights: &[u32]| -> u32 {
        values.iter().zip(weights.iter()).map(|(d, w)| d * w).sum()
    };

    let first = mod11_check_digit(weighted(&ORG_FIRST_WEIGHTS));
    let second = mod11_check_digit(weighted(&ORG_SECOND_WEIGHTS));

    first == values[12] && second == values[13]
}

/// Validates a formatted phone: 10 to 13 digits and a well-formed shape.
pub fn validate_phone(formatted: &str) -> bool {
    let count = digits_only(formatted).len();
    (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&count) && PHONE_SHAPE.is_match(formatted.trim())
}

/// Loose `local@domain.tld` shape check.
pub fn validate_email(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value.trim())
}

pub fn validate_postal_code(value: &str) -> bool {
    let trimmed = value.trim();
    let digits = digits_only(trimmed);
    digits.len() == POSTAL_CODE_DIGITS
        && trimmed.chars().all(|c| c.is_ascii_digit() || c == '-')
}

/// Accepts `DD/MM/AAAA` values that name a real calendar date.
pub fn validate_date(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() == 10 && NaiveDate::parse_from_str(trimmed, "%d/%m/%Y").is_ok()
}

/// Accepts inspection tokens of the form `MR3X-VST-<year>-<CODE>`.
pub fn validate_inspection_token(token: &str, year: i32) -> bool {
    let prefix = format!("MR3X-VST-{}-", year);
    match token.strip_prefix(&prefix) {
        Some(code) => {
            !code.is_empty()
                && code
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        }
        None => false,
    }
}

/// Validate that a string is not empty after trimming
pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_person_tax_id_progressively() {
        assert_eq!(format_tax_id_person(""), "");
        assert_eq!(format_tax_id_person("111"), "111");
        assert_eq!(format_tax_id_person("1114"), "111.4");
        assert_eq!(format_tax_id_person("111444777"), "111.444.777");
        assert_eq!(format_tax_id_person("11144477735"), "111.444.777-35");
        assert_eq!(format_tax_id_person("111.444.777-3599"), "111.444.777-35");
    }

    #[test]
    fn test_validate_person_tax_id() {
        assert!(validate_tax_id_person("111.444.777-35"));
        assert!(validate_tax_id_person("52998224725"));
        assert!(!validate_tax_id_person("111.444.777-36"));
        assert!(!validate_tax_id_person("111.111.111-11"));
        assert!(!validate_tax_id_person("123"));
        assert!(!validate_tax_id_person(""));
    }

    #[test]
    fn test_org_tax_id() {
        assert_eq!(format_tax_id_org("11222333000181"), "11.222.333/0001-81");
        assert!(validate_tax_id_org("11.222.333/0001-81"));
        assert!(!validate_tax_id_org("11.222.333/0001-82"));
        assert!(!validate_tax_id_org("00.000.000/0000-00"));
        assert!(!validate_tax_id_org("abc"));
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("119888"), "119888");
        assert_eq!(format_phone("1188888888"), "(11) 8888-8888");
        assert_eq!(format_phone("11988888888"), "(11) 98888-8888");
        assert_eq!(format_phone("551188888888"), "+55 (11) 8888-8888");
        assert_eq!(format_phone("5511988888888"), "+55 (11) 98888-8888");
        assert_eq!(format_phone("+55 (11) 98888-8888 ext"), "+55 (11) 98888-8888");
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+55 (11) 98888-8888"));
        assert!(validate_phone("(11) 8888-8888"));
        assert!(!validate_phone("(01) 8888-8888"));
        assert!(!validate_phone("988888888"));
        assert!(!validate_phone(""));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("maria@example.com"));
        assert!(!validate_email("maria@example"));
        assert!(!validate_email("maria@@example.com"));
        assert!(!validate_email("maria example@x.com"));
        assert!(!validate_email(""));
    }

    #[test]
    fn test_postal_code_and_date() {
        assert_eq!(format_postal_code("01310100"), "01310-100");
        assert!(validate_postal_code("01310-100"));
        assert!(!validate_postal_code("01310-10"));
        assert_eq!(format_date("01022025"), "01/02/2025");
        assert_eq!(format_date("010"), "01/0");
        assert!(validate_date("29/02/2024"));
        assert!(!validate_date("29/02/2025"));
        assert!(!validate_date("1/2/2025"));
    }

    #[test]
    fn test_inspection_token() {
        assert!(validate_inspection_token("MR3X-VST-2026-AB12", 2026));
        assert!(!validate_inspection_token("MR3X-VST-2025-AB12", 2026));
        assert!(!validate_inspection_token("MR3X-VST-2026-", 2026));
        assert!(!validate_inspection_token("MR3X-VST-2026-ab12", 2026));
    }

    #[test]
    fn test_validation_errors_message() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::empty_field("NOME_LOCADOR", "Nome do locador"));
        errors.add(ValidationError::invalid_email("EMAIL_LOCADOR"));

        let msg = errors.to_message();
        assert!(msg.contains("2 erro(s)"));
        assert!(msg.contains("Nome do locador é obrigatório"));
        assert!(msg.contains("E-mail inválido"));
    }
}
