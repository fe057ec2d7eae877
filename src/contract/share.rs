//! Messaging share link for an exported contract.

use reqwest::Url;

use super::validation::{digits_only, ValidationError};

const SHARE_BASE_URL: &str = "https://wa.me/";
const SHARE_PHONE_MIN_DIGITS: usize = 12;
const SHARE_PHONE_MAX_DIGITS: usize = 13;

/// Public verification address of a contract.
pub fn verify_url(verify_base: &str, token: &str) -> String {
    format!("{}/{}", verify_base.trim_end_matches('/'), token)
}

fn share_message(token: &str, verify_base: &str) -> String {
    format!(
        "*Contrato MR3X - {}*\n\nO contrato foi gerado e assinado digitalmente com sucesso!\n\nO PDF do contrato deve ser anexado a esta mensagem.\n\nVerifique a autenticidade em: {}",
        token,
        verify_url(verify_base, token)
    )
}

/// Builds a `wa.me` link with a pre-filled message. The phone must carry country and
/// area codes (12 or 13 digits).
pub fn share_link(phone: &str, token: &str, verify_base: &str) -> Result<Url, ValidationError> {
    let digits = digits_only(phone);
    if !(SHARE_PHONE_MIN_DIGITS..=SHARE_PHONE_MAX_DIGITS).contains(&digits.len()) {
        return Err(ValidationError::invalid_phone("phone")
            .with_suggestion("Número de WhatsApp inválido. Use formato: +55 (11) 98888-8888"));
    }

    let base = format!("{}{}", SHARE_BASE_URL, digits);
    Url::parse_with_params(&base, &[("text", share_message(token, verify_base))])
        .map_err(|e| ValidationError::new("phone", format!("Link inválido: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_link() {
        let url = share_link(
            "+55 (11) 98888-8888",
            "MR3X-CTR-2026-ABC",
            "https://mr3x.com.br/verify",
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("wa.me"));
        assert_eq!(url.path(), "/5511988888888");

        let text = url
            .query_pairs()
            .find(|(k, _)| k == "text")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(text.contains("MR3X-CTR-2026-ABC"));
        assert!(text.contains("https://mr3x.com.br/verify/MR3X-CTR-2026-ABC"));
    }

    #[test]
    fn test_share_link_rejects_local_numbers() {
        assert!(share_link("(11) 98888-8888", "T", "https://x").is_err());
        assert!(share_link("", "T", "https://x").is_err());
    }
}
