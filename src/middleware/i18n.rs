// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const SUPPORTED: &[&str] = &["ar", "en"];
const DEFAULT_LANG: &str = "ar";

// Extrator de idioma (Accept-Language). Só "ar" e "en" têm mensagens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    pub fn from_header(value: &str) -> Self {
        // "ar-EG" -> "ar"; o primeiro idioma suportado vence.
        accept_language::parse(value)
            .iter()
            .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            .find(|lang| SUPPORTED.contains(&lang.as_str()))
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_language() {
        assert_eq!(Locale::from_header("fr-FR, en;q=0.8, ar;q=0.5").0, "en");
        assert_eq!(Locale::from_header("ar-EG").0, "ar");
    }

    #[test]
    fn falls_back_to_arabic() {
        assert_eq!(Locale::from_header("pt-BR").0, "ar");
        assert_eq!(Locale::default().0, "ar");
    }
}
