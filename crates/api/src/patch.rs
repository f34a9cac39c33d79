//! Shared input normalisation for create payloads and partial updates.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::Json;
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::{ApiError, ApiResult};

/// Deserializer for clearable patch fields: a missing key stays `None`
/// (keep the stored value) while an explicit `null` becomes `Some(None)`.
/// Use together with `#[serde(default)]`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A timestamp accepted either as RFC 3339 or as a bare `YYYY-MM-DD` date
/// (midnight UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct When(pub DateTime<Utc>);

impl<'de> Deserialize<'de> for When {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_when(&raw)
            .map(When)
            .ok_or_else(|| de::Error::custom(format!("invalid date '{raw}'")))
    }
}

pub fn parse_when(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|value| value.and_utc())
        })
}

pub fn required_when(value: Option<When>, field: &str) -> ApiResult<DateTime<Utc>> {
    value
        .map(|When(at)| at)
        .ok_or_else(|| ApiError::validation(format!("{field} is required")))
}

pub fn required_text(value: Option<String>, field: &str) -> ApiResult<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ApiError::validation(format!("{field} is required"))),
    }
}

/// A patched required field may be omitted but never blanked.
pub fn patched_text(value: Option<String>, field: &str) -> ApiResult<Option<String>> {
    value.map(|text| required_text(Some(text), field)).transpose()
}

pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub fn email(value: Option<String>, field: &str) -> ApiResult<String> {
    let email = required_text(value, field)?.to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ApiError::validation(format!("{field} is not a valid email address")));
    }
    Ok(email)
}

/// Tags are a set: trimmed, blanks dropped, duplicates removed in first-seen order.
pub fn tags(values: Vec<String>) -> Json {
    let mut seen: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let tag = value.trim();
        if !tag.is_empty() && !seen.iter().any(|existing| existing == tag) {
            seen.push(tag.to_string());
        }
    }
    Json::from(seen)
}

pub fn to_json<T: Serialize>(value: &T) -> ApiResult<Json> {
    serde_json::to_value(value).map_err(|err| ApiError::internal(err.into()))
}

pub fn non_negative(value: f64, field: &str) -> ApiResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ApiError::validation(format!("{field} must be a non-negative number")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "nullable")]
        phone: Option<Option<String>>,
    }

    #[test]
    fn nullable_distinguishes_missing_from_null() {
        let missing: Sample = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.phone, None);
        let cleared: Sample = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert_eq!(cleared.phone, Some(None));
        let set: Sample = serde_json::from_str(r#"{"phone": "555"}"#).unwrap();
        assert_eq!(set.phone, Some(Some("555".to_string())));
    }

    #[test]
    fn required_text_rejects_blank() {
        assert!(required_text(Some("   ".into()), "Title").is_err());
        assert!(required_text(None, "Title").is_err());
        assert_eq!(required_text(Some(" Deal ".into()), "Title").unwrap(), "Deal");
        assert_eq!(patched_text(None, "Title").unwrap(), None);
        assert!(patched_text(Some("".into()), "Title").is_err());
    }

    #[test]
    fn email_is_lowercased_and_checked() {
        assert_eq!(email(Some("Ada@Example.COM".into()), "Email").unwrap(), "ada@example.com");
        assert!(email(Some("nobody".into()), "Email").is_err());
        assert!(email(Some("@example.com".into()), "Email").is_err());
    }

    #[test]
    fn dates_accept_timestamp_or_day() {
        let day = parse_when("2025-03-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        let stamp = parse_when("2025-03-01T10:30:00+02:00").unwrap();
        assert_eq!(stamp.to_rfc3339(), "2025-03-01T08:30:00+00:00");
        assert!(parse_when("next tuesday").is_none());
        assert!(serde_json::from_str::<When>("\"03/01/2025\"").is_err());
    }

    #[test]
    fn tags_are_deduplicated_in_order() {
        let json = tags(vec!["vip".into(), " enterprise ".into(), "vip".into(), "".into()]);
        assert_eq!(json, serde_json::json!(["vip", "enterprise"]));
    }
}
