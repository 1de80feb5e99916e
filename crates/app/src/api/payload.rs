//! Wire types for the warranty backend.
//!
//! Backend records are loosely typed; everything passes through
//! [`WarrantyPayload`] and is validated into a [`Warranty`] before use.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use warranty_core::{LocalAccountKey, Warranty, WarrantyError, parse_form_date};

/// Coverage assumed when a backend record carries no expiry date.
pub const DEFAULT_COVERAGE_DAYS: u64 = 365;

/// Icon used when a record names none.
pub const DEFAULT_ICON: &str = "cellphone";

/// Date format used by the backend's generated records.
const BACKEND_DATE_FORMAT: &str = "%d/%m/%Y";

/// Why a backend record was rejected.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// A required field was absent or blank.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The record failed warranty validation.
    #[error(transparent)]
    Invalid(#[from] WarrantyError),
}

/// A warranty record as the backend sends it.
///
/// Any `progress` or `timeAgo` text in the record is ignored; both are
/// recomputed from the dates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WarrantyPayload {
    #[serde(alias = "product")]
    pub title: Option<String>,
    #[serde(alias = "brand")]
    pub subtitle: Option<String>,
    #[serde(alias = "date")]
    pub purchase_date: Option<String>,
    pub expiry_date: Option<String>,
    #[serde(alias = "icon")]
    pub icon_name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub store: Option<String>,
    pub service_center: Option<String>,
    pub price: Option<serde_json::Value>,
    pub notes: Option<String>,
}

impl TryFrom<WarrantyPayload> for Warranty {
    type Error = PayloadError;

    fn try_from(payload: WarrantyPayload) -> Result<Self, Self::Error> {
        let title = present(payload.title).ok_or(PayloadError::MissingField("title"))?;
        let purchase_raw =
            present(payload.purchase_date).ok_or(PayloadError::MissingField("purchaseDate"))?;
        let purchase = parse_backend_date("purchaseDate", &purchase_raw)?;

        let expiry = match present(payload.expiry_date) {
            Some(raw) => parse_backend_date("expiryDate", &raw)?,
            None => purchase
                .checked_add_days(Days::new(DEFAULT_COVERAGE_DAYS))
                .ok_or(PayloadError::MissingField("expiryDate"))?,
        };

        let mut warranty = Self::new(title, purchase, expiry)?;
        warranty.brand = present(payload.subtitle);
        warranty.icon = present(payload.icon_name);
        warranty.manufacturer = present(payload.manufacturer);
        warranty.model = present(payload.model);
        warranty.store = present(payload.store);
        warranty.service_center = present(payload.service_center);
        warranty.notes = present(payload.notes);
        warranty.price = payload.price.as_ref().map(parse_price).transpose()?;
        Ok(warranty)
    }
}

/// Parse `YYYY-MM-DD`, falling back to the backend's `DD/MM/YYYY`.
fn parse_backend_date(field: &'static str, value: &str) -> Result<NaiveDate, WarrantyError> {
    let value = value.trim();
    parse_form_date(field, value).or_else(|err| {
        NaiveDate::parse_from_str(value, BACKEND_DATE_FORMAT).map_err(|_| err)
    })
}

fn parse_price(value: &serde_json::Value) -> Result<Decimal, WarrantyError> {
    let raw = match value {
        serde_json::Value::String(s) => s.trim().to_owned(),
        other => other.to_string(),
    };
    match Decimal::from_str(&raw) {
        Ok(price) if !price.is_sign_negative() => Ok(price),
        _ => Err(WarrantyError::InvalidPrice(raw)),
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Body of `GET /get_warranties`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WarrantiesResponse {
    /// Decoded one by one so a single bad record does not sink the list.
    #[serde(default)]
    pub warranties: Vec<serde_json::Value>,
}

/// Body of `POST /warranties`.
#[derive(Debug, Serialize)]
pub(crate) struct SubmitWarranty<'a> {
    pub user_id: LocalAccountKey,
    #[serde(flatten)]
    pub warranty: &'a Warranty,
}

/// Body of `GET /get_recommendation`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecommendationsResponse {
    #[serde(default)]
    pub recommendations: Vec<serde_json::Value>,
    pub message: Option<String>,
}

impl RecommendationsResponse {
    /// Decode each item on its own; malformed items are skipped and counted.
    pub fn into_recommendations(self) -> (Vec<Recommendation>, usize) {
        let mut accepted = Vec::with_capacity(self.recommendations.len());
        let mut rejected = 0;
        for (index, raw) in self.recommendations.into_iter().enumerate() {
            match serde_json::from_value::<Recommendation>(raw) {
                Ok(recommendation) => accepted.push(recommendation),
                Err(e) => {
                    tracing::info!(index, reason = %e, "Skipping invalid recommendation");
                    rejected += 1;
                }
            }
        }
        (accepted, rejected)
    }
}

/// A product suggested for the account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
    pub product_id: Option<i64>,
    pub category_code: Option<String>,
    pub brand: Option<String>,
    pub similarity_score: Option<f64>,
    #[serde(rename = "iconName")]
    pub icon_name: Option<String>,
}

impl Recommendation {
    /// Display title, e.g. `"samsung smartphone"` for brand `samsung` and
    /// category `electronics.smartphone`.
    #[must_use]
    pub fn title(&self) -> String {
        let brand = self.brand.as_deref().map(str::trim).filter(|b| !b.is_empty());
        match (brand, self.product_id) {
            (Some(brand), _) => {
                let kind = self
                    .category_code
                    .as_deref()
                    .and_then(|code| code.rsplit('.').next())
                    .map(str::trim)
                    .filter(|segment| !segment.is_empty())
                    .unwrap_or("Product");
                format!("{brand} {kind}")
            }
            (None, Some(id)) => format!("Product {id}"),
            (None, None) => "Product".to_owned(),
        }
    }

    /// Icon name, defaulting to [`DEFAULT_ICON`].
    #[must_use]
    pub fn icon(&self) -> &str {
        self.icon_name.as_deref().unwrap_or(DEFAULT_ICON)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn payload(json: serde_json::Value) -> WarrantyPayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_backend_record_converts() {
        let warranty = Warranty::try_from(payload(serde_json::json!({
            "title": "smartphone",
            "subtitle": "samsung",
            "date": "15/03/2024",
            "timeAgo": "in 3 months",
            "iconName": "smartphone",
            "progress": 42.0
        })))
        .unwrap();

        assert_eq!(warranty.product(), "smartphone");
        assert_eq!(warranty.brand.as_deref(), Some("samsung"));
        assert_eq!(warranty.icon.as_deref(), Some("smartphone"));
        assert_eq!(warranty.purchase_date(), date("2024-03-15"));
        assert_eq!(warranty.expiry_date(), date("2025-03-15"));
    }

    #[test]
    fn test_explicit_dates_and_price() {
        let warranty = Warranty::try_from(payload(serde_json::json!({
            "product": "Laptop",
            "brand": "Lenovo",
            "purchaseDate": "2024-01-01",
            "expiryDate": "2026-01-01",
            "price": 1299.5
        })))
        .unwrap();

        assert_eq!(warranty.expiry_date(), date("2026-01-01"));
        assert_eq!(warranty.price, Some(Decimal::new(12995, 1)));
    }

    #[test]
    fn test_string_price() {
        let warranty = Warranty::try_from(payload(serde_json::json!({
            "title": "Kettle",
            "purchaseDate": "2024-01-01",
            "price": "24.99"
        })))
        .unwrap();
        assert_eq!(warranty.price, Some(Decimal::new(2499, 2)));
    }

    #[test]
    fn test_missing_title_rejected() {
        let err = Warranty::try_from(payload(serde_json::json!({
            "purchaseDate": "2024-01-01"
        })))
        .unwrap_err();
        assert!(matches!(err, PayloadError::MissingField("title")));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = Warranty::try_from(payload(serde_json::json!({
            "title": "Phone",
            "purchaseDate": "2024-06-01",
            "expiryDate": "2024-01-01"
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            PayloadError::Invalid(WarrantyError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_garbage_date_rejected() {
        let err = Warranty::try_from(payload(serde_json::json!({
            "title": "Phone",
            "date": "yesterday"
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            PayloadError::Invalid(WarrantyError::InvalidDateFormat { .. })
        ));
    }

    #[test]
    fn test_negative_price_rejected() {
        let err = Warranty::try_from(payload(serde_json::json!({
            "title": "Phone",
            "date": "01/01/2024",
            "price": -5
        })))
        .unwrap_err();
        assert!(matches!(
            err,
            PayloadError::Invalid(WarrantyError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_recommendation_title() {
        let rec = Recommendation {
            brand: Some("samsung".into()),
            category_code: Some("electronics.smartphone".into()),
            ..Default::default()
        };
        assert_eq!(rec.title(), "samsung smartphone");
        assert_eq!(rec.icon(), "cellphone");

        let no_category = Recommendation {
            brand: Some("apple".into()),
            ..Default::default()
        };
        assert_eq!(no_category.title(), "apple Product");

        let anonymous = Recommendation {
            product_id: Some(1_004_856),
            ..Default::default()
        };
        assert_eq!(anonymous.title(), "Product 1004856");
        assert_eq!(Recommendation::default().title(), "Product");
    }

    #[test]
    fn test_submit_body_includes_user_id() {
        let warranty = Warranty::new("Phone", date("2024-01-01"), date("2025-01-01")).unwrap();
        let body = serde_json::to_value(SubmitWarranty {
            user_id: LocalAccountKey::new(42),
            warranty: &warranty,
        })
        .unwrap();

        assert_eq!(body["user_id"], 42);
        assert_eq!(body["product"], "Phone");
        assert_eq!(body["expiryDate"], "2025-01-01");
    }

    #[test]
    fn test_recommendations_message_only() {
        let body: RecommendationsResponse =
            serde_json::from_str(r#"{"message": "No user history found"}"#).unwrap();
        assert!(body.recommendations.is_empty());
        assert_eq!(body.message.as_deref(), Some("No user history found"));
    }

    #[test]
    fn test_malformed_recommendation_skipped() {
        let body: RecommendationsResponse = serde_json::from_str(
            r#"{"recommendations": [
                {"product_id": 1, "brand": "sony"},
                {"product_id": "abc"},
                "not an object",
                {"product_id": 2, "similarity_score": 0.5}
            ]}"#,
        )
        .unwrap();

        let (recommendations, rejected) = body.into_recommendations();
        assert_eq!(rejected, 2);
        let ids: Vec<_> = recommendations.iter().map(|r| r.product_id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }
}
