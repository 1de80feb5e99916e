//! Warranty records.
//!
//! [`Warranty`] is the single validated shape used everywhere downstream.
//! Raw form input arrives as a [`WarrantyDraft`] and is checked once at the
//! boundary.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::{Classification, StatusPolicy};

/// Date format accepted from form input.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors that can occur when building a [`Warranty`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WarrantyError {
    /// The product name is empty.
    #[error("product name cannot be empty")]
    EmptyProduct,
    /// A date field is not in `YYYY-MM-DD` form or is not a real date.
    #[error("{field} must be a date in YYYY-MM-DD format (got {value:?})")]
    InvalidDateFormat {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected input.
        value: String,
    },
    /// The expiry date precedes the purchase date.
    #[error("expiry date {expiry} is before purchase date {purchase}")]
    InvalidDateRange {
        /// Purchase date.
        purchase: NaiveDate,
        /// Expiry date.
        expiry: NaiveDate,
    },
    /// The price is not a non-negative decimal.
    #[error("invalid price: {0:?}")]
    InvalidPrice(String),
}

/// A product warranty.
///
/// Construction guarantees a non-empty product name and
/// `expiry_date >= purchase_date`. Only serialization is derived; inbound
/// data goes through [`WarrantyDraft::validate`] or a payload conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warranty {
    product: String,
    purchase_date: NaiveDate,
    expiry_date: NaiveDate,
    /// Brand shown under the product name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Manufacturer, when different from the brand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Model name or number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Store the product was bought from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Authorised service center.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_center: Option<String>,
    /// Purchase price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Icon name used by list views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Warranty {
    /// Create a warranty with only the required fields set.
    ///
    /// # Errors
    ///
    /// Returns [`WarrantyError::EmptyProduct`] for a blank product name and
    /// [`WarrantyError::InvalidDateRange`] if `expiry_date < purchase_date`.
    pub fn new(
        product: impl Into<String>,
        purchase_date: NaiveDate,
        expiry_date: NaiveDate,
    ) -> Result<Self, WarrantyError> {
        let product = product.into();
        if product.trim().is_empty() {
            return Err(WarrantyError::EmptyProduct);
        }
        if expiry_date < purchase_date {
            return Err(WarrantyError::InvalidDateRange {
                purchase: purchase_date,
                expiry: expiry_date,
            });
        }

        Ok(Self {
            product: product.trim().to_owned(),
            purchase_date,
            expiry_date,
            brand: None,
            manufacturer: None,
            model: None,
            store: None,
            service_center: None,
            price: None,
            notes: None,
            icon: None,
        })
    }

    /// Product display name.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Date of purchase.
    #[must_use]
    pub const fn purchase_date(&self) -> NaiveDate {
        self.purchase_date
    }

    /// Date coverage ends.
    #[must_use]
    pub const fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    /// Set the brand.
    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Set the icon name.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the purchase price.
    #[must_use]
    pub const fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Classify this warranty as of `now`.
    ///
    /// Infallible: the date range was checked at construction.
    #[must_use]
    pub fn classify(&self, now: NaiveDate, policy: &StatusPolicy) -> Classification {
        policy.classify_ordered(self.purchase_date, self.expiry_date, now)
    }
}

/// Unvalidated warranty fields as typed into the add-warranty form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WarrantyDraft {
    /// Product name (required).
    pub product: String,
    /// Purchase date, `YYYY-MM-DD` (required).
    pub purchase_date: String,
    /// Expiry date, `YYYY-MM-DD` (required).
    pub expiry_date: String,
    /// Optional brand.
    pub brand: String,
    /// Optional manufacturer.
    pub manufacturer: String,
    /// Optional model.
    pub model: String,
    /// Optional store.
    pub store: String,
    /// Optional service center.
    pub service_center: String,
    /// Optional price.
    pub price: String,
    /// Optional notes.
    pub notes: String,
}

impl WarrantyDraft {
    /// Validate the draft into a [`Warranty`].
    ///
    /// Blank optional fields become `None`.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: empty product, malformed date,
    /// inverted date range, or unparseable price.
    pub fn validate(&self) -> Result<Warranty, WarrantyError> {
        if self.product.trim().is_empty() {
            return Err(WarrantyError::EmptyProduct);
        }
        let purchase = parse_form_date("purchaseDate", &self.purchase_date)?;
        let expiry = parse_form_date("expiryDate", &self.expiry_date)?;

        let mut warranty = Warranty::new(&self.product, purchase, expiry)?;
        warranty.brand = non_blank(&self.brand);
        warranty.manufacturer = non_blank(&self.manufacturer);
        warranty.model = non_blank(&self.model);
        warranty.store = non_blank(&self.store);
        warranty.service_center = non_blank(&self.service_center);
        warranty.notes = non_blank(&self.notes);
        warranty.price = non_blank(&self.price)
            .map(|raw| parse_price(&raw))
            .transpose()?;

        Ok(warranty)
    }
}

/// Parse a strict `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`WarrantyError::InvalidDateFormat`] naming `field`.
pub fn parse_form_date(field: &'static str, value: &str) -> Result<NaiveDate, WarrantyError> {
    let invalid = || WarrantyError::InvalidDateFormat {
        field,
        value: value.to_owned(),
    };

    // chrono accepts unpadded fields; the form requires exactly 4-2-2 digits
    let shape_ok = value.len() == 10
        && value.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}

fn parse_price(raw: &str) -> Result<Decimal, WarrantyError> {
    let price = Decimal::from_str(raw).map_err(|_| WarrantyError::InvalidPrice(raw.to_owned()))?;
    if price.is_sign_negative() {
        return Err(WarrantyError::InvalidPrice(raw.to_owned()));
    }
    Ok(price)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::WarrantyStatus;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn draft() -> WarrantyDraft {
        WarrantyDraft {
            product: "Dishwasher".to_owned(),
            purchase_date: "2024-02-29".to_owned(),
            expiry_date: "2026-02-28".to_owned(),
            ..WarrantyDraft::default()
        }
    }

    #[test]
    fn test_new_rejects_empty_product() {
        let err = Warranty::new("  ", date("2024-01-01"), date("2025-01-01")).unwrap_err();
        assert_eq!(err, WarrantyError::EmptyProduct);
    }

    #[test]
    fn test_new_rejects_inverted_range() {
        let err = Warranty::new("TV", date("2025-01-01"), date("2024-01-01")).unwrap_err();
        assert!(matches!(err, WarrantyError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_validate_minimal_draft() {
        let warranty = draft().validate().unwrap();
        assert_eq!(warranty.product(), "Dishwasher");
        assert_eq!(warranty.purchase_date(), date("2024-02-29"));
        assert_eq!(warranty.brand, None);
        assert_eq!(warranty.price, None);
    }

    #[test]
    fn test_validate_optional_fields() {
        let warranty = WarrantyDraft {
            brand: " Bosch ".to_owned(),
            store: "".to_owned(),
            price: "649.99".to_owned(),
            ..draft()
        }
        .validate()
        .unwrap();
        assert_eq!(warranty.brand.as_deref(), Some("Bosch"));
        assert_eq!(warranty.store, None);
        assert_eq!(warranty.price, Some(Decimal::new(64999, 2)));
    }

    #[test]
    fn test_validate_rejects_bad_dates() {
        for bad in ["2024-2-29", "29/02/2024", "2024-13-01", "2023-02-29", ""] {
            let err = WarrantyDraft {
                purchase_date: bad.to_owned(),
                ..draft()
            }
            .validate()
            .unwrap_err();
            assert!(
                matches!(err, WarrantyError::InvalidDateFormat { field: "purchaseDate", .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_price() {
        for bad in ["abc", "-5"] {
            let err = WarrantyDraft {
                price: bad.to_owned(),
                ..draft()
            }
            .validate()
            .unwrap_err();
            assert!(matches!(err, WarrantyError::InvalidPrice(_)));
        }
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let err = WarrantyDraft {
            expiry_date: "2023-12-31".to_owned(),
            ..draft()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, WarrantyError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_classify_delegates_to_policy() {
        let warranty = Warranty::new("Laptop", date("2024-01-01"), date("2024-03-01")).unwrap();
        let result = warranty.classify(date("2024-02-15"), &StatusPolicy::default());
        assert_eq!(result.status, WarrantyStatus::Expiring);
    }

    #[test]
    fn test_serde_camel_case() {
        let warranty = Warranty::new("Router", date("2024-01-01"), date("2026-01-01"))
            .unwrap()
            .with_brand("Netgear");
        let json = serde_json::to_value(&warranty).unwrap();
        assert_eq!(json["purchaseDate"], "2024-01-01");
        assert_eq!(json["brand"], "Netgear");
        assert!(json.get("notes").is_none());
    }
}
