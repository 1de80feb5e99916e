//! Offline status classification.

use chrono::{Local, NaiveDate};
use warranty_app::error::AppError;
use warranty_core::{StatusPolicy, parse_form_date};

/// Classify a warranty and print its status, progress, and time left.
#[allow(clippy::print_stdout)]
pub fn run(
    purchase: &str,
    expiry: &str,
    now: Option<&str>,
    policy: &StatusPolicy,
) -> Result<(), AppError> {
    let purchase = parse_form_date("purchase", purchase)?;
    let expiry = parse_form_date("expiry", expiry)?;
    let now = now.map_or_else(|| Ok(today()), |raw| parse_form_date("now", raw))?;

    let result = policy.classify(purchase, expiry, now)?;
    println!("status:    {}", result.status);
    println!(
        "progress:  {}% ({})",
        result.progress.percent(),
        result.progress.band()
    );
    println!("expires:   {}", result.remaining());
    Ok(())
}

/// Today's date in local time.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

