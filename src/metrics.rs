//! Values derived from stored records for display. Nothing here is persisted.

use crate::models::{DerivedMetrics, PropertyRecord};
use crate::numeric::normalize;

/// Fixed mortgage term used for the loan estimate.
pub const LOAN_TERM_MONTHS: i32 = 360;

/// Price per square metre, rounded to a whole unit.
pub fn price_per_area(buy_price: Option<&str>, living_space: Option<&str>) -> Option<f64> {
    let price = normalize(buy_price)?;
    let area = normalize(living_space)?;
    if area == 0.0 {
        return None;
    }
    Some((price / area).round())
}

/// Principal that a fixed monthly payment pays off over 30 years at
/// `annual_rate_percent`, rounded to a whole unit.
///
/// This is the present value of an annuity:
/// `P = A * ((1 + r)^n - 1) / (r * (1 + r)^n)` with `r` the monthly rate.
pub fn loan_estimate(monthly_payment: Option<&str>, annual_rate_percent: f64) -> Option<f64> {
    let payment = normalize(monthly_payment)?;
    if payment == 0.0 {
        return None;
    }

    let monthly_rate = annual_rate_percent / 100.0 / 12.0;
    if !monthly_rate.is_finite() || monthly_rate <= 0.0 {
        return None;
    }

    let growth = (1.0 + monthly_rate).powi(LOAN_TERM_MONTHS);
    let principal = payment * (growth - 1.0) / (monthly_rate * growth);
    principal.is_finite().then(|| principal.round())
}

/// Metrics for one record. The loan estimate treats the commune's monthly
/// tax difference as the payment.
pub fn derive_metrics(record: &PropertyRecord, annual_rate_percent: f64) -> DerivedMetrics {
    DerivedMetrics {
        price_per_area: price_per_area(
            record.buy_price.as_deref(),
            record.living_space.as_deref(),
        ),
        loan_estimate: loan_estimate(record.more_tax_per_month.as_deref(), annual_rate_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_price_per_area() {
        assert_eq!(price_per_area(Some("1'000'000"), Some("200")), Some(5000.0));
        assert_eq!(price_per_area(Some("850'000"), Some("133")), Some(6391.0));
    }

    #[test]
    fn test_price_per_area_absent_cases() {
        assert_eq!(price_per_area(Some("1'000'000"), Some("0")), None);
        assert_eq!(price_per_area(Some("1'000'000"), None), None);
        assert_eq!(price_per_area(None, Some("120")), None);
        assert_eq!(price_per_area(Some("on request"), Some("120")), None);
        assert_eq!(price_per_area(Some("900000"), Some("n/a")), None);
    }

    #[test]
    fn test_loan_estimate_matches_closed_form() {
        let r: f64 = 0.015 / 12.0;
        let growth = (1.0 + r).powi(360);
        let expected = (3000.0 * (growth - 1.0) / (r * growth)).round();

        let estimate = loan_estimate(Some("3000"), 1.5).unwrap();
        assert!((estimate - expected).abs() <= 1.0);
        assert!(estimate > 869_000.0 && estimate < 869_500.0);
    }

    #[test]
    fn test_loan_estimate_absent_cases() {
        assert_eq!(loan_estimate(None, 1.5), None);
        assert_eq!(loan_estimate(Some("0"), 1.5), None);
        assert_eq!(loan_estimate(Some(""), 1.5), None);
        assert_eq!(loan_estimate(Some("3000"), 0.0), None);
        assert_eq!(loan_estimate(Some("3000"), -1.0), None);
        assert_eq!(loan_estimate(Some("3000"), f64::NAN), None);
    }

    #[test]
    fn test_grouped_payment() {
        assert_eq!(loan_estimate(Some("3'000"), 2.0), loan_estimate(Some("3000"), 2.0));
    }

    #[test]
    fn test_derive_metrics_is_repeatable() {
        let record = PropertyRecord {
            id: Uuid::new_v4(),
            canton: "AG".to_string(),
            gemeinde: "Baden".to_string(),
            more_tax_per_month: Some("1'200".to_string()),
            link: String::new(),
            notes: String::new(),
            status: Status::Reviewed,
            travel_time: None,
            buy_price: Some("1'000'000".to_string()),
            rooms: None,
            living_space: Some("200".to_string()),
            land_area: None,
            year_built: None,
            added_at: Utc::now(),
            updated_at: None,
        };

        let first = derive_metrics(&record, 1.8);
        assert_eq!(first.price_per_area, Some(5000.0));
        assert!(first.loan_estimate.is_some());
        assert_eq!(first, derive_metrics(&record, 1.8));
    }
}
