//! Entitlement lookup inputs.

use crate::error::{IseeError, Result};
use std::str::FromStr;
use tracing::warn;

/// Country sent when a query does not name one.
pub const DEFAULT_COUNTRY: &str = "US";

/// One (serial, product, country) lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementQuery {
    serial_number: String,
    product_number: String,
    country_code: String,
}

impl EntitlementQuery {
    /// Build a query. An absent or empty country becomes [`DEFAULT_COUNTRY`].
    ///
    /// The product number may be empty; the server decides whether that is
    /// acceptable.
    pub fn new(
        serial_number: impl Into<String>,
        product_number: impl Into<String>,
        country_code: Option<&str>,
    ) -> Self {
        let country_code = match country_code.map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => DEFAULT_COUNTRY.to_string(),
        };
        Self {
            serial_number: serial_number.into(),
            product_number: product_number.into(),
            country_code,
        }
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn product_number(&self) -> &str {
        &self.product_number
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }
}

impl FromStr for EntitlementQuery {
    type Err = IseeError;

    /// Parse `serial,product[,country]`.
    fn from_str(entry: &str) -> Result<Self> {
        let fields: Vec<&str> = entry.split(',').map(str::trim).collect();
        let (serial, product, country) = match fields.as_slice() {
            [serial, product] => (*serial, *product, None),
            [serial, product, country] => (*serial, *product, Some(*country)),
            _ => {
                return Err(IseeError::InvalidEntitlementInput(format!(
                    "'{}' is not serial,product[,country]",
                    entry
                )))
            }
        };
        if serial.is_empty() {
            return Err(IseeError::InvalidEntitlementInput(format!(
                "'{}' has an empty serial number",
                entry
            )));
        }
        Ok(Self::new(serial, product, country))
    }
}

/// Parse command line entries, dropping malformed ones with a warning.
pub fn parse_batch<S: AsRef<str>>(entries: &[S]) -> Vec<EntitlementQuery> {
    entries
        .iter()
        .filter_map(|entry| match entry.as_ref().parse() {
            Ok(query) => Some(query),
            Err(e) => {
                warn!(entry = %entry.as_ref(), error = %e, "Skipping entitlement entry");
                None
            }
        })
        .collect()
}
