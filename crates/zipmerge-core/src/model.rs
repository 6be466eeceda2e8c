//! Typed rows of the three source tables.
//!
//! Column names follow the CSV headers produced by the acquisition and
//! geocoding collaborators. Malformed numeric cells never fail a row:
//! prices fall back to 0, quantities to -1, units to "unit".

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::InputError;
use crate::table::RawTable;

/// Quantity recorded when the size text has no number in it.
pub const UNKNOWN_QUANTITY: f64 = -1.0;

/// Unit recorded when the size text has no unit in it.
pub const UNKNOWN_UOM: &str = "unit";

/// Key column shared by the location, demographic and boundary tables.
pub const ZIP_COLUMN: &str = "ZIP Code";

/// One product seen at one store on one retrieval date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductObservation {
    #[serde(rename = "Product ID")]
    pub product_id: String,
    #[serde(rename = "Location ID")]
    pub location_id: String,
    #[serde(rename = "Date Retrieved")]
    pub date_retrieved: String,
    #[serde(rename = "Brand", default)]
    pub brand: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Product Category")]
    pub category: String,
    #[serde(rename = "Quantity", deserialize_with = "quantity_or_sentinel")]
    pub quantity: f64,
    #[serde(rename = "UOM", deserialize_with = "uom_or_sentinel")]
    pub uom: String,
    #[serde(rename = "Regular Price", deserialize_with = "price_or_zero")]
    pub regular_price: f64,
    #[serde(rename = "Promo Price", deserialize_with = "price_or_zero")]
    pub promo_price: f64,
    #[serde(rename = "Stock Level", default)]
    pub stock_level: String,
}

impl ProductObservation {
    /// Regular price divided by quantity, `None` when that is not a real number.
    pub fn price_per_unit(&self) -> Option<f64> {
        per_unit(self.regular_price, self.quantity)
    }

    /// Promo price divided by quantity, `None` when that is not a real number.
    pub fn promo_price_per_unit(&self) -> Option<f64> {
        per_unit(self.promo_price, self.quantity)
    }

    pub fn has_promo(&self) -> bool {
        self.promo_price > 0.0
    }

    /// Parsed retrieval timestamp; `None` sorts before every real date.
    pub fn retrieved_at(&self) -> Option<NaiveDateTime> {
        parse_date(&self.date_retrieved)
    }
}

/// Price per unit of quantity.
///
/// A zero quantity carries no unit price. The -1 "unparseable" sentinel
/// divides like any other quantity.
pub fn per_unit(price: f64, quantity: f64) -> Option<f64> {
    if quantity == 0.0 {
        return None;
    }
    let value = price / quantity;
    value.is_finite().then_some(value)
}

/// A geocoded store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "Location ID")]
    pub location_id: String,
    #[serde(rename = "ZIP Code", default)]
    pub zip_code: String,
    #[serde(rename = "Chain Name", default)]
    pub chain_name: String,
    #[serde(rename = "Latitude", default, deserialize_with = "optional_number")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude", default, deserialize_with = "optional_number")]
    pub longitude: Option<f64>,
}

/// Demographic fields of one ZIP code, in the table's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicRecord {
    pub zip_code: String,
    pub values: Vec<Option<f64>>,
}

/// Demographic table with a dynamic set of numeric columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemographicTable {
    /// Value column names (the ZIP key column excluded).
    pub columns: Vec<String>,
    pub records: Vec<DemographicRecord>,
}

impl DemographicTable {
    /// Build from a raw CSV table keyed by the `ZIP Code` column.
    ///
    /// Cells that are empty or non-numeric become `None`; later ZIPs
    /// repeating an earlier key are ignored.
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let zip_idx = raw
            .column_index(ZIP_COLUMN)
            .ok_or_else(|| InputError::MissingColumn {
                table: "demographic",
                column: ZIP_COLUMN.to_string(),
            })?;

        let columns = raw
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != zip_idx)
            .map(|(_, h)| h.clone())
            .collect();

        let mut seen = FxHashSet::default();
        let mut records = Vec::with_capacity(raw.rows.len());
        for row in &raw.rows {
            let zip_code = row.get(zip_idx).map(|z| z.trim()).unwrap_or_default();
            if zip_code.is_empty() || !seen.insert(zip_code.to_string()) {
                continue;
            }
            let values = (0..raw.headers.len())
                .filter(|i| *i != zip_idx)
                .map(|i| row.get(i).and_then(|cell| parse_number(cell)))
                .collect();
            records.push(DemographicRecord {
                zip_code: zip_code.to_string(),
                values,
            });
        }

        Ok(Self { columns, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse a numeric cell; blanks, text and non-finite values give `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a retrieval date in any of the formats the acquisition step writes.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
    ];
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn price_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(parse_number(&raw).unwrap_or(0.0))
}

fn quantity_or_sentinel<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(parse_number(&raw).unwrap_or(UNKNOWN_QUANTITY))
}

fn uom_or_sentinel<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw = String::deserialize(d)?;
    let trimmed = raw.trim();
    Ok(if trimmed.is_empty() {
        UNKNOWN_UOM.to_string()
    } else {
        trimmed.to_string()
    })
}

fn optional_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(parse_number(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(price: f64, promo: f64, quantity: f64) -> ProductObservation {
        ProductObservation {
            product_id: "0001".into(),
            location_id: "01400376".into(),
            date_retrieved: "2025-02-01".into(),
            brand: "Kroger".into(),
            description: "Kroger Grade A Large Eggs".into(),
            category: "Egg".into(),
            quantity,
            uom: "ct".into(),
            regular_price: price,
            promo_price: promo,
            stock_level: "HIGH".into(),
        }
    }

    #[test]
    fn per_unit_divides() {
        assert_eq!(obs(6.0, 0.0, 12.0).price_per_unit(), Some(0.5));
        assert_eq!(obs(6.0, 3.0, 12.0).promo_price_per_unit(), Some(0.25));
    }

    #[test]
    fn per_unit_guards_only_zero_quantity() {
        assert_eq!(obs(6.0, 0.0, 0.0).price_per_unit(), None);
        assert_eq!(obs(6.0, 0.0, UNKNOWN_QUANTITY).price_per_unit(), Some(-6.0));
    }

    #[test]
    fn parse_number_rejects_text_and_nan() {
        assert_eq!(parse_number(" 3.49 "), Some(3.49));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn parse_date_formats() {
        let day = parse_date("2025-02-14").unwrap();
        assert_eq!(day.to_string(), "2025-02-14 00:00:00");
        let ts = parse_date("2025-02-14 13:05:09").unwrap();
        assert!(ts > day);
        assert!(parse_date("2025-02-14T13:05:09.123").is_some());
        assert!(parse_date("02/14/2025").is_some());
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn malformed_cells_become_sentinels() {
        let data = "\
Product ID,Location ID,Date Retrieved,Brand,Description,Product Category,Quantity,UOM,Regular Price,Promo Price,Stock Level
7,01400376,2025-02-01,Kroger,Large Eggs,Egg,n/a,,abc,,LOW
";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let row: ProductObservation = rdr.deserialize().next().unwrap().unwrap();
        assert_eq!(row.quantity, UNKNOWN_QUANTITY);
        assert_eq!(row.uom, UNKNOWN_UOM);
        assert_eq!(row.regular_price, 0.0);
        assert_eq!(row.promo_price, 0.0);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let data = "\
Location ID,Address,ZIP Code,Chain Name,Latitude,Longitude
01400376,1 Main St,45202,KROGER,39.1,-84.5
01400377,2 Main St,45202,RALPHS,,
";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<Location> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].latitude, Some(39.1));
        assert_eq!(rows[1].latitude, None);
        assert_eq!(rows[1].chain_name, "RALPHS");
    }

    #[test]
    fn demographic_from_raw() {
        let raw = RawTable {
            headers: vec!["ZIP Code".into(), "Poverty Rate (%)".into(), "Total Population".into()],
            rows: vec![
                vec!["45202".into(), "0.2".into(), "1000".into()],
                vec!["45203".into(), "".into(), "50".into()],
                vec!["45202".into(), "0.9".into(), "1".into()],
            ],
        };
        let table = DemographicTable::from_raw(&raw).unwrap();
        assert_eq!(table.columns, vec!["Poverty Rate (%)", "Total Population"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].values, vec![Some(0.2), Some(1000.0)]);
        assert_eq!(table.records[1].values, vec![None, Some(50.0)]);
    }

    #[test]
    fn demographic_without_zip_column_fails() {
        let raw = RawTable {
            headers: vec!["zip".into()],
            rows: vec![],
        };
        let err = DemographicTable::from_raw(&raw).unwrap_err();
        assert!(err.downcast_ref::<InputError>().is_some());
    }
}
