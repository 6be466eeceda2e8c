//! Census normalization: raw ZIP-level counts → Demographic table of ratios

use std::path::Path;

use anyhow::Result;

use zipmerge_core::model::{ZIP_COLUMN, parse_number};
use zipmerge_core::table::{RawTable, read_raw, write_raw};
use zipmerge_core::{InputError, fmt_num};

const TOTAL_POPULATION: &str = "Total Population";

/// A percentage column computed as `sum(sources) / Total Population`.
#[derive(Debug, Clone, Copy)]
pub struct RatioField {
    pub name: &'static str,
    pub sources: &'static [&'static str],
}

/// Ratio columns, in output order. Their source count columns are dropped.
pub const RATIO_FIELDS: &[RatioField] = &[
    RatioField { name: "Poverty Rate (%)", sources: &["Poverty Count"] },
    RatioField { name: "SNAP Participation (%)", sources: &["SNAP Households"] },
    RatioField { name: "White Population (%)", sources: &["White Population"] },
    RatioField { name: "Black Population (%)", sources: &["Black Population"] },
    RatioField {
        name: "American Indian Population (%)",
        sources: &["American Indian Population"],
    },
    RatioField { name: "Asian Population (%)", sources: &["Asian Population"] },
    RatioField {
        name: "Other Race Population (%)",
        sources: &["Other Race Population", "Pacific Islander Population"],
    },
    RatioField { name: "Two or More Races (%)", sources: &["Two or More Races Population"] },
    RatioField { name: "High School Graduate (%)", sources: &["High School Graduate"] },
    RatioField { name: "Bachelor's Degree (%)", sources: &["Bachelor's Degree"] },
    RatioField { name: "Master's Degree (%)", sources: &["Master's Degree"] },
    RatioField { name: "Doctorate Degree (%)", sources: &["Doctorate Degree"] },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CensusSummary {
    pub rows: usize,
    /// ZIPs whose population is zero or missing; all their ratios are 0.
    pub zero_population: usize,
}

fn column(raw: &RawTable, name: &str) -> Result<usize> {
    raw.column_index(name).ok_or_else(|| {
        InputError::MissingColumn {
            table: "census",
            column: name.to_string(),
        }
        .into()
    })
}

/// Divide every count column by population.
///
/// A zero or missing population (or a missing count) gives a ratio of 0.
/// Columns that are neither the key nor a ratio source pass through as
/// numbers, with unparseable cells set to 0.
pub fn normalize_census(raw: &RawTable) -> Result<(RawTable, CensusSummary)> {
    let zip_idx = column(raw, ZIP_COLUMN)?;
    let pop_idx = column(raw, TOTAL_POPULATION)?;

    let mut ratio_sources = Vec::with_capacity(RATIO_FIELDS.len());
    for field in RATIO_FIELDS {
        let idxs = field
            .sources
            .iter()
            .map(|s| column(raw, s))
            .collect::<Result<Vec<_>>>()?;
        ratio_sources.push(idxs);
    }
    let dropped: Vec<usize> = ratio_sources.iter().flatten().copied().collect();
    let passthrough: Vec<usize> = (0..raw.headers.len())
        .filter(|i| *i != zip_idx && !dropped.contains(i))
        .collect();

    let mut headers = Vec::with_capacity(1 + passthrough.len() + RATIO_FIELDS.len());
    headers.push(ZIP_COLUMN.to_string());
    headers.extend(passthrough.iter().map(|&i| raw.headers[i].clone()));
    headers.extend(RATIO_FIELDS.iter().map(|f| f.name.to_string()));

    let mut summary = CensusSummary::default();
    let mut rows = Vec::with_capacity(raw.rows.len());
    for row in &raw.rows {
        let cell = |i: usize| row.get(i).and_then(|c| parse_number(c));
        let population = cell(pop_idx).filter(|p| *p != 0.0);
        if population.is_none() {
            summary.zero_population += 1;
        }

        let mut out = Vec::with_capacity(headers.len());
        out.push(row.get(zip_idx).map(|z| z.trim().to_string()).unwrap_or_default());
        out.extend(passthrough.iter().map(|&i| cell(i).unwrap_or(0.0).to_string()));
        for idxs in &ratio_sources {
            let count: Option<f64> = idxs.iter().map(|&i| cell(i)).sum();
            let ratio = match (count, population) {
                (Some(c), Some(p)) => c / p,
                _ => 0.0,
            };
            out.push(ratio.to_string());
        }
        rows.push(out);
    }

    summary.rows = rows.len();
    Ok((RawTable { headers, rows }, summary))
}

/// Normalize the raw census file and write the Demographic table.
pub fn process_census(raw_path: &Path, out_path: &Path) -> Result<CensusSummary> {
    let raw = read_raw("census", raw_path)?;
    let (table, summary) = normalize_census(&raw)?;
    if summary.zero_population > 0 {
        log::warn!(
            "{} ZIP codes have no population; their ratios are set to 0",
            fmt_num(summary.zero_population)
        );
    }
    write_raw(out_path, &table)?;
    log::info!("Processed census data saved to {}", out_path.display());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_census(rows: Vec<Vec<&str>>) -> RawTable {
        let mut headers = vec![ZIP_COLUMN, TOTAL_POPULATION, "Median Household Income"];
        for field in RATIO_FIELDS {
            headers.extend(field.sources.iter().copied());
        }
        RawTable {
            headers: headers.into_iter().map(String::from).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        }
    }

    fn full_row<'a>(zip: &'a str, pop: &'a str, count: &'a str) -> Vec<&'a str> {
        // 13 source columns for 12 ratio fields
        let mut row = vec![zip, pop, "52000"];
        row.extend(std::iter::repeat_n(count, 13));
        row
    }

    #[test]
    fn ratios_divide_by_population() {
        let (table, summary) = normalize_census(&raw_census(vec![full_row("45202", "200", "50")])).unwrap();
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.zero_population, 0);
        assert_eq!(table.headers[0], ZIP_COLUMN);
        assert_eq!(table.headers[1], TOTAL_POPULATION);
        assert_eq!(table.headers[2], "Median Household Income");
        assert_eq!(table.headers.len(), 3 + RATIO_FIELDS.len());

        let poverty = table.column_index("Poverty Rate (%)").unwrap();
        assert_eq!(table.rows[0][poverty], "0.25");
        // other race + pacific islander
        let other = table.column_index("Other Race Population (%)").unwrap();
        assert_eq!(table.rows[0][other], "0.5");
        assert!(table.column_index("Poverty Count").is_none());
    }

    #[test]
    fn zero_population_gives_zero_ratios() {
        let (table, summary) =
            normalize_census(&raw_census(vec![full_row("45203", "0", "10")])).unwrap();
        assert_eq!(summary.zero_population, 1);
        for field in RATIO_FIELDS {
            let idx = table.column_index(field.name).unwrap();
            assert_eq!(table.rows[0][idx], "0");
        }
    }

    #[test]
    fn unparseable_passthrough_is_zero() {
        let mut row = full_row("45204", "100", "1");
        row[2] = "-";
        let (table, _) = normalize_census(&raw_census(vec![row])).unwrap();
        assert_eq!(table.rows[0][2], "0");
    }

    #[test]
    fn missing_source_column_fails() {
        let raw = RawTable {
            headers: vec![ZIP_COLUMN.into(), TOTAL_POPULATION.into()],
            rows: vec![],
        };
        let err = normalize_census(&raw).unwrap_err();
        let input = err.downcast_ref::<InputError>().unwrap();
        assert!(input.to_string().contains("Poverty Count"));
    }
}
