//! End-to-end runs of the aggregation engine over small CSV fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zipmerge_aggregate::{AggregateConfig, OutputFormat, run};
use zipmerge_core::InputError;

const PRODUCTS: &str = "\
Product ID,Location ID,Date Retrieved,Brand,Description,Product Category,Quantity,UOM,Regular Price,Promo Price,Stock Level
P1,00000001,2024-01-01,Kroger,Large Brown Eggs,Egg,4,ct,1.00,0,HIGH
P1,00000001,2024-01-08,Kroger,Large Brown Eggs,Egg,4,ct,2.00,1.00,HIGH
P2,00000002,2024-01-01,Ralphs,Jumbo Eggs,Egg,4,ct,3.00,0,LOW
P3,00000003,2024-01-01,Kroger,White Bread,Bread,1,loaf,2.50,0,HIGH
P4,00000009,2024-01-01,Kroger,Unknown Store Eggs,Egg,4,ct,1.00,0,HIGH
";

const LOCATIONS: &str = "\
Location ID,ZIP Code,Chain Name,Latitude,Longitude
00000001,45202,KROGER,39.0,-84.0
00000002,45202,RALPHS,39.5,-84.5
00000003,45203,KROGER,39.2,-84.2
";

const DEMOGRAPHICS: &str = "\
ZIP Code,Total Population,Poverty Rate (%)
45202,1000,0.25
45204,500,0.5
";

const BOUNDARIES: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature","properties":{"ZCTA5CE20":"45202"},"geometry":{"type":"Point","coordinates":[-84.5,39.1]}}
]}"#;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        init();
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("products.csv"), PRODUCTS).unwrap();
        fs::write(dir.path().join("locations.csv"), LOCATIONS).unwrap();
        fs::write(dir.path().join("census.csv"), DEMOGRAPHICS).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self, output: &str) -> AggregateConfig {
        AggregateConfig {
            product_path: self.path("products.csv"),
            location_path: self.path("locations.csv"),
            demographic_path: self.path("census.csv"),
            boundary_path: None,
            output_path: self.path(output),
            format: OutputFormat::Csv,
            compression_level: 3,
            intermediate_dir: None,
            excluded_keywords: vec!["egg".into(), "eggs".into(), "bread".into()],
        }
    }
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

fn cell<'a>(headers: &[String], row: &'a [String], name: &str) -> &'a str {
    let idx = headers.iter().position(|h| h == name).unwrap();
    &row[idx]
}

#[test]
fn only_complete_zips_survive() {
    let fx = Fixture::new();
    let summary = run(&fx.config("final.csv")).unwrap();

    // 45203 has stores but no demographics; 45204 has demographics but no stores.
    assert_eq!(summary.merge.output_rows, 1);
    assert_eq!(summary.merge.dropped_incomplete, 1);
    assert_eq!(summary.location_zips, 2);
    assert_eq!(summary.boundary_zips, None);

    let (headers, rows) = read_csv(&fx.path("final.csv"));
    assert_eq!(rows.len(), 1);
    assert!(!headers.iter().any(|h| h == "geometry"));
    let row = &rows[0];
    assert_eq!(cell(&headers, row, "ZIP Code"), "45202");
    assert_eq!(cell(&headers, row, "Product Category"), "Egg");
    assert_eq!(cell(&headers, row, "Store_Count"), "2");
    assert_eq!(
        cell(&headers, row, "Store_Chain_Distribution"),
        r#"{"KROGER":1,"RALPHS":1}"#
    );
    assert_eq!(cell(&headers, row, "Poverty Rate (%)"), "0.25");
    assert_eq!(cell(&headers, row, "Min_Price"), "0.375");
    assert_eq!(cell(&headers, row, "Max_Price"), "0.75");
    assert_eq!(cell(&headers, row, "Avg_Product_Count"), "1");
    assert_eq!(
        cell(&headers, row, "ZIP_Keyword_Frequency"),
        r#"{"brown":1,"jumbo":1,"large":1}"#
    );
}

#[test]
fn boundary_adds_geometry_column_only() {
    let fx = Fixture::new();
    run(&fx.config("plain.csv")).unwrap();

    fs::write(fx.path("zcta.geojson"), BOUNDARIES).unwrap();
    let mut config = fx.config("geo.csv");
    config.boundary_path = Some(fx.path("zcta.geojson"));
    let summary = run(&config).unwrap();
    assert_eq!(summary.boundary_zips, Some(1));

    let (plain_headers, plain_rows) = read_csv(&fx.path("plain.csv"));
    let (geo_headers, geo_rows) = read_csv(&fx.path("geo.csv"));
    let geo_idx = geo_headers.iter().position(|h| h == "geometry").unwrap();

    assert_eq!(geo_rows.len(), plain_rows.len());
    let mut stripped_headers = geo_headers.clone();
    stripped_headers.remove(geo_idx);
    assert_eq!(stripped_headers, plain_headers);

    let mut stripped = geo_rows[0].clone();
    let geometry = stripped.remove(geo_idx);
    assert_eq!(geometry, r#"{"coordinates":[-84.5,39.1],"type":"Point"}"#);
    assert_eq!(stripped, plain_rows[0]);
}

#[test]
fn missing_boundary_file_is_skipped() {
    let fx = Fixture::new();
    let mut config = fx.config("final.csv");
    config.boundary_path = Some(fx.path("absent.geojson"));
    let summary = run(&config).unwrap();
    assert_eq!(summary.boundary_zips, None);
    assert_eq!(summary.merge.output_rows, 1);
}

#[test]
fn reruns_are_byte_identical() {
    let fx = Fixture::new();
    run(&fx.config("a.csv")).unwrap();
    run(&fx.config("b.csv")).unwrap();
    assert_eq!(
        fs::read(fx.path("a.csv")).unwrap(),
        fs::read(fx.path("b.csv")).unwrap()
    );
}

#[test]
fn missing_input_names_the_table() {
    let fx = Fixture::new();
    fs::remove_file(fx.path("census.csv")).unwrap();
    let err = run(&fx.config("final.csv")).unwrap_err();
    let input = err.downcast_ref::<InputError>().unwrap();
    assert_eq!(input.table(), "demographic");
    assert!(err.to_string().contains("census.csv"));
    assert!(!fx.path("final.csv").exists());
}

#[test]
fn empty_product_table_gives_header_only_output() {
    let fx = Fixture::new();
    let header = PRODUCTS.lines().next().unwrap();
    fs::write(fx.path("products.csv"), format!("{header}\n")).unwrap();

    let summary = run(&fx.config("final.csv")).unwrap();
    assert_eq!(summary.observations, 0);
    assert_eq!(summary.merge.output_rows, 0);

    let (headers, rows) = read_csv(&fx.path("final.csv"));
    assert!(rows.is_empty());
    assert_eq!(headers[0], "ZIP Code");
}

#[test]
fn parquet_output_is_readable() {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let fx = Fixture::new();
    let mut config = fx.config("final.parquet");
    config.format = OutputFormat::Parquet;
    run(&config).unwrap();

    let file = fs::File::open(fx.path("final.parquet")).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
    assert_eq!(rows, 1);
    assert!(!fx.path("final.parquet.tmp").exists());
}

#[test]
fn intermediate_tables_are_written() {
    let fx = Fixture::new();
    let mut config = fx.config("final.csv");
    config.intermediate_dir = Some(fx.path("intermediate"));
    run(&config).unwrap();

    let (headers, rows) = read_csv(&fx.path("intermediate/product_summary.csv"));
    assert_eq!(rows.len(), 4);
    assert!(headers.iter().any(|h| h == "Promo_Frequency"));

    let (_, stores) = read_csv(&fx.path("intermediate/store_category_summary.csv"));
    assert_eq!(stores.len(), 4);
    let (_, zips) = read_csv(&fx.path("intermediate/zip_category_summary.csv"));
    assert_eq!(zips.len(), 2);
    let (_, locations) = read_csv(&fx.path("intermediate/location_summary.csv"));
    assert_eq!(locations.len(), 2);
}

#[test]
fn unparseable_size_keeps_zip_in_output() {
    let fx = Fixture::new();
    let header = PRODUCTS.lines().next().unwrap();
    fs::write(
        fx.path("products.csv"),
        format!(
            "{header}\n\
             P1,00000001,2024-01-01,Kroger,Large Eggs,Egg,-1,dozen,3.99,0,HIGH\n\
             P1,00000001,2024-01-08,Kroger,Large Eggs,Egg,-1,dozen,4.29,0,HIGH\n"
        ),
    )
    .unwrap();

    let summary = run(&fx.config("final.csv")).unwrap();
    assert_eq!(summary.product_summaries, 1);
    assert_eq!(summary.merge.output_rows, 1);

    let (headers, rows) = read_csv(&fx.path("final.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(cell(&headers, &rows[0], "ZIP Code"), "45202");
    assert_eq!(cell(&headers, &rows[0], "Product Category"), "Egg");
    assert!(!cell(&headers, &rows[0], "Avg_Price").is_empty());
}
