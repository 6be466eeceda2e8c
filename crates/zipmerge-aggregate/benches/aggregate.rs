use zipmerge_aggregate::{KeywordMiner, derive_tables};
use zipmerge_core::{Location, ProductObservation};

const DESCRIPTIONS: [&str; 4] = [
    "Large Brown Eggs",
    "Cage Free Grade A Eggs",
    "Whole Wheat Sandwich Bread",
    "Honey Oat Bread",
];

fn synthetic_inputs(stores: usize, products: usize, days: usize) -> (Vec<ProductObservation>, Vec<Location>) {
    let locations = (0..stores)
        .map(|s| Location {
            location_id: format!("{s:08}"),
            zip_code: format!("{:05}", 45000 + s / 4),
            chain_name: if s % 3 == 0 { "RALPHS" } else { "KROGER" }.to_string(),
            latitude: Some(39.0 + s as f64 * 0.001),
            longitude: Some(-84.0 - s as f64 * 0.001),
        })
        .collect();

    let mut observations = Vec::with_capacity(stores * products * days);
    for s in 0..stores {
        for p in 0..products {
            let description = DESCRIPTIONS[p % DESCRIPTIONS.len()];
            for d in 0..days {
                observations.push(ProductObservation {
                    product_id: format!("P{p:06}"),
                    location_id: format!("{s:08}"),
                    date_retrieved: format!("2024-01-{:02}", d + 1),
                    brand: "Kroger".into(),
                    description: description.into(),
                    category: if p % 4 < 2 { "Egg" } else { "Bread" }.into(),
                    quantity: 12.0,
                    uom: if p % 4 < 2 { "ct" } else { "oz" }.into(),
                    regular_price: 2.0 + (p % 7) as f64 * 0.25,
                    promo_price: if d % 3 == 0 { 1.5 } else { 0.0 },
                    stock_level: "HIGH".into(),
                });
            }
        }
    }
    (observations, locations)
}

#[divan::bench(args = [10, 100])]
fn derive_all_tables(bencher: divan::Bencher, stores: usize) {
    let (observations, locations) = synthetic_inputs(stores, 50, 7);
    let miner = KeywordMiner::default();
    bencher.bench(|| derive_tables(&observations, &locations, &miner));
}

fn main() {
    divan::main();
}
