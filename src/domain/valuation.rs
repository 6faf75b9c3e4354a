//! Linear fair-price model over parsed server rows.
//!
//! `price ≈ w1·cpu_benchmark + w2·is_ecc + w3·ram_gb + w4·hdd_gb + w5·ssd_gb`,
//! no intercept, fitted by ordinary least squares on the scoreable rows only.

use std::cmp::Ordering;

use ndarray::{Array1, Array2};
use tracing::{debug, info, warn};

use super::entities::{Record, ServerRow};
use super::least_squares::{solve, LeastSquaresError};

pub const FEATURE_NAMES: [&str; 5] = ["cpu_benchmark", "is_ecc", "ram_gb", "hdd_gb", "ssd_gb"];

#[derive(Clone, Debug, PartialEq)]
pub struct PriceModel {
    pub weights: [f64; 5],
}

impl PriceModel {
    pub fn expected_price(&self, row: &ServerRow) -> f64 {
        row.features()
            .iter()
            .zip(self.weights.iter())
            .map(|(x, w)| x * w)
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FitSummary {
    pub model: PriceModel,
    pub rank: usize,
    pub fitted_rows: usize,
    pub residual_sum_of_squares: f64,
}

/// Fit the model on every row with a known benchmark and a finite price.
pub fn fit(rows: &[ServerRow]) -> Result<FitSummary, LeastSquaresError> {
    let fit_rows: Vec<&ServerRow> = rows
        .iter()
        .filter(|row| row.is_scoreable() && row.price.is_finite())
        .collect();

    let mut design = Array2::<f64>::zeros((fit_rows.len(), FEATURE_NAMES.len()));
    let mut targets = Array1::<f64>::zeros(fit_rows.len());
    for (i, row) in fit_rows.iter().enumerate() {
        for (j, x) in row.features().into_iter().enumerate() {
            design[[i, j]] = x;
        }
        targets[i] = row.price;
    }

    let solution = solve(design.view(), targets.view())?;
    if solution.rank < FEATURE_NAMES.len() {
        warn!(
            rank = solution.rank,
            rows = fit_rows.len(),
            "design matrix is rank deficient; using minimum-norm weights"
        );
    }

    let mut weights = [0.0; 5];
    for (slot, w) in weights.iter_mut().zip(solution.coefficients.iter()) {
        *slot = *w;
    }
    for (name, w) in FEATURE_NAMES.iter().zip(weights.iter()) {
        debug!(feature = name, weight = w, "fitted weight");
    }
    info!(
        rows = fit_rows.len(),
        skipped = rows.len() - fit_rows.len(),
        rss = solution.residual_sum_of_squares,
        "price model fitted"
    );

    Ok(FitSummary {
        model: PriceModel { weights },
        rank: solution.rank,
        fitted_rows: fit_rows.len(),
        residual_sum_of_squares: solution.residual_sum_of_squares,
    })
}

/// Score every row with the model; the result is in descending value order.
pub fn score(rows: Vec<ServerRow>, model: &PriceModel) -> Vec<Record> {
    let mut records: Vec<Record> = rows
        .into_iter()
        .map(|row| {
            let expected_price = model.expected_price(&row);
            let value = value_ratio(expected_price, row.price);
            if value.is_nan() {
                debug!(id = row.id, price = row.price, "listing has no usable price; value is NaN");
            }
            Record {
                id: row.id,
                value,
                price: row.price,
                expected_price,
                ram_gb: row.ram_gb,
                is_ecc: row.is_ecc,
                ssd_gb: row.ssd_gb,
                hdd_gb: row.hdd_gb,
                scored: row.is_scoreable(),
                cpu_id: row.cpu_id,
                cpu_benchmark: row.cpu_benchmark,
                description: row.description,
            }
        })
        .collect();

    records.sort_by(|a, b| compare_nan_last(a.value, b.value, true));
    records
}

/// Fit then score in one step.
pub fn valuate(rows: Vec<ServerRow>) -> Result<(FitSummary, Vec<Record>), LeastSquaresError> {
    let summary = fit(&rows)?;
    let records = score(rows, &summary.model);
    Ok((summary, records))
}

pub fn value_ratio(expected_price: f64, price: f64) -> f64 {
    if price == 0.0 || !price.is_finite() {
        f64::NAN
    } else {
        expected_price / price
    }
}

/// Compare two floats with NaN ordered after every number in either direction.
pub fn compare_nan_last(a: f64, b: f64, descending: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64, price: f64, bench: f64, ecc: u8, ram: u32, hdd: f64, ssd: f64) -> ServerRow {
        ServerRow {
            id,
            price,
            ram_gb: ram,
            is_ecc: ecc,
            ssd_gb: ssd,
            hdd_gb: hdd,
            cpu_id: format!("cpu-{id}"),
            cpu_benchmark: bench,
            description: String::new(),
        }
    }

    fn synthetic_rows() -> Vec<ServerRow> {
        let weights = [0.01, 5.0, 0.5, 0.002, 0.03];
        let specs = [
            (1000.0, 0, 16, 0.0, 250.0),
            (2000.0, 1, 32, 4096.0, 0.0),
            (1500.0, 0, 64, 2048.0, 512.0),
            (3000.0, 1, 128, 0.0, 960.0),
            (2500.0, 1, 64, 8192.0, 480.0),
            (1200.0, 0, 32, 1024.0, 240.0),
            (4000.0, 0, 16, 0.0, 1920.0),
        ];
        specs
            .iter()
            .enumerate()
            .map(|(i, &(bench, ecc, ram, hdd, ssd))| {
                let mut r = row(i as u64, 0.0, bench, ecc, ram, hdd, ssd);
                r.price = r
                    .features()
                    .iter()
                    .zip(weights.iter())
                    .map(|(x, w)| x * w)
                    .sum();
                r
            })
            .collect()
    }

    #[test]
    fn recovers_generating_weights() {
        let summary = fit(&synthetic_rows()).unwrap();
        assert_eq!(summary.rank, 5);
        assert_eq!(summary.fitted_rows, 7);
        let expected = [0.01, 5.0, 0.5, 0.002, 0.03];
        for (got, want) in summary.model.weights.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-6, "{got} vs {want}");
        }
    }

    #[test]
    fn unscoreable_rows_sit_out_the_fit_but_are_scored() {
        let mut rows = synthetic_rows();
        rows.push(row(99, 1000.0, 0.0, 0, 16, 0.0, 0.0));
        let (summary, records) = valuate(rows).unwrap();
        assert_eq!(summary.fitted_rows, 7);
        let outsider = records.iter().find(|r| r.id == 99).unwrap();
        assert!(!outsider.scored);
        assert!((outsider.expected_price - 16.0 * summary.model.weights[2]).abs() < 1e-9);
    }

    #[test]
    fn value_is_expected_over_price() {
        let (_, records) = valuate(synthetic_rows()).unwrap();
        for record in &records {
            assert_eq!(record.value, record.expected_price / record.price);
        }
    }

    #[test]
    fn zero_price_yields_nan_value_sorted_last() {
        let mut rows = synthetic_rows();
        rows.insert(0, row(42, 0.0, 1000.0, 0, 16, 0.0, 0.0));
        let (_, records) = valuate(rows).unwrap();
        let last = records.last().unwrap();
        assert_eq!(last.id, 42);
        assert!(last.value.is_nan());
    }

    #[test]
    fn records_come_out_in_descending_value() {
        let mut rows = synthetic_rows();
        rows[0].price *= 2.0;
        rows[3].price *= 0.5;
        let (_, records) = valuate(rows).unwrap();
        assert!(records.windows(2).all(|w| w[0].value >= w[1].value));
    }

    #[test]
    fn degenerate_fit_does_not_fail() {
        let rows = vec![row(1, 50.0, 1000.0, 0, 16, 0.0, 250.0)];
        let summary = fit(&rows).unwrap();
        assert_eq!(summary.rank, 1);
        let predicted = summary.model.expected_price(&rows[0]);
        assert!((predicted - 50.0).abs() < 1e-6);
    }
}
