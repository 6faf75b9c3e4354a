//! Assembles parsed, repaired rows from raw listings.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::description::disk_totals;
use super::entities::{Listing, ServerRow};

/// Build one row per listing, in feed order, with benchmark repair applied.
pub fn build_rows(listings: &[Listing]) -> Vec<ServerRow> {
    let rows: Vec<ServerRow> = listings.iter().map(row_from_listing).collect();
    repair_benchmarks(rows)
}

fn row_from_listing(listing: &Listing) -> ServerRow {
    let totals = disk_totals(&listing.description_lines);
    ServerRow {
        id: listing.id,
        price: listing.price,
        ram_gb: listing.ram_gb,
        is_ecc: u8::from(listing.is_ecc),
        ssd_gb: totals.ssd_gb,
        hdd_gb: totals.hdd_gb,
        cpu_id: listing.cpu_id.clone(),
        cpu_benchmark: sanitize_benchmark(listing.cpu_benchmark),
        description: listing.description_lines.join(", "),
    }
}

fn sanitize_benchmark(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        0.0
    }
}

/// Replace unknown (zero) benchmarks with the lowest positive score seen for the
/// same CPU. Rows with no positive sibling keep 0.
pub fn repair_benchmarks(rows: Vec<ServerRow>) -> Vec<ServerRow> {
    let known = min_benchmark_by_cpu(&rows);

    rows.into_iter()
        .map(|row| {
            if row.cpu_benchmark > 0.0 {
                return row;
            }
            match known.get(row.cpu_id.as_str()) {
                Some(&score) => {
                    debug!(id = row.id, cpu = %row.cpu_id, score, "repaired cpu benchmark");
                    ServerRow {
                        cpu_benchmark: score,
                        ..row
                    }
                }
                None => {
                    warn!(id = row.id, cpu = %row.cpu_id, "no benchmark known for cpu; row stays unscored");
                    row
                }
            }
        })
        .collect()
}

fn min_benchmark_by_cpu(rows: &[ServerRow]) -> HashMap<String, f64> {
    let mut known: HashMap<String, f64> = HashMap::new();
    for row in rows.iter().filter(|row| row.cpu_benchmark > 0.0) {
        known
            .entry(row.cpu_id.clone())
            .and_modify(|min| *min = min.min(row.cpu_benchmark))
            .or_insert(row.cpu_benchmark);
    }
    known
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: u64, cpu: &str, bench: f64, desc: &[&str]) -> Listing {
        Listing {
            id,
            price: 40.0,
            ram_gb: 32,
            is_ecc: id % 2 == 0,
            cpu_id: cpu.to_string(),
            cpu_benchmark: bench,
            description_lines: desc.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn rows_keep_feed_order_and_parse_disks() {
        let rows = build_rows(&[
            listing(7, "A", 900.0, &["2x HDD SATA 2 TB", "1x SSD 240 GB"]),
            listing(3, "B", 500.0, &["Intel Xeon"]),
        ]);
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![7, 3]);
        assert_eq!(rows[0].hdd_gb, 4096.0);
        assert_eq!(rows[0].ssd_gb, 240.0);
        assert_eq!(rows[0].is_ecc, 0);
        assert_eq!(rows[1].is_ecc, 0);
        assert_eq!(rows[1].storage_gb(), 0.0);
        assert_eq!(rows[0].description, "2x HDD SATA 2 TB, 1x SSD 240 GB");
    }

    #[test]
    fn repairs_with_minimum_positive_sibling() {
        let rows = build_rows(&[
            listing(1, "A", 1200.0, &[]),
            listing(2, "A", 0.0, &[]),
            listing(3, "A", 1000.0, &[]),
            listing(4, "B", 300.0, &[]),
        ]);
        assert_eq!(rows[1].cpu_benchmark, 1000.0);
        assert_eq!(rows[0].cpu_benchmark, 1200.0);
    }

    #[test]
    fn unrepairable_benchmark_stays_zero() {
        let rows = build_rows(&[listing(1, "A", 1000.0, &[]), listing(2, "B", 0.0, &[])]);
        assert_eq!(rows[1].cpu_benchmark, 0.0);
        assert!(!rows[1].is_scoreable());
    }

    #[test]
    fn non_finite_benchmark_is_unknown() {
        let rows = build_rows(&[listing(1, "A", f64::NAN, &[]), listing(2, "A", 800.0, &[])]);
        assert_eq!(rows[0].cpu_benchmark, 800.0);
    }
}
