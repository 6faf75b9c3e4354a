//! Immutable, chainable filter/sort view over valuated records.

use std::{cmp::Ordering, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use super::entities::Record;
use super::valuation::compare_nan_last;

/// Bounds accepted by [`QueryView::filter`]. Every bound is optional and inclusive.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingFilter {
    pub ram_min: Option<u32>,
    pub ram_max: Option<u32>,
    pub is_ecc: Option<bool>,
    pub storage_min: Option<f64>,
    pub storage_max: Option<f64>,
    pub ssd_min: Option<f64>,
    pub ssd_max: Option<f64>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

impl ListingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ram(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.ram_min = min;
        self.ram_max = max;
        self
    }

    pub fn ssd(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.ssd_min = min;
        self.ssd_max = max;
        self
    }

    pub fn storage(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.storage_min = min;
        self.storage_max = max;
        self
    }

    pub fn price(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    pub fn ecc(mut self, is_ecc: bool) -> Self {
        self.is_ecc = Some(is_ecc);
        self
    }

    /// True when no bound is set.
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    /// True when `record` satisfies every bound that is set.
    pub fn matches(&self, record: &Record) -> bool {
        if !within(record.ram_gb, self.ram_min, self.ram_max) {
            return false;
        }
        if let Some(ecc) = self.is_ecc {
            if record.has_ecc() != ecc {
                return false;
            }
        }
        within(record.storage_gb(), self.storage_min, self.storage_max)
            && within(record.ssd_gb, self.ssd_min, self.ssd_max)
            && within(record.price, self.price_min, self.price_max)
    }
}

/// Inclusive bound check. An unordered value (NaN) fails any bound that is set.
fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    let at_least = |bound: T| {
        matches!(value.partial_cmp(&bound), Some(Ordering::Greater | Ordering::Equal))
    };
    let at_most = |bound: T| {
        matches!(value.partial_cmp(&bound), Some(Ordering::Less | Ordering::Equal))
    };
    min.map_or(true, at_least) && max.map_or(true, at_most)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    ValueAsc,
    ValueDesc,
    PriceAsc,
    PriceDesc,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [
        SortMode::ValueAsc,
        SortMode::ValueDesc,
        SortMode::PriceAsc,
        SortMode::PriceDesc,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ValueAsc => "value_asc",
            Self::ValueDesc => "value_desc",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }

    /// Unrecognised names fall back to `value_asc`.
    pub fn parse_lenient(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(raw.trim()))
            .unwrap_or_default()
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            Self::ValueAsc => compare_nan_last(a.value, b.value, false),
            Self::ValueDesc => compare_nan_last(a.value, b.value, true),
            Self::PriceAsc => compare_nan_last(a.price, b.price, false),
            Self::PriceDesc => compare_nan_last(a.price, b.price, true),
        }
    }
}

impl FromStr for SortMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot over a dataset. Every operation returns a new view and leaves
/// `self` untouched; records are shared between views, never copied.
#[derive(Clone, Debug, Default)]
pub struct QueryView {
    records: Vec<Arc<Record>>,
}

impl QueryView {
    /// Wrap a dataset, keeping its order.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter().map(Arc::new).collect(),
        }
    }

    /// Keep only the records that satisfy every bound in `criteria`.
    pub fn filter(&self, criteria: &ListingFilter) -> Self {
        if criteria.is_unconstrained() {
            return self.clone();
        }
        Self {
            records: self
                .records
                .iter()
                .filter(|record| criteria.matches(record))
                .cloned()
                .collect(),
        }
    }

    /// Keep records whose RAM (GB) lies within the bounds.
    pub fn ram(&self, min: Option<u32>, max: Option<u32>) -> Self {
        self.filter(&ListingFilter::new().ram(min, max))
    }

    /// Keep records whose SSD capacity (GB) lies within the bounds.
    pub fn ssd(&self, min: Option<f64>, max: Option<f64>) -> Self {
        self.filter(&ListingFilter::new().ssd(min, max))
    }

    /// Keep records whose SSD + HDD capacity (GB) lies within the bounds.
    pub fn storage(&self, min: Option<f64>, max: Option<f64>) -> Self {
        self.filter(&ListingFilter::new().storage(min, max))
    }

    /// Keep records whose price lies within the bounds.
    pub fn price(&self, min: Option<f64>, max: Option<f64>) -> Self {
        self.filter(&ListingFilter::new().price(min, max))
    }

    /// Keep only ECC (`true`) or only non-ECC (`false`) records.
    pub fn ecc(&self, is_ecc: bool) -> Self {
        self.filter(&ListingFilter::new().ecc(is_ecc))
    }

    /// Stable sort; equal keys keep their previous relative order.
    pub fn sort(&self, mode: SortMode) -> Self {
        let mut records = self.records.clone();
        records.sort_by(|a, b| mode.compare(a, b));
        Self { records }
    }

    /// The first `n` records in view order.
    pub fn limit(&self, n: usize) -> Self {
        Self {
            records: self.records.iter().take(n).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&Record> {
        self.records.first().map(|record| record.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.records.iter().map(|record| record.as_ref())
    }

    /// Owned copies of the records, in view order.
    pub fn records(&self) -> Vec<Record> {
        self.iter().cloned().collect()
    }

    /// Record ids in view order.
    pub fn ids(&self) -> Vec<u64> {
        self.iter().map(|record| record.id).collect()
    }
}
