//! Disk capacity extraction from free-text description lines.
//!
//! The upstream feed writes disks as `<qty>x <SSD|HDD> ... <magnitude> <GB|TB> ...`,
//! e.g. `2x SSD M.2 NVMe 512 GB` or `1x HDD SATA 3,84 TB Enterprise`. The layout is
//! not versioned upstream, so the parser scans for the unit marker instead of
//! relying on fixed token positions.

use thiserror::Error;
use tracing::debug;

use super::entities::{CapacityUnit, DiskKind, ParsedCapacity};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DescriptionError {
    #[error("line has fewer than two tokens")]
    TooFewTokens,
    #[error("unknown disk type token: {0}")]
    UnknownDiskType(String),
    #[error("no leading quantity in token: {0}")]
    MissingQuantity(String),
    #[error("no GB/TB capacity marker")]
    MissingCapacity,
    #[error("invalid capacity magnitude: {0}")]
    InvalidMagnitude(String),
}

/// Summed SSD and HDD capacity over all lines of one listing, in GB.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DiskTotals {
    pub ssd_gb: f64,
    pub hdd_gb: f64,
}

impl DiskTotals {
    pub fn add(&mut self, capacity: &ParsedCapacity) {
        match capacity.kind {
            DiskKind::Ssd => self.ssd_gb += capacity.total_gb(),
            DiskKind::Hdd => self.hdd_gb += capacity.total_gb(),
        }
    }
}

/// Parse one description line into the disk capacity it describes.
pub fn parse_line(line: &str) -> Result<ParsedCapacity, DescriptionError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(DescriptionError::TooFewTokens);
    }

    let kind = DiskKind::from_token(tokens[1])
        .ok_or_else(|| DescriptionError::UnknownDiskType(tokens[1].to_string()))?;
    let quantity = leading_quantity(tokens[0])
        .ok_or_else(|| DescriptionError::MissingQuantity(tokens[0].to_string()))?;

    // First marker wins; index 0 is the quantity so the magnitude sits at >= 1.
    let (index, unit) = tokens
        .iter()
        .enumerate()
        .skip(2)
        .find_map(|(i, token)| CapacityUnit::from_token(token).map(|unit| (i, unit)))
        .ok_or(DescriptionError::MissingCapacity)?;

    let raw = tokens[index - 1];
    let unit_capacity = raw
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
        .ok_or_else(|| DescriptionError::InvalidMagnitude(raw.to_string()))?;

    Ok(ParsedCapacity {
        kind,
        quantity,
        unit_capacity,
        unit,
    })
}

/// Sum capacities over every line, skipping lines that are not disks.
pub fn disk_totals<S: AsRef<str>>(lines: &[S]) -> DiskTotals {
    let mut totals = DiskTotals::default();
    for line in lines {
        let line = line.as_ref();
        match parse_line(line) {
            Ok(capacity) => totals.add(&capacity),
            Err(err) => debug!(line, %err, "skipping description line"),
        }
    }
    totals
}

fn leading_quantity(token: &str) -> Option<u32> {
    let end = token
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    token[..end].parse::<u32>().ok().filter(|qty| *qty > 0)
}
