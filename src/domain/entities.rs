use serde::{Deserialize, Serialize};

/// One auction offer as delivered by the feed, before any parsing.
#[derive(Clone, Debug, PartialEq)]
pub struct Listing {
    /// Upstream identifier, or the feed position when the feed omits one.
    pub id: u64,
    pub price: f64,
    pub ram_gb: u32,
    pub is_ecc: bool,
    pub cpu_id: String,
    /// 0 means the feed did not know the score.
    pub cpu_benchmark: f64,
    pub description_lines: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiskKind {
    Ssd,
    Hdd,
}

impl DiskKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "SSD" => Some(Self::Ssd),
            "HDD" => Some(Self::Hdd),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapacityUnit {
    Gb,
    Tb,
}

impl CapacityUnit {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GB" => Some(Self::Gb),
            "TB" => Some(Self::Tb),
            _ => None,
        }
    }

    /// Multiplier that turns a magnitude in this unit into GB.
    pub fn gb_factor(self) -> f64 {
        match self {
            Self::Gb => 1.0,
            Self::Tb => 1024.0,
        }
    }
}

/// Disk capacity parsed from a single description line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParsedCapacity {
    pub kind: DiskKind,
    pub quantity: u32,
    pub unit_capacity: f64,
    pub unit: CapacityUnit,
}

impl ParsedCapacity {
    /// Total GB-equivalent this line contributes.
    pub fn total_gb(&self) -> f64 {
        self.quantity as f64 * self.unit_capacity * self.unit.gb_factor()
    }
}

/// A listing after parsing and benchmark repair, ready to be fitted.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerRow {
    pub id: u64,
    pub price: f64,
    pub ram_gb: u32,
    pub is_ecc: u8,
    pub ssd_gb: f64,
    pub hdd_gb: f64,
    pub cpu_id: String,
    pub cpu_benchmark: f64,
    pub description: String,
}

impl ServerRow {
    /// Regressor vector in model order: benchmark, ecc, ram, hdd, ssd.
    pub fn features(&self) -> [f64; 5] {
        [
            self.cpu_benchmark,
            self.is_ecc as f64,
            self.ram_gb as f64,
            self.hdd_gb,
            self.ssd_gb,
        ]
    }

    pub fn is_scoreable(&self) -> bool {
        self.cpu_benchmark > 0.0
    }

    pub fn storage_gb(&self) -> f64 {
        self.ssd_gb + self.hdd_gb
    }
}

/// A fully valuated listing as exposed by the query layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub id: u64,
    /// `expected_price / price`; NaN when the price is zero.
    pub value: f64,
    pub price: f64,
    pub expected_price: f64,
    pub ram_gb: u32,
    pub is_ecc: u8,
    pub ssd_gb: f64,
    pub hdd_gb: f64,
    pub cpu_id: String,
    pub cpu_benchmark: f64,
    /// False when the benchmark could not be repaired and the row sat out the fit.
    pub scored: bool,
    pub description: String,
}

impl Record {
    pub fn storage_gb(&self) -> f64 {
        self.ssd_gb + self.hdd_gb
    }

    pub fn has_ecc(&self) -> bool {
        self.is_ecc == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unvaluable_record_serializes_value_as_null() {
        let record = Record {
            id: 7,
            value: f64::NAN,
            price: 0.0,
            expected_price: 42.0,
            ram_gb: 64,
            is_ecc: 0,
            ssd_gb: 512.0,
            hdd_gb: 0.0,
            cpu_id: "Intel Xeon E3-1275V6".into(),
            cpu_benchmark: 9000.0,
            scored: true,
            description: String::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["value"].is_null());
        assert_eq!(json["price"], 0.0);
    }
}
