//! Periodic status lines
//!
//! Rendered either as a padded console table or as CSV.

use std::time::Duration;

use crate::metrics::PoolStats;

/// How status lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFormat {
    Console,
    Csv,
}

impl StatusFormat {
    /// Parse the `status_format` config value
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "console" => Some(Self::Console),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// One row of churn progress
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub elapsed: Duration,
    pub connections: u64,
    pub failures: u64,
    pub pool: PoolStats,
}

const COLUMNS: [&str; 6] = ["TimeSlice", "Connections", "Failures", "InUse", "Capacity", "Pages"];

impl StatusLine {
    /// Column explanations, printed once before the header
    pub fn legend(format: StatusFormat) -> Option<String> {
        match format {
            StatusFormat::Csv => None,
            StatusFormat::Console => Some(
                "Legend:\n\
                 * TimeSlice - seconds since the run started\n\
                 * Connections - connection setups completed\n\
                 * Failures - connection setups that could not get a buffer\n\
                 * InUse / Capacity - identifier slots held / owned by the pool\n\
                 * Pages - pages backing the pool\n"
                    .to_string(),
            ),
        }
    }

    pub fn header(format: StatusFormat) -> String {
        match format {
            StatusFormat::Csv => format!("{}\n", COLUMNS.join(",")),
            StatusFormat::Console => {
                let cells: Vec<String> = COLUMNS.iter().map(|c| format!("{c:>12}")).collect();
                format!("{}\n", cells.join(" "))
            }
        }
    }

    pub fn render(&self, format: StatusFormat) -> String {
        let time = format!("{:.3}", self.elapsed.as_secs_f64());
        let cells = [
            time,
            self.connections.to_string(),
            self.failures.to_string(),
            self.pool.in_use.to_string(),
            self.pool.capacity.to_string(),
            self.pool.pages.to_string(),
        ];
        match format {
            StatusFormat::Csv => format!("{}\n", cells.join(",")),
            StatusFormat::Console => {
                let cells: Vec<String> = cells.iter().map(|c| format!("{c:>12}")).collect();
                format!("{}\n", cells.join(" "))
            }
        }
    }
}
