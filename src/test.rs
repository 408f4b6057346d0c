//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::model::{TimestampParser, Transactions};
use crate::Config;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A small transaction file that has every known column, so every aggregate is available.
pub(crate) const SAMPLE_CSV: &str = r##"Account Type,Region,Transaction To,Credit,Debit,Date,Reference
Savings,East,BankA,100.00,0,2024-01-02,r01
Savings,East,BankB,200.00,15.50,2024-01-02,r02
Checking,West,BankC,"$1,250.00",40.00,2024-01-03,r03
Business,North,BankA,75.25,300.00,2024-01-03 14:30:00,r04
Checking,East,,60.00,12.00,2024-01-04,r05
Savings,West,BankD,310.00,5.00,01/05/2024,r06
Business,North,BankE,20.00,450.00,2024-01-05,r07
Checking,South,BankA,95.00,80.00,2024-01-06,r08
Savings,East,BankB,180.00,0,2024-01-06,r09
Business,West,BankC,,220.00,2024-01-07,r10
Checking,North,BankF,130.00,60.00,,r11
Savings,South,BankG,45.00,10.00,2024-01-08,r12
Checking,East,BankH,88.00,33.00,2024-01-08,r13
Savings,East,BankI,52.00,7.50,2024-01-09,r14
Business,South,BankA,410.00,95.00,2024-01-09,r15
Checking,West,BankD,66.00,18.00,2024-01-10,r16
"##;

/// Parses `csv` with the default timestamp formats.
pub(crate) fn transactions_from_csv(csv: &str) -> Transactions {
    crate::load::parse(csv.as_bytes(), &TimestampParser::default()).unwrap()
}

pub(crate) fn sample_transactions() -> Transactions {
    transactions_from_csv(SAMPLE_CSV)
}

/// Writes `contents` to `path`, dated an hour back so the dataset cache trusts its metadata.
fn write_settled(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();
}

/// Test environment that sets up a home directory with a Config whose default input is a copy of
/// `SAMPLE_CSV`. Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment with Config and the sample transaction file.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("txn-insights");
        let mut config = Config::create(&root).await.unwrap();

        write_settled(&config.root().join("transactions.csv"), SAMPLE_CSV);
        config.set_default_input(Some(PathBuf::from("transactions.csv")));
        config.save().await.unwrap();

        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    pub fn root(&self) -> &Path {
        self.config.root()
    }

    /// Writes `contents` to `name` in the home directory and returns its path.
    pub fn write_csv(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root().join(name);
        write_settled(&path, contents);
        path
    }
}
