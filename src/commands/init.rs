use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory and an initial `config.json` with default settings.
///
/// # Arguments
/// - `home` - The directory that will hold the configuration, e.g. `$HOME/txn-insights`
///
/// # Errors
/// - Returns an error if the configuration already exists or any file operations fail.
pub async fn init(home: &Path) -> Result<Out<()>> {
    let config = Config::create(home)
        .await
        .context("Unable to create the home directory and config")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created {}, set default_input there to analyze a file without --file",
        config.config_path().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let out = init(&home).await.unwrap();
        assert!(out.message().contains("config.json"));
        assert!(home.join("config.json").is_file());

        let err = init(&home).await.unwrap_err();
        assert!(format!("{err:#}").starts_with("config error"));
    }
}
