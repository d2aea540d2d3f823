//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;
use url::Url;

/// Write a fresh config file under the base directory.
pub async fn cmd_init(
    base_dir: Option<PathBuf>,
    force: bool,
    service_url: Option<String>,
) -> Result<Config> {
    let mut config = Config::default();
    config.init_paths(base_dir);

    if config.paths.config_file.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config.paths.config_file.display()
        )));
    }

    if let Some(url) = service_url {
        Url::parse(&url)?;
        config.service_url = url;
    }

    config.validate()?;
    config.save()?;
    info!("Initialized config at {:?}", config.paths.config_file);

    Ok(config)
}

pub fn print_init(config: &Config) {
    println!("✓ kbctl initialized successfully");
    println!("  Config: {}", config.paths.config_file.display());
    println!("  Service: {}", config.service_url);
    println!("\nNext steps:");
    println!("  1. kbctl status                    # check the service is reachable");
    println!("  2. kbctl project create <name>     # create a project");
    println!("  3. kbctl doc upload <project> <pdf>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_writes_config_file() {
        let dir = TempDir::new().unwrap();
        let config = cmd_init(Some(dir.path().to_path_buf()), false, None)
            .await
            .unwrap();
        assert!(config.paths.config_file.exists());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        cmd_init(Some(dir.path().to_path_buf()), false, None)
            .await
            .unwrap();

        let err = cmd_init(Some(dir.path().to_path_buf()), false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        cmd_init(Some(dir.path().to_path_buf()), true, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_service_url() {
        let dir = TempDir::new().unwrap();
        let err = cmd_init(
            Some(dir.path().to_path_buf()),
            false,
            Some("not a url".to_string()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::UrlParse(_)));
    }
}
