//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use quette_core::Config;

use crate::output::{Output, OutputFormat};

const KEYS: &str = "data_dir, log_file, import_mode, recent_limit";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "log_file": config.log_file,
                    "import_mode": config.import_mode,
                    "recent_limit": config.recent_limit
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:     {}", config.data_dir.display());
            println!(
                "  log_file:     {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  import_mode:  {}", config.import_mode);
            println!("  recent_limit: {}", config.recent_limit);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            if value.trim().is_empty() {
                bail!("data_dir cannot be empty");
            }
            config.data_dir = value.into();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        "import_mode" => {
            config.import_mode = value.parse()?;
        }
        "recent_limit" => {
            config.recent_limit = value
                .parse()
                .context("Invalid value for recent_limit. Use a whole number.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: {}",
                key,
                KEYS
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quette_core::ImportMode;

    #[test]
    fn test_apply_values() {
        let mut config = Config::default();

        apply(&mut config, "import_mode", "replace").unwrap();
        assert_eq!(config.import_mode, ImportMode::Replace);

        apply(&mut config, "recent_limit", "12").unwrap();
        assert_eq!(config.recent_limit, 12);

        apply(&mut config, "log_file", "/tmp/q.log").unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/q.log")));
        apply(&mut config, "log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "import_mode", "overwrite").is_err());
        assert!(apply(&mut config, "recent_limit", "-1").is_err());
        assert!(apply(&mut config, "data_dir", " ").is_err());
        assert!(apply(&mut config, "sync_url", "ws://x").is_err());
        assert_eq!(config.import_mode, ImportMode::Merge);
        assert_eq!(config.recent_limit, 4);
    }

    #[test]
    fn test_set_writes_config_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!("data_dir = {:?}\n", temp_dir.path().join("data")),
        )
        .unwrap();
        let output = Output::new(OutputFormat::Quiet);

        set("recent_limit".to_string(), "7".to_string(), Some(&path), &output).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("recent_limit = 7"));
    }
}
