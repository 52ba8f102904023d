//! Environment loading. Runs in its own test binary because it mutates the process
//! environment.

use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use trialogue::{ConfigError, TrialogueConfig};

#[test]
fn test_dotenv_file_fills_environment() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".env");
    fs::write(
        &path,
        "TRIALOGUE_DEEPSEEK_MODEL=deepseek-reasoner\n\
         TRIALOGUE_BACKEND_TIMEOUT_SECS=7\n\
         TRIALOGUE_CLAUDE_MODEL=from-file\n",
    )
    .unwrap();
    std::env::set_var("TRIALOGUE_CLAUDE_MODEL", "from-process");

    let config = TrialogueConfig::load_from_path(&path).unwrap();
    assert_eq!(config.deepseek_model, "deepseek-reasoner");
    assert_eq!(config.backend_timeout, Duration::from_secs(7));
    // Variables already set in the process are not overridden.
    assert_eq!(config.claude_model, "from-process");

    let missing = dir.path().join("absent.env");
    assert!(TrialogueConfig::load_from_path(&missing).is_ok());

    let broken = dir.path().join("broken.env");
    fs::write(&broken, "THIS IS NOT 'A DOTENV LINE\n").unwrap();
    assert!(matches!(
        TrialogueConfig::load_from_path(&broken),
        Err(ConfigError::InvalidDotenv { .. })
    ));
}
