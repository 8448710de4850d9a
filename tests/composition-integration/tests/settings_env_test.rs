//! 环境变量覆盖配置的测试
//!
//! 环境变量是进程级状态，单独放在一个测试二进制中，避免影响其他测试。

use di_composition::{init_logging, CompositionSettings, LoggingConfig, ENV_PREFIX, ENV_SEPARATOR};
use std::io::Write;

#[test]
fn test_environment_overrides_file() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        "[container]\nmax_resolution_depth = 16\n\n[logging]\nlevel = \"warn\""
    )?;

    let depth_key = format!(
        "{ENV_PREFIX}{ENV_SEPARATOR}CONTAINER{ENV_SEPARATOR}MAX_RESOLUTION_DEPTH"
    );
    std::env::set_var(&depth_key, "32");

    let from_file = CompositionSettings::load(file.path());
    let from_env = CompositionSettings::from_env();
    std::env::remove_var(&depth_key);

    let from_file = from_file?;
    assert_eq!(from_file.container.max_resolution_depth, 32);
    assert_eq!(from_file.logging.level, "warn");

    let from_env = from_env?;
    assert_eq!(from_env.container.max_resolution_depth, 32);
    assert_eq!(from_env.logging, LoggingConfig::default());
    Ok(())
}

#[test]
fn test_logging_can_only_be_initialized_once() {
    let config = LoggingConfig {
        filter: Some("di_impl=trace".to_string()),
        ..LoggingConfig::development()
    };

    assert!(init_logging(&config).is_ok());
    assert!(init_logging(&config).is_err());
}
