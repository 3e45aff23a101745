//! Load and validation tests for unzip-relay-config.
// crates/unzip-relay-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: TOML parsing, defaults, and fail-closed validation coverage.
// Purpose: Ensure invalid configuration never produces a running service.
// =============================================================================

use unzip_relay_config::ConfigError;
use unzip_relay_config::RelayConfig;
use unzip_relay_config::StoreProvider;

type TestResult = Result<(), String>;

/// Minimal valid configuration: only the destination bucket is required.
const MINIMAL: &str = r#"
[destination]
bucket = "extracted"
"#;

/// Assert that a parse result is an error containing a specific substring.
fn assert_invalid(result: Result<RelayConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn minimal_config_fills_defaults() -> TestResult {
    let config = RelayConfig::from_toml(MINIMAL).map_err(|err| err.to_string())?;
    if config.server.bind != "0.0.0.0:8080" {
        return Err(format!("unexpected default bind: {}", config.server.bind));
    }
    if config.server.max_body_bytes != 1024 * 1024 {
        return Err("unexpected default max_body_bytes".to_string());
    }
    if config.source.provider != StoreProvider::S3 {
        return Err("unexpected default source provider".to_string());
    }
    if config.limits.chunk_size_bytes != 64 * 1024 {
        return Err("unexpected default chunk size".to_string());
    }
    if config.limits.max_entries.is_some() {
        return Err("ceilings default to unlimited".to_string());
    }
    Ok(())
}

#[test]
fn full_config_round_trips() -> TestResult {
    let config = RelayConfig::from_toml(
        r#"
[server]
bind = "127.0.0.1:9090"
max_body_bytes = 65536

[source]
provider = "s3"
region = "us-east-1"
endpoint = "http://localhost:9000"
force_path_style = true

[destination]
provider = "s3"
bucket = "extracted"
region = "us-east-1"

[limits]
chunk_size_bytes = 32768
max_entries = 10000
max_entry_bytes = 1073741824
max_total_bytes = 10737418240
"#,
    )
    .map_err(|err| err.to_string())?;
    let limits = config.limits.to_extraction_limits();
    if limits.chunk_bytes != 32768 {
        return Err("chunk size not propagated".to_string());
    }
    if limits.max_entries != Some(10000) {
        return Err("entry ceiling not propagated".to_string());
    }
    let addr = config.server.bind_addr().map_err(|err| err.to_string())?;
    if addr.port() != 9090 {
        return Err("bind port not parsed".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Fail-Closed Validation
// ============================================================================

#[test]
fn missing_destination_section_is_rejected() -> TestResult {
    assert_invalid(RelayConfig::from_toml("[server]\n"), "destination")
}

#[test]
fn empty_destination_bucket_is_rejected() -> TestResult {
    assert_invalid(
        RelayConfig::from_toml("[destination]\nbucket = \"  \"\n"),
        "destination bucket must be set",
    )
}

#[test]
fn oversized_bucket_name_is_rejected() -> TestResult {
    let bucket = "b".repeat(64);
    assert_invalid(
        RelayConfig::from_toml(&format!("[destination]\nbucket = \"{bucket}\"\n")),
        "bucket name exceeds",
    )
}

#[test]
fn unparseable_bind_address_is_rejected() -> TestResult {
    assert_invalid(
        RelayConfig::from_toml(&format!("[server]\nbind = \"not an address\"\n{MINIMAL}")),
        "bind address is not valid",
    )
}

#[test]
fn zero_body_limit_is_rejected() -> TestResult {
    assert_invalid(
        RelayConfig::from_toml(&format!("[server]\nmax_body_bytes = 0\n{MINIMAL}")),
        "max_body_bytes",
    )
}

#[test]
fn undersized_chunk_is_rejected() -> TestResult {
    assert_invalid(
        RelayConfig::from_toml(&format!("{MINIMAL}\n[limits]\nchunk_size_bytes = 512\n")),
        "chunk_size_bytes must be at least",
    )
}

#[test]
fn oversized_chunk_is_rejected() -> TestResult {
    assert_invalid(
        RelayConfig::from_toml(&format!("{MINIMAL}\n[limits]\nchunk_size_bytes = 16777216\n")),
        "chunk_size_bytes exceeds ceiling",
    )
}

#[test]
fn zero_ceilings_are_rejected() -> TestResult {
    assert_invalid(
        RelayConfig::from_toml(&format!("{MINIMAL}\n[limits]\nmax_entries = 0\n")),
        "max_entries",
    )?;
    assert_invalid(
        RelayConfig::from_toml(&format!("{MINIMAL}\n[limits]\nmax_entry_bytes = 0\n")),
        "max_entry_bytes",
    )?;
    assert_invalid(
        RelayConfig::from_toml(&format!("{MINIMAL}\n[limits]\nmax_total_bytes = 0\n")),
        "max_total_bytes",
    )
}

#[test]
fn entry_ceiling_above_total_ceiling_is_rejected() -> TestResult {
    assert_invalid(
        RelayConfig::from_toml(&format!(
            "{MINIMAL}\n[limits]\nmax_entry_bytes = 200\nmax_total_bytes = 100\n"
        )),
        "max_entry_bytes cannot exceed max_total_bytes",
    )
}

#[test]
fn unknown_provider_is_rejected() -> TestResult {
    assert_invalid(
        RelayConfig::from_toml("[destination]\nbucket = \"b\"\nprovider = \"ftp\"\n"),
        "parse",
    )
}

#[test]
fn memory_provider_is_accepted() -> TestResult {
    let config =
        RelayConfig::from_toml("[destination]\nbucket = \"b\"\nprovider = \"memory\"\n")
            .map_err(|err| err.to_string())?;
    if config.destination.provider != StoreProvider::Memory {
        return Err("memory provider not parsed".to_string());
    }
    Ok(())
}

#[test]
fn schemeless_endpoint_is_rejected() -> TestResult {
    assert_invalid(
        RelayConfig::from_toml(
            "[destination]\nbucket = \"b\"\nendpoint = \"localhost:9000\"\n",
        ),
        "endpoint must start with",
    )
}

// ============================================================================
// SECTION: File Loading
// ============================================================================

#[test]
fn config_loads_from_disk() -> TestResult {
    let path = std::env::temp_dir().join("unzip-relay-load-test.toml");
    std::fs::write(&path, MINIMAL).map_err(|err| err.to_string())?;
    let result = RelayConfig::load(Some(&path));
    let _ = std::fs::remove_file(&path);
    let config = result.map_err(|err| err.to_string())?;
    if config.destination.bucket != "extracted" {
        return Err("bucket not loaded from file".to_string());
    }
    Ok(())
}

#[test]
fn missing_config_file_is_an_io_error() -> TestResult {
    let path = std::env::temp_dir().join("unzip-relay-does-not-exist.toml");
    match RelayConfig::load(Some(&path)) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(other) => Err(format!("expected io error, got: {other}")),
        Ok(_) => Err("expected io error, got a config".to_string()),
    }
}

#[test]
fn oversized_config_file_is_rejected() -> TestResult {
    let path = std::env::temp_dir().join("unzip-relay-oversized-test.toml");
    std::fs::write(&path, vec![b'#'; 256 * 1024 + 1]).map_err(|err| err.to_string())?;
    let result = RelayConfig::load(Some(&path));
    let _ = std::fs::remove_file(&path);
    assert_invalid(result, "size limit")
}

// ============================================================================
// SECTION: Port Override
// ============================================================================

#[test]
fn injected_port_replaces_bind_port() -> TestResult {
    let mut config = RelayConfig::from_toml(MINIMAL).map_err(|err| err.to_string())?;
    config.apply_port_override("9999").map_err(|err| err.to_string())?;
    let addr = config.server.bind_addr().map_err(|err| err.to_string())?;
    if addr.port() != 9999 {
        return Err(format!("port override not applied: {addr}"));
    }
    Ok(())
}

#[test]
fn invalid_injected_port_is_rejected() -> TestResult {
    let mut config = RelayConfig::from_toml(MINIMAL).map_err(|err| err.to_string())?;
    match config.apply_port_override("not-a-port") {
        Err(ConfigError::Invalid(_)) => Ok(()),
        Err(other) => Err(format!("expected invalid port error, got: {other}")),
        Ok(()) => Err("expected invalid port error, got success".to_string()),
    }
}
