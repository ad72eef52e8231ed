//! Value parsers for CLI arguments

use std::fs;
use std::path::PathBuf;

use crate::cli::parser::JobSpec;
use crate::jobs::JobArgs;

pub fn validate_port(port_str: &str) -> Result<u16, String> {
    let port: u16 = port_str.parse().map_err(|_| {
        format!("Port must be a valid number between 1 and 65535, got: '{}'", port_str)
    })?;

    if port == 0 {
        return Err("Port must be between 1 and 65535. Port 0 is not allowed.".to_string());
    }

    Ok(port)
}

/// The file must exist and be readable
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    fs::File::open(&path)
        .map(|_| path)
        .map_err(|e| format!("Cannot read configuration file '{}': {}", path_str, e))
}

pub fn validate_host_address(host_str: &str) -> Result<String, String> {
    let host = host_str.trim();

    if host.is_empty() {
        return Err("Host address cannot be empty".to_string());
    }

    if host.chars().any(char::is_whitespace) {
        return Err("Host address cannot contain whitespace".to_string());
    }

    if host.len() > 253 {
        return Err("Host address is too long (maximum 253 characters)".to_string());
    }

    Ok(host.to_string())
}

/// Parse `TYPE` or `TYPE=JSON_OBJECT`
///
/// Splits on the first `=`, so the JSON may itself contain `=`.
pub fn parse_job_spec(spec: &str) -> Result<JobSpec, String> {
    let (job_type, raw_args) = match spec.split_once('=') {
        Some((job_type, raw_args)) => (job_type.trim(), Some(raw_args)),
        None => (spec.trim(), None),
    };

    if job_type.is_empty() {
        return Err(format!("Job type is missing in '{}'", spec));
    }
    if job_type.chars().any(char::is_whitespace) {
        return Err(format!("Job type cannot contain whitespace: '{}'", job_type));
    }

    let args = match raw_args {
        None => JobArgs::new(),
        Some(raw) => serde_json::from_str::<JobArgs>(raw)
            .map_err(|e| format!("Arguments for '{}' must be a JSON object: {}", job_type, e))?,
    };

    Ok(JobSpec {
        job_type: job_type.to_string(),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_port() {
        assert_eq!(validate_port("8080"), Ok(8080));
        assert!(validate_port("0").is_err());
        assert!(validate_port("65536").is_err());
        assert!(validate_port("http").is_err());
    }

    #[test]
    fn test_validate_host_address() {
        assert_eq!(validate_host_address(" 0.0.0.0 "), Ok("0.0.0.0".to_string()));
        assert_eq!(validate_host_address("jobs.internal"), Ok("jobs.internal".to_string()));
        assert!(validate_host_address("").is_err());
        assert!(validate_host_address("bad host").is_err());
        assert!(validate_host_address(&"a".repeat(254)).is_err());
    }

    #[test]
    fn test_validate_config_file_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(validate_config_file_path(path), Ok(file.path().to_path_buf()));

        let dir = tempfile::TempDir::new().unwrap();
        assert!(validate_config_file_path(dir.path().to_str().unwrap()).is_err());
        assert!(validate_config_file_path("/nonexistent/deferred.toml").is_err());
    }

    #[test]
    fn test_parse_job_spec_without_args() {
        let spec = parse_job_spec("delay").unwrap();
        assert_eq!(spec.job_type, "delay");
        assert!(spec.args.is_empty());
    }

    #[test]
    fn test_parse_job_spec_with_args() {
        let spec = parse_job_spec(r#"log_message={"message":"a=b","level":"info"}"#).unwrap();
        assert_eq!(spec.job_type, "log_message");
        assert_eq!(spec.args.get("message"), Some(&json!("a=b")));
        let keys: Vec<&str> = spec.args.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["message", "level"]);
    }

    #[test]
    fn test_parse_job_spec_errors() {
        assert!(parse_job_spec("").is_err());
        assert!(parse_job_spec("={}").is_err());
        assert!(parse_job_spec("log message").is_err());
        assert!(parse_job_spec("delay=").is_err());
        assert!(parse_job_spec("delay=42").is_err());
        assert!(parse_job_spec("delay={broken").is_err());
    }
}
