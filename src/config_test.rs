/// Tests for config module
#[cfg(test)]
mod tests {
    use crate::cli::CliArgs;
    use crate::config::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn args(extra: &[&str]) -> CliArgs {
        let argv = ["chemdata"].into_iter().chain(extra.iter().copied()).chain(["prefs", "show"]);
        CliArgs::try_parse_from(argv).unwrap()
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = resolve_config(&args(&[]), FileConfig::default(), env_from(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.credentials().is_none());
        assert!(!config.local_prefs);
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let file = FileConfig {
            api_url: Some("http://file:1".to_string()),
            username: Some("file-user".to_string()),
            password: Some("file-pass".to_string()),
            ..FileConfig::default()
        };
        let env = env_from(&[(ENV_API_URL, "http://env:2"), (ENV_USERNAME, "env-user")]);
        let config = resolve_config(&args(&["--api-url", "http://cli:3/"]), file, env).unwrap();

        assert_eq!(config.api_url, "http://cli:3");
        assert_eq!(config.username.as_deref(), Some("env-user"));
        assert_eq!(config.password.as_deref(), Some("file-pass"));
        assert_eq!(config.credentials(), Some(("env-user", "file-pass")));
    }

    #[test]
    fn test_file_paths_and_timeout() {
        let file = parse_config(
            r#"
            output_dir = "/tmp/reports"
            preferences_path = "/tmp/prefs.json"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        let config = resolve_config(&args(&[]), file, env_from(&[])).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.preferences_path, PathBuf::from("/tmp/prefs.json"));
        assert_eq!(config.timeout, Duration::from_secs(5));

        let config = resolve_config(&args(&["--timeout", "9"]), FileConfig::default(), env_from(&[])).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_unknown_config_key_is_rejected() {
        assert!(parse_config("api_urll = \"http://x\"").is_err());
    }

    #[test]
    fn test_api_url_needs_scheme() {
        let err = resolve_config(&args(&["--api-url", "localhost:8000"]), FileConfig::default(), env_from(&[]));
        assert!(err.unwrap_err().contains("http://"));
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let config = resolve_config(&args(&["-u", "ada"]), FileConfig::default(), env_from(&[])).unwrap();
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_load_config_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(load_config_file(&path, false).unwrap(), FileConfig::default());
        assert!(load_config_file(&path, true).is_err());

        std::fs::write(&path, "api_url = \"https://plant.example\"\n").unwrap();
        let file = load_config_file(&path, true).unwrap();
        assert_eq!(file.api_url.as_deref(), Some("https://plant.example"));
    }
}
