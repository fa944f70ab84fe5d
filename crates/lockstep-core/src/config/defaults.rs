//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "lockstep.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "lockstep.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".lockstep.toml",
        ".lockstep.yaml",
    ]
}
