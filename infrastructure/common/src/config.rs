use serde::*;

/// Prefix of environment variables overriding file configuration,
/// e.g. `PROVISIONER__COMMON__HOST__BIND_PORT`.
pub const ENV_PREFIX: &str = "PROVISIONER";

#[derive(Default, Deserialize, Clone, Debug)]
pub struct CommonConfig {
    #[serde(default)]
    pub telemetry: crate::telemetry::TelemetryConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub redis: RedisConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct HostConfig {
    #[serde(default = "HostConfig::default_address")]
    pub bind_address: String,
    #[serde(default = "HostConfig::default_port")]
    pub bind_port: u16,
    /// Largest request body accepted, in bytes.
    #[serde(default = "HostConfig::default_payload_limit")]
    pub payload_limit: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_address: Self::default_address(),
            bind_port: Self::default_port(),
            payload_limit: Self::default_payload_limit(),
        }
    }
}

impl HostConfig {
    fn default_address() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        80
    }
    fn default_payload_limit() -> usize {
        8 * 1024 * 1024
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct RedisConfig {
    #[serde(default = "RedisConfig::default_urls")]
    pub urls: Vec<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: Self::default_urls(),
        }
    }
}

impl RedisConfig {
    fn default_urls() -> Vec<String> {
        vec!["redis://localhost:6379".to_string()]
    }
}

/// Layer `config.yaml`, any yaml files passed as arguments and the environment,
/// later sources winning.
pub fn build_config() -> anyhow::Result<config::Config> {
    let args: Vec<String> = std::env::args().collect();
    build_config_from(&args)
}

fn build_config_from(args: &[String]) -> anyhow::Result<config::Config> {
    let mut config = config::Config::builder().add_source(
        config::File::with_name("config")
            .required(false)
            .format(config::FileFormat::Yaml),
    );
    for arg in args {
        if arg.ends_with("yaml") || arg.ends_with("yml") {
            config = config.add_source(
                config::File::from(std::path::Path::new(arg.as_str()))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );
        }
    }
    config = config.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(";")
            .with_list_parse_key("common.redis.urls"),
    );
    Ok(config.build()?)
}
