use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    pub detection_feed_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorsConfig {
    #[serde(default = "default_gases")]
    pub gases: Vec<String>,
    #[serde(default = "default_history_days")]
    pub default_history_days: u64,
}

fn default_gases() -> Vec<String> {
    vec!["C2H5OH".to_string(), "H2S".to_string(), "NO2".to_string()]
}

fn default_history_days() -> u64 {
    7
}

pub fn load_store_config() -> anyhow::Result<StoreConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/store"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_sensors_config() -> anyhow::Result<SensorsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/sensors"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
