use std::path::PathBuf;

use chrono::NaiveDate;

/// Runtime settings, read from `STAYBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub currency: String,
    /// Cost assigned to newly materialized cleaning tasks.
    pub cleaning_cost: f64,
    /// Fixed "today" for the picker; system date when unset.
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidValue { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { var, value } => {
                write!(f, "invalid value for {var}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            currency: "USD".into(),
            cleaning_cost: 0.0,
            today: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(dir) = lookup("STAYBOOK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(currency) = lookup("STAYBOOK_CURRENCY") {
            config.currency = currency;
        }
        if let Some(cost) = lookup("STAYBOOK_CLEANING_COST") {
            config.cleaning_cost = cost
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|c| c.is_finite() && *c >= 0.0)
                .ok_or(ConfigError::InvalidValue {
                    var: "STAYBOOK_CLEANING_COST",
                    value: cost.clone(),
                })?;
        }
        if let Some(today) = lookup("STAYBOOK_TODAY") {
            let date = NaiveDate::parse_from_str(today.trim(), "%Y-%m-%d").map_err(|_| {
                ConfigError::InvalidValue {
                    var: "STAYBOOK_TODAY",
                    value: today.clone(),
                }
            })?;
            config.today = Some(date);
        }
        Ok(config)
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
