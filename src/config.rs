//! Process configuration from the environment and operator settings from an
//! optional JSON file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::callback::MAX_FAQ_ENTRIES;

pub const DEFAULT_HANDLER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_YUAN_RATE: f64 = 11.96;
pub const DEFAULT_RATE_TTL_SECS: u64 = 3600;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// `None` runs the bot on the in-memory store
    pub database_url: Option<String>,
    pub handler_timeout: Duration,
    pub yuan_rate: f64,
    pub rate_source_url: Option<String>,
    pub rate_ttl: Duration,
    pub settings_path: Option<PathBuf>,
    pub locales_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Config {
    /// Reads the process environment; call `dotenv` first to honour `.env`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set")?;

        let handler_timeout_secs = match get("HANDLER_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().context("HANDLER_TIMEOUT_SECS must be a whole number")?,
            None => DEFAULT_HANDLER_TIMEOUT_SECS,
        };
        let yuan_rate = match get("YUAN_RATE") {
            Some(v) => v.parse::<f64>().context("YUAN_RATE must be a number")?,
            None => DEFAULT_YUAN_RATE,
        };
        let rate_ttl_secs = match get("RATE_TTL_SECS") {
            Some(v) => v.parse::<u64>().context("RATE_TTL_SECS must be a whole number")?,
            None => DEFAULT_RATE_TTL_SECS,
        };
        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            telegram_bot_token,
            database_url: get("DATABASE_URL"),
            handler_timeout: Duration::from_secs(handler_timeout_secs),
            yuan_rate,
            rate_source_url: get("RATE_SOURCE_URL"),
            rate_ttl: Duration::from_secs(rate_ttl_secs),
            settings_path: get("BOT_SETTINGS_PATH").map(PathBuf::from),
            locales_dir: get("LOCALES_DIR").map(PathBuf::from),
            log_format,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// Operator-editable content: guide pictures, FAQ, payment details
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Picture URLs for each of the four guide steps
    pub guide_images: Vec<Vec<String>>,
    pub faq: Vec<FaqEntry>,
    pub requisites: String,
    /// Accepted shop links
    pub shop_link_pattern: String,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            guide_images: vec![Vec::new(); 4],
            faq: vec![
                FaqEntry {
                    question: "Сколько идёт доставка?".to_string(),
                    answer: "Обычная доставка занимает 3-4 недели, экспресс около 10 дней".to_string(),
                },
                FaqEntry {
                    question: "Как рассчитывается цена?".to_string(),
                    answer: "Цена в юанях переводится по текущему курсу, к ней добавляются комиссия сервиса и стоимость доставки"
                        .to_string(),
                },
                FaqEntry {
                    question: "Можно ли вернуть товар?".to_string(),
                    answer: "Товары с Poizon возврату не подлежат, проверяйте размер перед заказом".to_string(),
                },
            ],
            requisites: "Реквизиты уточните у менеджера".to_string(),
            shop_link_pattern: r"^https://dw4\.co/.*".to_string(),
        }
    }
}

impl BotSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read bot settings from {}", path.display()))?;
        let settings: BotSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse bot settings from {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        regex::Regex::new(&self.shop_link_pattern).context("shop_link_pattern is not a valid regex")?;
        if self.faq.len() > MAX_FAQ_ENTRIES {
            bail!("faq has {} entries, at most {} are supported", self.faq.len(), MAX_FAQ_ENTRIES);
        }
        Ok(())
    }

    /// Pictures for guide step `step` (1-based); empty when not configured
    pub fn guide_step_images(&self, step: u8) -> &[String] {
        (step as usize)
            .checked_sub(1)
            .and_then(|i| self.guide_images.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.handler_timeout, Duration::from_secs(10));
        assert_eq!(config.yuan_rate, DEFAULT_YUAN_RATE);
        assert_eq!(config.database_url, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_token_is_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://localhost/poizon"),
            ("HANDLER_TIMEOUT_SECS", "3"),
            ("YUAN_RATE", "12.5"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/poizon"));
        assert_eq!(config.handler_timeout, Duration::from_secs(3));
        assert_eq!(config.yuan_rate, 12.5);
        assert_eq!(config.log_format, LogFormat::Json);

        assert!(Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "t"), ("YUAN_RATE", "abc")])).is_err());
    }

    #[test]
    fn test_settings_file_with_partial_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"requisites": "Сбербанк 0000 0000 0000 0000"}}"#).unwrap();

        let settings = BotSettings::load(file.path()).unwrap();
        assert_eq!(settings.requisites, "Сбербанк 0000 0000 0000 0000");
        assert_eq!(settings.shop_link_pattern, BotSettings::default().shop_link_pattern);
        assert!(settings.guide_step_images(1).is_empty());
        assert!(settings.guide_step_images(0).is_empty());
    }

    #[test]
    fn test_settings_limit_faq_size() {
        let entry = FaqEntry {
            question: "?".to_string(),
            answer: "!".to_string(),
        };
        let mut settings = BotSettings {
            faq: vec![entry.clone(); MAX_FAQ_ENTRIES],
            ..BotSettings::default()
        };
        assert!(settings.validate().is_ok());

        settings.faq.push(entry);
        assert!(settings.validate().is_err());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&settings).unwrap()).unwrap();
        assert!(BotSettings::load(file.path()).is_err());
    }

    #[test]
    fn test_settings_reject_bad_pattern() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"shop_link_pattern": "("}}"#).unwrap();
        assert!(BotSettings::load(file.path()).is_err());
    }
}
