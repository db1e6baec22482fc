use std::borrow::Cow;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

const EMBEDDED_RU: &str = include_str!("../locales/ru/main.ftl");
const DEFAULT_LOCALE: &str = "ru";

/// Every human-readable message the bot sends, keyed by Fluent message id.
///
/// Constructed once at startup and shared by reference; there is no global
/// instance.
pub struct Texts {
    bundle: FluentBundle<FluentResource>,
}

impl Texts {
    /// Texts compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_ftl(EMBEDDED_RU.to_string())
    }

    /// Loads `<dir>/ru/main.ftl`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(DEFAULT_LOCALE).join("main.ftl");
        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read locale file {}", path.display()))?;
        Self::from_ftl(content)
    }

    pub fn from_ftl(content: String) -> Result<Self> {
        let locale: LanguageIdentifier = DEFAULT_LOCALE.parse()?;
        let resource = FluentResource::try_new(content)
            .map_err(|(_, errors)| anyhow!("Failed to parse Fluent resource: {errors:?}"))?;

        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Arguments are embedded in Telegram messages, Unicode isolation marks only add noise
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Failed to add Fluent resource: {errors:?}"))?;

        Ok(Self { bundle })
    }

    pub fn get(&self, key: &str) -> String {
        self.format(key, None)
    }

    pub fn get_with_args(&self, key: &str, args: &[(&str, String)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, FluentValue::from(value.clone()));
        }
        self.format(key, Some(&fluent_args))
    }

    pub fn has(&self, key: &str) -> bool {
        self.bundle.has_message(key)
    }

    fn format(&self, key: &str, args: Option<&FluentArgs>) -> String {
        let msg = match self.bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let mut errors = vec![];
        let value: Cow<str> = self.bundle.format_pattern(pattern, args, &mut errors);
        value.into_owned()
    }
}
