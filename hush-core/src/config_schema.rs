use crate::config::HushConfig;
use crate::error::HushError;

/// One dynamically settable configuration field: a dotted `path`, a
/// `validator` run before mutation, and a `setter` that applies the already-
/// validated value.
///
/// Replaces runtime reflection over config fields (§9 REDESIGN FLAG
/// "Dynamic reflection of config fields"): instead of walking the config
/// struct by field name at runtime, every settable path is registered once,
/// here, at startup.
struct ConfigField {
    path: &'static str,
    validator: Box<dyn Fn(&str) -> bool + Send + Sync>,
    setter: Box<dyn Fn(&mut HushConfig, &str) + Send + Sync>,
}

/// The registry of fields `ADMIN set <path> <value>`-style operations may
/// touch. Unknown paths and invalid values are rejected before any mutation.
pub struct ConfigSchema {
    fields: Vec<ConfigField>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self {
            fields: vec![
                ConfigField {
                    path: "motd",
                    validator: Box::new(|v| v.len() <= 1023),
                    setter: Box::new(|config, v| config.motd = v.to_owned()),
                },
                ConfigField {
                    path: "max_connections",
                    validator: Box::new(|v| v.parse::<usize>().is_ok_and(|n| n > 0)),
                    setter: Box::new(|config, v| {
                        if let Ok(n) = v.parse() {
                            config.max_connections = n;
                        }
                    }),
                },
                ConfigField {
                    path: "login_timeout_secs",
                    validator: Box::new(|v| v.parse::<u64>().is_ok_and(|n| n > 0)),
                    setter: Box::new(|config, v| {
                        if let Ok(n) = v.parse() {
                            config.login_timeout_secs = n;
                        }
                    }),
                },
                ConfigField {
                    path: "idle_timeout_secs",
                    validator: Box::new(|v| v.parse::<u64>().is_ok_and(|n| n > 0)),
                    setter: Box::new(|config, v| {
                        if let Ok(n) = v.parse() {
                            config.idle_timeout_secs = n;
                        }
                    }),
                },
            ],
        }
    }

    pub fn set(&self, config: &mut HushConfig, path: &str, value: &str) -> Result<(), HushError> {
        let field = self
            .fields
            .iter()
            .find(|f| f.path == path)
            .ok_or_else(|| HushError::UnknownConfigPath(path.to_owned()))?;
        if !(field.validator)(value) {
            return Err(HushError::Other(anyhow::anyhow!(
                "invalid value {value:?} for config path {path:?}"
            )));
        }
        (field.setter)(config, value);
        Ok(())
    }
}

impl Default for ConfigSchema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_paths() {
        let schema = ConfigSchema::new();
        let mut config = HushConfig::default();
        assert!(schema.set(&mut config, "not_a_field", "1").is_err());
    }

    #[test]
    fn rejects_invalid_values_without_mutating() {
        let schema = ConfigSchema::new();
        let mut config = HushConfig::default();
        let before = config.max_connections;
        assert!(schema.set(&mut config, "max_connections", "not-a-number").is_err());
        assert_eq!(config.max_connections, before);
    }

    #[test]
    fn applies_a_valid_value() {
        let schema = ConfigSchema::new();
        let mut config = HushConfig::default();
        schema.set(&mut config, "motd", "new message").unwrap();
        assert_eq!(config.motd, "new message");
    }
}
