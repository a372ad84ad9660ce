use std::collections::HashMap;
use std::env;

use crate::error::ResolverError;
use crate::traits::KeyResolver;

const ENV_PREFIX: &str = "env:";

/// Resolves feed credentials from environment variables
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvResolver;

impl EnvResolver {
    pub fn new() -> Self {
        Self
    }
}

impl KeyResolver for EnvResolver {
    /// Parses "env:VAR1,VAR2" and returns values from environment.
    /// Variables that are set but empty count as missing.
    fn resolve(&self, source: &str) -> Result<HashMap<String, String>, ResolverError> {
        let vars = source.strip_prefix(ENV_PREFIX).ok_or_else(|| {
            ResolverError::UnsupportedSource(format!(
                "expected '{}' prefix, got: {}",
                ENV_PREFIX, source
            ))
        })?;

        let names: Vec<&str> = vars
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return Err(ResolverError::UnsupportedSource(
                "empty env source".to_string(),
            ));
        }

        names
            .into_iter()
            .map(|name| match env::var(name) {
                Ok(value) if !value.is_empty() => Ok((name.to_string(), value)),
                _ => Err(ResolverError::MissingKey(name.to_string())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_vars() {
        env::set_var("TICKWIRE_TEST_KEY1", "value1");
        env::set_var("TICKWIRE_TEST_KEY2", "value2");

        let result = EnvResolver::new()
            .resolve("env:TICKWIRE_TEST_KEY1, TICKWIRE_TEST_KEY2")
            .unwrap();

        assert_eq!(result.get("TICKWIRE_TEST_KEY1"), Some(&"value1".to_string()));
        assert_eq!(result.get("TICKWIRE_TEST_KEY2"), Some(&"value2".to_string()));

        env::remove_var("TICKWIRE_TEST_KEY1");
        env::remove_var("TICKWIRE_TEST_KEY2");
    }

    #[test]
    fn test_resolve_single_token() {
        env::set_var("TICKWIRE_TEST_TOKEN", "abc123");
        let token = EnvResolver::new()
            .resolve_single("env:TICKWIRE_TEST_TOKEN")
            .unwrap();
        assert_eq!(token, "abc123");
        env::remove_var("TICKWIRE_TEST_TOKEN");
    }

    #[test]
    fn test_resolve_single_rejects_multiple_keys() {
        env::set_var("TICKWIRE_TEST_A", "a");
        env::set_var("TICKWIRE_TEST_B", "b");
        let result = EnvResolver::new().resolve_single("env:TICKWIRE_TEST_A,TICKWIRE_TEST_B");
        assert!(matches!(result, Err(ResolverError::UnsupportedSource(_))));
        env::remove_var("TICKWIRE_TEST_A");
        env::remove_var("TICKWIRE_TEST_B");
    }

    #[test]
    fn test_missing_var() {
        let result = EnvResolver::new().resolve("env:TICKWIRE_NONEXISTENT_VAR_12345");
        assert!(matches!(result, Err(ResolverError::MissingKey(name)) if name == "TICKWIRE_NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_empty_var_is_missing() {
        env::set_var("TICKWIRE_TEST_EMPTY", "");
        let result = EnvResolver::new().resolve("env:TICKWIRE_TEST_EMPTY");
        assert!(matches!(result, Err(ResolverError::MissingKey(_))));
        env::remove_var("TICKWIRE_TEST_EMPTY");
    }

    #[test]
    fn test_invalid_source() {
        let resolver = EnvResolver::new();
        assert!(resolver.resolve("vault:secret/path").is_err());
        assert!(resolver.resolve("env:").is_err());
    }
}
