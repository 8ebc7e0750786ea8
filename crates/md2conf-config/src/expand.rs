//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// An unset variable without a default is an error naming `field`. Bare `$VAR`
/// is left alone.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        std::env::var(var).map(Some).map_err(|_| LookupError {
            var_name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_var() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("MD2CONF_TEST_WIKI_HOST", "wiki.example.com");
        }
        let result = expand_env("https://${MD2CONF_TEST_WIKI_HOST}/", "confluence.base_url").unwrap();
        assert_eq!(result, "https://wiki.example.com/");
        unsafe {
            std::env::remove_var("MD2CONF_TEST_WIKI_HOST");
        }
    }

    #[test]
    fn test_default_used_when_unset() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("MD2CONF_TEST_UNSET_DIR");
        }
        let result = expand_env("${MD2CONF_TEST_UNSET_DIR:-.md2conf}/cache.json", "cache.path").unwrap();
        assert_eq!(result, ".md2conf/cache.json");
    }

    #[test]
    fn test_missing_var_names_field() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("MD2CONF_TEST_MISSING");
        }
        let err = expand_env("${MD2CONF_TEST_MISSING}", "confluence.base_url").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        let message = err.to_string();
        assert!(message.contains("MD2CONF_TEST_MISSING"));
        assert!(message.contains("confluence.base_url"));
    }

    #[test]
    fn test_literals_unchanged() {
        assert_eq!(expand_env("plain", "f").unwrap(), "plain");
        assert_eq!(expand_env("$HOME/x", "f").unwrap(), "$HOME/x");
    }
}
