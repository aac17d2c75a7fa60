// src/core/validation.rs

use tracing::debug;
use url::Host;

use crate::core::error::{ReconError, ReconResult};

/// Normalizes and checks a user-supplied domain before any probe runs.
///
/// The input is trimmed and lower-cased. Anything carrying a scheme, a path
/// separator or inner whitespace is rejected, as is anything `url` does not
/// accept as a host.
pub fn validate_domain(input: &str) -> ReconResult<String> {
    let domain = input.trim().to_lowercase();

    if domain.is_empty() {
        return Err(ReconError::InvalidDomain("empty input".to_string()));
    }
    if domain.contains("://") {
        return Err(ReconError::InvalidDomain(format!("'{domain}' contains a scheme prefix")));
    }
    if domain.contains(['/', '\\']) {
        return Err(ReconError::InvalidDomain(format!("'{domain}' contains a path separator")));
    }
    if domain.chars().any(char::is_whitespace) {
        return Err(ReconError::InvalidDomain(format!("'{domain}' contains whitespace")));
    }

    match Host::parse(&domain) {
        Ok(_) => {
            debug!(domain = %domain, "Domain accepted.");
            Ok(domain)
        }
        Err(e) => Err(ReconError::InvalidDomain(format!("'{domain}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_domain() {
        assert_eq!(validate_domain("  Example.COM ").unwrap(), "example.com");
    }

    #[test]
    fn test_rejects_scheme() {
        assert!(matches!(
            validate_domain("http://example.com"),
            Err(ReconError::InvalidDomain(_))
        ));
        assert!(validate_domain("https://example.com").is_err());
    }

    #[test]
    fn test_rejects_path_separator() {
        assert!(validate_domain("example.com/admin").is_err());
        assert!(validate_domain("example.com\\admin").is_err());
    }

    #[test]
    fn test_rejects_whitespace() {
        assert!(validate_domain("exa mple.com").is_err());
        assert!(validate_domain("example.com\tevil").is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(validate_domain("   ").is_err());
    }

    #[test]
    fn test_validation_error_is_client_error() {
        let err = validate_domain("http://x").unwrap_err();
        assert!(err.is_client_error());
    }
}
