use crate::utils::error::{ChaosError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ChaosError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ChaosError::InvalidConfigValue {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ChaosError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ChaosError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ChaosError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(ChaosError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ChaosError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ChaosError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Extensions are bare (`txt`, not `.txt`) and must not contain separators.
pub fn validate_extensions(field_name: &str, extensions: &[String]) -> Result<()> {
    if extensions.is_empty() {
        return Err(ChaosError::InvalidConfigValue {
            field: field_name.to_string(),
            value: String::new(),
            reason: "At least one extension is required".to_string(),
        });
    }

    for ext in extensions {
        validate_non_empty_string(field_name, ext)?;
        if ext.starts_with('.') || ext.contains('/') || ext.contains('\\') {
            return Err(ChaosError::InvalidConfigValue {
                field: field_name.to_string(),
                value: ext.clone(),
                reason: "Extension must be bare, e.g. 'txt'".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("index.url", "https://example.com/index.json").is_ok());
        assert!(validate_url("index.url", "http://example.com").is_ok());
        assert!(validate_url("index.url", "").is_err());
        assert!(validate_url("index.url", "invalid-url").is_err());
        assert!(validate_url("index.url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("search.max_line_bytes", 5, 1).is_ok());
        assert!(validate_positive_number("search.max_line_bytes", 0, 1).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("workers", 1usize, 1, 4096).is_ok());
        assert!(validate_range("workers", 0usize, 1, 4096).is_err());
        assert!(validate_range("workers", 5000usize, 1, 4096).is_err());
    }

    #[test]
    fn test_validate_extensions() {
        let ok = vec!["txt".to_string(), "lst".to_string()];
        assert!(validate_extensions("corpus.text_extensions", &ok).is_ok());

        assert!(validate_extensions("corpus.text_extensions", &[]).is_err());
        let dotted = vec![".txt".to_string()];
        assert!(validate_extensions("corpus.text_extensions", &dotted).is_err());
    }
}
