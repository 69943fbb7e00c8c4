use super::ApiError;

pub fn validate_app_name(name: &str) -> Result<String, ApiError> {
    let name = name.to_lowercase();

    if !(3..=50).contains(&name.len()) {
        return Err(ApiError::validation(
            "App name must be between 3 and 50 characters",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "App name must be alphanumeric with hyphens or underscores",
        ));
    }

    Ok(name)
}

pub fn validate_function_name(name: &str) -> Result<&str, ApiError> {
    if !(3..=50).contains(&name.len()) {
        return Err(ApiError::validation(
            "Function name must be between 3 and 50 characters",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "Function name must be alphanumeric with hyphens or underscores",
        ));
    }

    Ok(name)
}

pub fn validate_timeout(timeout: i32) -> Result<i32, ApiError> {
    if !(1..=300).contains(&timeout) {
        return Err(ApiError::validation(format!(
            "Invalid timeout: {timeout}. Timeout must be between 1 and 300 seconds"
        )));
    }
    Ok(timeout)
}

pub fn validate_limit(limit: u64) -> Result<u64, ApiError> {
    const MAX_LIMIT: u64 = 1000;

    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::validation(format!(
            "Invalid limit: {limit}. Limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_app_name() {
        assert_eq!(validate_app_name("My-App").unwrap(), "my-app");
        assert!(validate_app_name("blog_2").is_ok());
        assert!(validate_app_name("ab").is_err());
        assert!(validate_app_name("has space").is_err());
        assert!(validate_app_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_timeout() {
        assert!(validate_timeout(1).is_ok());
        assert!(validate_timeout(300).is_ok());
        assert!(validate_timeout(0).is_err());
        assert!(validate_timeout(301).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(1000).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(1001).is_err());
    }
}
