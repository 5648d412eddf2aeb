// Helper functions for safe logging

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            let first: String = parts[0].chars().take(1).collect();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows the first 8 characters and the total length
///
/// # Example
/// ```
/// let masked = safe_token_log("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
/// // Returns: "eyJhbGci... (len=36)"
/// ```
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_char_boundary(8) {
        format!("{}... (len={})", &token[..8], token.len())
    } else {
        format!("*** (len={})", token.len())
    }
}

/// Truncates a message to at most `max` characters
pub fn truncate_chars(message: &str, max: usize) -> String {
    message.chars().take(max).collect()
}
