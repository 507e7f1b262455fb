//! Shell-quoting helper shared by all three language runners when
//! assembling the in-container command line (§4.3).

/// Single-quotes `raw` for safe interpolation into a `sh -c` command,
/// escaping embedded single quotes the POSIX-portable way.
pub fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_text() {
        assert_eq!(shell_quote("print('hi')"), r#"'print('\''hi'\'')'"#);
    }

    #[test]
    fn quotes_empty_string() {
        assert_eq!(shell_quote(""), "''");
    }
}
