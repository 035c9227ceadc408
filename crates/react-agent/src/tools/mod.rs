//! A set of built-in tools that models can use.

mod calculator;
mod word_length;

pub use calculator::CalculatorTool;
pub use word_length::WordLengthTool;

/// Strips whitespace and one pair of matching quotes that models like to
/// wrap tool input in.
fn unquote(input: &str) -> &str {
    let input = input.trim();
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = input
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("  hello "), "hello");
        assert_eq!(unquote("\"hello\""), "hello");
        assert_eq!(unquote("'hello'"), "hello");
        assert_eq!(unquote("`2 + 2`"), "2 + 2");
        assert_eq!(unquote("\"hello'"), "\"hello'");
        assert_eq!(unquote("\""), "\"");
    }
}
