//! Command-line tokenization.
//!
//! Splits a raw line into an argument vector. Single-quoted spans are one
//! token; a trailing `&` marks background execution and is stripped from the
//! vector. Empty input yields an empty vector and foreground designation.

/// A tokenized command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Argument vector; empty for a blank line.
    pub argv: Vec<String>,
    /// True when the line requested background execution.
    pub background: bool,
}

/// Tokenize one command line.
pub fn parse_line(line: &str) -> ParsedLine {
    let mut argv = Vec::new();
    let mut rest = line.trim();
    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('\'') {
            match quoted.find('\'') {
                Some(end) => {
                    argv.push(quoted[..end].to_string());
                    rest = quoted[end + 1..].trim_start();
                }
                None => {
                    // Unterminated quote: take the remainder as one token.
                    argv.push(quoted.to_string());
                    rest = "";
                }
            }
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            argv.push(rest[..end].to_string());
            rest = rest[end..].trim_start();
        }
    }

    let background = match argv.last() {
        Some(last) if last.starts_with('&') => {
            argv.pop();
            true
        }
        _ => false,
    };

    ParsedLine { argv, background }
}
