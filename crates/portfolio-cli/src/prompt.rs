//! Line-oriented terminal input.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// Maximum accepted length for typed fields
const MAX_FIELD_LEN: usize = 128;

/// Ask for one line of input. An empty answer yields `default` when given.
pub fn line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) if !default.is_empty() => print!("{} [{}]: ", label, default),
        _ => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    if read == 0 {
        anyhow::bail!("Input closed");
    }

    let input = sanitize(&input);
    if input.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(input)
    }
}

pub fn password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("{}: ", label))
        .context("Failed to read password")?;
    Ok(password.chars().take(MAX_FIELD_LEN).collect())
}

/// Trim and drop control characters, capped at `MAX_FIELD_LEN`
fn sanitize(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FIELD_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  a@b.com\n"), "a@b.com");
        assert_eq!(sanitize("a\tb\x00c"), "abc");
        assert_eq!(sanitize(&"x".repeat(200)).len(), MAX_FIELD_LEN);
    }
}
