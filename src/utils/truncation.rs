const MAX_BANNER_LENGTH: usize = 200;
const MAX_ERROR_LENGTH: usize = 2_000;

/// First non-empty line of raw bytes, lossily decoded and capped.
pub fn banner_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(truncate_chars(line, MAX_BANNER_LENGTH))
}

/// Error text stored on failed scans.
pub fn truncate_error(error: &str) -> String {
    if error.len() <= MAX_ERROR_LENGTH {
        error.to_string()
    } else {
        format!("{}...", truncate_chars(error, MAX_ERROR_LENGTH))
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
