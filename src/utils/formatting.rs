pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

/// Fixed-width progress bar for `query --jobs`.
pub fn progress_bar(pct: u8, width: usize) -> String {
    let filled = (pct.min(100) as usize * width) / 100;
    format!("[{}{}] {:>3}%", "#".repeat(filled), "-".repeat(width - filled), pct.min(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(1500), "1.5s");
        assert_eq!(format_duration(125_000), "2m 5s");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(50, 10), "[#####-----]  50%");
        assert_eq!(progress_bar(150, 4), "[####] 100%");
    }
}
