/// Format upload progress as a percentage string for log output.
pub fn format_progress(bytes_transferred: u64, bytes_total: u64) -> String {
    if bytes_total == 0 {
        return "100.0%".to_string();
    }
    format!(
        "{:.1}%",
        bytes_transferred as f64 * 100.0 / bytes_total as f64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_progress_partial() {
        assert_eq!(format_progress(0, 1000), "0.0%");
        assert_eq!(format_progress(250, 1000), "25.0%");
        assert_eq!(format_progress(1000, 1000), "100.0%");
    }

    #[test]
    fn format_progress_rounds() {
        assert_eq!(format_progress(1, 3), "33.3%");
    }

    #[test]
    fn format_progress_empty_file() {
        assert_eq!(format_progress(0, 0), "100.0%");
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
