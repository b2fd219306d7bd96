pub fn summary_marker_key(summary: &str) -> String {
    format!("summary:{}:last_date", summary)
}
