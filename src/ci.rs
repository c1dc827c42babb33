//! GitHub Actions workflow command emission.
//!
//! Failures are surfaced to the hosting CI through `::error::` annotations
//! on stdout; the process exit code carries the pass/fail result itself.

/// Emit an error annotation for the current workflow run.
pub fn error(message: &str) {
    println!("::error::{}", escape_data(message));
}

/// Escape annotation payload data per the workflow command format.
fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
