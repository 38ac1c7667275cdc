//! Loads one [`Signal`] from a text file (§6 "Signal file format"): one
//! sample per non-empty, non-comment line, parsed as `f64`; missing samples
//! zero-padded to `N`, excess samples ignored.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crqa_protocol::{Signal, SIGNAL_LEN};

#[derive(Debug, Error)]
pub enum SignalFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reads `path` line by line: blank lines and lines starting with `#` are
/// ignored, every other line is parsed as a decimal `f64`. A line that
/// fails to parse is skipped rather than treated as an error, matching the
/// reference loader's `strtod` (which accepts a partial parse and just
/// advances past whatever prefix converted). At most `N` values are kept;
/// anything short of `N` is zero-padded.
pub fn load(path: &Path) -> Result<Signal, SignalFileError> {
    let text = fs::read_to_string(path).map_err(|source| SignalFileError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let mut signal = [0.0; SIGNAL_LEN];
    let mut count = 0;
    for line in text.lines() {
        if count == SIGNAL_LEN {
            break;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Ok(value) = line.parse::<f64>() {
            signal[count] = value;
            count += 1;
        }
    }

    tracing::info!(path = %path.display(), samples = count, "loaded signal");
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# header").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "1.5").unwrap();
        writeln!(file, "# trailing comment").unwrap();
        writeln!(file, "2.5").unwrap();

        let signal = load(file.path()).unwrap();
        assert_eq!(signal[0], 1.5);
        assert_eq!(signal[1], 2.5);
        assert_eq!(signal[2], 0.0);
    }

    #[test]
    fn short_file_is_zero_padded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "3.0").unwrap();
        let signal = load(file.path()).unwrap();
        assert_eq!(signal[0], 3.0);
        assert_eq!(signal[1..], [0.0; SIGNAL_LEN - 1]);
    }

    #[test]
    fn excess_samples_are_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..SIGNAL_LEN + 10 {
            writeln!(file, "{}", i as f64).unwrap();
        }
        let signal = load(file.path()).unwrap();
        assert_eq!(signal[SIGNAL_LEN - 1], (SIGNAL_LEN - 1) as f64);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = load(Path::new("/nonexistent/path/to/signal.txt"));
        assert!(result.is_err());
    }
}
