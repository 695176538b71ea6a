//! Frame line sources: stdin, a capture file, or a spawned subprocess.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::fs::File;
use tokio::io::{self, AsyncRead};
use tokio::process::{Child, Command};

/// Where hex frame lines come from.
#[derive(Debug, Clone)]
pub enum FrameSource {
    Stdin,
    File(PathBuf),
    Spawn(String),
}

impl FrameSource {
    /// Pick a source from CLI arguments. A subprocess wins over a file;
    /// stdin is the fallback.
    pub fn from_args(file: Option<PathBuf>, spawn: Option<String>) -> Self {
        match (spawn, file) {
            (Some(cmd), _) => FrameSource::Spawn(cmd),
            (None, Some(path)) => FrameSource::File(path),
            (None, None) => FrameSource::Stdin,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FrameSource::Stdin => "stdin".to_string(),
            FrameSource::File(path) => format!("file {}", path.display()),
            FrameSource::Spawn(cmd) => format!("subprocess `{cmd}`"),
        }
    }

    /// Open the source as a unified async reader.
    ///
    /// For subprocess sources the child handle is returned alongside the
    /// reader; dropping it kills the process.
    pub async fn open(&self) -> io::Result<(Box<dyn AsyncRead + Unpin + Send>, Option<Child>)> {
        match self {
            FrameSource::Stdin => Ok((Box::new(io::stdin()), None)),
            FrameSource::File(path) => {
                let file = File::open(path).await?;
                Ok((Box::new(file), None))
            }
            FrameSource::Spawn(cmd) => {
                let mut child = Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .kill_on_drop(true)
                    .spawn()?;
                let stdout = child.stdout.take().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Other, "subprocess stdout not captured")
                })?;
                Ok((Box::new(stdout), Some(child)))
            }
        }
    }
}

/// Split a raw input line into its hex payload and optional timestamp.
///
/// Accepts plain hex (`8D40621D...`), AVR-style framing (`*8D40621D...;`),
/// and replay lines with a trailing timestamp (`8D40621D...;1670000000.5`).
/// Returns None for blank lines and `#` comments.
pub fn clean_line(line: &str) -> Option<(&str, Option<f64>)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let line = line.strip_prefix('*').unwrap_or(line);

    match line.split_once(';') {
        Some((hex, rest)) => {
            let hex = hex.trim();
            if hex.is_empty() {
                return None;
            }
            Some((hex, rest.trim().parse::<f64>().ok()))
        }
        None => Some((line, None)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;

    #[test]
    fn test_clean_line_plain_hex() {
        assert_eq!(
            clean_line("8D40621D58C382D690C8AC2863A7"),
            Some(("8D40621D58C382D690C8AC2863A7", None))
        );
    }

    #[test]
    fn test_clean_line_avr_framing() {
        assert_eq!(
            clean_line("*8D40621D58C382D690C8AC2863A7;"),
            Some(("8D40621D58C382D690C8AC2863A7", None))
        );
    }

    #[test]
    fn test_clean_line_with_timestamp() {
        assert_eq!(
            clean_line("8D40621D58C382D690C8AC2863A7;1670000000.5"),
            Some(("8D40621D58C382D690C8AC2863A7", Some(1670000000.5)))
        );
    }

    #[test]
    fn test_clean_line_unparseable_suffix_ignored() {
        assert_eq!(
            clean_line("8D40621D58C382D690C8AC2863A7;rssi=-12"),
            Some(("8D40621D58C382D690C8AC2863A7", None))
        );
    }

    #[test]
    fn test_clean_line_skips_blank_and_comments() {
        assert_eq!(clean_line(""), None);
        assert_eq!(clean_line("   "), None);
        assert_eq!(clean_line("# capture from 2024-11-02"), None);
        assert_eq!(clean_line("*;"), None);
    }

    #[test]
    fn test_from_args_precedence() {
        let src = FrameSource::from_args(
            Some(PathBuf::from("capture.txt")),
            Some("rtl_adsb".to_string()),
        );
        assert!(matches!(src, FrameSource::Spawn(_)));

        let src = FrameSource::from_args(Some(PathBuf::from("capture.txt")), None);
        assert!(matches!(src, FrameSource::File(_)));

        let src = FrameSource::from_args(None, None);
        assert!(matches!(src, FrameSource::Stdin));
    }

    #[tokio::test]
    async fn test_open_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.txt");
        std::fs::write(&path, "8D40621D58C382D690C8AC2863A7\n*8D4840D6202CC371C32CE0576098;\n")
            .unwrap();

        let source = FrameSource::File(path);
        let (reader, child) = source.open().await.unwrap();
        assert!(child.is_none());

        let mut lines = tokio::io::BufReader::new(reader).lines();
        let mut count = 0;
        while let Some(line) = lines.next_line().await.unwrap() {
            assert!(clean_line(&line).is_some());
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
