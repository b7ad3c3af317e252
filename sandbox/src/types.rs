/// Outcome of a command that the backend managed to run.
///
/// A non-zero `exit_code` is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    /// Build a result from raw stream bytes. Missing streams become empty
    /// strings and invalid UTF-8 is replaced rather than rejected.
    pub fn from_streams(exit_code: i32, stdout: Option<&[u8]>, stderr: Option<&[u8]>) -> Self {
        Self {
            exit_code,
            stdout: decode(stdout),
            stderr: decode(stderr),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

fn decode(bytes: Option<&[u8]>) -> String {
    bytes
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_streams_decode_to_empty() {
        let result = ExecResult::from_streams(0, None, None);
        assert_eq!(result.stdout, "");
        assert_eq!(result.stderr, "");
        assert!(result.success());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let result = ExecResult::from_streams(3, Some(b"ok \xff"), Some(b"err"));
        assert_eq!(result.stdout, "ok \u{fffd}");
        assert_eq!(result.stderr, "err");
        assert!(!result.success());
    }
}
