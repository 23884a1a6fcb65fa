//! Classification of provider output lines.

/// Banner fragment some providers print on standard error during a normal
/// start.
const READY_BANNER: &str = "running on stdio";

/// Stream a provider line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Severity a provider line is logged at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSeverity {
    /// Ordinary output.
    Info,
    /// Output signalling a failure.
    Error,
}

/// Classifies one line of provider output.
///
/// Standard output is always informational. Standard error is treated as an
/// error unless it carries the ready banner.
#[must_use]
pub fn classify_output_line(stream: OutputStream, line: &str) -> LineSeverity {
    match stream {
        OutputStream::Stdout => LineSeverity::Info,
        OutputStream::Stderr if is_ready_banner(line) => LineSeverity::Info,
        OutputStream::Stderr => LineSeverity::Error,
    }
}

fn is_ready_banner(line: &str) -> bool {
    line.to_ascii_lowercase().contains(READY_BANNER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OutputStream::Stdout, "anything at all", LineSeverity::Info)]
    #[case(
        OutputStream::Stderr,
        "Knowledge Graph MCP Server running on stdio",
        LineSeverity::Info
    )]
    #[case(OutputStream::Stderr, "Secure MCP Server RUNNING ON STDIO", LineSeverity::Info)]
    #[case(OutputStream::Stderr, "Error: ENOENT", LineSeverity::Error)]
    #[case(OutputStream::Stderr, "", LineSeverity::Error)]
    fn output_classification(
        #[case] stream: OutputStream,
        #[case] line: &str,
        #[case] expected: LineSeverity,
    ) {
        assert_eq!(classify_output_line(stream, line), expected);
    }
}
