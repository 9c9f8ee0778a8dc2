//! Barcode capability: options, results, and scanner implementations.
//!
//! Pixel-level decoding is the scanner device's job. `LineScanner` reads
//! decoded codes one per line, which is how keyboard-wedge hand scanners
//! and piped input both present themselves.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ScanError;

pub const DEFAULT_PROMPT: &str = "Place a barcode inside the viewfinder to scan";

/// Configuration handed to the scanner for each invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    pub prompt: String,
    pub beep_enabled: bool,
    pub orientation_locked: bool,
    /// Name of the surface the scanner captures from (e.g. "terminal").
    pub capture_surface: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            beep_enabled: true,
            orientation_locked: true,
            capture_surface: "terminal".to_string(),
        }
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// A decoded, non-empty code.
    Code(String),
    /// The user backed out, or the scanner produced nothing.
    Cancelled,
}

impl ScanResult {
    /// Normalize raw scanner output: surrounding whitespace is dropped and
    /// nothing left means no result.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(code) if !code.is_empty() => ScanResult::Code(code.to_string()),
            _ => ScanResult::Cancelled,
        }
    }
}

#[async_trait]
pub trait BarcodeScanner: Send {
    async fn scan(&mut self, options: &ScanOptions) -> Result<ScanResult, ScanError>;
}

/// Reads one code per line. An empty line, end of input, or a line that is
/// not UTF-8 is a cancellation.
pub struct LineScanner<R, W> {
    input: R,
    output: W,
}

impl<R, W> LineScanner<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

#[async_trait]
impl<R, W> BarcodeScanner for LineScanner<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn scan(&mut self, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        tracing::debug!(
            surface = %options.capture_surface,
            orientation_locked = options.orientation_locked,
            "starting scan"
        );

        self.output
            .write_all(format!("{}: ", options.prompt).as_bytes())
            .await?;
        self.output.flush().await?;

        let mut line = Vec::new();
        let read = self.input.read_until(b'\n', &mut line).await?;
        let result = match std::str::from_utf8(&line) {
            Ok(text) => ScanResult::from_raw((read > 0).then_some(text)),
            Err(e) => {
                tracing::warn!(error = %e, "scanner produced undecodable input");
                ScanResult::Cancelled
            }
        };

        if options.beep_enabled && matches!(result, ScanResult::Code(_)) {
            // BEL
            self.output.write_all(b"\x07").await?;
            self.output.flush().await?;
        }

        Ok(result)
    }
}

/// Replays a fixed sequence of raw scanner outputs, then reports cancellation.
#[derive(Debug, Default)]
pub struct ScriptedScanner {
    queue: VecDeque<Option<String>>,
    seen: Vec<ScanOptions>,
}

impl ScriptedScanner {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            queue: codes.into_iter().map(|c| c.map(Into::into)).collect(),
            seen: Vec::new(),
        }
    }

    /// Options passed to every `scan` call so far.
    pub fn seen_options(&self) -> &[ScanOptions] {
        &self.seen
    }
}

#[async_trait]
impl BarcodeScanner for ScriptedScanner {
    async fn scan(&mut self, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        self.seen.push(options.clone());
        let next = self.queue.pop_front().flatten();
        Ok(ScanResult::from_raw(next.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_output_is_trimmed() {
        assert_eq!(
            ScanResult::from_raw(Some(" 737628064502\n")),
            ScanResult::Code("737628064502".to_string())
        );
        assert_eq!(ScanResult::from_raw(Some("   ")), ScanResult::Cancelled);
        assert_eq!(ScanResult::from_raw(None), ScanResult::Cancelled);
    }

    #[tokio::test]
    async fn line_scanner_reads_code_and_beeps() {
        let input: &[u8] = b"3017620422003\n";
        let mut output = Vec::new();
        let result = {
            let mut scanner = LineScanner::new(input, &mut output);
            scanner.scan(&ScanOptions::default()).await.unwrap()
        };

        assert_eq!(result, ScanResult::Code("3017620422003".to_string()));
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with(DEFAULT_PROMPT));
        assert!(printed.ends_with('\x07'));
    }

    #[tokio::test]
    async fn line_scanner_respects_beep_setting() {
        let input: &[u8] = b"42\n";
        let mut output = Vec::new();
        let options = ScanOptions {
            beep_enabled: false,
            ..ScanOptions::default()
        };
        {
            let mut scanner = LineScanner::new(input, &mut output);
            scanner.scan(&options).await.unwrap();
        }
        assert!(!output.contains(&0x07));
    }

    #[tokio::test]
    async fn end_of_input_is_cancellation() {
        let input: &[u8] = b"";
        let mut output = Vec::new();
        let mut scanner = LineScanner::new(input, &mut output);
        let result = scanner.scan(&ScanOptions::default()).await.unwrap();
        assert_eq!(result, ScanResult::Cancelled);
    }

    #[tokio::test]
    async fn undecodable_line_is_cancellation() {
        let input: &[u8] = b"\xff\xfe30\n0001\n";
        let mut output = Vec::new();
        let mut scanner = LineScanner::new(input, &mut output);
        let options = ScanOptions::default();

        assert_eq!(scanner.scan(&options).await.unwrap(), ScanResult::Cancelled);
        // The bad line is consumed and the next one still reads.
        assert_eq!(
            scanner.scan(&options).await.unwrap(),
            ScanResult::Code("0001".to_string())
        );
    }

    #[tokio::test]
    async fn scripted_scanner_runs_out_into_cancellation() {
        let mut scanner = ScriptedScanner::new([Some("0001"), None]);
        let options = ScanOptions::default();
        assert_eq!(
            scanner.scan(&options).await.unwrap(),
            ScanResult::Code("0001".to_string())
        );
        assert_eq!(scanner.scan(&options).await.unwrap(), ScanResult::Cancelled);
        assert_eq!(scanner.scan(&options).await.unwrap(), ScanResult::Cancelled);
        assert_eq!(scanner.seen_options().len(), 3);
    }
}
