// LitmusLog - core/rewrite.rs
//
// Test-name rewrite applied to distilled logs before normalisation.
//
// Record lines name the test right after the record kind:
//
//   GPU_PTX SB-membar.ctas ...   ->  GPU_PTX SB_membar.ctas ...
//   RACE_OPENCL MP-p0-p1 ...     ->  RACE_OPENCL MP_p0_p1 ...
//
// Only the identifier following the kind is touched. Kinds configured for
// header naming instead take their name from the most recent results
// header:
//
//   % Results for /tests/MP-p0.litmus   (kept as is)
//   RACE_OPENCL whatever ...          ->  RACE_OPENCL tests/MP_p0
//
// Every other line is passed through byte-for-byte. Logs are handled as
// bytes, so non-UTF-8 content survives unchanged.

use regex::bytes::Regex;
use std::borrow::Cow;
use std::path::Path;

/// Record kinds whose test identifier is rewritten by default.
pub const DEFAULT_RECORD_KINDS: &[&str] = &["GPU_PTX", "RACE_OPENCL"];

/// Prefix of the header line that names the test of the records below it.
const RESULTS_HEADER: &[u8] = b"% Results";

const LITMUS_SUFFIX: &[u8] = b".litmus";

/// Compiled record matcher for a set of record kinds.
#[derive(Debug, Clone)]
pub struct Rewriter {
    kinds: Vec<String>,
    header_kinds: Vec<Vec<u8>>,
    record: Regex,
    litmus_path: Regex,
}

impl Rewriter {
    /// Build a rewriter for the given record kinds. Kinds are matched
    /// literally at the start of a line.
    pub fn new<S: AsRef<str>>(kinds: &[S]) -> Result<Self, regex::Error> {
        let kinds: Vec<String> = kinds.iter().map(|k| k.as_ref().to_string()).collect();
        Ok(Self {
            record: record_regex(&kinds)?,
            litmus_path: Regex::new(r"(?-u)/[^ \t%]+\.litmus")?,
            kinds,
            header_kinds: Vec::new(),
        })
    }

    /// Name records of `kinds` from the preceding `% Results for
    /// /<path>.litmus` header instead of their own identifier.
    pub fn rename_from_header<S: AsRef<str>>(mut self, kinds: &[S]) -> Result<Self, regex::Error> {
        for kind in kinds {
            let kind = kind.as_ref();
            if !self.kinds.iter().any(|k| k == kind) {
                self.kinds.push(kind.to_string());
            }
            self.header_kinds.push(kind.as_bytes().to_vec());
        }
        self.record = record_regex(&self.kinds)?;
        Ok(self)
    }

    /// Rewrite the identifier of a single record line (without its `\n`).
    pub fn rewrite_line<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]> {
        let Some(caps) = self.record.captures(line) else {
            return Cow::Borrowed(line);
        };
        let name = &caps["name"];
        if !name.contains(&b'-') {
            return Cow::Borrowed(line);
        }
        let end = caps.get(0).map_or(0, |m| m.end());
        let mut out = Vec::with_capacity(line.len());
        out.extend_from_slice(&caps["kind"]);
        out.extend_from_slice(&caps["ws"]);
        out.extend(name.iter().map(|&b| if b == b'-' { b'_' } else { b }));
        out.extend_from_slice(&line[end..]);
        Cow::Owned(out)
    }

    /// Rewrite a whole log. Returns the new text and the number of lines
    /// that changed.
    pub fn rewrite_log(&self, text: &[u8]) -> (Vec<u8>, usize) {
        let mut out = Vec::with_capacity(text.len());
        let mut changed = 0;
        let mut current: Option<Vec<u8>> = None;

        for chunk in text.split_inclusive(|&b| b == b'\n') {
            let (body, term): (&[u8], &[u8]) = match chunk.strip_suffix(b"\n") {
                Some(b) => (b, b"\n"),
                None => (chunk, b""),
            };

            if let Some(name) = self.results_name(body) {
                current = Some(name);
                out.extend_from_slice(chunk);
                continue;
            }

            let line = match (self.header_kind(body), &current) {
                (Some(kind), Some(name)) => {
                    let mut renamed = kind.to_vec();
                    renamed.push(b' ');
                    renamed.extend_from_slice(name);
                    Cow::Owned(renamed)
                }
                (Some(_), None) => {
                    tracing::debug!("Record before any results header; left unchanged");
                    Cow::Borrowed(body)
                }
                (None, _) => self.rewrite_line(body),
            };
            if *line != *body {
                changed += 1;
            }
            out.extend_from_slice(&line);
            out.extend_from_slice(term);
        }
        (out, changed)
    }

    /// Rewrite `input` into `output`, returning the number of changed lines.
    pub fn rewrite_file(&self, input: &Path, output: &Path) -> std::io::Result<usize> {
        let bytes = std::fs::read(input)?;
        let (rewritten, changed) = self.rewrite_log(&bytes);
        std::fs::write(output, rewritten)?;
        tracing::debug!(
            input = %input.display(),
            output = %output.display(),
            changed,
            "Rewrote test names"
        );
        Ok(changed)
    }

    /// Test name carried by a results header: the `.litmus` path without
    /// its leading `/` and suffix, hyphens replaced.
    fn results_name(&self, line: &[u8]) -> Option<Vec<u8>> {
        if self.header_kinds.is_empty() || !line.starts_with(RESULTS_HEADER) {
            return None;
        }
        let path = self.litmus_path.find(line)?.as_bytes();
        let path = path.strip_prefix(b"/").unwrap_or(path);
        let path = path.strip_suffix(LITMUS_SUFFIX).unwrap_or(path);
        Some(path.iter().map(|&b| if b == b'-' { b'_' } else { b }).collect())
    }

    /// The record kind of `line` if it is one renamed from the header.
    fn header_kind<'a>(&self, line: &'a [u8]) -> Option<&'a [u8]> {
        let caps = self.record.captures(line)?;
        let kind = caps.name("kind")?.as_bytes();
        self.header_kinds
            .iter()
            .any(|k| k.as_slice() == kind)
            .then_some(kind)
    }
}

fn record_regex(kinds: &[String]) -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = kinds.iter().map(|k| regex::escape(k)).collect();
    Regex::new(&format!(
        r"(?-u)^(?P<kind>{})(?P<ws>[ \t]+)(?P<name>[^\s]+)",
        alternatives.join("|")
    ))
}
