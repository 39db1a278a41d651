//! Line-aligned prefixes that fit a token allowance.

use crate::tokens::TokenMeter;

/// A prefix of some text ending on a line boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePrefix<'a> {
    pub text: &'a str,
    /// Number of lines kept.
    pub lines: usize,
    /// Measured token cost of `text`.
    pub tokens: usize,
}

/// Byte offsets just past the end of each line. The last line may lack a
/// trailing newline.
pub fn line_ends(text: &str) -> Vec<usize> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|line| {
            offset += line.len();
            offset
        })
        .collect()
}

/// Largest prefix ending at one of `ends` whose measured cost is at most
/// `max_tokens`.
///
/// Binary search over the candidate boundaries; a prefix is only accepted
/// after it has been measured, so the result always fits even where the
/// tokenizer is not perfectly monotonic in prefix length.
pub fn fitting_prefix<'a>(
    text: &'a str,
    ends: &[usize],
    max_tokens: usize,
    meter: &TokenMeter,
) -> Option<LinePrefix<'a>> {
    let mut best = None;
    let (mut lo, mut hi) = (0usize, ends.len());
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        let prefix = &text[..ends[mid - 1]];
        let tokens = meter.measure(prefix);
        if tokens <= max_tokens {
            best = Some(LinePrefix {
                text: prefix,
                lines: mid,
                tokens,
            });
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    best
}

/// Number of lines in `text`, counting a final unterminated line.
pub fn count_lines(text: &str) -> usize {
    text.split_inclusive('\n').count()
}
