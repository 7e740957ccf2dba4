//! Job id derivation from posting URLs.
//!
//! The patterns are tried in order; the first capture wins. No match
//! yields the empty-string sentinel, never an absent value — downstream
//! dedup and lookup rely on that.

use std::sync::OnceLock;

use regex::Regex;

static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn patterns() -> &'static [Regex] {
    PATTERNS.get_or_init(|| {
        [
            r"currentJobId=(\d+)",
            r"/jobs/view/(\d+)",
            r"/jobs/collections/.*/(\d+)",
            r"/details/(\d+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("job id pattern is valid"))
        .collect()
    })
}

pub fn derive_job_id(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    for re in patterns() {
        if let Some(captures) = re.captures(url) {
            if let Some(m) = captures.get(1) {
                return m.as_str().to_string();
            }
        }
    }
    String::new()
}
