use crate::error::OtsError;
use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// Alphabet for tracker rendering: base-57, visually unambiguous
/// (no `0`, `1`, `I`, `O`, `l`).
const ALPHABET: &[u8; 57] = b"23456789abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";

const FRAGMENT_BITS: u64 = (1u64 << 48) - 1;

/// Client-generated identifier for one user-visible operation.
///
/// The trace id travels in `x-ots-traceid`, is shared by every retry of the
/// call, and tags all related log records. Servers echo it back so support
/// staff can correlate both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracker {
    trace_id: String,
    trace_hash: u64,
}

impl Tracker {
    /// Wraps an externally supplied trace id.
    pub fn new(trace_id: impl Into<String>) -> Self {
        let trace_id = trace_id.into();
        let trace_hash = hash_str(&trace_id);
        Self { trace_id, trace_hash }
    }

    /// Generates a fresh tracker: 48 bits of host identity xor 48 random
    /// bits, rendered base-57.
    pub fn generate() -> Self {
        let fragment: u64 = rand::thread_rng().gen::<u64>() & FRAGMENT_BITS;
        let value = host_hash() ^ fragment;
        Self::new(render_base57(value))
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn trace_hash(&self) -> u64 {
        self.trace_hash
    }

    pub fn validate(&self) -> Result<(), OtsError> {
        if self.trace_id.is_empty() {
            return Err(OtsError::parameter_invalid("Trace id must be nonempty."));
        }
        if !self.trace_id.bytes().all(|b| (0x21..=0x7e).contains(&b)) {
            return Err(OtsError::parameter_invalid(
                "Trace id must be printable ASCII without whitespaces.",
            ));
        }
        Ok(())
    }
}

/// 48-bit digest of the host name, computed once per process.
fn host_hash() -> u64 {
    static HOST_HASH: OnceLock<u64> = OnceLock::new();
    *HOST_HASH.get_or_init(|| hash_str(host_name().trim()) & FRAGMENT_BITS)
}

fn host_name() -> String {
    for path in ["/proc/sys/kernel/hostname", "/etc/hostname"] {
        if let Ok(name) = std::fs::read_to_string(path) {
            if !name.trim().is_empty() {
                return name;
            }
        }
    }
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| String::from("localhost"))
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

fn render_base57(mut value: u64) -> String {
    let mut out = Vec::new();
    loop {
        out.push(ALPHABET[(value % 57) as usize]);
        value /= 57;
        if value == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8(out).expect("alphabet is ascii")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base57_uses_alphabet_only() {
        let tracker = Tracker::generate();
        assert!(tracker
            .trace_id()
            .bytes()
            .all(|b| ALPHABET.contains(&b)));
        tracker.validate().unwrap();
    }

    #[test]
    fn trackers_differ() {
        let a = Tracker::generate();
        let b = Tracker::generate();
        assert_ne!(a.trace_id(), b.trace_id());
    }

    #[test]
    fn hash_is_stable_per_id() {
        let a = Tracker::new("abc");
        let b = Tracker::new("abc");
        assert_eq!(a.trace_hash(), b.trace_hash());
    }
}
