use std::collections::BTreeSet;
use std::time::Duration;

/// Limits applied to a single tool execution.
///
/// A capability symbol (a module name, `network`, `filesystem.read`, ...) is
/// permitted only if it is in the allow set and not in the deny set. Dotted
/// symbols are judged by their first segment, so `matplotlib.pyplot` follows
/// `matplotlib`.
///
/// Configured once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPolicy {
    timeout: Duration,
    max_memory_mb: u64,
    allowed: BTreeSet<String>,
    denied: BTreeSet<String>,
}

impl SandboxPolicy {
    pub fn new(timeout: Duration, max_memory_mb: u64) -> Self {
        Self {
            timeout,
            max_memory_mb,
            allowed: BTreeSet::new(),
            denied: BTreeSet::new(),
        }
    }

    pub fn with_allowed<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed.extend(symbols.into_iter().map(Into::into));
        self
    }

    pub fn with_denied<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied.extend(symbols.into_iter().map(Into::into));
        self
    }

    /// Copy of this policy whose timeout is at most `cap`.
    pub fn with_timeout_cap(&self, cap: Duration) -> Self {
        let mut policy = self.clone();
        policy.timeout = policy.timeout.min(cap);
        policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_memory_mb(&self) -> u64 {
        self.max_memory_mb
    }

    pub fn max_memory_bytes(&self) -> u64 {
        self.max_memory_mb.saturating_mul(1024 * 1024)
    }

    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    pub fn denied(&self) -> &BTreeSet<String> {
        &self.denied
    }

    pub fn permits(&self, symbol: &str) -> bool {
        let root = symbol.split('.').next().unwrap_or(symbol);
        let denied = self.denied.contains(symbol) || self.denied.contains(root);
        let allowed = self.allowed.contains(symbol) || self.allowed.contains(root);
        allowed && !denied
    }

    /// First symbol in `symbols` the policy does not permit.
    pub fn first_violation<'a, I>(&self, symbols: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        symbols.into_iter().find(|s| !self.permits(s))
    }

    /// Symbols present in both sets. Deny wins for these, but the overlap
    /// usually indicates a configuration mistake.
    pub fn overlapping(&self) -> Vec<&str> {
        self.allowed
            .intersection(&self.denied)
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SandboxPolicy {
        SandboxPolicy::new(Duration::from_secs(30), 512)
            .with_allowed(["math", "json", "matplotlib"])
            .with_denied(["os", "subprocess"])
    }

    #[test]
    fn test_permits_allowed_only() {
        let p = policy();
        assert!(p.permits("math"));
        assert!(p.permits("matplotlib.pyplot"));
        assert!(!p.permits("os"));
        assert!(!p.permits("os.path"));
        assert!(!p.permits("tqdm"));
    }

    #[test]
    fn test_first_violation() {
        let p = policy();
        assert_eq!(p.first_violation(["math", "json"]), None);
        assert_eq!(p.first_violation(["math", "subprocess", "os"]), Some("subprocess"));
    }

    #[test]
    fn test_deny_wins_exhaustive() {
        let universe = ["a", "b", "c"];
        for allow_mask in 0u8..8 {
            for deny_mask in 0u8..8 {
                let pick = |mask: u8| {
                    universe
                        .iter()
                        .enumerate()
                        .filter(move |(i, _)| mask & (1 << i) != 0)
                        .map(|(_, s)| *s)
                        .collect::<Vec<_>>()
                };
                let allowed = pick(allow_mask);
                let denied = pick(deny_mask);
                let p = SandboxPolicy::new(Duration::from_secs(1), 1)
                    .with_allowed(allowed.clone())
                    .with_denied(denied.clone());

                for sym in universe {
                    let expected = allowed.contains(&sym) && !denied.contains(&sym);
                    assert_eq!(
                        p.permits(sym),
                        expected,
                        "allow={:?} deny={:?} sym={}",
                        allowed,
                        denied,
                        sym
                    );
                    if denied.contains(&sym) {
                        assert!(!p.permits(sym));
                    }
                }
            }
        }
    }

    #[test]
    fn test_overlapping() {
        let p = policy().with_allowed(["os"]);
        assert_eq!(p.overlapping(), vec!["os"]);
        assert!(!p.permits("os"));
    }

    #[test]
    fn test_timeout_cap() {
        let p = policy();
        assert_eq!(p.with_timeout_cap(Duration::from_secs(5)).timeout(), Duration::from_secs(5));
        assert_eq!(p.with_timeout_cap(Duration::from_secs(60)).timeout(), Duration::from_secs(30));
        assert_eq!(p.max_memory_bytes(), 512 * 1024 * 1024);
    }
}
