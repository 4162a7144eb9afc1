//! Distributed tracing headers
//!
//! W3C trace context on outgoing requests. Identity provider hosts never get
//! a correlation header.

use rand::Rng;
use url::Url;

pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Hosts excluded by default. `*.` entries match any subdomain.
const DEFAULT_EXCLUDED_DOMAINS: &[&str] = &[
    "login.microsoftonline.com",
    "login.windows.net",
    "*.login.microsoftonline.com",
    "*.login.windows.net",
];

#[derive(Debug, Clone)]
pub struct CorrelationPolicy {
    excluded_domains: Vec<String>,
}

impl CorrelationPolicy {
    pub fn new() -> Self {
        Self::with_excluded_domains(DEFAULT_EXCLUDED_DOMAINS.iter().map(|d| d.to_string()))
    }

    pub fn with_excluded_domains<I>(domains: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            excluded_domains: domains.into_iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    pub fn exclude_domain(&mut self, domain: &str) {
        self.excluded_domains.push(domain.to_lowercase());
    }

    /// Whether a request to `url` may carry correlation headers
    pub fn should_correlate(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();

        !self
            .excluded_domains
            .iter()
            .any(|pattern| Self::matches(pattern, &host))
    }

    fn matches(pattern: &str, host: &str) -> bool {
        match pattern.strip_prefix("*.") {
            Some(parent) => host
                .strip_suffix(parent)
                .is_some_and(|prefix| prefix.ends_with('.')),
            None => host == pattern,
        }
    }
}

impl Default for CorrelationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// One operation's trace identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
}

impl TraceContext {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            trace_id: hex(&non_zero(rng.gen::<[u8; 16]>())),
            span_id: hex(&non_zero(rng.gen::<[u8; 8]>())),
        }
    }

    /// `00-<trace id>-<span id>-01` (version 00, sampled)
    pub fn traceparent(&self) -> String {
        format!("00-{}-{}-01", self.trace_id, self.span_id)
    }
}

/// All-zero ids are invalid in trace context
fn non_zero<const N: usize>(mut bytes: [u8; N]) -> [u8; N] {
    if bytes.iter().all(|b| *b == 0) {
        bytes[N - 1] = 1;
    }
    bytes
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_identity_provider_excluded() {
        let policy = CorrelationPolicy::new();

        assert!(!policy.should_correlate(&url("https://login.microsoftonline.com/t/oauth2/v2.0/token")));
        assert!(!policy.should_correlate(&url("https://LOGIN.windows.net/common")));
        assert!(!policy.should_correlate(&url("https://eu.login.microsoftonline.com/")));
    }

    #[test]
    fn test_other_hosts_correlated() {
        let policy = CorrelationPolicy::new();

        assert!(policy.should_correlate(&url("https://chat.contoso.com/api/chat")));
        assert!(policy.should_correlate(&url("http://localhost:8000/chat")));
        // Suffix without a dot boundary is a different host
        assert!(policy.should_correlate(&url("https://evillogin.microsoftonline.com.example/")));
        assert!(policy.should_correlate(&url("https://notlogin.windows.net/")));
    }

    #[test]
    fn test_custom_exclusion() {
        let mut policy = CorrelationPolicy::with_excluded_domains(Vec::new());
        assert!(policy.should_correlate(&url("https://login.windows.net/")));

        policy.exclude_domain("*.internal.test");
        assert!(!policy.should_correlate(&url("https://api.internal.test/")));
        assert!(policy.should_correlate(&url("https://internal.test/")));
    }

    #[test]
    fn test_traceparent_format() {
        let context = TraceContext::generate();
        let header = context.traceparent();
        let parts: Vec<&str> = header.split('-').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "00");
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2].len(), 16);
        assert_eq!(parts[3], "01");
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(TraceContext::generate(), context);
    }

    #[test]
    fn test_non_zero() {
        assert_eq!(non_zero([0u8; 4]), [0, 0, 0, 1]);
        assert_eq!(non_zero([7u8, 0]), [7, 0]);
    }
}
