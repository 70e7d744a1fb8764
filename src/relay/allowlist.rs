//! Destination host policy.
//!
//! # Design Decisions
//! - Substring containment is the default and mirrors the deployed relay:
//!   `now.gg.evil.com` is accepted because it contains `now.gg`
//! - `suffix` mode accepts only the domain itself or its subdomains
//! - Comparison is case-insensitive; parsed URL hosts are already lowercase

use crate::config::DomainMatch;

/// Allow-list of upstream domains plus the matching rule.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    domains: Vec<String>,
    mode: DomainMatch,
}

impl DomainPolicy {
    pub fn new<I, S>(domains: I, mode: DomainMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains, mode }
    }

    /// Returns true if requests to `host` may be relayed.
    pub fn permits(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        if host.is_empty() {
            return false;
        }

        self.domains.iter().any(|domain| match self.mode {
            DomainMatch::Substring => host.contains(domain.as_str()),
            DomainMatch::Suffix => {
                host == *domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        })
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn mode(&self) -> DomainMatch {
        self.mode
    }
}
