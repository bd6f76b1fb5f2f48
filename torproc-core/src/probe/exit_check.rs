//! Exit-node report from the check page
//!
//! Once Tor is ready the check page is fetched again to find out which exit
//! address the request left from.

use regex::{Regex, RegexBuilder};
use std::fmt;
use std::net::IpAddr;
use std::sync::OnceLock;

const TOR_CONFIRMATION: &str = "Congratulations. This browser is configured to use Tor.";

fn strong_in_paragraph() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        match RegexBuilder::new(r"<p(?:\s[^>]*)?>(?:[^<]|<[^/p][^>]*>|</[^p][^>]*>)*?<strong[^>]*>\s*([^<]*?)\s*</strong>")
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => regex,
            Err(e) => unreachable!("invalid exit address pattern: {}", e),
        }
    })
}

/// What the check page reported about the exit address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// The page confirmed Tor and showed this exit address
    TorExit(IpAddr),
    /// An address was shown without the Tor confirmation
    NonTorExit(IpAddr),
    /// No address could be found on the page
    IpNotFound,
}

impl ExitStatus {
    /// Parse the check page HTML
    ///
    /// The exit address is the first `<strong>` text inside a paragraph that
    /// parses as an IP address.
    pub fn parse(html: &str) -> Self {
        let ip = strong_in_paragraph()
            .captures_iter(html)
            .filter_map(|captures| captures.get(1))
            .find_map(|text| text.as_str().trim().parse::<IpAddr>().ok());

        match ip {
            Some(ip) if html.contains(TOR_CONFIRMATION) => ExitStatus::TorExit(ip),
            Some(ip) => ExitStatus::NonTorExit(ip),
            None => ExitStatus::IpNotFound,
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            ExitStatus::TorExit(ip) | ExitStatus::NonTorExit(ip) => Some(*ip),
            ExitStatus::IpNotFound => None,
        }
    }

    pub fn is_tor(&self) -> bool {
        matches!(self, ExitStatus::TorExit(_))
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::TorExit(ip) => write!(f, "Connected through Tor with IP: {}", ip),
            ExitStatus::NonTorExit(ip) => write!(f, "Not connected through Tor with IP: {}", ip),
            ExitStatus::IpNotFound => write!(f, "IP not found"),
        }
    }
}
