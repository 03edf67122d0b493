use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::error::FetchCause;
use crate::sources::Transport;

/// Whether a site's homepage uses the U.S. Web Design Standards, and
/// whether it answered over HTTPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UswdsResult {
    pub domain: String,
    pub uswds: bool,
    pub https: bool,
}

fn class_attribute() -> &'static Regex {
    static CLASS: OnceLock<Regex> = OnceLock::new();
    CLASS.get_or_init(|| {
        // Attributes of an opening tag are walked one by one; `class=` text
        // anywhere else is ignored.
        Regex::new(concat!(
            r#"(?i)<[a-z][a-z0-9:-]*"#,
            r#"(?:\s+[^\s=>/"']+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>"']+))?)*?"#,
            r#"\s+class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#,
        ))
        .expect("class attribute pattern is valid")
    })
}

/// True when any element's `class` attribute contains `usa-`.
pub fn uses_uswds(html: &str) -> bool {
    class_attribute().captures_iter(html).any(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .any(|m| m.as_str().contains("usa-"))
    })
}

/// Fetch `https://{domain}` and fall back to plain HTTP when the HTTPS
/// attempt fails below the HTTP layer. TLS handshake, DNS, refused and
/// timed-out connections all count, since the transport reports them alike.
/// HTTP error statuses do not fall back.
///
/// Only static markup is inspected; sites rendered client-side will read as
/// not using the standards.
pub fn check_uswds(transport: &dyn Transport, domain: &str) -> Result<UswdsResult, FetchCause> {
    info!(action = "start", component = "uswds_check", domain = domain, "Checking homepage");

    let (html, https) = match transport.get_text(&format!("https://{}", domain)) {
        Ok(html) => (html, true),
        Err(FetchCause::Connection(e)) => {
            warn!(action = "fallback", component = "uswds_check", domain = domain, error = %e, "HTTPS failed, retrying over HTTP");
            (transport.get_text(&format!("http://{}", domain))?, false)
        }
        Err(e) => return Err(e),
    };

    let result = UswdsResult {
        domain: domain.to_string(),
        uswds: uses_uswds(&html),
        https,
    };
    info!(action = "complete", component = "uswds_check", domain = domain, uswds = result.uswds, https = result.https, "Homepage checked");
    Ok(result)
}
