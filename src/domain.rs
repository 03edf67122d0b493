use serde::{Deserialize, Serialize};

/// One reconciled row of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain: String,
    pub base_domain: String,
    pub in_eot2016: bool,
    pub in_dap: bool,
    pub in_parents: bool,
    pub in_censys: bool,
}

/// Last two dot-separated labels of `domain`.
///
/// Naive: `a.b.example.gov` gives `example.gov`, but so does
/// `foo.co.uk` give `co.uk`. Inputs with fewer than two labels come back
/// unchanged, including the empty string.
pub fn base_domain(domain: &str) -> String {
    let mut dots = domain.rmatch_indices('.');
    match (dots.next(), dots.next()) {
        (Some(_), Some((second, _))) => domain[second + 1..].to_string(),
        _ => domain.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_domain_strips_subdomains() {
        assert_eq!(base_domain("a.b.example.gov"), "example.gov");
        assert_eq!(base_domain("www.example.gov"), "example.gov");
    }

    #[test]
    fn base_domain_keeps_two_labels() {
        assert_eq!(base_domain("example.gov"), "example.gov");
    }

    #[test]
    fn base_domain_single_label_unchanged() {
        assert_eq!(base_domain("localhost"), "localhost");
        assert_eq!(base_domain(""), "");
    }

    #[test]
    fn base_domain_matches_label_split() {
        // Empty labels count like any other label.
        assert_eq!(base_domain("example.gov."), "gov.");
        assert_eq!(base_domain(".gov"), ".gov");
        assert_eq!(base_domain("a..gov"), ".gov");
    }
}
