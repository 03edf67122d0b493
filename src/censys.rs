use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::CensysConfig;
use crate::error::FetchCause;
use crate::http::HttpTransport;
use crate::sources::ReconService;

/// Censys v1 certificate search.
pub struct CensysClient {
    transport: HttpTransport,
    api_url: String,
    api_id: Option<String>,
    secret: Option<String>,
    max_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub status: String,
    pub metadata: SearchMetadata,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SearchMetadata {
    pub pages: u32,
}

impl CensysClient {
    pub fn new(transport: HttpTransport, config: &CensysConfig) -> Self {
        Self {
            transport,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_id: config.api_id.clone(),
            secret: config.secret.clone(),
            max_pages: config.max_pages,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), FetchCause> {
        let id = self
            .api_id
            .as_deref()
            .ok_or(FetchCause::MissingCredentials("CENSYS_API_ID"))?;
        let secret = self
            .secret
            .as_deref()
            .ok_or(FetchCause::MissingCredentials("CENSYS_SECRET"))?;
        Ok((id, secret))
    }

    fn search_page(&self, query: &str, page: u32) -> Result<SearchPage, FetchCause> {
        let (id, secret) = self.credentials()?;
        let url = format!("{}/search/certificates", self.api_url);
        let body = json!({
            "query": query,
            "page": page,
            "fields": ["parsed.names"],
        });

        let resp = self
            .transport
            .send_with_retry(|http| http.post(&url).basic_auth(id, Some(secret)).json(&body))?;
        let text = resp.text().map_err(|e| FetchCause::Body(e.to_string()))?;
        parse_search_page(&text)
    }
}

impl ReconService for CensysClient {
    fn search(&self, query: &str) -> Result<Vec<String>, FetchCause> {
        self.credentials()?;

        let mut names = Vec::new();
        let mut page = 1;
        loop {
            let result = self.search_page(query, page)?;
            names.extend(result.results.iter().flat_map(extract_names));

            let last_page = result.metadata.pages.min(self.max_pages);
            info!(action = "page", component = "censys", page, last_page, name_count = names.len(), "Fetched search page");
            if page >= last_page {
                break;
            }
            page += 1;
        }

        Ok(names)
    }
}

pub fn parse_search_page(text: &str) -> Result<SearchPage, FetchCause> {
    let page: SearchPage =
        serde_json::from_str(text).map_err(|e| FetchCause::Response(e.to_string()))?;
    if !page.status.is_empty() && page.status != "ok" {
        return Err(FetchCause::Response(format!("search status '{}'", page.status)));
    }
    Ok(page)
}

/// Names from one result. The API returns the field either as a flat
/// `"parsed.names"` key or nested under `parsed`.
fn extract_names(result: &serde_json::Value) -> Vec<String> {
    let field = result
        .get("parsed.names")
        .or_else(|| result.get("parsed").and_then(|p| p.get("names")));

    match field {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(serde_json::Value::String(name)) => vec![name.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;

    #[test]
    fn parse_page_flattens_names() {
        let text = r#"{
            "status": "ok",
            "metadata": {"count": 3, "page": 1, "pages": 4},
            "results": [
                {"parsed.names": ["a.gov", "www.a.gov"]},
                {"parsed": {"names": ["b.gov"]}},
                {"parsed.names": "c.gov"},
                {"other": 1}
            ]
        }"#;
        let page = parse_search_page(text).unwrap();
        assert_eq!(page.metadata.pages, 4);

        let names: Vec<String> = page.results.iter().flat_map(extract_names).collect();
        assert_eq!(names, vec!["a.gov", "www.a.gov", "b.gov", "c.gov"]);
    }

    #[test]
    fn parse_page_rejects_error_status() {
        let text = r#"{"status": "error", "metadata": {"pages": 0}, "results": []}"#;
        assert!(matches!(
            parse_search_page(text),
            Err(FetchCause::Response(_))
        ));
    }

    #[test]
    fn parse_page_rejects_malformed_json() {
        assert!(matches!(
            parse_search_page("<html>rate limited</html>"),
            Err(FetchCause::Response(_))
        ));
    }

    #[test]
    fn search_without_credentials_fails_before_any_request() {
        let transport = HttpTransport::new(&FetchConfig::default()).unwrap();
        let client = CensysClient::new(
            transport,
            &CensysConfig {
                api_url: "http://127.0.0.1:9".into(),
                ..CensysConfig::default()
            },
        );
        assert!(matches!(
            client.search(".gov"),
            Err(FetchCause::MissingCredentials("CENSYS_API_ID"))
        ));
    }
}
