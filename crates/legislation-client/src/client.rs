use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, REFERER};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ClientError, Result};
use crate::types::{Endpoint, Params};

const USER_AGENT: &str = "legislation-client-rs/0.1";
/// Some endpoints answer 404 without a referer from the portal
const REFERER_URL: &str = "https://open.law.go.kr/";
/// Change history, system diagrams, and law history are slow to generate
const SLOW_TARGETS: &[&str] = &["lsHstInf", "lsStmd", "lawHst"];
const SLOW_TARGET_TIMEOUT: Duration = Duration::from_secs(60);
/// Targets whose `LawSearch` body never carries a `resultCode`
const TARGETS_WITHOUT_RESULT_CODE: &[&str] = &["elaw", "lsHstInf", "lsJoHstInf"];
const AUTH_FAILURE_MARKERS: &[&str] = &["사용자인증에 실패", "페이지 접속에 실패"];

/// Client for the `lawSearch.do` / `lawService.do` endpoints
pub struct LegislationClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl LegislationClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// List documents of a category
    pub async fn search(&self, target: &str, params: &Params) -> Result<Value> {
        self.request(Endpoint::Search, target, params).await
    }

    /// Fetch one document of a category
    pub async fn service(&self, target: &str, params: &Params) -> Result<Value> {
        self.request(Endpoint::Service, target, params).await
    }

    /// Full request URL, including the `OC`, `target` and `type` parameters
    pub fn request_url(&self, endpoint: Endpoint, target: &str, params: &Params) -> Result<Url> {
        let base = match endpoint {
            Endpoint::Search => &self.config.search_base_url,
            Endpoint::Service => &self.config.service_base_url,
        };

        let mut query = params.clone();
        query.insert("OC".to_string(), self.config.api_key.clone());
        query.insert("target".to_string(), target.to_string());
        query.insert("type".to_string(), "JSON".to_string());

        // Name search is what callers mean by a plain law query
        if endpoint == Endpoint::Search
            && target == "law"
            && query.contains_key("query")
            && !query.contains_key("section")
        {
            query.insert("section".to_string(), "lawNm".to_string());
        }

        Ok(Url::parse_with_params(base, query.iter())?)
    }

    /// Timeout applied to a request for `target`
    pub fn timeout_for(&self, target: &str) -> Duration {
        if SLOW_TARGETS.contains(&target) {
            self.config.timeout.max(SLOW_TARGET_TIMEOUT)
        } else {
            self.config.timeout
        }
    }

    async fn request(&self, endpoint: Endpoint, target: &str, params: &Params) -> Result<Value> {
        let url = self.request_url(endpoint, target, params)?;
        debug!(endpoint = endpoint.as_str(), target, "Calling legislation API");

        let response = self
            .http
            .get(url)
            .header(REFERER, REFERER_URL)
            .timeout(self.timeout_for(target))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                endpoint = endpoint.as_str(),
                target,
                %status,
                "Legislation API returned error status"
            );
            return Err(ClientError::Status(status.as_u16()));
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));
        let body = response.text().await?;

        parse_body(target, is_html, &body)
    }
}

/// Validate and decode a response body
pub(crate) fn parse_body(target: &str, is_html: bool, body: &str) -> Result<Value> {
    if is_html {
        if AUTH_FAILURE_MARKERS.iter().any(|m| body.contains(m)) {
            return Err(ClientError::Authentication);
        }
        return Err(ClientError::UnexpectedHtml {
            target: target.to_string(),
        });
    }

    if body.trim().is_empty() {
        return Err(ClientError::EmptyResponse {
            target: target.to_string(),
        });
    }

    let data: Value = serde_json::from_str(body)?;
    if !data.is_object() {
        return Err(ClientError::InvalidResponse(
            "expected a JSON object".to_string(),
        ));
    }

    check_result_code(target, &data)?;
    Ok(data)
}

fn check_result_code(target: &str, data: &Value) -> Result<()> {
    if TARGETS_WITHOUT_RESULT_CODE.contains(&target) {
        return Ok(());
    }
    let Some(search) = data.get("LawSearch") else {
        return Ok(());
    };

    let code = match search.get("resultCode") {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Number(code)) => format!("{:02}", code.as_u64().unwrap_or_default()),
        _ => return Ok(()),
    };
    if code == "00" {
        return Ok(());
    }

    let message = search
        .get("resultMsg")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Err(ClientError::Api { code, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn client() -> LegislationClient {
        LegislationClient::new(ApiConfig::new("testkey")).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn query_of(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_search_url_adds_fixed_params() {
        let url = client()
            .request_url(Endpoint::Search, "prec", &params(&[("query", "손해배상")]))
            .unwrap();
        assert!(url.as_str().starts_with("http://www.law.go.kr/DRF/lawSearch.do?"));

        let query = query_of(&url);
        assert_eq!(query["OC"], "testkey");
        assert_eq!(query["target"], "prec");
        assert_eq!(query["type"], "JSON");
        assert_eq!(query["query"], "손해배상");
        assert!(!query.contains_key("section"));
    }

    #[test]
    fn test_law_search_defaults_to_name_section() {
        let c = client();
        let url = c
            .request_url(Endpoint::Search, "law", &params(&[("query", "개인정보")]))
            .unwrap();
        assert_eq!(query_of(&url)["section"], "lawNm");

        let url = c
            .request_url(
                Endpoint::Search,
                "law",
                &params(&[("query", "개인정보"), ("section", "bdyText")]),
            )
            .unwrap();
        assert_eq!(query_of(&url)["section"], "bdyText");
    }

    #[test]
    fn test_service_url() {
        let url = client()
            .request_url(Endpoint::Service, "law", &params(&[("MST", "248613"), ("type", "XML")]))
            .unwrap();
        assert!(url.as_str().starts_with("http://www.law.go.kr/DRF/lawService.do?"));

        let query = query_of(&url);
        assert_eq!(query["MST"], "248613");
        assert_eq!(query["type"], "JSON");
        assert!(!query.contains_key("section"));
    }

    #[test]
    fn test_slow_targets_get_longer_timeout() {
        let c = client();
        assert_eq!(c.timeout_for("law"), Duration::from_secs(10));
        assert_eq!(c.timeout_for("lsHstInf"), Duration::from_secs(60));

        let mut config = ApiConfig::new("k");
        config.timeout = Duration::from_secs(120);
        let patient = LegislationClient::new(config).unwrap();
        assert_eq!(patient.timeout_for("lsStmd"), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_body_html_auth_failure() {
        let body = "<html><body>사용자인증에 실패하였습니다.</body></html>";
        assert!(matches!(
            parse_body("law", true, body),
            Err(ClientError::Authentication)
        ));
        assert!(matches!(
            parse_body("law", true, "<html>maintenance</html>"),
            Err(ClientError::UnexpectedHtml { .. })
        ));
    }

    #[test]
    fn test_parse_body_empty_and_invalid() {
        assert!(matches!(
            parse_body("law", false, "  \n"),
            Err(ClientError::EmptyResponse { .. })
        ));
        assert!(matches!(
            parse_body("law", false, "{broken"),
            Err(ClientError::Json(_))
        ));
        assert!(matches!(
            parse_body("law", false, "[1, 2]"),
            Err(ClientError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_body_result_codes() {
        let ok = r#"{"LawSearch": {"resultCode": "00", "totalCnt": "1"}}"#;
        assert!(parse_body("law", false, ok).is_ok());

        let failed = r#"{"LawSearch": {"resultCode": "01", "resultMsg": "필수 파라미터 누락"}}"#;
        match parse_body("law", false, failed) {
            Err(ClientError::Api { code, message }) => {
                assert_eq!(code, "01");
                assert_eq!(message, "필수 파라미터 누락");
            }
            other => panic!("expected API error, got {:?}", other),
        }

        // elaw responses never carry a result code and are not checked
        assert!(parse_body("elaw", false, failed).is_ok());

        let detail = r#"{"법령": {"기본정보": {"법령명_한글": "개인정보 보호법"}}}"#;
        assert!(parse_body("law", false, detail).is_ok());
    }

    #[tokio::test]
    async fn test_search_against_local_server() {
        let router = Router::new().route(
            "/DRF/lawSearch.do",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                Json(json!({
                    "LawSearch": {
                        "resultCode": "00",
                        "target": query.get("target"),
                        "oc": query.get("OC"),
                        "law": [{"법령명한글": "개인정보 보호법"}]
                    }
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut config = ApiConfig::new("localkey");
        config.search_base_url = format!("http://{}/DRF/lawSearch.do", addr);
        let c = LegislationClient::new(config).unwrap();

        let data = c
            .search("law", &params(&[("query", "개인정보")]))
            .await
            .unwrap();
        assert_eq!(data["LawSearch"]["target"], "law");
        assert_eq!(data["LawSearch"]["oc"], "localkey");
        assert_eq!(data["LawSearch"]["law"][0]["법령명한글"], "개인정보 보호법");
    }
}
