//! HTTP client for the reserve and claim endpoints

use crate::proxy::models::Proxy;
use crate::Result;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy as ReqwestProxy, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Default reservation endpoint
const DEFAULT_RESERVE_URL: &str = "https://gamertag.xboxlive.com/gamertags/reserve";

/// Default claim endpoint
const DEFAULT_CLAIM_URL: &str = "https://accounts.xboxlive.com/users/current/profile/gamertag";

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.6167.85 Safari/537.36";

/// Contract versions differ between the two endpoints
const RESERVE_CONTRACT_VERSION: &str = "1";
const CLAIM_CONTRACT_VERSION: &str = "6";

const RESERVE_MS_CV: &str = "E/s/dzfDoeyIUGjv1jmCOM.0";
const CLAIM_MS_CV: &str = "epDWv0veXknVHWUqdcKrg9.0";

/// Configuration for the claim client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Reservation endpoint URL
    pub reserve_url: String,
    /// Claim endpoint URL
    pub claim_url: String,
    /// Timeout for each HTTP request
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reserve_url: DEFAULT_RESERVE_URL.to_string(),
            claim_url: DEFAULT_CLAIM_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reserve_url(mut self, url: String) -> Self {
        self.reserve_url = url;
        self
    }

    pub fn with_claim_url(mut self, url: String) -> Self {
        self.claim_url = url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Reservation request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReserveRequest<'a> {
    gamertag: &'a str,
    reservation_id: &'a str,
    target_gamertag_fields: &'a str,
}

/// Reservation response body
///
/// An empty `gamertagSuffix` means the exact name was held. A non-empty
/// suffix means the service offered a numbered variant instead, which
/// counts as a failed attempt. An absent field also counts as failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReserveResponse {
    #[serde(default)]
    gamertag_suffix: Option<String>,
}

impl ReserveResponse {
    fn is_exact_match(&self) -> bool {
        self.gamertag_suffix.as_deref() == Some("")
    }
}

/// Claim request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRequest<'a> {
    reservation_id: &'a str,
    gamertag: ClaimGamertag<'a>,
    preview: bool,
    use_legacy_entitlement: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimGamertag<'a> {
    gamertag: &'a str,
    gamertag_suffix: &'a str,
    classic_gamertag: &'a str,
}

/// Client issuing reserve and claim requests
///
/// A direct connection-pooled client is reused for proxy-less attempts;
/// proxied attempts build a client around the drawn proxy per call, since
/// the proxy changes on every attempt.
#[derive(Debug, Clone)]
pub struct ClaimClient {
    config: ClientConfig,
    direct: Client,
}

impl ClaimClient {
    /// Create a new claim client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new claim client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let direct = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, direct })
    }

    /// Reserve a gamertag.
    ///
    /// Returns true iff the service answered 200 with an empty
    /// `gamertagSuffix`. Transport faults and non-200 statuses are logged
    /// and reported as failure; this never returns an error.
    pub async fn reserve(&self, gamertag: &str, token: &str, proxy: Option<&Proxy>) -> bool {
        let payload = ReserveRequest {
            gamertag,
            reservation_id: "0",
            target_gamertag_fields: "gamertag",
        };

        let response = self
            .post_json(
                &self.config.reserve_url,
                token,
                RESERVE_CONTRACT_VERSION,
                RESERVE_MS_CV,
                proxy,
                &payload,
            )
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::OK => {
                match response.json::<ReserveResponse>().await {
                    Ok(body) if body.is_exact_match() => {
                        info!(gamertag, "reserved gamertag");
                        true
                    }
                    Ok(body) => {
                        info!(
                            gamertag,
                            suffix = body.gamertag_suffix.as_deref().unwrap_or("<absent>"),
                            "exact gamertag not available, suffix offered"
                        );
                        false
                    }
                    Err(e) => {
                        error!(gamertag, error = %e, "failed to parse reserve response");
                        false
                    }
                }
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                log_status_error("reserve", gamertag, status, &body);
                false
            }
            Err(e) => {
                error!(gamertag, error = %e, "error while reserving gamertag");
                false
            }
        }
    }

    /// Claim a previously reserved gamertag.
    ///
    /// Returns true iff the service answered 200, irrespective of the
    /// response body. Same fault-swallowing policy as [`reserve`](Self::reserve).
    pub async fn claim(&self, gamertag: &str, token: &str, proxy: Option<&Proxy>) -> bool {
        let payload = ClaimRequest {
            reservation_id: "0",
            gamertag: ClaimGamertag {
                gamertag,
                gamertag_suffix: "",
                classic_gamertag: gamertag,
            },
            preview: false,
            use_legacy_entitlement: false,
        };

        let response = self
            .post_json(
                &self.config.claim_url,
                token,
                CLAIM_CONTRACT_VERSION,
                CLAIM_MS_CV,
                proxy,
                &payload,
            )
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::OK => {
                info!(gamertag, "claimed gamertag");
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                log_status_error("claim", gamertag, status, &body);
                false
            }
            Err(e) => {
                error!(gamertag, error = %e, "error while claiming gamertag");
                false
            }
        }
    }

    async fn post_json<T: Serialize>(
        &self,
        url: &str,
        token: &str,
        contract_version: &'static str,
        ms_cv: &'static str,
        proxy: Option<&Proxy>,
        payload: &T,
    ) -> Result<reqwest::Response> {
        let client = self.client_for(proxy)?;
        let headers = self.build_headers(token, contract_version, ms_cv)?;

        let response = client.post(url).headers(headers).json(payload).send().await?;
        Ok(response)
    }

    /// Create a reqwest client routed through the given proxy
    fn client_for(&self, proxy: Option<&Proxy>) -> Result<Client> {
        match proxy {
            None => Ok(self.direct.clone()),
            Some(proxy) => {
                // Proxy::all so https traffic to the endpoints is routed too
                let reqwest_proxy = ReqwestProxy::all(proxy.url())?;
                let client = Client::builder()
                    .proxy(reqwest_proxy)
                    .timeout(self.config.timeout)
                    .build()?;
                Ok(client)
            }
        }
    }

    /// Browser header template used by both endpoints.
    ///
    /// Content-Length and Host are derived from the actual request rather
    /// than pinned, so the endpoints stay overridable and the payload shape
    /// can change without desyncing the headers.
    fn build_headers(
        &self,
        token: &str,
        contract_version: &'static str,
        ms_cv: &'static str,
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("XBL3.0 x={token}"))?,
        );
        headers.insert("X-Xbl-Contract-Version", HeaderValue::from_static(contract_version));
        headers.insert("Ms-Cv", HeaderValue::from_static(ms_cv));
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&self.config.user_agent)?);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            "Sec-Ch-Ua",
            HeaderValue::from_static("\"Chromium\";v=\"121\", \"Not A(Brand\";v=\"99\""),
        );
        headers.insert("Sec-Ch-Ua-Mobile", HeaderValue::from_static("?0"));
        headers.insert("Sec-Ch-Ua-Platform", HeaderValue::from_static("\"Windows\""));
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://social.xbox.com"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://social.xbox.com/"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("cross-site"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert("Priority", HeaderValue::from_static("u=1, i"));
        Ok(headers)
    }
}

/// Log a failed response with a status-specific diagnostic
fn log_status_error(operation: &str, gamertag: &str, status: StatusCode, body: &str) {
    match status.as_u16() {
        429 => error!(
            operation,
            gamertag, "rate limit exceeded, wait before making further requests"
        ),
        401 => error!(
            operation,
            gamertag, "unauthorized, check if the token is correct or has expired"
        ),
        403 => error!(operation, gamertag, "forbidden, access denied to the resource"),
        404 => error!(operation, gamertag, "not found"),
        _ => error!(operation, gamertag, status = %status, body, "request failed"),
    }
}
