use std::time::Duration;

use log::debug;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; race-core-bot/1.0; +https://github.com/)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Thin HTTP capability over boatrace.jp: plain GETs with a fixed
/// identifying User-Agent and a fixed per-request timeout.
pub struct BoatraceClient {
    client: reqwest::Client,
}

/// One fetched page, reduced to what the classifiers need. `bytes` is the
/// raw response length; `body` is the lossily-decoded text.
#[derive(Clone, Debug)]
pub struct FetchedPage {
    pub status: u16,
    pub bytes: u64,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl BoatraceClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &Url) -> anyhow::Result<FetchedPage> {
        debug!("GET {url}");
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        Ok(FetchedPage {
            status,
            bytes: bytes.len() as u64,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
