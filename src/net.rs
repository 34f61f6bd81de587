use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::error::{FlightError, FlightResult};
use crate::extract::BoundedExtractor;
use crate::model::{FlightRecord, SearchResponse};

pub const DEFAULT_SEARCH_BASE: &str =
    "https://data-live.flightradar24.com/zones/fcgi/feed.js?bounds=";
pub const DEFAULT_SEARCH_TAIL: &str = "&faa=1&satellite=1&mlat=1&flarm=1&adsb=1&gnd=0&air=1&vehicles=0&estimated=0&maxage=14400&gliders=0&stats=0&ems=1&limit=1";
pub const DEFAULT_DETAILS_BASE: &str =
    "https://data-live.flightradar24.com/clickhandler/?version=1.5&flight=";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:106.0) Gecko/20100101 Firefox/106.0";
const CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, post-check=0, pre-check=0";
const ACCEPT: &str = "application/json";

const SEARCH_BODY_LIMIT: u64 = 64 * 1024;

pub trait Transport {
    fn get(&mut self, url: &str, headers: &[(&str, &str)]) -> FlightResult<Box<dyn Read + '_>>;
    fn is_connected(&mut self) -> bool;
    fn reconnect(&mut self) -> FlightResult<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    search_url: String,
    details_base: String,
}

impl Endpoints {
    pub fn new(search_base: &str, bounds_box: &str, search_tail: &str, details_base: &str) -> Self {
        Self {
            search_url: format!("{search_base}{}{search_tail}", bounds_box.trim()),
            details_base: details_base.to_string(),
        }
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    pub fn details_url(&self, flight_id: &str) -> String {
        format!("{}{}", self.details_base, flight_id.trim())
    }
}

#[derive(Clone, Debug)]
pub struct RequestHeaders {
    user_agent: String,
}

impl RequestHeaders {
    pub fn new(user_agent: &str) -> Self {
        let user_agent = if user_agent.trim().is_empty() {
            DEFAULT_USER_AGENT
        } else {
            user_agent.trim()
        };
        Self {
            user_agent: user_agent.to_string(),
        }
    }

    pub fn pairs(&self) -> [(&str, &str); 3] {
        [
            ("User-Agent", self.user_agent.as_str()),
            ("cache-control", CACHE_CONTROL),
            ("accept", ACCEPT),
        ]
    }
}

impl Default for RequestHeaders {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

pub struct HttpTransport {
    client: Client,
    timeout: Duration,
    probe_url: String,
    connected: bool,
}

impl HttpTransport {
    pub fn new(timeout: Duration, probe_url: &str) -> anyhow::Result<Self> {
        let client = build_client(timeout)?;
        Ok(Self {
            client,
            timeout,
            probe_url: probe_url.to_string(),
            connected: false,
        })
    }
}

fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

impl Transport for HttpTransport {
    fn get(&mut self, url: &str, headers: &[(&str, &str)]) -> FlightResult<Box<dyn Read + '_>> {
        let mut req = self.client.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = match req.send() {
            Ok(resp) => resp,
            Err(err) => {
                self.connected = false;
                return Err(FlightError::Transport(err.to_string()));
            }
        };
        self.connected = true;

        let status = resp.status();
        if !status.is_success() {
            return Err(FlightError::Transport(format!("HTTP {}", status)));
        }
        Ok(Box::new(resp))
    }

    fn is_connected(&mut self) -> bool {
        self.connected
    }

    fn reconnect(&mut self) -> FlightResult<()> {
        self.client =
            build_client(self.timeout).map_err(|err| FlightError::Transport(err.to_string()))?;
        match self.client.head(&self.probe_url).send() {
            Ok(resp) => {
                debug!("probe answered {}", resp.status());
                self.connected = true;
                Ok(())
            }
            Err(err) => {
                self.connected = false;
                Err(FlightError::Transport(err.to_string()))
            }
        }
    }
}

pub fn recover_connection<T: Transport + ?Sized>(transport: &mut T, attempts: u32) -> bool {
    info!("checking network connection");
    let mut attempt = 1;
    while !transport.is_connected() && attempt <= attempts {
        info!("connect attempt {attempt} of {attempts}");
        if let Err(err) = transport.reconnect() {
            warn!("reconnect failed: {err}");
        }
        attempt += 1;
    }
    let connected = transport.is_connected();
    if connected {
        info!("network connected");
    } else {
        warn!("network still unreachable after {attempts} attempts");
    }
    connected
}

pub fn fetch_search<T: Transport + ?Sized>(
    transport: &mut T,
    endpoints: &Endpoints,
    headers: &RequestHeaders,
) -> FlightResult<SearchResponse> {
    let body = transport.get(endpoints.search_url(), &headers.pairs())?;
    let response: SearchResponse = serde_json::from_reader(body.take(SEARCH_BODY_LIMIT))?;
    debug!("search returned {} entries", response.len());
    Ok(response)
}

pub fn fetch_details<T: Transport + ?Sized>(
    transport: &mut T,
    endpoints: &Endpoints,
    headers: &RequestHeaders,
    flight_id: &str,
    extractor: &mut BoundedExtractor,
) -> FlightResult<FlightRecord> {
    let url = endpoints.details_url(flight_id);
    let body = transport.get(&url, &headers.pairs())?;
    extractor.extract(body)
}
