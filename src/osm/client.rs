//! Rate-limited HTTP client for the spatial-query, elevation, and
//! reverse-geocoding services.
//!
//! Every outbound call is paced: a per-service minimum gap since the
//! previous call is enforced under one lock, so concurrent callers
//! serialize instead of racing past the spacing check. Timeouts and
//! rate-limit responses are retried with a backoff that grows with the
//! attempt number; rate-limit responses back off harder.

use crate::geometry::Coordinate;
use crate::osm::types::{ElevationResponse, OverpassResponse, ReverseGeocodeResponse};
use crate::types::SearchError;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub overpass_url: String,
    pub elevation_url: String,
    pub reverse_geocode_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub overpass_spacing: Duration,
    pub geocode_spacing: Duration,
    pub elevation_spacing: Duration,
    /// Base delay for timeouts/transport failures, scaled by attempt.
    pub retry_backoff: Duration,
    /// Base delay for rate-limit responses, scaled by attempt.
    pub rate_limit_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            elevation_url: "https://api.open-elevation.com/api/v1/lookup".to_string(),
            reverse_geocode_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            user_agent: "geoscout/0.1 (tag search engine)".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            overpass_spacing: Duration::from_millis(1000),
            geocode_spacing: Duration::from_millis(1000),
            elevation_spacing: Duration::from_millis(500),
            retry_backoff: Duration::from_secs(2),
            rate_limit_backoff: Duration::from_secs(5),
        }
    }
}

/// Minimum-spacing gate for one service.
///
/// The spacing check and the last-call update happen under the same lock
/// acquisition; a caller that needs to wait sleeps while holding it. Two
/// concurrent callers can therefore never both observe a stale last-call
/// time.
struct Pacer {
    min_gap: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_call: Mutex::new(None),
        }
    }

    fn pause(&self) {
        let mut last_call = self.last_call.lock();
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_gap {
                thread::sleep(self.min_gap - elapsed);
            }
        }
        *last_call = Some(Instant::now());
    }
}

pub struct ApiClient {
    agent: ureq::Agent,
    config: ClientConfig,
    overpass_pacer: Pacer,
    geocode_pacer: Pacer,
    elevation_pacer: Pacer,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        let overpass_pacer = Pacer::new(config.overpass_spacing);
        let geocode_pacer = Pacer::new(config.geocode_spacing);
        let elevation_pacer = Pacer::new(config.elevation_spacing);
        Self {
            agent,
            config,
            overpass_pacer,
            geocode_pacer,
            elevation_pacer,
        }
    }

    /// POST a query to the spatial-query service.
    pub fn overpass(&self, query: &str) -> Result<OverpassResponse, SearchError> {
        self.call_with_retry("overpass", &self.overpass_pacer, || {
            self.agent
                .post(&self.config.overpass_url)
                .set("User-Agent", &self.config.user_agent)
                .send_string(query)
        })
    }

    /// Elevation in meters, or None when the service has no data for this
    /// point.
    pub fn elevation(&self, coordinate: Coordinate) -> Result<Option<f64>, SearchError> {
        let locations = format!("{:.6},{:.6}", coordinate.lat, coordinate.lon);
        let response: ElevationResponse =
            self.call_with_retry("elevation", &self.elevation_pacer, || {
                self.agent
                    .get(&self.config.elevation_url)
                    .query("locations", &locations)
                    .set("User-Agent", &self.config.user_agent)
                    .call()
            })?;
        Ok(response.results.first().map(|r| r.elevation))
    }

    /// Free-text address of a point, or None when nothing is mapped there.
    pub fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, SearchError> {
        let response: ReverseGeocodeResponse =
            self.call_with_retry("reverse geocoding", &self.geocode_pacer, || {
                self.agent
                    .get(&self.config.reverse_geocode_url)
                    .query("format", "json")
                    .query("lat", &format!("{:.7}", coordinate.lat))
                    .query("lon", &format!("{:.7}", coordinate.lon))
                    .query("accept-language", "en")
                    .set("User-Agent", &self.config.user_agent)
                    .call()
            })?;
        Ok(response.display_name.filter(|name| !name.is_empty()))
    }

    fn call_with_retry<T: DeserializeOwned>(
        &self,
        service: &'static str,
        pacer: &Pacer,
        send: impl Fn() -> Result<ureq::Response, ureq::Error>,
    ) -> Result<T, SearchError> {
        let mut attempt = 0u32;
        loop {
            pacer.pause();
            let delay = match send() {
                Ok(response) => {
                    return response.into_json().map_err(|err| SearchError::Upstream {
                        service,
                        message: format!("bad response body: {err}"),
                    });
                }
                Err(ureq::Error::Status(code @ (429 | 504), _)) => {
                    log::warn!("{service} rate limited (HTTP {code}) on attempt {}", attempt + 1);
                    self.config.rate_limit_backoff * (attempt + 1)
                }
                Err(ureq::Error::Status(code, _)) => {
                    return Err(SearchError::Upstream {
                        service,
                        message: format!("HTTP {code}"),
                    });
                }
                Err(err) => {
                    log::warn!("{service} transport failure on attempt {}: {err}", attempt + 1);
                    self.config.retry_backoff * (attempt + 1)
                }
            };
            attempt += 1;
            if attempt > self.config.max_retries {
                return Err(SearchError::Exhausted {
                    service,
                    attempts: attempt,
                });
            }
            thread::sleep(delay);
        }
    }
}
