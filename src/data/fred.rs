//! FRED API integration: search, observations, series metadata, raw JSON.
//!
//! Every method is a thin pass-through to the REST API. The only local logic is
//! optional-parameter shaping (absent values are never sent upstream) and
//! turning transport/HTTP/parse failures into typed `AppError`s.

use chrono::NaiveDate;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{Frequency, ObservationTable, SearchHit, SeriesId, SeriesInfo, UnitsTransform};
use crate::error::{AppError, ErrorKind};

const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred";

/// Upper bound FRED accepts for `series/search`.
const SEARCH_LIMIT_MAX: usize = 1000;

/// Parameters of one observations request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub series_id: SeriesId,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub units: Option<UnitsTransform>,
}

impl FetchRequest {
    pub fn new(series_id: impl Into<SeriesId>) -> Self {
        Self {
            series_id: series_id.into(),
            start: None,
            end: None,
            frequency: None,
            units: None,
        }
    }

    pub fn window(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn frequency(mut self, frequency: Option<Frequency>) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn units(mut self, units: Option<UnitsTransform>) -> Self {
        self.units = units;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.series_id.as_str().trim().is_empty() {
            return Err(AppError::invalid("Series id must not be empty."));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(AppError::invalid(format!(
                    "Start date {start} is after end date {end}."
                )));
            }
        }
        Ok(())
    }

    /// Optional query parameters; only those actually set are included.
    pub fn optional_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start {
            params.push(("observation_start", start.to_string()));
        }
        if let Some(end) = self.end {
            params.push(("observation_end", end.to_string()));
        }
        if let Some(freq) = self.frequency {
            params.push(("frequency", freq.as_param().to_string()));
        }
        if let Some(units) = self.units {
            params.push(("units", units.as_param().to_string()));
        }
        params
    }
}

/// Anything that can produce an observation table for a request.
///
/// Report orchestration only depends on this trait, so it runs unchanged
/// against the live client or an in-memory stub.
pub trait SeriesSource {
    fn fetch(&self, request: &FetchRequest) -> Result<ObservationTable, AppError>;
}

pub struct FredClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FredClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from `FRED_API_KEY` (and optional `FRED_API_URL`).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("FRED_API_KEY")
            .map_err(|_| AppError::config("Missing FRED_API_KEY in environment (.env)."))?;
        if api_key.trim().is_empty() {
            return Err(AppError::config("FRED_API_KEY is empty."));
        }
        let base_url = std::env::var("FRED_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key, base_url))
    }

    /// Search series by keyword, optionally keeping only hits whose notes
    /// mention `category` (case-insensitive).
    pub fn search(
        &self,
        keyword: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        if keyword.trim().is_empty() {
            return Err(AppError::invalid("Search keyword must not be empty."));
        }
        if limit == 0 {
            return Err(AppError::invalid("Search limit must be > 0."));
        }
        let limit = limit.min(SEARCH_LIMIT_MAX).to_string();

        let body: SeriesListResponse = self.get_json(
            "series/search",
            &[("search_text", keyword), ("limit", limit.as_str())],
        )?;

        Ok(filter_by_category(body.seriess, category))
    }

    /// Fetch observations as a single-column table named after the series id.
    pub fn fetch(&self, request: &FetchRequest) -> Result<ObservationTable, AppError> {
        request.validate()?;

        let optional = request.optional_params();
        let mut params: Vec<(&str, &str)> = vec![("series_id", request.series_id.as_str())];
        params.extend(optional.iter().map(|(k, v)| (*k, v.as_str())));

        let body: ObservationsResponse = self.get_json("series/observations", &params)?;
        parse_observations(&request.series_id, body)
    }

    /// Descriptive fields about one series, flattened to strings.
    pub fn metadata(&self, series_id: &SeriesId) -> Result<SeriesInfo, AppError> {
        if series_id.as_str().trim().is_empty() {
            return Err(AppError::invalid("Series id must not be empty."));
        }
        let body: serde_json::Value = self.get_json("series", &[("series_id", series_id.as_str())])?;
        flatten_series_record(series_id, &body)
    }

    /// Raw provider JSON for observations, bypassing table parsing.
    pub fn fetch_raw_json(
        &self,
        series_id: &SeriesId,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<serde_json::Value, AppError> {
        let request = FetchRequest::new(series_id.clone()).window(start, end);
        request.validate()?;

        let optional = request.optional_params();
        let mut params: Vec<(&str, &str)> = vec![("series_id", series_id.as_str())];
        params.extend(optional.iter().map(|(k, v)| (*k, v.as_str())));

        self.get_json("series/observations", &params)
    }

    fn get_json<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T, AppError> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(endpoint, ?params, "FRED request");

        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("api_key", self.api_key.as_str()), ("file_type", "json")])
            .send()
            .map_err(|e| AppError::transport(format!("FRED request failed: {e}")))?;

        let resp = ensure_success(resp)?;

        resp.json()
            .map_err(|e| AppError::parse(format!("Failed to parse FRED response: {e}")))
    }
}

impl SeriesSource for FredClient {
    fn fetch(&self, request: &FetchRequest) -> Result<ObservationTable, AppError> {
        FredClient::fetch(self, request)
    }
}

fn ensure_success(resp: Response) -> Result<Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp
        .text()
        .ok()
        .and_then(|body| upstream_error_message(&body))
        .map(|m| format!(": {m}"))
        .unwrap_or_default();
    Err(AppError::transport(format!(
        "FRED request failed with status {status}{detail}."
    )))
}

/// Extract `error_message` from a FRED error payload.
fn upstream_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error_message: String,
    }
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error_message)
}

#[derive(Debug, Deserialize)]
struct SeriesListResponse {
    #[serde(default)]
    seriess: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

fn parse_observations(series_id: &SeriesId, body: ObservationsResponse) -> Result<ObservationTable, AppError> {
    let mut out = Vec::with_capacity(body.observations.len());
    for obs in body.observations {
        let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
            .map_err(|e| AppError::parse(format!("Invalid FRED date '{}': {e}", obs.date)))?;
        out.push((date, parse_value(&obs.value)));
    }
    out.sort_by_key(|(d, _)| *d);
    Ok(ObservationTable::single(series_id.as_str(), out))
}

/// FRED encodes missing observations as `"."`.
fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn filter_by_category(hits: Vec<SearchHit>, category: Option<&str>) -> Vec<SearchHit> {
    let Some(category) = category.filter(|c| !c.is_empty()) else {
        return hits;
    };
    let needle = category.to_lowercase();
    hits.into_iter()
        .filter(|hit| {
            hit.notes
                .as_deref()
                .is_some_and(|notes| notes.to_lowercase().contains(&needle))
        })
        .collect()
}

fn flatten_series_record(series_id: &SeriesId, body: &serde_json::Value) -> Result<SeriesInfo, AppError> {
    let record = body
        .get("seriess")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .and_then(|s| s.as_object())
        .ok_or_else(|| AppError::new(ErrorKind::NoData, format!("No metadata returned for series {series_id}.")))?;

    Ok(record
        .iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect())
}
