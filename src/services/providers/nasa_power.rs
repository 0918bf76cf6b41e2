/// NASA POWER climate provider
///
/// Pulls daily agroclimatology series for a point and reduces each one to its mean
/// over a trailing window. The window ends the day before the query so the current
/// (incomplete) day never contributes.
use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use chrono::{Days, NaiveDate, Utc};
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{ClimateSample, Coordinate},
    services::providers::ClimateSource,
};

/// POWER variable codes, in `ClimateSample` field order
const PARAMETER_CODES: [&str; 6] = [
    "T2M",
    "PRECTOTCORR",
    "ALLSKY_SFC_SW_DWN",
    "RH2M",
    "WS2M",
    "GWETPROF",
];

/// POWER marks missing days with this value
const FILL_VALUE: f64 = -999.0;

const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, BTreeMap<String, Option<f64>>>,
}

#[derive(Debug, Clone)]
pub struct ClimateClientSettings {
    pub base_url: String,
    pub community: String,
    pub window_days: u32,
    /// Total attempts, not additional ones
    pub max_retries: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for ClimateClientSettings {
    fn default() -> Self {
        Self {
            base_url: "https://power.larc.nasa.gov/api/temporal/daily/point".to_string(),
            community: "AG".to_string(),
            window_days: 365,
            max_retries: 3,
            backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Inclusive range of days averaged into one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ClimateWindow {
    /// `window_days` complete days ending the day before `today`
    pub fn ending_before(today: NaiveDate, window_days: u32) -> AppResult<Self> {
        if window_days == 0 {
            return Err(AppError::InvalidInput(
                "Climate window must span at least one day".to_string(),
            ));
        }

        let end = today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| AppError::InvalidInput(format!("No day before {}", today)))?;
        let start = end
            .checked_sub_days(Days::new(u64::from(window_days) - 1))
            .ok_or_else(|| {
                AppError::InvalidInput(format!("Window of {} days underflows", window_days))
            })?;

        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Clone)]
pub struct ClimateDataClient {
    http_client: HttpClient,
    settings: ClimateClientSettings,
}

impl ClimateDataClient {
    pub fn new(settings: ClimateClientSettings) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http_client,
            settings,
        })
    }

    pub fn settings(&self) -> &ClimateClientSettings {
        &self.settings
    }

    /// Runs the bounded retry loop for an explicit window
    pub async fn fetch_window(
        &self,
        coordinate: Coordinate,
        window: ClimateWindow,
    ) -> AppResult<ClimateSample> {
        let max_retries = self.settings.max_retries;
        let mut last_cause = "no attempt was made".to_string();

        for attempt in 1..=max_retries {
            tracing::info!(
                attempt,
                max_retries,
                latitude = coordinate.latitude(),
                longitude = coordinate.longitude(),
                start = %window.start,
                end = %window.end,
                "Requesting climate data"
            );

            match self.request_once(coordinate, window).await {
                Ok(sample) => return Ok(sample),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Climate data request failed");
                    last_cause = e.to_string();
                }
            }

            if attempt < max_retries {
                tracing::info!(
                    delay_ms = self.settings.backoff.as_millis() as u64,
                    "Retrying climate request"
                );
                tokio::time::sleep(self.settings.backoff).await;
            }
        }

        tracing::error!(
            attempts = max_retries,
            cause = %last_cause,
            "Giving up on climate data"
        );
        Err(AppError::DataUnavailable {
            attempts: max_retries,
            cause: last_cause,
        })
    }

    async fn request_once(
        &self,
        coordinate: Coordinate,
        window: ClimateWindow,
    ) -> AppResult<ClimateSample> {
        let parameters = PARAMETER_CODES.join(",");
        let longitude = coordinate.longitude().to_string();
        let latitude = coordinate.latitude().to_string();
        let start = window.start.format(DATE_FORMAT).to_string();
        let end = window.end.format(DATE_FORMAT).to_string();

        let response = self
            .http_client
            .get(&self.settings.base_url)
            .query(&[
                ("parameters", parameters.as_str()),
                ("community", self.settings.community.as_str()),
                ("longitude", longitude.as_str()),
                ("latitude", latitude.as_str()),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("format", "JSON"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, body = %body, "Climate API error body");
            return Err(AppError::ExternalApi(format!(
                "API returned status {}",
                status
            )));
        }

        let payload: PowerResponse = response.json().await?;
        let sample = summarize(&payload.properties.parameter, window)?;

        tracing::info!(
            temperature = sample.temperature,
            precipitation = sample.precipitation,
            provider = self.name(),
            "Climate data fetched"
        );

        Ok(sample)
    }
}

#[async_trait::async_trait]
impl ClimateSource for ClimateDataClient {
    async fn fetch(&self, coordinate: Coordinate) -> AppResult<ClimateSample> {
        let window = ClimateWindow::ending_before(Utc::now().date_naive(), self.settings.window_days)?;
        self.fetch_window(coordinate, window).await
    }

    fn name(&self) -> &'static str {
        "nasa_power"
    }
}

/// Reduces each daily series to its mean over complete days inside the window
fn summarize(
    parameter: &HashMap<String, BTreeMap<String, Option<f64>>>,
    window: ClimateWindow,
) -> AppResult<ClimateSample> {
    let mut means = [0.0; PARAMETER_CODES.len()];

    for (slot, code) in means.iter_mut().zip(PARAMETER_CODES) {
        let series = parameter.get(code).ok_or_else(|| {
            AppError::ExternalApi(format!("Response missing parameter {}", code))
        })?;
        *slot = series_mean(code, series, window)?;
    }

    let [temperature, precipitation, solar_radiation, humidity, wind_speed, soil_moisture] = means;
    Ok(ClimateSample {
        temperature,
        precipitation,
        solar_radiation,
        humidity,
        wind_speed,
        soil_moisture,
    })
}

fn series_mean(
    code: &str,
    series: &BTreeMap<String, Option<f64>>,
    window: ClimateWindow,
) -> AppResult<f64> {
    let mut sum = 0.0;
    let mut days = 0usize;

    for (key, value) in series {
        let date = NaiveDate::parse_from_str(key, DATE_FORMAT).map_err(|_| {
            AppError::ExternalApi(format!("Parameter {} has malformed date {:?}", code, key))
        })?;
        if !window.contains(date) {
            continue;
        }
        match value {
            Some(v) if v.is_finite() && *v != FILL_VALUE => {
                sum += v;
                days += 1;
            }
            _ => {}
        }
    }

    if days == 0 {
        return Err(AppError::ExternalApi(format!(
            "Parameter {} has no complete days in window",
            code
        )));
    }

    Ok(sum / days as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> ClimateWindow {
        ClimateWindow {
            start: date(2024, 1, 1),
            end: date(2024, 1, 3),
        }
    }

    fn series(values: &[(&str, Option<f64>)]) -> BTreeMap<String, Option<f64>> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn full_parameters() -> HashMap<String, BTreeMap<String, Option<f64>>> {
        PARAMETER_CODES
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let base = (i + 1) as f64;
                (
                    code.to_string(),
                    series(&[
                        ("20240101", Some(base)),
                        ("20240102", Some(base * 2.0)),
                        ("20240103", Some(base * 3.0)),
                    ]),
                )
            })
            .collect()
    }

    #[test]
    fn test_window_excludes_today() {
        let w = ClimateWindow::ending_before(date(2024, 3, 1), 365).unwrap();
        assert_eq!(w.end, date(2024, 2, 29));
        assert_eq!(w.start, date(2023, 3, 2));
        assert_eq!((w.end - w.start).num_days() + 1, 365);
        assert!(!w.contains(date(2024, 3, 1)));
    }

    #[test]
    fn test_zero_day_window_rejected() {
        assert!(matches!(
            ClimateWindow::ending_before(date(2024, 3, 1), 0),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_summarize_means_in_field_order() {
        let sample = summarize(&full_parameters(), window()).unwrap();

        assert_eq!(sample.temperature, 2.0);
        assert_eq!(sample.precipitation, 4.0);
        assert_eq!(sample.solar_radiation, 6.0);
        assert_eq!(sample.humidity, 8.0);
        assert_eq!(sample.wind_speed, 10.0);
        assert_eq!(sample.soil_moisture, 12.0);
    }

    #[test]
    fn test_summarize_skips_fill_values_and_out_of_window_days() {
        let mut parameters = full_parameters();
        parameters.insert(
            "T2M".to_string(),
            series(&[
                ("20231231", Some(100.0)),
                ("20240101", Some(10.0)),
                ("20240102", Some(FILL_VALUE)),
                ("20240103", None),
                ("20240104", Some(100.0)),
            ]),
        );

        let sample = summarize(&parameters, window()).unwrap();
        assert_eq!(sample.temperature, 10.0);
    }

    #[test]
    fn test_summarize_missing_parameter_is_structural_failure() {
        let mut parameters = full_parameters();
        parameters.remove("GWETPROF");

        let err = summarize(&parameters, window()).unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(msg) if msg.contains("GWETPROF")));
    }

    #[test]
    fn test_summarize_all_fill_values_is_failure() {
        let mut parameters = full_parameters();
        parameters.insert(
            "WS2M".to_string(),
            series(&[("20240101", Some(FILL_VALUE)), ("20240102", None)]),
        );

        assert!(summarize(&parameters, window()).is_err());
    }

    #[test]
    fn test_summarize_rejects_malformed_dates() {
        let mut parameters = full_parameters();
        parameters.insert("RH2M".to_string(), series(&[("2024-01-01", Some(1.0))]));

        assert!(summarize(&parameters, window()).is_err());
    }

    #[tokio::test]
    async fn test_zero_attempts_reports_unavailable() {
        let client = ClimateDataClient::new(ClimateClientSettings {
            max_retries: 0,
            ..ClimateClientSettings::default()
        })
        .unwrap();

        let err = client
            .fetch_window(Coordinate::new(0.0, 0.0).unwrap(), window())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable { attempts: 0, .. }));
    }
}
