//! `exchange` chat command.
//!
//! A client that sends `exchange [days] [currencies...]` gets the bank's
//! sale and purchase rates for the last `days` days (today first) instead
//! of a relay of its text. `EUR` and `USD` are always reported; extra
//! currency codes are added case-insensitively. The reply is plain text,
//! one line per date and currency:
//!
//! ```text
//! 02.01.2025 EUR sale 44.1 purchase 43.3
//! 02.01.2025 USD sale 42.3 purchase null
//! ```
//!
//! Each day is one HTTP request; the days are fetched concurrently. A day
//! whose request fails is logged and left out of the reply.

// ============================================================================
// Imports
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{Days, Local, NaiveDate};
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, error, warn};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default rates endpoint (PrivatBank archive API).
pub(crate) const DEFAULT_RATES_URL: &str = "https://api.privatbank.ua/p24api/exchange_rates";

/// Command keyword, matched case-insensitively.
const COMMAND: &str = "exchange";

/// Upper bound and fallback for the number of days.
const MAX_DAYS: u32 = 10;

/// Currencies included in every report.
const BASE_CURRENCIES: [&str; 2] = ["EUR", "USD"];

/// Date format the rates API expects.
const DATE_FORMAT: &str = "%d.%m.%Y";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// ExchangeRequest
// ============================================================================

/// Parsed `exchange` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExchangeRequest {
    /// Number of days to report, `0..=10`.
    pub(crate) days: u32,
    /// Upper-case currency codes, always including `EUR` and `USD`.
    pub(crate) currencies: BTreeSet<String>,
}

impl ExchangeRequest {
    /// Parses `text` if its first word is the `exchange` command.
    ///
    /// Words are separated by single spaces, so doubled spaces produce
    /// empty parameters.
    pub(crate) fn from_command(text: &str) -> Option<Self> {
        let mut words = text.split(' ');
        let command = words.next()?;
        if !command.eq_ignore_ascii_case(COMMAND) {
            return None;
        }

        let params: Vec<&str> = words.collect();
        Some(Self::from_params(&params))
    }

    /// Builds a request from the words following the command.
    ///
    /// The first word is the day count, capped at 10. When it is missing
    /// or not a number, 10 days are used and the remaining words are
    /// ignored.
    pub(crate) fn from_params(params: &[&str]) -> Self {
        let mut currencies: BTreeSet<String> =
            BASE_CURRENCIES.iter().map(|code| (*code).to_owned()).collect();

        let days = match params.split_first() {
            Some((first, rest)) => match first.parse::<i64>() {
                Ok(days) => {
                    currencies.extend(
                        rest.iter()
                            .filter(|code| !code.is_empty())
                            .map(|code| code.to_uppercase()),
                    );
                    u32::try_from(days.clamp(0, i64::from(MAX_DAYS))).unwrap_or(MAX_DAYS)
                }
                Err(_) => {
                    warn!(value = %first, "Invalid day count, using {MAX_DAYS}");
                    MAX_DAYS
                }
            },
            None => {
                warn!("Missing day count, using {MAX_DAYS}");
                MAX_DAYS
            }
        };

        Self { days, currencies }
    }
}

// ============================================================================
// Rates
// ============================================================================

/// One currency's rates. Missing or zero values are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rate {
    pub(crate) sale: Option<f64>,
    pub(crate) purchase: Option<f64>,
}

/// Rates for one date, keyed by currency code.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DayRates {
    pub(crate) date: String,
    pub(crate) rates: BTreeMap<String, Rate>,
}

/// Response body for one date.
#[derive(Debug, Deserialize)]
struct DayResponse {
    #[serde(rename = "exchangeRate", default)]
    exchange_rate: Vec<RateEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateEntry {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    sale_rate: Option<f64>,
    #[serde(default)]
    purchase_rate: Option<f64>,
}

/// Keeps the entries for `currencies`.
fn parse_rates(response: DayResponse, date: String, currencies: &BTreeSet<String>) -> DayRates {
    let nonzero = |value: Option<f64>| value.filter(|v| *v != 0.0);

    let rates = response
        .exchange_rate
        .into_iter()
        .filter_map(|entry| {
            let currency = entry.currency?;
            currencies.contains(&currency).then(|| {
                let rate = Rate {
                    sale: nonzero(entry.sale_rate),
                    purchase: nonzero(entry.purchase_rate),
                };
                (currency, rate)
            })
        })
        .collect();

    DayRates { date, rates }
}

/// Renders rates as plain text, one line per date and currency.
pub(crate) fn render(days: &[DayRates]) -> String {
    fn value(rate: Option<f64>) -> String {
        rate.map_or_else(|| "null".to_owned(), |v| v.to_string())
    }

    let lines: Vec<String> = days
        .iter()
        .flat_map(|day| {
            day.rates.iter().map(move |(currency, rate)| {
                format!(
                    "{} {currency} sale {} purchase {}",
                    day.date,
                    value(rate.sale),
                    value(rate.purchase)
                )
            })
        })
        .collect();

    if lines.is_empty() {
        "no exchange rates available".to_owned()
    } else {
        lines.join("\n")
    }
}

// ============================================================================
// RatesClient
// ============================================================================

/// HTTP client for the rates API.
#[derive(Debug, Clone)]
pub(crate) struct RatesClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RatesClient {
    /// Creates a client for the endpoint at `base_url`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `base_url` is not an absolute URL
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub(crate) fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid rates URL '{base_url}': {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Fetches the report for `request`, ending today.
    pub(crate) async fn fetch(&self, request: &ExchangeRequest) -> Vec<DayRates> {
        self.fetch_ending(Local::now().date_naive(), request).await
    }

    /// Fetches the report for `request`, ending at `end`.
    pub(crate) async fn fetch_ending(
        &self,
        end: NaiveDate,
        request: &ExchangeRequest,
    ) -> Vec<DayRates> {
        let dates: Vec<String> = (0..request.days)
            .filter_map(|offset| end.checked_sub_days(Days::new(u64::from(offset))))
            .map(|date| date.format(DATE_FORMAT).to_string())
            .collect();

        debug!(days = dates.len(), currencies = ?request.currencies, "Fetching exchange rates");

        let lookups = dates
            .into_iter()
            .map(|date| self.fetch_day(date, &request.currencies));

        join_all(lookups).await.into_iter().flatten().collect()
    }

    async fn fetch_day(&self, date: String, currencies: &BTreeSet<String>) -> Option<DayRates> {
        match self.request_day(&date).await {
            Ok(response) => Some(parse_rates(response, date, currencies)),
            Err(e) => {
                error!(%date, error = %e, "Exchange rate request failed");
                None
            }
        }
    }

    async fn request_day(&self, date: &str) -> Result<DayResponse> {
        let response = self
            .http
            .get(self.base_url.clone())
            .query(&[("json", ""), ("date", date)])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<DayResponse>().await?)
    }
}

// ============================================================================
// Tests
// ============================================================================
