//! Live market snapshot
//!
//! Pulls the intraday series for one index and reduces it to a single
//! reading. Failures never propagate: they become an unavailable snapshot
//! whose detail is shown to the model instead.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::TradingMateError;
use crate::models::MarketSnapshot;

pub const DEFAULT_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
pub const MARKET_DATA_EMPTY: &str = "Market data empty.";

/// Source of the per-turn market reading
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn snapshot(&self) -> MarketSnapshot;
}

/// Open and close columns of one chart series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    pub opens: Vec<Option<f64>>,
    pub closes: Vec<Option<f64>>,
}

impl PriceSeries {
    pub fn session_open(&self) -> Option<f64> {
        self.opens.iter().flatten().copied().next()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.closes.iter().flatten().copied().next_back()
    }
}

/// Reduce a series to a snapshot, or `None` when it carries no prices
pub fn snapshot_from_series(label: &str, series: &PriceSeries) -> Option<MarketSnapshot> {
    let open = series.session_open()?;
    let current = series.last_close()?;
    Some(MarketSnapshot::from_open_close(label, open, current))
}

/// Yahoo Finance chart endpoint
pub struct YahooFinanceSource {
    client: Client,
    base_url: String,
    symbol: String,
    label: String,
}

impl YahooFinanceSource {
    pub fn new(
        symbol: impl Into<String>,
        label: impl Into<String>,
        timeout: Duration,
    ) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(timeout)
            .user_agent(concat!("trading-mate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_CHART_URL.to_string(),
            symbol: symbol.into(),
            label: label.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_series(&self, range: &str, interval: &str) -> crate::Result<PriceSeries> {
        let url = format!("{}/{}", self.base_url, self.symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let body: ChartResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(TradingMateError::MarketData(format!(
                    "Quote provider returned {}",
                    status
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = body.chart.error {
            return Err(TradingMateError::MarketData(format!(
                "{}: {}",
                error.code.unwrap_or_default(),
                error.description.unwrap_or_default()
            )));
        }
        if !status.is_success() {
            return Err(TradingMateError::MarketData(format!(
                "Quote provider returned {}",
                status
            )));
        }

        Ok(series_from_chart(body.chart))
    }

    /// Intraday 1-minute bars first, daily bars when those are empty
    async fn try_snapshot(&self) -> crate::Result<MarketSnapshot> {
        let intraday = self.fetch_series("1d", "1m").await?;
        if let Some(snapshot) = snapshot_from_series(&self.label, &intraday) {
            return Ok(snapshot);
        }

        let daily = self.fetch_series("1d", "1d").await?;
        Ok(snapshot_from_series(&self.label, &daily)
            .unwrap_or_else(|| MarketSnapshot::unavailable(&self.label, MARKET_DATA_EMPTY)))
    }
}

#[async_trait]
impl MarketDataSource for YahooFinanceSource {
    async fn snapshot(&self) -> MarketSnapshot {
        match self.try_snapshot().await {
            Ok(snapshot) => {
                if snapshot.is_available() {
                    info!(symbol = %self.symbol, "Market snapshot: {}", snapshot);
                } else {
                    warn!(symbol = %self.symbol, "Market snapshot: {}", snapshot);
                }
                snapshot
            }
            Err(e) => {
                warn!(symbol = %self.symbol, "Market data fetch failed: {}", e);
                MarketSnapshot::unavailable(&self.label, e.to_string())
            }
        }
    }
}

fn series_from_chart(chart: Chart) -> PriceSeries {
    chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|result| result.indicators.quote.into_iter().next())
        .map(|quote| PriceSeries {
            opens: quote.open,
            closes: quote.close,
        })
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketReading;
    use crate::test_support::serve_local;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn parse(json: &str) -> PriceSeries {
        let body: ChartResponse = serde_json::from_str(json).unwrap();
        series_from_chart(body.chart)
    }

    #[test]
    fn test_series_from_chart_json() {
        let series = parse(
            r#"{"chart":{"result":[{"meta":{"symbol":"^NSEI"},"timestamp":[1,2,3],
            "indicators":{"quote":[{"open":[null,22000.0,22010.0],"close":[22005.0,22050.0,null],
            "high":[1,2,3],"low":[1,2,3],"volume":[0,0,0]}]}}],"error":null}}"#,
        );

        assert_eq!(series.session_open(), Some(22000.0));
        assert_eq!(series.last_close(), Some(22050.0));
    }

    #[test]
    fn test_snapshot_from_series() {
        let series = PriceSeries {
            opens: vec![Some(20000.0), Some(20100.0)],
            closes: vec![Some(20050.0), Some(20200.0)],
        };

        let snapshot = snapshot_from_series("Nifty", &series).unwrap();
        match snapshot.reading {
            MarketReading::Quote {
                current,
                change,
                pct_change,
            } => {
                assert_eq!(current, 20200.0);
                assert_eq!(change, 200.0);
                assert!((pct_change - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected reading: {:?}", other),
        }
    }

    #[test]
    fn test_empty_series() {
        let series = parse(r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#);
        assert!(snapshot_from_series("Nifty", &series).is_none());

        let no_result = parse(r#"{"chart":{"result":null,"error":null}}"#);
        assert!(snapshot_from_series("Nifty", &no_result).is_none());

        let opens_only = PriceSeries {
            opens: vec![Some(100.0)],
            closes: vec![None],
        };
        assert!(snapshot_from_series("Nifty", &opens_only).is_none());
    }

    fn chart_body(opens: &[f64], closes: &[f64]) -> Value {
        json!({
            "chart": {
                "result": [{ "indicators": { "quote": [{ "open": opens, "close": closes }] } }],
                "error": null
            }
        })
    }

    /// Stub chart endpoint answering per `interval`; records each interval requested
    async fn chart_stub(
        by_interval: HashMap<&'static str, Value>,
    ) -> (YahooFinanceSource, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        let router = Router::new().route(
            "/chart/:symbol",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let by_interval = by_interval.clone();
                let log = log.clone();
                async move {
                    let interval = params.get("interval").cloned().unwrap_or_default();
                    log.lock().unwrap().push(interval.clone());
                    Json(
                        by_interval
                            .get(interval.as_str())
                            .cloned()
                            .unwrap_or_else(|| chart_body(&[], &[])),
                    )
                }
            }),
        );

        let base_url = serve_local(router).await.unwrap();
        let source = YahooFinanceSource::new("NSEI", "Nifty", Duration::from_secs(5))
            .unwrap()
            .with_base_url(format!("{}/chart", base_url));
        (source, seen)
    }

    #[tokio::test]
    async fn test_intraday_used_when_present() {
        let (source, seen) = chart_stub(HashMap::from([
            ("1m", chart_body(&[22000.0, 22010.0], &[22005.0, 22110.0])),
            ("1d", chart_body(&[1.0], &[2.0])),
        ]))
        .await;

        let snapshot = source.snapshot().await;
        assert_eq!(snapshot.status_line(), "Nifty 22110.00 (+110.00, +0.50%)");
        assert_eq!(*seen.lock().unwrap(), vec!["1m"]);
    }

    #[tokio::test]
    async fn test_empty_intraday_falls_back_to_daily() {
        let (source, seen) = chart_stub(HashMap::from([
            ("1m", chart_body(&[], &[])),
            ("1d", chart_body(&[100.0], &[101.0])),
        ]))
        .await;

        let snapshot = source.snapshot().await;
        assert_eq!(snapshot.status_line(), "Nifty 101.00 (+1.00, +1.00%)");
        assert_eq!(*seen.lock().unwrap(), vec!["1m", "1d"]);
    }

    #[tokio::test]
    async fn test_both_series_empty_reports_market_data_empty() {
        let (source, seen) = chart_stub(HashMap::from([
            ("1m", chart_body(&[], &[])),
            ("1d", chart_body(&[], &[])),
        ]))
        .await;

        let snapshot = source.snapshot().await;
        assert_eq!(
            snapshot.status_line(),
            "Nifty data unavailable (Market data empty.)"
        );
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_plain_text_error_keeps_status() {
        let router = Router::new().route(
            "/chart/:symbol",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests") }),
        );
        let base_url = serve_local(router).await.unwrap();
        let source = YahooFinanceSource::new("NSEI", "Nifty", Duration::from_secs(5))
            .unwrap()
            .with_base_url(format!("{}/chart", base_url));

        let snapshot = source.snapshot().await;
        assert!(!snapshot.is_available());
        assert_eq!(
            snapshot.status_line(),
            "Nifty data unavailable (Market data error: Quote provider returned 429 Too Many Requests)"
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_degrades_to_unavailable() {
        let source = YahooFinanceSource::new("^NSEI", "Nifty", Duration::from_millis(200))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let snapshot = source.snapshot().await;
        assert!(!snapshot.is_available());
        assert_eq!(snapshot.label, "Nifty");
    }
}
