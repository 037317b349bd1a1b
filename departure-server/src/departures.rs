//! Real-time departure lookups with caching.
//!
//! A lookup runs through these steps, in this order:
//!
//! 1. If a timetable for the query is cached, select from it. Done if that
//!    works.
//! 2. If selection from the cached timetable failed, check the threshold
//!    cache. If this key already re-fetched within the threshold window,
//!    give up with the selection failure. Otherwise mark the key and go on.
//! 3. Fetch a fresh timetable, cache it, and select from it. A failure here
//!    is final.
//!
//! Step 2 means a stale or empty cached timetable causes at most one
//! upstream request per key per [`THRESHOLD_TTL`], however often the device
//! polls.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::ExpiringMap;
use crate::clock::Clock;
use crate::display::{DisplayFormatter, DisplayPayload};
use crate::domain::{DepartureError, Query, cache_ttl};
use crate::selector::select_next;
use crate::sl::{TimetableResponse, TimetableSource};

/// How long a failed re-parse suppresses further re-fetches for a key.
pub const THRESHOLD_TTL: Duration = Duration::from_secs(30 * 60);

/// Cached timetables, keyed by [`Query::cache_key`].
pub type TimetableCache = ExpiringMap<String, Arc<TimetableResponse>>;

/// Re-fetch markers, keyed by [`Query::cache_key`].
pub type ThresholdCache = ExpiringMap<String, ()>;

/// Answers "how long until the next departure?" for queries.
pub struct RealTimeDepartures<S> {
    source: S,
    timetables: TimetableCache,
    thresholds: ThresholdCache,
    formatter: Arc<dyn DisplayFormatter>,
    clock: Arc<dyn Clock>,
}

impl<S: TimetableSource> RealTimeDepartures<S> {
    /// Create a lookup service.
    ///
    /// Both caches should read time from the same `clock`.
    pub fn new(
        source: S,
        timetables: TimetableCache,
        thresholds: ThresholdCache,
        formatter: Arc<dyn DisplayFormatter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            timetables,
            thresholds,
            formatter,
            clock,
        }
    }

    /// Look up the next departure and format it for the device.
    ///
    /// Failures are formatted too and returned as `Err`.
    pub async fn execute(&self, query: &Query) -> Result<DisplayPayload, DisplayPayload> {
        match self.next_departure(query).await {
            Ok(tokens) => Ok(self.formatter.create_response(&tokens, query.transport_mode)),
            Err(e) => Err(self.formatter.create_error(&e, query.transport_mode)),
        }
    }

    /// Look up the next departure as display tokens.
    pub async fn next_departure(&self, query: &Query) -> Result<Vec<String>, DepartureError> {
        let key = query.cache_key();

        let Some(cached) = self.timetables.get(&key).await else {
            return self.fetch_and_select(query, key).await;
        };

        debug!(key = %key, "found cached timetable");
        let error = match select_next(&cached, query, self.clock.now()) {
            Ok(tokens) => return Ok(tokens),
            Err(e) => e,
        };

        if self.thresholds.get(&key).await.is_some() {
            info!(key = %key, %error, "cached timetable unusable and re-fetch threshold reached");
            return Err(error);
        }

        self.thresholds.put(key.clone(), (), THRESHOLD_TTL).await;
        debug!(size = self.thresholds.size(), "threshold cache size");
        info!(key = %key, %error, "cached timetable unusable, fetching new data");

        self.fetch_and_select(query, key).await
    }

    /// Fetch a fresh timetable, cache it, and select from it.
    async fn fetch_and_select(
        &self,
        query: &Query,
        key: String,
    ) -> Result<Vec<String>, DepartureError> {
        let json = self
            .source
            .fetch_departures(&query.site_id)
            .await
            .map_err(|e| {
                warn!(site_id = %query.site_id, error = %e, "failed to fetch departures");
                DepartureError::UpstreamUnavailable
            })?;

        let timetable: TimetableResponse = serde_json::from_value(json).map_err(|e| {
            warn!(site_id = %query.site_id, error = %e, "failed to decode departures");
            DepartureError::UpstreamUnavailable
        })?;

        if timetable.status_code > 0 {
            warn!(
                site_id = %query.site_id,
                status_code = timetable.status_code,
                message = timetable.message.as_deref().unwrap_or(""),
                "SL returned an error status"
            );
        }

        let now = self.clock.now();
        let ttl = cache_ttl(now);
        info!(ttl_mins = ttl.as_secs() / 60, "caching timetable");

        let timetable = Arc::new(timetable);
        self.timetables.put(key, timetable.clone(), ttl).await;
        debug!(size = self.timetables.size(), "timetable cache size");

        select_next(&timetable, query, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::clock::ManualClock;
    use crate::display::FramesFormatter;
    use crate::domain::TransportMode;
    use crate::sl::SlError;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test source that serves a swappable response and counts requests.
    struct CountingSource {
        response: Mutex<Option<serde_json::Value>>,
        calls: AtomicUsize,
        site_ids: Mutex<Vec<String>>,
    }

    impl CountingSource {
        fn new(response: Option<serde_json::Value>) -> Self {
            Self {
                response: Mutex::new(response),
                calls: AtomicUsize::new(0),
                site_ids: Mutex::new(Vec::new()),
            }
        }

        fn set(&self, response: Option<serde_json::Value>) {
            *self.response.lock().unwrap() = response;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TimetableSource for Arc<CountingSource> {
        async fn fetch_departures(&self, site_id: &str) -> Result<serde_json::Value, SlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.site_ids.lock().unwrap().push(site_id.to_string());
            self.response.lock().unwrap().clone().ok_or(SlError::Api {
                status: 503,
                message: "unavailable".into(),
            })
        }
    }

    /// 14:00 Stockholm (winter), outside the morning rush.
    fn afternoon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 13, 0, 0).unwrap()
    }

    /// SL-style timetable of `(line, minutes after 14:00 local, direction)` buses.
    fn bus_json(departures: &[(&str, i64, u32)]) -> serde_json::Value {
        let buses: Vec<_> = departures
            .iter()
            .map(|(line, mins, direction)| {
                let local = afternoon().with_timezone(&crate::domain::TRANSIT_TZ)
                    + ChronoDuration::minutes(*mins);
                serde_json::json!({
                    "LineNumber": line,
                    "ExpectedDateTime": local.naive_local().format("%Y-%m-%dT%H:%M:%S").to_string(),
                    "JourneyDirection": direction,
                    "Destination": "Slussen",
                })
            })
            .collect();
        serde_json::json!({
            "StatusCode": 0,
            "ResponseData": { "Buses": buses, "Metros": [] }
        })
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        source: Arc<CountingSource>,
        departures: RealTimeDepartures<Arc<CountingSource>>,
    }

    fn fixture(response: Option<serde_json::Value>) -> Fixture {
        let clock = Arc::new(ManualClock::new(afternoon()));
        let source = Arc::new(CountingSource::new(response));
        let config = CacheConfig::default();
        let departures = RealTimeDepartures::new(
            source.clone(),
            ExpiringMap::new(&config, clock.clone()),
            ExpiringMap::new(&config, clock.clone()),
            Arc::new(FramesFormatter::new()),
            clock.clone(),
        );
        Fixture {
            clock,
            source,
            departures,
        }
    }

    fn bus_query() -> Query {
        Query::new("9192", TransportMode::Bus, 1)
    }

    #[tokio::test]
    async fn cache_miss_fetches_once_and_caches() {
        let f = fixture(Some(bus_json(&[("55", 4, 1)])));
        let query = bus_query();

        let tokens = f.departures.next_departure(&query).await.unwrap();
        assert_eq!(tokens, vec!["4 min"]);
        assert_eq!(f.source.calls(), 1);
        assert_eq!(*f.source.site_ids.lock().unwrap(), vec!["9192"]);
        assert!(f.departures.timetables.get(&query.cache_key()).await.is_some());
    }

    #[tokio::test]
    async fn cache_hit_skips_upstream() {
        let f = fixture(Some(bus_json(&[("55", 4, 1)])));
        let query = bus_query();

        f.departures.next_departure(&query).await.unwrap();
        f.clock.advance(ChronoDuration::minutes(1));
        let tokens = f.departures.next_departure(&query).await.unwrap();

        assert_eq!(tokens, vec!["3 min"]);
        assert_eq!(f.source.calls(), 1);
    }

    #[tokio::test]
    async fn cached_timetable_expires_after_ttl() {
        let f = fixture(Some(bus_json(&[("55", 45, 1)])));
        let query = bus_query();

        f.departures.next_departure(&query).await.unwrap();
        f.clock.advance(ChronoDuration::minutes(30));
        f.departures.next_departure(&query).await.unwrap();

        assert_eq!(f.source.calls(), 2);
    }

    #[tokio::test]
    async fn morning_timetables_expire_sooner() {
        let f = fixture(Some(bus_json(&[("55", 45, 1)])));
        // 07:00 Stockholm (winter).
        f.clock.set(Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap());
        let query = bus_query();

        f.departures.next_departure(&query).await.ok();
        f.clock.advance(ChronoDuration::minutes(9));
        f.departures.next_departure(&query).await.ok();
        assert_eq!(f.source.calls(), 1);

        f.clock.advance(ChronoDuration::minutes(1));
        f.departures.next_departure(&query).await.ok();
        assert_eq!(f.source.calls(), 2);
    }

    #[tokio::test]
    async fn bad_cached_timetable_refetches_once_per_threshold_window() {
        // The only departure leaves in 2 minutes; once it has gone, the cached
        // timetable has nothing to offer.
        let f = fixture(Some(bus_json(&[("55", 2, 1)])));
        let query = bus_query();

        assert!(f.departures.next_departure(&query).await.is_ok());
        assert_eq!(f.source.calls(), 1);

        f.clock.advance(ChronoDuration::minutes(5));

        // First failure: one re-fetch, marker set. Upstream still has stale data.
        assert_eq!(
            f.departures.next_departure(&query).await,
            Err(DepartureError::NoQualifyingDeparture)
        );
        assert_eq!(f.source.calls(), 2);
        assert!(f.departures.thresholds.get(&query.cache_key()).await.is_some());

        // Second failure within the window: no upstream request.
        f.clock.advance(ChronoDuration::minutes(1));
        assert_eq!(
            f.departures.next_departure(&query).await,
            Err(DepartureError::NoQualifyingDeparture)
        );
        assert_eq!(f.source.calls(), 2);
    }

    #[tokio::test]
    async fn threshold_marker_expires() {
        let f = fixture(Some(bus_json(&[("55", 2, 1)])));
        let query = bus_query();
        f.departures.next_departure(&query).await.ok();

        f.clock.advance(ChronoDuration::minutes(5));
        f.departures.next_departure(&query).await.ok();
        assert_eq!(f.source.calls(), 2);

        // Past the timetable TTL the cache misses and fetches regardless.
        f.clock.advance(ChronoDuration::minutes(31));
        f.departures.next_departure(&query).await.ok();
        assert_eq!(f.source.calls(), 3);
        assert!(f.departures.thresholds.get(&query.cache_key()).await.is_none());
    }

    #[tokio::test]
    async fn refetch_can_recover() {
        let f = fixture(Some(bus_json(&[("55", 2, 1)])));
        let query = bus_query();
        f.departures.next_departure(&query).await.ok();

        f.clock.advance(ChronoDuration::minutes(5));
        f.source.set(Some(bus_json(&[("55", 12, 1)])));

        let tokens = f.departures.next_departure(&query).await.unwrap();
        assert_eq!(tokens, vec!["7 min"]);
        assert_eq!(f.source.calls(), 2);
    }

    #[tokio::test]
    async fn live_fetch_selection_failure_does_not_touch_threshold() {
        let f = fixture(Some(bus_json(&[("55", 4, 2)])));
        let query = bus_query();

        assert_eq!(
            f.departures.next_departure(&query).await,
            Err(DepartureError::NoQualifyingDeparture)
        );
        assert!(f.departures.thresholds.get(&query.cache_key()).await.is_none());
        assert!(f.departures.timetables.get(&query.cache_key()).await.is_some());
    }

    #[tokio::test]
    async fn no_departures_for_mode_propagates() {
        let f = fixture(Some(bus_json(&[("55", 4, 1)])));
        let query = Query::new("9192", TransportMode::Metro, 1);
        assert_eq!(
            f.departures.next_departure(&query).await,
            Err(DepartureError::NoDeparturesForMode)
        );
    }

    #[tokio::test]
    async fn fetch_failure_is_upstream_unavailable() {
        let f = fixture(None);
        assert_eq!(
            f.departures.next_departure(&bus_query()).await,
            Err(DepartureError::UpstreamUnavailable)
        );
        assert!(f.departures.timetables.get(&bus_query().cache_key()).await.is_none());
    }

    #[tokio::test]
    async fn undecodable_response_is_upstream_unavailable() {
        let f = fixture(Some(serde_json::json!({"unexpected": true})));
        assert_eq!(
            f.departures.next_departure(&bus_query()).await,
            Err(DepartureError::UpstreamUnavailable)
        );
        assert!(f.departures.timetables.get(&bus_query().cache_key()).await.is_none());
    }

    #[tokio::test]
    async fn malformed_entry_in_another_mode_is_ignored() {
        let mut json = bus_json(&[("55", 4, 1)]);
        json["ResponseData"]["Ships"] = serde_json::json!([
            {"LineNumber": "80", "ExpectedDateTime": null, "JourneyDirection": 1}
        ]);
        let f = fixture(Some(json));
        let query = bus_query();

        assert_eq!(
            f.departures.next_departure(&query).await,
            Ok(vec!["4 min".to_string()])
        );
        assert_eq!(
            f.departures.next_departure(&query).await,
            Ok(vec!["4 min".to_string()])
        );
        assert_eq!(f.source.calls(), 1);
        assert!(f.departures.timetables.get(&query.cache_key()).await.is_some());
    }

    #[tokio::test]
    async fn error_status_is_still_cached() {
        let f = fixture(Some(serde_json::json!({
            "StatusCode": 1006,
            "Message": "Site not found",
            "ResponseData": null
        })));
        assert_eq!(
            f.departures.next_departure(&bus_query()).await,
            Err(DepartureError::NoDeparturesForMode)
        );
        assert!(f.departures.timetables.get(&bus_query().cache_key()).await.is_some());
    }

    #[tokio::test]
    async fn execute_formats_success() {
        let f = fixture(Some(bus_json(&[("55", 4, 1)])));
        let query = bus_query().with_display_line_number(true);

        let payload = f.departures.execute(&query).await.unwrap();
        let texts: Vec<&str> = payload.frames.iter().map(|fr| fr.text.as_str()).collect();
        assert_eq!(texts, vec!["55", "4 min", "55", "4 min", "55", "4 min"]);
    }

    #[tokio::test]
    async fn execute_formats_failure() {
        let f = fixture(None);
        let payload = f.departures.execute(&bus_query()).await.unwrap_err();
        assert_eq!(payload.frames.len(), 1);
        assert_eq!(payload.frames[0].text, "Misslyckades att hämta information från SL");
    }

    #[tokio::test]
    async fn concurrent_misses_may_both_fetch() {
        let f = fixture(Some(bus_json(&[("55", 4, 1)])));
        let query = bus_query();

        let results =
            futures::future::join_all((0..4).map(|_| f.departures.next_departure(&query))).await;

        assert!(results.iter().all(|r| *r == Ok(vec!["4 min".to_string()])));
        assert!((1..=4).contains(&f.source.calls()));
    }
}
