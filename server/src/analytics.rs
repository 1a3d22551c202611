//! Visitor analytics aggregation over the event store.
//!
//! Every per-collection read is an explicit `Result` collapsed to an
//! empty set with a logged warning at the aggregation boundary, so a
//! broken collection degrades that slice of the dashboard instead of
//! failing the whole request. Page views on the admin page are excluded
//! from all visitor and page metrics but kept in the raw pass-through
//! arrays.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use kernel::{
    CollectionClear, CountEntry, DailyStat, DashboardData, DashboardMetrics, DeviceSplit,
    ImageStat, PageView, PeriodStats, SummaryData, TrafficSources,
};
use regex::Regex;

use crate::domain::EventStore;

/// Record cap applied to dashboard pass-through queries.
pub const DASHBOARD_CAP: usize = 1000;

const TOP_ENTRIES: usize = 10;
const ADMIN_PAGE: &str = "admin";

/// The six analytics collections swept by the clear operation, in
/// sweep order.
pub const COLLECTIONS: [&str; 6] = [
    "pageViews",
    "imageViews",
    "interactions",
    "sessions",
    "visitors",
    "dailyStats",
];

static MOBILE_AGENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)mobile|android|iphone|ipad|ipod|blackberry|iemobile|opera mini")
        .expect("mobile agent pattern")
});

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimeRange {
    OneDay,
    SevenDays,
    ThirtyDays,
    NinetyDays,
}

impl TimeRange {
    /// Parses `1d|7d|30d|90d`; anything else falls back to `7d`.
    pub fn parse(value: &str) -> Self {
        match value {
            "1d" => Self::OneDay,
            "30d" => Self::ThirtyDays,
            "90d" => Self::NinetyDays,
            _ => Self::SevenDays,
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            Self::OneDay => Duration::days(1),
            Self::SevenDays => Duration::days(7),
            Self::ThirtyDays => Duration::days(30),
            Self::NinetyDays => Duration::days(90),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::NinetyDays => "90d",
        }
    }
}

/// Day-over-day growth as a rounded percentage. A zero baseline maps
/// to 100 when anything grew and 0 otherwise, by convention.
pub fn calculate_growth(current: u64, previous: u64) -> i64 {
    if previous == 0 {
        return if current > 0 { 100 } else { 0 };
    }
    let ratio = (current as f64 - previous as f64) / previous as f64 * 100.0;
    ratio.round() as i64
}

fn is_admin_page(page_name: &str) -> bool {
    page_name.eq_ignore_ascii_case(ADMIN_PAGE)
}

fn is_mobile(user_agent: &str) -> bool {
    MOBILE_AGENT.is_match(user_agent)
}

fn or_empty<T, E: Display>(result: Result<Vec<T>, E>, what: &str) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("{what} query failed, treating as empty: {e}");
            Vec::new()
        }
    }
}

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

fn period_stats<E: EventStore>(
    store: &mut E,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> PeriodStats {
    let page_views = or_empty(store.page_views_between(start, end, usize::MAX), "page views");
    let image_views = or_empty(
        store.image_views_between(start, end, usize::MAX),
        "image views",
    );
    let interactions = or_empty(
        store.interactions_between(start, end, usize::MAX),
        "interactions",
    );

    let non_admin: Vec<&PageView> = page_views
        .iter()
        .filter(|view| !is_admin_page(&view.page_name))
        .collect();
    let visitors: HashSet<&str> = non_admin
        .iter()
        .map(|view| view.visitor_id.as_str())
        .collect();

    PeriodStats {
        page_views: non_admin.len() as u64,
        image_views: image_views.len() as u64,
        interactions: interactions.len() as u64,
        unique_visitors: visitors.len() as u64,
    }
}

/// Today / yesterday / last-week counters with growth computed today
/// against yesterday.
pub fn summary<E: EventStore>(store: &mut E, now: DateTime<Utc>) -> SummaryData {
    let start_today = start_of_day(now);
    let start_tomorrow = start_today + Duration::days(1);
    let start_yesterday = start_today - Duration::days(1);
    let week_ago = now - Duration::days(7);

    let today = period_stats(store, start_today, start_tomorrow);
    let yesterday = period_stats(store, start_yesterday, start_today);
    let last_week = period_stats(store, week_ago, start_tomorrow);

    SummaryData {
        page_views_growth: calculate_growth(today.page_views, yesterday.page_views),
        image_views_growth: calculate_growth(today.image_views, yesterday.image_views),
        visitors_growth: calculate_growth(today.unique_visitors, yesterday.unique_visitors),
        today,
        yesterday,
        last_week,
    }
}

/// Full dashboard for one time range: aggregated metrics plus the raw
/// capped event arrays.
pub fn dashboard<E: EventStore>(
    store: &mut E,
    range: TimeRange,
    now: DateTime<Utc>,
) -> DashboardData {
    let start = now - range.duration();
    let page_views = or_empty(
        store.page_views_between(start, now, DASHBOARD_CAP),
        "page views",
    );
    let image_views = or_empty(
        store.image_views_between(start, now, DASHBOARD_CAP),
        "image views",
    );
    let interactions = or_empty(
        store.interactions_between(start, now, DASHBOARD_CAP),
        "interactions",
    );

    let non_admin: Vec<&PageView> = page_views
        .iter()
        .filter(|view| !is_admin_page(&view.page_name))
        .collect();

    let unique_visitors: HashSet<&str> = non_admin
        .iter()
        .map(|view| view.visitor_id.as_str())
        .collect();
    let unique_sessions: HashSet<&str> = non_admin
        .iter()
        .map(|view| view.session_id.as_str())
        .collect();

    let mut traffic = TrafficSources::default();
    let mut devices = DeviceSplit::default();
    for view in &non_admin {
        match view.referrer.as_deref() {
            Some(referrer) if !referrer.is_empty() => traffic.referral += 1,
            _ => traffic.direct += 1,
        }
        match view.user_agent.as_deref() {
            Some(agent) if is_mobile(agent) => devices.mobile += 1,
            _ => devices.desktop += 1,
        }
    }

    let metrics = DashboardMetrics {
        total_page_views: non_admin.len() as u64,
        total_image_views: image_views.len() as u64,
        total_interactions: interactions.len() as u64,
        unique_visitors: unique_visitors.len() as u64,
        unique_sessions: unique_sessions.len() as u64,
        popular_pages: top_counts(non_admin.iter().map(|v| v.page_name.as_str()), TOP_ENTRIES),
        popular_images: top_counts(
            image_views.iter().map(|v| v.image_title.as_str()),
            TOP_ENTRIES,
        ),
        traffic_sources: traffic,
        devices,
        interaction_types: top_counts(
            interactions.iter().map(|i| i.interaction_type.as_str()),
            usize::MAX,
        ),
    };

    DashboardData {
        metrics,
        page_views,
        image_views,
        interactions,
        time_range: range.as_str().to_owned(),
        start_date: start,
        end_date: now,
    }
}

/// View counts per image title over the whole collection, descending.
pub fn image_stats<E: EventStore>(store: &mut E, limit: usize, now: DateTime<Utc>) -> Vec<ImageStat> {
    let views = or_empty(
        store.image_views_between(DateTime::UNIX_EPOCH, now, usize::MAX),
        "image views",
    );
    top_counts(views.iter().map(|v| v.image_title.as_str()), limit)
        .into_iter()
        .map(|entry| ImageStat {
            title: entry.name,
            views: entry.count,
        })
        .collect()
}

/// Per-day counters for the last `days` days, oldest first, zero-filled
/// for days without traffic.
pub fn daily_stats<E: EventStore>(store: &mut E, days: u32, now: DateTime<Utc>) -> Vec<DailyStat> {
    let days = days.max(1);
    let end = start_of_day(now) + Duration::days(1);
    let start = end - Duration::days(i64::from(days));

    let page_views = or_empty(store.page_views_between(start, end, usize::MAX), "page views");
    let image_views = or_empty(
        store.image_views_between(start, end, usize::MAX),
        "image views",
    );

    let mut by_day: HashMap<String, (u64, u64, HashSet<String>)> = HashMap::new();
    for view in &page_views {
        if is_admin_page(&view.page_name) {
            continue;
        }
        let day = view.timestamp.date_naive().to_string();
        let entry = by_day.entry(day).or_default();
        entry.0 += 1;
        entry.2.insert(view.visitor_id.clone());
    }
    for view in &image_views {
        let day = view.timestamp.date_naive().to_string();
        by_day.entry(day).or_default().1 += 1;
    }

    (0..days)
        .map(|offset| {
            let date = (start + Duration::days(i64::from(offset)))
                .date_naive()
                .to_string();
            match by_day.get(&date) {
                Some((pages, images, visitors)) => DailyStat {
                    date,
                    page_views: *pages,
                    image_views: *images,
                    unique_visitors: visitors.len() as u64,
                },
                None => DailyStat {
                    date,
                    page_views: 0,
                    image_views: 0,
                    unique_visitors: 0,
                },
            }
        })
        .collect()
}

/// Best-effort sweep of all six collections. A collection that fails
/// to clear is reported with zero deletions and the sweep continues.
pub fn clear_all<E: EventStore>(store: &mut E) -> (Vec<CollectionClear>, u64) {
    let mut results = Vec::with_capacity(COLLECTIONS.len());
    let mut total = 0u64;
    for collection in COLLECTIONS {
        let deleted = match store.clear_collection(collection) {
            Ok(count) => count as u64,
            Err(e) => {
                tracing::warn!("clearing '{collection}' failed: {e}");
                0
            }
        };
        total += deleted;
        results.push(CollectionClear {
            collection: collection.to_owned(),
            deleted,
        });
    }
    (results, total)
}

/// Frequency ranking preserving first-seen order for ties: counts are
/// accumulated in encounter order and the sort is stable.
fn top_counts<'a>(items: impl Iterator<Item = &'a str>, cap: usize) -> Vec<CountEntry> {
    let mut order: Vec<CountEntry> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();
    for item in items {
        match index_by_name.get(item) {
            Some(&ix) => order[ix].count += 1,
            None => {
                index_by_name.insert(item.to_owned(), order.len());
                order.push(CountEntry {
                    name: item.to_owned(),
                    count: 1,
                });
            }
        }
    }
    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(cap.min(order.len()));
    order
}
