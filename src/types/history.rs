use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::types::errors::HistoryError;

/// A single browsing event.
///
/// Visits are value objects: once built, none of their fields change. A
/// changed visit is a new record that replaces the old one in the store.
/// Deserializing goes through [`Visit::new`], so `domain` is always derived
/// from `url` and empty URLs are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VisitRecord")]
pub struct Visit {
    url: String,
    title: Option<String>,
    date: DateTime<Utc>,
    domain: String,
}

impl Visit {
    /// Creates a visit, deriving `domain` from the URL host.
    pub fn new(url: impl Into<String>, title: Option<String>, date: DateTime<Utc>) -> Self {
        let url = url.into();
        let domain = domain_of(&url);
        Self {
            url,
            title,
            date,
            domain,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Host of the URL, or an empty string for local files and host-less pages.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The title, or the URL when the title is missing or empty.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.url,
        }
    }
}

/// Serialized form of a visit. `domain` is ignored on input.
#[derive(Deserialize)]
struct VisitRecord {
    url: String,
    #[serde(default)]
    title: Option<String>,
    date: DateTime<Utc>,
}

impl TryFrom<VisitRecord> for Visit {
    type Error = HistoryError;

    fn try_from(record: VisitRecord) -> Result<Self, Self::Error> {
        if record.url.trim().is_empty() {
            return Err(HistoryError::InvalidVisit("URL is empty".to_string()));
        }
        Ok(Visit::new(record.url, record.title, record.date))
    }
}

/// Extracts the host of a URL. Unparseable and host-less URLs yield "".
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// All visits of one calendar day, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBucket {
    /// Start of the day the visits belong to.
    pub day: DateTime<Utc>,
    pub visits: Vec<Visit>,
}

/// One fetched, immutable view of the visit store.
///
/// Buckets are ordered by `day` descending. The adapter producing the
/// snapshot is responsible for that ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub buckets: Vec<DayBucket>,
}

impl HistorySnapshot {
    pub fn new(buckets: Vec<DayBucket>) -> Self {
        Self { buckets }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of visits across all buckets.
    pub fn visit_count(&self) -> usize {
        self.buckets.iter().map(|b| b.visits.len()).sum()
    }

    /// All visits in snapshot order (newest day first).
    pub fn visits(&self) -> impl Iterator<Item = &Visit> {
        self.buckets.iter().flat_map(|b| b.visits.iter())
    }
}

/// Parameters for fetching a snapshot from a visit source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotQuery {
    pub max_age_days: u32,
    pub limit: usize,
}

/// How the history view groups its cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    #[default]
    Date,
    Site,
    #[serde(rename = "datesite")]
    DateSite,
    #[serde(rename = "lastvisited")]
    LastVisited,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Date => "date",
            SortOption::Site => "site",
            SortOption::DateSite => "datesite",
            SortOption::LastVisited => "lastvisited",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(SortOption::Date),
            "site" => Ok(SortOption::Site),
            "datesite" => Ok(SortOption::DateSite),
            "lastvisited" => Ok(SortOption::LastVisited),
            other => Err(format!("Unknown sort option: {}", other)),
        }
    }
}

/// Identifies which grouping produced a card. Rendered by the host; never
/// localized here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelKey {
    Today,
    Yesterday,
    ThisMonthByDay,
    PreviousMonth,
    SiteHeader,
    LocalFiles,
}

impl LabelKey {
    /// Stable token for the label, suitable as a localization id.
    pub fn token(&self) -> &'static str {
        match self {
            LabelKey::Today => "history-date-today",
            LabelKey::Yesterday => "history-date-yesterday",
            LabelKey::ThisMonthByDay => "history-date-this-month",
            LabelKey::PreviousMonth => "history-date-prev-month",
            LabelKey::SiteHeader => "history-site-header",
            LabelKey::LocalFiles => "history-site-localhost",
        }
    }
}

/// Visits of one domain inside a date group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteVisits<V> {
    pub domain: String,
    pub visits: Vec<V>,
}

/// Which shape the items of a card have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Visit,
    Site,
}

/// Items of a card. A card holds either plain visits or per-domain groups,
/// never a mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum CardItems<V> {
    Visits(Vec<V>),
    Sites(Vec<SiteVisits<V>>),
}

impl<V> CardItems<V> {
    pub fn kind(&self) -> ItemKind {
        match self {
            CardItems::Visits(_) => ItemKind::Visit,
            CardItems::Sites(_) => ItemKind::Site,
        }
    }

    /// Number of top-level items (visits, or domain groups).
    pub fn len(&self) -> usize {
        match self {
            CardItems::Visits(visits) => visits.len(),
            CardItems::Sites(sites) => sites.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates every visit, descending into domain groups.
    pub fn visits(&self) -> Box<dyn Iterator<Item = &V> + '_> {
        match self {
            CardItems::Visits(visits) => Box::new(visits.iter()),
            CardItems::Sites(sites) => Box::new(sites.iter().flat_map(|s| s.visits.iter())),
        }
    }

    pub fn map<W>(self, mut f: impl FnMut(V) -> W) -> CardItems<W> {
        match self {
            CardItems::Visits(visits) => CardItems::Visits(visits.into_iter().map(&mut f).collect()),
            CardItems::Sites(sites) => CardItems::Sites(
                sites
                    .into_iter()
                    .map(|site| SiteVisits {
                        domain: site.domain,
                        visits: site.visits.into_iter().map(&mut f).collect(),
                    })
                    .collect(),
            ),
        }
    }
}

/// A display-ready group of history items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardEntry<V> {
    pub items: CardItems<V>,
    pub label_key: Option<LabelKey>,
    pub domain: Option<String>,
}

impl<V> CardEntry<V> {
    pub fn visits(items: Vec<V>, label_key: Option<LabelKey>) -> Self {
        Self {
            items: CardItems::Visits(items),
            label_key,
            domain: None,
        }
    }

    pub fn sites(items: Vec<SiteVisits<V>>, label_key: LabelKey) -> Self {
        Self {
            items: CardItems::Sites(items),
            label_key: Some(label_key),
            domain: None,
        }
    }

    pub fn map<W>(self, f: impl FnMut(V) -> W) -> CardEntry<W> {
        CardEntry {
            items: self.items.map(f),
            label_key: self.label_key,
            domain: self.domain,
        }
    }
}

/// A visit normalized for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRow {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub date: DateTime<Utc>,
    /// Visit time in milliseconds since the UNIX epoch.
    pub time: i64,
}

impl From<Visit> for VisitRow {
    fn from(visit: Visit) -> Self {
        let title = visit.display_title().to_string();
        Self {
            time: visit.date.timestamp_millis(),
            url: visit.url,
            title,
            domain: visit.domain,
            date: visit.date,
        }
    }
}

/// The committed output of the query controller.
///
/// `entries == None` means results are still loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsCache {
    pub entries: Option<Vec<CardEntry<VisitRow>>>,
    pub search_query: String,
    pub sort_option: Option<SortOption>,
}

impl ResultsCache {
    pub fn is_pending(&self) -> bool {
        self.entries.is_none()
    }
}
