//! Site data stores.
//!
//! Each site has two streams: `iv` (continuous surrogate readings) and
//! `qwdata` (discrete lab samples). The pipeline only talks to the
//! [`SeriesStore`] trait; [`CsvStore`] reads a directory tree and
//! [`MemoryStore`] backs tests and the demo.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::domain::{SiteConfig, Table};
use crate::error::QwError;
use crate::io::codes::column_name;
use crate::io::ingest::read_table;

/// One of the two per-site tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stream {
    /// Continuous surrogate readings.
    Iv,
    /// Discrete lab samples.
    QwData,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Iv => "iv",
            Stream::QwData => "qwdata",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait SeriesStore: Send + Sync {
    fn get(&self, site: &str, stream: Stream) -> Result<Table, QwError>;
}

/// `<root>/<site>/<stream>.csv`
#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, site: &str, stream: Stream) -> PathBuf {
        self.root.join(site).join(format!("{stream}.csv"))
    }
}

impl SeriesStore for CsvStore {
    fn get(&self, site: &str, stream: Stream) -> Result<Table, QwError> {
        let path = self.path_for(site, stream);
        if !path.is_file() {
            return Err(QwError::SiteData {
                site: site.to_string(),
                message: format!("no {stream} data at '{}'", path.display()),
            });
        }
        let ingested = read_table(&path).map_err(|e| QwError::SiteData {
            site: site.to_string(),
            message: format!("reading {stream}: {e}"),
        })?;
        Ok(ingested.table)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<(String, Stream), Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, site: impl Into<String>, stream: Stream, table: Table) {
        self.tables.insert((site.into(), stream), table);
    }

    pub fn with(mut self, site: impl Into<String>, stream: Stream, table: Table) -> Self {
        self.insert(site, stream, table);
        self
    }
}

impl SeriesStore for MemoryStore {
    fn get(&self, site: &str, stream: Stream) -> Result<Table, QwError> {
        self.tables
            .get(&(site.to_string(), stream))
            .cloned()
            .ok_or_else(|| QwError::SiteData {
                site: site.to_string(),
                message: format!("no {stream} data in store"),
            })
    }
}

/// Fetch a site's stream with proxy columns filled from their proxy sites.
///
/// Each proxied column only receives values where the site's own record is
/// missing. A proxy site that cannot be read is logged and skipped.
pub fn get_with_proxies(
    store: &dyn SeriesStore,
    site: &SiteConfig,
    stream: Stream,
) -> Result<Table, QwError> {
    let mut table = store.get(&site.id, stream)?;

    for (column, proxy_id) in &site.proxies {
        let column = column_name(column);
        let proxy = match store.get(proxy_id, stream) {
            Ok(t) => t,
            Err(e) => {
                warn!(site = %site.id, proxy = %proxy_id, %stream, error = %e, "proxy unavailable");
                continue;
            }
        };
        if !proxy.has_column(column) {
            debug!(site = %site.id, proxy = %proxy_id, column, "proxy lacks column");
            continue;
        }
        let before = table.values(column).map_or(0, count_present);
        table = table.update_merge(&proxy.select(&[column]));
        let after = table.values(column).map_or(0, count_present);
        debug!(
            site = %site.id,
            proxy = %proxy_id,
            column,
            filled = after - before,
            "applied proxy"
        );
    }
    Ok(table)
}

fn count_present(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 3, 1)
            .unwrap()
            .and_hms_opt(0, m, 0)
            .unwrap()
    }

    fn table(times: &[u32], column: &str, values: Vec<Option<f64>>) -> Table {
        let mut t = Table::new(times.iter().map(|m| at(*m)).collect()).unwrap();
        t.set_column(column, values).unwrap();
        t
    }

    #[test]
    fn proxy_fills_gaps_only() {
        let mut own = table(&[0, 15, 30], "Discharge", vec![Some(10.0), None, Some(12.0)]);
        own.set_column("Turb_YSI", vec![Some(1.0), Some(2.0), Some(3.0)]).unwrap();
        let proxy = table(&[0, 15, 30, 45], "Discharge", vec![Some(99.0), Some(11.0), Some(99.0), Some(13.0)]);

        let store = MemoryStore::new()
            .with("A", Stream::Iv, own)
            .with("P", Stream::Iv, proxy);
        let site = SiteConfig {
            id: "A".to_string(),
            name: None,
            proxies: [("00060".to_string(), "P".to_string())].into_iter().collect(),
        };

        let merged = get_with_proxies(&store, &site, Stream::Iv).unwrap();
        assert_eq!(
            merged.values("Discharge").unwrap(),
            &[Some(10.0), Some(11.0), Some(12.0), Some(13.0)]
        );
        assert_eq!(merged.values("Turb_YSI").unwrap()[3], None);
    }

    #[test]
    fn missing_proxy_is_ignored() {
        let store = MemoryStore::new().with("A", Stream::Iv, table(&[0], "Discharge", vec![None]));
        let site = SiteConfig {
            id: "A".to_string(),
            name: None,
            proxies: [("Discharge".to_string(), "gone".to_string())].into_iter().collect(),
        };
        let merged = get_with_proxies(&store, &site, Stream::Iv).unwrap();
        assert_eq!(merged.values("Discharge").unwrap(), &[None]);
        assert!(matches!(
            store.get("gone", Stream::QwData),
            Err(QwError::SiteData { .. })
        ));
    }
}
