use bytes::Bytes;
use sluice_cache::CacheEntry;

/// Where the returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// An entry that was already committed before this request looked.
    DiskCache,
    /// Data transferred by this request.
    Network,
}

#[derive(Debug, Clone)]
pub enum ResultData {
    /// A committed cache entry.
    Entry(CacheEntry),
    /// In-memory body, only produced when caching is disabled.
    Bytes(Bytes),
}

#[derive(Debug, Clone)]
pub struct DownloadResult {
    data: ResultData,
    source: DataSource,
}

impl DownloadResult {
    pub fn from_cache(entry: CacheEntry) -> Self {
        Self {
            data: ResultData::Entry(entry),
            source: DataSource::DiskCache,
        }
    }

    /// A body that was just downloaded and committed to the cache.
    pub fn downloaded_entry(entry: CacheEntry) -> Self {
        Self {
            data: ResultData::Entry(entry),
            source: DataSource::Network,
        }
    }

    pub fn downloaded_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            data: ResultData::Bytes(bytes.into()),
            source: DataSource::Network,
        }
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn data(&self) -> &ResultData {
        &self.data
    }

    pub fn into_data(self) -> ResultData {
        self.data
    }

    pub fn entry(&self) -> Option<&CacheEntry> {
        match &self.data {
            ResultData::Entry(entry) => Some(entry),
            ResultData::Bytes(_) => None,
        }
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.data {
            ResultData::Bytes(bytes) => Some(bytes),
            ResultData::Entry(_) => None,
        }
    }

    pub fn len(&self) -> u64 {
        match &self.data {
            ResultData::Entry(entry) => entry.len(),
            ResultData::Bytes(bytes) => bytes.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads the payload into memory regardless of where it lives.
    pub fn to_bytes(&self) -> sluice_cache::Result<Bytes> {
        match &self.data {
            ResultData::Entry(entry) => entry.read_all().map(Bytes::from),
            ResultData::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}
