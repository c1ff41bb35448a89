//! Bounded streaming fetch of remote content

mod fetcher;

pub use fetcher::{
    DisplayDefaults, FetchError, FetchLimits, FetchResult, RemoteFetcher, DEFAULT_BUFFER_SIZE,
    MAX_IMAGE_SIZE,
};
