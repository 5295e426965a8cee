//! Data acquisition: source selection, remote fetch, and synthetic backfill.

pub mod remote;
pub mod source;
pub mod synth;

pub use remote::{DEFAULT_DATA_URL, RemoteClient};
pub use source::{ChainLoad, LoadCache, LocalSource, RemoteSource, SourceChain, SourceProvider, UploadedFile};
