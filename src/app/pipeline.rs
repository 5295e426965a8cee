//! Shared session logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! source chain -> normalize -> cache -> product selection
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::rc::Rc;

use rand::rngs::StdRng;
use tracing::info;

use crate::data::synth::session_rng;
use crate::data::{LoadCache, SourceChain};
use crate::domain::{SalesTable, SessionConfig};
use crate::error::SalesError;

/// The loaded table plus what is needed to serve reloads from cache.
pub struct Session {
    chain: SourceChain,
    cache: LoadCache,
    rng: StdRng,
    table: Rc<SalesTable>,
    skipped: Vec<String>,
}

impl Session {
    /// Build the standard source chain from `config` and load the table.
    pub fn open(config: &SessionConfig) -> Result<Self, SalesError> {
        let chain = SourceChain::from_config(config)?;
        Self::with_chain(chain, config.seed)
    }

    /// Load through an explicit chain.
    pub fn with_chain(chain: SourceChain, seed: Option<u64>) -> Result<Self, SalesError> {
        let mut cache = LoadCache::default();
        let mut rng = session_rng(seed);
        let loaded = chain.load(&mut cache, &mut rng)?;
        Ok(Self {
            chain,
            cache,
            rng,
            table: loaded.table,
            skipped: loaded.skipped,
        })
    }

    pub fn table(&self) -> &Rc<SalesTable> {
        &self.table
    }

    /// Sources that offered data but failed on the last load, e.g. an upload
    /// that could not be parsed.
    pub fn skipped_sources(&self) -> &[String] {
        &self.skipped
    }

    /// Re-run the source chain. Sources already loaded come from the cache.
    pub fn reload(&mut self) -> Result<(), SalesError> {
        let loaded = self.chain.load(&mut self.cache, &mut self.rng)?;
        self.table = loaded.table;
        self.skipped = loaded.skipped;
        info!(cached = self.cache.len(), "session reloaded");
        Ok(())
    }

    /// The requested product if it exists, else the first product in table order.
    pub fn resolve_product(&self, requested: Option<&str>) -> Result<String, SalesError> {
        match requested {
            Some(p) if self.table.product_records(p).next().is_some() => Ok(p.to_string()),
            Some(p) => Err(SalesError::UnknownProduct(p.to_string())),
            None => self
                .table
                .product_ids()
                .into_iter()
                .next()
                .ok_or_else(|| SalesError::UnknownProduct("(table has no products)".to_string())),
        }
    }
}
