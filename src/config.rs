use std::path::PathBuf;

use clap::Args;

use crate::error::Result;
use crate::store::Store;
use crate::survey::Variant;

/// Storage location and questionnaire variant, shared by every binary.
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// SQLite file holding the responses
    #[arg(long, env = "SURVEY_DB", default_value = "data.db")]
    pub db: PathBuf,

    /// Questionnaire configuration stored in that file
    #[arg(long, env = "SURVEY_VARIANT", value_enum, default_value_t = Variant::DasPanas)]
    pub variant: Variant,
}

impl StoreArgs {
    /// Opens the store and creates its table on first use.
    pub fn open(&self) -> Result<Store> {
        let store = Store::open(&self.db, self.variant.survey())?;
        store.ensure_schema()?;
        Ok(store)
    }
}
