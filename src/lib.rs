pub mod answer;
pub mod bulk;
pub mod collector;
pub mod config;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod report;
pub mod scorer;
pub mod store;
pub mod survey;

pub use answer::{AnswerSheet, Ratings};
pub use bulk::read_bulk;
pub use collector::Collector;
pub use config::StoreArgs;
pub use error::{Error, Result};
pub use instrument::{Instrument, DAS, DBQ28, PANAS, PERCEPTION};
pub use report::{export_csv, render_bar_chart, render_table, summarize, ChartRow};
pub use scorer::{score, Aggregation, Group, SubscaleTotal, Total};
pub use store::Store;
pub use survey::{Response, ScoredResponse, StoredResponse, Survey, Variant};
