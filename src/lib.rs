pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod fares;
pub mod ingest;
pub mod redact;
pub mod resolver;
pub mod takeout;
pub mod timeline;
pub mod trips;

pub use classifier::{classify, Classification};
pub use config::{AnalysisConfig, TicketPrices};
pub use db::Database;
pub use error::IngestError;
pub use fares::{compare_fares, FareComparison, TicketKind};
pub use ingest::ingest_batch;
pub use resolver::{CityResolver, FixedResolver, GeoApiResolver, UNIDENTIFIED_PLACE};
pub use takeout::{collect_export_files, load_batch, RawSegment};
pub use timeline::{activity_timeline, MonthBucket};
pub use trips::{merge_trips, TripSummary};
