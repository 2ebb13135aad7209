/// Data layer: record types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  schema lookup + number parsing → RecordStore
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ RecordStore │  Vec<Record>, filter domains
///   └─────────────┘
///        │  FilterSelection
///        ▼
///   ┌──────────┐
///   │  filter   │  four equality predicates → &Record subset
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  counts, rates (age buckets), means, histograms
///   └───────────┘
///        │
///        ▼
///   pipeline::render → DashboardTables
/// ```

pub mod age;
pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
pub mod number;
pub mod pipeline;
pub mod schema;
