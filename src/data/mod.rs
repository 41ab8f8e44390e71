//! Data layer: the in-memory table and its file formats.
//!
//! Architecture:
//! ```text
//!  .parquet / .csv / .json
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  model    │  named columns (float / int / text), select, vstack
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  Table → .parquet / .csv (overwrite)
//!   └──────────┘
//! ```

pub mod loader;
pub mod model;
