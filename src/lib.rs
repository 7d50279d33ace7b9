pub mod config;
pub mod error;
pub mod markup;
pub mod registry;
pub mod schema;
pub mod search;
pub mod server;
pub mod tools;
pub mod tracing;
pub mod types;
pub mod worker;

pub use config::Config;
pub use error::{IndexError, Result};
pub use markup::{SafeHtml, render_markdown};
pub use registry::{ExtractOptions, FileSource, HttpSource, Registry, RegistrySource, StaticSource};
pub use search::{SearchIndex, SearchMatch};
pub use server::ExtensionServer;
pub use types::{CodeRecord, ExtensionMetadata, FieldRecord, Record};
pub use worker::{
    BackgroundRefresher, IndexState, IndexStatus, QueryResults, spawn_background_refresher,
};
