pub mod catalog;
pub mod config;
pub mod convert;
pub mod email;
pub mod error;
pub mod event;
pub mod filter;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod sanitize;
pub mod storage;
pub mod writer;

pub use catalog::{Catalog, SqliteCatalog};
pub use config::{load_settings, EmailConfiguration, Environment, IngestSettings};
pub use convert::{ConversionOutcome, Converter, FileKind, Table};
pub use email::{EmailLoader, ParsedEmail, RawEmailRef};
pub use error::{
    CatalogError, ConfigError, ConvertError, CurateError, EventError, IngestError, Result,
    StorageError,
};
pub use event::{FilterResponse, InboundMailEvent, StorageEvent};
pub use filter::{filter_inbound, FilterDecision, SenderFilter};
pub use logging::{init_logging, LogFormat};
pub use notify::{ChannelNotifier, LogNotifier, Notification, NotificationCategory, Notifier};
pub use pipeline::{BatchReport, EmailPhase, EmailReport, Pipeline};
pub use storage::{FsObjectStore, MemoryObjectStore, ObjectStore, SettlePolicy};
pub use writer::{CuratedWriter, QuarantineWriter};
