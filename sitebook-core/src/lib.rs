//! Sitebook Core - Domain Types
//!
//! Records mirrored from the construction-site backend, the filter sets that
//! scope report reads, decimal money, and the selected-site context every
//! request is scoped by. No HTTP and no caching live here.

use chrono::{DateTime, Utc};

pub mod entities;
pub mod error;
pub mod filters;
pub mod money;
pub mod site;

/// Backend record identifier.
pub type RecordId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

pub use entities::*;
pub use error::{CoreError, CoreResult, MoneyError, SelectionError, ValidationError};
pub use filters::{DetailedLogFilters, LedgerFilters, SupervisorFlowFilters, WeeklyPayoutFilters};
pub use money::Money;
pub use site::{
    MemorySelectionStore, SelectionStore, SiteContext, SiteId, SiteSelection, SiteSubscription,
    ALL_SITES, ALL_SITES_HEADER,
};
