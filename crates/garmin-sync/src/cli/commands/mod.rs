pub mod auth;
pub mod sync;

pub use auth::resolve_credentials;
pub use sync::{print_summary, run as sync_run, validate as validate_settings, ActivityOutcome, EpoUpdate, SyncSummary};
