//! # keywatch-sync
//!
//! Synchronization and workflow-gating core of the keywatch operator
//! dashboard.
//!
//! - [`LiveChannel`]: the single push connection, reconnect loop and
//!   fallback polling ticker
//! - [`ViewController`]: per-view query state with sequence-based
//!   supersession and page clamping
//! - [`ReviewWorkflow`]: review decisions and the two-step disclosure gate
//! - [`Dashboard`]: the actor tying them together
//! - [`Session`]: process-scoped context with explicit init and teardown
//!
//! The core never touches the network itself. Servers are reached through
//! [`DashboardApi`] and [`PushConnector`], implemented in `keywatch-client`.

pub mod api;
pub mod channel;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod notice;
pub mod pagination;
pub mod review;
pub mod session;
pub mod view;

pub use api::{DashboardApi, Page, PushConnector, PushStream};
pub use channel::{ChannelNotice, ChannelStatus, LiveChannel};
pub use config::SyncConfig;
pub use dashboard::{Dashboard, ScanCommand, ScanControls};
pub use error::{SyncError, SyncResult, TransportError, ValidationError};
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use pagination::{clamp_page, page_window, PageLink};
pub use review::{
    DisclosureConfirmation, OfferedActions, PendingBadge, PendingSource, ReviewWorkflow,
};
pub use session::Session;
pub use view::{FetchTicket, ViewController, ViewOutcome};
