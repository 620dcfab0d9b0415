pub mod api_client;
pub mod dashboard;
pub mod notifier;

pub use api_client::{
    DashApi, DirEntry, FileContent, Listing, Profile, Registration, RestClient, Session,
    DEFAULT_BASE_URL,
};
pub use dashboard::{CommitReceipt, DashboardService, Ticket, Visualization};
pub use notifier::{Notification, Notifier, RecordingNotifier, TracingNotifier};
