//! Dashboard session service
//!
//! Sequences collaborator calls the way the dashboard page does: every
//! dialog fetches the current streams and enums before it opens, commits post
//! a compound entities document and refresh the directory, and every failure
//! is surfaced once through the [`Notifier`].
//!
//! Each dialog open takes a generation ticket. A result that resolves after a
//! newer ticket was issued (the dialog was dismissed or reopened meanwhile)
//! is discarded and reported as `Ok(None)`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::api_client::{DashApi, Listing};
use super::notifier::Notifier;
use crate::document::{EntitiesDoc, EntityKind, QueryDoc};
use crate::entity::{Catalog, EntityWorkspace, EnumDecl, StreamDecl};
use crate::errors::{DashboardError, DashboardResult, GraphError};
use crate::graph::QueryGraph;

/// Generation ticket handed out when a dialog opens
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Ticket(u64);

/// Editor opened on a stored file
#[derive(Clone, Debug)]
pub enum Visualization {
    Query(QueryGraph),
    /// Workspace holding the stored entity, and that entity's node id
    Entities {
        workspace: EntityWorkspace,
        node: String,
    },
}

/// Outcome of a successful commit
#[derive(Clone, Debug, PartialEq)]
pub struct CommitReceipt {
    pub entities: usize,
    pub updated: bool,
    /// Refreshed directory listing; `None` when the refresh failed
    pub listing: Option<Listing>,
}

pub struct DashboardService {
    api: Arc<dyn DashApi>,
    notifier: Arc<dyn Notifier>,
    generation: AtomicU64,
}

impl DashboardService {
    pub fn new(api: Arc<dyn DashApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            generation: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &dyn DashApi {
        self.api.as_ref()
    }

    /// Start a new dialog generation; earlier tickets become stale
    pub fn issue_ticket(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Dismiss the current dialog; pending results are discarded
    pub fn dismiss(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Streams and enums, fetched together; both must succeed
    pub async fn fetch_catalog(&self) -> DashboardResult<Catalog> {
        let (streams, enums) =
            tokio::try_join!(self.api.get_all_streams(), self.api.get_all_enums())?;
        Ok(Catalog::new(streams, enums))
    }

    /// Empty query editor over the current catalog
    pub async fn open_query_editor(&self) -> DashboardResult<Option<QueryGraph>> {
        let ticket = self.issue_ticket();
        let result = self.fetch_catalog().await.map(QueryGraph::new);
        self.settle(ticket, "open_query_editor", result)
    }

    /// Empty entities editor over the current catalog
    pub async fn open_entities_editor(&self) -> DashboardResult<Option<EntityWorkspace>> {
        let ticket = self.issue_ticket();
        let result = self.fetch_catalog().await.map(EntityWorkspace::new);
        self.settle(ticket, "open_entities_editor", result)
    }

    /// Open the editor matching a stored file's extension
    pub async fn visualize(&self, file: &str) -> DashboardResult<Option<Visualization>> {
        let ticket = self.issue_ticket();
        let result = self.load_visualization(file).await;
        self.settle(ticket, "visualize", result)
    }

    async fn load_visualization(&self, file: &str) -> DashboardResult<Visualization> {
        let kind = EntityKind::from_file_name(file)
            .ok_or_else(|| DashboardError::UnsupportedFile(file.to_string()))?;
        let (catalog, content) = tokio::try_join!(self.fetch_catalog(), async {
            self.api
                .get_file_content(file)
                .await
                .map_err(DashboardError::from)
        })?;
        let malformed = |source| DashboardError::MalformedFile {
            file: file.to_string(),
            source,
        };

        let visualization = match kind {
            EntityKind::Query => {
                let doc = QueryDoc::from_json(&content.file_content).map_err(malformed)?;
                Visualization::Query(QueryGraph::from_document(doc, catalog)?)
            }
            EntityKind::Stream => {
                let decl: StreamDecl =
                    serde_json::from_str(&content.file_content).map_err(malformed)?;
                let (workspace, node) = EntityWorkspace::open_existing_stream(catalog, decl);
                Visualization::Entities { workspace, node }
            }
            EntityKind::Enum => {
                let decl: EnumDecl =
                    serde_json::from_str(&content.file_content).map_err(malformed)?;
                let (workspace, node) = EntityWorkspace::open_existing_enum(catalog, decl);
                Visualization::Entities { workspace, node }
            }
        };
        info!(file, kind = %kind, "File opened for visualization");
        Ok(visualization)
    }

    /// Create the query, or update it when the graph was loaded from a file
    pub async fn commit_query(&self, graph: &QueryGraph) -> DashboardResult<CommitReceipt> {
        let updated = graph.has_read_only_name();
        let result = match graph.to_entities_doc() {
            Ok(doc) => self.post(&doc, updated).await.map(|_| doc.len()),
            Err(err) => Err(err.into()),
        };
        self.finish_commit(result, "Query", updated).await
    }

    /// Create the workspace's entities, or update the one it was opened on
    pub async fn commit_entities(
        &self,
        workspace: &EntityWorkspace,
    ) -> DashboardResult<CommitReceipt> {
        let updated = workspace.is_update();
        let result = if workspace.is_empty() {
            Err(DashboardError::NothingToCommit)
        } else if !workspace.can_commit() {
            let incomplete = workspace
                .nodes()
                .filter(|(_, node)| !node.is_committed())
                .map(|(id, _)| id.to_string())
                .collect();
            Err(GraphError::NotCommitReady { incomplete }.into())
        } else {
            match workspace.to_entities_doc() {
                Ok(doc) => self.post(&doc, updated).await.map(|_| doc.len()),
                Err(err) => Err(err.into()),
            }
        };
        self.finish_commit(result, "Entity(s)", updated).await
    }

    async fn post(&self, doc: &EntitiesDoc, updated: bool) -> DashboardResult<()> {
        if updated {
            self.api.update_entities(doc).await?;
        } else {
            self.api.create_entities(doc).await?;
        }
        Ok(())
    }

    async fn finish_commit(
        &self,
        result: DashboardResult<usize>,
        noun: &str,
        updated: bool,
    ) -> DashboardResult<CommitReceipt> {
        let entities = match result {
            Ok(entities) => entities,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };

        let verb = if updated { "updated" } else { "created" };
        info!(entities, updated, "Commit accepted");
        self.notifier
            .notify_info(&format!("{} {} successfully", noun, verb));

        let listing = match self.api.list_directory().await {
            Ok(listing) => Some(listing),
            Err(err) => {
                self.report(&DashboardError::from(err));
                None
            }
        };
        Ok(CommitReceipt {
            entities,
            updated,
            listing,
        })
    }

    fn settle<T>(
        &self,
        ticket: Ticket,
        action: &str,
        result: DashboardResult<T>,
    ) -> DashboardResult<Option<T>> {
        if !self.is_current(ticket) {
            warn!(action, "Discarding stale dialog result");
            return Ok(None);
        }
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    fn report(&self, err: &DashboardError) {
        warn!(error = %err, "Dashboard operation failed");
        self.notifier.notify_error(&err.user_message());
    }
}
