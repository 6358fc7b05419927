//! Pipeline stage values for host lifecycle integration.
//!
//! The engine never calls the host; the host's save/destroy orchestration
//! invokes the store at three points and threads these explicit values
//! through:
//!
//! 1. before save — [`crate::AttachmentStore::prepare_save`] turns a
//!    [`SaveRequest`] into a [`PreparedSave`] (selection resolved, payload
//!    staged, plan computed; all policy errors surface here)
//! 2. after the host commits its own record —
//!    [`crate::AttachmentStore::complete_save`] executes the plan and
//!    returns a [`SaveOutcome`]
//! 3. after destroy — [`crate::AttachmentStore::destroy`] returns a
//!    [`DestroyOutcome`]

use uuid::Uuid;

use crate::attachment::StagedPayload;
use crate::reconcile::ReconcilePlan;

/// What the host wants persisted this save cycle.
#[derive(Debug, Default)]
pub struct SaveRequest {
    /// Fresh payload bytes, if this save uploads new content.
    pub payload: Option<StagedPayload>,
    /// Explicit backend selection for this cycle, overriding the
    /// persisted set and the configured defaults.
    pub backend_override: Option<Vec<String>>,
    /// Derived artifacts to create or refresh.
    pub thumbnails: Vec<ThumbnailSpec>,
}

impl SaveRequest {
    /// An empty request: reconcile the record against policy only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach fresh payload bytes.
    #[must_use]
    pub fn with_payload(mut self, payload: StagedPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Override the backend selection for this cycle.
    #[must_use]
    pub fn with_backends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backend_override = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Add a derived artifact payload.
    #[must_use]
    pub fn with_thumbnail(mut self, spec: ThumbnailSpec) -> Self {
        self.thumbnails.push(spec);
        self
    }
}

/// One derived artifact supplied with a save.
#[derive(Debug)]
pub struct ThumbnailSpec {
    /// Transformation label; becomes the filename suffix.
    pub suffix: String,
    /// The artifact's bytes. Required when the artifact is new; optional
    /// on refresh (existing copies are used to fill added backends).
    pub payload: Option<StagedPayload>,
    /// Explicit backend selection for the artifact, overriding the
    /// parent's resolved set.
    pub backend_override: Option<Vec<String>>,
}

impl ThumbnailSpec {
    /// A new artifact with payload bytes.
    #[must_use]
    pub fn new(suffix: impl Into<String>, payload: StagedPayload) -> Self {
        Self {
            suffix: suffix.into(),
            payload: Some(payload),
            backend_override: None,
        }
    }

    /// Override the artifact's backend selection.
    #[must_use]
    pub fn with_backends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backend_override = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

/// Output of the before-save stage: everything the write/delete phases
/// need, resolved and staged up front.
#[derive(Debug)]
pub struct PreparedSave {
    /// The resolved target backend set T.
    pub target: Vec<String>,
    /// Diff of T against the persisted set P.
    pub plan: ReconcilePlan,
    /// The staged payload shared by every consuming backend, when bytes
    /// are needed this cycle.
    pub(crate) payload: Option<StagedPayload>,
    /// Whether the payload differs from the stored checksum (updates are
    /// skipped otherwise).
    pub(crate) payload_changed: bool,
    /// Whether a rename must run before writes.
    pub(crate) rename: bool,
    /// Per-artifact prepared state.
    pub(crate) thumbnails: Vec<PreparedThumbnail>,
}

/// Prepared state for one derived artifact.
#[derive(Debug)]
pub(crate) struct PreparedThumbnail {
    /// The artifact's identity (freshly minted for new artifacts).
    pub id: Uuid,
    /// Whether the artifact record does not exist on the parent yet.
    pub is_new: bool,
    /// Filename suffix.
    pub suffix: String,
    /// Resolved target set for the artifact.
    pub target: Vec<String>,
    /// Diff against the artifact's persisted set.
    pub plan: ReconcilePlan,
    /// Staged artifact payload, when bytes are needed.
    pub payload: Option<StagedPayload>,
    /// Whether the artifact payload changed this cycle.
    pub payload_changed: bool,
    /// Override to persist on the artifact record at commit.
    pub backend_override: Option<Vec<String>>,
}

/// Result of a committed save cycle.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The committed active-backend set.
    pub active_backends: Vec<String>,
    /// Backends that gained a copy.
    pub added: Vec<String>,
    /// Backends whose copy was rewritten.
    pub updated: Vec<String>,
    /// Backends whose copy was removed.
    pub removed: Vec<String>,
    /// Whether a rename completed this cycle.
    pub renamed: bool,
}

/// Result of a destroy cycle.
#[derive(Debug, Clone)]
pub struct DestroyOutcome {
    /// Backends the record's bytes were removed from.
    pub removed: Vec<String>,
    /// Number of derived artifacts whose copies were removed.
    pub thumbnails_removed: usize,
}
