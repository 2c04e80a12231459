use crate::app::controller::{Completion, ExpansionController, ExpansionError, ToggleStep};
use crate::app::dto::*;
use crate::app::session::Session;
use crate::domain::composer::ComposedGraph;
use crate::domain::graph::BranchExpansion;
use crate::domain::ids::BranchId;
use crate::domain::lifecycle::FetchTicket;
use crate::domain::ports::{BranchExpandRequest, BranchExpander, CallFlowRequest, CallFlowSource};
use anyhow::{Context as _, Result, anyhow};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Defaults applied to function selections that leave options out
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Human-readable name of the collaborator (URL or fixture path)
    pub source: String,
    pub default_max_depth: u32,
    pub include_external: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source: "unknown".to_string(),
            default_max_depth: 5,
            include_external: false,
        }
    }
}

/// View binding for the call-flow graph.
///
/// Receives function selections and toggle intents, and republishes the
/// composed graph after every change. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CallFlowEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    source: Arc<dyn CallFlowSource>,
    expander: Arc<dyn BranchExpander>,
    data: Mutex<EngineData>,
    composed: watch::Sender<Option<Arc<ComposedGraph>>>,
}

struct EngineData {
    session: Option<Session>,
    /// Version handed to the most recent selection (or close)
    latest_version: u64,
}

impl CallFlowEngine {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn CallFlowSource>,
        expander: Arc<dyn BranchExpander>,
    ) -> Self {
        let (composed, _) = watch::channel(None);
        Self {
            inner: Arc::new(EngineInner {
                config,
                source,
                expander,
                data: Mutex::new(EngineData {
                    session: None,
                    latest_version: 0,
                }),
                composed,
            }),
        }
    }

    /// Build an engine whose collaborator serves both queries
    pub fn with_source<S>(config: EngineConfig, source: Arc<S>) -> Self
    where
        S: CallFlowSource + BranchExpander + 'static,
    {
        Self::new(config, source.clone(), source)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // Never held across an await
    fn data(&self) -> MutexGuard<'_, EngineData> {
        self.inner
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: Option<&Session>) -> Option<Arc<ComposedGraph>> {
        let graph = session.map(|s| Arc::new(s.compose()));
        self.inner.composed.send_replace(graph.clone());
        graph
    }

    pub fn request_from(&self, req: SelectFunctionRequest) -> CallFlowRequest {
        CallFlowRequest {
            file_path: req.file_path,
            function_name: req.function_name,
            max_depth: req.max_depth.unwrap_or(self.inner.config.default_max_depth),
            class_name: req.class_name,
            include_external: req
                .include_external
                .unwrap_or(self.inner.config.include_external),
        }
    }

    /// Load the base graph for a function and start a fresh session.
    ///
    /// The previous session is discarded immediately. Returns `None` when a
    /// newer selection (or a close) superseded this one while it was loading.
    pub async fn select_function(
        &self,
        request: CallFlowRequest,
    ) -> Result<Option<GraphResponse>> {
        let version = {
            let mut data = self.data();
            data.latest_version += 1;
            data.session = None;
            self.publish(None);
            data.latest_version
        };
        info!(
            version,
            file = %request.file_path,
            function = %request.function_name,
            "selecting function"
        );

        let base = self
            .inner
            .source
            .call_flow(&request)
            .await
            .with_context(|| {
                format!(
                    "call-flow query failed for {}::{}",
                    request.file_path, request.function_name
                )
            })?;

        let mut data = self.data();
        if data.latest_version != version {
            debug!(version, latest = data.latest_version, "discarding superseded base graph");
            return Ok(None);
        }
        let session = Session::new(version, request, base).context("base graph rejected")?;
        for c in session.collisions() {
            warn!(id = %c.id, first = ?c.first, second = ?c.second, "id collision in base graph");
        }
        info!(
            version,
            branches = session.lifecycle().len(),
            elements = session.base().element_count(),
            "session started"
        );
        let graph = self.publish(Some(&session));
        data.session = Some(session);

        Ok(graph.map(|g| GraphResponse {
            session_version: version,
            graph: (*g).clone(),
        }))
    }

    /// Toggle one branch, awaiting its fetch when one is needed
    pub async fn toggle_branch(&self, branch: &str) -> Result<ToggleResponse, ExpansionError> {
        let (step, request) = {
            let mut data = self.data();
            let session = data.session.as_mut().ok_or(ExpansionError::NoSession)?;
            let step = ExpansionController::begin_toggle(session, branch)?;
            let request = session.request().expand(branch.into());
            if step != ToggleStep::Coalesced {
                self.publish(data.session.as_ref());
            }
            (step, request)
        };

        let outcome = match step {
            ToggleStep::Shown => ToggleOutcome::Shown,
            ToggleStep::Hidden => ToggleOutcome::Hidden,
            ToggleStep::Coalesced => ToggleOutcome::Coalesced,
            ToggleStep::Fetch(ticket) => self.spawn_fetch(ticket, request).await,
        };

        Ok(ToggleResponse {
            branch_id: branch.into(),
            outcome,
            graph: self.composed_graph().map(|g| (*g).clone()),
        })
    }

    /// Fire-and-forget toggle intent
    pub fn request_toggle(&self, branch: BranchId) {
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.toggle_branch(branch.as_str()).await {
                warn!(branch = %branch, error = %e, "toggle intent rejected");
            }
        });
    }

    fn finish_fetch(
        &self,
        ticket: &FetchTicket,
        result: Result<BranchExpansion>,
    ) -> ToggleOutcome {
        let mut data = self.data();
        let completion = match data.session.as_mut() {
            Some(session) => ExpansionController::complete_fetch(session, ticket, result),
            None => Completion::Stale,
        };
        if completion != Completion::Stale {
            self.publish(data.session.as_ref());
        }
        match completion {
            Completion::Loaded { discovered } => ToggleOutcome::Loaded {
                nested_branches: discovered.len(),
            },
            Completion::Failed(error) => ToggleOutcome::Failed { error },
            Completion::Stale => ToggleOutcome::Stale,
        }
    }

    /// Run a fetch and its completion on a detached task.
    ///
    /// The completion is applied even when the caller stops waiting, so a
    /// branch never stays `Loading` after its fetch ends. A panicked task
    /// counts as a failed fetch.
    fn spawn_fetch(
        &self,
        ticket: FetchTicket,
        request: BranchExpandRequest,
    ) -> impl Future<Output = ToggleOutcome> + Send + 'static {
        let engine = self.clone();
        let task_ticket = ticket.clone();
        let handle = tokio::spawn(async move {
            let result = engine.inner.expander.expand(&request).await;
            engine.finish_fetch(&task_ticket, result)
        });

        let engine = self.clone();
        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(branch = %ticket.branch_id, error = %e, "branch fetch task failed");
                    engine.finish_fetch(&ticket, Err(anyhow!("fetch task failed: {e}")))
                }
            }
        }
    }

    /// Show every branch of every rendered decision. Unloaded branches are
    /// fetched concurrently.
    pub async fn expand_all(&self) -> Result<BulkResponse, ExpansionError> {
        let (bulk, requests) = {
            let mut data = self.data();
            let session = data.session.as_mut().ok_or(ExpansionError::NoSession)?;
            let bulk = ExpansionController::expand_all(session);
            let requests: Vec<_> = bulk
                .fetches
                .iter()
                .map(|t| session.request().expand(t.branch_id.clone()))
                .collect();
            self.publish(data.session.as_ref());
            (bulk, requests)
        };

        let mut branches: Vec<BranchOutcome> = bulk
            .shown
            .into_iter()
            .map(|branch_id| BranchOutcome {
                branch_id,
                outcome: ToggleOutcome::Shown,
            })
            .collect();

        // Spawned before the first await so every fetch completes on its own
        let pending: Vec<_> = bulk
            .fetches
            .into_iter()
            .zip(requests)
            .map(|(ticket, request)| {
                let branch_id = ticket.branch_id.clone();
                (branch_id, self.spawn_fetch(ticket, request))
            })
            .collect();
        let mut fetched = Vec::with_capacity(pending.len());
        for (branch_id, outcome) in pending {
            fetched.push(BranchOutcome {
                branch_id,
                outcome: outcome.await,
            });
        }
        fetched.sort_by(|a, b| a.branch_id.cmp(&b.branch_id));
        branches.extend(fetched);

        Ok(BulkResponse {
            branches,
            graph: self.composed_graph().map(|g| (*g).clone()),
        })
    }

    /// Hide every visible branch without evicting anything
    pub fn collapse_all(&self) -> Result<BulkResponse, ExpansionError> {
        let mut data = self.data();
        let session = data.session.as_mut().ok_or(ExpansionError::NoSession)?;
        let hidden = ExpansionController::collapse_all(session);
        let graph = self.publish(data.session.as_ref());
        Ok(BulkResponse {
            branches: hidden
                .into_iter()
                .map(|branch_id| BranchOutcome {
                    branch_id,
                    outcome: ToggleOutcome::Hidden,
                })
                .collect(),
            graph: graph.map(|g| (*g).clone()),
        })
    }

    /// Discard the current session (view unmounted). In-flight work is ignored
    /// when it completes.
    pub fn close_session(&self) -> bool {
        let mut data = self.data();
        data.latest_version += 1;
        let had_session = data.session.take().is_some();
        self.publish(None);
        if had_session {
            info!("session closed");
        }
        had_session
    }

    /// Latest composed graph, if a session is active
    pub fn composed_graph(&self) -> Option<Arc<ComposedGraph>> {
        self.inner.composed.borrow().clone()
    }

    /// Receiver notified after every change to the composed graph
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ComposedGraph>>> {
        self.inner.composed.subscribe()
    }

    pub fn graph(&self) -> Option<GraphResponse> {
        let data = self.data();
        let session = data.session.as_ref()?;
        let graph = self.composed_graph()?;
        Some(GraphResponse {
            session_version: session.version(),
            graph: (*graph).clone(),
        })
    }

    pub fn status(&self) -> Option<StatusResponse> {
        let data = self.data();
        let session = data.session.as_ref()?;
        let lifecycle = session.lifecycle();
        Some(StatusResponse {
            session_version: session.version(),
            request: session.request().clone(),
            counts: lifecycle.counts(),
            cached_branches: session.cache().len(),
            id_collisions: session.collisions().len(),
            branches: lifecycle
                .records()
                .iter()
                .map(|r| BranchStatus {
                    branch_id: r.branch_id.clone(),
                    decision_id: r.decision_id.clone(),
                    label: r.label.clone(),
                    phase: r.state.phase(),
                    error: session.error_for(r.branch_id.as_str()).map(String::from),
                })
                .collect(),
        })
    }

    pub fn health(&self) -> HealthResponse {
        let data = self.data();
        let graph = self.composed_graph();
        HealthResponse {
            source: self.inner.config.source.clone(),
            session_version: data.session.as_ref().map(Session::version),
            node_count: graph.as_ref().map_or(0, |g| g.nodes.len()),
            edge_count: graph.as_ref().map_or(0, |g| g.edges.len()),
        }
    }
}
