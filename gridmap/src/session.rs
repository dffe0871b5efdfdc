//! Host loop tying the engine to the backend.
//!
//! [`MapSession`] owns an [`EngineCore`] and a [`MapGateway`]. Every batch of
//! actions the engine returns goes through [`MapSession::process`]: network
//! actions are performed and their outcome is fed back into the engine's
//! `complete_*` methods; whatever the host must handle (modals, alerts,
//! cursor, repaint) is returned in order.

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "session_test.rs"]
mod session_test;

use std::collections::VecDeque;

use serde_json::Value;

use crate::engine::{Action, EngineCore};
use crate::gateway::MapGateway;
use crate::wire::{catalog_from_value, items_from_value};

pub struct MapSession<G: MapGateway> {
    gateway: G,
    core: EngineCore,
}

impl<G: MapGateway> MapSession<G> {
    #[must_use]
    pub fn new(gateway: G, core: EngineCore) -> Self {
        Self { gateway, core }
    }

    #[must_use]
    pub fn core(&self) -> &EngineCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Seed the map from the page's bootstrap globals (`allToolsData` and
    /// `gridItems`). Either may be an array or a JSON-encoded string.
    pub fn bootstrap(&mut self, tools: Value, items: Value) -> Vec<Action> {
        self.core.set_catalog(catalog_from_value(tools));
        let items = items_from_value(items, self.core.catalog());
        self.core.load_items(items)
    }

    /// Fetch saved items. A failed load leaves an empty map.
    pub async fn load(&mut self) -> Vec<Action> {
        match self.gateway.load_items().await {
            Ok(items) => {
                tracing::info!(count = items.len(), "map loaded");
                self.core.load_saved(items)
            }
            Err(e) => {
                tracing::error!(error = %e, "map load failed; starting empty");
                self.core.load_items(Vec::new())
            }
        }
    }

    /// Run an engine call and process the actions it returns.
    pub async fn handle<F>(&mut self, f: F) -> Vec<Action>
    where
        F: FnOnce(&mut EngineCore) -> Vec<Action>,
    {
        let actions = f(&mut self.core);
        self.process(actions).await
    }

    /// Perform every network action (including ones produced by
    /// completions) and return the host actions in order.
    pub async fn process(&mut self, actions: Vec<Action>) -> Vec<Action> {
        let mut queue: VecDeque<Action> = actions.into();
        let mut host = Vec::new();
        while let Some(action) = queue.pop_front() {
            if action.is_network() {
                queue.extend(self.perform(action).await);
            } else {
                host.push(action);
            }
        }
        host
    }

    async fn perform(&mut self, action: Action) -> Vec<Action> {
        match action {
            Action::CreateTool(request) => match self.gateway.create_tool(&request).await {
                Ok(saved) => self.core.complete_tool_placement(Some(saved)),
                Err(e) => {
                    tracing::warn!(slot = %request.tool_id, error = %e, "tool placement rejected");
                    self.core.complete_tool_placement(None)
                }
            },
            Action::CreateDrawing(request) => match self.gateway.create_drawing(&request).await {
                Ok(saved) => self.core.complete_drawing_placement(Some(saved)),
                Err(e) => {
                    tracing::warn!(error = %e, "drawing placement rejected");
                    self.core.complete_drawing_placement(None)
                }
            },
            Action::UpdateDrawing { id, request } => {
                let result = self.gateway.update_drawing(id, &request).await;
                if let Err(e) = &result {
                    tracing::warn!(id, error = %e, "drawing update rejected");
                }
                self.core.complete_drawing_update(id, result.is_ok())
            }
            Action::DeleteItem { id } => {
                let result = self.gateway.delete_item(id).await;
                if let Err(e) = &result {
                    tracing::warn!(id, error = %e, "delete rejected");
                }
                self.core.complete_delete(id, result.is_ok())
            }
            Action::SaveState { revision, items } => {
                let result = self.gateway.save_state(&items).await;
                match &result {
                    Ok(()) => tracing::info!(revision, items = items.len(), "map saved"),
                    Err(e) => tracing::error!(revision, error = %e, "map save failed"),
                }
                self.core.complete_save(revision, result.is_ok())
            }
            Action::RefreshAvailableTools => match self.gateway.load_available_tools().await {
                Ok(tools) => self.core.complete_tool_refresh(Some(tools)),
                Err(e) => {
                    tracing::warn!(error = %e, "available tools refresh failed");
                    self.core.complete_tool_refresh(None)
                }
            },
            other => vec![other],
        }
    }
}
