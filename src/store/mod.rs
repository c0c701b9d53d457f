pub mod scheduler;
pub mod views;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::db::LocalStore;
use crate::models::{
    CreateTodoRequest, Filter, SortKey, Stats, Todo, UpdateTodoRequest,
};
use crate::remote::BackendClient;
use crate::settings::SettingsStore;

/// The authoritative in-memory todo collection and its local/remote
/// reconciliation protocol.
///
/// Every mutating operation writes locally first; the remote phase runs only
/// when a backend is configured, and a remote failure never rolls back a
/// completed local mutation. No operation propagates an error to the caller:
/// failures are logged and surface as absent return values.
pub struct TodoStore {
    todos: RwLock<Vec<Todo>>,
    filter: RwLock<Filter>,
    sort_by: RwLock<SortKey>,
    search_query: RwLock<String>,
    last_sync: RwLock<Option<DateTime<Utc>>>,
    is_loading: AtomicBool,
    is_syncing: AtomicBool,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn BackendClient>,
    settings: Arc<SettingsStore>,
}

impl TodoStore {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn BackendClient>,
        settings: Arc<SettingsStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            todos: RwLock::new(Vec::new()),
            filter: RwLock::new(Filter::default()),
            sort_by: RwLock::new(SortKey::default()),
            search_query: RwLock::new(String::new()),
            last_sync: RwLock::new(None),
            is_loading: AtomicBool::new(false),
            is_syncing: AtomicBool::new(false),
            local,
            remote,
            settings,
        })
    }

    // Collection mutations replace the vector wholesale so readers between
    // suspension points always observe one consistent snapshot.
    fn commit(&self, mutate: impl FnOnce(&mut Vec<Todo>)) {
        let mut guard = self.todos.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        mutate(&mut next);
        *guard = next;
    }

    fn set_collection(&self, todos: Vec<Todo>) {
        *self.todos.write().unwrap_or_else(PoisonError::into_inner) = todos;
    }

    fn replace_by_id(&self, id: &str, replacement: Todo) {
        self.commit(|todos| {
            if let Some(slot) = todos.iter_mut().find(|t| t.id == id) {
                *slot = replacement;
            }
        });
    }

    /// Snapshot of the current collection.
    pub fn todos(&self) -> Vec<Todo> {
        self.todos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Populates the collection from local persistence, then — when a
    /// backend is configured and reachable — reconciles with it before
    /// returning. Local load failure is logged and leaves the collection
    /// as it was.
    pub async fn load_todos(&self) {
        self.is_loading.store(true, Ordering::SeqCst);

        match self.local.list().await {
            Ok(todos) => self.set_collection(todos),
            Err(err) => error!("failed to load todos: {}", err),
        }

        if self.settings.is_configured() && self.settings.check_connection().await {
            self.sync_with_backend().await;
        }

        self.is_loading.store(false, Ordering::SeqCst);
    }

    /// Two-phase create: persist and prepend locally, then submit to the
    /// backend with the local id attached for correlation. A successful
    /// remote call yields the canonical record, which replaces the local
    /// placeholder; otherwise the local record stands.
    pub async fn create_todo(&self, request: CreateTodoRequest) -> Option<Todo> {
        let local_todo = match self.local.create(request.clone()).await {
            Ok(todo) => todo,
            Err(err) => {
                error!("failed to create todo locally: {}", err);
                return None;
            }
        };
        self.commit(|todos| todos.insert(0, local_todo.clone()));

        if !self.settings.is_configured() {
            return Some(local_todo);
        }

        let mut remote_request = request;
        remote_request.id = Some(local_todo.id.clone());
        match self.remote.create_todo(&remote_request).await {
            Some(canonical) => {
                self.replace_by_id(&local_todo.id, canonical.clone());
                Some(canonical)
            }
            None => Some(local_todo),
        }
    }

    /// Two-phase update: local field-merge first, then the remote call when
    /// configured. An id unknown locally is a no-op that still attempts the
    /// remote update.
    pub async fn update_todo(&self, id: &str, request: UpdateTodoRequest) -> Option<Todo> {
        let local_result = match self.local.update(id, request.clone()).await {
            Ok(result) => result,
            Err(err) => {
                error!("failed to update todo locally: {}", err);
                return None;
            }
        };
        if let Some(updated) = &local_result {
            self.replace_by_id(id, updated.clone());
        }

        if !self.settings.is_configured() {
            return local_result;
        }

        match self.remote.update_todo(id, &request).await {
            Some(canonical) => {
                self.replace_by_id(id, canonical.clone());
                Some(canonical)
            }
            None => local_result,
        }
    }

    /// Inverts the completion flag via `update_todo`; no-op when the id is
    /// not in the collection.
    pub async fn toggle_todo(&self, id: &str) -> Option<Todo> {
        let completed = self
            .todos()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.completed)?;
        self.update_todo(
            id,
            UpdateTodoRequest {
                completed: Some(!completed),
                ..Default::default()
            },
        )
        .await
    }

    /// Removes the todo locally unconditionally; the remote delete, when
    /// configured, is fire-after and its failure is only logged.
    pub async fn delete_todo(&self, id: &str) {
        if let Err(err) = self.local.delete(id).await {
            error!("failed to delete todo locally: {}", err);
        }
        self.commit(|todos| todos.retain(|t| t.id != id));

        if self.settings.is_configured() && !self.remote.delete_todo(id).await {
            warn!("remote delete failed for {}", id);
        }
    }

    /// Clears every todo completed at call time. The completed ids are
    /// captured before mutating; remote deletes run sequentially afterwards,
    /// each failure logged without aborting the rest.
    pub async fn clear_completed(&self) {
        let completed_ids: Vec<String> = self
            .todos()
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.id.clone())
            .collect();

        match self.local.clear_completed().await {
            Ok(remaining) => self.set_collection(remaining),
            Err(err) => {
                error!("failed to clear completed todos locally: {}", err);
                self.commit(|todos| todos.retain(|t| !t.completed));
            }
        }

        if self.settings.is_configured() {
            for id in completed_ids {
                if !self.remote.delete_todo(&id).await {
                    warn!("remote delete failed for {}", id);
                }
            }
        }
    }

    /// Uploads the entire collection; a successful reply replaces the
    /// collection wholesale and is persisted through the bulk-replace path.
    /// Failure leaves local state untouched.
    pub async fn sync_with_backend(&self) {
        if !self.settings.is_configured() {
            return;
        }
        self.is_syncing.store(true, Ordering::SeqCst);

        let current = self.todos();
        // Always request the full window: the reply replaces the whole
        // collection.
        match self.remote.sync_todos(current, None).await {
            Some(response) => {
                if let Err(err) = self.local.replace_all(response.todos.clone()).await {
                    error!("failed to persist synced todos: {}", err);
                }
                info!("synced {} todos with backend", response.todos.len());
                self.set_collection(response.todos);
                *self
                    .last_sync
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(response.sync_time);
            }
            None => warn!("sync with backend failed, keeping local state"),
        }

        self.is_syncing.store(false, Ordering::SeqCst);
    }

    /// The current collection filtered, searched, and sorted. Recomputed on
    /// every call.
    pub fn filtered_todos(&self) -> Vec<Todo> {
        views::filtered(
            &self.todos(),
            self.filter(),
            self.sort_by(),
            &self.search_query(),
        )
    }

    pub fn stats(&self) -> Stats {
        views::stats(&self.todos())
    }

    pub fn filter(&self) -> Filter {
        *self.filter.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_filter(&self, filter: Filter) {
        *self.filter.write().unwrap_or_else(PoisonError::into_inner) = filter;
    }

    pub fn sort_by(&self) -> SortKey {
        *self.sort_by.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_sort_by(&self, sort_by: SortKey) {
        *self.sort_by.write().unwrap_or_else(PoisonError::into_inner) = sort_by;
    }

    pub fn search_query(&self) -> String {
        self.search_query
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        *self
            .search_query
            .write()
            .unwrap_or_else(PoisonError::into_inner) = query.into();
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }
}
