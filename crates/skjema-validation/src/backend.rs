//! Validation issues produced by the backend, fetched asynchronously
//! and merged per source group.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use skjema_data::DataModelReference;
use thiserror::Error;

use crate::issue::Message;
use crate::issue::Severity;
use crate::issue::ValidationIssue;
use crate::issue::ValidationMask;

/// One issue as the backend reports it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendIssue {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub data_element_id: Option<String>,
    /// Numeric severity, 1 (error) through 5 (success). 4 means fixed.
    pub severity: u8,
    pub source: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub custom_text_key: Option<String>,
}

#[derive(Debug, Error)]
#[error("backend validation fetch failed: {0}")]
pub struct FetchError(pub String);

/// Injected fetch: `(instance id, language, only incremental)` to the
/// backend's current issue list.
pub type FetchFn = Arc<
    dyn Fn(String, String, bool) -> Pin<Box<dyn Future<Output = Result<Vec<BackendIssue>, FetchError>> + Send>>
        + Send
        + Sync,
>;

/// The merged backend contribution, grouped by the backend's own source
/// names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackendValidationState {
    groups: BTreeMap<String, Vec<BackendIssue>>,
    /// Bumped on every processed payload, identical or not. Consumers
    /// use it to tell "validated against the latest save" apart from
    /// "nothing changed".
    last_saved: u64,
}

impl BackendValidationState {
    /// An initial fetch is authoritative: it replaces every group,
    /// dropping sources the payload no longer mentions.
    pub fn apply_initial(&mut self, issues: Vec<BackendIssue>) {
        self.groups = group_by_source(issues);
        self.last_saved += 1;
    }

    /// An incremental update replaces only the groups it mentions. A
    /// payload deep-equal to the current groups leaves the map untouched
    /// so downstream snapshots stay reference-stable.
    pub fn apply_incremental(&mut self, issues: Vec<BackendIssue>) {
        let incoming = group_by_source(issues);
        for (source, group) in incoming {
            match self.groups.get(&source) {
                Some(existing) if *existing == group => {}
                _ => {
                    self.groups.insert(source, group);
                }
            }
        }
        self.last_saved += 1;
    }

    #[must_use]
    pub fn last_saved(&self) -> u64 {
        self.last_saved
    }

    #[must_use]
    pub fn group(&self, source: &str) -> &[BackendIssue] {
        self.groups.get(source).map_or(&[], Vec::as_slice)
    }

    /// Converts every stored group into [`ValidationIssue`]s. Issues the
    /// backend marks as fixed are dropped here.
    #[must_use]
    pub fn issues(&self, default_data_type: Option<&str>) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        for group in self.groups.values() {
            for issue in group {
                let Some(severity) = Severity::from_backend(issue.severity) else {
                    continue;
                };
                let category = if issue.custom_text_key.is_some() {
                    ValidationMask::CUSTOM_BACKEND
                } else {
                    ValidationMask::BACKEND
                };
                let key = issue
                    .custom_text_key
                    .clone()
                    .or_else(|| issue.code.clone())
                    .unwrap_or_else(|| issue.source.clone());
                let mut converted =
                    ValidationIssue::new(issue.source.clone(), category, severity, Message::new(key));
                converted.code = issue.code.clone();
                if let (Some(field), Some(data_type)) = (&issue.field, default_data_type) {
                    converted.field = Some(DataModelReference::new(data_type, field.clone()));
                }
                out.push(converted);
            }
        }
        out
    }
}

fn group_by_source(issues: Vec<BackendIssue>) -> BTreeMap<String, Vec<BackendIssue>> {
    let mut groups: BTreeMap<String, Vec<BackendIssue>> = BTreeMap::new();
    for issue in issues {
        groups.entry(issue.source.clone()).or_default().push(issue);
    }
    groups
}

/// Owns the backend state and the fetch loop. A refresh started while
/// another is in flight supersedes it; the stale completion is
/// discarded without touching the state.
pub struct BackendValidation {
    state: Mutex<BackendValidationState>,
    fetch: FetchFn,
    generation: AtomicU64,
}

impl BackendValidation {
    #[must_use]
    pub fn new(fetch: FetchFn) -> Self {
        Self {
            state: Mutex::new(BackendValidationState::default()),
            fetch,
            generation: AtomicU64::new(0),
        }
    }

    /// A snapshot of the current merged state.
    #[must_use]
    pub fn state(&self) -> BackendValidationState {
        self.lock().clone()
    }

    /// Fetches and merges the backend issues for an instance.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the stored state is left as it was, so
    /// local validation sources are unaffected.
    pub async fn refresh(
        &self,
        instance_id: &str,
        language: &str,
        only_incremental: bool,
    ) -> Result<(), FetchError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = (self.fetch)(
            instance_id.to_string(),
            language.to_string(),
            only_incremental,
        )
        .await;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(instance_id, "discarding superseded backend validation response");
            return Ok(());
        }
        match result {
            Ok(issues) => {
                let mut state = self.lock();
                if only_incremental {
                    state.apply_incremental(issues);
                } else {
                    state.apply_initial(issues);
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(instance_id, error = %err, "backend validation fetch failed");
                Err(err)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendValidationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(source: &str, severity: u8, code: &str) -> BackendIssue {
        BackendIssue {
            field: Some("Persons[0].Name".to_string()),
            data_element_id: None,
            severity,
            source: source.to_string(),
            code: Some(code.to_string()),
            custom_text_key: None,
        }
    }

    #[test]
    fn initial_fetch_replaces_all_groups() {
        let mut state = BackendValidationState::default();
        state.apply_initial(vec![issue("Expression", 1, "a"), issue("Custom", 2, "b")]);
        state.apply_initial(vec![issue("Expression", 1, "c")]);
        assert_eq!(state.group("Expression")[0].code.as_deref(), Some("c"));
        assert!(state.group("Custom").is_empty());
        assert_eq!(state.last_saved(), 2);
    }

    #[test]
    fn incremental_update_touches_only_named_groups() {
        let mut state = BackendValidationState::default();
        state.apply_initial(vec![issue("Expression", 1, "a"), issue("Custom", 2, "b")]);
        state.apply_incremental(vec![issue("Expression", 1, "z")]);
        assert_eq!(state.group("Expression")[0].code.as_deref(), Some("z"));
        assert_eq!(state.group("Custom")[0].code.as_deref(), Some("b"));
    }

    #[test]
    fn identical_incremental_payload_is_a_noop_but_bumps_the_marker() {
        let mut state = BackendValidationState::default();
        state.apply_initial(vec![issue("Expression", 1, "a")]);
        let before = state.clone();
        state.apply_incremental(vec![issue("Expression", 1, "a")]);
        assert_eq!(state.groups, before.groups);
        assert_eq!(state.last_saved(), before.last_saved() + 1);
    }

    #[test]
    fn fixed_issues_are_dropped_on_conversion() {
        let mut state = BackendValidationState::default();
        state.apply_initial(vec![issue("Expression", 4, "fixed"), issue("Expression", 1, "live")]);
        let converted = state.issues(Some("model"));
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].code.as_deref(), Some("live"));
        assert_eq!(converted[0].category, ValidationMask::BACKEND);
        assert_eq!(
            converted[0].field.as_ref().unwrap().field,
            "Persons[0].Name"
        );
    }

    #[tokio::test]
    async fn a_newer_refresh_supersedes_an_in_flight_one() {
        use std::sync::atomic::AtomicUsize;

        let gate = Arc::new(tokio::sync::Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch: FetchFn = {
            let gate = Arc::clone(&gate);
            let calls = Arc::clone(&calls);
            Arc::new(move |_, _, _| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                let gate = Arc::clone(&gate);
                Box::pin(async move {
                    if call == 0 {
                        // First request finishes only after the second.
                        gate.notified().await;
                        Ok(vec![issue("Expression", 1, "stale")])
                    } else {
                        Ok(vec![issue("Expression", 1, "fresh")])
                    }
                })
            })
        };

        let backend = Arc::new(BackendValidation::new(fetch));
        let first = tokio::spawn({
            let backend = Arc::clone(&backend);
            async move { backend.refresh("inst", "nb", false).await }
        });
        // Make sure the first refresh has claimed its generation.
        tokio::task::yield_now().await;
        backend.refresh("inst", "nb", false).await.unwrap();
        gate.notify_one();
        first.await.unwrap().unwrap();

        let state = backend.state();
        assert_eq!(state.group("Expression")[0].code.as_deref(), Some("fresh"));
        assert_eq!(state.last_saved(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_state_untouched() {
        let fetch: FetchFn = Arc::new(|_, _, _| {
            Box::pin(async { Err(FetchError("boom".to_string())) })
        });
        let backend = BackendValidation::new(fetch);
        assert!(backend.refresh("inst", "nb", false).await.is_err());
        assert_eq!(backend.state(), BackendValidationState::default());
    }
}
