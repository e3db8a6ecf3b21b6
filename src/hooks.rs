//! Custom hooks binding pages to the content store.

use aurore::{ContentRow, FetchError};
use log::warn;
use std::cell::Cell;
use std::rc::Rc;
use yew::prelude::*;

use crate::sheets::StoreHandle;

/// Per-page view of one named content set.
#[derive(Clone, PartialEq)]
pub struct ContentSetState {
    pub rows: Rc<Vec<ContentRow>>,
    pub loading: bool,
    pub error: Option<String>,
    /// Re-runs the load for the same set name.
    pub refresh: Callback<()>,
}

impl ContentSetState {
    pub fn first(&self) -> Option<&ContentRow> {
        self.rows.first()
    }
}

/// Subscribe a page to a content set.
///
/// Cached rows render immediately; a fresh fetch then replaces them and
/// updates the cache. Fetch failures keep whatever was cached on screen and
/// surface in `error`. A cancellation flag set on effect cleanup discards
/// updates that resolve after the subscriber went inactive, so a page left
/// mid-load never receives stale state.
#[hook]
pub fn use_content_set(name: &'static str) -> ContentSetState {
    let store = use_context::<StoreHandle>().expect("content store context missing");
    let rows = use_state(|| Rc::new(Vec::<ContentRow>::new()));
    let loading = use_state(|| true);
    let error = use_state(|| None::<String>);
    let refresh_tick = use_state(|| 0u32);

    {
        let rows = rows.clone();
        let loading = loading.clone();
        let error = error.clone();
        let store = store.clone();
        use_effect_with((name.to_string(), *refresh_tick), move |(set_name, _)| {
            let cancelled = Rc::new(Cell::new(false));
            let guard = cancelled.clone();
            loading.set(true);
            error.set(None);
            if let Some(cached) = store.get_cached(set_name) {
                rows.set(Rc::new(cached));
                loading.set(false);
            }
            let set_name = set_name.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = store.fetch_content_set(&set_name).await;
                if cancelled.get() {
                    return;
                }
                match result {
                    Ok(fresh) => {
                        store.set_cached(&set_name, &fresh);
                        rows.set(Rc::new(fresh));
                        error.set(None);
                    }
                    Err(FetchError::TimedOut) => {
                        warn!("request timeout for {}", set_name);
                        error.set(Some(FetchError::TimedOut.to_string()));
                    }
                    Err(err) => {
                        warn!("fetch failed for {}: {}", set_name, err);
                        error.set(Some(err.to_string()));
                    }
                }
                loading.set(false);
            });
            move || guard.set(true)
        });
    }

    let refresh = {
        let refresh_tick = refresh_tick.clone();
        Callback::from(move |_| refresh_tick.set(refresh_tick.wrapping_add(1)))
    };

    ContentSetState {
        rows: (*rows).clone(),
        loading: *loading,
        error: (*error).clone(),
        refresh,
    }
}
