//! Browser bindings for the content store: the network row source, the
//! localStorage persistence tier, and the shared store handle the pages pull
//! from context.

use aurore::{
    parse_rows, ContentRow, ContentStore, FetchError, KeyValueStore, RowSource, SystemClock,
};
use futures::future::{FutureExt, LocalBoxFuture};
use gloo_timers::callback::Timeout;
use log::warn;
use serde::Deserialize;
use std::ops::Deref;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, DomException, Headers, Request, RequestInit, Response, Storage};

use crate::config;

/// Shape of the values endpoint payload; `values` is absent when the range
/// holds no data at all.
#[derive(Deserialize)]
struct ValuesPayload {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Row source that talks to the spreadsheet values endpoint.
pub struct SheetsSource {
    api_key: Option<&'static str>,
    spreadsheet_id: Option<&'static str>,
}

impl SheetsSource {
    pub fn from_build_env() -> Self {
        Self {
            api_key: config::sheets_api_key(),
            spreadsheet_id: config::spreadsheet_id(),
        }
    }
}

impl RowSource for SheetsSource {
    fn fetch_rows(
        &self,
        set_name: &str,
    ) -> LocalBoxFuture<'static, Result<Vec<ContentRow>, FetchError>> {
        let (Some(key), Some(id)) = (self.api_key, self.spreadsheet_id) else {
            warn!("content source not configured; skipping fetch for {}", set_name);
            return futures::future::ready(Err(FetchError::MissingConfig)).boxed_local();
        };
        let url = format!(
            "{}/{}/values/{}?key={}",
            config::SHEETS_ENDPOINT,
            encode(id),
            encode(set_name),
            encode(key),
        );
        fetch_values(url).boxed_local()
    }
}

pub(crate) fn encode(part: &str) -> String {
    String::from(js_sys::encode_uri_component(part))
}

async fn fetch_values(url: String) -> Result<Vec<ContentRow>, FetchError> {
    let controller = AbortController::new()
        .map_err(|err| FetchError::Network(js_error_message(&err)))?;

    let init = RequestInit::new();
    init.set_method("GET");
    init.set_signal(Some(&controller.signal()));
    if let Ok(headers) = Headers::new() {
        let _ = headers.append("Accept", "application/json");
        let _ = headers.append("Cache-Control", "max-age=300");
        init.set_headers(headers.as_ref());
    }
    let request = Request::new_with_str_and_init(&url, &init)
        .map_err(|err| FetchError::Network(js_error_message(&err)))?;

    // Abort the fetch if it takes too long; dropping the handle once the
    // response arrived cancels the pending abort.
    let abort = controller.clone();
    let timeout = Timeout::new(config::FETCH_TIMEOUT_MS, move || abort.abort());

    let window = gloo_utils::window();
    let outcome = JsFuture::from(window.fetch_with_request(&request)).await;
    let response: Response = match outcome {
        Ok(value) => value
            .dyn_into()
            .map_err(|_| FetchError::Decode("response object expected".to_string()))?,
        Err(err) => {
            drop(timeout);
            return Err(classify_failure(&err));
        }
    };
    if !response.ok() {
        drop(timeout);
        return Err(FetchError::Status(response.status()));
    }

    let body = response
        .json()
        .map_err(|err| FetchError::Decode(js_error_message(&err)))?;
    let json = JsFuture::from(body).await.map_err(|err| classify_failure(&err));
    drop(timeout);
    let payload: ValuesPayload = serde_wasm_bindgen::from_value(json?)
        .map_err(|err| FetchError::Decode(err.to_string()))?;
    Ok(parse_rows(&payload.values))
}

/// Tell an aborted (timed out) fetch apart from other network failures.
fn classify_failure(err: &JsValue) -> FetchError {
    if let Some(exception) = err.dyn_ref::<DomException>() {
        if exception.name() == "AbortError" {
            return FetchError::TimedOut;
        }
    }
    FetchError::Network(js_error_message(err))
}

fn js_error_message(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

/// localStorage adapter for the persistent cache tier. Every operation is
/// best-effort: a missing or locked-down storage object reads as empty.
pub struct BrowserStorage;

fn local_storage() -> Option<Storage> {
    gloo_utils::window().local_storage().ok().flatten()
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        local_storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let storage = local_storage().ok_or_else(|| "localStorage unavailable".to_string())?;
        storage
            .set_item(key, value)
            .map_err(|err| js_error_message(&err))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = local_storage() {
            let _ = storage.remove_item(key);
        }
    }

    fn keys(&self) -> Vec<String> {
        let Some(storage) = local_storage() else {
            return Vec::new();
        };
        let len = storage.length().unwrap_or(0);
        (0..len).filter_map(|i| storage.key(i).ok().flatten()).collect()
    }
}

/// Cheap-to-clone handle shared with components through context.
#[derive(Clone)]
pub struct StoreHandle(Rc<ContentStore>);

impl PartialEq for StoreHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for StoreHandle {
    type Target = Rc<ContentStore>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Build the process-wide store from build-time configuration.
pub fn new_store_handle() -> StoreHandle {
    let namespace = config::spreadsheet_id().unwrap_or("UNKNOWN").to_string();
    StoreHandle(Rc::new(ContentStore::new(
        config::CACHE_TTL_MS,
        namespace,
        Box::new(SystemClock),
        Box::new(BrowserStorage),
        Box::new(SheetsSource::from_build_env()),
    )))
}
