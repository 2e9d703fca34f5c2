use formats::{ConfigError, GeoJsonError};
use inspector::PanelError;
use wasm_bindgen::JsValue;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("dom: {0}")]
    Dom(String),
    #[error("gpu: {0}")]
    Gpu(String),
    #[error("fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("geojson: {0}")]
    GeoJson(#[from] GeoJsonError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("panel: {0}")]
    Panel(#[from] PanelError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no map is mounted")]
    NotMounted,
}

impl From<ViewerError> for JsValue {
    fn from(err: ViewerError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
