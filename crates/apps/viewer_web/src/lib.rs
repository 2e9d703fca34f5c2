use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use formats::{FeatureCollection, MapConfig};
use inspector::ControlValue;
use tracing::{error, info, warn};

pub mod bootstrap;
pub mod error;
mod logging;
mod wgpu;

use bootstrap::MapScene;
use error::ViewerError;
use wgpu::{WgpuContext, clear_gpu_cache, init_wgpu_from_canvas_id, render_frame, resize_wgpu};

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

struct AnimationLoop {
    handle: i32,
    callback: FrameCallback,
}

#[derive(Default)]
struct ViewerState {
    canvas_id: Option<String>,
    scene: Option<MapScene>,
    wgpu: Option<WgpuContext>,
    animation: Option<AnimationLoop>,
}

thread_local! {
    static STATE: RefCell<ViewerState> = RefCell::new(ViewerState::default());
}

fn with_scene<T>(f: impl FnOnce(&mut MapScene) -> T) -> Result<T, ViewerError> {
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        s.scene.as_mut().map(f).ok_or(ViewerError::NotMounted)
    })
}

fn device_pixel_ratio() -> f64 {
    web_sys::window().map_or(1.0, |w| w.device_pixel_ratio())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    logging::init(tracing::Level::INFO);
    Ok(())
}

/// Builds the map into `canvas_id` from inline JSON documents and starts
/// rendering. Each argument may be omitted; a missing layer is skipped.
#[wasm_bindgen]
pub fn mount_map(
    canvas_id: String,
    config_json: Option<String>,
    ground_json: Option<String>,
    map_json: Option<String>,
) {
    spawn_local(async move {
        if let Err(err) = mount_inner(&canvas_id, config_json, ground_json, map_json).await {
            error!(error = %err, "failed to mount map");
        }
    });
}

/// Like [`mount_map`], but fetches the GeoJSON documents from URLs first.
#[wasm_bindgen]
pub fn load_map(
    canvas_id: String,
    config_json: Option<String>,
    ground_url: Option<String>,
    map_url: Option<String>,
) {
    spawn_local(async move {
        let ground_json = fetch_optional(ground_url.as_deref()).await;
        let map_json = fetch_optional(map_url.as_deref()).await;
        if let Err(err) = mount_inner(&canvas_id, config_json, ground_json, map_json).await {
            error!(error = %err, "failed to mount map");
        }
    });
}

/// Canvas size in CSS pixels.
#[wasm_bindgen]
pub fn set_canvas_sizes(width: f64, height: f64) {
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        let ViewerState { scene, wgpu, .. } = &mut *s;
        let Some(scene) = scene.as_mut() else { return };
        scene.resize(width, height);
        if let Some(ctx) = wgpu.as_mut() {
            let (w, h) = scene
                .renderer
                .settings
                .surface_size(width, height, device_pixel_ratio());
            resize_wgpu(ctx, w, h);
        }
    });
}

/// Orbit by a pointer drag, in pixels.
#[wasm_bindgen]
pub fn controls_rotate(delta_x_px: f64, delta_y_px: f64) -> Result<(), JsValue> {
    Ok(with_scene(|s| s.rotate(delta_x_px, delta_y_px))?)
}

/// Pan by a pointer drag, in pixels.
#[wasm_bindgen]
pub fn controls_pan(delta_x_px: f64, delta_y_px: f64) -> Result<(), JsValue> {
    Ok(with_scene(|s| s.pan(delta_x_px, delta_y_px))?)
}

/// Dolly with a wheel `deltaY`.
#[wasm_bindgen]
pub fn controls_zoom(wheel_delta_y: f64) -> Result<(), JsValue> {
    Ok(with_scene(|s| s.zoom(wheel_delta_y))?)
}

/// Debug panel layout as JSON.
#[wasm_bindgen]
pub fn panel_schema() -> Result<String, JsValue> {
    let json = with_scene(|s| s.panel.to_json())?;
    Ok(json.map_err(ViewerError::from)?)
}

/// Current value of one panel control, as JSON.
#[wasm_bindgen]
pub fn panel_value(id: &str) -> Result<String, JsValue> {
    let value = with_scene(|s| s.panel.value(&s.world, &s.camera, id))?
        .map_err(ViewerError::from)?;
    Ok(serde_json::to_string(&value).map_err(ViewerError::from)?)
}

/// Applies a JSON value to one panel control and returns the stored value.
#[wasm_bindgen]
pub fn panel_set(id: &str, value_json: &str) -> Result<String, JsValue> {
    let value: ControlValue = serde_json::from_str(value_json).map_err(ViewerError::from)?;
    let stored = with_scene(|s| {
        let MapScene {
            panel,
            world,
            camera,
            ..
        } = s;
        panel.apply(world, camera, id, value)
    })?
    .map_err(ViewerError::from)?;
    Ok(serde_json::to_string(&stored).map_err(ViewerError::from)?)
}

/// Stops the animation loop; the scene stays mounted.
#[wasm_bindgen]
pub fn stop() {
    let animation = STATE.with(|state| state.borrow_mut().animation.take());
    if let Some(animation) = animation {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(animation.handle);
        }
        animation.callback.borrow_mut().take();
        info!("animation stopped");
    }
}

fn parse_config(config_json: Option<&str>) -> Result<MapConfig, ViewerError> {
    match config_json {
        Some(text) => {
            let overrides: serde_json::Value = serde_json::from_str(text)?;
            Ok(MapConfig::with_overrides(&overrides)?)
        }
        None => Ok(MapConfig::default()),
    }
}

fn parse_layer(name: &str, payload: Option<&str>) -> Option<FeatureCollection> {
    let payload = payload?;
    match FeatureCollection::from_geojson_str(payload) {
        Ok(collection) => Some(collection),
        Err(err) => {
            error!(layer = name, error = %err, "invalid GeoJSON");
            None
        }
    }
}

async fn fetch_optional(url: Option<&str>) -> Option<String> {
    let url = url?;
    match fetch_text(url).await {
        Ok(text) => Some(text),
        Err(err) => {
            error!(error = %err, "failed to fetch map data");
            None
        }
    }
}

async fn fetch_text(url: &str) -> Result<String, ViewerError> {
    let fetch_err = |reason: String| ViewerError::Fetch {
        url: url.to_string(),
        reason,
    };
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    if !resp.ok() {
        return Err(fetch_err(format!("HTTP {}", resp.status())));
    }
    resp.text().await.map_err(|e| fetch_err(e.to_string()))
}

fn canvas_css_size(canvas_id: &str) -> Result<(web_sys::HtmlCanvasElement, f64, f64), ViewerError> {
    let canvas = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(canvas_id))
        .ok_or_else(|| ViewerError::Dom(format!("canvas #{canvas_id} missing")))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| ViewerError::Dom(format!("#{canvas_id} is not a canvas")))?;
    let width = f64::from(canvas.client_width());
    let height = f64::from(canvas.client_height());
    Ok((canvas, width, height))
}

async fn mount_inner(
    canvas_id: &str,
    config_json: Option<String>,
    ground_json: Option<String>,
    map_json: Option<String>,
) -> Result<(), ViewerError> {
    stop();
    let config = parse_config(config_json.as_deref())?;
    let ground = parse_layer(bootstrap::GROUND_LAYER, ground_json.as_deref());
    let map = parse_layer(bootstrap::MAP_LAYER, map_json.as_deref());

    let (canvas, width, height) = canvas_css_size(canvas_id)?;
    let scene = MapScene::build(config, (width, height), ground.as_ref(), map.as_ref());
    let settings = scene.renderer.settings;
    let (px_w, px_h) = settings.surface_size(width, height, device_pixel_ratio());

    let reusable = STATE.with(|state| {
        let mut s = state.borrow_mut();
        if s.canvas_id.as_deref() == Some(canvas_id) {
            s.wgpu.take()
        } else {
            None
        }
    });
    let ctx = match reusable {
        Some(mut ctx) => {
            clear_gpu_cache(&mut ctx);
            resize_wgpu(&mut ctx, px_w, px_h);
            ctx
        }
        None => {
            canvas.set_width(px_w);
            canvas.set_height(px_h);
            init_wgpu_from_canvas_id(canvas_id, &settings).await?
        }
    };

    STATE.with(|state| {
        let mut s = state.borrow_mut();
        s.canvas_id = Some(canvas_id.to_string());
        s.scene = Some(scene);
        s.wgpu = Some(ctx);
    });
    start_loop()
}

/// Renders one frame. Returns `false` once there is nothing to draw.
fn render_tick() -> bool {
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        let ViewerState { scene, wgpu, .. } = &mut *s;
        let (Some(scene), Some(ctx)) = (scene.as_mut(), wgpu.as_mut()) else {
            return false;
        };
        let frame = scene.tick();
        if let Err(err) = render_frame(ctx, &frame) {
            warn!(error = %err, "frame skipped");
        }
        true
    })
}

fn request_frame(callback: &Closure<dyn FnMut()>) -> Result<i32, ViewerError> {
    web_sys::window()
        .ok_or_else(|| ViewerError::Dom("window missing".into()))?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|e| ViewerError::Dom(format!("requestAnimationFrame failed: {e:?}")))
}

fn start_loop() -> Result<(), ViewerError> {
    let callback: FrameCallback = Rc::new(RefCell::new(None));
    let next = callback.clone();
    *callback.borrow_mut() = Some(Closure::new(move || {
        if !render_tick() {
            return;
        }
        let handle = match next.borrow().as_ref() {
            Some(cb) => request_frame(cb),
            None => return,
        };
        match handle {
            Ok(handle) => STATE.with(|state| {
                if let Some(animation) = state.borrow_mut().animation.as_mut() {
                    animation.handle = handle;
                }
            }),
            Err(err) => error!(error = %err, "animation loop ended"),
        }
    }));

    let handle = match callback.borrow().as_ref() {
        Some(cb) => request_frame(cb)?,
        None => return Ok(()),
    };
    STATE.with(|state| {
        state.borrow_mut().animation = Some(AnimationLoop { handle, callback });
    });
    info!("animation started");
    Ok(())
}
