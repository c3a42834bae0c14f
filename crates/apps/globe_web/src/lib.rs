use console_error_panic_hook::set_once;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, error, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlCanvasElement;

use catalog::CityCatalog;
use ephemeris::city_time::CityTimeResolver;
use runtime::clock::SystemClock;
use scene::RebuildTicket;
use scene::picking::Viewport;
use viewer::config::{MarkerConfig, TextureUrls};
use viewer::{GlobeConfig, Presentation, Viewer};

pub mod dom_events;
mod gpu_backend;
pub mod logging;
pub mod textures;
pub mod tooltip_dom;

use dom_events::DomEventSource;
use gpu_backend::{GpuBackend, init_gpu};
use textures::{SharedTextureCache, TextureCache, load_textures};
use tooltip_dom::TooltipOverlay;

type GlobeViewer = Viewer<SystemClock, DomEventSource>;
type FrameCallback = Closure<dyn FnMut(f64)>;

/// Seconds between two animation frame timestamps (milliseconds).
pub fn frame_dt_s(previous_ms: Option<f64>, now_ms: f64) -> f64 {
    match previous_ms {
        Some(prev) if now_ms.is_finite() && prev.is_finite() => ((now_ms - prev) / 1000.0).max(0.0),
        _ => 0.0,
    }
}

/// Drawing buffer size for a canvas of `css_px` CSS pixels.
pub fn backing_size(css_px: f64, device_pixel_ratio: f64) -> u32 {
    let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    (css_px.max(1.0) * ratio).round() as u32
}

pub fn presentation_attr(presentation: Presentation) -> &'static str {
    match presentation {
        Presentation::Interactive => "interactive",
        Presentation::StaticImage => "static-image",
    }
}

/// requestAnimationFrame chain owned by one mount.
struct AnimationLoop {
    window: web_sys::Window,
    callback: Rc<RefCell<Option<FrameCallback>>>,
    handle: Rc<Cell<Option<i32>>>,
}

impl AnimationLoop {
    fn start(window: &web_sys::Window, mount_id: u64) -> Result<Self, JsValue> {
        let callback: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
        let handle = Rc::new(Cell::new(None));

        let next = Rc::clone(&callback);
        let next_handle = Rc::clone(&handle);
        let next_window = window.clone();
        *callback.borrow_mut() = Some(Closure::new(move |timestamp_ms: f64| {
            if !tick(mount_id, timestamp_ms) {
                next_handle.set(None);
                return;
            }
            if let Some(cb) = next.borrow().as_ref() {
                match next_window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    Ok(id) => next_handle.set(Some(id)),
                    Err(err) => error!(?err, "requestAnimationFrame failed"),
                }
            }
        }));

        if let Some(cb) = callback.borrow().as_ref() {
            handle.set(Some(window.request_animation_frame(cb.as_ref().unchecked_ref())?));
        }
        Ok(Self {
            window: window.clone(),
            callback,
            handle,
        })
    }

    fn stop(&self) {
        if let Some(id) = self.handle.take()
            && let Err(err) = self.window.cancel_animation_frame(id)
        {
            warn!(?err, "cancelAnimationFrame failed");
        }
        // Breaks the closure's reference to itself.
        self.callback.borrow_mut().take();
    }
}

struct PendingLoad {
    ticket: RebuildTicket,
    urls: TextureUrls,
    cache: SharedTextureCache,
}

struct App {
    mount_id: u64,
    viewer: GlobeViewer,
    canvas: HtmlCanvasElement,
    gpu: Option<GpuBackend>,
    overlay: Option<TooltipOverlay>,
    textures: SharedTextureCache,
    last_timestamp_ms: Option<f64>,
    render_failed: bool,
    animation: AnimationLoop,
}

impl App {
    fn step(&mut self, timestamp_ms: f64) -> Option<PendingLoad> {
        let dt_s = frame_dt_s(self.last_timestamp_ms.replace(timestamp_ms), timestamp_ms);
        self.viewer.frame(dt_s);

        let load = self.viewer.take_load_request().map(|ticket| PendingLoad {
            ticket,
            urls: self.viewer.config().textures.clone(),
            cache: Rc::clone(&self.textures),
        });

        let released = self.viewer.scene_mut().drain_released();
        if let Some(gpu) = &mut self.gpu {
            gpu.sync(&released, self.viewer.scene().resources());
            if self.viewer.presentation() == Presentation::Interactive {
                let frame = self.viewer.render_frame();
                let markers = self.viewer.marker_instances();
                match gpu.render(&frame, self.viewer.scene().resources(), &markers) {
                    Ok(()) => self.render_failed = false,
                    Err(err) => {
                        if !self.render_failed {
                            warn!(?err, "frame not drawn");
                        }
                        self.render_failed = true;
                    }
                }
            }
        }

        if let Some(overlay) = &mut self.overlay
            && let Err(err) = overlay.update(self.viewer.tooltip())
        {
            warn!(?err, "tooltip update failed");
        }
        load
    }

    fn resize(&mut self, width: f64, height: f64) -> Result<(), JsValue> {
        let presentation = self.viewer.resize(width, height);
        let ratio = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
        self.canvas.set_width(backing_size(width, ratio));
        self.canvas.set_height(backing_size(height, ratio));
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(self.canvas.width(), self.canvas.height());
        }
        set_presentation(&self.canvas, presentation)
    }
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
    static NEXT_MOUNT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Runs `f` against the app if `mount_id` is still the mounted one.
fn with_app<R>(mount_id: u64, f: impl FnOnce(&mut App) -> R) -> Option<R> {
    APP.try_with(|cell| {
        let mut slot = cell.borrow_mut();
        let app = slot.as_mut().filter(|a| a.mount_id == mount_id)?;
        Some(f(app))
    })
    .ok()
    .flatten()
}

fn tick(mount_id: u64, timestamp_ms: f64) -> bool {
    match with_app(mount_id, |app| app.step(timestamp_ms)) {
        None => false,
        Some(load) => {
            if let Some(load) = load {
                spawn_texture_load(mount_id, load);
            }
            true
        }
    }
}

fn spawn_texture_load(mount_id: u64, load: PendingLoad) {
    spawn_local(async move {
        let result = load_textures(&load.urls, &load.cache).await;
        if let Err(err) = &result {
            warn!(%err, "texture load failed");
        }
        match with_app(mount_id, |app| app.viewer.complete_load(load.ticket, result)) {
            Some(outcome) => debug!(?outcome, "texture load applied"),
            None => debug!(
                generation = load.ticket.generation(),
                "texture load finished after unmount"
            ),
        }
    });
}

fn spawn_gpu_init(mount_id: u64, canvas: HtmlCanvasElement, markers: MarkerConfig) {
    spawn_local(async move {
        match init_gpu(canvas, &markers).await {
            Ok(gpu) => {
                if with_app(mount_id, |app| app.gpu = Some(gpu)).is_none() {
                    debug!("gpu ready after unmount");
                }
            }
            Err(err) => error!(?err, "wgpu init failed"),
        }
    });
}

fn set_presentation(canvas: &HtmlCanvasElement, presentation: Presentation) -> Result<(), JsValue> {
    canvas.set_attribute("data-presentation", presentation_attr(presentation))
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Mounts the globe on `canvas_id`, replacing any globe already mounted.
///
/// `config_json` overrides defaults field by field; omitted means all
/// defaults.
#[wasm_bindgen]
pub fn mount(canvas_id: &str, config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json.as_deref() {
        Some(json) => GlobeConfig::from_json(json).map_err(to_js)?,
        None => GlobeConfig::default(),
    };
    logging::init(&config.log_filter);
    unmount();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str(&format!("no element #{canvas_id}")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str(&format!("#{canvas_id} is not a canvas")))?;
    let catalog = CityCatalog::bundled().map_err(to_js)?;

    let width = f64::from(canvas.client_width());
    let height = f64::from(canvas.client_height());
    let ratio = window.device_pixel_ratio();
    canvas.set_width(backing_size(width, ratio));
    canvas.set_height(backing_size(height, ratio));

    let markers = config.markers;
    let source = DomEventSource::new(window.clone(), canvas.clone());
    let viewer = Viewer::mount(
        config,
        &catalog,
        SystemClock,
        source,
        CityTimeResolver::new(),
        Viewport::new(width, height),
    );
    set_presentation(&canvas, viewer.presentation())?;

    let overlay = match TooltipOverlay::attach(&document, &canvas) {
        Ok(overlay) => Some(overlay),
        Err(err) => {
            warn!(?err, "tooltip overlay unavailable");
            None
        }
    };

    let mount_id = NEXT_MOUNT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    let animation = AnimationLoop::start(&window, mount_id)?;

    APP.with(|app| {
        *app.borrow_mut() = Some(App {
            mount_id,
            viewer,
            canvas: canvas.clone(),
            gpu: None,
            overlay,
            textures: Rc::new(RefCell::new(TextureCache::default())),
            last_timestamp_ms: None,
            render_failed: false,
            animation,
        });
    });
    spawn_gpu_init(mount_id, canvas, markers);
    info!(canvas = canvas_id, mount_id, "globe mounted");
    Ok(())
}

/// Tears the globe down. Returns how many scene resources were released.
#[wasm_bindgen]
pub fn unmount() -> u32 {
    let Some(mut app) = APP.with(|app| app.borrow_mut().take()) else {
        return 0;
    };
    app.animation.stop();
    if let Some(overlay) = app.overlay.take() {
        overlay.remove();
    }
    let released = app.viewer.unmount();
    u32::try_from(released).unwrap_or(u32::MAX)
}

/// Call when the canvas' CSS size changes.
#[wasm_bindgen]
pub fn resize(width: f64, height: f64) -> Result<(), JsValue> {
    APP.with(|app| match app.borrow_mut().as_mut() {
        Some(app) => app.resize(width, height),
        None => Ok(()),
    })
}

#[cfg(test)]
mod tests {
    use super::{backing_size, frame_dt_s, presentation_attr};
    use viewer::Presentation;

    #[test]
    fn first_frame_has_no_elapsed_time() {
        assert_eq!(frame_dt_s(None, 1234.0), 0.0);
        assert_eq!(frame_dt_s(Some(1000.0), 1016.0), 0.016);
        assert_eq!(frame_dt_s(Some(2000.0), 1000.0), 0.0);
        assert_eq!(frame_dt_s(Some(f64::NAN), 1000.0), 0.0);
    }

    #[test]
    fn backing_store_follows_device_pixel_ratio() {
        assert_eq!(backing_size(800.0, 2.0), 1600);
        assert_eq!(backing_size(801.0, 1.5), 1202);
        assert_eq!(backing_size(0.0, 1.0), 1);
        assert_eq!(backing_size(640.0, f64::NAN), 640);
    }

    #[test]
    fn presentation_is_exposed_as_a_data_attribute() {
        assert_eq!(presentation_attr(Presentation::Interactive), "interactive");
        assert_eq!(presentation_attr(Presentation::StaticImage), "static-image");
    }
}
