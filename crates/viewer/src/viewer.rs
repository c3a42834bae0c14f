use catalog::{City, CityCatalog};
use ephemeris::city_time::CityTimeResolver;
use ephemeris::timezone::{TimezoneLookup, TzfLookup};
use foundation::math::GeoPoint;
use gpu::mesh::MarkerInstance;
use gpu::{RenderFrame, Renderer};
use runtime::clock::Clock;
use runtime::event_bus::InputSource;
use runtime::frame::Frame;
use runtime::time_controller::{SolarUpdate, TimeController};
use scene::picking::{PickOptions, Viewport, pick_marker};
use scene::{LoadedTextures, RebuildOutcome, RebuildTicket, SceneRenderer, TextureError};
use tracing::{debug, info, warn};

use crate::camera::OrbitCamera;
use crate::config::GlobeConfig;
use crate::interaction::{HoverState, Intent, InteractionLayer};
use crate::tooltip::{Tooltip, TooltipContent, place_tooltip};

/// How the host should present the globe at the current width.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Presentation {
    Interactive,
    /// Narrow screens get a static picture instead of the canvas.
    StaticImage,
}

impl Presentation {
    pub fn for_width(width: f64, breakpoint_px: f64) -> Self {
        if width < breakpoint_px {
            Presentation::StaticImage
        } else {
            Presentation::Interactive
        }
    }
}

/// A mounted globe: time, scene, input and hover state for one canvas.
///
/// The host drives it with [`Viewer::frame`], fulfils texture loads handed
/// out by [`Viewer::take_load_request`] and draws [`Viewer::render_frame`].
pub struct Viewer<C: Clock, S: InputSource, L: TimezoneLookup = TzfLookup> {
    config: GlobeConfig,
    cities: Vec<City>,
    markers: Vec<GeoPoint>,
    time: TimeController<C>,
    scene: SceneRenderer,
    interaction: InteractionLayer<S>,
    camera: OrbitCamera,
    resolver: CityTimeResolver<L>,
    night_mode: bool,
    viewport: Viewport,
    frame: Frame,
    load_request: Option<RebuildTicket>,
}

impl<C: Clock, S: InputSource, L: TimezoneLookup> Viewer<C, S, L> {
    /// Subscribes to input, starts the auto tick and requests the first
    /// scene build.
    pub fn mount(
        config: GlobeConfig,
        catalog: &CityCatalog,
        clock: C,
        source: S,
        resolver: CityTimeResolver<L>,
        viewport: Viewport,
    ) -> Self {
        let cities = catalog.prefix(config.markers.limit).to_vec();
        let markers = cities.iter().map(City::location).collect();
        let time = TimeController::new(clock, config.time_settings());
        let scene = SceneRenderer::new(config.scene_settings());
        let interaction = InteractionLayer::mount(source, &config.keys);
        let camera = OrbitCamera::new(&config.camera, config.starfield.radius);

        let mut viewer = Self {
            config,
            cities,
            markers,
            time,
            scene,
            interaction,
            camera,
            resolver,
            night_mode: false,
            viewport,
            frame: Frame::first(),
            load_request: None,
        };
        info!(
            cities = viewer.cities.len(),
            width = viewport.width,
            height = viewport.height,
            "globe viewer mounted"
        );
        viewer.refresh_scene();
        viewer
    }

    pub fn is_mounted(&self) -> bool {
        self.scene.is_mounted()
    }

    pub fn config(&self) -> &GlobeConfig {
        &self.config
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn time(&self) -> &TimeController<C> {
        &self.time
    }

    pub fn scene(&self) -> &SceneRenderer {
        &self.scene
    }

    /// For the GPU backend, which drains released handles.
    pub fn scene_mut(&mut self) -> &mut SceneRenderer {
        &mut self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn input(&self) -> &S {
        self.interaction.source()
    }

    pub fn input_mut(&mut self) -> &mut S {
        self.interaction.source_mut()
    }

    pub fn night_mode(&self) -> bool {
        self.night_mode
    }

    pub fn hover(&self) -> HoverState {
        self.interaction.hover()
    }

    pub fn last_frame(&self) -> Frame {
        self.frame
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn presentation(&self) -> Presentation {
        Presentation::for_width(self.viewport.width, self.config.narrow_breakpoint_px)
    }

    pub fn resize(&mut self, width: f64, height: f64) -> Presentation {
        self.viewport = Viewport::new(width.max(0.0), height.max(0.0));
        self.presentation()
    }

    /// One host animation frame: applies queued input, then feeds elapsed
    /// time to the auto tick. Several changes within one frame collapse
    /// into a single rebuild request.
    pub fn frame(&mut self, dt_s: f64) -> Frame {
        if !self.is_mounted() {
            return self.frame;
        }
        self.frame = self.frame.next(dt_s);

        let mut changed = false;
        for intent in self.interaction.poll() {
            changed |= self.apply(intent);
        }
        if self.time.advance(self.frame.dt_s).is_some() {
            changed = true;
        }
        if changed {
            self.refresh_scene();
        }
        self.frame
    }

    fn apply(&mut self, intent: Intent) -> bool {
        match intent {
            Intent::Hover { x, y } => {
                let city = self.pick([x, y]);
                self.interaction.set_hovered_city(city);
                false
            }
            Intent::Leave => false,
            Intent::Orbit { dx, dy } => {
                if self.scene.controls().rotate_enabled {
                    self.camera.orbit(dx, dy);
                }
                false
            }
            Intent::TimeScroll { delta_y } => self.time.scroll(delta_y).is_some(),
            Intent::ToggleNight => {
                self.night_mode = !self.night_mode;
                info!(night_mode = self.night_mode, "night mode toggled");
                true
            }
            Intent::ResetTime => self.time.reset().is_some(),
        }
    }

    fn pick(&self, cursor: [f64; 2]) -> Option<usize> {
        let camera = self.camera.camera();
        let view_proj = camera.view_proj(self.aspect());
        let opts = PickOptions {
            radius_px: self.config.markers.pick_radius_px,
            globe_radius: self.marker_radius(),
        };
        pick_marker(&self.markers, view_proj, camera.position, self.viewport, cursor, opts).map(|hit| hit.index)
    }

    fn aspect(&self) -> f64 {
        self.viewport.width / self.viewport.height.max(1.0)
    }

    fn marker_radius(&self) -> f64 {
        scene::globe::GLOBE_RADIUS * (1.0 + self.config.markers.altitude)
    }

    /// Requests a rebuild unless the newest request already matches.
    fn refresh_scene(&mut self) {
        let SolarUpdate { subsolar, .. } = self.time.current();
        if self.scene.latest_inputs() == Some((subsolar, self.night_mode)) {
            return;
        }
        if let Some(ticket) = self.scene.request_rebuild(subsolar, self.night_mode) {
            debug!(
                generation = ticket.generation(),
                lat = subsolar.lat,
                lon = subsolar.lon,
                night_mode = self.night_mode,
                "scene rebuild requested"
            );
            self.load_request = Some(ticket);
        }
    }

    /// The rebuild whose textures the host should load next, if any.
    pub fn take_load_request(&mut self) -> Option<RebuildTicket> {
        self.load_request.take().filter(|t| self.scene.is_current(*t))
    }

    pub fn complete_load(
        &mut self,
        ticket: RebuildTicket,
        result: Result<LoadedTextures, TextureError>,
    ) -> RebuildOutcome {
        let outcome = self.scene.complete_rebuild(ticket, result);
        if let RebuildOutcome::Fallback { generation } = outcome {
            warn!(generation, "globe shown without textures");
        }
        outcome
    }

    /// Hovered city with its local time, placed next to the cursor.
    pub fn tooltip(&self) -> Option<Tooltip> {
        let hover = self.interaction.hover();
        let city = self.cities.get(hover.city?)?;
        let cursor = hover.cursor?;
        let time = self.resolver.resolve(city.location(), self.time.display_instant());
        let card = place_tooltip(
            cursor,
            [self.viewport.width, self.viewport.height],
            &self.config.tooltip,
        );
        Some(Tooltip {
            content: TooltipContent::new(city, time),
            card,
        })
    }

    pub fn marker_instances(&self) -> Vec<MarkerInstance> {
        let hovered = self.interaction.hover().city;
        let radius = self.marker_radius();
        self.markers
            .iter()
            .enumerate()
            .map(|(i, m)| MarkerInstance {
                position: m.to_sphere_point(radius).to_f32(),
                highlight: if hovered == Some(i) { 1.0 } else { 0.0 },
            })
            .collect()
    }

    pub fn render_frame(&self) -> RenderFrame {
        Renderer::collect(
            self.scene.live(),
            self.scene.resources(),
            &self.camera.camera(),
            [self.viewport.width as f32, self.viewport.height as f32],
            self.config.markers.size_px,
            &self.marker_instances(),
        )
    }

    /// Detaches input, stops the clock and releases every scene resource.
    /// Returns the number of resources released.
    pub fn unmount(&mut self) -> usize {
        if !self.is_mounted() {
            return 0;
        }
        let listeners = self.interaction.unmount();
        self.time.shutdown();
        self.load_request = None;
        let released = self.scene.unmount();
        info!(listeners, released, "globe viewer unmounted");
        released
    }
}
