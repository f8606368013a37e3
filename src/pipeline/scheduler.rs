//! Render Scheduler - From state changes to stroked frames
//!
//! The hub that ties store, channel, compiler, and surface together:
//!
//! - **Frame coalescing** - any number of change notifications collapse into
//!   one pending frame; the next tick renders once
//! - **Render pass** - clear, grid, axes, then every visible function in
//!   state order, scanning each horizontal pixel column
//! - **Deferred errors** - evaluation failures collect into a [`FrameOutcome`]
//!   during the pass and land in state as one batched write afterwards, so a
//!   render never observes its own mutations mid-frame
//! - **Parameter scan** - expression edits debounce into a scan that inserts
//!   newly referenced symbols into `controls` with a default value
//! - **Viewport** - pan/zoom mutate a local rectangle immediately and persist
//!   to state on a longer debounce, so gestures do not spam writes

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::events::EventChannel;
use crate::expr::{
    get_all_variables, Compiler, CompiledExpression, Scope, PRIMARY_VAR, SECONDARY_VAR,
};
use crate::state::{Path, StateStore, Value};
use crate::surface::RasterSurface;
use crate::types::Rgba;
use crate::viewport::{grid_step, Viewport, DEFAULT_GRID_SPACING_PX};

use super::functions::{function_index, functions_list};
use super::timing::{Debouncer, FrameCoalescer, TaskTimer};

/// Value a newly auto-detected control parameter starts at.
pub const DEFAULT_CONTROL_VALUE: f64 = 1.0;

const GRID_COLOR: Rgba = Rgba::rgb(58, 58, 58);
const AXIS_COLOR: Rgba = Rgba::rgb(140, 140, 140);

// =============================================================================
// Options & FrameOutcome
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerOptions {
    /// Quiet period before the parameter scan runs.
    pub scan_delay_ms: u64,
    /// Quiet period before pan/zoom changes are written back to state.
    pub persist_delay_ms: u64,
    /// How far (in pixels) a stroked point may leave the raster vertically
    /// before the path breaks. A heuristic clip, not exact clipping.
    pub margin_px: f64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            scan_delay_ms: 300,
            persist_delay_ms: 500,
            margin_px: 100.0,
        }
    }
}

/// Error text per function id collected during one render pass.
///
/// The pass only reads state; applying the outcome afterwards is the single
/// write, batched so unchanged error fields stay untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    errors: Vec<(String, Option<String>)>,
}

impl FrameOutcome {
    fn record(&mut self, id: impl Into<String>, error: Option<String>) {
        self.errors.push((id.into(), error));
    }

    /// `(function id, error text)` pairs in draw order; `None` clears a
    /// previously recorded error.
    pub fn errors(&self) -> &[(String, Option<String>)] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// RenderScheduler
// =============================================================================

pub struct RenderScheduler<S: RasterSurface> {
    store: Rc<StateStore>,
    channel: Rc<EventChannel>,
    compiler: Rc<Compiler>,
    surface: RefCell<S>,
    /// Authoritative rectangle between persists; state catches up on a
    /// debounce.
    viewport: RefCell<Viewport>,
    coalescer: FrameCoalescer,
    scan: Debouncer,
    persist: Debouncer,
    options: SchedulerOptions,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    frames_rendered: Cell<u64>,
}

impl<S: RasterSurface + 'static> RenderScheduler<S> {
    /// Builds the scheduler and wires it to the store and channel. All
    /// listeners hold weak references, so dropping the returned `Rc` (after
    /// [`RenderScheduler::teardown`]) releases everything.
    pub fn new(
        store: Rc<StateStore>,
        channel: Rc<EventChannel>,
        compiler: Rc<Compiler>,
        surface: S,
        timer: Rc<TaskTimer>,
        options: SchedulerOptions,
    ) -> Rc<Self> {
        let scheduler = Rc::new(Self {
            coalescer: FrameCoalescer::new(timer.clone()),
            scan: Debouncer::new(timer.clone(), options.scan_delay_ms),
            persist: Debouncer::new(timer, options.persist_delay_ms),
            store,
            channel,
            compiler,
            surface: RefCell::new(surface),
            viewport: RefCell::new(Viewport::default()),
            options,
            cleanups: RefCell::new(Vec::new()),
            frames_rendered: Cell::new(0),
        });
        scheduler.sync_viewport_from_state();
        scheduler.wire();
        scheduler
    }

    fn wire(self: &Rc<Self>) {
        let mut cleanups = self.cleanups.borrow_mut();

        // Expression edits redraw now and rescan for new parameters soon.
        let weak = Rc::downgrade(self);
        cleanups.push(
            self.channel
                .subscribe("expression:updated", move |_| {
                    if let Some(scheduler) = weak.upgrade() {
                        scheduler.request_frame();
                        scheduler.schedule_scan();
                    }
                })
                .into_cancel(),
        );

        let weak = Rc::downgrade(self);
        cleanups.push(
            self.channel
                .subscribe("controls:updated", move |_| {
                    if let Some(scheduler) = weak.upgrade() {
                        scheduler.request_frame();
                    }
                })
                .into_cancel(),
        );

        // A wholesale reseed moves the viewport and may introduce new
        // expressions, so it behaves like an edit plus a viewport write.
        for event in ["state:initialized", "state:reset"] {
            let weak = Rc::downgrade(self);
            cleanups.push(
                self.channel
                    .subscribe(event, move |_| {
                        if let Some(scheduler) = weak.upgrade() {
                            scheduler.sync_viewport_from_state();
                            scheduler.request_frame();
                            scheduler.schedule_scan();
                        }
                    })
                    .into_cancel(),
            );
        }

        for path in [Path::functions(), Path::controls(), Path::graph()] {
            let weak = Rc::downgrade(self);
            cleanups.push(
                self.store
                    .subscribe(&path, move |_| {
                        if let Some(scheduler) = weak.upgrade() {
                            scheduler.request_frame();
                        }
                    })
                    .into_cancel(),
            );
        }

        let weak = Rc::downgrade(self);
        cleanups.push(
            self.store
                .subscribe(&Path::viewport(), move |_| {
                    if let Some(scheduler) = weak.upgrade() {
                        if scheduler.sync_viewport_from_state() {
                            scheduler.request_frame();
                        }
                    }
                })
                .into_cancel(),
        );
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Queues a render for the next tick. No-op while one is already
    /// pending.
    pub fn request_frame(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.coalescer.request(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.render_frame();
            }
        });
    }

    /// (Re)starts the parameter-scan debounce.
    pub fn schedule_scan(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.scan.trigger(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.run_parameter_scan();
            }
        });
    }

    fn schedule_persist(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.persist.trigger(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.persist_viewport();
            }
        });
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Pans by a raster-space pixel delta, redraws, and persists the
    /// viewport after a quiet period.
    pub fn pan_by_pixels(self: &Rc<Self>, dx: f64, dy: f64) {
        {
            let surface = self.surface.borrow();
            let (width, height) = (surface.width(), surface.height());
            self.viewport.borrow_mut().pan_by_pixels(dx, dy, width, height);
        }
        self.request_frame();
        self.schedule_persist();
    }

    /// Zooms keeping the domain point under the pixel anchor fixed.
    pub fn zoom_at(self: &Rc<Self>, px: f64, py: f64, factor: f64) {
        {
            let surface = self.surface.borrow();
            let (width, height) = (surface.width(), surface.height());
            self.viewport.borrow_mut().zoom_at(px, py, factor, width, height);
        }
        self.request_frame();
        self.schedule_persist();
    }

    /// Zooms about the center of the view.
    pub fn zoom_by(self: &Rc<Self>, factor: f64) {
        self.viewport.borrow_mut().zoom_centered(factor);
        self.request_frame();
        self.schedule_persist();
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.borrow()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.get()
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn render_frame(&self) {
        self.frames_rendered.set(self.frames_rendered.get() + 1);
        let outcome = self.render_pass();
        self.apply_outcome(&outcome);
    }

    /// Draws one frame. Reads state freely but never writes it; everything
    /// that must change lands in the returned [`FrameOutcome`].
    fn render_pass(&self) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        let viewport = *self.viewport.borrow();
        let mut surface = self.surface.borrow_mut();

        surface.clear();
        if self.flag_enabled("showGrid") {
            draw_grid(&mut *surface, &viewport);
        }
        if self.flag_enabled("showAxes") {
            draw_axes(&mut *surface, &viewport);
        }

        let controls = self.control_scope();
        for entry in functions_list(&self.store) {
            let Some(function) = entry.as_map() else {
                continue;
            };
            let visible = function
                .get("visible")
                .and_then(|value| value.as_bool())
                .unwrap_or(true);
            if !visible {
                continue;
            }
            let Some(id) = function.get("id").and_then(Value::as_str) else {
                continue;
            };
            let text = function
                .get("expression")
                .and_then(Value::as_str)
                .unwrap_or("");
            if text.trim().is_empty() {
                continue;
            }
            let Ok(compiled) = self.compiler.parse(text, None) else {
                continue;
            };
            if !compiled.is_valid {
                outcome.record(id, compiled.error.clone());
                continue;
            }

            let color = function
                .get("color")
                .and_then(Value::as_str)
                .and_then(Rgba::from_hex)
                .unwrap_or(Rgba::WHITE);
            let error = draw_function(
                &mut *surface,
                &viewport,
                &compiled,
                &controls,
                color,
                self.options.margin_px,
            );
            outcome.record(id, error);
        }

        surface.present();
        outcome
    }

    /// Writes collected error text back to state as one batched update,
    /// touching only the functions whose recorded error actually changed.
    fn apply_outcome(&self, outcome: &FrameOutcome) {
        let mut writes = Vec::new();
        for (id, error) in outcome.errors() {
            let Some(index) = function_index(&self.store, id) else {
                continue;
            };
            let path = Path::functions().index(index).key("error");
            let desired = error.clone().map(Value::from).unwrap_or(Value::Null);
            let current = self.store.get(&path).unwrap_or(Value::Null);
            if current != desired {
                writes.push((path, desired));
            }
        }
        if !writes.is_empty() {
            self.store.update(writes);
        }
    }

    // =========================================================================
    // Parameter Scan
    // =========================================================================

    /// Inserts every free symbol referenced by any expression (other than
    /// the plotting variables) into `controls` at the default value, as a
    /// single batched write, then announces the new names.
    fn run_parameter_scan(self: &Rc<Self>) {
        let mut seen: BTreeSet<String> = self.control_scope().into_keys().collect();
        let mut inserts = Vec::new();
        let mut names = Vec::new();

        for entry in functions_list(&self.store) {
            let Some(text) = entry
                .as_map()
                .and_then(|map| map.get("expression"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            for symbol in get_all_variables(text) {
                if symbol == PRIMARY_VAR || symbol == SECONDARY_VAR {
                    continue;
                }
                if seen.insert(symbol.clone()) {
                    names.push(Value::from(symbol.clone()));
                    inserts.push((
                        Path::controls().key(symbol),
                        Value::from(DEFAULT_CONTROL_VALUE),
                    ));
                }
            }
        }

        if inserts.is_empty() {
            return;
        }
        debug!(count = inserts.len(), "auto-detected control parameters");
        self.store.update(inserts);
        // The channel wiring turns this announcement into the redraw.
        self.channel.publish(
            "controls:updated",
            &Value::object([("names", Value::List(names))]),
        );
    }

    // =========================================================================
    // State Access
    // =========================================================================

    /// Current control parameters as an evaluation scope.
    fn control_scope(&self) -> Scope {
        let mut scope = Scope::new();
        if let Some(Value::Map(controls)) = self.store.get(&Path::controls()) {
            for (name, value) in controls {
                if let Some(number) = value.as_f64() {
                    scope.insert(name, number);
                }
            }
        }
        scope
    }

    fn flag_enabled(&self, key: &str) -> bool {
        self.store
            .get(&Path::graph().key(key))
            .and_then(|value| value.as_bool())
            .unwrap_or(true)
    }

    /// Adopts the state tree's viewport when it differs from the local
    /// rectangle. Returns whether anything changed.
    fn sync_viewport_from_state(&self) -> bool {
        let Some(value) = self.store.get(&Path::viewport()) else {
            return false;
        };
        let Some(next) = Viewport::from_value(&value) else {
            warn!("viewport state is malformed; keeping the current rectangle");
            return false;
        };
        let mut viewport = self.viewport.borrow_mut();
        if *viewport == next {
            return false;
        }
        *viewport = next;
        true
    }

    fn persist_viewport(&self) {
        let value = self.viewport.borrow().to_value();
        self.store.set(&Path::viewport(), value);
    }
}

// =============================================================================
// Teardown
// =============================================================================

// Outside the `'static` impl so the `Drop` below, which carries the struct's
// own bounds, can call it.
impl<S: RasterSurface> RenderScheduler<S> {
    /// Detaches every listener and cancels all pending work. Error text
    /// collected during a pass lives in that pass's [`FrameOutcome`], so
    /// there is no lingering per-frame state to clear.
    pub fn teardown(&self) {
        for cleanup in self.cleanups.borrow_mut().drain(..) {
            cleanup();
        }
        self.coalescer.cancel();
        self.scan.cancel();
        self.persist.cancel();
    }
}

impl<S: RasterSurface> Drop for RenderScheduler<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// =============================================================================
// Drawing
// =============================================================================

/// Scans every pixel column left to right, evaluating with `x` merged over
/// the control scope, and strokes the resulting polyline. The pen lifts on
/// non-finite values and on points far outside the raster. An evaluation
/// error aborts the scan and becomes the function's error text.
fn draw_function<S: RasterSurface>(
    surface: &mut S,
    viewport: &Viewport,
    compiled: &CompiledExpression,
    controls: &Scope,
    color: Rgba,
    margin_px: f64,
) -> Option<String> {
    let (width, height) = (surface.width(), surface.height());
    surface.set_stroke(color, 1.0);
    surface.begin_path();

    let mut scope = controls.clone();
    let mut pen_down = false;
    let mut error = None;

    for px in 0..width {
        let (x, _) = viewport.pixel_to_domain(px as f64, 0.0, width, height);
        scope.insert(PRIMARY_VAR.to_string(), x);
        match compiled.try_evaluate(&scope) {
            Ok(y) if y.is_finite() => {
                let (sx, sy) = viewport.domain_to_pixel(x, y, width, height);
                if sy < -margin_px || sy > height as f64 + margin_px {
                    pen_down = false;
                } else if pen_down {
                    surface.line_to(sx, sy);
                } else {
                    surface.move_to(sx, sy);
                    pen_down = true;
                }
            }
            Ok(_) => pen_down = false,
            Err(eval_error) => {
                error = Some(eval_error.to_string());
                break;
            }
        }
    }

    surface.stroke();
    error
}

/// Indices `n` whose multiple `n * step` lies within `[min, max]`. Stepping
/// by index instead of accumulating `x += step` keeps interior lines from
/// drifting, and the nudge keeps a bound sitting exactly on a multiple
/// inside the range (`0.6 / 0.2` divides to just under 3).
fn grid_line_indices(min: f64, max: f64, step: f64) -> RangeInclusive<i64> {
    const NUDGE: f64 = 1e-9;
    let first = (min / step - NUDGE).ceil() as i64;
    let last = (max / step + NUDGE).floor() as i64;
    first..=last
}

fn draw_grid<S: RasterSurface>(surface: &mut S, viewport: &Viewport) {
    let (width, height) = (surface.width(), surface.height());
    surface.set_stroke(GRID_COLOR, 1.0);
    surface.begin_path();

    let step = grid_step(viewport.x_range(), width, DEFAULT_GRID_SPACING_PX);
    for n in grid_line_indices(viewport.x_min, viewport.x_max, step) {
        let (px, _) = viewport.domain_to_pixel(n as f64 * step, 0.0, width, height);
        surface.move_to(px, 0.0);
        surface.line_to(px, height as f64);
    }

    let step = grid_step(viewport.y_range(), height, DEFAULT_GRID_SPACING_PX);
    for n in grid_line_indices(viewport.y_min, viewport.y_max, step) {
        let (_, py) = viewport.domain_to_pixel(0.0, n as f64 * step, width, height);
        surface.move_to(0.0, py);
        surface.line_to(width as f64, py);
    }

    surface.stroke();
}

fn draw_axes<S: RasterSurface>(surface: &mut S, viewport: &Viewport) {
    let (width, height) = (surface.width(), surface.height());
    surface.set_stroke(AXIS_COLOR, 1.0);
    surface.begin_path();

    if (viewport.x_min..=viewport.x_max).contains(&0.0) {
        let (px, _) = viewport.domain_to_pixel(0.0, 0.0, width, height);
        surface.move_to(px, 0.0);
        surface.line_to(px, height as f64);
    }
    if (viewport.y_min..=viewport.y_max).contains(&0.0) {
        let (_, py) = viewport.domain_to_pixel(0.0, 0.0, width, height);
        surface.move_to(0.0, py);
        surface.line_to(width as f64, py);
    }

    surface.stroke();
}

// =============================================================================
// Tests
// =============================================================================
