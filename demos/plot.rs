//! Interactive braille function plotter.
//!
//! Renders expressions into the full terminal and reacts to input the
//! same way the graphing pipeline does: every keypress mutates state,
//! and the scheduler coalesces the fallout into frames.
//!
//! Run with: cargo run --example plot -- "sin(x)" "a*sin(b*x)"
//!
//! Keys:
//! - Arrows: pan
//! - + / -: zoom in / out
//! - g / a: toggle grid / axes
//! - 0 or r: reset the viewport
//! - q / Esc: quit

use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::terminal;
use tracing_subscriber::EnvFilter;

use spark_plot::pipeline::{RenderScheduler, SchedulerOptions, TaskTimer, add_function};
use spark_plot::state::{Path, StateStore, Value};
use spark_plot::term::{PlotAction, TermSurface, poll_action};
use spark_plot::viewport::Viewport;
use spark_plot::{Compiler, EventChannel, GraphConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut expressions: Vec<String> = std::env::args().skip(1).collect();
    if expressions.is_empty() {
        expressions = vec!["sin(x)".into(), "a*sin(b*x)".into()];
    }

    // Terminal setup
    let (cols, rows) = terminal::size()?;
    let mut surface = TermSurface::stdout(cols, rows);
    surface.enter_fullscreen()?;
    terminal::enable_raw_mode()?;

    // Pipeline wiring
    let channel = Rc::new(EventChannel::new());
    let store = Rc::new(StateStore::new(channel.clone()));
    let compiler = Rc::new(Compiler::new());
    let timer = Rc::new(TaskTimer::new());

    let scheduler = RenderScheduler::new(
        store.clone(),
        channel.clone(),
        compiler.clone(),
        surface,
        timer.clone(),
        SchedulerOptions::default(),
    );

    store.initialize(&GraphConfig::default());
    for (i, expression) in expressions.iter().enumerate() {
        add_function(
            &store,
            &channel,
            &compiler,
            format!("f{}", i + 1),
            expression.clone(),
        );
    }

    // ~60fps: poll input, advance the virtual clock by wall time, then
    // run due timers and coalesced frames.
    let mut last = Instant::now();
    loop {
        match poll_action(Duration::from_millis(16))? {
            Some(PlotAction::Quit) => break,
            Some(PlotAction::Pan(dx, dy)) => scheduler.pan_by_pixels(dx, dy),
            Some(PlotAction::ZoomIn) => scheduler.zoom_by(1.25),
            Some(PlotAction::ZoomOut) => scheduler.zoom_by(0.8),
            Some(PlotAction::ToggleGrid) => toggle_flag(&store, "showGrid"),
            Some(PlotAction::ToggleAxes) => toggle_flag(&store, "showAxes"),
            Some(PlotAction::Reset) => {
                store.set(&Path::viewport(), Viewport::default().to_value());
            }
            Some(PlotAction::Resize(..)) => scheduler.request_frame(),
            None => {}
        }

        let now = Instant::now();
        let elapsed_ms = now.duration_since(last).as_millis() as u64;
        if elapsed_ms > 0 {
            timer.advance(elapsed_ms);
            last = now;
        }
        timer.tick();
    }

    terminal::disable_raw_mode()?;
    Ok(())
}

fn toggle_flag(store: &StateStore, name: &str) {
    let path = Path::graph().key(name);
    let current = store
        .get(&path)
        .and_then(|value| value.as_bool())
        .unwrap_or(true);
    store.set(&path, Value::from(!current));
}
