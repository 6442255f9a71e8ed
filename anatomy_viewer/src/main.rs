//! Anatomy viewer demo
//!
//! Runs the full compositing session against the simulated device stack:
//! synthetic stereo camera frames as the passthrough background, the
//! configured anatomical models overlaid with head tracking, both eyes
//! composited headlessly and counted by the null display.

use std::process;

use ar_engine::config::SessionConfig;
use ar_engine::logging;
use ar_engine::render::backends::HeadlessDevice;
use ar_engine::session::Session;
use ar_engine::sim::{NullDisplay, SimulatedHmd, SyntheticStereoCamera};

const CONFIG_PATH: &str = "anatomy_viewer.ron";

fn main() {
    logging::init();

    let config = SessionConfig::load_or_default(CONFIG_PATH);

    // Device construction failures are fatal: without tracking or a
    // camera there is nothing to composite.
    let hmd = SimulatedHmd::connect().unwrap_or_else(|e| {
        log::error!("tracking runtime unavailable: {e}");
        process::exit(1);
    });
    let camera = SyntheticStereoCamera::open(config.camera.width, config.camera.height)
        .unwrap_or_else(|e| {
            log::error!("stereo camera unavailable: {e}");
            process::exit(1);
        });
    let display = NullDisplay::new(config.frame_budget.unwrap_or(u64::MAX));

    let mut session = Session::new(
        Box::new(HeadlessDevice::new()),
        Box::new(hmd),
        Box::new(camera),
        Box::new(display),
        &config,
    )
    .unwrap_or_else(|e| {
        log::error!("session init failed: {e}");
        process::exit(1);
    });

    if let Err(e) = session.run() {
        log::error!("session aborted: {e}");
        process::exit(1);
    }
}
