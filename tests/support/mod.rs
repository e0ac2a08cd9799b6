#![allow(dead_code)]

pub mod config_env;
pub mod fakes;

use std::time::Duration;

use shape_sketch::lifecycle::ModelLifecycleController;

/// Poll the controller until `done` holds or the attempts run out.
pub fn poll_until(
    controller: &mut ModelLifecycleController,
    mut done: impl FnMut(&ModelLifecycleController) -> bool,
) -> bool {
    for _ in 0..400 {
        controller.poll();
        if done(controller) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Poll for a fixed window; used to prove that nothing changes.
pub fn poll_for(controller: &mut ModelLifecycleController, window: Duration) {
    let started = std::time::Instant::now();
    while started.elapsed() < window {
        controller.poll();
        std::thread::sleep(Duration::from_millis(5));
    }
}
