//! Browser tests for the JS-facing wrapper. Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use robot_core::RobotEngine;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn rejects_malformed_config() {
    assert!(RobotEngine::new("{not json", 0.0).is_err());
}

#[wasm_bindgen_test]
fn exit_and_come_back_through_the_wrapper() {
    let mut engine = RobotEngine::new(r#"{"entrance":false}"#, 0.0).unwrap();
    engine.command("exitRight", 0.0);

    let mut now = 0.0;
    while !engine.has_exited() && now < 10_000.0 {
        now += 16.0;
        engine.tick(now).unwrap();
    }
    assert!(engine.has_exited());
    assert!(engine.tick(now + 16.0).unwrap().contains(r#""commands":[]"#));

    engine.command("comeBack", now);
    assert_eq!(engine.current_state(), "comeBack");
    assert!(!engine.has_exited());
}

#[wasm_bindgen_test]
fn unknown_names_do_not_throw() {
    let mut engine = RobotEngine::new("{}", 0.0).unwrap();
    engine.command("fly", 0.0);
    engine.asset_loaded("upsideDown", false);
    assert!(!engine.request_state("moonwalk", 0.0));
}
