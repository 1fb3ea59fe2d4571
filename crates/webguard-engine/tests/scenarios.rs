#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use webguard_engine::config::{self, GuardConfig};
use webguard_engine::context::FrameKind;
use webguard_engine::obs::GuardMetrics;
use webguard_engine::scenario;
use webguard_engine::storage::MemoryStore;

const MIXED: &str = r#"
top_url: https://a.com/index.html
steps:
  - script: https://b.com/lib.js
    set_image_src: http://b.com/x.png
  - script: https://b.com/lib.js
    set_image_src: https://a.com/logo.png
  - script: https://a.com/app.js
    set_inner_html: "<p>hi</p>"
  - script: https://b.com/lib.js
    xhr_open: { method: GET, url: "https://api.b.com/track" }
  - create_element: img
"#;

#[tokio::test(start_paused = true)]
async fn mixed_page_reports_steps_and_reconciles() {
    let sc = scenario::load_from_str(MIXED).unwrap();
    let metrics = Arc::new(GuardMetrics::default());
    let report = scenario::run(&sc, &GuardConfig::default(), Arc::new(MemoryStore::new()), metrics.clone())
        .await
        .unwrap();

    assert_eq!(report.top_origin, "a.com");
    assert_eq!(report.frame, FrameKind::Top);
    let executed: Vec<bool> = report.steps.iter().map(|s| s.executed).collect();
    // b.com is unknown until the first tick, so it is denied
    assert_eq!(executed, vec![false, true, true, false, true]);
    assert_eq!(report.suppressed(), 2);
    assert_eq!(report.session_origins, vec!["a.com".to_string(), "b.com".to_string()]);
    assert_eq!(report.rules.disposition("b.com"), Some(true));
    assert_eq!(report.rules.disposition("a.com"), Some(false));
    assert!(metrics.render().contains("webguard_reconciled_origins_total 1"));
}

#[tokio::test]
async fn foreign_frame_scenario_is_removed() {
    let sc = scenario::load_from_str(
        r#"
top_url: https://a.com/
frame_url: https://ads.x.net/frame.html
steps:
  - set_inner_html: "<b>ad</b>"
"#,
    )
    .unwrap();
    let report = scenario::run(
        &sc,
        &GuardConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(GuardMetrics::default()),
    )
    .await
    .unwrap();

    assert!(report.removed);
    assert_eq!(report.frame, FrameKind::Foreign);
    assert!(report.steps.is_empty());
}

#[tokio::test(start_paused = true)]
async fn custom_interval_from_config() {
    let cfg = config::load_from_str("version: 1\nreconcile:\n  interval_ms: 1000\n").unwrap();
    let sc = scenario::load_from_str(
        "top_url: https://a.com/\nsteps:\n  - script: https://c.com/x.js\n    append_child: div\n",
    )
    .unwrap();
    let report = scenario::run(&sc, &cfg, Arc::new(MemoryStore::new()), Arc::new(GuardMetrics::default()))
        .await
        .unwrap();

    assert_eq!(report.executed(), 0);
    assert_eq!(report.rules.disposition("c.com"), Some(true));
}
