// tests/config_sample.rs
use promo_radar::config::{load_from, RadarConfig};

#[test]
fn shipped_sample_matches_builtin_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/promo_radar.toml");
    let cfg = load_from(&path).expect("sample config parses and validates");
    assert_eq!(cfg, RadarConfig::default());
}
