use fp_project::schema::*;
use fp_project::{ProjectError, load, load_json, load_yaml, save_json, save_yaml, validate_scenario};
use proptest::prelude::*;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("fp_project_{}_{name}", std::process::id()))
}

#[test]
fn roundtrip_yaml_default_scenario() {
    let scenario = Scenario::default();
    validate_scenario(&scenario).unwrap();

    let path = temp_path("default.yaml");
    save_yaml(&path, &scenario).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(scenario, loaded);
}

#[test]
fn roundtrip_json_custom_scenario() {
    let scenario = Scenario {
        name: "Equator".to_string(),
        physics: PhysicsDef {
            latitude_deg: 0.0,
            ..Default::default()
        },
        solver: SolverDef {
            method: MethodDef::Rk4,
            max_step_s: Some(0.001),
            pole_policy: PolePolicyDef::Reject,
            ..Default::default()
        },
        ..Default::default()
    };

    let path = temp_path("equator.json");
    save_json(&path, &scenario).unwrap();
    let loaded = load(&path).unwrap();

    assert_eq!(scenario, loaded);
}

#[test]
fn missing_sections_fall_back_to_reference_scene() {
    let path = temp_path("minimal.yml");
    let yaml = "version: 1\nname: minimal\ninitial:\n  release_angle_deg: 20.0\n";
    std::fs::write(&path, yaml).unwrap();

    let loaded = load(&path).unwrap();

    assert_eq!(loaded.initial.release_angle_deg, 20.0);
    assert_eq!(loaded.initial.polar_rate_radps, 0.1);
    assert_eq!(loaded.physics, PhysicsDef::default());
    assert_eq!(loaded.time.step_s, 0.01);
    assert_eq!(loaded.scene.base_height_m, 43.0);
}

#[test]
fn bundled_scenario_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios/paris.yaml");
    let scenario = load(&path).unwrap();
    assert_eq!(scenario.physics.length_m, 30.0);
    assert_eq!(scenario.solver.method, MethodDef::DormandPrince45);
}

#[test]
fn invalid_file_is_refused() {
    let path = temp_path("bad.yaml");
    std::fs::write(&path, "version: 1\nname: bad\nphysics:\n  length_m: -3.0\n").unwrap();
    assert!(matches!(load(&path), Err(ProjectError::Validation(_))));
}

#[test]
fn unknown_extension_is_refused() {
    let path = temp_path("scenario.toml");
    assert!(matches!(load(&path), Err(ProjectError::UnsupportedFormat(_))));
}

#[test]
fn save_refuses_invalid_scenario() {
    let mut scenario = Scenario::default();
    scenario.playback.rate_hz = -5.0;
    let path = temp_path("never_written.json");
    assert!(save_json(&path, &scenario).is_err());
    assert!(!path.exists());
}

#[test]
fn json_loader_reports_parse_errors() {
    let path = temp_path("garbage.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(load_json(&path), Err(ProjectError::Json(_))));
}

proptest! {
    #[test]
    fn in_range_physics_validates_and_roundtrips(
        length_m in 0.1_f64..200.0,
        latitude_deg in -90.0_f64..=90.0,
        release_angle_deg in 0.0_f64..=90.0,
        rate_hz in 0.0_f64..=1000.0,
    ) {
        let mut scenario = Scenario::default();
        scenario.physics.length_m = length_m;
        scenario.physics.latitude_deg = latitude_deg;
        scenario.initial.release_angle_deg = release_angle_deg;
        scenario.playback.rate_hz = rate_hz;

        prop_assert!(validate_scenario(&scenario).is_ok());

        let text = serde_yaml::to_string(&scenario).unwrap();
        let back: Scenario = serde_yaml::from_str(&text).unwrap();
        prop_assert_eq!(back, scenario);
    }
}
