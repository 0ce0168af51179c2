use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;

const CENTER: &str = "0 0.49 0.49 0.51 0.49 0.51 0.51 0.49 0.51\n";

fn survey_density() -> Command {
    Command::cargo_bin("survey-density").unwrap()
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let labels = dir.path().join("labels");
    fs::create_dir(&labels).unwrap();
    fs::write(labels.join("DJI_0001.txt"), CENTER.repeat(2)).unwrap();
    fs::write(labels.join("DJI_0002.txt"), CENTER).unwrap();
    let telemetry = json!([
        { "capture": "DJI_0001.JPG", "latitude": 45.0, "longitude": -93.0,
          "relative_altitude": "+10.00", "gimbal_pitch": -90.0, "flight_yaw": 0.0,
          "width": 5280, "height": 3956 },
        { "capture": "DJI_0002.JPG", "longitude": -93.0,
          "relative_altitude": "+10.00", "gimbal_pitch": -90.0, "flight_yaw": 0.0,
          "width": 5280, "height": 3956 },
    ]);
    fs::write(dir.path().join("telemetry.json"), telemetry.to_string()).unwrap();
    dir
}

#[test]
fn help_lists_modes() {
    survey_density()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("local"))
        .stdout(predicate::str::contains("geodetic"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn local_run_writes_artifacts_and_summary() {
    let dir = fixture();
    let out = dir.path().join("out");
    survey_density()
        .current_dir(dir.path())
        .args([
            "local",
            "--telemetry",
            "telemetry.json",
            "--detections",
            "labels",
            "--cell-size",
            "2.5",
            "--out",
        ])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 skipped"))
        .stdout(predicate::str::contains("total density 2"))
        .stdout(predicate::str::contains("wrote 7 files"));

    for name in ["density.tif", "ownership.tif", "legend.txt", "report.json"] {
        assert!(out.join(name).is_file(), "{name} missing");
    }
    let legend = fs::read_to_string(out.join("legend.txt")).unwrap();
    assert_eq!(legend, "1: DJI_0001\n");
}

#[test]
fn config_file_run_honors_out_override() {
    let dir = fixture();
    let config = json!({
        "mode": "local",
        "telemetry_path": dir.path().join("telemetry.json"),
        "detections_dir": dir.path().join("labels"),
        "cell_size_m": 4.0,
    });
    let config_path = dir.path().join("run.json");
    fs::write(&config_path, config.to_string()).unwrap();
    let out = dir.path().join("elsewhere");

    survey_density()
        .arg("run")
        .arg("--config")
        .arg(&config_path)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("local grid 1x1"));
    assert!(out.join("report.json").is_file());
}

#[test]
fn missing_detection_file_fails_cleanly() {
    let dir = fixture();
    fs::remove_file(dir.path().join("labels").join("DJI_0002.txt")).unwrap();
    survey_density()
        .current_dir(dir.path())
        .args(["-q", "local", "--telemetry", "telemetry.json", "--detections", "labels"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"))
        .stderr(predicate::str::contains("DJI_0002"));
    assert!(!dir.path().join("density_output").exists());
}

#[test]
fn geodetic_requires_corners() {
    survey_density()
        .args(["geodetic", "--detections", "labels"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--corners"));
}
