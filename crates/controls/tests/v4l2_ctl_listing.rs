use std::path::PathBuf;

use lightbox_controls::parser::{parse_controls, ControlKind};
use lightbox_controls::{ControlSet, SURFACED_CONTROLS};

fn load_fixture_listing() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("v4l2-ctl")
        .join("c920-list-ctrls-menus.txt");

    std::fs::read_to_string(path).expect("fixture listing should be readable")
}

#[test]
fn webcam_listing_parses_every_supported_control() {
    let descriptors = parse_controls(&load_fixture_listing()).expect("fixture should parse");

    let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names.len(), 17);
    assert_eq!(names.first(), Some(&"brightness"));
    assert_eq!(names.last(), Some(&"zoom_absolute"));

    let power_line = descriptors
        .iter()
        .find(|d| d.name == "power_line_frequency")
        .unwrap();
    let labels: Vec<&str> = power_line
        .menu_options()
        .iter()
        .map(|o| o.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Disabled", "50 Hz", "60 Hz"]);
}

#[test]
fn webcam_listing_surfaces_focus_and_exposure() {
    let set = ControlSet::from_descriptors(parse_controls(&load_fixture_listing()).unwrap());

    let ids: Vec<&str> = set.models().iter().map(|m| m.identifier()).collect();
    assert_eq!(ids, SURFACED_CONTROLS.to_vec());

    let focus = set.get("focus_absolute").unwrap();
    assert_eq!(
        focus.kind(),
        &ControlKind::Integer {
            min: 0,
            max: 250,
            step: 5,
            value: 0
        }
    );
    assert_eq!(focus.descriptor().param("flags"), Some("inactive"));

    let exposure_auto = set.get("exposure_auto").unwrap();
    assert_eq!(exposure_auto.selected_label(), Some("Aperture Priority Mode"));
}
