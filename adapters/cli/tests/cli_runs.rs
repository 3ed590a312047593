use std::{path::PathBuf, process::Command};

fn demo_level() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("levels/demo.toml")
}

fn run(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_party-grid"))
        .arg("--level")
        .arg(demo_level())
        .args(args)
        .output()
        .expect("failed to launch party-grid");
    assert!(
        output.status.success(),
        "party-grid failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8 output")
}

#[test]
fn scripted_placements_follow_grid_rules() {
    let stdout = run(&["place"]);
    let lines: Vec<&str> = stdout.lines().collect();

    assert!(lines[0].starts_with("#1 plank placed on 3 cells facing Up, on surface 0"));
    assert_eq!(lines[1], "#2 crate rejected: cell (2, 1) is occupied");
    assert!(lines[2].starts_with("#3 spring placed on 1 cells"));
    assert!(lines[3].starts_with("#4 plank placed on 3 cells facing Right, on surface 2"));

    assert_eq!(
        &lines[4..],
        &[
            "..............",
            "..............",
            "..........#e..",
            "..........#e..",
            "..........#e..",
            ".....d........",
            "....####......",
            ".bbb..........",
            "##############",
        ]
    );
}

#[test]
fn spawn_search_prints_every_requested_point() {
    let stdout = run(&["spawn", "--triangles", "2", "--circles", "3", "--seed", "5"]);
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 6);
    assert!(lines[0].contains("TriangleClearance"));
    assert!(lines[1].contains("TriangleClearance"));
    assert!(lines[2].contains("CircleClearance"));
    assert!(lines[5].starts_with("5 points"));
}

#[test]
fn sequencer_replays_the_plan_in_draw_order() {
    let stdout = run(&["spawn", "--triangles", "1", "--circles", "1", "--release-interval-ms", "250"]);
    let releases: Vec<&str> = stdout.lines().filter(|line| line.contains("release #")).collect();

    assert_eq!(releases.len(), 2);
    assert!(releases[0].starts_with("t=   250ms  release #0"));
    assert!(releases[1].starts_with("t=   500ms  release #1"));
}
