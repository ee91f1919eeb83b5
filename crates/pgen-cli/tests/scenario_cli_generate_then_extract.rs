use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const CATALOG: &str = r#"{
  "categories": [
    {
      "id": "gt.recipe.mixer",
      "display_name": "Mixer",
      "recipes": [
        {
          "inputs": [{"id": "gregtech:gt.metaitem.01", "variant": 2032, "amount": 1, "display_name": "Iron Dust"}],
          "outputs": [{"id": "gregtech:gt.metaitem.01", "variant": 2306, "amount": 1, "display_name": "Steel Dust"}],
          "duration": 100, "rate": 8
        },
        {
          "inputs": [{"id": "gregtech:gt.metaitem.01", "variant": 2033, "amount": 4, "display_name": "Coal Dust"}],
          "outputs": [{"id": "gregtech:gt.metaitem.01", "variant": 2306, "amount": 1, "display_name": "Steel Dust"}],
          "duration": 120, "rate": 8
        },
        {
          "inputs": [{"id": "minecraft:sand", "amount": 1}],
          "outputs": [{"id": "minecraft:glass", "amount": 1}],
          "duration": 40, "rate": 8
        }
      ]
    }
  ],
  "machines": [
    {"kind": "gt_mixer_lv", "attributes": {"recipe_map": "gt.recipe.mixer"}},
    {"kind": "wooden_chest"}
  ]
}"#;

fn setup(dir: &Path) -> (String, String) {
    let catalog = dir.join("catalog.json");
    fs::write(&catalog, CATALOG).unwrap();
    let config = dir.join("pgen.yaml");
    let storage = dir.join("store");
    fs::write(
        &config,
        format!("storage:\n  dir: {:?}\n  page_size: 2\n", storage.to_string_lossy()),
    )
    .unwrap();
    (
        catalog.to_string_lossy().to_string(),
        config.to_string_lossy().to_string(),
    )
}

fn pgen(catalog: &str, config: &str) -> Command {
    let mut cmd = Command::cargo_bin("pgen").unwrap();
    cmd.env_remove("PGEN_CONFIG")
        .env("PGEN_LOG", "off")
        .args(["--catalog", catalog, "--config", config, "--requester", "steve"]);
    cmd
}

#[test]
fn count_reports_conflict_groups_without_generating() {
    let tmp = tempfile::tempdir().unwrap();
    let (catalog, config) = setup(tmp.path());

    pgen(&catalog, &config)
        .args(["count", "mixer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("collected=3"))
        .stdout(predicate::str::contains("conflict_groups=1"));

    pgen(&catalog, &config)
        .args(["storage", "summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("count=0"));
}

#[test]
fn generate_resolves_conflict_on_stdin_then_extracts() {
    let tmp = tempfile::tempdir().unwrap();
    let (catalog, config) = setup(tmp.path());

    pgen(&catalog, &config)
        .args(["generate", "mixer", "--blanks", "5"])
        .write_stdin("7\n1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Steel Dust"))
        .stdout(predicate::str::contains("resend:"))
        .stdout(predicate::str::contains("generated=2 source=mixer"));

    pgen(&catalog, &config)
        .args(["storage", "detail", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("in\tCoal Dust x4"));

    pgen(&catalog, &config)
        .args(["storage", "extract", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extracted=2"));
}

#[test]
fn generate_without_enough_blanks_fails_and_stores_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let (catalog, config) = setup(tmp.path());

    pgen(&catalog, &config)
        .args(["generate", "mixer", "--blanks", "1"])
        .write_stdin("0\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("need 2, have 1"));

    pgen(&catalog, &config)
        .args(["storage", "summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("count=0"));
}

#[test]
fn unknown_category_is_explained() {
    let tmp = tempfile::tempdir().unwrap();
    let (catalog, config) = setup(tmp.path());

    pgen(&catalog, &config)
        .args(["generate", "centrifuge", "--blanks", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no recipe category matches 'centrifuge'"));
}

#[test]
fn generate_spends_the_network_pool_before_the_inventory() {
    let tmp = tempfile::tempdir().unwrap();
    let (catalog, config) = setup(tmp.path());

    pgen(&catalog, &config)
        .args(["generate", "mixer", "--blanks", "5", "--pool", "5"])
        .write_stdin("0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("generated=2 source=mixer"))
        .stdout(predicate::str::contains("debited_from=network"));
}

#[test]
fn machine_flag_resolves_its_category() {
    let tmp = tempfile::tempdir().unwrap();
    let (catalog, config) = setup(tmp.path());

    pgen(&catalog, &config)
        .arg("machines")
        .assert()
        .success()
        .stdout(predicate::str::contains("gt_mixer_lv\tgt.recipe.mixer"))
        .stdout(predicate::str::contains("wooden_chest\t-"));

    pgen(&catalog, &config)
        .args(["count", "--machine", "gt_mixer_lv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("categories=gt.recipe.mixer"))
        .stdout(predicate::str::contains("collected=3"));

    pgen(&catalog, &config)
        .args(["generate", "--machine", "wooden_chest", "--blanks", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no known recipe category"));
}
