use clap::Parser;
use fsmscan::Cli;
use serde_json::json;
use std::path::Path;

const DOOR: &str = r#"
import { describe, guard, target } from "@fsm/annotations";

export class Closed {
  open = guard({ name: "isUnlocked" }, describe("open the door", target(Opened, (ctx) => ctx)));
  lock = target(Locked, (ctx) => ctx);
}

export class Opened {
  close = target(Closed, (ctx) => ctx);
}

export class Locked {
  unlock = target(Closed, (ctx) => ctx);
}
"#;

fn project(dir: &Path, config: serde_json::Value) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir.join("src"))?;
    std::fs::write(dir.join("src/door.ts"), DOOR)?;
    std::fs::write(dir.join("fsm.json"), serde_json::to_string_pretty(&config)?)?;
    Ok(())
}

fn run(args: &[&str]) -> anyhow::Result<()> {
    Cli::parse_from(std::iter::once("fsmscan").chain(args.iter().copied())).run()
}

#[test]
fn writes_charts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    project(
        dir.path(),
        json!({
            "sources": ["src/**/*.ts"],
            "machines": [{
                "input": "src/door.ts",
                "id": "door",
                "initialState": "Closed",
                "classes": ["Closed", "Opened", "Locked"],
                "output": "charts/door.json"
            }]
        }),
    )?;
    let config = dir.path().join("fsm.json");
    run(&[config.to_str().expect("utf-8 path"), "--compact"])?;
    let chart: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("charts/door.json"))?)?;
    assert_eq!(
        chart,
        json!({
            "id": "door",
            "initial": "Closed",
            "states": {
                "Closed": {
                    "on": {
                        "open": {"target": "Opened", "description": "open the door", "cond": "isUnlocked"},
                        "lock": {"target": "Locked"}
                    }
                },
                "Opened": {"on": {"close": {"target": "Closed"}}},
                "Locked": {"on": {"unlock": {"target": "Closed"}}}
            }
        })
    );
    Ok(())
}

#[test]
fn selects_machines() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    project(
        dir.path(),
        json!([
            {
                "input": "src/door.ts",
                "id": "door",
                "initialState": "Closed",
                "classes": ["Closed"],
                "output": "door.json"
            },
            {"input": "src/door.ts", "id": "broken", "output": "broken.json"}
        ]),
    )?;
    let config = dir.path().join("fsm.json");
    let config = config.to_str().expect("utf-8 path");
    assert!(run(&[config]).is_err());
    assert!(dir.path().join("door.json").exists());
    assert!(!dir.path().join("broken.json").exists());

    std::fs::remove_file(dir.path().join("door.json"))?;
    run(&[config, "--machine", "door", "--source", "src/*.ts"])?;
    assert!(dir.path().join("door.json").exists());
    Ok(())
}

#[test]
fn missing_config() {
    assert!(run(&["does/not/exist.json"]).is_err());
}
