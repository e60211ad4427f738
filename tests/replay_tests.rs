use std::path::PathBuf;

use macro_regime_alloc::model::market::MarketState;
use macro_regime_alloc::replay::{parse_args, replay, Command, ReplayArgs};
use macro_regime_alloc::Config;

fn args(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn parses_input_and_config() {
    let cmd = parse_args(&args(&["--input", "states.json", "-c", "cfg.toml"])).unwrap();
    assert_eq!(
        cmd,
        Command::Replay(ReplayArgs {
            config: Some(PathBuf::from("cfg.toml")),
            input: PathBuf::from("states.json"),
        })
    );
    assert_eq!(parse_args(&args(&["-h"])).unwrap(), Command::Help);
}

#[test]
fn rejects_bad_arguments() {
    assert!(parse_args(&args(&[])).is_err());
    assert!(parse_args(&args(&["--input"])).is_err());
    let err = parse_args(&args(&["--input", "a.json", "--fast"])).unwrap_err();
    assert!(err.to_string().contains("--fast"));
}

#[test]
/// Verifies one JSON line per date with the regime and weights fields.
fn replay_writes_json_lines() {
    let raw = r#"[
        {"date":"2024-01-02","macro_levels":{"growth":1.0,"inflation_core":2.5},
         "prices":[100,100,100,100,100,100,100,100,100,100,100]},
        {"date":"2024-01-03","macro_levels":{"growth":1.1,"inflation_core":2.4},
         "indicators":{"vix":18.0},
         "prices":[101,99,100,100,100,100,100,100,100,100,100]}
    ]"#;
    let states: Vec<MarketState> = serde_json::from_str(raw).unwrap();
    let mut out = Vec::new();
    let n = replay(Config::default(), &states, &mut out).unwrap();
    assert_eq!(n, 2);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["signal"]["regime"], 2);
    assert_eq!(first["signal"]["source"], "MACRO_QUADRANT");
    assert_eq!(first["outcome"], "warm_up");
    assert_eq!(first["weights"]["weights"][10], 1.0);
}

#[test]
fn replay_stops_on_out_of_order_dates() {
    let raw = r#"[
        {"date":"2024-01-03","macro_levels":{"growth":1.0,"inflation_core":2.5},
         "prices":[100,100,100,100,100,100,100,100,100,100,100]},
        {"date":"2024-01-02","macro_levels":{"growth":1.0,"inflation_core":2.5},
         "prices":[100,100,100,100,100,100,100,100,100,100,100]}
    ]"#;
    let states: Vec<MarketState> = serde_json::from_str(raw).unwrap();
    let mut out = Vec::new();
    let err = replay(Config::default(), &states, &mut out).unwrap_err();
    assert!(format!("{:#}", err).contains("2024-01-02"));
}
