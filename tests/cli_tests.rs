use regex::Regex;
use std::fs;
use std::io::Write;
use std::process::{Command, Output};
use tempfile::TempDir;

fn geneforge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_geneforge"))
        .args(args)
        .output()
        .expect("Failed to execute binary")
}

fn best_fitness(stdout: &str) -> f32 {
    let re = Regex::new(r"Best fitness: (-?\d+\.\d+)").unwrap();
    re.captures(stdout)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or_else(|| panic!("no best fitness in output:\n{}", stdout))
}

#[test]
fn test_cli_run_one_max_writes_csv() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("stats.csv");
    let output = geneforge(&[
        "run",
        "--problem",
        "one-max",
        "--genes",
        "24",
        "--population-size",
        "30",
        "--max-generations",
        "12",
        "--workers",
        "2",
        "--seed",
        "7",
        "--report-every",
        "4",
        "--csv",
        csv_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);

    let best = best_fitness(&stdout);
    assert!((0.0..=24.0).contains(&best));
    assert!(stdout.contains("after 12 generations"));
    assert!(stdout.contains("criteria_stopped"));

    let csv = fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("generation,population_size,best_fitness"));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 12);
    let re = Regex::new(r"^(\d+),30,").unwrap();
    for (i, row) in rows.iter().enumerate() {
        let gen: usize = re.captures(row).unwrap()[1].parse().unwrap();
        assert_eq!(gen, i + 1);
    }
}

#[test]
fn test_cli_config_file_with_override() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("ga.json");
    let mut file = fs::File::create(&config_path).unwrap();
    write!(
        file,
        r#"{{ "population": {{ "population_size": 16 }},
             "operators": {{ "max_generations": 50, "selection": "random" }} }}"#
    )
    .unwrap();

    let output = geneforge(&[
        "run",
        "--genes",
        "3",
        "--config",
        config_path.to_str().unwrap(),
        "--max-generations",
        "5",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("after 5 generations"));
    // The sphere optimum is 0 and every fitness is negated.
    assert!(best_fitness(&stdout) <= 0.0);
}

#[test]
fn test_cli_unknown_operator_fails() {
    let output = geneforge(&["run", "--selection", "nope", "--max-generations", "1"]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Unknown selection operator 'nope'"));
}

#[test]
fn test_cli_lists_operators() {
    let output = geneforge(&["operators"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["tournament", "roulette", "simple", "worst", "linear", "generation", "minimize"] {
        let re = Regex::new(&format!(r"\|\s*{}\s*\|", name)).unwrap();
        assert!(re.is_match(&stdout), "missing {} in\n{}", name, stdout);
    }
}
