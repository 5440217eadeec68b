use clap::{Args, Command, FromArgMatches};
use geneforge::algorithm::scheduler::MAX_WORKERS;
use geneforge::chromosome::ComparatorKind;
use geneforge::config::{Config, PopulationParams};
use std::io::Write;
use tempfile::NamedTempFile;

fn parse(args: &[&str]) -> (Config, clap::ArgMatches) {
    let cmd = Config::augment_args(Command::new("test"));
    let matches = cmd.try_get_matches_from(args).unwrap();
    let config = Config::from_arg_matches(&matches).unwrap();
    (config, matches)
}

#[test]
fn test_cli_defaults_match_default_impl() {
    let (config, _) = parse(&["test"]);
    assert_eq!(config, Config::default());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "population": {{ "population_size": 64, "sorted": false }},
             "operators": {{ "selection": "roulette", "comparator": "minimize" }} }}"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    assert_eq!(config.population.population_size, 64);
    assert!(!config.population.sorted);
    assert_eq!(config.population.best_track, 5);
    assert_eq!(config.operators.selection, "roulette");
    assert_eq!(config.operators.comparator, ComparatorKind::Minimize);
    assert_eq!(config.algorithm.workers, 4);
}

#[test]
fn test_typed_flags_override_file_values() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "algorithm": {{ "workers": 8, "elitism": 3 }},
             "operators": {{ "max_generations": 500 }} }}"#
    )
    .unwrap();
    let mut config = Config::load_from_file(file.path()).unwrap();

    let (cli, matches) = parse(&["test", "--workers", "2", "--sorted", "false"]);
    config.merge_from_cli(&cli, &matches);

    assert_eq!(config.algorithm.workers, 2);
    assert!(!config.population.sorted);
    // Untyped flags leave file values alone even though clap filled in defaults.
    assert_eq!(config.algorithm.elitism, 3);
    assert_eq!(config.operators.max_generations, 500);
}

#[test]
fn test_malformed_file_is_a_json_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let err = Config::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().starts_with("JSON Parsing Error"));
}

#[test]
fn test_validate_clamps_unsorted_tracks() {
    let mut config = Config::default();
    config.population = PopulationParams::builder()
        .population_size(10)
        .sorted(false)
        .best_track(0)
        .worst_track(50)
        .build();
    config.algorithm.offspring = 0;
    config.validate().unwrap();
    assert_eq!(config.population.best_track, 1);
    assert_eq!(config.population.worst_track, 10);
    assert_eq!(config.algorithm.offspring, 1);
}

#[test]
fn test_validate_clamps_workers_to_pool_limit() {
    let mut config = Config::default();
    config.algorithm.workers = MAX_WORKERS * 4;
    config.validate().unwrap();
    assert_eq!(config.algorithm.workers, MAX_WORKERS);

    config.algorithm.workers = 0;
    config.validate().unwrap();
    assert_eq!(config.algorithm.workers, 1);
}

#[test]
fn test_zero_population_is_rejected() {
    let mut config = Config::default();
    config.population.population_size = 0;
    assert!(config.validate().is_err());
}
