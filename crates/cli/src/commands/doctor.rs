//! `finrag doctor`: diagnose configuration, index, and provider health.

use finrag_config::AppConfig;
use finrag_core::index::VectorIndex;
use finrag_index::JsonlIndex;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("finrag doctor");
    println!("=============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ok    Config file found at {}", config_path.display());
    } else {
        println!("  info  No config file, using defaults (run `finrag config > {}`)", config_path.display());
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ok    Config valid");
            config
        }
        Err(e) => {
            println!("  FAIL  Config could not be loaded: {e}");
            println!("\n  1 issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ok    API key configured");
    } else {
        println!("  WARN  No API key: set FINRAG_API_KEY or api_key in config.toml");
        issues += 1;
    }

    match JsonlIndex::open(&config.index.path) {
        Ok(index) => match index.count().await {
            Ok(0) => {
                println!("  WARN  Index at {} is empty", config.index.path.display());
                issues += 1;
            }
            Ok(n) => println!("  ok    Index holds {n} chunks"),
            Err(e) => {
                println!("  FAIL  Index unreadable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  FAIL  Index unreadable: {e}");
            issues += 1;
        }
    }

    match finrag_providers::build_from_config(&config) {
        Ok(providers) => match providers.generation.health_check().await {
            Ok(true) => println!("  ok    Provider '{}' reachable", providers.generation.name()),
            Ok(false) => {
                println!("  WARN  Provider '{}' reported unhealthy", providers.generation.name());
                issues += 1;
            }
            Err(e) => {
                println!("  FAIL  Provider '{}' unreachable: {e}", providers.generation.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  FAIL  {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
