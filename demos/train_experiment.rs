//! Train both ensemble families on a synthetic dataset and compare them.
//!
//! Registers two experiments under a temporary runs directory, trains
//! them with early stopping and prints their learning curves.
//!
//! Run with: `cargo run --example train_experiment`

use anyhow::Context;
use ensembles_rust::*;
use rand::prelude::*;

fn synthetic_csv(n_rows: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut content = String::from("sqft,rooms,age,price\n");

    for _ in 0..n_rows {
        let sqft: f64 = rng.gen_range(40.0..200.0);
        let rooms: f64 = rng.gen_range(1..6) as f64;
        let age: f64 = rng.gen_range(0.0..80.0);
        let price = 50.0 + sqft * 2.5 + rooms * 15.0 - age * 0.8 + rng.gen_range(-10.0..10.0);
        content.push_str(&format!("{:.2},{},{:.1},{:.2}\n", sqft, rooms, age, price));
    }

    content.into_bytes()
}

fn main() -> anyhow::Result<()> {
    ensembles_rust::init()?;

    println!("Ensembles Rust - Experiment Example");
    println!("===================================");

    let runs = tempfile::tempdir().context("creating runs directory")?;
    let service = ExperimentService::new(ServiceConfig::with_runs_dir(runs.path()))?;
    let data = synthetic_csv(400, 42);

    let experiments = [
        ExperimentConfigBuilder::new("forest", EnsembleKind::RandomForest)
            .n_estimators(60)
            .max_depth(8)
            .max_features(MaxFeatures::Sqrt)
            .patience(10)
            .random_state(7)
            .build()?,
        ExperimentConfigBuilder::new("boosting", EnsembleKind::GradientBoosting)
            .n_estimators(200)
            .max_depth(3)
            .learning_rate(0.1)
            .patience(10)
            .random_state(7)
            .build()?,
    ];

    for config in experiments {
        let name = config.name.clone();
        service
            .register(config, &data)
            .with_context(|| format!("registering '{}'", name))?;

        let history = service
            .train(&name)
            .with_context(|| format!("training '{}'", name))?;
        let summary = service.learning_curve_summary(&name)?;

        println!();
        println!("{} ({} members)", name, summary.n_members);
        for (i, train) in history.train().iter().enumerate().step_by(10) {
            let val = history.val().map_or(f64::NAN, |val| val[i]);
            println!("  member {:>3}: train RMSLE {:.5}  val RMSLE {:.5}", i, train, val);
        }
        if let (Some(best), Some(loss)) = (summary.best_iteration, summary.best_val) {
            println!("  best validation RMSLE {:.5} at member {}", loss, best);
        }
    }

    let queries = synthetic_csv(5, 99);
    println!();
    for name in service.existing_experiments()? {
        let predictions = service.predict(&name, &queries)?;
        let rendered: Vec<String> = predictions.iter().map(|p| format!("{:.1}", p)).collect();
        println!("{:>8} predictions: [{}]", name, rendered.join(", "));
    }

    Ok(())
}
