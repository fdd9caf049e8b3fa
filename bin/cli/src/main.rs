use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::{json, Value};
use tracing::{error, info, Level};
use uniconnect_core::{
    similarity::score, store::parse_pool, CompatibilityEngine, MemoryProfileStore, ProfileId,
};

mod config;

use config::{AnalyzeArgs, Cli, Command, ScoreArgs};

/// Build the graph for a pool file, optionally narrowed to one ego view.
async fn analyze(args: &AnalyzeArgs) -> anyhow::Result<Value> {
    let store = MemoryProfileStore::from_json_file(&args.graph.pool)
        .await
        .with_context(|| format!("failed to load pool {}", args.graph.pool.display()))?;
    let engine = CompatibilityEngine::new(args.graph.engine_config(), Arc::new(store)).await?;

    let output = match &args.ego {
        Some(id) => serde_json::to_value(engine.ego(&ProfileId::new(id.as_str())).await?)?,
        None => serde_json::to_value(engine.snapshot().await.graph.clone())?,
    };
    Ok(output)
}

/// Score one pair and report whether it would become an edge.
async fn score_pair(args: &ScoreArgs) -> anyhow::Result<Value> {
    let raw = tokio::fs::read_to_string(&args.graph.pool)
        .await
        .with_context(|| format!("failed to read pool {}", args.graph.pool.display()))?;
    let pool = parse_pool(&raw)?;
    let config = args.graph.engine_config();
    config.validate()?;

    let find = |id: &str| {
        pool.iter()
            .find(|profile| profile.id.as_str() == id)
            .ok_or_else(|| anyhow::anyhow!("profile {} is not in the pool", id))
    };
    let a = find(&args.a)?;
    let b = find(&args.b)?;

    let similarity = score(a, b, &config.similarity.weights);
    let edge = similarity.reason.is_some() && similarity.score >= config.similarity.threshold;
    Ok(json!({
        "a": a.id,
        "b": b.id,
        "score": similarity.score,
        "reason": similarity.reason,
        "edge": edge,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing on stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let cli = Cli::parse();

    let (output, pretty) = match &cli.command {
        Command::Analyze(args) => (analyze(args).await, args.pretty),
        Command::Score(args) => (score_pair(args).await, false),
    };

    match output {
        Ok(value) => {
            let rendered = if pretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            };
            println!("{}", rendered);
            info!("Command completed");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use uniconnect_core::{Profile, TagCategory};

    fn pool_file() -> tempfile::NamedTempFile {
        let pool = vec![
            Profile::new("A", "Alice", "Computer Science").with_tags(TagCategory::Hobbies, ["Reading", "Gaming"]),
            Profile::new("B", "Bruno", "Computer Science").with_tags(TagCategory::Hobbies, ["Gaming", "Photography"]),
            Profile::new("C", "Carla", "Law").with_tags(TagCategory::Hobbies, ["Dancing"]),
        ];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&pool).unwrap().as_bytes()).unwrap();
        file
    }

    fn parse(args: &[&str]) -> Command {
        Cli::parse_from(std::iter::once("uniconnect-cli").chain(args.iter().copied())).command
    }

    #[tokio::test]
    async fn test_analyze_pool() {
        let file = pool_file();
        let path = file.path().to_str().unwrap();
        let Command::Analyze(args) = parse(&["analyze", "--pool", path]) else {
            panic!("expected analyze");
        };

        let output = analyze(&args).await.unwrap();
        assert_eq!(output["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(output["links"].as_array().unwrap().len(), 1);
        assert_eq!(output["stats"]["community_count"], 2);
    }

    #[tokio::test]
    async fn test_analyze_ego_and_unknown_ego() {
        let file = pool_file();
        let path = file.path().to_str().unwrap();
        let Command::Analyze(args) = parse(&["analyze", "--pool", path, "--ego", "C"]) else {
            panic!("expected analyze");
        };
        let output = analyze(&args).await.unwrap();
        assert_eq!(output["nodes"].as_array().unwrap().len(), 1);

        let Command::Analyze(args) = parse(&["analyze", "--pool", path, "--ego", "Z"]) else {
            panic!("expected analyze");
        };
        assert!(analyze(&args).await.is_err());
    }

    #[tokio::test]
    async fn test_score_pair() {
        let file = pool_file();
        let path = file.path().to_str().unwrap();

        let Command::Score(args) = parse(&["score", "--pool", path, "A", "B"]) else {
            panic!("expected score");
        };
        let output = score_pair(&args).await.unwrap();
        assert_eq!(output["reason"], "course");
        assert_eq!(output["edge"], true);

        let Command::Score(args) = parse(&["score", "--pool", path, "A", "C"]) else {
            panic!("expected score");
        };
        let output = score_pair(&args).await.unwrap();
        assert_eq!(output["edge"], false);
        assert!((output["score"].as_f64().unwrap() - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_pool_file() {
        let Command::Score(args) = parse(&["score", "--pool", "/nonexistent.json", "A", "B"]) else {
            panic!("expected score");
        };
        assert!(score_pair(&args).await.is_err());
    }
}
