//! Runs one give through the full pipeline in-process and prints the record.
use std::path::PathBuf;

use clap::Parser;
use w2g_api::logging;
use w2g_api::state::live_collaborators;
use w2g_core::{load_config, ExecutionContext, PipelineInput};
use w2g_results::JsonFileSink;
use w2g_stages::StageSet;

#[derive(Parser, Debug)]
#[command(name = "w2g-simulate", version, about = "Simulate a Watch2Give run end to end")]
struct Args {
    /// Config file.
    #[arg(long, env = "W2G_CONFIG", default_value = "w2g.toml")]
    config: PathBuf,

    #[arg(long, default_value_t = 20)]
    tokens: u64,

    #[arg(long, default_value = "vendor_456")]
    vendor_id: String,

    #[arg(long, default_value = "user_123")]
    viewer_id: String,

    #[arg(long, default_value_t = 22)]
    verified_gives: u64,

    #[arg(long, default_value = "./images/sharing.jpg")]
    photo_path: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;
    let _log_guard = logging::init(&config.logging)?;

    let stages = StageSet::from_config(&config, live_collaborators(&config)?);
    let sink = JsonFileSink::new(config.results.path.clone());
    let input = PipelineInput {
        tokens: args.tokens,
        vendor_id: args.vendor_id,
        viewer_id: args.viewer_id,
        verified_gives: args.verified_gives,
        photo_path: Some(args.photo_path),
    };

    let run = stages.pipeline().run_and_record(
        input,
        &sink,
        &ExecutionContext::with_max_steps(config.graph.max_steps),
    )?;
    if !run.recorded {
        tracing::warn!(path = %sink.path().display(), "run was not saved to the result store");
    }

    println!("{}", serde_json::to_string_pretty(&run.state)?);
    Ok(())
}
