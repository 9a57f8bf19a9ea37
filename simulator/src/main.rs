use anyhow::Context;
use clap::Parser;
use generator::profile::build_radar_cube;
use log::info;
use std::fs;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline radar front-end processing driver")]
struct Args {
    /// Load a workflow config (generator and stage chain) from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 1)]
    frames: usize,
    #[arg(long, default_value_t = 64)]
    ramps: usize,
    #[arg(long, default_value_t = 256)]
    samples: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Write the JSON run report here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.frames, args.ramps, args.samples, args.seed)
    };

    let runner = Runner::new(&workflow_config)?;
    info!(
        "pipeline ready: {} stages, input {}",
        runner.pipeline().len(),
        workflow_config.generator.layout().shape()
    );

    let cube = build_radar_cube(&workflow_config.generator)?;
    let result = runner.execute(cube)?;

    println!(
        "Offline run -> stages {}, detections {}",
        result.stage_shapes.len(),
        result.detections.len()
    );

    let report = serde_json::to_string_pretty(&result).context("serializing run report")?;
    match args.report {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, report)
                .with_context(|| format!("writing report {}", path.display()))?;
        }
        None => println!("{}", report),
    }

    Ok(())
}
