// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use teardown::cli::{Cli, LogFormat, OutputFormat};
use teardown::cloud::CliCloudApi;
use teardown::command::TokioCommandRunner;
use teardown::config::Config;
use teardown::constants::exit_codes;
use teardown::kubernetes::{create_client, KubeClusterApi};
use teardown::orchestrator::{FixedConfirmation, Orchestrator, RunOutcome, StdinConfirmation};
use teardown::output::{render_human, render_json};
use teardown::provisioner::TerraformProvisioner;
use teardown::types::RunReport;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_codes::STARTUP_FAILURE)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = Config::load(&cli)?;
    info!("Tearing down {}", config.identity);

    // A missing or broken kubeconfig means the cluster is treated as unreachable
    let cluster = match create_client(
        config.kubeconfig.as_deref(),
        config.kube_context.as_deref(),
        config.timings.call_timeout,
    )
    .await
    {
        Ok(client) => KubeClusterApi::new(client),
        Err(e) if e.is_unreachable() => KubeClusterApi::unavailable(e.to_string()),
        Err(e) => return Err(e).context("Failed to create Kubernetes client"),
    };
    let cloud = CliCloudApi::new(
        config.identity.clone(),
        TokioCommandRunner,
        config.timings.call_timeout,
    );
    let provisioner = TerraformProvisioner::new(
        config.state_dir.clone(),
        TokioCommandRunner,
        config.timings.destroy_timeout,
    );

    let orchestrator = Orchestrator::new(&config, &cluster, &cloud, &provisioner);
    let outcome = match &cli.confirm {
        Some(text) => {
            orchestrator
                .run(&FixedConfirmation(text.clone()), cli.force)
                .await
        }
        None => orchestrator.run(&StdinConfirmation, cli.force).await,
    };

    print_report(outcome.report(), cli.output)?;

    Ok(match outcome {
        RunOutcome::Cancelled(_) => exit_codes::CANCELLED,
        RunOutcome::Completed(report) if report.is_clean() => exit_codes::CLEAN,
        RunOutcome::Completed(_) => exit_codes::INCOMPLETE,
    })
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => print!("{}", render_human(report)),
        OutputFormat::Json => println!(
            "{}",
            render_json(report).context("Failed to serialize report")?
        ),
    }
    Ok(())
}
