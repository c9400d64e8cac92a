//! # Submit Binary
//!
//! Headless client for the DAEDALUS engine. Sends a single `calc` job, or every PLY
//! file of a directory as one `system.multicall` batch, and prints one line per job.

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use daedalus_shell::{
    batch::{BatchTemplate, ply_jobs},
    config::Config,
    error::RpcError,
    helper::{rpc_client::RpcClient, xmlrpc::Value},
    session::{CalcRequest, DEFAULT_GEOMETRY_PATH, DEFAULT_SEQUENCE_PATH, HelicalForm},
    view::{FAILURE_STATUS, SUCCESS_STATUS},
};

#[derive(Parser, Debug)]
#[command(name = "daedalus-submit", version, about = "Submit design jobs to the DAEDALUS engine")]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine XML-RPC endpoint, overriding the settings file.
    #[arg(long)]
    endpoint: Option<String>,

    /// Call timeout in seconds, overriding the settings file.
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a single design job.
    Calc {
        /// Project name; the engine writes its output into a folder of this name.
        project: String,

        #[arg(long, value_enum, default_value_t = HelicalForm::Aform)]
        form: HelicalForm,

        /// Minimum edge length in helical turns.
        #[arg(long, default_value_t = 6)]
        turns: u32,

        #[arg(long, default_value = DEFAULT_GEOMETRY_PATH)]
        ply: String,

        /// Scaffold sequence file; `M13.txt` selects the built-in M13 scaffold.
        #[arg(long, default_value = DEFAULT_SEQUENCE_PATH)]
        sequence: String,
    },
    /// Submit every .ply file in a directory in one batch.
    Batch {
        dir: PathBuf,

        #[arg(long, value_enum, default_value_t = HelicalForm::Aform)]
        form: HelicalForm,

        #[arg(long, default_value_t = 4)]
        turns: u32,

        #[arg(long, default_value = DEFAULT_SEQUENCE_PATH)]
        sequence: String,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    let client = RpcClient::new(&config.endpoint, config.timeout(), config.connect_timeout())?;

    let all_succeeded = match cli.command {
        Command::Calc {
            project,
            form,
            turns,
            ply,
            sequence,
        } => {
            let request = CalcRequest {
                project_name: project,
                helical_form: form.tag().to_string(),
                helical_turns: turns.to_string(),
                geometry_path: ply,
                sequence_path: sequence,
            };
            let result = client.calc(&request);
            report(&request, &result);
            result.is_ok()
        }
        Command::Batch {
            dir,
            form,
            turns,
            sequence,
        } => {
            let template = BatchTemplate {
                helical_form: form,
                helical_turns: turns,
                sequence_path: sequence,
            };
            let jobs = ply_jobs(&dir, &template)?;
            if jobs.is_empty() {
                println!("No .ply files in {}", dir.display());
                return Ok(ExitCode::SUCCESS);
            }

            let results = client.multicall_calc(&jobs)?;
            report_batch(&jobs, &results)
        }
    };

    Ok(if all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn report(request: &CalcRequest, result: &Result<Value, RpcError>) {
    match result {
        Ok(_) => println!("{}: {}", request.project_name, SUCCESS_STATUS),
        Err(e) => println!("{}: {} ({})", request.project_name, FAILURE_STATUS, e),
    }
}

/// Prints one line per job, including jobs the engine returned no result for.
fn report_batch(jobs: &[CalcRequest], results: &[Result<Value, RpcError>]) -> bool {
    let mut all_succeeded = true;
    for (index, job) in jobs.iter().enumerate() {
        match results.get(index) {
            Some(result) => {
                report(job, result);
                all_succeeded &= result.is_ok();
            }
            None => {
                println!("{}: {} (no result from engine)", job.project_name, FAILURE_STATUS);
                all_succeeded = false;
            }
        }
    }
    all_succeeded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str) -> CalcRequest {
        CalcRequest {
            project_name: name.into(),
            helical_form: "Aform".into(),
            helical_turns: "4".into(),
            geometry_path: format!("{}.ply", name),
            sequence_path: "M13.txt".into(),
        }
    }

    #[test]
    fn short_batch_reply_fails_the_missing_jobs() {
        let jobs = [job("tet"), job("oct"), job("cube")];
        let results = vec![Ok(Value::from("Finished!"))];
        assert!(!report_batch(&jobs, &results));
    }

    #[test]
    fn full_batch_reply_succeeds_only_when_every_job_did() {
        let jobs = [job("tet"), job("oct")];
        let ok = vec![Ok(Value::from("Finished!")), Ok(Value::from("Finished!"))];
        assert!(report_batch(&jobs, &ok));

        let mixed = vec![Ok(Value::from("Finished!")), Err(RpcError::Timeout)];
        assert!(!report_batch(&jobs, &mixed));
    }
}
