/*
 * Copyright 2020 Damian Peckett <damian@pecke.tt>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::config::{PoolIdentity, ScalingConfig, TargetKind};
use crate::controller::Controller;
use crate::demand::buildkite::{BuildkiteDemandSource, DEFAULT_API_URL};
use crate::demand::DemandSource;
use crate::error::*;
use crate::kubernetes::KubernetesObject;
use crate::strategy::cooldown::CooldownAutoScalerStrategy;
use crate::strategy::AutoScalerStrategy;
use crate::timer::PollInterval;
use clap::{crate_name, crate_version, Parser, ValueEnum};
use slog::{crit, info, o, Drain, Level, LevelFilter, Logger};
use snafu::ResultExt;
use std::panic;
use std::process::exit;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use stream_cancel::{StreamExt as StreamCancelExt, Tripwire};

/// Scaling configuration.
mod config;
/// Per tick reconciliation driver.
mod controller;
/// Queue demand sources.
mod demand;
/// Buildkite scaler error types.
mod error;
/// Kubernetes api abstraction.
mod kubernetes;
/// Autoscaling control strategies.
mod strategy;
/// Control loop time base.
mod timer;

/// Log level command line argument.
#[derive(Clone, Copy, PartialEq, Debug, ValueEnum)]
pub enum LogLevelArgument {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArgument> for Level {
    fn from(level_arg: LogLevelArgument) -> Level {
        match level_arg {
            LogLevelArgument::Critical => Level::Critical,
            LogLevelArgument::Error => Level::Error,
            LogLevelArgument::Warning => Level::Warning,
            LogLevelArgument::Info => Level::Info,
            LogLevelArgument::Debug => Level::Debug,
            LogLevelArgument::Trace => Level::Trace,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Arguments {
    /// Set the application log level.
    #[arg(long, env = "LOG_LEVEL", value_enum, ignore_case = true, default_value_t = LogLevelArgument::Info)]
    log_level: LogLevelArgument,

    /// Buildkite REST api access token.
    #[arg(long, env = "BUILDKITE_API_TOKEN", hide_env_values = true)]
    buildkite_api_token: String,

    /// Buildkite REST api base url.
    #[arg(long, env = "BUILDKITE_API_URL", default_value = DEFAULT_API_URL)]
    buildkite_api_url: String,

    /// Only count builds belonging to this Buildkite organization.
    #[arg(long, env = "BUILDKITE_ORGANIZATION")]
    buildkite_organization: Option<String>,

    /// Kubernetes resource kind of the worker pool.
    #[arg(long, env = "TARGET_KIND", value_enum, ignore_case = true, default_value_t = TargetKind::Deployment)]
    target_kind: TargetKind,

    /// Namespace of the worker pool.
    #[arg(long, env = "TARGET_NAMESPACE", default_value = "buildkite")]
    target_namespace: String,

    /// Name of the worker pool object.
    #[arg(long, env = "TARGET_DEPLOYMENT_NAME")]
    target_name: String,

    /// Minimum number of agent replicas.
    #[arg(long, env = "MIN_REPLICAS", default_value_t = 1)]
    min_replicas: u32,

    /// Maximum number of agent replicas.
    #[arg(long, env = "MAX_REPLICAS", default_value_t = 50)]
    max_replicas: u32,

    /// Replicas removed each time the cooldown period expires.
    #[arg(long, env = "SCALE_DOWN_STEP", default_value_t = 20)]
    scale_down_step: u32,

    /// Seconds without any builds before each scale down step.
    #[arg(long, env = "COOLDOWN_SECONDS", default_value_t = 300)]
    cooldown_seconds: u32,

    /// How often to evaluate the worker pool (seconds).
    #[arg(long, env = "POLL_INTERVAL_SECONDS", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let arguments = Arguments::parse();

    let logger = Logger::root(
        StdMutex::new(LevelFilter::new(
            slog_json::Json::default(std::io::stdout()),
            arguments.log_level.into(),
        ))
        .map(slog::Fuse),
        o!("application" => crate_name!(), "version" => crate_version!()),
    );

    // Replace the panic handler with one that will exit the process on panics (in any thread).
    // This lets Kubernetes restart the process if we hit anything unexpected.
    let panic_logger = logger.clone();
    let _ = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        crit!(panic_logger, "Thread panicked"; "error" => format!("{}", panic_info));
        exit(1);
    }));

    let config = ScalingConfig::new(
        arguments.min_replicas,
        arguments.max_replicas,
        arguments.scale_down_step,
        arguments.cooldown_seconds,
    )?;

    let pool = PoolIdentity {
        kind: arguments.target_kind,
        namespace: arguments.target_namespace,
        name: arguments.target_name,
    };

    info!(logger, "Starting buildkite autoscaling";
        "pool" => pool.to_string(),
        "min_replicas" => config.min_replicas(),
        "max_replicas" => config.max_replicas(),
        "scale_down_step" => config.scale_down_step(),
        "cooldown_seconds" => config.cooldown_seconds(),
        "poll_interval_seconds" => arguments.poll_interval_seconds);

    // In cluster configuration when available, otherwise the local kubeconfig.
    let kube_client = kube::Client::try_default().await.context(KubeSnafu)?;

    let demand_source = DemandSource::Buildkite(BuildkiteDemandSource::new(
        logger.new(o!("demand_source" => "buildkite")),
        &arguments.buildkite_api_url,
        &arguments.buildkite_api_token,
        arguments.buildkite_organization.as_deref(),
    )?);

    let controller = Controller::new(
        logger.new(o!("pool" => pool.to_string())),
        AutoScalerStrategy::Cooldown(CooldownAutoScalerStrategy::new(config)),
        demand_source,
        KubernetesObject::new(kube_client, &pool),
    );

    // Dropping the trigger ends the tick stream once the in flight tick completes.
    let (trigger, tripwire) = Tripwire::new();
    let signal_logger = logger.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!(signal_logger, "Received shutdown signal");
        trigger.cancel();
    });

    let ticks = PollInterval::new(Duration::from_secs(arguments.poll_interval_seconds))
        .take_until_if(tripwire);
    let state = controller.run(ticks).await;

    // Cooldown state is held in memory only, a restart begins again from unknown.
    info!(logger, "Stopped buildkite autoscaling"; "phase" => state.phase());
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix platforms.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut terminate) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = terminate.recv() => {},
            }
            return;
        }
    }
    let _ = tokio::signal::ctrl_c().await;
}
