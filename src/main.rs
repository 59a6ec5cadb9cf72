//! Binary entry point: one validation sweep across all configured forges.
//!
//! Connects to GitHub and each GitLab instance whose token is present in the
//! environment, runs the full scenario set for every instance concurrently,
//! and exits when the last scenario finishes. A missing token skips that
//! instance; it is not an error, since the cron job for staging carries a
//! different token set than the one for production.

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use packit_validation::copr::{CoprClient, DEFAULT_COPR_URL};
use packit_validation::deployment::Deployment;
use packit_validation::dispatch::run_validation;
use packit_validation::forge::{GithubForge, GitlabForge};
use packit_validation::report::AlertSink;
use packit_validation::types::ProjectId;
use packit_validation::watch::WatchConfig;

/// GitLab instances with a validation project: base URL, project namespace,
/// and the environment variable holding the token.
const GITLAB_INSTANCES: [(&str, &str, &str); 4] = [
    ("https://gitlab.com", "packit-service", "GITLAB_TOKEN"),
    ("https://gitlab.gnome.org", "packit-validation", "GITLAB_GNOME_TOKEN"),
    (
        "https://gitlab.freedesktop.org",
        "packit-service",
        "GITLAB_FREEDESKTOP_TOKEN",
    ),
    ("https://salsa.debian.org", "packit-validation", "SALSA_DEBIAN_TOKEN"),
];

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,packit_validation=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let deployment = Deployment::from_env();
    tracing::info!(deployment = %deployment, "starting validation sweep");

    let profile = Arc::new(deployment.profile());
    let farm = Arc::new(CoprClient::new(DEFAULT_COPR_URL));
    let sink = Arc::new(AlertSink::from_env());
    let config = WatchConfig::new();

    let mut instances = JoinSet::new();

    match std::env::var("GITHUB_TOKEN") {
        Ok(token) => {
            match GithubForge::connect(token, ProjectId::new("packit", "hello-world"), profile.clone())
                .await
            {
                Ok(forge) => {
                    let forge = Arc::new(forge);
                    let (farm, profile, sink) = (farm.clone(), profile.clone(), sink.clone());
                    instances.spawn(async move {
                        run_validation(forge, farm, profile, config, sink).await
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "could not connect to GitHub, skipping it");
                }
            }
        }
        Err(_) => {
            tracing::info!("GITHUB_TOKEN not set, skipping the validation for GitHub");
        }
    }

    for (base_url, namespace, token_var) in GITLAB_INSTANCES {
        let Ok(token) = std::env::var(token_var) else {
            tracing::info!(
                instance = base_url,
                "{token_var} not set, skipping the validation for this instance"
            );
            continue;
        };

        match GitlabForge::connect(
            base_url,
            token,
            ProjectId::new(namespace, "hello-world"),
            profile.clone(),
        )
        .await
        {
            Ok(forge) => {
                let forge = Arc::new(forge);
                let (farm, profile, sink) = (farm.clone(), profile.clone(), sink.clone());
                instances
                    .spawn(async move { run_validation(forge, farm, profile, config, sink).await });
            }
            Err(e) => {
                tracing::error!(instance = base_url, error = %e, "could not connect, skipping this instance");
            }
        }
    }

    while let Some(joined) = instances.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "validation for an instance failed"),
            Err(e) => tracing::error!(error = %e, "validation task for an instance panicked"),
        }
    }

    tracing::info!("validation sweep finished");
}
