//! pipeline
//!
//! Phase-based synchronization.
//!
//! # Architecture
//!
//! - [`phase`]: the [`Phase`] trait, [`CliArgument`] and [`PhaseError`]
//! - [`runner`]: [`Pipeline`], which collects phase options and runs
//!   phases in order against one [`crate::core::config::Config`]
//! - [`lfs`]: [`PushLfsPhase`]
//!
//! [`build`] assembles the standard pipeline from a config.

pub mod lfs;
pub mod phase;
pub mod runner;

pub use lfs::{PushLfsPhase, LFS_PULL_ENDPOINT};
pub use phase::{ArgKind, CliArgument, Phase, PhaseError, PhaseTarget, SkipSwitch};
pub use runner::{PhaseOutcome, PhaseStatus, Pipeline, PipelineError, PipelineReport};

use std::sync::Arc;

use crate::auth::CredentialProvider;
use crate::core::config::Config;

/// The standard pipeline for `config`.
///
/// The LFS phase is included only when `[lfs]` names an organization and a
/// project; `[lfs] enabled` decides whether it starts enabled.
pub fn build(config: &Config, credentials: Arc<dyn CredentialProvider>) -> Pipeline {
    let mut pipeline = Pipeline::new();

    let lfs = config.lfs();
    if let (Some(organization), Some(project)) = (&lfs.organization, &lfs.project) {
        pipeline.push(Box::new(PushLfsPhase::new(
            lfs.side,
            organization.as_str(),
            project.as_str(),
            lfs.enabled,
            credentials,
        )));
    }

    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, StaticCredentials};
    use crate::core::config::{LfsSettings, SideConfig};
    use crate::core::types::{BranchName, Side};

    fn config(lfs: LfsSettings) -> Config {
        let branch = BranchName::new("main").unwrap();
        Config::new(
            SideConfig::new("/tmp/s", branch.clone()),
            SideConfig::new("/tmp/d", branch),
        )
        .with_lfs(lfs)
    }

    fn creds() -> Arc<dyn CredentialProvider> {
        Arc::new(StaticCredentials::new(Credentials::access_token("t").unwrap()))
    }

    #[test]
    fn no_lfs_project_means_no_phase() {
        assert!(build(&config(LfsSettings::default()), creds()).is_empty());
    }

    #[test]
    fn lfs_phase_follows_settings() {
        let pipeline = build(
            &config(LfsSettings {
                enabled: false,
                side: Side::Source,
                organization: Some("acme".into()),
                project: Some("widget".into()),
            }),
            creds(),
        );
        assert_eq!(pipeline.len(), 1);
        let phase = &pipeline.phases()[0];
        assert_eq!(phase.readable_name(), "Push LFS for source repository");
        assert!(phase.is_skipped());
    }
}
