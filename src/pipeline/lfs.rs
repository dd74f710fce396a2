//! pipeline::lfs
//!
//! Large-file object sync for one side's checkout.
//!
//! # Behavior
//!
//! [`PushLfsPhase`] opens the configured side's checkout under its lock,
//! fetches every LFS object it references from [`LFS_PULL_ENDPOINT`], and
//! uploads them to the forge project's LFS endpoint with credentials
//! embedded in the URL.
//!
//! Only internal → external sync is supported: objects are always pulled
//! from the internal store, whichever side is pushed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use shipsync::auth::{Credentials, StaticCredentials};
//! use shipsync::core::types::Side;
//! use shipsync::pipeline::{Phase, PushLfsPhase};
//!
//! let creds = Arc::new(StaticCredentials::new(Credentials::access_token("t0k").unwrap()));
//! let phase = PushLfsPhase::new(Side::Destination, "myorg", "myproj", true, creds);
//!
//! assert_eq!(phase.readable_name(), "Push LFS for destination repository");
//! assert_eq!(phase.push_endpoint(), "https://github.com/myorg/myproj.git/info/lfs");
//! assert!(!phase.is_project_specific());
//! ```

use std::fmt;
use std::sync::Arc;

use super::phase::{CliArgument, Phase, PhaseError, PhaseTarget, SkipSwitch};
use crate::auth::{auth_https_remote_url, CredentialProvider, SecretUrl};
use crate::core::config::Config;
use crate::core::types::Side;
use crate::repo::{Backend, VcsBackend};

/// Forge hosting the destination projects.
pub const FORGE_HOST: &str = "github.com";

/// Internal LFS store objects are fetched from.
pub const LFS_PULL_ENDPOINT: &str = "https://lfs.internal.shipsync/lfs";

/// Option that turns the phase off.
pub const SKIP_FLAG: &str = "skip-lfs";

/// Pushes LFS objects for one side.
pub struct PushLfsPhase {
    side: Side,
    organization: String,
    project: String,
    credentials: Arc<dyn CredentialProvider>,
    backend: Arc<dyn Backend>,
    skip: SkipSwitch,
}

impl PushLfsPhase {
    /// A phase pushing `side`'s checkout to `organization/project`.
    ///
    /// A phase constructed with `enabled = false` starts skipped; no
    /// option re-enables it.
    pub fn new(
        side: Side,
        organization: impl Into<String>,
        project: impl Into<String>,
        enabled: bool,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let phase = Self {
            side,
            organization: organization.into(),
            project: project.into(),
            credentials,
            backend: Arc::new(VcsBackend),
            skip: SkipSwitch::new(),
        };
        if !enabled {
            phase.skip();
        }
        phase
    }

    /// Open checkouts through `backend` instead of [`VcsBackend`].
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Where objects are fetched from. Independent of the project.
    pub fn pull_endpoint(&self) -> &'static str {
        LFS_PULL_ENDPOINT
    }

    /// The project's LFS endpoint, without credentials.
    pub fn push_endpoint(&self) -> String {
        format!(
            "https://{}/{}/{}.git/info/lfs",
            FORGE_HOST, self.organization, self.project
        )
    }

    fn authenticated_push_endpoint(&self, target: &PhaseTarget) -> Result<SecretUrl, PhaseError> {
        let credential_error = |source| PhaseError::Credentials {
            phase: self.readable_name(),
            target: target.clone(),
            source,
        };
        let credentials = self
            .credentials
            .credentials_for_project(&self.organization, &self.project)
            .map_err(credential_error)?;
        auth_https_remote_url(&self.push_endpoint(), &credentials).map_err(credential_error)
    }
}

impl fmt::Debug for PushLfsPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushLfsPhase")
            .field("side", &self.side)
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("skipped", &self.is_skipped())
            .finish_non_exhaustive()
    }
}

impl Phase for PushLfsPhase {
    fn is_project_specific(&self) -> bool {
        false
    }

    fn readable_name(&self) -> String {
        format!("Push LFS for {} repository", self.side)
    }

    fn cli_arguments(&self) -> Vec<CliArgument> {
        let skip = self.skip.clone();
        vec![CliArgument::flag(SKIP_FLAG, "Skip LFS syncing", move || {
            skip.set()
        })]
    }

    fn skip_switch(&self) -> &SkipSwitch {
        &self.skip
    }

    fn run_impl(&self, config: &Config) -> Result<(), PhaseError> {
        let side = config.side(self.side);
        let target = PhaseTarget::new(self.side, side);
        let repo_error = |source| PhaseError::Repo {
            phase: self.readable_name(),
            target: target.clone(),
            source,
        };

        // Credentials are resolved ahead of `open` on purpose: a missing
        // token fails the phase without locking or touching the checkout.
        let push = self.authenticated_push_endpoint(&target)?;

        let handle = self
            .backend
            .open(side.lock(), side.path(), side.branch())
            .map_err(repo_error)?;
        handle
            .push_lfs(self.pull_endpoint(), &push)
            .map_err(repo_error)?;
        handle.release().map_err(repo_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialError, Credentials, StaticCredentials};
    use crate::core::config::SideConfig;
    use crate::core::types::BranchName;
    use crate::repo::mock::{MockBackend, MockCall};
    use std::time::Duration;
    use tempfile::TempDir;

    const TOKEN: &str = "s3cr3t-t0ken";

    fn creds() -> Arc<dyn CredentialProvider> {
        Arc::new(StaticCredentials::new(Credentials::access_token(TOKEN).unwrap()))
    }

    struct NoCredentials;

    impl CredentialProvider for NoCredentials {
        fn credentials_for_project(&self, org: &str, project: &str) -> Result<Credentials, CredentialError> {
            Err(CredentialError::NotFound {
                organization: org.into(),
                project: project.into(),
                tried: "forge.token".into(),
            })
        }
    }

    fn config(temp: &TempDir) -> Config {
        let branch = BranchName::new("main").unwrap();
        let timeout = Duration::from_millis(300);
        Config::new(
            SideConfig::with_timeout(temp.path().join("src"), branch.clone(), timeout),
            SideConfig::with_timeout(temp.path().join("dst"), branch, timeout),
        )
    }

    fn phase(enabled: bool, backend: &MockBackend) -> PushLfsPhase {
        PushLfsPhase::new(Side::Destination, "myorg", "myproj", enabled, creds())
            .with_backend(Arc::new(backend.clone()))
    }

    mod endpoints {
        use super::*;

        #[test]
        fn push_endpoint_is_deterministic() {
            let p = PushLfsPhase::new(Side::Source, "myorg", "myproj", true, creds());
            assert_eq!(p.push_endpoint(), "https://github.com/myorg/myproj.git/info/lfs");
            assert_eq!(p.push_endpoint(), p.push_endpoint());
        }

        #[test]
        fn pull_endpoint_ignores_project() {
            let a = PushLfsPhase::new(Side::Source, "a", "b", true, creds());
            let b = PushLfsPhase::new(Side::Destination, "c", "d", true, creds());
            assert_eq!(a.pull_endpoint(), LFS_PULL_ENDPOINT);
            assert_eq!(a.pull_endpoint(), b.pull_endpoint());
        }
    }

    mod skipping {
        use super::*;

        #[test]
        fn disabled_phase_makes_no_backend_calls() {
            let temp = TempDir::new().unwrap();
            let backend = MockBackend::new();
            let p = phase(false, &backend);

            assert!(p.is_skipped());
            p.run(&config(&temp)).unwrap();
            assert!(backend.calls().is_empty());
        }

        #[test]
        fn skip_is_idempotent_before_and_after_args() {
            let temp = TempDir::new().unwrap();
            let backend = MockBackend::new();
            let p = phase(true, &backend);

            p.skip();
            for arg in p.cli_arguments() {
                arg.apply(None);
            }
            p.skip();
            p.run(&config(&temp)).unwrap();
            p.run(&config(&temp)).unwrap();

            assert!(p.is_skipped());
            assert!(backend.calls().is_empty());
        }

        #[test]
        fn skip_flag_is_declared() {
            let backend = MockBackend::new();
            let args = phase(true, &backend).cli_arguments();
            assert_eq!(args.len(), 1);
            assert_eq!(args[0].long_name(), "skip-lfs");
            assert_eq!(args[0].description(), "Skip LFS syncing");
        }
    }

    mod running {
        use super::*;

        #[test]
        fn enabled_phase_pushes_once_with_pull_then_push() {
            let temp = TempDir::new().unwrap();
            let backend = MockBackend::new();
            phase(true, &backend).run(&config(&temp)).unwrap();

            let calls = backend.calls();
            assert_eq!(calls.len(), 2);
            assert_eq!(
                calls[0],
                MockCall::Open {
                    path: temp.path().join("dst"),
                    branch: "main".into(),
                }
            );
            assert_eq!(
                calls[1],
                MockCall::PushLfs {
                    pull: LFS_PULL_ENDPOINT.into(),
                    push: format!("https://{}@github.com/myorg/myproj.git/info/lfs", TOKEN),
                    lock_held: true,
                }
            );
        }

        #[test]
        fn source_side_opens_source_checkout() {
            let temp = TempDir::new().unwrap();
            let backend = MockBackend::new();
            PushLfsPhase::new(Side::Source, "myorg", "myproj", true, creds())
                .with_backend(Arc::new(backend.clone()))
                .run(&config(&temp))
                .unwrap();

            assert!(matches!(
                &backend.calls()[0],
                MockCall::Open { path, .. } if *path == temp.path().join("src")
            ));
        }

        #[test]
        fn lock_released_after_failed_push() {
            let temp = TempDir::new().unwrap();
            let cfg = config(&temp);
            let backend = MockBackend::new().failing_push("HTTP 500");

            let err = phase(true, &backend).run(&cfg).unwrap_err();
            assert!(matches!(err, PhaseError::Repo { .. }));
            assert!(cfg
                .side(Side::Destination)
                .lock()
                .try_acquire()
                .unwrap()
                .is_some());
        }

        #[test]
        fn missing_credentials_fail_before_open() {
            let temp = TempDir::new().unwrap();
            let backend = MockBackend::new();
            let p = PushLfsPhase::new(Side::Destination, "myorg", "myproj", true, Arc::new(NoCredentials))
                .with_backend(Arc::new(backend.clone()));

            let err = p.run(&config(&temp)).unwrap_err();
            assert!(matches!(err, PhaseError::Credentials { .. }));
            assert!(backend.calls().is_empty());
        }
    }

    mod leakage {
        use super::*;

        #[test]
        fn credential_never_in_name_or_errors() {
            let temp = TempDir::new().unwrap();
            let backend = MockBackend::new().failing_push("denied");
            let p = phase(true, &backend);

            assert!(!p.readable_name().contains(TOKEN));
            assert!(!format!("{:?}", p).contains(TOKEN));

            let err = p.run(&config(&temp)).unwrap_err();
            assert!(!err.to_string().contains(TOKEN));
            assert!(!format!("{:?}", err).contains(TOKEN));
        }

        #[test]
        fn credential_appears_once_in_push_url() {
            let temp = TempDir::new().unwrap();
            let backend = MockBackend::new();
            phase(true, &backend).run(&config(&temp)).unwrap();

            match &backend.pushes()[0] {
                MockCall::PushLfs { push, .. } => assert_eq!(push.matches(TOKEN).count(), 1),
                other => panic!("unexpected call {:?}", other),
            }
        }
    }
}
