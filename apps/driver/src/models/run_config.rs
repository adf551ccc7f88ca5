use crate::models::args::Cli;
use std::collections::BTreeMap;

/// Registry the CI profile pushes to.
pub const CI_REGISTRY: &str = "gcr.io/pipeline-ci";
/// Runner arguments the CI profile adds for structured test reports.
pub const CI_TEST_ARGS: [&str; 2] = ["--junitxml", "test-reports/junit.xml"];
/// Credentials plumbing the CI profile hands to the test suite.
pub const CI_TEST_ENV: [(&str, &str); 1] =
    [("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/gcloud-service-key.json")];

/// What a single invocation is going to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub run_tests: bool,
    pub manage_virtualenv: bool,
    pub lint: bool,
    pub registry: Option<String>,
    pub build_and_push: bool,
    pub version_suffix: String,
    pub test_args: Vec<String>,
    pub test_env: BTreeMap<String, String>,
    pub parallel: bool,
    pub dry_run: bool,
}

impl RunConfig {
    /// Resolves the flags into the effective configuration.
    ///
    /// `--circle` replaces the individual flags with the CI profile. Running
    /// tests needs fresh images, so it switches on build-and-push.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = if cli.circle {
            Self {
                manage_virtualenv: false,
                registry: Some(CI_REGISTRY.to_owned()),
                version_suffix: String::new(),
                lint: false,
                build_and_push: false,
                test_env: CI_TEST_ENV
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect(),
                test_args: CI_TEST_ARGS
                    .iter()
                    .map(|a| (*a).to_owned())
                    .chain(cli.test_args.iter().cloned())
                    .collect(),
                ..Self::default()
            }
        } else {
            Self {
                manage_virtualenv: cli.manage_virtualenv,
                registry: cli.registry.clone(),
                version_suffix: cli.version_suffix.clone(),
                lint: cli.lint,
                build_and_push: cli.build_and_push,
                test_env: cli.test_env.iter().cloned().collect(),
                test_args: cli.test_args.clone(),
                ..Self::default()
            }
        };

        config.run_tests = !cli.no_tests;
        config.parallel = cli.parallel;
        config.dry_run = cli.dry_run;

        if config.run_tests && !config.build_and_push {
            println!("ℹ️  Tests run against freshly pushed images: enabling --build-and-push");
            config.build_and_push = true;
        }

        config
    }
}
