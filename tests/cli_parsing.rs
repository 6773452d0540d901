use bisector::cli::{Cli, Commands};
use bisector::domain::models::BuildOutcome;
use clap::Parser;

const STEP_ENV: [&str; 5] = [
    "GIT_COMMIT",
    "BUILD_RESULT",
    "GIT_PREVIOUS_SUCCESSFUL_COMMIT",
    "BISECTOR_SEARCH_ID",
    "BISECTOR_CONFIG",
];

#[test]
fn test_parse_run_resume_without_endpoints() {
    let cli = Cli::try_parse_from(["bisector", "run", "--search-id", "nightly"]).unwrap();

    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.search_id, "nightly");
            assert!(args.good.is_none());
            assert!(args.bad.is_none());
            assert!(!args.no_continue);
            assert!(args.params.is_empty());
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_run_requires_both_endpoints() {
    let result = Cli::try_parse_from(["bisector", "run", "--search-id", "nightly", "--good", "a1"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_run_repeated_params() {
    let cli = Cli::try_parse_from([
        "bisector",
        "--json",
        "run",
        "--search-id",
        "nightly",
        "--good",
        "v1.2.0",
        "--bad",
        "main",
        "--param",
        "SUITE=smoke",
        "--param",
        "ARGS=--fast --quiet",
    ])
    .unwrap();

    assert!(cli.json);
    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.bad.as_deref(), Some("main"));
            assert_eq!(
                args.params,
                vec![
                    ("SUITE".to_string(), "smoke".to_string()),
                    ("ARGS".to_string(), "--fast --quiet".to_string()),
                ]
            );
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_step() {
    temp_env::with_vars_unset(STEP_ENV, || {
        let cli = Cli::try_parse_from([
            "bisector",
            "step",
            "--revision",
            "b9",
            "--result",
            "FAILURE",
            "--previous-good",
            "a1",
        ])
        .unwrap();

        match cli.command {
            Commands::Step(args) => {
                assert_eq!(args.revision.as_deref(), Some("b9"));
                assert_eq!(args.result, BuildOutcome::Failure);
                assert_eq!(args.previous_good.as_deref(), Some("a1"));
                assert!(args.search_id.is_none());
            }
            _ => panic!("Wrong top-level command"),
        }
    });
}

#[test]
fn test_parse_step_from_build_environment() {
    temp_env::with_vars(
        [
            ("GIT_COMMIT", Some("c5")),
            ("BUILD_RESULT", Some("success")),
            ("GIT_PREVIOUS_SUCCESSFUL_COMMIT", None),
            ("BISECTOR_SEARCH_ID", Some("nightly")),
            ("BISECTOR_CONFIG", Some("/etc/bisector.yaml")),
        ],
        || {
            let cli = Cli::try_parse_from(["bisector", "step"]).unwrap();
            assert_eq!(
                cli.config.as_deref(),
                Some(std::path::Path::new("/etc/bisector.yaml"))
            );

            match cli.command {
                Commands::Step(args) => {
                    assert_eq!(args.revision.as_deref(), Some("c5"));
                    assert_eq!(args.result, BuildOutcome::Success);
                    assert_eq!(args.search_id.as_deref(), Some("nightly"));
                    assert!(args.previous_good.is_none());
                }
                _ => panic!("Wrong top-level command"),
            }
        },
    );
}

#[test]
fn test_parse_step_without_revision() {
    temp_env::with_vars_unset(STEP_ENV, || {
        let cli = Cli::try_parse_from(["bisector", "step", "--result", "success"]).unwrap();
        match cli.command {
            Commands::Step(args) => assert!(args.revision.is_none()),
            _ => panic!("Wrong top-level command"),
        }
    });
}

#[test]
fn test_parse_step_rejects_unknown_result() {
    temp_env::with_vars_unset(STEP_ENV, || {
        let result = Cli::try_parse_from([
            "bisector", "step", "--revision", "b9", "--result", "flaky",
        ]);
        assert!(result.is_err());
    });
}

#[test]
fn test_parse_status_and_init() {
    temp_env::with_vars_unset(STEP_ENV, || {
        let cli = Cli::try_parse_from(["bisector", "status", "--search-id", "nightly"]).unwrap();
        assert!(matches!(cli.command, Commands::Status(ref args) if args.search_id == "nightly"));

        let cli = Cli::try_parse_from(["bisector", "init", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Init(ref args) if args.force));

        assert!(Cli::try_parse_from(["bisector", "status"]).is_err());
    });
}
