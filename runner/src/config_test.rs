use crate::config::{
    ConfigErrors, LogFormat, LsfConfig, RunnerConfig, SingularityConfig, DEFAULT_IMAGE_CACHE_DIR,
};
use std::{io::Write, path::PathBuf};

#[test]
pub fn empty_mapping_uses_defaults() {
    let config = RunnerConfig::from_yaml("{}").unwrap();

    assert_eq!(config.backend, "lsf_singularity");
    assert!(!config.lsf.memory_per_job);
    assert!(config.lsf.extra_args.is_none());
    assert_eq!(config.singularity.exe, ["singularity"]);
    assert_eq!(
        config.singularity.run_options,
        ["--containall", "--no-mount", "hostfs"]
    );
    assert!(config.singularity.image_cache.is_none());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
pub fn full_config_is_read() {
    let config = RunnerConfig::from_yaml(
        r#"
backend: singularity
lsf:
  memory_per_job: true
  extra_args: "-q short -P 'my project'"
singularity:
  exe: [apptainer]
  run_options: []
  image_cache: /shared/images
logging:
  level: debug
  format: json
"#,
    )
    .unwrap();

    assert_eq!(config.backend, "singularity");
    assert!(config.lsf.memory_per_job);
    assert_eq!(config.singularity.exe, ["apptainer"]);
    assert!(config.singularity.run_options.is_empty());
    assert_eq!(
        config.singularity.image_cache,
        Some(PathBuf::from("/shared/images"))
    );
    assert_eq!(config.logging.format, LogFormat::Json);

    let scheduler = config.lsf.scheduler_config().unwrap();
    assert!(scheduler.memory_per_job);
    assert_eq!(scheduler.extra_args, ["-q", "short", "-P", "my project"]);
}

#[test]
pub fn unknown_keys_are_rejected() {
    assert!(matches!(
        RunnerConfig::from_yaml("lsf:\n  memory_per_core: true\n"),
        Err(ConfigErrors::InvalidYaml(_))
    ));
}

#[test]
pub fn config_is_loaded_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "lsf:\n  extra_args: -W 60").unwrap();

    let config = RunnerConfig::load(file.path()).unwrap();

    assert_eq!(config.lsf.extra_args.as_deref(), Some("-W 60"));
}

#[test]
pub fn missing_file_is_an_error() {
    assert!(matches!(
        RunnerConfig::load(&PathBuf::from("/nonexistent/lsf-runner.yaml")),
        Err(ConfigErrors::FileNotReadable(_))
    ));
}

#[test]
pub fn absent_extra_args_yield_no_tokens() {
    let scheduler = LsfConfig::default().scheduler_config().unwrap();

    assert!(scheduler.extra_args.is_empty());
    assert!(!scheduler.memory_per_job);
}

#[test]
pub fn malformed_extra_args_fail() {
    let lsf = LsfConfig {
        memory_per_job: false,
        extra_args: Some("-q 'unterminated".to_string()),
    };

    assert!(matches!(
        lsf.scheduler_config(),
        Err(ConfigErrors::MalformedExtraArgs(_))
    ));
}

#[test]
pub fn image_cache_defaults_below_cwd() {
    let mut singularity = SingularityConfig::default();
    singularity.default_image_cache(&PathBuf::from("/work/dir"));

    assert_eq!(
        singularity.image_cache,
        Some(PathBuf::from("/work/dir").join(DEFAULT_IMAGE_CACHE_DIR))
    );

    let mut empty = SingularityConfig {
        image_cache: Some(PathBuf::new()),
        ..SingularityConfig::default()
    };
    empty.default_image_cache(&PathBuf::from("/work/dir"));

    assert_eq!(
        empty.image_cache,
        Some(PathBuf::from("/work/dir/singularity_image_cache"))
    );
}

#[test]
pub fn configured_image_cache_is_kept() {
    let mut singularity = SingularityConfig {
        image_cache: Some(PathBuf::from("/shared/images")),
        ..SingularityConfig::default()
    };
    singularity.default_image_cache(&PathBuf::from("/work/dir"));

    assert_eq!(
        singularity.image_cache,
        Some(PathBuf::from("/shared/images"))
    );
}
