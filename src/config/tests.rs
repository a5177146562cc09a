use super::*;

use serial_test::serial;

use crate::head::ObjectiveMode;

fn clear_rear_env() {
    for var in [
        Config::ENV_MODEL_PATH,
        Config::ENV_DATA_PATH,
        Config::ENV_BETA,
        Config::ENV_NEGATIVE_BIAS,
        Config::ENV_GROUP_SIZE,
        Config::ENV_WARM_UP,
        Config::ENV_MINOR_DIFF,
        Config::ENV_HEAD_SCALER,
        Config::ENV_PROJ_SCALER,
        Config::ENV_COARSE_WEIGHT,
        Config::ENV_THRESHOLD,
        Config::ENV_BATCH_SIZE,
        Config::ENV_LEARNING_RATE,
        Config::ENV_EPOCHS,
    ] {
        unsafe { env::remove_var(var) };
    }
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert!(config.model_path.is_none());
    assert!(config.beta.is_none());
    assert_eq!(config.group_size, 8);
    assert!(!config.warm_up);
    assert_eq!(config.coarse_weight, 0.5);
    assert_eq!(config.threshold, 13.0);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_defaults_when_unset() {
    clear_rear_env();
    let config = Config::from_env().unwrap();
    assert!(config.beta.is_none());
    assert_eq!(config.group_size, 8);
    assert_eq!(config.batch_size, 32);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_rear_env();
    unsafe {
        env::set_var(Config::ENV_BETA, "0.25");
        env::set_var(Config::ENV_GROUP_SIZE, "4");
        env::set_var(Config::ENV_WARM_UP, "true");
        env::set_var(Config::ENV_NEGATIVE_BIAS, "0.4");
        env::set_var(Config::ENV_MINOR_DIFF, "0.1");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.beta, Some(0.25));
    assert_eq!(config.group_size, 4);
    assert!(config.warm_up);
    assert_eq!(config.negative_bias, 0.4);
    assert_eq!(config.minor_diff, 0.1);

    clear_rear_env();
}

#[test]
#[serial]
fn test_from_env_rejects_garbage_numbers() {
    clear_rear_env();
    unsafe { env::set_var(Config::ENV_GROUP_SIZE, "not-a-number") };

    let result = Config::from_env();
    assert!(matches!(
        result,
        Err(ConfigError::ParseError {
            var: Config::ENV_GROUP_SIZE,
            ..
        })
    ));

    clear_rear_env();
}

#[test]
#[serial]
fn test_from_env_empty_beta_means_gate_mode() {
    clear_rear_env();
    unsafe { env::set_var(Config::ENV_BETA, "  ") };

    let config = Config::from_env().unwrap();
    assert!(config.beta.is_none());

    clear_rear_env();
}

#[test]
fn test_validate_rejects_zero_group_size() {
    let config = Config {
        group_size: 0,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn test_validate_rejects_negative_bias() {
    let config = Config {
        negative_bias: -1.0,
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_epochs() {
    let config = Config {
        epochs: 0,
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_missing_model_path() {
    let config = Config {
        model_path: Some(PathBuf::from("/definitely/not/here")),
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::PathNotFound { .. })
    ));
}

#[test]
fn test_validate_accepts_existing_model_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        model_path: Some(dir.path().to_path_buf()),
        ..Config::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_head_config_combined_when_beta_set() {
    let config = Config {
        beta: Some(0.5),
        group_size: 4,
        warm_up: true,
        ..Config::default()
    };

    let head = config.head_config(4096);
    assert_eq!(head.hidden_size, 4096);
    assert_eq!(head.mode, ObjectiveMode::Combined { beta: 0.5 });
    assert_eq!(head.group_size, 4);
    assert!(head.warm_up);
}

#[test]
fn test_head_config_gate_when_beta_unset() {
    let config = Config {
        beta: None,
        threshold: 7.5,
        ..Config::default()
    };

    let head = config.head_config(2048);
    assert_eq!(head.mode, ObjectiveMode::ScoreGate { threshold: 7.5 });
}
