use rstest::rstest;

use super::*;

fn parse(yaml: &str) -> Config {
    serde_yaml::from_str::<Config>(yaml).unwrap()
}

const FULL_CONFIG: &str = r#"
output:
  folder: /tmp/kwatch-data
  folderAnnotation: kwatch-target-dir
  uniqueFilenames: false
  defaultFileMode: "0644"
kubernetes:
  namespace: default
resources:
  type: both
  method: WATCH
  watchConfig:
    serverTimeout: 60
    clientTimeout: 66
    errorThrottleTime: 5
    ignoreProcessed: true
  labels:
    - name: app
      value: test
      request:
        url: http://mock/webhook
        method: POST
        timeout: 10
        retry:
          total: 3
          backoffFactor: 1.5
logging:
  level: INFO
  format: LOGFMT
"#;

#[test]
fn full_config_deserializes() {
    let config = parse(FULL_CONFIG);

    assert_eq!("/tmp/kwatch-data", config.output.folder.to_str().unwrap());
    assert_eq!(Some("kwatch-target-dir"), config.output.folder_annotation.as_deref());
    assert!(!config.output.unique_filenames);
    assert_eq!(0o644, config.output.file_mode().unwrap());
    assert_eq!("default", config.kubernetes.namespace);
    assert_eq!(ResourceType::Both, config.resources.kind);
    assert_eq!(WatchMethod::Watch, config.resources.method);
    assert_eq!(60, config.resources.watch_config.server_timeout);
    assert_eq!(66, config.resources.watch_config.client_timeout);
    assert!(config.resources.watch_config.ignore_processed);
    assert_eq!(LogLevel::Info, config.logging.level);
    assert_eq!(LogFormat::Logfmt, config.logging.format);

    let rule = &config.resources.labels[0];
    assert_eq!(("app", "test"), (rule.name.as_str(), rule.value.as_str()));
    let request = rule.request.as_ref().unwrap();
    assert_eq!(crate::rules::RequestMethod::Post, request.method);
    assert_eq!(3, request.retry.total);
    assert_eq!(1.5, request.retry.backoff_factor);

    config.validate().unwrap();
}

#[test]
fn minimal_config_gets_defaults() {
    let config = parse(
        "output:\n  folder: /data\nresources:\n  labels:\n    - name: app\n      value: grafana\n",
    );

    assert_eq!(ResourceType::Both, config.resources.kind);
    assert_eq!(WatchMethod::Watch, config.resources.method);
    assert_eq!(60, config.resources.watch_config.server_timeout);
    assert_eq!(66, config.resources.watch_config.client_timeout);
    assert_eq!(5, config.resources.watch_config.error_throttle_time);
    assert!(!config.resources.watch_config.ignore_processed);
    assert_eq!("", config.kubernetes.namespace);
    assert_eq!(0o644, config.output.file_mode().unwrap());
    assert_eq!(LogLevel::Info, config.logging.level);

    config.validate().unwrap();
}

#[rstest]
#[case("configmap", ResourceType::ConfigMap)]
#[case("secret", ResourceType::Secret)]
#[case("both", ResourceType::Both)]
fn resource_type_parses(#[case] value: &str, #[case] expected: ResourceType) {
    let config = parse(&format!(
        "output:\n  folder: /data\nresources:\n  type: {value}\n  labels:\n    - name: a\n      value: b\n"
    ));

    assert_eq!(expected, config.resources.kind);
}

#[test]
fn sleep_method_parses() {
    let config = parse(
        "output:\n  folder: /data\nresources:\n  method: SLEEP\n  labels:\n    - name: a\n      value: b\n",
    );

    assert_eq!(WatchMethod::Sleep, config.resources.method);
}

#[test]
fn client_timeout_must_exceed_server_timeout() {
    let config = parse(
        "output:\n  folder: /data\nresources:\n  watchConfig:\n    serverTimeout: 60\n    clientTimeout: 60\n  labels:\n    - name: a\n      value: b\n",
    );

    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn empty_label_rules_are_rejected() {
    let config = parse("output:\n  folder: /data\nresources:\n  labels: []\n");

    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[rstest]
#[case("0644", Some(0o644))]
#[case("0755", Some(0o755))]
#[case("644", Some(0o644))]
#[case("0999", None)]
#[case("rw-r--r--", None)]
#[case("10644", None)]
fn file_mode_parses_octal(#[case] mode: &str, #[case] expected: Option<u32>) {
    let config = parse(&format!(
        "output:\n  folder: /data\n  defaultFileMode: \"{mode}\"\nresources:\n  labels:\n    - name: a\n      value: b\n"
    ));

    assert_eq!(expected, config.output.file_mode().ok());
}

#[test]
fn invalid_yaml_is_a_serialization_error() {
    let error = serde_yaml::from_str::<Config>("output: [not, a, map]").unwrap_err();
    assert!(matches!(ConfigError::from(error), ConfigError::SerializationError(_)));
}
