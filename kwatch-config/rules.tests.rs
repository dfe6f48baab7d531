use rstest::rstest;
use std::collections::BTreeMap;

use super::*;

fn rule(name: &str, value: &str) -> LabelRule {
    LabelRule {
        name: name.to_owned(),
        value: value.to_owned(),
        request: None,
        script: None,
    }
}

fn labels(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

#[test]
fn rule_matches_exact_key_and_value() {
    let rule = rule("app", "test");

    assert!(rule.matches(&labels(&[("app", "test")])));
    assert!(rule.matches(&labels(&[("team", "obs"), ("app", "test")])));
}

#[rstest]
#[case(&[("app", "Test")])]
#[case(&[("app", "production")])]
#[case(&[("App", "test")])]
#[case(&[("environment", "dev")])]
#[case(&[])]
fn rule_rejects_non_exact_labels(#[case] entries: &[(&'static str, &'static str)]) {
    assert!(!rule("app", "test").matches(&labels(entries)));
}

#[test]
fn matching_rules_keeps_configuration_order() {
    let rules = vec![rule("app", "test"), rule("team", "obs"), rule("app", "other")];
    let resource_labels = labels(&[("app", "test"), ("team", "obs")]);

    let matched = matching_rules(&rules, &resource_labels);

    assert_eq!(2, matched.len());
    assert_eq!("app", matched[0].name);
    assert_eq!("team", matched[1].name);
}

#[test]
fn matching_rules_empty_for_unlabeled_resource() {
    let rules = vec![rule("app", "test")];
    assert!(matching_rules(&rules, &BTreeMap::new()).is_empty());
}

#[test]
fn request_defaults() {
    let spec: RequestSpec = serde_yaml::from_str("url: http://mock/webhook\n").unwrap();

    assert_eq!(RequestMethod::Get, spec.method);
    assert_eq!(10, spec.timeout);
    assert!(!spec.skip_tls_verify);
    assert!(!spec.on_delete);
    assert_eq!(1, spec.retry.total);
    assert_eq!(1.0, spec.retry.backoff_factor);
}

#[test]
fn request_with_auth_and_tls_skip() {
    let spec: RequestSpec = serde_yaml::from_str(
        "url: https://mock:8443/webhook/tls\nmethod: POST\nskipTLSVerify: true\nauth:\n  basic:\n    username: testuser\n    password: testpass123\n",
    )
    .unwrap();

    assert!(spec.skip_tls_verify);
    let basic = spec.auth.unwrap().basic.unwrap();
    assert_eq!(("testuser", "testpass123"), (basic.username.as_str(), basic.password.as_str()));
}

#[test]
fn zero_retry_total_is_rejected() {
    let mut rule = rule("app", "test");
    rule.request = Some(serde_yaml::from_str("url: http://mock/webhook\nretry:\n  total: 0\n").unwrap());

    assert!(rule.validate().is_err());
}

#[test]
fn script_defaults_and_validation() {
    let spec: ScriptSpec = serde_yaml::from_str("command: nginx -s reload\n").unwrap();
    assert_eq!(60, spec.timeout);

    let mut rule = rule("app", "test");
    rule.script = Some(ScriptSpec {
        command: String::new(),
        timeout: 60,
    });
    assert!(rule.validate().is_err());
}
