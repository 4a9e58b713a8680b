//! Property-based tests for repospecs and URL templates.

use proptest::prelude::*;

use got::core::repospec::{parse_extended, Repospec};
use got::core::template::Template;
use got::core::types::HostName;

fn host_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}"
}

/// Lower-case repository names made of non-empty segments.
fn repo_name() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_][a-z0-9_.-]{0,11}", 1..4).prop_map(|parts| parts.join("/"))
}

fn version() -> impl Strategy<Value = String> {
    "[a-z0-9._/-]{1,16}"
}

fn repospec() -> impl Strategy<Value = Repospec> {
    (
        prop::option::of(host_name()),
        repo_name(),
        prop::option::of(version()),
    )
        .prop_map(|(host, name, version)| {
            Repospec::new(host.map(|h| HostName::new(h).unwrap()), name, version)
        })
}

proptest! {
    #[test]
    fn display_then_parse_is_identity(spec in repospec()) {
        let text = spec.to_string();
        prop_assert_eq!(Repospec::parse(&text).unwrap(), spec);
    }

    #[test]
    fn names_and_hosts_are_case_insensitive(host in host_name(), name in repo_name()) {
        let upper = format!("{}:{}", host.to_uppercase(), name.to_uppercase());
        let lower = format!("{host}:{name}");
        prop_assert_eq!(Repospec::parse(&upper).unwrap(), Repospec::parse(&lower).unwrap());
    }

    #[test]
    fn versions_are_case_insensitive(name in repo_name(), version in version()) {
        let spec = Repospec::parse(&format!("{name}@{}", version.to_uppercase())).unwrap();
        prop_assert_eq!(spec.version.as_deref(), Some(version.as_str()));
    }

    #[test]
    fn forbidden_name_characters_are_rejected(
        name in repo_name(),
        bad in prop::sample::select(vec![' ', '#', '!', '\\', '?', '%']),
    ) {
        let input = format!("{name}{bad}x");
        prop_assert!(Repospec::parse(&input).is_err());
    }

    #[test]
    fn trailing_plus_marks_transitive(spec in repospec()) {
        let requests = parse_extended(&format!("{spec}+")).unwrap();
        prop_assert_eq!(requests.len(), 1);
        prop_assert!(requests[0].transitive);
        prop_assert_eq!(&requests[0].spec, &spec);
    }

    #[test]
    fn rendered_name_is_captured_back(
        prefix in "[a-z]{1,8}://[a-z]{1,8}(:[0-9]{2,4})?/",
        user in "[a-z]{1,8}",
        name in repo_name(),
    ) {
        let template = Template::parse(&format!("{prefix}%username@scm/%rs.git")).unwrap();
        let vars = [("username", user.as_str()), ("rs", name.as_str())];
        let url = template.render(&vars).unwrap();
        prop_assert_eq!(
            template.capture(&url, &[("username", user.as_str())], "rs"),
            Some(name)
        );
    }

    #[test]
    fn templates_without_placeholders_render_verbatim(text in "[a-z0-9:/.@_-]{0,40}") {
        let template = Template::parse(&text).unwrap();
        prop_assert_eq!(template.render(&[]).unwrap(), text);
    }
}
