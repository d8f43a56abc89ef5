use std::sync::OnceLock;

use regex::Regex;

/// `{{ env.VAR }}` placeholder pattern, with an optional
/// `{{ env.VAR | default("fallback") }}` form
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*env\.([A-Za-z0-9_]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` placeholders in a raw TOML string
///
/// Operates on the text before deserialization so config structs stay
/// plain `String`/`SecretString`. Comment lines are passed through
/// untouched. A placeholder without a default fails when the variable
/// is unset.
pub fn expand_env(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());

    for (i, line) in raw.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }

        if line.trim_start().starts_with('#') {
            out.push_str(line);
            continue;
        }

        let mut cursor = 0;
        for caps in placeholder().captures_iter(line) {
            let whole = caps.get(0).expect("group 0 always present");
            let var = &caps[1];

            out.push_str(&line[cursor..whole.start()]);

            match std::env::var(var) {
                Ok(value) => out.push_str(&value),
                Err(_) => match caps.get(2) {
                    Some(fallback) => out.push_str(fallback.as_str()),
                    None => return Err(format!("environment variable not found: `{var}`")),
                },
            }

            cursor = whole.end();
        }
        out.push_str(&line[cursor..]);
    }

    if raw.ends_with('\n') {
        out.push('\n');
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let input = "port = 8080";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_set_variable() {
        temp_env::with_var("TRANSIT_TEST_TOKEN", Some("s3cret"), || {
            let out = expand_env("token = \"{{ env.TRANSIT_TEST_TOKEN }}\"").unwrap();
            assert_eq!(out, "token = \"s3cret\"");
        });
    }

    #[test]
    fn missing_variable_errors() {
        temp_env::with_var_unset("TRANSIT_TEST_MISSING", || {
            let err = expand_env("token = \"{{ env.TRANSIT_TEST_MISSING }}\"").unwrap_err();
            assert!(err.contains("TRANSIT_TEST_MISSING"));
        });
    }

    #[test]
    fn missing_variable_uses_default() {
        temp_env::with_var_unset("TRANSIT_TEST_OPT", || {
            let out =
                expand_env("addr = \"{{ env.TRANSIT_TEST_OPT | default(\"127.0.0.1\") }}\"").unwrap();
            assert_eq!(out, "addr = \"127.0.0.1\"");
        });
    }

    #[test]
    fn set_variable_wins_over_default() {
        temp_env::with_var("TRANSIT_TEST_OPT", Some("10.0.0.1"), || {
            let out =
                expand_env("addr = \"{{ env.TRANSIT_TEST_OPT | default(\"127.0.0.1\") }}\"").unwrap();
            assert_eq!(out, "addr = \"10.0.0.1\"");
        });
    }

    #[test]
    fn comments_are_not_expanded() {
        temp_env::with_var_unset("TRANSIT_TEST_MISSING", || {
            let input = "# token = \"{{ env.TRANSIT_TEST_MISSING }}\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
