//! Variable interpolation for command templates
//!
//! Two independent passes are applied to every command:
//! - `{{.NAME}}` actions are rendered against the static `vars` of the config
//! - `$name` tokens are then replaced with interactive answers
//!
//! Substituted values are never re-scanned by either pass.

use crate::error::{InterpolationError, InterpolationResult};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("action pattern is valid"))
}

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\.([A-Za-z_][A-Za-z0-9_]*)$").expect("field pattern is valid"))
}

/// Render `{{.NAME}}` actions against static variables
///
/// Whitespace inside the braces is allowed (`{{ .NAME }}`), as are trim
/// markers: `{{- .NAME }}` drops the whitespace before the action and
/// `{{ .NAME -}}` the whitespace after it. Names missing from `vars` render
/// as the empty string. Anything other than a plain field reference, or a
/// `{{` with no closing `}}`, is a syntax error.
pub fn expand(template: &str, vars: &HashMap<String, String>) -> InterpolationResult<String> {
    let mut result = String::with_capacity(template.len());
    let mut last = 0;
    let mut trim_next = false;

    for caps in action_regex().captures_iter(template) {
        let Some(action) = caps.get(0) else {
            continue;
        };

        let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let (trim_before, field, trim_after) = split_trim_markers(body);

        let literal = &template[last..action.start()];
        check_literal(literal, last)?;
        result.push_str(trim_literal(literal, trim_next, trim_before));

        let name = field_regex()
            .captures(field.trim())
            .and_then(|c| c.get(1))
            .ok_or_else(|| InterpolationError::InvalidSyntax(action.as_str().to_string()))?;

        if let Some(value) = vars.get(name.as_str()) {
            result.push_str(value);
        }

        last = action.end();
        trim_next = trim_after;
    }

    let tail = &template[last..];
    check_literal(tail, last)?;
    result.push_str(trim_literal(tail, trim_next, false));

    Ok(result)
}

/// `{{- ` and ` -}}` markers; the dash must be separated from the field by
/// whitespace
fn split_trim_markers(body: &str) -> (bool, &str, bool) {
    let mut field = body;

    let trim_before = field.starts_with('-')
        && field[1..].starts_with(|c: char| c.is_ascii_whitespace());
    if trim_before {
        field = &field[1..];
    }

    let trim_after = field.ends_with('-')
        && field[..field.len() - 1].ends_with(|c: char| c.is_ascii_whitespace());
    if trim_after {
        field = &field[..field.len() - 1];
    }

    (trim_before, field, trim_after)
}

fn trim_literal(text: &str, start: bool, end: bool) -> &str {
    let text = if start { text.trim_start() } else { text };
    if end {
        text.trim_end()
    } else {
        text
    }
}

/// Literal text between actions must not open another action
fn check_literal(text: &str, offset: usize) -> InterpolationResult<()> {
    match text.find("{{") {
        Some(pos) => Err(InterpolationError::Unclosed(offset + pos)),
        None => Ok(()),
    }
}

/// Replace `$name` tokens with interactive answers
///
/// This is a literal find/replace, not a template evaluation. The command is
/// scanned once, left to right, so replaced values are never matched again.
/// Longer names are tried first so `$app` cannot eat the front of `$app_dir`.
pub fn expand_interactive(
    command: &str,
    inputs: &HashMap<String, String>,
) -> InterpolationResult<String> {
    if inputs.is_empty() {
        return Ok(command.to_string());
    }

    let mut names: Vec<&str> = inputs.keys().map(String::as_str).collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternation: Vec<String> = names.iter().map(|name| regex::escape(name)).collect();
    let pattern = format!(r"\$({})", alternation.join("|"));
    let re = Regex::new(&pattern).map_err(|e| InterpolationError::InvalidSyntax(e.to_string()))?;

    let replaced = re.replace_all(command, |caps: &regex::Captures| {
        caps.get(1)
            .and_then(|name| inputs.get(name.as_str()))
            .cloned()
            .unwrap_or_default()
    });
    Ok(replaced.into_owned())
}

/// Static expansion followed by interactive expansion
pub fn render(
    template: &str,
    vars: &HashMap<String, String>,
    inputs: &HashMap<String, String>,
) -> InterpolationResult<String> {
    let expanded = expand(template, vars)?;
    expand_interactive(&expanded, inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_expansion() {
        let result = expand("build {{.NAME}}", &vars(&[("NAME", "x")])).unwrap();
        assert_eq!(result, "build x");
    }

    #[test]
    fn test_whitespace_inside_action() {
        let result = expand("cd {{ .DIR }}", &vars(&[("DIR", "out")])).unwrap();
        assert_eq!(result, "cd out");
    }

    #[test]
    fn test_multiple_variables() {
        let vars = vars(&[("A", "1"), ("B", "2")]);
        let result = expand("{{.A}}-{{.B}}-{{.A}}", &vars).unwrap();
        assert_eq!(result, "1-2-1");
    }

    #[test]
    fn test_undeclared_variable_is_empty() {
        let result = expand("echo [{{.MISSING}}]", &HashMap::new()).unwrap();
        assert_eq!(result, "echo []");
    }

    #[test]
    fn test_no_actions() {
        let result = expand("echo ${HOME} $x }}", &HashMap::new()).unwrap();
        assert_eq!(result, "echo ${HOME} $x }}");
    }

    #[test]
    fn test_unclosed_action_is_error() {
        let result = expand("echo {{.NAME", &vars(&[("NAME", "x")]));
        assert!(matches!(result, Err(InterpolationError::Unclosed(5))));
    }

    #[test]
    fn test_non_field_action_is_error() {
        let result = expand("{{if .X}}yes{{end}}", &HashMap::new());
        assert!(matches!(result, Err(InterpolationError::InvalidSyntax(_))));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let vars = vars(&[("A", "{{.B}}"), ("B", "nope")]);
        let result = expand("{{.A}}", &vars).unwrap();
        assert_eq!(result, "{{.B}}");
    }

    #[test]
    fn test_interactive_replacement() {
        let inputs = vars(&[("name", "world")]);
        assert_eq!(expand_interactive("hello $name", &inputs).unwrap(), "hello world");
    }

    #[test]
    fn test_interactive_longest_name_wins() {
        let inputs = vars(&[("app", "web"), ("app_dir", "/srv")]);
        assert_eq!(
            expand_interactive("cp $app $app_dir", &inputs).unwrap(),
            "cp web /srv"
        );
    }

    #[test]
    fn test_interactive_values_not_rescanned() {
        let inputs = vars(&[("a", "$b"), ("b", "x")]);
        assert_eq!(expand_interactive("$a $b", &inputs).unwrap(), "$b x");
    }

    #[test]
    fn test_render_static_before_interactive() {
        let statics = vars(&[("VAR", "static")]);
        let inputs = vars(&[("field", "typed")]);
        let result = render("{{.VAR}} $field", &statics, &inputs).unwrap();
        assert_eq!(result, "static typed");
    }

    #[test]
    fn test_render_static_value_can_carry_interactive_token() {
        // Static values land before the interactive pass, so a `$field`
        // inside a static value is still filled in.
        let statics = vars(&[("CMD", "deploy $env")]);
        let inputs = vars(&[("env", "prod")]);
        let result = render("{{.CMD}}", &statics, &inputs).unwrap();
        assert_eq!(result, "deploy prod");
    }

    #[test]
    fn test_interactive_adjacent_tokens() {
        let inputs = vars(&[("ab", "X"), ("c", "Y")]);
        assert_eq!(expand_interactive("echo $c0$ab", &inputs).unwrap(), "echo Y0X");

        let inputs = vars(&[("a", "1"), ("b", "2")]);
        assert_eq!(expand_interactive("$a$b", &inputs).unwrap(), "12");
    }

    #[test]
    fn test_interactive_many_fields_with_digits() {
        let inputs: HashMap<String, String> = (0..12)
            .map(|i| (format!("f{}", i), format!("v{}", i)))
            .collect();
        let result = expand_interactive("$f1 $f11$f2 $f10", &inputs).unwrap();
        assert_eq!(result, "v1 v11v2 v10");
        assert!(!result.contains('\0'));
    }

    #[test]
    fn test_interactive_unknown_dollar_is_kept() {
        let inputs = vars(&[("name", "x")]);
        assert_eq!(
            expand_interactive("echo $HOME $name $", &inputs).unwrap(),
            "echo $HOME x $"
        );
    }

    #[test]
    fn test_trim_markers() {
        let vars = vars(&[("A", "a"), ("B", "b")]);
        assert_eq!(expand("x  {{- .A }}  y", &vars).unwrap(), "xa  y");
        assert_eq!(expand("x  {{ .A -}}  y", &vars).unwrap(), "x  ay");
        assert_eq!(expand("[ {{- .A -}} ][ {{ .B }} ]", &vars).unwrap(), "[a][ b ]");
    }

    #[test]
    fn test_dash_without_space_is_not_a_trim_marker() {
        let result = expand("{{-.A}}", &HashMap::new());
        assert!(matches!(result, Err(InterpolationError::InvalidSyntax(_))));
    }
}
