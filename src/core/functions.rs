// src/core/functions.rs

//! Evaluation of the built-in `$name(...)` functions.

use crate::{
    constants::{RANDNUM_FALLBACK_BOUND, REQUEST_LABEL},
    core::{
        calc, commons,
        datetime::format_datetime,
        items::{Function, Items, check_req},
        json_path::value_to_text,
        parameters::Parameters,
        rounding::{RoundingMode, round_number},
    },
    system::services::SettingValue,
};
use lazy_static::lazy_static;
use rand::Rng;
use regex::{Captures, NoExpand, Regex};
use serde_json::Value;

impl Function {
    /// Evaluates the function. `required` is the `$$` flag of the call.
    pub fn replace(&self, required: bool, params: &Parameters) -> Option<String> {
        match self {
            Function::If {
                condition,
                then,
                otherwise,
            } => {
                let value = condition.replace(params).unwrap_or_default();
                let output = if !value.is_empty() {
                    then.replace(params)
                } else {
                    eval_or(otherwise.as_ref(), params, "")
                };
                check_req(output, required)
            }
            Function::IfEq {
                condition,
                compare,
                then,
                otherwise,
            } => {
                let value = condition.replace(params)?;
                let compare = compare.replace(params)?;
                let output = if value == compare {
                    then.replace(params)
                } else {
                    eval_or(otherwise.as_ref(), params, "")
                };
                check_req(output, required)
            }
            Function::Switch {
                value,
                cases,
                default,
            } => {
                let value = check_req(value.replace(params), required)?;
                for (key, output) in cases {
                    if key.replace(params)? == value {
                        return output.replace(params);
                    }
                }
                eval_or(default.as_ref(), params, "")
            }
            Function::Join { item, separator } => {
                let value = check_req(item.replace(params), required)?;
                if value.is_empty() {
                    return Some(value);
                }
                let separator = separator.replace(params)?;
                Some(value.replace(' ', &separator))
            }
            Function::Lower(item) => {
                check_req(item.replace(params), required).map(|v| v.to_lowercase())
            }
            Function::Upper(item) => {
                check_req(item.replace(params), required).map(|v| v.to_uppercase())
            }
            Function::Trim(item) => {
                check_req(item.replace(params), required).map(|v| v.trim().to_string())
            }
            Function::UrlEncode(item) => check_req(item.replace(params), required)
                .map(|v| url::form_urlencoded::byte_serialize(v.as_bytes()).collect()),
            Function::Calc(item) => {
                let expression = check_req(item.replace(params), required)?;
                if expression.trim().is_empty() {
                    return Some(String::new());
                }
                Some(calc::calculate(&expression).unwrap_or_else(|e| e.to_string()))
            }
            Function::Is(item) => {
                let rule = check_req(item.replace(params), required)?;
                let matched = params
                    .context()
                    .matcher
                    .as_ref()
                    .is_some_and(|matcher| matcher.matches(&rule, params));
                let output = if matched { "true" } else { "" };
                check_req(Some(output.to_string()), required)
            }
            Function::Rand(choices) => {
                if choices.is_empty() {
                    return check_req(Some(String::new()), required);
                }
                let index = rand::rng().random_range(0..choices.len());
                check_req(choices.get(index)?.replace(params), required)
            }
            Function::RandNum { from, to } => {
                let from = check_req(from.replace(params), required)?;
                let bounds = match to {
                    None => (
                        Some(0),
                        Some(from.trim().parse::<i64>().unwrap_or(RANDNUM_FALLBACK_BOUND)),
                    ),
                    Some(to) => (
                        from.trim().parse::<i64>().ok(),
                        to.replace(params)?.trim().parse::<i64>().ok(),
                    ),
                };
                match bounds {
                    (Some(low), Some(high)) if low <= high => {
                        Some(rand::rng().random_range(low..=high).to_string())
                    }
                    _ => Some("0".to_string()),
                }
            }
            Function::DateTime {
                format,
                zone,
                locale,
                timestamp,
            } => {
                let format = eval_or(format.as_ref(), params, "")?;
                let zone = eval_or(zone.as_ref(), params, "")?;
                let locale = eval_or(locale.as_ref(), params, "")?;
                let timestamp = eval_or(timestamp.as_ref(), params, "")?;
                Some(format_datetime(&format, &zone, &locale, &timestamp))
            }
            Function::Sort {
                item,
                separator,
                kind,
            } => {
                let value = check_req(item.replace(params), required)?;
                let separator = non_empty_or(eval_or(separator.as_ref(), params, "")?, " ");
                let kind = non_empty_or(eval_or(kind.as_ref(), params, "")?, "abc");
                Some(sort(&value, &separator, &kind))
            }
            Function::Replace {
                item,
                search,
                replacement,
                kind,
            } => {
                let value = check_req(item.replace(params), required)?;
                let search = search.replace(params)?;
                let kind = eval_or(kind.as_ref(), params, "")?;
                replace(&value, &search, replacement, kind.trim(), params)
            }
            Function::Quote { item, quote } => {
                let value = check_req(item.replace(params), required)?;
                let quote = non_empty_or(eval_or(quote.as_ref(), params, "")?, "\"");
                Some(commons::wrap_value(&value, &quote))
            }
            Function::Round {
                item,
                decimals,
                mode,
                min_decimals,
            } => {
                let value = check_req(item.replace(params), required)?;
                let decimals = parse_count(&eval_or(decimals.as_ref(), params, "")?);
                let mode = RoundingMode::from_name(&eval_or(mode.as_ref(), params, "")?);
                let min_decimals = parse_count(&eval_or(min_decimals.as_ref(), params, "")?);
                Some(round_number(&value, decimals, mode, min_decimals).unwrap_or(value))
            }
            Function::Get { setting, key } => {
                let name = setting.replace(params)?;
                let key = match key {
                    Some(key) => Some(key.replace(params)?),
                    None => None,
                };
                let value = params
                    .context()
                    .settings
                    .as_ref()
                    .and_then(|settings| settings.lookup(name.trim()))
                    .map(|value| setting_to_text(&value, key.as_deref()))
                    .unwrap_or_default();
                check_req(Some(value), required)
            }
            Function::Json { input, output } => {
                let input = check_req(input.replace(params), required)?;
                match serde_json::from_str::<Value>(&input) {
                    Ok(document) => output.replace(&params.derive_with_json(document)),
                    Err(e) => {
                        log::warn!("$json(): could not parse input as JSON: {}", e);
                        None
                    }
                }
            }
            Function::JsonPath { path, default } => {
                let text = params
                    .json()
                    .and_then(|document| path.resolve(document))
                    .and_then(|value| value_to_text(&value))
                    .unwrap_or_default();
                let output = match default {
                    Some(default) if text.is_empty() => default.replace(params)?,
                    _ => text,
                };
                check_req(Some(output), required)
            }
            Function::Request { url, options } => {
                let url = check_req(url.replace(params), required)?;
                let mut options_text = Vec::with_capacity(options.len());
                for option in options {
                    options_text.push(option.replace(params)?);
                }
                request(&url, &options_text, required, params)
            }
            Function::Input {
                kind,
                message,
                initial,
            } => {
                let kind = eval_or(kind.as_ref(), params, "")?;
                let message = eval_or(message.as_ref(), params, "")?;
                let initial = eval_or(initial.as_ref(), params, "")?;
                let Some(prompt) = params.context().prompt.as_ref() else {
                    log::debug!("$input(): no prompt available, aborting");
                    return None;
                };
                check_req(prompt.prompt(&kind, &message, &initial), required)
            }
        }
    }
}

// --- HELPERS ---

/// Evaluates an optional argument, using `default` when it was not given.
fn eval_or(items: Option<&Items>, params: &Parameters, default: &str) -> Option<String> {
    match items {
        Some(items) => items.replace(params),
        None => Some(default.to_string()),
    }
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn parse_count(value: &str) -> usize {
    value.trim().parse().unwrap_or(0)
}

fn sort(value: &str, separator: &str, kind: &str) -> String {
    let mut parts: Vec<&str> = value.split(separator).collect();
    match kind {
        "abc" => parts.sort_by_cached_key(|part| part.to_lowercase()),
        "Abc" => parts.sort(),
        _ => {}
    }
    parts.join(separator)
}

fn setting_to_text(value: &SettingValue, key: Option<&str>) -> String {
    match value {
        SettingValue::String(s) => s.clone(),
        SettingValue::Boolean(b) => b.to_string(),
        SettingValue::Long(n) => n.to_string(),
        SettingValue::Map(map) => match key {
            Some(key) => map.get(key).cloned().unwrap_or_default(),
            None => {
                let entries: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("{{{}}}", entries.join(", "))
            }
        },
        SettingValue::List(list) => format!("[{}]", list.join(", ")),
    }
}

// --- REPLACE ---

lazy_static! {
    static ref GROUP_REF: Regex = Regex::new(r"\$(\$|[0-9]+)").unwrap_or_else(|_| unreachable!());
}

fn replace(
    value: &str,
    search: &str,
    replacement: &Items,
    kind: &str,
    params: &Parameters,
) -> Option<String> {
    match kind {
        "regFunc" => return replace_with_callback(value, search, replacement, false, params),
        "regCustom" => return replace_with_callback(value, search, replacement, true, params),
        _ => {}
    }
    let replacement = replacement.replace(params)?;
    let output = match kind {
        "cs" => value.replace(search, &replacement),
        "reg" => regex_replace(value, search, &replacement, true, false),
        "regFirst" => regex_replace(value, search, &replacement, false, false),
        "regRef" => regex_replace(value, search, &replacement, true, true),
        "regFirstRef" => regex_replace(value, search, &replacement, false, true),
        _ => {
            let pattern = format!("(?iu){}", regex::escape(search));
            regex_replace(value, &pattern, &replacement, true, false)
        }
    };
    Some(output)
}

fn regex_replace(value: &str, pattern: &str, replacement: &str, all: bool, expand: bool) -> String {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => return format!("Error: {}", commons::regex_error_summary(&e)),
    };
    let limit = if all { 0 } else { 1 };
    if expand {
        let replacement = numbered_group_refs(replacement);
        regex.replacen(value, limit, replacement.as_str()).into_owned()
    } else {
        regex.replacen(value, limit, NoExpand(replacement)).into_owned()
    }
}

/// Braces bare `$N` references so only the digits name the group: `$2x` is
/// group 2 followed by `x`. `$$` stays an escaped dollar.
fn numbered_group_refs(replacement: &str) -> String {
    GROUP_REF
        .replace_all(replacement, |caps: &Captures<'_>| match caps.get(1).map(|m| m.as_str()) {
            Some("$") | None => "$$".to_string(),
            Some(digits) => format!("${{{}}}", digits),
        })
        .into_owned()
}

/// Replaces every match with the output of `replacement` (or of the custom command
/// it names) evaluated against a per-match derived parameter set.
fn replace_with_callback(
    value: &str,
    search: &str,
    replacement: &Items,
    custom: bool,
    params: &Parameters,
) -> Option<String> {
    let regex = match Regex::new(search) {
        Ok(regex) => regex,
        Err(e) => return Some(format!("Error: {}", commons::regex_error_summary(&e))),
    };

    let command = if custom {
        let name = replacement.replace(params)?;
        let found = params
            .context()
            .commands
            .as_ref()
            .and_then(|commands| commands.get(name.trim()));
        match found {
            Some(command) => Some(command),
            None => return Some(format!("Error: Unknown custom command '{}'", name.trim())),
        }
    } else {
        None
    };

    let mut output = String::with_capacity(value.len());
    let mut last = 0;
    for caps in regex.captures_iter(value) {
        let whole = caps.get(0)?;
        output.push_str(value.get(last..whole.start())?);
        let groups: Vec<String> = caps
            .iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect();
        let derived = params.derive_for_match(whole.as_str(), &groups);
        let result = match &command {
            Some(command) => command.replace(&derived)?,
            None => replacement.replace(&derived)?,
        };
        output.push_str(&result);
        last = whole.end();
    }
    output.push_str(value.get(last..)?);
    Some(output)
}

// --- REQUEST ---

fn request(url: &str, options: &[String], required: bool, params: &Parameters) -> Option<String> {
    let show_error = options.iter().any(|o| o.trim() == "error");
    let trim = options.iter().any(|o| o.trim() == "trim");
    let fail = |message: &str| {
        if show_error {
            Some(format!("Error: {}", message))
        } else {
            check_req(Some(String::new()), required)
        }
    };

    let context = params.context();
    let fetcher = match context.fetcher.as_ref() {
        Some(fetcher) if context.allow_request => fetcher,
        _ => return fail("Request not allowed"),
    };

    let url = url.trim();
    match url::Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
        _ => return fail(&format!("Invalid URL '{}'", url)),
    }

    log::trace!("$request(): fetching '{}'", url);
    let result = fetcher.get(url, REQUEST_LABEL);
    match (result.body, result.error) {
        (Some(body), None) => {
            let body = if trim { body.trim().to_string() } else { body };
            check_req(Some(body), required)
        }
        (_, Some(error)) => fail(&error),
        (None, None) => fail(&format!("Request failed ({})", result.status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{command::CustomCommands, parameters::Context, parser::parse},
        system::{
            services::{FetchResult, Prompt, RuleMatcher, SettingsProvider, UrlFetcher},
            settings::TomlSettings,
        },
    };
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn eval(template: &str, params: &Parameters) -> Option<String> {
        parse(template).unwrap().replace(params)
    }

    fn run(template: &str) -> Option<String> {
        eval(template, &Parameters::new())
    }

    #[derive(Debug, Default)]
    struct CountingPrompt {
        calls: AtomicUsize,
    }

    impl Prompt for CountingPrompt {
        fn prompt(&self, _kind: &str, message: &str, _initial: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (message != "cancel").then(|| format!("typed {}", message))
        }
    }

    #[derive(Debug)]
    struct FixedFetcher;

    impl UrlFetcher for FixedFetcher {
        fn get(&self, url: &str, _label: &str) -> FetchResult {
            if url.contains("fail") {
                return FetchResult {
                    status: 500,
                    error: Some("Request failed (500)".to_string()),
                    ..FetchResult::default()
                };
            }
            FetchResult {
                body: Some("  body  ".to_string()),
                status: 200,
                error: None,
            }
        }
    }

    #[derive(Debug)]
    struct ContainsMatcher;

    impl RuleMatcher for ContainsMatcher {
        fn matches(&self, rule: &str, params: &Parameters) -> bool {
            params.get("msg").is_some_and(|msg| msg.contains(rule))
        }
    }

    #[test]
    fn test_abort_is_never_partial() {
        assert_eq!(run("a$$missing b"), None);
        assert_eq!(run("a$missing b").as_deref(), Some("a b"));
    }

    #[test]
    fn test_required_law() {
        let params = Parameters::new().with("name", "");
        assert_eq!(eval("$name", &params).as_deref(), Some(""));
        assert_eq!(eval("$$name", &params), None);
        assert_eq!(eval("$upper($name)", &params).as_deref(), Some(""));
        assert_eq!(eval("$$upper($name)", &params), None);
    }

    #[test]
    fn test_positional_ranges() {
        let params = Parameters::from_args("a b c");
        assert_eq!(eval("$2-", &params).as_deref(), Some("b c"));
        assert_eq!(eval("$1", &params).as_deref(), Some("a"));
        assert_eq!(eval("$(3)", &params).as_deref(), Some("c"));
        assert_eq!(eval("$$4", &params), None);
        assert_eq!(eval("[$4]", &params).as_deref(), Some("[]"));
    }

    #[test]
    fn test_if_truth_table() {
        let set = Parameters::new().with("x", "1");
        let empty = Parameters::new().with("x", "");
        let absent = Parameters::new();
        assert_eq!(eval("$if(x,yes,no)", &set).as_deref(), Some("yes"));
        assert_eq!(eval("$if(x,yes,no)", &empty).as_deref(), Some("no"));
        assert_eq!(eval("$if(x,yes,no)", &absent).as_deref(), Some("no"));
        assert_eq!(eval("$if(x,yes)", &absent).as_deref(), Some(""));
        assert_eq!(eval("$$if(x,yes)", &absent), None);
        assert_eq!(eval("$if($x,yes $x,no)", &set).as_deref(), Some("yes 1"));
    }

    #[test]
    fn test_ifeq() {
        let params = Parameters::new().with("x", "a");
        assert_eq!(eval("$ifeq(x,a,same,diff)", &params).as_deref(), Some("same"));
        assert_eq!(eval("$ifeq(x,b,same,diff)", &params).as_deref(), Some("diff"));
        assert_eq!(eval("$ifeq(x,b,same)", &params).as_deref(), Some(""));
        assert_eq!(eval("$$ifeq(x,b,same)", &params), None);
        assert_eq!(eval("$ifeq(x,$$missing,same,diff)", &params), None);
    }

    #[test]
    fn test_switch_first_match_and_default() {
        let b = Parameters::new().with("v", "b");
        let z = Parameters::new().with("v", "z");
        assert_eq!(eval("$switch(v,a,1,b,2,def)", &b).as_deref(), Some("2"));
        assert_eq!(eval("$switch(v,a,1,b,2,def)", &z).as_deref(), Some("def"));
        assert_eq!(eval("$switch(v,a:1,b:2)", &z).as_deref(), Some(""));
        assert_eq!(eval("$switch(v,b:first,$v:second)", &b).as_deref(), Some("first"));
        assert_eq!(eval("$$switch(v,a:1)", &Parameters::new()), None);
    }

    #[test]
    fn test_string_functions() {
        let params = Parameters::new().with("x", "a b  c").with("s", "  pad ");
        assert_eq!(eval("$join(x,-)", &params).as_deref(), Some("a-b--c"));
        assert_eq!(eval("$join(x,, )", &params).as_deref(), Some("a, b, , c"));
        assert_eq!(run("$lower(ÄBC)").as_deref(), Some("äbc"));
        assert_eq!(run("$upper(istanbul)").as_deref(), Some("ISTANBUL"));
        assert_eq!(eval("[$trim($s)]", &params).as_deref(), Some("[pad]"));
        assert_eq!(run("$urlencode(a b&c=d)").as_deref(), Some("a+b%26c%3Dd"));
        assert_eq!(run("$quote(a\"b)").as_deref(), Some("\"a\"\"b\""));
        assert_eq!(run("$quote(x,')").as_deref(), Some("'x'"));
    }

    #[test]
    fn test_sort() {
        assert_eq!(run("$sort(c b a)").as_deref(), Some("a b c"));
        assert_eq!(run("$sort($sort(c b a))").as_deref(), Some("a b c"));
        assert_eq!(run("$sort(b A a)").as_deref(), Some("A a b"));
        assert_eq!(run("$sort(b a B, ,Abc)").as_deref(), Some("B a b"));
        assert_eq!(run("$sort(c;a;b,;)").as_deref(), Some("a;b;c"));
        assert_eq!(run("$sort(c b a, ,none)").as_deref(), Some("c b a"));
    }

    #[test]
    fn test_round() {
        assert_eq!(run("$round(2.345,2)").as_deref(), Some("2.35"));
        assert_eq!(run("$round(2,0,half-up,2)").as_deref(), Some("2.00"));
        assert_eq!(run("$round(2.7)").as_deref(), Some("3"));
        assert_eq!(run("$round(-1.25,1,floor)").as_deref(), Some("-1.3"));
        assert_eq!(run("$round(n/a,2)").as_deref(), Some("n/a"));
    }

    #[test]
    fn test_replace_modes() {
        assert_eq!(run("$replace(aAbB,a,X,cs)").as_deref(), Some("XAbB"));
        assert_eq!(run("$replace(aAbB,a,X)").as_deref(), Some("XXbB"));
        assert_eq!(run("$replace(a.c,.,!)").as_deref(), Some("a!c"));
        assert_eq!(run("$replace(aaa,a,b,regFirst)").as_deref(), Some("baa"));
        assert_eq!(run(r"$replace(aaa,a,\$0,reg)").as_deref(), Some("$0$0$0"));
        assert_eq!(run(r"$replace(ab,(a)(b),\$2\$1,regRef)").as_deref(), Some("ba"));
        assert_eq!(run(r"$replace(abab,(a)(b),\$2\$1,regFirstRef)").as_deref(), Some("baab"));
        assert_eq!(run(r"$replace(ab,(a)(b),\$2x\$1,regRef)").as_deref(), Some("bxa"));
        assert_eq!(run(r"$replace(cat,(cat),\$1s cost \$\$5,regRef)").as_deref(), Some("cats cost $5"));
        let err = run("$replace(abc,(,x,reg)").unwrap();
        assert!(err.starts_with("Error: "));
    }

    #[test]
    fn test_replace_with_callback() {
        assert_eq!(
            run(r"$replace(a1b22,\\d+,[$1],regFunc)").as_deref(),
            Some("a[1]b[22]")
        );
        assert_eq!(
            run(r"$replace(k=v x=y,(\\w)=(\\w),$g2=$g1,regFunc)").as_deref(),
            Some("v=k y=x")
        );
        assert_eq!(run(r"$replace(ab,(x)?b,[$g1],regFunc)").as_deref(), Some("a[]"));
    }

    #[test]
    fn test_replace_with_custom_command() {
        let commands = Arc::new(CustomCommands::new());
        commands.load(["wrap <$upper($1)>"]);
        let context = Context {
            commands: Some(commands),
            ..Context::default()
        };
        let params = Parameters::new().with_context(context);
        assert_eq!(
            eval(r"$replace(a b,\\w,wrap,regCustom)", &params).as_deref(),
            Some("<A> <B>")
        );
        assert_eq!(
            eval(r"$replace(a b,\\w,nope,regCustom)", &params).as_deref(),
            Some("Error: Unknown custom command 'nope'")
        );
    }

    #[test]
    fn test_calc() {
        assert_eq!(run("$calc(1+2*3)").as_deref(), Some("7"));
        assert_eq!(run("$calc(1/4)").as_deref(), Some("0.25"));
        assert_eq!(run("$calc()").as_deref(), Some(""));
        let params = Parameters::from_args("4");
        assert_eq!(eval("$calc($1^2)", &params).as_deref(), Some("16"));
        assert!(!run("$calc(1+)").unwrap().is_empty());
    }

    #[test]
    fn test_rand_evaluates_one_branch() {
        let prompt = Arc::new(CountingPrompt::default());
        let context = Context {
            prompt: Some(prompt.clone() as Arc<dyn Prompt>),
            ..Context::default()
        };
        let params = Parameters::new().with_context(context);
        let tree = parse("$rand($input(,a),$input(,b),$input(,c))").unwrap();
        for _ in 0..50 {
            let output = tree.replace(&params).unwrap();
            assert!(["typed a", "typed b", "typed c"].contains(&output.as_str()));
        }
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_randnum() {
        for _ in 0..20 {
            let n: i64 = run("$randnum(5)").unwrap().parse().unwrap();
            assert!((0..=5).contains(&n));
            let n: i64 = run("$randnum(-3,3)").unwrap().parse().unwrap();
            assert!((-3..=3).contains(&n));
        }
        assert_eq!(run("$randnum(3,3)").as_deref(), Some("3"));
        assert_eq!(run("$randnum(5,1)").as_deref(), Some("0"));
        assert_eq!(run("$randnum(a,b)").as_deref(), Some("0"));
        let n: i64 = run("$randnum(abc)").unwrap().parse().unwrap();
        assert!((0..=RANDNUM_FALLBACK_BOUND).contains(&n));
    }

    #[test]
    fn test_datetime() {
        assert_eq!(
            run("$datetime(date,UTC,,1609556645000)").as_deref(),
            Some("2021-01-02")
        );
        assert_eq!(
            run("$datetime(,UTC,,1609556645000)").as_deref(),
            Some("2021-01-02 03:04:05")
        );
        assert_eq!(run("$datetime(date,,,x)").as_deref(), Some("Invalid timestamp"));
        assert!(!run("$datetime()").unwrap().is_empty());
    }

    #[test]
    fn test_get() {
        let table: toml::Table = toml::from_str(
            "name = \"bot\"\ntags = [\"a\", \"b\"]\n[colors]\nmod = \"green\"\nvip = \"pink\"\n",
        )
        .unwrap();
        let settings = TomlSettings::new(table, Vec::new());
        let context = Context {
            settings: Some(Arc::new(settings) as Arc<dyn SettingsProvider>),
            ..Context::default()
        };
        let params = Parameters::new().with_context(context);
        assert_eq!(eval("$get(name)", &params).as_deref(), Some("bot"));
        assert_eq!(eval("$get(colors,vip)", &params).as_deref(), Some("pink"));
        assert_eq!(
            eval("$get(colors)", &params).as_deref(),
            Some("{mod=green, vip=pink}")
        );
        assert_eq!(eval("$get(tags)", &params).as_deref(), Some("[a, b]"));
        assert_eq!(eval("$get(missing)", &params).as_deref(), Some(""));
        assert_eq!(eval("$$get(missing)", &params), None);
        assert_eq!(run("$get(name)").as_deref(), Some(""));
    }

    #[test]
    fn test_json() {
        let params = Parameters::new()
            .with("data", r#"{"name":"x","items":[1,2],"empty":""}"#)
            .with("bad", "{nope");
        assert_eq!(
            eval("$json($data,$j(name) has $j(items[size]))", &params).as_deref(),
            Some("x has 2")
        );
        assert_eq!(
            eval("$json($data,$j(missing,none)/$j(empty,blank))", &params).as_deref(),
            Some("none/blank")
        );
        assert_eq!(eval("$json($data,$$j(missing))", &params), None);
        assert_eq!(eval("$json($bad,$j(name))", &params), None);
        assert_eq!(run("[$j(name)]").as_deref(), Some("[]"));
    }

    #[test]
    fn test_request() {
        let allowed = Parameters::new().with_context(Context {
            fetcher: Some(Arc::new(FixedFetcher) as Arc<dyn UrlFetcher>),
            allow_request: true,
            ..Context::default()
        });
        let denied = Parameters::new().with_context(Context {
            fetcher: Some(Arc::new(FixedFetcher) as Arc<dyn UrlFetcher>),
            ..Context::default()
        });
        assert_eq!(
            eval("$request(http://example.com/a)", &allowed).as_deref(),
            Some("  body  ")
        );
        assert_eq!(
            eval("$request(https://example.com/a,trim)", &allowed).as_deref(),
            Some("body")
        );
        assert_eq!(eval("$request(http://example.com/a)", &denied).as_deref(), Some(""));
        assert_eq!(eval("$$request(http://example.com/a)", &denied), None);
        assert_eq!(
            eval("$request(http://example.com/a,error)", &denied).as_deref(),
            Some("Error: Request not allowed")
        );
        assert_eq!(
            eval("$request(ftp://example.com,error)", &allowed).as_deref(),
            Some("Error: Invalid URL 'ftp://example.com'")
        );
        assert_eq!(
            eval("$request(http://example.com/fail,error)", &allowed).as_deref(),
            Some("Error: Request failed (500)")
        );
    }

    #[test]
    fn test_input() {
        assert_eq!(run("$input()"), None);
        let params = Parameters::new().with_context(Context {
            prompt: Some(Arc::new(CountingPrompt::default()) as Arc<dyn Prompt>),
            ..Context::default()
        });
        assert_eq!(eval("$input(text,name)", &params).as_deref(), Some("typed name"));
        assert_eq!(eval("$input(text,cancel)", &params), None);
    }

    #[test]
    fn test_is() {
        let params = Parameters::new().with("msg", "hello world").with_context(Context {
            matcher: Some(Arc::new(ContainsMatcher) as Arc<dyn RuleMatcher>),
            ..Context::default()
        });
        assert_eq!(eval("$is(world)", &params).as_deref(), Some("true"));
        assert_eq!(eval("$is(moon)", &params).as_deref(), Some(""));
        assert_eq!(eval("$$is(moon)", &params), None);
        assert_eq!(run("$is(anything)").as_deref(), Some(""));
    }

    #[test]
    fn test_top_level_escaping() {
        let params = Parameters::new().with("v", "a|b>c").with_escape(true, true);
        assert_eq!(eval("x|$v", &params).as_deref(), Some("x|a||b>>c"));
        assert_eq!(eval("$upper($v)", &params).as_deref(), Some("A||B>>C"));
    }

    #[test]
    fn test_required_identifiers_follow_required_nodes() {
        let tree = parse("$$upper($name) $if(other,x) $$opt").unwrap();
        let required = tree.required_identifiers();
        assert!(required.contains("name"));
        assert!(required.contains("opt"));
        assert!(!required.contains("other"));
        assert_eq!(tree.identifiers_with_prefix("o").len(), 2);
    }

    #[test]
    fn test_if_with_else_does_not_require_condition() {
        let tree = parse("$$if(x,yes,no)").unwrap();
        assert!(!tree.required_identifiers().contains("x"));
        assert!(tree.identifiers_with_prefix("").contains("x"));
        assert_eq!(tree.replace(&Parameters::new()).as_deref(), Some("no"));

        let tree = parse("$$if(x,yes)").unwrap();
        assert!(tree.required_identifiers().contains("x"));
        assert_eq!(tree.replace(&Parameters::new()), None);
    }
}
