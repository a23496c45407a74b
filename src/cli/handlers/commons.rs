// src/cli/handlers/commons.rs

// Shared setup used by the evaluating handlers.

use anyhow::{Context as _, Result};
use std::sync::Arc;

use crate::{
    core::parameters::{Context, EscapeFlags, Parameters},
    models::AppConfig,
    state,
    system::{
        http::HttpFetcher,
        matcher::TextRuleMatcher,
        prompt::TerminalPrompt,
        services::{StreamInfoProvider, UrlFetcher},
        settings::TomlSettings,
        stream::StaticStreamInfo,
    },
};

/// Wires the default collaborators for `config` into an evaluation context.
pub fn build_context(config: &AppConfig, escape: EscapeFlags) -> Result<Context> {
    let fetcher = if config.allow_request {
        let client = HttpFetcher::new().context("Failed to build the HTTP client")?;
        Some(Arc::new(client) as Arc<dyn UrlFetcher>)
    } else {
        None
    };
    let stream_info = config
        .stream
        .as_ref()
        .map(|stream| Arc::new(StaticStreamInfo::from_config(stream)) as Arc<dyn StreamInfoProvider>);

    Ok(Context {
        settings: Some(Arc::new(TomlSettings::from_config(config))),
        fetcher,
        prompt: Some(Arc::new(TerminalPrompt)),
        matcher: Some(Arc::new(TextRuleMatcher)),
        stream_info,
        commands: Some(Arc::clone(state::get_commands())),
        allow_request: config.allow_request,
        escape,
    })
}

/// Builds the parameter set for one evaluation.
pub fn build_parameters(args: &str, named: &[(String, String)], context: Context) -> Parameters {
    let mut params = Parameters::from_args(args).with_context(context);
    for (name, value) in named {
        params.put(name, value);
    }
    params
}

/// Prints an evaluation result, or fails if the template aborted.
pub fn print_result(result: Option<String>) -> Result<()> {
    match result {
        Some(output) => {
            println!("{}", output);
            Ok(())
        }
        None => Err(anyhow::anyhow!(
            "No output: a required value was missing or empty."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_parameters() {
        let named = vec![("User".to_string(), "alice".to_string())];
        let params = build_parameters("a b", &named, Context::default());
        assert_eq!(params.get("user"), Some("alice"));
        assert_eq!(params.args().len(), 2);
    }

    #[test]
    fn test_context_respects_request_capability() {
        let config = AppConfig::default();
        let context = build_context(&config, EscapeFlags::default()).unwrap();
        assert!(context.fetcher.is_none());
        assert!(!context.allow_request);
        assert!(context.settings.is_some());
        assert!(context.stream_info.is_none());
    }

    #[test]
    fn test_aborted_result_is_an_error() {
        assert!(print_result(None).is_err());
        assert!(print_result(Some("x".to_string())).is_ok());
    }
}
