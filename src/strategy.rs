//! Dispatch strategies: multi-key fan-out policies with result aggregation.
//!
//! Matched keys are always visited in registration order; what differs is
//! when each emission is awaited and what flows between stages:
//!
//! - **parallel** — every emission is initiated before any is awaited;
//!   handlers observe no ordering relative to each other, but the result
//!   sequence preserves match order, not completion order.
//! - **waterfall** — a running result, seeded with the first supplied
//!   argument, is threaded through the *first* listener of each key in turn.
//! - **series** — each key's full emission is awaited before the next key is
//!   invoked; every key receives the original arguments.
//!
//! There is no cancellation and no timeout: a hanging handler stalls the
//! dispatch call, and callers that need a bound must impose it upstream.

use std::fmt;
use std::str::FromStr;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::batch::matched_keys;
use crate::channel::{default_channel, Channel};
use crate::emitter::{collect_results, HandlerError, HandlerOutcome};
use crate::registry::MetaField;

/// Fan-out policy for [`emit_group_with_strategy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStrategy {
    Parallel,
    Waterfall,
    Series,
}

impl fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Parallel => "parallel",
            Self::Waterfall => "waterfall",
            Self::Series => "series",
        };
        f.write_str(label)
    }
}

/// Error for parsing an unrecognized strategy name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown dispatch strategy: {0}")]
pub struct UnknownStrategy(String);

impl FromStr for DispatchStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parallel" => Ok(Self::Parallel),
            "waterfall" => Ok(Self::Waterfall),
            "series" => Ok(Self::Series),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Emit on every key whose group matches `pattern` under `strategy`.
///
/// For `parallel` and `series`, each element of the output is one matched
/// key's array of listener results; for `waterfall`, each element is the
/// threaded value after that stage.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wardbus::{
///     emit_group_with_strategy, Channel, DispatchStrategy, EventMeta, Listener,
///     ProtectedRegistry, SubscribeOptions,
/// };
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let registry = Arc::new(ProtectedRegistry::new());
/// let channel = Channel::with_registry(Arc::clone(&registry));
///
/// let first = registry.register("stage.one", EventMeta::new().with_group("pipeline"));
/// let second = registry.register("stage.two", EventMeta::new().with_group("pipeline"));
///
/// let suffix = |tag: &'static str| {
///     Listener::new(move |args| json!(format!("{}{tag}", args[0].as_str().unwrap_or(""))))
/// };
/// channel.on(first, suffix("-a"), SubscribeOptions::default());
/// channel.on(second, suffix("-b"), SubscribeOptions::default());
///
/// let results = emit_group_with_strategy(
///     "pipeline",
///     DispatchStrategy::Waterfall,
///     &[json!("seed")],
///     Some(&channel),
/// )
/// .await
/// .unwrap();
///
/// assert_eq!(results, vec![json!("seed-a"), json!("seed-a-b")]);
/// # });
/// ```
pub async fn emit_group_with_strategy(
    pattern: &str,
    strategy: DispatchStrategy,
    args: &[Value],
    channel: Option<&Channel>,
) -> Result<Vec<Value>, HandlerError> {
    dispatch(MetaField::Group, pattern, strategy, args, channel).await
}

/// Namespace variant of [`emit_group_with_strategy`].
pub async fn emit_namespace_with_strategy(
    pattern: &str,
    strategy: DispatchStrategy,
    args: &[Value],
    channel: Option<&Channel>,
) -> Result<Vec<Value>, HandlerError> {
    dispatch(MetaField::Namespace, pattern, strategy, args, channel).await
}

async fn dispatch(
    field: MetaField,
    pattern: &str,
    strategy: DispatchStrategy,
    args: &[Value],
    channel: Option<&Channel>,
) -> Result<Vec<Value>, HandlerError> {
    let channel = channel.unwrap_or_else(|| default_channel());
    let keys = matched_keys(field, pattern, channel);
    tracing::debug!(pattern, %strategy, matched = keys.len(), "strategy dispatch");

    match strategy {
        DispatchStrategy::Parallel => {
            // Every emission is initiated here, before any await.
            let emissions: Vec<Vec<HandlerOutcome>> =
                keys.iter().map(|&key| channel.emit(key, args)).collect();
            let aggregates = try_join_all(emissions.into_iter().map(collect_results)).await?;
            Ok(aggregates.into_iter().map(Value::Array).collect())
        }
        DispatchStrategy::Series => {
            let mut results = Vec::with_capacity(keys.len());
            for key in keys {
                let aggregate = channel.emit_async(key, args).await?;
                results.push(Value::Array(aggregate));
            }
            Ok(results)
        }
        DispatchStrategy::Waterfall => {
            let mut threaded = args.first().cloned().unwrap_or(Value::Null);
            let mut results = Vec::new();
            for key in keys {
                // Only the first registered listener participates; a key with
                // no listeners contributes nothing.
                let listeners = channel.listeners(key);
                let Some(first) = listeners.first() else {
                    continue;
                };
                let mut stage_args = args.to_vec();
                if stage_args.is_empty() {
                    stage_args.push(threaded.clone());
                } else {
                    stage_args[0] = threaded.clone();
                }
                threaded = first.listener.call(&stage_args).resolve().await?;
                results.push(threaded.clone());
            }
            Ok(results)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_round_trip() {
        for strategy in [
            DispatchStrategy::Parallel,
            DispatchStrategy::Waterfall,
            DispatchStrategy::Series,
        ] {
            assert_eq!(strategy.to_string().parse::<DispatchStrategy>(), Ok(strategy));
        }
    }

    #[test]
    fn unknown_strategy_name_is_rejected() {
        let err = "pipeline".parse::<DispatchStrategy>().unwrap_err();
        assert_eq!(err, UnknownStrategy("pipeline".to_string()));
    }
}
