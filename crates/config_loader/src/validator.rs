//! 配置校验模块
//!
//! 校验规则：
//! - delay_ms > 0
//! - 至少配置一个 sink
//! - sink 名称非空且唯一
//! - http sink 必须提供合法的 url
//! - timeout_ms 若存在必须是正整数

use std::collections::HashSet;

use contracts::{ContractError, RelayBlueprint, SinkConfig, SinkType};

/// 校验 RelayBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_dispatcher(blueprint)?;
    validate_sink_names(blueprint)?;
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        validate_sink_params(idx, sink)?;
    }
    Ok(())
}

/// 校验调度器设置
fn validate_dispatcher(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    if blueprint.dispatcher.delay_ms == 0 {
        return Err(ContractError::config_validation(
            "dispatcher.delay_ms",
            "delay_ms must be > 0",
        ));
    }
    Ok(())
}

/// 校验 sink 名称 (非空 + 唯一)
fn validate_sink_names(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    if blueprint.sinks.is_empty() {
        return Err(ContractError::config_validation(
            "sinks",
            "at least one sink must be configured",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

/// 校验类型特定参数
fn validate_sink_params(idx: usize, sink: &SinkConfig) -> Result<(), ContractError> {
    if sink.sink_type == SinkType::Http {
        let url = sink.params.get("url").ok_or_else(|| {
            ContractError::config_validation(
                format!("sinks[{}].params.url", idx),
                "http sink requires a 'url' parameter",
            )
        })?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.url", idx),
                format!("url must start with http:// or https://, got '{url}'"),
            ));
        }
    }

    if let Some(timeout) = sink.params.get("timeout_ms") {
        match timeout.parse::<u64>() {
            Ok(ms) if ms > 0 => {}
            _ => {
                return Err(ContractError::config_validation(
                    format!("sinks[{}].params.timeout_ms", idx),
                    format!("timeout_ms must be a positive integer, got '{timeout}'"),
                ))
            }
        }
    }
    Ok(())
}
