pub mod ops;
pub mod trace;

use std::path::Path;
use std::process;

use morphic::config::EngineConfig;
use morphic::diagnostic::render_diagnostics;
use morphic::ops::Operator;
use morphic::value::Value;
use num_bigint::BigInt;

/// Load `--config`, or the built-in defaults when absent. Problems are
/// rendered against the file's text.
pub fn load_config(path: Option<&Path>) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::default();
    };
    let filename = path.display().to_string();
    let source = std::fs::read_to_string(path).unwrap_or_default();
    match EngineConfig::load(path) {
        Ok(config) => {
            render_diagnostics(&config.warnings(), &filename, &source);
            config
        }
        Err(diag) => {
            diag.render(&filename, &source);
            process::exit(1);
        }
    }
}

pub fn resolve_operator(name: &str) -> Operator {
    match Operator::from_name(name) {
        Some(op) => op,
        None => {
            let known: Vec<&str> = Operator::ALL.iter().map(|op| op.name()).collect();
            eprintln!("error: unknown operator '{}'", name);
            eprintln!("  known operators: {}", known.join(", "));
            process::exit(1);
        }
    }
}

/// Parse one operand token: `42`, `42n`, `true`, `false`, `null`, `"text"`.
pub fn parse_operand(token: &str) -> Result<Value, String> {
    let token = token.trim();
    match token {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Some(text) = token
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return Ok(Value::str(text));
    }
    if let Some(digits) = token.strip_suffix('n') {
        return digits
            .parse::<BigInt>()
            .map(Value::big)
            .map_err(|_| format!("invalid big integer '{}'", token));
    }
    token
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| format!("invalid operand '{}'", token))
}

/// Parse a comma-separated operand combination.
pub fn parse_combo(combo: &str) -> Result<Vec<Value>, String> {
    combo.split(',').map(parse_operand).collect()
}
