// src/core/parser.rs
use crate::types::{Action, Decision};
use rust_decimal::Decimal;
use serde::Deserialize;

const PARSE_FAILED: &str = "parse failed";

/// Shape we ask the model for. `action` is required; everything else has a
/// safe default. Unknown extra fields are ignored.
#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    symbol: Option<String>,
    action: String,
    #[serde(default)]
    qty: Option<u64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    stop_loss_price: Option<Decimal>,
    #[serde(default)]
    take_profit_price: Option<Decimal>,
}

/// Turn untrusted model output into a validated `Decision`.
///
/// Total function: whatever the input (prose-wrapped JSON, truncated
/// objects, binary garbage), the result is a well-formed decision, with a
/// hold/0-qty fallback when nothing usable can be extracted. A symbol outside
/// the allow-list is rewritten to `default_symbol`.
pub fn parse(raw: &str, allowlist: &[String], default_symbol: &str) -> Decision {
    let Some(candidate) = extract_object(raw) else {
        return Decision::hold(default_symbol, PARSE_FAILED);
    };

    let Ok(decoded) = serde_json::from_str::<RawDecision>(candidate) else {
        return Decision::hold(default_symbol, PARSE_FAILED);
    };

    let symbol = match decoded.symbol {
        Some(s) if allowlist.iter().any(|a| a == &s) => s,
        _ => default_symbol.to_string(),
    };

    Decision {
        symbol,
        action: parse_action(&decoded.action),
        qty: decoded.qty.unwrap_or(0),
        reasoning: decoded.reasoning.unwrap_or_default(),
        stop_loss_price: decoded.stop_loss_price,
        take_profit_price: decoded.take_profit_price,
    }
}

fn parse_action(raw: &str) -> Action {
    match raw.trim().to_ascii_lowercase().as_str() {
        "buy" => Action::Buy,
        "sell" => Action::Sell,
        _ => Action::Hold,
    }
}

/// First balanced `{...}` substring of `raw`, tracking brace depth and JSON
/// string/escape state so braces inside values don't truncate the match.
fn extract_object(raw: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = raw[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(len) = balanced_len(&raw[start..]) {
            return Some(&raw[start..start + len]);
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced object starting at the first byte of `s`
/// (which must be `{`), or None if the braces never balance.
fn balanced_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
