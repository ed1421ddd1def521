//! REST [`LedgerReader`] backed by the node's view-function endpoint.
//!
//! Every read is a `POST {node_url}/v1/view` with a JSON body
//! `{ "function", "type_arguments", "arguments" }`; the node answers with a
//! JSON array holding the function's return values.
//!
//! Numeric return values arrive either as JSON numbers or as decimal strings
//! (64-bit integers are string-encoded), so the parsers here accept both.

use crate::ledger::{LedgerError, LedgerReader, PositionDetail, QuoteKind};
use crate::settings::LedgerSettings;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const BALANCE_FUNCTION: &str = "0x1::primary_fungible_store::balance";
const FUNGIBLE_METADATA_TYPE: &str = "0x1::fungible_asset::Metadata";

#[derive(Debug, Serialize)]
struct ViewRequest<'a> {
    function: String,
    type_arguments: Vec<&'a str>,
    arguments: Vec<Value>,
}

pub struct ViewClient {
    client: reqwest::Client,
    view_url: String,
    settings: LedgerSettings,
}

impl ViewClient {
    pub fn new(settings: LedgerSettings) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;
        let view_url = format!("{}/v1/view", settings.node_url.trim_end_matches('/'));
        Ok(Self {
            client,
            view_url,
            settings,
        })
    }

    /// `<module_address>::<module>::<function>`
    fn module_function(&self, name: &str) -> String {
        format!("{}::{}", self.settings.module_address, name)
    }

    async fn view(
        &self,
        function: String,
        type_arguments: Vec<&str>,
        arguments: Vec<Value>,
    ) -> Result<Vec<Value>, LedgerError> {
        debug!("view {} {:?}", function, arguments);
        let request = ViewRequest {
            function,
            type_arguments,
            arguments,
        };
        let response = self.client.post(&self.view_url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Remote(remote_message(status, &body)));
        }

        let values: Vec<Value> = response.json().await?;
        Ok(values)
    }
}

#[async_trait]
impl LedgerReader for ViewClient {
    async fn get_position_ids(&self, account: &str) -> Result<Vec<String>, LedgerError> {
        let function = self.module_function(&self.settings.position_ids_function);
        let values = self
            .view(function, vec![], vec![Value::from(account)])
            .await?;
        parse_id_list(values.first())
    }

    async fn get_position_info(&self, position_id: &str) -> Result<Value, LedgerError> {
        let function = self.module_function(&self.settings.position_state_function);
        let values = self
            .view(function, vec![], vec![Value::from(position_id)])
            .await?;
        Ok(Value::Array(values))
    }

    async fn get_position_detail(&self, position_id: &str) -> Result<PositionDetail, LedgerError> {
        let function = self.module_function(&self.settings.position_info_function);
        let values = self
            .view(function, vec![], vec![Value::from(position_id)])
            .await?;
        parse_position_detail(values.into_iter().next())
    }

    async fn get_swap_quote(
        &self,
        kind: QuoteKind,
        amount: u64,
        pool_stats_id: &str,
        pool_id: &str,
    ) -> Result<f64, LedgerError> {
        let name = match kind {
            QuoteKind::PtOut => &self.settings.pt_out_function,
            QuoteKind::SyIn => &self.settings.sy_in_function,
        };
        let function = self.module_function(name);
        let arguments = vec![
            Value::from(amount.to_string()),
            Value::from(pool_stats_id),
            Value::from(pool_id),
        ];
        let values = self.view(function, vec![], arguments).await?;
        parse_number(values.first())
    }

    async fn get_token_balance(&self, account: &str, token_id: &str) -> Result<String, LedgerError> {
        let values = self
            .view(
                BALANCE_FUNCTION.to_string(),
                vec![FUNGIBLE_METADATA_TYPE],
                vec![Value::from(account), Value::from(token_id)],
            )
            .await?;
        match values.first() {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(LedgerError::Decode(format!("balance: {}", other))),
        }
    }
}

/// Node error bodies carry `{"message": ...}`; fall back to the status line.
fn remote_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status))
}

/// First return value as a list of object addresses. A missing value is an empty list.
pub(crate) fn parse_id_list(value: Option<&Value>) -> Result<Vec<String>, LedgerError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                // Object<T> may be encoded as {"inner": "0x..."}
                Value::Object(map) => map
                    .get("inner")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| LedgerError::Decode(format!("position id: {}", item))),
                other => Err(LedgerError::Decode(format!("position id: {}", other))),
            })
            .collect(),
        Some(other) => Err(LedgerError::Decode(format!("position id list: {}", other))),
    }
}

pub(crate) fn parse_number(value: Option<&Value>) -> Result<f64, LedgerError> {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| LedgerError::Decode(format!("number: {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| LedgerError::Decode(format!("number {:?}: {}", s, e))),
        Some(other) => Err(LedgerError::Decode(format!("number: {}", other))),
        None => Err(LedgerError::Decode("empty view result".to_string())),
    }
}

/// Decode a detail object, stringifying numeric fields (e.g. `expiry_days`).
pub(crate) fn parse_position_detail(value: Option<Value>) -> Result<PositionDetail, LedgerError> {
    let Some(Value::Object(mut map)) = value else {
        return Ok(PositionDetail::default());
    };
    for field in map.values_mut() {
        match field {
            Value::Number(n) => *field = Value::String(n.to_string()),
            Value::Bool(b) => *field = Value::String(b.to_string()),
            _ => {}
        }
    }
    Ok(serde_json::from_value(Value::Object(map))?)
}
