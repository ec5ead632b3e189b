use serde::Deserialize;

use crate::amount::deserialize_amount;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TxReceiptResponse {
    pub tx_receipt_raw: TxReceiptRaw,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TxReceiptRaw {
    pub succ_action_num: u32,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub gas_usage: f64,
}

/// Contract storage value: a one character type tag followed by the JSON encoded value.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StateResponse {
    pub value: String,
}
