//! The typed payment message used by the signed `/verify` fallback.
//!
//! The domain is fixed to `x402 Payment` v1 on chain id 1 with the zero address as verifying contract.
//! Facilitators bound to a real chain or contract will reject these intents.

use alloy_primitives::{Address, B256};
use alloy_sol_types::{SolStruct, eip712_domain, sol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};

use crate::error::SigningError;

pub const DOMAIN_NAME: &str = "x402 Payment";
pub const DOMAIN_VERSION: &str = "1";
pub const DOMAIN_CHAIN_ID: u64 = 1;
pub const PRIMARY_TYPE: &str = "Payment";
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

sol! {
    /// The signed form of [`IntentMessage`].
    struct Payment {
        address from;
        address to;
        string amount;
        string currency;
        string memo;
        string network;
    }
}

/// A payment message in EIP-712 typed-data JSON form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredIntent {
    pub domain: IntentDomain,
    pub types: BTreeMap<String, Vec<TypedField>>,
    pub primary_type: String,
    pub message: IntentMessage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: String,
}

/// A single member of a typed-data struct definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedField {
    fn new(name: &str, kind: &str) -> Self {
        Self { name: name.to_string(), kind: kind.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentMessage {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub currency: String,
    pub memo: String,
    pub network: String,
}

/// Build the typed payment message.
///
/// Missing addresses become the zero address and missing memo or network become empty strings.
pub fn build_intent(
    wallet_address: Option<&str>,
    amount: Decimal,
    currency: &str,
    memo: Option<&str>,
    network: Option<&str>,
    recipient_address: Option<&str>,
) -> StructuredIntent {
    let types = BTreeMap::from([
        (
            "EIP712Domain".to_string(),
            vec![
                TypedField::new("name", "string"),
                TypedField::new("version", "string"),
                TypedField::new("chainId", "uint256"),
                TypedField::new("verifyingContract", "address"),
            ],
        ),
        (
            PRIMARY_TYPE.to_string(),
            vec![
                TypedField::new("from", "address"),
                TypedField::new("to", "address"),
                TypedField::new("amount", "string"),
                TypedField::new("currency", "string"),
                TypedField::new("memo", "string"),
                TypedField::new("network", "string"),
            ],
        ),
    ]);

    StructuredIntent {
        domain: IntentDomain {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id: DOMAIN_CHAIN_ID,
            verifying_contract: ZERO_ADDRESS.to_string(),
        },
        types,
        primary_type: PRIMARY_TYPE.to_string(),
        message: IntentMessage {
            from: wallet_address.unwrap_or(ZERO_ADDRESS).to_string(),
            to: recipient_address.unwrap_or(ZERO_ADDRESS).to_string(),
            amount: amount.to_string(),
            currency: currency.to_string(),
            memo: memo.unwrap_or_default().to_string(),
            network: network.unwrap_or_default().to_string(),
        },
    }
}

impl StructuredIntent {
    /// The EIP-712 hash a wallet signs for this intent.
    pub fn signing_hash(&self) -> Result<B256, SigningError> {
        let verifying_contract = parse_address("verifyingContract", &self.domain.verifying_contract)?;
        let domain = eip712_domain! {
            name: self.domain.name.clone(),
            version: self.domain.version.clone(),
            chain_id: self.domain.chain_id,
            verifying_contract: verifying_contract,
        };

        let message = &self.message;
        let payment = Payment {
            from: parse_address("from", &message.from)?,
            to: parse_address("to", &message.to)?,
            amount: message.amount.clone(),
            currency: message.currency.clone(),
            memo: message.memo.clone(),
            network: message.network.clone(),
        };
        Ok(payment.eip712_signing_hash(&domain))
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, SigningError> {
    Address::from_str(value).map_err(|_| SigningError::InvalidAddress { field, value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_fields() {
        let intent = build_intent(None, Decimal::new(1, 2), "USD", None, None, None);
        assert_eq!(intent.message.from, ZERO_ADDRESS);
        assert_eq!(intent.message.to, ZERO_ADDRESS);
        assert_eq!(intent.message.amount, "0.01");
        assert_eq!(intent.message.memo, "");
        assert_eq!(intent.message.network, "");
    }

    #[test]
    fn serializes_as_typed_data() {
        let intent = build_intent(None, Decimal::new(5, 0), "USD", Some("t"), Some("base"), None);
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["primaryType"], "Payment");
        assert_eq!(
            value["domain"],
            json!({ "name": "x402 Payment", "version": "1", "chainId": 1, "verifyingContract": ZERO_ADDRESS })
        );
        assert_eq!(value["types"]["Payment"][0], json!({ "name": "from", "type": "address" }));
        assert_eq!(value["message"]["memo"], "t");
    }

    #[test]
    fn construction_is_deterministic() {
        let build = || build_intent(Some(ZERO_ADDRESS), Decimal::new(1, 2), "USD", Some("t"), None, None);
        assert_eq!(build(), build());
        assert_eq!(build().signing_hash().unwrap(), build().signing_hash().unwrap());
    }

    #[test]
    fn hash_depends_on_message() {
        let a = build_intent(None, Decimal::new(1, 2), "USD", None, None, None);
        let b = build_intent(None, Decimal::new(2, 2), "USD", None, None, None);
        assert_ne!(a.signing_hash().unwrap(), b.signing_hash().unwrap());
    }

    #[test]
    fn rejects_malformed_addresses() {
        let intent = build_intent(Some("not-an-address"), Decimal::ONE, "USD", None, None, None);
        assert!(matches!(intent.signing_hash(), Err(SigningError::InvalidAddress { field: "from", .. })));
    }
}
