//! A donation action: preset buttons, a custom amount input and a linked action with an
//! `amount` parameter. The handler answers with a single native ETH transfer to the configured
//! recipient and chains a disabled "thank you" card.
use async_trait::async_trait;
use blink_common::{
    builder::{ActionDefinition, DefinitionError, LinkedActionBuilder, ParameterBuilder},
    dto::{EVMTransaction, NextActionLink, TransactionResponse, INPUT_ACTION},
    traits::{ActionContext, ActionHandler},
};
use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;
use tracing::{debug, instrument};

const WEI_DECIMALS: usize = 18;
const PRESET_AMOUNTS: [&str; 3] = ["0.01", "0.05", "0.1"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DonationError {
    #[error("No donation amount given")]
    MissingAmount,

    #[error("Invalid donation amount `{0}`")]
    InvalidAmount(String),

    #[error("Donation amount `{0}` has more than 18 decimals")]
    TooManyDecimals(String),

    #[error("Donation amount must be greater than zero")]
    ZeroAmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonateConfig {
    pub recipient: String,
    pub chain_id: u64,
    pub icon: String,
    /// Endpoint path the action is served under, e.g. `/api/actions/donate`.
    pub base_path: String,
}

pub fn donate_action(config: &DonateConfig) -> Result<ActionDefinition, DefinitionError> {
    let mut builder = ActionDefinition::builder()
        .title("Donate ETH")
        .icon(&config.icon)
        .description("Support the project with a donation in ETH")
        .label("Donate");
    for amount in PRESET_AMOUNTS {
        builder = builder.button(&format!("{amount} ETH"), amount);
    }

    builder
        .input("Custom amount", Some("Amount in ETH"))
        .linked_action(
            LinkedActionBuilder::new(
                "Donate",
                &format!("{}?amount={{amount}}", config.base_path),
            )
            .parameter(
                ParameterBuilder::amount("amount")
                    .label("Amount in ETH")
                    .required(true)
                    .min(0.0001),
            ),
        )
        .handler(DonateHandler::new(config))
        .build()
}

/// Converts a decimal ETH amount into wei.
pub fn eth_to_wei(amount: &str) -> Result<BigUint, DonationError> {
    let amount = amount.trim();
    let (whole, fraction) = amount
        .split_once('.')
        .unwrap_or((amount, ""));
    let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(DonationError::InvalidAmount(amount.to_string()));
    }
    if fraction.len() > WEI_DECIMALS {
        return Err(DonationError::TooManyDecimals(amount.to_string()));
    }

    let wei: BigUint = format!("{whole}{fraction:0<WEI_DECIMALS$}")
        .parse()
        .map_err(|_| DonationError::InvalidAmount(amount.to_string()))?;
    if wei.is_zero() {
        return Err(DonationError::ZeroAmount);
    }
    Ok(wei)
}

#[derive(Debug, Clone)]
pub struct DonateHandler {
    recipient: String,
    chain_id: u64,
    icon: String,
}

impl DonateHandler {
    pub fn new(config: &DonateConfig) -> Self {
        Self {
            recipient: config.recipient.clone(),
            chain_id: config.chain_id,
            icon: config.icon.clone(),
        }
    }

    /// Linked actions send the amount as a parameter value, the input sends it as free text
    /// and buttons carry it as their value.
    fn amount(context: &ActionContext) -> Result<String, DonationError> {
        if let Some(amount) = context
            .data
            .get("amount")
            .and_then(|value| value.first())
        {
            return Ok(amount.to_string());
        }
        match context.action.as_deref() {
            Some(INPUT_ACTION) => context
                .input
                .clone()
                .ok_or(DonationError::MissingAmount),
            Some(action) => Ok(action.to_string()),
            None => Err(DonationError::MissingAmount),
        }
    }

    fn thank_you(&self, amount: &str) -> Result<NextActionLink, DefinitionError> {
        let metadata = ActionDefinition::builder()
            .title("Thank you!")
            .icon(&self.icon)
            .description(&format!("Your donation of {amount} ETH is on its way"))
            .button("Donated", "done")
            .disabled(true)
            .build_metadata()?;
        Ok(NextActionLink::Inline { action: Box::new(metadata) })
    }
}

#[async_trait]
impl ActionHandler for DonateHandler {
    #[instrument(skip_all, fields(account = %context.account))]
    async fn handle(&self, context: ActionContext) -> anyhow::Result<TransactionResponse> {
        let amount = Self::amount(&context)?;
        let wei = eth_to_wei(&amount)?;
        debug!(%amount, %wei, "Building donation transaction");

        Ok(TransactionResponse::single(EVMTransaction {
            to: self.recipient.clone(),
            value: wei.to_string(),
            data: "0x".to_string(),
            chain_id: self.chain_id,
        })
        .with_message(&format!("Donating {amount} ETH"))
        .with_next(self.thank_you(&amount)?))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use blink_common::ParameterValue;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const RECIPIENT: &str = "0x52908400098527886e0f7030069857d2e4169ee7";
    const ACCOUNT: &str = "0xde709f2102306220921060314715629080e2fb77";

    fn config() -> DonateConfig {
        DonateConfig {
            recipient: RECIPIENT.to_string(),
            chain_id: 11155111,
            icon: "https://example.com/donate.png".to_string(),
            base_path: "/api/actions/donate".to_string(),
        }
    }

    #[rstest]
    #[case("1", "1000000000000000000")]
    #[case("0.01", "10000000000000000")]
    #[case(".5", "500000000000000000")]
    #[case("2.", "2000000000000000000")]
    #[case("0.000000000000000001", "1")]
    #[case(" 1.25 ", "1250000000000000000")]
    fn test_eth_to_wei(#[case] amount: &str, #[case] expected: &str) {
        assert_eq!(eth_to_wei(amount).unwrap().to_string(), expected);
    }

    #[rstest]
    #[case("", DonationError::InvalidAmount("".to_string()))]
    #[case(".", DonationError::InvalidAmount(".".to_string()))]
    #[case("-1", DonationError::InvalidAmount("-1".to_string()))]
    #[case("1e18", DonationError::InvalidAmount("1e18".to_string()))]
    #[case("1.2.3", DonationError::InvalidAmount("1.2.3".to_string()))]
    #[case(
        "0.0000000000000000001",
        DonationError::TooManyDecimals("0.0000000000000000001".to_string())
    )]
    #[case("0.000", DonationError::ZeroAmount)]
    fn test_eth_to_wei_errors(#[case] amount: &str, #[case] expected: DonationError) {
        assert_eq!(eth_to_wei(amount).unwrap_err(), expected);
    }

    #[test]
    fn test_donate_action_metadata() {
        let definition = donate_action(&config()).unwrap();
        let metadata = definition.metadata();

        assert_eq!(metadata.actions.len(), 4);
        assert!(metadata.actions[3].is_input());
        assert_eq!(metadata.actions[0].value.as_deref(), Some("0.01"));
        let linked = metadata.linked_actions();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].href, "/api/actions/donate?amount={amount}");
        assert_eq!(linked[0].parameters[0].name(), "amount");
    }

    fn context(action: Option<&str>, input: Option<&str>, amount: Option<&str>) -> ActionContext {
        ActionContext {
            account: ACCOUNT.to_string(),
            action: action.map(str::to_string),
            input: input.map(str::to_string),
            data: amount
                .map(|amount| HashMap::from([("amount".to_string(), ParameterValue::from(amount))]))
                .unwrap_or_default(),
        }
    }

    #[rstest]
    #[case::button(context(Some("0.05"), None, None), "50000000000000000")]
    #[case::input(context(Some(INPUT_ACTION), Some("0.2"), None), "200000000000000000")]
    #[case::linked(
        context(Some("/api/actions/donate?amount=3"), None, Some("3")),
        "3000000000000000000"
    )]
    #[tokio::test]
    async fn test_handle_donation(#[case] context: ActionContext, #[case] expected_wei: &str) {
        let handler = DonateHandler::new(&config());

        let response = handler.handle(context).await.unwrap();

        let next = response.next().cloned();
        let transactions = response.into_transactions();
        assert_eq!(
            transactions,
            vec![EVMTransaction {
                to: RECIPIENT.to_string(),
                value: expected_wei.to_string(),
                data: "0x".to_string(),
                chain_id: 11155111,
            }]
        );
        let Some(NextActionLink::Inline { action }) = next else {
            panic!("expected inline next action");
        };
        assert!(action.disabled);
        assert_eq!(action.title, "Thank you!");
    }

    #[tokio::test]
    async fn test_handle_without_amount() {
        let handler = DonateHandler::new(&config());

        let err = handler
            .handle(context(None, None, None))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No donation amount given");
    }

    #[tokio::test]
    async fn test_handle_invalid_amount() {
        let handler = DonateHandler::new(&config());

        let err = handler
            .handle(context(Some("lots"), None, None))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid donation amount `lots`");
    }
}
