//! On-demand lookups triggered by a user (address, transaction, contract,
//! portfolio). Each one is an independent flow with its own result and never
//! touches the poller's state.

use futures_util::future::join_all;
use tracing::debug;

use crate::error::{ChainError, ChainResult};
use crate::models::{
    AddressSummary, CallRequest, ContractInfo, PortfolioEntry, StorageSlot, TransactionDetail,
};
use crate::rpc::client::has_code;
use crate::rpc::RpcClient;
use crate::units::{wei_to_ether, wei_to_gwei};

fn code_size(code: &str) -> usize {
    code.strip_prefix("0x").unwrap_or(code).len() / 2
}

pub async fn address_summary(client: &RpcClient, address: &str) -> ChainResult<AddressSummary> {
    let (balance, nonce, code) = tokio::try_join!(
        client.get_balance(address),
        client.get_transaction_count(address),
        client.get_code(address),
    )?;

    Ok(AddressSummary {
        address: address.to_string(),
        balance_ether: wei_to_ether(&balance),
        balance_wei: balance,
        nonce,
        is_contract: has_code(&code),
        code_size: code_size(&code),
    })
}

/// Transaction plus its receipt when one exists. A missing or failing receipt
/// means "not mined yet" and is not an error.
pub async fn transaction_detail(client: &RpcClient, hash: &str) -> ChainResult<TransactionDetail> {
    let transaction = client
        .get_transaction_by_hash(hash)
        .await?
        .ok_or_else(|| ChainError::NotFound(format!("transaction {hash}")))?;

    let receipt = match client.get_transaction_receipt(hash).await {
        Ok(receipt) => receipt,
        Err(ChainError::Cancelled) => return Err(ChainError::Cancelled),
        Err(e) => {
            debug!(hash, error = %e, "receipt unavailable");
            None
        }
    };

    Ok(TransactionDetail {
        value_ether: wei_to_ether(&transaction.value),
        gas_price_gwei: transaction.gas_price.as_deref().map(wei_to_gwei),
        pending: receipt.is_none(),
        receipt,
        transaction,
    })
}

pub async fn contract_info(
    client: &RpcClient,
    address: &str,
    slot: Option<&str>,
) -> ChainResult<ContractInfo> {
    let bytecode = client.get_code(address).await?;
    let storage = match slot {
        Some(slot) => Some(StorageSlot {
            slot: slot.to_string(),
            value: client.get_storage_at(address, slot).await?,
        }),
        None => None,
    };

    Ok(ContractInfo {
        address: address.to_string(),
        is_contract: has_code(&bytecode),
        code_size: code_size(&bytecode),
        bytecode,
        storage,
    })
}

pub async fn contract_call(client: &RpcClient, address: &str, data: &str) -> ChainResult<String> {
    let call = CallRequest {
        to: address.to_string(),
        data: Some(data.to_string()),
        ..CallRequest::default()
    };
    client.call(&call).await
}

/// Balances for many addresses at once; one failed address does not fail the
/// others.
pub async fn portfolio(client: &RpcClient, addresses: &[String]) -> Vec<PortfolioEntry> {
    let lookups = addresses.iter().map(|address| async move {
        match client.get_balance(address).await {
            Ok(wei) => {
                let ether = wei_to_ether(&wei);
                PortfolioEntry {
                    address: address.clone(),
                    balance_ether: ether.is_finite().then_some(ether),
                    error: None,
                }
            }
            Err(e) => PortfolioEntry {
                address: address.clone(),
                balance_ether: None,
                error: Some(e.to_string()),
            },
        }
    });
    join_all(lookups).await
}
