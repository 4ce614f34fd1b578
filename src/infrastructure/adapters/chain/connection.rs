//! Chain Connection - 共享的 provider、签名者与交易发送
//!
//! 所有链上适配器共用一个连接：
//! - 读调用错误分类为 Connection / Contract
//! - 写交易显式设置 nonce，等待确认并转换为 SubmissionReceipt

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{DynProvider, PendingTransactionError, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy::transports::{RpcError, TransportErrorKind};
use std::str::FromStr;
use std::time::Duration;

use crate::application::ports::{ChainError, SubmissionError};
use crate::application::RetryPolicy;
use crate::domain::SubmissionReceipt;

/// 交易发送参数
#[derive(Debug, Clone)]
pub struct TxSettings {
    /// 视为成功所需的确认数（至少 1）
    pub confirmations: u64,
    /// 等待回执的超时时间
    pub receipt_timeout: Duration,
    /// 固定 gas limit
    pub gas_limit: Option<u64>,
}

impl Default for TxSettings {
    fn default() -> Self {
        Self {
            confirmations: 1,
            receipt_timeout: Duration::from_secs(120),
            gas_limit: None,
        }
    }
}

/// 链连接
///
/// provider 内部为 Arc，clone 成本低
#[derive(Clone)]
pub struct ChainConnection {
    provider: DynProvider,
    signer: Option<PrivateKeySigner>,
    settings: TxSettings,
    retry: RetryPolicy,
}

impl ChainConnection {
    /// 连接 HTTP RPC 节点
    ///
    /// 提供 signer 时 provider 带钱包，可发送交易
    pub fn connect(
        rpc_url: &str,
        signer: Option<PrivateKeySigner>,
        settings: TxSettings,
        retry: RetryPolicy,
    ) -> Result<Self, ChainError> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| ChainError::Connection(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        let provider = match &signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer.clone()))
                .connect_http(url)
                .erased(),
            None => ProviderBuilder::new().connect_http(url).erased(),
        };

        Ok(Self::from_provider(provider, signer, settings, retry))
    }

    /// 使用已构建的 provider
    ///
    /// 需要发送交易时，provider 应已带上与 signer 对应的钱包
    pub fn from_provider(
        provider: DynProvider,
        signer: Option<PrivateKeySigner>,
        settings: TxSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            signer,
            settings,
            retry,
        }
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// 签名账户地址
    pub fn account(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub fn require_signer(&self) -> Result<&PrivateKeySigner, SubmissionError> {
        self.signer
            .as_ref()
            .ok_or_else(|| SubmissionError::Signing("No private key configured".to_string()))
    }

    /// 校验地址上存在合约代码
    pub async fn ensure_code(&self, address: Address) -> Result<(), ChainError> {
        let code = self
            .retry
            .run("chain.get_code", || self.code_at_once(address))
            .await?;

        if code.is_empty() {
            return Err(ChainError::Contract(format!(
                "No contract code at {}",
                address
            )));
        }
        Ok(())
    }

    async fn code_at_once(&self, address: Address) -> Result<alloy::primitives::Bytes, ChainError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(classify_rpc_error)
    }

    /// 账户在 pending 区块上的 nonce
    pub async fn pending_nonce(&self, account: Address) -> Result<u64, SubmissionError> {
        self.retry
            .run("chain.pending_nonce", || self.pending_nonce_once(account))
            .await
    }

    async fn pending_nonce_once(&self, account: Address) -> Result<u64, SubmissionError> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(|e| SubmissionError::Rpc(format!("Failed to fetch nonce: {}", e)))
    }

    /// 设置发送方、nonce 与固定 gas limit
    fn prepare_request(
        &self,
        request: TransactionRequest,
        account: Address,
        nonce: u64,
    ) -> TransactionRequest {
        let request = request.from(account).nonce(nonce);
        match self.settings.gas_limit {
            Some(gas_limit) => request.gas_limit(gas_limit),
            None => request,
        }
    }

    /// 发送交易并等待确认
    ///
    /// 广播本身不重试；回执 status 为 0 时返回 `Reverted`，
    /// 等待超时返回携带 tx hash 的 `Timeout`
    pub async fn send_and_confirm(
        &self,
        request: TransactionRequest,
        label: &'static str,
    ) -> Result<(SubmissionReceipt, TransactionReceipt), SubmissionError> {
        let account = self.require_signer()?.address();
        let nonce = self.pending_nonce(account).await?;
        let request = self.prepare_request(request, account, nonce);

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| classify_send_error(&e.to_string()))?;

        let tx_hash = format!("{:#x}", pending.tx_hash());
        tracing::info!(call = label, tx_hash = %tx_hash, nonce, "Transaction broadcast");

        let receipt = pending
            .with_required_confirmations(self.settings.confirmations)
            .with_timeout(Some(self.settings.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| classify_wait_error(e, &tx_hash))?;

        let submission = settle_receipt(&tx_hash, &receipt).inspect_err(|_| {
            tracing::error!(
                call = label,
                tx_hash = %tx_hash,
                block_number = ?receipt.block_number,
                "Transaction reverted"
            );
        })?;

        tracing::info!(
            call = label,
            tx_hash = %tx_hash,
            block_number = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "Transaction confirmed"
        );

        Ok((submission, receipt))
    }

    /// 查询已广播交易的当前状态
    ///
    /// - 有回执：Confirmed / Reverted（确认数不足时仍为 Pending）
    /// - 无回执但节点认识该交易：Pending
    /// - 节点不认识该交易（已被丢弃）：None
    pub async fn transaction_status(
        &self,
        tx_hash: &str,
    ) -> Result<Option<SubmissionReceipt>, SubmissionError> {
        let hash = TxHash::from_str(tx_hash)
            .map_err(|e| SubmissionError::Rpc(format!("Invalid tx hash {}: {}", tx_hash, e)))?;

        let receipt = self
            .retry
            .run("chain.get_receipt", || self.receipt_once(hash))
            .await?;

        let Some(receipt) = receipt else {
            let known = self
                .retry
                .run("chain.get_transaction", || self.transaction_known_once(hash))
                .await?;
            return Ok(known.then(|| SubmissionReceipt::pending(tx_hash)));
        };

        let mut submission = SubmissionReceipt::pending(tx_hash);
        if !receipt.status() {
            submission.revert(receipt.block_number);
            return Ok(Some(submission));
        }

        if let (Some(mined), true) = (receipt.block_number, self.settings.confirmations > 1) {
            let latest = self
                .retry
                .run("chain.block_number", || self.block_number_once())
                .await?;
            if latest.saturating_sub(mined) + 1 < self.settings.confirmations {
                return Ok(Some(submission));
            }
        }

        submission.confirm(receipt.block_number);
        Ok(Some(submission))
    }

    async fn receipt_once(&self, hash: TxHash) -> Result<Option<TransactionReceipt>, SubmissionError> {
        self.provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| SubmissionError::Rpc(format!("Failed to fetch receipt: {}", e)))
    }

    async fn transaction_known_once(&self, hash: TxHash) -> Result<bool, SubmissionError> {
        self.provider
            .get_transaction_by_hash(hash)
            .await
            .map(|tx| tx.is_some())
            .map_err(|e| SubmissionError::Rpc(format!("Failed to fetch transaction: {}", e)))
    }

    async fn block_number_once(&self) -> Result<u64, SubmissionError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| SubmissionError::Rpc(format!("Failed to fetch block number: {}", e)))
    }
}

/// 回执 status 为 0 时返回 `Reverted`
fn settle_receipt(
    tx_hash: &str,
    receipt: &TransactionReceipt,
) -> Result<SubmissionReceipt, SubmissionError> {
    if !receipt.status() {
        return Err(SubmissionError::Reverted(tx_hash.to_string()));
    }
    let mut submission = SubmissionReceipt::pending(tx_hash);
    submission.confirm(receipt.block_number);
    Ok(submission)
}

/// 交易已广播但未拿到回执
///
/// 无论超时还是传输失败，交易状态都未知，统一为携带 tx hash 的 `Timeout`
fn classify_wait_error(e: PendingTransactionError, tx_hash: &str) -> SubmissionError {
    if !matches!(e, PendingTransactionError::TxWatcher(_)) {
        tracing::warn!(tx_hash = %tx_hash, error = %e, "Lost track of broadcast transaction");
    }
    SubmissionError::Timeout(tx_hash.to_string())
}

/// 传输层失败为 Connection，其余为 Contract
pub fn classify_rpc_error(e: RpcError<TransportErrorKind>) -> ChainError {
    if e.is_transport_error() {
        ChainError::Connection(e.to_string())
    } else {
        ChainError::Contract(e.to_string())
    }
}

/// 合约只读调用错误分类
pub fn classify_call_error(e: alloy::contract::Error) -> ChainError {
    match e {
        alloy::contract::Error::TransportError(rpc) => classify_rpc_error(rpc),
        other => ChainError::Contract(other.to_string()),
    }
}

/// 按节点返回的错误信息分类发送失败
pub fn classify_send_error(message: &str) -> SubmissionError {
    let lower = message.to_lowercase();
    if lower.contains("insufficient funds") {
        SubmissionError::InsufficientFunds(message.to_string())
    } else if lower.contains("nonce too low")
        || lower.contains("nonce too high")
        || lower.contains("replacement transaction underpriced")
        || lower.contains("already known")
    {
        SubmissionError::NonceConflict(message.to_string())
    } else if lower.contains("revert") {
        SubmissionError::Reverted(message.to_string())
    } else if lower.contains("sign") {
        SubmissionError::Signing(message.to_string())
    } else {
        SubmissionError::Rpc(message.to_string())
    }
}
