//! 交易流程驱动测试：状态迁移与取消

mod common;

use std::{sync::Arc, time::Duration};

use coincore::{
    domain::{
        fee::FeeLevel,
        money::CryptoValue,
        pending_tx::{AddressKind, ReceiveAddress, TxConfirmationValue, TxResult, ValidationState},
        tx_state::TxFlowState,
    },
    error::CoreError,
    service::{
        account::OnChainKind,
        tx_engine::{on_chain::OnChainTxEngine, TxEngine, TxFlow},
    },
};
use common::*;
use tokio_util::sync::CancellationToken;

fn eth_flow(env: &TestEnv, parent: CancellationToken) -> TxFlow {
    let eth = eth();
    let engine = OnChainTxEngine::new(
        eth.clone(),
        eth.clone(),
        OnChainKind::Native,
        "My ETH Wallet",
        ReceiveAddress::new(eth, RECIPIENT, "Recipient", AddressKind::OnChain),
        0,
        env.engine_deps(),
    )
    .unwrap();
    let engine: Arc<dyn TxEngine> = Arc::new(engine);
    TxFlow::new(engine, parent)
}

fn usdc_flow(env: &TestEnv, target: &str) -> TxFlow {
    let usdc = usdc();
    let engine = OnChainTxEngine::new(
        usdc.clone(),
        eth(),
        OnChainKind::Token {
            contract: USDC_CONTRACT.into(),
        },
        "My USDC Wallet",
        ReceiveAddress::new(usdc, target, "Recipient", AddressKind::Token),
        0,
        env.engine_deps(),
    )
    .unwrap();
    let engine: Arc<dyn TxEngine> = Arc::new(engine);
    TxFlow::new(engine, CancellationToken::new())
}

fn wei(minor: i128) -> CryptoValue {
    CryptoValue::new(eth(), minor)
}

/// Test 1: 完整流程
#[tokio::test]
async fn test_happy_path_reaches_hashed_result() {
    let env = TestEnv::new();
    env.eth_ledger.set_balance("ETH", ETH_WEI);
    let flow = eth_flow(&env, CancellationToken::new());

    flow.initialise().await.unwrap();
    assert_eq!(flow.state().await, TxFlowState::Uninitialised);

    flow.update_amount(wei(ETH_WEI / 10)).await.unwrap();
    assert_eq!(flow.state().await, TxFlowState::AmountSet);

    flow.update_fee_level(FeeLevel::Priority, None).await.unwrap();
    assert_eq!(flow.state().await, TxFlowState::AmountSet);

    let tx = flow.validate_all().await.unwrap();
    assert_eq!(tx.validation_state, ValidationState::CanExecute);
    assert_eq!(flow.state().await, TxFlowState::Validated);

    flow.build_confirmations().await.unwrap();
    assert_eq!(flow.state().await, TxFlowState::ConfirmationsBuilt);

    flow.update_option(TxConfirmationValue::Description {
        text: Some("coffee".into()),
    })
    .await
    .unwrap();
    assert_eq!(flow.state().await, TxFlowState::ConfirmationsBuilt);

    let result = flow.execute(None).await.unwrap();
    assert!(matches!(result, TxResult::Hashed { .. }));
    assert_eq!(flow.state().await, TxFlowState::HashedResult);
    assert!(flow.pending_tx().await.is_none());
    assert_eq!(env.eth_ledger.notes.lock().unwrap().len(), 1);
}

/// Test 2: 校验失败后可修改输入重新进入流程
#[tokio::test]
async fn test_validation_failure_is_recoverable() {
    let env = TestEnv::new();
    env.eth_ledger.set_balance("ETH", 1_000);
    let flow = eth_flow(&env, CancellationToken::new());

    flow.initialise().await.unwrap();
    flow.update_amount(wei(ETH_WEI)).await.unwrap();
    let tx = flow.validate_amount().await.unwrap();
    assert_eq!(tx.validation_state, ValidationState::InsufficientFunds);
    assert_eq!(flow.state().await, TxFlowState::ValidationFailed);

    // 失败状态下不能构建确认项
    assert!(matches!(
        flow.build_confirmations().await,
        Err(CoreError::IllegalStateTransition { .. })
    ));

    env.eth_ledger.set_balance("ETH", ETH_WEI);
    flow.update_amount(wei(1_000)).await.unwrap();
    flow.validate_amount().await.unwrap();
    assert_eq!(flow.state().await, TxFlowState::Validated);
}

/// Test 3: 未完成确认不能执行
#[tokio::test]
async fn test_execute_requires_confirmations() {
    let env = TestEnv::new();
    env.eth_ledger.set_balance("ETH", ETH_WEI);
    let flow = eth_flow(&env, CancellationToken::new());

    flow.initialise().await.unwrap();
    flow.update_amount(wei(1_000)).await.unwrap();
    let err = flow.execute(None).await.unwrap_err();
    assert!(matches!(err, CoreError::IllegalStateTransition { .. }));
    assert!(env.eth_ledger.pushed.lock().unwrap().is_empty());
}

/// Test 4: 新步骤取消旧步骤，旧步骤结果不会发布
#[tokio::test]
async fn test_new_step_cancels_previous() {
    let env = TestEnv::new();
    env.eth_ledger.set_balance("ETH", ETH_WEI);
    let flow = Arc::new(eth_flow(&env, CancellationToken::new()));
    flow.initialise().await.unwrap();

    env.eth_ledger.set_balance_delay(Some(Duration::from_millis(200)));
    let slow = {
        let flow = flow.clone();
        tokio::spawn(async move { flow.update_amount(wei(111)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let latest = flow.update_amount(wei(222)).await.unwrap();
    assert_eq!(latest.amount.minor(), 222);

    let stale = slow.await.unwrap();
    assert!(matches!(stale, Err(CoreError::Cancelled)));
    assert_eq!(flow.pending_tx().await.unwrap().amount.minor(), 222);
}

/// Test 5: 释放流程后所有步骤都被拒绝
#[tokio::test]
async fn test_dispose_cancels_flow() {
    let env = TestEnv::new();
    env.eth_ledger.set_balance("ETH", ETH_WEI);
    let parent = CancellationToken::new();
    let flow = Arc::new(eth_flow(&env, parent.child_token()));
    flow.initialise().await.unwrap();

    env.eth_ledger.set_balance_delay(Some(Duration::from_millis(200)));
    let pending = {
        let flow = flow.clone();
        tokio::spawn(async move { flow.update_amount(wei(1)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    parent.cancel();

    assert!(matches!(pending.await.unwrap(), Err(CoreError::Cancelled)));
    assert!(matches!(
        flow.update_amount(wei(2)).await,
        Err(CoreError::Cancelled)
    ));
    assert_eq!(flow.state().await, TxFlowState::Uninitialised);
}

/// Test 6: 未初始化就更新金额
#[tokio::test]
async fn test_update_before_initialise() {
    let env = TestEnv::new();
    let flow = eth_flow(&env, CancellationToken::new());
    assert!(matches!(
        flow.update_amount(wei(1)).await,
        Err(CoreError::NotInitialised(_))
    ));
}

/// Test 7: 执行失败进入 ExecutionFailed 终态
#[tokio::test]
async fn test_execution_failure_is_terminal() {
    let env = TestEnv::new();
    env.eth_ledger.set_balance("ETH", ETH_WEI);
    env.eth_ledger
        .fail_push
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let flow = eth_flow(&env, CancellationToken::new());

    flow.initialise().await.unwrap();
    flow.update_amount(wei(1_000)).await.unwrap();
    flow.validate_all().await.unwrap();
    flow.build_confirmations().await.unwrap();

    assert!(matches!(flow.execute(None).await, Err(CoreError::ExecutionFailed)));
    assert_eq!(flow.state().await, TxFlowState::ExecutionFailed);
    assert!(flow.state().await.is_terminal());
    assert!(flow.update_amount(wei(1)).await.is_err());
}

/// Test 8: 完整校验失败后，仅金额校验通过也不能构建确认项或执行
#[tokio::test]
async fn test_amount_check_cannot_mask_failed_full_validation() {
    let env = TestEnv::new();
    env.eth_ledger.set_balance("ETH", ETH_WEI);
    env.eth_ledger.set_balance("USDC", 10_000_000);
    let flow = usdc_flow(&env, CONTRACT);

    flow.initialise().await.unwrap();
    flow.update_amount(CryptoValue::new(usdc(), 1_000_000)).await.unwrap();
    let full = flow.validate_all().await.unwrap();
    assert_eq!(full.validation_state, ValidationState::InvalidAddress);

    let amount_only = flow.validate_amount().await.unwrap();
    assert_eq!(amount_only.validation_state, ValidationState::CanExecute);
    assert_eq!(flow.state().await, TxFlowState::Validated);

    assert!(matches!(
        flow.build_confirmations().await,
        Err(CoreError::IllegalStateTransition { .. })
    ));
    assert!(flow.execute(None).await.is_err());
    assert!(env.eth_ledger.pushed.lock().unwrap().is_empty());
    assert!(env.signer.signed.lock().unwrap().is_empty());
}

/// Test 9: 输入变更作废完整校验结果
#[tokio::test]
async fn test_input_change_requires_full_validation_again() {
    let env = TestEnv::new();
    env.eth_ledger.set_balance("ETH", ETH_WEI);
    let flow = eth_flow(&env, CancellationToken::new());

    flow.initialise().await.unwrap();
    flow.update_amount(wei(1_000)).await.unwrap();
    flow.validate_all().await.unwrap();

    flow.update_option(TxConfirmationValue::Description {
        text: Some("rent".into()),
    })
    .await
    .unwrap();
    assert!(flow.build_confirmations().await.is_err());

    flow.validate_all().await.unwrap();
    flow.update_fee_level(FeeLevel::Priority, None).await.unwrap();
    flow.validate_amount().await.unwrap();
    assert!(flow.build_confirmations().await.is_err());

    flow.validate_all().await.unwrap();
    flow.build_confirmations().await.unwrap();
    assert_eq!(flow.state().await, TxFlowState::ConfirmationsBuilt);
}

/// Test 10: 执行前复核发现在途交易时不广播
#[tokio::test]
async fn test_execute_rechecks_in_flight() {
    let env = TestEnv::new();
    env.eth_ledger.set_balance("ETH", ETH_WEI);
    let flow = eth_flow(&env, CancellationToken::new());

    flow.initialise().await.unwrap();
    flow.update_amount(wei(1_000)).await.unwrap();
    flow.validate_all().await.unwrap();
    flow.build_confirmations().await.unwrap();

    env.eth_ledger
        .in_flight
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let err = flow.execute(None).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::NotExecutable(ValidationState::HasTxInFlight)
    ));
    assert!(!err.is_fatal());
    assert_eq!(flow.state().await, TxFlowState::ValidationFailed);
    assert!(env.eth_ledger.pushed.lock().unwrap().is_empty());

    // 在途交易确认后可重新走完流程
    env.eth_ledger
        .in_flight
        .store(false, std::sync::atomic::Ordering::SeqCst);
    flow.validate_all().await.unwrap();
    flow.build_confirmations().await.unwrap();
    assert!(matches!(flow.execute(None).await, Ok(TxResult::Hashed { .. })));
}
