//! 交易流程驱动
//!
//! 一个流程持有一个 PendingTx 和一个活动步骤。开始新步骤前先取消上一步骤的
//! `CancellationToken`，被取消的步骤不会发布结果。执行（广播）一旦开始不可取消。
//!
//! 只有最近一次校验是完整校验（含目标地址与在途交易检查）时才能构建确认项；
//! 金额、档位、备注的任何修改都会作废该结果。执行前再做一次完整校验。

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::TxEngine;
use crate::{
    domain::{
        fee::FeeLevel,
        money::CryptoValue,
        pending_tx::{PendingTx, TxConfirmationValue, TxResult, ValidationState},
        tx_state::TxFlowState,
    },
    error::{CoreError, CoreResult},
};

struct FlowInner {
    state: TxFlowState,
    pending: Option<PendingTx>,
    /// 当前 PendingTx 已通过完整校验
    fully_validated: bool,
}

pub struct TxFlow {
    id: Uuid,
    engine: Arc<dyn TxEngine>,
    inner: Mutex<FlowInner>,
    active: Mutex<Option<CancellationToken>>,
    parent: CancellationToken,
}

impl TxFlow {
    pub fn new(engine: Arc<dyn TxEngine>, parent: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            engine,
            inner: Mutex::new(FlowInner {
                state: TxFlowState::Uninitialised,
                pending: None,
                fully_validated: false,
            }),
            active: Mutex::new(None),
            parent,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn engine(&self) -> &Arc<dyn TxEngine> {
        &self.engine
    }

    pub async fn state(&self) -> TxFlowState {
        self.inner.lock().await.state
    }

    pub async fn pending_tx(&self) -> Option<PendingTx> {
        self.inner.lock().await.pending.clone()
    }

    /// 取消当前活动步骤
    pub async fn cancel_active(&self) {
        if let Some(token) = self.active.lock().await.take() {
            token.cancel();
        }
    }

    /// 取消整个流程（包括之后的所有步骤）
    pub fn dispose(&self) {
        self.parent.cancel();
    }

    async fn begin_step(&self) -> CoreResult<CancellationToken> {
        if self.parent.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.cancel();
        }
        let token = self.parent.child_token();
        *active = Some(token.clone());
        Ok(token)
    }

    async fn current(&self) -> CoreResult<(TxFlowState, PendingTx)> {
        let (state, pending, _) = self.snapshot().await?;
        Ok((state, pending))
    }

    async fn snapshot(&self) -> CoreResult<(TxFlowState, PendingTx, bool)> {
        let inner = self.inner.lock().await;
        let pending = inner
            .pending
            .clone()
            .ok_or(CoreError::NotInitialised("transaction flow"))?;
        Ok((inner.state, pending, inner.fully_validated))
    }

    fn require_transition(from: TxFlowState, to: TxFlowState) -> CoreResult<()> {
        if !from.can_transition_to(&to) {
            return Err(CoreError::IllegalStateTransition { from, to });
        }
        Ok(())
    }

    async fn run_cancellable<F>(token: &CancellationToken, step: F) -> CoreResult<PendingTx>
    where
        F: std::future::Future<Output = CoreResult<PendingTx>>,
    {
        tokio::select! {
            _ = token.cancelled() => Err(CoreError::Cancelled),
            result = step => result,
        }
    }

    /// 发布步骤结果；步骤已被取消时丢弃
    async fn publish(
        &self,
        token: &CancellationToken,
        next: PendingTx,
        state: TxFlowState,
        fully_validated: bool,
    ) -> CoreResult<PendingTx> {
        let mut inner = self.inner.lock().await;
        if token.is_cancelled() {
            tracing::debug!(flow_id = %self.id, "Discarding result of cancelled step");
            return Err(CoreError::Cancelled);
        }
        Self::require_transition(inner.state, state)?;
        inner.state = state;
        inner.pending = Some(next.clone());
        inner.fully_validated = fully_validated;
        Ok(next)
    }

    pub async fn initialise(&self) -> CoreResult<PendingTx> {
        let token = self.begin_step().await?;
        let tx = Self::run_cancellable(&token, self.engine.do_initialise_tx()).await?;

        let mut inner = self.inner.lock().await;
        if token.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        if inner.state != TxFlowState::Uninitialised {
            return Err(CoreError::IllegalStateTransition {
                from: inner.state,
                to: TxFlowState::Uninitialised,
            });
        }
        inner.pending = Some(tx.clone());
        tracing::debug!(flow_id = %self.id, asset = %self.engine.source_asset(), "Transaction flow initialised");
        Ok(tx)
    }

    pub async fn update_amount(&self, amount: CryptoValue) -> CoreResult<PendingTx> {
        let token = self.begin_step().await?;
        let (state, tx) = self.current().await?;
        Self::require_transition(state, TxFlowState::AmountSet)?;
        let next = Self::run_cancellable(&token, self.engine.do_update_amount(amount, tx)).await?;
        self.publish(&token, next, TxFlowState::AmountSet, false).await
    }

    pub async fn update_fee_level(
        &self,
        level: FeeLevel,
        custom_amount: Option<u64>,
    ) -> CoreResult<PendingTx> {
        let token = self.begin_step().await?;
        let (state, tx) = self.current().await?;
        Self::require_transition(state, TxFlowState::AmountSet)?;
        let next = Self::run_cancellable(
            &token,
            self.engine.do_update_fee_level(tx, level, custom_amount),
        )
        .await?;
        self.publish(&token, next, TxFlowState::AmountSet, false).await
    }

    /// 修改确认项（例如备注），不改变流程状态
    pub async fn update_option(&self, option: TxConfirmationValue) -> CoreResult<PendingTx> {
        let token = self.begin_step().await?;
        let (state, tx) = self.current().await?;
        if !state.accepts_input() {
            return Err(CoreError::IllegalStateTransition {
                from: state,
                to: TxFlowState::AmountSet,
            });
        }
        let next = Self::run_cancellable(&token, self.engine.do_option_update(tx, option)).await?;

        let mut inner = self.inner.lock().await;
        if token.is_cancelled() || inner.state != state {
            return Err(CoreError::Cancelled);
        }
        inner.pending = Some(next.clone());
        inner.fully_validated = false;
        Ok(next)
    }

    pub async fn validate_amount(&self) -> CoreResult<PendingTx> {
        self.validate(false).await
    }

    pub async fn validate_all(&self) -> CoreResult<PendingTx> {
        self.validate(true).await
    }

    async fn validate(&self, full: bool) -> CoreResult<PendingTx> {
        let token = self.begin_step().await?;
        let (state, tx) = self.current().await?;
        Self::require_transition(state, TxFlowState::Validated)?;
        let step = async {
            if full {
                self.engine.do_validate_all(tx).await
            } else {
                self.engine.do_validate_amount(tx).await
            }
        };
        let next = Self::run_cancellable(&token, step).await?;
        let passed = next.validation_state == ValidationState::CanExecute;
        let target = if passed {
            TxFlowState::Validated
        } else {
            TxFlowState::ValidationFailed
        };
        self.publish(&token, next, target, full && passed).await
    }

    pub async fn build_confirmations(&self) -> CoreResult<PendingTx> {
        let token = self.begin_step().await?;
        let (state, tx, fully_validated) = self.snapshot().await?;
        Self::require_transition(state, TxFlowState::ConfirmationsBuilt)?;
        if !fully_validated {
            return Err(CoreError::IllegalStateTransition {
                from: state,
                to: TxFlowState::ConfirmationsBuilt,
            });
        }
        let next = Self::run_cancellable(&token, self.engine.do_build_confirmations(tx)).await?;
        self.publish(&token, next, TxFlowState::ConfirmationsBuilt, true).await
    }

    /// 执行。先做一次完整复核，复核未通过时回到 VALIDATION_FAILED 且不广播。
    /// 进入 EXECUTING 后不再响应取消：广播后的交易可能仍会上链
    pub async fn execute(&self, second_password: Option<&str>) -> CoreResult<TxResult> {
        let token = self.begin_step().await?;
        let (state, tx) = self.current().await?;
        Self::require_transition(state, TxFlowState::Executing)?;
        if tx.validation_state != ValidationState::CanExecute {
            return Err(CoreError::IllegalStateTransition {
                from: state,
                to: TxFlowState::Executing,
            });
        }

        let checked = Self::run_cancellable(&token, self.engine.do_validate_all(tx)).await?;

        let tx = {
            let mut inner = self.inner.lock().await;
            if token.is_cancelled() || inner.state != state {
                return Err(CoreError::Cancelled);
            }
            if checked.validation_state != ValidationState::CanExecute {
                tracing::warn!(
                    flow_id = %self.id,
                    validation = ?checked.validation_state,
                    "Pre-execution check failed, transaction not broadcast"
                );
                let failure = checked.validation_state;
                inner.state = TxFlowState::ValidationFailed;
                inner.pending = Some(checked);
                inner.fully_validated = false;
                return Err(CoreError::NotExecutable(failure));
            }
            inner.state = TxFlowState::Executing;
            checked
        };

        let result = self.engine.do_execute(&tx, second_password).await;

        let mut inner = self.inner.lock().await;
        inner.state = match &result {
            Ok(TxResult::Hashed { .. }) => TxFlowState::HashedResult,
            Ok(TxResult::UnHashed { .. }) => TxFlowState::UnhashedResult,
            Err(_) => TxFlowState::ExecutionFailed,
        };
        inner.pending = None;
        self.active.lock().await.take();
        tracing::info!(flow_id = %self.id, state = %inner.state, "Transaction flow finished");
        result
    }
}
