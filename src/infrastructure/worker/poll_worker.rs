//! Poll Worker - 轮询 → 推理 → 上链
//!
//! 状态机:
//! Idle → Fetching → Processing(task) → Submitting(task) → Processing(next) / Idle
//! 终止状态 Stopped（单次模式跑完一轮，或收到终止信号）
//!
//! 单个任务失败只记录日志，不影响同一轮中的其他任务
//!
//! 已广播但等待回执超时的交易记入 in-flight 表，之后的轮次只查询该交易，
//! 确认后标记完成，回滚或被丢弃时才重新提交

use alloy::primitives::Address;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    ChainReaderPort, LlmClientPort, RegistryPort, ResponseSubmitterPort, SearchPort,
    SubmissionError,
};
use crate::domain::{
    build_prompt, is_prediction_market_question, Answer, ConfirmationStatus, Task, TaskId,
};

/// Worker 配置
#[derive(Debug, Clone)]
pub struct PollWorkerConfig {
    /// 两轮之间的等待时间
    pub interval: Duration,
    /// 只执行一轮
    pub run_once: bool,
    /// 推理使用的模型
    pub model: String,
    /// 只处理预测市场问题
    pub market_tasks_only: bool,
}

impl Default for PollWorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            run_once: false,
            model: "openai/gpt-3.5-turbo".to_string(),
            market_tasks_only: false,
        }
    }
}

/// 轮询状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    Processing(TaskId),
    Submitting(TaskId),
    Stopped,
}

/// 单轮统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub fetched: usize,
    pub submitted: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// 整个运行期间的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: u64,
    pub submitted: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, report: &PassReport) {
        self.passes += 1;
        self.submitted += report.submitted;
        self.failed += report.failed;
    }
}

enum TaskOutcome {
    Submitted,
    Skipped,
    Failed,
}

/// 轮询 Worker
///
/// 单个 tokio 任务内顺序处理；`handled` 在进程生命周期内保留
pub struct PollWorker {
    config: PollWorkerConfig,
    chain_reader: Arc<dyn ChainReaderPort>,
    llm: Arc<dyn LlmClientPort>,
    submitter: Arc<dyn ResponseSubmitterPort>,
    search: Option<Arc<dyn SearchPort>>,
    registry: Option<(Arc<dyn RegistryPort>, Address)>,
    handled: HashSet<TaskId>,
    /// 已广播、尚未确认的交易
    in_flight: HashMap<TaskId, String>,
    state: PollState,
    shutdown: CancellationToken,
}

impl PollWorker {
    pub fn new(
        config: PollWorkerConfig,
        chain_reader: Arc<dyn ChainReaderPort>,
        llm: Arc<dyn LlmClientPort>,
        submitter: Arc<dyn ResponseSubmitterPort>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            chain_reader,
            llm,
            submitter,
            search: None,
            registry: None,
            handled: HashSet::new(),
            in_flight: HashMap::new(),
            state: PollState::Idle,
            shutdown,
        }
    }

    /// 启用搜索增强
    pub fn with_search(mut self, search: Arc<dyn SearchPort>) -> Self {
        self.search = Some(search);
        self
    }

    /// 启动时检查注册状态
    pub fn with_registry(mut self, registry: Arc<dyn RegistryPort>, agent: Address) -> Self {
        self.registry = Some((registry, agent));
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_handled(&self, id: TaskId) -> bool {
        self.handled.contains(&id)
    }

    /// 任务尚未确认的交易 hash
    pub fn in_flight(&self, id: TaskId) -> Option<&str> {
        self.in_flight.get(&id).map(String::as_str)
    }

    fn mark_handled(&mut self, id: TaskId) {
        self.in_flight.remove(&id);
        self.handled.insert(id);
    }

    /// 未注册时注册 Agent；失败只记录日志
    pub async fn ensure_registered(&self) {
        let Some((registry, agent)) = &self.registry else {
            return;
        };

        match registry.is_registered(*agent).await {
            Ok(true) => {
                tracing::info!(agent = %agent, "Agent already registered");
            }
            Ok(false) => {
                tracing::info!(agent = %agent, "Agent not registered, registering");
                if let Err(e) = registry.register(*agent).await {
                    tracing::error!(agent = %agent, error = %e, "Agent registration failed");
                }
            }
            Err(e) => {
                tracing::error!(agent = %agent, error = %e, "Failed to check registration");
            }
        }
    }

    /// 启动轮询循环，直到单次模式完成或收到终止信号
    pub async fn run(&mut self) -> RunSummary {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            run_once = self.config.run_once,
            model = %self.config.model,
            "PollWorker started"
        );

        self.ensure_registered().await;

        let mut summary = RunSummary::default();
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let report = self.run_pass().await;
            summary.record(&report);

            if self.config.run_once {
                tracing::info!("Run-once pass complete");
                break;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        self.state = PollState::Stopped;
        tracing::info!(
            passes = summary.passes,
            submitted = summary.submitted,
            failed = summary.failed,
            "PollWorker stopped"
        );
        summary
    }

    /// 执行一轮：拉取任务并逐个处理
    pub async fn run_pass(&mut self) -> PassReport {
        let mut report = PassReport::default();

        self.state = PollState::Fetching;
        let tasks = match self.chain_reader.list_pending_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(stage = "fetch", error = %e, "Failed to fetch pending tasks");
                self.state = PollState::Idle;
                return report;
            }
        };
        report.fetched = tasks.len();
        tracing::debug!(count = tasks.len(), "Fetched pending tasks");

        for task in tasks {
            if self.shutdown.is_cancelled() {
                tracing::info!("Shutdown requested, ending pass early");
                break;
            }

            match self.process_task(&task).await {
                TaskOutcome::Submitted => report.submitted += 1,
                TaskOutcome::Skipped => report.skipped += 1,
                TaskOutcome::Failed => report.failed += 1,
            }
        }

        self.state = PollState::Idle;
        if report.fetched > 0 {
            tracing::info!(
                fetched = report.fetched,
                submitted = report.submitted,
                failed = report.failed,
                skipped = report.skipped,
                "Pass complete"
            );
        }
        report
    }

    async fn process_task(&mut self, task: &Task) -> TaskOutcome {
        let id = task.id();

        if self.handled.contains(&id) {
            return TaskOutcome::Skipped;
        }

        if !task.status().is_pending() {
            tracing::debug!(task_id = %id, status = %task.status(), "Task not pending, skipping");
            self.mark_handled(id);
            return TaskOutcome::Skipped;
        }

        if task.is_expired(Utc::now()) {
            tracing::info!(task_id = %id, deadline = ?task.deadline(), "Task deadline passed, skipping");
            self.mark_handled(id);
            return TaskOutcome::Skipped;
        }

        if self.config.market_tasks_only && !is_prediction_market_question(task.prompt()) {
            tracing::info!(task_id = %id, "Not a prediction market question, skipping");
            self.mark_handled(id);
            return TaskOutcome::Skipped;
        }

        if let Some(outcome) = self.check_in_flight(id).await {
            return outcome;
        }

        self.state = PollState::Processing(id);
        tracing::info!(task_id = %id, question = %task.prompt(), "Processing task");

        let prompt = self.prompt_for(task).await;
        let text = match self.llm.generate(&prompt, &self.config.model).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(task_id = %id, stage = "generate", error = %e, "Task failed");
                return TaskOutcome::Failed;
            }
        };
        let answer = Answer::new(id, text, self.config.model.clone());

        self.state = PollState::Submitting(id);
        match self.submitter.submit_answer(task, &answer).await {
            Ok(receipt) => {
                self.mark_handled(id);
                tracing::info!(
                    task_id = %id,
                    decision = %answer.decision,
                    tx_hash = %receipt.tx_hash,
                    block_number = ?receipt.block_number,
                    confirmed = receipt.is_confirmed(),
                    "Answer submitted"
                );
                TaskOutcome::Submitted
            }
            Err(SubmissionError::Timeout(tx_hash)) => {
                tracing::warn!(
                    task_id = %id,
                    tx_hash = %tx_hash,
                    "Answer broadcast but not yet confirmed, will check again next pass"
                );
                self.in_flight.insert(id, tx_hash);
                TaskOutcome::Failed
            }
            Err(e) => {
                tracing::error!(task_id = %id, stage = "submit", error = %e, "Task failed");
                TaskOutcome::Failed
            }
        }
    }

    /// 检查任务先前广播的交易
    ///
    /// 返回 None 表示没有待确认的交易，或该交易已回滚/被丢弃，可以重新提交
    async fn check_in_flight(&mut self, id: TaskId) -> Option<TaskOutcome> {
        let tx_hash = self.in_flight.get(&id)?.clone();

        match self.submitter.submission_status(&tx_hash).await {
            Ok(Some(receipt)) if receipt.is_confirmed() => {
                tracing::info!(
                    task_id = %id,
                    tx_hash = %tx_hash,
                    block_number = ?receipt.block_number,
                    "Earlier answer confirmed"
                );
                self.mark_handled(id);
                Some(TaskOutcome::Submitted)
            }
            Ok(Some(receipt)) if receipt.status == ConfirmationStatus::Pending => {
                tracing::debug!(task_id = %id, tx_hash = %tx_hash, "Earlier answer still pending");
                Some(TaskOutcome::Skipped)
            }
            Ok(Some(_)) => {
                tracing::warn!(task_id = %id, tx_hash = %tx_hash, "Earlier answer reverted, resubmitting");
                self.in_flight.remove(&id);
                None
            }
            Ok(None) => {
                tracing::warn!(task_id = %id, tx_hash = %tx_hash, "Earlier answer dropped, resubmitting");
                self.in_flight.remove(&id);
                None
            }
            Err(e) => {
                tracing::warn!(
                    task_id = %id,
                    tx_hash = %tx_hash,
                    error = %e,
                    "Failed to check earlier answer, will retry next pass"
                );
                Some(TaskOutcome::Skipped)
            }
        }
    }

    /// 构建提示词；搜索失败时使用不带上下文的提示词
    async fn prompt_for(&self, task: &Task) -> String {
        let Some(search) = &self.search else {
            return build_prompt(task.prompt(), None);
        };

        match search.search(task.prompt()).await {
            Ok(results) => {
                tracing::debug!(task_id = %task.id(), results = results.len(), "Search context added");
                build_prompt(task.prompt(), Some(&results))
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id(), error = %e, "Search failed, using base prompt");
                build_prompt(task.prompt(), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        AgentDetails, ChainError, GenerationError, RegistryError, SearchError,
    };
    use crate::domain::{SearchSnippet, SubmissionReceipt, TaskStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ========== Fakes ==========

    #[derive(Default)]
    struct FakeChainReader {
        tasks: Vec<Task>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainReaderPort for FakeChainReader {
        async fn list_pending_tasks(&self) -> Result<Vec<Task>, ChainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ChainError::Connection("node down".to_string()));
            }
            Ok(self.tasks.clone())
        }
    }

    /// 提示词包含 FAIL 时返回错误
    #[derive(Default)]
    struct FakeLlm {
        prompts: Mutex<Vec<String>>,
    }

    impl FakeLlm {
        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmClientPort for FakeLlm {
        async fn generate(&self, prompt: &str, _model: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if prompt.contains("FAIL") {
                return Err(GenerationError::Service {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok("YES, it will.".to_string())
        }
    }

    /// `timeout` 时记录广播后返回 Timeout；`tx_state` 为 None 表示交易已被丢弃
    #[derive(Default)]
    struct FakeSubmitter {
        submitted: Mutex<Vec<TaskId>>,
        fail: bool,
        timeout: bool,
        tx_state: Mutex<Option<ConfirmationStatus>>,
        status_calls: AtomicUsize,
    }

    impl FakeSubmitter {
        fn ids(&self) -> Vec<u32> {
            self.submitted.lock().unwrap().iter().map(|id| id.value()).collect()
        }
    }

    #[async_trait]
    impl ResponseSubmitterPort for FakeSubmitter {
        async fn submit_answer(
            &self,
            task: &Task,
            _answer: &Answer,
        ) -> Result<SubmissionReceipt, SubmissionError> {
            if self.fail {
                return Err(SubmissionError::NonceConflict("nonce too low".to_string()));
            }
            self.submitted.lock().unwrap().push(task.id());
            let tx_hash = format!("0x{:064x}", task.id().value());
            if self.timeout {
                return Err(SubmissionError::Timeout(tx_hash));
            }
            let mut receipt = SubmissionReceipt::pending(tx_hash);
            receipt.confirm(Some(100));
            Ok(receipt)
        }

        async fn submission_status(
            &self,
            tx_hash: &str,
        ) -> Result<Option<SubmissionReceipt>, SubmissionError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let Some(state) = *self.tx_state.lock().unwrap() else {
                return Ok(None);
            };
            let mut receipt = SubmissionReceipt::pending(tx_hash);
            match state {
                ConfirmationStatus::Confirmed => receipt.confirm(Some(101)),
                ConfirmationStatus::Reverted => receipt.revert(Some(101)),
                ConfirmationStatus::Pending => {}
            }
            Ok(Some(receipt))
        }
    }

    struct FakeSearch {
        fail: bool,
    }

    #[async_trait]
    impl SearchPort for FakeSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchSnippet>, SearchError> {
            if self.fail {
                return Err(SearchError::Network("unreachable".to_string()));
            }
            Ok(vec![SearchSnippet {
                title: "Recent news".to_string(),
                content: "Something happened".to_string(),
                url: "https://news.example/1".to_string(),
            }])
        }
    }

    struct FakeRegistry {
        registered: bool,
        register_calls: AtomicUsize,
    }

    #[async_trait]
    impl RegistryPort for FakeRegistry {
        async fn is_registered(&self, _agent: Address) -> Result<bool, RegistryError> {
            Ok(self.registered)
        }

        async fn register(&self, _agent: Address) -> Result<SubmissionReceipt, RegistryError> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SubmissionReceipt::pending("0x01"))
        }

        async fn list_agents(&self) -> Result<Vec<Address>, RegistryError> {
            Ok(Vec::new())
        }

        async fn agent_details(&self, _agent: Address) -> Result<AgentDetails, RegistryError> {
            Err(RegistryError::Read(ChainError::Contract("unused".to_string())))
        }
    }

    // ========== Helpers ==========

    fn task(id: u32, prompt: &str) -> Task {
        Task::new(TaskId::new(id), prompt, TaskStatus::Pending, 1).unwrap()
    }

    fn config(run_once: bool) -> PollWorkerConfig {
        PollWorkerConfig {
            interval: Duration::from_millis(10),
            run_once,
            ..Default::default()
        }
    }

    struct Harness {
        reader: Arc<FakeChainReader>,
        llm: Arc<FakeLlm>,
        submitter: Arc<FakeSubmitter>,
        worker: PollWorker,
    }

    fn harness(reader: FakeChainReader, submitter: FakeSubmitter, config: PollWorkerConfig) -> Harness {
        let reader = Arc::new(reader);
        let llm = Arc::new(FakeLlm::default());
        let submitter = Arc::new(submitter);
        let worker = PollWorker::new(
            config,
            reader.clone(),
            llm.clone(),
            submitter.clone(),
            CancellationToken::new(),
        );
        Harness {
            reader,
            llm,
            submitter,
            worker,
        }
    }

    fn reader_with(tasks: Vec<Task>) -> FakeChainReader {
        FakeChainReader {
            tasks,
            ..Default::default()
        }
    }

    // ========== Tests ==========

    #[tokio::test]
    async fn test_empty_task_list_makes_no_calls() {
        let mut h = harness(reader_with(vec![]), FakeSubmitter::default(), config(true));

        let report = h.worker.run_pass().await;

        assert_eq!(report, PassReport::default());
        assert_eq!(h.llm.calls(), 0);
        assert!(h.submitter.ids().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_isolated_to_task() {
        let tasks = vec![
            task(1, "Will BTC rise?"),
            task(2, "FAIL this one"),
            task(3, "Will ETH rise?"),
        ];
        let mut h = harness(reader_with(tasks), FakeSubmitter::default(), config(true));

        let report = h.worker.run_pass().await;

        assert_eq!(h.submitter.ids(), vec![1, 3]);
        assert_eq!(h.llm.calls(), 3);
        assert_eq!(report.fetched, 3);
        assert_eq!(report.submitted, 2);
        assert_eq!(report.failed, 1);
        assert!(h.worker.is_handled(TaskId::new(1)));
        assert!(!h.worker.is_handled(TaskId::new(2)));
        assert_eq!(h.worker.state(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_submitted_task_not_resubmitted() {
        let mut h = harness(
            reader_with(vec![task(7, "Will it rain?")]),
            FakeSubmitter::default(),
            config(false),
        );

        let first = h.worker.run_pass().await;
        let second = h.worker.run_pass().await;

        assert_eq!(first.submitted, 1);
        assert_eq!(second.submitted, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(h.submitter.ids(), vec![7]);
        assert_eq!(h.llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_submission_retried_next_pass() {
        let failing = FakeSubmitter {
            fail: true,
            ..Default::default()
        };
        let mut h = harness(reader_with(vec![task(4, "Q?")]), failing, config(false));

        assert_eq!(h.worker.run_pass().await.failed, 1);
        assert_eq!(h.worker.run_pass().await.failed, 1);
        assert!(!h.worker.is_handled(TaskId::new(4)));
        assert_eq!(h.llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_run_once_performs_single_pass() {
        let mut h = harness(
            reader_with(vec![task(1, "Q?")]),
            FakeSubmitter::default(),
            PollWorkerConfig {
                interval: Duration::from_secs(3600),
                run_once: true,
                ..Default::default()
            },
        );

        let summary = h.worker.run().await;

        assert_eq!(summary.passes, 1);
        assert_eq!(summary.submitted, 1);
        assert_eq!(h.reader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.worker.state(), PollState::Stopped);
    }

    #[tokio::test]
    async fn test_fetch_failure_ends_pass() {
        let reader = FakeChainReader {
            fail: true,
            ..Default::default()
        };
        let mut h = harness(reader, FakeSubmitter::default(), config(true));

        let summary = h.worker.run().await;

        assert_eq!(summary.passes, 1);
        assert_eq!(summary.submitted, 0);
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_pending_and_expired_tasks_skipped() {
        let answered = Task::new(TaskId::new(1), "Old question", TaskStatus::Answered, 1).unwrap();
        let expired = task(2, "Late question").with_deadline(Utc::now() - chrono::Duration::minutes(5));
        let mut h = harness(
            reader_with(vec![answered, expired, task(3, "Fresh question")]),
            FakeSubmitter::default(),
            config(true),
        );

        let report = h.worker.run_pass().await;

        assert_eq!(report.skipped, 2);
        assert_eq!(h.submitter.ids(), vec![3]);
        assert!(h.worker.is_handled(TaskId::new(1)));
        assert!(h.worker.is_handled(TaskId::new(2)));
    }

    #[tokio::test]
    async fn test_market_filter() {
        let mut h = harness(
            reader_with(vec![
                task(1, "Summarise this article"),
                task(2, "Prediction market question: Will BTC exceed $100k?"),
            ]),
            FakeSubmitter::default(),
            PollWorkerConfig {
                market_tasks_only: true,
                ..config(true)
            },
        );

        let report = h.worker.run_pass().await;

        assert_eq!(report.skipped, 1);
        assert_eq!(h.submitter.ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_search_context_added_to_prompt() {
        let h = harness(reader_with(vec![task(1, "Q?")]), FakeSubmitter::default(), config(true));
        let llm = h.llm.clone();
        let mut worker = h.worker.with_search(Arc::new(FakeSearch { fail: false }));

        worker.run_pass().await;

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Web search results:"));
        assert!(prompts[0].contains("Source: https://news.example/1"));
    }

    #[tokio::test]
    async fn test_search_failure_falls_back_to_base_prompt() {
        let h = harness(reader_with(vec![task(1, "Q?")]), FakeSubmitter::default(), config(true));
        let llm = h.llm.clone();
        let submitter = h.submitter.clone();
        let mut worker = h.worker.with_search(Arc::new(FakeSearch { fail: true }));

        worker.run_pass().await;

        assert_eq!(llm.prompts.lock().unwrap()[0], build_prompt("Q?", None));
        assert_eq!(submitter.ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_no_pass() {
        let mut h = harness(reader_with(vec![task(1, "Q?")]), FakeSubmitter::default(), config(false));
        h.worker.shutdown.cancel();

        let summary = h.worker.run().await;

        assert_eq!(summary.passes, 0);
        assert_eq!(h.reader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.worker.state(), PollState::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_sleep() {
        let mut h = harness(
            reader_with(vec![]),
            FakeSubmitter::default(),
            PollWorkerConfig {
                interval: Duration::from_secs(3600),
                ..config(false)
            },
        );
        let token = h.worker.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let summary = h.worker.run().await;

        assert_eq!(summary.passes, 1);
        assert_eq!(h.worker.state(), PollState::Stopped);
    }

    #[tokio::test]
    async fn test_registers_when_not_registered() {
        let registry = Arc::new(FakeRegistry {
            registered: false,
            register_calls: AtomicUsize::new(0),
        });
        let h = harness(reader_with(vec![]), FakeSubmitter::default(), config(true));
        let worker = h.worker.with_registry(registry.clone(), Address::repeat_byte(0xaa));

        worker.ensure_registered().await;
        assert_eq!(registry.register_calls.load(Ordering::SeqCst), 1);

        let already = Arc::new(FakeRegistry {
            registered: true,
            register_calls: AtomicUsize::new(0),
        });
        let worker = worker.with_registry(already.clone(), Address::repeat_byte(0xaa));
        worker.ensure_registered().await;
        assert_eq!(already.register_calls.load(Ordering::SeqCst), 0);
    }

    fn timing_out(state: Option<ConfirmationStatus>) -> FakeSubmitter {
        FakeSubmitter {
            timeout: true,
            tx_state: Mutex::new(state),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unconfirmed_broadcast_not_repeated() {
        let mut h = harness(
            reader_with(vec![task(5, "Will it snow?")]),
            timing_out(Some(ConfirmationStatus::Pending)),
            config(false),
        );

        let first = h.worker.run_pass().await;
        let second = h.worker.run_pass().await;

        assert_eq!(first.failed, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(h.submitter.ids(), vec![5]);
        assert_eq!(h.llm.calls(), 1);
        assert_eq!(h.submitter.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.worker.in_flight(TaskId::new(5)), Some(format!("0x{:064x}", 5).as_str()));
        assert!(!h.worker.is_handled(TaskId::new(5)));

        *h.submitter.tx_state.lock().unwrap() = Some(ConfirmationStatus::Confirmed);
        let third = h.worker.run_pass().await;

        assert_eq!(third.submitted, 1);
        assert_eq!(h.submitter.ids(), vec![5]);
        assert!(h.worker.is_handled(TaskId::new(5)));
        assert_eq!(h.worker.in_flight(TaskId::new(5)), None);
    }

    #[tokio::test]
    async fn test_dropped_broadcast_resubmitted() {
        let mut h = harness(
            reader_with(vec![task(5, "Will it snow?")]),
            timing_out(None),
            config(false),
        );

        h.worker.run_pass().await;
        h.worker.run_pass().await;

        assert_eq!(h.submitter.ids(), vec![5, 5]);
        assert_eq!(h.llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_reverted_broadcast_resubmitted() {
        let mut h = harness(
            reader_with(vec![task(6, "Will it hail?")]),
            timing_out(Some(ConfirmationStatus::Reverted)),
            config(false),
        );

        h.worker.run_pass().await;
        h.worker.run_pass().await;

        assert_eq!(h.submitter.ids(), vec![6, 6]);
        assert!(!h.worker.is_handled(TaskId::new(6)));
    }

    #[tokio::test]
    async fn test_in_flight_cleared_when_task_no_longer_pending() {
        let mut h = harness(
            reader_with(vec![task(8, "Will it fog?")]),
            timing_out(Some(ConfirmationStatus::Pending)),
            config(false),
        );
        h.worker.run_pass().await;
        assert!(h.worker.in_flight(TaskId::new(8)).is_some());

        let answered = Task::new(TaskId::new(8), "Will it fog?", TaskStatus::Answered, 1).unwrap();
        let reader: Arc<dyn ChainReaderPort> = Arc::new(reader_with(vec![answered]));
        h.worker.chain_reader = reader;
        h.worker.run_pass().await;

        assert!(h.worker.is_handled(TaskId::new(8)));
        assert_eq!(h.worker.in_flight(TaskId::new(8)), None);
        assert_eq!(h.submitter.status_calls.load(Ordering::SeqCst), 0);
    }
}
