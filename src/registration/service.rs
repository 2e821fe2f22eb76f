/// 注册服务
///
/// 同一时间只允许一个注册请求在进行中，新的 `subscribe` 会以 `RegisterError::Busy` 拒绝
use super::outcome::{interpret, RegistrationOutcome};
use super::request::RegistrationRequest;
use super::traits::Transport;
use crate::config::ConfigurationProvider;
use crate::device::DeviceInfo;
use crate::error::RegisterError;
use crate::user::{User, UserStore};
use crate::utils::make_attempt_id;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// 注册完成回调
pub type CompletionListener = Arc<dyn Fn(&RegistrationOutcome) + Send + Sync>;

/// 进行中请求占位
///
/// drop 时释放，覆盖所有退出路径（包括任务 panic）
struct InFlightSlot {
    slot: Arc<Mutex<Option<String>>>,
}

impl InFlightSlot {
    fn acquire(slot: &Arc<Mutex<Option<String>>>, attempt_id: &str) -> Result<Self, RegisterError> {
        let mut current = slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(running) = current.as_ref() {
            return Err(RegisterError::Busy {
                attempt_id: running.clone(),
            });
        }
        *current = Some(attempt_id.to_string());
        Ok(Self { slot: slot.clone() })
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        let mut current = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *current = None;
    }
}

/// 进行中的请求：请求本身和发起时捕获的用户
struct InFlightRequest {
    attempt_id: String,
    user: User,
    request: RegistrationRequest,
    _slot: InFlightSlot,
}

/// 等待中的注册
pub struct PendingRegistration {
    attempt_id: String,
    receiver: oneshot::Receiver<RegistrationOutcome>,
}

impl PendingRegistration {
    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    /// 等待注册结果
    pub async fn outcome(self) -> Result<RegistrationOutcome, RegisterError> {
        self.receiver.await.map_err(|_| RegisterError::Dropped)
    }
}

/// 注册服务
pub struct RegisterService {
    transport: Arc<dyn Transport>,
    configuration: Arc<dyn ConfigurationProvider>,
    device: Arc<dyn DeviceInfo>,
    store: Arc<dyn UserStore>,
    in_flight: Arc<Mutex<Option<String>>>,
    listener: Option<CompletionListener>,
}

impl RegisterService {
    pub fn new(
        transport: Arc<dyn Transport>,
        configuration: Arc<dyn ConfigurationProvider>,
        device: Arc<dyn DeviceInfo>,
        store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            transport,
            configuration,
            device,
            store,
            in_flight: Arc::new(Mutex::new(None)),
            listener: None,
        }
    }

    /// 注册完成回调，每次被接受的 `subscribe` 调用恰好触发一次
    pub fn on_registration_completed<F>(&mut self, listener: F)
    where
        F: Fn(&RegistrationOutcome) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
    }

    /// 是否有注册正在进行
    pub fn is_busy(&self) -> bool {
        self.in_flight
            .lock()
            .map(|current| current.is_some())
            .unwrap_or_else(|e| e.into_inner().is_some())
    }

    /// 向 Push Initiator 订阅
    ///
    /// 发出请求后立即返回，结果通过 `PendingRegistration` 和完成回调交付。
    /// 必须在 Tokio runtime 中调用。
    ///
    /// # 返回
    /// - `Err(RegisterError::Busy)`: 已有注册在进行中
    /// - `Err(RegisterError::Config)`: 无法获取配置
    pub fn subscribe(&self, user: &User, token: &str) -> Result<PendingRegistration, RegisterError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RegisterError::NoRuntime(e.to_string()))?;

        let attempt_id = make_attempt_id();
        let slot = InFlightSlot::acquire(&self.in_flight, &attempt_id).map_err(|e| {
            warn!("拒绝注册请求: {}", e);
            e
        })?;

        let config = self.configuration.current_configuration()?;
        let os_version = self.device.os_version();
        let model = self.device.model();
        if os_version.is_empty() || model.is_empty() {
            debug!("设备信息不完整: osversion='{}', model='{}'", os_version, model);
        }

        let request = RegistrationRequest::build(user, token, &config, &os_version, &model);
        info!("[{}] 发起订阅: {}", attempt_id, request.redacted());

        let in_flight = InFlightRequest {
            attempt_id: attempt_id.clone(),
            user: user.clone(),
            request,
            _slot: slot,
        };

        let (sender, receiver) = oneshot::channel();
        runtime.spawn(run_attempt(
            in_flight,
            self.transport.clone(),
            self.store.clone(),
            self.listener.clone(),
            sender,
        ));

        Ok(PendingRegistration {
            attempt_id,
            receiver,
        })
    }
}

async fn run_attempt(
    in_flight: InFlightRequest,
    transport: Arc<dyn Transport>,
    store: Arc<dyn UserStore>,
    listener: Option<CompletionListener>,
    sender: oneshot::Sender<RegistrationOutcome>,
) {
    let completion = transport.get(&in_flight.request).await;
    let interpretation = interpret(completion);
    let outcome = interpretation.outcome;

    if interpretation.persist_user {
        if let Err(e) = store.save(&in_flight.user).await {
            error!("[{}] 保存用户失败: {}", in_flight.attempt_id, e);
        }
    }

    if outcome.is_success() {
        info!("[{}] ✔ 订阅成功: {}", in_flight.attempt_id, in_flight.user.user_id);
    } else {
        warn!(
            "[{}] 订阅失败: code={}, description={}",
            in_flight.attempt_id,
            outcome.code(),
            outcome.description()
        );
    }

    // 先释放占位，回调中可以立即发起下一次注册
    let attempt_id = in_flight.attempt_id.clone();
    drop(in_flight);

    if let Some(listener) = listener {
        listener(&outcome);
    }

    if sender.send(outcome).is_err() {
        debug!("[{}] 调用方已不再等待结果", attempt_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Configuration, StaticConfigurationProvider};
    use crate::device::StaticDeviceInfo;
    use crate::error::StoreError;
    use crate::registration::traits::Completion;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct StubTransport {
        completion: Completion,
        requests: Mutex<Vec<RegistrationRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl StubTransport {
        fn new(completion: Completion) -> Self {
            Self {
                completion,
                requests: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(completion: Completion, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(completion)
            }
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn get(&self, request: &RegistrationRequest) -> Completion {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.completion.clone()
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserStore for RecordingStore {
        async fn save(&self, user: &User) -> Result<(), StoreError> {
            self.saved.lock().unwrap().push(user.clone());
            Ok(())
        }

        async fn current(&self) -> Result<Option<User>, StoreError> {
            Ok(self.saved.lock().unwrap().last().cloned())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl UserStore for FailingStore {
        async fn save(&self, _user: &User) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }

        async fn current(&self) -> Result<Option<User>, StoreError> {
            Ok(None)
        }
    }

    fn service_with(
        transport: Arc<StubTransport>,
        store: Arc<dyn UserStore>,
    ) -> RegisterService {
        RegisterService::new(
            transport,
            Arc::new(StaticConfigurationProvider::new(Configuration::new(
                "https://pi.example",
                "app1",
                true,
            ))),
            Arc::new(StaticDeviceInfo::new("10.3", "Z10")),
            store,
        )
    }

    fn alice() -> User {
        User::new("alice", "secret")
    }

    #[tokio::test]
    async fn test_success_persists_original_user() {
        let transport = Arc::new(StubTransport::new(Completion::success("rc=200")));
        let store = Arc::new(RecordingStore::default());
        let service = service_with(transport.clone(), store.clone());

        let outcome = service
            .subscribe(&alice(), "tok123")
            .unwrap()
            .outcome()
            .await
            .unwrap();

        assert_eq!(outcome, RegistrationOutcome::new(200, String::new()));
        assert_eq!(*store.saved.lock().unwrap(), vec![alice()]);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.target(), "https://pi.example/subscribe");
        assert_eq!(request.param("appid"), Some("app1"));
        assert_eq!(request.param("address"), Some("tok123"));
        assert_eq!(request.param("osversion"), Some("10.3"));
        assert_eq!(request.param("model"), Some("Z10"));
        assert_eq!(request.param("username"), Some("alice"));
        assert_eq!(request.param("password"), Some("secret"));
        assert_eq!(request.param("type"), Some("public"));
    }

    #[tokio::test]
    async fn test_bad_credentials_do_not_persist() {
        let transport = Arc::new(StubTransport::new(Completion::success("rc=10026")));
        let store = Arc::new(RecordingStore::default());
        let service = service_with(transport, store.clone());

        let outcome = service
            .subscribe(&alice(), "tok123")
            .unwrap()
            .outcome()
            .await
            .unwrap();

        assert_eq!(outcome.code(), 10026);
        assert_eq!(
            outcome.description(),
            "Error: The username or password specified was incorrect."
        );
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_reported_verbatim() {
        let transport = Arc::new(StubTransport::new(Completion::failure(7, "Connection refused")));
        let store = Arc::new(RecordingStore::default());
        let service = service_with(transport, store.clone());

        let outcome = service
            .subscribe(&alice(), "tok123")
            .unwrap()
            .outcome()
            .await
            .unwrap();

        assert_eq!(outcome, RegistrationOutcome::new(7, "Connection refused".to_string()));
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listener_fires_once_per_attempt() {
        for completion in [
            Completion::success("rc=200"),
            Completion::success("rc=10001"),
            Completion::success("garbage"),
            Completion::failure(3, "Host not found"),
        ] {
            let transport = Arc::new(StubTransport::new(completion));
            let mut service = service_with(transport, Arc::new(RecordingStore::default()));

            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            service.on_registration_completed(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

            service
                .subscribe(&alice(), "tok123")
                .unwrap()
                .outcome()
                .await
                .unwrap();

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(!service.is_busy());
        }
    }

    #[tokio::test]
    async fn test_second_subscribe_rejected_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(StubTransport::gated(Completion::success("rc=200"), gate.clone()));
        let store = Arc::new(RecordingStore::default());
        let service = service_with(transport.clone(), store.clone());

        let first = service.subscribe(&alice(), "tok123").unwrap();
        assert!(service.is_busy());

        match service.subscribe(&User::new("bob", "pw"), "tok456") {
            Err(RegisterError::Busy { attempt_id }) => assert_eq!(attempt_id, first.attempt_id()),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("second subscribe should be rejected"),
        }

        gate.notify_one();
        let outcome = first.outcome().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(*store.saved.lock().unwrap(), vec![alice()]);
        assert_eq!(transport.requests.lock().unwrap().len(), 1);

        // 上一次完成后可以再次注册
        gate.notify_one();
        let again = service
            .subscribe(&User::new("bob", "pw"), "tok456")
            .unwrap()
            .outcome()
            .await
            .unwrap();
        assert!(again.is_success());
    }

    #[tokio::test]
    async fn test_captured_user_is_persisted() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(StubTransport::gated(Completion::success("rc=200"), gate.clone()));
        let store = Arc::new(RecordingStore::default());
        let service = service_with(transport, store.clone());

        let mut user = alice();
        let pending = service.subscribe(&user, "tok123").unwrap();
        user.password = "changed".to_string();

        gate.notify_one();
        pending.outcome().await.unwrap();

        assert_eq!(*store.saved.lock().unwrap(), vec![alice()]);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_change_outcome() {
        let transport = Arc::new(StubTransport::new(Completion::success("rc=200")));
        let service = service_with(transport, Arc::new(FailingStore));

        let outcome = service
            .subscribe(&alice(), "tok123")
            .unwrap()
            .outcome()
            .await
            .unwrap();

        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_fire_and_forget_still_notifies_listener() {
        let transport = Arc::new(StubTransport::new(Completion::success("rc=-9999")));
        let mut service = service_with(transport, Arc::new(RecordingStore::default()));

        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        service.on_registration_completed(move |outcome| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(outcome.clone());
            }
        });

        drop(service.subscribe(&alice(), "tok123").unwrap());

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.code(), -9999);
    }

    #[test]
    fn test_subscribe_without_runtime() {
        let transport = Arc::new(StubTransport::new(Completion::success("rc=200")));
        let service = service_with(transport, Arc::new(RecordingStore::default()));

        assert!(matches!(
            service.subscribe(&alice(), "tok123"),
            Err(RegisterError::NoRuntime(_))
        ));
        assert!(!service.is_busy());
    }
}
