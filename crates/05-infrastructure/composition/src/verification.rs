//! 作用域校验管道
//!
//! 每个校验方法在调用时返回一个惰性的结果流。管道按顺序依次拉取各个结果流，
//! 把它们串联成一个流：
//!
//! - 校验方法抛出的错误（包括 panic）被包装为 [`VerificationError::Failed`]，
//!   原始错误保留为 `source`，之后不再产生任何结果
//! - 已经是 [`VerificationError`] 的错误原样传递
//! - 取消永远以 [`VerificationError::Canceled`] 的形式出现，不会被包装
//! - 每次拉取前先检查取消请求

use di_abstractions::{ComponentRegistry, ComponentRegistryExt, ComponentResolver, ResolverExt};
use futures::future::FutureExt;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use futures::{Future, Stream};
use infrastructure_common::{BoxError, DependencyResult, VerificationError, VerificationOutcome};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 单条校验结果
#[derive(Debug, Clone)]
pub struct VerificationResult {
    message: String,
    error: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl VerificationResult {
    /// 创建普通结果
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    /// 创建携带失败信息的结果
    ///
    /// 与校验方法直接返回错误不同，这类结果只是被记录，不会中断管道。
    pub fn failure(message: impl Into<String>, error: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            error: Some(Arc::from(error.into())),
        }
    }

    /// 结果消息
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 失败信息
    pub fn error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.error.as_deref()
    }

    /// 是否携带失败信息
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&str> for VerificationResult {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for VerificationResult {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<VerificationResult> for String {
    fn from(result: VerificationResult) -> Self {
        result.message
    }
}

/// 校验方法返回的结果流
pub type VerificationStream = BoxStream<'static, Result<VerificationResult, BoxError>>;

type Routine = Arc<dyn Fn(CancellationToken) -> Result<VerificationStream, BoxError> + Send + Sync>;

/// 校验方法
///
/// 每次调用都返回一个新的结果流。可以注册到作用域中，
/// 由 [`VerificationScopeExt::execute_verification_methods`] 统一执行。
#[derive(Clone)]
pub struct VerificationDelegate {
    name: String,
    routine: Routine,
}

impl VerificationDelegate {
    /// 从返回结果流的函数创建，函数本身也可以同步失败
    pub fn new<F>(name: impl Into<String>, routine: F) -> Self
    where
        F: Fn(CancellationToken) -> Result<VerificationStream, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            routine: Arc::new(routine),
        }
    }

    /// 从返回任意结果流的函数创建
    pub fn from_stream<F, S>(name: impl Into<String>, routine: F) -> Self
    where
        F: Fn(CancellationToken) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<VerificationResult, BoxError>> + Send + 'static,
    {
        Self::new(name, move |token| Ok(routine(token).boxed()))
    }

    /// 从一次性产生全部结果的异步函数创建
    pub fn from_future<F, Fut>(name: impl Into<String>, routine: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<VerificationResult>, BoxError>> + Send + 'static,
    {
        Self::from_stream(name, move |token| {
            stream::once(routine(token))
                .map_ok(|results| stream::iter(results.into_iter().map(Ok::<_, BoxError>)))
                .try_flatten()
        })
    }

    /// 校验方法名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 调用校验方法，得到新的结果流
    pub fn invoke(&self, token: CancellationToken) -> Result<VerificationStream, BoxError> {
        (self.routine)(token)
    }
}

impl fmt::Debug for VerificationDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationDelegate")
            .field("name", &self.name)
            .field("routine", &"<function>")
            .finish()
    }
}

/// 校验方法发生 panic
#[derive(Debug, Error)]
#[error("校验方法 {routine} 发生 panic: {message}")]
pub struct RoutinePanicked {
    /// 校验方法名称
    pub routine: String,
    /// panic 信息
    pub message: String,
}

impl RoutinePanicked {
    fn from_payload(routine: &str, payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "未知 panic".to_string());
        Self {
            routine: routine.to_string(),
            message,
        }
    }
}

/// 检查取消请求，供校验方法在挂起点调用
pub fn ensure_not_canceled(token: &CancellationToken) -> VerificationOutcome<()> {
    if token.is_cancelled() {
        return Err(VerificationError::Canceled);
    }
    Ok(())
}

/// 依次执行校验方法，把它们的结果串联为一个流
pub fn run_verifications<I>(
    delegates: I,
    token: CancellationToken,
) -> BoxStream<'static, VerificationOutcome<VerificationResult>>
where
    I: IntoIterator<Item = VerificationDelegate>,
{
    let delegates: Vec<VerificationDelegate> = delegates.into_iter().collect();
    if delegates.is_empty() {
        return stream::empty().boxed();
    }
    debug!("开始执行 {} 个校验方法", delegates.len());

    let pipeline = Pipeline {
        pending: delegates.into_iter(),
        running: None,
        token,
        finished: false,
    };
    stream::unfold(pipeline, |mut pipeline| async move {
        let item = pipeline.next().await?;
        Some((item, pipeline))
    })
    .boxed()
}

struct Running {
    name: String,
    stream: VerificationStream,
}

struct Pipeline {
    pending: std::vec::IntoIter<VerificationDelegate>,
    running: Option<Running>,
    token: CancellationToken,
    finished: bool,
}

enum Pull {
    Canceled,
    Polled(std::thread::Result<Option<Result<VerificationResult, BoxError>>>),
}

impl Pipeline {
    async fn next(&mut self) -> Option<VerificationOutcome<VerificationResult>> {
        if self.finished {
            return None;
        }
        loop {
            if self.token.is_cancelled() {
                return self.fail(VerificationError::Canceled);
            }

            if self.running.is_none() {
                let delegate = self.pending.next()?;
                match self.start(&delegate) {
                    Ok(stream) => {
                        self.running = Some(Running {
                            name: delegate.name,
                            stream,
                        });
                    }
                    Err(e) => return self.fail(e),
                }
            }

            let pull = match self.running.as_mut() {
                Some(running) => {
                    tokio::select! {
                        biased;
                        _ = self.token.cancelled() => Pull::Canceled,
                        polled = AssertUnwindSafe(running.stream.next()).catch_unwind() => {
                            Pull::Polled(polled)
                        }
                    }
                }
                None => continue,
            };

            match pull {
                Pull::Canceled => return self.fail(VerificationError::Canceled),
                Pull::Polled(Ok(Some(Ok(result)))) => return Some(Ok(result)),
                Pull::Polled(Ok(Some(Err(e)))) => {
                    let error = self.normalize(e);
                    return self.fail(error);
                }
                Pull::Polled(Ok(None)) => {
                    if let Some(running) = self.running.take() {
                        debug!("校验方法 {} 执行完成", running.name);
                    }
                }
                Pull::Polled(Err(payload)) => {
                    let name = self.running_name();
                    let error = VerificationError::wrap(
                        &name,
                        Box::new(RoutinePanicked::from_payload(&name, payload)),
                    );
                    return self.fail(error);
                }
            }
        }
    }

    fn start(&self, delegate: &VerificationDelegate) -> VerificationOutcome<VerificationStream> {
        debug!("执行校验方法: {}", delegate.name());
        match std::panic::catch_unwind(AssertUnwindSafe(|| delegate.invoke(self.token.clone()))) {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(self.wrap(delegate.name(), e)),
            Err(payload) => Err(VerificationError::wrap(
                delegate.name(),
                Box::new(RoutinePanicked::from_payload(delegate.name(), payload)),
            )),
        }
    }

    fn normalize(&self, error: BoxError) -> VerificationError {
        let name = self.running_name();
        self.wrap(&name, error)
    }

    fn wrap(&self, routine: &str, error: BoxError) -> VerificationError {
        // 校验方法在观察到取消后可能以任意错误退出
        if self.token.is_cancelled() {
            return VerificationError::Canceled;
        }
        VerificationError::wrap(routine, error)
    }

    fn running_name(&self) -> String {
        self.running
            .as_ref()
            .map(|running| running.name.clone())
            .unwrap_or_default()
    }

    fn fail(&mut self, error: VerificationError) -> Option<VerificationOutcome<VerificationResult>> {
        if error.is_canceled() {
            debug!("校验操作已取消");
        } else {
            warn!("校验失败: {}", error);
        }
        self.finished = true;
        self.running = None;
        Some(Err(error))
    }
}

/// 从作用域中执行全部已注册的校验方法
pub trait VerificationScopeExt: ComponentResolver {
    /// 解析全部 [`VerificationDelegate`] 并按注册顺序执行
    fn execute_verification_methods(
        &self,
        token: CancellationToken,
    ) -> DependencyResult<BoxStream<'static, VerificationOutcome<VerificationResult>>> {
        let delegates = self.resolve_all::<VerificationDelegate>()?;
        Ok(run_verifications(
            delegates.iter().map(|delegate| VerificationDelegate::clone(delegate)),
            token,
        ))
    }
}

impl<R: ComponentResolver + ?Sized> VerificationScopeExt for R {}

/// 在模块中注册校验方法
pub trait VerificationRegistryExt: ComponentRegistry {
    /// 注册一个校验方法
    fn register_verification(&mut self, delegate: VerificationDelegate) -> &mut Self {
        debug!("注册校验方法: {}", delegate.name());
        self.register_instance(Arc::new(delegate))
    }
}

impl<R: ComponentRegistry + ?Sized> VerificationRegistryExt for R {}
