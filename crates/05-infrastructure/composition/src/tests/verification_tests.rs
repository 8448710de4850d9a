//! 作用域校验管道测试

use crate::{
    ensure_not_canceled, run_verifications, NestedScopeBuilder, RoutinePanicked, ScopeVerifier,
    VerificationDelegate, VerificationRegistryExt, VerificationResult, VerificationScopeExt,
    VerificationStream, VerifierRegistryExt,
};
use async_trait::async_trait;
use di_abstractions::{ComponentRegistry, FnModule};
use futures::stream::{self, StreamExt};
use infrastructure_common::{BoxError, VerificationError, VerificationOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
#[error("数据库不可用")]
struct DatabaseDown;

fn items(messages: &'static [&'static str]) -> VerificationStream {
    stream::iter(messages.iter().map(|m| Ok(VerificationResult::from(*m)))).boxed()
}

fn listing(name: &str, messages: &'static [&'static str]) -> VerificationDelegate {
    VerificationDelegate::new(name, move |_| Ok(items(messages)))
}

async fn collect(
    delegates: Vec<VerificationDelegate>,
    token: CancellationToken,
) -> Vec<VerificationOutcome<VerificationResult>> {
    run_verifications(delegates, token).collect().await
}

fn source_is<E: std::error::Error + 'static>(error: &VerificationError) -> bool {
    error
        .inner()
        .map(|inner| inner.downcast_ref::<E>().is_some())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_empty_delegates_yield_nothing() {
    let outcomes = collect(Vec::new(), CancellationToken::new()).await;
    assert!(outcomes.is_empty());
}

#[tokio::test]
async fn test_results_are_concatenated_in_order() {
    let outcomes = collect(
        vec![
            listing("first", &["a", "b"]),
            listing("empty", &[]),
            listing("second", &["c"]),
        ],
        CancellationToken::new(),
    )
    .await;

    let messages: Vec<String> = outcomes
        .into_iter()
        .map(|outcome| outcome.unwrap().into())
        .collect();
    assert_eq!(messages, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_failure_at_invocation_is_wrapped() {
    let failing = VerificationDelegate::new("database", |_| Err(Box::new(DatabaseDown) as BoxError));

    let outcomes = collect(
        vec![failing, listing("never", &["unreachable"])],
        CancellationToken::new(),
    )
    .await;

    assert_eq!(outcomes.len(), 1);
    let error = outcomes[0].as_ref().unwrap_err();
    assert!(!error.is_canceled());
    assert!(error.to_string().contains("database"));
    assert!(source_is::<DatabaseDown>(error));
}

#[tokio::test]
async fn test_failure_after_first_item_keeps_earlier_items() {
    let delegate = VerificationDelegate::from_stream("database", |_| {
        stream::iter(vec![
            Ok(VerificationResult::from("连接成功")),
            Err(Box::new(DatabaseDown) as BoxError),
            Ok(VerificationResult::from("不应出现")),
        ])
    });

    let outcomes = collect(vec![delegate], CancellationToken::new()).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].as_ref().unwrap().message(), "连接成功");
    assert!(source_is::<DatabaseDown>(outcomes[1].as_ref().unwrap_err()));
}

#[tokio::test]
async fn test_verification_error_is_not_wrapped_again() {
    let delegate = VerificationDelegate::new("schema", |_| {
        Err(Box::new(VerificationError::new("缺少表 users")) as BoxError)
    });

    let outcomes = collect(vec![delegate], CancellationToken::new()).await;

    match outcomes[0].as_ref().unwrap_err() {
        VerificationError::Failed { message, source } => {
            assert_eq!(message, "缺少表 users");
            assert!(source.is_none());
        }
        VerificationError::Canceled => panic!("不应该变成取消"),
    }
}

#[tokio::test]
async fn test_failure_payload_result_does_not_stop_pipeline() {
    let delegate = VerificationDelegate::from_stream("cache", |_| {
        stream::iter(vec![
            Ok(VerificationResult::failure("缓存未命中", DatabaseDown)),
            Ok(VerificationResult::from("缓存可用")),
        ])
    });

    let outcomes = collect(vec![delegate], CancellationToken::new()).await;

    assert_eq!(outcomes.len(), 2);
    let first = outcomes[0].as_ref().unwrap();
    assert!(first.is_failure());
    assert!(first.error().unwrap().downcast_ref::<DatabaseDown>().is_some());
    assert!(!outcomes[1].as_ref().unwrap().is_failure());
}

#[tokio::test]
async fn test_pre_canceled_token_yields_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    let checking = VerificationDelegate::from_stream("checking", |token: CancellationToken| {
        stream::once(async move {
            ensure_not_canceled(&token)?;
            Ok::<_, BoxError>(VerificationResult::from("ok"))
        })
    });

    let outcomes = collect(vec![checking], token).await;

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].as_ref().unwrap_err().is_canceled());
}

#[tokio::test]
async fn test_routine_raising_cancellation_after_item_is_not_wrapped() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let delegate = VerificationDelegate::from_stream("slow", move |token: CancellationToken| {
        let trigger = trigger.clone();
        stream::iter(0..2).then(move |i| {
            let token = token.clone();
            let trigger = trigger.clone();
            async move {
                if i == 1 {
                    trigger.cancel();
                    ensure_not_canceled(&token)?;
                }
                Ok::<_, BoxError>(VerificationResult::from(format!("item {i}")))
            }
        })
    });

    let outcomes = collect(vec![delegate], token).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].as_ref().unwrap().message(), "item 0");
    assert!(outcomes[1].as_ref().unwrap_err().is_canceled());
}

#[tokio::test]
async fn test_cancellation_while_routine_is_pending() {
    let token = CancellationToken::new();
    let delegate = VerificationDelegate::from_future("hanging", |_| async {
        futures::future::pending::<()>().await;
        Ok::<_, BoxError>(Vec::new())
    });

    let mut stream = run_verifications(vec![delegate], token.clone());
    let canceler = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let outcome = stream.next().await.unwrap();
    assert!(outcome.unwrap_err().is_canceled());
    assert!(stream.next().await.is_none());
    canceler.await.unwrap();
}

#[tokio::test]
async fn test_panic_is_wrapped_as_failure() {
    let at_invocation = VerificationDelegate::new("boom", |_| panic!("调用时崩溃"));
    let outcomes = collect(vec![at_invocation], CancellationToken::new()).await;
    let error = outcomes[0].as_ref().unwrap_err();
    assert!(source_is::<RoutinePanicked>(error));
    assert!(error.inner().unwrap().to_string().contains("调用时崩溃"));

    let while_polling = VerificationDelegate::from_stream("boom", |_| {
        stream::once(async {
            if true {
                panic!("拉取时崩溃");
            }
            Ok::<_, BoxError>(VerificationResult::from("unreachable"))
        })
    });
    let outcomes = collect(vec![while_polling], CancellationToken::new()).await;
    assert_eq!(outcomes.len(), 1);
    assert!(source_is::<RoutinePanicked>(outcomes[0].as_ref().unwrap_err()));
}

#[tokio::test]
async fn test_each_run_invokes_routine_again() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let delegate = VerificationDelegate::new("counting", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(items(&["ok"]))
    });

    collect(vec![delegate.clone()], CancellationToken::new()).await;
    collect(vec![delegate], CancellationToken::new()).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_execute_verification_methods_from_nested_scope() {
    let token = CancellationToken::new();
    let builder = NestedScopeBuilder::default();

    builder
        .add_module(FnModule::handle("RootChecks", |registry: &mut dyn ComponentRegistry| {
            registry.register_verification(listing("root", &["root ok"]));
            Ok(())
        }))
        .to_group("Root", &token)
        .await
        .unwrap();
    builder
        .add_module(FnModule::handle("ChildChecks", |registry: &mut dyn ComponentRegistry| {
            registry
                .register_verification(listing("child-1", &["child ok"]))
                .register_verification(listing("child-2", &["child ok 2"]));
            Ok(())
        }))
        .to_group("Child", &token)
        .await
        .unwrap();
    let scope = builder.build(&token).await.unwrap();

    let messages: Vec<String> = scope
        .execute_verification_methods(token.clone())
        .unwrap()
        .map(|outcome| outcome.unwrap().to_string())
        .collect()
        .await;

    assert_eq!(messages, vec!["root ok", "child ok", "child ok 2"]);
}

#[tokio::test]
async fn test_scope_without_verifications_yields_nothing() {
    let scope = NestedScopeBuilder::default().scope();
    let outcomes: Vec<_> = scope
        .execute_verification_methods(CancellationToken::new())
        .unwrap()
        .collect()
        .await;
    assert!(outcomes.is_empty());
}

struct StaticVerifier {
    enabled: bool,
    delay: Duration,
}

#[async_trait]
impl ScopeVerifier for StaticVerifier {
    fn name(&self) -> &str {
        "static"
    }

    async fn verify(&self, _token: CancellationToken) -> Result<Vec<VerificationResult>, BoxError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec!["配置完整".into(), "依赖可解析".into()])
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_millis(200))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[tokio::test]
async fn test_scope_verifier_adapter() {
    let token = CancellationToken::new();
    let builder = NestedScopeBuilder::default();
    builder
        .add_module(FnModule::handle("Verifiers", |registry: &mut dyn ComponentRegistry| {
            registry
                .register_verifier(Arc::new(StaticVerifier {
                    enabled: true,
                    delay: Duration::ZERO,
                }))
                .register_verifier(Arc::new(StaticVerifier {
                    enabled: false,
                    delay: Duration::ZERO,
                }));
            Ok(())
        }))
        .to_group("Verification", &token)
        .await
        .unwrap();
    let scope = builder.build(&token).await.unwrap();

    let outcomes: Vec<_> = scope
        .execute_verification_methods(token)
        .unwrap()
        .collect()
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].as_ref().unwrap().message(), "配置完整");
    assert_eq!(outcomes[1].as_ref().unwrap().message(), "依赖可解析");
}

#[tokio::test]
async fn test_scope_verifier_timeout_is_failure() {
    let delegate = VerificationDelegate::from_verifier(Arc::new(StaticVerifier {
        enabled: true,
        delay: Duration::from_secs(5),
    }));

    let outcomes = collect(vec![delegate], CancellationToken::new()).await;

    assert_eq!(outcomes.len(), 1);
    let error = outcomes[0].as_ref().unwrap_err();
    assert!(!error.is_canceled());
    assert!(error.to_string().contains("超时"));
}
