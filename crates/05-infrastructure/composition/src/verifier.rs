//! 校验器接口
//!
//! 以对象的形式编写校验逻辑，再转换为 [`VerificationDelegate`] 注册到作用域。

use crate::verification::{VerificationDelegate, VerificationRegistryExt, VerificationResult};
use async_trait::async_trait;
use di_abstractions::ComponentRegistry;
use infrastructure_common::{BoxError, VerificationError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 作用域校验器 trait
#[async_trait]
pub trait ScopeVerifier: Send + Sync {
    /// 校验器名称
    fn name(&self) -> &str;

    /// 执行校验
    async fn verify(&self, token: CancellationToken) -> Result<Vec<VerificationResult>, BoxError>;

    /// 获取校验超时时间，`None` 表示不限制
    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }

    /// 是否启用
    fn is_enabled(&self) -> bool {
        true
    }
}

impl VerificationDelegate {
    /// 把校验器转换为校验方法
    ///
    /// 禁用的校验器不产生任何结果；超时视为校验失败。
    pub fn from_verifier(verifier: Arc<dyn ScopeVerifier>) -> Self {
        let name = verifier.name().to_string();
        Self::from_future(name, move |token| {
            let verifier = verifier.clone();
            async move {
                if !verifier.is_enabled() {
                    debug!("校验器 {} 已禁用，跳过", verifier.name());
                    return Ok(Vec::new());
                }
                match verifier.timeout() {
                    Some(limit) => tokio::time::timeout(limit, verifier.verify(token))
                        .await
                        .unwrap_or_else(|_| {
                            Err(Box::new(VerificationError::new(format!(
                                "校验器 {} 执行超时 ({:?})",
                                verifier.name(),
                                limit
                            ))) as BoxError)
                        }),
                    None => verifier.verify(token).await,
                }
            }
        })
    }
}

/// 在模块中注册校验器
pub trait VerifierRegistryExt: ComponentRegistry {
    /// 注册一个校验器
    fn register_verifier(&mut self, verifier: Arc<dyn ScopeVerifier>) -> &mut Self {
        self.register_verification(VerificationDelegate::from_verifier(verifier))
    }
}

impl<R: ComponentRegistry + ?Sized> VerifierRegistryExt for R {}
