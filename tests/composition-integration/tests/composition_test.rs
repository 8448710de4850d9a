//! 嵌套作用域构建与作用域校验的端到端测试

use async_trait::async_trait;
use di_abstractions::{
    ComponentRegistry, ComponentRegistryExt, ComponentResolver, Constructible, FnModule,
    LifetimeScope, Module, ResolverExt,
};
use di_composition::{
    CompositionSettings, NestedScopeBuilder, ScopeVerifier, VerificationDelegate,
    VerificationRegistryExt, VerificationResult, VerificationScopeExt, VerifierRegistryExt,
};
use di_impl::ContainerBuilder;
use futures::StreamExt;
use infrastructure_common::{BoxError, DependencyError, DependencyResult, Lifetime};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct ConnectionSettings {
    url: String,
}

#[derive(Debug)]
struct Repository {
    settings: Arc<ConnectionSettings>,
}

impl Constructible for Repository {
    fn construct(resolver: &dyn ComponentResolver) -> DependencyResult<Self> {
        Ok(Self {
            settings: resolver.resolve::<ConnectionSettings>()?,
        })
    }
}

#[derive(Debug)]
struct OrderService {
    repository: Arc<Repository>,
}

impl Constructible for OrderService {
    fn construct(resolver: &dyn ComponentResolver) -> DependencyResult<Self> {
        Ok(Self {
            repository: resolver.resolve::<Repository>()?,
        })
    }
}

struct DataModule;

impl Module for DataModule {
    fn name(&self) -> &str {
        "DataModule"
    }

    fn load(&self, registry: &mut dyn ComponentRegistry) -> DependencyResult<()> {
        registry.register_self::<Repository>(Lifetime::Singleton);
        Ok(())
    }
}

/// 检查仓储能否在作用域中解析
struct RepositoryVerifier {
    scope: Arc<dyn LifetimeScope>,
}

#[async_trait]
impl ScopeVerifier for RepositoryVerifier {
    fn name(&self) -> &str {
        "repository"
    }

    async fn verify(&self, _token: CancellationToken) -> Result<Vec<VerificationResult>, BoxError> {
        let repository = self.scope.resolve::<Repository>()?;
        Ok(vec![format!("仓储连接: {}", repository.settings.url).into()])
    }
}

fn settings_file(content: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(content.as_bytes())?;
    Ok(file)
}

fn root_scope(settings: &CompositionSettings) -> anyhow::Result<Arc<dyn LifetimeScope>> {
    let mut builder = ContainerBuilder::new().with_config(settings.container.clone());
    builder.register_instance(Arc::new(ConnectionSettings {
        url: "postgres://localhost/orders".to_string(),
    }));
    let scope: Arc<dyn LifetimeScope> = builder.build();
    Ok(scope)
}

#[tokio::test]
async fn test_layered_application_scope() -> anyhow::Result<()> {
    let file = settings_file("[container]\nmax_resolution_depth = 8\n")?;
    let settings = CompositionSettings::load(file.path())?;
    let token = CancellationToken::new();

    let builder = NestedScopeBuilder::new(root_scope(&settings)?);
    builder
        .add_module(Arc::new(DataModule))
        .to_group("Data", &token)
        .await?;
    builder
        .add_module(FnModule::handle("Services", |registry: &mut dyn ComponentRegistry| {
            registry.register_self::<OrderService>(Lifetime::Scoped);
            Ok(())
        }))
        .to_group("Services", &token)
        .await?;

    let scope = builder.build(&token).await?;
    assert_eq!(scope.tag(), "Services");
    assert_eq!(scope.depth(), 2);

    let first = scope.resolve::<OrderService>()?;
    let second = scope.resolve::<OrderService>()?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.repository.settings.url, "postgres://localhost/orders");

    let data_scope = scope.parent().expect("应该有父作用域");
    let repository = data_scope.resolve::<Repository>()?;
    assert!(Arc::ptr_eq(&repository, &first.repository));
    assert!(!data_scope.is_registered::<OrderService>());
    Ok(())
}

#[tokio::test]
async fn test_verification_after_build() -> anyhow::Result<()> {
    let settings = CompositionSettings::default();
    let token = CancellationToken::new();
    let builder = NestedScopeBuilder::new(root_scope(&settings)?);

    builder
        .add_module(Arc::new(DataModule))
        .to_group("Data", &token)
        .await?;
    let data_scope = builder.build(&token).await?;

    let verified = data_scope.clone();
    builder
        .add_module(FnModule::handle(
            "Verification",
            move |registry: &mut dyn ComponentRegistry| {
                registry
                    .register_verifier(Arc::new(RepositoryVerifier {
                        scope: verified.clone(),
                    }))
                    .register_verification(VerificationDelegate::from_future(
                        "settings",
                        |_| async { Ok::<_, BoxError>(vec![VerificationResult::new("配置已加载")]) },
                    ));
                Ok(())
            },
        ))
        .after_group("Data", &token)
        .await?;
    let scope = builder.build(&token).await?;
    assert_eq!(scope.tag(), "AfterData");

    let messages: Vec<String> = scope
        .execute_verification_methods(token.clone())?
        .map(|outcome| outcome.map(String::from))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;

    assert_eq!(
        messages,
        vec!["仓储连接: postgres://localhost/orders", "配置已加载"]
    );
    Ok(())
}

#[tokio::test]
async fn test_verification_reports_missing_dependency() -> anyhow::Result<()> {
    let token = CancellationToken::new();
    let builder = NestedScopeBuilder::default();
    let empty_scope = builder.scope();

    builder
        .add_module(FnModule::handle(
            "Verification",
            move |registry: &mut dyn ComponentRegistry| {
                registry.register_verifier(Arc::new(RepositoryVerifier {
                    scope: empty_scope.clone(),
                }));
                Ok(())
            },
        ))
        .to_group("Verification", &token)
        .await?;
    let scope = builder.build(&token).await?;

    let outcomes: Vec<_> = scope
        .execute_verification_methods(token.clone())?
        .collect()
        .await;

    assert_eq!(outcomes.len(), 1);
    let error = outcomes[0].as_ref().expect_err("缺少依赖时校验应该失败");
    assert!(error.to_string().contains("repository"));
    let inner = error.inner().expect("应该保留原始错误");
    assert!(matches!(
        inner.downcast_ref::<DependencyError>(),
        Some(DependencyError::ComponentNotRegistered { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_resolution_depth_comes_from_settings() -> anyhow::Result<()> {
    let settings = CompositionSettings::from_toml_str("[container]\nmax_resolution_depth = 2\n")?;
    let token = CancellationToken::new();
    let builder = NestedScopeBuilder::new(root_scope(&settings)?);

    builder
        .add_module(Arc::new(DataModule))
        .add_module(FnModule::handle("Services", |registry: &mut dyn ComponentRegistry| {
            registry.register_self::<OrderService>(Lifetime::Transient);
            Ok(())
        }))
        .to_group("App", &token)
        .await?;
    let scope = builder.build(&token).await?;

    let error = scope.resolve::<OrderService>().expect_err("解析深度应该超过限制");
    assert!(matches!(
        error,
        DependencyError::ResolutionDepthExceeded { max_depth: 2, .. }
    ));
    assert!(scope.resolve::<Repository>().is_ok());
    Ok(())
}
