use crate::{
    command::Command,
    command_bus::CommandBus,
    command_handler::CommandHandler,
    context::AppContext,
    error::AppError,
    pipeline::{self, BoxAnySend, Next, PipelineBehavior},
    transaction_scope::HandlerMetadata,
};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::any::{TypeId, type_name};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type CmdHandlerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<BoxAnySend, AppError>> + Send + 'a>>;

type CmdHandlerFn =
    Arc<dyn for<'a> Fn(BoxAnySend, &'a AppContext) -> CmdHandlerFuture<'a> + Send + Sync>;

fn erase<F>(f: F) -> CmdHandlerFn
where
    F: for<'a> Fn(BoxAnySend, &'a AppContext) -> CmdHandlerFuture<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone)]
struct Registration {
    metadata: HandlerMetadata,
    call: CmdHandlerFn,
}

/// 基于内存的 CommandBus 实现
/// - 通过 TypeId 注册不同 Command 对应的 Handler，注册时固化处理器元数据（含事务标记）
/// - 分发时命令依次经过管道行为（先注册者在外层），最终到达处理器
/// - 运行时以类型擦除（Any）方式进行调度，并在调用端还原响应类型
#[derive(Default)]
pub struct InMemoryCommandBus {
    handlers: DashMap<TypeId, Registration>,
    behaviors: Vec<Arc<dyn PipelineBehavior>>,
}

impl InMemoryCommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个管道行为
    pub fn with_behavior(mut self, behavior: Arc<dyn PipelineBehavior>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// 注册命令处理器
    pub fn register<C, H>(&self, handler: Arc<H>) -> Result<(), AppError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let call = erase(move |boxed_cmd, ctx| {
            let handler = handler.clone();

            Box::pin(async move {
                // 正常情况下这里的 downcast 永远不会失败（键与闭包同一泛型 C）
                match boxed_cmd.downcast::<C>() {
                    Ok(cmd) => {
                        let response = handler.handle(ctx, *cmd).await?;
                        Ok(Box::new(response) as BoxAnySend)
                    }
                    Err(_) => Err(AppError::TypeMismatch {
                        expected: C::NAME,
                        found: "unknown",
                    }),
                }
            })
        });

        match self.handlers.entry(TypeId::of::<C>()) {
            Entry::Occupied(_) => Err(AppError::AlreadyRegisteredCommand { command: C::NAME }),
            Entry::Vacant(slot) => {
                let metadata = HandlerMetadata::of::<C, H>();
                tracing::debug!(
                    command = C::NAME,
                    handler = metadata.handler(),
                    transaction_scope = ?metadata.transaction_scope(),
                    "command handler registered"
                );
                slot.insert(Registration { metadata, call });
                Ok(())
            }
        }
    }

    /// 获取已注册的命令名列表（只读视图）
    pub fn registered_commands(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|e| e.value().metadata.command()).collect()
    }
}

#[async_trait]
impl CommandBus for InMemoryCommandBus {
    async fn dispatch<C: Command>(&self, ctx: &AppContext, cmd: C) -> Result<C::Response, AppError> {
        let Some(Registration { metadata, call }) =
            self.handlers.get(&TypeId::of::<C>()).map(|r| r.clone())
        else {
            return Err(AppError::HandlerNotFound(C::NAME));
        };

        tracing::debug!(command = C::NAME, "dispatching command");

        let terminal = Next::new(move || call(Box::new(cmd.clone()), ctx));
        let out = pipeline::chain(&self.behaviors, ctx, &metadata, terminal)
            .run()
            .await?;

        match out.downcast::<C::Response>() {
            Ok(response) => Ok(*response),
            Err(_) => Err(AppError::TypeMismatch {
                expected: type_name::<C::Response>(),
                found: "unknown",
            }),
        }
    }
}
