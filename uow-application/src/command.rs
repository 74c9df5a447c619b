/// 应用层命令（Command）
///
/// 表达“意图”的写操作请求，通常会修改领域状态。
/// - 建议保持语义化的“动宾结构”命名，如 `CreateUser`、`CloseOrder`；
/// - 命令在构造后不可变。事务重试时下游管道会以同一命令值重新执行，因此要求 `Clone`。
///
/// 关联项：
/// - `NAME`：命令的稳定名称，用于日志、追踪与路由。避免依赖 `type_name::<T>()`；
/// - `Response`：处理器返回给调用方的结果，管道原样透传。
pub trait Command: Clone + Send + Sync + 'static {
    /// 命令的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 命令执行结果
    type Response: Send + 'static;
}
