use async_trait::async_trait;
use uow_application::command::Command;
use uow_application::command_handler::CommandHandler;
use uow_application::context::AppContext;
use uow_application::error::AppError;
use uow_application::transaction_scope::{HandlerMetadata, TransactionScope};
use uow_application::transactional;

#[derive(Clone)]
struct PlaceOrder {
    qty: u32,
}

impl Command for PlaceOrder {
    const NAME: &'static str = "PlaceOrder";
    type Response = u32;
}

struct PlaceOrderHandler;

#[transactional]
#[async_trait]
impl CommandHandler<PlaceOrder> for PlaceOrderHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: PlaceOrder) -> Result<u32, AppError> {
        Ok(cmd.qty)
    }
}

fn main() {
    let meta = HandlerMetadata::of::<PlaceOrder, PlaceOrderHandler>();
    assert_eq!(meta.transaction_scope(), Some(TransactionScope::Required));
}
