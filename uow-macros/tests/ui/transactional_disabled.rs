use async_trait::async_trait;
use uow_application::command::Command;
use uow_application::command_handler::CommandHandler;
use uow_application::context::AppContext;
use uow_application::error::AppError;
use uow_application::transaction_scope::{TransactionScope, requires_transaction, HandlerMetadata};
use uow_application::transactional;

#[derive(Clone)]
struct RenameUser {
    name: String,
}

impl Command for RenameUser {
    const NAME: &'static str = "RenameUser";
    type Response = ();
}

struct RenameUserHandler;

#[transactional(enabled = false)]
#[async_trait]
impl CommandHandler<RenameUser> for RenameUserHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: RenameUser) -> Result<(), AppError> {
        let _ = cmd.name;
        Ok(())
    }
}

fn main() {
    let meta = HandlerMetadata::of::<RenameUser, RenameUserHandler>();
    assert_eq!(meta.transaction_scope(), Some(TransactionScope::Suppressed));
    assert!(!requires_transaction(Some(&meta)));
}
