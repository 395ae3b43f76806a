use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Client(#[from] crate::client::ClientError),

    #[error(transparent)]
    ResultHandler(#[from] crate::result_handler::ResultHandlerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tera(#[from] tera::Error),

    #[error("no prompt template found for role '{0}'")]
    MissingPromptTemplate(String),

    #[error(transparent)]
    Dispatch(#[from] crate::message_dispatch::DispatchError),
}
